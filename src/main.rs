use anyhow::Context;
use clap::{Parser, Subcommand};
use mercury_poll::constants::{
    DEFAULT_ATTEMPTS, DEFAULT_CONNECT_TIMEOUT, DEFAULT_DEVICE_TIMEOUT, DEFAULT_HOST,
    DEFAULT_PLAN_FILE, DEFAULT_READ_TIMEOUT, DEFAULT_RESPONSE_TIMEOUT,
};
use mercury_poll::logging::log_warn;
use mercury_poll::payload::{decode_energy, decode_instant};
use mercury_poll::util::hex::{decode_hex, format_hex_compact};
use mercury_poll::{
    init_logger, log_info, poll, render_json, render_table, Command, PassSummary, PollConfig,
    PollPlan, RequestFrame, ResponseFrame, SerialNumber,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "mercury-poll")]
#[command(about = "Poll Mercury 200 meters behind RS-485/Ethernet gateways")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll every meter in the plan once and print the readings
    Poll {
        /// Gateway host
        #[arg(long, default_value = DEFAULT_HOST)]
        host: String,
        /// Plan file (`port serial [serial ...]` per line); built-in plan if missing
        #[arg(short, long, default_value = DEFAULT_PLAN_FILE)]
        plan: PathBuf,
        #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT.as_millis() as u64)]
        connect_timeout_ms: u64,
        /// Budget per exchange attempt
        #[arg(long, default_value_t = DEFAULT_RESPONSE_TIMEOUT.as_millis() as u64)]
        timeout_ms: u64,
        /// Longest silence between received chunks
        #[arg(long, default_value_t = DEFAULT_READ_TIMEOUT.as_millis() as u64)]
        read_timeout_ms: u64,
        /// Attempts per exchange
        #[arg(short, long, default_value_t = DEFAULT_ATTEMPTS)]
        attempts: u32,
        #[arg(long, default_value_t = DEFAULT_DEVICE_TIMEOUT.as_millis() as u64)]
        device_timeout_ms: u64,
        /// Poll gateway ports concurrently
        #[arg(long)]
        parallel: bool,
        /// Print JSON instead of the table
        #[arg(long)]
        json: bool,
    },
    /// Print the request frame for a meter and command
    Frame {
        serial: String,
        /// 63, 0x27, 63h, instant or energy
        #[arg(value_parser = parse_command)]
        command: Command,
    },
    /// Validate and decode a captured response frame
    Decode {
        #[arg(value_parser = parse_command)]
        command: Command,
        /// Frame bytes in hex; spaces and colons allowed
        hex: String,
    },
}

fn parse_command(s: &str) -> Result<Command, String> {
    let lower = s.trim().to_ascii_lowercase();
    match lower.as_str() {
        "instant" => return Ok(Command::ReadInstant),
        "energy" => return Ok(Command::ReadEnergy),
        _ => {}
    }
    let digits = lower.trim_start_matches("0x").trim_end_matches('h');
    let code = u8::from_str_radix(digits, 16).map_err(|e| format!("{s:?}: {e}"))?;
    Command::try_from(code).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let cli = Cli::parse();

    match cli.command {
        Commands::Poll {
            host,
            plan,
            connect_timeout_ms,
            timeout_ms,
            read_timeout_ms,
            attempts,
            device_timeout_ms,
            parallel,
            json,
        } => {
            let poll_plan = match PollPlan::load(&plan)
                .with_context(|| format!("loading plan {}", plan.display()))?
            {
                Some(poll_plan) => poll_plan,
                None => {
                    log_info(&format!(
                        "{} missing or empty, using built-in plan",
                        plan.display()
                    ));
                    PollPlan::default_plan()
                }
            };

            let config = PollConfig::default()
                .with_host(host)
                .with_connect_timeout(Duration::from_millis(connect_timeout_ms))
                .with_response_timeout(Duration::from_millis(timeout_ms))
                .with_read_timeout(Duration::from_millis(read_timeout_ms))
                .with_attempts(attempts)
                .with_device_timeout(Duration::from_millis(device_timeout_ms))
                .with_concurrent_ports(parallel);

            let reports = poll(&poll_plan, &config).await;

            if json {
                println!("{}", render_json(&reports)?);
            } else {
                print!("{}", render_table(&reports));
            }

            let summary = PassSummary::from_reports(&reports);
            log_info(&format!(
                "pass done: {} complete, {} partial, {} absent, {} malformed, {}/{} ports failed",
                summary.complete,
                summary.partial,
                summary.absent,
                summary.malformed,
                summary.ports_failed,
                summary.ports
            ));
        }
        Commands::Frame { serial, command } => {
            let serial = SerialNumber::new(&serial)?;
            let request = RequestFrame::build(serial.address(), command);
            println!("{}", format_hex_compact(request.as_bytes()));
        }
        Commands::Decode { command, hex } => {
            let bytes = decode_hex(&hex).context("parsing frame hex")?;
            let frame = ResponseFrame::parse(&bytes)?;
            if frame.command != command.code() {
                log_warn(&format!(
                    "frame echoes command {:02X}h, decoding as {command}",
                    frame.command
                ));
            }
            println!("address {} command {:02X}h", frame.address, frame.command);
            match command {
                Command::ReadInstant => {
                    let values = decode_instant(frame.payload)?;
                    println!(
                        "U={:.1} V  I={:.2} A  P={} W",
                        values.voltage, values.current, values.power
                    );
                }
                Command::ReadEnergy => {
                    let totals = decode_energy(frame.payload)?;
                    println!("T1={:.2} kWh  T2={:.2} kWh", totals.tariff1, totals.tariff2);
                }
            }
        }
    }

    Ok(())
}
