//! # Poll Plan
//!
//! Which meters live behind which gateway port.
//!
//! The plan file is line oriented: `port serial [serial ...]`, fields
//! separated by spaces or tabs. Blank lines and lines starting with `#` are
//! ignored; so are lines whose port does not parse and tokens that are not
//! six-digit serials.
//!
//! ```text
//! # gateway A
//! 20003   548973 548974
//! 20004   601122
//! ```

use crate::error::MercuryError;
use crate::mercury::frame::SerialNumber;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::path::Path;

/// Port to meter mapping, iterated in ascending port order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollPlan {
    ports: BTreeMap<u16, Vec<SerialNumber>>,
}

impl PollPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in plan used when no plan file is present.
    pub fn default_plan() -> Self {
        let mut plan = PollPlan::new();
        let serials = ["548973", "548974"]
            .iter()
            .filter_map(|s| SerialNumber::new(s).ok())
            .collect();
        plan.insert(20003, serials);
        plan
    }

    /// Sets the meters for `port`, replacing any earlier entry. Repeated
    /// serials keep their first position.
    pub fn insert(&mut self, port: u16, serials: Vec<SerialNumber>) {
        let mut unique: Vec<SerialNumber> = Vec::with_capacity(serials.len());
        for serial in serials {
            if !unique.contains(&serial) {
                unique.push(serial);
            }
        }
        self.ports.insert(port, unique);
    }

    /// Parses plan file contents. Bad lines are skipped with a warning.
    pub fn parse(text: &str) -> Self {
        let mut plan = PollPlan::new();

        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split_whitespace();
            let Some(port_field) = fields.next() else {
                continue;
            };
            let port = match port_field.parse::<u16>() {
                Ok(port) => port,
                Err(_) => {
                    warn!("plan line {}: bad port {port_field:?}, skipped", idx + 1);
                    continue;
                }
            };

            let serials: Vec<SerialNumber> = fields
                .filter_map(|field| match SerialNumber::new(field) {
                    Ok(serial) => Some(serial),
                    Err(_) => {
                        debug!("plan line {}: ignoring {field:?}", idx + 1);
                        None
                    }
                })
                .collect();

            if serials.is_empty() {
                warn!("plan line {}: no valid serials for port {port}", idx + 1);
                continue;
            }
            plan.insert(port, serials);
        }

        plan
    }

    /// Reads a plan file. `Ok(None)` when the file does not exist or holds
    /// no usable entries.
    pub fn load(path: &Path) -> Result<Option<Self>, MercuryError> {
        if !path.is_file() {
            return Ok(None);
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| MercuryError::PlanFileError(format!("{}: {e}", path.display())))?;
        let plan = Self::parse(&text);

        Ok(if plan.is_empty() { None } else { Some(plan) })
    }

    /// [`PollPlan::load`], falling back to [`PollPlan::default_plan`].
    pub fn load_or_default(path: &Path) -> Result<Self, MercuryError> {
        Ok(Self::load(path)?.unwrap_or_else(Self::default_plan))
    }

    pub fn get(&self, port: u16) -> Option<&[SerialNumber]> {
        self.ports.get(&port).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &[SerialNumber])> + '_ {
        self.ports.iter().map(|(port, serials)| (*port, serials.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Number of ports.
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn device_count(&self) -> usize {
        self.ports.values().map(Vec::len).sum()
    }
}
