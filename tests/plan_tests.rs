//! Plan file loading tests against real files in a temporary directory.

use mercury_poll::PollPlan;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

fn ports(plan: &PollPlan) -> Vec<u16> {
    plan.iter().map(|(port, _)| port).collect()
}

/// A missing file is not an error; the caller falls back to the built-in plan.
#[test]
fn test_missing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("serials.txt");

    assert!(PollPlan::load(&path).unwrap().is_none());
    assert_eq!(
        PollPlan::load_or_default(&path).unwrap(),
        PollPlan::default_plan()
    );
}

/// A file with nothing usable behaves like a missing one.
#[test]
fn test_file_without_entries() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "# no meters yet").unwrap();
    writeln!(file, "20003 not-a-serial").unwrap();

    assert!(PollPlan::load(file.path()).unwrap().is_none());
    assert_eq!(
        PollPlan::load_or_default(file.path()).unwrap(),
        PollPlan::default_plan()
    );
}

#[test]
fn test_load_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        "# gateway A\n20004   601122\n20003\t548973 548974\r\n\n20005 bad\n"
    )
    .unwrap();

    let plan = PollPlan::load(file.path()).unwrap().unwrap();
    assert_eq!(ports(&plan), vec![20003, 20004]);
    assert_eq!(plan.device_count(), 3);
    let serials: Vec<String> = plan
        .get(20003)
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(serials, vec!["548973", "548974"]);
}

/// A directory in place of the plan file counts as absent.
#[test]
fn test_directory_is_not_a_plan() {
    let dir = tempdir().unwrap();
    assert!(PollPlan::load(dir.path()).unwrap().is_none());
}
