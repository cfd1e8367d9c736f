//! `archspec validate`: consistency report for the loaded database.

use anyhow::{bail, Result};
use archspec::{MicroarchDatabase, ValidationIssue};

/// Report lines and whether any issue is an error.
pub fn render(issues: &[ValidationIssue]) -> (String, bool) {
    let lines: Vec<String> = issues
        .iter()
        .map(|issue| format!("{}: {}", issue.severity, issue.message))
        .collect();
    let has_errors = issues.iter().any(|issue| issue.severity == "error");
    (lines.join("\n"), has_errors)
}

pub fn run(db: &MicroarchDatabase) -> Result<()> {
    let issues = db.check_consistency();
    if issues.is_empty() {
        println!("{} microarchitectures, no issues found.", db.len());
        return Ok(());
    }

    let (report, has_errors) = render(&issues);
    println!("{report}");
    if has_errors {
        bail!("database has {} issue(s)", issues.len());
    }
    Ok(())
}
