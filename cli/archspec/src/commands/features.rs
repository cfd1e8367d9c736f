//! `archspec has-feature`: feature checks including aliases.

use anyhow::Result;
use archspec::MicroarchDatabase;

use super::lookup;

/// One `feature: yes|no` line per requested feature.
pub fn render(db: &MicroarchDatabase, name: &str, features: &[String]) -> Result<String> {
    let target = lookup(db, name)?;
    let lines: Vec<String> = features
        .iter()
        .map(|feature| {
            let answer = if target.has_feature(feature) { "yes" } else { "no" };
            format!("{feature}: {answer}")
        })
        .collect();
    Ok(lines.join("\n"))
}

pub fn run(db: &MicroarchDatabase, name: &str, features: &[String]) -> Result<()> {
    println!("{}", render(db, name, features)?);
    Ok(())
}
