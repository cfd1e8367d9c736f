//! `archspec describe`: details of one microarchitecture.

use anyhow::Result;
use archspec::MicroarchDatabase;

use super::lookup;

/// Human-readable description.
pub fn render(db: &MicroarchDatabase, name: &str) -> Result<String> {
    let target = lookup(db, name)?;
    let mut out = String::new();

    out.push_str(&format!("=== Microarchitecture: {} ===\n", target.name()));
    out.push_str(&format!("Vendor:    {}\n", target.vendor()));
    out.push_str(&format!("Family:    {}\n", target.family()));
    out.push_str(&format!("Generic:   {}\n", target.generic()));
    if !target.parent_names().is_empty() {
        out.push_str(&format!("Parents:   {}\n", target.parent_names().join(", ")));
    }
    let ancestors = target.ancestors();
    if !ancestors.is_empty() {
        out.push_str(&format!("Ancestors: {}\n", ancestors.join(", ")));
    }
    if target.generation() > 0 {
        out.push_str(&format!("Generation: {}\n", target.generation()));
    }
    if !target.cpu_part().is_empty() {
        out.push_str(&format!("CPU part:  {}\n", target.cpu_part()));
    }

    out.push_str(&format!("\n--- Features ({}) ---\n", target.features().len()));
    let features: Vec<&str> = target.features().iter().map(String::as_str).collect();
    for chunk in features.chunks(8) {
        out.push_str(&format!("  {}\n", chunk.join(" ")));
    }

    if !target.compilers().is_empty() {
        out.push_str("\n--- Compilers ---\n");
        for (compiler, entries) in target.compilers() {
            for entry in entries {
                out.push_str(&format!(
                    "  {compiler:<8} {:<12} {}\n",
                    entry.versions,
                    entry.render(target.name())
                ));
            }
        }
    }

    Ok(out)
}

/// The descriptor as JSON, in the document's field names.
pub fn render_json(db: &MicroarchDatabase, name: &str) -> Result<String> {
    let target = lookup(db, name)?;
    Ok(serde_json::to_string_pretty(target.microarchitecture())?)
}

pub fn run(db: &MicroarchDatabase, name: &str, json: bool) -> Result<()> {
    let out = if json {
        render_json(db, name)?
    } else {
        render(db, name)?
    };
    println!("{out}");
    Ok(())
}
