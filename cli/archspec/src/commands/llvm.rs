//! `archspec llvm`: resolve an LLVM CPU name.

use anyhow::{bail, Result};
use archspec::{llvm, MicroarchDatabase};

pub fn render(db: &MicroarchDatabase, cpu: &str, family: &str) -> Result<String> {
    let normalized = llvm::normalize_cpu_name(family, cpu);
    let features = llvm::get_llvm_features_for_cpu(db, cpu, family);
    if features.is_empty() && !db.exists(&normalized) {
        bail!("no microarchitecture known for LLVM CPU '{cpu}' on {family}");
    }
    Ok(format!("Name:     {normalized}\nFeatures: {features}"))
}

pub fn run(db: &MicroarchDatabase, cpu: &str, family: &str) -> Result<()> {
    println!("{}", render(db, cpu, family)?);
    Ok(())
}
