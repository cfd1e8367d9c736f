//! `archspec host`: detect the running machine's microarchitecture.

use anyhow::Result;
use archspec::detect::{self, DetectedCpuInfo};
use archspec::{llvm, MicroarchDatabase};

/// Report for a detected signal on `machine`.
pub fn render(
    db: &MicroarchDatabase,
    info: &DetectedCpuInfo,
    machine: &str,
    compiler: Option<(&str, &str)>,
) -> String {
    let target = detect::host(db, info, machine);
    let mut out = String::new();

    out.push_str(&format!("Host:      {}\n", target.name()));
    out.push_str(&format!("Vendor:    {}\n", target.vendor()));
    out.push_str(&format!("Family:    {}\n", target.family()));
    out.push_str(&format!("Generic:   {}\n", target.generic()));
    out.push_str(&format!("LLVM CPU:  {}\n", llvm::get_llvm_cpu_name(&target)));
    out.push_str(&format!("LLVM features: {}\n", llvm::get_llvm_features_string(&target)));
    if let Some((compiler, version)) = compiler {
        let flags = target.optimization_flags(compiler, version);
        if flags.is_empty() {
            out.push_str(&format!("Flags ({compiler} {version}): none\n"));
        } else {
            out.push_str(&format!("Flags ({compiler} {version}): {flags}\n"));
        }
    }
    out
}

pub fn run(db: &MicroarchDatabase, machine: &str, compiler: Option<(&str, &str)>) -> Result<()> {
    let info = detect::detect_cpu_info(db);
    tracing::debug!(machine, vendor = %info.vendor, features = info.features.len(), "detected cpu");
    print!("{}", render(db, &info, machine, compiler));
    Ok(())
}
