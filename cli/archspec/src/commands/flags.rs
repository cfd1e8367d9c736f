//! `archspec flags`: optimization flags for a compiler.

use anyhow::{bail, Result};
use archspec::MicroarchDatabase;

use super::lookup;

pub fn render(db: &MicroarchDatabase, name: &str, compiler: &str, version: &str) -> Result<String> {
    let target = lookup(db, name)?;
    let Some(selected) = target.compiler_entry(compiler, version) else {
        bail!("{compiler} {version} cannot optimize for {name}");
    };

    let mut out = selected.flags();
    if selected.owner != target.name() {
        out.push_str(&format!("\n# from ancestor {}", selected.owner));
    }
    if !selected.entry.warnings.is_empty() {
        out.push_str(&format!("\n# warning: {}", selected.entry.warnings));
    }
    Ok(out)
}

pub fn run(
    db: &MicroarchDatabase,
    name: &str,
    compiler: &str,
    version: Option<&str>,
) -> Result<()> {
    let Some(version) = version else {
        bail!("no compiler version given (use --version or set defaults.compiler-version)");
    };
    println!("{}", render(db, name, compiler, version)?);
    Ok(())
}
