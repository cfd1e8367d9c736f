//! `archspec list`: every known microarchitecture, grouped by family.

use anyhow::Result;
use archspec::MicroarchDatabase;

/// Render the listing.
pub fn render(db: &MicroarchDatabase) -> String {
    let mut out = String::new();
    for (family, names) in db.by_family() {
        out.push_str(&format!("{family} ({}):\n", names.len()));
        for chunk in names.chunks(6) {
            out.push_str(&format!("    {}\n", chunk.join(" ")));
        }
    }
    out
}

pub fn run(db: &MicroarchDatabase) -> Result<()> {
    print!("{}", render(db));
    println!();
    println!("Use 'archspec describe <name>' for details.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_family() {
        let out = render(MicroarchDatabase::global());
        for family in ["x86_64 (", "aarch64 (", "ppc64le (", "ppc64 (", "riscv64 ("] {
            assert!(out.contains(family), "{family} missing from:\n{out}");
        }
        assert!(out.contains("haswell"));
        assert!(out.contains("neoverse_n1"));
    }

    #[test]
    fn empty_database_lists_nothing() {
        assert_eq!(render(&MicroarchDatabase::empty()), "");
    }
}
