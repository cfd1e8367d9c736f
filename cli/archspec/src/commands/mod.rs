//! CLI command implementations.

pub mod describe;
pub mod features;
pub mod flags;
pub mod host;
pub mod list;
pub mod llvm;
pub mod validate;

use anyhow::{bail, Result};
use archspec::{MicroarchDatabase, Target};

/// Look up `name`, failing with a hint when it is unknown.
pub(crate) fn lookup<'db>(db: &'db MicroarchDatabase, name: &str) -> Result<Target<'db>> {
    match db.get(name) {
        Some(target) => Ok(target),
        None => bail!(
            "unknown microarchitecture: '{name}'. Use 'archspec list' to see available names."
        ),
    }
}
