//! CPU microarchitecture database, host matching and LLVM name translation.
//!
//! The database describes CPU generations as a graph of named descriptors:
//! each one lists its vendor, its features and the more general descriptors
//! it extends. On top of that graph sit:
//! - **Queries** on a [`Target`]: ancestry, family, feature checks with
//!   aliases, a partial order by generality, compiler flag selection
//! - **Host matching:** picking the most specific descriptor compatible with
//!   a detected-CPU record ([`detect`])
//! - **LLVM translation:** feature and CPU names in LLVM spelling ([`llvm`])
//!
//! ```no_run
//! use archspec::{detect, MicroarchDatabase};
//!
//! let db = MicroarchDatabase::global();
//! let host = detect::host_for_machine(db);
//! println!("{host} ({}): {}", host.family(), host.optimization_flags("gcc", "12.2"));
//! ```

pub mod database;
pub mod detect;
pub mod error;
pub mod llvm;
pub mod microarch;
pub mod schema;
pub mod version;

// Re-exports for convenience.
pub use database::MicroarchDatabase;
pub use detect::{compatible_microarchitectures, host, DetectedCpuInfo};
pub use error::{ArchspecError, Result};
pub use microarch::{generic_microarchitecture, CompilerEntry, Microarchitecture, Target};
pub use schema::ValidationIssue;
