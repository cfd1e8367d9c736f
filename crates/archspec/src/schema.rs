//! Descriptor document schema and ingestion checks.
//!
//! A descriptor document is a JSON object with three sections:
//! `microarchitectures`, `feature_aliases` and `conversions`. Every section
//! and most fields are optional; absent values take the defaults a
//! hand-written document would expect (vendor `generic`, no parents, ...).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ArchspecError, Result};
use crate::microarch::{CompilerEntry, Microarchitecture, GENERIC_VENDOR};

/// A problem found while checking descriptor data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Severity: "error" or "warning".
    pub severity: &'static str,
    /// Human-readable description.
    pub message: String,
}

/// The whole descriptor document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorDocument {
    #[serde(default)]
    pub microarchitectures: BTreeMap<String, MicroarchitectureEntry>,
    #[serde(default)]
    pub feature_aliases: BTreeMap<String, FeatureAliasEntry>,
    #[serde(default)]
    pub conversions: Conversions,
}

fn generic_vendor() -> String {
    GENERIC_VENDOR.into()
}

/// One entry of the `microarchitectures` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicroarchitectureEntry {
    #[serde(default)]
    pub from: Vec<String>,
    #[serde(default = "generic_vendor")]
    pub vendor: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub compilers: BTreeMap<String, Vec<CompilerEntry>>,
    #[serde(default)]
    pub generation: u32,
    #[serde(default)]
    pub cpupart: String,
}

impl MicroarchitectureEntry {
    /// Build the descriptor called `name` from this entry.
    pub fn into_microarchitecture(self, name: &str) -> Microarchitecture {
        Microarchitecture::new(name, self.vendor)
            .with_parents(self.from)
            .with_features(self.features)
            .with_compilers(self.compilers)
            .with_generation(self.generation)
            .with_cpu_part(self.cpupart)
    }
}

/// One entry of the `feature_aliases` section.
///
/// `any_of` makes the alias satisfied by any listed feature; `families`
/// makes it satisfied by every member of the listed families.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureAliasEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub families: Option<Vec<String>>,
}

/// The `conversions` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Space-separated macOS flag combination -> space-separated feature names.
    #[serde(default)]
    pub darwin_flags: BTreeMap<String, String>,
    /// ARM `CPU implementer` code -> vendor name.
    #[serde(default)]
    pub arm_vendors: BTreeMap<String, String>,
}

/// Parse a descriptor document without touching any store.
pub fn parse_document(json: &str) -> Result<DescriptorDocument> {
    let document: DescriptorDocument = serde_json::from_str(json)?;
    Ok(document)
}

/// Presence checks applied before a document is merged into a store.
///
/// Returns `Ok(())` if valid, or `Err(issues)` with a list of problems.
pub fn validate_document(document: &DescriptorDocument) -> std::result::Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    for (name, entry) in &document.microarchitectures {
        if name.trim().is_empty() {
            issues.push(ValidationIssue {
                severity: "error",
                message: "microarchitecture with an empty name".into(),
            });
        }
        if entry.from.iter().any(|parent| parent == name) {
            issues.push(ValidationIssue {
                severity: "error",
                message: format!("microarchitecture '{name}' lists itself as a parent"),
            });
        }
        for (compiler, entries) in &entry.compilers {
            for (i, compiler_entry) in entries.iter().enumerate() {
                if compiler_entry.flags.trim().is_empty() {
                    issues.push(ValidationIssue {
                        severity: "error",
                        message: format!(
                            "microarchitecture '{name}': {compiler} entry {i} has no flags"
                        ),
                    });
                }
            }
        }
    }

    for (alias, entry) in &document.feature_aliases {
        if entry.any_of.is_none() && entry.families.is_none() {
            issues.push(ValidationIssue {
                severity: "error",
                message: format!("feature alias '{alias}' has neither any_of nor families"),
            });
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

/// Parse and validate, turning presence-check failures into an error.
pub fn load_document(json: &str) -> Result<DescriptorDocument> {
    let document = parse_document(json)?;
    validate_document(&document).map_err(|issues| ArchspecError::Validation {
        detail: issues
            .iter()
            .map(|issue| issue.message.as_str())
            .collect::<Vec<_>>()
            .join("; "),
    })?;
    Ok(document)
}
