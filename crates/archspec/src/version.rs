//! Compiler version ranges.
//!
//! Descriptor documents express compiler support as `"MIN:MAX"` strings where
//! either bound may be omitted (`"4.9:"`, `":11.1"`, `":"`). Versions are
//! dot-separated integer tuples compared component by component, with missing
//! trailing components treated as zero (`"10" == "10.0.0"`).

use std::cmp::Ordering;
use std::fmt;

/// A dotted compiler version such as `10.3` or `19.0.1`.
///
/// Components that are not integers are skipped, so `"12.2.0-rc1"` parses
/// as `12.2`.
#[derive(Debug, Clone, Default)]
pub struct CompilerVersion(Vec<u64>);

impl CompilerVersion {
    /// Parse a dotted version string.
    pub fn parse(s: &str) -> Self {
        Self(
            s.split('.')
                .filter(|part| !part.is_empty())
                .filter_map(|part| part.trim().parse::<u64>().ok())
                .collect(),
        )
    }

    /// The parsed integer components.
    pub fn components(&self) -> &[u64] {
        &self.0
    }
}

impl PartialEq for CompilerVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CompilerVersion {}

impl PartialOrd for CompilerVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CompilerVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        for i in 0..len {
            let a = self.0.get(i).copied().unwrap_or(0);
            let b = other.0.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl fmt::Display for CompilerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u64::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

/// A parsed version constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRange {
    /// Inclusive bounds; `None` means open-ended.
    Bounded {
        min: Option<CompilerVersion>,
        max: Option<CompilerVersion>,
    },
    /// A constraint without a colon only matches the identical string.
    Exact(String),
}

impl VersionRange {
    /// Parse a `"MIN:MAX"` constraint.
    pub fn parse(constraint: &str) -> Self {
        match constraint.split_once(':') {
            Some((min, max)) => {
                let bound = |s: &str| (!s.is_empty()).then(|| CompilerVersion::parse(s));
                VersionRange::Bounded {
                    min: bound(min),
                    max: bound(max),
                }
            }
            None => VersionRange::Exact(constraint.to_string()),
        }
    }

    /// Whether `version` lies within this range.
    pub fn contains(&self, version: &str) -> bool {
        match self {
            VersionRange::Exact(expected) => expected == version,
            VersionRange::Bounded { min, max } => {
                let version = CompilerVersion::parse(version);
                if let Some(min) = min {
                    if version < *min {
                        return false;
                    }
                }
                if let Some(max) = max {
                    if version > *max {
                        return false;
                    }
                }
                true
            }
        }
    }
}

/// Check if `version` satisfies the `constraint` string.
pub fn satisfies(constraint: &str, version: &str) -> bool {
    VersionRange::parse(constraint).contains(version)
}
