//! Host detection: match a detected-CPU signal against the database.
//!
//! Detection is split in two. A [`DetectedCpuInfo`] is the flat record a
//! platform probe produces (see [`cpuinfo`] for the Linux reader); matching
//! that record against the descriptors is pure and works on any store.

pub mod cpuinfo;
mod compat;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::database::MicroarchDatabase;
use crate::microarch::{generic_microarchitecture, Target, GENERIC_VENDOR};

use compat::Probe;

pub const ARCH_X86_64: &str = "x86_64";
pub const ARCH_AARCH64: &str = "aarch64";
pub const ARCH_PPC64: &str = "ppc64";
pub const ARCH_PPC64LE: &str = "ppc64le";
pub const ARCH_RISCV64: &str = "riscv64";

/// CPU characteristics reported by a platform probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedCpuInfo {
    /// Model name, when the platform reports one (macOS, RISC-V).
    pub name: Option<String>,
    pub vendor: String,
    pub features: BTreeSet<String>,
    /// POWER generation; 0 elsewhere.
    pub generation: u32,
    /// ARM `CPU part`; empty elsewhere.
    pub cpu_part: String,
}

impl DetectedCpuInfo {
    /// An empty signal with the generic vendor.
    pub fn generic() -> Self {
        Self {
            vendor: GENERIC_VENDOR.into(),
            ..Self::default()
        }
    }
}

/// Map alternative spellings onto the names the database uses.
pub fn normalize_machine(machine: &str) -> &str {
    match machine {
        "arm64" => ARCH_AARCH64,
        "amd64" => ARCH_X86_64,
        other => other,
    }
}

/// The architecture this process runs on, spelled as a family name.
pub fn machine() -> &'static str {
    match std::env::consts::ARCH {
        "powerpc64" if cfg!(target_endian = "little") => ARCH_PPC64LE,
        "powerpc64" => ARCH_PPC64,
        "x86" => "i686",
        other => normalize_machine(other),
    }
}

/// Every descriptor that could describe the CPU behind `info`.
///
/// Order is store order and carries no meaning. When nothing matches, the
/// result holds only the architecture's root descriptor (if it is known).
pub fn compatible_microarchitectures<'db>(
    db: &'db MicroarchDatabase,
    info: &DetectedCpuInfo,
    machine: &str,
) -> Vec<Target<'db>> {
    let machine = normalize_machine(machine);
    let Some(predicate) = compat::predicate_for(machine) else {
        tracing::debug!(machine, "no compatibility rules for architecture");
        return db.get(machine).into_iter().collect();
    };

    let probe = Probe { db, info, machine };
    let candidates: Vec<Target<'db>> = db
        .targets()
        .filter(|target| {
            let compatible = predicate(&probe, target);
            if compatible {
                tracing::trace!(candidate = target.name(), "compatible");
            }
            compatible
        })
        .collect();

    if candidates.is_empty() {
        return db.get(machine).into_iter().collect();
    }
    candidates
}

/// More ancestors first, then more features.
fn rank(target: &Target<'_>) -> (usize, usize) {
    (target.ancestors().len(), target.features().len())
}

/// The single most specific descriptor compatible with `info`.
///
/// Never fails: when no descriptor is compatible the result is a fresh
/// generic placeholder named after `machine`.
pub fn host<'db>(db: &'db MicroarchDatabase, info: &DetectedCpuInfo, machine: &str) -> Target<'db> {
    let machine = normalize_machine(machine);
    let mut candidates = compatible_microarchitectures(db, info, machine);
    if candidates.is_empty() {
        tracing::debug!(machine, "no compatible microarchitecture, using generic placeholder");
        return db.bind(generic_microarchitecture(machine));
    }

    let best_generic = candidates
        .iter()
        .filter(|target| target.is_generic())
        .max_by_key(|target| rank(target))
        .cloned();

    if !info.cpu_part.is_empty() {
        let by_part: Vec<Target<'db>> = candidates
            .iter()
            .filter(|target| target.cpu_part() == info.cpu_part)
            .cloned()
            .collect();
        if !by_part.is_empty() {
            candidates = by_part;
        }
    }

    if let Some(best_generic) = &best_generic {
        let refined: Vec<Target<'db>> = candidates
            .iter()
            .filter(|target| *target > best_generic)
            .cloned()
            .collect();
        if !refined.is_empty() {
            candidates = refined;
        }
    }

    // max_by_key keeps the last of equally ranked candidates
    match candidates.into_iter().max_by_key(|target| rank(target)) {
        Some(target) => {
            tracing::debug!(host = target.name(), "selected host microarchitecture");
            target
        }
        None => db.bind(generic_microarchitecture(machine)),
    }
}

/// Probe the running machine and match it against `db`.
pub fn detect_cpu_info(db: &MicroarchDatabase) -> DetectedCpuInfo {
    cpuinfo::read_host_cpuinfo(db, machine())
}

/// [`host`] for the running machine.
pub fn host_for_machine(db: &MicroarchDatabase) -> Target<'_> {
    host(db, &detect_cpu_info(db), machine())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features_of(db: &MicroarchDatabase, name: &str) -> BTreeSet<String> {
        db.get(name).unwrap().features().clone()
    }

    #[test]
    fn normalize_known_aliases() {
        assert_eq!(normalize_machine("arm64"), "aarch64");
        assert_eq!(normalize_machine("amd64"), "x86_64");
        assert_eq!(normalize_machine("ppc64le"), "ppc64le");
    }

    #[test]
    fn machine_is_a_family_spelling() {
        let m = machine();
        assert!(!m.is_empty());
        assert_ne!(m, "arm64");
        assert_ne!(m, "powerpc64");
    }

    #[test]
    fn unknown_architecture_yields_placeholder() {
        let db = MicroarchDatabase::global();
        let info = DetectedCpuInfo::generic();
        assert!(compatible_microarchitectures(db, &info, "sparc64").is_empty());

        let target = host(db, &info, "sparc64");
        assert_eq!(target.name(), "sparc64");
        assert_eq!(target.vendor(), "generic");
        assert!(target.features().is_empty());
        assert!(target.ancestors().is_empty());
        assert_eq!(target.family(), "sparc64");
    }

    #[test]
    fn empty_store_yields_placeholder() {
        let db = MicroarchDatabase::empty();
        let target = host(&db, &DetectedCpuInfo::generic(), "x86_64");
        assert_eq!(target.name(), "x86_64");
        assert!(target.is_generic());
    }

    #[test]
    fn featureless_x86_signal_is_baseline() {
        let db = MicroarchDatabase::global();
        let info = DetectedCpuInfo {
            vendor: "GenuineIntel".into(),
            ..DetectedCpuInfo::default()
        };
        assert_eq!(host(db, &info, "x86_64").name(), "x86_64");
        assert_eq!(host(db, &info, "amd64").name(), "x86_64");
    }

    #[test]
    fn exact_feature_sets_map_back_to_themselves() {
        let db = MicroarchDatabase::global();
        for name in ["nehalem", "haswell", "skylake_avx512", "icelake", "zen", "zen2", "zen4"] {
            let target = db.get(name).unwrap();
            let info = DetectedCpuInfo {
                vendor: target.vendor().into(),
                features: target.features().clone(),
                ..DetectedCpuInfo::default()
            };
            assert_eq!(host(db, &info, "x86_64").name(), name);
        }
    }

    #[test]
    fn zen3_with_extra_feature_is_zen3() {
        let db = MicroarchDatabase::global();
        let mut features = features_of(db, "zen3");
        features.insert("some_future_extension".into());
        let info = DetectedCpuInfo {
            vendor: "AuthenticAMD".into(),
            features,
            ..DetectedCpuInfo::default()
        };
        let candidates = compatible_microarchitectures(db, &info, "x86_64");
        assert!(candidates.iter().any(|t| t.name() == "zen2"));
        assert!(!candidates.iter().any(|t| t.name() == "zen4"));
        assert_eq!(host(db, &info, "x86_64").name(), "zen3");
    }

    #[test]
    fn cpu_part_selects_arm_core() {
        let db = MicroarchDatabase::global();
        let info = DetectedCpuInfo {
            vendor: "ARM".into(),
            features: features_of(db, "neoverse_n1"),
            cpu_part: "0xd0c".into(),
            ..DetectedCpuInfo::default()
        };
        assert_eq!(host(db, &info, "aarch64").name(), "neoverse_n1");
    }

    #[test]
    fn apple_model_name() {
        let db = MicroarchDatabase::global();
        for name in ["m1", "m2", "m3", "m4"] {
            let info = DetectedCpuInfo {
                name: Some(name.into()),
                vendor: "Apple".into(),
                features: features_of(db, name),
                ..DetectedCpuInfo::default()
            };
            assert_eq!(host(db, &info, "arm64").name(), name);
        }
    }

    #[test]
    fn power_generation() {
        let db = MicroarchDatabase::global();
        let info = DetectedCpuInfo {
            generation: 9,
            ..DetectedCpuInfo::generic()
        };
        assert_eq!(host(db, &info, "ppc64le").name(), "power9le");
        assert_eq!(host(db, &info, "ppc64").name(), "power9");

        let unknown = DetectedCpuInfo::generic();
        assert_eq!(host(db, &unknown, "ppc64le").name(), "ppc64le");
    }

    #[test]
    fn riscv_by_name() {
        let db = MicroarchDatabase::global();
        let info = DetectedCpuInfo {
            name: Some("u74mc".into()),
            ..DetectedCpuInfo::generic()
        };
        assert_eq!(host(db, &info, "riscv64").name(), "u74mc");

        let info = DetectedCpuInfo {
            name: Some("riscv64".into()),
            ..DetectedCpuInfo::generic()
        };
        assert_eq!(host(db, &info, "riscv64").name(), "riscv64");
    }

    #[test]
    fn host_for_running_machine_is_valid() {
        let db = MicroarchDatabase::global();
        let target = host_for_machine(db);
        assert!(target.is_valid());
    }
}
