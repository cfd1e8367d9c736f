//! Per-architecture compatibility predicates.
//!
//! Each predicate decides whether a stored descriptor could describe the CPU
//! a [`DetectedCpuInfo`] was taken from. They are built from three checks:
//! family membership, vendor compatibility and feature containment.

use crate::database::MicroarchDatabase;
use crate::microarch::Target;

use super::{DetectedCpuInfo, ARCH_AARCH64, ARCH_RISCV64, ARCH_X86_64};

/// What a predicate sees: the store, the signal and the machine it came from.
pub(crate) struct Probe<'a> {
    pub db: &'a MicroarchDatabase,
    pub info: &'a DetectedCpuInfo,
    pub machine: &'a str,
}

pub(crate) type Predicate = fn(&Probe<'_>, &Target<'_>) -> bool;

/// The predicate for `machine`, or `None` for architectures without rules.
pub(crate) fn predicate_for(machine: &str) -> Option<Predicate> {
    match machine {
        "x86_64" | "i686" | "i386" => Some(check_x86_64),
        "aarch64" => Some(check_aarch64),
        "ppc64" | "ppc64le" => Some(check_ppc64),
        "riscv64" => Some(check_riscv64),
        _ => None,
    }
}

/// `target` is `family` or descends from it, and `family` is a known root.
fn in_family(db: &MicroarchDatabase, target: &Target<'_>, family: &str) -> bool {
    if !db.exists(family) {
        return false;
    }
    target.name() == family || target.ancestors().contains(&family)
}

fn vendor_matches(info: &DetectedCpuInfo, target: &Target<'_>) -> bool {
    target.is_generic() || target.vendor() == info.vendor
}

fn features_contained(info: &DetectedCpuInfo, target: &Target<'_>) -> bool {
    target.features().is_subset(&info.features)
}

fn check_x86_64(probe: &Probe<'_>, target: &Target<'_>) -> bool {
    in_family(probe.db, target, ARCH_X86_64)
        && vendor_matches(probe.info, target)
        && features_contained(probe.info, target)
}

fn check_aarch64(probe: &Probe<'_>, target: &Target<'_>) -> bool {
    if !in_family(probe.db, target, ARCH_AARCH64) || !vendor_matches(probe.info, target) {
        return false;
    }
    if target.name() == ARCH_AARCH64 {
        return true;
    }
    if target.is_generic() {
        return features_contained(probe.info, target);
    }

    // A named model (macOS reports one) is matched through its ancestry
    // instead of by features.
    let model = probe
        .info
        .name
        .as_deref()
        .and_then(|name| probe.db.get(name));
    match model {
        Some(model) => {
            target.name() == model.name() || model.ancestors().contains(&target.name())
        }
        None => features_contained(probe.info, target),
    }
}

fn check_ppc64(probe: &Probe<'_>, target: &Target<'_>) -> bool {
    in_family(probe.db, target, probe.machine) && target.generation() <= probe.info.generation
}

fn check_riscv64(probe: &Probe<'_>, target: &Target<'_>) -> bool {
    in_family(probe.db, target, ARCH_RISCV64)
        && (probe.info.name.as_deref() == Some(target.name()) || target.is_generic())
}
