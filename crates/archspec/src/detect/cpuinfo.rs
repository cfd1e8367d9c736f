//! Turning platform reports into a [`DetectedCpuInfo`].
//!
//! Linux exposes the CPU through `/proc/cpuinfo`; macOS reports sysctl
//! feature names that differ from the Linux spelling and are converted
//! through the database's `darwin_flags` table.

use std::collections::{BTreeMap, BTreeSet};

use crate::database::MicroarchDatabase;
use crate::microarch::GENERIC_VENDOR;

use super::{DetectedCpuInfo, ARCH_AARCH64, ARCH_PPC64, ARCH_PPC64LE, ARCH_RISCV64};

/// Key/value pairs of the first processor block.
fn first_block(text: &str) -> BTreeMap<&str, &str> {
    let mut fields = BTreeMap::new();
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            if !fields.is_empty() {
                break;
            }
            continue;
        };
        fields.insert(key.trim(), value.trim());
    }
    fields
}

fn split_flags(value: &str) -> BTreeSet<String> {
    value.split_whitespace().map(str::to_string).collect()
}

/// First `POWER<digits>` in `cpu`, e.g. `POWER9 (architected)` -> 9.
fn power_generation(cpu: &str) -> u32 {
    let mut rest = cpu;
    while let Some(pos) = rest.find("POWER") {
        rest = &rest[pos + "POWER".len()..];
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        if let Ok(generation) = digits.parse() {
            return generation;
        }
    }
    0
}

/// Parse `/proc/cpuinfo` text as reported on `machine`.
///
/// Only the first processor block is read. ARM implementer codes are
/// resolved to vendor names through `db`.
pub fn parse_cpuinfo(text: &str, machine: &str, db: &MicroarchDatabase) -> DetectedCpuInfo {
    let fields = first_block(text);
    let mut info = DetectedCpuInfo::default();

    match super::normalize_machine(machine) {
        "x86_64" | "i686" | "i386" => {
            info.vendor = fields
                .get("vendor_id")
                .map_or(GENERIC_VENDOR, |v| *v)
                .to_string();
            if let Some(flags) = fields.get("flags") {
                info.features = split_flags(flags);
            }
            // the kernel reports SSE3 as "pni"
            if info.features.contains("ssse3") {
                info.features.insert("sse3".into());
            }
        }
        ARCH_AARCH64 => {
            info.vendor = match fields.get("CPU implementer") {
                Some(code) => db
                    .arm_vendors()
                    .get(*code)
                    .cloned()
                    .unwrap_or_else(|| code.to_string()),
                None => GENERIC_VENDOR.into(),
            };
            if let Some(features) = fields.get("Features") {
                info.features = split_flags(features);
            }
            info.cpu_part = fields.get("CPU part").map(|p| p.to_string()).unwrap_or_default();
        }
        ARCH_PPC64 | ARCH_PPC64LE => {
            info.generation = fields.get("cpu").map_or(0, |cpu| power_generation(cpu));
        }
        ARCH_RISCV64 => {
            let name = match fields.get("uarch") {
                Some(&"sifive,u74-mc") => "u74mc",
                Some(uarch) => *uarch,
                None => ARCH_RISCV64,
            };
            info.name = Some(name.to_string());
        }
        other => {
            tracing::debug!(machine = other, "no cpuinfo rules for architecture");
        }
    }

    info
}

/// Convert macOS sysctl feature names to the Linux spelling.
///
/// Each conversion key is a space-separated set of raw flags; when all of
/// them are present, every name in the converted value is added. The raw
/// flags (lowercased) are always kept.
pub fn convert_darwin_flags(raw: &str, db: &MicroarchDatabase) -> BTreeSet<String> {
    let raw_flags = split_flags(&raw.to_lowercase());
    let mut features = BTreeSet::new();

    for (darwin, linux) in db.darwin_flag_conversions() {
        if darwin
            .split_whitespace()
            .all(|part| raw_flags.contains(part))
        {
            features.extend(linux.split_whitespace().map(str::to_string));
        }
    }
    features.extend(raw_flags);
    features
}

/// Apple Silicon model from a `machdep.cpu.brand_string` value.
///
/// Unrecognized Apple parts fall back to `m1`; non-Apple brands yield `None`.
pub fn apple_model_from_brand(brand: &str) -> Option<&'static str> {
    let brand = brand.to_lowercase();
    ["m4", "m3", "m2", "m1"]
        .into_iter()
        .find(|model| brand.contains(model))
        .or_else(|| brand.contains("apple").then_some("m1"))
}

/// Read the running machine's CPU report.
#[cfg(target_os = "linux")]
pub(crate) fn read_host_cpuinfo(db: &MicroarchDatabase, machine: &str) -> DetectedCpuInfo {
    match std::fs::read_to_string("/proc/cpuinfo") {
        Ok(text) => parse_cpuinfo(&text, machine, db),
        Err(e) => {
            tracing::debug!("cannot read /proc/cpuinfo: {e}");
            DetectedCpuInfo::generic()
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn read_host_cpuinfo(_db: &MicroarchDatabase, machine: &str) -> DetectedCpuInfo {
    tracing::debug!(machine, "no cpuinfo source on this platform");
    DetectedCpuInfo::generic()
}
