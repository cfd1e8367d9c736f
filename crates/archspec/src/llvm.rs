//! Translation between descriptor names and LLVM's vocabulary.
//!
//! The descriptor data follows the Linux `/proc/cpuinfo` spelling of
//! features and its own naming of CPUs; LLVM spells many of them
//! differently (`asimd` is `neon`, `zen3` is `znver3`). The tables here are
//! per architecture family and stateless.

use std::collections::BTreeSet;

use crate::database::MicroarchDatabase;
use crate::microarch::Target;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LlvmFamily {
    Aarch64,
    X86,
    RiscV,
    Other,
}

impl LlvmFamily {
    fn of(family: &str) -> Self {
        match family {
            "aarch64" => LlvmFamily::Aarch64,
            "x86_64" | "x86" => LlvmFamily::X86,
            "riscv64" | "riscv32" => LlvmFamily::RiscV,
            _ => LlvmFamily::Other,
        }
    }
}

/// Features with no LLVM counterpart, or implied by another enabled one.
fn is_filtered(family: LlvmFamily, feature: &str) -> bool {
    match family {
        LlvmFamily::Aarch64 => matches!(
            feature,
            "cpuid"
                | "dcpodp"
                | "dcpop"
                | "dgh"
                | "evtstrm"
                | "flagm2"
                | "frint"
                | "uscat"
                | "sha1"
                | "sha512"
                | "pmull"
                // implied by sve + bf16 / sve + i8mm
                | "svebf16"
                | "svei8mm"
        ),
        LlvmFamily::X86 => matches!(feature, "3dnow" | "3dnowext" | "avx512er" | "avx512pf"),
        LlvmFamily::RiscV | LlvmFamily::Other => false,
    }
}

fn renamed_feature(family: LlvmFamily, feature: &str) -> Option<&'static str> {
    let renamed = match family {
        LlvmFamily::Aarch64 => match feature {
            "asimd" => "neon",
            "asimddp" => "dotprod",
            "asimdfhm" => "fp16fml",
            "asimdhp" | "fphp" => "fullfp16",
            "asimdrdm" => "rdm",
            "atomics" => "lse",
            "crc32" => "crc",
            "fcma" => "complxnum",
            "fp" => "fp-armv8",
            "jscvt" => "jsconv",
            "lrcpc" => "rcpc",
            "ilrcpc" => "rcpc-immo",
            "paca" | "pacg" => "pauth",
            "rng" => "rand",
            _ => return None,
        },
        LlvmFamily::X86 => match feature {
            "sse4_1" => "sse4.1",
            "sse4_2" => "sse4.2",
            "avx512_vnni" => "avx512vnni",
            "avx512_bf16" => "avx512bf16",
            "avx512_vbmi" => "avx512vbmi",
            "avx512_vbmi2" => "avx512vbmi2",
            "avx512_ifma" => "avx512ifma",
            "avx512_vpopcntdq" => "avx512vpopcntdq",
            "avx512_vp2intersect" => "avx512vp2intersect",
            "avx512_bitalg" => "avx512bitalg",
            "avx_vnni" => "avxvnni",
            "lahf_lm" => "sahf",
            "pclmulqdq" => "pclmul",
            "rdrand" => "rdrnd",
            "abm" => "lzcnt",
            "bmi1" => "bmi",
            "sha_ni" => "sha",
            "amx_bf16" => "amx-bf16",
            "amx_int8" => "amx-int8",
            "amx_tile" => "amx-tile",
            _ => return None,
        },
        // RISC-V extension names already match
        LlvmFamily::RiscV | LlvmFamily::Other => return None,
    };
    Some(renamed)
}

/// LLVM spelling of `feature` on `family`.
///
/// `None` means the feature has no LLVM counterpart and must be dropped.
/// Names without a known mapping pass through unchanged.
pub fn map_feature_to_llvm<'a>(family: &str, feature: &'a str) -> Option<&'a str> {
    let family = LlvmFamily::of(family);
    if is_filtered(family, feature) {
        return None;
    }
    Some(renamed_feature(family, feature).unwrap_or(feature))
}

/// The target's features in LLVM spelling.
pub fn get_llvm_features(target: &Target<'_>) -> BTreeSet<String> {
    let family = target.family();
    target
        .features()
        .iter()
        .filter_map(|feature| map_feature_to_llvm(family, feature))
        .map(str::to_string)
        .collect()
}

/// The target's features as an LLVM feature string, e.g. `+avx,+avx2`.
pub fn get_llvm_features_string(target: &Target<'_>) -> String {
    get_llvm_features(target)
        .iter()
        .map(|feature| format!("+{feature}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn aarch64_cpu(name: &str) -> Option<&'static str> {
    let llvm = match name {
        "m1" | "m1_pro" | "m1_max" | "m1_ultra" => "apple-m1",
        "m2" | "m2_pro" | "m2_max" | "m2_ultra" => "apple-m2",
        "m3" | "m3_pro" | "m3_max" | "m3_ultra" => "apple-m3",
        "m4" | "m4_pro" | "m4_max" => "apple-m4",
        "a7" => "apple-a7",
        "a8" => "apple-a8",
        "a9" => "apple-a9",
        "a10" => "apple-a10",
        "a11" => "apple-a11",
        "a12" => "apple-a12",
        "a13" => "apple-a13",
        "a14" => "apple-a14",
        "a15" => "apple-a15",
        "a16" => "apple-a16",
        "a17" => "apple-a17",
        "thunderx2" => "thunderx2t99",
        "thunderx3" => "thunderx3t110",
        _ => return None,
    };
    Some(llvm)
}

fn x86_cpu(name: &str) -> Option<&'static str> {
    let llvm = match name {
        "zen" => "znver1",
        "zen2" => "znver2",
        "zen3" => "znver3",
        "zen4" => "znver4",
        "icelake" => "icelake-client",
        "icelake_server" => "icelake-server",
        "sapphirerapids" => "sapphirerapids",
        "alderlake" => "alderlake",
        "meteorlake" => "meteorlake",
        _ => return None,
    };
    Some(llvm)
}

/// LLVM's name for the target's CPU.
pub fn get_llvm_cpu_name(target: &Target<'_>) -> String {
    let name = target.name();
    let mapped = match LlvmFamily::of(target.family()) {
        LlvmFamily::Aarch64 => {
            let apple = matches!(target.vendor(), "Apple" | "apple");
            match aarch64_cpu(name) {
                Some(llvm) => Some(llvm.to_string()),
                // unlisted Apple parts follow the same naming scheme
                None if apple && (name.starts_with('m') || name.starts_with('a')) => {
                    Some(format!("apple-{name}"))
                }
                None => None,
            }
        }
        LlvmFamily::X86 => x86_cpu(name).map(str::to_string),
        LlvmFamily::RiscV | LlvmFamily::Other => None,
    };
    mapped.unwrap_or_else(|| name.to_string())
}

fn aarch64_cpu_reverse(llvm_name: &str) -> Option<&'static str> {
    let name = match llvm_name {
        "apple-m1" => "m1",
        "apple-m2" => "m2",
        "apple-m3" => "m3",
        "apple-m4" => "m4",
        "apple-a7" => "a7",
        "apple-a8" => "a8",
        "apple-a9" => "a9",
        "apple-a10" => "a10",
        "apple-a11" => "a11",
        "apple-a12" => "a12",
        "apple-a13" => "a13",
        "apple-a14" => "a14",
        "apple-a15" => "a15",
        "apple-a16" => "a16",
        "apple-a17" => "a17",
        // thunderx3 has no descriptor of its own
        "thunderx2t99" | "thunderx3t110" => "thunderx2",
        "cortex-a35" | "cortex-a53" | "cortex-a55" | "cortex-a57" | "cortex-a65" => "aarch64",
        "cortex-a72" | "cortex-a73" | "cortex-a75" | "cortex-a76" | "cortex-a77"
        | "cortex-a78" | "cortex-a710" | "cortex-x1" | "cortex-x2" | "cortex-x3" => "cortex_a72",
        "neoverse-n1" => "neoverse_n1",
        "neoverse-n2" => "neoverse_n2",
        "neoverse-v1" => "neoverse_v1",
        "neoverse-v2" => "neoverse_v2",
        "carmel" => "aarch64",
        "ampere1" | "ampere1a" => "neoverse_n1",
        _ => return None,
    };
    Some(name)
}

fn x86_cpu_reverse(llvm_name: &str) -> Option<&'static str> {
    let name = match llvm_name {
        "znver1" => "zen",
        "znver2" => "zen2",
        "znver3" => "zen3",
        "znver4" => "zen4",
        "icelake-client" => "icelake",
        "icelake-server" => "icelake_server",
        "skylake-avx512" => "skylake_avx512",
        "cascadelake" => "cascadelake",
        "cooperlake" => "cooperlake",
        _ => return None,
    };
    Some(name)
}

/// Descriptor name for an LLVM CPU name on `family`.
///
/// Falls back to stripping `apple-` and turning hyphens into underscores;
/// names of other families are returned unchanged.
pub fn normalize_cpu_name(family: &str, llvm_name: &str) -> String {
    match LlvmFamily::of(family) {
        LlvmFamily::Aarch64 => {
            if let Some(name) = aarch64_cpu_reverse(llvm_name) {
                name.to_string()
            } else if let Some(model) = llvm_name.strip_prefix("apple-") {
                model.to_string()
            } else if llvm_name.starts_with("cortex-") || llvm_name.starts_with("neoverse-") {
                llvm_name.replace('-', "_")
            } else {
                llvm_name.to_string()
            }
        }
        LlvmFamily::X86 => match x86_cpu_reverse(llvm_name) {
            Some(name) => name.to_string(),
            None => llvm_name.replace('-', "_"),
        },
        LlvmFamily::RiscV | LlvmFamily::Other => llvm_name.to_string(),
    }
}

/// LLVM feature string for a CPU named either way.
///
/// Tries `name` as given, then its normalized form, then lowercased. Empty
/// for `native`, `generic` and names that resolve to nothing.
pub fn get_llvm_features_for_cpu(db: &MicroarchDatabase, name: &str, family: &str) -> String {
    if matches!(name, "native" | "generic") {
        return String::new();
    }

    let normalized = normalize_cpu_name(family, name);
    let lowercase = name.to_lowercase();
    let found = [name, normalized.as_str(), lowercase.as_str()]
        .into_iter()
        .find_map(|candidate| db.get(candidate));

    match found {
        Some(target) => get_llvm_features_string(&target),
        None => {
            tracing::debug!(name, family, "no descriptor for LLVM CPU name");
            String::new()
        }
    }
}
