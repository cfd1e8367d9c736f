//! Microarchitecture model.
//!
//! A [`Microarchitecture`] is an immutable value describing one named CPU
//! generation: vendor, flat feature set, parent links and per-compiler flag
//! tables. Queries that need the rest of the ancestry graph (ancestors,
//! family, feature aliases, flag fallback) go through a [`Target`], which
//! binds a descriptor to the [`MicroarchDatabase`] it is resolved against.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::database::MicroarchDatabase;

/// Vendor string of architecture-level, vendor-neutral descriptors.
pub const GENERIC_VENDOR: &str = "generic";

fn any_version() -> String {
    ":".into()
}

/// One version-range entry of a compiler table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerEntry {
    /// Version constraint, e.g. `"4.9:"` or `"3.9:11.1"`.
    #[serde(default = "any_version")]
    pub versions: String,
    /// Compiler-specific spelling of the target; empty means the descriptor name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Flag template, may contain a `{name}` placeholder.
    #[serde(default)]
    pub flags: String,
    /// Caveat to report when this entry is selected.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub warnings: String,
}

impl CompilerEntry {
    /// Render the flag template for a descriptor called `target_name`.
    pub fn render(&self, target_name: &str) -> String {
        let name = if self.name.is_empty() {
            target_name
        } else {
            &self.name
        };
        self.flags.replace("{name}", name)
    }
}

/// A named CPU microarchitecture.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Microarchitecture {
    name: String,
    #[serde(rename = "from")]
    parents: Vec<String>,
    vendor: String,
    features: BTreeSet<String>,
    compilers: BTreeMap<String, Vec<CompilerEntry>>,
    generation: u32,
    #[serde(rename = "cpupart")]
    cpu_part: String,
}

impl Microarchitecture {
    /// Create a descriptor with no parents, features or compiler support.
    pub fn new(name: impl Into<String>, vendor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vendor: vendor.into(),
            ..Self::default()
        }
    }

    /// Set the direct parents, in declaration order.
    pub fn with_parents<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parents = parents.into_iter().map(Into::into).collect();
        self
    }

    /// Set the feature set.
    ///
    /// `ssse3` implies `sse3`: the bundled feature lists rely on this.
    pub fn with_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features = features.into_iter().map(Into::into).collect();
        if self.features.contains("ssse3") {
            self.features.insert("sse3".into());
        }
        self
    }

    /// Set the compiler table.
    pub fn with_compilers(mut self, compilers: BTreeMap<String, Vec<CompilerEntry>>) -> Self {
        self.compilers = compilers;
        self
    }

    /// Set the POWER generation.
    pub fn with_generation(mut self, generation: u32) -> Self {
        self.generation = generation;
        self
    }

    /// Set the ARM `CPU part` code.
    pub fn with_cpu_part(mut self, cpu_part: impl Into<String>) -> Self {
        self.cpu_part = cpu_part.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn features(&self) -> &BTreeSet<String> {
        &self.features
    }

    pub fn parent_names(&self) -> &[String] {
        &self.parents
    }

    pub fn compilers(&self) -> &BTreeMap<String, Vec<CompilerEntry>> {
        &self.compilers
    }

    /// POWER generation; 0 on other families.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// ARM part number; empty on other families.
    pub fn cpu_part(&self) -> &str {
        &self.cpu_part
    }

    /// Whether the vendor is the vendor-neutral sentinel.
    pub fn is_generic(&self) -> bool {
        self.vendor == GENERIC_VENDOR
    }

    /// A default-constructed descriptor has an empty name.
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
    }
}

/// Structural equality; the compiler table does not take part.
impl PartialEq for Microarchitecture {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.vendor == other.vendor
            && self.features == other.features
            && self.parents == other.parents
            && self.generation == other.generation
            && self.cpu_part == other.cpu_part
    }
}

impl Eq for Microarchitecture {}

impl fmt::Display for Microarchitecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A featureless, parentless placeholder for an architecture.
pub fn generic_microarchitecture(name: &str) -> Microarchitecture {
    Microarchitecture::new(name, GENERIC_VENDOR)
}

/// The compiler entry chosen for a query, together with the descriptor that
/// declared it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedEntry<'a> {
    /// Name of the descriptor whose table matched (self or an ancestor).
    pub owner: &'a str,
    pub entry: &'a CompilerEntry,
}

impl SelectedEntry<'_> {
    /// The rendered flags.
    pub fn flags(&self) -> String {
        self.entry.render(self.owner)
    }
}

/// A microarchitecture bound to the database its ancestry is resolved in.
///
/// Targets obtained from [`MicroarchDatabase::get`] borrow the stored
/// descriptor; the placeholder returned by host detection owns its own.
#[derive(Debug, Clone)]
pub struct Target<'db> {
    db: &'db MicroarchDatabase,
    uarch: Cow<'db, Microarchitecture>,
}

impl<'db> Target<'db> {
    pub(crate) fn new(db: &'db MicroarchDatabase, uarch: Cow<'db, Microarchitecture>) -> Self {
        Self { db, uarch }
    }

    /// The database this target resolves names against.
    pub fn database(&self) -> &'db MicroarchDatabase {
        self.db
    }

    pub fn microarchitecture(&self) -> &Microarchitecture {
        &self.uarch
    }

    pub fn into_owned(self) -> Microarchitecture {
        self.uarch.into_owned()
    }

    /// All ancestors without duplicates: direct parents in declaration order,
    /// then each parent's own ancestors in turn.
    ///
    /// Empty for roots.
    pub fn ancestors(&self) -> Vec<&str> {
        let mut visiting = vec![self.uarch.name()];
        self.db
            .collect_ancestors(self.uarch.parent_names(), &mut visiting)
    }

    /// The root of this target's ancestry tree.
    ///
    /// If the data yields several roots, the first one in [`ancestors`]
    /// order wins.
    ///
    /// [`ancestors`]: Target::ancestors
    pub fn family(&self) -> &str {
        if self.uarch.parent_names().is_empty() {
            return self.uarch.name();
        }
        let ancestors = self.ancestors();
        ancestors
            .iter()
            .copied()
            .find(|name| {
                self.db
                    .microarchitecture(name)
                    .is_some_and(|a| a.parent_names().is_empty())
            })
            .unwrap_or(self.uarch.name())
    }

    /// The most specific generic target this one is compatible with.
    pub fn generic(&self) -> &str {
        if self.uarch.is_generic() {
            return self.uarch.name();
        }
        let mut best: Option<(&str, usize)> = None;
        for name in self.ancestors() {
            let Some(ancestor) = self.db.get(name) else {
                continue;
            };
            if !ancestor.is_generic() {
                continue;
            }
            let depth = ancestor.ancestors().len();
            if best.map_or(true, |(_, best_depth)| depth > best_depth) {
                best = Some((name, depth));
            }
        }
        match best {
            Some((name, _)) => name,
            None => self.family(),
        }
    }

    /// Whether `feature` is supported, directly, through an alias, or
    /// because every member of this target's family has it.
    pub fn has_feature(&self, feature: &str) -> bool {
        if self.uarch.features().contains(feature) {
            return true;
        }
        if let Some(any_of) = self.db.feature_aliases().get(feature) {
            if any_of.iter().any(|f| self.uarch.features().contains(f)) {
                return true;
            }
        }
        if let Some(families) = self.db.family_features().get(feature) {
            if families.contains(self.family()) {
                return true;
            }
        }
        false
    }

    /// Own name plus every ancestor.
    fn to_set(&self) -> BTreeSet<&str> {
        let mut set: BTreeSet<&str> = self.ancestors().into_iter().collect();
        set.insert(self.uarch.name());
        set
    }

    /// Whether `self` is a strict generalization of `other`.
    pub fn is_ancestor_set_of(&self, other: &Target<'_>) -> bool {
        let mine = self.to_set();
        let theirs = other.to_set();
        mine.len() < theirs.len() && mine.is_subset(&theirs)
    }

    /// The compiler entry that applies for `compiler` at `version`, falling
    /// back through the ancestors when this target's own table has none.
    pub fn compiler_entry(&self, compiler: &str, version: &str) -> Option<SelectedEntry<'_>> {
        let mut visiting = vec![self.uarch.name()];
        self.db
            .select_entry(&self.uarch, compiler, version, &mut visiting)
    }

    /// Optimization flags for `compiler` at `version`; empty when neither
    /// this target nor any ancestor supports it.
    pub fn optimization_flags(&self, compiler: &str, version: &str) -> String {
        let Some(selected) = self.compiler_entry(compiler, version) else {
            tracing::debug!(
                uarch = self.uarch.name(),
                compiler,
                version,
                "no compiler entry applies"
            );
            return String::new();
        };
        if !selected.entry.warnings.is_empty() {
            tracing::warn!(
                uarch = self.uarch.name(),
                compiler,
                version,
                "{}",
                selected.entry.warnings
            );
        }
        selected.flags()
    }
}

impl Deref for Target<'_> {
    type Target = Microarchitecture;

    fn deref(&self) -> &Microarchitecture {
        &self.uarch
    }
}

impl fmt::Display for Target<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.uarch.fmt(f)
    }
}

impl PartialEq for Target<'_> {
    fn eq(&self, other: &Self) -> bool {
        *self.uarch == *other.uarch
    }
}

/// Partial order by ancestry: `a < b` iff `a` and its ancestors form a proper
/// subset of `b` and its ancestors. Targets on unrelated branches compare as
/// `None`.
impl PartialOrd for Target<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            Some(Ordering::Equal)
        } else if self.is_ancestor_set_of(other) {
            Some(Ordering::Less)
        } else if other.is_ancestor_set_of(self) {
            Some(Ordering::Greater)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> &'static MicroarchDatabase {
        MicroarchDatabase::global()
    }

    #[test]
    fn ssse3_implies_sse3() {
        let uarch = Microarchitecture::new("test", "GenuineIntel").with_features(["ssse3"]);
        assert!(uarch.features().contains("sse3"));

        let uarch = Microarchitecture::new("test", "GenuineIntel").with_features(["sse2"]);
        assert!(!uarch.features().contains("sse3"));
    }

    #[test]
    fn generic_placeholder() {
        let uarch = generic_microarchitecture("test_arch");
        assert_eq!(uarch.name(), "test_arch");
        assert_eq!(uarch.vendor(), GENERIC_VENDOR);
        assert!(uarch.features().is_empty());
        assert!(uarch.parent_names().is_empty());
        assert!(uarch.is_valid());
        assert!(!Microarchitecture::default().is_valid());
    }

    #[test]
    fn equality_ignores_compilers_but_not_features() {
        let mut compilers = BTreeMap::new();
        compilers.insert(
            "gcc".to_string(),
            vec![CompilerEntry {
                versions: ":".into(),
                name: String::new(),
                flags: "-march={name}".into(),
                warnings: String::new(),
            }],
        );
        let a = Microarchitecture::new("x", "generic").with_features(["a"]);
        let b = a.clone().with_compilers(compilers);
        assert_eq!(a, b);

        let c = Microarchitecture::new("x", "generic").with_features(["b"]);
        assert_ne!(a, c);
    }

    #[test]
    fn render_uses_override_name() {
        let entry = CompilerEntry {
            versions: "4.9:".into(),
            name: "core-avx2".into(),
            flags: "-march={name} -mtune={name}".into(),
            warnings: String::new(),
        };
        assert_eq!(entry.render("haswell"), "-march=core-avx2 -mtune=core-avx2");

        let entry = CompilerEntry {
            name: String::new(),
            ..entry
        };
        assert_eq!(entry.render("haswell"), "-march=haswell -mtune=haswell");
    }

    #[test]
    fn haswell_ancestry() {
        let haswell = db().get("haswell").unwrap();
        let ancestors = haswell.ancestors();
        // direct parents come first, in declaration order
        assert_eq!(&ancestors[..2], &["ivybridge", "x86_64_v3"]);
        assert!(ancestors.contains(&"x86_64"));
        let unique: BTreeSet<_> = ancestors.iter().collect();
        assert_eq!(unique.len(), ancestors.len());
        assert_eq!(haswell.family(), "x86_64");
    }

    #[test]
    fn root_has_no_ancestors_and_is_its_own_family() {
        let x86_64 = db().get("x86_64").unwrap();
        assert!(x86_64.ancestors().is_empty());
        assert_eq!(x86_64.family(), "x86_64");
        assert_eq!(x86_64.generic(), "x86_64");
    }

    #[test]
    fn families_of_other_architectures() {
        assert_eq!(db().get("m1").unwrap().family(), "aarch64");
        assert_eq!(db().get("power9le").unwrap().family(), "ppc64le");
        assert_eq!(db().get("power9").unwrap().family(), "ppc64");
        assert_eq!(db().get("u74mc").unwrap().family(), "riscv64");
    }

    #[test]
    fn generic_picks_most_specific_generic_ancestor() {
        assert_eq!(db().get("skylake").unwrap().generic(), "x86_64_v3");
        assert_eq!(db().get("zen4").unwrap().generic(), "x86_64_v4");
        assert_eq!(db().get("nocona").unwrap().generic(), "x86_64");
        assert_eq!(db().get("neoverse_n1").unwrap().generic(), "armv8.2a");
        // no generic ancestor other than the root
        assert_eq!(db().get("power9le").unwrap().generic(), "ppc64le");
    }

    #[test]
    fn generic_falls_back_to_family() {
        let mut db = MicroarchDatabase::empty();
        db.load_from_str(
            r#"{"microarchitectures": {
                "root": {"vendor": "Acme"},
                "leaf": {"from": ["root"], "vendor": "Acme"}
            }}"#,
        )
        .unwrap();
        assert_eq!(db.get("leaf").unwrap().generic(), "root");
    }

    #[test]
    fn has_feature_direct_alias_and_family() {
        let haswell = db().get("haswell").unwrap();
        assert!(haswell.has_feature("avx2"));
        assert!(haswell.has_feature("fma"));
        assert!(haswell.has_feature("sse4_1"));
        assert!(haswell.has_feature("sse3"));
        // alias of sse4_1
        assert!(haswell.has_feature("sse4.1"));
        assert!(!haswell.has_feature("avx512"));

        let skx = db().get("skylake_avx512").unwrap();
        assert!(skx.has_feature("avx512"));

        // implied by family membership
        assert!(db().get("power9le").unwrap().has_feature("altivec"));
        assert!(db().get("m1").unwrap().has_feature("neon"));
        assert!(db().get("x86_64").unwrap().has_feature("sse2"));
        assert!(!db().get("x86_64").unwrap().has_feature("neon"));
    }

    #[test]
    fn alias_satisfied_by_any_member() {
        let mut db = MicroarchDatabase::empty();
        db.load_from_str(
            r#"{"microarchitectures": {
                    "root": {},
                    "one": {"from": ["root"], "vendor": "V", "features": ["f2"]}
                },
                "feature_aliases": {"alias": {"any_of": ["f1", "f2"]}}}"#,
        )
        .unwrap();
        let one = db.get("one").unwrap();
        assert!(one.has_feature("alias"));
        assert!(one.has_feature("f2"));
        // repeated queries agree
        assert!(one.has_feature("alias"));
        assert!(!db.get("root").unwrap().has_feature("alias"));
    }

    #[test]
    fn unknown_feature_is_never_supported() {
        for target in db().targets() {
            assert!(!target.has_feature("definitely_not_a_feature"));
        }
    }

    #[test]
    fn ordering_follows_ancestry() {
        let x86_64 = db().get("x86_64").unwrap();
        let haswell = db().get("haswell").unwrap();
        assert!(x86_64 < haswell);
        assert!(x86_64 <= haswell);
        assert!(haswell > x86_64);
        assert!(haswell >= x86_64);
        assert!(!(haswell < x86_64));
    }

    #[test]
    fn zen_lineage_and_incomparable_branches() {
        let zen4 = db().get("zen4").unwrap();
        let zen3 = db().get("zen3").unwrap();
        let x86_64 = db().get("x86_64").unwrap();
        let skylake = db().get("skylake").unwrap();

        assert!(zen4.ancestors().contains(&"zen3"));
        assert!(zen4 > zen3);
        assert!(zen4 > x86_64);
        assert!(!(skylake < zen4));
        assert!(!(skylake > zen4));
        assert_eq!(skylake.partial_cmp(&zen4), None);
        assert_ne!(skylake, zen4);
    }

    #[test]
    fn same_target_is_equal_not_less() {
        let a = db().get("haswell").unwrap();
        let b = db().get("haswell").unwrap();
        assert!(a == b);
        assert!(!(a != b));
        assert!(!(a < b));
        assert!(a <= b);
        assert!(a >= b);
    }

    #[test]
    fn optimization_flags_gcc() {
        let haswell = db().get("haswell").unwrap();
        let flags = haswell.optimization_flags("gcc", "10.0");
        assert!(flags.contains("haswell"), "{flags}");
        assert_eq!(flags, "-march=haswell -mtune=haswell");
        // older gcc spells it differently
        assert_eq!(
            haswell.optimization_flags("gcc", "4.8.2"),
            "-march=core-avx2 -mtune=core-avx2"
        );
    }

    #[test]
    fn optimization_flags_clang() {
        let skylake = db().get("skylake").unwrap();
        assert!(!skylake.optimization_flags("clang", "10.0").is_empty());
    }

    #[test]
    fn optimization_flags_fall_back_to_ancestors() {
        let zen3 = db().get("zen3").unwrap();
        // zen3 needs gcc 10.3, zen2 is supported from 9.0
        assert_eq!(
            zen3.optimization_flags("gcc", "9.5"),
            "-march=znver2 -mtune=znver2"
        );
        let selected = zen3.compiler_entry("gcc", "9.5").unwrap();
        assert_eq!(selected.owner, "zen2");
    }

    #[test]
    fn optimization_flags_fall_back_through_first_parent_chain() {
        // zen4's first parent chain (zen3 -> zen2) is searched before x86_64_v4
        let zen4 = db().get("zen4").unwrap();
        assert_eq!(
            zen4.optimization_flags("gcc", "9.1"),
            "-march=znver2 -mtune=znver2"
        );
    }

    #[test]
    fn optimization_flags_empty_when_nothing_applies() {
        let x86_64 = db().get("x86_64").unwrap();
        assert_eq!(x86_64.optimization_flags("gcc", "4.1"), "");
        assert_eq!(x86_64.optimization_flags("unknown-compiler", "1.0"), "");
        let nocona = db().get("nocona").unwrap();
        assert_eq!(nocona.optimization_flags("gcc", "3.4"), "");
    }

    #[test]
    fn selected_entry_exposes_warnings() {
        let zen3 = db().get("zen3").unwrap();
        let selected = zen3.compiler_entry("aocc", "2.3").unwrap();
        assert!(!selected.entry.warnings.is_empty());
        assert_eq!(zen3.optimization_flags("aocc", "2.3"), "-march=znver2 -mtune=znver2");
    }

    #[test]
    fn power_generation_and_arm_part() {
        assert_eq!(db().get("power9le").unwrap().generation(), 9);
        assert_eq!(db().get("power10le").unwrap().generation(), 10);
        assert_eq!(db().get("neoverse_n1").unwrap().cpu_part(), "0xd0c");
        assert_eq!(db().get("haswell").unwrap().cpu_part(), "");
    }
}
