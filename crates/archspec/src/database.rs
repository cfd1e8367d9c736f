//! The microarchitecture database.
//!
//! A [`MicroarchDatabase`] holds every known descriptor plus the auxiliary
//! lookup tables of a descriptor document. It is filled by merging documents
//! and read-only afterwards. [`MicroarchDatabase::global`] gives the
//! process-wide instance built from the bundled document; callers that need
//! a different data set construct their own store and pass it around.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::OnceLock;

use crate::error::{ArchspecError, Result};
use crate::microarch::{Microarchitecture, SelectedEntry, Target};
use crate::schema::{self, DescriptorDocument, ValidationIssue};
use crate::version;

/// The descriptor document compiled into the crate.
pub const BUNDLED_DOCUMENT: &str = include_str!("../data/microarchitectures.json");

static GLOBAL: OnceLock<MicroarchDatabase> = OnceLock::new();

/// Known microarchitectures and their auxiliary tables.
#[derive(Debug, Clone, Default)]
pub struct MicroarchDatabase {
    targets: BTreeMap<String, Microarchitecture>,
    feature_aliases: BTreeMap<String, BTreeSet<String>>,
    family_features: BTreeMap<String, BTreeSet<String>>,
    darwin_flags: BTreeMap<String, String>,
    arm_vendors: BTreeMap<String, String>,
}

impl MicroarchDatabase {
    /// A store with no descriptors.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A fresh store loaded with the bundled document.
    pub fn bundled() -> Self {
        let mut db = Self::empty();
        if let Err(e) = db.load_from_str(BUNDLED_DOCUMENT) {
            tracing::error!("bundled microarchitecture document failed to load: {e}");
        }
        db
    }

    /// The process-wide store, loaded from the bundled document on first use.
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(|| {
            let db = Self::bundled();
            tracing::debug!(targets = db.len(), "initialized microarchitecture database");
            db
        })
    }

    /// Merge a JSON descriptor document into this store.
    ///
    /// The document is fully parsed and checked before anything is inserted,
    /// so on error the store is unchanged. Entries whose name is already
    /// present are skipped: the first document to define a name wins.
    pub fn load_from_str(&mut self, json: &str) -> Result<()> {
        let document = schema::load_document(json)?;
        self.merge(document);
        Ok(())
    }

    /// Merge the JSON descriptor document at `path` into this store.
    pub fn load_from_path(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(ArchspecError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        self.load_from_str(&content)
    }

    fn merge(&mut self, document: DescriptorDocument) {
        let before = self.targets.len();
        for (name, entry) in document.microarchitectures {
            if self.targets.contains_key(&name) {
                tracing::trace!(name, "skipping already loaded microarchitecture");
                continue;
            }
            let uarch = entry.into_microarchitecture(&name);
            self.targets.insert(name, uarch);
        }

        for (alias, entry) in document.feature_aliases {
            if let Some(any_of) = entry.any_of {
                self.feature_aliases
                    .entry(alias.clone())
                    .or_insert_with(|| any_of.into_iter().collect());
            }
            if let Some(families) = entry.families {
                self.family_features
                    .entry(alias)
                    .or_insert_with(|| families.into_iter().collect());
            }
        }

        for (raw, converted) in document.conversions.darwin_flags {
            self.darwin_flags.entry(raw).or_insert(converted);
        }
        for (code, vendor) in document.conversions.arm_vendors {
            self.arm_vendors.entry(code).or_insert(vendor);
        }

        tracing::debug!(
            added = self.targets.len() - before,
            total = self.targets.len(),
            "merged descriptor document"
        );
    }

    /// Look up a microarchitecture by name.
    pub fn get(&self, name: &str) -> Option<Target<'_>> {
        self.targets
            .get(name)
            .map(|uarch| Target::new(self, Cow::Borrowed(uarch)))
    }

    /// Look up the raw descriptor by name.
    pub fn microarchitecture(&self, name: &str) -> Option<&Microarchitecture> {
        self.targets.get(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }

    /// Bind a descriptor that is not stored here (e.g. a placeholder) so its
    /// ancestry resolves against this store.
    pub fn bind(&self, uarch: Microarchitecture) -> Target<'_> {
        Target::new(self, Cow::Owned(uarch))
    }

    /// All descriptors, keyed and ordered by name.
    pub fn all(&self) -> &BTreeMap<String, Microarchitecture> {
        &self.targets
    }

    /// All descriptor names in order.
    pub fn all_names(&self) -> Vec<&str> {
        self.targets.keys().map(String::as_str).collect()
    }

    /// Every descriptor as a [`Target`], ordered by name.
    pub fn targets(&self) -> impl Iterator<Item = Target<'_>> + '_ {
        self.targets
            .values()
            .map(move |uarch| Target::new(self, Cow::Borrowed(uarch)))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Alias name -> concrete features, any of which satisfies the alias.
    pub fn feature_aliases(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.feature_aliases
    }

    /// Feature name -> families whose members all have it.
    pub fn family_features(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.family_features
    }

    /// macOS flag combinations -> Linux-style feature names.
    pub fn darwin_flag_conversions(&self) -> &BTreeMap<String, String> {
        &self.darwin_flags
    }

    /// ARM implementer codes -> vendor names.
    pub fn arm_vendors(&self) -> &BTreeMap<String, String> {
        &self.arm_vendors
    }

    /// Descriptor names grouped by family.
    pub fn by_family(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (name, uarch) in &self.targets {
            let family = self.family_of(uarch);
            groups.entry(family).or_default().push(name.as_str());
        }
        groups
    }

    fn family_of<'a>(&'a self, uarch: &'a Microarchitecture) -> &'a str {
        if uarch.parent_names().is_empty() {
            return uarch.name();
        }
        let mut visiting = vec![uarch.name()];
        self.collect_ancestors(uarch.parent_names(), &mut visiting)
            .into_iter()
            .find(|name| {
                self.targets
                    .get(*name)
                    .is_some_and(|a| a.parent_names().is_empty())
            })
            .unwrap_or(uarch.name())
    }

    /// Graph-level problems that ingestion does not reject: parents that do
    /// not exist, parent cycles, and ancestries reaching more than one root.
    pub fn check_consistency(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for (name, uarch) in &self.targets {
            for parent in uarch.parent_names() {
                if !self.targets.contains_key(parent) {
                    issues.push(ValidationIssue {
                        severity: "warning",
                        message: format!("'{name}' names unknown parent '{parent}'"),
                    });
                }
            }

            let mut visiting = vec![name.as_str()];
            let ancestors = self.collect_ancestors(uarch.parent_names(), &mut visiting);
            if ancestors.contains(&name.as_str()) {
                issues.push(ValidationIssue {
                    severity: "error",
                    message: format!("'{name}' is its own ancestor"),
                });
            }

            let roots: Vec<&str> = ancestors
                .iter()
                .copied()
                .filter(|a| {
                    self.targets
                        .get(*a)
                        .is_some_and(|t| t.parent_names().is_empty())
                })
                .collect();
            if roots.len() > 1 {
                issues.push(ValidationIssue {
                    severity: "warning",
                    message: format!(
                        "'{name}' descends from several roots ({}); family resolves to '{}'",
                        roots.join(", "),
                        roots[0]
                    ),
                });
            }
        }

        issues
    }

    /// Breadth-first ancestor collection. Names on `visiting` are not
    /// expanded again, so cyclic data terminates.
    pub(crate) fn collect_ancestors<'a>(
        &'a self,
        parents: &'a [String],
        visiting: &mut Vec<&'a str>,
    ) -> Vec<&'a str> {
        let mut result: Vec<&'a str> = Vec::new();
        for parent in parents {
            if !result.contains(&parent.as_str()) {
                result.push(parent);
            }
        }
        for parent in parents {
            if visiting.contains(&parent.as_str()) {
                continue;
            }
            let Some(uarch) = self.targets.get(parent) else {
                continue;
            };
            visiting.push(parent);
            for ancestor in self.collect_ancestors(uarch.parent_names(), visiting) {
                if !result.contains(&ancestor) {
                    result.push(ancestor);
                }
            }
            visiting.pop();
        }
        result
    }

    /// First matching entry of `uarch`'s own table, else the first hit when
    /// querying each ancestor in turn.
    pub(crate) fn select_entry<'a>(
        &'a self,
        uarch: &'a Microarchitecture,
        compiler: &str,
        version: &str,
        visiting: &mut Vec<&'a str>,
    ) -> Option<SelectedEntry<'a>> {
        let own = uarch
            .compilers()
            .get(compiler)
            .and_then(|entries| {
                entries
                    .iter()
                    .find(|entry| version::satisfies(&entry.versions, version))
            });
        if let Some(entry) = own {
            return Some(SelectedEntry {
                owner: uarch.name(),
                entry,
            });
        }

        let ancestors = self.collect_ancestors(uarch.parent_names(), visiting);
        for name in ancestors {
            if visiting.contains(&name) {
                continue;
            }
            let Some(ancestor) = self.targets.get(name) else {
                continue;
            };
            visiting.push(name);
            let selected = self.select_entry(ancestor, compiler, version, visiting);
            visiting.pop();
            if selected.is_some() {
                return selected;
            }
        }
        None
    }
}
