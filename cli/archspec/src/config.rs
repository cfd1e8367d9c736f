//! `archspec.toml` configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use archspec::MicroarchDatabase;
use serde::{Deserialize, Serialize};

/// File name looked up in the working directory when `--config` is absent.
pub const CONFIG_FILE: &str = "archspec.toml";

/// The top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchspecConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub host: HostConfig,
}

/// Extra descriptor documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Documents merged after the bundled one, relative to the config file.
    #[serde(default)]
    pub extra: Vec<PathBuf>,
}

/// Defaults for `archspec flags` and `archspec host`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct DefaultsConfig {
    #[serde(default)]
    pub compiler: Option<String>,
    #[serde(default)]
    pub compiler_version: Option<String>,
}

/// Host detection overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    /// Architecture used instead of the running one.
    #[serde(default)]
    pub machine: Option<String>,
}

/// A loaded configuration and the directory its relative paths resolve in.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ArchspecConfig,
    pub base_dir: PathBuf,
}

impl ArchspecConfig {
    /// Parse a configuration from a TOML string.
    pub fn from_toml(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing archspec.toml")
    }

    /// Read and parse the file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Compiler and version for flag queries, command line first.
    pub fn compiler<'a>(
        &'a self,
        compiler: Option<&'a str>,
        version: Option<&'a str>,
    ) -> (&'a str, Option<&'a str>) {
        let compiler = compiler
            .or(self.defaults.compiler.as_deref())
            .unwrap_or("gcc");
        let version = version.or(self.defaults.compiler_version.as_deref());
        (compiler, version)
    }
}

impl LoadedConfig {
    /// Load `explicit` if given (it must exist), else `cwd/archspec.toml` if
    /// present, else the defaults.
    pub fn resolve(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = cwd.join(CONFIG_FILE);
                if !candidate.is_file() {
                    return Ok(Self {
                        config: ArchspecConfig::default(),
                        base_dir: cwd.to_path_buf(),
                    });
                }
                candidate
            }
        };

        let config = ArchspecConfig::load(&path)?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.to_path_buf());
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(Self { config, base_dir })
    }

    /// The bundled database plus every configured extra document.
    pub fn database(&self) -> Result<MicroarchDatabase> {
        let mut db = MicroarchDatabase::bundled();
        for extra in &self.config.database.extra {
            let path = self.base_dir.join(extra);
            db.load_from_path(&path)
                .with_context(|| format!("loading descriptor document {}", path.display()))?;
        }
        Ok(db)
    }

    /// The machine to detect for: configured override, else the running one.
    pub fn machine(&self) -> &str {
        match &self.config.host.machine {
            Some(machine) => archspec::detect::normalize_machine(machine),
            None => archspec::detect::machine(),
        }
    }
}
