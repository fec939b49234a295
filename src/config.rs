/*============================================================
  Project: copr-mirror
  Module: copr_mirror::config
  Etiquette: Service Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Load the tracked package list, chroot matrix, exclusion
    table and service endpoints from TOML, falling back to the
    built-in KubeVirt defaults.

  Security / Safety Notes:
    Holds no credentials; copr-cli reads its own token file.

  Dependencies:
    serde + toml for parsing, dirs for XDG locations.
  ------------------------------------------------------------
  Revision History:
    2026-10-19 MNT  Introduced TOML configuration with defaults.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Fail fast on invalid configuration
    - Defaults usable without a config file
============================================================*/

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{MirrorError, Result};
use crate::exclusion::ChrootExclusions;

const APP_DIR: &str = "copr-mirror";
const CONFIG_FILE: &str = "config.toml";

/// Top-level copr-mirror configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MirrorConfig {
    /// Copr owner or `@group` that holds the per-version projects.
    pub owner: String,
    /// Packages queried from Koji, in query order.
    pub packages: Vec<String>,
    /// Full chroot matrix offered to every new project.
    pub chroots: Vec<String>,
    /// Package name → regexes of chroots to leave out.
    pub exclusions: BTreeMap<String, Vec<String>>,
    /// Seconds to wait after printing the pending list.
    pub pause_secs: u64,
    pub log_dir: Option<PathBuf>,
    /// Output of `copr-mirror versions`.
    pub versions_file: PathBuf,
    pub koji: KojiConfig,
    pub copr: CoprConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KojiConfig {
    pub branch: String,
    pub download_base: String,
    /// HEAD probe timeout in seconds.
    pub timeout: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoprConfig {
    pub base_url: String,
    pub timeout: u64,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            owner: "@kubevirt".into(),
            packages: to_strings(&["edk2", "libvirt", "qemu", "seabios"]),
            chroots: to_strings(&[
                "centos-stream-8-aarch64",
                "centos-stream-8-x86_64",
                "fedora-rawhide-aarch64",
                "fedora-rawhide-x86_64",
            ]),
            exclusions: BTreeMap::from([(
                "edk2".to_string(),
                to_strings(&[".*centos-stream.*"]),
            )]),
            pause_secs: 5,
            log_dir: None,
            versions_file: PathBuf::from("container_versions"),
            koji: KojiConfig::default(),
            copr: CoprConfig::default(),
        }
    }
}

impl Default for KojiConfig {
    fn default() -> Self {
        Self {
            branch: "rawhide".into(),
            download_base: "https://kojipkgs.fedoraproject.org".into(),
            timeout: 30,
        }
    }
}

impl Default for CoprConfig {
    fn default() -> Self {
        Self {
            base_url: "https://copr.fedorainfracloud.org".into(),
            timeout: 60,
        }
    }
}

impl MirrorConfig {
    /// Load from `path` if given (must exist), else from the XDG default
    /// location if present, else built-in defaults.
    pub fn load_from_optional_path(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match default_config_path() {
                Some(default) if default.is_file() => Self::load(&default),
                _ => Ok(Self::default()),
            },
        }
    }

    fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| {
            MirrorError::Config(format!("Failed to read {}: {err}", path.display()))
        })?;
        Self::from_toml(&raw)
            .map_err(|err| MirrorError::Config(format!("{}: {err}", path.display())))
    }

    fn from_toml(raw: &str) -> Result<Self> {
        let config: MirrorConfig =
            toml::from_str(raw).map_err(|err| MirrorError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.owner.trim().is_empty() {
            return Err(MirrorError::Config("owner must not be empty".into()));
        }
        if self.chroots.is_empty() {
            return Err(MirrorError::Config("chroot matrix is empty".into()));
        }
        // Surface bad regexes at load time rather than mid-run.
        self.exclusions()?;
        Ok(())
    }

    /// Compiled exclusion table.
    pub fn exclusions(&self) -> Result<ChrootExclusions> {
        ChrootExclusions::compile(&self.exclusions)
    }

    /// Directory for session logs.
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| {
            dirs::state_dir()
                .or_else(dirs::cache_dir)
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR)
                .join("logs")
        })
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}
