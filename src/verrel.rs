/*============================================================
  Project: copr-mirror
  Module: copr_mirror::verrel
  Etiquette: Service Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Parse `name-version-release` identifiers reported by Koji
    (or embedded in a local source RPM file name) into the
    structure used to key Copr projects.

  Security / Safety Notes:
    Pure data container; no I/O performed in this module.

  Operational Scope:
    Constructed once per candidate per reconciliation pass and
    never mutated afterwards.
  ------------------------------------------------------------
  Revision History:
    2026-10-19 MNT  Implemented verrel parsing.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Immutable identifiers after construction
    - Explicit parse failures, no guessing
============================================================*/

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{MirrorError, Result};

/// Source package name used by EL builds of qemu.
const QEMU_ALIAS: &str = "qemu-kvm";
const QEMU_CANONICAL: &str = "qemu";

const SRPM_SUFFIX: &str = ".src.rpm";

/// A parsed package build identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verrel {
    full: String,
    package_name: String,
    version: String,
    release: String,
    project_name: String,
    artifact: Option<PathBuf>,
}

impl Verrel {
    /// Parse a raw identifier such as `libvirt-7.0.0-1.fc35`.
    ///
    /// A trailing dotted segment that is not an `fc`/`el` dist tag is a
    /// no-op rebuild counter (`-1.fc33.1`) and is dropped, once.
    pub fn parse(raw: &str) -> Result<Self> {
        let full = strip_rebuild_suffix(raw.trim());

        let fields: Vec<&str> = full.splitn(3, '-').collect();
        if fields.len() != 3 {
            return Err(MirrorError::parse(
                raw,
                format!("expected 3 dash-separated fields, found {}", fields.len()),
            ));
        }
        if let Some(idx) = fields.iter().position(|field| field.is_empty()) {
            let label = ["name", "version", "release"][idx];
            return Err(MirrorError::parse(raw, format!("empty {label} field")));
        }

        Ok(Self {
            project_name: full.replace(QEMU_ALIAS, QEMU_CANONICAL),
            package_name: fields[0].to_string(),
            version: fields[1].to_string(),
            release: fields[2].to_string(),
            full: full.to_string(),
            artifact: None,
        })
    }

    /// Build an identifier from a local `*.src.rpm` file.
    pub fn from_srpm(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| MirrorError::parse(&path.display().to_string(), "no file name"))?;
        let stem = file_name.strip_suffix(SRPM_SUFFIX).ok_or_else(|| {
            MirrorError::parse(&file_name, format!("expected a {SRPM_SUFFIX} file"))
        })?;

        let mut verrel = Self::parse(stem)?;
        verrel.artifact = Some(path.to_path_buf());
        Ok(verrel)
    }

    pub fn full(&self) -> &str {
        &self.full
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn release(&self) -> &str {
        &self.release
    }

    /// Copr project name this build is published under.
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Local artifact path when built from `--srpm`.
    pub fn artifact(&self) -> Option<&Path> {
        self.artifact.as_deref()
    }

    /// Koji download URL of the source RPM.
    pub fn download_url(&self, koji_base: &str) -> String {
        format!(
            "{}/packages/{}/{}/{}/src/{}{SRPM_SUFFIX}",
            koji_base.trim_end_matches('/'),
            self.package_name,
            self.version,
            self.release,
            self.full
        )
    }
}

impl fmt::Display for Verrel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

fn strip_rebuild_suffix(raw: &str) -> &str {
    match raw.rsplit_once('.') {
        Some((head, last)) if !last.starts_with("fc") && !last.starts_with("el") => head,
        _ => raw,
    }
}
