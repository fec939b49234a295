/*============================================================
  Project: copr-mirror
  Module: copr_mirror::exclusion
  Etiquette: Service Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Per-package chroot exclusions. Some packages cannot build
    on every chroot of the matrix (edk2 on CentOS Stream, for
    example); offering those chroots would only produce build
    failures that are not worth reporting.

  Operational Scope:
    Built once from configuration and handed to the repo-state
    client; read-only afterwards.
  ------------------------------------------------------------
  Revision History:
    2026-10-19 MNT  Added per-package chroot exclusions.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Configuration injected, not global
    - Deterministic chroot ordering
============================================================*/

use std::collections::BTreeMap;

use regex::Regex;

use crate::error::{MirrorError, Result};

/// Immutable package → chroot pattern table.
#[derive(Debug, Clone, Default)]
pub struct ChrootExclusions {
    rules: BTreeMap<String, Vec<Regex>>,
}

impl ChrootExclusions {
    /// Compile the configured patterns. Patterns are unanchored.
    pub fn compile(table: &BTreeMap<String, Vec<String>>) -> Result<Self> {
        let mut rules = BTreeMap::new();
        for (package, patterns) in table {
            let compiled = patterns
                .iter()
                .map(|pattern| {
                    Regex::new(pattern).map_err(|err| {
                        MirrorError::Config(format!(
                            "Invalid chroot exclusion `{pattern}` for {package}: {err}"
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            rules.insert(package.clone(), compiled);
        }
        Ok(Self { rules })
    }

    /// Whether `chroot` must not be offered to `package`.
    pub fn should_skip(&self, package: &str, chroot: &str) -> bool {
        self.rules
            .get(package)
            .map(|patterns| patterns.iter().any(|re| re.is_match(chroot)))
            .unwrap_or(false)
    }

    /// The chroots of `matrix` that `package` should be built on, in order.
    pub fn filter<'a>(&self, package: &str, matrix: &'a [String]) -> Vec<&'a str> {
        matrix
            .iter()
            .map(String::as_str)
            .filter(|chroot| !self.should_skip(package, chroot))
            .collect()
    }
}
