/*============================================================
  Project: copr-mirror
  Module: copr_mirror::versions
  Etiquette: Service Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Export the newest published Fedora build of each container
    component as shell variables, for pinning the KubeVirt
    libvirt container build to what the mirror holds.

  Operational Scope:
    Read-only against Copr; writes a single operator-chosen
    file.
  ------------------------------------------------------------
  Revision History:
    2026-10-19 MNT  Added published version export.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Read-only against Copr
    - Reproducible output for identical project lists
============================================================*/

use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use crate::copr::HostingApi;
use crate::error::{MirrorError, Result};
use crate::logger::Logger;

/// Packages exported, with the variable each one is written to.
pub const EXPORTED: [(&str, &str); 3] = [
    ("libvirt", "LIBVIRT_VERSION"),
    ("qemu", "QEMU_VERSION"),
    ("seabios", "SEABIOS_VERSION"),
];

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Chunk {
    Number(u128),
    Text(String),
}

/// Digit runs compare numerically, everything else case-insensitively.
fn natural_key(name: &str) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut rest = name;
    while let Some(first) = rest.chars().next() {
        let is_digit = first.is_ascii_digit();
        let end = rest
            .find(|c: char| c.is_ascii_digit() != is_digit)
            .unwrap_or(rest.len());
        let (run, tail) = rest.split_at(end);
        chunks.push(match run.parse::<u128>() {
            Ok(number) if is_digit => Chunk::Number(number),
            _ => Chunk::Text(run.to_lowercase()),
        });
        rest = tail;
    }
    chunks
}

fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_key(a).cmp(&natural_key(b))
}

/// `version-release` of the newest non-EL project for `package`.
pub fn find_latest(projects: &[String], package: &str) -> Option<String> {
    let prefix = format!("{package}-");
    let mut names: Vec<&str> = projects
        .iter()
        .map(String::as_str)
        .filter(|name| name.starts_with(&prefix))
        .collect();
    names.sort_by(|a, b| natural_cmp(a, b));
    names
        .into_iter()
        .rev()
        // EL rebuilds are not used for the container image.
        .find(|name| !name.contains(".el"))
        .and_then(|name| name.split_once('-'))
        .map(|(_, verrel)| verrel.to_string())
}

/// Render the export file for the given project list.
pub fn render(projects: &[String]) -> Result<String> {
    let mut out = String::new();
    for (package, variable) in EXPORTED {
        let version = find_latest(projects, package).ok_or_else(|| {
            MirrorError::Hosting(format!("No published Fedora build of {package}"))
        })?;
        out.push_str(&format!("export {variable}=\"{version}\"\n"));
    }
    Ok(out)
}

/// Fetch `owner`'s projects and write the export file to `path`.
pub async fn export<H: HostingApi>(
    hosting: &H,
    owner: &str,
    path: &Path,
    logger: &Logger,
) -> Result<String> {
    let projects = hosting.list_projects(owner).await?;
    logger.debug("VERSIONS", format!("{owner} holds {} projects", projects.len()));

    let out = render(&projects)?;
    fs::write(path, &out).map_err(|err| {
        MirrorError::Filesystem(format!("Failed to write {}: {err}", path.display()))
    })?;
    println!("Generated:\n{out}");
    println!("Wrote to '{}'", path.display());
    logger.info("VERSIONS", format!("Wrote {}", path.display()));
    Ok(out)
}
