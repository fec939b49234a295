/*============================================================
  Project: copr-mirror
  Module: copr_mirror::koji
  Etiquette: Service Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Ask Koji for the latest build of a package on a branch, and
    probe that a build's source RPM is actually downloadable.

  Security / Safety Notes:
    Executes the `koji` client with user privileges and sends
    anonymous HTTPS HEAD requests only.

  Dependencies:
    tokio::process for the koji client, reqwest for probes.
  ------------------------------------------------------------
  Revision History:
    2026-10-19 MNT  Crafted Koji query and artifact probe.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Deterministic command invocation with explicit checks
    - Fail before mutation when sources are missing
============================================================*/

use std::io;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::config::KojiConfig;
use crate::error::{MirrorError, Result};

/// Source of "latest build" identifiers.
pub trait UpstreamSource {
    /// Full `name-version-release` of the newest build of `package`.
    async fn latest_build(&self, package: &str) -> Result<String>;
}

/// Reachability check for source artifacts.
pub trait ArtifactProbe {
    async fn probe(&self, url: &str) -> Result<()>;
}

/// `koji latest-build` wrapper.
pub struct KojiCli {
    branch: String,
}

impl KojiCli {
    pub fn new(config: &KojiConfig) -> Self {
        Self {
            branch: config.branch.clone(),
        }
    }
}

impl UpstreamSource for KojiCli {
    async fn latest_build(&self, package: &str) -> Result<String> {
        let output = Command::new("koji")
            .args(["latest-build", "--quiet", self.branch.as_str(), package])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|err| map_spawn_error(err, "koji"))?;

        if !output.status.success() {
            return Err(MirrorError::CommandFailure {
                command: format!("koji latest-build --quiet {} {package}", self.branch),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8(output.stdout).map_err(|err| {
            MirrorError::Serialization(format!("koji emitted invalid UTF-8: {err}"))
        })?;
        parse_latest_build(&stdout).ok_or_else(|| MirrorError::CommandFailure {
            command: format!("koji latest-build --quiet {} {package}", self.branch),
            status: 0,
            stderr: format!("no build of {package} tagged in {}", self.branch),
        })
    }
}

/// First column of the first non-empty row of `koji latest-build --quiet`.
fn parse_latest_build(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .find_map(|line| line.split_whitespace().next())
        .map(str::to_string)
}

/// HEAD-request prober.
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(config: &KojiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(concat!("copr-mirror/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| MirrorError::Network(format!("Failed to build HTTP client: {err}")))?;
        Ok(Self { client })
    }
}

impl ArtifactProbe for HttpProbe {
    async fn probe(&self, url: &str) -> Result<()> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|err| MirrorError::Fetch {
                url: url.to_string(),
                reason: err.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(MirrorError::Fetch {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }
        Ok(())
    }
}

pub(crate) fn map_spawn_error(err: io::Error, command: &str) -> MirrorError {
    if err.kind() == io::ErrorKind::NotFound {
        MirrorError::CommandMissing {
            command: command.into(),
        }
    } else {
        MirrorError::Filesystem(format!("Failed to spawn {command}: {err}"))
    }
}
