/*============================================================
  Project: copr-mirror
  Module: copr_mirror::driver
  Etiquette: Service Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    One reconciliation pass: gather candidate builds, drop the
    ones Copr already has, then publish the rest in order and
    collect failures.

  Operational Scope:
    Strictly sequential; each Koji query and each Copr build is
    awaited to completion before the next starts. Meant to be
    re-run by an external scheduler.
  ------------------------------------------------------------
  Revision History:
    2026-10-19 MNT  Implemented reconciliation pass.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Deterministic ordering of submitted builds
    - Failures recorded, never silently dropped
============================================================*/

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use crate::copr::HostingApi;
use crate::error::{MirrorError, Result};
use crate::koji::{ArtifactProbe, UpstreamSource};
use crate::logger::Logger;
use crate::repo_state::RepoStateClient;
use crate::verrel::Verrel;

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    UpToDate,
    Published {
        succeeded: Vec<String>,
        failed: Vec<String>,
    },
}

impl RunOutcome {
    pub fn had_failures(&self) -> bool {
        matches!(self, RunOutcome::Published { failed, .. } if !failed.is_empty())
    }
}

/// Where candidates come from, in priority order.
#[derive(Debug, Clone, Copy)]
pub enum CandidateSource<'a> {
    /// A single local source RPM.
    Srpm(&'a Path),
    /// Explicit verrels, published even if already built.
    Forced(&'a [String]),
    /// Latest upstream build of every tracked package.
    Upstream,
}

impl<'a> CandidateSource<'a> {
    pub fn select(srpm: Option<&'a Path>, forced: &'a [String]) -> Self {
        match srpm {
            Some(path) => CandidateSource::Srpm(path),
            None if !forced.is_empty() => CandidateSource::Forced(forced),
            None => CandidateSource::Upstream,
        }
    }
}

pub struct Reconciler<'a, U, H, P> {
    upstream: &'a U,
    repos: &'a RepoStateClient<'a, H, P>,
    packages: &'a [String],
    pause: Duration,
    logger: &'a Logger,
}

impl<'a, U, H, P> Reconciler<'a, U, H, P>
where
    U: UpstreamSource,
    H: HostingApi,
    P: ArtifactProbe,
{
    pub fn new(
        upstream: &'a U,
        repos: &'a RepoStateClient<'a, H, P>,
        packages: &'a [String],
        pause: Duration,
        logger: &'a Logger,
    ) -> Self {
        Self {
            upstream,
            repos,
            packages,
            pause,
            logger,
        }
    }

    /// Run one pass. `interrupt` resolving during the pause aborts the
    /// run before anything is created or built.
    pub async fn run<I>(&self, source: CandidateSource<'_>, interrupt: I) -> Result<RunOutcome>
    where
        I: Future<Output = ()>,
    {
        let mut candidates = self.collect(source).await?;
        if candidates.is_empty() {
            println!("→ Everything is up to date");
            self.logger.info("UPTODATE", "No builds to publish");
            return Ok(RunOutcome::UpToDate);
        }

        candidates.sort_by(|a, b| a.full().cmp(b.full()));
        println!("→ Builds to publish:");
        for verrel in &candidates {
            println!("    {verrel}");
        }
        self.logger.info(
            "PENDING",
            format!("{} build(s) queued", candidates.len()),
        );
        self.pause(interrupt).await?;

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        for verrel in &candidates {
            if self.repos.publish(verrel).await? {
                succeeded.push(verrel.full().to_string());
            } else {
                failed.push(verrel.full().to_string());
            }
        }

        if !failed.is_empty() {
            println!("→ Failed builds:");
            for verrel in &failed {
                println!("    {verrel}");
            }
            self.logger
                .error("FAILED", format!("{} of {} failed", failed.len(), candidates.len()));
        }
        Ok(RunOutcome::Published { succeeded, failed })
    }

    async fn collect(&self, source: CandidateSource<'_>) -> Result<Vec<Verrel>> {
        match source {
            CandidateSource::Srpm(path) => Ok(vec![Verrel::from_srpm(path)?]),
            CandidateSource::Forced(raw) => {
                self.logger
                    .info("FORCE", format!("Forcing {} build(s)", raw.len()));
                raw.iter().map(|raw| Verrel::parse(raw)).collect()
            }
            CandidateSource::Upstream => {
                let mut pending = Vec::new();
                for package in self.packages {
                    let raw = self.upstream.latest_build(package).await?;
                    let verrel = Verrel::parse(&raw)?;
                    self.logger.debug(
                        "UPSTREAM",
                        format!(
                            "{package}: latest is {verrel} (version {}, release {})",
                            verrel.version(),
                            verrel.release()
                        ),
                    );
                    if !self.repos.exists_and_satisfied(&verrel).await? {
                        pending.push(verrel);
                    }
                }
                Ok(pending)
            }
        }
    }

    /// Give the operator a chance to Ctrl-C before anything is submitted.
    async fn pause<I: Future<Output = ()>>(&self, interrupt: I) -> Result<()> {
        if self.pause.is_zero() {
            return Ok(());
        }
        println!(
            "→ Starting in {}s, press Ctrl-C to abort",
            self.pause.as_secs()
        );
        tokio::select! {
            _ = tokio::time::sleep(self.pause) => Ok(()),
            _ = interrupt => {
                self.logger.warn("ABORT", "Interrupted by operator");
                Err(MirrorError::Interrupted)
            }
        }
    }
}
