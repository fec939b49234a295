/*============================================================
  Project: copr-mirror
  Module: copr_mirror::main
  Etiquette: Service Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Entry point. Mirrors the latest Koji build of every tracked
    package into its own Copr project, one project per
    version, so older builds stay installable after rawhide
    moves on.

  Security / Safety Notes:
    Creates Copr projects and submits builds through copr-cli
    with the operator's existing credentials.

  Dependencies:
    clap for CLI parsing, tokio runtime, chrono for the session
    log name.

  Operational Scope:
    Invoked periodically by cron or a CI schedule. Exit status
    is 0 when nothing failed, 1 when any build failed, and an
    error-specific code when the run aborted.
  ------------------------------------------------------------
  Revision History:
    2026-10-19 MNT  Authored copr-mirror entry point.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Result-first error handling with deterministic exits
    - Operator sees the pending list before any mutation
============================================================*/

mod config;
mod copr;
mod driver;
mod error;
mod exclusion;
#[cfg(test)]
mod fakes;
mod koji;
mod logger;
mod repo_state;
mod verrel;
mod versions;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use chrono::Utc;
use clap::{ArgAction, Parser, Subcommand};

use config::MirrorConfig;
use copr::CoprClient;
use driver::{CandidateSource, Reconciler, RunOutcome};
use error::{MirrorError, Result};
use koji::{HttpProbe, KojiCli};
use logger::Logger;
use repo_state::{PublishTarget, RepoStateClient};

/// Command-line arguments for copr-mirror.
#[derive(Debug, Parser)]
#[command(
    name = "copr-mirror",
    version,
    about = "Mirror new Koji builds into per-version Copr projects"
)]
struct Cli {
    /// Echo info and debug log entries to stderr.
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    debug: bool,
    /// Copr owner or @group holding the projects.
    #[arg(long, global = true, value_name = "OWNER")]
    owner: Option<String>,
    /// Override configuration file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Explicit log file path.
    #[arg(long, global = true, value_name = "PATH")]
    log: Option<PathBuf>,
    /// Publish this name-version-release even if it is already built.
    #[arg(long = "build", value_name = "VERREL", action = ArgAction::Append)]
    builds: Vec<String>,
    /// Publish a local source RPM instead of querying Koji.
    #[arg(long, value_name = "PATH", conflicts_with = "builds")]
    srpm: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write the newest published libvirt/qemu/seabios versions as shell exports.
    Versions {
        /// Output file (defaults to the configured `versions_file`).
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("[copr-mirror] {}", err);
            err.exit_code()
        }
    }
}

impl Cli {
    fn validate(&self) -> Result<()> {
        if self.command.is_some() && (!self.builds.is_empty() || self.srpm.is_some()) {
            return Err(MirrorError::Config(
                "--build and --srpm cannot be combined with a subcommand".into(),
            ));
        }
        Ok(())
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    cli.validate()?;

    let mut config = MirrorConfig::load_from_optional_path(cli.config.as_deref())?;
    if let Some(owner) = cli.owner.clone() {
        config.owner = owner;
    }

    let session_stamp = Utc::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let log_path = cli
        .log
        .clone()
        .unwrap_or_else(|| config.log_dir().join(format!("core_{session_stamp}.log")));
    let logger = Logger::new(Some(log_path), cli.debug)?;
    logger.info("INIT", format!("copr-mirror starting for {}", config.owner));

    let hosting = CoprClient::new(&config.copr)?;

    if let Some(Command::Versions { output }) = &cli.command {
        let path = output.clone().unwrap_or_else(|| config.versions_file.clone());
        versions::export(&hosting, &config.owner, &path, &logger).await?;
        logger.finalize()?;
        return Ok(ExitCode::SUCCESS);
    }

    let exclusions = config.exclusions()?;
    let probe = HttpProbe::new(&config.koji)?;
    let upstream = KojiCli::new(&config.koji);
    let repos = RepoStateClient::new(
        &hosting,
        &probe,
        PublishTarget {
            owner: &config.owner,
            chroots: &config.chroots,
            exclusions: &exclusions,
            koji_base: &config.koji.download_base,
        },
        &logger,
    );
    let reconciler = Reconciler::new(
        &upstream,
        &repos,
        &config.packages,
        Duration::from_secs(config.pause_secs),
        &logger,
    );

    let source = CandidateSource::select(cli.srpm.as_deref(), &cli.builds);
    let interrupt = async {
        // If the handler cannot be installed, never interrupt.
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let outcome = reconciler.run(source, interrupt).await?;

    if let RunOutcome::Published { succeeded, failed } = &outcome {
        logger.info(
            "COMPLETE",
            format!("{} succeeded, {} failed", succeeded.len(), failed.len()),
        );
    }
    logger.finalize()?;

    if outcome.had_failures() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
