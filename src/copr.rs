/*============================================================
  Project: copr-mirror
  Module: copr_mirror::copr
  Etiquette: Service Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Access to the Copr build service: read project and build
    state over the public API v3, create projects and submit
    builds through `copr-cli`.

  Security / Safety Notes:
    Reads are anonymous HTTPS GETs. Mutations go through
    copr-cli, which uses the operator's ~/.config/copr token;
    this module never sees it.

  Dependencies:
    reqwest + serde for the API, tokio::process for copr-cli,
    urlencoding for query strings.
  ------------------------------------------------------------
  Revision History:
    2026-10-19 MNT  Implemented Copr API and copr-cli client.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Structured response parsing with explicit error paths
    - Credentials stay with copr-cli
============================================================*/

use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::process::Command;
use urlencoding::encode;

use crate::config::CoprConfig;
use crate::error::{MirrorError, Result};
use crate::koji::map_spawn_error;

/// Page size for list endpoints; more than any owner has in practice.
const LIST_LIMIT: usize = 10_000;

/// A Copr project, addressed as `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRef {
    pub owner: String,
    pub name: String,
}

impl ProjectRef {
    pub fn new(owner: &str, name: &str) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Build state as reported by Copr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildState {
    Importing,
    Pending,
    Starting,
    Running,
    Succeeded,
    Forked,
    Skipped,
    Failed,
    Canceled,
    Waiting,
    #[serde(other)]
    Unknown,
}

/// Operations the mirror needs from the hosting service.
pub trait HostingApi {
    /// Look up `owner/name`; `None` when it does not exist.
    async fn get_project(&self, owner: &str, name: &str) -> Result<Option<ProjectRef>>;

    async fn create_project(&self, owner: &str, name: &str, chroots: &[&str]) -> Result<()>;

    async fn list_builds(&self, project: &ProjectRef) -> Result<Vec<BuildState>>;

    /// Names of every project held by `owner`.
    async fn list_projects(&self, owner: &str) -> Result<Vec<String>>;

    /// Submit a build of `source` (URL or local SRPM) and wait for it.
    /// Returns whether the build succeeded.
    async fn submit_build(&self, project: &ProjectRef, source: &str) -> Result<bool>;
}

/// Copr client backed by the API v3 and `copr-cli`.
pub struct CoprClient {
    client: reqwest::Client,
    base_url: String,
}

impl CoprClient {
    pub fn new(config: &CoprConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(concat!("copr-mirror/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| MirrorError::Network(format!("Failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn api_url(&self, endpoint: &str, query: &[(&str, &str)]) -> String {
        let mut url = format!("{}/api_3/{endpoint}", self.base_url);
        for (idx, (key, value)) in query.iter().enumerate() {
            url.push(if idx == 0 { '?' } else { '&' });
            url.push_str(key);
            url.push('=');
            url.push_str(&encode(value));
        }
        url
    }

    /// GET an API endpoint; `Ok(None)` on 404.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| MirrorError::Hosting(format!("Request to {url} failed: {err}")))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response.json::<T>().await.map(Some).map_err(|err| {
                MirrorError::Serialization(format!("Failed to decode Copr response from {url}: {err}"))
            }),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(MirrorError::Hosting(format!(
                    "{url} responded with {status}: {}",
                    body.trim()
                )))
            }
        }
    }

    async fn copr_cli(&self, args: &[&str]) -> Result<std::process::ExitStatus> {
        Command::new("copr-cli")
            .args(args)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|err| map_spawn_error(err, "copr-cli"))
    }
}

#[derive(Debug, Deserialize)]
struct ProjectEntry {
    name: String,
    #[serde(default)]
    ownername: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BuildEntry {
    state: BuildState,
}

#[derive(Debug, Deserialize)]
struct ItemList<T> {
    items: Vec<T>,
}

impl HostingApi for CoprClient {
    async fn get_project(&self, owner: &str, name: &str) -> Result<Option<ProjectRef>> {
        let url = self.api_url("project", &[("ownername", owner), ("projectname", name)]);
        let entry: Option<ProjectEntry> = self.get_json(&url).await?;
        Ok(entry.map(|entry| {
            ProjectRef::new(entry.ownername.as_deref().unwrap_or(owner), &entry.name)
        }))
    }

    async fn create_project(&self, owner: &str, name: &str, chroots: &[&str]) -> Result<()> {
        let target = format!("{owner}/{name}");
        let mut args = vec!["create"];
        for chroot in chroots {
            args.push("--chroot");
            args.push(chroot);
        }
        args.push(target.as_str());

        let status = self.copr_cli(&args).await?;
        if !status.success() {
            return Err(MirrorError::Hosting(format!(
                "copr-cli create {target} exited with {status}"
            )));
        }
        Ok(())
    }

    async fn list_builds(&self, project: &ProjectRef) -> Result<Vec<BuildState>> {
        let limit = LIST_LIMIT.to_string();
        let url = self.api_url(
            "build/list",
            &[
                ("ownername", project.owner.as_str()),
                ("projectname", project.name.as_str()),
                ("limit", limit.as_str()),
            ],
        );
        let list: ItemList<BuildEntry> = self
            .get_json(&url)
            .await?
            .ok_or_else(|| MirrorError::Hosting(format!("Project {project} vanished")))?;
        Ok(list.items.into_iter().map(|build| build.state).collect())
    }

    async fn list_projects(&self, owner: &str) -> Result<Vec<String>> {
        let limit = LIST_LIMIT.to_string();
        let url = self.api_url("project/list", &[("ownername", owner), ("limit", limit.as_str())]);
        let list: ItemList<ProjectEntry> = self
            .get_json(&url)
            .await?
            .ok_or_else(|| MirrorError::Hosting(format!("Unknown Copr owner {owner}")))?;
        Ok(list.items.into_iter().map(|project| project.name).collect())
    }

    async fn submit_build(&self, project: &ProjectRef, source: &str) -> Result<bool> {
        let target = project.to_string();
        let status = self.copr_cli(&["build", target.as_str(), source]).await?;
        Ok(status.success())
    }
}
