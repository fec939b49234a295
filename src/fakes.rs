/*============================================================
  Project: copr-mirror
  Module: copr_mirror::fakes
  Etiquette: Service Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    In-memory stand-ins for Koji, the artifact probe and Copr,
    recording every call for assertions.

  Security / Safety Notes:
    Compiled for tests only; performs no I/O.

  Operational Scope:
    Used by module tests in place of the koji and copr-cli
    binaries and the Copr API.
  ------------------------------------------------------------
  Revision History:
    2026-10-19 MNT  Added test doubles for collaborators.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Fakes honour the same contracts as the real clients
============================================================*/

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use crate::copr::{BuildState, HostingApi, ProjectRef};
use crate::error::{MirrorError, Result};
use crate::koji::{ArtifactProbe, UpstreamSource};

/// Koji double: package → latest build.
#[derive(Debug, Default)]
pub struct FakeUpstream {
    latest: BTreeMap<String, String>,
    queried: Mutex<Vec<String>>,
}

impl FakeUpstream {
    pub fn with(builds: &[(&str, &str)]) -> Self {
        Self {
            latest: builds
                .iter()
                .map(|(pkg, verrel)| (pkg.to_string(), verrel.to_string()))
                .collect(),
            queried: Mutex::new(Vec::new()),
        }
    }

    pub fn queried(&self) -> Vec<String> {
        self.queried.lock().unwrap().clone()
    }
}

impl UpstreamSource for FakeUpstream {
    async fn latest_build(&self, package: &str) -> Result<String> {
        self.queried.lock().unwrap().push(package.to_string());
        self.latest
            .get(package)
            .cloned()
            .ok_or_else(|| MirrorError::CommandFailure {
                command: format!("koji latest-build {package}"),
                status: 0,
                stderr: "no build".into(),
            })
    }
}

/// Probe double; every URL is reachable unless listed as missing.
#[derive(Debug, Default)]
pub struct FakeProbe {
    missing: HashSet<String>,
    probed: Mutex<Vec<String>>,
}

impl FakeProbe {
    pub fn missing(url: &str) -> Self {
        Self {
            missing: HashSet::from([url.to_string()]),
            probed: Mutex::new(Vec::new()),
        }
    }

    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }
}

impl ArtifactProbe for FakeProbe {
    async fn probe(&self, url: &str) -> Result<()> {
        self.probed.lock().unwrap().push(url.to_string());
        if self.missing.contains(url) {
            return Err(MirrorError::Fetch {
                url: url.to_string(),
                reason: "HTTP 404 Not Found".into(),
            });
        }
        Ok(())
    }
}

/// Copr double. Projects live in memory; builds succeed unless the
/// project name is marked as failing.
#[derive(Debug, Default)]
pub struct FakeHosting {
    projects: Mutex<BTreeMap<String, Vec<BuildState>>>,
    created: Mutex<Vec<(String, Vec<String>)>>,
    submitted: Mutex<Vec<(String, String)>>,
    failing: HashSet<String>,
}

impl FakeHosting {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `owner/name` with existing builds.
    pub fn with_project(self, owner: &str, name: &str, builds: &[BuildState]) -> Self {
        self.projects
            .lock()
            .unwrap()
            .insert(format!("{owner}/{name}"), builds.to_vec());
        self
    }

    pub fn failing(mut self, project_name: &str) -> Self {
        self.failing.insert(project_name.to_string());
        self
    }

    /// Projects created during the run with their chroots.
    pub fn created(&self) -> Vec<(String, Vec<String>)> {
        self.created.lock().unwrap().clone()
    }

    /// `(project, source)` pairs submitted for building.
    pub fn submitted(&self) -> Vec<(String, String)> {
        self.submitted.lock().unwrap().clone()
    }
}

impl HostingApi for FakeHosting {
    async fn get_project(&self, owner: &str, name: &str) -> Result<Option<ProjectRef>> {
        let projects = self.projects.lock().unwrap();
        Ok(projects
            .contains_key(&format!("{owner}/{name}"))
            .then(|| ProjectRef::new(owner, name)))
    }

    async fn create_project(&self, owner: &str, name: &str, chroots: &[&str]) -> Result<()> {
        let key = format!("{owner}/{name}");
        let mut projects = self.projects.lock().unwrap();
        if projects.contains_key(&key) {
            return Err(MirrorError::Hosting(format!("{key} already exists")));
        }
        projects.insert(key.clone(), Vec::new());
        self.created
            .lock()
            .unwrap()
            .push((key, chroots.iter().map(|c| c.to_string()).collect()));
        Ok(())
    }

    async fn list_builds(&self, project: &ProjectRef) -> Result<Vec<BuildState>> {
        self.projects
            .lock()
            .unwrap()
            .get(&project.to_string())
            .cloned()
            .ok_or_else(|| MirrorError::Hosting(format!("{project} not found")))
    }

    async fn list_projects(&self, owner: &str) -> Result<Vec<String>> {
        let prefix = format!("{owner}/");
        Ok(self
            .projects
            .lock()
            .unwrap()
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }

    async fn submit_build(&self, project: &ProjectRef, source: &str) -> Result<bool> {
        self.submitted
            .lock()
            .unwrap()
            .push((project.to_string(), source.to_string()));
        let succeeded = !self.failing.contains(&project.name);
        let state = if succeeded {
            BuildState::Succeeded
        } else {
            BuildState::Failed
        };
        if let Some(builds) = self.projects.lock().unwrap().get_mut(&project.to_string()) {
            builds.push(state);
        }
        Ok(succeeded)
    }
}
