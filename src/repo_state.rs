/*============================================================
  Project: copr-mirror
  Module: copr_mirror::repo_state
  Etiquette: Service Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Decide whether a build already has a satisfactory Copr
    project, and publish it (create project + build) when it
    does not.

  Security / Safety Notes:
    `publish` performs real, externally visible mutations on
    Copr. There is no dry-run; the only replay guard is
    `exists_and_satisfied`.

  Operational Scope:
    Driven sequentially by the reconciler, one build at a time.
  ------------------------------------------------------------
  Revision History:
    2026-10-19 MNT  Implemented satisfaction check and publish.
  ------------------------------------------------------------
  SSE Principles Observed:
    - No mutation without a resolvable source
    - In-flight builds are never disturbed
============================================================*/

use crate::copr::{BuildState, HostingApi, ProjectRef};
use crate::error::{MirrorError, Result};
use crate::exclusion::ChrootExclusions;
use crate::koji::ArtifactProbe;
use crate::logger::Logger;
use crate::verrel::Verrel;

/// Where and how new projects are created.
#[derive(Debug, Clone)]
pub struct PublishTarget<'a> {
    pub owner: &'a str,
    pub chroots: &'a [String],
    pub exclusions: &'a ChrootExclusions,
    pub koji_base: &'a str,
}

pub struct RepoStateClient<'a, H, P> {
    hosting: &'a H,
    probe: &'a P,
    target: PublishTarget<'a>,
    logger: &'a Logger,
}

impl<'a, H: HostingApi, P: ArtifactProbe> RepoStateClient<'a, H, P> {
    pub fn new(hosting: &'a H, probe: &'a P, target: PublishTarget<'a>, logger: &'a Logger) -> Self {
        Self {
            hosting,
            probe,
            target,
            logger,
        }
    }

    /// True when the project exists with a running or succeeded build.
    ///
    /// A running build is left alone even though it may still fail; the
    /// version is only revisited while it remains the latest upstream.
    pub async fn exists_and_satisfied(&self, verrel: &Verrel) -> Result<bool> {
        let Some(project) = self.lookup(verrel).await? else {
            self.logger
                .debug("STATE", format!("{verrel}: no project yet"));
            return Ok(false);
        };

        let builds = self.hosting.list_builds(&project).await?;
        if builds.contains(&BuildState::Running) {
            println!("→ {project} has a build in progress; leaving it alone");
            self.logger
                .info("RUNNING", format!("{project}: build in progress, skipping"));
            return Ok(true);
        }
        if builds.contains(&BuildState::Succeeded) {
            self.logger
                .debug("STATE", format!("{project}: already built"));
            return Ok(true);
        }

        self.logger.warn(
            "RETRY",
            format!("{project}: {} build(s), none succeeded; republishing", builds.len()),
        );
        Ok(false)
    }

    /// Create the project if needed and build `verrel` into it.
    /// Returns whether the build succeeded.
    pub async fn publish(&self, verrel: &Verrel) -> Result<bool> {
        let source = self.resolve_source(verrel).await?;

        let project = match self.lookup(verrel).await? {
            Some(project) => project,
            None => {
                self.create(verrel).await?;
                self.lookup(verrel).await?.ok_or_else(|| {
                    MirrorError::Hosting(format!(
                        "{}/{} missing right after creation",
                        self.target.owner,
                        verrel.project_name()
                    ))
                })?
            }
        };

        println!("→ Building {verrel} in {project}");
        self.logger
            .info("BUILD", format!("{project} <- {source}"));
        let succeeded = self.hosting.submit_build(&project, &source).await?;
        if succeeded {
            self.logger.info("BUILD", format!("{verrel} succeeded"));
        } else {
            self.logger.error("BUILD", format!("{verrel} failed"));
        }
        Ok(succeeded)
    }

    async fn lookup(&self, verrel: &Verrel) -> Result<Option<ProjectRef>> {
        self.hosting
            .get_project(self.target.owner, verrel.project_name())
            .await
    }

    async fn create(&self, verrel: &Verrel) -> Result<()> {
        let package = verrel.package_name();
        let chroots = self.target.exclusions.filter(package, self.target.chroots);
        if chroots.is_empty() {
            return Err(MirrorError::Config(format!(
                "Every chroot is excluded for {package}"
            )));
        }
        let skipped = self.target.chroots.len() - chroots.len();
        if skipped > 0 {
            self.logger
                .info("CHROOTS", format!("{package}: {skipped} chroot(s) excluded"));
        }

        self.logger.info(
            "CREATE",
            format!(
                "{}/{} [{}]",
                self.target.owner,
                verrel.project_name(),
                chroots.join(", ")
            ),
        );
        self.hosting
            .create_project(self.target.owner, verrel.project_name(), &chroots)
            .await
    }

    /// Local artifact path, or the Koji URL once it is known to resolve.
    async fn resolve_source(&self, verrel: &Verrel) -> Result<String> {
        if let Some(path) = verrel.artifact() {
            if !path.is_file() {
                return Err(MirrorError::Fetch {
                    url: path.display().to_string(),
                    reason: "no such file".into(),
                });
            }
            return Ok(path.display().to_string());
        }

        let url = verrel.download_url(self.target.koji_base);
        self.probe.probe(&url).await?;
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{FakeHosting, FakeProbe};
    use std::collections::BTreeMap;

    const OWNER: &str = "@kubevirt";
    const KOJI: &str = "https://koji.example.org";

    fn matrix() -> Vec<String> {
        ["centos-stream-8-aarch64", "fedora-rawhide-x86_64"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn edk2_exclusions() -> ChrootExclusions {
        let raw = BTreeMap::from([("edk2".to_string(), vec![".*centos-stream.*".to_string()])]);
        ChrootExclusions::compile(&raw).unwrap()
    }

    fn verrel(raw: &str) -> Verrel {
        Verrel::parse(raw).unwrap()
    }

    macro_rules! client {
        ($hosting:expr, $probe:expr, $chroots:expr, $exclusions:expr, $logger:expr) => {
            RepoStateClient::new(
                $hosting,
                $probe,
                PublishTarget {
                    owner: OWNER,
                    chroots: $chroots,
                    exclusions: $exclusions,
                    koji_base: KOJI,
                },
                $logger,
            )
        };
    }

    async fn satisfied(hosting: FakeHosting, raw: &str) -> bool {
        let probe = FakeProbe::default();
        let chroots = matrix();
        let exclusions = ChrootExclusions::default();
        let logger = Logger::quiet();
        let client = client!(&hosting, &probe, &chroots, &exclusions, &logger);
        client.exists_and_satisfied(&verrel(raw)).await.unwrap()
    }

    #[tokio::test]
    async fn absent_project_is_not_satisfied() {
        assert!(!satisfied(FakeHosting::new(), "libvirt-7.0.0-1.fc35").await);
    }

    #[tokio::test]
    async fn running_or_succeeded_build_satisfies() {
        for builds in [
            vec![BuildState::Running],
            vec![BuildState::Failed, BuildState::Succeeded],
            vec![BuildState::Failed, BuildState::Running],
        ] {
            let hosting =
                FakeHosting::new().with_project(OWNER, "libvirt-7.0.0-1.fc35", &builds);
            assert!(satisfied(hosting, "libvirt-7.0.0-1.fc35").await, "{builds:?}");
        }
    }

    #[tokio::test]
    async fn failed_or_pending_builds_need_republish() {
        for builds in [
            vec![],
            vec![BuildState::Failed],
            vec![BuildState::Pending, BuildState::Failed],
        ] {
            let hosting =
                FakeHosting::new().with_project(OWNER, "libvirt-7.0.0-1.fc35", &builds);
            assert!(!satisfied(hosting, "libvirt-7.0.0-1.fc35").await, "{builds:?}");
        }
    }

    #[tokio::test]
    async fn qemu_kvm_is_looked_up_under_canonical_name() {
        let hosting =
            FakeHosting::new().with_project(OWNER, "qemu-4.2.0-1.el8", &[BuildState::Succeeded]);
        assert!(satisfied(hosting, "qemu-kvm-4.2.0-1.el8").await);
    }

    #[tokio::test]
    async fn publish_creates_project_with_filtered_chroots() {
        let hosting = FakeHosting::new();
        let probe = FakeProbe::default();
        let chroots = matrix();
        let exclusions = edk2_exclusions();
        let logger = Logger::quiet();
        let client = client!(&hosting, &probe, &chroots, &exclusions, &logger);

        let edk2 = verrel("edk2-20210527gite1999b264f1f-3.fc35");
        assert!(client.publish(&edk2).await.unwrap());
        let libvirt = verrel("libvirt-7.0.0-1.fc35");
        assert!(client.publish(&libvirt).await.unwrap());

        assert_eq!(
            hosting.created(),
            vec![
                (
                    "@kubevirt/edk2-20210527gite1999b264f1f-3.fc35".to_string(),
                    vec!["fedora-rawhide-x86_64".to_string()]
                ),
                ("@kubevirt/libvirt-7.0.0-1.fc35".to_string(), matrix()),
            ]
        );
        assert_eq!(
            hosting.submitted()[1],
            (
                "@kubevirt/libvirt-7.0.0-1.fc35".to_string(),
                libvirt.download_url(KOJI)
            )
        );
        assert_eq!(probe.probed().len(), 2);
    }

    #[tokio::test]
    async fn publish_reuses_existing_project() {
        let hosting =
            FakeHosting::new().with_project(OWNER, "libvirt-7.0.0-1.fc35", &[BuildState::Failed]);
        let probe = FakeProbe::default();
        let chroots = matrix();
        let exclusions = ChrootExclusions::default();
        let logger = Logger::quiet();
        let client = client!(&hosting, &probe, &chroots, &exclusions, &logger);

        assert!(client.publish(&verrel("libvirt-7.0.0-1.fc35")).await.unwrap());
        assert!(hosting.created().is_empty());
        assert_eq!(hosting.submitted().len(), 1);
    }

    #[tokio::test]
    async fn failed_build_returns_false() {
        let hosting = FakeHosting::new().failing("libvirt-7.0.0-1.fc35");
        let probe = FakeProbe::default();
        let chroots = matrix();
        let exclusions = ChrootExclusions::default();
        let logger = Logger::quiet();
        let client = client!(&hosting, &probe, &chroots, &exclusions, &logger);

        assert!(!client.publish(&verrel("libvirt-7.0.0-1.fc35")).await.unwrap());
    }

    #[tokio::test]
    async fn unreachable_srpm_fails_before_any_mutation() {
        let libvirt = verrel("libvirt-7.0.0-1.fc35");
        let hosting = FakeHosting::new();
        let probe = FakeProbe::missing(&libvirt.download_url(KOJI));
        let chroots = matrix();
        let exclusions = ChrootExclusions::default();
        let logger = Logger::quiet();
        let client = client!(&hosting, &probe, &chroots, &exclusions, &logger);

        let err = client.publish(&libvirt).await.unwrap_err();
        assert!(matches!(err, MirrorError::Fetch { .. }));
        assert!(hosting.created().is_empty());
        assert!(hosting.submitted().is_empty());
    }

    #[tokio::test]
    async fn local_srpm_is_submitted_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("libvirt-7.0.0-1.fc35.src.rpm");
        std::fs::write(&path, b"srpm").unwrap();
        let local = Verrel::from_srpm(&path).unwrap();

        let hosting = FakeHosting::new();
        let probe = FakeProbe::default();
        let chroots = matrix();
        let exclusions = ChrootExclusions::default();
        let logger = Logger::quiet();
        let client = client!(&hosting, &probe, &chroots, &exclusions, &logger);

        assert!(client.publish(&local).await.unwrap());
        assert_eq!(hosting.submitted()[0].1, path.display().to_string());
        assert!(probe.probed().is_empty());
    }

    #[tokio::test]
    async fn missing_local_srpm_is_fetch_error() {
        let local = Verrel::from_srpm(std::path::Path::new(
            "/nonexistent/libvirt-7.0.0-1.fc35.src.rpm",
        ))
        .unwrap();
        let hosting = FakeHosting::new();
        let probe = FakeProbe::default();
        let chroots = matrix();
        let exclusions = ChrootExclusions::default();
        let logger = Logger::quiet();
        let client = client!(&hosting, &probe, &chroots, &exclusions, &logger);

        let err = client.publish(&local).await.unwrap_err();
        assert!(matches!(err, MirrorError::Fetch { .. }));
    }
}
