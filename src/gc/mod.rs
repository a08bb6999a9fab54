//! Garbage collection of dead sandboxes, exited containers and stale pod
//! log directories.
//!
//! Every entry point reads a fresh snapshot, computes the full deletion set
//! from it, and only then issues deletions. Nothing is carried between
//! passes.

mod error;
mod logs;
mod policy;
pub(crate) mod sandbox;
mod units;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::os::OsInterface;
use crate::pods::PodGetter;
use crate::runtime::{Container, RuntimeService, Sandbox};

pub use error::GcErrors;

use error::{ResourceKind, remove_each};

/// Limits applied to non-running containers during one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GcPolicy {
    /// Containers younger than this are never removed.
    pub min_age: Duration,
    /// Instances kept per (pod, container name). Negative means unlimited.
    pub max_per_pod_container: i32,
    /// Instances kept node-wide. Negative means unlimited.
    pub max_containers: i32,
}

impl Default for GcPolicy {
    fn default() -> Self {
        Self {
            min_age: Duration::ZERO,
            max_per_pod_container: 1,
            max_containers: -1,
        }
    }
}

impl GcPolicy {
    pub fn per_pod_limit(&self) -> Option<usize> {
        usize::try_from(self.max_per_pod_container).ok()
    }

    pub fn global_limit(&self) -> Option<usize> {
        usize::try_from(self.max_containers).ok()
    }
}

/// Where the node keeps container logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPaths {
    /// One directory per pod UID
    pub pod_logs_dir: PathBuf,
    /// Legacy flat directory of per-container log symlinks
    pub container_logs_dir: PathBuf,
}

impl Default for LogPaths {
    fn default() -> Self {
        Self {
            pod_logs_dir: PathBuf::from("/var/log/pods"),
            container_logs_dir: PathBuf::from("/var/log/containers"),
        }
    }
}

/// The collector. Holds only its collaborators, no per-pass state.
pub struct ContainerGc {
    runtime: Arc<dyn RuntimeService>,
    pods: Arc<dyn PodGetter>,
    os: Arc<dyn OsInterface>,
    paths: LogPaths,
}

impl ContainerGc {
    pub fn new(
        runtime: Arc<dyn RuntimeService>,
        pods: Arc<dyn PodGetter>,
        os: Arc<dyn OsInterface>,
        paths: LogPaths,
    ) -> Self {
        Self {
            runtime,
            pods,
            os,
            paths,
        }
    }

    fn list_sandboxes(&self) -> Result<Vec<Sandbox>> {
        self.runtime
            .list_sandboxes()
            .with_context(|| format!("Failed to list pod sandboxes via {}", self.runtime.name()))
    }

    fn list_containers(&self) -> Result<Vec<Container>> {
        self.runtime
            .list_containers()
            .with_context(|| format!("Failed to list containers via {}", self.runtime.name()))
    }

    /// Sandboxes `evict_sandboxes` would remove right now.
    pub fn plan_sandboxes(&self, min_age: Duration) -> Result<Vec<Sandbox>> {
        let sandboxes = self.list_sandboxes()?;
        let containers = self.list_containers()?;
        let selected: Vec<Sandbox> =
            sandbox::select_sandboxes(&sandboxes, &containers, min_age, SystemTime::now())
                .into_iter()
                .cloned()
                .collect();
        debug!(
            total = sandboxes.len(),
            selected = selected.len(),
            "gc:sandbox selection done"
        );
        Ok(selected)
    }

    /// Remove sandboxes that are not ready, hold no containers and are at
    /// least `min_age` old.
    pub fn evict_sandboxes(&self, min_age: Duration) -> Result<()> {
        info!(min_age = ?min_age, "gc:evict_sandboxes start");
        let selected = self.plan_sandboxes(min_age)?;
        remove_each(
            ResourceKind::Sandbox,
            &selected,
            |s| s.id.clone(),
            |s| self.runtime.remove_sandbox(&s.id),
        )
    }

    /// Containers `evict_containers` would remove right now.
    pub fn plan_containers(&self, policy: &GcPolicy, all_sources_ready: bool) -> Result<Vec<Container>> {
        let containers = self.list_containers()?;

        if all_sources_ready {
            let orphaned = policy::evictable(&containers, policy, SystemTime::now())
                .iter()
                .filter(|c| self.pods.is_pod_deleted(&c.pod_uid))
                .count();
            debug!(orphaned, "gc:evictable containers of deleted pods");
        }

        Ok(policy::select_containers(&containers, policy, SystemTime::now())
            .into_iter()
            .cloned()
            .collect())
    }

    /// Remove non-running containers beyond the limits of `policy`.
    pub fn evict_containers(&self, policy: &GcPolicy, all_sources_ready: bool) -> Result<()> {
        info!(
            min_age = ?policy.min_age,
            max_per_pod_container = policy.max_per_pod_container,
            max_containers = policy.max_containers,
            all_sources_ready,
            "gc:evict_containers start"
        );
        let selected = self.plan_containers(policy, all_sources_ready)?;
        remove_each(
            ResourceKind::Container,
            &selected,
            |c| c.id.clone(),
            |c| self.runtime.remove_container(&c.id),
        )
    }

    /// Pod log directories `evict_pod_logs_directories` would remove right now.
    pub fn plan_pod_logs_directories(&self, all_sources_ready: bool) -> Result<Vec<PathBuf>> {
        logs::select_pod_log_dirs(
            self.os.as_ref(),
            self.pods.as_ref(),
            &self.paths.pod_logs_dir,
            all_sources_ready,
        )
    }

    /// Remove log directories of pods the node no longer knows about.
    /// Does nothing until all pod sources are ready.
    pub fn evict_pod_logs_directories(&self, all_sources_ready: bool) -> Result<()> {
        info!(all_sources_ready, "gc:evict_pod_logs_directories start");
        let selected = self.plan_pod_logs_directories(all_sources_ready)?;
        remove_each(
            ResourceKind::PodLogDirectory,
            &selected,
            |p| p.display().to_string(),
            |p| self.os.remove_all(p),
        )
    }

    /// Legacy log symlinks `evict_dangling_log_symlinks` would remove right now.
    pub fn plan_dangling_log_symlinks(&self) -> Result<Vec<PathBuf>> {
        logs::select_dangling_symlinks(self.os.as_ref(), &self.paths.container_logs_dir)
    }

    /// Remove legacy container log symlinks whose target is gone.
    pub fn evict_dangling_log_symlinks(&self) -> Result<()> {
        info!("gc:evict_dangling_log_symlinks start");
        let selected = self.plan_dangling_log_symlinks()?;
        remove_each(
            ResourceKind::LogSymlink,
            &selected,
            |p| p.display().to_string(),
            |p| self.os.remove(p),
        )
    }

    /// Remove pod log directories, then dangling log symlinks. The symlink
    /// sweep runs even if the directory step fails.
    pub fn evict_logs(&self, all_sources_ready: bool) -> Result<()> {
        combine_steps([
            self.evict_pod_logs_directories(all_sources_ready),
            self.evict_dangling_log_symlinks(),
        ])
    }

    /// Run every step of a collection pass. A failing step does not stop
    /// the following ones; all step errors are returned together.
    pub fn garbage_collect(&self, policy: &GcPolicy, all_sources_ready: bool) -> Result<()> {
        combine_steps([
            self.evict_sandboxes(policy.min_age),
            self.evict_containers(policy, all_sources_ready),
            self.evict_logs(all_sources_ready),
        ])?;
        info!("gc:pass complete");
        Ok(())
    }
}

/// Fold the outcomes of independent steps into one result.
fn combine_steps(steps: impl IntoIterator<Item = Result<()>>) -> Result<()> {
    let mut errors = Vec::new();
    for step in steps {
        match step {
            Ok(()) => {}
            // Nested step groups are flattened
            Err(e) => match e.downcast::<GcErrors>() {
                Ok(nested) => errors.extend(nested.errors),
                Err(e) => errors.push(e),
            },
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(GcErrors { errors }.into())
    }
}


#[cfg(test)]
mod tests {
    use super::error::RemovalErrors;
    use super::testutil::*;
    use super::*;
    use crate::os::fake::FakeOs;
    use crate::pods::{KnownPods, Pod};
    use crate::runtime::SandboxState;
    use crate::runtime::fake::FakeRuntime;
    use std::path::Path;

    const HOUR: Duration = Duration::from_secs(3600);

    fn known(uids: &[&str]) -> Arc<KnownPods> {
        Arc::new(KnownPods::new(uids.iter().map(|uid| Pod {
            uid: uid.to_string(),
            name: format!("name-{}", uid),
            namespace: "new".to_string(),
        })))
    }

    fn collector(runtime: Arc<FakeRuntime>, pods: Arc<KnownPods>, os: Arc<FakeOs>) -> ContainerGc {
        ContainerGc::new(runtime, pods, os, LogPaths::default())
    }

    fn with_runtime(runtime: &Arc<FakeRuntime>) -> ContainerGc {
        collector(runtime.clone(), known(&[]), Arc::new(FakeOs::default()))
    }

    #[test]
    fn policy_limits() {
        let p = policy(Duration::ZERO, -1, 6);
        assert_eq!(p.per_pod_limit(), None);
        assert_eq!(p.global_limit(), Some(6));
        assert_eq!(GcPolicy::default().per_pod_limit(), Some(1));
        assert_eq!(GcPolicy::default().global_limit(), None);
        assert_eq!(policy(Duration::ZERO, -7, 0).per_pod_limit(), None);
    }

    #[test]
    fn sandbox_scenarios() {
        // Not ready and empty: removed
        let runtime = Arc::new(FakeRuntime::new(
            vec![sandbox("1234", 0, SandboxState::NotReady, 0)],
            vec![],
        ));
        with_runtime(&runtime).evict_sandboxes(Duration::ZERO).unwrap();
        assert!(runtime.sandbox_ids().is_empty());

        // Ready: retained
        let runtime = Arc::new(FakeRuntime::new(
            vec![sandbox("1234", 0, SandboxState::Ready, 0)],
            vec![],
        ));
        with_runtime(&runtime).evict_sandboxes(Duration::ZERO).unwrap();
        assert_eq!(runtime.sandbox_ids(), vec!["1234-0"]);

        // Not ready but holding an exited container: retained
        let runtime = Arc::new(FakeRuntime::new(
            vec![sandbox("1234", 0, SandboxState::NotReady, 0)],
            vec![exited("1234", "bar1", 0, 0)],
        ));
        with_runtime(&runtime).evict_sandboxes(Duration::ZERO).unwrap();
        assert_eq!(runtime.sandbox_ids(), vec!["1234-0"]);
    }

    #[test]
    fn sandbox_min_age() {
        let mut young = sandbox("1234", 0, SandboxState::NotReady, 0);
        young.created_at = SystemTime::now();
        let mut old = sandbox("5678", 0, SandboxState::NotReady, 0);
        old.created_at = SystemTime::now() - 2 * HOUR;
        let runtime = Arc::new(FakeRuntime::new(vec![young, old], vec![]));

        with_runtime(&runtime).evict_sandboxes(HOUR).unwrap();
        assert_eq!(runtime.sandbox_ids(), vec!["1234-0"]);
    }

    #[test]
    fn container_scenarios_from_default_policy() {
        // Three pods with attempts {2,1,0}: each keeps {2,1}
        let mut containers = Vec::new();
        for pod in ["foo", "foo1", "foo2"] {
            for attempt in (0..3).rev() {
                containers.push(exited(pod, "bar", attempt, attempt as i64));
            }
        }
        let runtime = Arc::new(FakeRuntime::new(vec![], containers));
        let gc = with_runtime(&runtime);

        gc.evict_containers(&policy(HOUR, 2, 6), true).unwrap();
        assert_eq!(
            runtime.container_ids(),
            vec![
                "foo-bar-2",
                "foo-bar-1",
                "foo1-bar-2",
                "foo1-bar-1",
                "foo2-bar-2",
                "foo2-bar-1"
            ]
        );

        // A second pass over the same state changes nothing
        let removed = runtime.removed().len();
        gc.evict_containers(&policy(HOUR, 2, 6), true).unwrap();
        assert_eq!(runtime.removed().len(), removed);
    }

    #[test]
    fn fairness_cap_keeps_newest_per_pod() {
        let mut containers = Vec::new();
        for i in 0..5 {
            let pod = format!("foo{}", i);
            containers.push(exited(&pod, "bar", 1, 1));
            containers.push(exited(&pod, "bar", 0, 0));
        }
        let runtime = Arc::new(FakeRuntime::new(vec![], containers));

        with_runtime(&runtime)
            .evict_containers(&policy(HOUR, 2, 6), true)
            .unwrap();
        let kept = runtime.container_ids();
        assert_eq!(kept.len(), 5);
        assert!(kept.iter().all(|id| id.ends_with("-1")));
    }

    #[test]
    fn dry_run_plans_without_removing() {
        let containers: Vec<Container> =
            (0..5).rev().map(|a| exited("foo", "bar", a, a as i64)).collect();
        let runtime = Arc::new(FakeRuntime::new(vec![], containers));
        let gc = with_runtime(&runtime);

        let plan = gc
            .plan_containers(&policy(Duration::from_secs(60), -1, 4), true)
            .unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].id, "foo-bar-0");
        assert!(runtime.removed().is_empty());
    }

    #[test]
    fn failed_removals_do_not_stop_the_pass() {
        let containers: Vec<Container> =
            (0..4).rev().map(|a| exited("foo", "bar", a, a as i64)).collect();
        let runtime = Arc::new(FakeRuntime::new(vec![], containers));
        runtime.fail_removal_of("foo-bar-1");

        let err = with_runtime(&runtime)
            .evict_containers(&policy(Duration::ZERO, 1, -1), true)
            .unwrap_err();

        let failures = &err.downcast_ref::<RemovalErrors>().unwrap().failures;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].id, "foo-bar-1");
        assert_eq!(failures[0].kind, ResourceKind::Container);
        assert_eq!(runtime.container_ids(), vec!["foo-bar-3", "foo-bar-1"]);
    }

    #[test]
    fn inventory_failure_aborts_before_any_removal() {
        let runtime = Arc::new(FakeRuntime::new(
            vec![sandbox("1234", 0, SandboxState::NotReady, 0)],
            vec![exited("foo", "bar", 0, 0), exited("foo", "bar", 1, 1)],
        ));
        runtime.fail_listing();
        let gc = with_runtime(&runtime);

        let err = gc.evict_containers(&GcPolicy::default(), true).unwrap_err();
        assert!(err.to_string().contains("Failed to list containers"));
        assert!(gc.evict_sandboxes(Duration::ZERO).is_err());
        assert!(runtime.removed().is_empty());
    }

    #[test]
    fn pod_log_directories_follow_sources_ready() {
        let root = Path::new("/var/log/pods");
        let mut os = FakeOs::default();
        os.dirs.insert(
            root.to_path_buf(),
            ["123", "456", "789", "012"].iter().map(|s| s.to_string()).collect(),
        );
        let os = Arc::new(os);
        let gc = collector(
            Arc::new(FakeRuntime::default()),
            known(&["123", "456"]),
            os.clone(),
        );

        gc.evict_pod_logs_directories(false).unwrap();
        assert!(os.removes().is_empty());

        gc.evict_pod_logs_directories(true).unwrap();
        assert_eq!(os.removes(), vec![root.join("789"), root.join("012")]);
    }

    #[test]
    fn pod_log_removal_errors_are_aggregated() {
        let root = Path::new("/var/log/pods");
        let mut os = FakeOs::default();
        os.dirs
            .insert(root.to_path_buf(), vec!["a".to_string(), "b".to_string()]);
        os.failing.insert(root.join("a"));
        let os = Arc::new(os);
        let gc = collector(Arc::new(FakeRuntime::default()), known(&[]), os.clone());

        let err = gc.evict_pod_logs_directories(true).unwrap_err();
        let failures = &err.downcast_ref::<RemovalErrors>().unwrap().failures;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, ResourceKind::PodLogDirectory);
        assert_eq!(os.removes(), vec![root.join("b")]);
    }

    #[test]
    fn garbage_collect_runs_every_step_despite_failures() {
        let runtime = Arc::new(FakeRuntime::new(
            vec![
                sandbox("gone", 0, SandboxState::NotReady, 0),
                sandbox("stuck", 0, SandboxState::NotReady, 0),
            ],
            vec![exited("foo", "bar", 1, 1), exited("foo", "bar", 0, 0)],
        ));
        runtime.fail_removal_of("stuck-0");

        let dead_link = PathBuf::from("/var/log/containers/x_y_z-abc.log");
        let mut os = FakeOs::default();
        os.dirs
            .insert(PathBuf::from("/var/log/pods"), vec!["gone".to_string()]);
        os.globs.insert(
            "/var/log/containers/*.log".to_string(),
            vec![dead_link.clone()],
        );
        let os = Arc::new(os);
        let gc = collector(runtime.clone(), known(&["foo"]), os.clone());

        let err = gc
            .garbage_collect(&policy(Duration::ZERO, 1, -1), true)
            .unwrap_err();
        let errors = &err.downcast_ref::<GcErrors>().unwrap().errors;
        assert_eq!(errors.len(), 1);

        assert_eq!(runtime.sandbox_ids(), vec!["stuck-0"]);
        assert_eq!(runtime.container_ids(), vec!["foo-bar-1"]);
        assert_eq!(
            os.removes(),
            vec![PathBuf::from("/var/log/pods/gone"), dead_link]
        );
    }

    #[test]
    fn log_sweep_runs_after_directory_failure() {
        let dead_link = PathBuf::from("/var/log/containers/x_y_z-abc.log");
        let mut os = FakeOs::default();
        os.unreadable.insert(PathBuf::from("/var/log/pods"));
        os.globs.insert(
            "/var/log/containers/*.log".to_string(),
            vec![dead_link.clone()],
        );
        let os = Arc::new(os);
        let gc = collector(Arc::new(FakeRuntime::default()), known(&[]), os.clone());

        let err = gc.evict_logs(true).unwrap_err();
        let errors = &err.downcast_ref::<GcErrors>().unwrap().errors;
        assert_eq!(errors.len(), 1);
        assert_eq!(os.removes(), vec![dead_link]);

        // Nothing to fail once sources are not ready
        gc.evict_logs(false).unwrap();
    }

    #[test]
    fn garbage_collect_flattens_step_errors() {
        let runtime = Arc::new(FakeRuntime::default());
        runtime.fail_listing();
        let mut os = FakeOs::default();
        os.unreadable.insert(PathBuf::from("/var/log/pods"));
        let gc = collector(runtime, known(&[]), Arc::new(os));

        let err = gc.garbage_collect(&GcPolicy::default(), true).unwrap_err();
        let errors = &err.downcast_ref::<GcErrors>().unwrap().errors;
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn garbage_collect_succeeds_on_clean_node() {
        let runtime = Arc::new(FakeRuntime::default());
        let gc = collector(runtime, known(&[]), Arc::new(FakeOs::default()));
        gc.garbage_collect(&GcPolicy::default(), true).unwrap();
    }
}
