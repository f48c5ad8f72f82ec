//! Local index of Build objects.
//!
//! Populated by the Build feed and by the reconciler's own successful status
//! writes, so a write is visible before the feed echoes it back. The
//! reconciler reads it to map a worker pod back to its owning build through
//! the `(namespace, pod name)` index.
//!
//! Build phases only move forward, so a stored status that is further along
//! than an incoming one is kept: a redelivered or lagging event never undoes
//! a transition this controller already persisted.

use crds::{Build, BuildPhase, BuildStatus, build_pod_name};
use kube::ResourceExt;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;
use watch_runtime::EventType;

/// Namespaced object identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    /// Namespace
    pub namespace: String,
    /// Object name
    pub name: String,
}

impl ObjectKey {
    /// Creates a key.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of a build object.
    pub fn for_build(build: &Build) -> Self {
        Self::new(build.namespace().unwrap_or_default(), build.name_any())
    }
}

#[derive(Debug, Default)]
struct Inner {
    builds: HashMap<ObjectKey, Build>,
    by_pod: HashMap<ObjectKey, ObjectKey>,
}

impl Inner {
    fn pod_key(build: &Build, key: &ObjectKey) -> ObjectKey {
        let pod = build
            .pod_id()
            .map_or_else(|| build_pod_name(&key.name), str::to_string);
        ObjectKey::new(key.namespace.clone(), pod)
    }

    /// `build`, carrying the stored status instead when the stored copy of
    /// the same object is further along.
    fn merged(&self, key: &ObjectKey, build: &Build) -> Build {
        let mut merged = build.clone();
        if let Some(stored) = self.builds.get(key) {
            if stored.metadata.uid == build.metadata.uid
                && phase_rank(stored.phase()) > phase_rank(build.phase())
            {
                debug!(
                    "Keeping {} status of build {}/{} over incoming {}",
                    stored.phase(),
                    key.namespace,
                    key.name,
                    build.phase()
                );
                merged.status.clone_from(&stored.status);
            }
        }
        merged
    }

    fn remove(&mut self, key: &ObjectKey) -> Option<Build> {
        let previous = self.builds.remove(key)?;
        self.by_pod.remove(&Self::pod_key(&previous, key));
        Some(previous)
    }
}

fn phase_rank(phase: BuildPhase) -> u8 {
    match phase {
        BuildPhase::New => 0,
        BuildPhase::Pending => 1,
        BuildPhase::Running => 2,
        BuildPhase::Complete | BuildPhase::Failed => 3,
    }
}

/// Shared, eventually consistent view of Build objects.
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct BuildStore {
    inner: Arc<RwLock<Inner>>,
}

impl BuildStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one feed notification: upsert on Added/Modified, remove on
    /// Deleted. The pod index is updated in the same step.
    ///
    /// Returns the build as stored after an upsert.
    pub fn apply(&self, event_type: EventType, build: &Build) -> Option<Build> {
        match event_type {
            EventType::Added | EventType::Modified => Some(self.upsert(build)),
            EventType::Deleted => {
                self.remove(build);
                None
            }
            EventType::Error => None,
        }
    }

    /// Inserts or replaces a build, returning the stored copy.
    pub fn upsert(&self, build: &Build) -> Build {
        let key = ObjectKey::for_build(build);
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let merged = inner.merged(&key, build);
        let pod_key = Inner::pod_key(&merged, &key);
        inner.remove(&key);
        debug!("Indexed build {}/{} under pod {}", key.namespace, key.name, pod_key.name);
        inner.by_pod.insert(pod_key, key.clone());
        inner.builds.insert(key, merged.clone());
        merged
    }

    /// Records a status this controller has just persisted for `build`.
    pub fn record_status(&self, build: &Build, status: &BuildStatus) {
        let mut updated = build.clone();
        updated.status = Some(status.clone());
        self.upsert(&updated);
    }

    /// Latest known state of `build`: the stored copy's status when it is
    /// further along, `build` itself otherwise.
    pub fn current(&self, build: &Build) -> Build {
        let key = ObjectKey::for_build(build);
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.merged(&key, build)
    }

    /// Removes a build.
    pub fn remove(&self, build: &Build) {
        let key = ObjectKey::for_build(build);
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.remove(&key);
    }

    /// Returns a copy of the stored build.
    pub fn get(&self, key: &ObjectKey) -> Option<Build> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.builds.get(key).cloned()
    }

    /// Resolves the build that owns a worker pod.
    pub fn find_by_pod(&self, namespace: &str, pod_name: &str) -> Option<Build> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let key = inner.by_pod.get(&ObjectKey::new(namespace, pod_name))?;
        inner.builds.get(key).cloned()
    }

    /// Number of stored builds.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).builds.len()
    }

    /// True if no builds are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_build, with_phase};

    #[test]
    fn test_find_by_derived_pod_name() {
        let store = BuildStore::new();
        store.apply(EventType::Added, &create_test_build("b1", "default"));

        let found = store.find_by_pod("default", "build-b1").unwrap();
        assert_eq!(found.name_any(), "b1");
        assert!(store.find_by_pod("other", "build-b1").is_none(), "index is namespaced");
    }

    #[test]
    fn test_find_by_recorded_pod_id() {
        let store = BuildStore::new();
        let mut build = with_phase(create_test_build("b1", "default"), BuildPhase::Pending);
        if let Some(status) = build.status.as_mut() {
            status.pod_id = Some("custom-pod".to_string());
        }
        store.apply(EventType::Modified, &build);

        assert!(store.find_by_pod("default", "custom-pod").is_some());
        assert!(store.find_by_pod("default", "build-b1").is_none());
    }

    #[test]
    fn test_modified_replaces_stored_build() {
        let store = BuildStore::new();
        store.apply(EventType::Added, &create_test_build("b1", "default"));
        store.apply(
            EventType::Modified,
            &with_phase(create_test_build("b1", "default"), BuildPhase::Running),
        );

        assert_eq!(store.len(), 1);
        let found = store.find_by_pod("default", "build-b1").unwrap();
        assert_eq!(found.phase(), BuildPhase::Running);
    }

    #[test]
    fn test_deleted_drops_build_and_index() {
        let store = BuildStore::new();
        let build = create_test_build("b1", "default");
        store.apply(EventType::Added, &build);
        store.apply(EventType::Deleted, &build);

        assert!(store.is_empty());
        assert!(store.find_by_pod("default", "build-b1").is_none());
        assert!(store.get(&ObjectKey::new("default", "b1")).is_none());
    }

    #[test]
    fn test_stale_event_does_not_regress_phase() {
        let store = BuildStore::new();
        let build = create_test_build("b1", "default");
        store.apply(EventType::Added, &build);
        store.record_status(
            &build,
            &BuildStatus {
                phase: BuildPhase::Pending,
                pod_id: Some("build-b1".to_string()),
            },
        );

        let current = store.apply(EventType::Added, &build).unwrap();
        assert_eq!(current.phase(), BuildPhase::Pending, "redelivered New must not win");
        assert_eq!(store.current(&build).phase(), BuildPhase::Pending);

        let running = with_phase(create_test_build("b1", "default"), BuildPhase::Running);
        let current = store.apply(EventType::Modified, &running).unwrap();
        assert_eq!(current.phase(), BuildPhase::Running, "newer phase replaces the stored one");
    }

    #[test]
    fn test_recreated_build_is_not_merged() {
        let store = BuildStore::new();
        let mut old = with_phase(create_test_build("b1", "default"), BuildPhase::Complete);
        old.metadata.uid = Some("uid-1".to_string());
        store.apply(EventType::Added, &old);

        let mut fresh = create_test_build("b1", "default");
        fresh.metadata.uid = Some("uid-2".to_string());
        let current = store.apply(EventType::Added, &fresh).unwrap();
        assert_eq!(current.phase(), BuildPhase::New);
    }

    #[test]
    fn test_clones_share_state() {
        let store = BuildStore::new();
        let view = store.clone();
        store.apply(EventType::Added, &create_test_build("b1", "default"));
        assert_eq!(view.len(), 1);
    }
}
