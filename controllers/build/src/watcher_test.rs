//! End-to-end tests driving the build and pod watch loops

#[cfg(test)]
mod tests {
    use crate::test_utils::*;
    use crate::watcher::{BuildEventHandler, PodEventHandler};
    use crds::{Build, BuildPhase};
    use k8s_openapi::api::core::v1::Pod;
    use std::sync::Arc;
    use watch_runtime::{
        LoopOutcome, RecordingSleeper, ReconciliationLoop, ScriptedSource, WatchEvent,
    };

    fn versioned<K: kube::Resource>(mut object: K, version: &str) -> K {
        object.meta_mut().resource_version = Some(version.to_string());
        object
    }

    #[tokio::test]
    async fn test_build_lifecycle_end_to_end() {
        let strategy = FakeStrategy::new();
        let pods = FakePodCreator::new(PodCreateMode::Succeed);
        let updater = RecordingUpdater::new();
        let reconciler = Arc::new(create_test_reconciler(&strategy, &pods, &updater));
        let sleeper = Arc::new(RecordingSleeper::new());

        let builds: Arc<ScriptedSource<Build>> = Arc::new(ScriptedSource::new("Build"));
        let worker_pods: Arc<ScriptedSource<Pod>> = Arc::new(ScriptedSource::new("Pod"));
        let build_handler = BuildEventHandler::new(reconciler.clone());
        let pod_handler = PodEventHandler::new(reconciler.clone());
        let mut build_loop =
            ReconciliationLoop::new(builds.clone(), build_handler).with_sleeper(sleeper.clone());
        let mut pod_loop =
            ReconciliationLoop::new(worker_pods.clone(), pod_handler).with_sleeper(sleeper.clone());

        // Dispatch; the same Added event delivered twice dispatches once
        let added = versioned(create_test_build("b1", "default"), "1");
        builds.push_feed(vec![
            Ok(WatchEvent::Added(added.clone())),
            Ok(WatchEvent::Added(added)),
        ]);
        assert_eq!(build_loop.iterate().await, LoopOutcome::Closed);
        assert_eq!(strategy.calls(), 1);
        assert_eq!(pods.created().len(), 1);
        let writes = updater.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].status.phase, BuildPhase::Pending);
        assert_eq!(writes[0].status.pod_id.as_deref(), Some("build-b1"));

        // The feed echoes the persisted Pending status; nothing further happens
        builds.push_feed(vec![Ok(WatchEvent::Modified(versioned(
            with_phase(create_test_build("b1", "default"), BuildPhase::Pending),
            "2",
        )))]);
        build_loop.iterate().await;
        assert_eq!(updater.writes().len(), 1);
        assert_eq!(pods.created().len(), 1);

        // Worker finishes; the same pod state delivered twice completes once
        let succeeded = versioned(create_test_pod("build-b1", "default", "Succeeded", &[0]), "3");
        worker_pods.push_feed(vec![
            Ok(WatchEvent::Modified(succeeded.clone())),
            Ok(WatchEvent::Modified(succeeded)),
        ]);
        pod_loop.iterate().await;
        assert_eq!(updater.phases(), vec![BuildPhase::Pending, BuildPhase::Complete]);

        // Later Build and Pod events write nothing
        builds.push_feed(vec![Ok(WatchEvent::Modified(versioned(
            with_phase(create_test_build("b1", "default"), BuildPhase::Complete),
            "4",
        )))]);
        build_loop.iterate().await;
        worker_pods.push_feed(vec![
            Ok(WatchEvent::Modified(versioned(
                create_test_pod("build-b1", "default", "Succeeded", &[0]),
                "5",
            ))),
            Ok(WatchEvent::Deleted(versioned(
                create_test_pod("build-b1", "default", "Succeeded", &[0]),
                "6",
            ))),
        ]);
        pod_loop.iterate().await;

        assert_eq!(updater.phases(), vec![BuildPhase::Pending, BuildPhase::Complete]);
        assert_eq!(build_loop.version(), "4");
        assert_eq!(pod_loop.version(), "6");
        assert!(sleeper.slept().is_empty());
    }

    #[tokio::test]
    async fn test_deleted_build_is_dropped_from_store() {
        let strategy = FakeStrategy::new();
        let pods = FakePodCreator::new(PodCreateMode::Succeed);
        let updater = RecordingUpdater::new();
        let reconciler = Arc::new(create_test_reconciler(&strategy, &pods, &updater));

        let builds: Arc<ScriptedSource<Build>> = Arc::new(ScriptedSource::new("Build"));
        let handler = BuildEventHandler::new(reconciler.clone());
        let mut build_loop = ReconciliationLoop::new(builds.clone(), handler);

        let running = with_phase(create_test_build("b1", "default"), BuildPhase::Running);
        builds.push_feed(vec![
            Ok(WatchEvent::Added(versioned(running.clone(), "1"))),
            Ok(WatchEvent::Deleted(versioned(running, "2"))),
        ]);
        build_loop.iterate().await;

        assert!(reconciler.store().is_empty());
        assert!(updater.writes().is_empty(), "running builds are not re-dispatched");

        let handler = PodEventHandler::new(reconciler.clone());
        let pod = create_test_pod("build-b1", "default", "Succeeded", &[0]);
        watch_runtime::EventHandler::handle(&handler, watch_runtime::EventType::Modified, pod)
            .await
            .unwrap();
        assert!(updater.writes().is_empty(), "pods of deleted builds are ignored");
    }

    #[tokio::test]
    async fn test_pod_events_before_build_echo_are_applied() {
        let strategy = FakeStrategy::new();
        let pods = FakePodCreator::new(PodCreateMode::Succeed);
        let updater = RecordingUpdater::new();
        let reconciler = Arc::new(create_test_reconciler(&strategy, &pods, &updater));

        let builds: Arc<ScriptedSource<Build>> = Arc::new(ScriptedSource::new("Build"));
        let worker_pods: Arc<ScriptedSource<Pod>> = Arc::new(ScriptedSource::new("Pod"));
        let build_handler = BuildEventHandler::new(reconciler.clone());
        let pod_handler = PodEventHandler::new(reconciler.clone());
        let mut build_loop = ReconciliationLoop::new(builds.clone(), build_handler);
        let mut pod_loop = ReconciliationLoop::new(worker_pods.clone(), pod_handler);

        builds.push_feed(vec![Ok(WatchEvent::Added(versioned(
            create_test_build("b1", "default"),
            "1",
        )))]);
        build_loop.iterate().await;

        // Pod runs and finishes before the Build feed delivers Pending
        worker_pods.push_feed(vec![
            Ok(WatchEvent::Added(versioned(
                create_test_pod("build-b1", "default", "Running", &[]),
                "2",
            ))),
            Ok(WatchEvent::Modified(versioned(
                create_test_pod("build-b1", "default", "Succeeded", &[0]),
                "3",
            ))),
        ]);
        pod_loop.iterate().await;

        // The lagging echoes arrive afterwards
        builds.push_feed(vec![
            Ok(WatchEvent::Modified(versioned(
                with_phase(create_test_build("b1", "default"), BuildPhase::Pending),
                "4",
            ))),
            Ok(WatchEvent::Modified(versioned(
                with_phase(create_test_build("b1", "default"), BuildPhase::Running),
                "5",
            ))),
        ]);
        build_loop.iterate().await;

        assert_eq!(
            updater.phases(),
            vec![BuildPhase::Pending, BuildPhase::Running, BuildPhase::Complete]
        );
        assert_eq!(pods.created().len(), 1);
        let stored = reconciler.store().find_by_pod("default", "build-b1").unwrap();
        assert_eq!(stored.phase(), BuildPhase::Complete, "stale echoes do not regress the store");
    }
}
