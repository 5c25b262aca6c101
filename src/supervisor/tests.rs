//! Worker Supervisor Tests
//!
//! ## Test Scopes
//! - **State Machine**: allowed record transitions and timeout invariants.
//! - **Start Protocol**: handshake success, load failures, crashes, timeouts.
//! - **Serving**: health route, prefixes, worker identity on live ports.
//! - **Stop Protocol**: graceful drain, forced exit, stop-wait bound.
//! - **Batches & Concurrency**: fail-fast start, stop-all, per-name serialization.

#[cfg(test)]
mod tests {
    use crate::plugin::{CONTRACT_MARKER, HealthBody, LoadError, Loader, ManifestLoader, Module};
    use crate::supervisor::{
        RunnerCommand, RunnerEvent, StartPayload, StopOutcome, SupervisorError, SupervisorTimeouts,
        WorkerConfig, WorkerLauncher, WorkerRecord, WorkerStatus, WorkerSupervisor,
    };
    use crate::unit::{IsolatedUnit, UnitContext, UnitError, UnitExit, UnitHandle};

    use axum::http::StatusCode;
    use serde_json::json;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    fn free_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    fn write_artifact(dir: &Path, file: &str, routes: serde_json::Value) -> PathBuf {
        let path = dir.join(file);
        let manifest = json!({ "contract": CONTRACT_MARKER, "app": { "routes": routes } });
        std::fs::write(&path, manifest.to_string()).unwrap();
        path
    }

    fn ping_artifact(dir: &Path) -> PathBuf {
        write_artifact(dir, "ping.json", json!([{ "method": "GET", "path": "/ping", "body": "pong" }]))
    }

    fn manifest_supervisor() -> Arc<WorkerSupervisor> {
        WorkerSupervisor::with_runner(ManifestLoader::new(), SupervisorTimeouts::default()).unwrap()
    }

    fn url(port: u16, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", port, path)
    }

    /// Answers `start` but ignores `terminate`.
    struct SilentLauncher;

    impl WorkerLauncher for SilentLauncher {
        fn launch(&self, config: &WorkerConfig) -> Result<UnitHandle<RunnerCommand, RunnerEvent>, UnitError> {
            IsolatedUnit::spawn(
                format!("silent-{}", config.name),
                |mut ctx: UnitContext<RunnerCommand, RunnerEvent>| async move {
                    while let Some(command) = ctx.recv().await {
                        if let RunnerCommand::Start(payload) = command {
                            ctx.emit(RunnerEvent::Started {
                                message: format!("Worker {} pretending", payload.name),
                            });
                        }
                    }
                    UnitExit::Clean
                },
            )
        }
    }

    /// Never answers anything.
    struct MuteLauncher;

    impl WorkerLauncher for MuteLauncher {
        fn launch(&self, config: &WorkerConfig) -> Result<UnitHandle<RunnerCommand, RunnerEvent>, UnitError> {
            IsolatedUnit::spawn(
                format!("mute-{}", config.name),
                |mut ctx: UnitContext<RunnerCommand, RunnerEvent>| async move {
                    while ctx.recv().await.is_some() {}
                    UnitExit::Clean
                },
            )
        }
    }

    struct ThrowingLoader;

    impl Loader for ThrowingLoader {
        fn load(&self, _path: &Path) -> Result<Module, LoadError> {
            Err(LoadError::Init("boom".to_string()))
        }
    }

    struct PanickingLoader;

    impl Loader for PanickingLoader {
        fn load(&self, _path: &Path) -> Result<Module, LoadError> {
            panic!("loader panicked");
        }
    }

    // ============================================================
    // TEST 1: State Machine
    // ============================================================

    #[test]
    fn test_record_transitions() {
        let mut record = WorkerRecord::starting(3001);
        assert!(record.transition(WorkerStatus::Stopped).is_err());
        assert!(record.transition(WorkerStatus::Running).is_ok());
        assert!(record.uptime().is_some());
        assert!(record.transition(WorkerStatus::Error).is_err());
        assert!(record.transition(WorkerStatus::Stopped).is_ok());
        assert!(record.uptime().is_none());

        let mut failed = WorkerRecord::starting(3002);
        assert!(failed.transition(WorkerStatus::Error).is_ok());
        assert!(failed.transition(WorkerStatus::Running).is_err());
    }

    #[test]
    fn test_stop_wait_must_exceed_graceful_shutdown() {
        let timeouts = SupervisorTimeouts {
            graceful_shutdown: Duration::from_secs(30),
            stop_wait: Duration::from_secs(30),
            start: None,
        };

        let result = WorkerSupervisor::new(Arc::new(SilentLauncher), timeouts);

        assert!(matches!(result, Err(SupervisorError::InvalidTimeouts(_))));
        assert!(SupervisorTimeouts::default().validate().is_ok());
    }

    #[test]
    fn test_config_defaults_from_toml() {
        let config: WorkerConfig = toml::from_str(
            r#"
            name = "A"
            port = 4001
            artifact_path = "/srv/a/handler.json"
            "#,
        )
        .unwrap();

        assert!(config.enabled);
        assert!(config.health_check);
        assert_eq!(config.prefix, None);
        assert!(config.env.is_empty());
    }

    #[test]
    fn test_start_message_shape() {
        let mut config = WorkerConfig::new("A", 4001, "/a/handler.json");
        config.prefix = Some("/api".to_string());

        let value = serde_json::to_value(RunnerCommand::Start(StartPayload::from(&config))).unwrap();

        assert_eq!(
            value,
            json!({
                "type": "start",
                "name": "A",
                "port": 4001,
                "artifactPath": "/a/handler.json",
                "healthCheck": true,
                "prefix": "/api"
            })
        );
        assert_eq!(
            serde_json::to_value(RunnerCommand::Terminate).unwrap(),
            json!({ "type": "terminate" })
        );
        assert_eq!(
            serde_json::to_value(RunnerEvent::ShutdownError { error: "x".into() }).unwrap(),
            json!({ "type": "shutdown-error", "error": "x" })
        );
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(SupervisorError::NotFound("a".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(SupervisorError::AlreadyRunning("a".into()).status(), StatusCode::CONFLICT);
        assert_eq!(SupervisorError::Disabled("a".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            SupervisorError::Timeout {
                name: "a".into(),
                limit: Duration::from_secs(1)
            }
            .status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    // ============================================================
    // TEST 2: Start Protocol
    // ============================================================

    #[tokio::test]
    async fn test_clean_artifact_reaches_running() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let port = free_port();
        let supervisor = manifest_supervisor();
        supervisor
            .register_worker(WorkerConfig::new("A", port, ping_artifact(dir.path())))
            .await;

        // ACT
        let message = supervisor.start_worker("A").await.unwrap();

        // ASSERT
        assert_eq!(message, format!("Worker A started on port {}", port));
        assert_eq!(
            supervisor.worker_status("A").await.unwrap().status,
            WorkerStatus::Running
        );
        assert_eq!(supervisor.running_count(), 1);

        supervisor.stop_all().await;
    }

    #[tokio::test]
    async fn test_unloadable_artifact_ends_in_error() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let supervisor = manifest_supervisor();
        supervisor
            .register_worker(WorkerConfig::new("B", free_port(), dir.path().join("missing.json")))
            .await;

        // ACT
        let result = supervisor.start_worker("B").await;

        // ASSERT
        match result {
            Err(SupervisorError::StartFailed { name, error }) => {
                assert_eq!(name, "B");
                assert!(error.contains("missing.json"), "unexpected error: {}", error);
            }
            other => panic!("expected StartFailed, got {:?}", other),
        }
        assert_eq!(supervisor.worker_status("B").await.unwrap().status, WorkerStatus::Error);
        assert_eq!(supervisor.running_count(), 0);
    }

    #[tokio::test]
    async fn test_throwing_loader_message_is_forwarded() {
        let supervisor =
            WorkerSupervisor::with_runner(Arc::new(ThrowingLoader), SupervisorTimeouts::default()).unwrap();
        supervisor
            .register_worker(WorkerConfig::new("T", free_port(), "/nowhere/handler.json"))
            .await;

        let result = supervisor.start_worker("T").await;

        match result {
            Err(SupervisorError::StartFailed { error, .. }) => assert_eq!(error, "boom"),
            other => panic!("expected StartFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_contract_violation_rejects_start() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-app.json");
        std::fs::write(&path, json!({ "contract": CONTRACT_MARKER }).to_string()).unwrap();
        let supervisor = manifest_supervisor();
        supervisor.register_worker(WorkerConfig::new("V", free_port(), path)).await;

        let result = supervisor.start_worker("V").await;

        match result {
            Err(SupervisorError::StartFailed { error, .. }) => {
                assert_eq!(error, "Module does not export a valid app instance")
            }
            other => panic!("expected StartFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_panicking_loader_is_a_unit_crash() {
        let supervisor =
            WorkerSupervisor::with_runner(Arc::new(PanickingLoader), SupervisorTimeouts::default()).unwrap();
        supervisor
            .register_worker(WorkerConfig::new("P", free_port(), "/nowhere/handler.json"))
            .await;

        let result = supervisor.start_worker("P").await;

        match result {
            Err(SupervisorError::UnitCrash { message, .. }) => assert!(message.contains("loader panicked")),
            other => panic!("expected UnitCrash, got {:?}", other),
        }
        assert_eq!(supervisor.worker_status("P").await.unwrap().status, WorkerStatus::Error);
    }

    #[tokio::test]
    async fn test_bind_failure_rejects_start() {
        // ARRANGE: hold the port so the worker cannot bind it
        let dir = tempfile::tempdir().unwrap();
        let blocker = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
        let port = blocker.local_addr().unwrap().port();
        let supervisor = manifest_supervisor();
        supervisor
            .register_worker(WorkerConfig::new("A", port, ping_artifact(dir.path())))
            .await;

        // ACT
        let result = supervisor.start_worker("A").await;

        // ASSERT
        match result {
            Err(SupervisorError::StartFailed { error, .. }) => {
                assert!(error.contains(&port.to_string()))
            }
            other => panic!("expected StartFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_and_disabled_workers() {
        let supervisor = manifest_supervisor();
        let mut disabled = WorkerConfig::new("D", free_port(), "/x/handler.json");
        disabled.enabled = false;
        supervisor.register_worker(disabled).await;

        assert!(matches!(
            supervisor.start_worker("ghost").await,
            Err(SupervisorError::NotFound(_))
        ));
        assert!(matches!(
            supervisor.start_worker("D").await,
            Err(SupervisorError::Disabled(_))
        ));
        assert!(supervisor.start_all().await.unwrap().is_empty());
        assert_eq!(supervisor.worker_status("D").await.unwrap().status, WorkerStatus::Stopped);
    }

    #[tokio::test]
    async fn test_start_timeout() {
        let timeouts = SupervisorTimeouts {
            start: Some(Duration::from_millis(100)),
            ..SupervisorTimeouts::default()
        };
        let supervisor = WorkerSupervisor::new(Arc::new(MuteLauncher), timeouts).unwrap();
        supervisor
            .register_worker(WorkerConfig::new("M", free_port(), "/x/handler.json"))
            .await;

        let result = supervisor.start_worker("M").await;

        assert!(matches!(result, Err(SupervisorError::Timeout { .. })));
        assert_eq!(supervisor.worker_status("M").await.unwrap().status, WorkerStatus::Error);
    }

    // ============================================================
    // TEST 3: Serving
    // ============================================================

    #[tokio::test]
    async fn test_end_to_end_worker_lifecycle() {
        // ARRANGE: worker "A" exposing only /ping
        let dir = tempfile::tempdir().unwrap();
        let port = free_port();
        let supervisor = manifest_supervisor();
        supervisor
            .register_worker(WorkerConfig::new("A", port, ping_artifact(dir.path())))
            .await;

        // ACT: boot everything and call the worker
        supervisor.start_all().await.unwrap();
        let health: HealthBody = reqwest::get(url(port, "/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let ping = reqwest::get(url(port, "/ping")).await.unwrap().text().await.unwrap();
        let outcome = supervisor.stop_worker("A").await;

        // ASSERT
        assert_eq!(health.status, "ok");
        assert_eq!(health.worker, "A");
        assert_eq!(ping, "pong");
        assert!(matches!(outcome, StopOutcome::Graceful(ref message) if message == "Worker A shutdown completed."));
        assert_eq!(supervisor.status().await[0].status, WorkerStatus::Stopped);
        assert!(reqwest::get(url(port, "/ping")).await.is_err(), "listener must be closed");
    }

    #[tokio::test]
    async fn test_handler_health_route_is_not_shadowed() {
        let dir = tempfile::tempdir().unwrap();
        let port = free_port();
        let artifact = write_artifact(
            dir.path(),
            "own-health.json",
            json!([{ "path": "/health", "json": { "custom": true } }]),
        );
        let supervisor = manifest_supervisor();
        supervisor.register_worker(WorkerConfig::new("H", port, artifact)).await;
        supervisor.start_worker("H").await.unwrap();

        let body: serde_json::Value = reqwest::get(url(port, "/health")).await.unwrap().json().await.unwrap();

        assert_eq!(body, json!({ "custom": true }));
        supervisor.stop_all().await;
    }

    #[tokio::test]
    async fn test_health_check_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let port = free_port();
        let mut config = WorkerConfig::new("N", port, ping_artifact(dir.path()));
        config.health_check = false;
        let supervisor = manifest_supervisor();
        supervisor.register_worker(config).await;
        supervisor.start_worker("N").await.unwrap();

        let response = reqwest::get(url(port, "/health")).await.unwrap();

        assert_eq!(response.status().as_u16(), 404);
        supervisor.stop_all().await;
    }

    #[tokio::test]
    async fn test_prefixed_worker_with_identity() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let port = free_port();
        let artifact = write_artifact(
            dir.path(),
            "greet.json",
            json!([{ "path": "/greet", "body": "{env.GREETING} from {worker}" }]),
        );
        let mut config = WorkerConfig::new("G", port, artifact);
        config.prefix = Some("/api".to_string());
        config.env.insert("GREETING".to_string(), "hello".to_string());
        let supervisor = manifest_supervisor();
        supervisor.register_worker(config).await;

        // ACT
        let message = supervisor.start_worker("G").await.unwrap();
        let greet = reqwest::get(url(port, "/api/greet")).await.unwrap().text().await.unwrap();
        let health = reqwest::get(url(port, "/api/health")).await.unwrap();
        let outside = reqwest::get(url(port, "/greet")).await.unwrap();

        // ASSERT
        assert_eq!(message, format!("Worker G with prefix /api started on port {}", port));
        assert_eq!(greet, "hello from G");
        assert!(health.status().is_success());
        assert_eq!(outside.status().as_u16(), 404);
        supervisor.stop_all().await;
    }

    #[tokio::test]
    async fn test_detailed_status_reports_uptime() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = manifest_supervisor();
        supervisor
            .register_worker(WorkerConfig::new("A", free_port(), ping_artifact(dir.path())))
            .await;
        supervisor
            .register_worker(WorkerConfig::new("Idle", free_port(), ping_artifact(dir.path())))
            .await;
        supervisor.start_worker("A").await.unwrap();

        let plain = supervisor.status().await;
        let detailed = supervisor.status_detailed().await;

        assert!(plain.iter().all(|worker| worker.uptime.is_none()));
        assert_eq!(detailed[0].uptime, Some(0));
        assert_eq!(detailed[1].status, WorkerStatus::Stopped);
        assert_eq!(detailed[1].uptime, None);
        supervisor.stop_all().await;
    }

    // ============================================================
    // TEST 4: Stop Protocol
    // ============================================================

    #[tokio::test]
    async fn test_stop_unknown_worker_resolves_immediately() {
        let supervisor = manifest_supervisor();

        let outcome = tokio::time::timeout(Duration::from_secs(1), supervisor.stop_worker("ghost"))
            .await
            .expect("stop of an unknown worker must not wait");

        assert_eq!(outcome, StopOutcome::NotRunning);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_worker_is_force_terminated_after_stop_wait() {
        // ARRANGE
        let supervisor = WorkerSupervisor::new(Arc::new(SilentLauncher), SupervisorTimeouts::default()).unwrap();
        supervisor
            .register_worker(WorkerConfig::new("S", 4999, "/x/handler.json"))
            .await;
        supervisor.start_worker("S").await.unwrap();
        let started = tokio::time::Instant::now();

        // ACT
        let outcome = supervisor.stop_worker("S").await;

        // ASSERT
        assert_eq!(outcome, StopOutcome::ForceTerminated);
        assert!(started.elapsed() >= Duration::from_secs(35));
        assert_eq!(supervisor.worker_status("S").await.unwrap().status, WorkerStatus::Stopped);
        assert_eq!(supervisor.running_count(), 0);
    }

    #[tokio::test]
    async fn test_undrained_worker_forces_its_own_exit() {
        // ARRANGE: a slow in-flight request outlives a short graceful bound
        let dir = tempfile::tempdir().unwrap();
        let port = free_port();
        let artifact = write_artifact(
            dir.path(),
            "slow.json",
            json!([{ "path": "/slow", "body": "late", "delay_ms": 10_000 }]),
        );
        let timeouts = SupervisorTimeouts {
            graceful_shutdown: Duration::from_millis(300),
            stop_wait: Duration::from_secs(5),
            start: None,
        };
        let supervisor = WorkerSupervisor::with_runner(ManifestLoader::new(), timeouts).unwrap();
        supervisor.register_worker(WorkerConfig::new("L", port, artifact)).await;
        supervisor.start_worker("L").await.unwrap();

        let in_flight = tokio::spawn(reqwest::get(url(port, "/slow")));
        tokio::time::sleep(Duration::from_millis(200)).await;

        // ACT
        let outcome = supervisor.stop_worker("L").await;

        // ASSERT
        assert_eq!(outcome, StopOutcome::Exited(UnitExit::Forced));
        assert_eq!(supervisor.worker_status("L").await.unwrap().status, WorkerStatus::Stopped);
        in_flight.abort();
    }

    #[tokio::test]
    async fn test_stopping_an_errored_worker_clears_it() {
        let supervisor =
            WorkerSupervisor::with_runner(Arc::new(ThrowingLoader), SupervisorTimeouts::default()).unwrap();
        supervisor
            .register_worker(WorkerConfig::new("T", free_port(), "/nowhere/handler.json"))
            .await;
        let _ = supervisor.start_worker("T").await;

        let outcome = supervisor.stop_worker("T").await;

        assert_eq!(outcome, StopOutcome::NotRunning);
        assert_eq!(supervisor.worker_status("T").await.unwrap().status, WorkerStatus::Stopped);
    }

    async fn wait_for_status(supervisor: &WorkerSupervisor, name: &str, status: WorkerStatus) {
        for _ in 0..500 {
            if supervisor.worker_status(name).await.map(|w| w.status) == Some(status) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("worker {} never reached {:?}", name, status);
    }

    #[tokio::test]
    async fn test_stop_cancels_a_start_that_never_answers() {
        // ARRANGE: no start timeout, so only the stop can end the handshake
        let supervisor = WorkerSupervisor::new(Arc::new(MuteLauncher), SupervisorTimeouts::default()).unwrap();
        supervisor
            .register_worker(WorkerConfig::new("M", free_port(), "/x/handler.json"))
            .await;
        let starting = tokio::spawn({
            let supervisor = supervisor.clone();
            async move { supervisor.start_worker("M").await }
        });
        wait_for_status(&supervisor, "M", WorkerStatus::Starting).await;

        // ACT
        let outcome = tokio::time::timeout(Duration::from_secs(5), supervisor.stop_worker("M"))
            .await
            .expect("stop during a pending start must not hang");

        // ASSERT
        assert_eq!(outcome, StopOutcome::StartCancelled);
        let start = starting.await.unwrap();
        assert!(matches!(start, Err(SupervisorError::StartCancelled(_))));
        assert_eq!(
            start.unwrap_err().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(supervisor.worker_status("M").await.unwrap().status, WorkerStatus::Stopped);

        // A cancelled worker can be started again.
        let retry = tokio::spawn({
            let supervisor = supervisor.clone();
            async move { supervisor.start_worker("M").await }
        });
        wait_for_status(&supervisor, "M", WorkerStatus::Starting).await;
        supervisor.stop_worker("M").await;
        assert!(matches!(retry.await.unwrap(), Err(SupervisorError::StartCancelled(_))));
    }

    #[tokio::test]
    async fn test_stop_all_cancels_pending_starts() {
        // ARRANGE
        let supervisor = WorkerSupervisor::new(Arc::new(MuteLauncher), SupervisorTimeouts::default()).unwrap();
        supervisor
            .register_worker(WorkerConfig::new("M", free_port(), "/x/handler.json"))
            .await;
        let starting = tokio::spawn({
            let supervisor = supervisor.clone();
            async move { supervisor.start_all().await }
        });
        wait_for_status(&supervisor, "M", WorkerStatus::Starting).await;

        // ACT
        let stopped = tokio::time::timeout(Duration::from_secs(5), supervisor.stop_all())
            .await
            .expect("stop_all must not wait on a pending start");

        // ASSERT
        assert_eq!(stopped, vec![("M".to_string(), StopOutcome::StartCancelled)]);
        assert!(starting.await.unwrap().is_err());
        assert_eq!(supervisor.running_count(), 0);
    }

    // ============================================================
    // TEST 5: Batches & Concurrency
    // ============================================================

    #[tokio::test]
    async fn test_start_all_fails_fast_and_stop_all_cleans_up() {
        // ARRANGE
        let dir = tempfile::tempdir().unwrap();
        let supervisor = manifest_supervisor();
        supervisor
            .register_all([
                WorkerConfig::new("good", free_port(), ping_artifact(dir.path())),
                WorkerConfig::new("bad", free_port(), dir.path().join("missing.json")),
            ])
            .await;

        // ACT
        let started = supervisor.start_all().await;
        let stopped = supervisor.stop_all().await;

        // ASSERT
        assert!(started.is_err());
        assert!(stopped.iter().any(|(name, _)| name == "bad"));
        assert_eq!(supervisor.running_count(), 0);
        assert!(
            supervisor
                .status()
                .await
                .iter()
                .all(|worker| worker.status == WorkerStatus::Stopped)
        );
    }

    #[tokio::test]
    async fn test_concurrent_starts_have_one_winner() {
        let supervisor = WorkerSupervisor::new(Arc::new(SilentLauncher), SupervisorTimeouts::default()).unwrap();
        supervisor
            .register_worker(WorkerConfig::new("C", 4998, "/x/handler.json"))
            .await;

        let (first, second) = tokio::join!(supervisor.start_worker("C"), supervisor.start_worker("C"));

        let winners = [first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(winners, 1);
        let loser = if first.is_ok() { second } else { first };
        assert!(matches!(loser, Err(SupervisorError::AlreadyRunning(_))));
        // The silent unit ignores `terminate`; dropping the supervisor kills it.
        drop(supervisor);
    }

    #[tokio::test]
    async fn test_duplicate_registration_resolves_to_first() {
        let supervisor = manifest_supervisor();
        supervisor
            .register_worker(WorkerConfig::new("dup", 4100, "/first/handler.json"))
            .await;
        supervisor
            .register_worker(WorkerConfig::new("dup", 4200, "/second/handler.json"))
            .await;

        let config = supervisor.config("dup").await.unwrap();

        assert_eq!(config.port, 4100);
        assert_eq!(supervisor.status().await.len(), 2);
    }
}
