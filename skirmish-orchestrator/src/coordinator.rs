//! Administrative entry points of a node
//!
//! `start` and `stop` fan out to every worker node, this one included if it
//! is listed. `run` and `stop_run` act on the local run slot.

use crate::error::OrchestratorError;
use crate::request::{RunForm, RunRequest, RunResponse};
use crate::roster::RosterGenerator;
use crate::scheduler::{RampScheduler, RunPlan, RunnerCleanup};
use futures::future::join_all;
use parking_lot::Mutex;
use serde_json::Value;
use skirmish_config::{ClusterConfig, SkirmishConfig, TimingConfig};
use skirmish_http::HttpClient;
use skirmish_player::PlayerDriver;
use skirmish_timers::Timers;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{error, info, warn};

struct RunSlot {
    id: u64,
    scheduler: Arc<RampScheduler>,
}

pub struct Coordinator {
    http: Arc<dyn HttpClient>,
    cluster: ClusterConfig,
    node_port: u16,
    timing: TimingConfig,
    timers: Arc<dyn Timers>,
    driver: Arc<dyn PlayerDriver>,
    roster: RosterGenerator,
    slot: Mutex<Option<RunSlot>>,
    next_run_id: AtomicU64,
    me: Weak<Coordinator>,
}

impl Coordinator {
    pub fn new(
        config: &SkirmishConfig,
        http: Arc<dyn HttpClient>,
        timers: Arc<dyn Timers>,
        driver: Arc<dyn PlayerDriver>,
    ) -> Arc<Self> {
        Self::with_roster(config, http, timers, driver, RosterGenerator::from_entropy())
    }

    pub fn with_roster(
        config: &SkirmishConfig,
        http: Arc<dyn HttpClient>,
        timers: Arc<dyn Timers>,
        driver: Arc<dyn PlayerDriver>,
        roster: RosterGenerator,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            http,
            cluster: config.cluster.clone(),
            node_port: config.server.port,
            timing: config.timing.clone(),
            timers,
            driver,
            roster,
            slot: Mutex::new(None),
            next_run_id: AtomicU64::new(1),
            me: me.clone(),
        })
    }

    /// Split a run across every worker node
    ///
    /// Each node gets `numPlayers / nodes`, rounded half up. All calls are
    /// issued before any is awaited; the result is a success only if every
    /// node answered `{success: true}`.
    pub async fn start(&self, form: &RunForm) -> Result<RunResponse, OrchestratorError> {
        let request = RunRequest::try_from(form)?;
        let urls = self.cluster.node_urls(self.node_port, "/run");
        if urls.is_empty() {
            warn!("No worker nodes configured");
            return Ok(RunResponse::failed());
        }
        let per_node = share(request.num_players, urls.len() as u64);
        info!(
            num_players = request.num_players,
            per_node,
            nodes = urls.len(),
            duration_ms = request.duration.as_millis() as u64,
            ramp_duration_ms = request.ramp_duration.as_millis() as u64,
            "Starting load test"
        );

        let node_form = RunForm::new(per_node, request.duration, request.ramp_duration);
        let body = serde_json::to_value(&node_form)
            .map_err(|e| OrchestratorError::Validation(e.to_string()))?;
        Ok(self.fan_out(&urls, Some(&body)).await)
    }

    /// Ask every worker node to stop its run
    pub async fn stop(&self) -> RunResponse {
        info!("Forcing a stop on load test");
        let urls = self.cluster.node_urls(self.node_port, "/stopRun");
        if urls.is_empty() {
            warn!("No worker nodes configured");
            return RunResponse::failed();
        }
        self.fan_out(&urls, None).await
    }

    async fn fan_out(&self, urls: &[String], body: Option<&Value>) -> RunResponse {
        let calls = urls.iter().map(|url| async move {
            let call = self.http.post_form(url, body);
            match tokio::time::timeout(self.cluster.request_timeout, call).await {
                Ok(Ok(response)) => {
                    info!(url = %url, body = %response.body, "Node response");
                    response.body["success"] == Value::Bool(true)
                }
                Ok(Err(e)) => {
                    error!(url = %url, error = %e, "Node call failed");
                    false
                }
                Err(_) => {
                    error!(
                        url = %url,
                        timeout_ms = self.cluster.request_timeout.as_millis() as u64,
                        "Node call timed out"
                    );
                    false
                }
            }
        });
        let results = join_all(calls).await;
        RunResponse {
            success: results.into_iter().all(|ok| ok),
        }
    }

    /// Start a run on this node unless one is already active
    pub fn run(&self, form: &RunForm) -> Result<RunResponse, OrchestratorError> {
        let request = RunRequest::try_from(form)?;
        let count = usize::try_from(request.num_players)
            .map_err(|_| OrchestratorError::Validation("Invalid numPlayers".to_string()))?;

        let scheduler = {
            let mut slot = self.slot.lock();
            if let Some(active) = slot.as_ref() {
                info!(run_id = active.id, "Run rejected, a load test is already active");
                return Ok(RunResponse::failed());
            }
            let id = self.next_run_id.fetch_add(1, Ordering::SeqCst);
            let players = self.roster.generate(count);
            let plan = RunPlan::new(request.duration, request.ramp_duration, &self.timing);
            let owner: Weak<dyn RunnerCleanup> = self.me.clone();
            let scheduler = RampScheduler::new(
                id,
                players,
                plan,
                self.timers.clone(),
                self.driver.clone(),
                owner,
            );
            *slot = Some(RunSlot {
                id,
                scheduler: scheduler.clone(),
            });
            scheduler
        };

        scheduler.run();
        Ok(RunResponse::ok())
    }

    /// Stop the active run on this node
    pub fn stop_run(&self) -> RunResponse {
        let scheduler = self.slot.lock().as_ref().map(|slot| slot.scheduler.clone());
        match scheduler {
            Some(scheduler) => {
                info!(run_id = scheduler.run_id(), "Stopping load test run");
                scheduler.stop();
                RunResponse::ok()
            }
            None => {
                info!("Stop rejected, no load test is running");
                RunResponse::failed()
            }
        }
    }

    /// Id of the run currently holding the slot
    pub fn active_run(&self) -> Option<u64> {
        self.slot.lock().as_ref().map(|slot| slot.id)
    }

    pub fn active_scheduler(&self) -> Option<Arc<RampScheduler>> {
        self.slot.lock().as_ref().map(|slot| slot.scheduler.clone())
    }
}

impl RunnerCleanup for Coordinator {
    fn runner_finished(&self, run_id: u64) {
        let mut slot = self.slot.lock();
        if slot.as_ref().is_some_and(|active| active.id == run_id) {
            *slot = None;
            info!(run_id, "Finished load test");
        }
    }
}

/// `total / nodes` rounded half up
fn share(total: u64, nodes: u64) -> u64 {
    let rest = total % nodes;
    total / nodes + u64::from(rest >= nodes - rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use skirmish_http::{HttpError, HttpResponse};
    use skirmish_player::Player;
    use skirmish_timers::ManualTimers;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeNodes {
        failing: Vec<String>,
        calls: Mutex<Vec<(String, Option<Value>)>>,
    }

    #[async_trait]
    impl HttpClient for FakeNodes {
        async fn post_form(
            &self,
            url: &str,
            body: Option<&Value>,
        ) -> Result<HttpResponse, HttpError> {
            self.calls.lock().push((url.to_string(), body.cloned()));
            if self.failing.iter().any(|f| url.starts_with(f.as_str())) {
                return Err(HttpError::InvalidUrl(format!("{} unreachable", url)));
            }
            Ok(HttpResponse {
                status: 200,
                body: serde_json::json!({ "success": true }),
                elapsed: Duration::ZERO,
            })
        }
    }

    #[derive(Default)]
    struct NullDriver {
        started: AtomicU64,
    }

    #[async_trait]
    impl PlayerDriver for NullDriver {
        async fn start(&self, _player: Arc<Player>) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }

        async fn stop(&self, _player: Arc<Player>) {}
    }

    fn config(nodes: &[&str]) -> SkirmishConfig {
        let mut config = SkirmishConfig::default();
        config.cluster.load_test_uris = nodes.iter().map(|n| n.to_string()).collect();
        config.server.port = 10900;
        config
    }

    fn coordinator(
        nodes: &[&str],
        http: Arc<FakeNodes>,
        timers: Arc<ManualTimers>,
        driver: Arc<NullDriver>,
    ) -> Arc<Coordinator> {
        Coordinator::with_roster(&config(nodes), http, timers, driver, RosterGenerator::seeded(3))
    }

    fn form(num_players: &str, duration: &str, ramp: &str) -> RunForm {
        RunForm {
            num_players: Some(num_players.to_string()),
            duration: Some(duration.to_string()),
            ramp_duration: Some(ramp.to_string()),
        }
    }

    #[test]
    fn test_share_rounds_half_up() {
        assert_eq!(share(10, 2), 5);
        assert_eq!(share(10, 3), 3);
        assert_eq!(share(5, 2), 3);
        assert_eq!(share(1, 3), 0);
        assert_eq!(share(1, 2), 1);
    }

    #[test]
    fn test_share_of_largest_total_does_not_overflow() {
        assert_eq!(share(u64::MAX, 1), u64::MAX);
        assert_eq!(share(u64::MAX, 2), u64::MAX / 2 + 1);
        assert_eq!(share(u64::MAX - 1, 2), u64::MAX / 2);
    }

    #[tokio::test]
    async fn test_oversized_run_is_rejected_before_taking_the_slot() {
        let node = coordinator(
            &["http://node-a"],
            Arc::new(FakeNodes::default()),
            Arc::new(ManualTimers::new()),
            Arc::new(NullDriver::default()),
        );
        let err = node.run(&form("1000000000000", "10000", "1000")).unwrap_err();
        assert_eq!(err, OrchestratorError::Validation("Invalid numPlayers".into()));
        assert_eq!(node.active_run(), None);

        let http = Arc::new(FakeNodes::default());
        let admin = coordinator(
            &["http://node-a"],
            http.clone(),
            Arc::new(ManualTimers::new()),
            Arc::new(NullDriver::default()),
        );
        let err = admin
            .start(&form("18446744073709551615", "10000", "1000"))
            .await
            .unwrap_err();
        assert_eq!(err, OrchestratorError::Validation("Invalid numPlayers".into()));
        assert!(http.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_start_splits_players_across_nodes() {
        let http = Arc::new(FakeNodes::default());
        let coordinator = coordinator(
            &["http://node-a", "http://node-b"],
            http.clone(),
            Arc::new(ManualTimers::new()),
            Arc::new(NullDriver::default()),
        );

        let response = coordinator.start(&form("10", "60000", "6000")).await.unwrap();
        assert!(response.success);

        let calls = http.calls.lock();
        let urls: Vec<&str> = calls.iter().map(|(url, _)| url.as_str()).collect();
        assert_eq!(urls, vec!["http://node-a:10900/run", "http://node-b:10900/run"]);
        for (_, body) in calls.iter() {
            let body = body.as_ref().unwrap();
            assert_eq!(body["numPlayers"], "5");
            assert_eq!(body["duration"], "60000");
            assert_eq!(body["rampDuration"], "6000");
        }
    }

    #[tokio::test]
    async fn test_one_failing_node_fails_start_but_all_are_called() {
        let http = Arc::new(FakeNodes {
            failing: vec!["http://node-a".to_string()],
            ..Default::default()
        });
        let coordinator = coordinator(
            &["http://node-a", "http://node-b"],
            http.clone(),
            Arc::new(ManualTimers::new()),
            Arc::new(NullDriver::default()),
        );

        let response = coordinator.start(&form("10", "60000", "6000")).await.unwrap();
        assert!(!response.success);
        assert_eq!(http.calls.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_start_validation_names_field() {
        let coordinator = coordinator(
            &["http://node-a"],
            Arc::new(FakeNodes::default()),
            Arc::new(ManualTimers::new()),
            Arc::new(NullDriver::default()),
        );
        let mut bad = form("10", "60000", "6000");
        bad.ramp_duration = None;

        let err = coordinator.start(&bad).await.unwrap_err();
        assert_eq!(err, OrchestratorError::Validation("Missing rampDuration".into()));
    }

    #[tokio::test]
    async fn test_stop_fans_out_without_body() {
        let http = Arc::new(FakeNodes::default());
        let coordinator = coordinator(
            &["http://node-a", "http://node-b"],
            http.clone(),
            Arc::new(ManualTimers::new()),
            Arc::new(NullDriver::default()),
        );

        assert!(coordinator.stop().await.success);
        let calls = http.calls.lock();
        assert_eq!(calls[1].0, "http://node-b:10900/stopRun");
        assert!(calls.iter().all(|(_, body)| body.is_none()));
    }

    #[tokio::test]
    async fn test_single_active_run() {
        let timers = Arc::new(ManualTimers::new());
        let driver = Arc::new(NullDriver::default());
        let coordinator = coordinator(
            &["http://node-a"],
            Arc::new(FakeNodes::default()),
            timers.clone(),
            driver.clone(),
        );

        assert!(!coordinator.stop_run().success);
        assert!(coordinator.run(&form("6", "10000", "2000")).unwrap().success);
        let first = coordinator.active_run().unwrap();
        assert!(!coordinator.run(&form("6", "10000", "2000")).unwrap().success);
        assert_eq!(coordinator.active_run(), Some(first));

        timers.advance(Duration::from_millis(10_000)).await;
        assert_eq!(driver.started.load(Ordering::SeqCst), 6);
        assert_eq!(coordinator.active_run(), None);

        assert!(coordinator.run(&form("6", "10000", "2000")).unwrap().success);
        assert_ne!(coordinator.active_run(), Some(first));
    }

    #[tokio::test]
    async fn test_stop_run_releases_slot_after_wind_down() {
        let timers = Arc::new(ManualTimers::new());
        let coordinator = coordinator(
            &["http://node-a"],
            Arc::new(FakeNodes::default()),
            timers.clone(),
            Arc::new(NullDriver::default()),
        );

        coordinator.run(&form("3", "60000", "3000")).unwrap();
        assert!(coordinator.stop_run().success);
        assert!(coordinator.stop_run().success);
        assert!(coordinator.active_run().is_some());

        timers.run_until_idle().await;
        assert_eq!(coordinator.active_run(), None);
        assert!(!coordinator.stop_run().success);
    }

    #[test]
    fn test_stale_finish_does_not_clear_newer_run() {
        let coordinator = coordinator(
            &["http://node-a"],
            Arc::new(FakeNodes::default()),
            Arc::new(ManualTimers::new()),
            Arc::new(NullDriver::default()),
        );
        coordinator.run(&form("1", "10000", "1000")).unwrap();
        let active = coordinator.active_run().unwrap();

        coordinator.runner_finished(active + 100);
        assert_eq!(coordinator.active_run(), Some(active));
        coordinator.runner_finished(active);
        assert_eq!(coordinator.active_run(), None);
    }
}
