use anyhow::Result;
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::MonitorConfig;
use crate::evaluator;
use crate::history::ResultLog;
use crate::models::{LogEntry, MonitorState, ProbeResult, ResultSet};
use crate::probe::{HttpProber, Probe};
use crate::render;

pub struct Monitor<P: Probe = HttpProber> {
    pub config: Arc<MonitorConfig>,
    prober: Arc<P>,
    log: ResultLog,
    pub state: Arc<Mutex<MonitorState>>,
}

impl Monitor<HttpProber> {
    pub fn new(config: MonitorConfig) -> Result<Self> {
        let prober = HttpProber::new(config.probe_timeout())?;
        Ok(Self::with_prober(config, prober))
    }
}

impl<P: Probe> Monitor<P> {
    pub fn with_prober(config: MonitorConfig, prober: P) -> Self {
        let log = ResultLog::new(config.log_path.clone(), config.rotate_logs_after_sets);
        Self {
            config: Arc::new(config),
            prober: Arc::new(prober),
            log,
            state: Arc::new(Mutex::new(MonitorState::default())),
        }
    }

    /// Tick, then wait the configured interval, until `shutdown` fires. A tick
    /// in progress always runs to completion.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            "Monitoring {} targets every {:.1}s, history at {}",
            self.config.target_count(),
            self.config.interval().as_secs_f64(),
            self.log.path().display()
        );

        while !shutdown.is_cancelled() {
            self.tick().await;

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.interval()) => {}
            }
        }
        info!("Monitor loop stopped.");
    }

    /// One full cycle: probe every target, persist, render and publish.
    pub async fn tick(&self) -> ResultSet {
        let start_time = Utc::now();
        let results = self.collect_results().await;

        let entry = LogEntry::stamped(results.clone());
        if let Err(e) = self.log.append(&entry) {
            error!("Failed to persist results: {:#}", e);
        }

        {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = render::render(&mut stdout, &self.config.sites, &results) {
                warn!("Failed to render results: {}", e);
            }
        }

        self.state.lock().await.latest = Some(entry);

        let failing = results.iter().filter(|r| !r.pass).count();
        let duration = Utc::now() - start_time;
        info!(
            "Tick completed {} checks ({} failing) in {:.2}s.",
            results.len(),
            failing,
            duration.num_milliseconds() as f64 / 1000.0
        );
        results
    }

    /// Evaluate all targets concurrently and return the outcomes in
    /// configuration order. A panicking evaluation is assessed as if its
    /// target were unreachable.
    async fn collect_results(&self) -> ResultSet {
        let mut tasks = FuturesUnordered::new();

        let mut index = 0;
        for (site_idx, site) in self.config.sites.iter().enumerate() {
            for target_idx in 0..site.targets.len() {
                let prober = Arc::clone(&self.prober);
                let config = Arc::clone(&self.config);
                let handle = tokio::spawn(async move {
                    let site = &config.sites[site_idx];
                    evaluator::evaluate(prober.as_ref(), site, &site.targets[target_idx]).await
                });
                let position = index;
                tasks.push(async move { (position, site_idx, target_idx, handle.await) });
                index += 1;
            }
        }

        let mut indexed = Vec::with_capacity(tasks.len());
        while let Some((position, site_idx, target_idx, joined)) = tasks.next().await {
            let outcome = joined.unwrap_or_else(|e| {
                let site = &self.config.sites[site_idx];
                let target = &site.targets[target_idx];
                error!(url = %target.url, "Evaluation task failed: {}", e);
                evaluator::assess(site, target, &ProbeResult::default())
            });
            indexed.push((position, outcome));
        }

        indexed.sort_by_key(|(position, _)| *position);
        indexed.into_iter().map(|(_, outcome)| outcome).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Site, Target};
    use crate::models::{AssertionKind, ProbeOutcome, ProbeResult};
    use std::collections::HashMap;
    use std::future::Future;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers each URL after a fixed delay; `/panic` URLs panic instead.
    struct ScriptedProber {
        delays: HashMap<String, u64>,
        calls: AtomicUsize,
    }

    impl ScriptedProber {
        fn new(delays: &[(&str, u64)]) -> Self {
            Self {
                delays: delays.iter().map(|(url, ms)| (url.to_string(), *ms)).collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Probe for ScriptedProber {
        fn probe(&self, url: &str) -> impl Future<Output = ProbeOutcome> + Send {
            let delay = self.delays.get(url).copied().unwrap_or(0);
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let url = url.to_string();
            async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                if url.ends_with("/panic") {
                    panic!("probe exploded for {}", url);
                }
                // Even calls succeed, odd calls fail.
                let status = if call % 2 == 0 { 200 } else { 500 };
                ProbeOutcome::Response(ProbeResult { status: Some(status), body: b"OK".to_vec() })
            }
        }
    }

    fn target(title: &str, url: &str) -> Target {
        Target {
            title: title.into(),
            url: url.into(),
            status_should_be: Some(200),
            see: None,
        }
    }

    fn config(sites: Vec<Site>, log_path: &Path, rotate: i64) -> MonitorConfig {
        MonitorConfig {
            sites,
            interval_in_minutes: 60.0,
            rotate_logs_after_sets: rotate,
            log_path: log_path.to_path_buf(),
            probe_timeout_ms: None,
            api_port: None,
        }
    }

    fn two_sites() -> Vec<Site> {
        vec![
            Site {
                title: "alpha".into(),
                targets: vec![target("slow", "http://alpha/slow"), target("fast", "http://alpha/fast")],
            },
            Site {
                title: "beta".into(),
                targets: vec![target("medium", "http://beta/medium")],
            },
        ]
    }

    #[tokio::test]
    async fn results_keep_configuration_order() {
        let dir = tempfile::tempdir().unwrap();
        let prober = ScriptedProber::new(&[
            ("http://alpha/slow", 120),
            ("http://alpha/fast", 0),
            ("http://beta/medium", 40),
        ]);
        let monitor = Monitor::with_prober(config(two_sites(), &dir.path().join("out.json"), 0), prober);

        let results = monitor.tick().await;
        let order: Vec<_> = results.iter().map(|r| (r.title.as_str(), r.target_title.as_str())).collect();
        assert_eq!(order, vec![("alpha", "slow"), ("alpha", "fast"), ("beta", "medium")]);
    }

    #[tokio::test]
    async fn panicking_evaluation_is_reported_as_failure() {
        let dir = tempfile::tempdir().unwrap();
        let sites = vec![Site {
            title: "alpha".into(),
            targets: vec![
                target("one", "http://alpha/one"),
                target("boom", "http://alpha/panic"),
                target("three", "http://alpha/three"),
            ],
        }];
        let prober = ScriptedProber::new(&[("http://alpha/one", 30)]);
        let monitor = Monitor::with_prober(config(sites, &dir.path().join("out.json"), 0), prober);

        let results = monitor.tick().await;
        let titles: Vec<_> = results.iter().map(|r| r.target_title.as_str()).collect();
        assert_eq!(titles, vec!["one", "boom", "three"]);

        let boom = &results[1];
        assert!(!boom.pass);
        assert_eq!(boom.url, "http://alpha/panic");
        assert_eq!(boom.errors.len(), 1);
        assert_eq!(boom.errors[0].kind, AssertionKind::InvalidStatusCode);

        let history = ResultLog::new(dir.path().join("out.json"), 0).load();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].result_set.len(), 3);
    }

    #[tokio::test]
    async fn history_keeps_latest_two_of_three_ticks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let sites = vec![Site { title: "alpha".into(), targets: vec![target("home", "http://alpha/")] }];
        let monitor = Monitor::with_prober(config(sites, &path, 2), ScriptedProber::new(&[]));

        for _ in 0..3 {
            monitor.tick().await;
        }

        let entries = ResultLog::new(&path, 2).load();
        assert_eq!(entries.len(), 2);
        // Ticks alternate pass, fail, pass; the first one is evicted.
        assert!(!entries[0].result_set[0].pass);
        assert_eq!(entries[0].result_set[0].errors[0].kind, AssertionKind::InvalidStatusCode);
        assert!(entries[1].result_set[0].pass);
    }

    #[tokio::test]
    async fn tick_publishes_latest_entry() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = Monitor::with_prober(
            config(two_sites(), &dir.path().join("out.json"), 0),
            ScriptedProber::new(&[]),
        );
        assert!(monitor.state.lock().await.latest.is_none());

        let results = monitor.tick().await;
        let state = monitor.state.lock().await;
        assert_eq!(state.latest.as_ref().map(|e| &e.result_set), Some(&results));
    }

    #[tokio::test]
    async fn persist_failure_does_not_abort_tick() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.json");
        let monitor = Monitor::with_prober(config(two_sites(), &path, 0), ScriptedProber::new(&[]));

        let results = monitor.tick().await;
        assert_eq!(results.len(), 3);
        assert!(monitor.state.lock().await.latest.is_some());
    }

    #[tokio::test]
    async fn run_stops_when_cancelled_during_delay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let monitor = Monitor::with_prober(config(two_sites(), &path, 0), ScriptedProber::new(&[]));

        let shutdown = CancellationToken::new();
        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        tokio::time::timeout(Duration::from_secs(5), monitor.run(shutdown))
            .await
            .expect("run should return after cancellation");
        assert_eq!(ResultLog::new(&path, 0).load().len(), 1);
    }

    #[tokio::test]
    async fn run_skips_ticks_when_already_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let monitor = Monitor::with_prober(config(two_sites(), &path, 0), ScriptedProber::new(&[]));

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        monitor.run(shutdown).await;
        assert!(!path.exists());
    }
}
