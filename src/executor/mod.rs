//! Bounded-concurrency dispatch engine
//!
//! The dispatcher issues exactly N requests with at most C in flight:
//! - a semaphore permit is acquired before each request task is spawned
//! - the permit is held through the optional post-request delay
//! - outcomes are appended to an unbounded channel, so no task waits on collection
//! - a panicking request task still yields one failed outcome

pub mod progress;

pub use progress::{render_progress, ProgressHandle, ProgressReporter};

use crate::{
    client::{ProtocolSender, RequestSender, TransportPools},
    error::{AppError, Result},
    logging::{LoggerFactory, RequestLogger},
    models::{RequestOutcome, TestConfiguration},
    pool::PoolStats,
    stats::{AggregateStatistics, StatisticsConfig, StatisticsEngine},
};
use futures::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};

/// Live counters owned by the dispatcher and read by the progress reporter
#[derive(Debug, Default)]
pub struct DispatchCounters {
    completed: AtomicU64,
    in_progress: AtomicU64,
    peak_in_flight: AtomicU64,
}

impl DispatchCounters {
    /// Mark one request as in flight until the returned guard is dropped
    pub fn begin(&self) -> InFlightGuard<'_> {
        let now = self.in_progress.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlightGuard { counters: self }
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn in_progress(&self) -> u64 {
        self.in_progress.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous in-flight requests observed
    pub fn peak_in_flight(&self) -> u64 {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.completed.store(0, Ordering::SeqCst);
        self.in_progress.store(0, Ordering::SeqCst);
        self.peak_in_flight.store(0, Ordering::SeqCst);
    }
}

/// Decrements in-flight and counts a completion on drop, including unwinding
pub struct InFlightGuard<'a> {
    counters: &'a DispatchCounters,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.counters.in_progress.fetch_sub(1, Ordering::SeqCst);
        self.counters.completed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Raw result of a dispatch before statistics are computed
#[derive(Debug, Clone)]
pub struct DispatchResult {
    /// One outcome per request, in completion order
    pub outcomes: Vec<RequestOutcome>,
    /// Wall time from the first permit to the last task finishing
    pub elapsed: Duration,
    pub peak_in_flight: u64,
    /// Connection pool counters taken before the sender was shut down
    pub pool_stats: Option<PoolStats>,
}

/// Runs a load test through any `RequestSender`
pub struct Dispatcher<S: RequestSender + 'static> {
    sender: Arc<S>,
    counters: Arc<DispatchCounters>,
    progress: Option<ProgressReporter>,
    request_logger: Option<RequestLogger>,
    statistics: StatisticsEngine,
}

impl<S: RequestSender + 'static> Dispatcher<S> {
    pub fn new(sender: S) -> Self {
        Self {
            sender: Arc::new(sender),
            counters: Arc::new(DispatchCounters::default()),
            progress: None,
            request_logger: None,
            statistics: StatisticsEngine::with_defaults(),
        }
    }

    /// Render a progress line while dispatching
    pub fn with_progress(mut self, reporter: ProgressReporter) -> Self {
        self.progress = Some(reporter);
        self
    }

    /// Log every outcome as it completes
    pub fn with_request_logger(mut self, logger: RequestLogger) -> Self {
        self.request_logger = Some(logger);
        self
    }

    pub fn with_statistics_config(mut self, config: StatisticsConfig) -> Self {
        self.statistics = StatisticsEngine::new(config);
        self
    }

    /// Counters of the current or last run
    pub fn counters(&self) -> Arc<DispatchCounters> {
        Arc::clone(&self.counters)
    }

    /// Issue every request and collect the outcomes
    ///
    /// The sender is shut down before returning, whether or not dispatch
    /// succeeded; its pool counters are captured just before that.
    pub async fn dispatch(&self, config: &TestConfiguration) -> Result<DispatchResult> {
        validate_for_dispatch(config)?;

        let dispatched = self.dispatch_all(config).await;

        let pool_stats = self.sender.pool_stats();
        self.sender.shutdown().await;

        let (outcomes, elapsed) = dispatched?;
        Ok(DispatchResult {
            outcomes,
            elapsed,
            peak_in_flight: self.counters.peak_in_flight(),
            pool_stats,
        })
    }

    async fn dispatch_all(
        &self,
        config: &TestConfiguration,
    ) -> Result<(Vec<RequestOutcome>, Duration)> {
        let total = config.number_of_requests;
        let config = Arc::new(config.clone());
        let semaphore = Arc::new(Semaphore::new(config.effective_concurrency()));
        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();

        self.counters.reset();
        let progress = self
            .progress
            .as_ref()
            .map(|reporter| reporter.start(Arc::clone(&self.counters), total));

        let start = Instant::now();
        let mut tasks = Vec::with_capacity(usize::try_from(total).unwrap_or(0));
        let mut gate_error = None;

        for index in 1..=total {
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    gate_error = Some(AppError::test_execution(format!(
                        "Concurrency gate closed: {}",
                        e
                    )));
                    break;
                }
            };

            let sender = Arc::clone(&self.sender);
            let counters = Arc::clone(&self.counters);
            let config = Arc::clone(&config);
            let outcome_tx = outcome_tx.clone();
            let logger = self.request_logger.clone();

            tasks.push(tokio::spawn(async move {
                let outcome = {
                    let _in_flight = counters.begin();
                    sender.send(&config).await
                };

                if let Some(logger) = &logger {
                    logger.log_outcome(index, &outcome).await;
                }

                let _ = outcome_tx.send(outcome);

                if let Some(delay) = config.delay() {
                    tokio::time::sleep(delay).await;
                }
                drop(permit);
            }));
        }
        drop(outcome_tx);

        // Tasks already spawned finish even when the gate failed
        let joined = join_all(tasks).await;
        let elapsed = start.elapsed();

        let mut outcomes = Vec::with_capacity(joined.len());
        while let Some(outcome) = outcome_rx.recv().await {
            outcomes.push(outcome);
        }

        // A task that died before sending still owes one outcome
        for join_error in joined.into_iter().filter_map(|r| r.err()) {
            outcomes.push(RequestOutcome::failed(
                format!("Unexpected error: {}", join_error),
                0.0,
            ));
        }

        if let Some(handle) = progress {
            handle.stop().await;
        }

        match gate_error {
            Some(e) => Err(e),
            None => Ok((outcomes, elapsed)),
        }
    }

    /// Dispatch every request and reduce the outcomes into statistics
    pub async fn run(&self, config: &TestConfiguration) -> Result<AggregateStatistics> {
        let result = self.dispatch(config).await?;
        Ok(self.statistics.compute(&result.outcomes, result.elapsed))
    }
}

/// Reject configurations the dispatcher cannot run
pub fn validate_for_dispatch(config: &TestConfiguration) -> Result<()> {
    if config.target.trim().is_empty() {
        return Err(AppError::invalid_argument("Target cannot be empty"));
    }
    if config.concurrency == 0 {
        return Err(AppError::invalid_argument("Concurrency must be at least 1"));
    }
    if config.protocol.requires_port() && config.port == 0 {
        return Err(AppError::invalid_argument(format!(
            "{} requires a port greater than 0",
            config.protocol
        )));
    }
    if config.timeout_ms == 0 {
        return Err(AppError::invalid_argument("Timeout must be greater than 0"));
    }
    Ok(())
}

/// Run a complete load test with the sender selected by `config.protocol`
///
/// Pools are created for this run only; the dispatcher closes them.
pub async fn run_load_test(config: &TestConfiguration) -> Result<AggregateStatistics> {
    validate_for_dispatch(config)?;

    let factory = LoggerFactory::new(config);
    let run_logger = factory.create_run_logger().await;
    let request_logger = factory.create_request_logger().await;

    let pools = TransportPools::for_config(config);
    let sender = ProtocolSender::for_config(config, &pools)?;

    let mut dispatcher = Dispatcher::new(sender);
    if request_logger.enabled() {
        dispatcher = dispatcher.with_request_logger(request_logger.clone());
    }
    if config.show_progress {
        dispatcher = dispatcher.with_progress(ProgressReporter::default());
    }

    run_logger.run_started(config).await;

    let result = match dispatcher.dispatch(config).await {
        Ok(result) => result,
        Err(e) => {
            run_logger.run_failed(&e).await;
            return Err(e);
        }
    };

    if let Some(pool_stats) = &result.pool_stats {
        request_logger
            .log_pool_stats(&config.destination_key(), pool_stats)
            .await;
    }

    let stats = StatisticsEngine::with_defaults().compute(&result.outcomes, result.elapsed);
    run_logger.run_completed(&stats, result.elapsed).await;

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Protocol;
    use async_trait::async_trait;

    struct InstantSender;

    #[async_trait]
    impl RequestSender for InstantSender {
        async fn send(&self, _config: &TestConfiguration) -> RequestOutcome {
            RequestOutcome::success(200, 1.0, 2)
        }
    }

    fn config(requests: u64, concurrency: u64) -> TestConfiguration {
        TestConfiguration {
            number_of_requests: requests,
            concurrency,
            show_progress: false,
            ..TestConfiguration::new("http://localhost", Protocol::Http)
        }
    }

    #[test]
    fn test_validate_for_dispatch() {
        assert!(validate_for_dispatch(&config(1, 1)).is_ok());

        let error = validate_for_dispatch(&config(1, 0)).unwrap_err();
        assert!(matches!(error, AppError::InvalidArgument(_)));

        let mut empty = config(1, 1);
        empty.target = "  ".to_string();
        assert!(matches!(validate_for_dispatch(&empty), Err(AppError::InvalidArgument(_))));

        let mut tcp = config(1, 1);
        tcp.protocol = Protocol::Tcp;
        assert!(matches!(validate_for_dispatch(&tcp), Err(AppError::InvalidArgument(_))));
        tcp.port = 7;
        assert!(validate_for_dispatch(&tcp).is_ok());
    }

    #[test]
    fn test_counters_guard() {
        let counters = DispatchCounters::default();
        {
            let _a = counters.begin();
            let _b = counters.begin();
            assert_eq!(counters.in_progress(), 2);
        }
        assert_eq!(counters.in_progress(), 0);
        assert_eq!(counters.completed(), 2);
        assert_eq!(counters.peak_in_flight(), 2);
    }

    #[tokio::test]
    async fn test_zero_requests() {
        let dispatcher = Dispatcher::new(InstantSender);
        let result = dispatcher.dispatch(&config(0, 4)).await.unwrap();
        assert!(result.outcomes.is_empty());

        let stats = dispatcher.run(&config(0, 4)).await.unwrap();
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.requests_per_second, 0.0);
    }

    /// Reports one live connection until shut down
    #[derive(Default)]
    struct PooledSender {
        closed: AtomicU64,
    }

    #[async_trait]
    impl RequestSender for PooledSender {
        async fn send(&self, _config: &TestConfiguration) -> RequestOutcome {
            RequestOutcome::success(0, 1.0, 4)
        }

        fn pool_stats(&self) -> Option<PoolStats> {
            let live = if self.closed.load(Ordering::SeqCst) == 0 { 1 } else { 0 };
            Some(PoolStats {
                opened: 1,
                live,
                ..PoolStats::default()
            })
        }

        async fn shutdown(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_pool_stats_taken_before_shutdown() {
        let dispatcher = Dispatcher::new(PooledSender::default());
        let result = dispatcher.dispatch(&config(3, 2)).await.unwrap();

        let pool_stats = result.pool_stats.unwrap();
        assert_eq!(pool_stats.opened, 1);
        assert_eq!(pool_stats.live, 1);
        assert_eq!(dispatcher.sender.closed.load(Ordering::SeqCst), 1);

        let plain = Dispatcher::new(InstantSender).dispatch(&config(1, 1)).await.unwrap();
        assert!(plain.pool_stats.is_none());
    }

    #[tokio::test]
    async fn test_counters_settle_after_run() {
        let dispatcher = Dispatcher::new(InstantSender);
        let stats = dispatcher.run(&config(25, 5)).await.unwrap();

        assert_eq!(stats.total_requests, 25);
        assert_eq!(stats.successful_requests, 25);
        let counters = dispatcher.counters();
        assert_eq!(counters.completed(), 25);
        assert_eq!(counters.in_progress(), 0);
        assert!(counters.peak_in_flight() <= 5);
    }
}
