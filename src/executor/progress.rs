//! Live progress line driven by the dispatcher counters

use super::DispatchCounters;
use crate::defaults;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Receives rendered progress lines
pub type ProgressSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Samples counters on a fixed interval and renders a bounded-width bar
#[derive(Clone)]
pub struct ProgressReporter {
    interval: Duration,
    width: usize,
    sink: ProgressSink,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(defaults::DEFAULT_PROGRESS_INTERVAL, defaults::DEFAULT_PROGRESS_WIDTH)
    }
}

impl ProgressReporter {
    /// Reporter writing to stderr
    pub fn new(interval: Duration, width: usize) -> Self {
        Self {
            interval,
            width,
            sink: Arc::new(|line: &str| {
                let mut stderr = io::stderr().lock();
                let _ = write!(stderr, "\r{}", line);
                let _ = stderr.flush();
            }),
        }
    }

    /// Send rendered lines to `sink` instead of stderr
    pub fn with_sink(mut self, sink: ProgressSink) -> Self {
        self.sink = sink;
        self
    }

    /// Start rendering progress of `total` requests
    pub fn start(&self, counters: Arc<DispatchCounters>, total: u64) -> ProgressHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let rendering = Arc::new(AtomicBool::new(false));
        let sink = Arc::clone(&self.sink);
        let width = self.width;
        let period = self.interval.max(Duration::from_millis(1));

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // Skip this tick while the previous line is still being written
                        if rendering
                            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                            .is_err()
                        {
                            continue;
                        }

                        let line = render_progress(counters.completed(), counters.in_progress(), total, width);
                        let sink = Arc::clone(&sink);
                        let rendering = Arc::clone(&rendering);
                        tokio::task::spawn_blocking(move || {
                            sink(&line);
                            rendering.store(false, Ordering::Release);
                        });
                    }
                    _ = shutdown_rx.wait_for(|stop| *stop) => break,
                }
            }

            while rendering.load(Ordering::Acquire) {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }

            // Final state, then end the line
            let line = render_progress(counters.completed(), counters.in_progress(), total, width);
            sink(&format!("{}\n", line));
        });

        ProgressHandle { shutdown_tx, task }
    }
}

/// Running progress task; consumed by `stop` so it stops exactly once
pub struct ProgressHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ProgressHandle {
    /// Stop the reporter and wait for the final line
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }
}

/// Render `[#####-----]  45.0% (45/100) in-flight: 3` with a bar `width` cells wide
pub fn render_progress(completed: u64, in_flight: u64, total: u64, width: usize) -> String {
    let ratio = if total == 0 {
        1.0
    } else {
        (completed.min(total) as f64 / total as f64).clamp(0.0, 1.0)
    };

    let filled = ((ratio * width as f64).round() as usize).min(width);
    format!(
        "[{}{}] {:>5.1}% ({}/{}) in-flight: {}",
        "#".repeat(filled),
        "-".repeat(width - filled),
        ratio * 100.0,
        completed,
        total,
        in_flight
    )
}
