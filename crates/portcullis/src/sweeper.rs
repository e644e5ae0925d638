//! Background sweep scheduling.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::debug;

use crate::guard::BruteForceGuard;

/// Handle for controlling the background sweeper task.
#[derive(Debug)]
pub struct SweeperHandle {
    running: Arc<AtomicBool>,
}

impl SweeperHandle {
    /// Create a new sweeper handle.
    pub(crate) fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check if the sweeper task is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the sweeper task.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Start a periodic sweep task for the given guard.
///
/// The task wakes once per sweep interval and runs an eviction pass. The
/// tracker's own throttling still applies, so this task and the
/// opportunistic sweeps piggybacked on request handling never double up.
///
/// Returns a handle to stop the task.
pub fn start_sweeper_task(guard: Arc<BruteForceGuard>) -> SweeperHandle {
    let handle = SweeperHandle::new();
    handle.running.store(true, Ordering::SeqCst);

    let running = Arc::clone(&handle.running);
    let period = interval_duration(guard.config().sweep_interval_ms);

    tokio::spawn(async move {
        let mut interval_timer = tokio::time::interval(period);

        while running.load(Ordering::SeqCst) {
            interval_timer.tick().await;

            if !running.load(Ordering::SeqCst) {
                break;
            }

            let evicted = guard.sweep_now();
            if evicted > 0 {
                debug!(evicted, "Background sweep evicted records");
            }
        }
    });

    handle
}

/// Sweep interval as a duration, clamped to at least one millisecond.
fn interval_duration(interval_ms: i64) -> Duration {
    Duration::from_millis(u64::try_from(interval_ms).unwrap_or(1).max(1))
}
