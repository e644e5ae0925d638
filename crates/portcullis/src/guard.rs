//! Host-facing request screening layer.

use std::net::IpAddr;
use std::sync::Arc;

use tracing::{debug, error};

use crate::clock::{Clock, SystemClock};
use crate::config::{RawTrackerConfig, TrackerConfig};
use crate::error::{GuardError, GuardResult};
use crate::tracker::{AttemptTracker, Verdict};

/// Status code carried by a denied request.
const FORBIDDEN: u16 = 403;

/// Mutable view of one in-flight request, implemented by the host.
///
/// The guard reads the source address and, on a block, rewrites the
/// response; on an allow the context is left untouched for downstream
/// processing.
pub trait RequestContext {
    /// Source address of the request, if the host knows it.
    fn remote_addr(&self) -> Option<IpAddr>;

    /// Set the response status code.
    fn set_status(&mut self, status: u16);

    /// Replace the response body with an empty one.
    fn set_empty_body(&mut self);
}

/// Screens requests against per-address attempt history.
///
/// One guard instance serves the whole request pipeline; construct it at
/// startup and share it by reference or behind an [`Arc`].
#[derive(Debug)]
pub struct BruteForceGuard {
    /// Validated throttle settings.
    config: TrackerConfig,
    /// Per-address attempt state.
    tracker: AttemptTracker,
    /// Time source for all window arithmetic.
    clock: Arc<dyn Clock>,
}

impl BruteForceGuard {
    /// Create a guard running on the system clock.
    #[must_use]
    pub fn new(config: TrackerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a guard with an injected time source.
    #[must_use]
    pub fn with_clock(config: TrackerConfig, clock: Arc<dyn Clock>) -> Self {
        let tracker = AttemptTracker::new(config.clone(), clock.now_ms());
        debug!(
            version = env!("CARGO_PKG_VERSION"),
            max_visits = config.max_visits,
            grace_period_ms = config.grace_period_ms,
            blackout_period_ms = config.blackout_period_ms,
            "Brute-force guard ready"
        );
        Self {
            config,
            tracker,
            clock,
        }
    }

    /// Create a guard from raw host settings, sanitizing them first.
    #[must_use]
    pub fn from_raw(raw: &RawTrackerConfig) -> Self {
        Self::new(TrackerConfig::from_raw(raw))
    }

    /// Screen one request, rewriting the response on a block.
    ///
    /// On a block the context gets status 403 and an empty body; the
    /// verdict is also returned so the host can short-circuit its pipeline.
    /// Any internal fault is logged and the request passes through
    /// unhindered, so a broken guard never takes down the request path.
    pub fn handle<C: RequestContext>(&self, ctx: &mut C) -> Verdict {
        match self.try_handle(ctx) {
            Ok(verdict) => verdict,
            Err(err) => {
                error!(error = %err, "Screening failed, letting request through");
                Verdict::Allow
            }
        }
    }

    /// Fallible screening path; `handle` wraps it fail-open.
    fn try_handle<C: RequestContext>(&self, ctx: &mut C) -> GuardResult<Verdict> {
        let addr = ctx.remote_addr().ok_or(GuardError::AddressUnavailable)?;
        let now = self.clock.now_ms();

        let verdict = self.tracker.record(addr, now);
        if let Verdict::Block { attempts } = verdict {
            ctx.set_status(FORBIDDEN);
            ctx.set_empty_body();
            if self.config.log_failures {
                error!(address = %addr, attempts, "Blocked repeated attempts");
            }
        }

        // Piggyback maintenance on request traffic; the tracker's own
        // throttling keeps this cheap.
        self.tracker.sweep(now);

        Ok(verdict)
    }

    /// Run a sweep attempt at the current time.
    ///
    /// Still subject to the sweep interval. Returns the number of evicted
    /// addresses.
    pub fn sweep_now(&self) -> usize {
        self.tracker.sweep(self.clock.now_ms())
    }

    /// Release all tracked state ahead of teardown.
    pub fn shutdown(&self) {
        debug!(
            tracked = self.tracker.tracked_count(),
            "Brute-force guard shutting down"
        );
        self.tracker.clear();
    }

    /// The validated settings this guard runs with.
    #[must_use]
    pub const fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// The underlying attempt tracker.
    #[must_use]
    pub const fn tracker(&self) -> &AttemptTracker {
        &self.tracker
    }
}

impl Default for BruteForceGuard {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}
