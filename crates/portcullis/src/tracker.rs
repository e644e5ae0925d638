//! Per-address failed-attempt tracking.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::net::IpAddr;

use parking_lot::RwLock;
use tracing::debug;

use crate::clock::EpochMillis;
use crate::config::TrackerConfig;

/// Outcome of recording one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The attempt is within tolerance; the request proceeds.
    Allow,
    /// The address has exhausted its tolerance and sits in its blackout.
    Block {
        /// Attempts recorded in the current window, including this one.
        attempts: u32,
    },
}

impl Verdict {
    /// Check if the verdict lets the request through.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Check if the verdict denies the request.
    #[must_use]
    pub const fn is_blocked(&self) -> bool {
        matches!(self, Self::Block { .. })
    }
}

/// Attempt history for one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptRecord {
    /// When the current counting window opened.
    pub window_start: EpochMillis,
    /// Attempts observed since the window opened, never capped.
    pub count: u32,
}

impl AttemptRecord {
    /// Open a fresh window holding a single attempt.
    #[must_use]
    pub const fn new(now: EpochMillis) -> Self {
        Self {
            window_start: now,
            count: 1,
        }
    }

    /// Restart the window at the given instant.
    fn reset(&mut self, now: EpochMillis) {
        self.window_start = now;
        self.count = 1;
    }
}

/// Tracks failed attempts per source address and classifies each new one.
///
/// All map access goes through a single lock, so concurrent [`record`] and
/// [`sweep`] calls never lose an update or evict a record mid-change.
///
/// [`record`]: AttemptTracker::record
/// [`sweep`]: AttemptTracker::sweep
#[derive(Debug)]
pub struct AttemptTracker {
    /// Validated throttle settings.
    config: TrackerConfig,
    /// Attempt history per address.
    visitors: RwLock<HashMap<IpAddr, AttemptRecord>>,
    /// Earliest instant the next sweep may run.
    next_sweep_due: RwLock<EpochMillis>,
}

impl AttemptTracker {
    /// Create a tracker; the first sweep comes due one interval from `now`.
    #[must_use]
    pub fn new(config: TrackerConfig, now: EpochMillis) -> Self {
        let due = now.saturating_add(config.sweep_interval_ms);
        Self {
            config,
            visitors: RwLock::new(HashMap::new()),
            next_sweep_due: RwLock::new(due),
        }
    }

    /// Record one attempt from `addr` and classify it.
    ///
    /// The first attempt from an unseen address is always allowed. After
    /// that, an address whose window has gone quiet (grace elapsed while at
    /// or under the threshold) or whose blackout has fully elapsed starts a
    /// fresh window; anything else increments the window count and is
    /// blocked once the count passes the threshold.
    pub fn record(&self, addr: IpAddr, now: EpochMillis) -> Verdict {
        let mut visitors = self.visitors.write();

        let record = match visitors.entry(addr) {
            Entry::Vacant(slot) => {
                slot.insert(AttemptRecord::new(now));
                debug!(address = %addr, "Tracking new address");
                return Verdict::Allow;
            }
            Entry::Occupied(slot) => slot.into_mut(),
        };

        let elapsed = now.saturating_sub(record.window_start);

        // Quiet spell at or under the threshold: forgive and restart.
        // Checked first so a well-behaved address never enters blackout.
        if elapsed >= self.config.grace_period_ms && record.count <= self.config.max_visits {
            debug!(address = %addr, "Grace elapsed quietly, window restarted");
            record.reset(now);
            return Verdict::Allow;
        }

        // Blackout fully served: forgive and restart.
        let release = self
            .config
            .grace_period_ms
            .saturating_add(self.config.blackout_period_ms);
        if elapsed >= release {
            debug!(address = %addr, attempts = record.count, "Blackout served, window restarted");
            record.reset(now);
            return Verdict::Allow;
        }

        // Still inside the window (or the blackout). The count keeps
        // climbing while blocked; it is never capped at the threshold.
        record.count = record.count.saturating_add(1);
        if record.count > self.config.max_visits {
            Verdict::Block {
                attempts: record.count,
            }
        } else {
            Verdict::Allow
        }
    }

    /// Evict records that no longer matter, at most once per interval.
    ///
    /// A call before the due instant is a cheap no-op. Whichever caller
    /// crosses the due boundary first claims the pass and pushes the next
    /// due instant out by one interval, so concurrent callers sweep exactly
    /// once. Returns the number of evicted addresses.
    pub fn sweep(&self, now: EpochMillis) -> usize {
        {
            let mut due = self.next_sweep_due.write();
            if now < *due {
                return 0;
            }
            *due = now.saturating_add(self.config.sweep_interval_ms);
        }

        let grace = self.config.grace_period_ms;
        let release = grace.saturating_add(self.config.blackout_period_ms);
        let max_visits = self.config.max_visits;

        let mut visitors = self.visitors.write();
        let before = visitors.len();

        visitors.retain(|addr, record| {
            let elapsed = now.saturating_sub(record.window_start);
            let keep = if elapsed < grace {
                true
            } else if record.count <= max_visits {
                // Grace over without tripping the threshold: stale.
                false
            } else {
                // Over threshold: hold through the blackout, then drop.
                elapsed < release
            };
            if !keep {
                debug!(address = %addr, attempts = record.count, "Evicting expired record");
            }
            keep
        });

        let evicted = before.saturating_sub(visitors.len());
        if evicted > 0 {
            debug!(evicted, remaining = visitors.len(), "Sweep finished");
        }
        evicted
    }

    /// Attempts recorded for an address in its current window, 0 if untracked.
    #[must_use]
    pub fn attempt_count(&self, addr: &IpAddr) -> u32 {
        self.visitors.read().get(addr).map_or(0, |record| record.count)
    }

    /// Copy of the record currently held for an address.
    #[must_use]
    pub fn snapshot(&self, addr: &IpAddr) -> Option<AttemptRecord> {
        self.visitors.read().get(addr).copied()
    }

    /// Check if an address currently has a record.
    #[must_use]
    pub fn is_tracked(&self, addr: &IpAddr) -> bool {
        self.visitors.read().contains_key(addr)
    }

    /// Number of tracked addresses.
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.visitors.read().len()
    }

    /// Earliest instant the next sweep may run.
    #[must_use]
    pub fn next_sweep_due(&self) -> EpochMillis {
        *self.next_sweep_due.read()
    }

    /// Drop every record.
    pub fn clear(&self) {
        self.visitors.write().clear();
    }

    /// The validated settings this tracker runs with.
    #[must_use]
    pub const fn config(&self) -> &TrackerConfig {
        &self.config
    }
}
