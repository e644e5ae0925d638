//! # portcullis
//!
//! Per-address brute-force throttling for request pipelines.
//!
//! Repeated attempts from one source address (failed logins, password
//! probes) accumulate inside a rolling grace window; once an address goes
//! over its threshold it is denied with HTTP 403 until a blackout period
//! has elapsed, then quietly forgiven.
//!
//! ## Core
//!
//! - [`AttemptTracker`] - Per-address attempt counting and the
//!   ALLOW/BLOCK [`Verdict`] state machine
//! - [`BruteForceGuard`] - Host-facing layer that rewrites a blocked
//!   [`RequestContext`] to 403 with an empty body and fails open on faults
//! - [`start_sweeper_task`] - Optional background eviction of stale records
//!
//! ## Configuration
//!
//! - [`RawTrackerConfig`] - Untrusted host settings as plain strings
//! - [`TrackerConfig`] - Validated settings; sanitization never fails
//!   startup, malformed values fall back to safe defaults
//!
//! ## Time
//!
//! - [`Clock`] - Injectable millisecond time source
//! - [`SystemClock`] for production, [`ManualClock`] for tests
//!
//! # Example
//!
//! ```rust
//! use portcullis::{AttemptTracker, TrackerConfig, Verdict};
//! use std::net::IpAddr;
//!
//! let config = TrackerConfig {
//!     max_visits: 3,
//!     ..TrackerConfig::default()
//! };
//! let tracker = AttemptTracker::new(config, 0);
//!
//! let addr: IpAddr = "203.0.113.9".parse().unwrap();
//! for _ in 0..3 {
//!     assert_eq!(tracker.record(addr, 0), Verdict::Allow);
//! }
//! assert_eq!(tracker.record(addr, 0), Verdict::Block { attempts: 4 });
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod error;
pub mod guard;
pub mod sweeper;
pub mod tracker;

// Re-export main types
pub use clock::{Clock, EpochMillis, ManualClock, SystemClock};
pub use config::{RawTrackerConfig, TrackerConfig};
pub use error::{GuardError, GuardResult};
pub use guard::{BruteForceGuard, RequestContext};
pub use sweeper::{SweeperHandle, start_sweeper_task};
pub use tracker::{AttemptRecord, AttemptTracker, Verdict};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::clock::{Clock, EpochMillis, ManualClock, SystemClock};
    pub use crate::config::{RawTrackerConfig, TrackerConfig};
    pub use crate::error::{GuardError, GuardResult};
    pub use crate::guard::{BruteForceGuard, RequestContext};
    pub use crate::sweeper::{SweeperHandle, start_sweeper_task};
    pub use crate::tracker::{AttemptRecord, AttemptTracker, Verdict};
}
