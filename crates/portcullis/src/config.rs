//! Throttle configuration and startup sanitization.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::clock::EpochMillis;

/// Smallest accepted period, in milliseconds.
const MIN_PERIOD_MS: EpochMillis = 1000;

/// Raw, untrusted settings in the shape the host hands them over.
///
/// Every field is an optional string; [`TrackerConfig::from_raw`] coerces
/// them into validated values and never fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RawTrackerConfig {
    /// Attempts tolerated per address within one grace period, 1 to 100.
    pub max_visits: Option<String>,
    /// Grace period length, in seconds.
    pub grace_period: Option<String>,
    /// Blackout length, in seconds.
    pub blackout_period: Option<String>,
    /// Sweep periodicity, in seconds.
    pub sweep_interval: Option<String>,
    /// Whether blocked attempts are logged; exactly "true" enables.
    pub log_failures: Option<String>,
}

/// Validated throttle settings; all periods are in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Attempts tolerated per address within one grace period.
    pub max_visits: u32,
    /// Length of the counting window.
    pub grace_period_ms: EpochMillis,
    /// Cooldown served after the grace period by an over-threshold address.
    pub blackout_period_ms: EpochMillis,
    /// Minimum spacing between eviction passes.
    pub sweep_interval_ms: EpochMillis,
    /// Whether blocked attempts are logged.
    pub log_failures: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_visits: 1,
            grace_period_ms: 1000,
            blackout_period_ms: 60_000, // 1 minute
            sweep_interval_ms: 900_000, // 15 minutes
            log_failures: false,
        }
    }
}

impl TrackerConfig {
    /// Coerce raw host settings into a validated configuration.
    ///
    /// Absent fields take their defaults silently. Present but malformed or
    /// out-of-range values are logged and replaced with the default, so
    /// sanitization never fails.
    #[must_use]
    pub fn from_raw(raw: &RawTrackerConfig) -> Self {
        let defaults = Self::default();
        Self {
            max_visits: count_or(
                raw.max_visits.as_deref(),
                "max-visits",
                1,
                100,
                defaults.max_visits,
            ),
            grace_period_ms: period_ms_or(
                raw.grace_period.as_deref(),
                "grace-period",
                defaults.grace_period_ms,
            ),
            blackout_period_ms: period_ms_or(
                raw.blackout_period.as_deref(),
                "blackout-period",
                defaults.blackout_period_ms,
            ),
            sweep_interval_ms: period_ms_or(
                raw.sweep_interval.as_deref(),
                "sweep-interval",
                defaults.sweep_interval_ms,
            ),
            log_failures: raw.log_failures.as_deref() == Some("true"),
        }
    }
}

/// Parse a whole integer, rejecting trailing garbage and numeric prefixes.
fn parse_int(text: &str) -> Option<i64> {
    text.trim().parse().ok()
}

/// Bounded count setting, or the fallback when absent or rejected.
fn count_or(raw: Option<&str>, name: &str, min: u32, max: u32, fallback: u32) -> u32 {
    let Some(text) = raw else { return fallback };
    match parse_int(text).and_then(|n| u32::try_from(n).ok()) {
        Some(n) if (min..=max).contains(&n) => n,
        _ => {
            warn!(setting = name, value = text, "Rejected setting, using fallback");
            fallback
        }
    }
}

/// Period setting given in seconds, converted to milliseconds, or the
/// fallback when absent, unparseable, or under the floor.
fn period_ms_or(raw: Option<&str>, name: &str, fallback: EpochMillis) -> EpochMillis {
    let Some(text) = raw else { return fallback };
    match parse_int(text).map(|secs| secs.saturating_mul(1000)) {
        Some(ms) if ms >= MIN_PERIOD_MS => ms,
        _ => {
            warn!(setting = name, value = text, "Rejected setting, using fallback");
            fallback
        }
    }
}
