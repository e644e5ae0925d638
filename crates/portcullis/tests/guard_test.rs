//! Integration tests for request screening through the host interface.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use portcullis::{
    BruteForceGuard, ManualClock, RawTrackerConfig, RequestContext, TrackerConfig, Verdict,
    start_sweeper_task,
};

// ==================== Helper Functions ====================

/// Minimal host request context backed by plain fields.
#[derive(Debug, Default)]
struct TestRequest {
    remote_addr: Option<IpAddr>,
    status: Option<u16>,
    body: Vec<u8>,
}

impl TestRequest {
    fn from_addr(last: u8) -> Self {
        Self {
            remote_addr: Some(IpAddr::from([198, 51, 100, last])),
            status: None,
            body: b"login attempt".to_vec(),
        }
    }
}

impl RequestContext for TestRequest {
    fn remote_addr(&self) -> Option<IpAddr> {
        self.remote_addr
    }

    fn set_status(&mut self, status: u16) {
        self.status = Some(status);
    }

    fn set_empty_body(&mut self) {
        self.body.clear();
    }
}

/// Guard configured the way a login endpoint would be: five attempts,
/// five-minute grace, fifteen-minute blackout.
fn login_guard(clock: Arc<ManualClock>) -> BruteForceGuard {
    let raw = RawTrackerConfig {
        max_visits: Some("5".into()),
        grace_period: Some("300".into()),
        blackout_period: Some("900".into()),
        log_failures: Some("true".into()),
        ..RawTrackerConfig::default()
    };
    BruteForceGuard::with_clock(TrackerConfig::from_raw(&raw), clock)
}

// ==================== Screening Tests ====================

#[test]
fn test_attempts_within_tolerance_pass_untouched() {
    let clock = Arc::new(ManualClock::new(0));
    let guard = login_guard(clock.clone());

    for t in 0..5 {
        clock.set(t);
        let mut request = TestRequest::from_addr(1);
        assert!(guard.handle(&mut request).is_allowed());
        assert_eq!(request.status, None);
        assert_eq!(request.body, b"login attempt");
    }
}

#[test]
fn test_sixth_attempt_denied_with_forbidden_and_empty_body() {
    let clock = Arc::new(ManualClock::new(0));
    let guard = login_guard(clock.clone());

    for t in 0..5 {
        clock.set(t);
        guard.handle(&mut TestRequest::from_addr(1));
    }

    clock.set(5);
    let mut sixth = TestRequest::from_addr(1);
    assert_eq!(guard.handle(&mut sixth), Verdict::Block { attempts: 6 });
    assert_eq!(sixth.status, Some(403));
    assert!(sixth.body.is_empty());

    // Still inside the grace window: the count keeps climbing.
    clock.set(200_000);
    let mut seventh = TestRequest::from_addr(1);
    assert_eq!(guard.handle(&mut seventh), Verdict::Block { attempts: 7 });
}

#[test]
fn test_address_released_after_grace_plus_blackout() {
    let clock = Arc::new(ManualClock::new(0));
    let guard = login_guard(clock.clone());

    for t in 0..6 {
        clock.set(t);
        guard.handle(&mut TestRequest::from_addr(1));
    }
    assert_eq!(guard.tracker().attempt_count(&IpAddr::from([198, 51, 100, 1])), 6);

    // One past grace (5 min) + blackout (15 min) from the first attempt.
    clock.set(1_200_001);
    let mut request = TestRequest::from_addr(1);
    assert!(guard.handle(&mut request).is_allowed());
    assert_eq!(request.status, None);
    assert_eq!(guard.tracker().attempt_count(&IpAddr::from([198, 51, 100, 1])), 1);
}

#[test]
fn test_unrelated_addresses_screen_independently() {
    let clock = Arc::new(ManualClock::new(0));
    let guard = login_guard(clock.clone());

    for t in 0..6 {
        clock.set(t);
        guard.handle(&mut TestRequest::from_addr(1));
    }

    // A neighbor is untouched by the offender's blackout.
    let mut neighbor = TestRequest::from_addr(2);
    assert!(guard.handle(&mut neighbor).is_allowed());
    assert_eq!(neighbor.status, None);
    assert_eq!(neighbor.body, b"login attempt");
}

#[test]
fn test_request_without_address_is_let_through() {
    let clock = Arc::new(ManualClock::new(0));
    let guard = login_guard(clock);

    let mut anonymous = TestRequest::default();
    assert!(guard.handle(&mut anonymous).is_allowed());
    assert_eq!(anonymous.status, None);
    assert_eq!(guard.tracker().tracked_count(), 0);
}

#[test]
fn test_verdict_mirrors_context_mutation() {
    let config = TrackerConfig {
        max_visits: 1,
        grace_period_ms: 1000,
        blackout_period_ms: 1000,
        ..TrackerConfig::default()
    };
    let guard = BruteForceGuard::with_clock(config, Arc::new(ManualClock::new(0)));

    let mut first = TestRequest::from_addr(3);
    assert_eq!(guard.handle(&mut first), Verdict::Allow);
    assert_eq!(first.status, None);

    let mut second = TestRequest::from_addr(3);
    assert_eq!(guard.handle(&mut second), Verdict::Block { attempts: 2 });
    assert_eq!(second.status, Some(403));
}

// ==================== Configuration Tests ====================

#[test]
fn test_malformed_host_settings_fall_back_to_defaults() {
    let raw = RawTrackerConfig {
        max_visits: Some("abc".into()),
        grace_period: Some("0".into()),
        blackout_period: Some("-5".into()),
        log_failures: Some("yes".into()),
        ..RawTrackerConfig::default()
    };
    let guard = BruteForceGuard::from_raw(&raw);

    let config = guard.config();
    assert_eq!(config.max_visits, 1);
    assert_eq!(config.grace_period_ms, 1000);
    assert_eq!(config.blackout_period_ms, 60_000);
    assert!(!config.log_failures);
}

// ==================== Sweep Tests ====================

#[test]
fn test_sweep_prunes_served_blackouts() {
    let clock = Arc::new(ManualClock::new(0));
    let guard = login_guard(clock.clone());
    let offender = IpAddr::from([198, 51, 100, 1]);

    for t in 0..6 {
        clock.set(t);
        guard.handle(&mut TestRequest::from_addr(1));
    }
    assert!(guard.tracker().is_tracked(&offender));

    // Well past grace + blackout and past the first sweep due instant.
    clock.set(1_300_000);
    assert_eq!(guard.sweep_now(), 1);
    assert!(!guard.tracker().is_tracked(&offender));

    // The next attempt starts from a clean slate.
    let mut request = TestRequest::from_addr(1);
    assert!(guard.handle(&mut request).is_allowed());
    assert_eq!(guard.tracker().attempt_count(&offender), 1);
}

// ==================== Background Sweeper Tests ====================

#[tokio::test]
async fn test_background_sweeper_prunes_idle_addresses() {
    let config = TrackerConfig {
        max_visits: 1,
        grace_period_ms: 10,
        blackout_period_ms: 10,
        sweep_interval_ms: 40,
        log_failures: false,
    };
    let guard = Arc::new(BruteForceGuard::new(config));
    let addr = IpAddr::from([198, 51, 100, 9]);

    guard.handle(&mut TestRequest::from_addr(9));
    assert!(guard.tracker().is_tracked(&addr));

    let sweeper = start_sweeper_task(Arc::clone(&guard));
    assert!(sweeper.is_running());

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(!guard.tracker().is_tracked(&addr));

    sweeper.stop();
    assert!(!sweeper.is_running());
}

// ==================== Lifecycle Tests ====================

#[test]
fn test_shutdown_forgets_every_address() {
    let clock = Arc::new(ManualClock::new(0));
    let guard = login_guard(clock.clone());

    for t in 0..6 {
        clock.set(t);
        guard.handle(&mut TestRequest::from_addr(1));
    }
    guard.handle(&mut TestRequest::from_addr(2));
    assert_eq!(guard.tracker().tracked_count(), 2);

    guard.shutdown();
    assert_eq!(guard.tracker().tracked_count(), 0);

    // A formerly blocked address gets a clean slate.
    let mut request = TestRequest::from_addr(1);
    assert!(guard.handle(&mut request).is_allowed());
}
