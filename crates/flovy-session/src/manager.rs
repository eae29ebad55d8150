//! The inactivity watchdog.
//!
//! [`SessionManager`] tracks the time since the last qualifying user
//! activity and invokes a sign-out collaborator once the configured
//! timeout elapses. The deadline is enforced by a single watchdog task
//! driven by a coalescing notifier: state changes (start, stop, activity,
//! config updates) just move the deadline and wake the task, so at most
//! one pending timeout exists at any time, by construction.
//!
//! Activity recording is cheap - a timestamp write plus a notifier poke -
//! because pointer-move class events can arrive at high frequency.

use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::config::{ActivityEvent, SessionConfig, SessionConfigUpdate, SessionPreset};

#[derive(Debug)]
struct Inner {
    config: SessionConfig,
    last_activity: Instant,
    armed: bool,
    warned: bool,
    closed: bool,
}

/// Enforces an inactivity timeout that signs the user out automatically.
///
/// Construct one per application and share it by cloning (clones share
/// state). The watchdog itself runs in [`run`], which is typically
/// spawned once at startup.
///
/// [`run`]: SessionManager::run
#[derive(Debug, Clone)]
pub struct SessionManager {
    state: Arc<RwLock<Inner>>,
    notify: Arc<Notify>,
}

impl SessionManager {
    /// Creates a manager with the given configuration, stopped.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(Inner {
                config,
                last_activity: Instant::now(),
                armed: false,
                warned: false,
                closed: false,
            })),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Creates a manager from a preset.
    pub fn from_preset(preset: SessionPreset) -> Self {
        Self::new(preset.config())
    }

    /// Arms the timeout. No-op when already armed, so concurrent starts
    /// cannot produce duplicate deadlines.
    pub fn start(&self) {
        {
            let mut state = self.state.write().unwrap();
            if state.armed {
                return;
            }
            state.armed = true;
            state.warned = false;
            state.last_activity = Instant::now();
            info!(
                timeout_minutes = state.config.timeout_minutes,
                "session manager started"
            );
        }
        self.notify.notify_one();
    }

    /// Disarms the timeout. Idempotent; once stopped, no amount of
    /// elapsed time triggers a sign-out.
    pub fn stop(&self) {
        {
            let mut state = self.state.write().unwrap();
            if !state.armed {
                return;
            }
            state.armed = false;
            debug!("session manager stopped");
        }
        self.notify.notify_one();
    }

    /// Records a user activity event.
    ///
    /// Resets the clock when armed, `reset_on_activity` is set, and the
    /// event is in the configured set; otherwise it is ignored.
    pub fn record_activity(&self, event: ActivityEvent) {
        {
            let mut state = self.state.write().unwrap();
            if !state.armed || !state.config.counts_as_activity(event) {
                return;
            }
            state.last_activity = Instant::now();
            state.warned = false;
        }
        self.notify.notify_one();
    }

    /// Merges a partial configuration change.
    ///
    /// When armed, the deadline immediately re-bases off the new timeout
    /// from the current time; there is no grace period.
    pub fn update_config(&self, update: SessionConfigUpdate) {
        {
            let mut state = self.state.write().unwrap();
            update.apply(&mut state.config);
            if state.armed {
                state.last_activity = Instant::now();
                state.warned = false;
            }
        }
        self.notify.notify_one();
    }

    /// Switches to a preset configuration.
    pub fn use_preset(&self, preset: SessionPreset) {
        info!(preset = preset.name(), "switching session preset");
        let config = preset.config();
        self.update_config(SessionConfigUpdate {
            timeout_minutes: Some(config.timeout_minutes),
            check_interval_seconds: Some(config.check_interval_seconds),
            reset_on_activity: Some(config.reset_on_activity),
            warning_threshold_minutes: Some(config.warning_threshold_minutes),
            activity_events: Some(config.activity_events),
        });
    }

    /// Time until the session expires.
    ///
    /// Zero when stopped or when the timeout is disabled. Pure
    /// computation; no side effects.
    pub fn time_remaining(&self) -> Duration {
        let state = self.state.read().unwrap();
        if !state.armed {
            return Duration::ZERO;
        }
        match state.config.timeout() {
            Some(timeout) => {
                (state.last_activity + timeout).saturating_duration_since(Instant::now())
            }
            None => Duration::ZERO,
        }
    }

    /// Time until the session expires, in minutes (rounded up).
    pub fn time_remaining_minutes(&self) -> u64 {
        (self.time_remaining().as_millis() as u64).div_ceil(60_000)
    }

    /// True while the timeout is armed.
    pub fn is_armed(&self) -> bool {
        self.state.read().unwrap().armed
    }

    /// A copy of the current configuration.
    pub fn config(&self) -> SessionConfig {
        self.state.read().unwrap().config.clone()
    }

    /// Shuts the watchdog down. Used on application teardown.
    pub fn close(&self) {
        self.state.write().unwrap().closed = true;
        self.notify.notify_one();
    }

    /// Runs the watchdog until [`close`] is called.
    ///
    /// `sign_out` is invoked exactly once per expiry (the armed flag
    /// drops before the call, so an explicit logout racing the timer
    /// cannot double-invoke it). Sign-out failures are logged, not
    /// retried.
    ///
    /// [`close`]: SessionManager::close
    pub async fn run<F, Fut>(&self, sign_out: F)
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<(), String>>,
    {
        loop {
            let (closed, wake_at) = self.next_wake();
            if closed {
                debug!("session watchdog shutting down");
                break;
            }

            match wake_at {
                Some(deadline) => {
                    tokio::select! {
                        _ = sleep_until(deadline) => {
                            self.emit_warning_if_due();
                            if self.take_expired() {
                                info!("session timeout - signing out user");
                                if let Err(e) = sign_out().await {
                                    warn!("sign-out failed: {}", e);
                                }
                            }
                        }
                        _ = self.notify.notified() => {}
                    }
                }
                None => self.notify.notified().await,
            }
        }
    }

    /// Computes the next instant the watchdog must wake at: the warning
    /// point (if not yet emitted) or the deadline, whichever is sooner.
    fn next_wake(&self) -> (bool, Option<Instant>) {
        let state = self.state.read().unwrap();
        if state.closed {
            return (true, None);
        }
        if !state.armed {
            return (false, None);
        }

        let Some(timeout) = state.config.timeout() else {
            return (false, None);
        };

        let deadline = state.last_activity + timeout;
        let warning_threshold = state.config.warning_threshold();
        if !state.warned && !warning_threshold.is_zero() && warning_threshold < timeout {
            let warning_point = deadline - warning_threshold;
            if warning_point > Instant::now() {
                return (false, Some(warning_point));
            }
        }

        (false, Some(deadline))
    }

    /// Logs a warning when the session has entered the warning window.
    fn emit_warning_if_due(&self) {
        let mut state = self.state.write().unwrap();
        if !state.armed || state.warned {
            return;
        }
        let Some(timeout) = state.config.timeout() else {
            return;
        };

        let deadline = state.last_activity + timeout;
        let remaining = deadline.saturating_duration_since(Instant::now());
        if !remaining.is_zero() && remaining <= state.config.warning_threshold() {
            state.warned = true;
            warn!(
                remaining_minutes = (remaining.as_millis() as u64).div_ceil(60_000),
                "session expiring soon"
            );
        }
    }

    /// Atomically checks for expiry and disarms. Returns true when the
    /// sign-out should fire.
    fn take_expired(&self) -> bool {
        let mut state = self.state.write().unwrap();
        if !state.armed {
            return false;
        }
        let Some(timeout) = state.config.timeout() else {
            return false;
        };
        if Instant::now() >= state.last_activity + timeout {
            state.armed = false;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::sleep;

    fn minutes(m: u64) -> Duration {
        Duration::from_secs(m * 60)
    }

    /// Spawns the watchdog and returns the sign-out counter.
    fn spawn_watchdog(manager: &SessionManager) -> Arc<AtomicU32> {
        let count = Arc::new(AtomicU32::new(0));
        let counter = count.clone();
        let watchdog = manager.clone();
        tokio::spawn(async move {
            watchdog
                .run(move || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                })
                .await;
        });
        count
    }

    #[tokio::test(start_paused = true)]
    async fn fires_sign_out_exactly_once() {
        let manager = SessionManager::from_preset(SessionPreset::Standard);
        let count = spawn_watchdog(&manager);

        manager.start();
        sleep(minutes(30) + Duration::from_secs(1)).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!manager.is_armed());
        assert_eq!(manager.time_remaining(), Duration::ZERO);

        // More idle time never fires again.
        sleep(minutes(90)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        manager.close();
    }

    #[tokio::test(start_paused = true)]
    async fn activity_postpones_the_deadline() {
        let manager = SessionManager::new(SessionConfig {
            timeout_minutes: 2,
            ..SessionPreset::Standard.config()
        });
        let count = spawn_watchdog(&manager);

        manager.start();
        sleep(minutes(1)).await;
        manager.record_activity(ActivityEvent::Click);

        // 2:10 after start, but only 1:10 since the last activity.
        sleep(minutes(1) + Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(manager.is_armed());

        // Another minute of silence crosses the deadline.
        sleep(minutes(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        manager.close();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_sign_out() {
        let manager = SessionManager::from_preset(SessionPreset::HighSecurity);
        let count = spawn_watchdog(&manager);

        manager.start();
        manager.stop();
        sleep(minutes(60)).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(manager.time_remaining(), Duration::ZERO);

        manager.close();
    }

    #[tokio::test(start_paused = true)]
    async fn zero_timeout_never_fires() {
        let manager = SessionManager::from_preset(SessionPreset::NoTimeout);
        let count = spawn_watchdog(&manager);

        manager.start();
        sleep(minutes(24 * 60)).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(manager.is_armed());
        assert_eq!(manager.time_remaining_minutes(), 0);

        manager.close();
    }

    #[tokio::test(start_paused = true)]
    async fn preset_switch_rebases_from_now() {
        let manager = SessionManager::from_preset(SessionPreset::Standard);
        let count = spawn_watchdog(&manager);

        manager.start();
        sleep(minutes(20)).await;

        // Switching to the 15-minute preset restarts the clock from now,
        // not from the original last activity.
        manager.use_preset(SessionPreset::HighSecurity);
        sleep(minutes(14)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        sleep(minutes(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        manager.close();
    }

    #[tokio::test(start_paused = true)]
    async fn standard_preset_warning_window() {
        let manager = SessionManager::from_preset(SessionPreset::Standard);
        let count = spawn_watchdog(&manager);

        manager.start();
        sleep(minutes(26)).await;

        let remaining = manager.time_remaining_minutes();
        assert!(remaining > 0 && remaining <= 5, "remaining = {remaining}");
        assert_eq!(count.load(Ordering::SeqCst), 0);

        sleep(minutes(4) + Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        manager.close();
    }

    #[tokio::test(start_paused = true)]
    async fn unconfigured_events_do_not_reset() {
        let mut config = SessionPreset::Standard.config();
        config.timeout_minutes = 2;
        config.activity_events = [ActivityEvent::Click].into_iter().collect();

        let manager = SessionManager::new(config);
        let count = spawn_watchdog(&manager);

        manager.start();
        sleep(minutes(1)).await;
        manager.record_activity(ActivityEvent::PointerMove);

        sleep(minutes(1) + Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        manager.close();
    }

    #[tokio::test(start_paused = true)]
    async fn reset_on_activity_false_ignores_events() {
        let mut config = SessionPreset::Standard.config();
        config.timeout_minutes = 2;
        config.reset_on_activity = false;

        let manager = SessionManager::new(config);
        let count = spawn_watchdog(&manager);

        manager.start();
        sleep(minutes(1)).await;
        manager.record_activity(ActivityEvent::Click);

        sleep(minutes(1) + Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        manager.close();
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent() {
        let manager = SessionManager::new(SessionConfig {
            timeout_minutes: 2,
            ..SessionPreset::Standard.config()
        });
        let count = spawn_watchdog(&manager);

        manager.start();
        sleep(minutes(1)).await;
        // A second start while armed must not re-base the deadline.
        manager.start();

        sleep(minutes(1) + Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        manager.close();
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_timeout_arms_again() {
        let manager = SessionManager::new(SessionConfig {
            timeout_minutes: 1,
            ..SessionPreset::Standard.config()
        });
        let count = spawn_watchdog(&manager);

        manager.start();
        sleep(minutes(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        manager.start();
        sleep(minutes(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        manager.close();
    }

    #[tokio::test(start_paused = true)]
    async fn time_remaining_counts_down() {
        let manager = SessionManager::from_preset(SessionPreset::Standard);

        assert_eq!(manager.time_remaining_minutes(), 0);

        manager.start();
        assert_eq!(manager.time_remaining_minutes(), 30);

        sleep(minutes(10)).await;
        assert_eq!(manager.time_remaining_minutes(), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn sign_out_failure_is_not_retried() {
        let manager = SessionManager::new(SessionConfig {
            timeout_minutes: 1,
            ..SessionPreset::Standard.config()
        });

        let count = Arc::new(AtomicU32::new(0));
        let counter = count.clone();
        let watchdog = manager.clone();
        tokio::spawn(async move {
            watchdog
                .run(move || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Err("identity provider unreachable".to_string())
                    }
                })
                .await;
        });

        manager.start();
        sleep(minutes(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        manager.close();
    }
}
