//! Session timeout configuration and presets.

use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A user interaction that counts as activity and resets the clock.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityEvent {
    PointerDown,
    PointerMove,
    KeyPress,
    Scroll,
    TouchStart,
    Click,
    Focus,
}

impl ActivityEvent {
    /// Every known activity event.
    pub const ALL: [ActivityEvent; 7] = [
        Self::PointerDown,
        Self::PointerMove,
        Self::KeyPress,
        Self::Scroll,
        Self::TouchStart,
        Self::Click,
        Self::Focus,
    ];
}

/// Session timeout configuration.
///
/// `timeout_minutes == 0` is the sentinel for "never times out": no
/// deadline is armed and the remaining time is always zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Inactivity timeout in minutes (0 disables the timeout).
    pub timeout_minutes: u64,
    /// Suggested cadence, in seconds, for consumers polling the
    /// remaining time.
    pub check_interval_seconds: u64,
    /// Whether activity events reset the clock.
    pub reset_on_activity: bool,
    /// Log a warning when this many minutes remain.
    pub warning_threshold_minutes: u64,
    /// Which events count as activity.
    pub activity_events: BTreeSet<ActivityEvent>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionPreset::Standard.config()
    }
}

impl SessionConfig {
    /// Returns the timeout as a duration, or `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_minutes > 0).then(|| Duration::from_secs(self.timeout_minutes * 60))
    }

    /// Returns the warning threshold as a duration.
    pub fn warning_threshold(&self) -> Duration {
        Duration::from_secs(self.warning_threshold_minutes * 60)
    }

    /// Returns true if the event resets the clock under this config.
    pub fn counts_as_activity(&self, event: ActivityEvent) -> bool {
        self.reset_on_activity && self.activity_events.contains(&event)
    }
}

/// A partial configuration change; unset fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfigUpdate {
    pub timeout_minutes: Option<u64>,
    pub check_interval_seconds: Option<u64>,
    pub reset_on_activity: Option<bool>,
    pub warning_threshold_minutes: Option<u64>,
    pub activity_events: Option<BTreeSet<ActivityEvent>>,
}

impl SessionConfigUpdate {
    /// An empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout in minutes.
    pub fn timeout_minutes(mut self, minutes: u64) -> Self {
        self.timeout_minutes = Some(minutes);
        self
    }

    /// Set whether activity resets the clock.
    pub fn reset_on_activity(mut self, reset: bool) -> Self {
        self.reset_on_activity = Some(reset);
        self
    }

    /// Set the warning threshold in minutes.
    pub fn warning_threshold_minutes(mut self, minutes: u64) -> Self {
        self.warning_threshold_minutes = Some(minutes);
        self
    }

    /// Merges this update into a config.
    pub fn apply(self, config: &mut SessionConfig) {
        if let Some(v) = self.timeout_minutes {
            config.timeout_minutes = v;
        }
        if let Some(v) = self.check_interval_seconds {
            config.check_interval_seconds = v;
        }
        if let Some(v) = self.reset_on_activity {
            config.reset_on_activity = v;
        }
        if let Some(v) = self.warning_threshold_minutes {
            config.warning_threshold_minutes = v;
        }
        if let Some(v) = self.activity_events {
            config.activity_events = v;
        }
    }
}

/// Named configuration bundles for common deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPreset {
    /// Short sessions for sensitive environments (15 minutes).
    HighSecurity,
    /// Standard office use (30 minutes).
    Standard,
    /// Long sessions for development (2 hours).
    Development,
    /// No timeout at all.
    NoTimeout,
}

impl SessionPreset {
    /// The preset's configuration values.
    pub fn config(&self) -> SessionConfig {
        let all_events: BTreeSet<ActivityEvent> = ActivityEvent::ALL.into_iter().collect();
        match self {
            Self::HighSecurity => SessionConfig {
                timeout_minutes: 15,
                check_interval_seconds: 60,
                reset_on_activity: true,
                warning_threshold_minutes: 3,
                activity_events: all_events,
            },
            Self::Standard => SessionConfig {
                timeout_minutes: 30,
                check_interval_seconds: 60,
                reset_on_activity: true,
                warning_threshold_minutes: 5,
                activity_events: all_events,
            },
            Self::Development => SessionConfig {
                timeout_minutes: 120,
                check_interval_seconds: 60,
                reset_on_activity: true,
                warning_threshold_minutes: 10,
                activity_events: all_events,
            },
            Self::NoTimeout => SessionConfig {
                timeout_minutes: 0,
                check_interval_seconds: 60,
                reset_on_activity: false,
                warning_threshold_minutes: 0,
                activity_events: all_events,
            },
        }
    }

    /// The preset's canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::HighSecurity => "high-security",
            Self::Standard => "standard",
            Self::Development => "development",
            Self::NoTimeout => "no-timeout",
        }
    }
}

impl FromStr for SessionPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "high-security" => Ok(Self::HighSecurity),
            "standard" => Ok(Self::Standard),
            "development" => Ok(Self::Development),
            "no-timeout" => Ok(Self::NoTimeout),
            other => Err(format!(
                "unknown preset '{}' (expected high-security, standard, development, or no-timeout)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_standard() {
        let config = SessionConfig::default();
        assert_eq!(config.timeout_minutes, 30);
        assert_eq!(config.warning_threshold_minutes, 5);
        assert!(config.reset_on_activity);
        assert_eq!(config.activity_events.len(), 7);
    }

    #[test]
    fn zero_timeout_is_disabled() {
        let config = SessionPreset::NoTimeout.config();
        assert!(config.timeout().is_none());
        assert!(!config.counts_as_activity(ActivityEvent::Click));
    }

    #[test]
    fn timeout_duration() {
        let config = SessionPreset::HighSecurity.config();
        assert_eq!(config.timeout(), Some(Duration::from_secs(15 * 60)));
    }

    #[test]
    fn activity_requires_configured_event() {
        let mut config = SessionPreset::Standard.config();
        config.activity_events = [ActivityEvent::Click].into_iter().collect();

        assert!(config.counts_as_activity(ActivityEvent::Click));
        assert!(!config.counts_as_activity(ActivityEvent::PointerMove));
    }

    #[test]
    fn update_merges_partially() {
        let mut config = SessionPreset::Standard.config();
        SessionConfigUpdate::new()
            .timeout_minutes(45)
            .warning_threshold_minutes(10)
            .apply(&mut config);

        assert_eq!(config.timeout_minutes, 45);
        assert_eq!(config.warning_threshold_minutes, 10);
        // Untouched fields keep their values.
        assert_eq!(config.check_interval_seconds, 60);
        assert!(config.reset_on_activity);
    }

    #[test]
    fn preset_parsing() {
        assert_eq!(
            "high-security".parse::<SessionPreset>().unwrap(),
            SessionPreset::HighSecurity
        );
        assert_eq!(
            "HIGH_SECURITY".parse::<SessionPreset>().unwrap(),
            SessionPreset::HighSecurity
        );
        assert_eq!("standard".parse::<SessionPreset>().unwrap(), SessionPreset::Standard);
        assert!("forever".parse::<SessionPreset>().is_err());
    }

    #[test]
    fn config_serde_roundtrip() {
        let config = SessionPreset::Development.config();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"timeout_minutes\":120"));
        assert!(json.contains("\"pointer-down\""));

        let back: SessionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
