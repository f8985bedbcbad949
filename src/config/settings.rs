//! Reconciler and channel configuration structures.

use std::env;
use std::str::FromStr;

use chrono::{Duration, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::util::ids::ChannelId;

/// Timing of the periodic reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Seconds between ticks.
    pub tick_interval_secs: u64,
    /// Reminder window opens this many seconds after `now`.
    pub reminder_window_start_secs: u64,
    /// Reminder window closes this many seconds after `now`.
    pub reminder_window_end_secs: u64,
    /// Card refresh looks back this far for already-started events.
    pub refresh_lookback_secs: u64,
    /// Card refresh looks ahead this far for upcoming events.
    pub refresh_lookahead_secs: u64,
    /// Length of a runoff, counted from the reconciliation that triggered it.
    pub runoff_window_secs: u64,
    /// Maximum number of event cards refreshed per tick.
    pub refresh_batch_limit: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 60,
            reminder_window_start_secs: 4 * 60,
            reminder_window_end_secs: 6 * 60,
            refresh_lookback_secs: 3 * 60 * 60,
            refresh_lookahead_secs: 12 * 60 * 60,
            runoff_window_secs: 10 * 60,
            refresh_batch_limit: 200,
        }
    }
}

impl ReconcilerConfig {
    /// Validate timing values.
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_interval_secs == 0 {
            return Err("tick_interval_secs must be greater than 0".into());
        }
        if self.reminder_window_end_secs <= self.reminder_window_start_secs {
            return Err("reminder_window_end_secs must be greater than reminder_window_start_secs".into());
        }
        if self.reminder_window_end_secs - self.reminder_window_start_secs < self.tick_interval_secs {
            return Err("reminder window must be at least one tick wide".into());
        }
        if self.runoff_window_secs == 0 {
            return Err("runoff_window_secs must be greater than 0".into());
        }
        if self.refresh_batch_limit == 0 {
            return Err("refresh_batch_limit must be greater than 0".into());
        }
        Ok(())
    }

    /// Tick period.
    pub const fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.tick_interval_secs)
    }

    /// Reminder window bounds relative to `now`.
    pub fn reminder_window(&self) -> (Duration, Duration) {
        (secs(self.reminder_window_start_secs), secs(self.reminder_window_end_secs))
    }

    /// Refresh window bounds: how far back and how far ahead of `now`.
    pub fn refresh_window(&self) -> (Duration, Duration) {
        (secs(self.refresh_lookback_secs), secs(self.refresh_lookahead_secs))
    }

    /// Runoff extension.
    pub fn runoff_window(&self) -> Duration {
        secs(self.runoff_window_secs)
    }
}

fn secs(value: u64) -> Duration {
    Duration::seconds(i64::try_from(value).unwrap_or(i64::MAX / 1000))
}

/// Where cards and announcements go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Event cards.
    pub events: ChannelId,
    /// Event reminders.
    pub reminders: ChannelId,
    /// Poll cards and poll announcements.
    pub polls: ChannelId,
    /// Mention prefixed to poll announcements, if any.
    pub poll_role: Option<String>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            events: ChannelId::from("events"),
            reminders: ChannelId::from("event-reminders"),
            polls: ChannelId::from("polls"),
            poll_role: None,
        }
    }
}

impl ChannelConfig {
    /// Validate channel targets.
    pub fn validate(&self) -> Result<(), String> {
        for (name, channel) in [
            ("events", &self.events),
            ("reminders", &self.reminders),
            ("polls", &self.polls),
        ] {
            if channel.0.trim().is_empty() {
                return Err(format!("channel `{name}` must not be empty"));
            }
        }
        Ok(())
    }
}

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MusterConfig {
    /// Reconciler timing.
    pub reconciler: ReconcilerConfig,
    /// Channel targets.
    pub channels: ChannelConfig,
    /// UTC offset, in minutes, used when rendering timestamps.
    pub display_offset_minutes: i32,
    /// Capacity of the in-memory audit buffer.
    pub audit_capacity: usize,
}

impl Default for MusterConfig {
    fn default() -> Self {
        Self {
            reconciler: ReconcilerConfig::default(),
            channels: ChannelConfig::default(),
            display_offset_minutes: 180,
            audit_capacity: 1024,
        }
    }
}

impl MusterConfig {
    /// Validate all sections.
    pub fn validate(&self) -> Result<(), String> {
        self.reconciler
            .validate()
            .map_err(|e| format!("reconciler invalid: {e}"))?;
        self.channels
            .validate()
            .map_err(|e| format!("channels invalid: {e}"))?;
        if self.display_offset().is_none() {
            return Err(format!(
                "display_offset_minutes out of range: {}",
                self.display_offset_minutes
            ));
        }
        Ok(())
    }

    /// Offset used when rendering timestamps.
    pub fn display_offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.display_offset_minutes.checked_mul(60)?)
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `MUSTER_*` environment variables on top of defaults.
    ///
    /// A `.env` file in the working directory is loaded first when present.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        let mut cfg = match env::var("MUSTER_CONFIG_JSON") {
            Ok(json) => serde_json::from_str(&json).map_err(|e| format!("parse error: {e}"))?,
            Err(_) => Self::default(),
        };

        override_from_env("MUSTER_TICK_INTERVAL_SECS", &mut cfg.reconciler.tick_interval_secs)?;
        override_from_env("MUSTER_RUNOFF_WINDOW_SECS", &mut cfg.reconciler.runoff_window_secs)?;
        override_from_env("MUSTER_DISPLAY_OFFSET_MINUTES", &mut cfg.display_offset_minutes)?;
        override_from_env("MUSTER_AUDIT_CAPACITY", &mut cfg.audit_capacity)?;
        if let Ok(v) = env::var("MUSTER_EVENTS_CHANNEL") {
            cfg.channels.events = ChannelId(v);
        }
        if let Ok(v) = env::var("MUSTER_REMINDERS_CHANNEL") {
            cfg.channels.reminders = ChannelId(v);
        }
        if let Ok(v) = env::var("MUSTER_POLLS_CHANNEL") {
            cfg.channels.polls = ChannelId(v);
        }
        if let Ok(v) = env::var("MUSTER_POLL_ROLE") {
            cfg.channels.poll_role = Some(v).filter(|r| !r.trim().is_empty());
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn override_from_env<T>(key: &str, slot: &mut T) -> Result<(), String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(raw) = env::var(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|e| format!("{key}: invalid value `{raw}`: {e}"))?;
    }
    Ok(())
}
