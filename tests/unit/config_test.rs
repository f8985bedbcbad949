//! Tests for configuration validation

use chrono::Duration;
use muster::config::{ChannelConfig, MusterConfig, ReconcilerConfig};
use muster::util::ChannelId;

#[test]
fn test_default_config_validation() {
    let cfg = MusterConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.reconciler.tick_interval_secs, 60);
    assert_eq!(cfg.reconciler.refresh_window(), (Duration::hours(3), Duration::hours(12)));
    assert_eq!(cfg.display_offset().unwrap().local_minus_utc(), 3 * 3600);
}

#[test]
fn test_reconciler_config_invalid_tick() {
    let invalid = ReconcilerConfig {
        tick_interval_secs: 0,
        ..ReconcilerConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_reconciler_config_inverted_window() {
    let invalid = ReconcilerConfig {
        reminder_window_start_secs: 360,
        reminder_window_end_secs: 240,
        ..ReconcilerConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_reconciler_config_invalid_runoff() {
    let invalid = ReconcilerConfig {
        runoff_window_secs: 0,
        ..ReconcilerConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_channel_config_empty_channel() {
    let invalid = ChannelConfig {
        reminders: ChannelId::from("  "),
        ..ChannelConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_config_from_json_fills_defaults() {
    let cfg = MusterConfig::from_json_str(
        r#"{"reconciler": {"runoff_window_secs": 300}, "channels": {"poll_role": "@movie"}}"#,
    )
    .unwrap();
    assert_eq!(cfg.reconciler.runoff_window(), Duration::minutes(5));
    assert_eq!(cfg.reconciler.tick_interval_secs, 60);
    assert_eq!(cfg.channels.poll_role.as_deref(), Some("@movie"));
    assert_eq!(cfg.channels.polls, ChannelId::from("polls"));
}

#[test]
fn test_config_from_json_rejects_invalid() {
    assert!(MusterConfig::from_json_str("not json").is_err());
    assert!(MusterConfig::from_json_str(r#"{"display_offset_minutes": 100000}"#).is_err());
}
