//! ---
//! ldhrs_section: "01-core-functionality"
//! ldhrs_subsection: "tests"
//! ldhrs_type: "test"
//! ldhrs_scope: "code"
//! ldhrs_description: "Configuration loading, defaults and validation."
//! ldhrs_version: "v0.0.0-prealpha"
//! ldhrs_owner: "tbd"
//! ---
use std::io::Write;
use std::time::Duration;

use ldhrs_common::config::{AppConfig, OracleMode};
use ldhrs_common::LogFormat;
use tempfile::NamedTempFile;

#[test]
fn defaults_match_dashboard_seed_values() {
    let config = AppConfig::default();
    config.validate().expect("defaults must validate");
    assert_eq!(config.controller.telemetry_interval_ms, Duration::from_secs(2));
    assert_eq!(config.weather.poll_interval_secs, Duration::from_secs(300));
    assert_eq!(config.controller.initial.dust, 12);
    assert_eq!(config.controller.initial.angle_x, 90.0);
    assert_eq!(config.controller.initial.angle_y, 45.0);
    assert!(config.controller.initial.auto_track);
    assert_eq!(config.weather.sentinel, "STORM_WARNING_SHUTDOWN");
    assert_eq!(config.oracle.mode, OracleMode::Http);
}

#[test]
fn parses_partial_toml_with_defaults() {
    let config: AppConfig = r#"
        [controller]
        telemetry_interval_ms = 500
        random_seed = 7

        [controller.initial]
        voltage = 12.0
        current = 1.5
        temperature = 20.0
        battery = 50
        dust = 40
        ldr_top = 100
        ldr_bottom = 200
        ldr_left = 300
        ldr_right = 400
        angle_x = 10.0
        angle_y = 170.0
        auto_track = false
        child_lock = true

        [weather]
        poll_interval_secs = 15
        hazard_keywords = ["storm", "heavy rain", "high winds"]

        [oracle]
        mode = "offline"

        [logging]
        format = "pretty"
    "#
    .parse()
    .expect("config should parse");

    assert_eq!(config.controller.telemetry_interval_ms, Duration::from_millis(500));
    assert_eq!(config.controller.random_seed, Some(7));
    assert_eq!(config.controller.initial.dust, 40);
    assert!(config.controller.initial.child_lock);
    assert_eq!(config.weather.poll_interval_secs, Duration::from_secs(15));
    assert_eq!(config.weather.hazard_keywords.len(), 3);
    assert_eq!(config.weather.location, "Faisalabad, Punjab, Pakistan");
    assert_eq!(config.oracle.mode, OracleMode::Offline);
    assert_eq!(config.logging.format, LogFormat::Pretty);
}

#[test]
fn rejects_out_of_range_initial_state() {
    let err = r#"
        [controller.initial]
        voltage = 18.4
        current = 4.2
        temperature = 34.0
        battery = 88
        dust = 12
        ldr_top = 2000
        ldr_bottom = 840
        ldr_left = 820
        ldr_right = 830
        angle_x = 90.0
        angle_y = 45.0
        auto_track = true
        child_lock = false
    "#
    .parse::<AppConfig>()
    .expect_err("ldr above 1024 must be rejected");
    assert!(format!("{err:#}").contains("ldr"));
}

#[test]
fn rejects_weather_poll_faster_than_telemetry() {
    let err = r#"
        [controller]
        telemetry_interval_ms = 5000

        [weather]
        poll_interval_secs = 1
    "#
    .parse::<AppConfig>()
    .expect_err("weather poll shorter than telemetry tick");
    assert!(err.to_string().contains("poll_interval_secs"));
}

#[test]
fn rejects_malformed_oracle_endpoint() {
    let err = r#"
        [oracle]
        endpoint = "not a url"
    "#
    .parse::<AppConfig>()
    .expect_err("endpoint must be a URL");
    assert!(format!("{err:#}").contains("oracle.endpoint"));
}

#[test]
fn offline_mode_skips_endpoint_validation() {
    let config: AppConfig = r#"
        [oracle]
        mode = "offline"
        endpoint = "not a url"
    "#
    .parse()
    .expect("offline mode ignores the endpoint");
    assert_eq!(config.oracle.mode, OracleMode::Offline);
}

#[test]
fn load_prefers_first_existing_candidate() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[controller]\ntelemetry_interval_ms = 250").unwrap();
    let missing = std::env::temp_dir().join("ldhrs-definitely-missing.toml");

    let loaded = AppConfig::load_with_source(&[missing.as_path(), file.path()]).unwrap();
    assert_eq!(loaded.source.as_deref(), Some(file.path()));
    assert_eq!(
        loaded.config.controller.telemetry_interval_ms,
        Duration::from_millis(250)
    );
}

#[test]
fn load_falls_back_to_defaults_without_candidates() {
    let missing = std::env::temp_dir().join("ldhrs-also-missing.toml");
    let loaded = AppConfig::load_with_source(&[missing]).unwrap();
    assert!(loaded.source.is_none());
    assert_eq!(loaded.config.controller.initial.battery, 88);
}

#[test]
fn shipped_example_config_parses() {
    let config: AppConfig = include_str!("../../../configs/example.toml")
        .parse()
        .expect("example config parses");
    assert_eq!(config.controller.telemetry_interval_ms, Duration::from_secs(2));
    assert_eq!(config.weather.hazard_keywords, vec!["storm", "heavy rain"]);
    assert_eq!(config.logging.format, LogFormat::StructuredJson);
    assert!(!config.metrics.enabled);
}

#[test]
fn partial_initial_section_keeps_other_seed_values() {
    let config: AppConfig = "[controller.initial]\ndust = 40\n"
        .parse()
        .expect("partial initial section parses");
    assert_eq!(config.controller.initial.dust, 40);
    assert_eq!(config.controller.initial.ldr_top, 850);
}
