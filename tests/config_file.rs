//! Config file round trips through the filesystem

use spacey::runtime::controller::LockTiming;
use spacey::runtime::error::ConfigError;
use spacey::runtime::stage::FlowKind;
use spacey::runtime::storage::CONFIG_FILE;
use spacey::ActivityConfig;
use std::fs;
use tempfile::TempDir;

#[test]
fn written_config_loads_back() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(CONFIG_FILE);

    let config = ActivityConfig {
        flow: FlowKind::Builder,
        lock: LockTiming {
            settle_ms: 150,
            unlock_ms: 400,
        },
        preferred_voice: Some("Daniel".into()),
        ..ActivityConfig::default()
    };
    config.write(&path).unwrap();

    assert_eq!(ActivityConfig::load(&path).unwrap(), config);
}

#[test]
fn hand_edited_partial_file_fills_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(CONFIG_FILE);
    fs::write(&path, r#"{ "flow": "guided", "passing_score": 4 }"#).unwrap();

    let config = ActivityConfig::load(&path).unwrap();
    assert_eq!(config.passing_score, 4);
    assert_eq!(config.tick_ms, ActivityConfig::default().tick_ms);
    assert_eq!(config.camera.width, 320);
}

#[test]
fn out_of_range_values_are_rejected_on_load() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(CONFIG_FILE);
    fs::write(&path, r#"{ "speech": { "rate": 1.0, "pitch": 1.0, "volume": 2.0 } }"#).unwrap();

    let err = ActivityConfig::load(&path).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::Invalid {
            field: "speech.volume",
            ..
        })
    ));
}

#[test]
fn malformed_json_is_an_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(CONFIG_FILE);
    fs::write(&path, "{ flow: ").unwrap();
    let err = ActivityConfig::load(&path).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::Json(_))
    ));
}

#[test]
fn invalid_config_is_not_written() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(CONFIG_FILE);
    let config = ActivityConfig {
        tick_ms: 0,
        ..ActivityConfig::default()
    };
    assert!(config.write(&path).is_err());
    assert!(!path.exists());
}
