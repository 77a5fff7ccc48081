// Configuration system integration tests

use earable_link::config::{load_config, load_config_with_env, LinkConfig};
use earable_link::DataFormat;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_load_default_config() {
    let config_path = PathBuf::from("config/default.yaml");

    if config_path.exists() {
        let result = load_config(&config_path);
        assert!(result.is_ok(), "Failed to load default config: {:?}", result.err());

        let config = result.unwrap();

        assert_eq!(config.device.disconnect_settle_ms, 6000);
        assert_eq!(config.recording.sensor_types, vec![0, 1]);
        assert_eq!(config.recording.data_format, DataFormat::Csv);
        assert_eq!(config.recording.max_sampling_rate, 50);
        assert_eq!(config.sensors.len(), 2);
        assert_eq!(config.logging.level, "info");
    }
}

#[test]
fn test_config_with_env_vars() {
    let temp_config = r#"
device:
  disconnect_settle_ms: 250

recording:
  file_name: ${EARABLE_IT_FILE}
  data_format: json
  sampling_rate: 20

sensors:
  - sensor_id: 1
    sampling_rate: 12.5

export:
  format: binary
  sensor_types: [1]

logging:
  level: ${EARABLE_IT_LEVEL:-debug}
  format: json
"#;

    let dir = tempdir().unwrap();
    let temp_path = dir.path().join("config.yaml");
    fs::write(&temp_path, temp_config).expect("Failed to write temp config");

    std::env::set_var("EARABLE_IT_FILE", "walk_01");

    let result = load_config(&temp_path);
    assert!(result.is_ok(), "Failed to load config with env vars: {:?}", result.err());

    let config = result.unwrap();

    assert_eq!(config.logging.level, "debug"); // Uses default
    assert_eq!(config.device.settle_delay().as_millis(), 250);
    assert_eq!(config.recording.file_name, "walk_01");
    assert_eq!(config.recording.data_format, DataFormat::Json);
    assert_eq!(config.recording.min_sampling_rate, 1);
    assert_eq!(config.sensors[0].latency, 0);
    assert_eq!(config.export.format, DataFormat::Binary);
    assert_eq!(config.export.sensor_types, vec![1]);

    let recording = config.recording.default_config();
    assert_eq!(recording.sampling_rate, 20);
    assert_eq!(recording.sensor_types, vec![0, 1]);

    std::env::remove_var("EARABLE_IT_FILE");
}

#[test]
fn test_env_overrides() {
    let dir = tempdir().unwrap();
    let temp_path = dir.path().join("config.yaml");
    fs::write(&temp_path, "logging:\n  level: info\n").unwrap();

    std::env::set_var("EARABLE_LOG_LEVEL", "trace");

    let config = load_config_with_env(&temp_path).unwrap();
    assert_eq!(config.logging.level, "trace");
    assert_eq!(config.device.disconnect_settle_ms, 6000);

    std::env::remove_var("EARABLE_LOG_LEVEL");
}

#[test]
fn test_unknown_device_keys_are_ignored() {
    let dir = tempdir().unwrap();
    let temp_path = dir.path().join("config.yaml");
    fs::write(
        &temp_path,
        "device:\n  name_prefix: OpenEarable\n  disconnect_settle_ms: 100\n",
    )
    .unwrap();

    let config = load_config(&temp_path).unwrap();
    assert_eq!(config.device.disconnect_settle_ms, 100);
}

#[test]
fn test_config_validation() {
    let invalid_config = r#"
recording:
  min_sampling_rate: 0  # INVALID: must be > 0
  max_sampling_rate: 50
"#;

    let dir = tempdir().unwrap();
    let temp_path = dir.path().join("invalid.yaml");
    fs::write(&temp_path, invalid_config).expect("Failed to write temp config");

    let result = load_config(&temp_path);
    assert!(result.is_err(), "Expected validation error for invalid config");
    assert!(format!("{:#}", result.unwrap_err()).contains("min_sampling_rate"));
}

#[test]
fn test_missing_file() {
    let result = load_config("does/not/exist.yaml");
    assert!(result.is_err());
}

#[test]
fn test_config_defaults() {
    let config = LinkConfig::default();

    assert_eq!(config.device.disconnect_settle_ms, 6000);
    assert_eq!(config.recording.file_name, "sensor_data");
    assert_eq!(config.recording.sampling_rate, 10);
    assert_eq!(config.recording.limits().max_file_name_bytes, 255);
    assert!(config.sensors.is_empty());
    assert_eq!(config.export.format, DataFormat::Csv);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, "text");
}
