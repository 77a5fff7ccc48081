// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Configuration types for earable-link

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::recording::{DataFormat, RecordingConfig, RecordingLimits};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LinkConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub recording: RecordingSettings,
    #[serde(default)]
    pub sensors: Vec<SensorSettings>,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Link lifecycle settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// Delay between a link drop and the disconnect notification
    #[serde(default = "default_settle_ms")]
    pub disconnect_settle_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            disconnect_settle_ms: default_settle_ms(),
        }
    }
}

impl DeviceConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.disconnect_settle_ms)
    }
}

/// Defaults and device limits for SD-card recording
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecordingSettings {
    #[serde(default = "default_sensor_types")]
    pub sensor_types: Vec<u8>,

    #[serde(default)]
    pub data_format: DataFormat,

    #[serde(default = "default_file_name")]
    pub file_name: String,

    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: u32,

    #[serde(default = "default_min_rate")]
    pub min_sampling_rate: u32,

    #[serde(default = "default_max_rate")]
    pub max_sampling_rate: u32,

    #[serde(default = "default_max_file_name_bytes")]
    pub max_file_name_bytes: usize,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            sensor_types: default_sensor_types(),
            data_format: DataFormat::default(),
            file_name: default_file_name(),
            sampling_rate: default_sampling_rate(),
            min_sampling_rate: default_min_rate(),
            max_sampling_rate: default_max_rate(),
            max_file_name_bytes: default_max_file_name_bytes(),
        }
    }
}

impl RecordingSettings {
    pub fn limits(&self) -> RecordingLimits {
        RecordingLimits {
            min_sampling_rate: self.min_sampling_rate,
            max_sampling_rate: self.max_sampling_rate,
            max_file_name_bytes: self.max_file_name_bytes,
        }
    }

    /// Recording config built from the configured defaults
    pub fn default_config(&self) -> RecordingConfig {
        RecordingConfig {
            sensor_types: self.sensor_types.clone(),
            data_format: self.data_format,
            file_name: self.file_name.clone(),
            sampling_rate: self.sampling_rate,
        }
    }
}

/// Per-sensor streaming configuration written after connect
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SensorSettings {
    pub sensor_id: u8,
    pub sampling_rate: f32,
    #[serde(default)]
    pub latency: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub format: DataFormat,

    /// Sensor types included in exports
    #[serde(default = "default_sensor_types")]
    pub sensor_types: Vec<u8>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: DataFormat::default(),
            sensor_types: default_sensor_types(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"

    #[serde(default = "default_log_format")]
    pub format: String, // "text", "json"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_settle_ms() -> u64 { 6000 }
fn default_sensor_types() -> Vec<u8> { vec![0, 1] }
fn default_file_name() -> String { "sensor_data".to_string() }
fn default_sampling_rate() -> u32 { 10 }
fn default_min_rate() -> u32 { 1 }
fn default_max_rate() -> u32 { 50 }
fn default_max_file_name_bytes() -> usize { 255 }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "text".to_string() }
