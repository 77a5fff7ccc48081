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

// Control and telemetry client for BLE earable sensor devices
//
// This crate drives an earable over a GATT link that the host platform provides:
// - Serializes every device operation through a single FIFO queue
// - Reads the device's self-describing sensor scheme and decodes telemetry frames
// - Mirrors the on-device SD recording state machine
// - Merges decoded samples and exports them as CSV, JSON or binary

pub mod cache;
pub mod codec;
pub mod config;
pub mod decoder;
pub mod device;
pub mod error;
pub mod events;
pub mod peripherals;
pub mod recording;
pub mod scheme;
pub mod sensor;
pub mod transport;

// Re-export main types
pub use cache::RecordingCache;
pub use codec::{
    export, format_data_size, to_binary, to_csv, to_json, to_json_at, validate_sensor_data,
    SampleRow, ValidationReport,
};
pub use config::{load_config, load_config_with_env, LinkConfig};
pub use decoder::{decode, decode_notification, DecodedRecord, TelemetryFrame, Value};
pub use device::{DeviceInfo, Earable};
pub use error::{EarableError, ErrorKind, ErrorReport, Result};
pub use events::Subscribers;
pub use peripherals::{AudioPlayer, AudioSource, AudioState, Jingle, Rgb, RgbLed, WaveType};
pub use recording::{
    DataFormat, RecordingConfig, RecordingController, RecordingLimits, RecordingOperation,
    RecordingState, RecordingStatusEvent,
};
pub use scheme::{parse_scheme, Component, ParseType, SchemeRegistry, SensorScheme};
pub use sensor::{SensorConfig, SensorId, SensorManager};
pub use transport::{Characteristic, GattClient, GattConnection, NotificationHandler, TransportQueue};
