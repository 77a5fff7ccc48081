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

//! SD-card recording control
//!
//! The device records telemetry to its own storage. This module mirrors the
//! device's recording lifecycle, encodes the control commands and decodes the
//! status and config characteristics.
//!
//! ```text
//! Idle ──start──▶ Recording ──pause──▶ Paused
//!  ▲                 │  ▲                 │
//!  │               stop └─────resume──────┤
//! Stopped ◀──────────┴──────stop──────────┘
//! ```
//!
//! Any failed command moves the mirror to `Error`. A later successful
//! `start` returns it to `Recording`; re-reading the device status or
//! resetting after a disconnect also leaves it.

use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::error::{EarableError, ErrorReport, Result};
use crate::events::Subscribers;
use crate::transport::{services, GattClient};

/// Characters the device filesystem refuses in file names
pub const RESERVED_FILE_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Recording lifecycle as reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum RecordingState {
    #[default]
    Idle = 0,
    Recording = 1,
    Paused = 2,
    Stopped = 3,
    Error = 4,
}

impl RecordingState {
    /// Whether `operation` may be issued from this state
    pub fn allows(self, operation: RecordingOperation) -> bool {
        use RecordingOperation::*;
        use RecordingState::*;
        matches!(
            (self, operation),
            (Idle | Stopped | Error, Start)
                | (Recording | Paused, Stop)
                | (Recording, Pause)
                | (Paused, Resume)
        )
    }
}

impl TryFrom<u8> for RecordingState {
    type Error = EarableError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(RecordingState::Idle),
            1 => Ok(RecordingState::Recording),
            2 => Ok(RecordingState::Paused),
            3 => Ok(RecordingState::Stopped),
            4 => Ok(RecordingState::Error),
            other => Err(EarableError::MalformedResponse {
                what: "recording status",
                reason: format!("unknown state {}", other),
            }),
        }
    }
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordingState::Idle => "idle",
            RecordingState::Recording => "recording",
            RecordingState::Paused => "paused",
            RecordingState::Stopped => "stopped",
            RecordingState::Error => "error",
        };
        f.write_str(name)
    }
}

/// Commands accepted by the recording control characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingOperation {
    Start,
    Stop,
    Pause,
    Resume,
}

impl RecordingOperation {
    pub fn opcode(self) -> u8 {
        match self {
            RecordingOperation::Stop => 0,
            RecordingOperation::Start => 1,
            RecordingOperation::Pause => 2,
            RecordingOperation::Resume => 3,
        }
    }

    /// State reached when the command is accepted
    pub fn target(self) -> RecordingState {
        match self {
            RecordingOperation::Start | RecordingOperation::Resume => RecordingState::Recording,
            RecordingOperation::Stop => RecordingState::Stopped,
            RecordingOperation::Pause => RecordingState::Paused,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RecordingOperation::Start => "start",
            RecordingOperation::Stop => "stop",
            RecordingOperation::Pause => "pause",
            RecordingOperation::Resume => "resume",
        }
    }
}

/// On-device file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum DataFormat {
    #[default]
    Csv = 0,
    Json = 1,
    Binary = 2,
}

impl DataFormat {
    pub fn file_extension(self) -> &'static str {
        match self {
            DataFormat::Csv => ".csv",
            DataFormat::Json => ".json",
            DataFormat::Binary => ".bin",
        }
    }
}

impl TryFrom<u8> for DataFormat {
    type Error = EarableError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(DataFormat::Csv),
            1 => Ok(DataFormat::Json),
            2 => Ok(DataFormat::Binary),
            other => Err(EarableError::Validation(format!(
                "data format must be 0-2, got {}",
                other
            ))),
        }
    }
}

impl std::str::FromStr for DataFormat {
    type Err = EarableError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(DataFormat::Csv),
            "json" => Ok(DataFormat::Json),
            "binary" | "bin" => Ok(DataFormat::Binary),
            other => Err(EarableError::Validation(format!(
                "unknown data format '{}'",
                other
            ))),
        }
    }
}

/// Parameters of an SD-card recording session
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Sensor ids in transmission order
    pub sensor_types: Vec<u8>,
    pub data_format: DataFormat,
    pub file_name: String,
    /// Hz
    pub sampling_rate: u32,
}

/// Device-imposed bounds on recording parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingLimits {
    pub min_sampling_rate: u32,
    pub max_sampling_rate: u32,
    pub max_file_name_bytes: usize,
}

impl Default for RecordingLimits {
    fn default() -> Self {
        Self {
            min_sampling_rate: 1,
            max_sampling_rate: 50,
            max_file_name_bytes: 255,
        }
    }
}

pub fn validate_file_name(file_name: &str, limits: &RecordingLimits) -> Result<()> {
    if file_name.trim().is_empty() {
        return Err(EarableError::Validation("file name cannot be empty".to_string()));
    }

    let max = limits.max_file_name_bytes.min(u8::MAX as usize);
    if file_name.len() > max {
        return Err(EarableError::Validation(format!(
            "file name is {} bytes, limit is {}",
            file_name.len(),
            max
        )));
    }

    if let Some(c) = file_name.chars().find(|c| RESERVED_FILE_NAME_CHARS.contains(c)) {
        return Err(EarableError::Validation(format!(
            "file name contains reserved character '{}'",
            c
        )));
    }

    Ok(())
}

/// Check a config against the device limits before anything is sent
pub fn validate_recording_config(config: &RecordingConfig, limits: &RecordingLimits) -> Result<()> {
    if config.sensor_types.is_empty() {
        return Err(EarableError::Validation(
            "at least one sensor type is required".to_string(),
        ));
    }

    if config.sensor_types.len() > u8::MAX as usize {
        return Err(EarableError::Validation(format!(
            "{} sensor types exceed the limit of 255",
            config.sensor_types.len()
        )));
    }

    validate_file_name(&config.file_name, limits)?;

    if config.sampling_rate < limits.min_sampling_rate
        || config.sampling_rate > limits.max_sampling_rate
    {
        return Err(EarableError::Validation(format!(
            "sampling rate must be between {}-{} Hz, got {}",
            limits.min_sampling_rate, limits.max_sampling_rate, config.sampling_rate
        )));
    }

    Ok(())
}

/// Encode a config in the layout shared by the start command and the config characteristic:
/// `[sensorCount, sensorType.., dataFormat, samplingRate (u32 LE), fileNameLen, fileName..]`
pub fn encode_config(config: &RecordingConfig) -> Result<Vec<u8>> {
    let mut buf = BytesMut::with_capacity(
        1 + config.sensor_types.len() + 1 + 4 + 1 + config.file_name.len(),
    );
    put_config(&mut buf, config)?;
    Ok(buf.to_vec())
}

fn put_config(buf: &mut BytesMut, config: &RecordingConfig) -> Result<()> {
    let sensor_count = u8::try_from(config.sensor_types.len())
        .map_err(|_| EarableError::Validation("more than 255 sensor types".to_string()))?;
    let name_len = u8::try_from(config.file_name.len())
        .map_err(|_| EarableError::Validation("file name exceeds 255 bytes".to_string()))?;

    buf.put_u8(sensor_count);
    buf.put_slice(&config.sensor_types);
    buf.put_u8(config.data_format as u8);
    buf.put_u32_le(config.sampling_rate);
    buf.put_u8(name_len);
    buf.put_slice(config.file_name.as_bytes());
    Ok(())
}

/// Encode the control write for `operation`
///
/// `config` is required for `Start` and ignored otherwise.
pub fn encode_command(
    operation: RecordingOperation,
    config: Option<&RecordingConfig>,
) -> Result<Vec<u8>> {
    match (operation, config) {
        (RecordingOperation::Start, Some(config)) => {
            let mut buf = BytesMut::with_capacity(
                2 + config.sensor_types.len() + 1 + 4 + 1 + config.file_name.len(),
            );
            buf.put_u8(operation.opcode());
            put_config(&mut buf, config)?;
            Ok(buf.to_vec())
        }
        (RecordingOperation::Start, None) => Err(EarableError::Validation(
            "start requires a recording config".to_string(),
        )),
        (other, _) => Ok(vec![other.opcode()]),
    }
}

pub fn decode_status(bytes: &[u8]) -> Result<RecordingState> {
    match bytes.first() {
        Some(&value) => RecordingState::try_from(value),
        None => Err(EarableError::MalformedResponse {
            what: "recording status",
            reason: "empty value".to_string(),
        }),
    }
}

pub fn decode_config(bytes: &[u8]) -> Result<RecordingConfig> {
    let mut buf = bytes;
    let short = |field: &str| EarableError::MalformedResponse {
        what: "recording config",
        reason: format!("value ended before {}", field),
    };

    if !buf.has_remaining() {
        return Err(short("sensor count"));
    }
    let sensor_count = buf.get_u8() as usize;
    if buf.remaining() < sensor_count {
        return Err(short("sensor types"));
    }
    let sensor_types = buf.copy_to_bytes(sensor_count).to_vec();

    if !buf.has_remaining() {
        return Err(short("data format"));
    }
    let raw_format = buf.get_u8();
    let data_format =
        DataFormat::try_from(raw_format).map_err(|_| EarableError::MalformedResponse {
            what: "recording config",
            reason: format!("unknown data format {}", raw_format),
        })?;

    if buf.remaining() < 4 {
        return Err(short("sampling rate"));
    }
    let sampling_rate = buf.get_u32_le();

    if !buf.has_remaining() {
        return Err(short("file name length"));
    }
    let name_len = buf.get_u8() as usize;
    if buf.remaining() < name_len {
        return Err(short("file name"));
    }
    let file_name = String::from_utf8_lossy(&buf[..name_len]).into_owned();

    Ok(RecordingConfig {
        sensor_types,
        data_format,
        file_name,
        sampling_rate,
    })
}

/// Payload delivered to recording status subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordingStatusEvent {
    pub state: RecordingState,
    pub config: RecordingConfig,
}

#[derive(Debug, Default)]
struct RecordingInner {
    state: RecordingState,
    config: RecordingConfig,
}

/// Client-side mirror of the device's recording state machine
pub struct RecordingController {
    client: GattClient,
    limits: RecordingLimits,
    // Held across the control write so commands can't interleave.
    inner: Mutex<RecordingInner>,
    subscribers: Subscribers<RecordingStatusEvent>,
    errors: Arc<Subscribers<ErrorReport>>,
}

impl RecordingController {
    pub fn new(
        client: GattClient,
        limits: RecordingLimits,
        errors: Arc<Subscribers<ErrorReport>>,
    ) -> Self {
        Self {
            client,
            limits,
            inner: Mutex::new(RecordingInner::default()),
            subscribers: Subscribers::new("recording_status"),
            errors,
        }
    }

    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&RecordingStatusEvent) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(callback);
    }

    pub async fn state(&self) -> RecordingState {
        self.inner.lock().await.state
    }

    pub async fn config(&self) -> RecordingConfig {
        self.inner.lock().await.config.clone()
    }

    pub async fn is_recording(&self) -> bool {
        self.state().await == RecordingState::Recording
    }

    pub async fn is_paused(&self) -> bool {
        self.state().await == RecordingState::Paused
    }

    pub async fn has_error(&self) -> bool {
        self.state().await == RecordingState::Error
    }

    pub fn limits(&self) -> RecordingLimits {
        self.limits
    }

    /// Start recording to the device's SD card
    pub async fn start(&self, config: RecordingConfig) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.check_transition(inner.state, RecordingOperation::Start)?;

        if let Err(e) = validate_recording_config(&config, &self.limits) {
            warn!("Rejected recording parameters: {}", e);
            self.errors.notify(&e.report());
            return Err(e);
        }

        let payload = encode_command(RecordingOperation::Start, Some(&config))?;
        info!(
            "Starting SD recording of sensors {:?} to '{}' at {} Hz",
            config.sensor_types, config.file_name, config.sampling_rate
        );
        self.send(&mut inner, RecordingOperation::Start, payload, Some(config))
            .await
    }

    pub async fn stop(&self) -> Result<()> {
        self.simple_command(RecordingOperation::Stop).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.simple_command(RecordingOperation::Pause).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.simple_command(RecordingOperation::Resume).await
    }

    /// Read the status characteristic and adopt the device's state
    pub async fn refresh_status(&self) -> Result<RecordingState> {
        let mut inner = self.inner.lock().await;
        let state = self
            .read_and_decode(services::RECORDING_STATUS, decode_status)
            .await?;

        inner.state = state;
        info!("Device reports recording state {}", state);
        self.notify(&inner);
        Ok(state)
    }

    /// Read the config characteristic and adopt the device's config
    pub async fn refresh_config(&self) -> Result<RecordingConfig> {
        let mut inner = self.inner.lock().await;
        let config = self
            .read_and_decode(services::RECORDING_CONFIG, decode_config)
            .await?;

        inner.config = config.clone();
        Ok(config)
    }

    /// Forget the mirrored state, e.g. after the link dropped
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        *inner = RecordingInner::default();
        self.notify(&inner);
    }

    async fn simple_command(&self, operation: RecordingOperation) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.check_transition(inner.state, operation)?;
        let payload = encode_command(operation, None)?;
        self.send(&mut inner, operation, payload, None).await
    }

    fn check_transition(&self, from: RecordingState, operation: RecordingOperation) -> Result<()> {
        if from.allows(operation) {
            return Ok(());
        }
        let e = EarableError::InvalidStateTransition {
            operation: operation.name(),
            from,
        };
        warn!("{}", e);
        self.errors.notify(&e.report());
        Err(e)
    }

    async fn send(
        &self,
        inner: &mut RecordingInner,
        operation: RecordingOperation,
        payload: Vec<u8>,
        config: Option<RecordingConfig>,
    ) -> Result<()> {
        match self.client.write(services::RECORDING_CONTROL, payload).await {
            Ok(()) => {
                inner.state = operation.target();
                if let Some(config) = config {
                    inner.config = config;
                }
                info!("Recording {} acknowledged, now {}", operation.name(), inner.state);
                self.notify(inner);
                Ok(())
            }
            Err(e) => {
                error!("Recording {} failed: {}", operation.name(), e);
                inner.state = RecordingState::Error;
                self.notify(inner);
                self.errors.notify(&e.report());
                Err(e)
            }
        }
    }

    async fn read_and_decode<T>(
        &self,
        characteristic: services::Characteristic,
        decode: fn(&[u8]) -> Result<T>,
    ) -> Result<T> {
        let result = match self.client.read(characteristic).await {
            Ok(bytes) => decode(&bytes),
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            error!("Failed to read {}: {}", characteristic.name, e);
            self.errors.notify(&e.report());
        }
        result
    }

    fn notify(&self, inner: &RecordingInner) {
        self.subscribers.notify(&RecordingStatusEvent {
            state: inner.state,
            config: inner.config.clone(),
        });
    }
}
