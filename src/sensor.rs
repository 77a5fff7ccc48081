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

// Sensor streaming: scheme bootstrap, data subscription and sensor configuration

use bytes::BufMut;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

use crate::decoder::{decode_notification, DecodedRecord, TelemetryFrame};
use crate::error::{EarableError, ErrorReport, Result};
use crate::events::Subscribers;
use crate::scheme::SchemeRegistry;
use crate::transport::{services, GattClient, NotificationHandler};

/// Well-known sensor ids of the earable firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SensorId {
    Imu = 0,
    PressureSensor = 1,
    Microphone = 2,
}

impl SensorId {
    pub const fn id(self) -> u8 {
        self as u8
    }
}

/// Streaming configuration for one sensor (9 bytes on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub sensor_id: u8,
    /// Hz; zero disables the sensor
    pub sampling_rate: f32,
    pub latency: u32,
}

impl SensorConfig {
    pub const ENCODED_LEN: usize = 9;

    pub fn new(sensor_id: u8, sampling_rate: f32, latency: u32) -> Self {
        Self {
            sensor_id,
            sampling_rate,
            latency,
        }
    }

    /// `[u8 sensorId, f32 samplingRate LE, u32 latency LE]`
    pub fn encode(&self) -> [u8; Self::ENCODED_LEN] {
        let mut out = [0u8; Self::ENCODED_LEN];
        let mut buf = &mut out[..];
        buf.put_u8(self.sensor_id);
        buf.put_f32_le(self.sampling_rate);
        buf.put_u32_le(self.latency);
        out
    }
}

/// State shared with the notification handler
struct StreamState {
    registry: RwLock<Option<Arc<SchemeRegistry>>>,
    subscribers: Subscribers<DecodedRecord>,
    errors: Arc<Subscribers<ErrorReport>>,
    decoded: AtomicU64,
    failed: AtomicU64,
}

impl StreamState {
    fn registry(&self) -> Option<Arc<SchemeRegistry>> {
        self.registry
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_registry(&self, registry: Option<Arc<SchemeRegistry>>) {
        *self
            .registry
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = registry;
    }

    /// Decode one notification and fan it out; failures only drop this frame
    fn dispatch(&self, raw: &[u8]) {
        let result = match self.registry() {
            Some(registry) => decode_notification(&registry, raw),
            None => Err(match TelemetryFrame::parse(raw) {
                Ok(frame) => EarableError::UnknownSensor(frame.sensor_id),
                Err(e) => e,
            }),
        };

        match result {
            Ok(record) => {
                self.decoded.fetch_add(1, Ordering::Relaxed);
                self.subscribers.notify(&record);
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                warn!("Dropping sensor frame: {}", e);
                self.errors.notify(&e.report());
            }
        }
    }
}

/// Owns the scheme registry and the decoded-record subscription
pub struct SensorManager {
    client: GattClient,
    state: Arc<StreamState>,
}

impl SensorManager {
    pub fn new(client: GattClient, errors: Arc<Subscribers<ErrorReport>>) -> Self {
        Self {
            client,
            state: Arc::new(StreamState {
                registry: RwLock::new(None),
                subscribers: Subscribers::new("sensor_data"),
                errors,
                decoded: AtomicU64::new(0),
                failed: AtomicU64::new(0),
            }),
        }
    }

    /// Read the scheme once for this connection and start the data stream
    pub async fn init(&self) -> Result<()> {
        let registry = match self.load_registry().await {
            Ok(registry) => registry,
            Err(e) => {
                self.state.errors.notify(&e.report());
                return Err(e);
            }
        };

        info!("Loaded {} sensor schemes", registry.len());
        for scheme in registry.schemes() {
            debug!("Sensor scheme: {}", scheme);
        }
        self.state.set_registry(Some(Arc::new(registry)));

        self.client
            .subscribe(services::SENSOR_DATA, self.notification_handler())
            .await
    }

    async fn load_registry(&self) -> Result<SchemeRegistry> {
        let bytes = self.client.read(services::SCHEME).await?;
        SchemeRegistry::from_bytes(&bytes)
    }

    /// Handler that decodes raw sensor-data notifications
    pub fn notification_handler(&self) -> NotificationHandler {
        let state = self.state.clone();
        Arc::new(move |raw: &[u8]| state.dispatch(raw))
    }

    /// Install a registry without reading it from the device
    pub fn install_registry(&self, registry: SchemeRegistry) {
        self.state.set_registry(Some(Arc::new(registry)));
    }

    pub fn registry(&self) -> Option<Arc<SchemeRegistry>> {
        self.state.registry()
    }

    /// Drop the cached scheme; the next connection must read it again
    pub fn clear(&self) {
        self.state.set_registry(None);
    }

    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&DecodedRecord) + Send + Sync + 'static,
    {
        self.state.subscribers.subscribe(callback);
    }

    pub async fn write_sensor_config(&self, config: SensorConfig) -> Result<()> {
        self.client.ensure_connected()?;
        info!(
            "Configuring sensor {} at {} Hz (latency {})",
            config.sensor_id, config.sampling_rate, config.latency
        );
        self.client
            .write(services::SENSOR_CONFIGURATION, config.encode().to_vec())
            .await
    }

    /// (decoded, dropped) frame counts since creation
    pub fn stats(&self) -> (u64, u64) {
        (
            self.state.decoded.load(Ordering::Relaxed),
            self.state.failed.load(Ordering::Relaxed),
        )
    }
}
