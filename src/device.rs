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

use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::LinkConfig;
use crate::error::{EarableError, ErrorReport, Result};
use crate::events::Subscribers;
use crate::peripherals::{AudioPlayer, RgbLed};
use crate::recording::{RecordingConfig, RecordingController};
use crate::sensor::{SensorConfig, SensorManager};
use crate::transport::{services, Characteristic, GattClient, GattConnection, NotificationHandler};

/// Firmware and hardware revision strings read after connecting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub firmware_version: Option<String>,
    pub hardware_version: Option<String>,
}

/// One connected earable and everything that talks to it
///
/// Owns the transport queue and all managers. Observers registered here
/// survive reconnects; per-connection state (scheme, recording mirror) is
/// dropped in [`Earable::handle_disconnected`].
pub struct Earable {
    client: GattClient,
    settle_delay: Duration,
    sensor_configs: Vec<SensorConfig>,
    default_recording: RecordingConfig,

    sensors: SensorManager,
    recording: RecordingController,
    audio: AudioPlayer,
    led: RgbLed,
    info: RwLock<DeviceInfo>,

    battery_level: Arc<Subscribers<u8>>,
    battery_state: Arc<Subscribers<u8>>,
    button: Arc<Subscribers<u8>>,
    connected: Subscribers<DeviceInfo>,
    disconnected: Subscribers<()>,
    errors: Arc<Subscribers<ErrorReport>>,
}

impl Earable {
    pub fn new(connection: Arc<dyn GattConnection>, config: &LinkConfig) -> Self {
        let client = GattClient::new(connection);
        let errors = Arc::new(Subscribers::new("errors"));

        let sensor_configs = config
            .sensors
            .iter()
            .map(|s| SensorConfig::new(s.sensor_id, s.sampling_rate, s.latency))
            .collect();

        Self {
            sensors: SensorManager::new(client.clone(), errors.clone()),
            recording: RecordingController::new(
                client.clone(),
                config.recording.limits(),
                errors.clone(),
            ),
            audio: AudioPlayer::new(client.clone()),
            led: RgbLed::new(client.clone()),
            client,
            settle_delay: config.device.settle_delay(),
            sensor_configs,
            default_recording: config.recording.default_config(),
            info: RwLock::new(DeviceInfo::default()),
            battery_level: Arc::new(Subscribers::new("battery_level")),
            battery_state: Arc::new(Subscribers::new("battery_state")),
            button: Arc::new(Subscribers::new("button_state")),
            connected: Subscribers::new("connected"),
            disconnected: Subscribers::new("disconnected"),
            errors,
        }
    }

    pub fn client(&self) -> &GattClient {
        &self.client
    }

    pub fn sensors(&self) -> &SensorManager {
        &self.sensors
    }

    pub fn recording(&self) -> &RecordingController {
        &self.recording
    }

    pub fn audio(&self) -> &AudioPlayer {
        &self.audio
    }

    pub fn led(&self) -> &RgbLed {
        &self.led
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    pub fn device_info(&self) -> DeviceInfo {
        self.info
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn on_battery_level<F>(&self, callback: F)
    where
        F: Fn(&u8) + Send + Sync + 'static,
    {
        self.battery_level.subscribe(callback);
    }

    pub fn on_battery_state<F>(&self, callback: F)
    where
        F: Fn(&u8) + Send + Sync + 'static,
    {
        self.battery_state.subscribe(callback);
    }

    pub fn on_button<F>(&self, callback: F)
    where
        F: Fn(&u8) + Send + Sync + 'static,
    {
        self.button.subscribe(callback);
    }

    pub fn on_connected<F>(&self, callback: F)
    where
        F: Fn(&DeviceInfo) + Send + Sync + 'static,
    {
        self.connected.subscribe(callback);
    }

    pub fn on_disconnected<F>(&self, callback: F)
    where
        F: Fn(&()) + Send + Sync + 'static,
    {
        self.disconnected.subscribe(callback);
    }

    pub fn on_error<F>(&self, callback: F)
    where
        F: Fn(&ErrorReport) + Send + Sync + 'static,
    {
        self.errors.subscribe(callback);
    }

    /// Start an SD recording with the configured defaults
    pub async fn start_default_recording(&self) -> Result<()> {
        self.recording.start(self.default_recording.clone()).await
    }

    pub async fn read_device_identifier(&self) -> Result<String> {
        self.read_string(services::DEVICE_IDENTIFIER).await
    }

    pub async fn read_firmware_version(&self) -> Result<String> {
        self.read_string(services::FIRMWARE_REVISION).await
    }

    pub async fn read_hardware_version(&self) -> Result<String> {
        self.read_string(services::HARDWARE_GENERATION).await
    }

    async fn read_string(&self, characteristic: Characteristic) -> Result<String> {
        self.client.ensure_connected()?;
        let bytes = self.client.read(characteristic).await?;
        String::from_utf8(bytes).map_err(|e| EarableError::MalformedResponse {
            what: characteristic.name,
            reason: e.to_string(),
        })
    }

    /// Device-ready sequence, run once the platform reports a new link
    pub async fn handle_connected(&self) -> Result<()> {
        info!("Device connected, running setup");

        if let Err(e) = self.setup().await {
            error!("Device setup failed: {}", e);
            self.errors.notify(&e.report());
            return Err(e);
        }

        // Older firmware has no recording service; streaming still works without it.
        if let Err(e) = self.recording.refresh_status().await {
            warn!("Could not read recording status: {}", e);
        }
        if let Err(e) = self.recording.refresh_config().await {
            warn!("Could not read recording config: {}", e);
        }

        let info = self.device_info();
        info!(
            "Device ready (firmware {}, hardware {})",
            info.firmware_version.as_deref().unwrap_or("unknown"),
            info.hardware_version.as_deref().unwrap_or("unknown")
        );
        self.connected.notify(&info);
        Ok(())
    }

    async fn setup(&self) -> Result<()> {
        let level = self.client.read(services::BATTERY_LEVEL).await?;
        forward_first_byte(&self.battery_level, &level);

        let firmware = self.read_firmware_version().await?;
        let hardware = self.read_hardware_version().await?;
        {
            let mut info = self
                .info
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            info.firmware_version = Some(firmware);
            info.hardware_version = Some(hardware);
        }

        self.client
            .subscribe(services::BATTERY_LEVEL, first_byte_handler(&self.battery_level))
            .await?;

        let state = self.client.read(services::BATTERY_STATE).await?;
        forward_first_byte(&self.battery_state, &state);

        self.client
            .subscribe(services::BATTERY_STATE, first_byte_handler(&self.battery_state))
            .await?;

        self.sensors.init().await?;
        for config in &self.sensor_configs {
            self.sensors.write_sensor_config(*config).await?;
        }

        self.client
            .subscribe(services::BUTTON_STATE, first_byte_handler(&self.button))
            .await?;

        Ok(())
    }

    /// Drop per-connection state, then tell observers once the link has settled
    pub async fn handle_disconnected(&self) {
        warn!("Device disconnected");
        self.sensors.clear();
        self.recording.reset().await;
        *self
            .info
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = DeviceInfo::default();

        debug!("Waiting {:?} before reporting the disconnect", self.settle_delay);
        tokio::time::sleep(self.settle_delay).await;
        self.disconnected.notify(&());
    }
}

/// Battery and button characteristics carry their value in the first byte
fn forward_first_byte(subscribers: &Subscribers<u8>, value: &[u8]) {
    match value.first() {
        Some(byte) => {
            subscribers.notify(byte);
        }
        None => debug!("Ignoring empty value"),
    }
}

fn first_byte_handler(subscribers: &Arc<Subscribers<u8>>) -> NotificationHandler {
    let subscribers = subscribers.clone();
    Arc::new(move |value: &[u8]| forward_first_byte(&subscribers, value))
}
