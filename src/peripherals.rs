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

// Audio playback and RGB LED commands

use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{EarableError, Result};
use crate::transport::{services, GattClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum WaveType {
    Idle = 0,
    Sine = 1,
    Square = 2,
    Triangle = 3,
    Saw = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Jingle {
    Idle = 0,
    Notification = 1,
    Success = 2,
    Error = 3,
    Alarm = 4,
    Ping = 5,
    Open = 6,
    Close = 7,
    Click = 8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum AudioState {
    Idle = 0,
    Play = 1,
    Pause = 2,
    Stop = 3,
}

/// What the device should play next
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AudioSource {
    /// A WAV file stored on the device's SD card
    Wav { file_name: String },
    Frequency {
        wave_type: WaveType,
        frequency: f32,
        loudness: f32,
    },
    Jingle { jingle: Jingle },
}

impl AudioSource {
    pub fn type_code(&self) -> u8 {
        match self {
            AudioSource::Wav { .. } => 1,
            AudioSource::Frequency { .. } => 2,
            AudioSource::Jingle { .. } => 3,
        }
    }

    /// Audio source characteristic value
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = BytesMut::with_capacity(10);
        buf.put_u8(self.type_code());

        match self {
            AudioSource::Wav { file_name } => {
                let len = u8::try_from(file_name.len()).map_err(|_| {
                    EarableError::Validation(format!(
                        "wav file name is {} bytes, limit is 255",
                        file_name.len()
                    ))
                })?;
                buf.put_u8(len);
                buf.put_slice(file_name.as_bytes());
            }
            AudioSource::Frequency {
                wave_type,
                frequency,
                loudness,
            } => {
                buf.put_u8(*wave_type as u8);
                buf.put_f32_le(*frequency);
                buf.put_f32_le(*loudness);
            }
            AudioSource::Jingle { jingle } => buf.put_u8(*jingle as u8),
        }

        Ok(buf.to_vec())
    }
}

pub struct AudioPlayer {
    client: GattClient,
}

impl AudioPlayer {
    pub fn new(client: GattClient) -> Self {
        Self { client }
    }

    pub async fn set_source(&self, source: &AudioSource) -> Result<()> {
        let payload = source.encode()?;
        info!("Selecting audio source {:?}", source);
        self.client.write(services::AUDIO_SOURCE, payload).await
    }

    pub async fn set_state(&self, state: AudioState) -> Result<()> {
        info!("Setting audio state {:?}", state);
        self.client
            .write(services::AUDIO_STATE, vec![state as u8])
            .await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const OFF: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn encode(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

pub struct RgbLed {
    client: GattClient,
}

impl RgbLed {
    pub fn new(client: GattClient) -> Self {
        Self { client }
    }

    pub async fn write_color(&self, color: Rgb) -> Result<()> {
        self.client.ensure_connected()?;
        self.client
            .write(services::LED_STATE, color.encode().to_vec())
            .await
    }
}
