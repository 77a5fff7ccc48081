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

// Shared helpers for integration tests: an in-memory GATT connection and
// builders for scheme blobs and telemetry frames.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use earable_link::scheme::encode_scheme;
use earable_link::transport::services;
use earable_link::{
    Characteristic, Component, EarableError, GattConnection, NotificationHandler, ParseType,
    Result, SensorScheme,
};

/// In-memory GATT peer recording every operation it sees
#[derive(Default)]
pub struct MockConnection {
    disconnected: AtomicBool,
    values: Mutex<HashMap<Uuid, Vec<u8>>>,
    failing: Mutex<HashSet<Uuid>>,
    writes: Mutex<Vec<(Characteristic, Vec<u8>)>>,
    reads: Mutex<Vec<Characteristic>>,
    handlers: Mutex<HashMap<Uuid, NotificationHandler>>,
    op_delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Device with battery, device info, scheme and recording values populated
    pub fn earable() -> Self {
        let mock = Self::new();
        mock.set_value(services::BATTERY_LEVEL, vec![87]);
        mock.set_value(services::BATTERY_STATE, vec![1]);
        mock.set_value(services::FIRMWARE_REVISION, b"2.1.0".to_vec());
        mock.set_value(services::HARDWARE_GENERATION, b"1.4".to_vec());
        mock.set_value(services::DEVICE_IDENTIFIER, b"OE-42".to_vec());
        mock.set_value(services::SCHEME, earable_scheme());
        mock.set_value(services::RECORDING_STATUS, vec![0]);
        mock.set_value(
            services::RECORDING_CONFIG,
            vec![2, 0, 1, 0, 10, 0, 0, 0, 4, b'd', b'a', b't', b'a'],
        );
        mock
    }

    pub fn set_value(&self, characteristic: Characteristic, value: Vec<u8>) {
        self.values
            .lock()
            .unwrap()
            .insert(characteristic.uuid, value);
    }

    pub fn set_connected(&self, connected: bool) {
        self.disconnected.store(!connected, Ordering::SeqCst);
    }

    /// Make every operation on `characteristic` fail with a transport error
    pub fn fail(&self, characteristic: Characteristic) {
        self.failing.lock().unwrap().insert(characteristic.uuid);
    }

    pub fn heal(&self, characteristic: Characteristic) {
        self.failing.lock().unwrap().remove(&characteristic.uuid);
    }

    pub fn set_op_delay(&self, delay: Duration) {
        *self.op_delay.lock().unwrap() = Some(delay);
    }

    pub fn writes(&self) -> Vec<(Characteristic, Vec<u8>)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn writes_to(&self, characteristic: Characteristic) -> Vec<Vec<u8>> {
        self.writes()
            .into_iter()
            .filter(|(c, _)| *c == characteristic)
            .map(|(_, data)| data)
            .collect()
    }

    pub fn reads(&self) -> Vec<Characteristic> {
        self.reads.lock().unwrap().clone()
    }

    pub fn is_subscribed(&self, characteristic: Characteristic) -> bool {
        self.handlers
            .lock()
            .unwrap()
            .contains_key(&characteristic.uuid)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Push a notification to the subscribed handler; false if nobody listens
    pub fn notify(&self, characteristic: Characteristic, value: &[u8]) -> bool {
        let handler = self
            .handlers
            .lock()
            .unwrap()
            .get(&characteristic.uuid)
            .cloned();
        match handler {
            Some(handler) => {
                handler(value);
                true
            }
            None => false,
        }
    }

    async fn begin(&self, characteristic: Characteristic) -> Result<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.op_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.lock().unwrap().contains(&characteristic.uuid) {
            return Err(EarableError::Transport(format!(
                "{} rejected the operation",
                characteristic.name
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl GattConnection for MockConnection {
    fn is_connected(&self) -> bool {
        !self.disconnected.load(Ordering::SeqCst)
    }

    async fn read(&self, characteristic: Characteristic) -> Result<Vec<u8>> {
        self.reads.lock().unwrap().push(characteristic);
        self.begin(characteristic).await?;
        let value = self.values.lock().unwrap().get(&characteristic.uuid).cloned();
        value.ok_or_else(|| EarableError::Transport(format!("{} has no value", characteristic.name)))
    }

    async fn write(&self, characteristic: Characteristic, data: &[u8]) -> Result<()> {
        self.begin(characteristic).await?;
        self.writes
            .lock()
            .unwrap()
            .push((characteristic, data.to_vec()));
        Ok(())
    }

    async fn subscribe(
        &self,
        characteristic: Characteristic,
        handler: NotificationHandler,
    ) -> Result<()> {
        self.begin(characteristic).await?;
        self.handlers
            .lock()
            .unwrap()
            .insert(characteristic.uuid, handler);
        Ok(())
    }
}

/// IMU (sensor 0) with nine float axes and a barometer (sensor 1)
pub fn earable_schemes() -> Vec<SensorScheme> {
    let mut imu = Vec::new();
    for (group, unit) in [("ACC", "m/s^2"), ("GYRO", "deg/s"), ("MAG", "uT")] {
        for axis in ["X", "Y", "Z"] {
            imu.push(Component::new(ParseType::Float32, group, axis, unit));
        }
    }

    vec![
        SensorScheme {
            sensor_id: 0,
            sensor_name: "IMU".to_string(),
            components: imu,
        },
        SensorScheme {
            sensor_id: 1,
            sensor_name: "BARO".to_string(),
            components: vec![
                Component::new(ParseType::Float32, "BARO", "Pressure", "Pa"),
                Component::new(ParseType::Float32, "TEMP", "Temperature", "C"),
            ],
        },
    ]
}

pub fn earable_scheme() -> Vec<u8> {
    encode_scheme(&earable_schemes()).unwrap()
}

/// Notification bytes for float32 payloads
pub fn float_frame(sensor_id: u8, timestamp: u32, values: &[f32]) -> Vec<u8> {
    let mut raw = vec![sensor_id, 0];
    raw.extend_from_slice(&timestamp.to_le_bytes());
    for v in values {
        raw.extend_from_slice(&v.to_le_bytes());
    }
    raw
}
