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

use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::codec::SampleRow;
use crate::decoder::DecodedRecord;
use crate::sensor::SensorId;

/// Client-side recording cache
///
/// Collects decoded records while active and merges them into one
/// [`SampleRow`] per device timestamp. IMU axes are remapped from the
/// sensor frame to the export frame as `[-X, Z, Y]`.
#[derive(Debug, Default)]
pub struct RecordingCache {
    rows: BTreeMap<u32, SampleRow>,
    active: bool,
    ignored: u64,
}

impl RecordingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        info!("Recording cache started");
        self.active = true;
    }

    /// Stop collecting and hand out the merged rows
    pub fn stop(&mut self) -> Vec<SampleRow> {
        self.active = false;
        let rows = std::mem::take(&mut self.rows).into_values().collect::<Vec<_>>();
        info!(
            "Recording cache stopped with {} rows ({} records ignored)",
            rows.len(),
            self.ignored
        );
        self.ignored = 0;
        rows
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.ignored = 0;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Snapshot of merged rows in ascending timestamp order
    pub fn rows(&self) -> Vec<SampleRow> {
        self.rows.values().cloned().collect()
    }

    /// Merge one record; a no-op unless the cache is active
    pub fn ingest(&mut self, record: &DecodedRecord) {
        if !self.active {
            return;
        }

        let imu = SensorId::Imu.id();
        let pressure = SensorId::PressureSensor.id();

        if record.sensor_id != imu && record.sensor_id != pressure {
            self.ignored += 1;
            debug!("Not caching sensor {}", record.sensor_id);
            return;
        }

        let row = self
            .rows
            .entry(record.timestamp)
            .or_insert_with(|| SampleRow::at(u64::from(record.timestamp)));

        if record.sensor_id == imu {
            if let Some(acc) = remapped_axes(record, "ACC") {
                row.acc = Some(acc);
            }
            if let Some(gyro) = remapped_axes(record, "GYRO") {
                row.gyro = Some(gyro);
            }
            if let Some(mag) = remapped_axes(record, "MAG") {
                row.mag = Some(mag);
            }
        } else {
            if let Some(v) = record.value("BARO", "Pressure") {
                row.pressure = Some(v.as_f64());
            }
            if let Some(v) = record.value("TEMP", "Temperature") {
                row.temperature = Some(v.as_f64());
            }
        }
    }
}

fn remapped_axes(record: &DecodedRecord, group: &str) -> Option<Vec<f64>> {
    let x = record.value(group, "X")?.as_f64();
    let y = record.value(group, "Y")?.as_f64();
    let z = record.value(group, "Z")?.as_f64();
    Some(vec![-x, z, y])
}
