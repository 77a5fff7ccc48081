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

/// Export codec for recorded sensor rows
///
/// Converts merged [`SampleRow`]s into CSV, JSON or a compact binary layout
/// matching the device's own recording formats. Everything here is pure.
///
/// # Binary layout
///
/// ```text
/// u8  sensorTypeCount, u8 sensorType..
/// u32 rowCount (LE)
/// per row:
///   u64 timestamp (LE)
///   if IMU selected:      9 x f32 (acc, gyro, mag; missing vectors are zero)
///   if pressure selected: 2 x f32 (pressure, temperature; missing values are zero)
/// ```
use bytes::{BufMut, BytesMut};
use serde::Serialize;

use crate::error::{EarableError, Result};
use crate::recording::DataFormat;
use crate::sensor::SensorId;

const IMU: u8 = SensorId::Imu.id();
const PRESSURE: u8 = SensorId::PressureSensor.id();

/// One export row: everything known about a single device timestamp
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SampleRow {
    pub timestamp: Option<u64>,
    pub acc: Option<Vec<f64>>,
    pub gyro: Option<Vec<f64>>,
    pub mag: Option<Vec<f64>>,
    pub pressure: Option<f64>,
    pub temperature: Option<f64>,
}

impl SampleRow {
    pub fn at(timestamp: u64) -> Self {
        Self {
            timestamp: Some(timestamp),
            ..Default::default()
        }
    }

    fn imu_vectors(&self) -> [Option<&[f64]>; 3] {
        [
            triplet(&self.acc),
            triplet(&self.gyro),
            triplet(&self.mag),
        ]
    }
}

/// A vector is usable only when it has exactly three axes
fn triplet(vector: &Option<Vec<f64>>) -> Option<&[f64]> {
    vector.as_deref().filter(|v| v.len() == 3)
}

pub fn to_csv(rows: &[SampleRow], sensor_types: &[u8]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let with_imu = sensor_types.contains(&IMU);
    let with_pressure = sensor_types.contains(&PRESSURE);

    let mut header = vec!["timestamp"];
    if with_imu {
        header.extend([
            "acc_x", "acc_y", "acc_z", "gyro_x", "gyro_y", "gyro_z", "mag_x", "mag_y", "mag_z",
        ]);
    }
    if with_pressure {
        header.extend(["pressure", "temperature"]);
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(header.join(","));

    for row in rows {
        let mut fields = vec![optional(row.timestamp)];
        if with_imu {
            for vector in row.imu_vectors() {
                match vector {
                    Some(v) => fields.extend(v.iter().map(|x| x.to_string())),
                    None => fields.extend(std::iter::repeat(String::new()).take(3)),
                }
            }
        }
        if with_pressure {
            fields.push(optional(row.pressure));
            fields.push(optional(row.temperature));
        }
        lines.push(fields.join(","));
    }

    lines.join("\n")
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[derive(Serialize)]
struct JsonExport<'a> {
    metadata: JsonMetadata<'a>,
    data: Vec<JsonRecord>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonMetadata<'a> {
    sensor_types: &'a [u8],
    data_count: usize,
    timestamp: &'a str,
    format: &'static str,
}

#[derive(Serialize)]
struct JsonRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    imu: Option<JsonImu>,
    #[serde(skip_serializing_if = "Option::is_none")]
    environmental: Option<JsonEnvironmental>,
}

#[derive(Serialize)]
struct JsonImu {
    #[serde(skip_serializing_if = "Option::is_none")]
    accelerometer: Option<Axes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gyroscope: Option<Axes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    magnetometer: Option<Axes>,
}

#[derive(Serialize)]
struct JsonEnvironmental {
    #[serde(skip_serializing_if = "Option::is_none")]
    pressure: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Serialize)]
struct Axes {
    x: f64,
    y: f64,
    z: f64,
}

impl Axes {
    fn from_slice(v: &[f64]) -> Self {
        Self {
            x: v[0],
            y: v[1],
            z: v[2],
        }
    }
}

/// JSON export stamped with the current wall-clock time
pub fn to_json(rows: &[SampleRow], sensor_types: &[u8]) -> Result<String> {
    let generated_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    to_json_at(rows, sensor_types, &generated_at)
}

/// JSON export with an explicit `metadata.timestamp`
pub fn to_json_at(rows: &[SampleRow], sensor_types: &[u8], generated_at: &str) -> Result<String> {
    let with_imu = sensor_types.contains(&IMU);
    let with_pressure = sensor_types.contains(&PRESSURE);

    let data = rows
        .iter()
        .map(|row| {
            let imu = if with_imu {
                let [acc, gyro, mag] = row.imu_vectors();
                let imu = JsonImu {
                    accelerometer: acc.map(Axes::from_slice),
                    gyroscope: gyro.map(Axes::from_slice),
                    magnetometer: mag.map(Axes::from_slice),
                };
                let has_data =
                    imu.accelerometer.is_some() || imu.gyroscope.is_some() || imu.magnetometer.is_some();
                has_data.then_some(imu)
            } else {
                None
            };

            let environmental = if with_pressure
                && (row.pressure.is_some() || row.temperature.is_some())
            {
                Some(JsonEnvironmental {
                    pressure: row.pressure,
                    temperature: row.temperature,
                })
            } else {
                None
            };

            JsonRecord {
                timestamp: row.timestamp,
                imu,
                environmental,
            }
        })
        .collect();

    let export = JsonExport {
        metadata: JsonMetadata {
            sensor_types,
            data_count: rows.len(),
            timestamp: generated_at,
            format: "JSON",
        },
        data,
    };

    serde_json::to_string_pretty(&export)
        .map_err(|e| EarableError::Validation(format!("JSON export failed: {}", e)))
}

pub fn to_binary(rows: &[SampleRow], sensor_types: &[u8]) -> Result<Vec<u8>> {
    let type_count = u8::try_from(sensor_types.len()).map_err(|_| {
        EarableError::Validation("binary export supports at most 255 sensor types".to_string())
    })?;
    let row_count = u32::try_from(rows.len()).map_err(|_| {
        EarableError::Validation("binary export supports at most u32::MAX rows".to_string())
    })?;

    let with_imu = sensor_types.contains(&IMU);
    let with_pressure = sensor_types.contains(&PRESSURE);
    let imu_len = if with_imu { 36 } else { 0 };
    let pressure_len = if with_pressure { 8 } else { 0 };
    let row_len = 8 + imu_len + pressure_len;

    let mut buf = BytesMut::with_capacity(1 + sensor_types.len() + 4 + rows.len() * row_len);
    buf.put_u8(type_count);
    buf.put_slice(sensor_types);
    buf.put_u32_le(row_count);

    for row in rows {
        buf.put_u64_le(row.timestamp.unwrap_or_default());

        if with_imu {
            for vector in row.imu_vectors() {
                let axes = vector.unwrap_or(&[0.0, 0.0, 0.0]);
                for value in axes {
                    buf.put_f32_le(*value as f32);
                }
            }
        }

        if with_pressure {
            buf.put_f32_le(row.pressure.unwrap_or_default() as f32);
            buf.put_f32_le(row.temperature.unwrap_or_default() as f32);
        }
    }

    Ok(buf.to_vec())
}

/// Encode rows in the requested format
pub fn export(rows: &[SampleRow], sensor_types: &[u8], format: DataFormat) -> Result<Vec<u8>> {
    match format {
        DataFormat::Csv => Ok(to_csv(rows, sensor_types).into_bytes()),
        DataFormat::Json => Ok(to_json(rows, sensor_types)?.into_bytes()),
        DataFormat::Binary => to_binary(rows, sensor_types),
    }
}

/// Diagnostic result of [`validate_sensor_data`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Check one row against the selected sensors
///
/// Missing timestamps and malformed IMU vectors are errors; missing
/// environmental values only warn.
pub fn validate_sensor_data(row: &SampleRow, sensor_types: &[u8]) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if row.timestamp.is_none() {
        errors.push("missing timestamp".to_string());
    }

    if sensor_types.contains(&IMU) {
        let [acc, gyro, mag] = row.imu_vectors();
        if acc.is_none() {
            errors.push("invalid accelerometer data".to_string());
        }
        if gyro.is_none() {
            errors.push("invalid gyroscope data".to_string());
        }
        if mag.is_none() {
            errors.push("invalid magnetometer data".to_string());
        }
    }

    if sensor_types.contains(&PRESSURE) {
        if row.pressure.is_none() {
            warnings.push("missing pressure data".to_string());
        }
        if row.temperature.is_none() {
            warnings.push("missing temperature data".to_string());
        }
    }

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}

pub fn file_extension(format: DataFormat) -> &'static str {
    format.file_extension()
}

/// Human-readable size, e.g. `1.50 KB`
pub fn format_data_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;

    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    format!("{:.2} {}", size, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_csv() {
        assert_eq!(to_csv(&[], &[0, 1]), "");
    }

    #[test]
    fn test_csv_renders_short_vector_as_empty() {
        let row = SampleRow {
            acc: Some(vec![1.0, 2.0]),
            ..SampleRow::at(5)
        };
        assert_eq!(
            to_csv(&[row], &[IMU]),
            "timestamp,acc_x,acc_y,acc_z,gyro_x,gyro_y,gyro_z,mag_x,mag_y,mag_z\n5,,,,,,,,,"
        );
    }

    #[test]
    fn test_format_data_size() {
        assert_eq!(format_data_size(512), "512.00 B");
        assert_eq!(format_data_size(1536), "1.50 KB");
        assert_eq!(format_data_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_file_extensions() {
        assert_eq!(file_extension(DataFormat::Csv), ".csv");
        assert_eq!(file_extension(DataFormat::Json), ".json");
        assert_eq!(file_extension(DataFormat::Binary), ".bin");
    }
}
