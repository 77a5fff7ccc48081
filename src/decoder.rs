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

/// Telemetry frame decoder
///
/// Every sensor-data notification starts with a fixed six byte header
/// followed by the sensor's payload:
///
/// ```text
/// u8  sensorId
/// u8  reserved
/// u32 timestamp (little-endian, device clock)
/// ..  payload laid out per the sensor's scheme
/// ```
///
/// Payload values are read in scheme order, little-endian, without padding.
/// A payload shorter than the scheme requires is rejected rather than padded.
use bytes::Buf;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{EarableError, Result};
use crate::scheme::{ParseType, SchemeRegistry};

/// Size of the notification header preceding the payload
pub const FRAME_HEADER_LEN: usize = 6;

/// Raw notification split into header fields and payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryFrame<'a> {
    pub sensor_id: u8,
    pub timestamp: u32,
    pub payload: &'a [u8],
}

impl<'a> TelemetryFrame<'a> {
    pub fn parse(raw: &'a [u8]) -> Result<Self> {
        if raw.len() < FRAME_HEADER_LEN {
            return Err(EarableError::TruncatedFrame {
                sensor_id: raw.first().copied().unwrap_or_default(),
                expected: FRAME_HEADER_LEN,
                actual: raw.len(),
            });
        }

        let mut header = &raw[..FRAME_HEADER_LEN];
        let sensor_id = header.get_u8();
        let _reserved = header.get_u8();
        let timestamp = header.get_u32_le();

        Ok(Self {
            sensor_id,
            timestamp,
            payload: &raw[FRAME_HEADER_LEN..],
        })
    }
}

/// A decoded scalar, keeping the signedness of its wire type
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl Value {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Value::Int(v) => v as f64,
            Value::UInt(v) => v as f64,
            Value::Float(v) => v,
        }
    }
}

/// Values and units of one component group (e.g. `ACC`)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SensorGroup {
    pub values: BTreeMap<String, Value>,
    pub units: BTreeMap<String, String>,
}

/// Structured record produced from one notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedRecord {
    pub sensor_id: u8,
    pub timestamp: u32,
    pub sensor_name: String,
    pub groups: BTreeMap<String, SensorGroup>,
}

impl DecodedRecord {
    pub fn value(&self, group: &str, component: &str) -> Option<Value> {
        self.groups
            .get(group)
            .and_then(|g| g.values.get(component))
            .copied()
    }

    pub fn unit(&self, group: &str, component: &str) -> Option<&str> {
        self.groups
            .get(group)
            .and_then(|g| g.units.get(component))
            .map(String::as_str)
    }
}

/// Decode a frame payload using the registered scheme for `sensor_id`
pub fn decode(
    registry: &SchemeRegistry,
    sensor_id: u8,
    timestamp: u32,
    payload: &[u8],
) -> Result<DecodedRecord> {
    let scheme = registry
        .get(sensor_id)
        .ok_or(EarableError::UnknownSensor(sensor_id))?;

    let expected = scheme.payload_width();
    if payload.len() < expected {
        return Err(EarableError::TruncatedFrame {
            sensor_id,
            expected,
            actual: payload.len(),
        });
    }

    let mut cursor = payload;
    let mut groups: BTreeMap<String, SensorGroup> = BTreeMap::new();

    for component in &scheme.components {
        let value = read_value(&mut cursor, component.parse_type);
        let group = groups.entry(component.group_name.clone()).or_default();
        group.values.insert(component.component_name.clone(), value);
        group
            .units
            .insert(component.component_name.clone(), component.unit_name.clone());
    }

    Ok(DecodedRecord {
        sensor_id,
        timestamp,
        sensor_name: scheme.sensor_name.clone(),
        groups,
    })
}

/// Split the notification header and decode the payload
pub fn decode_notification(registry: &SchemeRegistry, raw: &[u8]) -> Result<DecodedRecord> {
    let frame = TelemetryFrame::parse(raw)?;
    decode(registry, frame.sensor_id, frame.timestamp, frame.payload)
}

// Width was checked against the whole scheme up front.
fn read_value(cursor: &mut &[u8], parse_type: ParseType) -> Value {
    match parse_type {
        ParseType::Int8 => Value::Int(cursor.get_i8() as i64),
        ParseType::Uint8 => Value::UInt(cursor.get_u8() as u64),
        ParseType::Int16 => Value::Int(cursor.get_i16_le() as i64),
        ParseType::Uint16 => Value::UInt(cursor.get_u16_le() as u64),
        ParseType::Int32 => Value::Int(cursor.get_i32_le() as i64),
        ParseType::Uint32 => Value::UInt(cursor.get_u32_le() as u64),
        ParseType::Float32 => Value::Float(cursor.get_f32_le() as f64),
        ParseType::Float64 => Value::Float(cursor.get_f64_le()),
    }
}
