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

//! Sensor scheme registry
//!
//! The device describes its own telemetry layout through the scheme
//! characteristic. The blob is a flat sequence of length-prefixed fields:
//!
//! ```text
//! u8 numSensors
//! repeat numSensors:
//!   u8 sensorId
//!   u8 nameLen, name
//!   u8 componentCount
//!   repeat componentCount:
//!     u8 componentType
//!     u8 groupNameLen, groupName
//!     u8 componentNameLen, componentName
//!     u8 unitNameLen, unitName
//! ```
//!
//! All strings are UTF-8 without padding.

use bytes::{Buf, BufMut, BytesMut};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::error::{EarableError, Result};

/// Wire type of a single scheme component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ParseType {
    Int8 = 0,
    Uint8 = 1,
    Int16 = 2,
    Uint16 = 3,
    Int32 = 4,
    Uint32 = 5,
    Float32 = 6,
    Float64 = 7,
}

impl ParseType {
    /// Encoded width in bytes
    pub fn width(self) -> usize {
        match self {
            ParseType::Int8 | ParseType::Uint8 => 1,
            ParseType::Int16 | ParseType::Uint16 => 2,
            ParseType::Int32 | ParseType::Uint32 | ParseType::Float32 => 4,
            ParseType::Float64 => 8,
        }
    }
}

impl TryFrom<u8> for ParseType {
    type Error = EarableError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(ParseType::Int8),
            1 => Ok(ParseType::Uint8),
            2 => Ok(ParseType::Int16),
            3 => Ok(ParseType::Uint16),
            4 => Ok(ParseType::Int32),
            5 => Ok(ParseType::Uint32),
            6 => Ok(ParseType::Float32),
            7 => Ok(ParseType::Float64),
            other => Err(EarableError::MalformedScheme(format!(
                "unknown component type {}",
                other
            ))),
        }
    }
}

/// One scalar field of a sensor's payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Component {
    pub parse_type: ParseType,
    pub group_name: String,
    pub component_name: String,
    pub unit_name: String,
}

impl Component {
    pub fn new(
        parse_type: ParseType,
        group_name: impl Into<String>,
        component_name: impl Into<String>,
        unit_name: impl Into<String>,
    ) -> Self {
        Self {
            parse_type,
            group_name: group_name.into(),
            component_name: component_name.into(),
            unit_name: unit_name.into(),
        }
    }
}

/// Layout of one sensor's telemetry frames
///
/// Component order is byte order within the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorScheme {
    pub sensor_id: u8,
    pub sensor_name: String,
    pub components: Vec<Component>,
}

impl SensorScheme {
    /// Total payload width required by this scheme
    pub fn payload_width(&self) -> usize {
        self.components.iter().map(|c| c.parse_type.width()).sum()
    }
}

impl fmt::Display for SensorScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (id {}, {} components, {} bytes)",
            self.sensor_name,
            self.sensor_id,
            self.components.len(),
            self.payload_width()
        )
    }
}

/// Parse the scheme characteristic value
///
/// Bytes following the last declared sensor are ignored.
pub fn parse_scheme(bytes: &[u8]) -> Result<Vec<SensorScheme>> {
    let mut buf = bytes;

    let num_sensors = take_u8(&mut buf, "sensor count")?;
    let mut schemes = Vec::with_capacity(num_sensors as usize);

    for _ in 0..num_sensors {
        let sensor_id = take_u8(&mut buf, "sensor id")?;
        let sensor_name = take_string(&mut buf, "sensor name")?;
        let component_count = take_u8(&mut buf, "component count")?;

        let mut components = Vec::with_capacity(component_count as usize);
        for _ in 0..component_count {
            let parse_type = ParseType::try_from(take_u8(&mut buf, "component type")?)?;
            let group_name = take_string(&mut buf, "group name")?;
            let component_name = take_string(&mut buf, "component name")?;
            let unit_name = take_string(&mut buf, "unit name")?;
            components.push(Component {
                parse_type,
                group_name,
                component_name,
                unit_name,
            });
        }

        schemes.push(SensorScheme {
            sensor_id,
            sensor_name,
            components,
        });
    }

    if buf.has_remaining() {
        debug!(
            "Ignoring {} trailing bytes after {} sensor schemes",
            buf.remaining(),
            schemes.len()
        );
    }

    Ok(schemes)
}

/// Encode schemes into the characteristic's wire layout
pub fn encode_scheme(schemes: &[SensorScheme]) -> Result<Vec<u8>> {
    let count = u8::try_from(schemes.len())
        .map_err(|_| EarableError::MalformedScheme("more than 255 sensors".to_string()))?;

    let mut buf = BytesMut::with_capacity(1 + schemes.len() * 32);
    buf.put_u8(count);

    for scheme in schemes {
        buf.put_u8(scheme.sensor_id);
        put_string(&mut buf, &scheme.sensor_name)?;
        let components = u8::try_from(scheme.components.len()).map_err(|_| {
            EarableError::MalformedScheme(format!(
                "sensor {} has more than 255 components",
                scheme.sensor_id
            ))
        })?;
        buf.put_u8(components);

        for component in &scheme.components {
            buf.put_u8(component.parse_type as u8);
            put_string(&mut buf, &component.group_name)?;
            put_string(&mut buf, &component.component_name)?;
            put_string(&mut buf, &component.unit_name)?;
        }
    }

    Ok(buf.to_vec())
}

fn take_u8(buf: &mut &[u8], field: &str) -> Result<u8> {
    if !buf.has_remaining() {
        return Err(EarableError::MalformedScheme(format!(
            "stream ended before {}",
            field
        )));
    }
    Ok(buf.get_u8())
}

fn take_string(buf: &mut &[u8], field: &str) -> Result<String> {
    let len = take_u8(buf, field)? as usize;
    if buf.remaining() < len {
        return Err(EarableError::MalformedScheme(format!(
            "{} declares {} bytes but only {} remain",
            field,
            len,
            buf.remaining()
        )));
    }
    let raw = buf.copy_to_bytes(len);
    String::from_utf8(raw.to_vec())
        .map_err(|e| EarableError::MalformedScheme(format!("{} is not UTF-8: {}", field, e)))
}

fn put_string(buf: &mut BytesMut, value: &str) -> Result<()> {
    let len = u8::try_from(value.len()).map_err(|_| {
        EarableError::MalformedScheme(format!("'{}' is longer than 255 bytes", value))
    })?;
    buf.put_u8(len);
    buf.put_slice(value.as_bytes());
    Ok(())
}

/// Immutable lookup of the schemes advertised by one connection
#[derive(Debug, Clone, Default)]
pub struct SchemeRegistry {
    schemes: Vec<SensorScheme>,
    by_id: HashMap<u8, usize>,
}

impl SchemeRegistry {
    pub fn new(schemes: Vec<SensorScheme>) -> Self {
        let mut by_id = HashMap::with_capacity(schemes.len());
        for (index, scheme) in schemes.iter().enumerate() {
            // First declaration of a duplicated id wins.
            by_id.entry(scheme.sensor_id).or_insert(index);
        }
        Self { schemes, by_id }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self::new(parse_scheme(bytes)?))
    }

    pub fn get(&self, sensor_id: u8) -> Option<&SensorScheme> {
        self.by_id.get(&sensor_id).map(|&index| &self.schemes[index])
    }

    pub fn schemes(&self) -> &[SensorScheme] {
        &self.schemes
    }

    pub fn len(&self) -> usize {
        self.schemes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type_widths() {
        assert_eq!(ParseType::Int8.width(), 1);
        assert_eq!(ParseType::Uint16.width(), 2);
        assert_eq!(ParseType::Float32.width(), 4);
        assert_eq!(ParseType::Float64.width(), 8);
    }

    #[test]
    fn test_unknown_component_type() {
        // one sensor, id 3, name "X", one component of type 9
        let bytes = [1, 3, 1, b'X', 1, 9, 0, 0, 0];
        let err = parse_scheme(&bytes).unwrap_err();
        assert!(matches!(err, EarableError::MalformedScheme(_)));
        assert!(err.to_string().contains("unknown component type 9"));
    }

    #[test]
    fn test_empty_scheme() {
        let schemes = parse_scheme(&[0]).unwrap();
        assert!(schemes.is_empty());
        assert!(parse_scheme(&[]).is_err());
    }

    #[test]
    fn test_registry_lookup() {
        let registry = SchemeRegistry::new(vec![SensorScheme {
            sensor_id: 4,
            sensor_name: "PPG".to_string(),
            components: vec![Component::new(ParseType::Uint32, "PPG", "Red", "")],
        }]);
        assert_eq!(registry.get(4).unwrap().sensor_name, "PPG");
        assert!(registry.get(5).is_none());
        assert_eq!(registry.get(4).unwrap().payload_width(), 4);
    }
}
