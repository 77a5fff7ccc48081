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

mod common;

use common::{earable_scheme, earable_schemes, float_frame};
use earable_link::scheme::encode_scheme;
use earable_link::{
    decode, decode_notification, parse_scheme, Component, EarableError, ErrorKind, ParseType,
    SchemeRegistry, SensorScheme, Value,
};

fn mixed_scheme() -> SensorScheme {
    SensorScheme {
        sensor_id: 4,
        sensor_name: "MIXED".to_string(),
        components: vec![
            Component::new(ParseType::Int8, "RAW", "a", "count"),
            Component::new(ParseType::Uint16, "RAW", "b", "count"),
            Component::new(ParseType::Int32, "RAW", "c", "count"),
            Component::new(ParseType::Float64, "PRECISE", "d", "m"),
        ],
    }
}

#[test]
fn test_parse_known_scheme() {
    let bytes = [
        1, // one sensor
        3, 3, b'T', b'M', b'P', // id 3, name "TMP"
        1, // one component
        6, 4, b'T', b'E', b'M', b'P', 1, b'T', 1, b'C', // float32 TEMP.T in C
    ];

    let schemes = parse_scheme(&bytes).unwrap();
    assert_eq!(schemes.len(), 1);
    assert_eq!(schemes[0].sensor_id, 3);
    assert_eq!(schemes[0].sensor_name, "TMP");
    assert_eq!(
        schemes[0].components,
        vec![Component::new(ParseType::Float32, "TEMP", "T", "C")]
    );
}

#[test]
fn test_scheme_reencodes_identically() {
    let blobs = [
        earable_scheme(),
        encode_scheme(&[mixed_scheme()]).unwrap(),
        vec![0],
        // empty names and a sensor without components
        vec![2, 9, 0, 0, 10, 1, b'X', 1, 0, 0, 0, 0],
    ];

    for blob in blobs {
        let schemes = parse_scheme(&blob).unwrap();
        assert_eq!(encode_scheme(&schemes).unwrap(), blob);
    }
}

#[test]
fn test_truncated_scheme_is_rejected() {
    let full = earable_scheme();
    for cut in [1, 5, full.len() / 2, full.len() - 1] {
        let err = parse_scheme(&full[..cut]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedScheme, "cut at {}", cut);
    }
    assert!(parse_scheme(&[]).is_err());
}

#[test]
fn test_unknown_parse_type_is_rejected() {
    let bytes = [1, 0, 0, 1, 8, 0, 0, 0];
    assert!(matches!(
        parse_scheme(&bytes),
        Err(EarableError::MalformedScheme(_))
    ));
}

#[test]
fn test_trailing_scheme_bytes_ignored() {
    let mut bytes = earable_scheme();
    bytes.extend_from_slice(&[0xde, 0xad]);
    let registry = SchemeRegistry::from_bytes(&bytes).unwrap();
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_decode_imu_frame() {
    let registry = SchemeRegistry::new(earable_schemes());
    let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
    let raw = float_frame(0, 1234, &values);

    let record = decode_notification(&registry, &raw).unwrap();
    assert_eq!(record.sensor_id, 0);
    assert_eq!(record.timestamp, 1234);
    assert_eq!(record.sensor_name, "IMU");
    assert_eq!(record.groups.len(), 3);
    assert_eq!(record.value("ACC", "Y"), Some(Value::Float(2.0)));
    assert_eq!(record.value("MAG", "Z"), Some(Value::Float(9.0)));
    assert_eq!(record.unit("GYRO", "X"), Some("deg/s"));
}

#[test]
fn test_decode_mixed_widths() {
    let registry = SchemeRegistry::new(vec![mixed_scheme()]);
    let mut payload = vec![0xfe]; // -2
    payload.extend_from_slice(&65_000u16.to_le_bytes());
    payload.extend_from_slice(&(-70_000i32).to_le_bytes());
    payload.extend_from_slice(&0.125f64.to_le_bytes());

    let record = decode(&registry, 4, 9, &payload).unwrap();
    assert_eq!(record.value("RAW", "a"), Some(Value::Int(-2)));
    assert_eq!(record.value("RAW", "b"), Some(Value::UInt(65_000)));
    assert_eq!(record.value("RAW", "c"), Some(Value::Int(-70_000)));
    assert_eq!(record.value("PRECISE", "d"), Some(Value::Float(0.125)));

    // deterministic
    assert_eq!(decode(&registry, 4, 9, &payload).unwrap(), record);
}

#[test]
fn test_short_payload_is_truncated_error() {
    let registry = SchemeRegistry::new(earable_schemes());
    let payload = [0u8; 35];

    match decode(&registry, 0, 1, &payload) {
        Err(EarableError::TruncatedFrame {
            sensor_id,
            expected,
            actual,
        }) => {
            assert_eq!(sensor_id, 0);
            assert_eq!(expected, 36);
            assert_eq!(actual, 35);
        }
        other => panic!("expected truncated frame, got {:?}", other),
    }
}

#[test]
fn test_extra_payload_bytes_ignored() {
    let registry = SchemeRegistry::new(earable_schemes());
    let mut raw = float_frame(1, 50, &[1000.0, 22.5]);
    raw.extend_from_slice(&[1, 2, 3]);

    let record = decode_notification(&registry, &raw).unwrap();
    assert_eq!(record.value("BARO", "Pressure"), Some(Value::Float(1000.0)));
    assert_eq!(record.value("TEMP", "Temperature"), Some(Value::Float(22.5)));
}

#[test]
fn test_unknown_sensor() {
    let registry = SchemeRegistry::new(earable_schemes());
    let raw = float_frame(7, 1, &[1.0]);
    assert!(matches!(
        decode_notification(&registry, &raw),
        Err(EarableError::UnknownSensor(7))
    ));
}

#[test]
fn test_duplicate_sensor_ids_keep_first() {
    let mut schemes = earable_schemes();
    schemes.push(SensorScheme {
        sensor_id: 0,
        sensor_name: "SHADOW".to_string(),
        components: vec![],
    });
    let registry = SchemeRegistry::new(schemes);
    assert_eq!(registry.get(0).unwrap().sensor_name, "IMU");
}
