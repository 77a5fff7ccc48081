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

// GATT services and characteristics exposed by the earable firmware

use std::fmt;
use uuid::Uuid;

/// A characteristic together with the primary service that hosts it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Characteristic {
    pub name: &'static str,
    pub service: Uuid,
    pub uuid: Uuid,
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.uuid)
    }
}

const fn characteristic(name: &'static str, service: u128, uuid: u128) -> Characteristic {
    Characteristic {
        name,
        service: Uuid::from_u128(service),
        uuid: Uuid::from_u128(uuid),
    }
}

pub const DEVICE_INFO_SERVICE: Uuid = Uuid::from_u128(0x45622510_6468_465a_b141_0b9b0f96b468);
pub const BATTERY_SERVICE: Uuid = Uuid::from_u128(0x0000180f_0000_1000_8000_00805f9b34fb);
pub const PARSE_INFO_SERVICE: Uuid = Uuid::from_u128(0xcaa25cb7_7e1b_44f2_adc9_e8c06c9ced43);
pub const SENSOR_SERVICE: Uuid = Uuid::from_u128(0x34c2e3bb_34aa_11eb_adc1_0242ac120002);
pub const BUTTON_SERVICE: Uuid = Uuid::from_u128(0x29c10bdc_4773_11ee_be56_0242ac120002);
pub const LED_SERVICE: Uuid = Uuid::from_u128(0x81040a2e_4819_11ee_be56_0242ac120002);
pub const AUDIO_SERVICE: Uuid = Uuid::from_u128(0x5669146e_476d_11ee_be56_0242ac120002);
pub const SENSOR_RECORDING_SERVICE: Uuid =
    Uuid::from_u128(0x7a8b9c0d_1234_5678_9abc_def012345678);

pub const DEVICE_IDENTIFIER: Characteristic = characteristic(
    "device_identifier",
    0x45622510_6468_465a_b141_0b9b0f96b468,
    0x45622511_6468_465a_b141_0b9b0f96b468,
);
pub const FIRMWARE_REVISION: Characteristic = characteristic(
    "firmware_revision",
    0x45622510_6468_465a_b141_0b9b0f96b468,
    0x45622512_6468_465a_b141_0b9b0f96b468,
);
pub const HARDWARE_GENERATION: Characteristic = characteristic(
    "hardware_generation",
    0x45622510_6468_465a_b141_0b9b0f96b468,
    0x45622513_6468_465a_b141_0b9b0f96b468,
);

pub const BATTERY_LEVEL: Characteristic = characteristic(
    "battery_level",
    0x0000180f_0000_1000_8000_00805f9b34fb,
    0x00002a19_0000_1000_8000_00805f9b34fb,
);
pub const BATTERY_STATE: Characteristic = characteristic(
    "battery_state",
    0x0000180f_0000_1000_8000_00805f9b34fb,
    0x00002a1a_0000_1000_8000_00805f9b34fb,
);

pub const SCHEME: Characteristic = characteristic(
    "scheme",
    0xcaa25cb7_7e1b_44f2_adc9_e8c06c9ced43,
    0xcaa25cb8_7e1b_44f2_adc9_e8c06c9ced43,
);

pub const SENSOR_CONFIGURATION: Characteristic = characteristic(
    "sensor_configuration",
    0x34c2e3bb_34aa_11eb_adc1_0242ac120002,
    0x34c2e3bd_34aa_11eb_adc1_0242ac120002,
);
pub const SENSOR_DATA: Characteristic = characteristic(
    "sensor_data",
    0x34c2e3bb_34aa_11eb_adc1_0242ac120002,
    0x34c2e3bc_34aa_11eb_adc1_0242ac120002,
);

pub const BUTTON_STATE: Characteristic = characteristic(
    "button_state",
    0x29c10bdc_4773_11ee_be56_0242ac120002,
    0x29c10f38_4773_11ee_be56_0242ac120002,
);

pub const LED_STATE: Characteristic = characteristic(
    "led_state",
    0x81040a2e_4819_11ee_be56_0242ac120002,
    0x81040e7a_4819_11ee_be56_0242ac120002,
);

pub const AUDIO_SOURCE: Characteristic = characteristic(
    "audio_source",
    0x5669146e_476d_11ee_be56_0242ac120002,
    0x566916a8_476d_11ee_be56_0242ac120002,
);
pub const AUDIO_STATE: Characteristic = characteristic(
    "audio_state",
    0x5669146e_476d_11ee_be56_0242ac120002,
    0x566916a9_476d_11ee_be56_0242ac120002,
);

pub const RECORDING_CONTROL: Characteristic = characteristic(
    "recording_control",
    0x7a8b9c0d_1234_5678_9abc_def012345678,
    0x7a8b9c0e_1234_5678_9abc_def012345678,
);
pub const RECORDING_STATUS: Characteristic = characteristic(
    "recording_status",
    0x7a8b9c0d_1234_5678_9abc_def012345678,
    0x7a8b9c0f_1234_5678_9abc_def012345678,
);
pub const RECORDING_CONFIG: Characteristic = characteristic(
    "recording_config",
    0x7a8b9c0d_1234_5678_9abc_def012345678,
    0x7a8b9c10_1234_5678_9abc_def012345678,
);

/// Every primary service the client needs access to when pairing
pub const ALL_SERVICES: [Uuid; 8] = [
    DEVICE_INFO_SERVICE,
    BATTERY_SERVICE,
    PARSE_INFO_SERVICE,
    SENSOR_SERVICE,
    BUTTON_SERVICE,
    LED_SERVICE,
    AUDIO_SERVICE,
    SENSOR_RECORDING_SERVICE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_characteristics_belong_to_their_service() {
        assert_eq!(SCHEME.service, PARSE_INFO_SERVICE);
        assert_eq!(SENSOR_DATA.service, SENSOR_SERVICE);
        assert_eq!(RECORDING_CONFIG.service, SENSOR_RECORDING_SERVICE);
        assert_eq!(BATTERY_STATE.service, BATTERY_SERVICE);
    }

    #[test]
    fn test_uuid_text_form() {
        assert_eq!(
            BATTERY_LEVEL.uuid.to_string(),
            "00002a19-0000-1000-8000-00805f9b34fb"
        );
    }
}
