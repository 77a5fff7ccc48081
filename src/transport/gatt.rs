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

// Connection contract implemented by the platform BLE stack

use async_trait::async_trait;
use std::sync::Arc;

use super::services::Characteristic;
use crate::error::Result;

/// Callback invoked with the raw value of every notification
pub type NotificationHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Primitive GATT operations on a connected device
///
/// Implementations do not need to serialise calls themselves; the client
/// never issues overlapping operations. Discovery and pairing happen before
/// a connection is handed to the client.
#[async_trait]
pub trait GattConnection: Send + Sync {
    /// Whether the link is currently up
    fn is_connected(&self) -> bool;

    /// Read the current value of a characteristic
    async fn read(&self, characteristic: Characteristic) -> Result<Vec<u8>>;

    /// Write a value to a characteristic
    async fn write(&self, characteristic: Characteristic, data: &[u8]) -> Result<()>;

    /// Start notifications and route every value to `handler`
    ///
    /// Handlers must be invoked in arrival order.
    async fn subscribe(
        &self,
        characteristic: Characteristic,
        handler: NotificationHandler,
    ) -> Result<()>;
}
