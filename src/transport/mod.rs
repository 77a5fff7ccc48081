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

// Transport module
//
// Provides a trait-based abstraction over the platform's GATT connection and
// the serial queue every device operation goes through. Nothing outside this
// module talks to the connection directly.

pub mod gatt;
pub mod queue;
pub mod services;

pub use gatt::{GattConnection, NotificationHandler};
pub use queue::{PendingOperation, TransportQueue};
pub use services::Characteristic;

use std::sync::Arc;
use tracing::debug;

use crate::error::{EarableError, Result};

/// Queue-backed access to a GATT connection
///
/// Cheap to clone; clones share the same queue and connection.
#[derive(Clone)]
pub struct GattClient {
    connection: Arc<dyn GattConnection>,
    queue: Arc<TransportQueue>,
}

impl GattClient {
    pub fn new(connection: Arc<dyn GattConnection>) -> Self {
        Self {
            connection,
            queue: Arc::new(TransportQueue::new()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Fail with a connection error unless the link is up
    pub fn ensure_connected(&self) -> Result<()> {
        check_connected(self.connection.as_ref())
    }

    pub async fn read(&self, characteristic: Characteristic) -> Result<Vec<u8>> {
        let connection = self.connection.clone();
        self.queue
            .enqueue(move || read_value(connection, characteristic))
            .await
    }

    pub async fn write(&self, characteristic: Characteristic, data: Vec<u8>) -> Result<()> {
        let connection = self.connection.clone();
        self.queue
            .enqueue(move || write_value(connection, characteristic, data))
            .await
    }

    pub async fn subscribe(
        &self,
        characteristic: Characteristic,
        handler: NotificationHandler,
    ) -> Result<()> {
        let connection = self.connection.clone();
        self.queue
            .enqueue(move || start_notifications(connection, characteristic, handler))
            .await
    }

    pub fn queue(&self) -> &TransportQueue {
        &self.queue
    }
}

async fn read_value(
    connection: Arc<dyn GattConnection>,
    characteristic: Characteristic,
) -> Result<Vec<u8>> {
    check_connected(connection.as_ref())?;
    let value = connection.read(characteristic).await?;
    debug!("Read {} bytes from {}", value.len(), characteristic);
    Ok(value)
}

async fn write_value(
    connection: Arc<dyn GattConnection>,
    characteristic: Characteristic,
    data: Vec<u8>,
) -> Result<()> {
    check_connected(connection.as_ref())?;
    connection.write(characteristic, &data).await?;
    debug!("Wrote {} bytes to {}", data.len(), characteristic);
    Ok(())
}

async fn start_notifications(
    connection: Arc<dyn GattConnection>,
    characteristic: Characteristic,
    handler: NotificationHandler,
) -> Result<()> {
    check_connected(connection.as_ref())?;
    connection.subscribe(characteristic, handler).await?;
    debug!("Subscribed to notifications on {}", characteristic);
    Ok(())
}

fn check_connected(connection: &dyn GattConnection) -> Result<()> {
    if connection.is_connected() {
        Ok(())
    } else {
        Err(EarableError::Connection(
            "no active GATT connection".to_string(),
        ))
    }
}
