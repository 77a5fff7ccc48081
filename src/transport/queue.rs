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

// Serial operation queue for the shared GATT link
//
// The link cannot multiplex requests, so every read, write and subscribe is
// funnelled through one FIFO drained by a single worker task. At most one
// operation is in flight; a failing operation only fails its own caller.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::{EarableError, Result};

type Job = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

/// FIFO queue with a single consumer task
///
/// Must be created inside a tokio runtime. Dropping the queue lets the worker
/// finish the jobs already submitted and then exit.
pub struct TransportQueue {
    sender: mpsc::UnboundedSender<Job>,
    pending: Arc<AtomicUsize>,
}

/// Handle to a submitted operation's eventual result
pub struct PendingOperation<T> {
    receiver: oneshot::Receiver<Result<T>>,
}

impl<T> PendingOperation<T> {
    pub async fn wait(self) -> Result<T> {
        self.receiver.await.map_err(|_| {
            EarableError::Connection("transport queue closed before the operation completed".to_string())
        })?
    }
}

impl TransportQueue {
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();

        tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                job().await;
            }
            debug!("Transport queue closed");
        });

        Self {
            sender,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Submit an operation and wait for its result
    pub async fn enqueue<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        self.submit(operation)?.wait().await
    }

    /// Append an operation to the queue without waiting for it
    ///
    /// Submission order is execution order.
    pub fn submit<F, Fut, T>(&self, operation: F) -> Result<PendingOperation<T>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (reply, receiver) = oneshot::channel();
        let pending = self.pending.clone();

        let job: Job = Box::new(move || {
            Box::pin(async move {
                // Run on its own task so a panicking operation can't take the worker down.
                let outcome = match tokio::spawn(operation()).await {
                    Ok(result) => result,
                    Err(join_error) => Err(EarableError::Transport(format!(
                        "operation aborted: {}",
                        join_error
                    ))),
                };

                if let Err(e) = &outcome {
                    warn!("GATT operation failed: {}", e);
                }

                pending.fetch_sub(1, Ordering::AcqRel);
                // The caller may have stopped waiting; the operation still ran.
                let _ = reply.send(outcome);
            })
        });

        self.pending.fetch_add(1, Ordering::AcqRel);
        if self.sender.send(job).is_err() {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            return Err(EarableError::Connection(
                "transport queue worker has stopped".to_string(),
            ));
        }

        Ok(PendingOperation { receiver })
    }

    /// Operations submitted but not yet finished
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }
}

impl Default for TransportQueue {
    fn default() -> Self {
        Self::new()
    }
}
