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

//! Observer registries for device events
//!
//! Every event kind gets its own typed [`Subscribers`] list. Callbacks run
//! synchronously, in registration order, on the thread that delivers the
//! event. A callback that panics is logged and skipped; the remaining
//! subscribers still receive the event.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use tracing::error;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub struct Subscribers<T> {
    name: &'static str,
    callbacks: RwLock<Vec<Callback<T>>>,
}

impl<T> Subscribers<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            callbacks: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut callbacks = self
            .callbacks
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        callbacks.push(Arc::new(callback));
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every subscriber, isolating each invocation
    ///
    /// Returns the number of callbacks that completed without panicking.
    pub fn notify(&self, event: &T) -> usize {
        let mut delivered = 0;
        // Callbacks may subscribe further listeners; don't hold the lock while calling out.
        for (index, callback) in self.snapshot().iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(()) => delivered += 1,
                Err(_) => error!(
                    "Subscriber {} of '{}' panicked; continuing with the next one",
                    index, self.name
                ),
            }
        }
        delivered
    }

    fn snapshot(&self) -> Vec<Callback<T>> {
        self.callbacks
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_notify_in_registration_order() {
        let subscribers = Subscribers::<u8>::new("test");
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));

        for tag in 0..3u8 {
            let seen = seen.clone();
            subscribers.subscribe(move |value: &u8| {
                seen.lock().unwrap().push((tag, *value));
            });
        }

        assert_eq!(subscribers.notify(&7), 3);
        assert_eq!(*seen.lock().unwrap(), vec![(0, 7), (1, 7), (2, 7)]);
    }

    #[test]
    fn test_panicking_subscriber_is_isolated() {
        let subscribers = Subscribers::<u8>::new("test");
        let count = Arc::new(AtomicUsize::new(0));

        subscribers.subscribe(|_| panic!("boom"));
        let counter = count.clone();
        subscribers.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(subscribers.notify(&1), 1);
        assert_eq!(subscribers.notify(&2), 1);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_empty_registry() {
        let subscribers = Subscribers::<String>::new("empty");
        assert!(subscribers.is_empty());
        assert_eq!(subscribers.notify(&"x".to_string()), 0);
    }
}
