// Copyright 2025 eraflo
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

use super::material::Material;
use super::object::ObjectId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Emitted when an object's material is replaced.
#[derive(Debug, Clone)]
pub struct MaterialChanged {
    /// The object whose material changed.
    pub object: ObjectId,
    /// The material applied before the change.
    pub old: Arc<Material>,
    /// The material applied from now on.
    pub new: Arc<Material>,
}

/// Identifies one subscription to a [`MaterialSignal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

/// A list of subscribers notified of material changes.
///
/// Subscribers hand over the sending half of their own channel and drain it when
/// they are ready, so emitting never calls back into subscriber code.
#[derive(Debug, Default)]
pub struct MaterialSignal {
    next_id: AtomicU64,
    slots: Mutex<Vec<(ConnectionId, flume::Sender<MaterialChanged>)>>,
}

impl MaterialSignal {
    /// Creates a signal without subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `sender`; events are delivered until the connection is removed.
    pub fn connect(&self, sender: flume::Sender<MaterialChanged>) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock_slots().push((id, sender));
        id
    }

    /// Removes a subscription. Returns `false` when it was unknown.
    pub fn disconnect(&self, connection: ConnectionId) -> bool {
        let mut slots = self.lock_slots();
        let before = slots.len();
        slots.retain(|(id, _)| *id != connection);
        slots.len() != before
    }

    /// Delivers `event` to every subscriber.
    ///
    /// Subscribers whose receiver was dropped are pruned.
    pub fn emit(&self, event: MaterialChanged) {
        self.lock_slots().retain(|(id, sender)| {
            let delivered = sender.send(event.clone()).is_ok();
            if !delivered {
                log::debug!("Dropping material signal connection {id:?}: receiver is gone.");
            }
            delivered
        });
    }

    /// Number of live subscriptions.
    pub fn connection_count(&self) -> usize {
        self.lock_slots().len()
    }

    fn lock_slots(&self) -> MutexGuard<'_, Vec<(ConnectionId, flume::Sender<MaterialChanged>)>> {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change() -> MaterialChanged {
        MaterialChanged {
            object: ObjectId::new(1, 0),
            old: Arc::new(Material::new("old", Vec::new())),
            new: Arc::new(Material::new("new", Vec::new())),
        }
    }

    #[test]
    fn connected_receivers_get_events() {
        let signal = MaterialSignal::new();
        let (tx, rx) = flume::unbounded();
        let connection = signal.connect(tx);

        signal.emit(change());
        let event = rx.try_recv().expect("event delivered");
        assert_eq!(event.new.name, "new");

        assert!(signal.disconnect(connection));
        assert!(!signal.disconnect(connection));
        signal.emit(change());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dead_receivers_are_pruned() {
        let signal = MaterialSignal::new();
        let (tx, rx) = flume::unbounded();
        signal.connect(tx);
        drop(rx);
        signal.emit(change());
        assert_eq!(signal.connection_count(), 0);
    }
}
