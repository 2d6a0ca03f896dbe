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

/// Manages a generic, thread-safe event channel.
///
/// The bus is generic over the event type `T`, so the same primitive carries
/// material change notifications between scene objects and UBO registries as
/// well as the boxed GPU tasks of the deferred event queue. Events only need to
/// be `Send`: GPU tasks are one-shot closures and cannot be cloned.
#[derive(Debug)]
pub struct EventBus<T: Send + 'static> {
    sender: flume::Sender<T>,
    receiver: flume::Receiver<T>,
}

impl<T: Send + 'static> EventBus<T> {
    /// Creates a new EventBus with an unbounded channel for a specific event type.
    ///
    /// ## Returns
    /// A new instance of the EventBus struct.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        log::debug!("EventBus<{}> initialized.", std::any::type_name::<T>());
        Self { sender, receiver }
    }

    /// Attempts to send an event, logging an error if the receiver is disconnected.
    ///
    /// ## Arguments
    /// * `event` - The event to be sent over the channel.
    pub fn publish(&self, event: T) {
        log::trace!("Publishing an event.");

        if let Err(e) = self.sender.send(event) {
            log::error!("Failed to send event: {e}. Receiver likely disconnected.");
        }
    }

    /// Returns a clone of the sender end of the channel.
    ///
    /// ## Returns
    /// A clone of the sender end of the channel.
    pub fn sender(&self) -> flume::Sender<T> {
        self.sender.clone()
    }

    /// Returns a reference to the receiver end of the channel.
    /// Intended for the owner of the bus to process events.
    pub fn receiver(&self) -> &flume::Receiver<T> {
        &self.receiver
    }

    /// Removes and returns every event currently queued, in send order.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }

    /// Number of events waiting in the channel.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Returns `true` when no event is waiting.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl<T: Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flume::{SendError, TryRecvError};
    use std::{thread, time::Duration};

    #[derive(Debug, Clone, PartialEq)]
    enum TestEvent {
        Resized { width: u32, height: u32 },
        MaterialSwapped { object: u32 },
        Flush,
    }

    #[test]
    fn event_bus_starts_empty() {
        let bus = EventBus::<TestEvent>::new();
        assert!(bus.is_empty());
        assert_eq!(bus.receiver().try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn publish_then_drain_preserves_order() {
        let bus = EventBus::<TestEvent>::new();
        bus.publish(TestEvent::Resized {
            width: 1,
            height: 2,
        });
        bus.publish(TestEvent::MaterialSwapped { object: 7 });
        bus.publish(TestEvent::Flush);
        assert_eq!(bus.len(), 3);

        let drained = bus.drain();
        assert_eq!(
            drained,
            vec![
                TestEvent::Resized {
                    width: 1,
                    height: 2
                },
                TestEvent::MaterialSwapped { object: 7 },
                TestEvent::Flush,
            ]
        );
        assert!(bus.is_empty());
    }

    #[test]
    fn non_clone_payloads_are_supported() {
        let bus = EventBus::<Box<dyn FnOnce() -> u32 + Send>>::new();
        bus.publish(Box::new(|| 42));
        let task = bus
            .receiver()
            .recv_timeout(Duration::from_millis(50))
            .expect("task should be queued");
        assert_eq!(task(), 42);
    }

    #[test]
    fn send_from_thread() {
        let bus = EventBus::<TestEvent>::new();
        let sender = bus.sender();

        let handle = thread::spawn(move || {
            sender
                .send(TestEvent::MaterialSwapped { object: 3 })
                .expect("Send from thread failed");
        });

        let received = bus
            .receiver()
            .recv_timeout(Duration::from_secs(1))
            .expect("Failed to receive event from thread");
        assert_eq!(received, TestEvent::MaterialSwapped { object: 3 });
        handle.join().expect("Thread join failed");
    }

    #[test]
    fn send_error_on_receiver_drop() {
        let bus = EventBus::<TestEvent>::new();
        let sender = bus.sender();
        drop(bus);

        match sender.send(TestEvent::Flush) {
            Err(SendError(_)) => {}
            Ok(()) => panic!("Send unexpectedly succeeded after receiver drop"),
        }
    }
}
