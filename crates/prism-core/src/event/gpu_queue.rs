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

//! Deferred GPU work, queued by CPU-side code and executed on the render thread.

use super::bus::EventBus;
use crate::renderer::error::{RenderError, ResourceError};
use crate::renderer::traits::GraphicsDevice;
use std::fmt;
use std::sync::Mutex;

/// The point of the frame at which a deferred GPU event runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Runs before any command of the frame is recorded. Pipeline creation happens here.
    PreRender,
    /// Runs while render queues are being filled.
    QueueRender,
    /// Runs once the frame has been submitted.
    PostRender,
}

/// A one-shot task receiving the device it must create its objects with.
pub type GpuTask = Box<dyn FnOnce(&dyn GraphicsDevice) -> Result<(), ResourceError> + Send>;

/// A task scheduled for a given [`EventType`].
pub struct GpuEvent {
    /// When the task must run.
    pub event_type: EventType,
    /// A human readable label, used in logs.
    pub label: String,
    task: GpuTask,
}

impl fmt::Debug for GpuEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuEvent")
            .field("event_type", &self.event_type)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Single-producer, single-consumer handoff of GPU tasks to the render thread.
///
/// Producers call [`GpuEventQueue::send_event`] and return immediately. The render
/// thread calls [`GpuEventQueue::process`] once per [`EventType`] per frame; tasks
/// queued for another event type stay parked until their turn.
#[derive(Debug, Default)]
pub struct GpuEventQueue {
    bus: EventBus<GpuEvent>,
    parked: Mutex<Vec<GpuEvent>>,
}

impl GpuEventQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `task` to run at the next processing of `event_type`.
    ///
    /// ## Arguments
    /// * `event_type` - The frame point at which the task runs.
    /// * `label` - A label identifying the task in logs and errors.
    /// * `task` - The work itself.
    pub fn send_event<F>(&self, event_type: EventType, label: impl Into<String>, task: F)
    where
        F: FnOnce(&dyn GraphicsDevice) -> Result<(), ResourceError> + Send + 'static,
    {
        let label = label.into();
        log::trace!("Queueing {event_type:?} GPU event '{label}'.");
        self.bus.publish(GpuEvent {
            event_type,
            label,
            task: Box::new(task),
        });
    }

    /// Number of tasks still waiting for `event_type`.
    pub fn pending(&self, event_type: EventType) -> usize {
        let mut parked = self.lock_parked();
        parked.extend(self.bus.drain());
        parked
            .iter()
            .filter(|event| event.event_type == event_type)
            .count()
    }

    /// Runs every task queued for `event_type`, in submission order.
    ///
    /// A failing task does not prevent the remaining ones from running; it is not
    /// retried either.
    ///
    /// ## Returns
    /// The number of tasks executed.
    ///
    /// ## Errors
    /// * `RenderError::ResourceError` - The first failure reported by a task.
    pub fn process(
        &self,
        event_type: EventType,
        device: &dyn GraphicsDevice,
    ) -> Result<usize, RenderError> {
        let ready = {
            let mut parked = self.lock_parked();
            parked.extend(self.bus.drain());
            let (ready, waiting): (Vec<_>, Vec<_>) = parked
                .drain(..)
                .partition(|event| event.event_type == event_type);
            *parked = waiting;
            ready
        };

        let count = ready.len();
        let mut first_error = None;
        for event in ready {
            log::trace!("Running {:?} GPU event '{}'.", event.event_type, event.label);
            if let Err(e) = (event.task)(device) {
                log::error!("GPU event '{}' failed: {e}", event.label);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(count),
        }
    }

    fn lock_parked(&self) -> std::sync::MutexGuard<'_, Vec<GpuEvent>> {
        self.parked
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockGraphicsDevice;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn tasks_wait_for_their_event_type() {
        let device = MockGraphicsDevice::new();
        let queue = GpuEventQueue::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let r = runs.clone();
        queue.send_event(EventType::PostRender, "post", move |_| {
            r.fetch_add(10, Ordering::SeqCst);
            Ok(())
        });
        let r = runs.clone();
        queue.send_event(EventType::PreRender, "pre", move |_| {
            r.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(queue.pending(EventType::PreRender), 1);
        assert_eq!(queue.process(EventType::PreRender, &device).unwrap(), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(queue.pending(EventType::PostRender), 1);

        assert_eq!(queue.process(EventType::PostRender, &device).unwrap(), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 11);
        assert_eq!(queue.process(EventType::PostRender, &device).unwrap(), 0);
    }

    #[test]
    fn failure_is_reported_and_not_retried() {
        let device = MockGraphicsDevice::new();
        let queue = GpuEventQueue::new();
        let runs = Arc::new(AtomicUsize::new(0));

        queue.send_event(EventType::PreRender, "broken", |_| {
            Err(ResourceError::BackendError("boom".to_string()))
        });
        let r = runs.clone();
        queue.send_event(EventType::PreRender, "healthy", move |_| {
            r.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let err = queue.process(EventType::PreRender, &device).unwrap_err();
        assert!(matches!(err, RenderError::ResourceError(_)));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(queue.process(EventType::PreRender, &device).unwrap(), 0);
    }

    #[test]
    fn tasks_receive_the_device() {
        let device = MockGraphicsDevice::new();
        let queue = GpuEventQueue::new();
        queue.send_event(EventType::PreRender, "buffer", |device| {
            device
                .create_buffer(&crate::renderer::api::buffer::BufferDescriptor {
                    label: None,
                    size: 16,
                    usage: crate::renderer::api::buffer::BufferUsage::UNIFORM,
                    mapped_at_creation: false,
                })
                .map(|_| ())
        });
        queue.process(EventType::PreRender, &device).unwrap();
        assert_eq!(device.stats().buffers_created, 1);
    }
}
