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

//! Per-pass CPU timing, recorded by scoped guards.

use std::time::{Duration, Instant};

/// Accumulates the CPU time spent in the updates of one render pass.
#[derive(Debug, Clone)]
pub struct RenderPassTimer {
    name: String,
    category: String,
    samples: u32,
    total: Duration,
    last: Option<Duration>,
}

impl RenderPassTimer {
    /// Creates a timer with no sample.
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            samples: 0,
            total: Duration::ZERO,
            last: None,
        }
    }

    /// Starts measuring; the sample is recorded when the guard is dropped.
    pub fn start(&mut self) -> ScopedPassTimer<'_> {
        ScopedPassTimer {
            start: Instant::now(),
            timer: self,
        }
    }

    /// Name of the timed pass.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Category the pass reports under.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Number of recorded samples.
    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Duration of the last sample.
    pub fn last(&self) -> Option<Duration> {
        self.last
    }

    /// Mean duration of the samples.
    pub fn average(&self) -> Option<Duration> {
        (self.samples > 0).then(|| self.total / self.samples)
    }

    fn record(&mut self, elapsed: Duration) {
        self.samples += 1;
        self.total += elapsed;
        self.last = Some(elapsed);
        log::trace!(
            "[{}] {} took {:.3} ms.",
            self.category,
            self.name,
            elapsed.as_secs_f64() * 1000.0
        );
    }
}

/// Records the time elapsed since its creation into a [`RenderPassTimer`]
/// when dropped, early returns included.
#[derive(Debug)]
pub struct ScopedPassTimer<'a> {
    start: Instant,
    timer: &'a mut RenderPassTimer,
}

impl Drop for ScopedPassTimer<'_> {
    fn drop(&mut self) {
        self.timer.record(self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_records_on_drop() {
        let mut timer = RenderPassTimer::new("forward", "Opaque");
        assert_eq!(timer.average(), None);
        {
            let _guard = timer.start();
        }
        {
            let _guard = timer.start();
        }
        assert_eq!(timer.samples(), 2);
        assert!(timer.last().is_some());
        assert!(timer.average().is_some());
        assert_eq!(timer.name(), "forward");
        assert_eq!(timer.category(), "Opaque");
    }
}
