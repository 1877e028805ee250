// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Periodically samples queue depth, latency, and throughput while the
//! supervisor runs.

use std::{
    sync::{
        atomic::{AtomicI64, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio_util::sync::CancellationToken;

use crate::metrics::MetricsRecorder;

#[derive(Debug, Default)]
struct Samples {
    depth_sum: AtomicU64,
    depth_max: AtomicI64,
    sample_count: AtomicU64,
    processed_at_start: AtomicU64,
}

/// A cooperative task sampling queue depth and worker counts on a fixed
/// interval, stopping as soon as its cancellation token fires — never a
/// detached OS thread.
pub struct PerformanceMonitor {
    samples: Arc<Samples>,
    cancel: CancellationToken,
}

impl PerformanceMonitor {
    #[must_use]
    pub fn new() -> Self { Self { samples: Arc::new(Samples::default()), cancel: CancellationToken::new() } }

    pub fn spawn<F>(
        &self,
        sample_interval: Duration,
        recorder: Arc<dyn MetricsRecorder>,
        queue_depth: F,
    ) where
        F: Fn() -> i64 + Send + Sync + 'static,
    {
        let samples = Arc::clone(&self.samples);
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(sample_interval) => {
                        let depth = queue_depth();
                        recorder.record_queue_depth(depth);
                        samples.depth_sum.fetch_add(depth.max(0) as u64, Ordering::Relaxed);
                        samples.sample_count.fetch_add(1, Ordering::Relaxed);
                        let prev_max = samples.depth_max.load(Ordering::Relaxed);
                        if depth > prev_max {
                            samples.depth_max.store(depth, Ordering::Relaxed);
                        }
                    }
                }
            }
        });
    }

    #[must_use]
    pub fn average_queue_depth(&self) -> f64 {
        let count = self.samples.sample_count.load(Ordering::Relaxed);
        if count == 0 {
            0.0
        } else {
            self.samples.depth_sum.load(Ordering::Relaxed) as f64 / count as f64
        }
    }

    #[must_use]
    pub fn max_queue_depth(&self) -> i64 { self.samples.depth_max.load(Ordering::Relaxed) }

    pub fn stop(&self) { self.cancel.cancel(); }
}

impl Default for PerformanceMonitor {
    fn default() -> Self { Self::new() }
}
