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

//! Collects [`WorkResult`]s and notifies registered listeners as they
//! arrive.

use std::sync::Mutex;

use tracing::warn;

use crate::result::WorkResult;

pub type ResultListener = Box<dyn Fn(&WorkResult) + Send + Sync + 'static>;
pub type ErrorListener = Box<dyn Fn(&WorkResult) + Send + Sync + 'static>;

#[derive(Default)]
struct State {
    successes: Vec<WorkResult>,
    errors: Vec<WorkResult>,
    result_listeners: Vec<ResultListener>,
    error_listeners: Vec<ErrorListener>,
}

/// Appends results to the correct list and synchronously fans them out to
/// every listener registered *before* the call — a listener registered
/// later only observes subsequent results.
#[derive(Default)]
pub struct ResultAggregator {
    state: Mutex<State>,
}

impl ResultAggregator {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    pub fn on_result(&self, listener: impl Fn(&WorkResult) + Send + Sync + 'static) {
        self.state.lock().expect("aggregator mutex poisoned").result_listeners.push(Box::new(listener));
    }

    pub fn on_error(&self, listener: impl Fn(&WorkResult) + Send + Sync + 'static) {
        self.state.lock().expect("aggregator mutex poisoned").error_listeners.push(Box::new(listener));
    }

    /// Records `wr` and invokes listeners. Listener panics are caught and
    /// logged so one faulty callback can't take down the supervisor's
    /// message loop.
    pub fn add_result(&self, wr: WorkResult) {
        let mut guard = self.state.lock().expect("aggregator mutex poisoned");
        if wr.is_success() {
            guard.successes.push(wr.clone());
            for listener in &guard.result_listeners {
                if let Err(panic) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| listener(&wr))) {
                    warn!(?panic, "result listener panicked");
                }
            }
        } else {
            guard.errors.push(wr.clone());
            for listener in &guard.error_listeners {
                if let Err(panic) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| listener(&wr))) {
                    warn!(?panic, "error listener panicked");
                }
            }
        }
    }

    #[must_use]
    pub fn success_count(&self) -> usize { self.state.lock().expect("aggregator mutex poisoned").successes.len() }

    #[must_use]
    pub fn error_count(&self) -> usize { self.state.lock().expect("aggregator mutex poisoned").errors.len() }

    #[must_use]
    pub fn successes(&self) -> Vec<WorkResult> {
        self.state.lock().expect("aggregator mutex poisoned").successes.clone()
    }

    #[must_use]
    pub fn errors(&self) -> Vec<WorkResult> {
        self.state.lock().expect("aggregator mutex poisoned").errors.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{atomic::{AtomicUsize, Ordering}, Arc};

    use super::*;
    use crate::work::Work;

    fn work() -> Work { Work::builder().input(serde_json::json!(1)).build() }

    #[test]
    fn splits_successes_and_errors_and_fires_listeners() {
        let agg = ResultAggregator::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        agg.on_result(move |_| { seen_clone.fetch_add(1, Ordering::SeqCst); });

        agg.add_result(WorkResult::success(work(), serde_json::json!(1)));
        agg.add_result(WorkResult::failure_with(
            work(),
            crate::result::ErrorCategory::Unknown,
            crate::result::ErrorSeverity::Error,
            "boom",
        ));

        assert_eq!(agg.success_count(), 1);
        assert_eq!(agg.error_count(), 1);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listener_registered_late_misses_earlier_results() {
        let agg = ResultAggregator::new();
        agg.add_result(WorkResult::success(work(), serde_json::json!(1)));
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        agg.on_result(move |_| { seen_clone.fetch_add(1, Ordering::SeqCst); });
        agg.add_result(WorkResult::success(work(), serde_json::json!(2)));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
