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

//! The user-supplied contract a [`crate::wrapped_worker::WrappedWorker`]
//! hosts.

use std::time::Duration;

use crate::work::Work;

pub type ProcessError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A raw processing outcome. `Ok` is wrapped into a successful
/// [`crate::result::WorkResult`] by the host; `Err` is classified per the
/// inference table in [`crate::result::ErrorCategory::infer`].
pub type ProcessOutput = Result<serde_json::Value, ProcessError>;

/// User code implementing `process(Work) -> result`.
///
/// A `Worker` is constructed once per `WrappedWorker` and is **not required
/// to be `Sync`**: the host guarantees it is only ever driven by the single
/// task that owns it, matching the "not safe for concurrent invocation"
/// contract — one worker, one in-flight item, at a time.
#[async_trait::async_trait]
pub trait Worker: Send + 'static {
    async fn process(&mut self, work: &Work) -> ProcessOutput;

    /// Used in trace lines and as the `worker` label on metrics; defaults to
    /// the type name.
    fn name(&self) -> &str { std::any::type_name::<Self>() }

    /// Default per-item timeout when `work.timeout` is absent. `None` means
    /// unbounded.
    fn timeout(&self) -> Option<Duration> { None }
}

/// Registers concrete [`Worker`] constructors under a name, giving the CLI
/// path (`fractor-cmd supervisor WORKER_CLASS ...`) a way to instantiate user
/// workers without the core depending on any specific worker crate.
pub type WorkerFactory = dyn Fn() -> Box<dyn Worker> + Send + Sync + 'static;

#[derive(Default)]
pub struct WorkerRegistry {
    factories: std::collections::HashMap<String, Box<WorkerFactory>>,
}

impl WorkerRegistry {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    pub fn register(
        &mut self,
        worker_class: impl Into<String>,
        factory: impl Fn() -> Box<dyn Worker> + Send + Sync + 'static,
    ) {
        self.factories.insert(worker_class.into(), Box::new(factory));
    }

    #[must_use]
    pub fn build(&self, worker_class: &str) -> Option<Box<dyn Worker>> {
        self.factories.get(worker_class).map(|f| f())
    }

    #[must_use]
    pub fn contains(&self, worker_class: &str) -> bool { self.factories.contains_key(worker_class) }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait::async_trait]
    impl Worker for Echo {
        async fn process(&mut self, work: &Work) -> ProcessOutput { Ok(work.input.clone()) }
    }

    #[test]
    fn registry_builds_by_name() {
        let mut reg = WorkerRegistry::new();
        reg.register("echo", || Box::new(Echo));
        assert!(reg.contains("echo"));
        assert!(reg.build("echo").is_some());
        assert!(reg.build("missing").is_none());
    }
}
