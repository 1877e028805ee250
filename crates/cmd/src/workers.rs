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

//! Built-in worker classes reachable by name from the `supervisor` and
//! `execute` commands. The core itself never depends on any of these — they
//! exist only so the CLI has something concrete to dispatch `WORKER_CLASS`
//! to without requiring every caller to compile their own binary.

use std::time::Duration;

use fractor_core::{
    work::Work,
    worker::{ProcessOutput, Worker, WorkerRegistry},
};

struct Square;

#[async_trait::async_trait]
impl Worker for Square {
    async fn process(&mut self, work: &Work) -> ProcessOutput {
        let n = work
            .input
            .as_f64()
            .ok_or_else(|| -> fractor_core::worker::ProcessError { "square input must be a number".into() })?;
        Ok(serde_json::json!(n * n))
    }

    fn name(&self) -> &str { "square" }
}

struct Echo;

#[async_trait::async_trait]
impl Worker for Echo {
    async fn process(&mut self, work: &Work) -> ProcessOutput { Ok(work.input.clone()) }

    fn name(&self) -> &str { "echo" }
}

/// Sleeps for `input.millis` (or `input` itself, if a bare number) before
/// echoing it back. Useful for exercising the timeout path from the CLI.
struct Sleep;

#[async_trait::async_trait]
impl Worker for Sleep {
    async fn process(&mut self, work: &Work) -> ProcessOutput {
        let millis = work
            .input
            .get("millis")
            .and_then(serde_json::Value::as_u64)
            .or_else(|| work.input.as_u64())
            .unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok(work.input.clone())
    }

    fn name(&self) -> &str { "sleep" }
}

pub fn registry() -> WorkerRegistry {
    let mut registry = WorkerRegistry::new();
    registry.register("square", || Box::new(Square));
    registry.register("echo", || Box::new(Echo));
    registry.register("sleep", || Box::new(Sleep));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_classes_are_registered() {
        let reg = registry();
        assert!(reg.contains("square"));
        assert!(reg.contains("echo"));
        assert!(reg.contains("sleep"));
        assert!(!reg.contains("missing"));
    }
}
