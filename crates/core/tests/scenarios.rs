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

//! End-to-end seed scenarios exercising a full [`Supervisor`] run rather
//! than a single component in isolation.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use fractor_core::{
    queue::WorkQueue,
    result::ErrorCategory,
    supervisor::{PoolConfig, Supervisor, SupervisorConfig},
    work::Work,
    worker::{ProcessError, ProcessOutput, Worker, WorkerRegistry},
};

struct SquareWorker;

#[async_trait::async_trait]
impl Worker for SquareWorker {
    async fn process(&mut self, work: &Work) -> ProcessOutput {
        let n = work.input.as_i64().unwrap_or(0);
        Ok(serde_json::json!(n * n))
    }
}

#[tokio::test]
async fn squares_over_a_two_worker_pool() {
    let mut registry = WorkerRegistry::new();
    registry.register("square", || Box::new(SquareWorker));

    let queue = Arc::new(WorkQueue::new());
    let config = SupervisorConfig::builder()
        .pools(vec![PoolConfig { worker_class: "square".into(), num_workers: 2 }])
        .build();
    let supervisor = Supervisor::new(config, queue);

    for n in 1..=5 {
        supervisor.enqueue(Work::builder().input(serde_json::json!(n)).build());
    }

    let summary = supervisor.run(&registry).await.unwrap();
    assert_eq!(summary.succeeded, 5);
    assert_eq!(summary.failed, 0);

    let mut squares: Vec<i64> = supervisor
        .aggregator()
        .successes()
        .into_iter()
        .map(|wr| match wr.outcome {
            fractor_core::Outcome::Success(v) => v.as_i64().unwrap(),
            fractor_core::Outcome::Failure(_) => panic!("expected success"),
        })
        .collect();
    squares.sort_unstable();
    assert_eq!(squares, vec![1, 4, 9, 16, 25]);
}

struct RejectsNegative;

#[async_trait::async_trait]
impl Worker for RejectsNegative {
    async fn process(&mut self, work: &Work) -> ProcessOutput {
        let n = work.input.as_i64().unwrap_or(0);
        if n < 0 {
            let err: ProcessError = "invalid argument: negative input not allowed".into();
            return Err(err);
        }
        Ok(serde_json::json!(n))
    }
}

#[tokio::test]
async fn mixed_outcomes_classify_negative_inputs_as_validation_errors() {
    let mut registry = WorkerRegistry::new();
    registry.register("guarded", || Box::new(RejectsNegative));

    let queue = Arc::new(WorkQueue::new());
    let config = SupervisorConfig::builder()
        .pools(vec![PoolConfig { worker_class: "guarded".into(), num_workers: 2 }])
        .build();
    let supervisor = Supervisor::new(config, queue);

    for n in [1, -1, 2, -2, 3] {
        supervisor.enqueue(Work::builder().input(serde_json::json!(n)).build());
    }

    let summary = supervisor.run(&registry).await.unwrap();
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 2);

    for wr in supervisor.aggregator().errors() {
        assert_eq!(wr.failure().unwrap().error_category, ErrorCategory::Validation);
    }
}

struct SleepsThenEchoes;

#[async_trait::async_trait]
impl Worker for SleepsThenEchoes {
    async fn process(&mut self, work: &Work) -> ProcessOutput {
        let millis = work.input.get("sleep_ms").and_then(serde_json::Value::as_u64).unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok(work.input.clone())
    }
}

#[tokio::test]
async fn a_timed_out_worker_stays_alive_for_the_next_item() {
    let mut registry = WorkerRegistry::new();
    registry.register("sleeper", || Box::new(SleepsThenEchoes));

    let queue = Arc::new(WorkQueue::new());
    let config = SupervisorConfig::builder()
        .pools(vec![PoolConfig { worker_class: "sleeper".into(), num_workers: 1 }])
        .build();
    let supervisor = Supervisor::new(config, queue);

    supervisor.enqueue(
        Work::builder()
            .input(serde_json::json!({"sleep_ms": 200}))
            .timeout(Duration::from_millis(50))
            .build(),
    );
    supervisor.enqueue(Work::builder().input(serde_json::json!({"sleep_ms": 0})).build());

    let summary = supervisor.run(&registry).await.unwrap();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(
        supervisor.aggregator().errors()[0].failure().unwrap().error_category,
        ErrorCategory::Timeout
    );
}

struct EchoWorker;

#[async_trait::async_trait]
impl Worker for EchoWorker {
    async fn process(&mut self, work: &Work) -> ProcessOutput { Ok(work.input.clone()) }
}

/// Scenario 6: a continuous-mode supervisor fed entirely by a work-source
/// callback. The callback yields one item per poll for ten polls, then
/// nothing; `stop()` is called once all ten have landed, and the run must
/// still terminate with every worker closed.
#[tokio::test]
async fn continuous_mode_drains_a_work_source_then_stops_cleanly() {
    let mut registry = WorkerRegistry::new();
    registry.register("echo", || Box::new(EchoWorker));

    let queue = Arc::new(WorkQueue::new());
    let config = SupervisorConfig::builder()
        .pools(vec![PoolConfig { worker_class: "echo".into(), num_workers: 2 }])
        .continuous_mode(true)
        .timer_interval(Duration::from_millis(10))
        .build();
    let supervisor = Arc::new(Supervisor::new(config, queue));

    let produced = Arc::new(AtomicUsize::new(0));
    let produced_cb = Arc::clone(&produced);
    supervisor.register_work_callback(Box::new(move || {
        let n = produced_cb.fetch_add(1, Ordering::SeqCst);
        if n < 10 {
            vec![Work::builder().input(serde_json::json!(n)).build()]
        } else {
            Vec::new()
        }
    }));

    let stopper = Arc::clone(&supervisor);
    tokio::spawn(async move {
        loop {
            if stopper.aggregator().success_count() >= 10 {
                stopper.stop();
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    });

    let summary = supervisor.run(&registry).await.unwrap();
    assert_eq!(summary.succeeded, 10);
    assert_eq!(summary.failed, 0);
}
