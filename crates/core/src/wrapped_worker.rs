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

//! Hosts a single [`Worker`] in its own task, isolated from the supervisor's
//! heap and from every other worker's.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::mpsc;

use crate::{
    id::WorkerId,
    result::WorkResult,
    work::Work,
    worker::Worker,
};

/// A message a `WrappedWorker` sends on its outbound channel. The supervisor
/// fans all of these into one receiver (see [`crate::supervisor`]).
#[derive(Debug)]
pub enum OutboundMessage {
    Initialize { worker_id: WorkerId },
    Result { worker_id: WorkerId, work_result: Box<WorkResult> },
    Error { worker_id: WorkerId, work_result: Box<WorkResult> },
    Shutdown { worker_id: WorkerId },
    /// The host task panicked or its channel closed unexpectedly; the
    /// supervisor must drop this worker and cannot recover the in-flight
    /// work item.
    HostDied { worker_id: WorkerId },
}

#[derive(Debug)]
enum Inbound {
    Work(Work),
    Shutdown,
}

/// Handle to a worker running in its own task. Cloning is cheap; every
/// clone shares the same inbound channel and closed flag.
#[derive(Clone)]
pub struct WrappedWorker {
    id: WorkerId,
    inbound: mpsc::Sender<Inbound>,
    closed: Arc<AtomicBool>,
}

impl WrappedWorker {
    /// Spawns the isolated execution context and returns a handle to it.
    /// Emits `{initialize}` on `outbound` as its first act.
    pub fn start(
        mut worker: Box<dyn Worker>,
        outbound: mpsc::UnboundedSender<OutboundMessage>,
    ) -> Self {
        let id = WorkerId::new();
        let (tx, mut rx) = mpsc::channel::<Inbound>(1);
        let closed = Arc::new(AtomicBool::new(false));
        let closed_task = Arc::clone(&closed);

        tokio::spawn(async move {
            if outbound.send(OutboundMessage::Initialize { worker_id: id }).is_err() {
                closed_task.store(true, Ordering::SeqCst);
                return;
            }

            while let Some(msg) = rx.recv().await {
                match msg {
                    Inbound::Shutdown => {
                        let _ = outbound.send(OutboundMessage::Shutdown { worker_id: id });
                        break;
                    }
                    Inbound::Work(work) => {
                        let effective_timeout = work.timeout.or_else(|| worker.timeout());
                        let started = tokio::time::Instant::now();

                        let outcome = match effective_timeout {
                            Some(d) => tokio::time::timeout(d, worker.process(&work)).await,
                            None => Ok(worker.process(&work).await),
                        };
                        let elapsed = started.elapsed();

                        let work_result = match outcome {
                            Err(_elapsed) => WorkResult::failure_with(
                                work,
                                crate::result::ErrorCategory::Timeout,
                                crate::result::ErrorSeverity::Error,
                                format!("work exceeded its timeout after {elapsed:?}"),
                            ),
                            Ok(Ok(value)) => WorkResult::success(work, value),
                            Ok(Err(err)) => WorkResult::from_error(work, err.as_ref()),
                        };

                        let message = if work_result.is_success() {
                            OutboundMessage::Result {
                                worker_id: id,
                                work_result: Box::new(work_result),
                            }
                        } else {
                            OutboundMessage::Error {
                                worker_id: id,
                                work_result: Box::new(work_result),
                            }
                        };
                        if outbound.send(message).is_err() {
                            break;
                        }
                    }
                }
            }
            closed_task.store(true, Ordering::SeqCst);
        });

        Self { id, inbound: tx, closed }
    }

    #[must_use]
    pub const fn id(&self) -> WorkerId { self.id }

    /// Non-blocking enqueue. Returns `false` if the worker has already
    /// closed.
    #[must_use]
    pub fn send_work(&self, work: Work) -> bool {
        self.inbound.try_send(Inbound::Work(work)).is_ok()
    }

    /// Non-blocking shutdown request. Returns `false` if already closed.
    #[must_use]
    pub fn send_shutdown(&self) -> bool { self.inbound.try_send(Inbound::Shutdown).is_ok() }

    pub fn close(&self) { self.closed.store(true, Ordering::SeqCst); }

    /// Reflects observed state; a plain atomic load, so it never blocks.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.closed.load(Ordering::SeqCst) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::ProcessOutput;

    struct Square;

    #[async_trait::async_trait]
    impl Worker for Square {
        async fn process(&mut self, work: &Work) -> ProcessOutput {
            let n = work.input.as_i64().unwrap_or(0);
            Ok(serde_json::json!(n * n))
        }
    }

    struct Slow;

    #[async_trait::async_trait]
    impl Worker for Slow {
        async fn process(&mut self, _work: &Work) -> ProcessOutput {
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            Ok(serde_json::json!("done"))
        }
    }

    #[tokio::test]
    async fn processes_one_item_and_reports_success() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let w = WrappedWorker::start(Box::new(Square), tx);
        assert!(matches!(rx.recv().await, Some(OutboundMessage::Initialize { .. })));

        let work = Work::builder().input(serde_json::json!(6)).build();
        assert!(w.send_work(work));
        match rx.recv().await {
            Some(OutboundMessage::Result { work_result, .. }) => {
                assert!(work_result.is_success());
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn timeout_is_reported_and_worker_stays_alive() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let w = WrappedWorker::start(Box::new(Slow), tx);
        let _ = rx.recv().await; // initialize

        let work = Work::builder()
            .input(serde_json::json!(null))
            .timeout(std::time::Duration::from_millis(50))
            .build();
        assert!(w.send_work(work));
        match rx.recv().await {
            Some(OutboundMessage::Error { work_result, .. }) => {
                assert_eq!(
                    work_result.failure().unwrap().error_category,
                    crate::result::ErrorCategory::Timeout
                );
            }
            other => panic!("unexpected message: {other:?}"),
        }
        assert!(!w.is_closed());
    }
}
