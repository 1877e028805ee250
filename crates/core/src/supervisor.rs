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

//! The central coordinator: owns the queue, the worker registry, and every
//! lifecycle decision from startup through shutdown.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    aggregator::ResultAggregator,
    distribution::WorkDistributionManager,
    err::{self, Result},
    error_reporter::ErrorReporter,
    metrics::{MetricsRecorder, NullRecorder},
    monitor::PerformanceMonitor,
    tracer::{self, TraceContext, TraceEvent},
    work::Work,
    worker::WorkerRegistry,
    wrapped_worker::{OutboundMessage, WrappedWorker},
};

pub use crate::distribution::WorkSource;

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub worker_class: String,
    pub num_workers: usize,
}

/// A nullary producer of additional work, polled once per main-loop
/// iteration while the queue is empty and an idle worker exists. An empty
/// vec signals "nothing right now", not "never again".
pub type WorkCallback = Box<dyn FnMut() -> Vec<Work> + Send + 'static>;

#[derive(bon::Builder)]
pub struct SupervisorConfig {
    pub pools: Vec<PoolConfig>,
    #[builder(default = false)]
    pub continuous_mode: bool,
    #[builder(default = false)]
    pub debug: bool,
    #[builder(default = false)]
    pub enable_performance_monitor: bool,
    #[builder(into, default = Duration::from_secs(10))]
    pub shutdown_timeout: Duration,
    #[builder(into, default = Duration::from_millis(100))]
    pub timer_interval: Duration,
}

enum Wakeup {
    NewWork,
    Shutdown,
    Timer,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    pub succeeded: u64,
    pub failed: u64,
}

impl RunSummary {
    #[must_use]
    pub const fn had_failures(&self) -> bool { self.failed > 0 }
}

/// Owns the queue, idle set, registry, aggregator, reporter, and every
/// `WrappedWorker` for one run. Not restartable: [`Supervisor::run`]
/// consumes `self`.
pub struct Supervisor {
    config: SupervisorConfig,
    queue: Arc<dyn WorkSource>,
    distribution: Arc<WorkDistributionManager<dyn WorkSource>>,
    aggregator: Arc<ResultAggregator>,
    reporter: Arc<ErrorReporter>,
    recorder: Arc<dyn MetricsRecorder>,
    monitor: PerformanceMonitor,
    worker_class_by_id: std::sync::Mutex<std::collections::HashMap<crate::id::WorkerId, String>>,
    total_enqueued: AtomicU64,
    stop: CancellationToken,
    work_callbacks: std::sync::Mutex<Vec<WorkCallback>>,
}

impl Supervisor {
    #[must_use]
    pub fn new(config: SupervisorConfig, queue: Arc<dyn WorkSource>) -> Self {
        Self {
            config,
            distribution: Arc::new(WorkDistributionManager::new(Arc::clone(&queue))),
            queue,
            aggregator: Arc::new(ResultAggregator::new()),
            reporter: Arc::new(ErrorReporter::new()),
            recorder: Arc::new(NullRecorder),
            monitor: PerformanceMonitor::new(),
            worker_class_by_id: std::sync::Mutex::new(std::collections::HashMap::new()),
            total_enqueued: AtomicU64::new(0),
            stop: CancellationToken::new(),
            work_callbacks: std::sync::Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_metrics_recorder(mut self, recorder: Arc<dyn MetricsRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    #[must_use]
    pub fn aggregator(&self) -> &ResultAggregator { &self.aggregator }

    #[must_use]
    pub fn error_reporter(&self) -> &ErrorReporter { &self.reporter }

    /// Enqueues one item of initial (batch) work. Call before [`Self::run`].
    pub fn enqueue(&self, work: Work) -> bool {
        if self.queue.enqueue(work) {
            self.total_enqueued.fetch_add(1, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    /// Registers a work-source callback, polled once per iteration in
    /// continuous mode while the queue is empty and a worker is idle.
    pub fn register_work_callback(&self, callback: WorkCallback) {
        self.work_callbacks.lock().expect("callbacks mutex poisoned").push(callback);
    }

    /// Requests a graceful stop. Safe to call from any task, including a
    /// signal handler.
    pub fn stop(&self) { self.stop.cancel(); }

    /// Runs pools built from `registry` until the termination condition for
    /// the configured mode holds.
    pub async fn run(&self, registry: &WorkerRegistry) -> Result<RunSummary> {
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<OutboundMessage>();
        let (wakeup_tx, mut wakeup_rx) = mpsc::unbounded_channel::<Wakeup>();

        for pool in &self.config.pools {
            if pool.num_workers == 0 {
                return err::InvalidPoolSizeSnafu {
                    worker_class: pool.worker_class.clone(),
                    num_workers: pool.num_workers,
                }
                .fail();
            }
            for _ in 0..pool.num_workers {
                let Some(worker) = registry.build(&pool.worker_class) else {
                    return err::UnknownWorkerClassSnafu { name: pool.worker_class.clone() }.fail();
                };
                let handle = WrappedWorker::start(worker, outbound_tx.clone());
                self.worker_class_by_id
                    .lock()
                    .expect("worker_class_by_id mutex poisoned")
                    .insert(handle.id(), pool.worker_class.clone());
                self.distribution.register(handle);
            }
        }

        let stop_for_signal = self.stop.clone();
        crate::signal::install(stop_for_signal, || {
            warn!("status snapshot requested (SIGUSR1)");
        });

        {
            let stop = self.stop.clone();
            let wakeup_tx = wakeup_tx.clone();
            tokio::spawn(async move {
                stop.cancelled().await;
                let _ = wakeup_tx.send(Wakeup::Shutdown);
            });
        }

        let has_callbacks = !self.work_callbacks.lock().expect("callbacks mutex poisoned").is_empty();
        if self.config.continuous_mode && has_callbacks {
            let wakeup_tx = wakeup_tx.clone();
            let stop = self.stop.clone();
            let interval = self.config.timer_interval;
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        () = stop.cancelled() => break,
                        () = tokio::time::sleep(interval) => {
                            if wakeup_tx.send(Wakeup::Timer).is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }

        if self.config.enable_performance_monitor {
            let queue = Arc::clone(&self.queue);
            let recorder = Arc::clone(&self.recorder);
            self.monitor.spawn(Duration::from_secs(1), recorder, move || queue.len() as i64);
        }

        self.distribute_initial(&wakeup_tx);

        let mut shutting_down = false;
        loop {
            let processed = self.aggregator.success_count() as u64 + self.aggregator.error_count() as u64;
            let total = self.total_enqueued.load(Ordering::SeqCst);
            if !self.config.continuous_mode && processed >= total {
                shutting_down = true;
                self.begin_shutdown(&wakeup_tx);
            }

            if self.config.continuous_mode {
                let mut callbacks = self.work_callbacks.lock().expect("callbacks mutex poisoned");
                let mut added = false;
                for cb in callbacks.iter_mut() {
                    for work in cb() {
                        if self.enqueue(work) {
                            added = true;
                        }
                    }
                }
                drop(callbacks);
                if added {
                    self.distribution.distribute_to_idle_workers();
                }
            }

            let alive = self.distribution.alive_count();
            if alive == 0 {
                if shutting_down || self.stop.is_cancelled() {
                    break;
                }
                if !self.config.continuous_mode {
                    // No worker remains to account for the gap between what
                    // was enqueued and what has terminated — either work is
                    // stranded in the queue or a worker died mid-item.
                    return err::StalledBatchSnafu { processed, total_enqueued: total }.fail();
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
                continue;
            }

            tokio::select! {
                msg = wakeup_rx.recv() => {
                    match msg {
                        Some(Wakeup::Shutdown) => {
                            shutting_down = true;
                            self.begin_shutdown(&wakeup_tx);
                        }
                        Some(Wakeup::NewWork | Wakeup::Timer) | None => {}
                    }
                }
                msg = outbound_rx.recv() => {
                    if let Some(msg) = msg {
                        self.route(msg);
                    }
                }
            }
        }

        self.shutdown_sequence(registry, self.config.shutdown_timeout).await;

        Ok(RunSummary {
            succeeded: self.aggregator.success_count() as u64,
            failed: self.aggregator.error_count() as u64,
        })
    }

    fn distribute_initial(&self, wakeup_tx: &mpsc::UnboundedSender<Wakeup>) {
        let _ = wakeup_tx.send(Wakeup::NewWork);
    }

    /// Cancels `stop`, closes the queue, and signals every worker the
    /// distribution manager currently has no work lined up for: an idle
    /// worker produces no further `{result}`/`{error}` of its own, so
    /// without this it would never be told to close.
    fn begin_shutdown(&self, wakeup_tx: &mpsc::UnboundedSender<Wakeup>) {
        self.stop.cancel();
        self.queue.close();
        for worker_id in self.distribution.idle_worker_ids() {
            if let Some(worker) = self.distribution.get(worker_id) {
                let _ = worker.send_shutdown();
            }
        }
        let _ = wakeup_tx.send(Wakeup::Shutdown);
    }

    fn worker_class_of(&self, worker_id: crate::id::WorkerId) -> String {
        self.worker_class_by_id
            .lock()
            .expect("worker_class_by_id mutex poisoned")
            .get(&worker_id)
            .cloned()
            .unwrap_or_default()
    }

    /// If batch mode has accounted for all enqueued work, tell `worker_id`
    /// to shut down; otherwise try to give it the next item, and failing
    /// that mark it idle.
    fn assign_or_retire(&self, worker_id: crate::id::WorkerId) {
        if self.distribution.assign_work_to_worker(worker_id) {
            return;
        }
        let processed = self.aggregator.success_count() as u64 + self.aggregator.error_count() as u64;
        let total = self.total_enqueued.load(Ordering::SeqCst);
        let all_accounted = !self.config.continuous_mode && processed >= total;
        if all_accounted || self.stop.is_cancelled() {
            if let Some(worker) = self.distribution.get(worker_id) {
                let _ = worker.send_shutdown();
            }
        } else {
            self.distribution.mark_worker_idle(worker_id);
        }
    }

    fn route(&self, msg: OutboundMessage) {
        match msg {
            OutboundMessage::Initialize { worker_id } => {
                self.assign_or_retire(worker_id);
            }
            OutboundMessage::Result { worker_id, work_result } => {
                let work_id = work_result.work.id();
                let class = self.worker_class_of(worker_id);
                if let Some(started) = self.distribution.take_work_start_time(work_id) {
                    let elapsed = started.elapsed();
                    self.recorder.record_result(true, elapsed);
                    tracer::trace(
                        TraceEvent::Completed,
                        &class,
                        work_id,
                        &TraceContext {
                            worker: Some(&worker_id.to_string()),
                            class: Some(&class),
                            duration: Some(elapsed),
                            queue_size: Some(self.queue.len()),
                        },
                    );
                }
                self.reporter.record_success();
                self.aggregator.add_result(*work_result);
                self.assign_or_retire(worker_id);
            }
            OutboundMessage::Error { worker_id, work_result } => {
                let work_id = work_result.work.id();
                let class = self.worker_class_of(worker_id);
                if let Some(started) = self.distribution.take_work_start_time(work_id) {
                    let elapsed = started.elapsed();
                    self.recorder.record_result(false, elapsed);
                    tracer::trace(
                        TraceEvent::Failed,
                        &class,
                        work_id,
                        &TraceContext {
                            worker: Some(&worker_id.to_string()),
                            class: Some(&class),
                            duration: Some(elapsed),
                            queue_size: Some(self.queue.len()),
                        },
                    );
                }
                self.reporter.record_error(&class, &work_result);
                debug!(?work_result, "work item failed");
                self.aggregator.add_result(*work_result);
                self.assign_or_retire(worker_id);
            }
            OutboundMessage::Shutdown { worker_id } | OutboundMessage::HostDied { worker_id } => {
                self.distribution.unregister(worker_id);
                self.worker_class_by_id
                    .lock()
                    .expect("worker_class_by_id mutex poisoned")
                    .remove(&worker_id);
            }
        }
    }

    async fn shutdown_sequence(&self, _registry: &WorkerRegistry, timeout: Duration) {
        self.monitor.stop();
        self.queue.close();

        let worker_ids = self.distribution.alive_worker_ids();
        for worker_id in &worker_ids {
            if let Some(worker) = self.distribution.get(*worker_id) {
                if !worker.send_shutdown() {
                    warn!(%worker_id, "failed to signal shutdown to worker");
                }
            }
        }

        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline && self.distribution.alive_count() > 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        if self.distribution.alive_count() > 0 {
            warn!(
                remaining = self.distribution.alive_count(),
                "shutdown timeout elapsed; forcibly clearing registry"
            );
            for worker_id in self.distribution.alive_worker_ids() {
                self.distribution.unregister(worker_id);
            }
        }
        info!("supervisor shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::{ProcessOutput, Worker};

    struct Noop;

    #[async_trait::async_trait]
    impl Worker for Noop {
        async fn process(&mut self, work: &Work) -> ProcessOutput { Ok(work.input.clone()) }
    }

    #[tokio::test]
    async fn zero_worker_pool_is_a_configuration_error() {
        let mut registry = WorkerRegistry::new();
        registry.register("noop", || Box::new(Noop));

        let queue = Arc::new(crate::queue::WorkQueue::new());
        let config = SupervisorConfig::builder()
            .pools(vec![PoolConfig { worker_class: "noop".into(), num_workers: 0 }])
            .build();
        let supervisor = Supervisor::new(config, queue);
        let err = supervisor.run(&registry).await.unwrap_err();
        assert!(matches!(err, err::Error::InvalidPoolSize { .. }));
    }

    #[tokio::test]
    async fn unregistered_worker_class_is_a_configuration_error() {
        let registry = WorkerRegistry::new();
        let queue = Arc::new(crate::queue::WorkQueue::new());
        let config = SupervisorConfig::builder()
            .pools(vec![PoolConfig { worker_class: "missing".into(), num_workers: 1 }])
            .build();
        let supervisor = Supervisor::new(config, queue);
        let err = supervisor.run(&registry).await.unwrap_err();
        assert!(matches!(err, err::Error::UnknownWorkerClass { .. }));
    }

    /// Exercises the shutdown fix directly: a pool bigger than the work
    /// available leaves workers idle well before the batch drains, and
    /// those idle workers must still be told to close once it does.
    #[tokio::test]
    async fn idle_workers_are_shut_down_once_the_batch_drains() {
        let mut registry = WorkerRegistry::new();
        registry.register("noop", || Box::new(Noop));

        let queue = Arc::new(crate::queue::WorkQueue::new());
        let config = SupervisorConfig::builder()
            .pools(vec![PoolConfig { worker_class: "noop".into(), num_workers: 4 }])
            .build();
        let supervisor = Supervisor::new(config, queue);
        supervisor.enqueue(Work::builder().input(serde_json::json!(1)).build());

        let summary =
            tokio::time::timeout(Duration::from_secs(5), supervisor.run(&registry)).await.expect(
                "supervisor.run should terminate promptly instead of waiting forever on idle \
                 workers that were never told to shut down",
            ).unwrap();
        assert_eq!(summary.succeeded, 1);
    }
}
