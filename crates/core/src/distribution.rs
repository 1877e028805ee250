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

//! Tracks idle workers and hands them queued work, one item at a time.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
    time::Instant,
};

use crate::{
    id::{WorkId, WorkerId},
    priority_queue::PriorityWorkQueue,
    queue::WorkQueue,
    work::Work,
    wrapped_worker::WrappedWorker,
};

/// Anything [`WorkDistributionManager`] can pull a plain [`Work`] out of and
/// push one into, whether it orders by FIFO or by priority.
pub trait WorkSource: Send + Sync {
    fn try_pop(&self) -> Option<Work>;
    fn enqueue(&self, work: Work) -> bool;
    fn close(&self);
    fn len(&self) -> usize;
}

impl WorkSource for WorkQueue {
    fn try_pop(&self) -> Option<Work> { self.dequeue_one() }

    fn enqueue(&self, work: Work) -> bool { Self::enqueue(self, work) }

    fn close(&self) { Self::close(self); }

    fn len(&self) -> usize { self.size() }
}

impl WorkSource for PriorityWorkQueue {
    fn try_pop(&self) -> Option<Work> { self.pop_non_blocking().map(|pw| pw.work) }

    fn enqueue(&self, work: Work) -> bool {
        self.push(crate::work::PriorityWork::new(work, crate::work::Priority::default()))
    }

    fn close(&self) { Self::close(self); }

    fn len(&self) -> usize { self.stats().size }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatusSummary {
    pub idle_count: usize,
    pub busy_count: usize,
}

/// Holds references to the queue, the idle set, and the worker registry, and
/// mediates every hand-off between them. A worker is in exactly one of
/// `idle` or `busy` at any time.
pub struct WorkDistributionManager<Q: WorkSource + ?Sized> {
    queue: std::sync::Arc<Q>,
    registry: Mutex<HashMap<WorkerId, WrappedWorker>>,
    idle: Mutex<HashSet<WorkerId>>,
    work_start_times: Mutex<HashMap<WorkId, Instant>>,
}

impl<Q: WorkSource + ?Sized> WorkDistributionManager<Q> {
    #[must_use]
    pub fn new(queue: std::sync::Arc<Q>) -> Self {
        Self {
            queue,
            registry: Mutex::new(HashMap::new()),
            idle: Mutex::new(HashSet::new()),
            work_start_times: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&self, worker: WrappedWorker) {
        self.registry.lock().expect("registry mutex poisoned").insert(worker.id(), worker);
    }

    pub fn unregister(&self, worker_id: WorkerId) {
        self.registry.lock().expect("registry mutex poisoned").remove(&worker_id);
        self.idle.lock().expect("idle set mutex poisoned").remove(&worker_id);
    }

    #[must_use]
    pub fn alive_count(&self) -> usize { self.registry.lock().expect("registry mutex poisoned").len() }

    #[must_use]
    pub fn alive_worker_ids(&self) -> Vec<WorkerId> {
        self.registry.lock().expect("registry mutex poisoned").keys().copied().collect()
    }

    /// Workers currently awaiting work. Used at shutdown time: these workers
    /// hold no in-flight item and so will never generate another
    /// `{result}`/`{error}` message of their own accord to trigger a
    /// shutdown hand-off, and must be signalled directly.
    #[must_use]
    pub fn idle_worker_ids(&self) -> Vec<WorkerId> {
        self.idle.lock().expect("idle set mutex poisoned").iter().copied().collect()
    }

    #[must_use]
    pub fn get(&self, worker_id: WorkerId) -> Option<WrappedWorker> {
        self.registry.lock().expect("registry mutex poisoned").get(&worker_id).cloned()
    }

    pub fn mark_worker_idle(&self, worker_id: WorkerId) {
        self.idle.lock().expect("idle set mutex poisoned").insert(worker_id);
    }

    pub fn mark_worker_busy(&self, worker_id: WorkerId) {
        self.idle.lock().expect("idle set mutex poisoned").remove(&worker_id);
    }

    fn pop_idle(&self) -> Option<WorkerId> {
        let mut idle = self.idle.lock().expect("idle set mutex poisoned");
        let id = *idle.iter().next()?;
        idle.remove(&id);
        Some(id)
    }

    /// Pops one `Work`, sends it to `worker_id`, and records its start time.
    /// Returns `true` on send; `false` if the queue is empty or the worker
    /// is closed (in which case the item, if popped, is simply dropped —
    /// callers are expected to check `registry` liveness before calling).
    #[must_use]
    pub fn assign_work_to_worker(&self, worker_id: WorkerId) -> bool {
        let Some(worker) = self.get(worker_id) else { return false };
        let Some(work) = self.queue.try_pop() else { return false };
        let work_id = work.id();
        if worker.send_work(work) {
            self.work_start_times
                .lock()
                .expect("work_start_times mutex poisoned")
                .insert(work_id, Instant::now());
            self.mark_worker_busy(worker_id);
            true
        } else {
            false
        }
    }

    /// Repeatedly hands queued work to idle workers until either runs dry.
    pub fn distribute_to_idle_workers(&self) {
        loop {
            let Some(worker_id) = self.pop_idle() else { break };
            if !self.assign_work_to_worker(worker_id) {
                self.mark_worker_idle(worker_id);
                break;
            }
        }
    }

    /// Returns and removes the start time recorded at dispatch.
    pub fn take_work_start_time(&self, work_id: WorkId) -> Option<Instant> {
        self.work_start_times.lock().expect("work_start_times mutex poisoned").remove(&work_id)
    }

    #[must_use]
    pub fn status_summary(&self) -> StatusSummary {
        StatusSummary {
            idle_count: self.idle.lock().expect("idle set mutex poisoned").len(),
            busy_count: self.alive_count() - self.idle.lock().expect("idle set mutex poisoned").len(),
        }
    }
}
