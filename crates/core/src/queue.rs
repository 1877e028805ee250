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

//! A thread-safe FIFO buffer of [`Work`].

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};

use crate::work::Work;

/// FIFO container of [`Work`]. Closing the queue causes every further
/// `enqueue` to fail; `dequeue_batch` keeps draining whatever remains.
#[derive(Default)]
pub struct WorkQueue {
    items: Mutex<VecDeque<Work>>,
    closed: AtomicBool,
}

impl WorkQueue {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Returns `false` if the queue has been closed.
    pub fn enqueue(&self, work: Work) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        self.items.lock().expect("queue mutex poisoned").push_back(work);
        true
    }

    /// Non-blocking: returns up to `max` items, or fewer if that's all
    /// there is.
    #[must_use]
    pub fn dequeue_batch(&self, max: usize) -> Vec<Work> {
        let mut guard = self.items.lock().expect("queue mutex poisoned");
        let n = max.min(guard.len());
        guard.drain(..n).collect()
    }

    #[must_use]
    pub fn dequeue_one(&self) -> Option<Work> {
        self.items.lock().expect("queue mutex poisoned").pop_front()
    }

    #[must_use]
    pub fn peek_all(&self) -> Vec<Work> {
        self.items.lock().expect("queue mutex poisoned").iter().cloned().collect()
    }

    #[must_use]
    pub fn size(&self) -> usize { self.items.lock().expect("queue mutex poisoned").len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.size() == 0 }

    pub fn close(&self) { self.closed.store(true, Ordering::Release); }

    #[must_use]
    pub fn is_closed(&self) -> bool { self.closed.load(Ordering::Acquire) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work(n: i64) -> Work { Work::builder().input(serde_json::json!(n)).build() }

    #[test]
    fn fifo_round_trip() {
        let q = WorkQueue::new();
        let w = work(1);
        let id = w.id();
        assert!(q.enqueue(w));
        assert_eq!(q.dequeue_one().unwrap().id(), id);
    }

    #[test]
    fn closed_queue_rejects_enqueue() {
        let q = WorkQueue::new();
        q.close();
        assert!(!q.enqueue(work(1)));
    }

    #[test]
    fn dequeue_batch_caps_at_max() {
        let q = WorkQueue::new();
        for n in 0..5 {
            q.enqueue(work(n));
        }
        assert_eq!(q.dequeue_batch(3).len(), 3);
        assert_eq!(q.size(), 2);
    }
}
