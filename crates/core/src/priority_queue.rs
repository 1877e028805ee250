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

//! A priority-ordered buffer of [`PriorityWork`], with optional aging.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};

use tokio::sync::Notify;

use crate::work::PriorityWork;

#[derive(Debug, Clone, Copy)]
pub struct QueueStats {
    pub size: usize,
}

/// Priority-ordered buffer. Entries are compared by `(effective_priority,
/// created_at)` at pop time; the stored `priority` field is never mutated,
/// so aging is purely a view recomputed on every pop.
pub struct PriorityWorkQueue {
    items: Mutex<Vec<PriorityWork>>,
    closed: AtomicBool,
    notify: Arc<Notify>,
    aging_threshold: Option<Duration>,
}

impl PriorityWorkQueue {
    #[must_use]
    pub fn new(aging_threshold: Option<Duration>) -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            notify: Arc::new(Notify::new()),
            aging_threshold,
        }
    }

    /// Returns `false` if the queue has been closed.
    pub fn push(&self, item: PriorityWork) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        self.items.lock().expect("priority queue mutex poisoned").push(item);
        self.notify.notify_one();
        true
    }

    fn effective_priority(&self, item: &PriorityWork) -> u8 {
        let Some(threshold) = self.aging_threshold else {
            return item.priority.value();
        };
        let age = item.created_at.elapsed();
        let steps = (age.as_secs_f64() / threshold.as_secs_f64()).floor() as i64;
        (i64::from(item.priority.value()) - steps).clamp(0, 4) as u8
    }

    fn pop_locked(&self, items: &mut Vec<PriorityWork>) -> Option<PriorityWork> {
        let mut best: Option<(usize, u8, Instant)> = None;
        for (idx, item) in items.iter().enumerate() {
            let key = (self.effective_priority(item), item.created_at);
            match &best {
                None => best = Some((idx, key.0, key.1)),
                Some((_, p, t)) if (key.0, key.1) < (*p, *t) => best = Some((idx, key.0, key.1)),
                _ => {}
            }
        }
        best.map(|(idx, _, _)| items.remove(idx))
    }

    /// Non-blocking pop of the current minimum-key item.
    #[must_use]
    pub fn pop_non_blocking(&self) -> Option<PriorityWork> {
        let mut items = self.items.lock().expect("priority queue mutex poisoned");
        self.pop_locked(&mut items)
    }

    /// Waits for an item to become available, or returns `None` once the
    /// queue is closed and drained.
    pub async fn pop(&self) -> Option<PriorityWork> {
        loop {
            if let Some(item) = self.pop_non_blocking() {
                return Some(item);
            }
            if self.closed.load(Ordering::Acquire) {
                return None;
            }
            self.notify.notified().await;
        }
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool { self.closed.load(Ordering::Acquire) }

    pub fn clear(&self) { self.items.lock().expect("priority queue mutex poisoned").clear(); }

    #[must_use]
    pub fn stats(&self) -> QueueStats {
        QueueStats { size: self.items.lock().expect("priority queue mutex poisoned").len() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work::{Priority, Work};

    fn item(priority: Priority) -> PriorityWork {
        PriorityWork::new(Work::builder().input(serde_json::json!(null)).build(), priority)
    }

    #[test]
    fn pops_in_priority_then_fifo_order_without_aging() {
        let q = PriorityWorkQueue::new(None);
        q.push(item(Priority::Low));
        q.push(item(Priority::Critical));
        q.push(item(Priority::Normal));
        q.push(item(Priority::High));
        q.push(item(Priority::Background));

        let order: Vec<_> = std::iter::from_fn(|| q.pop_non_blocking())
            .map(|i| i.priority)
            .collect();
        assert_eq!(
            order,
            vec![
                Priority::Critical,
                Priority::High,
                Priority::Normal,
                Priority::Low,
                Priority::Background
            ]
        );
    }

    #[test]
    fn fifo_tie_break_within_same_priority() {
        let q = PriorityWorkQueue::new(None);
        let first = item(Priority::Normal);
        let first_id = first.work.id();
        q.push(first);
        q.push(item(Priority::Normal));
        assert_eq!(q.pop_non_blocking().unwrap().work.id(), first_id);
    }
}
