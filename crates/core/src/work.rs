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

//! The immutable unit of input the user wants processed.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::id::WorkId;

/// Priority level for a [`PriorityWork`] item.
///
/// Numeric value is `priority as u8`; lower is more urgent, matching the
/// ordering `critical < high < normal < low < background` used by
/// [`crate::priority_queue::PriorityWorkQueue`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[repr(u8)]
pub enum Priority {
    Critical = 0,
    High = 1,
    #[default]
    Normal = 2,
    Low = 3,
    Background = 4,
}

impl Priority {
    #[must_use]
    pub const fn value(self) -> u8 { self as u8 }
}

/// A unit of work. Constructed once, never mutated; `attempt_count` is a
/// plain field a work-source callback may bump when it resubmits a retriable
/// failure — the supervisor itself never writes to it.
#[derive(Debug, Clone, Serialize, Deserialize, bon::Builder)]
pub struct Work {
    #[builder(skip = WorkId::new())]
    #[serde(default = "WorkId::new")]
    id: WorkId,

    /// Opaque, inspectable payload. Owned data only, so it is trivially safe
    /// to move across the channel boundary into a worker's task.
    pub input: serde_json::Value,

    /// Upper bound on one execution of this item; overrides the worker's own
    /// default when present.
    #[builder(into, default)]
    pub timeout: Option<Duration>,

    #[builder(default)]
    pub max_retries: Option<u32>,

    #[builder(default)]
    pub attempt_count: u32,
}

impl Work {
    #[must_use]
    pub const fn id(&self) -> WorkId { self.id }
}

/// A [`Work`] item ordered by priority within a
/// [`crate::priority_queue::PriorityWorkQueue`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityWork {
    pub work: Work,
    pub priority: Priority,
    #[serde(skip, default = "Instant::now")]
    pub created_at: Instant,
}

impl PriorityWork {
    #[must_use]
    pub fn new(work: Work, priority: Priority) -> Self {
        Self {
            work,
            priority,
            created_at: Instant::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_ordering_matches_urgency() {
        assert!(Priority::Critical < Priority::High);
        assert!(Priority::High < Priority::Normal);
        assert!(Priority::Normal < Priority::Low);
        assert!(Priority::Low < Priority::Background);
    }

    #[test]
    fn each_work_gets_a_distinct_id() {
        let a = Work::builder().input(serde_json::json!(1)).build();
        let b = Work::builder().input(serde_json::json!(1)).build();
        assert_ne!(a.id(), b.id());
    }
}
