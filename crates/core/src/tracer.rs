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

//! Formats `[TRACE]` lines for `FRACTOR_TRACE=1`. Lines are written through
//! `tracing::trace!`, so they share whichever sink
//! `fractor-common-telemetry` initialized — there is no separate trace file.

use std::time::Duration;

use crate::id::WorkId;

#[derive(Debug, Clone, Copy)]
pub enum TraceEvent {
    Queued,
    Assigned,
    Completed,
    Failed,
}

impl TraceEvent {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Assigned => "ASSIGNED",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TraceContext<'a> {
    pub worker: Option<&'a str>,
    pub class: Option<&'a str>,
    pub duration: Option<Duration>,
    pub queue_size: Option<usize>,
}

/// Whether the execution tracer is enabled, per `FRACTOR_TRACE`.
#[must_use]
pub fn enabled() -> bool {
    std::env::var("FRACTOR_TRACE").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Emits one `[TRACE]` line at `trace!` level, matching:
/// `[TRACE] YYYY-MM-DD HH:MM:SS.mmm [T<thread>] <EVENT> <WorkType>:<id>
/// [worker=…] [class=…] [duration=…ms] [queue_size=…]`
pub fn trace(event: TraceEvent, work_type: &str, work_id: WorkId, ctx: &TraceContext<'_>) {
    if !enabled() {
        return;
    }
    let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    let thread = format!("{:?}", std::thread::current().id());
    let mut line = format!("[TRACE] {now} [T{thread}] {} {work_type}:{work_id}", event.as_str());
    if let Some(worker) = ctx.worker {
        line.push_str(&format!(" [worker={worker}]"));
    }
    if let Some(class) = ctx.class {
        line.push_str(&format!(" [class={class}]"));
    }
    if let Some(duration) = ctx.duration {
        line.push_str(&format!(" [duration={}ms]", duration.as_millis()));
    }
    if let Some(queue_size) = ctx.queue_size {
        line.push_str(&format!(" [queue_size={queue_size}]"));
    }
    tracing::trace!(target: "fractor::trace", "{line}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_event_labels_match_the_contract() {
        assert_eq!(TraceEvent::Queued.as_str(), "QUEUED");
        assert_eq!(TraceEvent::Assigned.as_str(), "ASSIGNED");
        assert_eq!(TraceEvent::Completed.as_str(), "COMPLETED");
        assert_eq!(TraceEvent::Failed.as_str(), "FAILED");
    }
}
