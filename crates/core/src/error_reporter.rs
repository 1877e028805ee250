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

//! Classifies and tallies errors across categories and worker classes.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
    time::SystemTime,
};

use crate::result::{ErrorCategory, ErrorSeverity, WorkResult};

const RECENT_CAP: usize = 100;

#[derive(Debug, Clone)]
pub struct RecentOccurrence {
    pub timestamp: SystemTime,
    pub job: String,
    pub message: String,
    pub code: Option<String>,
    pub severity: ErrorSeverity,
    pub context: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Default)]
struct CategoryStats {
    total: u64,
    by_severity: HashMap<ErrorSeverity, u64>,
    by_code: HashMap<String, u64>,
    recent: VecDeque<RecentOccurrence>,
    first_seen: Option<SystemTime>,
    last_seen: Option<SystemTime>,
}

#[derive(Debug, Default)]
struct JobStats {
    total: u64,
    by_severity: HashMap<ErrorSeverity, u64>,
}

#[derive(Default)]
struct State {
    categories: HashMap<ErrorCategory, CategoryStats>,
    jobs: HashMap<String, JobStats>,
}

pub struct ErrorStatisticsSnapshot {
    pub overall_error_rate: f64,
    pub top_categories: Vec<(ErrorCategory, u64)>,
    pub top_jobs: Vec<(String, u64)>,
    pub critical: Vec<(ErrorCategory, Vec<RecentOccurrence>)>,
    pub trending: Vec<ErrorCategory>,
}

/// Tracks error counts/severity/trends per category and job-name
/// (`worker_class`), independent of the [`crate::aggregator::ResultAggregator`]
/// the supervisor also feeds.
pub struct ErrorReporter {
    state: Mutex<State>,
    successes: AtomicU64,
    errors: AtomicU64,
}

impl Default for ErrorReporter {
    fn default() -> Self { Self::new() }
}

impl ErrorReporter {
    #[must_use]
    pub fn new() -> Self {
        Self { state: Mutex::new(State::default()), successes: AtomicU64::new(0), errors: AtomicU64::new(0) }
    }

    pub fn record_success(&self) { self.successes.fetch_add(1, Ordering::Relaxed); }

    pub fn record_error(&self, job: &str, wr: &WorkResult) {
        let Some(failure) = wr.failure() else { return };
        self.errors.fetch_add(1, Ordering::Relaxed);

        let now = SystemTime::now();
        let occurrence = RecentOccurrence {
            timestamp: now,
            job: job.to_owned(),
            message: failure.error_message.clone(),
            code: failure.error_code.clone(),
            severity: failure.error_severity,
            context: failure.error_context.clone(),
        };

        let mut guard = self.state.lock().expect("error reporter mutex poisoned");

        let cat = guard.categories.entry(failure.error_category).or_default();
        cat.total += 1;
        *cat.by_severity.entry(failure.error_severity).or_insert(0) += 1;
        if let Some(code) = &failure.error_code {
            *cat.by_code.entry(code.clone()).or_insert(0) += 1;
        }
        cat.first_seen.get_or_insert(now);
        cat.last_seen = Some(now);
        if cat.recent.len() == RECENT_CAP {
            cat.recent.pop_front();
        }
        cat.recent.push_back(occurrence);

        let job_stats = guard.jobs.entry(job.to_owned()).or_default();
        job_stats.total += 1;
        *job_stats.by_severity.entry(failure.error_severity).or_insert(0) += 1;
    }

    #[must_use]
    pub fn overall_error_rate(&self) -> f64 {
        let errors = self.errors.load(Ordering::Relaxed) as f64;
        let successes = self.successes.load(Ordering::Relaxed) as f64;
        let total = errors + successes;
        if total == 0.0 { 0.0 } else { (errors / total) * 100.0 }
    }

    #[must_use]
    pub fn top_categories(&self, n: usize) -> Vec<(ErrorCategory, u64)> {
        let guard = self.state.lock().expect("error reporter mutex poisoned");
        let mut v: Vec<_> = guard.categories.iter().map(|(c, s)| (*c, s.total)).collect();
        v.sort_by(|a, b| b.1.cmp(&a.1));
        v.truncate(n);
        v
    }

    #[must_use]
    pub fn top_jobs(&self, n: usize) -> Vec<(String, u64)> {
        let guard = self.state.lock().expect("error reporter mutex poisoned");
        let mut v: Vec<_> = guard.jobs.iter().map(|(j, s)| (j.clone(), s.total)).collect();
        v.sort_by(|a, b| b.1.cmp(&a.1));
        v.truncate(n);
        v
    }

    /// Categories that have logged at least one critical-severity error,
    /// paired with their most recent examples.
    #[must_use]
    pub fn critical_errors(&self) -> Vec<(ErrorCategory, Vec<RecentOccurrence>)> {
        let guard = self.state.lock().expect("error reporter mutex poisoned");
        guard
            .categories
            .iter()
            .filter(|(_, s)| s.by_severity.get(&ErrorSeverity::Critical).is_some_and(|c| *c > 0))
            .map(|(cat, s)| (*cat, s.recent.iter().cloned().collect()))
            .collect()
    }

    /// A category is trending upward if its 10 most recent errors span less
    /// than one second, or the rate of the last 5 is more than 1.5x the
    /// rate of the preceding 5.
    #[must_use]
    pub fn trending_errors(&self) -> Vec<ErrorCategory> {
        let guard = self.state.lock().expect("error reporter mutex poisoned");
        guard
            .categories
            .iter()
            .filter(|(_, s)| Self::is_trending(&s.recent))
            .map(|(cat, _)| *cat)
            .collect()
    }

    fn is_trending(recent: &VecDeque<RecentOccurrence>) -> bool {
        if recent.len() < 10 {
            return false;
        }
        let last10: Vec<_> = recent.iter().rev().take(10).collect();
        let span = last10
            .first()
            .zip(last10.last())
            .and_then(|(newest, oldest)| newest.timestamp.duration_since(oldest.timestamp).ok());
        if span.is_some_and(|s| s.as_secs_f64() < 1.0) {
            return true;
        }

        let last5_span = last10[0]
            .timestamp
            .duration_since(last10[4].timestamp)
            .unwrap_or_default()
            .as_secs_f64()
            .max(f64::EPSILON);
        let prev5_span = last10[5]
            .timestamp
            .duration_since(last10[9].timestamp)
            .unwrap_or_default()
            .as_secs_f64()
            .max(f64::EPSILON);
        let last5_rate = 5.0 / last5_span;
        let prev5_rate = 5.0 / prev5_span;
        last5_rate > prev5_rate * 1.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work::Work;

    fn failure(category: ErrorCategory) -> WorkResult {
        WorkResult::failure_with(
            Work::builder().input(serde_json::json!(null)).build(),
            category,
            ErrorSeverity::Error,
            "boom",
        )
    }

    #[test]
    fn overall_error_rate_is_percentage() {
        let r = ErrorReporter::new();
        r.record_success();
        r.record_success();
        r.record_success();
        r.record_error("job-a", &failure(ErrorCategory::Validation));
        assert!((r.overall_error_rate() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn top_categories_ranks_by_count_descending() {
        let r = ErrorReporter::new();
        for _ in 0..3 {
            r.record_error("job-a", &failure(ErrorCategory::Network));
        }
        r.record_error("job-a", &failure(ErrorCategory::Validation));
        let top = r.top_categories(1);
        assert_eq!(top[0].0, ErrorCategory::Network);
        assert_eq!(top[0].1, 3);
    }

    #[test]
    fn critical_severity_surfaces_the_category() {
        let r = ErrorReporter::new();
        r.record_error(
            "job-a",
            &WorkResult::failure_with(
                Work::builder().input(serde_json::json!(null)).build(),
                ErrorCategory::Resource,
                ErrorSeverity::Critical,
                "oom",
            ),
        );
        let critical = r.critical_errors();
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].0, ErrorCategory::Resource);
    }
}
