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

//! Prometheus series the supervisor updates. Names and semantics are an
//! external contract: do not rename, existing scrapers depend on them.

use lazy_static::lazy_static;
use prometheus::*;

lazy_static! {
    pub static ref JOBS_PROCESSED: IntCounter =
        register_int_counter!("fractor_jobs_processed_total", "Total jobs processed").unwrap();
    pub static ref JOBS_SUCCEEDED: IntCounter =
        register_int_counter!("fractor_jobs_succeeded_total", "Total jobs succeeded").unwrap();
    pub static ref JOBS_FAILED: IntCounter =
        register_int_counter!("fractor_jobs_failed_total", "Total jobs failed").unwrap();
    pub static ref LATENCY_SECONDS: Summary = register_summary!(SummaryOpts::new(
        "fractor_latency_seconds",
        "Per-item processing latency in seconds"
    )
    .objectives(vec![(0.5, 0.05), (0.95, 0.005), (0.99, 0.001)]))
    .unwrap();
    pub static ref WAIT_TIME_SECONDS: Summary = register_summary!(SummaryOpts::new(
        "fractor_wait_time_seconds",
        "Time a work item spent queued before dispatch"
    )
    .objectives(vec![(0.5, 0.05), (0.95, 0.005), (0.99, 0.001)]))
    .unwrap();
    pub static ref THROUGHPUT: Gauge =
        register_gauge!("fractor_throughput_jobs_per_second", "Observed throughput").unwrap();
    pub static ref QUEUE_DEPTH: IntGauge =
        register_int_gauge!("fractor_queue_depth", "Current queue depth").unwrap();
    pub static ref QUEUE_DEPTH_AVG: Gauge =
        register_gauge!("fractor_queue_depth_avg", "Average queue depth over the sample window").unwrap();
    pub static ref QUEUE_DEPTH_MAX: IntGauge =
        register_int_gauge!("fractor_queue_depth_max", "Maximum observed queue depth").unwrap();
    pub static ref ENQUEUE_RATE: IntCounter =
        register_int_counter!("fractor_enqueue_rate_total", "Total enqueue operations").unwrap();
    pub static ref DEQUEUE_RATE: IntCounter =
        register_int_counter!("fractor_dequeue_rate_total", "Total dequeue operations").unwrap();
    pub static ref WORKERS_TOTAL: IntGauge =
        register_int_gauge!("fractor_workers_total", "Total configured workers").unwrap();
    pub static ref WORKERS_ACTIVE: IntGauge =
        register_int_gauge!("fractor_workers_active", "Currently busy workers").unwrap();
    pub static ref WORKER_UTILIZATION: Gauge =
        register_gauge!("fractor_worker_utilization", "busy / total workers").unwrap();
    pub static ref MEMORY_BYTES: IntGauge =
        register_int_gauge!("fractor_memory_bytes", "Approximate cache + queue memory usage").unwrap();
}

/// Decouples the supervisor from the concrete Prometheus registry above so
/// tests can supply a no-op recorder instead of polluting the process-wide
/// default registry.
pub trait MetricsRecorder: Send + Sync {
    fn record_result(&self, success: bool, latency: std::time::Duration);
    fn record_queue_depth(&self, depth: i64);
    fn record_worker_counts(&self, total: i64, active: i64);
}

pub struct PrometheusRecorder;

impl MetricsRecorder for PrometheusRecorder {
    fn record_result(&self, success: bool, latency: std::time::Duration) {
        JOBS_PROCESSED.inc();
        if success {
            JOBS_SUCCEEDED.inc();
        } else {
            JOBS_FAILED.inc();
        }
        LATENCY_SECONDS.observe(latency.as_secs_f64());
    }

    fn record_queue_depth(&self, depth: i64) { QUEUE_DEPTH.set(depth); }

    fn record_worker_counts(&self, total: i64, active: i64) {
        WORKERS_TOTAL.set(total);
        WORKERS_ACTIVE.set(active);
        if total > 0 {
            WORKER_UTILIZATION.set(f64::from(active as i32) / f64::from(total as i32));
        }
    }
}

/// A recorder that discards everything; useful in unit tests that don't
/// want to touch the process-wide Prometheus registry.
pub struct NullRecorder;

impl MetricsRecorder for NullRecorder {
    fn record_result(&self, _success: bool, _latency: std::time::Duration) {}
    fn record_queue_depth(&self, _depth: i64) {}
    fn record_worker_counts(&self, _total: i64, _active: i64) {}
}
