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

//! A supervisor and dispatch engine for running user-defined work across a
//! pool of isolated worker tasks.
//!
//! - **Work queue**: FIFO ([`queue::WorkQueue`]) or priority-ordered with
//!   aging ([`priority_queue::PriorityWorkQueue`])
//! - **Isolation**: each [`worker::Worker`] runs inside its own
//!   [`wrapped_worker::WrappedWorker`] task, reached only through channels
//! - **Result handling**: [`aggregator::ResultAggregator`], a fingerprinted
//!   [`cache::ResultCache`], and an [`error_reporter::ErrorReporter`]
//! - **Lifecycle**: [`supervisor::Supervisor`] owns startup, the dispatch
//!   loop, signal handling, and graceful shutdown
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fractor_core::{
//!     queue::WorkQueue,
//!     supervisor::{PoolConfig, Supervisor, SupervisorConfig},
//!     work::Work,
//!     worker::{ProcessOutput, Worker, WorkerRegistry},
//! };
//!
//! struct Square;
//!
//! #[async_trait::async_trait]
//! impl Worker for Square {
//!     async fn process(&mut self, work: &Work) -> ProcessOutput {
//!         let n = work.input.as_i64().unwrap_or(0);
//!         Ok(serde_json::json!(n * n))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut registry = WorkerRegistry::new();
//!     registry.register("square", || Box::new(Square));
//!
//!     let queue = Arc::new(WorkQueue::new());
//!     let config = SupervisorConfig::builder()
//!         .pools(vec![PoolConfig { worker_class: "square".into(), num_workers: 2 }])
//!         .build();
//!     let supervisor = Supervisor::new(config, queue);
//!     for n in 1..=5 {
//!         supervisor.enqueue(Work::builder().input(serde_json::json!(n)).build());
//!     }
//!     let summary = supervisor.run(&registry).await.unwrap();
//!     assert!(!summary.had_failures());
//! }
//! ```

pub mod aggregator;
pub mod cache;
pub mod distribution;
pub mod err;
pub mod error_reporter;
pub mod id;
pub mod metrics;
pub mod monitor;
pub mod persister;
pub mod priority_queue;
pub mod queue;
mod signal;
pub mod supervisor;
pub mod tracer;
pub mod work;
pub mod worker;
pub mod wrapped_worker;

pub use aggregator::ResultAggregator;
pub use cache::ResultCache;
pub use error_reporter::ErrorReporter;
pub use id::{WorkId, WorkerId};
pub use persister::{JsonFilePersister, Persister};
pub use priority_queue::PriorityWorkQueue;
pub use queue::WorkQueue;
pub use result::{ErrorCategory, ErrorSeverity, WorkResult};
pub use supervisor::{PoolConfig, Supervisor, SupervisorConfig};
pub use work::{Priority, PriorityWork, Work};
pub use worker::{ProcessOutput, Worker, WorkerRegistry};
pub use wrapped_worker::WrappedWorker;

mod result;
pub use result::Outcome;
