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

//! Configuration-time errors.
//!
//! Everything that can go wrong while a [`Work`](crate::work::Work) is being
//! processed is captured as a [`WorkResult`](crate::result::WorkResult)
//! failure instead — this enum is reserved for mistakes the caller makes
//! before the supervisor ever starts running, which is why it is raised
//! synchronously and never appears inside a result.

use snafu::Snafu;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("pool '{worker_class}' requested {num_workers} workers, must be >= 1"))]
    InvalidPoolSize {
        worker_class: String,
        num_workers:  usize,
        #[snafu(implicit)]
        loc:          snafu::Location,
    },

    #[snafu(display("no worker class registered under the name '{name}'"))]
    UnknownWorkerClass {
        name: String,
        #[snafu(implicit)]
        loc:  snafu::Location,
    },

    #[snafu(display("supervisor was started twice"))]
    AlreadyRunning {
        #[snafu(implicit)]
        loc: snafu::Location,
    },

    #[snafu(display("persister failed: {source}"))]
    Persist {
        #[snafu(source)]
        source: std::io::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(display("persisted work failed to (de)serialize: {source}"))]
    PersistFormat {
        source: serde_json::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(display(
        "batch mode ended with processed ({processed}) < total_enqueued ({total_enqueued}) and \
         no alive workers remaining"
    ))]
    StalledBatch {
        processed:      u64,
        total_enqueued: u64,
        #[snafu(implicit)]
        loc:            snafu::Location,
    },
}
