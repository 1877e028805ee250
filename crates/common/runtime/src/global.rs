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

use std::{future::Future, sync::Arc};

use once_cell::sync::OnceCell;
use tokio::{runtime::Runtime, task::JoinHandle};

use crate::options::{GlobalRuntimeOptions, RuntimeOptions};

static BACKGROUND_RUNTIME: OnceCell<Arc<Runtime>> = OnceCell::new();

fn build_background_runtime(options: &GlobalRuntimeOptions) -> Arc<Runtime> {
    Arc::new(
        RuntimeOptions::builder()
            .thread_name("rt-bg".to_string())
            .worker_threads(options.background_threads)
            .enable_io(true)
            .enable_time(true)
            .build()
            .create()
            .expect("Failed to create background runtime"),
    )
}

fn init_from_default() -> Arc<Runtime> {
    build_background_runtime(&GlobalRuntimeOptions::default())
}

/// Initialize the shared background runtime with custom options.
///
/// # Panics
/// Panics if called more than once.
pub fn init_global_runtimes(options: &GlobalRuntimeOptions) {
    BACKGROUND_RUNTIME
        .set(build_background_runtime(options))
        .expect("Global runtime already initialized");
}

#[must_use]
pub fn background_runtime() -> Arc<Runtime> {
    Arc::clone(BACKGROUND_RUNTIME.get_or_init(init_from_default))
}

pub fn spawn_background<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    background_runtime().handle().spawn(future)
}

pub fn spawn_blocking_background<F, R>(job: F) -> JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    background_runtime().handle().spawn_blocking(job)
}

pub fn block_on_background<F>(future: F) -> F::Output
where
    F: Future,
{
    background_runtime().block_on(future)
}
