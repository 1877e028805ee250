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

//! Identifiers used to correlate work and workers across channel boundaries.

use derive_more::{Debug, Display};
use uuid::Uuid;

/// Identifies one [`crate::work::Work`] instance for its entire lifetime.
///
/// Used as the key into `work_start_times` and as the correlation id carried
/// by trace lines and error contexts.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display, serde::Serialize, serde::Deserialize)]
#[debug("WorkId({_0})")]
#[display("{_0}")]
pub struct WorkId(Uuid);

impl WorkId {
    #[must_use]
    pub fn new() -> Self { Self(Uuid::new_v4()) }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid { &self.0 }
}

impl Default for WorkId {
    fn default() -> Self { Self::new() }
}

/// Identifies a single [`crate::wrapped_worker::WrappedWorker`] instance.
///
/// Carried as a plain value rather than a shared pointer so the supervisor's
/// registry and a worker's own handle never need to traverse a cycle back to
/// each other; both sides look the id up in the registry they already own.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
#[debug("WorkerId({_0})")]
#[display("{_0}")]
pub struct WorkerId(Uuid);

impl WorkerId {
    pub(crate) fn new() -> Self { Self(Uuid::new_v4()) }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid { &self.0 }
}
