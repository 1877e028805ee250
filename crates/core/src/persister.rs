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

//! The plug-in persistence contract, plus the default JSON implementation.
//!
//! The core does not mandate a file format; a caller who needs YAML or a
//! binary layout implements [`Persister`] themselves. This module only ships
//! the one format the boundary in `fractor-cmd` actually relies on.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{err::{self, Result}, work::Work};

pub trait Persister: Send + Sync {
    fn save(&self, work: &[Work]) -> Result<()>;
    fn load(&self) -> Result<Option<Vec<Work>>>;
    fn clear(&self) -> Result<()>;
}

/// On-disk shape: a newline-free JSON array of `{_class, _input, _timeout?}`
/// objects, one per work item.
#[derive(Debug, Serialize, Deserialize)]
struct Record {
    _class: String,
    _input: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    _timeout: Option<f64>,
}

pub struct JsonFilePersister {
    path: PathBuf,
    worker_class: String,
}

impl JsonFilePersister {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, worker_class: impl Into<String>) -> Self {
        Self { path: path.into(), worker_class: worker_class.into() }
    }
}

impl Persister for JsonFilePersister {
    fn save(&self, work: &[Work]) -> Result<()> {
        let records: Vec<Record> = work
            .iter()
            .map(|w| Record {
                _class: self.worker_class.clone(),
                _input: w.input.clone(),
                _timeout: w.timeout.map(|d| d.as_secs_f64()),
            })
            .collect();
        let bytes = serde_json::to_vec(&records).context(err::PersistFormatSnafu)?;
        std::fs::write(&self.path, bytes).context(err::PersistSnafu)?;
        Ok(())
    }

    fn load(&self) -> Result<Option<Vec<Work>>> {
        if !Path::new(&self.path).exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&self.path).context(err::PersistSnafu)?;
        let records: Vec<Record> = serde_json::from_slice(&bytes).context(err::PersistFormatSnafu)?;
        let work = records
            .into_iter()
            .map(|r| {
                let mut builder = Work::builder().input(r._input);
                if let Some(secs) = r._timeout {
                    builder = builder.timeout(std::time::Duration::from_secs_f64(secs));
                }
                builder.build()
            })
            .collect();
        Ok(Some(work))
    }

    fn clear(&self) -> Result<()> {
        if Path::new(&self.path).exists() {
            std::fs::remove_file(&self.path).context(err::PersistSnafu)?;
        }
        Ok(())
    }
}

use snafu::ResultExt as _;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_input_and_timeout() {
        let dir = std::env::temp_dir().join(format!("fractor-persister-test-{}", uuid::Uuid::new_v4()));
        let persister = JsonFilePersister::new(&dir, "square");

        let work = vec![
            Work::builder().input(serde_json::json!(1)).build(),
            Work::builder()
                .input(serde_json::json!({"x": 1}))
                .timeout(std::time::Duration::from_millis(500))
                .build(),
        ];
        persister.save(&work).unwrap();
        let loaded = persister.load().unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].input, work[0].input);
        assert_eq!(loaded[1].timeout, work[1].timeout);

        persister.clear().unwrap();
        assert!(persister.load().unwrap().is_none());
    }
}
