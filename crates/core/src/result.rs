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

//! The outcome of processing one [`Work`] — either a success payload or a
//! classified failure.

use std::{collections::HashMap, error::Error as StdError, time::SystemTime};

use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::work::Work;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[display("{}", self.as_str())]
pub enum ErrorCategory {
    Validation,
    Timeout,
    Network,
    Resource,
    Business,
    System,
    Unknown,
}

impl ErrorCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::Resource => "resource",
            Self::Business => "business",
            Self::System => "system",
            Self::Unknown => "unknown",
        }
    }

    /// `true` for categories a producer may reasonably resubmit.
    #[must_use]
    pub const fn retriable(self) -> bool {
        matches!(self, Self::Timeout | Self::Network | Self::Resource)
    }

    /// Infer a category from a raw processing error, per the classification
    /// table: match on the error's rendered message for the phrases the
    /// underlying failure kinds are known to produce.
    #[must_use]
    pub fn infer(err: &(dyn StdError + 'static)) -> Self {
        let msg = err.to_string().to_lowercase();
        if msg.contains("argument") || msg.contains("invalid type") || msg.contains("type error") {
            Self::Validation
        } else if msg.contains("timed out") || msg.contains("timeout") {
            Self::Timeout
        } else if msg.contains("connection refused")
            || msg.contains("connection reset")
            || msg.contains("socket")
        {
            Self::Network
        } else if msg.contains("out of memory") || msg.contains("no space") {
            Self::Resource
        } else if msg.contains("stack overflow") {
            Self::System
        } else {
            Self::Unknown
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl ErrorSeverity {
    /// Severity implied by a category when the caller hasn't overridden it.
    #[must_use]
    pub const fn for_category(category: ErrorCategory) -> Self {
        match category {
            ErrorCategory::Resource | ErrorCategory::System => Self::Critical,
            _ => Self::Error,
        }
    }
}

/// A human-readable hint attached when a known failure phrase is matched.
fn suggestion_for(category: ErrorCategory) -> Option<&'static str> {
    match category {
        ErrorCategory::Timeout => {
            Some("increase work.timeout or the worker's default timeout")
        }
        ErrorCategory::Network => Some("check connectivity to the downstream service"),
        ErrorCategory::Resource => Some("reduce concurrent pool size or raise host limits"),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Failure {
    pub error_message: String,
    pub error_code: Option<String>,
    pub error_category: ErrorCategory,
    pub error_severity: ErrorSeverity,
    pub error_context: HashMap<String, Value>,
    pub suggestion: Option<String>,
    pub stack_trace: Option<String>,
}

/// The outcome of processing one [`Work`] item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkResult {
    pub work: Work,
    pub outcome: Outcome,
    #[serde(with = "system_time_secs")]
    pub recorded_at: SystemTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Outcome {
    Success(Value),
    Failure(Failure),
}

impl WorkResult {
    #[must_use]
    pub fn success(work: Work, result: Value) -> Self {
        Self {
            work,
            outcome: Outcome::Success(result),
            recorded_at: SystemTime::now(),
        }
    }

    #[must_use]
    pub fn failure_with(
        work: Work,
        category: ErrorCategory,
        severity: ErrorSeverity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            work,
            outcome: Outcome::Failure(Failure {
                error_message: message.into(),
                error_code: None,
                error_category: category,
                error_severity: severity,
                error_context: HashMap::new(),
                suggestion: suggestion_for(category).map(str::to_owned),
                stack_trace: None,
            }),
            recorded_at: SystemTime::now(),
        }
    }

    /// Classify a raw processing error per the inference table and wrap it.
    #[must_use]
    pub fn from_error(work: Work, err: &(dyn StdError + 'static)) -> Self {
        let category = ErrorCategory::infer(err);
        let severity = ErrorSeverity::for_category(category);
        Self::failure_with(work, category, severity, err.to_string())
    }

    #[must_use]
    pub const fn is_success(&self) -> bool { matches!(self.outcome, Outcome::Success(_)) }

    #[must_use]
    pub const fn is_failure(&self) -> bool { !self.is_success() }

    /// A failure whose category suggests a producer may safely resubmit it.
    #[must_use]
    pub fn retriable(&self) -> bool {
        match &self.outcome {
            Outcome::Failure(f) => f.error_category.retriable(),
            Outcome::Success(_) => false,
        }
    }

    #[must_use]
    pub const fn failure(&self) -> Option<&Failure> {
        match &self.outcome {
            Outcome::Failure(f) => Some(f),
            Outcome::Success(_) => None,
        }
    }
}

mod system_time_secs {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(t: &SystemTime, s: S) -> Result<S::Ok, S::Error> {
        let secs = t.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64();
        secs.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<SystemTime, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(UNIX_EPOCH + Duration::from_secs_f64(secs.max(0.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work() -> Work { Work::builder().input(serde_json::json!(null)).build() }

    #[test]
    fn timeout_category_is_retriable() {
        assert!(ErrorCategory::Timeout.retriable());
        assert!(ErrorCategory::Network.retriable());
        assert!(ErrorCategory::Resource.retriable());
        assert!(!ErrorCategory::Validation.retriable());
    }

    #[test]
    fn resource_errors_are_critical_by_default() {
        assert_eq!(ErrorSeverity::for_category(ErrorCategory::Resource), ErrorSeverity::Critical);
        assert_eq!(ErrorSeverity::for_category(ErrorCategory::Validation), ErrorSeverity::Error);
    }

    #[test]
    fn explicit_failure_carries_the_given_taxonomy() {
        let wr = WorkResult::failure_with(
            work(),
            ErrorCategory::Business,
            ErrorSeverity::Warning,
            "insufficient funds",
        );
        assert!(wr.is_failure());
        assert!(!wr.retriable());
    }
}
