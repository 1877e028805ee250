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

//! Shared error taxonomy.
//!
//! Work-processing failures live entirely inside
//! [`WorkResult`](https://docs.rs/fractor-core)'s own outcome type and never
//! reach here. This crate is reserved for the handful of errors that are
//! raised synchronously, before or outside of any work item's lifecycle —
//! malformed CLI input, an unreadable config file, an invalid pool
//! definition supplied by the operator.

use std::{any::Any, error::Error as StdError, sync::Arc};

use serde::Serialize;
use snafu::Snafu;
use strum::EnumProperty;

#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    Serialize,
    strum_macros::EnumProperty,
    strum_macros::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StatusCode {
    #[strum(props(exit_code = "2"))]
    InvalidArgument,
    #[strum(props(exit_code = "2"))]
    NotFound,
    #[strum(props(exit_code = "1"))]
    Internal,
    #[strum(props(exit_code = "1"))]
    Unknown,
}

impl StatusCode {
    /// Process exit code a CLI entry point should use when this is the
    /// outermost error.
    pub fn exit_code(self) -> i32 {
        self.get_str("exit_code")
            .and_then(|value| value.parse::<i32>().ok())
            .unwrap_or(1)
    }
}

pub trait StackError: StdError {
    fn debug_fmt(&self, layer: usize, buf: &mut Vec<String>);

    fn next(&self) -> Option<&dyn StackError>;

    fn last(&self) -> &dyn StackError
    where
        Self: Sized,
    {
        let Some(mut result) = self.next() else {
            return self;
        };
        while let Some(err) = result.next() {
            result = err;
        }
        result
    }

    fn transparent(&self) -> bool { false }
}

pub trait ErrorExt: StackError {
    fn status_code(&self) -> StatusCode { StatusCode::Unknown }

    fn as_any(&self) -> &dyn Any;

    fn output_msg(&self) -> String
    where
        Self: Sized,
    {
        match self.status_code() {
            StatusCode::Unknown | StatusCode::Internal => {
                format!("Internal error: {}", self.status_code() as u32)
            }
            _ => {
                let error = self.last();
                if let Some(external_error) = error.source() {
                    let mut root = external_error;
                    while let Some(source) = root.source() {
                        root = source;
                    }
                    if error.transparent() {
                        format!("{root}")
                    } else {
                        format!("{error}: {root}")
                    }
                } else {
                    format!("{error}")
                }
            }
        }
    }

    fn root_cause(&self) -> Option<&dyn StdError>
    where
        Self: Sized,
    {
        let error = self.last();
        let mut source = error.source()?;
        while let Some(next) = source.source() {
            source = next;
        }
        Some(source)
    }
}

impl<T: ?Sized + StackError> StackError for Arc<T> {
    fn debug_fmt(&self, layer: usize, buf: &mut Vec<String>) { self.as_ref().debug_fmt(layer, buf) }

    fn next(&self) -> Option<&dyn StackError> { self.as_ref().next() }
}

impl<T: StackError> StackError for Box<T> {
    fn debug_fmt(&self, layer: usize, buf: &mut Vec<String>) { self.as_ref().debug_fmt(layer, buf) }

    fn next(&self) -> Option<&dyn StackError> { self.as_ref().next() }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Snafu, Debug)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Raised synchronously for malformed CLI input or an unreadable/invalid
    /// configuration file. Never captured inside a `WorkResult`.
    #[snafu(display("configuration error: {message}"))]
    Configuration {
        message: String,
        #[snafu(implicit)]
        loc:     snafu::Location,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_maps_invalid_argument_to_two() {
        assert_eq!(StatusCode::InvalidArgument.exit_code(), 2);
        assert_eq!(StatusCode::Internal.exit_code(), 1);
    }

    #[test]
    fn configuration_error_displays_message() {
        let err = ConfigurationSnafu {
            message: "missing --workers".to_string(),
        }
        .build();
        assert_eq!(err.to_string(), "configuration error: missing --workers");
    }
}
