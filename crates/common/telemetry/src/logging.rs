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

//! Logging initialization.
//!
//! Reads `FRACTOR_LOG_LEVEL`, `FRACTOR_LOG_OUTPUT`, and `FRACTOR_DEBUG` the
//! way spec'd in the CLI's environment contract and builds a single
//! `tracing-subscriber` pipeline on top of them. `FRACTOR_TRACE` is read
//! directly by `fractor_core::tracer` — this module only decides where
//! `trace!`-and-up events end up.

use std::{env, io::IsTerminal, path::PathBuf, sync::Once};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Where log lines are written, per `FRACTOR_LOG_OUTPUT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    File(PathBuf),
}

impl LogOutput {
    fn from_env(value: &str) -> Self {
        match value {
            "stdout" => Self::Stdout,
            "stderr" => Self::Stderr,
            path => Self::File(PathBuf::from(path)),
        }
    }
}

/// Parses `FRACTOR_LOG_LEVEL` (`DEBUG|INFO|WARN|ERROR|FATAL`). `FATAL` has no
/// direct `tracing::Level` counterpart and is mapped to `ERROR`; unknown
/// values fall back to `INFO`.
fn level_from_env(value: &str) -> tracing::Level {
    match value.to_ascii_uppercase().as_str() {
        "DEBUG" => tracing::Level::DEBUG,
        "WARN" => tracing::Level::WARN,
        "ERROR" | "FATAL" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}

fn is_truthy(value: &str) -> bool { value == "1" || value.eq_ignore_ascii_case("true") }

static INIT: Once = Once::new();

/// Initializes the global `tracing` subscriber from the process environment.
///
/// `FRACTOR_DEBUG=1` (or `true`) forces `DEBUG` regardless of
/// `FRACTOR_LOG_LEVEL`. Safe to call more than once — only the first call
/// takes effect, matching the CLI's "init once at startup" usage.
///
/// Returns the [`WorkerGuard`] for a file sink, if `FRACTOR_LOG_OUTPUT`
/// names a path; the caller must keep it alive for the process lifetime or
/// buffered lines are lost.
pub fn init_logging() -> Option<WorkerGuard> {
    let debug_forced = env::var("FRACTOR_DEBUG").is_ok_and(|v| is_truthy(&v));
    let level = if debug_forced {
        tracing::Level::DEBUG
    } else {
        env::var("FRACTOR_LOG_LEVEL")
            .map(|v| level_from_env(&v))
            .unwrap_or(tracing::Level::INFO)
    };
    let output = env::var("FRACTOR_LOG_OUTPUT")
        .map(|v| LogOutput::from_env(&v))
        .unwrap_or(LogOutput::Stdout);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let mut guard = None;
    INIT.call_once(|| match output {
        LogOutput::Stdout => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_ansi(std::io::stdout().is_terminal()))
                .init();
        }
        LogOutput::Stderr => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_ansi(std::io::stderr().is_terminal()),
                )
                .init();
        }
        LogOutput::File(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "fractor.log".to_string());
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, worker_guard) = tracing_appender::non_blocking(appender);
            guard = Some(worker_guard);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .init();
        }
    });
    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_from_env_maps_fatal_to_error() {
        assert_eq!(level_from_env("FATAL"), tracing::Level::ERROR);
        assert_eq!(level_from_env("debug"), tracing::Level::DEBUG);
        assert_eq!(level_from_env("bogus"), tracing::Level::INFO);
    }

    #[test]
    fn output_from_env_recognizes_named_streams() {
        assert_eq!(LogOutput::from_env("stdout"), LogOutput::Stdout);
        assert_eq!(LogOutput::from_env("stderr"), LogOutput::Stderr);
        assert_eq!(
            LogOutput::from_env("/tmp/fractor.log"),
            LogOutput::File(PathBuf::from("/tmp/fractor.log"))
        );
    }

    #[test]
    fn is_truthy_accepts_one_and_true() {
        assert!(is_truthy("1"));
        assert!(is_truthy("true"));
        assert!(is_truthy("True"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("no"));
    }
}
