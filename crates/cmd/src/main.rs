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

//! `fractor` — drive a `fractor-core` supervisor from the command line.
//!
//! `validate` and `execute` operate on the default persister's work-list
//! file format (a JSON array of `{_class, _input, _timeout?}` objects, all
//! sharing one worker class); `visualize` targets the job-graph DSL that
//! sits above the core and is out of scope here, so it is a documented
//! stub. `supervisor` is the one command that exercises the core
//! end-to-end: it builds a pool of `WORKER_CLASS`, feeds it `INPUTS…`, and
//! runs to completion.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use fractor_common_error::{ConfigurationSnafu, Error as CliError};
use fractor_core::{
    persister::{JsonFilePersister, Persister},
    supervisor::{PoolConfig, Supervisor, SupervisorConfig},
    work::Work,
};

mod build_info;
mod workers;

#[derive(Debug, Parser)]
#[clap(
    name = "fractor",
    about = "Supervisor and dispatch engine for running user-defined work across isolated worker tasks",
    author = build_info::AUTHOR,
    version = build_info::FULL_VERSION
)]
struct Cli {
    /// Verbose output (equivalent to FRACTOR_LOG_LEVEL=DEBUG).
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Debug output, including per-item trace lines (equivalent to
    /// FRACTOR_DEBUG=1 FRACTOR_TRACE=1).
    #[arg(short = 'd', long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Validate(ValidateArgs),
    Visualize(VisualizeArgs),
    Execute(ExecuteArgs),
    Supervisor(SupervisorArgs),
}

/// A single on-disk work-list record: `{_class, _input, _timeout?}`.
#[derive(Debug, serde::Deserialize)]
struct Record {
    _class: String,
    #[allow(dead_code)]
    _input: serde_json::Value,
    #[allow(dead_code)]
    _timeout: Option<f64>,
}

/// `validate FILE` — parse a work-list file, exit 0 on valid, 1 on error.
#[derive(Debug, Clone, Args)]
#[command(long_about = r"
Parse a work-list file and report whether it is well-formed.

Examples:

fractor validate jobs.json
")]
struct ValidateArgs {
    file: PathBuf,
}

impl ValidateArgs {
    fn run(&self) -> Result<(), CliError> {
        let bytes = std::fs::read(&self.file).map_err(|source| {
            ConfigurationSnafu {
                message: format!("reading {}: {source}", self.file.display()),
            }
            .build()
        })?;
        let records: Vec<Record> = serde_json::from_slice(&bytes).map_err(|source| {
            ConfigurationSnafu {
                message: format!("{} is not a valid work-list file: {source}", self.file.display()),
            }
            .build()
        })?;
        let classes: std::collections::HashSet<_> = records.iter().map(|r| r._class.as_str()).collect();
        println!(
            "{}: {} item(s), worker class(es): {}",
            self.file.display(),
            records.len(),
            if classes.is_empty() { "none".to_string() } else { classes.into_iter().collect::<Vec<_>>().join(", ") }
        );
        Ok(())
    }
}

/// `visualize FILE [-f ascii|mermaid|dot] [-o OUT]` — documented stub.
#[derive(Debug, Clone, Args)]
#[command(long_about = r"
Render a workflow graph. Not supported: the job-graph DSL this would render
lives above the dispatch engine this binary wraps.

Examples:

fractor visualize workflow.json -f mermaid
")]
struct VisualizeArgs {
    file: PathBuf,
    #[arg(short = 'f', long, default_value = "ascii")]
    format: String,
    #[arg(short = 'o', long)]
    out: Option<PathBuf>,
}

impl VisualizeArgs {
    fn run(&self) -> Result<(), CliError> {
        let _ = (&self.file, &self.format, &self.out);
        ConfigurationSnafu {
            message: "visualize is not supported by the core: it renders the job-graph DSL, \
                      which sits above the supervisor/dispatch engine this binary wraps"
                .to_string(),
        }
        .fail()
    }
}

/// `execute FILE [-i JSON|@file] [-w N] [-c]` — run a work-list file to
/// completion through a pool sized for its (single) worker class.
#[derive(Debug, Clone, Args)]
#[command(long_about = r"
Load a work-list file and run it through a pool of its declared worker
class.

Examples:

fractor execute jobs.json -w 4
fractor execute jobs.json -i '{\"extra\": true}'
")]
struct ExecuteArgs {
    file: PathBuf,
    /// Extra input for one more work item: a JSON literal, or `@path` to
    /// read the JSON from a file.
    #[arg(short = 'i', long)]
    input: Option<String>,
    #[arg(short = 'w', long, default_value_t = 4)]
    workers: usize,
    /// Continuous mode: keep the pool running after the file's work drains
    /// until interrupted.
    #[arg(short = 'c', long)]
    continuous: bool,
}

impl ExecuteArgs {
    async fn run(&self) -> Result<(), CliError> {
        let bytes = std::fs::read(&self.file).map_err(|source| {
            ConfigurationSnafu {
                message: format!("reading {}: {source}", self.file.display()),
            }
            .build()
        })?;
        let records: Vec<Record> = serde_json::from_slice(&bytes).map_err(|source| {
            ConfigurationSnafu {
                message: format!("{} is not a valid work-list file: {source}", self.file.display()),
            }
            .build()
        })?;
        let worker_class = records
            .first()
            .map(|r| r._class.clone())
            .ok_or_else(|| ConfigurationSnafu { message: format!("{} has no work items", self.file.display()) }.build())?;
        if records.iter().any(|r| r._class != worker_class) {
            return ConfigurationSnafu {
                message: "execute only supports a single worker class per file".to_string(),
            }
            .fail();
        }

        let persister = JsonFilePersister::new(&self.file, &worker_class);
        let work = persister
            .load()
            .map_err(|source| ConfigurationSnafu { message: format!("loading {}: {source}", self.file.display()) }.build())?
            .unwrap_or_default();

        let extra = match &self.input {
            Some(raw) => Some(parse_input(raw)?),
            None => None,
        };

        run_pool(&worker_class, work, extra, self.workers, self.continuous, false).await
    }
}

/// `supervisor WORKER_CLASS [INPUTS…] [-w N] [-i FILE] [-c] [-m]` — exit 0
/// iff no failed results.
#[derive(Debug, Clone, Args)]
#[command(long_about = r"
Run a pool of WORKER_CLASS over INPUTS (each a JSON literal). Exits 0 iff
every item succeeded.

Examples:

fractor supervisor square 1 2 3 4 5 -w 2
")]
struct SupervisorArgs {
    worker_class: String,
    inputs: Vec<String>,
    #[arg(short = 'w', long, default_value_t = 4)]
    workers: usize,
    /// Load additional saved work from a persister file before running.
    #[arg(short = 'i', long)]
    input_file: Option<PathBuf>,
    #[arg(short = 'c', long)]
    continuous: bool,
    /// Enable the performance monitor (queue-depth sampling).
    #[arg(short = 'm', long)]
    monitor: bool,
}

impl SupervisorArgs {
    async fn run(&self) -> Result<(), CliError> {
        let mut work: Vec<Work> = self
            .inputs
            .iter()
            .map(|raw| parse_input(raw).map(|value| Work::builder().input(value).build()))
            .collect::<Result<_, _>>()?;

        if let Some(path) = &self.input_file {
            let persister = JsonFilePersister::new(path, &self.worker_class);
            let loaded = persister
                .load()
                .map_err(|source| ConfigurationSnafu { message: format!("loading {}: {source}", path.display()) }.build())?
                .unwrap_or_default();
            work.extend(loaded);
        }

        run_pool(&self.worker_class, work, None, self.workers, self.continuous, self.monitor).await
    }
}

fn parse_input(raw: &str) -> Result<serde_json::Value, CliError> {
    let text = if let Some(path) = raw.strip_prefix('@') {
        std::fs::read_to_string(path).map_err(|source| {
            ConfigurationSnafu { message: format!("reading {path}: {source}") }.build()
        })?
    } else {
        raw.to_string()
    };
    serde_json::from_str(&text)
        .map_err(|source| ConfigurationSnafu { message: format!("'{raw}' is not valid JSON: {source}") }.build())
}

async fn run_pool(
    worker_class: &str,
    mut work: Vec<Work>,
    extra_input: Option<serde_json::Value>,
    workers: usize,
    continuous: bool,
    monitor: bool,
) -> Result<(), CliError> {
    let registry = workers::registry();
    if !registry.contains(worker_class) {
        return ConfigurationSnafu {
            message: format!("no worker class registered under the name '{worker_class}'"),
        }
        .fail();
    }
    if let Some(input) = extra_input {
        work.push(Work::builder().input(input).build());
    }

    let queue = std::sync::Arc::new(fractor_core::queue::WorkQueue::new());
    let config = SupervisorConfig::builder()
        .pools(vec![PoolConfig { worker_class: worker_class.to_string(), num_workers: workers.max(1) }])
        .continuous_mode(continuous)
        .enable_performance_monitor(monitor)
        .build();
    let supervisor = Supervisor::new(config, queue);

    for item in work {
        supervisor.enqueue(item);
    }

    let summary = supervisor
        .run(&registry)
        .await
        .map_err(|source| ConfigurationSnafu { message: format!("supervisor run failed: {source}") }.build())?;

    println!("succeeded: {}, failed: {}", summary.succeeded, summary.failed);
    if summary.had_failures() {
        std::process::exit(1);
    }
    Ok(())
}

/// Maps `-d`/`-v` onto the `FRACTOR_*` environment contract so the CLI flags
/// and the env vars drive the same code path in `fractor-common-telemetry`
/// and `fractor-core::tracer`.
#[allow(unsafe_code)]
fn apply_verbosity_flags(cli: &Cli) {
    // SAFETY: called once at process startup before any other thread reads
    // these variables.
    unsafe {
        if cli.debug {
            std::env::set_var("FRACTOR_DEBUG", "1");
            std::env::set_var("FRACTOR_TRACE", "1");
        } else if cli.verbose {
            std::env::set_var("FRACTOR_LOG_LEVEL", "DEBUG");
        }
    }
}

fn main() {
    let cli = Cli::parse();
    apply_verbosity_flags(&cli);
    let _guard = fractor_common_telemetry::init_logging();
    fractor_common_telemetry::set_panic_hook();

    let runtime = fractor_common_runtime::RuntimeOptions::builder()
        .thread_name("fractor-cmd".to_string())
        .build()
        .create()
        .expect("failed to build tokio runtime");

    let result = runtime.block_on(async {
        match &cli.command {
            Commands::Validate(args) => args.run(),
            Commands::Visualize(args) => args.run(),
            Commands::Execute(args) => args.run().await,
            Commands::Supervisor(args) => args.run().await,
        }
    });

    if let Err(err) = result {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
