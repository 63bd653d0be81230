// Infrastructure: `letsopt-solve <model_file> <config_json>`.
// Prints one SolveResult as JSON on stdout. Only usage errors exit with 1;
// bad input is reported as an ERROR result.

use super::logging;
use crate::application::Dispatcher;
use crate::domain::models::{SolveConfig, SolveResult};
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;
use tracing::warn;

pub const USAGE: &str = "Usage: letsopt-solve <model_file> <config_json>";

/// Positional arguments of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub model_path: PathBuf,
    pub config_json: String,
}

impl Invocation {
    /// Exactly two arguments, program name excluded
    pub fn from_args<I>(args: I) -> Option<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        match (args.next(), args.next(), args.next()) {
            (Some(model_path), Some(config_json), None) => Some(Self {
                model_path: PathBuf::from(model_path),
                config_json,
            }),
            _ => None,
        }
    }
}

/// A blank config argument means defaults
pub fn parse_config(json: &str) -> Result<SolveConfig, String> {
    if json.trim().is_empty() {
        return Ok(SolveConfig::default());
    }
    SolveConfig::from_json_str(json).map_err(|e| e.to_string())
}

/// Solve one invocation and return the result to print
pub async fn execute(dispatcher: &Dispatcher, invocation: Invocation) -> SolveResult {
    let start = Instant::now();
    let config = match parse_config(&invocation.config_json) {
        Ok(config) => config,
        Err(message) => {
            return SolveResult::error(message).with_solve_time(start.elapsed().as_secs_f64())
        }
    };

    let worker = dispatcher.clone();
    let path = invocation.model_path;
    match tokio::task::spawn_blocking(move || worker.solve_file(path, &config)).await {
        Ok(result) => result,
        Err(err) => SolveResult::error(format!("Solver worker failed: {err}"))
            .with_solve_time(start.elapsed().as_secs_f64()),
    }
}

/// Run the command line and return the process exit code
pub async fn run<I, W>(args: I, dispatcher: &Dispatcher, out: &mut W) -> u8
where
    I: IntoIterator<Item = String>,
    W: Write,
{
    let Some(invocation) = Invocation::from_args(args) else {
        eprintln!("{USAGE}");
        return 1;
    };

    logging::init(
        parse_config(&invocation.config_json)
            .ok()
            .and_then(|c| c.log_level),
    );

    let result = execute(dispatcher, invocation).await;
    emit(&result, out);
    0
}

/// Print the result; output failures are logged, the exit code stays 0
fn emit<W: Write>(result: &SolveResult, out: &mut W) {
    let written = result
        .to_json()
        .map_err(|err| err.to_string())
        .and_then(|json| writeln!(out, "{json}").map_err(|err| err.to_string()));
    if let Err(err) = written {
        warn!(error = %err, "failed to print result");
    }
}
