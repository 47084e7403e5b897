//! Environment configuration.
//!
//! The exporter is a single batch command with no positional arguments;
//! everything comes from the environment:
//!
//! - `HANDLER`: comma-separated sink names (required)
//! - `MAX_CONCURRENT`: per-sink write concurrency, 0 = unbounded (default)
//! - `DEBUG`: non-empty enables verbose logging
//! - `HANDLER_<NAME>_<PARAM>`: backend parameters, e.g.
//!   `HANDLER_FILESYSTEM_OUTPUT_DIR=/data/out`

use std::collections::BTreeMap;
use std::env;

use voyage_sinks::{ParamValue, SinkParams};

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Sink names, in `HANDLER` order.
    pub handlers: Vec<String>,
    /// Per-sink write concurrency bound; 0 means unbounded.
    pub max_concurrent: usize,
    /// Verbose logging requested via `DEBUG`.
    pub debug: bool,
    sink_params: BTreeMap<String, SinkParams>,
}

impl Config {
    pub fn from_env() -> Result<Config> {
        Config::from_vars(env::vars())
    }

    /// Builds the configuration from an explicit variable set; the
    /// environment-free entry point used by tests.
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<Config> {
        let vars: BTreeMap<String, String> = vars.into_iter().collect();

        let handlers: Vec<String> = vars
            .get("HANDLER")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if handlers.is_empty() {
            return Err(PipelineError::Config(
                "set HANDLER to a comma-separated list of sinks (e.g. `filesystem,csv`)"
                    .to_string(),
            ));
        }

        let max_concurrent = match vars.get("MAX_CONCURRENT") {
            None => 0,
            Some(raw) => raw.parse::<usize>().map_err(|_| {
                PipelineError::Config(
                    "MAX_CONCURRENT must be a non-negative integer".to_string(),
                )
            })?,
        };

        let debug = vars.get("DEBUG").is_some_and(|value| !value.is_empty());

        let mut sink_params = BTreeMap::new();
        for name in &handlers {
            let prefix = format!("HANDLER_{}_", name.to_uppercase());
            let mut params = SinkParams::new();
            for (key, value) in &vars {
                if let Some(suffix) = key.strip_prefix(&prefix) {
                    params.insert(suffix.to_lowercase(), ParamValue::coerce(value));
                }
            }
            params.insert("max_concurrent", ParamValue::Int(max_concurrent as i64));
            sink_params.insert(name.clone(), params);
        }

        Ok(Config {
            handlers,
            max_concurrent,
            debug,
            sink_params,
        })
    }

    /// The parameter record for one configured sink.
    pub fn sink_params(&self, name: &str) -> SinkParams {
        self.sink_params.get(name).cloned().unwrap_or_default()
    }
}
