//! Diagnostic logging for the shell itself.
//!
//! Events go to standard error through `tracing-subscriber`. The filter is taken from
//! the caller (the `--log` option), then from `$LSH_LOG`, and defaults to `warn` so
//! an interactive session stays quiet.

use anyhow::{Context, Result};
use std::io::IsTerminal;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Environment variable consulted for the log filter.
pub const LOG_ENV: &str = "LSH_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Builds the filter from the explicit directive, then the environment value, then
/// the default. Blank values count as unset.
///
/// A malformed explicit directive is an error. A malformed environment value is
/// replaced by the default and handed back so it can be reported once logging is up.
pub fn build_filter(
    explicit: Option<&str>,
    env_value: Option<&str>,
) -> Result<(EnvFilter, Option<String>)> {
    if let Some(directive) = non_blank(explicit) {
        let filter = EnvFilter::try_new(directive)
            .with_context(|| format!("invalid log filter {:?}", directive))?;
        return Ok((filter, None));
    }

    match non_blank(env_value) {
        Some(directive) => match EnvFilter::try_new(directive) {
            Ok(filter) => Ok((filter, None)),
            Err(_) => Ok((EnvFilter::new(DEFAULT_FILTER), Some(directive.to_owned()))),
        },
        None => Ok((EnvFilter::new(DEFAULT_FILTER), None)),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|directive| !directive.trim().is_empty())
}

/// Install the global subscriber. Fails if the explicit directive is malformed or a
/// subscriber is already installed.
pub fn init(explicit: Option<&str>) -> Result<()> {
    let env_value = std::env::var(LOG_ENV).ok();
    let (filter, rejected) = build_filter(explicit, env_value.as_deref())?;

    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init()
        .map_err(|e| anyhow::anyhow!("cannot install logger: {}", e))?;

    if let Some(directive) = rejected {
        warn!(directive = %directive, "ignoring malformed ${}, using {:?}", LOG_ENV, DEFAULT_FILTER);
    }
    Ok(())
}
