//! Global tracing subscriber for the binary and for callers that embed the crate.
//!
//! Events go to stderr so prompts and reports on stdout stay readable. The filter
//! comes from `POTABLE_LOG` (same syntax as `RUST_LOG`) and defaults to `info`.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub const LOG_ENV: &str = "POTABLE_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

static INSTALLED: OnceLock<()> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid {LOG_ENV} directive: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("failed to install global tracing subscriber: {0}")]
    SetGlobal(#[from] tracing_subscriber::util::TryInitError),
}

/// Installs the subscriber. Later calls are no-ops.
pub fn init() -> Result<(), LoggingError> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }
    let filter = env_filter(std::env::var(LOG_ENV).ok().as_deref())?;
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()?;
    let _ = INSTALLED.set(());
    Ok(())
}

fn env_filter(directive: Option<&str>) -> Result<EnvFilter, LoggingError> {
    let directive = directive
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(DEFAULT_DIRECTIVE);
    Ok(EnvFilter::try_new(directive)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_directive_falls_back_to_info() {
        let f = env_filter(Some("  ")).unwrap();
        assert_eq!(f.to_string(), "info");
        let f = env_filter(None).unwrap();
        assert_eq!(f.to_string(), "info");
    }

    #[test]
    fn module_directives_are_accepted() {
        assert!(env_filter(Some("potable=debug,warn")).is_ok());
    }

    #[test]
    fn malformed_directive_is_rejected() {
        assert!(matches!(
            env_filter(Some("potable=notalevel")),
            Err(LoggingError::Filter(_))
        ));
    }
}
