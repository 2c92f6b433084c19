//! Tracing configuration for the command-line tool
//!
//! The library only emits events; the binary installs the subscriber.
//! Diagnostics always go to stderr so stdout carries nothing but the result line.

use std::io::IsTerminal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Filter used when `RUST_LOG` is unset or empty
pub const DEFAULT_FILTER: &str = "warn";

/// Tracing configuration builder
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Filter directives, e.g. `bgremove=debug`
    pub filter: String,
    /// Colored output
    pub ansi: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            ansi: true,
        }
    }
}

impl TracingConfig {
    /// Create a new tracing configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the filter from `RUST_LOG` when it is set; colors only when stderr is a terminal
    #[must_use]
    pub fn from_env() -> Self {
        let config = Self::new().with_ansi(std::io::stderr().is_terminal());
        match std::env::var(EnvFilter::DEFAULT_ENV) {
            Ok(filter) => config.with_filter(filter),
            Err(_) => config,
        }
    }

    /// Set custom filter directives; blank input keeps the current filter
    #[must_use]
    pub fn with_filter<S: Into<String>>(mut self, filter: S) -> Self {
        let filter = filter.into();
        if !filter.trim().is_empty() {
            self.filter = filter;
        }
        self
    }

    /// Enable or disable ANSI colors
    #[must_use]
    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    /// Build the `EnvFilter` for this configuration
    ///
    /// # Errors
    /// - Filter directives cannot be parsed
    pub fn env_filter(&self) -> anyhow::Result<EnvFilter> {
        Ok(EnvFilter::try_new(&self.filter)?)
    }

    /// Install the global subscriber
    ///
    /// # Errors
    /// - Filter directives cannot be parsed
    /// - A global subscriber is already installed
    pub fn init(self) -> anyhow::Result<()> {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(self.ansi)
            .with_target(false)
            .with_level(true)
            .compact();

        Registry::default()
            .with(self.env_filter()?)
            .with(fmt_layer)
            .try_init()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        let config = TracingConfig::new();
        assert_eq!(config.filter, DEFAULT_FILTER);
        assert!(config.ansi);
    }

    #[test]
    fn test_from_env_colors_only_on_terminal() {
        let config = TracingConfig::from_env();
        assert_eq!(config.ansi, std::io::stderr().is_terminal());
        assert!(!TracingConfig::new().with_ansi(false).ansi);
    }

    #[test]
    fn test_with_filter_ignores_blank() {
        let config = TracingConfig::new().with_filter("   ");
        assert_eq!(config.filter, DEFAULT_FILTER);

        let config = TracingConfig::new().with_filter("bgremove=debug");
        assert_eq!(config.filter, "bgremove=debug");
    }

    #[test]
    fn test_env_filter_parsing() {
        assert!(TracingConfig::new()
            .with_filter("bgremove=trace,ort=warn")
            .env_filter()
            .is_ok());
        assert!(TracingConfig::new()
            .with_filter("bgremove=notalevel")
            .env_filter()
            .is_err());
    }
}
