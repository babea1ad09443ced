//! Logger setup for the demo binary.
//!
//! `RUST_LOG` always wins. Without it the crate logs at `info` (or `debug`
//! with [`LoggingConfig::verbose`]) and wgpu/naga stay at `warn`, since their
//! `info` output floods the terminal on every pipeline creation.

/// Filter used when neither `RUST_LOG` nor [`LoggingConfig::filter`] is set.
pub const DEFAULT_FILTER: &str = "warn,twirl=info";
const VERBOSE_FILTER: &str = "warn,twirl=debug";

#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// `env_logger` filter directives, e.g. `"twirl=trace,wgpu_core=warn"`.
    pub filter: Option<String>,
    /// Raise this crate to `debug` in the default filter.
    pub verbose: bool,
    /// Prefix lines with a millisecond timestamp. Useful with `twirl=trace`,
    /// which logs every frame's delta.
    pub timestamps: bool,
}

impl LoggingConfig {
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    pub fn timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    /// Filter applied when `RUST_LOG` is unset.
    fn default_filter(&self) -> &str {
        match (&self.filter, self.verbose) {
            (Some(filter), _) => filter,
            (None, true) => VERBOSE_FILTER,
            (None, false) => DEFAULT_FILTER,
        }
    }
}

/// Install the global logger. Returns `false` if one was already installed.
pub fn init_logging(config: LoggingConfig) -> bool {
    let env = env_logger::Env::default().default_filter_or(config.default_filter());
    let mut builder = env_logger::Builder::from_env(env);
    if config.timestamps {
        builder.format_timestamp_millis();
    } else {
        builder.format_timestamp(None);
    }

    let installed = builder.try_init().is_ok();
    if installed {
        log::debug!("logging initialized");
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keeps_dependencies_quiet() {
        assert_eq!(LoggingConfig::default().default_filter(), "warn,twirl=info");
    }

    #[test]
    fn verbose_raises_only_this_crate() {
        assert_eq!(
            LoggingConfig::default().verbose().default_filter(),
            "warn,twirl=debug"
        );
    }

    #[test]
    fn explicit_filter_overrides_verbose() {
        let config = LoggingConfig::default().verbose().filter("twirl=trace");
        assert_eq!(config.default_filter(), "twirl=trace");
    }

    #[test]
    fn second_init_is_refused() {
        init_logging(LoggingConfig::default());
        assert!(!init_logging(LoggingConfig::default()));
    }
}
