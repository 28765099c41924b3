//! Log setup for the server binary.
//!
//! Output always goes to stderr; stdout belongs to the `challenge`
//! subcommand, whose message is meant to be piped into a wallet tool.

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_DIRECTIVES: &str = "codesync_server=info,codesync_core=info,tower_http=info";

/// Shape of each emitted line, chosen with `--log-format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Colored, multi-field lines with source locations.
    Pretty,
    /// Newline-delimited JSON.
    Json,
}

impl LogFormat {
    /// `json` in any case selects [`LogFormat::Json`]; every other value
    /// falls back to [`LogFormat::Pretty`] rather than refusing to start.
    pub fn from_str_lossy(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }

    fn layer(self) -> Box<dyn Layer<Registry> + Send + Sync> {
        match self {
            LogFormat::Pretty => fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .boxed(),
            LogFormat::Json => fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .boxed(),
        }
    }
}

/// `RUST_LOG` when it holds valid directives, `fallback` otherwise.
fn filter(rust_log: Option<&str>, fallback: &str) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(fallback))
}

/// Installs the process-wide subscriber. Panics if one is already set, so
/// `main` calls it exactly once before doing anything that logs.
pub fn init_logging(fallback_directives: &str, format: LogFormat) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    tracing_subscriber::registry()
        .with(format.layer())
        .with(filter(rust_log.as_deref(), fallback_directives))
        .init();

    tracing::debug!(?format, "logging initialized");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_json_selects_json() {
        assert_eq!(LogFormat::from_str_lossy("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_str_lossy("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_str_lossy("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str_lossy("yaml"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str_lossy(""), LogFormat::Pretty);
    }

    #[test]
    fn default_directives_parse() {
        assert!(EnvFilter::try_new(DEFAULT_DIRECTIVES).is_ok());
    }

    #[test]
    fn filter_prefers_valid_env_directives() {
        let from_env = filter(Some("codesync_core=trace"), DEFAULT_DIRECTIVES);
        assert_eq!(from_env.to_string(), "codesync_core=trace");

        let fallback = filter(Some("codesync_core=loud"), "warn");
        assert_eq!(fallback.to_string(), "warn");

        let unset = filter(None, "warn");
        assert_eq!(unset.to_string(), "warn");
    }
}
