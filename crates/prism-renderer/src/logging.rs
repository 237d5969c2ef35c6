//! Tracing subscriber setup for applications embedding the renderer.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter directives used when `RUST_LOG` is unset.
    pub filter: String,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "prism_renderer=info,prism_core=info".to_string(),
            ansi: true,
        }
    }
}

/// Installs a global fmt subscriber. `RUST_LOG` takes precedence over
/// `config.filter`.
///
/// Returns false if a global subscriber was already installed, in which case
/// nothing changes.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_ansi(config.ansi))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_a_no_op() {
        let config = LoggingConfig {
            ansi: false,
            ..Default::default()
        };
        init_logging(&config);
        assert!(!init_logging(&config));
    }
}
