use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error at {location}: {message}")]
    Config { location: String, message: String },

    #[error("Configuration file syntax error: {0}")]
    ConfigSyntax(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),

    #[error("Bridge error: {0}\n\nPossible causes:\n1. Wrong bridge address in config.toml\n2. Application key not authorized (press the link button and re-pair)\n3. Bridge firmware does not support the CLIP v2 API")]
    Bridge(String),

    #[error("{provider} unavailable: {reason}")]
    Provider { provider: String, reason: String },

    #[error("No match: {0}")]
    NoMatch(String),
}

impl Error {
    /// Create a configuration error with location context
    pub fn config_error(location: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Create a bridge error
    pub fn bridge(message: impl Into<String>) -> Self {
        Error::Bridge(message.into())
    }

    /// Create a provider-unavailable error (weather, sunset)
    pub fn provider(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Provider {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error is transient (the routine skips this tick and retries on the next)
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Bridge(_) | Error::Provider { .. } | Error::NoMatch(_)
        )
    }

    /// Check if this error is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Error::Config { .. } | Error::ConfigSyntax(_) | Error::ConfigValidation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(Error::bridge("connection refused").is_transient());
        assert!(Error::provider("weather", "timeout").is_transient());
        assert!(Error::NoMatch("no scene named 'default'".to_string()).is_transient());
        assert!(!Error::ConfigSyntax("bad toml".to_string()).is_transient());
    }

    #[test]
    fn test_config_error_classification() {
        assert!(Error::config_error("config.toml", "unreadable").is_config_error());
        assert!(Error::ConfigValidation("bad timezone".to_string()).is_config_error());
        assert!(!Error::bridge("nope").is_config_error());
    }
}
