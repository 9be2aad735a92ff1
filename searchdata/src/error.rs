use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("{reason}")]
    Engine { status: u16, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Result code reported to callers for this error.
    ///
    /// Caller and schema errors land in the 4xx range, local transport or
    /// setup failures in the 5xx range, and engine errors keep the status the
    /// engine sent.
    pub fn result_code(&self) -> u16 {
        match self {
            Error::InvalidRequest(_) | Error::Schema(_) | Error::Json(_) => 400,
            Error::Engine { status, .. } => *status,
            Error::Timeout(_) => 504,
            Error::Transport(e) if e.is_timeout() => 504,
            Error::Transport(_) | Error::Tls(_) => 502,
            Error::Config(_) | Error::Io(_) | Error::Toml(_) => 500,
        }
    }

    /// Stable label for log fields.
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::InvalidRequest(_) => "invalid_request",
            Error::Schema(_) => "schema",
            Error::Config(_) => "config",
            Error::Tls(_) => "tls",
            Error::Transport(_) => "transport",
            Error::Timeout(_) => "timeout",
            Error::Engine { .. } => "engine",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::Toml(_) => "toml",
        }
    }

    pub fn is_caller_error(&self) -> bool {
        (400..500).contains(&self.result_code()) && !matches!(self, Error::Engine { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_errors_are_4xx() {
        assert_eq!(Error::InvalidRequest("x".into()).result_code(), 400);
        assert_eq!(Error::Schema("x".into()).result_code(), 400);
        assert!(Error::Schema("x".into()).is_caller_error());
    }

    #[test]
    fn test_engine_status_is_preserved() {
        let err = Error::Engine {
            status: 409,
            reason: "version conflict".into(),
        };
        assert_eq!(err.result_code(), 409);
        assert_eq!(err.to_string(), "version conflict");
        assert!(!err.is_caller_error());
    }

    #[test]
    fn test_local_failures_are_5xx() {
        assert_eq!(Error::Tls("bad pem".into()).result_code(), 502);
        assert_eq!(Error::Timeout("30s".into()).result_code(), 504);
        assert_eq!(Error::Config("no host".into()).result_code(), 500);
        assert_eq!(Error::Tls("x".into()).error_type(), "tls");
    }
}
