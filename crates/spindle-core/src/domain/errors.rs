//! Error types shared by the handler table, handlers and configuration.

use thiserror::Error;

/// Errors raised while wiring a worker up (registration, configuration).
#[derive(Debug, Error)]
pub enum SpindleError {
    #[error("duplicate handler for job_type={0}")]
    DuplicateHandler(String),

    #[error("missing handlers for job types: {0:?}")]
    MissingHandlers(Vec<String>),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Failure reported by a job handler.
///
/// The worker records `to_string()` of this value as the job's last error,
/// so the `Display` output is what operators see in the store.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),

    #[error("json decode: {0}")]
    Decode(#[from] serde_json::Error),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::Failed(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::Failed(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_displays_bare_message() {
        let err = HandlerError::failed("card declined");
        assert_eq!(err.to_string(), "card declined");
    }

    #[test]
    fn decode_error_is_prefixed() {
        let source = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        let err = HandlerError::from(source);
        assert!(err.to_string().starts_with("json decode: "));
    }

    #[test]
    fn missing_handlers_lists_types() {
        let err = SpindleError::MissingHandlers(vec!["email.send".into()]);
        assert_eq!(
            err.to_string(),
            "missing handlers for job types: [\"email.send\"]"
        );
    }
}
