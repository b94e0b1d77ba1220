//! Error types for Oracle client operations

use thiserror::Error;

/// Result type for Oracle client operations
pub type Result<T> = std::result::Result<T, OracleError>;

/// Errors surfaced by the Oracle client layer.
///
/// Driver-reported errors are converted at their immediate call site into
/// the matching variant, carrying the operation context (e.g.
/// `"list_columns::execute"`) and the driver message. There is no
/// automatic retry anywhere in this crate.
#[derive(Debug, Error)]
pub enum OracleError {
    /// Opening a connection failed
    #[error("oracle connect error in {context}: {message}")]
    Connect { context: String, message: String },

    /// A data-dictionary read failed
    #[error("oracle metadata error in {context}: {message}")]
    Metadata { context: String, message: String },

    /// Statement preparation failed
    #[error("oracle prepare error in {context}: {message}")]
    Prepare { context: String, message: String },

    /// Statement execution failed
    #[error("oracle execute error in {context}: {message}")]
    Execute { context: String, message: String },

    /// Fetching rows from an executed statement failed
    #[error("oracle fetch error in {context}: {message}")]
    Fetch { context: String, message: String },

    /// Host-side bind error, e.g. wrong argument count to a table function
    #[error("bind error: {0}")]
    Bind(String),

    /// Invalid connection parameters
    #[error("invalid connection parameters: {0}")]
    InvalidParameters(String),

    /// Operation outside the supported surface
    #[error("not implemented: {0}")]
    NotImplemented(String),
}

impl OracleError {
    pub fn connect(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Connect {
            context: context.into(),
            message: err.to_string(),
        }
    }

    pub fn metadata(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Metadata {
            context: context.into(),
            message: err.to_string(),
        }
    }

    pub fn prepare(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Prepare {
            context: context.into(),
            message: err.to_string(),
        }
    }

    pub fn execute(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Execute {
            context: context.into(),
            message: err.to_string(),
        }
    }

    pub fn fetch(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Fetch {
            context: context.into(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_context_and_message() {
        let err = OracleError::execute("list_tables::execute", "ORA-00942: table or view does not exist");
        assert_eq!(
            err.to_string(),
            "oracle execute error in list_tables::execute: ORA-00942: table or view does not exist"
        );
    }

    #[test]
    fn test_error_kinds_are_distinct() {
        assert!(matches!(
            OracleError::connect("open", "down"),
            OracleError::Connect { .. }
        ));
        assert!(matches!(
            OracleError::fetch("scan", "broken pipe"),
            OracleError::Fetch { .. }
        ));
        assert!(matches!(
            OracleError::Bind("expected 2 arguments".into()),
            OracleError::Bind(_)
        ));
    }
}
