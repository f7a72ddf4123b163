//! Error taxonomy shared by the tokenizer, resolver and processor.
//!
//! Every failure carries a stable [`ErrorKind`] code plus a templated
//! description of the form `"<sentence> key=value key=value"`. The message
//! text is part of the public contract and is asserted verbatim in tests.

use std::fmt;
use thiserror::Error;

/// Stable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidRequest,
    InvalidConfiguration,
    InvalidCommand,
    InvalidArgument,
    InvalidOption,
    MissingCommand,
    MissingArgument,
    MissingOption,
    UnsupportedArgument,
    UnsupportedOption,
    ServerError,
    RequestTimeout,
    RequestCanceled,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::InvalidConfiguration => "invalid_configuration",
            ErrorKind::InvalidCommand => "invalid_command",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::InvalidOption => "invalid_option",
            ErrorKind::MissingCommand => "missing_command",
            ErrorKind::MissingArgument => "missing_argument",
            ErrorKind::MissingOption => "missing_option",
            ErrorKind::UnsupportedArgument => "unsupported_argument",
            ErrorKind::UnsupportedOption => "unsupported_option",
            ErrorKind::ServerError => "server_error",
            ErrorKind::RequestTimeout => "request_timeout",
            ErrorKind::RequestCanceled => "request_canceled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A core failure: stable code + rendered description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TermError {
    pub kind: ErrorKind,
    pub message: String,
}

impl TermError {
    /// Render `description` followed by each `key=value` pair.
    pub fn new(kind: ErrorKind, description: &str, params: &[(&str, &str)]) -> Self {
        let mut message = description.to_string();
        for (k, v) in params {
            message.push(' ');
            message.push_str(k);
            message.push('=');
            message.push_str(v);
        }
        Self { kind, message }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Machine-readable form used by the CLI `--json` paths.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "status": "error",
            "code": self.code(),
            "error": self.message,
        })
    }
}

/// Core result alias.
pub type Result<T> = std::result::Result<T, TermError>;

/* ---- Constructors (one per templated description) ---- */

pub(crate) fn invalid_request(description: &str, params: &[(&str, &str)]) -> TermError {
    TermError::new(ErrorKind::InvalidRequest, description, params)
}

pub(crate) fn invalid_configuration(description: &str, params: &[(&str, &str)]) -> TermError {
    TermError::new(ErrorKind::InvalidConfiguration, description, params)
}

pub(crate) fn invalid_command(description: &str, params: &[(&str, &str)]) -> TermError {
    TermError::new(ErrorKind::InvalidCommand, description, params)
}

pub(crate) fn invalid_argument(description: &str, params: &[(&str, &str)]) -> TermError {
    TermError::new(ErrorKind::InvalidArgument, description, params)
}

pub(crate) fn invalid_option(description: &str, params: &[(&str, &str)]) -> TermError {
    TermError::new(ErrorKind::InvalidOption, description, params)
}

pub(crate) fn missing_command(description: &str, params: &[(&str, &str)]) -> TermError {
    TermError::new(ErrorKind::MissingCommand, description, params)
}

pub(crate) fn missing_argument(description: &str, params: &[(&str, &str)]) -> TermError {
    TermError::new(ErrorKind::MissingArgument, description, params)
}

pub(crate) fn missing_option(description: &str, params: &[(&str, &str)]) -> TermError {
    TermError::new(ErrorKind::MissingOption, description, params)
}

pub(crate) fn unsupported_argument(description: &str, params: &[(&str, &str)]) -> TermError {
    TermError::new(ErrorKind::UnsupportedArgument, description, params)
}

pub(crate) fn unsupported_option(description: &str, params: &[(&str, &str)]) -> TermError {
    TermError::new(ErrorKind::UnsupportedOption, description, params)
}

pub(crate) fn server_error(description: &str, params: &[(&str, &str)]) -> TermError {
    TermError::new(ErrorKind::ServerError, description, params)
}

pub(crate) fn request_timeout(description: &str, params: &[(&str, &str)]) -> TermError {
    TermError::new(ErrorKind::RequestTimeout, description, params)
}

pub(crate) fn request_canceled(description: &str, params: &[(&str, &str)]) -> TermError {
    TermError::new(ErrorKind::RequestCanceled, description, params)
}
