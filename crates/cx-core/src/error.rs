use crate::types::SourceLocation;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
#[error("{code}: {message}")]
pub struct CodexError {
    pub code: String,
    pub message: String,
    pub location: Option<SourceLocation>,
}

/// Coarse error category, derived from the code prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// `PARSE_*`: the story could not be loaded.
    Parse,
    /// `SCRIPT_*`: interpreter compile or runtime failure.
    Script,
    /// `NAV_*`: a section or option id did not resolve.
    Navigation,
    /// Everything else (host, CLI, persistence).
    Host,
}

impl CodexError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            location: None,
        }
    }

    pub fn with_location(
        code: impl Into<String>,
        message: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            location: Some(location),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        if self.code.starts_with("PARSE_") {
            ErrorKind::Parse
        } else if self.code.starts_with("SCRIPT_") {
            ErrorKind::Script
        } else if self.code.starts_with("NAV_") {
            ErrorKind::Navigation
        } else {
            ErrorKind::Host
        }
    }
}
