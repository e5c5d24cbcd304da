//! Error types for I/O operations

use decicrate_core::Error;
use thiserror::Error;

/// Errors that can occur while parsing an OBJ file
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ObjError {
    #[error("line {line}: invalid number '{token}' in '{keyword}' statement")]
    InvalidNumber {
        line: usize,
        keyword: String,
        token: String,
    },

    #[error("line {line}: '{keyword}' statement needs at least {expected} values, found {found}")]
    MissingValues {
        line: usize,
        keyword: String,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: {kind} index {index} out of range (have {count})")]
    IndexOutOfRange {
        line: usize,
        kind: &'static str,
        index: i64,
        count: usize,
    },

    #[error("line {line}: {message}")]
    InconsistentAttributes { line: usize, message: String },

    /// Statement rejected by the OBJ parser
    #[error("{message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: not valid UTF-8")]
    InvalidEncoding { line: usize },
}

impl ObjError {
    /// Line on which the error was detected (1-based)
    pub fn line(&self) -> usize {
        match self {
            ObjError::InvalidNumber { line, .. }
            | ObjError::MissingValues { line, .. }
            | ObjError::IndexOutOfRange { line, .. }
            | ObjError::InconsistentAttributes { line, .. }
            | ObjError::Syntax { line, .. }
            | ObjError::InvalidEncoding { line } => *line,
        }
    }
}

impl From<::obj::ObjError> for ObjError {
    fn from(err: ::obj::ObjError) -> Self {
        use ::obj::ObjError as Parse;
        let line = match &err {
            Parse::MalformedFaceGroup { line_number, .. }
            | Parse::ArgumentListFailure { line_number, .. }
            | Parse::UnexpectedCommand { line_number, .. }
            | Parse::ZeroVertexNumber { line_number } => *line_number,
            _ => 0,
        };
        ObjError::Syntax {
            line,
            message: err.to_string(),
        }
    }
}

impl From<ObjError> for Error {
    fn from(err: ObjError) -> Self {
        Error::format(err.line(), err.to_string())
    }
}
