//! Unified error handling for the coco compiler.
//!
//! Each phase accumulates its own diagnostic records; this module provides
//! the one error type the pipeline and the CLI work with, carrying the
//! source position where one is available.

#[cfg(test)]
mod tests;

use std::fmt;

use crate::codegen::CodegenError;
use crate::parser::ParseError;
use crate::typechecker::TypeError;

/// A diagnostic from any phase of compilation, plus the I/O and linking
/// failures the pipeline itself can hit.
#[derive(Debug)]
pub enum CocoError {
    Lex {
        message: String,
        line: u32,
        column: u32,
    },
    Parse {
        message: String,
        line: u32,
        column: u32,
    },
    Type {
        message: String,
        line: u32,
        column: u32,
    },
    Codegen {
        message: String,
        line: u32,
        column: u32,
    },
    Link(String),
    Io(std::io::Error),
}

impl CocoError {
    pub fn lex(message: impl Into<String>, line: u32, column: u32) -> Self {
        CocoError::Lex {
            message: message.into(),
            line,
            column,
        }
    }

    /// Short phase tag, e.g. `"LexError"`.
    pub fn kind(&self) -> &'static str {
        match self {
            CocoError::Lex { .. } => "LexError",
            CocoError::Parse { .. } => "ParseError",
            CocoError::Type { .. } => "TypeError",
            CocoError::Codegen { .. } => "CodegenError",
            CocoError::Link(_) => "LinkError",
            CocoError::Io(_) => "IoError",
        }
    }

    /// Source position as `(line, column)` where the phase recorded one.
    pub fn position(&self) -> Option<(u32, u32)> {
        match self {
            CocoError::Lex { line, column, .. }
            | CocoError::Parse { line, column, .. }
            | CocoError::Type { line, column, .. }
            | CocoError::Codegen { line, column, .. } => Some((*line, *column)),
            CocoError::Link(_) | CocoError::Io(_) => None,
        }
    }
}

impl fmt::Display for CocoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CocoError::Lex {
                message,
                line,
                column,
            }
            | CocoError::Parse {
                message,
                line,
                column,
            }
            | CocoError::Type {
                message,
                line,
                column,
            }
            | CocoError::Codegen {
                message,
                line,
                column,
            } => {
                write!(f, "{} at {}:{}: {}", self.kind(), line, column, message)
            }
            CocoError::Link(message) => write!(f, "LinkError: {}", message),
            CocoError::Io(err) => write!(f, "IoError: {}", err),
        }
    }
}

impl std::error::Error for CocoError {}

impl From<std::io::Error> for CocoError {
    fn from(err: std::io::Error) -> Self {
        CocoError::Io(err)
    }
}

impl From<ParseError> for CocoError {
    fn from(err: ParseError) -> Self {
        CocoError::Parse {
            message: err.message,
            line: err.line,
            column: err.column,
        }
    }
}

impl From<TypeError> for CocoError {
    fn from(err: TypeError) -> Self {
        CocoError::Type {
            message: err.message,
            line: err.line,
            column: err.column,
        }
    }
}

impl From<CodegenError> for CocoError {
    fn from(err: CodegenError) -> Self {
        CocoError::Codegen {
            message: err.message,
            line: err.line,
            column: err.column,
        }
    }
}
