//! Crate-wide error type for the Lox interpreter.
//!
//! Every phase (scanning, parsing, resolution, evaluation) reports failures
//! as a [`LoxError`], so the whole pipeline composes with `?` and the driver
//! can render any failure uniformly. Each language-level variant carries its
//! 1-based source line; host-level failures (I/O, UTF-8) wrap through
//! transparently. Rendering happens in the caller, never here.

use std::io;

use log::debug;
use thiserror::Error;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// The scanner hit a malformed lexeme (unexpected character,
    /// unterminated string).
    #[error("[line {line}] Error: {message}")]
    Lex { message: String, line: usize },

    /// The parser could not derive a statement or expression.
    #[error("[line {line}] Error: {message}")]
    Parse { message: String, line: usize },

    /// The static resolution pass rejected the program (e.g. `return`
    /// at top level, a local read in its own initializer).
    #[error("[line {line}] Error: {message}")]
    Resolve { message: String, line: usize },

    /// Evaluation failed: a type error, an undefined name, a bad call.
    /// The line locates the token the evaluator was working on.
    #[error("[line {line}] Runtime error: {message}")]
    Runtime { message: String, line: usize },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl LoxError {
    pub fn lex<S: Into<String>>(line: usize, message: S) -> Self {
        let message = message.into();

        debug!("lex error at line {}: {}", line, message);

        LoxError::Lex { message, line }
    }

    pub fn parse<S: Into<String>>(line: usize, message: S) -> Self {
        let message = message.into();

        debug!("parse error at line {}: {}", line, message);

        LoxError::Parse { message, line }
    }

    pub fn resolve<S: Into<String>>(line: usize, message: S) -> Self {
        let message = message.into();

        debug!("resolve error at line {}: {}", line, message);

        LoxError::Resolve { message, line }
    }

    pub fn runtime<S: Into<String>>(line: usize, message: S) -> Self {
        let message = message.into();

        debug!("runtime error at line {}: {}", line, message);

        LoxError::Runtime { message, line }
    }

    /// Process exit code the driver should use for this failure: 65 for
    /// anything caught before execution, 70 once the program was running.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoxError::Lex { .. } | LoxError::Parse { .. } | LoxError::Resolve { .. } => 65,
            LoxError::Runtime { .. } => 70,
            LoxError::Io(_) | LoxError::Utf8(_) => 74,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
