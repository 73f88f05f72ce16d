//! Error types shared across the core components.

use thiserror::Error;

/// Error raised by the rule-based generator.
///
/// Rule-based generation is deterministic and performs no I/O, so the only
/// failure mode is a programming error in the template tables.
#[derive(Debug, Error, Clone)]
pub enum GenerationError {
    #[error("rule-based generation fault: {0}")]
    Internal(String),
}

/// Lexing error from the validator's statement scanner.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("unterminated string literal starting at position {0}")]
    UnterminatedString(usize),

    #[error("unterminated block comment starting at position {0}")]
    UnterminatedComment(usize),

    #[error("unbalanced parenthesis at position {0}")]
    UnbalancedParen(usize),
}
