//! Error types for the twosql templating engine.
//!
//! Parse-time syntax errors (unclosed tokens, unclosed blocks, missing IF
//! conditions) abort template compilation with no partial tree. Expression
//! failures surface at render time carrying the offending condition text.
//! A bind-variable name missing from the parameter set is deliberately not
//! an error; it renders as a null placeholder (see `node`).

use thiserror::Error;

/// The primary error type for twosql operations.
#[derive(Error, Debug)]
pub enum TwoSqlError {
    /// A token opened in the template was never closed (e.g. `/*` without `*/`)
    #[error("unclosed token {token:?} before end of template: {rest:?}")]
    UnclosedToken { token: String, rest: String },

    /// An IF or BEGIN block was never closed with an END comment
    #[error("IF/BEGIN block is missing its closing /*END*/ comment")]
    UnclosedBlock,

    /// An IF comment with an empty condition
    #[error("IF comment has no condition expression")]
    MissingIfCondition,

    /// A condition that failed to parse or did not evaluate to a boolean
    #[error("illegal boolean expression [{expression}]: {message}")]
    IllegalBoolExpression { expression: String, message: String },

    /// Invalid argument passed to an API entry point
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },
}

impl TwoSqlError {
    /// Create an unclosed-token error for a terminator that was never found.
    pub fn unclosed_token(token: impl Into<String>, rest: impl Into<String>) -> Self {
        Self::UnclosedToken {
            token: token.into(),
            rest: rest.into(),
        }
    }

    /// Create an illegal-boolean-expression error.
    pub fn illegal_bool_expression(
        expression: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::IllegalBoolExpression {
            expression: expression.into(),
            message: message.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

/// Result type alias for twosql operations.
pub type Result<T> = std::result::Result<T, TwoSqlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TwoSqlError::unclosed_token("*/", "IF bogus");
        assert_eq!(
            err.to_string(),
            "unclosed token \"*/\" before end of template: \"IF bogus\""
        );
    }

    #[test]
    fn test_illegal_bool_expression_display() {
        let err = TwoSqlError::illegal_bool_expression("a <", "unexpected end of expression");
        assert_eq!(
            err.to_string(),
            "illegal boolean expression [a <]: unexpected end of expression"
        );
    }
}
