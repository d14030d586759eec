use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures raised while building or applying a rewrite rule.
///
/// The three kinds are kept apart so callers can tell a malformed rule file
/// from a rule that does not fit the call it was applied to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The rule text is not well-formed JSON.
    #[error("Malformed rewrite rule: {0}")]
    Parse(String),

    /// The rule is well-formed but describes something invalid, either on its
    ///  own or against the operands of a particular call.
    #[error("Invalid rewrite rule: {0}")]
    Validation(String),

    /// The rule names an operator the evaluator does not implement.
    #[error("Unsupported operator: {0}")]
    UnsupportedOperation(String),
}

impl Error {
    pub fn parse(message: impl Into<String>) -> Self {
        Error::Parse(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub fn unsupported(symbol: impl Into<String>) -> Self {
        Error::UnsupportedOperation(symbol.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Parse(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_errors_are_parse_errors() {
        let err: Error = serde_json::from_str::<serde_json::Value>("[{input}]")
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn display_names_the_kind() {
        assert_eq!(
            Error::unsupported("%").to_string(),
            "Unsupported operator: %"
        );
        assert!(
            Error::validation("input 0 out of range")
                .to_string()
                .starts_with("Invalid rewrite rule")
        );
    }
}
