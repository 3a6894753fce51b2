use thiserror::Error;

/// Errors returned when a generator is misconfigured.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("code length must be at least 1")]
    ZeroLength,
    #[error("code length {got} exceeds the maximum of {max}")]
    TooLong { got: usize, max: usize },
    #[error("alphabet must not be empty")]
    EmptyAlphabet,
    #[error("alphabet symbol {0:?} is not ASCII alphanumeric")]
    InvalidSymbol(char),
    #[error("alphabet symbol {0:?} appears more than once")]
    DuplicateSymbol(char),
}
