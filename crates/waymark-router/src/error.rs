/// Error types for pattern compilation, path generation and router setup

use thiserror::Error;

/// A route pattern could not be compiled into a matcher
#[derive(Debug, Error)]
pub enum PatternError {
    /// The generated (or user-supplied) regular expression is invalid
    #[error("invalid route pattern {pattern:?}: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Path generation failed validation
///
/// Returned by [`PathBuilder::build`](crate::PathBuilder::build) instead of
/// emitting a malformed path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// A required parameter has no value
    #[error("expected \"{name}\" to be defined")]
    Missing { name: String },

    /// A sequence was supplied for a parameter that does not repeat
    #[error("expected \"{name}\" to not repeat, but received {value:?}")]
    NotRepeatable { name: String, value: Vec<String> },

    /// An empty sequence was supplied for a required repeating parameter
    #[error("expected \"{name}\" to not be empty")]
    Empty { name: String },

    /// An encoded value does not satisfy the parameter's own pattern
    #[error("expected \"{name}\" to match \"{pattern}\", but received \"{value}\"")]
    Mismatch {
        name: String,
        pattern: String,
        value: String,
    },
}

/// Errors surfaced by router configuration and registration
#[derive(Debug, Error)]
pub enum RouterError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("invalid router configuration: {0}")]
    Config(#[from] toml::de::Error),
}
