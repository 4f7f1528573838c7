/// Path pattern compiler
///
/// Turns route patterns like `/users/:id`, `/files/:path*` or `/:year(\d+)?`
/// into a token sequence, then into a matching [`Regex`](regex::Regex) and a
/// [`PathBuilder`] that performs the inverse operation.
///
/// Token order is the contract that ties everything together: it is the order
/// of capture groups in the compiled expression and the order of the
/// generated keys.

pub mod builder;
pub mod compile;
pub mod parser;

use std::fmt;

pub use builder::{BuildParams, ParamValue, PathBuilder};
pub use compile::{compile_pattern, tokens_to_regex, CompiledPattern, PatternSource};
pub use parser::parse;

use crate::PatternError;

/// Name of a parameter token
///
/// Named parameters come from `:name`; anonymous groups such as `(\d+)` and
/// bare wildcards get a zero-based positional index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamName {
    Named(String),
    Index(usize),
}

impl ParamName {
    /// Key under which the parameter is stored in a params map
    pub fn as_key(&self) -> String {
        match self {
            ParamName::Named(name) => name.clone(),
            ParamName::Index(index) => index.to_string(),
        }
    }
}

impl fmt::Display for ParamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamName::Named(name) => f.write_str(name),
            ParamName::Index(index) => write!(f, "{}", index),
        }
    }
}

/// Parameter descriptor produced by [`parse`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamToken {
    pub name: ParamName,
    /// Delimiter char written before the parameter (`/`, `.` or empty)
    pub prefix: String,
    /// Separator between repeated values
    pub delimiter: String,
    pub optional: bool,
    pub repeat: bool,
    /// Regular expression fragment the value must match
    pub pattern: String,
}

impl ParamToken {
    /// Key for a capture group of a pre-compiled expression
    ///
    /// Such keys carry no prefix, delimiter or pattern metadata.
    pub fn positional(index: usize) -> Self {
        Self {
            name: ParamName::Index(index),
            prefix: String::new(),
            delimiter: String::new(),
            optional: false,
            repeat: false,
            pattern: String::new(),
        }
    }
}

/// One piece of a parsed pattern
///
/// # Examples
///
/// ```
/// use waymark_router::pattern::{parse, Token};
///
/// let tokens = parse("/users/:id");
/// assert!(matches!(&tokens[0], Token::Literal(text) if text == "/users"));
/// assert!(matches!(&tokens[1], Token::Param(p) if p.prefix == "/"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Literal(String),
    Param(ParamToken),
}

impl Token {
    pub fn as_param(&self) -> Option<&ParamToken> {
        match self {
            Token::Param(param) => Some(param),
            Token::Literal(_) => None,
        }
    }
}

/// Options controlling how tokens compile into a matcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternOptions {
    /// Case-sensitive matching (default: false)
    pub sensitive: bool,
    /// Disallow the optional trailing slash (default: false)
    pub strict: bool,
    /// Anchor the match at the end of the path (default: true)
    pub end: bool,
}

impl Default for PatternOptions {
    fn default() -> Self {
        Self {
            sensitive: false,
            strict: false,
            end: true,
        }
    }
}

impl PatternOptions {
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_sensitive(mut self, sensitive: bool) -> Self {
        self.sensitive = sensitive;
        self
    }

    pub fn with_end(mut self, end: bool) -> Self {
        self.end = end;
        self
    }
}

/// Creates a path builder from an already parsed token sequence
pub fn tokens_to_builder(tokens: Vec<Token>) -> Result<PathBuilder, PatternError> {
    PathBuilder::from_tokens(tokens)
}

/// Creates a path builder for a pattern string
///
/// # Examples
///
/// ```
/// use waymark_router::pattern::{build_path, BuildParams, ParamValue};
///
/// let builder = build_path("/user/:id").unwrap();
/// let mut params = BuildParams::new();
/// params.insert("id".to_string(), ParamValue::from("42"));
/// assert_eq!(builder.build(&params).unwrap(), "/user/42");
/// ```
pub fn build_path(pattern: &str) -> Result<PathBuilder, PatternError> {
    tokens_to_builder(parse(pattern))
}
