/// Token compilation into matching expressions
///
/// The `regex` crate has no look-around, so the non-anchored tail
/// `(?=/|$)` is expressed as a consuming `(?:/|$)`. Capture groups are
/// unaffected.

use regex::{Regex, RegexBuilder};

use super::{parse, ParamToken, PatternOptions, Token};
use crate::PatternError;

/// Input accepted by [`compile_pattern`]
#[derive(Debug, Clone)]
pub enum PatternSource {
    /// Pattern string such as `/users/:id`
    Path(String),
    /// Pre-compiled expression, passed through unchanged
    Regex(Regex),
    /// Alternatives; matches if any member matches
    List(Vec<PatternSource>),
}

impl From<&str> for PatternSource {
    fn from(pattern: &str) -> Self {
        PatternSource::Path(pattern.to_string())
    }
}

impl From<String> for PatternSource {
    fn from(pattern: String) -> Self {
        PatternSource::Path(pattern)
    }
}

impl From<Regex> for PatternSource {
    fn from(regex: Regex) -> Self {
        PatternSource::Regex(regex)
    }
}

impl From<Vec<&str>> for PatternSource {
    fn from(patterns: Vec<&str>) -> Self {
        PatternSource::List(patterns.into_iter().map(PatternSource::from).collect())
    }
}

impl From<Vec<String>> for PatternSource {
    fn from(patterns: Vec<String>) -> Self {
        PatternSource::List(patterns.into_iter().map(PatternSource::from).collect())
    }
}

/// Compiled matcher with its ordered parameter keys
///
/// `keys.len()` always equals the number of explicit capture groups of
/// `regex`, and keys appear in capture-group order.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub regex: Regex,
    pub keys: Vec<ParamToken>,
    /// Pattern text the matcher was compiled from
    pub source: String,
}

impl CompiledPattern {
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

/// Compiles a pattern source into a matcher plus keys
///
/// # Examples
///
/// ```
/// use waymark_router::pattern::{compile_pattern, PatternOptions};
///
/// let compiled = compile_pattern("/user/:id", PatternOptions::default()).unwrap();
/// assert_eq!(compiled.keys.len(), 1);
/// assert!(compiled.is_match("/user/42"));
/// assert!(compiled.is_match("/USER/42/"));
/// assert!(!compiled.is_match("/user"));
/// ```
pub fn compile_pattern(
    source: impl Into<PatternSource>,
    options: PatternOptions,
) -> Result<CompiledPattern, PatternError> {
    match source.into() {
        PatternSource::Path(pattern) => {
            let tokens = parse(&pattern);
            let regex = tokens_to_regex(&tokens, options)?;
            let keys = tokens
                .into_iter()
                .filter_map(|token| match token {
                    Token::Param(param) => Some(param),
                    Token::Literal(_) => None,
                })
                .collect();

            Ok(CompiledPattern {
                regex,
                keys,
                source: pattern,
            })
        }
        PatternSource::Regex(regex) => {
            let keys = (0..regex.captures_len().saturating_sub(1))
                .map(ParamToken::positional)
                .collect();

            Ok(CompiledPattern {
                source: regex.as_str().to_string(),
                regex,
                keys,
            })
        }
        PatternSource::List(members) => {
            let compiled = members
                .into_iter()
                .map(|member| compile_pattern(member, options))
                .collect::<Result<Vec<_>, _>>()?;

            let alternation = format!(
                "(?:{})",
                compiled
                    .iter()
                    .map(|member| member.regex.as_str())
                    .collect::<Vec<_>>()
                    .join("|")
            );
            let regex = build_regex(&alternation, options)?;
            let source = compiled
                .iter()
                .map(|member| member.source.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let keys = compiled.into_iter().flat_map(|member| member.keys).collect();

            Ok(CompiledPattern { regex, keys, source })
        }
    }
}

/// Compiles a token sequence into an anchored matching expression
///
/// Required parameters become `prefix(pattern)`, optional ones
/// `(?:prefix(pattern))?`; repeating parameters wrap the inner pattern as
/// `pattern(?:prefix pattern)*` first.
pub fn tokens_to_regex(tokens: &[Token], options: PatternOptions) -> Result<Regex, PatternError> {
    let ends_with_slash = matches!(tokens.last(), Some(Token::Literal(text)) if text.ends_with('/'));
    let trim_trailing_slash = ends_with_slash && !options.strict;
    let last = tokens.len().saturating_sub(1);

    let mut route = String::from("^");

    for (index, token) in tokens.iter().enumerate() {
        match token {
            Token::Literal(text) if trim_trailing_slash && index == last => {
                route.push_str(&regex::escape(&text[..text.len() - 1]));
            }
            Token::Literal(text) => route.push_str(&regex::escape(text)),
            Token::Param(param) => route.push_str(&param_capture(param)),
        }
    }

    if !options.strict {
        route.push_str("(?:/)?");
    }

    if options.end {
        route.push('$');
    } else if !(options.strict && ends_with_slash) {
        route.push_str("(?:/|$)");
    }

    build_regex(&route, options)
}

fn param_capture(param: &ParamToken) -> String {
    let prefix = regex::escape(&param.prefix);
    let mut capture = param.pattern.clone();

    if param.repeat {
        capture = format!("{capture}(?:{prefix}{capture})*");
    }

    if param.optional {
        if prefix.is_empty() {
            format!("({capture})?")
        } else {
            format!("(?:{prefix}({capture}))?")
        }
    } else {
        format!("{prefix}({capture})")
    }
}

fn build_regex(expression: &str, options: PatternOptions) -> Result<Regex, PatternError> {
    RegexBuilder::new(expression)
        .case_insensitive(!options.sensitive)
        .build()
        .map_err(|source| PatternError::InvalidRegex {
            pattern: expression.to_string(),
            source,
        })
}
