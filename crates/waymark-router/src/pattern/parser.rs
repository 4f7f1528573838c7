/// Pattern parsing into tokens
///
/// A single scanner expression walks the pattern; every match is folded into
/// a [`ParseState`] accumulator. Text between matches becomes literal tokens.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::{ParamName, ParamToken, Token};

/// Scanner for the constructs recognised inside a pattern
///
/// Groups:
/// 1. escaped char (`\X`)
/// 2. prefix (`/` or `.`)
/// 3. parameter name
/// 4. custom pattern after a name
/// 5. anonymous group pattern
/// 6. modifier (`+`, `*`, `?`)
/// 7. bare wildcard (`*`)
static PATH_SCANNER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(\\.)",
        "|",
        r"([/.])?(?:(?::([A-Za-z0-9_]+)(?:\(((?:\\.|[^()])+)\))?|\(((?:\\.|[^()])+)\))([+*?])?|(\*))",
    ))
    .expect("path scanner expression is valid")
});

/// Fold accumulator for the scanner matches
#[derive(Default)]
struct ParseState {
    tokens: Vec<Token>,
    literal: String,
    next_index: usize,
    /// Byte offset just past the last scanner match
    cursor: usize,
}

impl ParseState {
    /// Appends raw source text to the pending literal
    fn with_text(mut self, text: &str) -> Self {
        self.literal.push_str(text);
        self
    }

    /// Pushes the pending literal, if any, as a token
    fn flush_literal(mut self) -> Self {
        if !self.literal.is_empty() {
            let literal = std::mem::take(&mut self.literal);
            self.tokens.push(Token::Literal(literal));
        }
        self
    }

    fn with_param(mut self, caps: &Captures<'_>) -> Self {
        let prefix = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        let suffix = caps.get(6).map(|m| m.as_str());
        let asterisk = caps.get(7).is_some();

        let repeat = matches!(suffix, Some("+") | Some("*"));
        let optional = matches!(suffix, Some("?") | Some("*"));
        let delimiter = if prefix.is_empty() { "/" } else { prefix };

        let pattern = match caps.get(4).or_else(|| caps.get(5)) {
            Some(custom) => custom.as_str().to_string(),
            None if asterisk => ".*".to_string(),
            None => format!("[^{}]+?", regex::escape(delimiter)),
        };

        let name = match caps.get(3) {
            Some(name) => ParamName::Named(name.as_str().to_string()),
            None => {
                let index = self.next_index;
                self.next_index += 1;
                ParamName::Index(index)
            }
        };

        self.tokens.push(Token::Param(ParamToken {
            name,
            prefix: prefix.to_string(),
            delimiter: delimiter.to_string(),
            optional,
            repeat,
            pattern: escape_group(&pattern),
        }));
        self
    }

    /// Processes one scanner match against the source pattern
    fn process_match(self, source: &str, caps: &Captures<'_>) -> Self {
        let Some(whole) = caps.get(0) else {
            return self;
        };

        let start = self.cursor;
        let mut state = self.with_text(&source[start..whole.start()]);
        state.cursor = whole.end();

        match caps.get(1) {
            // Escaped chars are never reinterpreted
            Some(escaped) => state.with_text(&escaped.as_str()[1..]),
            None => state.flush_literal().with_param(caps),
        }
    }

    fn finalize(self, source: &str) -> Self {
        let rest = &source[self.cursor..];
        self.with_text(rest).flush_literal()
    }
}

/// Escapes chars in a custom group that would change its meaning when inlined
///
/// Unescaped parens never reach this point (the scanner rejects them), so
/// only the end anchor needs protecting.
fn escape_group(group: &str) -> String {
    let mut escaped = String::with_capacity(group.len());
    let mut chars = group.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                escaped.push(c);
                if let Some(next) = chars.next() {
                    escaped.push(next);
                }
            }
            '$' => escaped.push_str("\\$"),
            _ => escaped.push(c),
        }
    }

    escaped
}

/// Parses a route pattern into tokens (pure function)
///
/// # Examples
///
/// ```
/// use waymark_router::pattern::{parse, ParamName, Token};
///
/// let tokens = parse("/files/:path*");
/// assert_eq!(tokens.len(), 2);
///
/// let param = tokens[1].as_param().unwrap();
/// assert_eq!(param.name, ParamName::Named("path".to_string()));
/// assert!(param.repeat && param.optional);
///
/// // Escaped chars stay literal
/// assert_eq!(parse(r"/a\:b"), vec![Token::Literal("/a:b".to_string())]);
/// ```
pub fn parse(pattern: &str) -> Vec<Token> {
    PATH_SCANNER
        .captures_iter(pattern)
        .fold(ParseState::default(), |state, caps| {
            state.process_match(pattern, &caps)
        })
        .finalize(pattern)
        .tokens
}
