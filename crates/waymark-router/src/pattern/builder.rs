/// Path generation from parsed patterns
///
/// The inverse of matching: substitutes values back into parameter positions.
/// Every value is percent-encoded, then validated against its token's own
/// pattern before it is written.

use std::collections::HashMap;

use regex::Regex;

use super::{ParamToken, Token};
use crate::path::encode_component;
use crate::{BuildError, PatternError};

/// Value supplied for one parameter when building a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::One(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::One(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        ParamValue::Many(values)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(values: Vec<&str>) -> Self {
        ParamValue::Many(values.into_iter().map(str::to_string).collect())
    }
}

/// Parameter values keyed by parameter name (positional names use `"0"`, `"1"`...)
pub type BuildParams = HashMap<String, ParamValue>;

/// Generates concrete paths from a pattern
#[derive(Debug, Clone)]
pub struct PathBuilder {
    tokens: Vec<Token>,
    /// `^pattern$` per token; `None` for literals
    validators: Vec<Option<Regex>>,
}

impl PathBuilder {
    /// Pre-compiles one validator per parameter token
    pub fn from_tokens(tokens: Vec<Token>) -> Result<Self, PatternError> {
        let validators = tokens
            .iter()
            .map(|token| match token {
                Token::Param(param) => {
                    let expression = format!("^(?:{})$", param.pattern);
                    Regex::new(&expression)
                        .map(Some)
                        .map_err(|source| PatternError::InvalidRegex {
                            pattern: expression,
                            source,
                        })
                }
                Token::Literal(_) => Ok(None),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { tokens, validators })
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Builds a path from parameter values
    ///
    /// # Examples
    ///
    /// ```
    /// use waymark_router::pattern::{build_path, BuildParams, ParamValue};
    ///
    /// let builder = build_path("/files/:path*").unwrap();
    ///
    /// let mut params = BuildParams::new();
    /// params.insert("path".to_string(), ParamValue::from(vec!["a", "b"]));
    /// assert_eq!(builder.build(&params).unwrap(), "/files/a/b");
    ///
    /// // Optional tokens are skipped when absent
    /// assert_eq!(builder.build(&BuildParams::new()).unwrap(), "/files");
    /// ```
    pub fn build(&self, params: &BuildParams) -> Result<String, BuildError> {
        let mut path = String::new();

        for (token, validator) in self.tokens.iter().zip(&self.validators) {
            let (param, validator) = match (token, validator) {
                (Token::Literal(text), _) => {
                    path.push_str(text);
                    continue;
                }
                (Token::Param(param), Some(validator)) => (param, validator),
                (Token::Param(_), None) => continue,
            };

            let key = param.name.as_key();
            match params.get(&key) {
                None if param.optional => continue,
                None => return Err(BuildError::Missing { name: key }),
                Some(ParamValue::Many(values)) => {
                    push_repeated(&mut path, param, validator, &key, values)?;
                }
                Some(ParamValue::One(value)) => {
                    let segment = encode_checked(param, validator, &key, value)?;
                    path.push_str(&param.prefix);
                    path.push_str(&segment);
                }
            }
        }

        Ok(path)
    }

    /// Builds a path from plain string values, as produced by a route match
    pub fn build_from(&self, params: &HashMap<String, String>) -> Result<String, BuildError> {
        let params = params
            .iter()
            .map(|(key, value)| (key.clone(), ParamValue::One(value.clone())))
            .collect();
        self.build(&params)
    }
}

fn push_repeated(
    path: &mut String,
    param: &ParamToken,
    validator: &Regex,
    key: &str,
    values: &[String],
) -> Result<(), BuildError> {
    if !param.repeat {
        return Err(BuildError::NotRepeatable {
            name: key.to_string(),
            value: values.to_vec(),
        });
    }

    if values.is_empty() {
        return if param.optional {
            Ok(())
        } else {
            Err(BuildError::Empty {
                name: key.to_string(),
            })
        };
    }

    for (index, value) in values.iter().enumerate() {
        let segment = encode_checked(param, validator, key, value)?;
        path.push_str(if index == 0 {
            &param.prefix
        } else {
            &param.delimiter
        });
        path.push_str(&segment);
    }

    Ok(())
}

fn encode_checked(
    param: &ParamToken,
    validator: &Regex,
    key: &str,
    value: &str,
) -> Result<String, BuildError> {
    let segment = encode_component(value);
    if validator.is_match(&segment) {
        Ok(segment)
    } else {
        Err(BuildError::Mismatch {
            name: key.to_string(),
            pattern: param.pattern.clone(),
            value: segment,
        })
    }
}
