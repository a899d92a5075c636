//! Declarative default resolution for action fields.
//!
//! A [`Directive`] describes where a field value comes from in a raw event:
//! a path lookup (`{"@path": "$.properties.email"}`), a conditional
//! (`{"@if": {"exists": ..., "then": ..., "else": ...}}`) or a literal value.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Value;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid path {0:?}, expected something like `$.properties.email`")]
    InvalidPath(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Directive {
    Path {
        #[serde(rename = "@path")]
        path: String,
    },
    If {
        #[serde(rename = "@if")]
        condition: Box<Conditional>,
    },
    Literal(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditional {
    #[serde(flatten)]
    pub test: Test,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub then: Option<Directive>,
    #[serde(rename = "else", default, skip_serializing_if = "Option::is_none")]
    pub otherwise: Option<Directive>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Test {
    /// Holds when the directive resolves to any value.
    Exists(Directive),
    /// Holds when the directive resolves to a value other than `""`.
    Blank(Directive),
}

impl Directive {
    pub fn path(path: impl Into<String>) -> Self {
        Directive::Path { path: path.into() }
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Directive::Literal(value.into())
    }

    /// `@if exists <probe> then <then> else <otherwise>`
    pub fn if_exists(probe: Directive, then: Directive, otherwise: Directive) -> Self {
        Directive::If {
            condition: Box::new(Conditional {
                test: Test::Exists(probe),
                then: Some(then),
                otherwise: Some(otherwise),
            }),
        }
    }

    /// Resolves the directive against `event`. `Ok(None)` means the value is
    /// absent; JSON `null` is treated as absent too.
    pub fn resolve(&self, event: &Value) -> Result<Option<Value>, Error> {
        let resolved = match self {
            Directive::Path { path } => {
                let pointer = json_pointer(path)?;
                event.pointer(&pointer).cloned()
            }
            Directive::If { condition } => {
                let holds = match &condition.test {
                    Test::Exists(probe) => probe.resolve(event)?.is_some(),
                    Test::Blank(probe) => {
                        matches!(probe.resolve(event)?, Some(v) if v.as_str() != Some(""))
                    }
                };
                let branch = if holds {
                    &condition.then
                } else {
                    &condition.otherwise
                };
                match branch {
                    Some(directive) => directive.resolve(event)?,
                    None => None,
                }
            }
            Directive::Literal(value) => Some(value.clone()),
        };
        Ok(resolved.filter(|v| !v.is_null()))
    }
}

/// Translates a path like `$.context.traits[0].email` into the JSON pointer
/// `/context/traits/0/email`.
pub fn json_pointer(path: &str) -> Result<String, Error> {
    let invalid = || Error::InvalidPath(path.to_string());
    let rest = path.strip_prefix('$').ok_or_else(invalid)?;

    let mut pointer = String::new();
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        let token = match c {
            '.' => {
                let mut key = String::new();
                while let Some(&c) = chars.peek() {
                    if c == '.' || c == '[' {
                        break;
                    }
                    key.push(c);
                    chars.next();
                }
                key
            }
            '[' => {
                let mut index = String::new();
                loop {
                    match chars.next() {
                        Some(']') => break,
                        Some(c) if c.is_ascii_digit() => index.push(c),
                        _ => return Err(invalid()),
                    }
                }
                index
            }
            _ => return Err(invalid()),
        };
        if token.is_empty() {
            return Err(invalid());
        }
        pointer.push('/');
        pointer.push_str(&token.replace('~', "~0").replace('/', "~1"));
    }
    Ok(pointer)
}
