//! 模板渲染模块：将 `{{name}}` 占位符替换为记录中的字段值。
//!
//! # Template Module
//!
//! Literal placeholder substitution for prompt templates.
//!
//! A template is plain text with zero or more `{{name}}` placeholders. Rendering
//! visits the record's fields in name order and replaces every occurrence of
//! `{{field}}` with the field's display form. Each replacement works on the
//! output of the previous one, so a value that itself contains `{{other}}` is
//! filled in if `other` sorts after the field that introduced it:
//!
//! ```rust
//! use prompt_fanout::template::render;
//! use prompt_fanout::types::Record;
//!
//! let record = Record::new().with("name", "Bob");
//! assert_eq!(render("Hi {{name}}", &record), "Hi Bob");
//!
//! // `a` is visited first, then `b` re-introduces `{{a}}`, which stays.
//! let tricky = Record::new().with("a", "x").with("b", "{{a}}");
//! assert_eq!(render("{{a}}{{b}}", &tricky), "x{{a}}");
//! ```
//!
//! Placeholders with no matching field are left verbatim; fields with no
//! placeholder are ignored.

use crate::types::{Record, RequestId};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use thiserror::Error;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([^{}]+)\}\}").expect("placeholder pattern is valid"));

/// Errors raised while turning records into rendered requests.
///
/// `index` is the position of the offending record in its batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("record {index} is not a JSON object")]
    NotAnObject { index: usize },

    #[error("record {index} field `{field}` has no scalar string representation")]
    NonScalarValue { index: usize, field: String },

    #[error("record {index} leaves placeholder `{{{{{placeholder}}}}}` unbound")]
    UnboundPlaceholder { index: usize, placeholder: String },

    #[error("identifier {id} was issued twice in one batch")]
    DuplicateId { id: RequestId },
}

/// The literal token a field named `name` fills: `{{name}}`.
pub fn placeholder(name: &str) -> String {
    format!("{{{{{}}}}}", name)
}

/// Fills `template` from `record`.
pub fn render(template: &str, record: &Record) -> String {
    record
        .iter()
        .fold(template.to_string(), |text, (name, value)| {
            text.replace(&placeholder(name), &value.to_string())
        })
}

/// A prompt template with placeholder introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
}

impl Template {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Distinct placeholder names in order of first appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for caps in PLACEHOLDER.captures_iter(&self.source) {
            if let Some(name) = caps.get(1).map(|m| m.as_str()) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Placeholder names `record` has no field for.
    pub fn unbound<'a>(&'a self, record: &Record) -> Vec<&'a str> {
        self.placeholders()
            .into_iter()
            .filter(|name| !record.contains(name))
            .collect()
    }

    pub fn render(&self, record: &Record) -> String {
        render(&self.source, record)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl From<&str> for Template {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Template {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
