//! Selectors describing how to locate elements.
//!
//! A [`Selector`] is immutable once built. Drivers consume it through
//! [`Selector::locator`], which renders the W3C WebDriver locator strategy
//! and value pair.

use serde::{Deserialize, Serialize};
use std::fmt;

/// W3C WebDriver locator strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// `css selector`
    Css,
    /// `xpath`
    XPath,
    /// `link text`
    LinkText,
    /// `tag name`
    TagName,
}

impl Strategy {
    /// Wire name of the strategy
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Css => "css selector",
            Self::XPath => "xpath",
            Self::LinkText => "link text",
            Self::TagName => "tag name",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selector {
    /// CSS selector (e.g., "button.primary")
    Css(String),
    /// XPath expression, evaluated relative to the search scope
    XPath(String),
    /// Element id attribute
    Id(String),
    /// Element name attribute
    Name(String),
    /// Tag name
    TagName(String),
    /// Exact link text of an anchor
    LinkText(String),
    /// Exact (whitespace-normalized) own text of an element
    Text(String),
    /// Value attribute
    Value(String),
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::XPath(expression.into())
    }

    /// Create an id selector
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Create a name selector
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Create a tag name selector
    #[must_use]
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::TagName(tag.into())
    }

    /// Create a link text selector
    #[must_use]
    pub fn link_text(text: impl Into<String>) -> Self {
        Self::LinkText(text.into())
    }

    /// Create an exact text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create a value attribute selector
    #[must_use]
    pub fn value(value: impl Into<String>) -> Self {
        Self::Value(value.into())
    }

    /// Parent of the scoping element
    #[must_use]
    pub fn parent() -> Self {
        Self::XPath("..".to_string())
    }

    /// Nearest ancestor matching a tag name, or a class when prefixed with `.`
    #[must_use]
    pub fn closest(tag_or_class: &str) -> Self {
        match tag_or_class.strip_prefix('.') {
            Some(class) => Self::XPath(format!(
                "ancestor::*[@class={}][1]",
                xpath_literal(class)
            )),
            None => Self::XPath(format!("ancestor::{tag_or_class}[1]")),
        }
    }

    /// Render as a W3C locator strategy and value
    #[must_use]
    pub fn locator(&self) -> (Strategy, String) {
        match self {
            Self::Css(s) => (Strategy::Css, s.clone()),
            Self::XPath(s) => (Strategy::XPath, s.clone()),
            Self::Id(id) => (Strategy::Css, format!("*[id={}]", css_string(id))),
            Self::Name(name) => (Strategy::Css, format!("*[name={}]", css_string(name))),
            Self::TagName(tag) => (Strategy::TagName, tag.clone()),
            Self::LinkText(text) => (Strategy::LinkText, text.clone()),
            Self::Text(text) => (
                Strategy::XPath,
                format!(
                    ".//*/text()[normalize-space(.) = {}]/parent::*",
                    xpath_literal(text)
                ),
            ),
            Self::Value(value) => (
                Strategy::XPath,
                format!(".//*[@value = {}]", xpath_literal(value)),
            ),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css: {s}"),
            Self::XPath(s) => write!(f, "xpath: {s}"),
            Self::Id(s) => write!(f, "id: {s}"),
            Self::Name(s) => write!(f, "name: {s}"),
            Self::TagName(s) => write!(f, "tag: {s}"),
            Self::LinkText(s) => write!(f, "link text: {s}"),
            Self::Text(s) => write!(f, "text: {s}"),
            Self::Value(s) => write!(f, "value: {s}"),
        }
    }
}

impl From<&str> for Selector {
    fn from(css: &str) -> Self {
        Self::Css(css.to_string())
    }
}

impl From<String> for Selector {
    fn from(css: String) -> Self {
        Self::Css(css)
    }
}

/// Quote a string as an XPath 1.0 literal.
///
/// XPath has no escape sequences, so text containing both quote kinds is
/// spliced together with `concat()`.
#[must_use]
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('"') {
        return format!("\"{text}\"");
    }
    if !text.contains('\'') {
        return format!("'{text}'");
    }
    let parts: Vec<String> = text
        .split('"')
        .map(|part| format!("\"{part}\""))
        .collect();
    format!("concat({})", parts.join(", '\"', "))
}

fn css_string(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}
