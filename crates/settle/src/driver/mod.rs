//! UiDriver - the browser capability settle is built on.
//!
//! The trait covers element lookup, reads and input primitives. Script
//! execution handles whatever the plain driver API does not expose.
//! Implementations translate their own failures into [`DriverError`] with
//! the right [`DriverErrorKind`]; the polling layer retries based on it.
//!
//! ```text
//! ┌─────────────┐   find_elements    ┌──────────────────────┐
//! │  resolver   │───────────────────►│  UiDriver            │
//! │  wait loop  │   reads / input    │  (WebDriver client,  │
//! │  operations │───────────────────►│   CDP bridge, mock)  │
//! └─────────────┘                    └──────────────────────┘
//! ```

pub mod mock;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

use crate::selector::Selector;

/// W3C WebDriver web element identifier key
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Result type for driver calls
pub type DriverResult<T> = Result<T, DriverError>;

/// Opaque reference to a live element owned by the driver
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Driver-assigned element id
    pub id: String,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Serialize as a W3C web element reference
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut reference = Map::new();
        reference.insert(ELEMENT_KEY.to_string(), Value::String(self.id.clone()));
        Value::Object(reference)
    }

    /// Parse a W3C web element reference returned by a script
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(Self::new)
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element {}", self.id)
    }
}

/// Classification of driver failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriverErrorKind {
    /// No element matched
    NoSuchElement,
    /// The element was detached from the document
    StaleElement,
    /// Fewer matches than the requested ordinal
    IndexOutOfBounds,
    /// The element cannot receive input right now
    NotInteractable,
    /// The selector is malformed
    InvalidSelector,
    /// Any other browser-side failure
    WebDriver,
    /// A defect that must never be retried
    Unexpected,
}

impl DriverErrorKind {
    /// Whether the polling loop may absorb this failure and try again
    #[must_use]
    pub const fn is_recoverable(self) -> bool {
        !matches!(self, Self::InvalidSelector | Self::Unexpected)
    }

    /// Map a W3C WebDriver error code
    #[must_use]
    pub fn from_w3c(code: &str) -> Self {
        match code {
            "no such element" => Self::NoSuchElement,
            "stale element reference" => Self::StaleElement,
            "element not interactable" | "element click intercepted" => Self::NotInteractable,
            "invalid selector" => Self::InvalidSelector,
            _ => Self::WebDriver,
        }
    }

    /// Human readable name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoSuchElement => "no such element",
            Self::StaleElement => "stale element reference",
            Self::IndexOutOfBounds => "index out of bounds",
            Self::NotInteractable => "element not interactable",
            Self::InvalidSelector => "invalid selector",
            Self::WebDriver => "webdriver error",
            Self::Unexpected => "unexpected error",
        }
    }
}

impl fmt::Display for DriverErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a [`UiDriver`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct DriverError {
    /// Classification
    pub kind: DriverErrorKind,
    /// Driver message
    pub message: String,
}

impl DriverError {
    /// Create a driver error
    pub fn new(kind: DriverErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// No element matched
    pub fn no_such_element(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::NoSuchElement, message)
    }

    /// Element was detached
    pub fn stale(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::StaleElement, message)
    }

    /// Fewer matches than the requested ordinal
    #[must_use]
    pub fn index_out_of_bounds(index: usize, len: usize) -> Self {
        Self::new(
            DriverErrorKind::IndexOutOfBounds,
            format!("index {index} out of range for {len} matches"),
        )
    }

    /// Element cannot receive input
    pub fn not_interactable(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::NotInteractable, message)
    }

    /// Malformed selector
    pub fn invalid_selector(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::InvalidSelector, message)
    }

    /// Generic recoverable browser failure
    pub fn webdriver(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::WebDriver, message)
    }

    /// Defect that must propagate unchanged
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(DriverErrorKind::Unexpected, message)
    }

    /// Whether the polling loop may absorb this failure
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        self.kind.is_recoverable()
    }
}

/// Page coordinates of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: i64,
    /// Y coordinate
    pub y: i64,
}

impl Point {
    /// Create a new point
    #[must_use]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Positional argument bound to `arguments[n]` in a script
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptArg {
    /// Element reference
    Element(ElementHandle),
    /// String value
    Str(String),
    /// Integer value
    Int(i64),
    /// Boolean value
    Bool(bool),
}

impl ScriptArg {
    /// Wire representation of the argument
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Element(handle) => handle.to_json(),
            Self::Str(s) => Value::String(s.clone()),
            Self::Int(n) => Value::from(*n),
            Self::Bool(b) => Value::Bool(*b),
        }
    }

    /// Element reference, if this argument is one
    #[must_use]
    pub const fn as_element(&self) -> Option<&ElementHandle> {
        match self {
            Self::Element(handle) => Some(handle),
            _ => None,
        }
    }

    /// String value, if this argument is one
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&ElementHandle> for ScriptArg {
    fn from(handle: &ElementHandle) -> Self {
        Self::Element(handle.clone())
    }
}

impl From<&str> for ScriptArg {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for ScriptArg {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for ScriptArg {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<bool> for ScriptArg {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Browser automation capability used by every settle operation.
///
/// Calls are blocking. Implementations need not be safe for concurrent use
/// of one browsing session, but must be `Send + Sync` so a session can be
/// shared behind an `Arc`.
pub trait UiDriver: Send + Sync {
    /// All elements matching `selector`, searched inside `scope` or the
    /// whole document. An empty vector means no match; malformed selectors
    /// fail with [`DriverErrorKind::InvalidSelector`].
    fn find_elements(
        &self,
        scope: Option<&ElementHandle>,
        selector: &Selector,
    ) -> DriverResult<Vec<ElementHandle>>;

    /// Lower-case tag name
    fn tag_name(&self, element: &ElementHandle) -> DriverResult<String>;

    /// Attribute or property value
    fn attribute(&self, element: &ElementHandle, name: &str) -> DriverResult<Option<String>>;

    /// Computed CSS property value
    fn css_value(&self, element: &ElementHandle, name: &str) -> DriverResult<String>;

    /// Rendered (visible) text
    fn text(&self, element: &ElementHandle) -> DriverResult<String>;

    /// Whether the element is rendered visibly
    fn is_displayed(&self, element: &ElementHandle) -> DriverResult<bool>;

    /// Whether the element is enabled
    fn is_enabled(&self, element: &ElementHandle) -> DriverResult<bool>;

    /// Whether an option, checkbox or radio is selected
    fn is_selected(&self, element: &ElementHandle) -> DriverResult<bool>;

    /// Page coordinates of the element
    fn location(&self, element: &ElementHandle) -> DriverResult<Point>;

    /// Native click
    fn click(&self, element: &ElementHandle) -> DriverResult<()>;

    /// Native keystrokes
    fn send_keys(&self, element: &ElementHandle, text: &str) -> DriverResult<()>;

    /// Clear an editable element
    fn clear(&self, element: &ElementHandle) -> DriverResult<()>;

    /// Right click
    fn context_click(&self, element: &ElementHandle) -> DriverResult<()>;

    /// Move the pointer over the element
    fn hover(&self, element: &ElementHandle) -> DriverResult<()>;

    /// Drag `source` and drop it on `target`
    fn drag_and_drop(&self, source: &ElementHandle, target: &ElementHandle) -> DriverResult<()>;

    /// Execute a script with positional arguments bound to `arguments[n]`
    fn execute_script(&self, script: &str, args: &[ScriptArg]) -> DriverResult<Value>;

    /// Navigate the session to a URL
    fn navigate(&self, url: &str) -> DriverResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    mod element_handle_tests {
        use super::*;

        #[test]
        fn test_json_round_trip_uses_w3c_key() {
            let handle = ElementHandle::new("abc-1");
            let value = handle.to_json();
            assert_eq!(value[ELEMENT_KEY], "abc-1");
            assert_eq!(ElementHandle::from_json(&value), Some(handle));
        }

        #[test]
        fn test_from_json_rejects_non_elements() {
            assert_eq!(ElementHandle::from_json(&Value::Null), None);
            assert_eq!(ElementHandle::from_json(&json!({ "id": "x" })), None);
        }
    }

    mod error_kind_tests {
        use super::*;

        #[test]
        fn test_recoverable_set() {
            assert!(DriverErrorKind::NoSuchElement.is_recoverable());
            assert!(DriverErrorKind::StaleElement.is_recoverable());
            assert!(DriverErrorKind::IndexOutOfBounds.is_recoverable());
            assert!(DriverErrorKind::NotInteractable.is_recoverable());
            assert!(DriverErrorKind::WebDriver.is_recoverable());
            assert!(!DriverErrorKind::InvalidSelector.is_recoverable());
            assert!(!DriverErrorKind::Unexpected.is_recoverable());
        }

        #[test]
        fn test_from_w3c_codes() {
            assert_eq!(
                DriverErrorKind::from_w3c("no such element"),
                DriverErrorKind::NoSuchElement
            );
            assert_eq!(
                DriverErrorKind::from_w3c("stale element reference"),
                DriverErrorKind::StaleElement
            );
            assert_eq!(
                DriverErrorKind::from_w3c("invalid selector"),
                DriverErrorKind::InvalidSelector
            );
            assert_eq!(
                DriverErrorKind::from_w3c("element click intercepted"),
                DriverErrorKind::NotInteractable
            );
            assert_eq!(
                DriverErrorKind::from_w3c("javascript error"),
                DriverErrorKind::WebDriver
            );
        }

        #[test]
        fn test_display() {
            let err = DriverError::index_out_of_bounds(3, 1);
            assert_eq!(
                err.to_string(),
                "index out of bounds: index 3 out of range for 1 matches"
            );
        }
    }

    #[test]
    fn test_script_arg_conversions() {
        let handle = ElementHandle::new("e1");
        assert_eq!(ScriptArg::from(&handle).as_element(), Some(&handle));
        assert_eq!(ScriptArg::from("x").as_str(), Some("x"));
        assert_eq!(ScriptArg::from(7_i64).to_json(), json!(7));
        assert_eq!(ScriptArg::from(true).to_json(), json!(true));
        assert_eq!(ScriptArg::from(&handle).to_json(), handle.to_json());
    }
}
