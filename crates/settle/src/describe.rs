//! Best-effort element snapshots for failure messages.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::driver::{ElementHandle, UiDriver};

/// Attributes worth showing when describing an element
const KEY_ATTRIBUTES: [&str; 9] = [
    "id",
    "name",
    "class",
    "value",
    "disabled",
    "type",
    "placeholder",
    "href",
    "src",
];

/// What an element looked like when a wait gave up on it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// Tag name
    pub tag: String,
    /// Key attributes that were present, in a fixed order
    pub attributes: Vec<(String, String)>,
    /// Rendered text
    pub text: String,
    /// Displayed flag, when it could be read
    pub displayed: Option<bool>,
    /// Set when the element could not be read at all
    pub unavailable: Option<String>,
}

impl ElementSnapshot {
    /// Read what can be read; failures are recorded, never raised
    #[must_use]
    pub fn capture(driver: &dyn UiDriver, element: &ElementHandle) -> Self {
        let tag = match driver.tag_name(element) {
            Ok(tag) => tag,
            Err(err) => {
                return Self {
                    unavailable: Some(err.to_string()),
                    ..Self::default()
                }
            }
        };
        let attributes = KEY_ATTRIBUTES
            .iter()
            .filter_map(|name| {
                driver
                    .attribute(element, name)
                    .ok()
                    .flatten()
                    .map(|value| ((*name).to_string(), value))
            })
            .collect();
        Self {
            tag,
            attributes,
            text: driver.text(element).unwrap_or_default(),
            displayed: driver.is_displayed(element).ok(),
            unavailable: None,
        }
    }
}

impl fmt::Display for ElementSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(reason) = &self.unavailable {
            return write!(f, "{reason}");
        }
        write!(f, "<{}", self.tag)?;
        for (name, value) in &self.attributes {
            write!(f, " {name}=\"{value}\"")?;
        }
        if self.displayed == Some(false) {
            write!(f, " displayed:false")?;
        }
        write!(f, ">{}</{}>", self.text, self.tag)
    }
}
