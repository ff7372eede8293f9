//! Conditions: named, reusable predicates over a resolved element.
//!
//! Each condition also defines what it means when no element can be resolved
//! at all (its "applies when absent" value). `hidden` holds for a missing
//! element, `visible` does not. Negation flips both the predicate and the
//! absence value.

use regex::Regex;
use std::fmt;
use std::sync::Arc;

use crate::driver::{DriverErrorKind, DriverResult, ElementHandle, UiDriver};
use crate::script;

type Predicate = dyn Fn(&dyn UiDriver, &ElementHandle) -> DriverResult<bool> + Send + Sync;

/// A named predicate over an element with a defined absence policy
#[derive(Clone)]
pub struct Condition {
    name: String,
    apply_null: bool,
    predicate: Arc<Predicate>,
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("name", &self.name)
            .field("apply_null", &self.apply_null)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Condition {
    /// Create a custom condition
    pub fn new<F>(name: impl Into<String>, apply_null: bool, predicate: F) -> Self
    where
        F: Fn(&dyn UiDriver, &ElementHandle) -> DriverResult<bool> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            apply_null,
            predicate: Arc::new(predicate),
        }
    }

    /// Human-readable name, e.g. `text 'Hello'`
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Truth value when no element can be resolved
    #[must_use]
    pub const fn applies_when_absent(&self) -> bool {
        self.apply_null
    }

    /// Evaluate against a resolved element
    ///
    /// # Errors
    ///
    /// Returns the driver failure raised while reading the element
    pub fn apply(&self, driver: &dyn UiDriver, element: &ElementHandle) -> DriverResult<bool> {
        (self.predicate)(driver, element)
    }

    /// The logical negation, named `not <name>`
    #[must_use]
    pub fn negate(&self) -> Self {
        let inner = Arc::clone(&self.predicate);
        Self {
            name: format!("not {}", self.name),
            apply_null: !self.apply_null,
            predicate: Arc::new(move |driver: &dyn UiDriver, element: &ElementHandle| {
                inner(driver, element).map(|held| !held)
            }),
        }
    }
}

// =============================================================================
// BUILT-IN CONDITIONS
// =============================================================================

/// Element is attached to the document
#[must_use]
pub fn exist() -> Condition {
    Condition::new("exist", false, |driver, element| {
        match driver.is_displayed(element) {
            Ok(_) => Ok(true),
            Err(err) if err.kind == DriverErrorKind::StaleElement => Ok(false),
            Err(err) => Err(err),
        }
    })
}

/// Alias of [`exist`]
#[must_use]
pub fn present() -> Condition {
    let mut condition = exist();
    condition.name = "present".to_string();
    condition
}

/// Element is rendered visibly
#[must_use]
pub fn visible() -> Condition {
    Condition::new("visible", false, |driver, element| {
        driver.is_displayed(element)
    })
}

/// Alias of [`visible`]
#[must_use]
pub fn appear() -> Condition {
    let mut condition = visible();
    condition.name = "appear".to_string();
    condition
}

/// Element is not rendered, detached, or absent
#[must_use]
pub fn hidden() -> Condition {
    Condition::new("hidden", true, |driver, element| {
        match driver.is_displayed(element) {
            Ok(displayed) => Ok(!displayed),
            Err(err) if err.kind == DriverErrorKind::StaleElement => Ok(true),
            Err(err) => Err(err),
        }
    })
}

/// Alias of [`hidden`]
#[must_use]
pub fn disappear() -> Condition {
    let mut condition = hidden();
    condition.name = "disappear".to_string();
    condition
}

/// Rendered text contains `expected`, ignoring case and whitespace runs
#[must_use]
pub fn text(expected: &str) -> Condition {
    let needle = normalize(expected).to_lowercase();
    Condition::new(format!("text '{expected}'"), false, move |driver, element| {
        let actual = normalize(&driver.text(element)?).to_lowercase();
        Ok(actual.contains(&needle))
    })
}

/// Rendered text equals `expected`, ignoring case and whitespace runs
#[must_use]
pub fn exact_text(expected: &str) -> Condition {
    let wanted = normalize(expected).to_lowercase();
    Condition::new(
        format!("exact text '{expected}'"),
        false,
        move |driver, element| Ok(normalize(&driver.text(element)?).to_lowercase() == wanted),
    )
}

/// Rendered text matches a regular expression
#[must_use]
pub fn match_text(pattern: Regex) -> Condition {
    Condition::new(
        format!("match text '{}'", pattern.as_str()),
        false,
        move |driver, element| Ok(pattern.is_match(&driver.text(element)?)),
    )
}

/// Value attribute contains `expected`, ignoring case and whitespace runs
#[must_use]
pub fn value(expected: &str) -> Condition {
    let needle = normalize(expected).to_lowercase();
    Condition::new(format!("value '{expected}'"), false, move |driver, element| {
        let actual = driver.attribute(element, "value")?.unwrap_or_default();
        Ok(normalize(&actual).to_lowercase().contains(&needle))
    })
}

/// Attribute is present
#[must_use]
pub fn attribute(name: &str) -> Condition {
    let attr = name.to_string();
    Condition::new(format!("attribute {name}"), false, move |driver, element| {
        Ok(driver.attribute(element, &attr)?.is_some())
    })
}

/// Attribute equals `expected`
#[must_use]
pub fn attribute_value(name: &str, expected: &str) -> Condition {
    let attr = name.to_string();
    let wanted = expected.to_string();
    Condition::new(
        format!("{name}={expected}"),
        false,
        move |driver, element| Ok(driver.attribute(element, &attr)?.as_deref() == Some(wanted.as_str())),
    )
}

/// `name` attribute equals `expected`
#[must_use]
pub fn name(expected: &str) -> Condition {
    attribute_value("name", expected)
}

/// `id` attribute equals `expected`
#[must_use]
pub fn id(expected: &str) -> Condition {
    attribute_value("id", expected)
}

/// `class` attribute contains the class token
#[must_use]
pub fn css_class(class: &str) -> Condition {
    let wanted = class.to_string();
    Condition::new(format!("css class '{class}'"), false, move |driver, element| {
        let classes = driver.attribute(element, "class")?.unwrap_or_default();
        Ok(classes.split_whitespace().any(|token| token == wanted))
    })
}

/// Element has keyboard focus
#[must_use]
pub fn focused() -> Condition {
    Condition::new("focused", false, |driver, element| {
        let active = driver.execute_script(script::ACTIVE_ELEMENT, &[])?;
        Ok(ElementHandle::from_json(&active).as_ref() == Some(element))
    })
}

/// Element is enabled
#[must_use]
pub fn enabled() -> Condition {
    Condition::new("enabled", false, |driver, element| driver.is_enabled(element))
}

/// Element is disabled
#[must_use]
pub fn disabled() -> Condition {
    Condition::new("disabled", false, |driver, element| {
        driver.is_enabled(element).map(|enabled| !enabled)
    })
}

/// Option, checkbox or radio is selected
#[must_use]
pub fn selected() -> Condition {
    Condition::new("selected", false, |driver, element| driver.is_selected(element))
}

/// Alias of [`selected`]
#[must_use]
pub fn checked() -> Condition {
    let mut condition = selected();
    condition.name = "checked".to_string();
    condition
}

/// Both the value attribute and the rendered text are empty
#[must_use]
pub fn empty() -> Condition {
    Condition::new("empty", false, |driver, element| {
        let value = driver.attribute(element, "value")?.unwrap_or_default();
        Ok(value.is_empty() && driver.text(element)?.is_empty())
    })
}

/// Negation of `condition`
#[must_use]
pub fn not(condition: &Condition) -> Condition {
    condition.negate()
}

/// All of `conditions` hold; absent only when every one applies to absence
#[must_use]
pub fn and(name: &str, conditions: Vec<Condition>) -> Condition {
    let apply_null = conditions.iter().all(Condition::applies_when_absent);
    Condition::new(name, apply_null, move |driver, element| {
        for condition in &conditions {
            if !condition.apply(driver, element)? {
                return Ok(false);
            }
        }
        Ok(true)
    })
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::mock::{MockDriver, MockNode};
    use crate::driver::DriverError;

    fn fixture() -> (MockDriver, ElementHandle, ElementHandle) {
        let driver = MockDriver::new();
        let shown = driver.insert(
            MockNode::new("input")
                .attr("id", "email")
                .attr("name", "email")
                .attr("class", "field  wide")
                .attr("value", "Ada@Example.com")
                .text("  Hello   World "),
        );
        let concealed = driver.insert(MockNode::new("div").hidden().disabled());
        (driver, shown, concealed)
    }

    mod visibility_tests {
        use super::*;

        #[test]
        fn test_visible_and_hidden() {
            let (driver, shown, concealed) = fixture();
            assert!(visible().apply(&driver, &shown).unwrap());
            assert!(!visible().apply(&driver, &concealed).unwrap());
            assert!(hidden().apply(&driver, &concealed).unwrap());
            assert!(!hidden().apply(&driver, &shown).unwrap());
        }

        #[test]
        fn test_absence_policy() {
            assert!(!exist().applies_when_absent());
            assert!(!visible().applies_when_absent());
            assert!(hidden().applies_when_absent());
            assert!(disappear().applies_when_absent());
            assert!(not(&visible()).applies_when_absent());
            assert!(!not(&hidden()).applies_when_absent());
        }

        #[test]
        fn test_stale_element_does_not_exist_but_is_hidden() {
            let (driver, shown, _) = fixture();
            driver.remove(&shown);
            assert!(!exist().apply(&driver, &shown).unwrap());
            assert!(hidden().apply(&driver, &shown).unwrap());
            assert_eq!(
                visible().apply(&driver, &shown).unwrap_err().kind,
                DriverErrorKind::StaleElement
            );
        }

        #[test]
        fn test_exist_propagates_other_failures() {
            let (driver, shown, _) = fixture();
            driver.fail_next("is_displayed", DriverError::webdriver("session hiccup"));
            assert_eq!(
                exist().apply(&driver, &shown).unwrap_err().kind,
                DriverErrorKind::WebDriver
            );
        }

        #[test]
        fn test_aliases_keep_semantics_with_own_names() {
            assert_eq!(appear().name(), "appear");
            assert_eq!(present().name(), "present");
            assert_eq!(checked().name(), "checked");
            assert!(!appear().applies_when_absent());
        }
    }

    mod text_tests {
        use super::*;

        #[test]
        fn test_text_is_case_and_whitespace_insensitive_substring() {
            let (driver, shown, _) = fixture();
            assert!(text("hello world").apply(&driver, &shown).unwrap());
            assert!(text("WORLD").apply(&driver, &shown).unwrap());
            assert!(!text("goodbye").apply(&driver, &shown).unwrap());
        }

        #[test]
        fn test_exact_text() {
            let (driver, shown, _) = fixture();
            assert!(exact_text("hello world").apply(&driver, &shown).unwrap());
            assert!(!exact_text("hello").apply(&driver, &shown).unwrap());
        }

        #[test]
        fn test_match_text() {
            let (driver, shown, _) = fixture();
            let pattern = Regex::new(r"^\s*Hello\s+World\s*$").unwrap();
            assert!(match_text(pattern).apply(&driver, &shown).unwrap());
        }

        #[test]
        fn test_names() {
            assert_eq!(text("Go").name(), "text 'Go'");
            assert_eq!(exact_text("Go").to_string(), "exact text 'Go'");
            assert_eq!(not(&text("Go")).name(), "not text 'Go'");
        }
    }

    mod attribute_tests {
        use super::*;

        #[test]
        fn test_value_and_attributes() {
            let (driver, shown, _) = fixture();
            assert!(value("ada@example").apply(&driver, &shown).unwrap());
            assert!(attribute("name").apply(&driver, &shown).unwrap());
            assert!(!attribute("placeholder").apply(&driver, &shown).unwrap());
            assert!(name("email").apply(&driver, &shown).unwrap());
            assert!(id("email").apply(&driver, &shown).unwrap());
            assert!(!attribute_value("name", "mail").apply(&driver, &shown).unwrap());
        }

        #[test]
        fn test_css_class_matches_whole_tokens() {
            let (driver, shown, _) = fixture();
            assert!(css_class("wide").apply(&driver, &shown).unwrap());
            assert!(!css_class("wid").apply(&driver, &shown).unwrap());
        }

        #[test]
        fn test_enabled_disabled() {
            let (driver, shown, concealed) = fixture();
            assert!(enabled().apply(&driver, &shown).unwrap());
            assert!(disabled().apply(&driver, &concealed).unwrap());
        }

        #[test]
        fn test_empty() {
            let driver = MockDriver::new();
            let blank = driver.insert(MockNode::new("textarea"));
            assert!(empty().apply(&driver, &blank).unwrap());
            let (driver, shown, _) = fixture();
            assert!(!empty().apply(&driver, &shown).unwrap());
        }

        #[test]
        fn test_focused_uses_active_element() {
            let (driver, shown, concealed) = fixture();
            driver.focus(&shown);
            assert!(focused().apply(&driver, &shown).unwrap());
            assert!(!focused().apply(&driver, &concealed).unwrap());
        }
    }

    mod composition_tests {
        use super::*;

        #[test]
        fn test_and_requires_every_condition() {
            let (driver, shown, concealed) = fixture();
            let ready = and("ready", vec![visible(), enabled()]);
            assert!(ready.apply(&driver, &shown).unwrap());
            assert!(!ready.apply(&driver, &concealed).unwrap());
            assert!(!ready.applies_when_absent());
        }

        #[test]
        fn test_double_negation_restores_policy() {
            let (driver, shown, _) = fixture();
            let twice = not(&not(&visible()));
            assert_eq!(twice.name(), "not not visible");
            assert!(!twice.applies_when_absent());
            assert!(twice.apply(&driver, &shown).unwrap());
        }

        #[test]
        fn test_custom_condition() {
            let (driver, shown, _) = fixture();
            let is_input = Condition::new("an input", false, |driver, element| {
                Ok(driver.tag_name(element)? == "input")
            });
            assert!(is_input.apply(&driver, &shown).unwrap());
            assert!(format!("{is_input:?}").contains("an input"));
        }
    }
}
