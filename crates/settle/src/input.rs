//! Text entry.
//!
//! Values reach a field one of three ways: native keystrokes, a script that
//! assigns `value` directly, or that script followed by a jQuery replay of
//! the last keystroke for pages whose handlers listen through jQuery. Every
//! path except clearing ends with a synthetic `change` event.

use tracing::debug;

use crate::driver::{DriverResult, ElementHandle, ScriptArg, UiDriver};
use crate::script;

/// Special keys sent through `send_keys`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Enter / Return
    Enter,
    /// Tab
    Tab,
}

impl Key {
    /// WebDriver key code
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Enter => "\u{E007}",
            Self::Tab => "\u{E004}",
        }
    }
}

/// How a value is entered into a text field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStrategy {
    /// Clear, then type the value as keystrokes
    Native,
    /// Assign the value by script
    Inject,
    /// Assign the value by script, then replay the last keystroke via jQuery
    JQuery,
}

impl InputStrategy {
    /// Pick the strategy for the `fast` flag, probing the page for jQuery
    pub fn detect(driver: &dyn UiDriver, fast: bool) -> DriverResult<Self> {
        if !fast {
            return Ok(Self::Native);
        }
        let jquery = driver
            .execute_script(script::JQUERY_AVAILABLE, &[])?
            .as_bool()
            .unwrap_or(false);
        Ok(if jquery { Self::JQuery } else { Self::Inject })
    }

    /// Enter `text` into `element` and fire `change`
    pub fn enter(self, driver: &dyn UiDriver, element: &ElementHandle, text: &str) -> DriverResult<()> {
        debug!(strategy = ?self, %element, "entering text");
        match self {
            Self::Native => {
                driver.clear(element)?;
                driver.send_keys(element, text)?;
            }
            Self::Inject => {
                driver.execute_script(script::SET_VALUE, &[ScriptArg::from(element), ScriptArg::from(text)])?;
            }
            Self::JQuery => {
                let last = text.chars().last().map_or(0, |c| i64::from(u32::from(c)));
                driver.execute_script(
                    script::JQUERY_SET_VALUE,
                    &[ScriptArg::from(element), ScriptArg::from(text), ScriptArg::Int(last)],
                )?;
            }
        }
        fire_event(driver, element, "change")
    }
}

/// Dispatch a synthetic HTML event on the element
pub fn fire_event(driver: &dyn UiDriver, element: &ElementHandle, event: &str) -> DriverResult<()> {
    driver
        .execute_script(script::FIRE_EVENT, &[ScriptArg::from(element), ScriptArg::from(event)])
        .map(|_| ())
}

/// Type `text` after the current value
pub fn append(driver: &dyn UiDriver, element: &ElementHandle, text: &str) -> DriverResult<()> {
    driver.send_keys(element, text)?;
    fire_event(driver, element, "change")
}

/// Send a special key
pub fn press(driver: &dyn UiDriver, element: &ElementHandle, key: Key) -> DriverResult<()> {
    driver.send_keys(element, key.code())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::mock::{MockDriver, MockNode};

    fn field() -> (MockDriver, ElementHandle) {
        let driver = MockDriver::new();
        let input = driver.insert(MockNode::new("input").attr("value", "old"));
        (driver, input)
    }

    fn value(driver: &MockDriver, element: &ElementHandle) -> Option<String> {
        driver.node(element).and_then(|n| n.attributes.get("value").cloned())
    }

    #[test]
    fn test_detect() {
        let driver = MockDriver::new();
        assert_eq!(InputStrategy::detect(&driver, false).unwrap(), InputStrategy::Native);
        assert_eq!(InputStrategy::detect(&driver, true).unwrap(), InputStrategy::Inject);
        driver.set_jquery(true);
        assert_eq!(InputStrategy::detect(&driver, true).unwrap(), InputStrategy::JQuery);
    }

    #[test]
    fn test_native_clears_then_types() {
        let (driver, input) = field();
        InputStrategy::Native.enter(&driver, &input, "new").unwrap();
        assert_eq!(value(&driver, &input).as_deref(), Some("new"));
        assert!(driver.was_called("clear"));
        assert_eq!(driver.events(), vec![(input, "change".to_string())]);
    }

    #[test]
    fn test_inject_skips_keystrokes() {
        let (driver, input) = field();
        InputStrategy::Inject.enter(&driver, &input, "new").unwrap();
        assert_eq!(value(&driver, &input).as_deref(), Some("new"));
        assert!(!driver.was_called("send_keys"));
        assert!(!driver.was_called("clear"));
    }

    #[test]
    fn test_jquery_replays_keystroke_events() {
        let (driver, input) = field();
        driver.set_jquery(true);
        InputStrategy::JQuery.enter(&driver, &input, "new").unwrap();
        let names: Vec<String> = driver.events().into_iter().map(|(_, name)| name).collect();
        assert_eq!(names, vec!["keydown", "keypress", "keyup", "change"]);
    }

    #[test]
    fn test_append_and_press() {
        let (driver, input) = field();
        append(&driver, &input, "er").unwrap();
        press(&driver, &input, Key::Enter).unwrap();
        assert_eq!(value(&driver, &input).as_deref(), Some("older"));
        assert!(driver.was_called(&format!("send_keys:{}:\u{E007}", input.id)));
    }
}
