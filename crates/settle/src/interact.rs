//! Interactions.
//!
//! Each interaction is one reporter step. It waits for the element to be
//! visible, performs the side effect through the driver, and returns any
//! failure unchanged after the step is committed as failed.

use crate::condition;
use crate::dispatch::Operation;
use crate::driver::ScriptArg;
use crate::element::Element;
use crate::input::{self, InputStrategy, Key};
use crate::report::run_step;
use crate::result::SettleResult;
use crate::script;
use crate::selector::Selector;
use crate::wait::{Expectation, Verb};

/// Side effects on a visible element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    /// Left click
    Click,
    /// Right click
    ContextClick,
    /// Move the pointer over the element
    Hover,
    /// Drag onto the first element matching the selector
    DragAndDropTo(Selector),
    /// Replace the value
    SetValue(String),
    /// Type after the current value
    Append(String),
    /// Press a special key
    Press(Key),
    /// Click when the selected state differs
    SetSelected(bool),
    /// Select the option with this visible text
    SelectOption(String),
    /// Select the option with this value
    SelectOptionByValue(String),
    /// Click a link and open its `href`
    FollowLink,
    /// Scroll the window to the element
    ScrollTo,
}

impl Interaction {
    /// Step description
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Click => "click".to_string(),
            Self::ContextClick => "context click".to_string(),
            Self::Hover => "hover".to_string(),
            Self::DragAndDropTo(target) => format!("drag and drop to {target}"),
            Self::SetValue(text) => format!("set value '{text}'"),
            Self::Append(text) => format!("append '{text}'"),
            Self::Press(Key::Enter) => "press enter".to_string(),
            Self::Press(Key::Tab) => "press tab".to_string(),
            Self::SetSelected(selected) => format!("set selected {selected}"),
            Self::SelectOption(text) => format!("select option '{text}'"),
            Self::SelectOptionByValue(value) => format!("select option by value '{value}'"),
            Self::FollowLink => "follow link".to_string(),
            Self::ScrollTo => "scroll to".to_string(),
        }
    }

    fn execute(self, element: &Element<'_>) -> SettleResult<()> {
        let driver = element.driver();
        match self {
            Self::Click => driver.click(&element.visible_handle()?)?,
            Self::ContextClick => driver.context_click(&element.visible_handle()?)?,
            Self::Hover => driver.hover(&element.visible_handle()?)?,
            Self::DragAndDropTo(selector) => {
                let target = element
                    .session()
                    .element(selector)
                    .await_handle(&condition::visible(), &Expectation::new(Verb::Be))?;
                driver.drag_and_drop(&element.visible_handle()?, &target)?;
            }
            Self::SetValue(text) => set_value(element, &text)?,
            Self::Append(text) => input::append(driver, &element.visible_handle()?, &text)?,
            Self::Press(key) => input::press(driver, &element.visible_handle()?, key)?,
            Self::SetSelected(selected) => {
                let handle = element.visible_handle()?;
                if driver.is_selected(&handle)? != selected {
                    driver.click(&handle)?;
                }
            }
            Self::SelectOption(text) => select_option(element, Selector::text(&text))?,
            Self::SelectOptionByValue(value) => select_option(element, Selector::value(&value))?,
            Self::FollowLink => {
                let link = element.visible_handle()?;
                let href = driver.attribute(&link, "href")?;
                driver.click(&link)?;
                if let Some(href) = href {
                    driver.navigate(&href)?;
                }
            }
            Self::ScrollTo => {
                let location = driver.location(&element.existing()?)?;
                driver.execute_script(
                    script::SCROLL_TO,
                    &[ScriptArg::Int(location.x), ScriptArg::Int(location.y)],
                )?;
            }
        }
        Ok(())
    }
}

impl Operation for Interaction {
    type Output = ();

    fn perform(self, element: &Element<'_>) -> SettleResult<()> {
        let reporter = element.session().reporter();
        let description = self.describe();
        run_step(reporter, &element.subject(), &description, || self.execute(element))
    }
}

fn set_value(element: &Element<'_>, text: &str) -> SettleResult<()> {
    let driver = element.driver();
    let handle = element.visible_handle()?;
    if driver.tag_name(&handle)?.eq_ignore_ascii_case("select") {
        return select_option(element, Selector::value(text));
    }
    if text.is_empty() {
        return Ok(driver.clear(&handle)?);
    }
    let strategy = InputStrategy::detect(driver, element.session().config().fast_set_value)?;
    Ok(strategy.enter(driver, &handle, text)?)
}

/// Wait for the matching option to be visible inside the select, then click it
fn select_option(element: &Element<'_>, option: Selector) -> SettleResult<()> {
    let driver = element.driver();
    element.existing()?;
    let handle = element
        .find(option)
        .await_handle(&condition::visible(), &Expectation::new(Verb::Be))?;
    if !driver.is_selected(&handle)? {
        driver.click(&handle)?;
    }
    Ok(())
}
