//! Virtual elements.
//!
//! An [`Element`] is a [`Locator`] bound to a [`Session`]. It holds no live
//! reference: every operation resolves it again through the polling engine.
//! All methods funnel into [`Element::perform`], which dispatches one
//! [`Operation`] value.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::condition::{self, Condition};
use crate::dispatch::{
    Assertion, DelegateCall, Delegated, Describe, FindAll, Navigation, Operation, Probe, Read,
    Resolve, SelectedOption, Wait,
};
use crate::driver::{ElementHandle, UiDriver};
use crate::input::Key;
use crate::interact::Interaction;
use crate::locator::{CollectionLocator, Locator};
use crate::resolver::resolve_all;
use crate::result::{SettleError, SettleResult};
use crate::selector::Selector;
use crate::session::Session;
use crate::upload::Upload;
use crate::wait::{Expectation, Verb, WaitMode};

/// A lazily resolved element
#[derive(Debug, Clone)]
pub struct Element<'s> {
    session: &'s Session,
    locator: Locator,
}

impl<'s> Element<'s> {
    /// Bind a locator to a session
    #[must_use]
    pub const fn new(session: &'s Session, locator: Locator) -> Self {
        Self { session, locator }
    }

    /// Get the locator
    #[must_use]
    pub const fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Get the session
    #[must_use]
    pub const fn session(&self) -> &'s Session {
        self.session
    }

    /// Dispatch an operation against this element
    pub fn perform<O: Operation>(&self, operation: O) -> SettleResult<O::Output> {
        operation.perform(self)
    }

    pub(crate) fn driver(&self) -> &'s dyn UiDriver {
        self.session.driver()
    }

    pub(crate) const fn timeout(&self) -> Duration {
        self.session.config().timeout()
    }

    pub(crate) fn subject(&self) -> String {
        self.locator.to_string()
    }

    /// Wait until `condition` holds and return the element it held on
    pub(crate) fn await_handle(
        &self,
        condition: &Condition,
        expectation: &Expectation,
    ) -> SettleResult<ElementHandle> {
        let timeout = self.timeout();
        self.session
            .waiter()
            .wait_until(self.driver(), &self.locator, condition, expectation, timeout)?
            .ok_or_else(|| SettleError::ElementNotFound {
                selector: self.subject(),
                condition: condition.name().to_string(),
                cause: None,
                timeout_ms: self.session.config().timeout_ms,
            })
    }

    /// Handle of the element once it exists
    pub(crate) fn existing(&self) -> SettleResult<ElementHandle> {
        self.await_handle(&condition::exist(), &Expectation::new(Verb::Plain))
    }

    /// Handle of the element once it is visible
    pub(crate) fn visible_handle(&self) -> SettleResult<ElementHandle> {
        self.await_handle(&condition::visible(), &Expectation::new(Verb::Be))
    }

    fn assert(&self, assertion: Assertion) -> SettleResult<&Self> {
        self.perform(assertion).map(|()| self)
    }

    // =========================================================================
    // Assertions
    // =========================================================================

    /// Wait for each condition in turn
    pub fn should(&self, conditions: &[Condition]) -> SettleResult<&Self> {
        self.assert(Assertion::new(Verb::Plain, conditions))
    }

    /// `should`, phrased with `have`
    pub fn should_have(&self, conditions: &[Condition]) -> SettleResult<&Self> {
        self.assert(Assertion::new(Verb::Have, conditions))
    }

    /// `should`, phrased with `be`
    pub fn should_be(&self, conditions: &[Condition]) -> SettleResult<&Self> {
        self.assert(Assertion::new(Verb::Be, conditions))
    }

    /// Wait for each condition in turn to stop holding
    pub fn should_not(&self, conditions: &[Condition]) -> SettleResult<&Self> {
        self.assert(Assertion::new(Verb::Plain, conditions).negated())
    }

    /// `should_not`, phrased with `have`
    pub fn should_not_have(&self, conditions: &[Condition]) -> SettleResult<&Self> {
        self.assert(Assertion::new(Verb::Have, conditions).negated())
    }

    /// `should_not`, phrased with `be`
    pub fn should_not_be(&self, conditions: &[Condition]) -> SettleResult<&Self> {
        self.assert(Assertion::new(Verb::Be, conditions).negated())
    }

    /// `should` with a reason included in step and failure descriptions
    pub fn should_because(&self, message: &str, conditions: &[Condition]) -> SettleResult<&Self> {
        self.assert(Assertion::new(Verb::Plain, conditions).because(message))
    }

    /// `should_have` with a reason
    pub fn should_have_because(
        &self,
        message: &str,
        conditions: &[Condition],
    ) -> SettleResult<&Self> {
        self.assert(Assertion::new(Verb::Have, conditions).because(message))
    }

    /// `should_be` with a reason
    pub fn should_be_because(&self, message: &str, conditions: &[Condition]) -> SettleResult<&Self> {
        self.assert(Assertion::new(Verb::Be, conditions).because(message))
    }

    /// `should_not` with a reason
    pub fn should_not_because(
        &self,
        message: &str,
        conditions: &[Condition],
    ) -> SettleResult<&Self> {
        self.assert(
            Assertion::new(Verb::Plain, conditions)
                .negated()
                .because(message),
        )
    }

    /// `should_not_have` with a reason
    pub fn should_not_have_because(
        &self,
        message: &str,
        conditions: &[Condition],
    ) -> SettleResult<&Self> {
        self.assert(
            Assertion::new(Verb::Have, conditions)
                .negated()
                .because(message),
        )
    }

    /// `should_not_be` with a reason
    pub fn should_not_be_because(
        &self,
        message: &str,
        conditions: &[Condition],
    ) -> SettleResult<&Self> {
        self.assert(
            Assertion::new(Verb::Be, conditions)
                .negated()
                .because(message),
        )
    }

    /// Wait up to `timeout` for `condition` to hold
    pub fn wait_until(&self, condition: &Condition, timeout: Duration) -> SettleResult<&Self> {
        self.perform(Wait::new(WaitMode::Until, condition.clone(), timeout))
            .map(|_| self)
    }

    /// Wait up to `timeout` for `condition` to stop holding
    pub fn wait_while(&self, condition: &Condition, timeout: Duration) -> SettleResult<&Self> {
        self.perform(Wait::new(WaitMode::While, condition.clone(), timeout))
            .map(|_| self)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Rendered text
    pub fn text(&self) -> SettleResult<String> {
        self.perform(Read::Text).map(Option::unwrap_or_default)
    }

    /// Text content, including text of hidden descendants
    pub fn inner_text(&self) -> SettleResult<String> {
        self.perform(Read::InnerText).map(Option::unwrap_or_default)
    }

    /// Inner HTML
    pub fn inner_html(&self) -> SettleResult<String> {
        self.perform(Read::InnerHtml).map(Option::unwrap_or_default)
    }

    /// Attribute value
    pub fn attr(&self, name: &str) -> SettleResult<Option<String>> {
        self.perform(Read::Attribute(name.to_string()))
    }

    /// `name` attribute
    pub fn name(&self) -> SettleResult<Option<String>> {
        self.attr("name")
    }

    /// `data-<key>` attribute
    pub fn data(&self, key: &str) -> SettleResult<Option<String>> {
        self.attr(&format!("data-{key}"))
    }

    /// `value` attribute
    pub fn value(&self) -> SettleResult<Option<String>> {
        self.perform(Read::Value)
    }

    /// Alias of [`Element::value`]
    pub fn val(&self) -> SettleResult<Option<String>> {
        self.value()
    }

    /// Whether the element exists right now. Never waits.
    pub fn exists(&self) -> SettleResult<bool> {
        self.perform(Probe::Exists)
    }

    /// Whether the element exists and is displayed right now. Never waits.
    pub fn is_displayed(&self) -> SettleResult<bool> {
        self.perform(Probe::IsDisplayed)
    }

    /// Whether `condition` holds right now. Never waits.
    pub fn matches(&self, condition: &Condition) -> SettleResult<bool> {
        self.perform(Probe::Matches(condition.clone()))
    }

    /// Alias of [`Element::matches`]
    pub fn is(&self, condition: &Condition) -> SettleResult<bool> {
        self.matches(condition)
    }

    /// Alias of [`Element::matches`]
    pub fn has(&self, condition: &Condition) -> SettleResult<bool> {
        self.matches(condition)
    }

    /// Whether an `img` finished loading with real content
    pub fn is_image(&self) -> SettleResult<bool> {
        self.perform(Probe::IsImage)
    }

    /// First selected option of a `select`
    pub fn selected_option(&self) -> SettleResult<Option<ElementHandle>> {
        self.perform(SelectedOption)
    }

    /// Value of the selected option
    pub fn selected_value(&self) -> SettleResult<Option<String>> {
        self.perform(Read::SelectedValue)
    }

    /// Text of the selected option
    pub fn selected_text(&self) -> SettleResult<Option<String>> {
        self.perform(Read::SelectedText)
    }

    /// Live handle, once the element exists
    pub fn to_handle(&self) -> SettleResult<ElementHandle> {
        self.perform(Resolve)
    }

    /// What the element looks like right now, or why it cannot be found
    pub fn describe(&self) -> SettleResult<String> {
        self.perform(Describe)
    }

    /// Forward a plain driver call to the resolved element
    pub fn delegate(&self, call: DelegateCall) -> SettleResult<Delegated> {
        self.perform(call)
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// First match of `selector` inside this element
    #[must_use]
    pub fn find(&self, selector: impl Into<Selector>) -> Self {
        self.find_nth(selector, 0)
    }

    /// The `index`-th match of `selector` inside this element
    #[must_use]
    pub fn find_nth(&self, selector: impl Into<Selector>, index: usize) -> Self {
        self.navigate(Navigation::Find(selector.into(), index))
    }

    /// Every match of `selector` inside this element
    #[must_use]
    pub fn find_all(&self, selector: impl Into<Selector>) -> ElementCollection<'s> {
        let locator = FindAll(selector.into()).locate(&self.locator);
        ElementCollection::new(self.session, locator)
    }

    /// Parent element
    #[must_use]
    pub fn parent(&self) -> Self {
        self.navigate(Navigation::Parent)
    }

    /// Nearest ancestor with the tag, or class when prefixed with `.`
    #[must_use]
    pub fn closest(&self, tag_or_class: &str) -> Self {
        self.navigate(Navigation::Closest(tag_or_class.to_string()))
    }

    fn navigate(&self, navigation: Navigation) -> Self {
        Self::new(self.session, navigation.locate(&self.locator))
    }

    // =========================================================================
    // Interactions
    // =========================================================================

    fn interact(&self, interaction: Interaction) -> SettleResult<&Self> {
        self.perform(interaction).map(|()| self)
    }

    /// Click once visible
    pub fn click(&self) -> SettleResult<&Self> {
        self.interact(Interaction::Click)
    }

    /// Right-click once visible
    pub fn context_click(&self) -> SettleResult<&Self> {
        self.interact(Interaction::ContextClick)
    }

    /// Move the pointer over the element once visible
    pub fn hover(&self) -> SettleResult<&Self> {
        self.interact(Interaction::Hover)
    }

    /// Drag onto the first element matching `target`
    pub fn drag_and_drop_to(&self, target: impl Into<Selector>) -> SettleResult<&Self> {
        self.interact(Interaction::DragAndDropTo(target.into()))
    }

    /// Replace the value; an empty string clears the field
    pub fn set_value(&self, text: &str) -> SettleResult<&Self> {
        self.interact(Interaction::SetValue(text.to_string()))
    }

    /// Alias of [`Element::set_value`]
    pub fn set_val(&self, text: &str) -> SettleResult<&Self> {
        self.set_value(text)
    }

    /// Type after the current value
    pub fn append(&self, text: &str) -> SettleResult<&Self> {
        self.interact(Interaction::Append(text.to_string()))
    }

    /// Press Enter
    pub fn press_enter(&self) -> SettleResult<&Self> {
        self.interact(Interaction::Press(Key::Enter))
    }

    /// Press Tab
    pub fn press_tab(&self) -> SettleResult<&Self> {
        self.interact(Interaction::Press(Key::Tab))
    }

    /// Click a checkbox, radio or option when its state differs
    pub fn set_selected(&self, selected: bool) -> SettleResult<&Self> {
        self.interact(Interaction::SetSelected(selected))
    }

    /// Select the option with this visible text
    pub fn select_option(&self, text: &str) -> SettleResult<&Self> {
        self.interact(Interaction::SelectOption(text.to_string()))
    }

    /// Select the option with this value
    pub fn select_option_by_value(&self, value: &str) -> SettleResult<&Self> {
        self.interact(Interaction::SelectOptionByValue(value.to_string()))
    }

    /// Click a link, then open its `href`
    pub fn follow_link(&self) -> SettleResult<()> {
        self.perform(Interaction::FollowLink)
    }

    /// Scroll the window to the element
    pub fn scroll_to(&self) -> SettleResult<&Self> {
        self.interact(Interaction::ScrollTo)
    }

    /// Upload local files through this file input; returns canonical paths
    pub fn upload_files<P: AsRef<Path>>(&self, files: &[P]) -> SettleResult<Vec<PathBuf>> {
        self.perform(Upload::files(files))
    }

    /// Upload files named relative to the configured resource root
    pub fn upload_resources(&self, names: &[&str]) -> SettleResult<Vec<PathBuf>> {
        let root = &self.session.config().resource_root;
        self.perform(Upload::resources(root, names))
    }
}

/// Lazily resolved collection of elements
#[derive(Debug, Clone)]
pub struct ElementCollection<'s> {
    session: &'s Session,
    locator: CollectionLocator,
}

impl<'s> ElementCollection<'s> {
    /// Bind a collection locator to a session
    #[must_use]
    pub const fn new(session: &'s Session, locator: CollectionLocator) -> Self {
        Self { session, locator }
    }

    /// Get the locator
    #[must_use]
    pub const fn locator(&self) -> &CollectionLocator {
        &self.locator
    }

    /// The `index`-th member
    #[must_use]
    pub fn nth(&self, index: usize) -> Element<'s> {
        Element::new(self.session, self.locator.nth(index))
    }

    /// The first member
    #[must_use]
    pub fn first(&self) -> Element<'s> {
        self.nth(0)
    }

    /// Number of members right now
    pub fn count(&self) -> SettleResult<usize> {
        Ok(resolve_all(self.session.driver(), &self.locator)?.len())
    }

    /// Rendered text of every member right now
    pub fn texts(&self) -> SettleResult<Vec<String>> {
        let driver = self.session.driver();
        resolve_all(driver, &self.locator)?
            .iter()
            .map(|element| Ok(driver.text(element)?))
            .collect()
    }
}
