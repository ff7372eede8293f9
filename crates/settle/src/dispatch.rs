//! Operation dispatch.
//!
//! Every element method is one [`Operation`] value handed to
//! [`Element::perform`]. The set of operation families is closed and checked
//! at compile time; anything settle has no special behaviour for goes
//! through [`DelegateCall`], which resolves the element once and forwards a
//! single driver call.
//!
//! | Family            | Type                         | Waits for       |
//! |-------------------|------------------------------|-----------------|
//! | State assertions  | [`Assertion`]                | each condition  |
//! | Explicit waits    | [`Wait`]                     | the condition   |
//! | Read queries      | [`Read`], [`SelectedOption`] | `exist`         |
//! | Instant probes    | [`Probe`], [`Describe`]      | nothing         |
//! | Navigation        | [`Navigation`], [`FindAll`]  | nothing         |
//! | Interactions      | [`Interaction`]              | `visible`       |
//! | File upload       | [`Upload`]                   | `exist`         |
//! | Pass-through      | [`DelegateCall`]             | `exist`         |
//!
//! [`Interaction`]: crate::interact::Interaction
//! [`Upload`]: crate::upload::Upload

use std::time::Duration;

use crate::condition::Condition;
use crate::describe::ElementSnapshot;
use crate::driver::{DriverErrorKind, DriverResult, ElementHandle, Point, ScriptArg};
use crate::element::Element;
use crate::locator::{CollectionLocator, Locator};
use crate::report::run_step;
use crate::resolver::{resolve, Resolution};
use crate::result::{SettleError, SettleResult};
use crate::script;
use crate::selector::Selector;
use crate::wait::{is_live, Expectation, Verb, WaitMode};

/// Something an element can be asked to do
pub trait Operation {
    /// Value produced on success
    type Output;

    /// Run against `element`
    fn perform(self, element: &Element<'_>) -> SettleResult<Self::Output>;
}

// =============================================================================
// ASSERTIONS AND WAITS
// =============================================================================

/// `should*` / `should_not*`: one step per condition, stopping at the first failure
#[derive(Debug, Clone)]
pub struct Assertion {
    expectation: Expectation,
    negated: bool,
    conditions: Vec<Condition>,
}

impl Assertion {
    /// Assert every condition in order
    #[must_use]
    pub fn new(verb: Verb, conditions: &[Condition]) -> Self {
        Self {
            expectation: Expectation::new(verb),
            negated: false,
            conditions: conditions.to_vec(),
        }
    }

    /// Assert the conditions stop holding instead
    #[must_use]
    pub const fn negated(mut self) -> Self {
        self.negated = true;
        self
    }

    /// Attach a reason
    #[must_use]
    pub fn because(mut self, message: &str) -> Self {
        self.expectation = self.expectation.because(message);
        self
    }

    /// Step description for one condition, e.g. `should not be visible`
    #[must_use]
    pub fn describe(&self, condition: &Condition) -> String {
        let should = if self.negated { "should not" } else { "should" };
        format!("{should} {}", self.expectation.describe(condition))
    }
}

impl Operation for Assertion {
    type Output = ();

    fn perform(self, element: &Element<'_>) -> SettleResult<()> {
        let session = element.session();
        let waiter = session.waiter();
        let subject = element.subject();
        for condition in &self.conditions {
            run_step(session.reporter(), &subject, &self.describe(condition), || {
                let (driver, locator) = (element.driver(), element.locator());
                let timeout = element.timeout();
                if self.negated {
                    waiter.wait_while(driver, locator, condition, &self.expectation, timeout)
                } else {
                    waiter
                        .wait_until(driver, locator, condition, &self.expectation, timeout)
                        .map(|_| ())
                }
            })?;
        }
        Ok(())
    }
}

/// `wait_until` / `wait_while` with an explicit timeout
#[derive(Debug, Clone)]
pub struct Wait {
    mode: WaitMode,
    condition: Condition,
    timeout: Duration,
}

impl Wait {
    /// Create a wait
    #[must_use]
    pub const fn new(mode: WaitMode, condition: Condition, timeout: Duration) -> Self {
        Self {
            mode,
            condition,
            timeout,
        }
    }
}

impl Operation for Wait {
    type Output = Option<ElementHandle>;

    fn perform(self, element: &Element<'_>) -> SettleResult<Option<ElementHandle>> {
        let session = element.session();
        let description = format!("wait {} {}", self.mode, self.condition);
        run_step(session.reporter(), &element.subject(), &description, || {
            session.waiter().poll(
                element.driver(),
                element.locator(),
                &self.condition,
                &Expectation::default(),
                self.timeout,
                self.mode,
            )
        })
    }
}

// =============================================================================
// READS
// =============================================================================

/// Read queries: wait for the element to exist, then read once
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Read {
    /// Rendered text
    Text,
    /// `textContent`
    InnerText,
    /// `innerHTML`
    InnerHtml,
    /// Named attribute
    Attribute(String),
    /// `value` attribute
    Value,
    /// Value of the first selected option
    SelectedValue,
    /// Text of the first selected option
    SelectedText,
}

impl Operation for Read {
    type Output = Option<String>;

    fn perform(self, element: &Element<'_>) -> SettleResult<Option<String>> {
        let driver = element.driver();
        if matches!(self, Self::SelectedValue | Self::SelectedText) {
            let Some(option) = SelectedOption.perform(element)? else {
                return Ok(None);
            };
            return Ok(match self {
                Self::SelectedValue => driver.attribute(&option, "value")?,
                _ => Some(driver.text(&option)?),
            });
        }
        let handle = element.existing()?;
        let read = match &self {
            Self::Text => Some(driver.text(&handle)?),
            Self::InnerText => driver.attribute(&handle, "textContent")?,
            Self::InnerHtml => driver.attribute(&handle, "innerHTML")?,
            Self::Attribute(name) => driver.attribute(&handle, name)?,
            Self::Value => driver.attribute(&handle, "value")?,
            Self::SelectedValue | Self::SelectedText => None,
        };
        Ok(read)
    }
}

/// First selected `option` of a `select`, once the select exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedOption;

impl Operation for SelectedOption {
    type Output = Option<ElementHandle>;

    fn perform(self, element: &Element<'_>) -> SettleResult<Option<ElementHandle>> {
        let driver = element.driver();
        let select = element.existing()?;
        for option in driver.find_elements(Some(&select), &Selector::tag("option"))? {
            if driver.is_selected(&option)? {
                return Ok(Some(option));
            }
        }
        Ok(None)
    }
}

/// Live handle once the element exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolve;

impl Operation for Resolve {
    type Output = ElementHandle;

    fn perform(self, element: &Element<'_>) -> SettleResult<ElementHandle> {
        element.existing()
    }
}

// =============================================================================
// PROBES
// =============================================================================

/// Instant checks; absence is an answer, not an error
#[derive(Debug, Clone)]
pub enum Probe {
    /// The element resolves and is still attached
    Exists,
    /// The element resolves and is displayed
    IsDisplayed,
    /// The condition holds now, or applies to absence
    Matches(Condition),
    /// An `img` finished loading with real content; absence is an error here
    IsImage,
}

impl Operation for Probe {
    type Output = bool;

    fn perform(self, element: &Element<'_>) -> SettleResult<bool> {
        let driver = element.driver();
        let resolution = resolve(driver, element.locator())?;
        if matches!(self, Self::IsImage) {
            let img = resolution.into_element(element.locator())?;
            if !driver.tag_name(&img)?.eq_ignore_ascii_case("img") {
                return Err(SettleError::invalid_argument(
                    "Method is_image() is only applicable for img elements",
                ));
            }
            let loaded = driver.execute_script(script::IS_IMAGE_LOADED, &[ScriptArg::from(&img)])?;
            return Ok(loaded.as_bool().unwrap_or(false));
        }

        let found = match resolution {
            Resolution::Found(handle) => Some(handle),
            Resolution::Absent(_) => None,
            Resolution::Invalid(source) => {
                return Err(SettleError::InvalidSelector {
                    selector: element.subject(),
                    source,
                })
            }
        };
        match (self, found) {
            (Self::Exists, Some(handle)) => is_live(driver, &handle),
            (Self::IsDisplayed, Some(handle)) => recoverable_as_false(driver.is_displayed(&handle)),
            (Self::Matches(condition), Some(handle)) => match condition.apply(driver, &handle) {
                Ok(held) => Ok(held),
                Err(err) if err.kind == DriverErrorKind::Unexpected => {
                    Err(SettleError::Driver(err))
                }
                Err(_) => Ok(condition.applies_when_absent()),
            },
            (Self::Matches(condition), None) => Ok(condition.applies_when_absent()),
            _ => Ok(false),
        }
    }
}

fn recoverable_as_false(result: DriverResult<bool>) -> SettleResult<bool> {
    match result {
        Ok(value) => Ok(value),
        Err(err) if err.kind == DriverErrorKind::Unexpected => Err(SettleError::Driver(err)),
        Err(_) => Ok(false),
    }
}

/// Snapshot of the element right now, or the reason it cannot be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Describe;

impl Operation for Describe {
    type Output = String;

    fn perform(self, element: &Element<'_>) -> SettleResult<String> {
        let driver = element.driver();
        Ok(match resolve(driver, element.locator())? {
            Resolution::Found(handle) => ElementSnapshot::capture(driver, &handle).to_string(),
            Resolution::Absent(cause) | Resolution::Invalid(cause) => cause.to_string(),
        })
    }
}

// =============================================================================
// NAVIGATION
// =============================================================================

/// Derive a new locator from the element's own; resolves nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// The `index`-th match of a selector inside the element
    Find(Selector, usize),
    /// The parent element
    Parent,
    /// Nearest ancestor with a tag, or a class when prefixed with `.`
    Closest(String),
}

impl Navigation {
    /// Locator this navigation leads to from `from`
    #[must_use]
    pub fn locate(self, from: &Locator) -> Locator {
        match self {
            Self::Find(selector, index) => from.child(selector, index),
            Self::Parent => from.parent_element(),
            Self::Closest(tag_or_class) => from.closest(&tag_or_class),
        }
    }
}

impl Operation for Navigation {
    type Output = Locator;

    fn perform(self, element: &Element<'_>) -> SettleResult<Locator> {
        Ok(self.locate(element.locator()))
    }
}

/// Every match of a selector inside the element; resolves nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindAll(pub Selector);

impl FindAll {
    /// Collection locator scoped to `from`
    #[must_use]
    pub fn locate(self, from: &Locator) -> CollectionLocator {
        CollectionLocator::within(from, self.0)
    }
}

impl Operation for FindAll {
    type Output = CollectionLocator;

    fn perform(self, element: &Element<'_>) -> SettleResult<CollectionLocator> {
        Ok(self.locate(element.locator()))
    }
}

// =============================================================================
// PASS-THROUGH
// =============================================================================

/// Driver calls settle forwards unchanged to one resolved handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelegateCall {
    /// Tag name
    TagName,
    /// Attribute by name
    Attribute(String),
    /// Computed CSS property
    CssValue(String),
    /// Rendered text
    Text,
    /// Displayed flag
    IsDisplayed,
    /// Enabled flag
    IsEnabled,
    /// Selected flag
    IsSelected,
    /// Native click, without waiting for visibility
    Click,
    /// Native keystrokes
    SendKeys(String),
    /// Native clear
    Clear,
    /// Page coordinates
    Location,
}

/// Value returned by a [`DelegateCall`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delegated {
    /// The call returns nothing
    Unit,
    /// A string
    Text(String),
    /// An optional string
    MaybeText(Option<String>),
    /// A flag
    Flag(bool),
    /// Coordinates
    Point(Point),
}

impl Operation for DelegateCall {
    type Output = Delegated;

    fn perform(self, element: &Element<'_>) -> SettleResult<Delegated> {
        let driver = element.driver();
        let handle = element.existing()?;
        let delegated = match self {
            Self::TagName => Delegated::Text(driver.tag_name(&handle)?),
            Self::Attribute(name) => Delegated::MaybeText(driver.attribute(&handle, &name)?),
            Self::CssValue(name) => Delegated::Text(driver.css_value(&handle, &name)?),
            Self::Text => Delegated::Text(driver.text(&handle)?),
            Self::IsDisplayed => Delegated::Flag(driver.is_displayed(&handle)?),
            Self::IsEnabled => Delegated::Flag(driver.is_enabled(&handle)?),
            Self::IsSelected => Delegated::Flag(driver.is_selected(&handle)?),
            Self::Click => {
                driver.click(&handle)?;
                Delegated::Unit
            }
            Self::SendKeys(text) => {
                driver.send_keys(&handle, &text)?;
                Delegated::Unit
            }
            Self::Clear => {
                driver.clear(&handle)?;
                Delegated::Unit
            }
            Self::Location => Delegated::Point(driver.location(&handle)?),
        };
        Ok(delegated)
    }
}

// =============================================================================
// TESTS
// =============================================================================
