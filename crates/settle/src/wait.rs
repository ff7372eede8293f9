//! Condition polling.
//!
//! [`Waiter::wait_until`] and [`Waiter::wait_while`] repeatedly resolve a
//! [`Locator`] and evaluate a [`Condition`] until the desired truth value is
//! observed or the timeout elapses. Each attempt produces its own outcome;
//! only the most recent low-level cause survives into the final error.
//!
//! Termination rules:
//!
//! - a malformed selector aborts on the first attempt, whatever the timeout
//! - a timeout of zero means exactly one attempt and no sleep
//! - the loop never gives up before the timeout has elapsed

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

use crate::condition::Condition;
use crate::config::Configuration;
use crate::describe::ElementSnapshot;
use crate::driver::{DriverError, DriverErrorKind, ElementHandle, UiDriver};
use crate::locator::Locator;
use crate::resolver::{resolve, Resolution};
use crate::result::{SettleError, SettleResult};

// =============================================================================
// EXPECTATIONS
// =============================================================================

/// Grammatical form an assertion was phrased in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verb {
    /// `should`
    #[default]
    Plain,
    /// `should_have`
    Have,
    /// `should_be`
    Be,
}

impl Verb {
    /// Word inserted before the condition name
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Plain => "",
            Self::Have => "have ",
            Self::Be => "be ",
        }
    }
}

/// How a wait is phrased in step descriptions and failure messages
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Expectation {
    verb: Verb,
    message: Option<String>,
}

impl Expectation {
    /// Expectation phrased with `verb`
    #[must_use]
    pub const fn new(verb: Verb) -> Self {
        Self {
            verb,
            message: None,
        }
    }

    /// Attach a reason shown alongside the condition
    #[must_use]
    pub fn because(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Get the verb
    #[must_use]
    pub const fn verb(&self) -> Verb {
        self.verb
    }

    /// Phrase for `condition`, e.g. `be visible`
    #[must_use]
    pub fn describe(&self, condition: &Condition) -> String {
        let mut phrase = format!("{}{}", self.verb.prefix(), condition.name());
        if let Some(message) = &self.message {
            phrase.push_str(&format!(" (because {message})"));
        }
        phrase
    }
}

/// Which truth value a wait is looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Until the condition holds
    Until,
    /// While the condition holds, i.e. until it stops
    While,
}

impl WaitMode {
    const fn desired(self) -> bool {
        matches!(self, Self::Until)
    }
}

impl fmt::Display for WaitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Until => write!(f, "until"),
            Self::While => write!(f, "while"),
        }
    }
}

// =============================================================================
// WAITER
// =============================================================================

enum Attempt {
    Satisfied(Option<ElementHandle>),
    Pending {
        element: Option<ElementHandle>,
        cause: Option<DriverError>,
    },
}

/// Polling engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Waiter {
    poll_interval: Duration,
}

impl Default for Waiter {
    fn default() -> Self {
        Self::from_config(&Configuration::default())
    }
}

impl Waiter {
    /// Create a waiter that sleeps `poll_interval` between attempts
    #[must_use]
    pub const fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    /// Create a waiter using the configured polling interval
    #[must_use]
    pub const fn from_config(config: &Configuration) -> Self {
        Self::new(config.poll_interval())
    }

    /// Get the polling interval
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Wait until `condition` holds.
    ///
    /// Returns the element it held on, or `None` when no element exists and
    /// the condition applies to absence.
    ///
    /// # Errors
    ///
    /// [`SettleError::InvalidSelector`] immediately for a malformed selector;
    /// [`SettleError::ElementNotFound`] or [`SettleError::ConditionUnmet`]
    /// once the timeout is exhausted; [`SettleError::Driver`] for unexpected
    /// driver failures.
    pub fn wait_until(
        &self,
        driver: &dyn UiDriver,
        locator: &Locator,
        condition: &Condition,
        expectation: &Expectation,
        timeout: Duration,
    ) -> SettleResult<Option<ElementHandle>> {
        self.poll(driver, locator, condition, expectation, timeout, WaitMode::Until)
    }

    /// Wait while `condition` holds.
    ///
    /// # Errors
    ///
    /// As [`Waiter::wait_until`], with [`SettleError::ConditionStillMet`] in
    /// place of [`SettleError::ConditionUnmet`].
    pub fn wait_while(
        &self,
        driver: &dyn UiDriver,
        locator: &Locator,
        condition: &Condition,
        expectation: &Expectation,
        timeout: Duration,
    ) -> SettleResult<()> {
        self.poll(driver, locator, condition, expectation, timeout, WaitMode::While)
            .map(|_| ())
    }

    /// Run a wait in either mode
    pub fn poll(
        &self,
        driver: &dyn UiDriver,
        locator: &Locator,
        condition: &Condition,
        expectation: &Expectation,
        timeout: Duration,
        mode: WaitMode,
    ) -> SettleResult<Option<ElementHandle>> {
        let start = Instant::now();
        let mut attempts = 0_u32;

        let (element, cause) = loop {
            attempts += 1;
            match attempt(driver, locator, condition, mode)? {
                Attempt::Satisfied(element) => {
                    debug!(
                        locator = %locator,
                        condition = %condition,
                        %mode,
                        attempts,
                        elapsed_ms = start.elapsed().as_millis(),
                        "wait satisfied"
                    );
                    return Ok(element);
                }
                Attempt::Pending { element, cause } => {
                    trace!(locator = %locator, condition = %condition, %mode, attempts, ?cause, "wait pending");
                    if start.elapsed() >= timeout {
                        break (element, cause);
                    }
                }
            }
            thread::sleep(self.poll_interval);
        };

        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        debug!(locator = %locator, condition = %condition, %mode, attempts, timeout_ms, "wait exhausted");

        let live = match &element {
            Some(element) => is_live(driver, element)?,
            None => false,
        };
        match element.filter(|_| live) {
            Some(element) => {
                let snapshot = ElementSnapshot::capture(driver, &element);
                let expectation = expectation.describe(condition);
                Err(match mode {
                    WaitMode::Until => SettleError::ConditionUnmet {
                        selector: locator.to_string(),
                        expectation,
                        element: snapshot,
                        cause,
                        timeout_ms,
                    },
                    WaitMode::While => SettleError::ConditionStillMet {
                        selector: locator.to_string(),
                        expectation,
                        element: snapshot,
                        cause,
                        timeout_ms,
                    },
                })
            }
            None => Err(SettleError::ElementNotFound {
                selector: locator.to_string(),
                condition: match mode {
                    WaitMode::Until => condition.name().to_string(),
                    WaitMode::While => format!("not {}", condition.name()),
                },
                cause,
                timeout_ms,
            }),
        }
    }
}

fn attempt(
    driver: &dyn UiDriver,
    locator: &Locator,
    condition: &Condition,
    mode: WaitMode,
) -> SettleResult<Attempt> {
    let desired = mode.desired();
    match resolve(driver, locator)? {
        Resolution::Invalid(source) => Err(SettleError::InvalidSelector {
            selector: locator.to_string(),
            source,
        }),
        Resolution::Absent(cause) => Ok(if condition.applies_when_absent() == desired {
            Attempt::Satisfied(None)
        } else {
            Attempt::Pending {
                element: None,
                cause: Some(cause),
            }
        }),
        Resolution::Found(element) => match condition.apply(driver, &element) {
            Ok(held) if held == desired => Ok(Attempt::Satisfied(Some(element))),
            Ok(_) => Ok(Attempt::Pending {
                element: Some(element),
                cause: None,
            }),
            Err(err) if err.kind == DriverErrorKind::Unexpected => Err(SettleError::Driver(err)),
            Err(err) => Ok(Attempt::Pending {
                element: Some(element),
                cause: Some(err),
            }),
        },
    }
}

/// Whether a handle still refers to an element on the page.
///
/// Unexpected failures propagate; any other probe failure means the element
/// is gone.
pub fn is_live(driver: &dyn UiDriver, element: &ElementHandle) -> SettleResult<bool> {
    match driver.is_displayed(element) {
        Ok(_) => Ok(true),
        Err(err) if err.kind == DriverErrorKind::Unexpected => Err(SettleError::Driver(err)),
        Err(err) => {
            warn!(%element, error = %err, "liveness probe failed, treating element as absent");
            Ok(false)
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::condition;
    use crate::driver::mock::{MockDriver, Mutation, MockNode};
    use proptest::prelude::*;

    const POLL: Duration = Duration::from_millis(10);
    const SHORT: Duration = Duration::from_millis(60);

    fn waiter() -> Waiter {
        Waiter::new(POLL)
    }

    fn be() -> Expectation {
        Expectation::new(Verb::Be)
    }

    mod expectation_tests {
        use super::*;

        #[test]
        fn test_describe_with_verbs() {
            let visible = condition::visible();
            assert_eq!(Expectation::new(Verb::Plain).describe(&visible), "visible");
            assert_eq!(Expectation::new(Verb::Have).describe(&condition::text("x")), "have text 'x'");
            assert_eq!(be().describe(&visible), "be visible");
        }

        #[test]
        fn test_describe_with_reason() {
            let phrase = be().because("the form was submitted").describe(&condition::hidden());
            assert_eq!(phrase, "be hidden (because the form was submitted)");
        }

        #[test]
        fn test_default_waiter_uses_default_interval() {
            assert_eq!(Waiter::default().poll_interval(), Duration::from_millis(100));
        }
    }

    mod wait_until_tests {
        use super::*;

        #[test]
        fn test_returns_element_on_first_success() {
            let driver = MockDriver::new();
            let button = driver.insert(MockNode::new("button"));
            let found = waiter()
                .wait_until(&driver, &Locator::new("button"), &condition::visible(), &be(), SHORT)
                .unwrap();
            assert_eq!(found, Some(button));
            assert_eq!(driver.call_count("is_displayed"), 1);
            assert_eq!(driver.call_count("find_elements"), 1);
        }

        #[test]
        fn test_absent_element_satisfies_hidden() {
            let driver = MockDriver::new();
            let found = waiter()
                .wait_until(&driver, &Locator::new("#toast"), &condition::hidden(), &be(), SHORT)
                .unwrap();
            assert_eq!(found, None);
        }

        #[test]
        fn test_absent_element_times_out_as_not_found() {
            let driver = MockDriver::new();
            let start = Instant::now();
            let err = waiter()
                .wait_until(&driver, &Locator::new("#toast"), &condition::exist(), &be(), SHORT)
                .unwrap_err();
            assert!(start.elapsed() >= SHORT);
            match err {
                SettleError::ElementNotFound { selector, condition, cause, timeout_ms } => {
                    assert_eq!(selector, "css: #toast");
                    assert_eq!(condition, "exist");
                    assert_eq!(cause.unwrap().kind, DriverErrorKind::NoSuchElement);
                    assert_eq!(timeout_ms, 60);
                }
                other => panic!("unexpected error {other:?}"),
            }
        }

        #[test]
        fn test_present_but_wrong_state_is_condition_unmet() {
            let driver = MockDriver::new();
            driver.insert(MockNode::new("div").attr("id", "toast").hidden());
            let err = waiter()
                .wait_until(&driver, &Locator::new("#toast"), &condition::visible(), &be(), SHORT)
                .unwrap_err();
            match &err {
                SettleError::ConditionUnmet { expectation, element, .. } => {
                    assert_eq!(expectation, "be visible");
                    assert_eq!(element.displayed, Some(false));
                }
                other => panic!("unexpected error {other:?}"),
            }
            let message = err.to_string();
            assert!(message.starts_with("Element should be visible {css: #toast}"));
            assert!(message.contains("Timeout: 60 ms."));
        }

        #[test]
        fn test_becomes_visible_later() {
            let driver = MockDriver::new();
            let toast = driver.insert(MockNode::new("div").attr("id", "toast").hidden());
            driver.schedule(Duration::from_millis(30), Mutation::Show(toast.clone()));
            let found = waiter()
                .wait_until(
                    &driver,
                    &Locator::new("#toast"),
                    &condition::visible(),
                    &be(),
                    Duration::from_millis(500),
                )
                .unwrap();
            assert_eq!(found, Some(toast));
        }

        #[test]
        fn test_invalid_selector_aborts_immediately() {
            let driver = MockDriver::new();
            let start = Instant::now();
            let err = waiter()
                .wait_until(
                    &driver,
                    &Locator::new("div[id="),
                    &condition::hidden(),
                    &be(),
                    Duration::from_secs(2),
                )
                .unwrap_err();
            assert!(err.is_invalid_selector());
            assert!(start.elapsed() < Duration::from_millis(500));
            assert_eq!(driver.call_count("find_elements"), 1);
        }

        #[test]
        fn test_zero_timeout_is_one_attempt() {
            let driver = MockDriver::new();
            let err = waiter()
                .wait_until(&driver, &Locator::new("p"), &condition::exist(), &be(), Duration::ZERO)
                .unwrap_err();
            assert!(err.is_timeout());
            assert_eq!(driver.call_count("find_elements"), 1);
        }

        #[test]
        fn test_recoverable_evaluation_error_is_retried_and_reported() {
            let driver = MockDriver::new();
            driver.insert(MockNode::new("p").hidden());
            driver.fail_next("is_displayed", DriverError::webdriver("frame reloading"));
            let err = waiter()
                .wait_until(&driver, &Locator::new("p"), &condition::visible(), &be(), SHORT)
                .unwrap_err();
            assert!(matches!(err, SettleError::ConditionUnmet { .. }));
            assert!(driver.call_count("find_elements") > 1);
        }

        #[test]
        fn test_last_cause_is_kept() {
            let driver = MockDriver::new();
            driver.insert(MockNode::new("p"));
            driver.fail_next("text", DriverError::webdriver("frame reloading"));
            let err = waiter()
                .wait_until(&driver, &Locator::new("p"), &condition::text("x"), &be(), Duration::ZERO)
                .unwrap_err();
            assert_eq!(err.driver_error().unwrap().kind, DriverErrorKind::WebDriver);
            assert!(err.to_string().contains("Caused by: webdriver error: frame reloading"));
        }

        #[test]
        fn test_unexpected_evaluation_error_propagates() {
            let driver = MockDriver::new();
            driver.insert(MockNode::new("p"));
            driver.fail_next("is_displayed", DriverError::unexpected("null pointer"));
            let err = waiter()
                .wait_until(&driver, &Locator::new("p"), &condition::visible(), &be(), SHORT)
                .unwrap_err();
            assert!(matches!(err, SettleError::Driver(_)));
        }
    }

    mod wait_while_tests {
        use super::*;

        #[test]
        fn test_returns_when_element_disappears() {
            let driver = MockDriver::new();
            let spinner = driver.insert(MockNode::new("div").attr("class", "spinner"));
            driver.schedule(Duration::from_millis(20), Mutation::Remove(spinner));
            waiter()
                .wait_while(
                    &driver,
                    &Locator::new(".spinner"),
                    &condition::visible(),
                    &be(),
                    Duration::from_millis(500),
                )
                .unwrap();
        }

        #[test]
        fn test_absent_element_satisfies_while_exist() {
            let driver = MockDriver::new();
            waiter()
                .wait_while(&driver, &Locator::new("#gone"), &condition::exist(), &be(), SHORT)
                .unwrap();
        }

        #[test]
        fn test_condition_still_met() {
            let driver = MockDriver::new();
            driver.insert(MockNode::new("div").attr("class", "spinner"));
            let err = waiter()
                .wait_while(&driver, &Locator::new(".spinner"), &condition::visible(), &be(), SHORT)
                .unwrap_err();
            assert!(matches!(err, SettleError::ConditionStillMet { .. }));
            assert!(err.to_string().starts_with("Element should not be visible"));
        }

        #[test]
        fn test_invalid_selector_aborts_immediately() {
            let driver = MockDriver::new();
            let start = Instant::now();
            let err = waiter()
                .wait_while(
                    &driver,
                    &Locator::new(crate::selector::Selector::xpath("//div[@id='x'")),
                    &condition::exist(),
                    &be(),
                    Duration::from_secs(2),
                )
                .unwrap_err();
            assert!(err.is_invalid_selector());
            assert!(start.elapsed() < Duration::from_millis(500));
            assert_eq!(driver.call_count("find_elements"), 1);
        }

        #[test]
        fn test_absent_element_cannot_stop_being_hidden() {
            let driver = MockDriver::new();
            let err = waiter()
                .wait_while(&driver, &Locator::new("#gone"), &condition::hidden(), &be(), Duration::ZERO)
                .unwrap_err();
            match err {
                SettleError::ElementNotFound { condition, .. } => assert_eq!(condition, "not hidden"),
                other => panic!("unexpected error {other:?}"),
            }
        }
    }

    mod liveness_tests {
        use super::*;

        #[test]
        fn test_detached_element_is_not_live() {
            let driver = MockDriver::new();
            let p = driver.insert(MockNode::new("p"));
            assert!(is_live(&driver, &p).unwrap());
            driver.remove(&p);
            assert!(!is_live(&driver, &p).unwrap());
        }

        #[test]
        fn test_unexpected_probe_failure_propagates() {
            let driver = MockDriver::new();
            let p = driver.insert(MockNode::new("p"));
            driver.fail_next("is_displayed", DriverError::unexpected("permission denied"));
            assert!(is_live(&driver, &p).is_err());
        }
    }

    mod property_tests {
        use super::*;

        fn pick(which: u8) -> Condition {
            match which % 4 {
                0 => condition::visible(),
                1 => condition::hidden(),
                2 => condition::exist(),
                _ => condition::enabled(),
            }
        }

        proptest! {
            #[test]
            fn prop_wait_while_is_dual_of_wait_until_not(
                present in any::<bool>(),
                displayed in any::<bool>(),
                enabled in any::<bool>(),
                which in any::<u8>(),
            ) {
                let driver = MockDriver::new();
                if present {
                    let mut node = MockNode::new("p");
                    node.displayed = displayed;
                    node.enabled = enabled;
                    driver.insert(node);
                }
                let locator = Locator::new("p");
                let cond = pick(which);
                let w = waiter();
                let while_ok = w
                    .wait_while(&driver, &locator, &cond, &be(), Duration::ZERO)
                    .is_ok();
                let until_not_ok = w
                    .wait_until(&driver, &locator, &cond.negate(), &be(), Duration::ZERO)
                    .is_ok();
                prop_assert_eq!(while_ok, until_not_ok);
            }

            #[test]
            fn prop_failed_wait_never_returns_early(timeout_ms in 0_u64..40) {
                let driver = MockDriver::new();
                let timeout = Duration::from_millis(timeout_ms);
                let start = Instant::now();
                let result = waiter().wait_until(
                    &driver,
                    &Locator::new("p"),
                    &condition::visible(),
                    &be(),
                    timeout,
                );
                prop_assert!(result.is_err());
                prop_assert!(start.elapsed() >= timeout);
            }
        }
    }
}
