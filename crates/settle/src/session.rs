//! Browsing session: a driver plus the configuration and reporter every
//! element operation runs with.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::config::Configuration;
use crate::driver::{ScriptArg, UiDriver};
use crate::element::{Element, ElementCollection};
use crate::locator::{CollectionLocator, Locator};
use crate::report::{StepReporter, TracingReporter};
use crate::result::SettleResult;
use crate::selector::Selector;
use crate::wait::Waiter;

/// Entry point for locating elements
#[derive(Clone)]
pub struct Session {
    driver: Arc<dyn UiDriver>,
    config: Configuration,
    reporter: Arc<dyn StepReporter>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session with default configuration and a tracing reporter
    #[must_use]
    pub fn new(driver: Arc<dyn UiDriver>) -> Self {
        Self {
            driver,
            config: Configuration::default(),
            reporter: Arc::new(TracingReporter),
        }
    }

    /// Replace the configuration
    #[must_use]
    pub fn with_config(mut self, config: Configuration) -> Self {
        self.config = config;
        self
    }

    /// Replace the step reporter
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn StepReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Get the driver
    #[must_use]
    pub fn driver(&self) -> &dyn UiDriver {
        self.driver.as_ref()
    }

    /// Get the configuration
    #[must_use]
    pub const fn config(&self) -> &Configuration {
        &self.config
    }

    /// Get the step reporter
    #[must_use]
    pub fn reporter(&self) -> &dyn StepReporter {
        self.reporter.as_ref()
    }

    /// Polling engine configured for this session
    #[must_use]
    pub const fn waiter(&self) -> Waiter {
        Waiter::from_config(&self.config)
    }

    /// First element matching `selector`
    #[must_use]
    pub fn element(&self, selector: impl Into<Selector>) -> Element<'_> {
        self.wrap(Locator::new(selector))
    }

    /// The `index`-th element matching `selector`
    #[must_use]
    pub fn element_nth(&self, selector: impl Into<Selector>, index: usize) -> Element<'_> {
        self.wrap(Locator::nth(selector, index))
    }

    /// All elements matching `selector`
    #[must_use]
    pub fn elements(&self, selector: impl Into<Selector>) -> ElementCollection<'_> {
        ElementCollection::new(self, CollectionLocator::new(selector))
    }

    /// Element for an existing locator
    #[must_use]
    pub const fn wrap(&self, locator: Locator) -> Element<'_> {
        Element::new(self, locator)
    }

    /// Run a script in the page
    pub fn execute_script(&self, script: &str, args: &[ScriptArg]) -> SettleResult<Value> {
        Ok(self.driver.execute_script(script, args)?)
    }

    /// Navigate to `url`
    pub fn open(&self, url: &str) -> SettleResult<()> {
        Ok(self.driver.navigate(url)?)
    }
}
