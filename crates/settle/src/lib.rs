//! Settle: retrying assertions for browser UI tests
//!
//! Describe what should eventually be true about an element; settle keeps
//! re-resolving and re-checking until it is, or explains precisely why it
//! never was: the element never appeared, it appeared in the wrong state,
//! or the selector itself was broken.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      SETTLE Architecture                         │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  Element::should_be(visible)                                     │
//! │        │                                                         │
//! │        ▼                                                         │
//! │  ┌────────────┐    ┌────────────┐    ┌────────────┐              │
//! │  │ Dispatch   │───►│ Waiter     │───►│ Resolver   │──► UiDriver  │
//! │  │ Operation  │    │ (polling)  │    │ (one shot) │              │
//! │  └────────────┘    └────────────┘    └────────────┘              │
//! │        │                                                         │
//! │        ▼                                                         │
//! │  StepReporter (begin / commit)                                   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use settle::prelude::*;
//! use std::sync::Arc;
//!
//! let driver = Arc::new(MockDriver::new());
//! driver.insert(MockNode::new("input").attr("id", "email"));
//!
//! let session = Session::new(driver.clone());
//! let email = session.element("#email");
//! email.should_be(&[condition::visible()])?.set_value("ada@example.test")?;
//! assert_eq!(email.value()?.as_deref(), Some("ada@example.test"));
//! # Ok::<(), SettleError>(())
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

pub mod condition;
pub mod config;
mod describe;
pub mod dispatch;
pub mod driver;
mod element;
pub mod input;
mod interact;
mod locator;
mod report;
mod resolver;
mod result;
pub mod script;
mod selector;
mod session;
mod upload;
pub mod wait;

pub use condition::Condition;
pub use config::Configuration;
pub use describe::ElementSnapshot;
pub use dispatch::{
    Assertion, DelegateCall, Delegated, Describe, FindAll, Navigation, Operation, Probe, Read,
    Resolve, SelectedOption, Wait,
};
pub use driver::{
    DriverError, DriverErrorKind, DriverResult, ElementHandle, Point, ScriptArg, UiDriver,
};
pub use element::{Element, ElementCollection};
pub use input::{InputStrategy, Key};
pub use interact::Interaction;
pub use locator::{CollectionLocator, Locator};
pub use report::{EventStatus, RecordingReporter, StepEvent, StepReporter, TracingReporter};
pub use resolver::{resolve, resolve_all, Resolution};
pub use result::{SettleError, SettleResult};
pub use selector::{xpath_literal, Selector, Strategy};
pub use session::Session;
pub use upload::Upload;
pub use wait::{Expectation, Verb, WaitMode, Waiter};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::condition;
    pub use super::driver::mock::{MockDriver, MockNode, Mutation};
    pub use super::{
        Condition, Configuration, DelegateCall, Delegated, Element, ElementCollection,
        ElementHandle, EventStatus, Expectation, Locator, RecordingReporter, Selector, Session,
        SettleError, SettleResult, StepReporter, UiDriver, Verb, WaitMode, Waiter,
    };
}
