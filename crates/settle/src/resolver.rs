//! Element handle resolution.
//!
//! A single point-in-time attempt to turn a [`Locator`] into a live handle.
//! Driver failures are classified exactly once here: recoverable failures
//! become [`Resolution::Absent`], a malformed selector becomes
//! [`Resolution::Invalid`], and anything else propagates as
//! [`SettleError::Driver`]. Resolution never retries.

use tracing::trace;

use crate::driver::{DriverError, DriverErrorKind, ElementHandle, UiDriver};
use crate::locator::{CollectionLocator, Locator};
use crate::result::{SettleError, SettleResult};

/// Outcome of one resolution attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A live element matched
    Found(ElementHandle),
    /// Nothing matched right now; the cause explains why
    Absent(DriverError),
    /// The selector (or a parent's selector) is malformed
    Invalid(DriverError),
}

impl Resolution {
    /// The resolved handle, if any
    #[must_use]
    pub const fn element(&self) -> Option<&ElementHandle> {
        match self {
            Self::Found(element) => Some(element),
            _ => None,
        }
    }

    /// Convert into a handle, turning absence and invalidity into errors
    pub fn into_element(self, locator: &Locator) -> SettleResult<ElementHandle> {
        match self {
            Self::Found(element) => Ok(element),
            Self::Absent(cause) => Err(SettleError::Driver(cause)),
            Self::Invalid(source) => Err(SettleError::InvalidSelector {
                selector: locator.to_string(),
                source,
            }),
        }
    }
}

/// Resolve the locator once
pub fn resolve(driver: &dyn UiDriver, locator: &Locator) -> SettleResult<Resolution> {
    let scope = match locator.scope() {
        Some(parent) => match resolve(driver, parent)? {
            Resolution::Found(element) => Some(element),
            other => return Ok(other),
        },
        None => None,
    };

    let matches = match driver.find_elements(scope.as_ref(), locator.selector()) {
        Ok(matches) => matches,
        Err(err) => return classify(err),
    };

    let index = locator.index();
    let len = matches.len();
    let resolution = match matches.into_iter().nth(index) {
        Some(element) => Resolution::Found(element),
        None if len == 0 => Resolution::Absent(DriverError::no_such_element(format!(
            "no element matches {}",
            locator.selector()
        ))),
        None => Resolution::Absent(DriverError::index_out_of_bounds(index, len)),
    };
    trace!(locator = %locator, ?resolution, "resolved");
    Ok(resolution)
}

/// Resolve every member of a collection once
pub fn resolve_all(
    driver: &dyn UiDriver,
    collection: &CollectionLocator,
) -> SettleResult<Vec<ElementHandle>> {
    let scope = match collection.scope() {
        Some(parent) => match resolve(driver, parent)? {
            Resolution::Found(element) => Some(element),
            Resolution::Absent(_) => return Ok(Vec::new()),
            Resolution::Invalid(source) => {
                return Err(SettleError::InvalidSelector {
                    selector: collection.to_string(),
                    source,
                })
            }
        },
        None => None,
    };
    match driver.find_elements(scope.as_ref(), collection.selector()) {
        Ok(matches) => Ok(matches),
        Err(err) => match classify(err)? {
            Resolution::Invalid(source) => Err(SettleError::InvalidSelector {
                selector: collection.to_string(),
                source,
            }),
            _ => Ok(Vec::new()),
        },
    }
}

fn classify(err: DriverError) -> SettleResult<Resolution> {
    match err.kind {
        DriverErrorKind::InvalidSelector => Ok(Resolution::Invalid(err)),
        DriverErrorKind::Unexpected => Err(SettleError::Driver(err)),
        _ => Ok(Resolution::Absent(err)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::driver::mock::{MockDriver, MockNode};
    use crate::selector::Selector;

    fn list() -> MockDriver {
        let driver = MockDriver::new();
        let ul = driver.insert(MockNode::new("ul").attr("id", "menu"));
        for label in ["Home", "About"] {
            driver.insert_into(&ul, MockNode::new("li").text(label));
        }
        driver
    }

    mod resolve_tests {
        use super::*;

        #[test]
        fn test_found_by_index() {
            let driver = list();
            let second = resolve(&driver, &Locator::nth("li", 1)).unwrap();
            let handle = second.element().unwrap();
            assert_eq!(driver.text(handle).unwrap(), "About");
        }

        #[test]
        fn test_no_match_is_absent() {
            let driver = list();
            match resolve(&driver, &Locator::new("table")).unwrap() {
                Resolution::Absent(cause) => assert_eq!(cause.kind, DriverErrorKind::NoSuchElement),
                other => panic!("expected absence, got {other:?}"),
            }
        }

        #[test]
        fn test_index_out_of_range_is_absent() {
            let driver = list();
            match resolve(&driver, &Locator::nth("li", 5)).unwrap() {
                Resolution::Absent(cause) => {
                    assert_eq!(cause.kind, DriverErrorKind::IndexOutOfBounds);
                    assert!(cause.message.contains("index 5"));
                }
                other => panic!("expected absence, got {other:?}"),
            }
        }

        #[test]
        fn test_malformed_selector_is_invalid() {
            let driver = list();
            let resolution = resolve(&driver, &Locator::new("li[")).unwrap();
            assert!(matches!(resolution, Resolution::Invalid(_)));
        }

        #[test]
        fn test_unexpected_failure_propagates() {
            let driver = list();
            driver.fail_next("find_elements", DriverError::unexpected("socket closed"));
            let err = resolve(&driver, &Locator::new("li")).unwrap_err();
            assert!(matches!(err, SettleError::Driver(_)));
        }

        #[test]
        fn test_recoverable_driver_failure_is_absent() {
            let driver = list();
            driver.fail_next("find_elements", DriverError::webdriver("document not ready"));
            let resolution = resolve(&driver, &Locator::new("li")).unwrap();
            assert!(matches!(resolution, Resolution::Absent(_)));
        }

        #[test]
        fn test_scoped_resolution_goes_through_parent() {
            let driver = list();
            let menu = Locator::new(Selector::id("menu"));
            let item = menu.child("li", 0);
            assert!(resolve(&driver, &item).unwrap().element().is_some());
            let missing = Locator::new("nav").child("li", 0);
            assert!(matches!(
                resolve(&driver, &missing).unwrap(),
                Resolution::Absent(_)
            ));
        }

        #[test]
        fn test_invalid_parent_selector_is_invalid() {
            let driver = list();
            let item = Locator::new("ul[").child("li", 0);
            assert!(matches!(
                resolve(&driver, &item).unwrap(),
                Resolution::Invalid(_)
            ));
        }

        #[test]
        fn test_into_element() {
            let driver = list();
            let locator = Locator::new("li[");
            let err = resolve(&driver, &locator)
                .unwrap()
                .into_element(&locator)
                .unwrap_err();
            assert!(err.is_invalid_selector());
        }
    }

    mod resolve_all_tests {
        use super::*;

        #[test]
        fn test_all_members() {
            let driver = list();
            let items = CollectionLocator::within(&Locator::new("ul"), "li");
            assert_eq!(resolve_all(&driver, &items).unwrap().len(), 2);
        }

        #[test]
        fn test_missing_scope_is_empty() {
            let driver = list();
            let items = CollectionLocator::within(&Locator::new("nav"), "li");
            assert!(resolve_all(&driver, &items).unwrap().is_empty());
        }

        #[test]
        fn test_invalid_selector_is_error() {
            let driver = list();
            let items = CollectionLocator::new("li[");
            assert!(resolve_all(&driver, &items).unwrap_err().is_invalid_selector());
        }
    }
}
