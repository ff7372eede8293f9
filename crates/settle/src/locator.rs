//! Virtual element descriptors.
//!
//! A [`Locator`] never holds a live element. It is a selector, an ordinal and
//! an optional parent scope; every operation resolves it again.

use std::fmt;
use std::sync::Arc;

use crate::selector::Selector;

/// Lazy, re-resolvable description of a single element
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    selector: Selector,
    index: usize,
    parent: Option<Arc<Locator>>,
}

impl Locator {
    /// First element matching the selector in the whole document
    #[must_use]
    pub fn new(selector: impl Into<Selector>) -> Self {
        Self::nth(selector, 0)
    }

    /// The `index`-th element matching the selector in the whole document
    #[must_use]
    pub fn nth(selector: impl Into<Selector>, index: usize) -> Self {
        Self {
            selector: selector.into(),
            index,
            parent: None,
        }
    }

    /// The `index`-th match of `selector` searched inside this element
    #[must_use]
    pub fn child(&self, selector: impl Into<Selector>, index: usize) -> Self {
        Self {
            selector: selector.into(),
            index,
            parent: Some(Arc::new(self.clone())),
        }
    }

    /// Parent element of this one
    #[must_use]
    pub fn parent_element(&self) -> Self {
        self.child(Selector::parent(), 0)
    }

    /// Nearest ancestor matching a tag name, or a class when prefixed with `.`
    #[must_use]
    pub fn closest(&self, tag_or_class: &str) -> Self {
        self.child(Selector::closest(tag_or_class), 0)
    }

    /// Get the selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Get the ordinal index among matches
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Get the scoping parent, if any
    #[must_use]
    pub fn scope(&self) -> Option<&Self> {
        self.parent.as_deref()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = &self.parent {
            write!(f, "{parent}/")?;
        }
        write!(f, "{}", self.selector)?;
        if self.index > 0 {
            write!(f, "[{}]", self.index)?;
        }
        Ok(())
    }
}

/// Lazy description of every element matching a selector inside a scope
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionLocator {
    selector: Selector,
    parent: Option<Arc<Locator>>,
}

impl CollectionLocator {
    /// All matches of the selector in the whole document
    #[must_use]
    pub fn new(selector: impl Into<Selector>) -> Self {
        Self {
            selector: selector.into(),
            parent: None,
        }
    }

    /// All matches of the selector inside `parent`
    #[must_use]
    pub fn within(parent: &Locator, selector: impl Into<Selector>) -> Self {
        Self {
            selector: selector.into(),
            parent: Some(Arc::new(parent.clone())),
        }
    }

    /// Locator of the `index`-th member
    #[must_use]
    pub fn nth(&self, index: usize) -> Locator {
        Locator {
            selector: self.selector.clone(),
            index,
            parent: self.parent.clone(),
        }
    }

    /// Get the selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Get the scoping parent, if any
    #[must_use]
    pub fn scope(&self) -> Option<&Locator> {
        self.parent.as_deref()
    }
}

impl fmt::Display for CollectionLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = &self.parent {
            write!(f, "{parent}/")?;
        }
        write!(f, "{}", self.selector)
    }
}
