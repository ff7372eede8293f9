//! Mock driver for unit testing.
//!
//! A tiny in-memory document: nodes with a tag, attributes, own text,
//! visibility, enabled and selected flags. Mutations can be scheduled to
//! happen after a delay, which is how tests model an asynchronously
//! rendering page. Failures can be injected per call name, and every call
//! is recorded in a history for verification.
//!
//! Selector support is a practical subset: compound CSS selectors with
//! descendant and child combinators, plus the XPath shapes settle itself produces
//! (`..`, `ancestor::`, text and value lookups, `//tag`).

use serde_json::Value;
use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::Chars;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::{DriverError, DriverResult, ElementHandle, Point, ScriptArg, UiDriver};
use crate::script;
use crate::selector::{Selector, Strategy};

/// A node of the mock document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockNode {
    /// Lower-case tag name
    pub tag: String,
    /// Attributes, including `value`
    pub attributes: BTreeMap<String, String>,
    /// Own text, rendered before any children
    pub text: String,
    /// Whether the node itself is rendered
    pub displayed: bool,
    /// Whether the node is enabled
    pub enabled: bool,
    /// Whether an option, checkbox or radio is selected
    pub selected: bool,
    /// Page coordinates
    pub location: Point,
}

impl MockNode {
    /// Create a visible, enabled node
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_lowercase(),
            attributes: BTreeMap::new(),
            text: String::new(),
            displayed: true,
            enabled: true,
            selected: false,
            location: Point::default(),
        }
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    /// Set own text
    #[must_use]
    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    /// Mark as not rendered
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    /// Mark as disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Mark as selected
    #[must_use]
    pub const fn selected(mut self) -> Self {
        self.selected = true;
        self
    }

    /// Set page coordinates
    #[must_use]
    pub const fn at(mut self, x: i64, y: i64) -> Self {
        self.location = Point::new(x, y);
        self
    }
}

/// A document change applied by [`MockDriver::schedule`]
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Make the node rendered
    Show(ElementHandle),
    /// Make the node not rendered
    Hide(ElementHandle),
    /// Detach the node and its subtree
    Remove(ElementHandle),
    /// Attach a node created with [`MockDriver::prepare`]
    Attach(ElementHandle),
    /// Replace the node's own text
    SetText(ElementHandle, String),
    /// Set an attribute
    SetAttribute(ElementHandle, String, String),
}

#[derive(Debug)]
struct Slot {
    node: MockNode,
    parent: Option<usize>,
    children: Vec<usize>,
    attached: bool,
}

#[derive(Debug, Default)]
struct MockState {
    slots: Vec<Slot>,
    roots: Vec<usize>,
    scheduled: Vec<(Instant, Mutation)>,
    failures: Vec<(String, DriverError)>,
    history: Vec<String>,
    script_results: BTreeMap<String, Value>,
    events: Vec<(usize, String)>,
    jquery: bool,
    active: Option<usize>,
    url: String,
}

/// In-memory [`UiDriver`] for tests
#[derive(Debug, Default)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    /// Create an empty document
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a node at the document root
    pub fn insert(&self, node: MockNode) -> ElementHandle {
        let mut state = self.state();
        let index = state.alloc(node, None);
        state.attach(index);
        handle(index)
    }

    /// Append a node as the last child of `parent`
    pub fn insert_into(&self, parent: &ElementHandle, node: MockNode) -> ElementHandle {
        let mut state = self.state();
        let index = state.alloc(node, parse_id(parent));
        state.attach(index);
        handle(index)
    }

    /// Create a detached node; attach it later with [`Mutation::Attach`]
    pub fn prepare(&self, parent: Option<&ElementHandle>, node: MockNode) -> ElementHandle {
        let mut state = self.state();
        let index = state.alloc(node, parent.and_then(parse_id));
        handle(index)
    }

    /// Detach a node and its subtree; later calls on it report a stale element
    pub fn remove(&self, element: &ElementHandle) {
        self.state().apply(Mutation::Remove(element.clone()));
    }

    /// Change visibility of a node
    pub fn set_displayed(&self, element: &ElementHandle, displayed: bool) {
        let mutation = if displayed {
            Mutation::Show(element.clone())
        } else {
            Mutation::Hide(element.clone())
        };
        self.state().apply(mutation);
    }

    /// Replace own text of a node
    pub fn set_text(&self, element: &ElementHandle, text: &str) {
        self.state()
            .apply(Mutation::SetText(element.clone(), text.to_string()));
    }

    /// Set an attribute of a node
    pub fn set_attribute(&self, element: &ElementHandle, name: &str, value: &str) {
        self.state().apply(Mutation::SetAttribute(
            element.clone(),
            name.to_string(),
            value.to_string(),
        ));
    }

    /// Apply `mutation` once `after` has elapsed
    pub fn schedule(&self, after: Duration, mutation: Mutation) {
        self.state().scheduled.push((Instant::now() + after, mutation));
    }

    /// Make the next call named `call` (e.g. `"find_elements"`) fail with `error`
    pub fn fail_next(&self, call: &str, error: DriverError) {
        self.state().failures.push((call.to_string(), error));
    }

    /// Result returned for a script the mock does not interpret itself
    pub fn set_script_result(&self, script: &str, result: Value) {
        self.state()
            .script_results
            .insert(script.to_string(), result);
    }

    /// Whether jQuery is reported as loaded
    pub fn set_jquery(&self, available: bool) {
        self.state().jquery = available;
    }

    /// Give keyboard focus to a node
    pub fn focus(&self, element: &ElementHandle) {
        self.state().active = parse_id(element);
    }

    /// Snapshot of a node, attached or not
    #[must_use]
    pub fn node(&self, element: &ElementHandle) -> Option<MockNode> {
        let state = self.state();
        parse_id(element)
            .and_then(|index| state.slots.get(index))
            .map(|slot| slot.node.clone())
    }

    /// Attached children of a node
    #[must_use]
    pub fn children(&self, element: &ElementHandle) -> Vec<ElementHandle> {
        let state = self.state();
        parse_id(element)
            .and_then(|index| state.slots.get(index))
            .map(|slot| {
                slot.children
                    .iter()
                    .filter(|child| state.slots[**child].attached)
                    .map(|child| handle(*child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Events fired through scripts, as (element, event name)
    #[must_use]
    pub fn events(&self) -> Vec<(ElementHandle, String)> {
        self.state()
            .events
            .iter()
            .map(|(index, name)| (handle(*index), name.clone()))
            .collect()
    }

    /// Current URL
    #[must_use]
    pub fn current_url(&self) -> String {
        self.state().url.clone()
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state().history.clone()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.state().history.iter().any(|c| c.starts_with(prefix))
    }

    /// Number of recorded calls starting with `prefix`
    #[must_use]
    pub fn call_count(&self, prefix: &str) -> usize {
        self.state()
            .history
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }
}

fn handle(index: usize) -> ElementHandle {
    ElementHandle::new(format!("mock-{index}"))
}

fn parse_id(element: &ElementHandle) -> Option<usize> {
    element.id.strip_prefix("mock-")?.parse().ok()
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl MockState {
    fn alloc(&mut self, node: MockNode, parent: Option<usize>) -> usize {
        self.slots.push(Slot {
            node,
            parent,
            children: Vec::new(),
            attached: false,
        });
        self.slots.len() - 1
    }

    fn attach(&mut self, index: usize) {
        match self.slots[index].parent {
            Some(parent) => self.slots[parent].children.push(index),
            None => self.roots.push(index),
        }
        self.set_attached(index, true);
    }

    fn set_attached(&mut self, index: usize, attached: bool) {
        self.slots[index].attached = attached;
        let children = self.slots[index].children.clone();
        for child in children {
            self.set_attached(child, attached);
        }
    }

    fn apply(&mut self, mutation: Mutation) {
        let target = |element: &ElementHandle| parse_id(element);
        match mutation {
            Mutation::Show(el) => {
                if let Some(slot) = target(&el).and_then(|i| self.slots.get_mut(i)) {
                    slot.node.displayed = true;
                }
            }
            Mutation::Hide(el) => {
                if let Some(slot) = target(&el).and_then(|i| self.slots.get_mut(i)) {
                    slot.node.displayed = false;
                }
            }
            Mutation::Remove(el) => {
                if let Some(index) = target(&el).filter(|i| *i < self.slots.len()) {
                    match self.slots[index].parent {
                        Some(parent) => self.slots[parent].children.retain(|c| *c != index),
                        None => self.roots.retain(|c| *c != index),
                    }
                    self.set_attached(index, false);
                }
            }
            Mutation::Attach(el) => {
                if let Some(index) = target(&el).filter(|i| *i < self.slots.len()) {
                    self.attach(index);
                }
            }
            Mutation::SetText(el, text) => {
                if let Some(slot) = target(&el).and_then(|i| self.slots.get_mut(i)) {
                    slot.node.text = text;
                }
            }
            Mutation::SetAttribute(el, name, value) => {
                if let Some(slot) = target(&el).and_then(|i| self.slots.get_mut(i)) {
                    slot.node.attributes.insert(name, value);
                }
            }
        }
    }

    fn apply_due(&mut self) {
        let now = Instant::now();
        let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.scheduled)
            .into_iter()
            .partition(|(at, _)| *at <= now);
        self.scheduled = pending;
        for (_, mutation) in due {
            self.apply(mutation);
        }
    }

    /// Record a call and surface any injected failure for it
    fn begin(&mut self, call: &str, detail: &str) -> DriverResult<()> {
        self.apply_due();
        self.history.push(format!("{call}:{detail}"));
        match self.failures.iter().position(|(name, _)| name == call) {
            Some(pos) => Err(self.failures.remove(pos).1),
            None => Ok(()),
        }
    }

    fn slot(&self, element: &ElementHandle) -> DriverResult<usize> {
        parse_id(element)
            .filter(|index| self.slots.get(*index).is_some_and(|slot| slot.attached))
            .ok_or_else(|| {
                DriverError::stale(format!("{} is no longer attached to the document", element.id))
            })
    }

    fn visible(&self, index: usize) -> bool {
        let slot = &self.slots[index];
        slot.node.displayed && slot.parent.map_or(true, |parent| self.visible(parent))
    }

    fn interactable(&self, element: &ElementHandle) -> DriverResult<usize> {
        let index = self.slot(element)?;
        if self.visible(index) {
            Ok(index)
        } else {
            Err(DriverError::not_interactable(format!(
                "{} is not visible",
                element.id
            )))
        }
    }

    fn descendants(&self, index: usize, out: &mut Vec<usize>) {
        for child in &self.slots[index].children {
            if self.slots[*child].attached {
                out.push(*child);
                self.descendants(*child, out);
            }
        }
    }

    /// Candidates for a search: descendants of the scope, or the whole document
    fn search_space(&self, scope: Option<usize>) -> Vec<usize> {
        let mut out = Vec::new();
        match scope {
            Some(index) => self.descendants(index, &mut out),
            None => {
                for root in &self.roots {
                    out.push(*root);
                    self.descendants(*root, &mut out);
                }
            }
        }
        out
    }

    /// Ancestors, nearest first
    fn ancestors(&self, index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut current = self.slots[index].parent;
        while let Some(parent) = current {
            out.push(parent);
            current = self.slots[parent].parent;
        }
        out
    }

    fn attr(&self, index: usize, name: &str) -> Option<&str> {
        self.slots[index].node.attributes.get(name).map(String::as_str)
    }

    fn text_content(&self, index: usize) -> String {
        let slot = &self.slots[index];
        let mut out = slot.node.text.clone();
        for child in &slot.children {
            if self.slots[*child].attached {
                out.push_str(&self.text_content(*child));
            }
        }
        out
    }

    fn rendered_text(&self, index: usize) -> String {
        if !self.visible(index) {
            return String::new();
        }
        let slot = &self.slots[index];
        let mut parts = vec![slot.node.text.trim().to_string()];
        for child in &slot.children {
            if self.slots[*child].attached {
                parts.push(self.rendered_text(*child));
            }
        }
        parts.retain(|part| !part.is_empty());
        parts.join("\n")
    }

    fn inner_html(&self, index: usize) -> String {
        let slot = &self.slots[index];
        let mut out = slot.node.text.clone();
        for child in &slot.children {
            if self.slots[*child].attached {
                let node = &self.slots[*child].node;
                out.push('<');
                out.push_str(&node.tag);
                for (name, value) in &node.attributes {
                    out.push_str(&format!(" {name}=\"{value}\""));
                }
                out.push('>');
                out.push_str(&self.inner_html(*child));
                out.push_str(&format!("</{}>", node.tag));
            }
        }
        out
    }

    fn element_arg(&self, args: &[ScriptArg], n: usize) -> DriverResult<usize> {
        let element = args
            .get(n)
            .and_then(ScriptArg::as_element)
            .ok_or_else(|| {
                DriverError::webdriver(format!("javascript error: arguments[{n}] is not an element"))
            })?;
        self.slot(element)
    }

    fn string_arg<'a>(args: &'a [ScriptArg], n: usize) -> DriverResult<&'a str> {
        args.get(n).and_then(ScriptArg::as_str).ok_or_else(|| {
            DriverError::webdriver(format!("javascript error: arguments[{n}] is not a string"))
        })
    }

    fn set_value(&mut self, index: usize, value: &str) {
        self.slots[index]
            .node
            .attributes
            .insert("value".to_string(), value.to_string());
    }

    fn select_option(&mut self, index: usize) {
        let owner = self
            .ancestors(index)
            .into_iter()
            .find(|a| self.slots[*a].node.tag == "select");
        if let Some(select) = owner.filter(|s| self.attr(*s, "multiple").is_none()) {
            let mut options = Vec::new();
            self.descendants(select, &mut options);
            for option in options {
                self.slots[option].node.selected = false;
            }
        }
        self.slots[index].node.selected = true;
    }

    // =========================================================================
    // Selector evaluation
    // =========================================================================

    fn query(&self, scope: Option<usize>, selector: &Selector) -> DriverResult<Vec<usize>> {
        let (strategy, value) = selector.locator();
        match strategy {
            Strategy::Css => {
                let compounds = parse_css(&value)?;
                Ok(self
                    .search_space(scope)
                    .into_iter()
                    .filter(|index| self.css_matches(&compounds, *index))
                    .collect())
            }
            Strategy::TagName => Ok(self
                .search_space(scope)
                .into_iter()
                .filter(|index| self.slots[*index].node.tag.eq_ignore_ascii_case(&value))
                .collect()),
            Strategy::LinkText => Ok(self
                .search_space(scope)
                .into_iter()
                .filter(|index| {
                    self.slots[*index].node.tag == "a"
                        && normalize(&self.text_content(*index)) == value
                })
                .collect()),
            Strategy::XPath => self.xpath(scope, &value),
        }
    }

    fn compound_matches(&self, compound: &Compound, index: usize) -> bool {
        let node = &self.slots[index].node;
        if compound.tag.as_ref().is_some_and(|tag| *tag != node.tag) {
            return false;
        }
        if compound
            .id
            .as_deref()
            .is_some_and(|id| self.attr(index, "id") != Some(id))
        {
            return false;
        }
        let classes = self.attr(index, "class").unwrap_or_default();
        if !compound
            .classes
            .iter()
            .all(|class| classes.split_whitespace().any(|token| token == class))
        {
            return false;
        }
        compound.attrs.iter().all(|(name, expected)| {
            match (self.attr(index, name), expected) {
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual == expected,
                (None, _) => false,
            }
        })
    }

    /// Whether `index` matches the selector ending at `compounds.last()`
    fn css_matches(&self, compounds: &[Compound], index: usize) -> bool {
        let Some((last, rest)) = compounds.split_last() else {
            return false;
        };
        if !self.compound_matches(last, index) {
            return false;
        }
        if rest.is_empty() {
            return true;
        }
        if last.child {
            self.slots[index]
                .parent
                .is_some_and(|parent| self.css_matches(rest, parent))
        } else {
            self.ancestors(index)
                .into_iter()
                .any(|ancestor| self.css_matches(rest, ancestor))
        }
    }

    fn xpath(&self, scope: Option<usize>, expr: &str) -> DriverResult<Vec<usize>> {
        let invalid = || DriverError::invalid_selector(format!("invalid xpath expression: {expr}"));
        if !balanced(expr) {
            return Err(invalid());
        }
        if expr == ".." {
            return Ok(scope
                .and_then(|index| self.slots[index].parent)
                .into_iter()
                .collect());
        }
        if let Some(step) = expr.strip_prefix("ancestor::") {
            let (test, first_only) = match step.strip_suffix("[1]") {
                Some(test) => (test, true),
                None => (step, false),
            };
            let class = match test.strip_prefix("*[@class=") {
                Some(rest) => Some(
                    rest.strip_suffix(']')
                        .and_then(parse_literal)
                        .ok_or_else(invalid)?,
                ),
                None => None,
            };
            let mut found: Vec<usize> = scope
                .map(|index| self.ancestors(index))
                .unwrap_or_default()
                .into_iter()
                .filter(|a| match &class {
                    Some(class) => self.attr(*a, "class") == Some(class.as_str()),
                    None => self.slots[*a].node.tag == test,
                })
                .collect();
            if first_only {
                found.truncate(1);
            }
            return Ok(found);
        }
        if let Some(literal) = expr
            .strip_prefix(".//*/text()[normalize-space(.) = ")
            .and_then(|rest| rest.strip_suffix("]/parent::*"))
        {
            let wanted = parse_literal(literal).ok_or_else(invalid)?;
            return Ok(self
                .search_space(scope)
                .into_iter()
                .filter(|index| normalize(&self.slots[*index].node.text) == wanted)
                .collect());
        }
        if let Some(literal) = expr
            .strip_prefix(".//*[@value = ")
            .and_then(|rest| rest.strip_suffix(']'))
        {
            let wanted = parse_literal(literal).ok_or_else(invalid)?;
            return Ok(self
                .search_space(scope)
                .into_iter()
                .filter(|index| self.attr(*index, "value") == Some(wanted.as_str()))
                .collect());
        }
        if let Some(tag) = expr
            .strip_prefix(".//")
            .or_else(|| expr.strip_prefix("//"))
            .filter(|tag| tag.chars().all(is_ident_char) && !tag.is_empty())
        {
            return Ok(self
                .search_space(scope)
                .into_iter()
                .filter(|index| self.slots[*index].node.tag == tag)
                .collect());
        }
        Err(invalid())
    }
}

#[derive(Debug, Default)]
struct Compound {
    /// Joined to the previous compound by `>`
    child: bool,
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn ident(chars: &mut Peekable<Chars<'_>>) -> Option<String> {
    let mut out = String::new();
    while let Some(c) = chars.next_if(|c| is_ident_char(*c)) {
        out.push(c);
    }
    (!out.is_empty()).then_some(out)
}

fn quoted(chars: &mut Peekable<Chars<'_>>) -> Option<String> {
    let quote = chars.next()?;
    let mut out = String::new();
    loop {
        match chars.next()? {
            '\\' => out.push(chars.next()?),
            c if c == quote => return Some(out),
            c => out.push(c),
        }
    }
}

fn attribute_test(chars: &mut Peekable<Chars<'_>>) -> Option<(String, Option<String>)> {
    let name = ident(chars)?;
    match chars.next()? {
        ']' => Some((name, None)),
        '=' => {
            let value = match chars.peek()? {
                '"' | '\'' => quoted(chars)?,
                _ => ident(chars)?,
            };
            (chars.next()? == ']').then_some((name, Some(value)))
        }
        _ => None,
    }
}

fn parse_css(selector: &str) -> DriverResult<Vec<Compound>> {
    let invalid = || DriverError::invalid_selector(format!("invalid css selector: {selector}"));
    let mut compounds = Vec::new();
    let mut current = Compound::default();
    let mut started = false;
    let mut child = false;
    let mut chars = selector.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if started {
                    current.child = std::mem::take(&mut child);
                    compounds.push(std::mem::take(&mut current));
                    started = false;
                }
            }
            '>' => {
                if started {
                    current.child = std::mem::take(&mut child);
                    compounds.push(std::mem::take(&mut current));
                    started = false;
                }
                if compounds.is_empty() || child {
                    return Err(invalid());
                }
                child = true;
            }
            '*' if !started => started = true,
            '#' => {
                current.id = Some(ident(&mut chars).ok_or_else(invalid)?);
                started = true;
            }
            '.' => {
                current.classes.push(ident(&mut chars).ok_or_else(invalid)?);
                started = true;
            }
            '[' => {
                current
                    .attrs
                    .push(attribute_test(&mut chars).ok_or_else(invalid)?);
                started = true;
            }
            c if is_ident_char(c) && !started => {
                let mut tag = c.to_string();
                tag.push_str(&ident(&mut chars).unwrap_or_default());
                current.tag = Some(tag.to_lowercase());
                started = true;
            }
            _ => return Err(invalid()),
        }
    }
    if started {
        current.child = child;
        compounds.push(current);
    } else if child {
        return Err(invalid());
    }
    if compounds.is_empty() {
        return Err(invalid());
    }
    Ok(compounds)
}

/// Brackets and parentheses balance outside of string literals
fn balanced(expr: &str) -> bool {
    let mut depth: Vec<char> = Vec::new();
    let mut quote: Option<char> = None;
    for c in expr.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => depth.push(']'),
            (None, '(') => depth.push(')'),
            (None, ']' | ')') => {
                if depth.pop() != Some(c) {
                    return false;
                }
            }
            (None, _) => {}
        }
    }
    quote.is_none() && depth.is_empty()
}

/// Parse an XPath string literal, including `concat(...)` of literals
fn parse_literal(text: &str) -> Option<String> {
    let text = text.trim();
    if let Some(inner) = text
        .strip_prefix("concat(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let mut out = String::new();
        let mut chars = inner.chars().peekable();
        loop {
            while chars.next_if(|c| c.is_whitespace() || *c == ',').is_some() {}
            if chars.peek().is_none() {
                return Some(out);
            }
            out.push_str(&quoted(&mut chars)?);
        }
    }
    let mut chars = text.chars().peekable();
    let quote = *chars.peek()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let value = quoted(&mut chars)?;
    chars.peek().is_none().then_some(value)
}

impl UiDriver for MockDriver {
    fn find_elements(
        &self,
        scope: Option<&ElementHandle>,
        selector: &Selector,
    ) -> DriverResult<Vec<ElementHandle>> {
        let mut state = self.state();
        state.begin("find_elements", &selector.to_string())?;
        let scope = scope.map(|element| state.slot(element)).transpose()?;
        Ok(state
            .query(scope, selector)?
            .into_iter()
            .map(handle)
            .collect())
    }

    fn tag_name(&self, element: &ElementHandle) -> DriverResult<String> {
        let mut state = self.state();
        state.begin("tag_name", &element.id)?;
        let index = state.slot(element)?;
        Ok(state.slots[index].node.tag.clone())
    }

    fn attribute(&self, element: &ElementHandle, name: &str) -> DriverResult<Option<String>> {
        let mut state = self.state();
        state.begin("attribute", &format!("{}:{name}", element.id))?;
        let index = state.slot(element)?;
        Ok(match name {
            "textContent" => Some(state.text_content(index)),
            "innerText" => Some(state.rendered_text(index)),
            "innerHTML" => Some(state.inner_html(index)),
            _ => state.attr(index, name).map(str::to_string),
        })
    }

    fn css_value(&self, element: &ElementHandle, name: &str) -> DriverResult<String> {
        let mut state = self.state();
        state.begin("css_value", &format!("{}:{name}", element.id))?;
        let index = state.slot(element)?;
        Ok(state
            .attr(index, &format!("style.{name}"))
            .unwrap_or_default()
            .to_string())
    }

    fn text(&self, element: &ElementHandle) -> DriverResult<String> {
        let mut state = self.state();
        state.begin("text", &element.id)?;
        let index = state.slot(element)?;
        Ok(state.rendered_text(index))
    }

    fn is_displayed(&self, element: &ElementHandle) -> DriverResult<bool> {
        let mut state = self.state();
        state.begin("is_displayed", &element.id)?;
        let index = state.slot(element)?;
        Ok(state.visible(index))
    }

    fn is_enabled(&self, element: &ElementHandle) -> DriverResult<bool> {
        let mut state = self.state();
        state.begin("is_enabled", &element.id)?;
        let index = state.slot(element)?;
        Ok(state.slots[index].node.enabled && state.attr(index, "disabled").is_none())
    }

    fn is_selected(&self, element: &ElementHandle) -> DriverResult<bool> {
        let mut state = self.state();
        state.begin("is_selected", &element.id)?;
        let index = state.slot(element)?;
        Ok(state.slots[index].node.selected)
    }

    fn location(&self, element: &ElementHandle) -> DriverResult<Point> {
        let mut state = self.state();
        state.begin("location", &element.id)?;
        let index = state.slot(element)?;
        Ok(state.slots[index].node.location)
    }

    fn click(&self, element: &ElementHandle) -> DriverResult<()> {
        let mut state = self.state();
        state.begin("click", &element.id)?;
        let index = state.interactable(element)?;
        state.active = Some(index);
        let tag = state.slots[index].node.tag.clone();
        let input_type = state.attr(index, "type").map(str::to_string);
        match (tag.as_str(), input_type.as_deref()) {
            ("option", _) => state.select_option(index),
            ("input", Some("checkbox")) => {
                let slot = &mut state.slots[index].node;
                slot.selected = !slot.selected;
            }
            ("input", Some("radio")) => state.slots[index].node.selected = true,
            _ => {}
        }
        Ok(())
    }

    fn send_keys(&self, element: &ElementHandle, text: &str) -> DriverResult<()> {
        let mut state = self.state();
        state.begin("send_keys", &format!("{}:{text}", element.id))?;
        let index = state.interactable(element)?;
        state.active = Some(index);
        if state.attr(index, "type") == Some("file") {
            state.set_value(index, text);
            return Ok(());
        }
        let typed: String = text
            .chars()
            .filter(|c| !('\u{E000}'..='\u{F8FF}').contains(c))
            .collect();
        let mut current = state.attr(index, "value").unwrap_or_default().to_string();
        current.push_str(&typed);
        state.set_value(index, &current);
        Ok(())
    }

    fn clear(&self, element: &ElementHandle) -> DriverResult<()> {
        let mut state = self.state();
        state.begin("clear", &element.id)?;
        let index = state.interactable(element)?;
        state.set_value(index, "");
        Ok(())
    }

    fn context_click(&self, element: &ElementHandle) -> DriverResult<()> {
        let mut state = self.state();
        state.begin("context_click", &element.id)?;
        state.interactable(element).map(|_| ())
    }

    fn hover(&self, element: &ElementHandle) -> DriverResult<()> {
        let mut state = self.state();
        state.begin("hover", &element.id)?;
        state.interactable(element).map(|_| ())
    }

    fn drag_and_drop(&self, source: &ElementHandle, target: &ElementHandle) -> DriverResult<()> {
        let mut state = self.state();
        state.begin("drag_and_drop", &format!("{}->{}", source.id, target.id))?;
        state.interactable(source)?;
        state.interactable(target).map(|_| ())
    }

    fn execute_script(&self, script: &str, args: &[ScriptArg]) -> DriverResult<Value> {
        let mut state = self.state();
        let first_line = script.lines().next().unwrap_or_default().trim().to_string();
        state.begin("execute_script", &first_line)?;
        match script {
            script::FIRE_EVENT => {
                let index = state.element_arg(args, 0)?;
                let event = MockState::string_arg(args, 1)?.to_string();
                state.events.push((index, event));
                Ok(Value::Bool(false))
            }
            script::SET_VALUE => {
                let index = state.element_arg(args, 0)?;
                let value = MockState::string_arg(args, 1)?.to_string();
                state.set_value(index, &value);
                Ok(Value::Null)
            }
            script::JQUERY_SET_VALUE => {
                if !state.jquery {
                    return Err(DriverError::webdriver(
                        "javascript error: jQuery is not defined",
                    ));
                }
                let index = state.element_arg(args, 0)?;
                let value = MockState::string_arg(args, 1)?.to_string();
                state.set_value(index, &value);
                for event in ["keydown", "keypress", "keyup"] {
                    state.events.push((index, event.to_string()));
                }
                Ok(Value::Null)
            }
            script::JQUERY_AVAILABLE => Ok(Value::Bool(state.jquery)),
            script::CLONE_FILE_INPUT => {
                let form = state.element_arg(args, 0)?;
                let original = state.element_arg(args, 1)?;
                let mut clone = MockNode::new("input")
                    .attr("style.width", "1px")
                    .attr("style.height", "1px");
                for name in ["type", "name"] {
                    if let Some(value) = state.attr(original, name) {
                        clone = clone.attr(name, &value.to_string());
                    }
                }
                let index = state.alloc(clone, Some(form));
                state.attach(index);
                Ok(handle(index).to_json())
            }
            script::IS_IMAGE_LOADED => {
                let index = state.element_arg(args, 0)?;
                let complete = state.attr(index, "complete") == Some("true");
                let width: u64 = state
                    .attr(index, "naturalWidth")
                    .and_then(|w| w.parse().ok())
                    .unwrap_or(0);
                Ok(Value::Bool(complete && width > 0))
            }
            script::ACTIVE_ELEMENT => Ok(state
                .active
                .filter(|index| state.slots[*index].attached)
                .map_or(Value::Null, |index| handle(index).to_json())),
            _ => Ok(state
                .script_results
                .get(script)
                .cloned()
                .unwrap_or(Value::Null)),
        }
    }

    fn navigate(&self, url: &str) -> DriverResult<()> {
        let mut state = self.state();
        state.begin("navigate", url)?;
        state.url = url.to_string();
        Ok(())
    }
}
