//! Path-addressed reads and edits over a document tree
//!
//! A path is a dot-separated list of segments. On an object a segment names
//! a child; on a list a numeric segment selects an index; `@name` selects an
//! attribute and must be the last segment. The empty path addresses the
//! node itself.
//!
//! Every mutating operation works on a draft copy of the caller's root and
//! only replaces the root once the edit has fully succeeded, so a failed
//! edit never leaves a half-applied tree behind.

use std::borrow::Cow;
use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::{debug, instrument, trace};

use crate::error::{Error, Result};
use crate::node::{Node, Object};
use crate::schema::SchemaSummary;

/// Marks a segment or condition key as addressing an attribute
pub const ATTRIBUTE_SENTINEL: char = '@';

/// Conjunctive equality condition: every field must equal its expected value
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Condition(IndexMap<String, String>);

impl Condition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: require `field` to equal `expected`
    pub fn with(mut self, field: impl Into<String>, expected: impl Into<String>) -> Self {
        self.0.insert(field.into(), expected.into());
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, expected: impl Into<String>) {
        self.0.insert(field.into(), expected.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, String> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Condition {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Outcome of [`validate_required`] and [`validate_against`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Validation {
    pub missing: Vec<String>,
}

impl Validation {
    /// Returns true if nothing is missing
    pub fn is_valid(&self) -> bool {
        self.missing.is_empty()
    }
}

fn parse_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

fn step<'a>(node: &'a Node, segment: &str) -> Option<&'a Node> {
    match node {
        Node::Object(object) => object.children.get(segment),
        Node::List(items) => parse_index(segment).and_then(|i| items.get(i)),
        Node::Scalar(_) => None,
    }
}

fn step_mut<'a>(node: &'a mut Node, segment: &str) -> Option<&'a mut Node> {
    match node {
        Node::Object(object) => object.children.get_mut(segment),
        Node::List(items) => parse_index(segment).and_then(|i| items.get_mut(i)),
        Node::Scalar(_) => None,
    }
}

/// Resolve `path`, returning `None` on any miss.
///
/// Nodes are borrowed; an attribute comes back as an owned scalar.
pub fn get<'a>(node: &'a Node, path: &str) -> Option<Cow<'a, Node>> {
    if path.is_empty() {
        return Some(Cow::Borrowed(node));
    }

    let mut current = node;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        trace!(segment, "resolving path segment");
        if let Some(name) = segment.strip_prefix(ATTRIBUTE_SENTINEL) {
            if segments.peek().is_some() {
                return None;
            }
            let value = current.as_object()?.attribute(name)?;
            return Some(Cow::Owned(Node::scalar(value)));
        }
        current = step(current, segment)?;
    }
    Some(Cow::Borrowed(current))
}

/// Mutable resolution; attributes are not addressable here
fn get_mut<'a>(node: &'a mut Node, path: &str) -> Option<&'a mut Node> {
    if path.is_empty() {
        return Some(node);
    }

    let mut current = node;
    for segment in path.split('.') {
        if segment.starts_with(ATTRIBUTE_SENTINEL) {
            return None;
        }
        current = step_mut(current, segment)?;
    }
    Some(current)
}

/// Run `edit` against a copy of `root`, committing only on success
fn transact<T>(root: &mut Node, edit: impl FnOnce(&mut Node) -> Result<T>) -> Result<T> {
    let mut draft = root.clone();
    let outcome = edit(&mut draft)?;
    *root = draft;
    Ok(outcome)
}

/// Assign `value` at `path`.
///
/// Missing object children along the way are created as empty objects;
/// missing list indices are not, and make the call return `false`. Also
/// `false` when the final container cannot take the value: an index past
/// the end of a list, an attribute on a non-object, or a non-scalar value
/// for an attribute.
pub fn set(root: &mut Node, path: &str, value: Node) -> bool {
    let applied = transact(root, |draft| {
        if set_in_place(draft, path, value) {
            Ok(())
        } else {
            Err(Error::path_not_found(path))
        }
    })
    .is_ok();
    debug!(path, applied, "set");
    applied
}

fn set_in_place(root: &mut Node, path: &str, value: Node) -> bool {
    if path.is_empty() {
        return false;
    }
    let (parents, last) = match path.rsplit_once('.') {
        Some((parents, last)) => (Some(parents), last),
        None => (None, path),
    };

    let mut current = root;
    for segment in parents.into_iter().flat_map(|p| p.split('.')) {
        if segment.starts_with(ATTRIBUTE_SENTINEL) {
            return false;
        }
        current = match current {
            Node::Object(object) => object
                .children
                .entry(segment.to_string())
                .or_insert_with(Node::default),
            Node::List(items) => match parse_index(segment).and_then(|i| items.get_mut(i)) {
                Some(item) => item,
                None => return false,
            },
            Node::Scalar(_) => return false,
        };
    }

    match current {
        Node::Object(object) => {
            if let Some(name) = last.strip_prefix(ATTRIBUTE_SENTINEL) {
                match value {
                    Node::Scalar(value) => {
                        object.attributes.insert(name.to_string(), value);
                        true
                    }
                    _ => false,
                }
            } else {
                object.children.insert(last.to_string(), value);
                true
            }
        }
        Node::List(items) => match parse_index(last).and_then(|i| items.get_mut(i)) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        },
        Node::Scalar(_) => false,
    }
}

/// Does `item` satisfy every entry of `condition`?
///
/// `@name` keys compare against attributes, other keys against the child
/// (or dotted descendant) at that path: a scalar's value, or an object's
/// inline text. An empty condition matches everything.
pub fn filter_match(item: &Node, condition: &Condition) -> bool {
    condition.iter().all(|(field, expected)| {
        match get(item, field).as_deref() {
            Some(Node::Scalar(actual)) => actual == expected,
            Some(Node::Object(object)) => object.text.as_deref() == Some(expected.as_str()),
            _ => false,
        }
    })
}

fn matches_item(item: &Node, condition: &Condition) -> bool {
    item.is_object() && filter_match(item, condition)
}

fn list_mut<'a>(root: &'a mut Node, path: &str) -> Result<&'a mut Vec<Node>> {
    if get(root, path).is_none() {
        return Err(Error::path_not_found(path));
    }
    match get_mut(root, path) {
        Some(Node::List(items)) => Ok(items),
        _ => Err(Error::not_a_list(path)),
    }
}

fn list_at<'a>(root: &'a Node, path: &str) -> Result<&'a [Node]> {
    match get(root, path) {
        None => Err(Error::path_not_found(path)),
        Some(Cow::Borrowed(Node::List(items))) => Ok(items),
        Some(_) => Err(Error::not_a_list(path)),
    }
}

/// Object elements of the list at `path` (or of `root` itself when no path
/// is given) that match `condition`.
pub fn filter(root: &Node, path: Option<&str>, condition: &Condition) -> Result<Vec<Node>> {
    let items = list_at(root, path.unwrap_or_default())?;
    let matched: Vec<Node> = items
        .iter()
        .filter(|item| matches_item(item, condition))
        .cloned()
        .collect();
    debug!(matched = matched.len(), total = items.len(), "filtered list");
    Ok(matched)
}

/// Append `item` to the list at `path`, returning the new length
#[instrument(level = "debug", skip(root, item))]
pub fn create(root: &mut Node, path: &str, item: Node) -> Result<usize> {
    create_many(root, path, vec![item])
}

/// Append every entry of `items` to the list at `path`
#[instrument(level = "debug", skip(root, items), fields(count = items.len()))]
pub fn create_many(root: &mut Node, path: &str, items: Vec<Node>) -> Result<usize> {
    transact(root, |draft| {
        let list = list_mut(draft, path)?;
        list.extend(items);
        debug!(len = list.len(), "created items");
        Ok(list.len())
    })
}

/// Merge `patch` into every object element matching `condition`, returning
/// how many were updated. Fails with `NoMatch` when none were.
#[instrument(level = "debug", skip(root, condition, patch))]
pub fn update(root: &mut Node, path: &str, condition: &Condition, patch: &Object) -> Result<usize> {
    transact(root, |draft| {
        let list = list_mut(draft, path)?;
        let mut updated = 0;
        for item in list.iter_mut() {
            if !matches_item(item, condition) {
                continue;
            }
            if let Node::Object(object) = item {
                object.merge(patch);
                updated += 1;
            }
        }
        if updated == 0 {
            return Err(Error::no_match(path));
        }
        debug!(updated, "updated items");
        Ok(updated)
    })
}

/// Remove every object element matching `condition`, returning how many
/// were removed. Fails with `NoMatch` when none were.
#[instrument(level = "debug", skip(root, condition))]
pub fn delete(root: &mut Node, path: &str, condition: &Condition) -> Result<usize> {
    transact(root, |draft| {
        let list = list_mut(draft, path)?;
        let before = list.len();
        list.retain(|item| !matches_item(item, condition));
        let deleted = before - list.len();
        if deleted == 0 {
            return Err(Error::no_match(path));
        }
        debug!(deleted, "deleted items");
        Ok(deleted)
    })
}

/// Report which of `fields` do not resolve under `root`
pub fn validate_required<S: AsRef<str>>(root: &Node, fields: &[S]) -> Validation {
    let missing = fields
        .iter()
        .map(|field| field.as_ref())
        .filter(|field| get(root, field).is_none())
        .map(str::to_string)
        .collect();
    Validation { missing }
}

/// Report which fields `summary` marks as required are absent from `item`.
///
/// Fields are compared in the field-path form of [`Node::scalar_leaves`],
/// so `item` is one element shaped like the samples the summary came from.
pub fn validate_against(item: &Node, summary: &SchemaSummary) -> Validation {
    let present: HashSet<String> = item.scalar_leaves().into_iter().map(|(path, _)| path).collect();
    let missing: Vec<String> = summary
        .required
        .iter()
        .filter(|field| !present.contains(field.as_str()))
        .cloned()
        .collect();
    debug!(missing = missing.len(), "validated against schema");
    Validation { missing }
}
