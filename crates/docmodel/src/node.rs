//! The document tree every other component consumes and produces
//!
//! A parsed element becomes either a bare [`Node::Scalar`] (the collapsed
//! text node) or a [`Node::Object`]. When a child name repeats under one
//! parent its occurrences are exposed as a [`Node::List`]; a name that occurs
//! once is exposed as the single node, never as a one-element list.
//! Consumers must handle both shapes.

use indexmap::IndexMap;

/// One parsed element, scalar, or run of same-named siblings
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Node {
    /// Leaf text value
    Scalar(String),
    /// Ordered sequence of same-named siblings
    List(Vec<Node>),
    /// Element with attributes, optional inline text and named children
    Object(Object),
}

impl Default for Node {
    fn default() -> Self {
        Self::Object(Object::new())
    }
}

impl Node {
    /// Create a scalar node
    pub fn scalar(value: impl Into<String>) -> Self {
        Self::Scalar(value.into())
    }

    /// Returns true if this node is a scalar
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }

    /// Returns true if this node is an object
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// Returns true if this node is a list
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Get the text if this is a scalar
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Get the object if this is an object
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Get a mutable object if this is an object
    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Get the items if this is a list
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get the mutable items if this is a list
    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Self>> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Iterate the node as a sequence: a list yields its items, anything
    /// else yields itself once. Smooths over the single/repeated asymmetry
    /// for read-only consumers.
    pub fn iter_items(&self) -> std::slice::Iter<'_, Self> {
        match self {
            Self::List(items) => items.iter(),
            other => std::slice::from_ref(other).iter(),
        }
    }

    /// Every scalar leaf as `(field_path, value)`.
    ///
    /// Attributes are addressed as `@name`, children by dot-joined names,
    /// elements of a repeated child with a `[]` suffix, and the inline text
    /// of an object as `#text`. A bare scalar yields the empty path.
    pub fn scalar_leaves(&self) -> Vec<(String, &str)> {
        let mut out = Vec::new();
        collect_leaves(self, String::new(), &mut out);
        out
    }
}

fn join_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}.{segment}")
    }
}

fn collect_leaves<'a>(node: &'a Node, path: String, out: &mut Vec<(String, &'a str)>) {
    match node {
        Node::Scalar(value) => out.push((path, value.as_str())),
        Node::List(items) => {
            let path = format!("{path}[]");
            for item in items {
                collect_leaves(item, path.clone(), out);
            }
        }
        Node::Object(object) => {
            for (name, value) in &object.attributes {
                out.push((join_path(&path, &format!("@{name}")), value.as_str()));
            }
            if let Some(text) = &object.text {
                out.push((join_path(&path, "#text"), text.as_str()));
            }
            for (name, child) in &object.children {
                collect_leaves(child, join_path(&path, name), out);
            }
        }
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_owned())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl From<Object> for Node {
    fn from(value: Object) -> Self {
        Self::Object(value)
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Self::List(items)
    }
}

/// An element: attributes, optional inline text, named children
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Object {
    #[cfg_attr(
        feature = "serde",
        serde(default, rename = "@attributes", skip_serializing_if = "IndexMap::is_empty")
    )]
    pub attributes: IndexMap<String, String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, rename = "#text", skip_serializing_if = "Option::is_none")
    )]
    pub text: Option<String>,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub children: IndexMap<String, Node>,
}

impl Object {
    /// Create an empty object
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder that sets attribute `name`
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Builder that sets the inline text
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Builder form of [`Object::push_child`]
    pub fn with_child(mut self, name: impl Into<String>, child: impl Into<Node>) -> Self {
        self.push_child(name, child.into());
        self
    }

    /// Get an attribute value by name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Get a child (single node or list) by name
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.get(name)
    }

    /// Insert a child under `name`, merging with an existing entry: the
    /// second occurrence turns the single node into a two-element list and
    /// later ones append.
    pub fn push_child(&mut self, name: impl Into<String>, child: Node) {
        let name = name.into();
        match self.children.get_mut(&name) {
            Some(Node::List(items)) => items.push(child),
            Some(existing) => {
                let first = std::mem::take(existing);
                *existing = Node::List(vec![first, child]);
            }
            None => {
                self.children.insert(name, child);
            }
        }
    }

    /// Overwrite-by-key merge of `patch` into `self` (not deep)
    pub fn merge(&mut self, patch: &Self) {
        for (name, value) in &patch.attributes {
            self.attributes.insert(name.clone(), value.clone());
        }
        if let Some(text) = &patch.text {
            self.text = Some(text.clone());
        }
        for (name, child) in &patch.children {
            self.children.insert(name.clone(), child.clone());
        }
    }

    /// Returns true if there are no attributes, text or children
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.text.is_none() && self.children.is_empty()
    }
}

/// A parsed document: the root element's tag and its tree
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Document {
    pub root_tag: String,
    pub root: Node,
}

impl Document {
    /// Create a document from its root tag and tree
    pub fn new(root_tag: impl Into<String>, root: Node) -> Self {
        Self {
            root_tag: root_tag.into(),
            root,
        }
    }

    /// Wrap the root under its tag so paths start at the document element,
    /// e.g. `Items.Item.0.@id`.
    pub fn into_tree(self) -> Node {
        Node::Object(Object::new().with_child(self.root_tag, self.root))
    }
}
