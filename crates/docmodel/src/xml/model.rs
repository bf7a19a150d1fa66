//! Raw element tree produced by the XML reader
//!
//! This is the markup-faithful intermediate between source text and
//! [`Node`](crate::Node): text fragments and child elements are kept in
//! document order, before the collapse and merge rules are applied.

use indexmap::IndexMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: IndexMap<String, String>,
    pub children: Vec<Content>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Content {
    Element(Element),
    /// Character data, entity-decoded. Never whitespace-only.
    Text(String),
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    pub fn elements(&self) -> impl Iterator<Item = &Self> {
        self.children.iter().filter_map(|child| match child {
            Content::Element(element) => Some(element),
            Content::Text(_) => None,
        })
    }

    pub fn has_element_children(&self) -> bool {
        self.elements().next().is_some()
    }

    /// Trimmed, non-empty text fragments joined by a single space
    pub fn joined_text(&self) -> Option<String> {
        let fragments: Vec<&str> = self
            .children
            .iter()
            .filter_map(|child| match child {
                Content::Text(text) => Some(text.trim()),
                Content::Element(_) => None,
            })
            .filter(|text| !text.is_empty())
            .collect();

        if fragments.is_empty() {
            None
        } else {
            Some(fragments.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joined_text_skips_elements() {
        let mut element = Element::new("a");
        element.children.push(Content::Text(" foo ".to_string()));
        element.children.push(Content::Element(Element::new("b")));
        element.children.push(Content::Text("bar".to_string()));

        assert_eq!(element.joined_text(), Some("foo bar".to_string()));
        assert!(element.has_element_children());
    }

    #[test]
    fn test_joined_text_empty() {
        let element = Element::new("a");
        assert_eq!(element.joined_text(), None);
        assert!(!element.has_element_children());
    }
}
