//! Structural and type schema inference over document trees
//!
//! Single-sample inference ([`infer`]) walks one tree and sniffs a type for
//! every scalar. Multi-sample inference ([`infer_schema`]) looks at a set of
//! sibling nodes and adds what only shows up across instances: enumerations,
//! numeric ranges, and which fields are required or optional.
//!
//! Inference never fails. Anything without a recognisable type is a string.

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use tracing::{debug, instrument};

use crate::node::Node;

/// Primitive and structural kinds a field can take
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SchemaType {
    Object,
    Array,
    String,
    Integer,
    Number,
    Boolean,
    Null,
}

impl SchemaType {
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Number)
    }

    pub const fn is_scalar(self) -> bool {
        matches!(self, Self::String | Self::Integer | Self::Number | Self::Boolean)
    }

    /// Narrowest kind covering both: integers widen to numbers, `null`
    /// yields to anything, every other disagreement is a string.
    pub fn unify(self, other: Self) -> Self {
        match (self, other) {
            (a, b) if a == b => a,
            (Self::Null, other) | (other, Self::Null) => other,
            (a, b) if a.is_numeric() && b.is_numeric() => Self::Number,
            _ => Self::String,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Null => "null",
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lexical type of a scalar, tried in order: boolean literal (`true` /
/// `false`, case-sensitive), integer (`-?[0-9]+`), finite float, string.
pub fn sniff(value: &str) -> SchemaType {
    if value == "true" || value == "false" {
        return SchemaType::Boolean;
    }
    let digits = value.strip_prefix('-').unwrap_or(value);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        return SchemaType::Integer;
    }
    match value.parse::<f64>() {
        Ok(number) if number.is_finite() => SchemaType::Number,
        _ => SchemaType::String,
    }
}

/// How the item schema of a repeated child is derived
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ArrayItemPolicy {
    /// Infer from the first element only
    #[default]
    FirstElement,
    /// Merge the schemas of every element
    Merged,
}

/// `numerator / denominator`, compared exactly
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ratio {
    pub numerator: usize,
    pub denominator: usize,
}

impl Ratio {
    pub const fn new(numerator: usize, denominator: usize) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// `count <= ratio * total`
    pub fn admits(self, count: usize, total: usize) -> bool {
        count.saturating_mul(self.denominator) <= self.numerator.saturating_mul(total)
    }
}

/// Policy knobs for inference
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SchemaPolicy {
    /// A string field is enumerable when its distinct values number at most
    /// this fraction of the sample count...
    pub enum_ratio: Ratio,
    /// ...and at most this many in absolute terms
    pub enum_max_values: usize,
    pub array_items: ArrayItemPolicy,
}

impl Default for SchemaPolicy {
    fn default() -> Self {
        Self {
            enum_ratio: Ratio::new(1, 2),
            enum_max_values: 32,
            array_items: ArrayItemPolicy::FirstElement,
        }
    }
}

impl SchemaPolicy {
    pub const fn with_enum_ratio(mut self, numerator: usize, denominator: usize) -> Self {
        self.enum_ratio = Ratio::new(numerator, denominator);
        self
    }

    pub const fn with_enum_max_values(mut self, max: usize) -> Self {
        self.enum_max_values = max;
        self
    }

    pub const fn with_array_items(mut self, policy: ArrayItemPolicy) -> Self {
        self.array_items = policy;
        self
    }

    fn is_enumerable(&self, distinct: usize, samples: usize) -> bool {
        distinct > 0 && distinct <= self.enum_max_values && self.enum_ratio.admits(distinct, samples)
    }
}

/// Inferred structure of one node
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchemaDescriptor {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: SchemaType,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "IndexMap::is_empty")
    )]
    pub properties: IndexMap<String, SchemaDescriptor>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "IndexMap::is_empty")
    )]
    pub attributes: IndexMap<String, SchemaType>,
    /// Type of an object's inline text
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub text: Option<SchemaType>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub items: Option<Box<SchemaDescriptor>>,
}

impl SchemaDescriptor {
    pub fn leaf(kind: SchemaType) -> Self {
        Self {
            kind,
            properties: IndexMap::new(),
            attributes: IndexMap::new(),
            text: None,
            items: None,
        }
    }

    fn object() -> Self {
        Self::leaf(SchemaType::Object)
    }

    fn array(items: Self) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::leaf(SchemaType::Array)
        }
    }

    /// Flat `field-path -> type` listing. Paths are dot-joined, `[]` marks
    /// "each element of the list here", `@name` an attribute and `#text` an
    /// object's inline text.
    pub fn field_paths(&self) -> IndexMap<String, SchemaType> {
        let mut out = IndexMap::new();
        self.collect_paths(String::new(), &mut out);
        out
    }

    fn collect_paths(&self, path: String, out: &mut IndexMap<String, SchemaType>) {
        if !path.is_empty() || self.kind.is_scalar() {
            out.insert(path.clone(), self.kind);
        }
        let prefix = |segment: &str| {
            if path.is_empty() {
                segment.to_string()
            } else {
                format!("{path}.{segment}")
            }
        };
        for (name, kind) in &self.attributes {
            out.insert(prefix(&format!("@{name}")), *kind);
        }
        if let Some(kind) = self.text {
            out.insert(prefix("#text"), kind);
        }
        for (name, child) in &self.properties {
            child.collect_paths(prefix(name), out);
        }
        if let Some(items) = &self.items {
            items.collect_paths(format!("{path}[]"), out);
        }
    }

    /// Combine two descriptors of the same field.
    ///
    /// Objects union their properties; a scalar meeting an object becomes
    /// the object's text type (an element that is sometimes collapsed);
    /// an array meeting a non-array merges into its items.
    pub fn merge(self, other: Self) -> Self {
        use SchemaType::{Array, Null, Object};

        match (self.kind, other.kind) {
            (Null, _) => other,
            (_, Null) => self,
            (Object, Object) => {
                let mut merged = self;
                for (name, kind) in other.attributes {
                    let kind = merged
                        .attributes
                        .get(&name)
                        .map_or(kind, |existing| existing.unify(kind));
                    merged.attributes.insert(name, kind);
                }
                merged.text = unify_option(merged.text, other.text);
                for (name, child) in other.properties {
                    match merged.properties.get_mut(&name) {
                        Some(existing) => {
                            let previous = std::mem::replace(existing, Self::leaf(Null));
                            *existing = previous.merge(child);
                        }
                        None => {
                            merged.properties.insert(name, child);
                        }
                    }
                }
                merged
            }
            (Object, kind) if kind.is_scalar() => {
                let mut merged = self;
                merged.text = unify_option(merged.text, Some(kind));
                merged
            }
            (kind, Object) if kind.is_scalar() => other.merge(self),
            (Array, Array) => {
                let items = match (self.items, other.items) {
                    (Some(a), Some(b)) => a.merge(*b),
                    (Some(a), None) | (None, Some(a)) => *a,
                    (None, None) => Self::leaf(Null),
                };
                Self::array(items)
            }
            (Array, _) => {
                let items = match self.items {
                    Some(items) => items.merge(other),
                    None => other,
                };
                Self::array(items)
            }
            (_, Array) => other.merge(self),
            (a, b) => Self::leaf(a.unify(b)),
        }
    }
}

fn unify_option(a: Option<SchemaType>, b: Option<SchemaType>) -> Option<SchemaType> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.unify(b)),
        (a, b) => a.or(b),
    }
}

/// Infer the descriptor of one node with the default policy
pub fn infer(node: &Node) -> SchemaDescriptor {
    infer_with_policy(node, &SchemaPolicy::default())
}

pub fn infer_with_policy(node: &Node, policy: &SchemaPolicy) -> SchemaDescriptor {
    match node {
        Node::Scalar(value) => SchemaDescriptor::leaf(sniff(value)),
        Node::List(items) => {
            let item_schema = match policy.array_items {
                ArrayItemPolicy::FirstElement => items.first().map(|first| infer_with_policy(first, policy)),
                ArrayItemPolicy::Merged => merge_all(items, policy),
            };
            SchemaDescriptor::array(item_schema.unwrap_or_else(|| SchemaDescriptor::leaf(SchemaType::Null)))
        }
        Node::Object(object) => {
            let mut descriptor = SchemaDescriptor::object();
            for (name, value) in &object.attributes {
                descriptor.attributes.insert(name.clone(), sniff(value));
            }
            descriptor.text = object.text.as_deref().map(sniff);
            for (name, child) in &object.children {
                descriptor
                    .properties
                    .insert(name.clone(), infer_with_policy(child, policy));
            }
            descriptor
        }
    }
}

fn merge_all(nodes: &[Node], policy: &SchemaPolicy) -> Option<SchemaDescriptor> {
    nodes
        .iter()
        .map(|node| infer_with_policy(node, policy))
        .reduce(SchemaDescriptor::merge)
}

/// Inclusive bounds of a numeric field
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
}

impl NumericRange {
    fn include(range: Option<Self>, value: f64) -> Self {
        match range {
            Some(range) => Self {
                min: range.min.min(value),
                max: range.max.max(value),
            },
            None => Self {
                min: value,
                max: value,
            },
        }
    }
}

/// What multi-sample inference learned about one field path
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldSummary {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: SchemaType,
    /// Number of samples containing the field at least once
    pub presence: usize,
    /// Number of distinct literal values observed
    pub distinct: usize,
    /// Closed value set, in first-seen order, when the field is enumerable
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub enumeration: Option<Vec<String>>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub range: Option<NumericRange>,
}

impl FieldSummary {
    /// Returns true if the field has a closed value set
    pub fn is_enumerable(&self) -> bool {
        self.enumeration.is_some()
    }
}

/// Result of [`infer_schema`]
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchemaSummary {
    pub sample_count: usize,
    pub descriptor: SchemaDescriptor,
    pub fields: IndexMap<String, FieldSummary>,
    /// Field paths present in every sample
    pub required: Vec<String>,
    /// Field paths present in some but not all samples
    pub optional: Vec<String>,
}

impl SchemaSummary {
    /// Get the summary of one field path
    pub fn field(&self, path: &str) -> Option<&FieldSummary> {
        self.fields.get(path)
    }

    /// Returns true if the field was present in every sample
    pub fn is_required(&self, path: &str) -> bool {
        self.required.iter().any(|p| p == path)
    }

    /// Field paths that look like references to other records: the last
    /// segment, ignoring `@` and `[]`, is `id` or ends in `_id`
    pub fn references(&self) -> Vec<&str> {
        self.fields
            .keys()
            .map(String::as_str)
            .filter(|path| is_reference(path))
            .collect()
    }
}

fn is_reference(path: &str) -> bool {
    let last = path.rsplit('.').next().unwrap_or(path);
    let name = last.trim_end_matches("[]").trim_start_matches('@').to_ascii_lowercase();
    name == "id" || name.ends_with("_id")
}

#[derive(Default)]
struct Observed<'a> {
    kind: Option<SchemaType>,
    presence: usize,
    values: IndexMap<&'a str, usize>,
    range: Option<NumericRange>,
}

/// Multi-sample inference with the default policy
pub fn infer_schema(samples: &[Node]) -> SchemaSummary {
    infer_schema_with_policy(samples, &SchemaPolicy::default())
}

#[instrument(level = "debug", skip_all, fields(samples = samples.len()))]
pub fn infer_schema_with_policy(samples: &[Node], policy: &SchemaPolicy) -> SchemaSummary {
    let descriptor = match policy.array_items {
        ArrayItemPolicy::FirstElement => samples.first().map(|first| infer_with_policy(first, policy)),
        ArrayItemPolicy::Merged => merge_all(samples, policy),
    }
    .unwrap_or_else(|| SchemaDescriptor::leaf(SchemaType::Null));

    let mut observed: IndexMap<String, Observed<'_>> = IndexMap::new();
    for sample in samples {
        let mut seen = HashSet::new();
        for (path, value) in sample.scalar_leaves() {
            let kind = sniff(value);
            let entry = observed.entry(path.clone()).or_default();
            entry.kind = Some(entry.kind.map_or(kind, |k| k.unify(kind)));
            *entry.values.entry(value).or_insert(0) += 1;
            if kind.is_numeric() {
                if let Ok(number) = value.parse::<f64>() {
                    entry.range = Some(NumericRange::include(entry.range, number));
                }
            }
            if seen.insert(path) {
                entry.presence += 1;
            }
        }
    }

    let sample_count = samples.len();
    let mut fields = IndexMap::new();
    let mut required = Vec::new();
    let mut optional = Vec::new();
    for (path, obs) in observed {
        let kind = obs.kind.unwrap_or(SchemaType::String);
        let distinct = obs.values.len();
        let enumeration = (kind == SchemaType::String && policy.is_enumerable(distinct, sample_count))
            .then(|| obs.values.keys().map(|v| (*v).to_string()).collect());
        let range = if kind.is_numeric() { obs.range } else { None };

        if obs.presence == sample_count {
            required.push(path.clone());
        } else {
            optional.push(path.clone());
        }
        fields.insert(
            path,
            FieldSummary {
                kind,
                presence: obs.presence,
                distinct,
                enumeration,
                range,
            },
        );
    }

    debug!(
        fields = fields.len(),
        required = required.len(),
        optional = optional.len(),
        "inferred schema"
    );
    SchemaSummary {
        sample_count,
        descriptor,
        fields,
        required,
        optional,
    }
}
