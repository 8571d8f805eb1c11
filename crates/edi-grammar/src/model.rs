//! Grammar model definitions

use crate::delimiters::Delimiters;
use crate::encoder::encode_tag;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Separator inserted between a duplicated structural tag and its index
pub const INDEXED_NODE_SEPARATOR: char = '_';

fn default_truncatable() -> bool {
    true
}

fn default_max_occurs() -> u32 {
    1
}

/// Value type of a data element
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Numeric (`n`)
    Numeric,
    /// Character data (`an`, `a`)
    #[default]
    Alphanumeric,
}

impl DataType {
    /// Map a representation type token (`n`, `an`, `a`) to a data type
    pub fn from_repr(token: &str) -> Self {
        if token.trim().eq_ignore_ascii_case("n") {
            Self::Numeric
        } else {
            Self::Alphanumeric
        }
    }
}

/// A data element (the smallest typed, length-bounded value)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Four digit data element code (empty for envelope components)
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub xmltag: String,
    #[serde(default)]
    pub documentation: String,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default)]
    pub min_length: usize,
    #[serde(default)]
    pub max_length: usize,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_truncatable")]
    pub truncatable: bool,
}

impl Component {
    /// Create a component whose structural tag is derived from its name
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            xmltag: encode_tag(&name),
            name,
            documentation: String::new(),
            data_type: DataType::default(),
            min_length: 0,
            max_length: 0,
            required: false,
            truncatable: true,
        }
    }

    /// Copy of this definition with the usage flag of a specific composite
    pub fn with_required(&self, required: bool) -> Self {
        Self {
            required,
            ..self.clone()
        }
    }
}

/// A composite element, or a single data element used directly as a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Composite code (`C001`) or data element code (`3164`)
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub xmltag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub documentation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
    /// Only set when the field is a single data element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
    #[serde(default)]
    pub min_length: usize,
    #[serde(default)]
    pub max_length: usize,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_truncatable")]
    pub truncatable: bool,
}

impl Field {
    /// Create an empty composite whose structural tag is derived from its name
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            xmltag: encode_tag(&name),
            name,
            namespace: None,
            documentation: String::new(),
            components: Vec::new(),
            data_type: None,
            min_length: 0,
            max_length: 0,
            required: false,
            truncatable: true,
        }
    }

    /// Field referencing a data element directly rather than through a composite
    pub fn from_component(component: &Component, required: bool) -> Self {
        Self {
            id: component.id.clone(),
            name: component.name.clone(),
            xmltag: component.xmltag.clone(),
            namespace: None,
            documentation: component.documentation.clone(),
            components: Vec::new(),
            data_type: Some(component.data_type),
            min_length: component.min_length,
            max_length: component.max_length,
            required,
            truncatable: true,
        }
    }

    /// Copy of this definition with the usage flag of a specific segment
    pub fn with_required(&self, required: bool) -> Self {
        Self {
            required,
            ..self.clone()
        }
    }

    /// Whether the field is made of components
    pub fn is_composite(&self) -> bool {
        !self.components.is_empty()
    }
}

/// A segment, either as a dictionary definition or as a usage inside a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub segcode: String,
    #[serde(default)]
    pub name: String,
    pub xmltag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub documentation: String,
    /// `<agency>:<segcode>` for message usages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type_ref: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub min_occurs: u32,
    #[serde(default = "default_max_occurs")]
    pub max_occurs: u32,
    #[serde(default = "default_truncatable")]
    pub truncatable: bool,
}

impl Segment {
    pub fn new(segcode: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            segcode: segcode.into(),
            xmltag: encode_tag(&name),
            name,
            namespace: None,
            documentation: String::new(),
            node_type_ref: None,
            fields: Vec::new(),
            min_occurs: 0,
            max_occurs: 1,
            truncatable: true,
        }
    }

    /// Append a field, builder style
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }
}

/// A child of a segment group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentNode {
    Segment(Segment),
    Group(SegmentGroup),
}

impl SegmentNode {
    /// Structural tag of the wrapped segment or group
    pub fn xmltag(&self) -> &str {
        match self {
            SegmentNode::Segment(segment) => &segment.xmltag,
            SegmentNode::Group(group) => &group.xmltag,
        }
    }

    fn set_xmltag(&mut self, xmltag: String) {
        match self {
            SegmentNode::Segment(segment) => segment.xmltag = xmltag,
            SegmentNode::Group(group) => group.xmltag = xmltag,
        }
    }

    pub fn as_segment(&self) -> Option<&Segment> {
        match self {
            SegmentNode::Segment(segment) => Some(segment),
            SegmentNode::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&SegmentGroup> {
        match self {
            SegmentNode::Group(group) => Some(group),
            SegmentNode::Segment(_) => None,
        }
    }
}

impl From<Segment> for SegmentNode {
    fn from(segment: Segment) -> Self {
        SegmentNode::Segment(segment)
    }
}

impl From<SegmentGroup> for SegmentNode {
    fn from(group: SegmentGroup) -> Self {
        SegmentNode::Group(group)
    }
}

/// A repeatable grouping of segments and nested groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentGroup {
    #[serde(default)]
    pub name: String,
    pub xmltag: String,
    #[serde(default)]
    pub documentation: String,
    #[serde(default)]
    pub min_occurs: u32,
    #[serde(default = "default_max_occurs")]
    pub max_occurs: u32,
    #[serde(default)]
    pub children: Vec<SegmentNode>,
}

impl SegmentGroup {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            xmltag: encode_tag(&name),
            name,
            documentation: String::new(),
            min_occurs: 0,
            max_occurs: 1,
            children: Vec::new(),
        }
    }

    pub fn push(&mut self, node: impl Into<SegmentNode>) {
        self.children.push(node.into());
    }

    /// Direct segment children, skipping nested groups
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.children.iter().filter_map(SegmentNode::as_segment)
    }

    /// Direct group children
    pub fn groups(&self) -> impl Iterator<Item = &SegmentGroup> {
        self.children.iter().filter_map(SegmentNode::as_group)
    }

    /// Every segment in the subtree, depth first in document order
    pub fn all_segments(&self) -> Vec<&Segment> {
        let mut segments = Vec::new();
        self.collect_segments(&mut segments);
        segments
    }

    fn collect_segments<'a>(&'a self, out: &mut Vec<&'a Segment>) {
        for child in &self.children {
            match child {
                SegmentNode::Segment(segment) => out.push(segment),
                SegmentNode::Group(group) => group.collect_segments(out),
            }
        }
    }

    /// Every group in the subtree (excluding `self`), depth first
    pub fn all_groups(&self) -> Vec<&SegmentGroup> {
        let mut groups = Vec::new();
        for group in self.groups() {
            groups.push(group);
            groups.extend(group.all_groups());
        }
        groups
    }

    /// Number the structural tags of siblings that share a tag (`DTM_1`, `DTM_2`),
    /// recursing into segment fields, field components and nested groups.
    pub fn disambiguate_tags(&mut self) {
        let mut tags: Vec<String> = self.children.iter().map(|n| n.xmltag().to_string()).collect();
        number_duplicates(&mut tags);
        for (child, tag) in self.children.iter_mut().zip(tags) {
            child.set_xmltag(tag);
        }

        for child in &mut self.children {
            match child {
                SegmentNode::Segment(segment) => disambiguate_fields(&mut segment.fields),
                SegmentNode::Group(group) => group.disambiguate_tags(),
            }
        }
    }
}

fn disambiguate_fields(fields: &mut [Field]) {
    let mut tags: Vec<String> = fields.iter().map(|f| f.xmltag.clone()).collect();
    number_duplicates(&mut tags);
    for (field, tag) in fields.iter_mut().zip(tags) {
        field.xmltag = tag;

        let mut component_tags: Vec<String> =
            field.components.iter().map(|c| c.xmltag.clone()).collect();
        number_duplicates(&mut component_tags);
        for (component, tag) in field.components.iter_mut().zip(component_tags) {
            component.xmltag = tag;
        }
    }
}

fn number_duplicates(tags: &mut [String]) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for tag in tags.iter() {
        *counts.entry(tag.clone()).or_default() += 1;
    }

    let mut seen: HashMap<String, usize> = HashMap::new();
    for tag in tags.iter_mut() {
        if counts.get(tag.as_str()).copied().unwrap_or(0) > 1 {
            let index = seen.entry(tag.clone()).or_default();
            *index += 1;
            *tag = format!("{}{}{}", tag, INDEXED_NODE_SEPARATOR, index);
        }
    }
}

/// Identification of a grammar
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl Description {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            namespace: None,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// Reference to a companion grammar supplying segment definitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    pub namespace: String,
    pub resource: String,
}

/// A complete grammar: one per message, or the shared definitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edimap {
    pub description: Description,
    #[serde(default)]
    pub delimiters: Delimiters,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<Import>,
    pub segments: SegmentGroup,
}

impl Edimap {
    pub fn new(description: Description, segments: SegmentGroup) -> Self {
        Self {
            description,
            delimiters: Delimiters::default(),
            imports: Vec::new(),
            segments,
        }
    }

    pub fn name(&self) -> &str {
        &self.description.name
    }

    /// Find a top level segment by code
    pub fn segment(&self, segcode: &str) -> Option<&Segment> {
        self.segments.segments().find(|s| s.segcode == segcode)
    }
}
