//! Definition directories
//!
//! Reads the three directories every message builds on: data elements
//! (EDED), composite elements (EDCD) and segments (EDSD). Each directory is a
//! sequence of records separated by `-----` rules:
//!
//! ```text
//! ----------------------------------------------------------------------
//!
//!      1001  Document name code                                  [C]
//!
//!      Desc: Code specifying the document name.
//!
//!      Repr: an..3
//! ```
//!
//! Composites resolve their members against the data elements, and segments
//! resolve theirs against both, so the directories are read in that order.

use crate::shapes::{
    COMPOSITE_HEADER, COMPOSITE_MEMBER, COMPOSITE_MEMBER_TAIL, ELEMENT_HEADER, MemberLine,
    SEGMENT_HEADER, SEGMENT_MEMBER, SEGMENT_MEMBER_TAIL,
};
use crate::text::{LineCursor, decode, is_blank, is_record_separator};
use crate::{Error, ReferenceKind, Result};
use edi_grammar::{
    Component, ComponentDictionary, DataType, DictionaryBuilder, Field, FieldDictionary, Segment,
    SegmentGroup,
};
use tracing::{debug, info, trace, warn};

/// Tag of the root group holding every segment definition
pub const DEFINITION_MAP_TAG: &str = "DefinitionMap";

/// One record of a definition directory
struct Record<'a> {
    /// Line number of the header
    line: usize,
    header: &'a str,
    /// Lines between the header and the next separator
    body: Vec<&'a str>,
}

impl Record<'_> {
    fn line_of(&self, index: usize) -> usize {
        self.line + 1 + index
    }

    /// Text of a `Label: ...` block, continuation lines joined by spaces.
    /// Also returns the index of the first line after the block.
    fn block(&self, label: &str) -> Option<(String, usize)> {
        let start = self
            .body
            .iter()
            .position(|line| strip_change_bars(line).starts_with(label))?;

        let mut value = strip_change_bars(self.body[start])[label.len()..]
            .trim()
            .to_string();
        let mut end = start + 1;
        while end < self.body.len() && !is_blank(self.body[end]) {
            let continuation = strip_change_bars(self.body[end]);
            if !value.is_empty() {
                value.push(' ');
            }
            value.push_str(&continuation);
            end += 1;
        }
        Some((value, end))
    }
}

fn strip_change_bars(line: &str) -> String {
    line.replace('|', "").trim().to_string()
}

/// Records of a directory. The text before the first separator is preamble.
struct Records<'a> {
    cursor: LineCursor<'a>,
}

impl<'a> Records<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            cursor: LineCursor::new(text),
        }
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Record<'a>> {
        self.cursor.find(is_record_separator)?;
        let header = loop {
            let line = self.cursor.next_non_blank()?;
            if !is_record_separator(line) {
                break line;
            }
        };
        let line = self.cursor.line_number();

        let mut body = Vec::new();
        while let Some(next) = self.cursor.peek() {
            if is_record_separator(next) {
                break;
            }
            body.push(next);
            self.cursor.next_line();
        }
        Some(Record { line, header, body })
    }
}

/// Parse a representation such as `an..35` (up to 35) or `n3` (exactly 3)
fn parse_representation(repr: &str) -> Option<(DataType, usize, usize)> {
    let repr = repr.trim();
    let split = repr
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(repr.len());
    let (token, length) = repr.split_at(split);
    if token.is_empty() {
        return None;
    }
    let data_type = DataType::from_repr(token);

    match length.strip_prefix("..") {
        Some(max) => Some((data_type, 0, max.trim().parse().ok()?)),
        None => {
            let exact = length.trim().parse().ok()?;
            Some((data_type, exact, exact))
        }
    }
}

/// Read the data element directory (EDED)
pub fn read_components(text: &str) -> Result<ComponentDictionary> {
    let mut builder = DictionaryBuilder::new();

    for record in Records::new(text) {
        let header = ELEMENT_HEADER
            .first_match(record.header.trim_end())
            .ok_or_else(|| {
                Error::parse(
                    record.line,
                    format!(
                        "Unable to extract id and name for data element from line [{}]",
                        record.header
                    ),
                )
            })?;

        let documentation = record.block("Desc:").map(|(desc, _)| desc).unwrap_or_default();
        let (repr, end) = record.block("Repr:").ok_or_else(|| {
            Error::parse(
                record.line,
                format!("Data element {} has no representation", header.id),
            )
        })?;
        let (data_type, min_length, max_length) =
            parse_representation(&repr).ok_or_else(|| {
                Error::parse(
                    record.line_of(end - 1),
                    format!("Invalid representation '{}' for data element {}", repr, header.id),
                )
            })?;

        let mut component = Component::new(header.id.as_str(), header.name);
        component.documentation = documentation;
        component.data_type = data_type;
        component.min_length = min_length;
        component.max_length = max_length;

        trace!("Data element {} ({})", header.id, repr);
        builder.insert(header.id, component);
    }

    let components = builder.build();
    info!("Read {} data elements", components.len());
    Ok(components)
}

/// Read the composite element directory (EDCD)
pub fn read_fields(text: &str, components: &ComponentDictionary) -> Result<FieldDictionary> {
    let mut builder = DictionaryBuilder::new();

    for record in Records::new(text) {
        let header = COMPOSITE_HEADER
            .first_match(record.header.trim_end())
            .ok_or_else(|| {
                Error::parse(
                    record.line,
                    format!(
                        "Unable to extract id and name for composite element from line [{}]",
                        record.header
                    ),
                )
            })?;

        let (documentation, members_start) = record.block("Desc:").unwrap_or_default();

        let mut field = Field::new(header.id.as_str(), header.name);
        field.documentation = documentation;

        let body = &record.body;
        let mut index = members_start;
        while index < body.len() && is_blank(body[index]) {
            index += 1;
        }
        while index < body.len() && !is_blank(body[index]) {
            let line = body[index];
            index += 1;

            let (id, required) = match COMPOSITE_MEMBER.first_match(line) {
                Some(MemberLine::Whole { id, mandatory, .. }) => (id, mandatory),
                Some(MemberLine::Start { id, .. }) => {
                    match body.get(index).and_then(|next| COMPOSITE_MEMBER_TAIL.parse(next)) {
                        Some(tail) => {
                            index += 1;
                            (id, tail.mandatory)
                        }
                        None => {
                            warn!(
                                "No usage flag for member {} of composite {} (line {}), assuming conditional",
                                id,
                                header.id,
                                record.line_of(index - 1)
                            );
                            (id, false)
                        }
                    }
                }
                None => {
                    trace!("Skipping line in composite {}: {}", header.id, line);
                    continue;
                }
            };

            let component = components
                .get(&id)
                .ok_or_else(|| Error::unresolved(ReferenceKind::DataElement, id.as_str()))?;
            field.components.push(component.with_required(required));
        }

        debug!(
            "Composite {} with {} components",
            header.id,
            field.components.len()
        );
        builder.insert(header.id, field);
    }

    let fields = builder.build();
    info!("Read {} composite elements", fields.len());
    Ok(fields)
}

fn segment_field(
    id: &str,
    required: bool,
    fields: &FieldDictionary,
    components: &ComponentDictionary,
) -> Result<Field> {
    if id.starts_with('C') {
        fields
            .get(id)
            .map(|field| field.with_required(required))
            .ok_or_else(|| Error::unresolved(ReferenceKind::Composite, id))
    } else {
        components
            .get(id)
            .map(|component| Field::from_component(component, required))
            .ok_or_else(|| Error::unresolved(ReferenceKind::DataElement, id))
    }
}

/// Lines listing the components of a composite member, up to the next blank line
fn skip_composite_listing(body: &[&str], mut index: usize) -> usize {
    while index < body.len() {
        let line = body[index];
        index += 1;
        if is_blank(line) {
            break;
        }
    }
    index
}

/// Read the segment directory (EDSD). Segments are returned in document order.
pub fn read_segments(
    text: &str,
    fields: &FieldDictionary,
    components: &ComponentDictionary,
) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();

    for record in Records::new(text) {
        let header = SEGMENT_HEADER
            .first_match(record.header.trim_end())
            .ok_or_else(|| {
                Error::parse(
                    record.line,
                    format!(
                        "Unable to extract segment code and name for segment from line [{}]",
                        record.header
                    ),
                )
            })?;

        let (documentation, members_start) = record.block("Function:").unwrap_or_default();

        let mut segment = Segment::new(header.id.as_str(), header.name);
        segment.documentation = documentation;

        let body = &record.body;
        let mut index = members_start;
        while index < body.len() {
            let line = body[index];
            index += 1;

            match SEGMENT_MEMBER.first_match(line) {
                Some(MemberLine::Whole { id, mandatory, .. }) => {
                    segment
                        .fields
                        .push(segment_field(&id, mandatory, fields, components)?);
                    if id.starts_with('C') {
                        index = skip_composite_listing(body, index);
                    }
                }
                Some(MemberLine::Start { id, .. }) => {
                    match body.get(index).and_then(|next| SEGMENT_MEMBER_TAIL.parse(next)) {
                        Some(tail) => {
                            index += 1;
                            segment
                                .fields
                                .push(segment_field(&id, tail.mandatory, fields, components)?);
                            if id.starts_with('C') {
                                index = skip_composite_listing(body, index);
                            }
                        }
                        None => warn!(
                            "No usage flag for element {} of segment {} (line {}), skipped",
                            id,
                            header.id,
                            record.line_of(index - 1)
                        ),
                    }
                }
                None => {}
            }
        }

        debug!("Segment {} with {} fields", header.id, segment.fields.len());
        segments.push(segment);
    }

    info!("Read {} segments", segments.len());
    Ok(segments)
}

/// The content of the three definition directories of one release
#[derive(Debug, Clone)]
pub struct Definitions {
    pub components: ComponentDictionary,
    pub fields: FieldDictionary,
    pub segments: Vec<Segment>,
}

impl Definitions {
    /// Read the data element, composite and segment directories, in that order
    pub fn read(data_elements: &str, composites: &str, segments: &str) -> Result<Self> {
        let components = read_components(data_elements)?;
        let fields = read_fields(composites, &components)?;
        let segments = read_segments(segments, &fields, &components)?;
        Ok(Self {
            components,
            fields,
            segments,
        })
    }

    /// Read the directories from their raw published bytes
    pub fn from_bytes(data_elements: &[u8], composites: &[u8], segments: &[u8]) -> Result<Self> {
        Self::read(
            &decode(data_elements),
            &decode(composites),
            &decode(segments),
        )
    }

    /// All segment definitions under a single `DefinitionMap` root.
    ///
    /// With `use_short_name` the segment tags are the segment codes.
    pub fn segment_group(&self, use_short_name: bool) -> SegmentGroup {
        let mut root = SegmentGroup::new(DEFINITION_MAP_TAG);
        for segment in &self.segments {
            let mut segment = segment.clone();
            if use_short_name {
                segment.xmltag = segment.segcode.clone();
            }
            root.push(segment);
        }
        root
    }
}
