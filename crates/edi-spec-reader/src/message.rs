//! Message documents (EDMD)
//!
//! A message document opens with a `UN/EDIFACT` banner and labelled header
//! values, describes every segment and group position in its message
//! definition section, and ends with the segment table giving the nesting
//! and repetition of each position:
//!
//! ```text
//! Pos    Tag Name                                      S   R
//!
//! 0010   UNH Message header                            M   1
//! 0020   BGM Beginning of message                      M   1
//! 0030       ---- Segment group 1  ------------------ C   99---------------+
//! 0040   RFF Reference                                 M   1                |
//! 0050   DTM Date/time/period                          C   5----------------+
//! ```
//!
//! The `+` marks at the end of a group's last segment close that group and,
//! when there are several, the enclosing groups too.

use crate::shapes::{
    CONTROLLING_AGENCY, DEFINITION_ITEM, MESSAGE_RELEASE, MESSAGE_TYPE, MESSAGE_VERSION,
    SEGMENT_TABLE_LINE, SEGMENT_TABLE_TAIL, Shape, TableLine, is_definition_end,
    is_message_definition, is_segment_table, is_segment_table_header, is_un_edifact_banner,
};
use crate::text::{LineCursor, decode, is_blank};
use crate::{Error, ReferenceKind, Result};
use edi_grammar::envelope::NAMESPACE_ROOT;
use edi_grammar::{Description, Edimap, Import, Segment, SegmentDictionary, SegmentGroup};
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// Service segments listed in segment tables but defined by the syntax rules
pub const IGNORED_SEGMENTS: [&str; 7] = ["UNA", "UNB", "UNG", "UNH", "UNT", "UNZ", "UNE"];

/// Labelled values from the top of a message document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    /// `INVOIC`
    pub message_type: String,
    /// `D`
    pub version: String,
    /// `08A`
    pub release: String,
    /// `UN`
    pub agency: String,
}

impl MessageHeader {
    /// `D:08A:UN`
    pub fn version_string(&self) -> String {
        format!("{}:{}:{}", self.version, self.release, self.agency)
    }

    /// `urn:org.milyn.edi.unedifact:un:d08a:invoic`
    pub fn namespace(&self) -> String {
        format!(
            "{}:{}:{}{}:{}",
            NAMESPACE_ROOT,
            self.agency.to_lowercase(),
            self.version.to_lowercase(),
            self.release.to_lowercase(),
            self.message_type.to_lowercase()
        )
    }
}

/// A parsed message document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: MessageHeader,
    pub edimap: Edimap,
}

/// Where segment usages get their fields from
#[derive(Debug, Clone)]
pub enum SegmentSource<'a> {
    /// Copy the fields of each segment from its definition
    Dictionary(&'a SegmentDictionary),
    /// Leave fields out and reference the definitions grammar by import
    Import { definitions_name: String },
}

/// Reads message documents into grammars
#[derive(Debug, Clone)]
pub struct MessageReader<'a> {
    source: SegmentSource<'a>,
    use_short_name: bool,
}

impl<'a> MessageReader<'a> {
    /// Inline segment fields from `segments`
    pub fn with_dictionary(segments: &'a SegmentDictionary) -> Self {
        Self {
            source: SegmentSource::Dictionary(segments),
            use_short_name: true,
        }
    }

    /// Reference the definitions grammar named `definitions_name` instead of
    /// inlining segment fields
    pub fn with_import(definitions_name: impl Into<String>) -> Self {
        Self {
            source: SegmentSource::Import {
                definitions_name: definitions_name.into(),
            },
            use_short_name: true,
        }
    }

    pub fn use_short_name(mut self, use_short_name: bool) -> Self {
        self.use_short_name = use_short_name;
        self
    }

    /// Read a message document from its raw published bytes
    pub fn read_bytes(&self, bytes: &[u8]) -> Result<Message> {
        self.read(&decode(bytes))
    }

    /// Read a message document
    pub fn read(&self, text: &str) -> Result<Message> {
        let mut cursor = LineCursor::new(text);

        if cursor.find(is_un_edifact_banner).is_none() {
            return Err(Error::NotAMessage(
                "no UN/EDIFACT banner line found".to_string(),
            ));
        }

        let header = MessageHeader {
            message_type: labelled_value(&mut cursor, &MESSAGE_TYPE, "Message Type")?,
            version: labelled_value(&mut cursor, &MESSAGE_VERSION, "Version")?,
            release: labelled_value(&mut cursor, &MESSAGE_RELEASE, "Release")?,
            agency: labelled_value(&mut cursor, &CONTROLLING_AGENCY, "Contr. Agency")?,
        };
        debug!(
            "Reading message {} ({})",
            header.message_type,
            header.version_string()
        );

        let documentation = read_definition_section(&mut cursor)?;

        if cursor.find(is_segment_table).is_none() {
            return Err(Error::MissingSection("Segment table".to_string()));
        }
        if cursor.find(is_segment_table_header).is_none() {
            return Err(Error::MissingSection("Segment table header".to_string()));
        }

        let table = SegmentTable {
            source: &self.source,
            use_short_name: self.use_short_name,
            agency: &header.agency,
            documentation: &documentation,
        };
        let mut ids = LineIds::default();
        let (root, end) = table.read_group(
            &mut cursor,
            &mut ids,
            SegmentGroup::new(header.message_type.as_str()),
        )?;
        if let BodyEnd::Closed(_) = end {
            return Err(Error::parse(
                cursor.line_number(),
                "segment group end outside of any segment group",
            ));
        }

        let description = Description::new(header.message_type.as_str(), header.version_string())
            .with_namespace(header.namespace());
        let mut edimap = Edimap::new(description, root);
        if let SegmentSource::Import { definitions_name } = &self.source {
            edimap.imports.push(Import {
                namespace: header.agency.clone(),
                resource: format!("{}.yaml", definitions_name),
            });
        }

        debug!(
            "Message {} has {} segments",
            header.message_type,
            edimap.segments.all_segments().len()
        );
        Ok(Message { header, edimap })
    }
}

fn labelled_value(
    cursor: &mut LineCursor<'_>,
    shape: &Shape<String>,
    label: &str,
) -> Result<String> {
    while let Some(line) = cursor.next_line() {
        if let Some(value) = shape.parse(line) {
            return Ok(value);
        }
    }
    Err(Error::MissingSection(label.to_string()))
}

/// Sequential ids for positions listed without one. Older releases number
/// neither the definition section nor the segment table.
#[derive(Debug, Default)]
struct LineIds {
    next: usize,
}

impl LineIds {
    fn resolve(&mut self, explicit: Option<&str>) -> String {
        match explicit {
            Some(id) => id.to_string(),
            None => {
                let id = self.next;
                self.next += 1;
                id.to_string()
            }
        }
    }
}

/// Definition text of every position, keyed by position id
fn read_definition_section(cursor: &mut LineCursor<'_>) -> Result<HashMap<String, String>> {
    // the first occurrence is the table of contents
    for _ in 0..2 {
        if cursor.find(is_message_definition).is_none() {
            return Err(Error::MissingSection("MESSAGE DEFINITION".to_string()));
        }
    }

    let mut documentation = HashMap::new();
    let mut ids = LineIds::default();

    let mut item = loop {
        let line = cursor
            .next_line()
            .ok_or_else(|| Error::MissingSection("end of message definition".to_string()))?;
        if is_definition_end(line) {
            warn!("Message definition section has no entries");
            return Ok(documentation);
        }
        if let Some(item) = DEFINITION_ITEM.parse(line) {
            break item;
        }
    };

    loop {
        let id = ids.resolve(item.id.as_deref());
        let mut text: Vec<&str> = Vec::new();
        let next = loop {
            let line = cursor
                .next_line()
                .ok_or_else(|| Error::MissingSection("end of message definition".to_string()))?;
            if let Some(next) = DEFINITION_ITEM.parse(line) {
                break Some(next);
            }
            if is_definition_end(line) {
                break None;
            }
            let line = line.trim();
            if !line.is_empty() {
                text.push(line);
            }
        };

        trace!("Definition {} ({})", id, item.label);
        documentation.insert(id, text.join("\n"));

        match next {
            Some(next) => item = next,
            None => break,
        }
    }

    Ok(documentation)
}

/// How the body of a segment group ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyEnd {
    /// The group was closed; this many enclosing groups close along with it
    Closed(usize),
    /// Informative annex or end of document
    Finished,
}

struct SegmentTable<'r> {
    source: &'r SegmentSource<'r>,
    use_short_name: bool,
    agency: &'r str,
    documentation: &'r HashMap<String, String>,
}

impl SegmentTable<'_> {
    /// Read segment table lines into `group` until the group is closed or the
    /// table ends. Lines with no known shape are skipped.
    fn read_group(
        &self,
        cursor: &mut LineCursor<'_>,
        ids: &mut LineIds,
        mut group: SegmentGroup,
    ) -> Result<(SegmentGroup, BodyEnd)> {
        while let Some(line) = cursor.next_line() {
            let Some(shape) = SEGMENT_TABLE_LINE.first_match(line) else {
                if !is_blank(line) {
                    trace!("Ignoring segment table line {}: {}", cursor.line_number(), line);
                }
                continue;
            };

            match shape {
                TableLine::GroupStart(start) => {
                    let id = ids.resolve(start.id.as_deref());
                    let mut child = SegmentGroup::new(start.name.as_str());
                    child.documentation = self.documentation(&id);
                    child.min_occurs = u32::from(start.mandatory);
                    child.max_occurs =
                        parse_occurs(&start.max_occurs, cursor.line_number())?.max(child.min_occurs);

                    let (child, end) = self.read_group(cursor, ids, child)?;
                    group.push(child);
                    match end {
                        BodyEnd::Closed(0) => {}
                        BodyEnd::Closed(levels) => return Ok((group, BodyEnd::Closed(levels - 1))),
                        BodyEnd::Finished => return Ok((group, BodyEnd::Finished)),
                    }
                }
                TableLine::GroupEnd { segment, closes } => {
                    let id = ids.resolve(segment.id.as_deref());
                    if let Some(usage) = self.usage(
                        &id,
                        &segment.segcode,
                        &segment.name,
                        segment.mandatory,
                        &segment.max_occurs,
                        cursor.line_number(),
                    )? {
                        group.push(usage);
                    }
                    return Ok((group, BodyEnd::Closed(closes - 1)));
                }
                TableLine::Segment(segment) => {
                    let id = ids.resolve(segment.id.as_deref());
                    if let Some(usage) = self.usage(
                        &id,
                        &segment.segcode,
                        &segment.name,
                        segment.mandatory,
                        &segment.max_occurs,
                        cursor.line_number(),
                    )? {
                        group.push(usage);
                    }
                }
                TableLine::SegmentStart { id, segcode, name } => {
                    let id = ids.resolve(id.as_deref());
                    let tail = cursor
                        .next_line()
                        .and_then(|next| SEGMENT_TABLE_TAIL.first_match(next))
                        .ok_or_else(|| {
                            Error::parse(
                                cursor.line_number(),
                                format!("no usage and repetition for segment {}", segcode),
                            )
                        })?;
                    let name = format!("{} {}", name, tail.name);
                    if let Some(usage) = self.usage(
                        &id,
                        &segcode,
                        &name,
                        tail.mandatory,
                        &tail.max_occurs,
                        cursor.line_number(),
                    )? {
                        group.push(usage);
                    }
                    if tail.closes > 0 {
                        return Ok((group, BodyEnd::Closed(tail.closes - 1)));
                    }
                }
                TableLine::Annex => return Ok((group, BodyEnd::Finished)),
            }
        }
        Ok((group, BodyEnd::Finished))
    }

    /// Segment usage for a table line; `None` for envelope segments
    fn usage(
        &self,
        id: &str,
        segcode: &str,
        name: &str,
        mandatory: bool,
        max_occurs: &str,
        line: usize,
    ) -> Result<Option<Segment>> {
        if IGNORED_SEGMENTS.contains(&segcode) {
            trace!("Skipping service segment {}", segcode);
            return Ok(None);
        }

        let mut segment = Segment::new(segcode, name.trim());
        segment.node_type_ref = Some(format!("{}:{}", self.agency, segcode));
        if let SegmentSource::Dictionary(dictionary) = self.source {
            let definition = dictionary
                .get(segcode)
                .ok_or_else(|| Error::unresolved(ReferenceKind::Segment, segcode))?;
            segment.fields = definition.fields.clone();
        }
        if self.use_short_name {
            segment.xmltag = segcode.to_string();
        }
        segment.documentation = self.documentation(id);
        segment.min_occurs = u32::from(mandatory);
        segment.max_occurs = parse_occurs(max_occurs, line)?.max(segment.min_occurs);
        Ok(Some(segment))
    }

    fn documentation(&self, id: &str) -> String {
        match self.documentation.get(id) {
            Some(text) => text.clone(),
            None => {
                warn!("No message definition text for position {}", id);
                String::new()
            }
        }
    }
}

fn parse_occurs(raw: &str, line: usize) -> Result<u32> {
    raw.parse()
        .map_err(|_| Error::parse(line, format!("invalid repetition '{}'", raw)))
}
