//! Line-shape detection
//!
//! Every layout the directory documents use is described by a [`Shape`]: a
//! full-line pattern plus a function turning its captures into a typed match.
//! Where a line can take several layouts, the alternatives are kept in an
//! ordered [`Shapes`] table and the first one that matches wins. Supporting a
//! new layout variant means adding a row to a table.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::trace;

type Extract<T> = fn(&Captures<'_>) -> Option<T>;

/// A named line layout
pub struct Shape<T> {
    name: &'static str,
    regex: Regex,
    extract: Extract<T>,
}

impl<T> Shape<T> {
    /// Build a shape; `pattern` must match the whole line.
    fn new(name: &'static str, pattern: &str, extract: Extract<T>) -> Self {
        Self {
            name,
            regex: full_line(pattern),
            extract,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Typed match of `line`, if it has this shape
    pub fn parse(&self, line: &str) -> Option<T> {
        self.regex.captures(line).and_then(|c| (self.extract)(&c))
    }
}

/// Alternative layouts for the same kind of line, tried in order
pub struct Shapes<T> {
    shapes: Vec<Shape<T>>,
}

impl<T> Shapes<T> {
    fn from_table(table: &[(&'static str, &str, Extract<T>)]) -> Self {
        Self {
            shapes: table
                .iter()
                .map(|&(name, pattern, extract)| Shape::new(name, pattern, extract))
                .collect(),
        }
    }

    /// Match of the first shape accepting `line`
    pub fn first_match(&self, line: &str) -> Option<T> {
        self.shapes.iter().find_map(|shape| {
            let parsed = shape.parse(line);
            if parsed.is_some() {
                trace!(shape = shape.name, "{}", line);
            }
            parsed
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.shapes.iter().map(|s| s.name)
    }
}

fn full_line(pattern: &str) -> Regex {
    Regex::new(&format!("^(?:{})$", pattern))
        .unwrap_or_else(|e| panic!("invalid line shape /{}/: {}", pattern, e))
}

fn text(captures: &Captures<'_>, group: usize) -> String {
    captures
        .get(group)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

fn non_empty(captures: &Captures<'_>, group: usize) -> Option<String> {
    Some(text(captures, group)).filter(|s| !s.is_empty())
}

fn is_mandatory(captures: &Captures<'_>, group: usize) -> bool {
    text(captures, group).eq_ignore_ascii_case("M")
}

// --- Definition directories ---

/// Id and name from the first line of a directory record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub id: String,
    pub name: String,
}

/// A member line of a composite or segment record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberLine {
    /// Everything on one line
    Whole {
        id: String,
        name: String,
        mandatory: bool,
    },
    /// The name wraps; the usage flag is on the next line
    Start { id: String, name: String },
}

impl MemberLine {
    pub fn id(&self) -> &str {
        match self {
            MemberLine::Whole { id, .. } | MemberLine::Start { id, .. } => id,
        }
    }
}

/// Continuation of a wrapped member line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberTail {
    pub name: String,
    pub mandatory: bool,
}

fn header(c: &Captures<'_>) -> Option<Header> {
    Some(Header {
        id: text(c, 1),
        name: text(c, 2),
    })
}

fn whole_member(c: &Captures<'_>) -> Option<MemberLine> {
    Some(MemberLine::Whole {
        id: text(c, 2),
        name: text(c, 3),
        mandatory: is_mandatory(c, 4),
    })
}

fn member_start(c: &Captures<'_>) -> Option<MemberLine> {
    Some(MemberLine::Start {
        id: text(c, 2),
        name: text(c, 3),
    })
}

fn member_tail(c: &Captures<'_>) -> Option<MemberTail> {
    Some(MemberTail {
        name: text(c, 1),
        mandatory: is_mandatory(c, 2),
    })
}

/// `1000  Document name   [C]`, or without the usage marker in older releases
pub static ELEMENT_HEADER: Lazy<Shapes<Header>> = Lazy::new(|| {
    Shapes::from_table(&[
        ("element_header", r"[SX|+*# -]*(\w{4}) *(.*) *\[(\w)\] *", header),
        ("element_header_legacy", r"[SX|+*# -]*(\w{4}) *(.*)", header),
    ])
});

/// `C001 TRANSPORT MEANS`
pub static COMPOSITE_HEADER: Lazy<Shapes<Header>> = Lazy::new(|| {
    Shapes::from_table(&[("composite_header", r"[SX|+*# -]*(\w{4}) *(.*)", header)])
});

/// `BGM  BEGINNING OF MESSAGE`
pub static SEGMENT_HEADER: Lazy<Shapes<Header>> = Lazy::new(|| {
    Shapes::from_table(&[("segment_header", r"[SX|+*# -]*(\w{3}) *(.*)", header)])
});

/// `010    8179  Transport means description code     C      an..8`
pub static COMPOSITE_MEMBER: Lazy<Shapes<MemberLine>> = Lazy::new(|| {
    Shapes::from_table(&[
        (
            "data_element",
            r" *(\d{3})*[SX|+*# -]*(\d{4}) *(.*) *.*(C|M) *(an|n|a)(\.*)(\d*)",
            whole_member,
        ),
        (
            "data_element_start",
            r" *(\d{3})*[SX|+*# -]*(\d{4}) *(.*) *",
            member_start,
        ),
    ])
});

pub static COMPOSITE_MEMBER_TAIL: Lazy<Shape<MemberTail>> = Lazy::new(|| {
    Shape::new(
        "data_element_end",
        r" *(.*) *.*(C|M) *(an|n|a)(\.*)(\d*)",
        member_tail,
    )
});

/// `010    C002 DOCUMENT/MESSAGE NAME     C    1`
pub static SEGMENT_MEMBER: Lazy<Shapes<MemberLine>> = Lazy::new(|| {
    Shapes::from_table(&[
        (
            "segment_element",
            r" *\** *(\d{3})*[SX|+*# -]*(\d{4}|C\d{3}) *(.*) *( C| M).*",
            whole_member,
        ),
        (
            "segment_element_start",
            r" *(\d{3})*[SX|+*# -]*(\d{4}|C\d{3}) *(.*)",
            member_start,
        ),
    ])
});

pub static SEGMENT_MEMBER_TAIL: Lazy<Shape<MemberTail>> =
    Lazy::new(|| Shape::new("segment_element_end", r"(.*) *( C| M).*", member_tail));

// --- Message documents ---

static UN_EDIFACT_BANNER: Lazy<Regex> = Lazy::new(|| full_line(r"\s*UN/EDIFACT\s*"));
static MESSAGE_DEFINITION: Lazy<Regex> = Lazy::new(|| full_line(r"[\d. ]*MESSAGE DEFINITION *"));
static DEFINITION_END: Lazy<Regex> = Lazy::new(|| {
    full_line(r"([\d.]* *(Data)? *[Ss]egment [Ii]ndex.*)|( *[\d.]+ *[Mm]essage [Ss]tructure.*)")
});
static SEGMENT_TABLE: Lazy<Regex> = Lazy::new(|| full_line(r"[\d. ]*[Ss]egment [Tt]able *"));
static SEGMENT_TABLE_HEADER: Lazy<Regex> = Lazy::new(|| {
    full_line(r"(Pos *Tag *Name *S *R.*)|( *TAG *NAME *S *REPT *S *REPT)|( *POS *TAG *NAME *S *R *)")
});

/// The `UN/EDIFACT` banner opening every message document
pub fn is_un_edifact_banner(line: &str) -> bool {
    UN_EDIFACT_BANNER.is_match(line)
}

/// `4.  MESSAGE DEFINITION`, in any letter case
pub fn is_message_definition(line: &str) -> bool {
    MESSAGE_DEFINITION.is_match(&line.to_uppercase())
}

/// The segment index or message structure heading closing the definition section
pub fn is_definition_end(line: &str) -> bool {
    DEFINITION_END.is_match(line)
}

pub fn is_segment_table(line: &str) -> bool {
    SEGMENT_TABLE.is_match(line)
}

/// Column header of the segment table (`Pos Tag Name S R`)
pub fn is_segment_table_header(line: &str) -> bool {
    SEGMENT_TABLE_HEADER.is_match(line)
}

fn first_word(c: &Captures<'_>) -> Option<String> {
    Some(text(c, 1))
}

/// `Message Type : INVOIC`
pub static MESSAGE_TYPE: Lazy<Shape<String>> =
    Lazy::new(|| Shape::new("message_type", r".*Message Type *: *(\w*) *", first_word));

pub static MESSAGE_VERSION: Lazy<Shape<String>> =
    Lazy::new(|| Shape::new("message_version", r".*Version *: *(\w*) *", first_word));

pub static MESSAGE_RELEASE: Lazy<Shape<String>> =
    Lazy::new(|| Shape::new("message_release", r".*Release *: *(\w*) *", first_word));

pub static CONTROLLING_AGENCY: Lazy<Shape<String>> =
    Lazy::new(|| Shape::new("controlling_agency", r".*Contr. Agency *: *(\w*) *", first_word));

/// Heading of one entry in the definition section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionItem {
    /// Four digit position, absent in older releases
    pub id: Option<String>,
    /// `UNH,` or `Segment group 1:`
    pub label: String,
    pub title: String,
}

fn definition_item(c: &Captures<'_>) -> Option<DefinitionItem> {
    Some(DefinitionItem {
        id: non_empty(c, 1),
        label: text(c, 2),
        title: text(c, 4),
    })
}

/// `0010   UNH, Message header` or `0070   Segment group 1:  RFF-DTM`
pub static DEFINITION_ITEM: Lazy<Shape<DefinitionItem>> = Lazy::new(|| {
    Shape::new(
        "definition_item",
        r"(\d{4} *| *)[- *+|X]*(([A-Z]{3}),|[Ss]egment [Gg]roup \d*:)+(.*)",
        definition_item,
    )
});

/// A segment usage in the segment table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentLine {
    pub id: Option<String>,
    pub segcode: String,
    pub name: String,
    pub mandatory: bool,
    /// Raw repetition column
    pub max_occurs: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupLine {
    pub id: Option<String>,
    pub name: String,
    pub mandatory: bool,
    pub max_occurs: String,
}

/// Classification of a segment table line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableLine {
    /// Opens a nested segment group
    GroupStart(GroupLine),
    /// Last segment of one or more groups; `closes` counts the `+` marks
    GroupEnd { segment: SegmentLine, closes: usize },
    Segment(SegmentLine),
    /// A segment whose name wraps onto the next line
    SegmentStart {
        id: Option<String>,
        segcode: String,
        name: String,
    },
    /// Start of the informative annex; the table ends here
    Annex,
}

/// Second line of a wrapped segment usage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentTail {
    pub name: String,
    pub mandatory: bool,
    pub max_occurs: String,
    /// Groups closed by the usage, as in [`TableLine::GroupEnd`]
    pub closes: usize,
}

fn group_start(c: &Captures<'_>) -> Option<TableLine> {
    Some(TableLine::GroupStart(GroupLine {
        id: non_empty(c, 1),
        name: text(c, 2),
        mandatory: is_mandatory(c, 3),
        max_occurs: text(c, 4),
    }))
}

fn segment_line(c: &Captures<'_>) -> SegmentLine {
    SegmentLine {
        id: non_empty(c, 1),
        segcode: text(c, 2),
        name: text(c, 3),
        mandatory: is_mandatory(c, 4),
        max_occurs: text(c, 5),
    }
}

fn group_end(c: &Captures<'_>) -> Option<TableLine> {
    let segment = segment_line(c);
    let closes = c.get(6).map_or(0, |m| m.as_str().matches('+').count());
    if closes == 0 {
        // box drawing without a closing mark
        return Some(TableLine::Segment(segment));
    }
    Some(TableLine::GroupEnd { segment, closes })
}

fn regular_segment(c: &Captures<'_>) -> Option<TableLine> {
    Some(TableLine::Segment(segment_line(c)))
}

fn segment_start(c: &Captures<'_>) -> Option<TableLine> {
    Some(TableLine::SegmentStart {
        id: non_empty(c, 1),
        segcode: text(c, 2),
        name: text(c, 3),
    })
}

fn annex(_: &Captures<'_>) -> Option<TableLine> {
    Some(TableLine::Annex)
}

/// Segment table layouts, in precedence order
pub static SEGMENT_TABLE_LINE: Lazy<Shapes<TableLine>> = Lazy::new(|| {
    Shapes::from_table(&[
        (
            "segment_group_start",
            r"(\d{4})*[-+* XS]*-* *([Ss]egment [Gg]roup \d*) *-* +(C|M|c|m) *(\d*)[ +|-]*",
            group_start,
        ),
        (
            "segment_group_end",
            r"(\d{4})*[-+* XS]*(\w{3}) *([\w /-]*) +(C|M|c|m) *(\d*) *-+([ |+]*)",
            group_end,
        ),
        (
            "segment",
            r"(\d{4})*[-+* XS]*(\w{3}) *(.*) +(M|C|m|c) *(\d+)[ |]*",
            regular_segment,
        ),
        (
            "segment_start",
            r"(\d{4})*[-+* XS]*(\w{3}) *(.*) *\|",
            segment_start,
        ),
        ("informative_annex", r"(Informative annex:.*)", annex),
    ])
});

fn segment_tail(c: &Captures<'_>) -> Option<SegmentTail> {
    Some(SegmentTail {
        name: text(c, 1),
        mandatory: is_mandatory(c, 2),
        max_occurs: text(c, 3),
        closes: c.get(4).map_or(0, |m| m.as_str().matches('+').count()),
    })
}

/// Continuation layouts of a wrapped segment usage
pub static SEGMENT_TABLE_TAIL: Lazy<Shapes<SegmentTail>> = Lazy::new(|| {
    Shapes::from_table(&[
        (
            "segment_group_end_tail",
            r" *(.*?) +(M|C|m|c) *(\d*) *-+([ |+]*)",
            segment_tail,
        ),
        ("segment_end", r" *(.*) +(M|C|m|c) *(\d*)[ |]*", segment_tail),
    ])
});

// --- Archive entries ---

fn directory_version(c: &Captures<'_>) -> Option<String> {
    Some(format!("{}{}", text(c, 2), text(c, 3)).to_lowercase())
}

/// Message file names such as `CUSCAR_D.08A`, yielding the directory version (`d08a`)
pub static MESSAGE_FILE_NAME: Lazy<Shape<String>> = Lazy::new(|| {
    Shape::new(
        "message_file_name",
        r"([A-Z]+)_([A-Z])\.([0-9]+[A-Z])",
        directory_version,
    )
});
