//! Interchange envelope segments
//!
//! The service segments (UNB/UNZ, UNG/UNE, UNH/UNT) are defined by the syntax
//! rules rather than by a directory release, so they ship with this crate as a
//! ready-made grammar fragment.

use crate::model::{Edimap, Field, Segment, SegmentNode};
use crate::Result;
use tracing::debug;

/// Root of the namespaces given to generated UN/EDIFACT grammars
pub const NAMESPACE_ROOT: &str = "urn:org.milyn.edi.unedifact";

/// Namespace of the syntax version 4.1 service segments
pub const INTERCHANGE_NAMESPACE: &str = "urn:org.milyn.edi.unedifact.v41";

/// Resource path of the bundled envelope fragment, relative to the crate root
pub const INTERCHANGE_DEFINITION: &str = "resources/unedifact-interchange.yaml";

const BUNDLED_INTERCHANGE: &str = include_str!("../resources/unedifact-interchange.yaml");

/// Load the bundled envelope fragment.
///
/// With `use_short_name` each segment's structural tag is its segment code
/// (`UNB`) instead of its long tag (`interchangeHeader`).
pub fn interchange_envelope(use_short_name: bool) -> Result<Edimap> {
    let mut edimap = Edimap::from_yaml(BUNDLED_INTERCHANGE)?;
    if use_short_name {
        for child in &mut edimap.segments.children {
            if let SegmentNode::Segment(segment) = child {
                segment.xmltag = segment.segcode.clone();
            }
        }
    }
    debug!(
        "Loaded interchange envelope with {} segments",
        edimap.segments.children.len()
    );
    Ok(edimap)
}

/// The UGH/UGT group control segments used when grouping interchanges.
/// They are absent from the published segment directory.
pub fn group_control_segments() -> Vec<Segment> {
    ["UGH", "UGT"]
        .into_iter()
        .map(|segcode| {
            let mut id = Field::new("", "id");
            id.namespace = Some(INTERCHANGE_NAMESPACE.to_string());
            id.required = true;

            let mut segment = Segment::new(segcode, segcode).with_field(id);
            segment.xmltag = segcode.to_string();
            segment
        })
        .collect()
}
