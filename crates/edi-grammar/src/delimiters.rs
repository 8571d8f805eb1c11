//! UN/EDIFACT delimiter set
//!
//! Grammars produced from the published directories always carry the fixed
//! UN/EDIFACT defaults; a service string advice (UNA) in an interchange may
//! override them at parse time.

use serde::{Deserialize, Serialize};

/// Default UN/EDIFACT separators (when no UNA is present)
pub const DEFAULT_SEGMENT_TERMINATOR: char = '\'';
pub const DEFAULT_FIELD_SEPARATOR: char = '+';
pub const DEFAULT_COMPONENT_SEPARATOR: char = ':';
pub const DEFAULT_SUB_COMPONENT_SEPARATOR: char = '~';
pub const DEFAULT_RELEASE_CHARACTER: char = '?';
pub const DEFAULT_DECIMAL_POINT: char = '.';

/// Delimiters used to split an interchange into segments, fields and components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delimiters {
    /// Segment terminator (default '\'')
    pub segment: char,
    /// Field (data element) separator (default '+')
    pub field: char,
    /// Component separator (default ':')
    pub component: char,
    /// Sub-component separator, unused by UN/EDIFACT (default '~')
    pub sub_component: char,
    /// Escape / release character (default '?')
    pub escape: char,
    /// Decimal mark (default '.')
    pub decimal_separator: char,
    /// Line breaks between segments carry no meaning
    pub ignore_crlf: bool,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            segment: DEFAULT_SEGMENT_TERMINATOR,
            field: DEFAULT_FIELD_SEPARATOR,
            component: DEFAULT_COMPONENT_SEPARATOR,
            sub_component: DEFAULT_SUB_COMPONENT_SEPARATOR,
            escape: DEFAULT_RELEASE_CHARACTER,
            decimal_separator: DEFAULT_DECIMAL_POINT,
            ignore_crlf: true,
        }
    }
}
