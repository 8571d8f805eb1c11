//! # edi-spec-reader
//!
//! Extracts UN/EDIFACT message grammars from the published directory text.
//!
//! A directory release is distributed as an archive holding the data element
//! directory (EDED), the composite element directory (EDCD), the segment
//! directory (EDSD) and one document per message (EDMD). The documents are
//! semi-structured text; this crate recognizes their line layouts and builds
//! [`edi_grammar::Edimap`] grammars from them.
//!
//! ```no_run
//! use edi_spec_reader::{ReaderOptions, SpecificationReader};
//!
//! # fn main() -> edi_spec_reader::Result<()> {
//! let bytes = std::fs::read("d08a.zip")?;
//! let reader = SpecificationReader::from_zip(&bytes, ReaderOptions::default())?;
//! for name in reader.message_names() {
//!     let grammar = reader.mapping_model(&name)?;
//!     println!("{}: {} segments", name, grammar.segments.all_segments().len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod definitions;
pub mod message;
pub mod options;
pub mod shapes;
pub mod specification;
pub mod text;

pub use archive::SpecificationArchive;
pub use definitions::{Definitions, read_components, read_fields, read_segments};
pub use message::{Message, MessageHeader, MessageReader};
pub use options::ReaderOptions;
pub use specification::{EdiDirectory, InterchangeProperties, SpecificationReader};

use std::fmt;
use thiserror::Error;

/// What an unresolved reference was pointing at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    DataElement,
    Composite,
    Segment,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::DataElement => write!(f, "data element"),
            ReferenceKind::Composite => write!(f, "composite element"),
            ReferenceKind::Segment => write!(f, "segment code"),
        }
    }
}

/// Errors that can occur when reading a directory
#[derive(Error, Debug)]
pub enum Error {
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Unknown {kind} '{id}'")]
    UnresolvedReference { kind: ReferenceKind, id: String },

    #[error("Section not found: {0}")]
    MissingSection(String),

    #[error("Not a UN/EDIFACT message definition: {0}")]
    NotAMessage(String),

    #[error("Unknown message: {0}")]
    UnknownMessage(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Grammar error: {0}")]
    Grammar(#[from] edi_grammar::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn unresolved(kind: ReferenceKind, id: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            kind,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
