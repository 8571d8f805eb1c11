//! # edi-grammar
//!
//! Strongly-typed grammar model for UN/EDIFACT message definitions.
//!
//! A grammar is a tree of segment groups and segments, where each segment is an
//! ordered list of fields (composites) made of components (data elements). The
//! model is produced by `edi-spec-reader` from the published directory text and
//! consumed by interchange parsers and serializers.

pub mod delimiters;
pub mod dictionary;
pub mod encoder;
pub mod envelope;
pub mod loader;
pub mod model;

pub use delimiters::Delimiters;
pub use dictionary::{
    ComponentDictionary, Dictionary, DictionaryBuilder, FieldDictionary, SegmentDictionary,
};
pub use encoder::encode_tag;
pub use envelope::interchange_envelope;
pub use model::{
    Component, DataType, Description, Edimap, Field, Import, Segment, SegmentGroup, SegmentNode,
};

use thiserror::Error;

/// Errors that can occur when working with grammar models
#[derive(Error, Debug)]
pub enum Error {
    #[error("Grammar not found: {0}")]
    NotFound(String),

    #[error("Invalid grammar format: {0}")]
    InvalidFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an invalid-format error from any displayable cause.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
