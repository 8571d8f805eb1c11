//! Grammars of a whole directory release

use crate::archive::SpecificationArchive;
use crate::definitions::Definitions;
use crate::message::MessageReader;
use crate::options::ReaderOptions;
use crate::{Error, Result};
use edi_grammar::envelope::{NAMESPACE_ROOT, group_control_segments, interchange_envelope};
use edi_grammar::{Description, Edimap, SegmentDictionary};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Interchange type handled by the generated grammars
pub const INTERCHANGE_TYPE: &str = "UNEDIFACT";

/// Name of the pseudo-message holding the segment definitions
pub const DEFINITIONS_NAME: &str = "__modelset_definitions";

pub const DEFINITIONS_VERSION: &str = "local";

pub const MESSAGE_BINDING_CONFIG: &str =
    "/org/milyn/edi/unedifact/model/r41/bindings/unedifact-message.xml";

pub const INTERCHANGE_BINDING_CONFIG: &str =
    "/org/milyn/edi/unedifact/model/r41/bindings/unedifact-interchange.xml";

/// Static description of the interchanges the grammars belong to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterchangeProperties {
    pub interchange_type: String,
    pub message_binding_config: String,
    pub interchange_binding_config: String,
}

impl Default for InterchangeProperties {
    fn default() -> Self {
        Self {
            interchange_type: INTERCHANGE_TYPE.to_string(),
            message_binding_config: MESSAGE_BINDING_CONFIG.to_string(),
            interchange_binding_config: INTERCHANGE_BINDING_CONFIG.to_string(),
        }
    }
}

impl InterchangeProperties {
    /// Properties as `key -> value` pairs
    pub fn to_map(&self) -> BTreeMap<&'static str, &str> {
        BTreeMap::from([
            ("interchange.type", self.interchange_type.as_str()),
            ("message.binding.config", self.message_binding_config.as_str()),
            (
                "interchange.binding.config",
                self.interchange_binding_config.as_str(),
            ),
        ])
    }
}

/// The definitions grammar together with a set of message grammars, with
/// duplicate sibling tags made unique
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdiDirectory {
    pub common: Edimap,
    pub messages: Vec<Edimap>,
}

impl EdiDirectory {
    pub fn message(&self, name: &str) -> Option<&Edimap> {
        self.messages.iter().find(|m| m.name() == name)
    }
}

/// Entry point over one directory release.
///
/// The segment definitions are read once, on construction. Message grammars
/// are parsed on every request and never cached; the reader holds no mutable
/// state and can serve lookups from several threads.
#[derive(Debug)]
pub struct SpecificationReader {
    options: ReaderOptions,
    definitions: Edimap,
    segments: SegmentDictionary,
    messages: BTreeMap<String, Vec<u8>>,
    version: Option<String>,
}

impl SpecificationReader {
    pub fn new(archive: SpecificationArchive, options: ReaderOptions) -> Result<Self> {
        let version = archive.directory_version()?.map(str::to_string);

        let definitions = Definitions::from_bytes(
            archive.data_elements()?,
            archive.composites()?,
            archive.segments()?,
        )?;

        let mut root = definitions.segment_group(options.use_short_name);
        for segment in group_control_segments() {
            root.push(segment);
        }
        let envelope = interchange_envelope(options.use_short_name)?;
        root.children.extend(envelope.segments.children);

        let mut description = Description::new(DEFINITIONS_NAME, DEFINITIONS_VERSION);
        if let Some(version) = &version {
            description =
                description.with_namespace(format!("{}:un:{}:common", NAMESPACE_ROOT, version));
        }
        let definitions = Edimap::new(description, root);
        let segments = SegmentDictionary::from_group(&definitions.segments);

        let messages = archive.into_messages();
        info!(
            "Directory {} has {} segment definitions and {} messages",
            version.as_deref().unwrap_or("(unversioned)"),
            segments.len(),
            messages.len()
        );

        Ok(Self {
            options,
            definitions,
            segments,
            messages,
            version,
        })
    }

    /// Read a release archive
    pub fn from_zip(bytes: &[u8], options: ReaderOptions) -> Result<Self> {
        Self::new(SpecificationArchive::from_zip(bytes)?, options)
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// Directory version of the release (`d08a`), when it has messages
    pub fn directory_version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// The definitions pseudo-message name followed by every message name.
    /// Names are unique.
    pub fn message_names(&self) -> Vec<String> {
        std::iter::once(DEFINITIONS_NAME.to_string())
            .chain(self.messages.keys().cloned())
            .collect()
    }

    /// Segment definitions, group control segments and interchange envelope
    pub fn definition_model(&self) -> &Edimap {
        &self.definitions
    }

    /// Grammar for `name`: the definitions model, or a freshly parsed message
    pub fn mapping_model(&self, name: &str) -> Result<Edimap> {
        if name == self.definitions.name() {
            return Ok(self.definitions.clone());
        }

        let document = self
            .messages
            .get(name)
            .ok_or_else(|| Error::UnknownMessage(name.to_string()))?;
        debug!("Parsing message {}", name);
        let message = self.message_reader().read_bytes(document)?;
        Ok(message.edimap)
    }

    fn message_reader(&self) -> MessageReader<'_> {
        let reader = if self.options.use_import {
            MessageReader::with_import(DEFINITIONS_NAME)
        } else {
            MessageReader::with_dictionary(&self.segments)
        };
        reader.use_short_name(self.options.use_short_name)
    }

    pub fn interchange_properties(&self) -> InterchangeProperties {
        InterchangeProperties::default()
    }

    /// The definitions grammar and the message grammars named in `include`,
    /// or every message grammar when `include` is empty. Documents in the
    /// message directory that are not messages are left out.
    pub fn edi_directory(&self, include: &[&str]) -> Result<EdiDirectory> {
        let mut common = self.definitions.clone();
        common.segments.disambiguate_tags();

        let mut messages = Vec::new();
        for name in self.messages.keys() {
            if !include.is_empty() && !include.contains(&name.as_str()) {
                continue;
            }
            let mut model = match self.mapping_model(name) {
                Ok(model) => model,
                Err(Error::NotAMessage(reason)) => {
                    warn!("Leaving {} out of the directory: {}", name, reason);
                    continue;
                }
                Err(e) => return Err(e),
            };
            model.segments.disambiguate_tags();
            messages.push(model);
        }

        info!("Built directory with {} message grammars", messages.len());
        Ok(EdiDirectory { common, messages })
    }
}
