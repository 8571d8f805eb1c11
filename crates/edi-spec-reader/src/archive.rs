//! Directory release archives
//!
//! A release such as `d08a.zip` bundles one archive per directory, e.g.
//! `EDED.ZIP` holding `EDED.08A`, and `EDMD.ZIP` holding one document per
//! message (`INVOIC_D.08A`). Trial releases use a `TR` prefix in place of
//! `ED`. Entries may also be stored as plain text, one level up.
//!
//! Inside a release zip, message documents are only taken from the message
//! directory; other top-level files (tables of contents, code lists) are
//! skipped. Entries handed to [`SpecificationArchive::from_entries`] are
//! loose documents, and anything not naming a definition directory there is
//! read as a message.

use crate::shapes::MESSAGE_FILE_NAME;
use crate::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read};
use tracing::{debug, trace, warn};
use zip::ZipArchive;

/// Kinds of directory shipped in a release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directory {
    DataElements,
    Composites,
    Segments,
    Messages,
}

impl Directory {
    const ALL: [Directory; 4] = [
        Directory::DataElements,
        Directory::Composites,
        Directory::Segments,
        Directory::Messages,
    ];

    /// File name prefix of the directory, after normalization
    pub fn prefix(self) -> &'static str {
        match self {
            Directory::DataElements => "eded.",
            Directory::Composites => "edcd.",
            Directory::Segments => "edsd.",
            Directory::Messages => "edmd.",
        }
    }

    fn classify(file_name: &str) -> Option<Self> {
        let normalized = normalized_file_name(file_name);
        Self::ALL
            .into_iter()
            .find(|directory| normalized.starts_with(directory.prefix()))
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Lower-cased base name, with a trial `tr` prefix read as `ed`
fn normalized_file_name(path: &str) -> String {
    let name = base_name(path).to_lowercase();
    match name.strip_prefix("tr") {
        Some(rest) => format!("ed{}", rest),
        None => name,
    }
}

fn is_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(b"PK\x03\x04")
}

/// File entries of a zip archive, in archive order
fn read_zip(bytes: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::Archive(format!("unreadable zip archive: {}", e)))?;

    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut file = archive
            .by_index(index)
            .map_err(|e| Error::Archive(format!("unreadable zip entry {}: {}", index, e)))?;
        if file.is_dir() {
            continue;
        }
        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        entries.push((file.name().to_string(), content));
    }
    Ok(entries)
}

/// The documents of one directory release, split by kind
#[derive(Debug, Clone, Default)]
pub struct SpecificationArchive {
    data_elements: Option<Vec<u8>>,
    composites: Option<Vec<u8>>,
    segments: Option<Vec<u8>>,
    messages: BTreeMap<String, Vec<u8>>,
    versions: BTreeSet<String>,
}

impl SpecificationArchive {
    /// Split a release archive
    pub fn from_zip(bytes: &[u8]) -> Result<Self> {
        let mut archive = Self::default();
        for (name, content) in read_zip(bytes)? {
            archive.add_entry(&name, content, false)?;
        }
        archive.log_summary();
        Ok(archive)
    }

    /// Split a release archive read from `reader`
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_zip(&bytes)
    }

    /// Build from named entries, each either a nested directory archive or a
    /// plain document
    pub fn from_entries<I, N, B>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, B)>,
        N: AsRef<str>,
        B: Into<Vec<u8>>,
    {
        let mut archive = Self::default();
        for (name, content) in entries {
            archive.add_entry(name.as_ref(), content.into(), true)?;
        }
        archive.log_summary();
        Ok(archive)
    }

    /// Sort one entry into its directory. With `loose_messages` unset, only
    /// the message directory contributes messages.
    fn add_entry(&mut self, name: &str, content: Vec<u8>, loose_messages: bool) -> Result<()> {
        match Directory::classify(name) {
            Some(directory) if is_zip(&content) => {
                trace!("Reading {:?} archive {}", directory, name);
                for (inner_name, inner_content) in read_zip(&content)? {
                    match directory {
                        Directory::Messages => self.add_message(&inner_name, inner_content),
                        definition => {
                            if Directory::classify(&inner_name) == Some(definition) {
                                self.set_definition(definition, &inner_name, inner_content);
                            }
                        }
                    }
                }
            }
            Some(Directory::Messages) => self.add_message(name, content),
            None if loose_messages => self.add_message(name, content),
            None => trace!("Skipping release entry {}", name),
            Some(definition) => self.set_definition(definition, name, content),
        }
        Ok(())
    }

    fn set_definition(&mut self, directory: Directory, name: &str, content: Vec<u8>) {
        let slot = match directory {
            Directory::DataElements => &mut self.data_elements,
            Directory::Composites => &mut self.composites,
            Directory::Segments => &mut self.segments,
            Directory::Messages => return,
        };
        if slot.is_some() {
            warn!("Ignoring second {:?} document {}", directory, name);
            return;
        }
        debug!("Found {:?} document {}", directory, name);
        *slot = Some(content);
    }

    fn add_message(&mut self, name: &str, content: Vec<u8>) {
        let file_name = base_name(name).to_uppercase();
        let key = match file_name.split_once('_') {
            Some((key, _)) if !key.is_empty() => key.to_string(),
            _ => {
                trace!("Skipping archive entry {}", name);
                return;
            }
        };

        if let Some(version) = MESSAGE_FILE_NAME.parse(&file_name) {
            self.versions.insert(version);
        }
        if self.messages.contains_key(&key) {
            warn!("Ignoring second document for message {} ({})", key, name);
            return;
        }
        self.messages.insert(key, content);
    }

    fn log_summary(&self) {
        debug!(
            "Archive holds {} message documents, versions {:?}",
            self.messages.len(),
            self.versions
        );
    }

    fn definition(&self, directory: Directory) -> Result<&[u8]> {
        let document = match directory {
            Directory::DataElements => &self.data_elements,
            Directory::Composites => &self.composites,
            Directory::Segments => &self.segments,
            Directory::Messages => &None,
        };
        document.as_deref().ok_or_else(|| {
            Error::Archive(format!(
                "no {:?} document ({}*) in archive",
                directory,
                directory.prefix()
            ))
        })
    }

    /// Raw data element directory (EDED)
    pub fn data_elements(&self) -> Result<&[u8]> {
        self.definition(Directory::DataElements)
    }

    /// Raw composite element directory (EDCD)
    pub fn composites(&self) -> Result<&[u8]> {
        self.definition(Directory::Composites)
    }

    /// Raw segment directory (EDSD)
    pub fn segments(&self) -> Result<&[u8]> {
        self.definition(Directory::Segments)
    }

    /// Message names in ascending order
    pub fn message_names(&self) -> impl Iterator<Item = &str> {
        self.messages.keys().map(String::as_str)
    }

    /// Raw document of a message
    pub fn message(&self, name: &str) -> Option<&[u8]> {
        self.messages.get(name).map(Vec::as_slice)
    }

    /// Directory versions named by the message files (`d08a`)
    pub fn versions(&self) -> &BTreeSet<String> {
        &self.versions
    }

    /// The single directory version of the release.
    ///
    /// `None` when the archive holds no messages; an error when the message
    /// files name no version or more than one.
    pub fn directory_version(&self) -> Result<Option<&str>> {
        if self.messages.is_empty() {
            return Ok(None);
        }
        if self.versions.len() != 1 {
            return Err(Error::Archive(format!(
                "expected exactly one directory version, found {:?} for messages {:?}",
                self.versions,
                self.messages.keys().collect::<Vec<_>>()
            )));
        }
        Ok(self.versions.iter().next().map(String::as_str))
    }

    pub(crate) fn into_messages(self) -> BTreeMap<String, Vec<u8>> {
        self.messages
    }
}
