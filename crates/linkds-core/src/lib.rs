//! linkds Core - Domain models, errors, and shared types
//!
//! This crate defines the abstractions shared by the dataset builder:
//! - Identifiers for knowledge-base entities and source pages
//! - Link-annotated corpus records and their sections
//! - Output dataset entries (text plus span-keyed entity labels)
//! - Common error types
//! - Configuration management

pub mod config;

pub use config::{
    ArtifactFormat, BuilderConfig, ConfigError, InputConfig, LoggingConfig, OutputConfig,
};

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for dataset building
#[derive(Error, Debug)]
pub enum LinkdsError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read table {path}: {message}")]
    Table { path: PathBuf, message: String },

    #[error("Table {path} has no column named '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Malformed record at {path}:{line}: {message}")]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl LinkdsError {
    /// Wrap an IO error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, LinkdsError>;

// ============================================================================
// Identifiers
// ============================================================================

/// Knowledge-base entity identifier (qid)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Source page identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(String);

impl PageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<u64> for PageId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// Identifier as it appears in JSON input: either a string or a number
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum JsonId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

impl JsonId {
    /// Canonical text form shared with table ids
    pub fn into_text(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Signed(n) => n.to_string(),
            Self::Unsigned(n) => n.to_string(),
            // pandas-style exports sometimes write integral ids as floats
            Self::Float(f) if f.fract() == 0.0 => format!("{}", f as i64),
            Self::Float(f) => f.to_string(),
        }
    }
}

/// Normalize an id cell taken from a text table
///
/// Integral float spellings (`"12.0"`) collapse to their integer form so that
/// table ids agree with JSON ids.
pub fn normalize_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(int_part) = trimmed.strip_suffix(".0") {
        if !int_part.is_empty() && int_part.bytes().all(|b| b.is_ascii_digit()) {
            return int_part.to_string();
        }
    }
    trimmed.to_string()
}

fn page_id_from_json<'de, D>(deserializer: D) -> std::result::Result<PageId, D::Error>
where
    D: Deserializer<'de>,
{
    JsonId::deserialize(deserializer).map(|raw| PageId(raw.into_text()))
}

fn page_ids_from_json<'de, D>(deserializer: D) -> std::result::Result<Vec<PageId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<JsonId>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|r| PageId(r.into_text())).collect())
}

// ============================================================================
// Corpus Records
// ============================================================================

/// One document of the link-annotated corpus (one NDJSON line)
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationRecord {
    /// Page this document was taken from
    #[serde(deserialize_with = "page_id_from_json")]
    pub page_id: PageId,

    /// Text sections with their links
    pub sections: Vec<Section>,
}

/// A section of text with parallel link arrays
#[derive(Debug, Clone, Deserialize)]
pub struct Section {
    pub text: String,

    #[serde(deserialize_with = "page_ids_from_json")]
    pub target_page_ids: Vec<PageId>,

    pub link_offsets: Vec<u64>,

    pub link_lengths: Vec<u64>,
}

impl Section {
    /// Number of link occurrences, if the parallel arrays agree
    pub fn link_count(&self) -> Option<usize> {
        let n = self.target_page_ids.len();
        (self.link_offsets.len() == n && self.link_lengths.len() == n).then_some(n)
    }

    /// Index of the first link whose end offset does not fit in a `u64`
    pub fn overflowing_link(&self) -> Option<usize> {
        self.link_offsets
            .iter()
            .zip(self.link_lengths.iter())
            .position(|(&offset, &length)| Span::from_offset(offset, length).is_none())
    }

    /// Iterate links as (target page, span)
    ///
    /// Callers must check [`Section::link_count`] and
    /// [`Section::overflowing_link`] first; extra entries in longer arrays
    /// and overflowing spans are skipped.
    pub fn links(&self) -> impl Iterator<Item = (&PageId, Span)> + '_ {
        self.target_page_ids
            .iter()
            .zip(self.link_offsets.iter().zip(self.link_lengths.iter()))
            .filter_map(|(page, (&offset, &length))| {
                Span::from_offset(offset, length).map(|span| (page, span))
            })
    }
}

// ============================================================================
// Dataset Entries
// ============================================================================

/// Character span `(start, end)` of a link inside a section's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span(pub u64, pub u64);

impl Span {
    /// Span covering `length` characters starting at `offset`, or `None`
    /// if the end overflows
    pub fn from_offset(offset: u64, length: u64) -> Option<Self> {
        offset.checked_add(length).map(|end| Self(offset, end))
    }

    pub fn start(&self) -> u64 {
        self.0
    }

    pub fn end(&self) -> u64 {
        self.1
    }
}

/// Entity labels for one span with their weights
pub type EntityWeights = BTreeMap<EntityId, f64>;

/// Weight given to every hard label
pub const LINK_WEIGHT: f64 = 1.0;

/// Span-keyed entity labels of one section
///
/// Serialized as a sequence of `(span, weights)` pairs, ordered by span.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkMap(BTreeMap<Span, EntityWeights>);

impl LinkMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label `span` with `entity`, replacing any earlier label at that span
    ///
    /// Returns `true` if an earlier label was replaced.
    pub fn insert(&mut self, span: Span, entity: EntityId) -> bool {
        let weights = EntityWeights::from([(entity, LINK_WEIGHT)]);
        self.0.insert(span, weights).is_some()
    }

    pub fn get(&self, span: &Span) -> Option<&EntityWeights> {
        self.0.get(span)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Span, &EntityWeights)> {
        self.0.iter()
    }
}

impl Serialize for LinkMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

impl<'de> Deserialize<'de> for LinkMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let pairs = Vec::<(Span, EntityWeights)>::deserialize(deserializer)?;
        Ok(Self(pairs.into_iter().collect()))
    }
}

/// Annotation payload attached to each entry's text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotations {
    pub links: LinkMap,
}

/// One training example: `(text, {"links": ...})`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetEntry(pub String, pub Annotations);

impl DatasetEntry {
    pub fn new(text: impl Into<String>, links: LinkMap) -> Self {
        Self(text.into(), Annotations { links })
    }

    pub fn text(&self) -> &str {
        &self.0
    }

    pub fn links(&self) -> &LinkMap {
        &self.1.links
    }
}

// ============================================================================
// Tests
// ============================================================================
