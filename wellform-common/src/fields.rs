//! Field values, stream records and the merged per-file record map
//!
//! Analyzers describe a file as one record per logical content stream
//! (stream 0 is the container, higher indices are embedded tracks or
//! elements). Each record maps field names to [`FieldValue`]s. Values carry
//! two reserved sentinels besides free-form text:
//!
//! - **unapplicable** (`"(:unap)"`): the field has no meaning for this
//!   stream (a CSV file has no version, for example)
//! - **unavailable** (`"(:unav)"`): the field applies but the analyzer
//!   could not determine it
//!
//! The sentinels are first-class values: an unavailable value is always
//! replaceable by a more specific one, and two analyzers agreeing on
//! "unapplicable" is agreement, not a conflict.

use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Wire form of [`FieldValue::Unapplicable`]
pub const UNAP: &str = "(:unap)";
/// Wire form of [`FieldValue::Unavailable`]
pub const UNAV: &str = "(:unav)";

/// Well-known field names shared between analyzers and the reconciler
pub mod field {
    /// Resolved MIME type of a stream
    pub const MIMETYPE: &str = "mimetype";
    /// Format version of a stream
    pub const VERSION: &str = "version";
    /// Character encoding of a text stream
    pub const CHARSET: &str = "charset";
    /// Stream kind ("container", "audio", "text", ...)
    pub const STREAM_TYPE: &str = "stream_type";
}

/// One metadata value inside a [`StreamRecord`]
///
/// An absent field is represented by absence from the record map, never by a
/// dedicated variant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldValue {
    /// Free-form determined value
    Text(String),
    /// Field is not applicable to this stream type
    Unapplicable,
    /// Field applies but its value could not be determined
    Unavailable,
}

impl FieldValue {
    /// Build a value from its wire form, mapping the reserved sentinels
    /// back to their variants.
    pub fn from_wire(s: &str) -> Self {
        match s {
            UNAP => FieldValue::Unapplicable,
            UNAV => FieldValue::Unavailable,
            other => FieldValue::Text(other.to_string()),
        }
    }

    /// Wire form of this value
    pub fn as_wire(&self) -> &str {
        match self {
            FieldValue::Text(s) => s,
            FieldValue::Unapplicable => UNAP,
            FieldValue::Unavailable => UNAV,
        }
    }

    /// Determined text content, if this is not a sentinel
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, FieldValue::Unavailable)
    }

    pub fn is_unapplicable(&self) -> bool {
        matches!(self, FieldValue::Unapplicable)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::from_wire(s)
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        match s.as_str() {
            UNAP => FieldValue::Unapplicable,
            UNAV => FieldValue::Unavailable,
            _ => FieldValue::Text(s),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct WireVisitor;

        impl<'de> Visitor<'de> for WireVisitor {
            type Value = FieldValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a field value string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<FieldValue, E> {
                Ok(FieldValue::from_wire(v))
            }
        }

        deserializer.deserialize_str(WireVisitor)
    }
}

/// Metadata record for one logical content stream
///
/// Field order is stable (BTreeMap) so serialized reports are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl StreamRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Builder-style insert for literal record construction
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn contains_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, FieldValue)> for StreamRecord {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Reconciled per-file record map, keyed by stream index
///
/// Stream 0 is the file's outermost/container stream. The map is created
/// empty, grown only by the serial merge fold, and handed to consumers by
/// value once reconciliation finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MergedFile {
    streams: BTreeMap<u32, StreamRecord>,
}

impl MergedFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn insert_stream(&mut self, index: u32, record: StreamRecord) {
        self.streams.insert(index, record);
    }

    pub fn stream(&self, index: u32) -> Option<&StreamRecord> {
        self.streams.get(&index)
    }

    pub fn stream_mut(&mut self, index: u32) -> Option<&mut StreamRecord> {
        self.streams.get_mut(&index)
    }

    /// The container stream (index 0), if present
    pub fn container(&self) -> Option<&StreamRecord> {
        self.stream(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u32, &StreamRecord)> {
        self.streams.iter()
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }
}

impl FromIterator<(u32, StreamRecord)> for MergedFile {
    fn from_iter<I: IntoIterator<Item = (u32, StreamRecord)>>(iter: I) -> Self {
        Self {
            streams: iter.into_iter().collect(),
        }
    }
}

/// Placeholder values any analyzer's more specific answer may overwrite
///
/// Holds the "lose" set for merging: a current value in this set is adopted
/// over by whatever the incoming record carries, and an incoming value in
/// this set never contradicts an existing determination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToleratedValues {
    values: BTreeSet<FieldValue>,
}

impl Default for ToleratedValues {
    fn default() -> Self {
        let mut values = BTreeSet::new();
        values.insert(FieldValue::Unavailable);
        values.insert(FieldValue::Text(String::new()));
        Self { values }
    }
}

impl ToleratedValues {
    pub fn contains(&self, value: &FieldValue) -> bool {
        self.values.contains(value)
    }

    /// Add a tolerated placeholder (from configuration)
    pub fn insert(&mut self, value: impl Into<FieldValue>) {
        self.values.insert(value.into());
    }
}
