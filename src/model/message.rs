//! Rebuilt internet messages.

use std::path::PathBuf;

/// Header fields in emission order.
///
/// Names are compared case-insensitively, values are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    fields: Vec<(String, String)>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field. Order of calls is the order of the serialized headers.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// First value of a field.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Field names in order.
    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A message after every surrogate key has been replaced by readable data.
///
/// Built by the reconstructor, serialized by the writer, then dropped.
#[derive(Debug, Clone)]
pub struct ResolvedMessage {
    /// Row id in the messages table.
    pub record_id: i64,

    /// 0-based position in the date-ordered processing sequence.
    pub sequence: u64,

    /// The original `Message-ID`, or the sequence number when it was lost.
    pub message_id: String,

    /// Id of the previous message of the same conversation, if any.
    pub in_reply_to: Option<String>,

    /// MIME type names of the declared attachments.
    pub attachment_types: Vec<String>,

    /// Header fields in emission order.
    pub headers: HeaderSet,

    /// Plain-text body, attachment notes included.
    pub body: String,

    /// Absolute (or root-relative) path of the `.eml` file to create.
    pub target: PathBuf,
}
