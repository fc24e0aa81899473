//! Flat rows of the seven export tables.
//!
//! Field names follow the column names of the message database
//! (`contactID`, `folderURI`, `c0body`, ...).

use serde::Deserialize;

use crate::source::de;

/// Maps a numeric key inside a packed attribute blob to a field name.
#[derive(Debug, Clone, Deserialize)]
pub struct AttributeDefinition {
    #[serde(deserialize_with = "de::int")]
    pub id: i64,
    #[serde(default, deserialize_with = "de::text")]
    pub name: String,
}

/// A person known to the mail client.
#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    #[serde(deserialize_with = "de::int")]
    pub id: i64,
    #[serde(default, deserialize_with = "de::text")]
    pub name: String,
}

/// A contact method (email address, chat handle, ...) belonging to a contact.
#[derive(Debug, Clone, Deserialize)]
pub struct Identity {
    #[serde(rename = "contactID", deserialize_with = "de::int")]
    pub contact_id: i64,
    #[serde(default, deserialize_with = "de::text")]
    pub kind: String,
    #[serde(default, deserialize_with = "de::text")]
    pub value: String,
}

impl Identity {
    /// Only email identities feed address headers.
    pub fn is_email(&self) -> bool {
        self.kind == "email"
    }
}

/// Attachment type id to MIME type name.
#[derive(Debug, Clone, Deserialize)]
pub struct MimeType {
    #[serde(deserialize_with = "de::int")]
    pub id: i64,
    #[serde(rename = "mimeType", default, deserialize_with = "de::text")]
    pub mime_type: String,
}

/// A folder row as exported. Older dumps may lack the `id` column.
#[derive(Debug, Clone, Deserialize)]
pub struct FolderLocation {
    #[serde(default, deserialize_with = "de::opt_int")]
    pub id: Option<i64>,
    #[serde(rename = "folderURI", deserialize_with = "de::text")]
    pub folder_uri: String,
}

/// A folder with an explicit id, as seen by everything after the source adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    pub id: i64,
    pub uri: String,
}

/// One row of the messages table.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageRecord {
    #[serde(deserialize_with = "de::int")]
    pub id: i64,

    /// Microseconds since the Unix epoch.
    #[serde(deserialize_with = "de::int")]
    pub date: i64,

    #[serde(rename = "conversationID", default, deserialize_with = "de::opt_int")]
    pub conversation_id: Option<i64>,

    #[serde(rename = "folderID", default, deserialize_with = "de::opt_int")]
    pub folder_id: Option<i64>,

    /// Original `Message-ID` without angle brackets, if it survived.
    #[serde(rename = "headerMessageID", default, deserialize_with = "de::opt_text")]
    pub header_message_id: Option<String>,

    /// JSON object keyed by attribute definition ids. Empty for broken rows.
    #[serde(rename = "jsonAttributes", default, deserialize_with = "de::text")]
    pub json_attributes: String,
}

impl MessageRecord {
    /// Rows with an empty attribute blob cannot be salvaged.
    pub fn is_salvageable(&self) -> bool {
        !self.json_attributes.trim().is_empty()
    }
}

/// Full-text columns of a message, joined on `docid == message id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageContent {
    #[serde(deserialize_with = "de::int")]
    pub docid: i64,
    #[serde(rename = "c0body", default, deserialize_with = "de::text")]
    pub body: String,
    #[serde(rename = "c1subject", default, deserialize_with = "de::text")]
    pub subject: String,
    #[serde(rename = "c2attachmentNames", default, deserialize_with = "de::text")]
    pub attachment_names: String,
    #[serde(rename = "c3author", default, deserialize_with = "de::text")]
    pub author: String,
    #[serde(rename = "c4recipients", default, deserialize_with = "de::text")]
    pub recipients: String,
}

/// All seven record sets of one export.
#[derive(Debug, Clone, Default)]
pub struct ExportSet {
    pub attributes: Vec<AttributeDefinition>,
    pub contacts: Vec<Contact>,
    pub identities: Vec<Identity>,
    pub mime_types: Vec<MimeType>,
    pub folders: Vec<Folder>,
    pub messages: Vec<MessageRecord>,
    pub contents: Vec<MessageContent>,
    /// Message rows dropped at load because a column could not be decoded.
    pub unreadable_messages: usize,
}
