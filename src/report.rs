//! Run reports and pre-flight analysis of an export.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::lookup::{attribute_table, mime_type_table};
use crate::model::record::ExportSet;
use crate::reconstruct::attributes::resolve_attributes;
use crate::reconstruct::headers::timestamp_to_date;
use crate::reconstruct::SkippedMessage;

/// What a `recover` run did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub output_root: PathBuf,
    pub folders: usize,
    pub messages_read: usize,
    /// Rows dropped because they could not be decoded or their attribute
    /// blob was empty.
    pub excluded: usize,
    pub written: usize,
    pub skipped: Vec<SkippedMessage>,
    /// Messages that received an `In-Reply-To` header.
    pub replies: usize,
    pub conversations: usize,
    /// Files that got a numeric suffix because their name was taken.
    pub renamed: usize,
    pub bytes_written: u64,
    pub elapsed_ms: u128,
    pub manifest: Option<PathBuf>,
}

/// Row counts of the seven tables.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct TableCounts {
    pub attributes: usize,
    pub contacts: usize,
    pub identities: usize,
    pub mime_types: usize,
    pub folders: usize,
    pub messages: usize,
    pub contents: usize,
}

/// Read-only assessment of how much of an export can be salvaged.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportStats {
    pub tables: TableCounts,
    pub salvageable: usize,
    pub excluded: usize,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
    pub conversations: usize,
    /// Salvageable messages whose original `Message-ID` is lost.
    pub without_message_id: usize,
    /// Salvageable messages without a text content row.
    pub without_content: usize,
    /// Salvageable messages that will land in `no-folder`.
    pub without_folder: usize,
    pub malformed_attributes: usize,
    /// Contact ids referenced by messages but absent from the contacts table.
    pub dangling_contacts: Vec<i64>,
    /// MIME type ids referenced by messages but absent from the MIME table.
    pub dangling_mime_types: Vec<i64>,
}

/// Inspect an export without touching the filesystem.
pub fn analyze(export: &ExportSet) -> ExportStats {
    let attributes = attribute_table(&export.attributes);
    let mime_types = mime_type_table(&export.mime_types);
    let contacts: HashSet<i64> = export.contacts.iter().map(|c| c.id).collect();
    let folders: HashSet<i64> = export.folders.iter().map(|f| f.id).collect();
    let contents: HashSet<i64> = export.contents.iter().map(|c| c.docid).collect();

    let mut stats = ExportStats {
        tables: TableCounts {
            attributes: export.attributes.len(),
            contacts: export.contacts.len(),
            identities: export.identities.len(),
            mime_types: export.mime_types.len(),
            folders: export.folders.len(),
            messages: export.messages.len() + export.unreadable_messages,
            contents: export.contents.len(),
        },
        excluded: export.unreadable_messages,
        ..Default::default()
    };

    let mut conversations: HashSet<i64> = HashSet::new();
    let mut dangling_contacts: HashSet<i64> = HashSet::new();
    let mut dangling_mime: HashSet<i64> = HashSet::new();
    let mut date_range: Option<(i64, i64)> = None;

    for message in &export.messages {
        if !message.is_salvageable() {
            stats.excluded += 1;
            continue;
        }
        stats.salvageable += 1;

        date_range = Some(match date_range {
            None => (message.date, message.date),
            Some((lo, hi)) => (lo.min(message.date), hi.max(message.date)),
        });
        if let Some(c) = message.conversation_id {
            conversations.insert(c);
        }
        if message.header_message_id.is_none() {
            stats.without_message_id += 1;
        }
        if !contents.contains(&message.id) {
            stats.without_content += 1;
        }
        if !message.folder_id.is_some_and(|id| folders.contains(&id)) {
            stats.without_folder += 1;
        }

        let Ok(attrs) = resolve_attributes(message.id, &message.json_attributes, &attributes)
        else {
            stats.malformed_attributes += 1;
            continue;
        };
        let mut referenced: Vec<i64> = attrs.id("from").into_iter().collect();
        for field in ["to", "cc", "bcc"] {
            referenced.extend(attrs.ids(field).unwrap_or_default());
        }
        dangling_contacts.extend(referenced.into_iter().filter(|id| !contacts.contains(id)));
        dangling_mime.extend(
            attrs
                .ids("attachmentTypes")
                .unwrap_or_default()
                .into_iter()
                .filter(|id| !mime_types.contains_key(id)),
        );
    }

    if let Some((lo, hi)) = date_range {
        stats.oldest = timestamp_to_date(lo);
        stats.newest = timestamp_to_date(hi);
    }
    stats.conversations = conversations.len();
    stats.dangling_contacts = sorted(dangling_contacts);
    stats.dangling_mime_types = sorted(dangling_mime);
    stats
}

fn sorted(ids: HashSet<i64>) -> Vec<i64> {
    let mut ids: Vec<i64> = ids.into_iter().collect();
    ids.sort_unstable();
    ids
}

/// Top senders by message count, most frequent first.
pub fn top_senders(export: &ExportSet, limit: usize) -> Vec<(String, usize)> {
    let attributes = attribute_table(&export.attributes);
    let names: HashMap<i64, &str> = export
        .contacts
        .iter()
        .map(|c| (c.id, c.name.as_str()))
        .collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for message in export.messages.iter().filter(|m| m.is_salvageable()) {
        let Ok(attrs) = resolve_attributes(message.id, &message.json_attributes, &attributes)
        else {
            continue;
        };
        if let Some(name) = attrs.id("from").ok().and_then(|id| names.get(&id).copied()) {
            *counts.entry(name).or_default() += 1;
        }
    }

    let mut sorted: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted.truncate(limit);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record::{
        AttributeDefinition, Contact, Folder, MessageContent, MessageRecord, MimeType,
    };

    fn export() -> ExportSet {
        let msg = |id: i64, date: i64, blob: &str, folder: Option<i64>| MessageRecord {
            id,
            date,
            conversation_id: Some(id % 2),
            folder_id: folder,
            header_message_id: (id != 3).then(|| format!("m{id}")),
            json_attributes: blob.to_string(),
        };
        ExportSet {
            attributes: vec![
                AttributeDefinition {
                    id: 1,
                    name: "from".to_string(),
                },
                AttributeDefinition {
                    id: 2,
                    name: "to".to_string(),
                },
                AttributeDefinition {
                    id: 3,
                    name: "attachmentTypes".to_string(),
                },
            ],
            contacts: vec![
                Contact {
                    id: 10,
                    name: "Alice".to_string(),
                },
                Contact {
                    id: 11,
                    name: "Bob".to_string(),
                },
            ],
            mime_types: vec![MimeType {
                id: 7,
                mime_type: "application/pdf".to_string(),
            }],
            folders: vec![Folder {
                id: 1,
                uri: "imap://a@h/INBOX".to_string(),
            }],
            messages: vec![
                msg(1, 300, r#"{"1": 10, "2": [11]}"#, Some(1)),
                msg(2, 100, r#"{"1": 10, "2": [99], "3": [7, 8]}"#, Some(1)),
                msg(3, 200, r#"{"1": 11}"#, Some(5)),
                msg(4, 50, "", Some(1)),
                msg(5, 400, "{broken", None),
            ],
            contents: vec![MessageContent {
                docid: 1,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_analyze_counts() {
        let stats = analyze(&export());
        assert_eq!(stats.tables.messages, 5);
        assert_eq!(stats.salvageable, 4);
        assert_eq!(stats.excluded, 1);
        assert_eq!(stats.without_message_id, 1);
        assert_eq!(stats.without_content, 3);
        assert_eq!(stats.without_folder, 2);
        assert_eq!(stats.malformed_attributes, 1);
        assert_eq!(stats.conversations, 2);
        assert_eq!(stats.dangling_contacts, vec![99]);
        assert_eq!(stats.dangling_mime_types, vec![8]);
        assert_eq!(stats.oldest, timestamp_to_date(100));
        assert_eq!(stats.newest, timestamp_to_date(400));
    }

    #[test]
    fn test_unreadable_rows_count_as_excluded() {
        let export = ExportSet {
            unreadable_messages: 2,
            ..export()
        };
        let stats = analyze(&export);
        assert_eq!(stats.tables.messages, 7);
        assert_eq!(stats.excluded, 3);
        assert_eq!(stats.salvageable, 4);
    }

    #[test]
    fn test_top_senders() {
        let top = top_senders(&export(), 10);
        assert_eq!(top, vec![("Alice".to_string(), 2), ("Bob".to_string(), 1)]);
    }
}
