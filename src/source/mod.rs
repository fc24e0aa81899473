//! Reading the seven export tables from disk.
//!
//! An export directory holds one JSON array per table:
//!
//! | file                          | rows                  |
//! |-------------------------------|-----------------------|
//! | `attributeDefinitions.json`   | [`AttributeDefinition`] |
//! | `contacts.json`               | [`Contact`]           |
//! | `identities.json`             | [`Identity`]          |
//! | `ext_mimeTypes.json`          | [`MimeType`]          |
//! | `folderLocations.json`        | [`FolderLocation`]    |
//! | `messages.json`               | [`MessageRecord`]     |
//! | `messagesText_content.json`   | [`MessageContent`]    |

pub mod de;

use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{Result, SalvageError};
use crate::model::record::{
    AttributeDefinition, Contact, ExportSet, Folder, FolderLocation, Identity, MessageContent,
    MessageRecord, MimeType,
};

pub const ATTRIBUTES_FILE: &str = "attributeDefinitions.json";
pub const CONTACTS_FILE: &str = "contacts.json";
pub const IDENTITIES_FILE: &str = "identities.json";
pub const MIME_TYPES_FILE: &str = "ext_mimeTypes.json";
pub const FOLDERS_FILE: &str = "folderLocations.json";
pub const MESSAGES_FILE: &str = "messages.json";
pub const CONTENTS_FILE: &str = "messagesText_content.json";

/// Every table an export directory must provide.
pub const EXPORT_FILES: [&str; 7] = [
    ATTRIBUTES_FILE,
    CONTACTS_FILE,
    IDENTITIES_FILE,
    MIME_TYPES_FILE,
    FOLDERS_FILE,
    MESSAGES_FILE,
    CONTENTS_FILE,
];

/// Load all seven tables from `dir`.
///
/// A missing or undecodable table is fatal; nothing is salvaged from a
/// partial set of tables.
pub fn load_export(dir: &Path) -> Result<ExportSet> {
    if !dir.is_dir() {
        return Err(SalvageError::Source {
            path: dir.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }

    let attributes: Vec<AttributeDefinition> = load_table(dir, ATTRIBUTES_FILE)?;
    let contacts: Vec<Contact> = load_table(dir, CONTACTS_FILE)?;
    let identities: Vec<Identity> = load_table(dir, IDENTITIES_FILE)?;
    let mime_types: Vec<MimeType> = load_table(dir, MIME_TYPES_FILE)?;
    let locations: Vec<FolderLocation> = load_table(dir, FOLDERS_FILE)?;
    let (messages, unreadable_messages) = load_rows::<MessageRecord>(dir, MESSAGES_FILE)?;
    let contents: Vec<MessageContent> = load_table(dir, CONTENTS_FILE)?;

    let export = ExportSet {
        attributes,
        contacts,
        identities,
        mime_types,
        folders: assign_folder_ids(locations),
        messages,
        contents,
        unreadable_messages,
    };

    info!(
        path = %dir.display(),
        messages = export.messages.len(),
        folders = export.folders.len(),
        contacts = export.contacts.len(),
        unreadable = export.unreadable_messages,
        "Loaded export"
    );
    Ok(export)
}

/// Give every folder an explicit id. Rows without an `id` column take their
/// position in the table, which is how older dumps correlate `folderID`.
pub fn assign_folder_ids(locations: Vec<FolderLocation>) -> Vec<Folder> {
    locations
        .into_iter()
        .enumerate()
        .map(|(pos, loc)| Folder {
            id: loc.id.unwrap_or(pos as i64),
            uri: loc.folder_uri,
        })
        .collect()
}

fn load_table<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<Vec<T>> {
    let path = dir.join(name);
    let data = std::fs::read(&path).map_err(|e| SalvageError::Source {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    let rows: Vec<T> = serde_json::from_slice(&data).map_err(|e| SalvageError::Source {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    debug!(table = name, rows = rows.len(), "Decoded table");
    Ok(rows)
}

/// Decode a table row by row. Rows that do not decode are logged and
/// counted instead of failing the table; the file itself must still be a
/// JSON array.
fn load_rows<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<(Vec<T>, usize)> {
    let raw: Vec<serde_json::Value> = load_table(dir, name)?;
    let mut rows = Vec::with_capacity(raw.len());
    let mut unreadable = 0;
    for (pos, value) in raw.into_iter().enumerate() {
        match serde_json::from_value(value) {
            Ok(row) => rows.push(row),
            Err(e) => {
                warn!(table = name, row = pos, error = %e, "Skipping undecodable row");
                unreadable += 1;
            }
        }
    }
    Ok((rows, unreadable))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_minimal_export(dir: &Path) {
        for name in EXPORT_FILES {
            std::fs::write(dir.join(name), "[]").unwrap();
        }
    }

    #[test]
    fn test_load_empty_export() {
        let tmp = tempfile::tempdir().unwrap();
        write_minimal_export(tmp.path());
        let export = load_export(tmp.path()).unwrap();
        assert!(export.messages.is_empty());
        assert!(export.folders.is_empty());
    }

    #[test]
    fn test_missing_table_names_file() {
        let tmp = tempfile::tempdir().unwrap();
        write_minimal_export(tmp.path());
        std::fs::remove_file(tmp.path().join(IDENTITIES_FILE)).unwrap();
        let err = load_export(tmp.path()).unwrap_err();
        assert!(err.to_string().contains(IDENTITIES_FILE), "{err}");
    }

    #[test]
    fn test_corrupt_table_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        write_minimal_export(tmp.path());
        std::fs::write(tmp.path().join(MESSAGES_FILE), "[{").unwrap();
        assert!(matches!(
            load_export(tmp.path()),
            Err(SalvageError::Source { .. })
        ));
    }

    #[test]
    fn test_undecodable_message_rows_are_counted() {
        let tmp = tempfile::tempdir().unwrap();
        write_minimal_export(tmp.path());
        std::fs::write(
            tmp.path().join(MESSAGES_FILE),
            r#"[
                {"id": 1, "date": "100", "jsonAttributes": "{}"},
                {"id": 2, "date": "yesterday", "jsonAttributes": "{}"},
                {"id": "two", "date": 300, "jsonAttributes": "{}"},
                {"id": 4, "date": 400.5, "jsonAttributes": "{}"},
                {"id": 5, "date": 500, "jsonAttributes": "{}"}
            ]"#,
        )
        .unwrap();
        let export = load_export(tmp.path()).unwrap();
        let ids: Vec<i64> = export.messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 5]);
        assert_eq!(export.unreadable_messages, 3);
    }

    #[test]
    fn test_message_table_must_be_an_array() {
        let tmp = tempfile::tempdir().unwrap();
        write_minimal_export(tmp.path());
        std::fs::write(tmp.path().join(MESSAGES_FILE), r#"{"id": 1}"#).unwrap();
        assert!(matches!(
            load_export(tmp.path()),
            Err(SalvageError::Source { .. })
        ));
    }

    #[test]
    fn test_folder_ids_fall_back_to_position() {
        let locations = vec![
            FolderLocation {
                id: None,
                folder_uri: "imap://a@h/INBOX".to_string(),
            },
            FolderLocation {
                id: Some(9),
                folder_uri: "imap://a@h/Sent".to_string(),
            },
            FolderLocation {
                id: None,
                folder_uri: "imap://a@h/Trash".to_string(),
            },
        ];
        let folders = assign_folder_ids(locations);
        let ids: Vec<i64> = folders.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![0, 9, 2]);
    }
}
