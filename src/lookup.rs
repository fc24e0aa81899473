//! Lookup tables used to dereference surrogate keys.
//!
//! All builders are pure and linear in their input. Duplicate ids resolve
//! last-write-wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::folder::{MaterializedFolder, NO_FOLDER};
use crate::model::address::Mailbox;
use crate::model::record::{AttributeDefinition, Contact, ExportSet, Identity, MimeType};

/// Folder id → directory, with the bucket for unmatched ids.
#[derive(Debug, Clone, Default)]
pub struct FolderTable {
    paths: HashMap<i64, PathBuf>,
    fallback: PathBuf,
}

impl FolderTable {
    /// Directory of a folder id, or the [`NO_FOLDER`] bucket.
    pub fn resolve(&self, folder_id: Option<i64>) -> &Path {
        folder_id
            .and_then(|id| self.paths.get(&id))
            .map(PathBuf::as_path)
            .unwrap_or(self.fallback.as_path())
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// The four tables the reconstructor reads from.
#[derive(Debug, Clone, Default)]
pub struct LookupTables {
    pub attributes: HashMap<i64, String>,
    pub contacts: HashMap<i64, Mailbox>,
    pub mime_types: HashMap<i64, String>,
    pub folders: FolderTable,
}

impl LookupTables {
    /// Build every table from an export and its materialized folders.
    pub fn build(export: &ExportSet, folders: &[MaterializedFolder], root: &Path) -> Self {
        Self {
            attributes: attribute_table(&export.attributes),
            contacts: contact_table(&export.contacts, &export.identities),
            mime_types: mime_type_table(&export.mime_types),
            folders: folder_table(folders, root),
        }
    }
}

/// Attribute id → attribute name.
pub fn attribute_table(rows: &[AttributeDefinition]) -> HashMap<i64, String> {
    rows.iter().map(|a| (a.id, a.name.clone())).collect()
}

/// Contact id → name and first email identity.
///
/// When a contact has several email identities the first one in table
/// order is used. Contacts without any get an empty address.
pub fn contact_table(contacts: &[Contact], identities: &[Identity]) -> HashMap<i64, Mailbox> {
    let mut first_email: HashMap<i64, &str> = HashMap::new();
    for identity in identities.iter().filter(|i| i.is_email()) {
        first_email
            .entry(identity.contact_id)
            .or_insert(identity.value.as_str());
    }

    contacts
        .iter()
        .map(|c| {
            let email = first_email.get(&c.id).copied().unwrap_or_default();
            (c.id, Mailbox::new(c.name.clone(), email))
        })
        .collect()
}

/// MIME type id → MIME type name.
pub fn mime_type_table(rows: &[MimeType]) -> HashMap<i64, String> {
    rows.iter().map(|m| (m.id, m.mime_type.clone())).collect()
}

/// Folder id → materialized directory; unmatched ids go to `<root>/no-folder`.
pub fn folder_table(folders: &[MaterializedFolder], root: &Path) -> FolderTable {
    FolderTable {
        paths: folders.iter().map(|f| (f.id, f.path.clone())).collect(),
        fallback: root.join(NO_FOLDER),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(contact_id: i64, kind: &str, value: &str) -> Identity {
        Identity {
            contact_id,
            kind: kind.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_contact_first_email_wins() {
        let contacts = vec![Contact {
            id: 1,
            name: "Alice".to_string(),
        }];
        let identities = vec![
            identity(1, "twitter", "@alice"),
            identity(1, "email", "alice@first.example"),
            identity(1, "email", "alice@second.example"),
        ];
        let table = contact_table(&contacts, &identities);
        assert_eq!(table[&1], Mailbox::new("Alice", "alice@first.example"));
    }

    #[test]
    fn test_contact_without_email() {
        let contacts = vec![Contact {
            id: 2,
            name: "Bob".to_string(),
        }];
        let table = contact_table(&contacts, &[identity(3, "email", "someone@else")]);
        assert_eq!(table[&2].display(), "Bob <>");
    }

    #[test]
    fn test_duplicate_ids_last_write_wins() {
        let rows = vec![
            MimeType {
                id: 7,
                mime_type: "text/plain".to_string(),
            },
            MimeType {
                id: 7,
                mime_type: "application/pdf".to_string(),
            },
        ];
        assert_eq!(mime_type_table(&rows)[&7], "application/pdf");
    }

    #[test]
    fn test_attribute_table() {
        let rows = vec![
            AttributeDefinition {
                id: 50,
                name: "from".to_string(),
            },
            AttributeDefinition {
                id: 51,
                name: "to".to_string(),
            },
        ];
        let table = attribute_table(&rows);
        assert_eq!(table.len(), 2);
        assert_eq!(table[&51], "to");
    }

    #[test]
    fn test_folder_table_fallback() {
        let root = Path::new("/out");
        let folders = vec![MaterializedFolder {
            id: 4,
            uri: "imap://a@h/INBOX".to_string(),
            path: root.join("a/h/INBOX"),
        }];
        let table = folder_table(&folders, root);
        assert_eq!(table.resolve(Some(4)), Path::new("/out/a/h/INBOX"));
        assert_eq!(table.resolve(Some(5)), Path::new("/out/no-folder"));
        assert_eq!(table.resolve(None), Path::new("/out/no-folder"));
    }
}
