//! Folder materialization: folder URI → directory under the output root.
//!
//! Folder URIs look like `imap://user@host/INBOX/Sub%20Folder`. The scheme
//! is dropped and the `user@` part becomes a directory, so every account of
//! a profile gets its own subtree. Identical paths from different accounts
//! that share a user name end up merged.

use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use percent_encoding::percent_decode_str;
use tracing::{debug, info};

use crate::error::{Result, SalvageError};
use crate::model::record::Folder;

/// Bucket for messages whose folder id matches no folder row.
pub const NO_FOLDER: &str = "no-folder";

/// Characters a URI decoder leaves percent-encoded.
const RESERVED: &[u8] = b";/?:@&=+$,#";

/// A folder whose directory exists on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedFolder {
    pub id: i64,
    pub uri: String,
    pub path: PathBuf,
}

/// Turn a folder URI into a path relative to the output root.
///
/// With `strip_host`, the segment right after the user (the server name)
/// is dropped too.
pub fn normalize_folder_uri(uri: &str, strip_host: bool) -> PathBuf {
    let decoded = decode_uri(uri);
    let (user, rest) = split_scheme(&decoded);

    let mut segments: Vec<&str> = Vec::new();
    let mut rest_segments = rest.split('/').filter(|s| is_plain_segment(s));
    if let Some(user) = user {
        segments.extend(user.split('/').filter(|s| is_plain_segment(s)));
        if strip_host {
            rest_segments.next();
        }
    }
    segments.extend(rest_segments);

    segments
        .into_iter()
        .map(|s| s.replace("%40", "_at_"))
        .collect()
}

/// Create the directory of one folder.
pub async fn materialize(folder: &Folder, root: &Path, strip_host: bool) -> Result<MaterializedFolder> {
    let path = root.join(normalize_folder_uri(&folder.uri, strip_host));
    debug!(id = folder.id, path = %path.display(), "Creating folder");
    tokio::fs::create_dir_all(&path)
        .await
        .map_err(|e| SalvageError::io(&path, e))?;
    Ok(MaterializedFolder {
        id: folder.id,
        uri: folder.uri.clone(),
        path,
    })
}

/// Create the directories of all folders concurrently, plus the
/// [`NO_FOLDER`] bucket.
///
/// Returns once every directory exists; the first failure aborts the run.
pub async fn materialize_all(
    folders: &[Folder],
    root: &Path,
    strip_host: bool,
) -> Result<Vec<MaterializedFolder>> {
    let no_folder = root.join(NO_FOLDER);
    tokio::fs::create_dir_all(&no_folder)
        .await
        .map_err(|e| SalvageError::io(&no_folder, e))?;

    let materialized =
        try_join_all(folders.iter().map(|f| materialize(f, root, strip_host))).await?;
    info!(count = materialized.len(), root = %root.display(), "Folders materialized");
    Ok(materialized)
}

/// Percent-decode everything except escapes of reserved characters.
///
/// `%40` in `imap://bob%40example.com@host/` therefore survives decoding,
/// which keeps it apart from the real user/host separator.
fn decode_uri(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Some(b) = hex_pair(bytes[i + 1], bytes[i + 2]) {
                if RESERVED.contains(&b) {
                    out.push_str(&percent_decode_str(&input[start..i]).decode_utf8_lossy());
                    out.push_str(&input[i..i + 3]);
                    i += 3;
                    start = i;
                    continue;
                }
            }
        }
        i += 1;
    }
    out.push_str(&percent_decode_str(&input[start..]).decode_utf8_lossy());
    out
}

fn hex_pair(hi: u8, lo: u8) -> Option<u8> {
    let hi = (hi as char).to_digit(16)?;
    let lo = (lo as char).to_digit(16)?;
    Some((hi * 16 + lo) as u8)
}

/// Split `scheme://user@rest` into `(Some(user), rest)`, or
/// `scheme://rest` into `(None, rest)`. Strings without a scheme pass through.
fn split_scheme(uri: &str) -> (Option<&str>, &str) {
    let Some(pos) = uri.find("://") else {
        return (None, uri);
    };
    let scheme = &uri[..pos];
    if scheme.is_empty() || !scheme.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return (None, uri);
    }
    let rest = &uri[pos + 3..];
    match rest.find('@') {
        Some(at) if at > 0 => (Some(&rest[..at]), &rest[at + 1..]),
        _ => (None, rest),
    }
}

fn is_plain_segment(s: &str) -> bool {
    !s.is_empty() && s != "." && s != ".."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_segment_becomes_directory() {
        assert_eq!(
            normalize_folder_uri("imap://alice@mail.example.com/INBOX", false),
            PathBuf::from("alice/mail.example.com/INBOX")
        );
    }

    #[test]
    fn test_strip_host() {
        assert_eq!(
            normalize_folder_uri("imap://alice@mail.example.com/INBOX", true),
            PathBuf::from("alice/INBOX")
        );
    }

    #[test]
    fn test_decodes_spaces_but_keeps_at_escape() {
        assert_eq!(
            normalize_folder_uri("mailbox://nobody@Local%20Folders/Inbox", false),
            PathBuf::from("nobody/Local Folders/Inbox")
        );
        assert_eq!(
            normalize_folder_uri("imap://bob%40example.com@imap.example.com/Sent", false),
            PathBuf::from("bob_at_example.com/imap.example.com/Sent")
        );
    }

    #[test]
    fn test_scheme_without_user() {
        assert_eq!(
            normalize_folder_uri("news://news.example.org/comp.lang.rust", false),
            PathBuf::from("news.example.org/comp.lang.rust")
        );
    }

    #[test]
    fn test_dot_segments_cannot_escape_root() {
        assert_eq!(
            normalize_folder_uri("imap://eve@host/../../etc", false),
            PathBuf::from("eve/host/etc")
        );
    }

    #[test]
    fn test_decode_uri_non_ascii() {
        assert_eq!(decode_uri("Entr%C3%A9e"), "Entrée");
        assert_eq!(decode_uri("a%2Fb"), "a%2Fb");
        assert_eq!(decode_uri("trailing%4"), "trailing%4");
    }

    #[tokio::test]
    async fn test_materialize_all_creates_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let folders = vec![
            Folder {
                id: 1,
                uri: "imap://alice@mail.example.com/INBOX".to_string(),
            },
            Folder {
                id: 2,
                uri: "imap://alice@mail.example.com/INBOX/Archive".to_string(),
            },
        ];
        let out = materialize_all(&folders, tmp.path(), true).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].path, tmp.path().join("alice").join("INBOX"));
        assert!(out[1].path.is_dir());
        assert!(tmp.path().join(NO_FOLDER).is_dir());

        // Idempotent
        let again = materialize_all(&folders, tmp.path(), true).await.unwrap();
        assert_eq!(again, out);
    }

    #[tokio::test]
    async fn test_materialize_fails_when_root_is_a_file() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("occupied");
        std::fs::write(&root, b"x").unwrap();
        let folders = vec![Folder {
            id: 1,
            uri: "imap://a@h/INBOX".to_string(),
        }];
        assert!(matches!(
            materialize_all(&folders, &root, false).await,
            Err(SalvageError::Io { .. })
        ));
    }
}
