//! `manifest.json`: one entry per written file with its SHA-256 digest.
//!
//! Entries are sorted by path, so two runs over the same export produce
//! the same manifest.

use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{Result, SalvageError};

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Path relative to the output root, `/`-separated.
    pub path: String,
    pub message_id: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Manifest {
    pub version: String,
    pub files: usize,
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            ..Default::default()
        }
    }

    /// Record a file written below `root` with its precomputed digest.
    pub fn record(&mut self, root: &Path, path: &Path, message_id: &str, sha256: String) {
        let relative = path.strip_prefix(root).unwrap_or(path);
        let path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        self.entries.push(ManifestEntry {
            path,
            message_id: message_id.to_string(),
            sha256,
        });
    }

    /// Sort and write to `<root>/manifest.json`.
    pub fn write(mut self, root: &Path) -> Result<()> {
        self.entries.sort_by(|a, b| a.path.cmp(&b.path));
        self.files = self.entries.len();
        let path = root.join(MANIFEST_FILE);
        let json = serde_json::to_vec_pretty(&self).map_err(|e| SalvageError::Write {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|e| SalvageError::io(&path, e))
    }
}

pub fn sha256_hex(contents: &[u8]) -> String {
    format!("{:x}", Sha256::digest(contents))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_entries_sorted_and_relative() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let mut manifest = Manifest::new();
        manifest.record(root, &root.join("b").join("2.eml"), "2", sha256_hex(b"two"));
        manifest.record(root, &root.join("a").join("1.eml"), "1", sha256_hex(b"one"));
        manifest.write(root).unwrap();

        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(root.join(MANIFEST_FILE)).unwrap()).unwrap();
        assert_eq!(json["files"], 2);
        assert_eq!(json["entries"][0]["path"], "a/1.eml");
        assert_eq!(json["entries"][1]["message_id"], "2");
    }
}
