//! `mailsalvage`: rebuild `.eml` files from a mail client's message
//! database export.
//!
//! The export is a set of flat tables (messages, contacts, identities,
//! folders, attribute definitions, MIME types, text contents). This crate
//! joins them back into RFC 5322 messages, one file per message, laid out
//! in a directory tree that mirrors the original folders. Attachment
//! payloads are not recoverable; their names and type ids are listed at
//! the top of each body.

pub mod config;
pub mod error;
pub mod export;
pub mod folder;
pub mod lookup;
pub mod model;
pub mod pipeline;
pub mod reconstruct;
pub mod report;
pub mod source;
