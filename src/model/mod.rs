//! Data model: export rows, resolved mailboxes and rebuilt messages.

pub mod address;
pub mod message;
pub mod record;
