//! Writing rebuilt messages: `.eml` serialization, background writes and
//! the optional digest manifest.

pub mod eml;
pub mod manifest;
pub mod writer;
