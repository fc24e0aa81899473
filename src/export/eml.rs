//! Serialization of rebuilt messages as `.eml` files.
//!
//! Output is RFC 5322 shaped: `Name: value` header lines folded at 78
//! columns, CRLF line endings, a blank line, then the body.

use crate::model::message::{HeaderSet, ResolvedMessage};

/// Recommended maximum header line length, excluding CRLF.
const FOLD_WIDTH: usize = 78;

/// Characters removed from a Message-ID before it becomes a filename.
const FORBIDDEN_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Longest filename stem, in bytes. Leaves room for a `_n` suffix and
/// `.eml` within the usual 255-byte name limit.
const MAX_STEM_BYTES: usize = 200;

/// Filename for a message: its sanitized id, or the sequence number when
/// nothing usable is left, plus `.eml`.
pub fn message_filename(message_id: &str, sequence: u64) -> String {
    let stem = sanitize_message_id(message_id);
    if stem.is_empty() {
        format!("{sequence}.eml")
    } else {
        format!("{stem}.eml")
    }
}

/// Strip ``< > : " / \ | ? *`` and control characters from a Message-ID,
/// then cut it to at most `MAX_STEM_BYTES` on a char boundary.
pub fn sanitize_message_id(message_id: &str) -> String {
    let mut stem: String = message_id
        .chars()
        .filter(|c| !FORBIDDEN_FILENAME_CHARS.contains(c) && !c.is_control())
        .collect();
    if stem.len() > MAX_STEM_BYTES {
        let mut end = MAX_STEM_BYTES;
        while !stem.is_char_boundary(end) {
            end -= 1;
        }
        stem.truncate(end);
    }
    stem
}

/// Full file content of a message.
pub fn render_eml(message: &ResolvedMessage) -> Vec<u8> {
    let mut out = render_headers(&message.headers);
    out.push_str("\r\n");
    out.push_str(&normalize_line_endings(&message.body));
    out.into_bytes()
}

/// Header block, each field terminated by CRLF.
pub fn render_headers(headers: &HeaderSet) -> String {
    let mut out = String::new();
    for (name, value) in headers.iter() {
        out.push_str(&fold_header(name, &single_line(value)));
        out.push_str("\r\n");
    }
    out
}

/// Fold `Name: value` at whitespace so lines stay within [`FOLD_WIDTH`]
/// where possible. Words longer than a line are left intact.
fn fold_header(name: &str, value: &str) -> String {
    let mut out = String::new();
    let mut line = format!("{name}:");
    let mut line_has_word = false;
    for word in value.split(' ') {
        if line_has_word && !word.is_empty() && line.len() + 1 + word.len() > FOLD_WIDTH {
            out.push_str(&line);
            out.push_str("\r\n");
            line.clear();
        }
        line.push(' ');
        line.push_str(word);
        if !word.is_empty() {
            line_has_word = true;
        }
    }
    out.push_str(&line);
    out
}

/// Header values must not contain line breaks.
fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

fn normalize_line_endings(body: &str) -> String {
    body.replace("\r\n", "\n").replace('\r', "\n").replace('\n', "\r\n")
}
