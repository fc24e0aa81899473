//! Header assembly and body decoration.

use chrono::{DateTime, Utc};

use crate::model::address::join_mailboxes;
use crate::model::message::HeaderSet;

use super::attributes::AttachmentInfo;

pub const MIME_VERSION: &str = "1.0";
pub const CONTENT_TYPE: &str = "text/plain; charset=utf-8; format=flowed";
pub const CONTENT_TRANSFER_ENCODING: &str = "8bit";

/// Line closing the attachment block at the top of a body.
pub const ATTACHMENT_SEPARATOR: &str = "-------------";

/// Everything the header block is made of, already resolved to text.
#[derive(Debug, Clone, Default)]
pub struct HeaderParts<'a> {
    pub from: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub message_id: &'a str,
    pub subject: &'a str,
    pub date: DateTime<Utc>,
    pub user_agent: &'a str,
    pub in_reply_to: Option<&'a str>,
}

/// Convert a microsecond timestamp to whole seconds.
///
/// Returns `None` outside the range chrono can represent.
pub fn timestamp_to_date(micros: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(micros.div_euclid(1_000_000), 0)
}

/// RFC 5322 date, e.g. `Tue, 27 Sep 2016 18:13:20 +0000`.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S %z").to_string()
}

/// Build the header block in its fixed order.
///
/// `Cc` and `Bcc` are both emitted only when the cc list is non-empty; a
/// message with only blind recipients gets neither header.
pub fn assemble_headers(parts: &HeaderParts<'_>) -> HeaderSet {
    let mut headers = HeaderSet::new();
    headers.push("From", parts.from.as_str());
    headers.push("To", join_mailboxes(&parts.to));
    headers.push("Message-ID", format!("<{}>", parts.message_id));
    headers.push("Subject", parts.subject);
    headers.push("Date", format_date(&parts.date));
    headers.push("User-Agent", parts.user_agent);
    headers.push("MIME-Version", MIME_VERSION);
    headers.push("Content-Type", CONTENT_TYPE);
    headers.push("Content-Transfer-Encoding", CONTENT_TRANSFER_ENCODING);
    if !parts.cc.is_empty() {
        headers.push("Cc", join_mailboxes(&parts.cc));
        headers.push("Bcc", join_mailboxes(&parts.bcc));
    }
    if let Some(parent) = parts.in_reply_to {
        headers.push("In-Reply-To", parent);
    }
    headers
}

/// Text block listing the declared attachments, or `None` if there are none.
///
/// The type is the raw type id from the attribute blob, not the MIME name.
pub fn attachment_placeholder(infos: &[AttachmentInfo]) -> Option<String> {
    if infos.is_empty() {
        return None;
    }
    let mut block = infos
        .iter()
        .map(|i| {
            format!(
                "Original Attachment: Type: {}; FileName: \"{}\"",
                i.type_id, i.filename
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    block.push('\n');
    block.push_str(ATTACHMENT_SEPARATOR);
    block.push('\n');
    Some(block)
}
