//! Message reconstruction: export rows → complete internet messages.
//!
//! Messages must be fed in ascending date order. Two pieces of state depend
//! on it:
//!
//! - the sequence number, which stands in for a lost `Message-ID`, and
//! - the [`ThreadState`], which derives `In-Reply-To` from the previous
//!   message of the same conversation.
//!
//! [`order_messages`] produces a valid input; [`Reconstructor::reconstruct_all`]
//! checks the order again and re-sorts if a caller got it wrong.

pub mod attributes;
pub mod headers;
pub mod thread;

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{ResolutionPolicy, DEFAULT_USER_AGENT};
use crate::error::{ResolutionError, Result};
use crate::export::eml::message_filename;
use crate::lookup::LookupTables;
use crate::model::address::Mailbox;
use crate::model::message::ResolvedMessage;
use crate::model::record::{MessageContent, MessageRecord};

use attributes::resolve_attributes;
use headers::{assemble_headers, attachment_placeholder, timestamp_to_date, HeaderParts};
pub use thread::ThreadState;

/// Knobs of the reconstruction loop.
#[derive(Debug, Clone)]
pub struct ReconstructOptions {
    pub user_agent: String,
    pub policy: ResolutionPolicy,
}

impl Default for ReconstructOptions {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            policy: ResolutionPolicy::FailFast,
        }
    }
}

/// Salvageable messages in processing order.
#[derive(Debug, Clone, Default)]
pub struct OrderedMessages {
    pub messages: Vec<MessageRecord>,
    /// Rows dropped because their attribute blob was empty.
    pub excluded: usize,
}

/// A message left out under [`ResolutionPolicy::Skip`].
#[derive(Debug, Clone, Serialize)]
pub struct SkippedMessage {
    pub record_id: i64,
    pub sequence: u64,
    pub reason: String,
}

/// Counters of one reconstruction pass.
#[derive(Debug, Clone, Default)]
pub struct ReconstructOutcome {
    pub resolved: usize,
    pub replies: usize,
    pub excluded: usize,
    pub skipped: Vec<SkippedMessage>,
}

impl ReconstructOutcome {
    /// Fold the counters of a later pass into this one.
    pub fn absorb(&mut self, later: ReconstructOutcome) {
        self.resolved += later.resolved;
        self.replies += later.replies;
        self.excluded += later.excluded;
        self.skipped.extend(later.skipped);
    }
}

/// Drop unsalvageable rows and sort the rest by date (stable).
pub fn order_messages(messages: Vec<MessageRecord>) -> OrderedMessages {
    let total = messages.len();
    let mut kept: Vec<MessageRecord> = messages
        .into_iter()
        .filter(MessageRecord::is_salvageable)
        .collect();
    kept.sort_by_key(|m| m.date);
    OrderedMessages {
        excluded: total - kept.len(),
        messages: kept,
    }
}

/// Whether `messages` is non-decreasing by date.
pub fn is_date_ordered(messages: &[MessageRecord]) -> bool {
    messages.windows(2).all(|w| w[0].date <= w[1].date)
}

/// Resolves messages one at a time, carrying the conversation state.
pub struct Reconstructor<'a> {
    tables: &'a LookupTables,
    contents: HashMap<i64, &'a MessageContent>,
    threads: ThreadState,
    options: ReconstructOptions,
    next_sequence: u64,
}

impl<'a> Reconstructor<'a> {
    pub fn new(
        tables: &'a LookupTables,
        contents: &'a [MessageContent],
        options: ReconstructOptions,
    ) -> Self {
        let mut by_docid: HashMap<i64, &'a MessageContent> = HashMap::with_capacity(contents.len());
        for content in contents {
            by_docid.entry(content.docid).or_insert(content);
        }
        Self {
            tables,
            contents: by_docid,
            threads: ThreadState::new(),
            options,
            next_sequence: 0,
        }
    }

    /// Conversation state accumulated so far.
    pub fn threads(&self) -> &ThreadState {
        &self.threads
    }

    /// Resolve the next message in processing order.
    ///
    /// Every call consumes a sequence number. The conversation state only
    /// moves forward when the message resolves.
    pub fn reconstruct(
        &mut self,
        record: &MessageRecord,
    ) -> std::result::Result<ResolvedMessage, ResolutionError> {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        debug!(sequence, record = record.id, "Processing message");

        let message = self.resolve(record, sequence)?;
        if let Some(conversation) = record.conversation_id {
            self.threads
                .advance(conversation, message.message_id.clone());
        }
        Ok(message)
    }

    /// Resolve a date-ordered sequence, handing each message to `emit`.
    ///
    /// Unresolvable messages abort the pass or are skipped, depending on the
    /// configured policy. Errors returned by `emit` always abort.
    pub fn reconstruct_all<F>(
        &mut self,
        messages: &[MessageRecord],
        mut emit: F,
    ) -> Result<ReconstructOutcome>
    where
        F: FnMut(ResolvedMessage) -> Result<()>,
    {
        let reordered: Vec<MessageRecord>;
        let messages = if is_date_ordered(messages) {
            messages
        } else {
            warn!("Messages are not in date order; sorting before reconstruction");
            let mut sorted = messages.to_vec();
            sorted.sort_by_key(|m| m.date);
            reordered = sorted;
            &reordered
        };

        let mut outcome = ReconstructOutcome::default();
        for record in messages {
            if !record.is_salvageable() {
                outcome.excluded += 1;
                continue;
            }
            let sequence = self.next_sequence;
            match self.reconstruct(record) {
                Ok(message) => {
                    outcome.resolved += 1;
                    if message.in_reply_to.is_some() {
                        outcome.replies += 1;
                    }
                    emit(message)?;
                }
                Err(e) => match self.options.policy {
                    ResolutionPolicy::FailFast => return Err(e.into()),
                    ResolutionPolicy::Skip => {
                        warn!(sequence, record = record.id, error = %e, "Skipping message");
                        outcome.skipped.push(SkippedMessage {
                            record_id: record.id,
                            sequence,
                            reason: e.to_string(),
                        });
                    }
                },
            }
        }
        Ok(outcome)
    }

    fn resolve(
        &self,
        record: &MessageRecord,
        sequence: u64,
    ) -> std::result::Result<ResolvedMessage, ResolutionError> {
        let message_id = record
            .header_message_id
            .clone()
            .unwrap_or_else(|| sequence.to_string());
        let in_reply_to = record
            .conversation_id
            .and_then(|c| self.threads.previous(c))
            .map(str::to_string);

        let attrs = resolve_attributes(record.id, &record.json_attributes, &self.tables.attributes)?;
        let from = self.mailbox(record.id, attrs.id("from")?)?.display();
        let to = self.mailboxes(record.id, &attrs.ids("to")?)?;
        let cc = self.mailboxes(record.id, &attrs.ids("cc")?)?;
        let bcc = self.mailboxes(record.id, &attrs.ids("bcc")?)?;
        let attachment_types = attrs
            .ids("attachmentTypes")?
            .into_iter()
            .map(|id| {
                self.tables.mime_types.get(&id).cloned().ok_or(
                    ResolutionError::UnknownMimeType {
                        message: record.id,
                        mime_type: id,
                    },
                )
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let empty = MessageContent::default();
        let content = self.contents.get(&record.id).copied().unwrap_or(&empty);

        let mut body = attachment_placeholder(&attrs.attachment_infos()?).unwrap_or_default();
        body.push_str(&content.body);

        let date = timestamp_to_date(record.date).ok_or(ResolutionError::InvalidDate {
            message: record.id,
            micros: record.date,
        })?;

        let headers = assemble_headers(&HeaderParts {
            from,
            to,
            cc,
            bcc,
            message_id: &message_id,
            subject: &content.subject,
            date,
            user_agent: &self.options.user_agent,
            in_reply_to: in_reply_to.as_deref(),
        });

        let target = self
            .tables
            .folders
            .resolve(record.folder_id)
            .join(message_filename(&message_id, sequence));

        Ok(ResolvedMessage {
            record_id: record.id,
            sequence,
            message_id,
            in_reply_to,
            attachment_types,
            headers,
            body,
            target,
        })
    }

    fn mailbox(&self, message: i64, contact: i64) -> std::result::Result<&Mailbox, ResolutionError> {
        self.tables
            .contacts
            .get(&contact)
            .ok_or(ResolutionError::UnknownContact { message, contact })
    }

    fn mailboxes(
        &self,
        message: i64,
        contacts: &[i64],
    ) -> std::result::Result<Vec<String>, ResolutionError> {
        contacts
            .iter()
            .map(|&c| self.mailbox(message, c).map(Mailbox::display))
            .collect()
    }
}
