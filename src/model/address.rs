//! Mailbox rendering for address headers.

/// A contact resolved to its display name and first email identity.
///
/// # Examples
/// - `{name: "Alice", email: "alice@example.com"}` → `"Alice <alice@example.com>"`
/// - `{name: "Bob", email: ""}` → `"Bob <>"`
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Mailbox {
    /// Contact name as stored in the export (may be empty).
    pub name: String,
    /// First email identity of the contact, or empty.
    pub email: String,
}

impl Mailbox {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Format as `"Name <email>"`.
    ///
    /// The angle brackets are always emitted, even for an empty address, so
    /// that a contact without an email identity still shows up in the header.
    pub fn display(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }
}

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Join rendered mailboxes the way address headers list them.
pub fn join_mailboxes(list: &[String]) -> String {
    list.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_email() {
        let m = Mailbox::new("Alice", "alice@example.com");
        assert_eq!(m.display(), "Alice <alice@example.com>");
    }

    #[test]
    fn test_display_without_email() {
        let m = Mailbox::new("Bob", "");
        assert_eq!(m.display(), "Bob <>");
        assert_eq!(m.to_string(), "Bob <>");
    }

    #[test]
    fn test_join_keeps_order_and_duplicates() {
        let list = vec![
            "B <b@x>".to_string(),
            "A <a@x>".to_string(),
            "B <b@x>".to_string(),
        ];
        assert_eq!(join_mailboxes(&list), "B <b@x>, A <a@x>, B <b@x>");
    }
}
