//! Decoding of the packed, numerically keyed attribute blob.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ResolutionError;

/// Attribute blob with its numeric keys replaced by attribute names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedAttributes {
    message: i64,
    fields: Map<String, Value>,
}

/// A declared attachment: file name and raw type id, both as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentInfo {
    pub filename: String,
    pub type_id: String,
}

/// Parse `raw` and rename its keys through the attribute table.
///
/// Keys without a definition are kept as they are.
pub fn resolve_attributes(
    message: i64,
    raw: &str,
    names: &HashMap<i64, String>,
) -> Result<NamedAttributes, ResolutionError> {
    let parsed: Value =
        serde_json::from_str(raw).map_err(|e| ResolutionError::MalformedAttributes {
            message,
            reason: e.to_string(),
        })?;
    let Value::Object(packed) = parsed else {
        return Err(ResolutionError::MalformedAttributes {
            message,
            reason: "not a JSON object".to_string(),
        });
    };

    let mut fields = Map::new();
    for (key, value) in packed {
        let name = match key.parse::<i64>().ok().and_then(|id| names.get(&id)) {
            Some(name) => name.clone(),
            None => {
                debug!(record = message, key = %key, "Attribute without definition");
                key
            }
        };
        fields.insert(name, value);
    }
    Ok(NamedAttributes { message, fields })
}

impl NamedAttributes {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// A single required id (e.g. `from`).
    pub fn id(&self, name: &str) -> Result<i64, ResolutionError> {
        match self.fields.get(name) {
            None | Some(Value::Null) => Err(ResolutionError::MissingAttribute {
                message: self.message,
                name: name.to_string(),
            }),
            Some(value) => self.to_id(name, value),
        }
    }

    /// A list of ids (e.g. `to`). Absent or `null` means empty.
    pub fn ids(&self, name: &str) -> Result<Vec<i64>, ResolutionError> {
        match self.fields.get(name) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items.iter().map(|v| self.to_id(name, v)).collect(),
            Some(other) => Err(self.invalid(name, other)),
        }
    }

    /// `attachmentInfos` as `(filename, type id)` pairs.
    pub fn attachment_infos(&self) -> Result<Vec<AttachmentInfo>, ResolutionError> {
        const FIELD: &str = "attachmentInfos";
        match self.fields.get(FIELD) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::Array(pair) => Ok(AttachmentInfo {
                        filename: pair.first().map(value_text).unwrap_or_default(),
                        type_id: pair.get(1).map(value_text).unwrap_or_default(),
                    }),
                    other => Err(self.invalid(FIELD, other)),
                })
                .collect(),
            Some(other) => Err(self.invalid(FIELD, other)),
        }
    }

    fn to_id(&self, name: &str, value: &Value) -> Result<i64, ResolutionError> {
        let id = match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        id.ok_or_else(|| self.invalid(name, value))
    }

    fn invalid(&self, name: &str, value: &Value) -> ResolutionError {
        ResolutionError::InvalidReference {
            message: self.message,
            field: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// Render a scalar the way it reads in text (strings unquoted).
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> HashMap<i64, String> {
        [(1, "from"), (2, "to"), (3, "cc"), (4, "attachmentInfos")]
            .into_iter()
            .map(|(id, n)| (id, n.to_string()))
            .collect()
    }

    #[test]
    fn test_keys_are_renamed() {
        let attrs = resolve_attributes(9, r#"{"1": 10, "2": [11, "12"]}"#, &names()).unwrap();
        assert_eq!(attrs.id("from").unwrap(), 10);
        assert_eq!(attrs.ids("to").unwrap(), vec![11, 12]);
        assert!(attrs.ids("cc").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_key_is_kept() {
        let attrs = resolve_attributes(9, r#"{"99": true}"#, &names()).unwrap();
        assert_eq!(attrs.get("99"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_missing_from() {
        let attrs = resolve_attributes(9, r#"{"2": []}"#, &names()).unwrap();
        assert_eq!(
            attrs.id("from"),
            Err(ResolutionError::MissingAttribute {
                message: 9,
                name: "from".to_string()
            })
        );
    }

    #[test]
    fn test_invalid_reference() {
        let attrs = resolve_attributes(9, r#"{"2": [{"x": 1}]}"#, &names()).unwrap();
        assert!(matches!(
            attrs.ids("to"),
            Err(ResolutionError::InvalidReference { .. })
        ));
    }

    #[test]
    fn test_malformed_blob() {
        assert!(matches!(
            resolve_attributes(9, "{not json", &names()),
            Err(ResolutionError::MalformedAttributes { message: 9, .. })
        ));
        assert!(matches!(
            resolve_attributes(9, "[1, 2]", &names()),
            Err(ResolutionError::MalformedAttributes { .. })
        ));
    }

    #[test]
    fn test_attachment_infos() {
        let attrs = resolve_attributes(
            9,
            r#"{"4": [["report.pdf", 7], ["notes.txt", "3"]]}"#,
            &names(),
        )
        .unwrap();
        assert_eq!(
            attrs.attachment_infos().unwrap(),
            vec![
                AttachmentInfo {
                    filename: "report.pdf".to_string(),
                    type_id: "7".to_string()
                },
                AttachmentInfo {
                    filename: "notes.txt".to_string(),
                    type_id: "3".to_string()
                },
            ]
        );
    }
}
