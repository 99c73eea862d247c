//! The `{success, data|message}` wrapper used by every backend response

use serde::{Deserialize, Serialize};

/// Response envelope returned by the blog backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Whether the request succeeded
    #[serde(default)]
    pub success: bool,

    /// Payload on success
    pub data: Option<T>,

    /// Human readable message (success or failure)
    #[serde(default)]
    pub message: Option<String>,

    /// Alternate failure text used by some endpoints
    #[serde(default)]
    pub error: Option<String>,

    /// Validation failures; the first one is the most relevant
    #[serde(default, deserialize_with = "validation_messages")]
    pub errors: Option<Vec<String>>,

    /// Paging metadata on list endpoints
    #[serde(default)]
    pub pagination: Option<serde_json::Value>,
}

/// Validation entries come either as plain strings or as `{msg}` / `{message}` objects
#[derive(Deserialize)]
#[serde(untagged)]
enum ValidationEntry {
    Text(String),
    Object {
        #[serde(alias = "message")]
        msg: String,
    },
    Other(serde::de::IgnoredAny),
}

fn validation_messages<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let entries: Option<Vec<ValidationEntry>> = Option::deserialize(deserializer)?;
    Ok(entries.map(|entries| {
        entries
            .into_iter()
            .filter_map(|entry| match entry {
                ValidationEntry::Text(text) => Some(text),
                ValidationEntry::Object { msg } => Some(msg),
                ValidationEntry::Other(_) => None,
            })
            .collect()
    }))
}

impl<T> Envelope<T> {
    /// Message to display for a failed request: `errors[0]`, else `message`, else `error`
    pub fn server_message(&self) -> Option<&str> {
        self.errors
            .as_ref()
            .and_then(|errors| errors.first())
            .or(self.message.as_ref())
            .or(self.error.as_ref())
            .map(String::as_str)
            .filter(|msg| !msg.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_errors_take_precedence() {
        let envelope: Envelope<serde_json::Value> = serde_json::from_value(json!({
            "success": false,
            "message": "Validation failed",
            "errors": ["Email is required", "Password is required"]
        }))
        .unwrap();
        assert_eq!(envelope.server_message(), Some("Email is required"));
    }

    #[test]
    fn test_validation_objects() {
        let envelope: Envelope<()> = serde_json::from_value(json!({
            "success": false,
            "errors": [{"msg": "Title is required", "path": "title"}, 42]
        }))
        .unwrap();
        assert_eq!(envelope.errors, Some(vec!["Title is required".to_string()]));
        assert_eq!(envelope.server_message(), Some("Title is required"));
    }

    #[test]
    fn test_message_then_error() {
        let envelope: Envelope<()> =
            serde_json::from_value(json!({"success": false, "error": "boom"})).unwrap();
        assert_eq!(envelope.server_message(), Some("boom"));

        let envelope: Envelope<()> = serde_json::from_value(
            json!({"success": false, "message": "Invalid credentials", "error": "boom"}),
        )
        .unwrap();
        assert_eq!(envelope.server_message(), Some("Invalid credentials"));
    }

    #[test]
    fn test_missing_success_defaults_to_false() {
        let envelope: Envelope<()> = serde_json::from_value(json!({})).unwrap();
        assert!(!envelope.success);
        assert!(envelope.server_message().is_none());
    }
}
