use serde::{Deserialize, Serialize};

/// The structured body returned by the assistant endpoint.
///
/// Every field is optional.  A field that is missing and a field that is
/// `null` both deserialize to `None`, and unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    /// Opening segment, e.g. a reply to "hola".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greeting_text: Option<String>,

    /// The answer proper.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_text: Option<String>,

    /// Closing segment, e.g. a reply to "chau".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farewell_text: Option<String>,

    /// Similarity score of the matched intent, when the service reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    /// Name of the matched intent, when the service reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
}

impl ChatReply {
    /// Creates a reply from its three text segments.
    pub fn new(
        greeting_text: Option<String>,
        response_text: Option<String>,
        farewell_text: Option<String>,
    ) -> Self {
        Self {
            greeting_text,
            response_text,
            farewell_text,
            ..Self::default()
        }
    }

    /// Joins greeting, response, and farewell into one display string.
    ///
    /// Each absent segment counts as empty.  The three segments are joined
    /// with single spaces and the result is trimmed, so a missing middle
    /// segment leaves two spaces between the outer ones.  Returns `None` when
    /// nothing but whitespace remains.
    pub fn display_text(&self) -> Option<String> {
        let greeting = self.greeting_text.as_deref().unwrap_or_default();
        let response = self.response_text.as_deref().unwrap_or_default();
        let farewell = self.farewell_text.as_deref().unwrap_or_default();
        let combined = format!("{greeting} {response} {farewell}");
        let combined = combined.trim();
        if combined.is_empty() {
            None
        } else {
            Some(combined.to_string())
        }
    }
}
