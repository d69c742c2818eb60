use serde::{Deserialize, Serialize};

/// The body sent to the assistant endpoint for one utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The utterance exactly as the user typed it.
    pub query: String,

    /// The opaque client identity token.
    ///
    /// This correlates a client's utterances without carrying any personal
    /// information.
    pub user_id: String,
}

impl ChatRequest {
    /// Creates a new request for the given utterance and identity.
    pub fn new(query: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            user_id: user_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization() {
        let request = ChatRequest::new("¿Cuándo abren las inscripciones?", "abc-123");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "query": "¿Cuándo abren las inscripciones?",
                "user_id": "abc-123"
            })
        );
    }

    #[test]
    fn query_is_not_trimmed() {
        let request = ChatRequest::new("  hola  ", "id");
        assert_eq!(request.query, "  hola  ");
    }
}
