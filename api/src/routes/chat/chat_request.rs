use serde::Deserialize;

use crate::error_handler::AppError;

/// Request payload for /chat and /ask.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Natural language question.
    #[serde(default)]
    pub query: Option<String>,
    /// Conversation to continue; a new one is started when absent.
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ChatRequest {
    /// Non-blank question, trimmed.
    pub fn question(&self) -> Result<String, AppError> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("Missing query".into()))
    }

    /// Client session id, or a fresh one.
    pub fn session(&self) -> Result<String, AppError> {
        match self.session_id.as_deref().map(str::trim) {
            None | Some("") => Ok(contextor::new_session_id()),
            Some(id) if is_valid_session_id(id) => Ok(id.to_string()),
            Some(_) => Err(AppError::BadRequest(
                "session_id must be 1-128 characters of [A-Za-z0-9_-]".into(),
            )),
        }
    }
}

pub fn is_valid_session_id(id: &str) -> bool {
    (1..=128).contains(&id.len())
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(query: Option<&str>, session: Option<&str>) -> ChatRequest {
        ChatRequest {
            query: query.map(str::to_string),
            session_id: session.map(str::to_string),
        }
    }

    #[test]
    fn blank_query_is_rejected() {
        assert!(req(None, None).question().is_err());
        assert!(req(Some("  \n"), None).question().is_err());
        assert_eq!(req(Some(" hi "), None).question().unwrap(), "hi");
    }

    #[test]
    fn session_is_generated_or_validated() {
        assert_eq!(req(None, None).session().unwrap().len(), 36);
        assert_eq!(req(None, Some("abc-1")).session().unwrap(), "abc-1");
        assert!(req(None, Some("a b")).session().is_err());
    }
}
