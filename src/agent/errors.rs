use thiserror::Error;

/// Failures of the adapter layer.
///
/// Malformed stream fragments are deliberately absent: they are counted and
/// dropped by the transcoders, never surfaced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// The identity provider could not issue a usable credential.
    #[error("Authentication failed: {0}")]
    AuthFailure(String),
    /// The vendor rejected the request with a non-success status.
    #[error("Upstream API error: {status_code} - {body}")]
    Upstream { status_code: u16, body: String },
    /// The vendor accepted the call but did not reach a terminal success state.
    #[error("Response not completed: {status}")]
    IncompleteResponse { status: String },
    /// A required configuration value is missing.
    #[error("{0} not configured")]
    NotConfigured(String),
    /// The request never produced an HTTP status.
    #[error("Network error: {0}")]
    Network(String),
    /// A success status with a body that could not be decoded.
    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AgentError::InvalidResponse(err.to_string())
        } else if let Some(status) = err.status() {
            AgentError::Upstream {
                status_code: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            AgentError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::InvalidResponse(err.to_string())
    }
}

impl AgentError {
    /// The vendor status code, when the vendor answered at all.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            AgentError::Upstream { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// A short message safe to show an end user; vendor bodies stay in the log.
    pub fn user_message(&self) -> String {
        match self {
            AgentError::AuthFailure(_) => "Unable to authenticate with the agent service".to_string(),
            AgentError::Upstream { status_code, .. } => {
                format!("Upstream service returned {}", status_code)
            }
            AgentError::IncompleteResponse { status } => {
                format!("Response not completed: {}", status)
            }
            AgentError::NotConfigured(what) => format!("{} not configured", what),
            AgentError::Network(_) => "Unable to reach the agent service".to_string(),
            AgentError::InvalidResponse(_) => {
                "The agent service returned an unreadable response".to_string()
            }
        }
    }
}

pub type AgentResult<T> = std::result::Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_display_carries_status_and_body() {
        let err = AgentError::Upstream {
            status_code: 404,
            body: "previous response not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Upstream API error: 404 - previous response not found"
        );
        assert_eq!(err.upstream_status(), Some(404));
    }

    #[test]
    fn test_user_message_hides_vendor_body() {
        let err = AgentError::Upstream {
            status_code: 502,
            body: "<html>stack trace</html>".to_string(),
        };
        assert_eq!(err.user_message(), "Upstream service returned 502");
        assert!(!err.user_message().contains("stack"));
    }
}
