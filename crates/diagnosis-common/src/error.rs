/// Errors raised while talking to the remote diagnosis service.
///
/// Two tiers are distinguished. Transport failures (connection problems, non-2xx
/// status, undecodable bodies) are everything except `Rejected`. An application-level
/// refusal (`success: false` in a 2xx payload) is `Rejected` and carries the service's
/// `error` text verbatim so it can be shown to the user as-is.
pub use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid service URL: {0}")]
    InvalidUrl(String),

    #[error("service returned error: status={status} message={message}")]
    Status { status: StatusCode, message: String },

    #[error("service returned non-JSON error: status={status} body={body}")]
    StatusBody { status: StatusCode, body: String },

    #[error("request rejected: {}", .message.as_deref().unwrap_or("no reason given"))]
    Rejected { message: Option<String> },
}

impl ClientError {
    pub fn is_transport(&self) -> bool {
        !matches!(self, ClientError::Rejected { .. })
    }

    /// Text suitable for showing to an end user.
    ///
    /// `fallback` names the failed action ("Diagnosis failed") and is used as-is when the
    /// service rejected the request without a reason.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Rejected { message: Some(m) } if !m.trim().is_empty() => m.clone(),
            ClientError::Rejected { .. } => fallback.to_string(),
            ClientError::Status { message, .. } => format!("{fallback}: {message}"),
            ClientError::StatusBody { status, .. } => {
                format!("{fallback}: HTTP {}", status.as_u16())
            }
            ClientError::Request(e) if e.is_timeout() => {
                format!("{fallback}: the diagnosis service timed out")
            }
            ClientError::Request(_) => format!("{fallback}: the diagnosis service is unreachable"),
            ClientError::InvalidJson(_) | ClientError::InvalidUrl(_) => {
                format!("{fallback}: unexpected response from the diagnosis service")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_message_is_shown_verbatim() {
        let err = ClientError::Rejected {
            message: Some("Symptoms are required".to_string()),
        };
        assert!(!err.is_transport());
        assert_eq!(err.user_message("Diagnosis failed"), "Symptoms are required");
    }

    #[test]
    fn rejected_without_reason_falls_back() {
        let err = ClientError::Rejected { message: None };
        assert_eq!(err.user_message("Diagnosis failed"), "Diagnosis failed");

        let blank = ClientError::Rejected {
            message: Some("  ".to_string()),
        };
        assert_eq!(blank.user_message("Login failed"), "Login failed");
    }

    #[test]
    fn status_errors_are_transport_tier() {
        let err = ClientError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Database connection failed".to_string(),
        };
        assert!(err.is_transport());
        assert_eq!(
            err.user_message("Diagnosis failed"),
            "Diagnosis failed: Database connection failed"
        );

        let body = ClientError::StatusBody {
            status: StatusCode::BAD_GATEWAY,
            body: "<html>bad gateway</html>".to_string(),
        };
        assert!(body.is_transport());
        assert_eq!(body.user_message("Diagnosis failed"), "Diagnosis failed: HTTP 502");
    }
}
