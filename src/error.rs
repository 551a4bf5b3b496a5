use axum::http::StatusCode;
use axum::response::{ IntoResponse, Response };
use axum::Json;
use serde::{ Serialize, Deserialize };
use thiserror::Error;

/// Error taxonomy for the relay pipeline. Every failure reaching the HTTP
/// boundary is rendered as one [`ErrorEnvelope`] with an HTTP-style status.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Bad request shape (missing or empty message list). The provider is
    /// never invoked on this path.
    #[error("{0}")]
    Validation(String),

    /// Missing or unusable credential/configuration. Raised before any
    /// network I/O and never masked by the canned-fallback policy.
    #[error("{0}")]
    Configuration(String),

    /// Upstream failure (network, auth, quota). Carries the upstream HTTP
    /// status when one exists.
    #[error("{message}")]
    Provider {
        message: String,
        status: u16,
        details: Option<String>,
    },

    /// The provider answered, but no reply text could be extracted.
    #[error("{0}")]
    InvalidResponse(String),
}

impl AgentError {
    /// Wrap a transport-level failure where no upstream status is available.
    pub fn provider(err: impl std::fmt::Display) -> Self {
        AgentError::Provider {
            message: err.to_string(),
            status: 500,
            details: None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::Validation(_) => "validation",
            AgentError::Configuration(_) => "configuration",
            AgentError::Provider { .. } => "provider",
            AgentError::InvalidResponse(_) => "invalid_response",
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            AgentError::Validation(_) => 400,
            AgentError::Configuration(_) => 400,
            AgentError::Provider { status, .. } => {
                if (400..=599).contains(status) { *status } else { 500 }
            }
            AgentError::InvalidResponse(_) => 502,
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        let details = match self {
            AgentError::Provider { details, .. } => details.clone(),
            _ => None,
        };
        ErrorEnvelope {
            kind: self.kind().to_string(),
            message: self.to_string(),
            status: self.status(),
            details,
        }
    }
}

/// The single error shape every handler returns.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub kind: String,
    pub message: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorEnvelope {
    /// Reconstruct the typed error on the client side of the wire.
    pub fn into_agent_error(self) -> AgentError {
        match self.kind.as_str() {
            "validation" => AgentError::Validation(self.message),
            "configuration" => AgentError::Configuration(self.message),
            "invalid_response" => AgentError::InvalidResponse(self.message),
            _ => AgentError::Provider {
                message: self.message,
                status: self.status,
                details: self.details,
            },
        }
    }
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.envelope())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(AgentError::Validation("x".into()).status(), 400);
        assert_eq!(AgentError::Configuration("x".into()).status(), 400);
        assert_eq!(AgentError::InvalidResponse("x".into()).status(), 502);
        let upstream = AgentError::Provider { message: "quota".into(), status: 429, details: None };
        assert_eq!(upstream.status(), 429);
    }

    #[test]
    fn out_of_range_provider_status_defaults_to_500() {
        let weird = AgentError::Provider { message: "odd".into(), status: 200, details: None };
        assert_eq!(weird.status(), 500);
    }

    #[test]
    fn envelope_round_trips_through_json() {
        let err = AgentError::Provider {
            message: "provider returned HTTP 503".into(),
            status: 503,
            details: Some("overloaded".into()),
        };
        let json = serde_json::to_string(&err.envelope()).unwrap();
        let parsed: ErrorEnvelope = serde_json::from_str(&json).unwrap();
        let back = parsed.into_agent_error();
        assert_eq!(back.kind(), "provider");
        assert_eq!(back.status(), 503);
    }

    #[test]
    fn details_omitted_when_absent() {
        let json = serde_json::to_string(&AgentError::Validation("bad".into()).envelope()).unwrap();
        assert!(!json.contains("details"));
    }
}
