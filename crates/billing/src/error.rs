//! Error taxonomy for billing report operations.

use thiserror::Error;

/// Message returned for requests missing a required field.
pub const MISSING_PARAMETERS: &str = "Missing parameters";

/// Message returned for requests whose fields are present but unusable.
pub const INVALID_PARAMETERS: &str = "Invalid parameters";

/// Errors that can occur while producing a billing report.
///
/// Failure layers are checked in order (transport, session, envelope) and
/// the first one that fires short-circuits the rest.
#[derive(Error, Debug)]
pub enum BillingError {
    /// A required request field is missing or unusable.
    #[error("{0}")]
    InvalidRequest(String),

    /// The upstream answered with its login page instead of data.
    #[error("Cookie is no longer valid, please supply a fresh one")]
    SessionExpired,

    /// The upstream envelope was present but reported a failure.
    #[error("SiliconCloud API returned an error: {message}")]
    Upstream {
        /// Upstream-supplied numeric code, if any.
        code: Option<i64>,
        /// Upstream-supplied message.
        message: String,
    },

    /// The upstream body was not JSON or did not have the expected shape.
    #[error("Malformed upstream response: {0}")]
    Malformed(String),

    /// The outbound HTTP call itself failed.
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl BillingError {
    /// Shorthand for the strict missing-field failure.
    #[must_use]
    pub fn missing_parameters() -> Self {
        Self::InvalidRequest(MISSING_PARAMETERS.to_string())
    }

    /// Shorthand for a present-but-unparseable field.
    #[must_use]
    pub fn invalid_parameters() -> Self {
        Self::InvalidRequest(INVALID_PARAMETERS.to_string())
    }

    /// HTTP status code this failure maps to at the boundary.
    ///
    /// Upstream codes are honoured only when they are usable HTTP error
    /// statuses (400-599); anything else falls back to 500.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) => 400,
            Self::SessionExpired => 401,
            Self::Upstream { code, .. } => code
                .and_then(|c| u16::try_from(c).ok())
                .filter(|c| (400..=599).contains(c))
                .unwrap_or(500),
            Self::Malformed(_) | Self::Transport(_) | Self::Config(_) => 500,
        }
    }

    /// Whether the message may be shown to the caller verbatim.
    ///
    /// Malformed, transport and configuration failures are logged for the
    /// operator and replaced with a generic message.
    #[must_use]
    pub fn is_public(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest(_) | Self::SessionExpired | Self::Upstream { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_taxonomy() {
        assert_eq!(BillingError::missing_parameters().status_code(), 400);
        assert_eq!(BillingError::SessionExpired.status_code(), 401);
        assert_eq!(BillingError::Malformed("x".into()).status_code(), 500);
    }

    #[test]
    fn test_upstream_code_passthrough() {
        let err = BillingError::Upstream {
            code: Some(403),
            message: "forbidden".into(),
        };
        assert_eq!(err.status_code(), 403);
        assert!(err.to_string().contains("forbidden"));
    }

    #[test]
    fn test_upstream_code_defaults_to_500() {
        let absent = BillingError::Upstream {
            code: None,
            message: "boom".into(),
        };
        assert_eq!(absent.status_code(), 500);

        let not_http = BillingError::Upstream {
            code: Some(20_001),
            message: "boom".into(),
        };
        assert_eq!(not_http.status_code(), 500);

        let zero = BillingError::Upstream {
            code: Some(0),
            message: "boom".into(),
        };
        assert_eq!(zero.status_code(), 500);
    }

    #[test]
    fn test_public_messages() {
        assert!(BillingError::SessionExpired.is_public());
        assert!(!BillingError::Malformed("secret detail".into()).is_public());
    }
}
