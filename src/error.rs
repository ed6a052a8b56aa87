use reqwest::StatusCode;
use thiserror::Error;

/// Fallback text when a failed response carries neither a message nor a reason phrase
pub const GENERIC_API_ERROR: &str = "An API error occurred.";

/// Failure of a single gateway call
#[derive(Debug, Error)]
pub enum ApiError {
    /// The service answered with a non-2xx status
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    /// The request never produced a response
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A success response whose body could not be decoded
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Build a status error from the raw body of a failed response.
    ///
    /// Uses the JSON `message` field when present, then the reason phrase of the status.
    pub fn from_response_body(status: StatusCode, body: &[u8]) -> Self {
        let message = serde_json::from_slice::<crate::models::ErrorBody>(body)
            .ok()
            .and_then(|body| body.message)
            .filter(|message| !message.is_empty())
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_else(|| GENERIC_API_ERROR.to_string());

        ApiError::Status { status, message }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Input rejected before any network call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Patient name is required.")]
    MissingPatientName,

    #[error("Please select a patient.")]
    NoPatientSelected,

    #[error("Please enter a valid amount.")]
    InvalidAmount,

    #[error("Please select a payment date.")]
    MissingPaymentDate,

    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

/// Outcome of a form submission that did not create anything
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("a submission is already in progress")]
    Busy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_prefers_body_message() {
        let err = ApiError::from_response_body(
            StatusCode::UNAUTHORIZED,
            br#"{"message":"Invalid credentials"}"#,
        );
        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_status_error_falls_back_to_reason_phrase() {
        let err = ApiError::from_response_body(StatusCode::INTERNAL_SERVER_ERROR, b"<html>");
        assert_eq!(err.to_string(), "Internal Server Error");

        let err = ApiError::from_response_body(StatusCode::NOT_FOUND, br#"{"error":"x"}"#);
        assert_eq!(err.to_string(), "Not Found");
    }

    #[test]
    fn test_status_error_without_reason_phrase() {
        let status = StatusCode::from_u16(599).unwrap();
        let err = ApiError::from_response_body(status, b"");
        assert_eq!(err.to_string(), GENERIC_API_ERROR);
    }
}
