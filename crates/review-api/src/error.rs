#![expect(missing_docs, reason = "the error macro already is descriptive enough")]

/// Error variants for the review-status API
#[derive(thiserror::Error, Debug)]
pub enum ReviewApiError {
    #[error("Reqwest error {0}")]
    ReqwestWithMiddleware(#[from] reqwest_middleware::Error),
    #[error("Reqwest error {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("invalid authorization header {0}")]
    InvalidToken(#[from] reqwest::header::InvalidHeaderValue),
    #[error("endpoint responded with status {status}")]
    EndpointUnavailable { status: reqwest::StatusCode },
    #[error("response body is not JSON {0}")]
    MalformedResponse(#[source] simd_json::Error),
}
