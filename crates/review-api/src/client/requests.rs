//! Bindings for the review-status API REST paths

use crate::error::ReviewApiError;
use crate::types::RawResponse;

/// Represents a singular REST request that can be done on the review-status API
pub trait ReviewApiRequest {
    /// The successful result type to be returned
    type Res: serde::de::DeserializeOwned + core::fmt::Debug;

    /// The HTTP method to use
    const METHOD: reqwest::Method;

    /// The full qualified url to send the request to.
    /// The `endpoint` is the configured review-status url.
    ///
    /// # Errors
    ///
    /// This function will return an error if the url cannot be constructed
    fn path(&self, endpoint: &url::Url) -> Result<url::Url, ReviewApiError>;
}

/// GET on the homework statuses endpoint.
///
/// Returns every homework whose status changed since `from_date` together with the server's
/// `current_date`.
#[derive(Debug, Clone, typed_builder::TypedBuilder)]
pub struct GetHomeworkStatuses {
    /// Lower bound of the query window, unix seconds
    pub from_date: u64,
}

impl ReviewApiRequest for GetHomeworkStatuses {
    type Res = RawResponse;

    const METHOD: reqwest::Method = reqwest::Method::GET;

    fn path(&self, endpoint: &url::Url) -> Result<url::Url, ReviewApiError> {
        let mut url = endpoint.clone();
        url.query_pairs_mut()
            .append_pair("from_date", &self.from_date.to_string());
        Ok(url)
    }
}
