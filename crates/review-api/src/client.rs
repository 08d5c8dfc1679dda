pub mod requests;
use core::marker::PhantomData;
use core::time::Duration;

use reqwest::header;
use reqwest_middleware::{ClientBuilder, Extension};
use reqwest_tracing::{OtelName, TracingMiddleware};
use requests::{GetHomeworkStatuses, ReviewApiRequest};
use tracing::instrument;

use crate::error::ReviewApiError;
use crate::types::RawResponse;

/// Client for the review-status API
#[derive(Clone, Debug)]
pub struct ReviewApiClient {
    inner: reqwest_middleware::ClientWithMiddleware,
    url: url::Url,
}

impl ReviewApiClient {
    /// Create a new `ReviewApiClient`.
    ///
    /// Every request carries the `Authorization: OAuth <token>` header. The header is marked as
    /// sensitive so it never shows up in debug output.
    ///
    /// # Errors
    ///
    /// This function will return an error if the token is not a valid header value or the
    /// underlying reqwest client cannot be constructed
    #[tracing::instrument(skip(token), name = "creating review api client")]
    pub fn new(
        url: url::Url,
        token: &redact::Secret<String>,
        timeout: Duration,
    ) -> Result<Self, ReviewApiError> {
        let inner = authenticated_client(token, timeout)?;
        Ok(Self { inner, url })
    }

    /// Build a request to the review-status API
    #[instrument(name = "build_request", skip(self, request))]
    pub fn build_request<T>(&self, request: &T) -> Result<ReviewRequest<T::Res>, ReviewApiError>
    where
        T: ReviewApiRequest + core::fmt::Debug,
    {
        let endpoint = request.path(&self.url)?;
        let reqwest_req = self.inner.request(T::METHOD, endpoint.as_str());

        Ok(ReviewRequest {
            request: reqwest_req,
            result: PhantomData,
        })
    }

    /// Fetch the statuses of all homeworks changed since `from_date`
    ///
    /// # Errors
    ///
    /// - [`ReviewApiError::EndpointUnavailable`] on any status other than 200
    /// - [`ReviewApiError::MalformedResponse`] when the body is not JSON
    /// - transport errors when no response was received
    pub async fn fetch_statuses(&self, from_date: u64) -> Result<RawResponse, ReviewApiError> {
        let request = GetHomeworkStatuses::builder().from_date(from_date).build();
        self.build_request(&request)?.execute().await?.json().await
    }
}

/// Encapsulated HTTP request for the review-status API
#[derive(Debug)]
pub struct ReviewRequest<T> {
    request: reqwest_middleware::RequestBuilder,
    result: PhantomData<T>,
}

impl<T> ReviewRequest<T> {
    /// execute a review-status API request
    #[instrument(
        name = "execute_request",
        skip(self),
        fields(method = tracing::field::Empty, url = tracing::field::Empty)
    )]
    pub async fn execute(self) -> Result<ReviewResponse<T>, ReviewApiError> {
        let (client, request) = self.request.build_split();
        let request = request?;

        let span = tracing::Span::current();
        span.record("method", request.method().as_str());
        span.record("url", request.url().as_str());

        let response = client.execute(request).await?;

        Ok(ReviewResponse {
            response,
            result: PhantomData,
            span,
        })
    }
}

/// The raw response of a review-status API request
pub struct ReviewResponse<T> {
    response: reqwest::Response,
    result: PhantomData<T>,
    // this span carries the context of the `ReviewRequest`
    span: tracing::Span,
}

impl<T> ReviewResponse<T> {
    /// Parse the response json.
    ///
    /// Only `200 OK` counts as success; every other status is reported as
    /// [`ReviewApiError::EndpointUnavailable`] without looking at the body.
    #[instrument(name = "parse_response_json", skip(self), err, parent = &self.span)]
    pub async fn json(self) -> Result<T, ReviewApiError>
    where
        T: serde::de::DeserializeOwned,
    {
        let status = self.response.status();
        let mut bytes = self.response.bytes().await?.to_vec();
        if status != reqwest::StatusCode::OK {
            let body = String::from_utf8_lossy(bytes.as_ref());
            tracing::error!(status = %status, body = %body, "review api request failed");
            return Err(ReviewApiError::EndpointUnavailable { status });
        }

        tracing::trace!(response_body = %String::from_utf8_lossy(&bytes), "Response JSON");

        simd_json::from_slice::<T>(bytes.as_mut()).map_err(ReviewApiError::MalformedResponse)
    }
}

fn authenticated_client(
    token: &redact::Secret<String>,
    timeout: Duration,
) -> Result<reqwest_middleware::ClientWithMiddleware, ReviewApiError> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        "Accept",
        header::HeaderValue::from_static("application/json"),
    );
    headers.insert(
        "Accept-Encoding",
        header::HeaderValue::from_static("gzip, deflate"),
    );
    let mut authorization =
        header::HeaderValue::from_str(&format!("OAuth {}", token.expose_secret()))?;
    authorization.set_sensitive(true);
    headers.insert(header::AUTHORIZATION, authorization);

    let client = reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(timeout)
        .default_headers(headers)
        .build()?;
    let client = ClientBuilder::new(client)
        .with_init(Extension(OtelName("review-api-client".into())))
        .with(TracingMiddleware::default())
        .build();
    Ok(client)
}
