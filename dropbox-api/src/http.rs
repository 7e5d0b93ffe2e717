use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::DropboxApiError;

/// Status code and decoded JSON body of a completed request
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    /// Body of a 200 response, or the whole response as a rejection
    pub fn into_success(self) -> Result<Value, DropboxApiError> {
        if self.status == StatusCode::OK {
            Ok(self.body)
        } else {
            Err(DropboxApiError::Rejected {
                status: self.status,
                body: self.body,
            })
        }
    }
}

pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, DropboxApiError> {
        let inner = Client::builder().timeout(timeout).build()?;
        Ok(Self { inner })
    }

    /// POST `form` as `application/x-www-form-urlencoded`, or GET when there is no form.
    ///
    /// Error statuses still resolve to an [`ApiResponse`]. Their body is decoded as
    /// JSON when possible and wrapped as `{"error": "<raw text>"}` otherwise.
    pub async fn request(
        &self,
        url: &str,
        form: Option<&[(&str, &str)]>,
        headers: Option<HeaderMap>,
    ) -> Result<ApiResponse, DropboxApiError> {
        let (method, mut builder) = match form {
            Some(form) => ("POST", self.inner.post(url).form(form)),
            None => ("GET", self.inner.get(url)),
        };
        if let Some(headers) = headers {
            builder = builder.headers(headers);
        }

        tracing::debug!(url, method, "Sending request");

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        let body = if status.is_success() {
            serde_json::from_str(&text)
                .map_err(|source| DropboxApiError::Decode { status, source })?
        } else {
            tracing::debug!(%status, "Request returned error status");
            serde_json::from_str(&text).unwrap_or_else(|_| json!({ "error": text }))
        };

        Ok(ApiResponse { status, body })
    }
}
