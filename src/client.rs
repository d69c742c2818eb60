use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use url::Url;

use crate::error::{Error, Result};
use crate::types::{ChatReply, ChatRequest};

/// The single request/response interaction with the assistant.
///
/// [`AssistantClient`] is the HTTP implementation; tests substitute their own.
#[async_trait::async_trait]
pub trait Exchange: Send + Sync {
    /// Sends one utterance and returns the structured reply.
    async fn exchange(&self, request: &ChatRequest) -> Result<ChatReply>;
}

#[async_trait::async_trait]
impl<T: Exchange + ?Sized> Exchange for std::sync::Arc<T> {
    async fn exchange(&self, request: &ChatRequest) -> Result<ChatReply> {
        (**self).exchange(request).await
    }
}

/// HTTP client for the assistant endpoint.
#[derive(Debug, Clone)]
pub struct AssistantClient {
    client: ReqwestClient,
    endpoint: Url,
    timeout: Option<Duration>,
}

impl AssistantClient {
    /// Create a new client for the given endpoint.
    ///
    /// No timeout is set beyond whatever the platform imposes.
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_options(endpoint, None)
    }

    /// Create a new client with an explicit request timeout.
    pub fn with_options(endpoint: &str, timeout: Option<Duration>) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::url(format!("invalid endpoint {endpoint:?}: {e}"), Some(e)))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(Error::validation(
                format!("endpoint must be http or https, got {}", endpoint.scheme()),
                Some("endpoint".to_string()),
            ));
        }

        let mut builder = ReqwestClient::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {}", e),
                Some(Box::new(e)),
            )
        })?;

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    /// The endpoint requests are posted to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The configured request timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Turn a non-success response into an error carrying its status and body.
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();
        match response.text().await {
            Ok(body) => Error::api(status_code, body.trim()),
            Err(e) => Error::api(status_code, format!("failed to read error body: {e}")),
        }
    }

    /// Post one request and parse the reply.
    ///
    /// Makes exactly one attempt.
    pub async fn send(&self, request: &ChatRequest) -> Result<ChatReply> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(Self::default_headers())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {}", e),
                        self.timeout.map(|t| t.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
                }
            })?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        response.json::<ChatReply>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })
    }
}

#[async_trait::async_trait]
impl Exchange for AssistantClient {
    async fn exchange(&self, request: &ChatRequest) -> Result<ChatReply> {
        self.send(request).await
    }
}
