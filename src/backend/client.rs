//! reqwest-backed Uptrace API client.

use super::{Backend, BackendResponse};
use crate::tools::request::{ApiCall, HttpMethod, ResponseKind};
use crate::types::{BackendError, Error, Result, UptraceConfig};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Longest raw error body echoed back to the caller.
const MAX_ERROR_BODY: usize = 512;

/// HTTP client for the Uptrace API with bearer authentication.
#[derive(Debug, Clone)]
pub struct UptraceClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl UptraceClient {
    pub fn new(config: &UptraceConfig) -> Result<Self> {
        let base_url = Url::parse(&config.api_url)
            .map_err(|e| Error::config(format!("uptrace.api_url is not a valid URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::config(format!("uptrace.api_url cannot be a base URL: {}", base_url)));
        }

        let mut builder =
            reqwest::Client::builder().user_agent(concat!("uptrace-mcp/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| Error::config(format!("build http client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            token: config.api_token.clone(),
        })
    }

    fn url_for(&self, call: &ApiCall) -> std::result::Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| BackendError::InvalidUrl(self.base_url.to_string()))?;
            segments.pop_if_empty().extend(&call.path_segments);
        }
        if !call.query.is_empty() {
            url.query_pairs_mut().extend_pairs(call.query.iter());
        }
        Ok(url)
    }

    async fn send(&self, call: ApiCall) -> std::result::Result<BackendResponse, BackendError> {
        let url = self.url_for(&call)?;
        let transport = |source: reqwest::Error| BackendError::transport(url.as_str(), source);

        let mut request = self
            .http
            .request(to_reqwest_method(call.method), url.clone())
            .bearer_auth(&self.token)
            .header(ACCEPT, accept_for(call.response));
        if let Some(body) = call.body {
            request = request.header(CONTENT_TYPE, body.content_type).body(body.text);
        }

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(BackendError::Status {
                method: call.method.as_str().to_string(),
                path: url.path().to_string(),
                status: status.as_u16(),
                message: error_message(&text, status.canonical_reason()),
            });
        }

        match call.response {
            ResponseKind::Text => Ok(BackendResponse::Text(text)),
            ResponseKind::Json if text.trim().is_empty() => Ok(BackendResponse::Empty),
            ResponseKind::Json => serde_json::from_str(&text)
                .map(BackendResponse::Json)
                .map_err(|e| BackendError::Decode {
                    path: url.path().to_string(),
                    message: e.to_string(),
                }),
        }
    }
}

#[async_trait]
impl Backend for UptraceClient {
    async fn execute(
        &self,
        call: ApiCall,
        cancel: CancellationToken,
    ) -> std::result::Result<BackendResponse, BackendError> {
        // Dropping the send future aborts the in-flight HTTP request.
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BackendError::Cancelled),
            result = self.send(call) => result,
        }
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn accept_for(kind: ResponseKind) -> &'static str {
    match kind {
        ResponseKind::Json => "application/json",
        ResponseKind::Text => "application/yaml, text/plain, */*",
    }
}

/// Pull the most specific message out of an error body.
fn error_message(body: &str, reason: Option<&str>) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let candidates = [
            value.pointer("/error/message"),
            value.get("message"),
            value.get("error"),
        ];
        for candidate in candidates.into_iter().flatten() {
            if let Some(s) = candidate.as_str() {
                if !s.is_empty() {
                    return s.to_string();
                }
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return reason.unwrap_or("no response body").to_string();
    }
    match trimmed.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
