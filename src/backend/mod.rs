//! Backend invoker: the seam between tool handlers and the Uptrace API.
//!
//! Handlers never talk HTTP directly. They render a [`NormalizedRequest`] into
//! an [`ApiCall`] and hand it to a [`Backend`], which issues exactly one
//! outbound call. No retries, no interpretation of the payload: a failure is
//! returned unchanged as a [`BackendError`].

mod client;

pub use client::UptraceClient;

use crate::tools::request::{ApiCall, NormalizedRequest};
use crate::types::BackendError;
use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Successful backend payload, decoded per the endpoint's response kind.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendResponse {
    Json(Value),
    Text(String),
    /// Success without a body (e.g. 204 on delete).
    Empty,
}

/// Something that can execute one Uptrace API call.
///
/// Implementations must abort the in-flight call promptly once `cancel` fires.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Backend: Send + Sync {
    async fn execute(&self, call: ApiCall, cancel: CancellationToken) -> Result<BackendResponse, BackendError>;
}

/// Issue a normalized request against the backend.
pub async fn invoke(
    backend: &dyn Backend,
    request: &NormalizedRequest,
    cancel: CancellationToken,
) -> Result<BackendResponse, BackendError> {
    let call = request.to_api_call()?;
    tracing::debug!(
        method = call.method.as_str(),
        path = %call.path(),
        query = ?call.query,
        "invoking backend"
    );
    backend.execute(call, cancel).await
}
