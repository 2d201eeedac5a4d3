//! Tool handlers: normalize, invoke, map.
//!
//! Each operation is described by an [`Operation`] impl: a typed input, its
//! static metadata and a pure normalizer. [`OperationHandler`] composes that
//! normalizer with the shared [`DefaultPolicy`] and [`Backend`], so no
//! operation touches HTTP or fills defaults on its own.

use crate::backend::{invoke, Backend};
use crate::tools::catalog::{ToolDescriptor, ToolHints, ToolRegistry};
use crate::tools::defaults::DefaultPolicy;
use crate::tools::request::NormalizedRequest;
use crate::tools::result::ToolOutput;
use crate::types::{Result, ValidationError};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Anything that can serve a tool call.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Value, cancel: CancellationToken) -> Result<ToolOutput>;
}

/// Static description of one backend operation exposed as a tool.
pub trait Operation: Send + Sync + 'static {
    /// Argument object accepted by the tool.
    type Input: DeserializeOwned + JsonSchema + Send;

    const NAME: &'static str;
    const TITLE: &'static str;
    const DESCRIPTION: &'static str;
    const HINTS: ToolHints;

    /// Turn caller input into a fully-populated request.
    ///
    /// Must not perform I/O. Required-field failures are returned as
    /// validation errors before anything reaches the backend.
    fn normalize(input: Self::Input, policy: &DefaultPolicy) -> Result<NormalizedRequest>;

    fn descriptor() -> ToolDescriptor {
        let schema = schemars::schema_for!(Self::Input);
        ToolDescriptor {
            name: Self::NAME.to_string(),
            title: Self::TITLE.to_string(),
            description: Self::DESCRIPTION.to_string(),
            hints: Self::HINTS,
            input_schema: serde_json::to_value(schema).unwrap_or_else(|_| serde_json::json!({"type": "object"})),
        }
    }
}

/// Shared dependencies handed to every handler.
#[derive(Clone)]
pub struct ToolContext {
    pub policy: Arc<DefaultPolicy>,
    pub backend: Arc<dyn Backend>,
}

impl fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolContext")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ToolContext {
    pub fn new(policy: DefaultPolicy, backend: Arc<dyn Backend>) -> Self {
        Self {
            policy: Arc::new(policy),
            backend,
        }
    }

    /// Register operation `O` into `registry`.
    pub fn register<O: Operation>(&self, registry: &mut ToolRegistry) -> Result<()> {
        registry.register(O::descriptor(), Arc::new(OperationHandler::<O>::new(self.clone())))
    }
}

/// Decode an argument object. A null payload is treated as `{}`.
pub fn parse_arguments<T: DeserializeOwned>(arguments: Value) -> Result<T> {
    let arguments = if arguments.is_null() {
        Value::Object(Default::default())
    } else {
        arguments
    };
    serde_json::from_value(arguments)
        .map_err(|e| ValidationError::malformed("arguments", e.to_string()).into())
}

/// Handler for one [`Operation`]: normalize → invoke → map.
pub struct OperationHandler<O> {
    ctx: ToolContext,
    _op: PhantomData<fn() -> O>,
}

impl<O> fmt::Debug for OperationHandler<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationHandler").finish_non_exhaustive()
    }
}

impl<O: Operation> OperationHandler<O> {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx, _op: PhantomData }
    }

    /// Decode and normalize arguments without calling the backend.
    pub fn normalize(&self, arguments: Value) -> Result<NormalizedRequest> {
        let input: O::Input = parse_arguments(arguments)?;
        O::normalize(input, &self.ctx.policy)
    }
}

#[async_trait]
impl<O: Operation> ToolHandler for OperationHandler<O> {
    async fn call(&self, arguments: Value, cancel: CancellationToken) -> Result<ToolOutput> {
        let request = self.normalize(arguments)?;
        tracing::debug!(
            project_id = %request.project_id,
            limit = ?request.limit,
            "normalized request"
        );
        let response = invoke(self.ctx.backend.as_ref(), &request, cancel).await?;
        Ok(response.into())
    }
}
