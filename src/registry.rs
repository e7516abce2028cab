//! Tool registry and dispatcher
//!
//! Maps tool names to their typed requests and runs every invocation through
//! the same pipeline: validate, resolve credentials, execute, normalize.
//! Nothing below [`ToolRegistry::invoke`] can escape as anything other than
//! an [`Envelope`], panics included.

use crate::envelope::{normalize, Envelope, ToolOutput};
use crate::error::{ErrorKind, ToolError, ValidationError};
use crate::gcp::auth::{CredentialContext, CredentialResolver};
use crate::ops::Services;
use crate::tools::{
    CreateBucket, CreateInstance, DeleteBucket, DeleteInstance, GetBillingCost, GetMetrics,
    ListBuckets, ListInstances, ListIpAddresses, ListLoadBalancers, ListPersistentDisks,
    ListVpcNetworksAndSubnets, ToolRequest,
};
use crate::validate::ArgSchema;
use async_trait::async_trait;
use futures::FutureExt;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("tool '{0}' is already registered")]
pub struct DuplicateTool(pub String);

/// Validated arguments bound to a typed request, ready to run
#[async_trait]
trait PreparedCall: Send {
    fn project_id(&self) -> &str;

    async fn run(
        self: Box<Self>,
        svc: &Services,
        ctx: &CredentialContext,
    ) -> Result<ToolOutput, ToolError>;
}

trait ToolHandler: Send + Sync {
    fn prepare(&self, args: Map<String, Value>) -> Result<Box<dyn PreparedCall>, ToolError>;
}

struct Prepared<R>(R);

#[async_trait]
impl<R: ToolRequest> PreparedCall for Prepared<R> {
    fn project_id(&self) -> &str {
        self.0.project_id()
    }

    async fn run(
        self: Box<Self>,
        svc: &Services,
        ctx: &CredentialContext,
    ) -> Result<ToolOutput, ToolError> {
        self.0.execute(svc, ctx).await
    }
}

struct TypedHandler<R>(PhantomData<fn() -> R>);

impl<R: ToolRequest> ToolHandler for TypedHandler<R> {
    fn prepare(&self, args: Map<String, Value>) -> Result<Box<dyn PreparedCall>, ToolError> {
        let request: R = serde_json::from_value(Value::Object(args))
            .map_err(|e| ValidationError::new("arguments", e.to_string()))?;
        request.check()?;
        Ok(Box::new(Prepared(request)))
    }
}

/// A registered tool. Immutable once registered.
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub schema: ArgSchema,
    handler: Box<dyn ToolHandler>,
}

impl ToolDescriptor {
    /// Catalog entry with the JSON-schema rendering of the arguments
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "input_schema": self.schema.json_schema(),
        })
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<&'static str, usize>,
    services: Services,
    credentials: Arc<CredentialResolver>,
}

impl ToolRegistry {
    pub fn new(services: Services, credentials: Arc<CredentialResolver>) -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
            services,
            credentials,
        }
    }

    /// Registry with the full GCP tool catalog
    pub fn with_default_tools(
        services: Services,
        credentials: Arc<CredentialResolver>,
    ) -> Result<Self, DuplicateTool> {
        let mut registry = Self::new(services, credentials);
        registry.register::<ListBuckets>()?;
        registry.register::<CreateBucket>()?;
        registry.register::<DeleteBucket>()?;
        registry.register::<ListInstances>()?;
        registry.register::<ListPersistentDisks>()?;
        registry.register::<ListIpAddresses>()?;
        registry.register::<DeleteInstance>()?;
        registry.register::<CreateInstance>()?;
        registry.register::<ListVpcNetworksAndSubnets>()?;
        registry.register::<ListLoadBalancers>()?;
        registry.register::<GetBillingCost>()?;
        registry.register::<GetMetrics>()?;
        Ok(registry)
    }

    pub fn register<R: ToolRequest>(&mut self) -> Result<(), DuplicateTool> {
        if self.index.contains_key(R::NAME) {
            return Err(DuplicateTool(R::NAME.to_string()));
        }

        self.index.insert(R::NAME, self.tools.len());
        self.tools.push(ToolDescriptor {
            name: R::NAME,
            description: R::DESCRIPTION,
            schema: R::SCHEMA,
            handler: Box::new(TypedHandler::<R>(PhantomData)),
        });
        tracing::debug!("Registered tool {}", R::NAME);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Registered tools in registration order
    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn credentials(&self) -> &CredentialResolver {
        &self.credentials
    }

    /// Run one tool call; always returns an envelope
    pub async fn invoke(&self, name: &str, raw_args: &Value) -> Envelope {
        let invocation = Uuid::new_v4();
        let span = tracing::info_span!("invoke", tool = %name, id = %invocation);

        async move {
            let Some(tool) = self.get(name) else {
                tracing::warn!("Unknown tool requested");
                return Envelope::Error {
                    kind: ErrorKind::NotFound,
                    message: "unknown tool".to_string(),
                    details: Some(json!({ "tool": name })),
                };
            };

            let started = Instant::now();
            let result = AssertUnwindSafe(self.dispatch(tool, raw_args))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    tracing::error!("Tool panicked: {}", panic_message(panic.as_ref()));
                    Err(ToolError::Internal(format!(
                        "tool '{}' failed unexpectedly",
                        name
                    )))
                });

            match &result {
                Ok(output) if !output.failures().is_empty() => tracing::warn!(
                    "Completed in {:?} with {} failed scope(s)",
                    started.elapsed(),
                    output.failures().len()
                ),
                Ok(_) => tracing::info!("Completed in {:?}", started.elapsed()),
                Err(e) => tracing::info!("Failed in {:?} ({}): {}", started.elapsed(), e.kind(), e),
            }
            normalize(result)
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&self, tool: &ToolDescriptor, raw_args: &Value) -> Result<ToolOutput, ToolError> {
        let args = tool.schema.validate(raw_args)?;
        let call = tool.handler.prepare(args)?;
        let project_id = call.project_id().to_string();

        let ctx = self.credentials.resolve(&project_id).await?;
        let result = call.run(&self.services, &ctx).await;

        let rejected = match &result {
            Err(e) => e.is_credential_rejection(),
            Ok(output) => output
                .failures()
                .iter()
                .any(|f| f.kind == ErrorKind::AuthError),
        };
        if rejected {
            // Next call re-resolves; this one is not retried
            self.credentials.invalidate_if_same(&ctx).await;
        }
        result
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
