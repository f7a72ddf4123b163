//! Collaborator interfaces the processor calls, and the contexts it passes.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::error::TermError;
use crate::model::{ParsedCommand, Request};

/// Property key set when the sender supplied an id.
pub const SENDER_ID_PROPERTY: &str = "sender_id";
/// Property key always set; defaults to [`UNKNOWN_SENDER_ENDPOINT`].
pub const SENDER_ENDPOINT_PROPERTY: &str = "sender_endpoint";
pub const UNKNOWN_SENDER_ENDPOINT: &str = "$unknown$";

/// Governs one processing session.
#[derive(Debug, Clone, Default)]
pub struct ProcessingContext {
    pub cancellation: CancellationToken,
}

impl ProcessingContext {
    pub fn new(cancellation: CancellationToken) -> Self {
        Self { cancellation }
    }
}

/// Per-request context handed to the executor.
#[derive(Debug, Clone)]
pub struct RoutingContext {
    pub request: Request,
    pub properties: HashMap<String, String>,
}

impl RoutingContext {
    pub fn new(request: Request) -> Self {
        let mut properties = HashMap::new();
        properties.insert(
            SENDER_ENDPOINT_PROPERTY.to_string(),
            request
                .sender_endpoint
                .clone()
                .unwrap_or_else(|| UNKNOWN_SENDER_ENDPOINT.to_string()),
        );
        if let Some(sender_id) = &request.sender_id {
            properties.insert(SENDER_ID_PROPERTY.to_string(), sender_id.clone());
        }
        Self {
            request,
            properties,
        }
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// Runs a resolved command. Errors are isolated per request.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(
        &self,
        command: &ParsedCommand,
        context: &RoutingContext,
    ) -> anyhow::Result<Option<serde_json::Value>>;
}

/// A fault raised while draining the queue.
#[derive(Debug)]
pub struct ExceptionContext {
    pub error: anyhow::Error,
    pub request: Option<Request>,
}

impl ExceptionContext {
    /// The core error, when the fault came from parsing, timeout or cancellation.
    pub fn term_error(&self) -> Option<&TermError> {
        self.error.downcast_ref::<TermError>()
    }
}

#[async_trait]
pub trait ExceptionHandler: Send + Sync {
    async fn handle(&self, context: ExceptionContext);
}

/// Logs every fault through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingExceptionHandler;

#[async_trait]
impl ExceptionHandler for LoggingExceptionHandler {
    async fn handle(&self, context: ExceptionContext) {
        let request = context.request.as_ref().map(|r| r.id.as_str()).unwrap_or("-");
        match context.term_error() {
            Some(err) => warn!(request, code = err.code(), "{}", err),
            None => error!(request, "command execution failed: {:#}", context.error),
        }
    }
}

/// Returns the JSON summary of the resolved command as the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoExecutor;

#[async_trait]
impl CommandExecutor for EchoExecutor {
    async fn execute(
        &self,
        command: &ParsedCommand,
        context: &RoutingContext,
    ) -> anyhow::Result<Option<serde_json::Value>> {
        let mut summary = command.to_json();
        if let serde_json::Value::Object(ref mut map) = summary {
            map.insert(
                "properties".to_string(),
                serde_json::to_value(&context.properties)?,
            );
        }
        Ok(Some(summary))
    }
}
