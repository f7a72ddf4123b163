/*!
Concurrent request processor.

Any number of producers frame raw strings into requests and push them onto one
bounded queue. A single consumer drains the queue in FIFO order, so the
commands of one batch run in the order they were written and never interleave
with themselves.

Lifecycle:

  Idle --start--> Processing --stop--> Draining --> Idle
                       |                  ^
                       +---- cancel ------+   (reported once, bounded drain)

For every request the consumer parses, executes under the router timeout and
resolves the waiter registered by `process_request`, if there is one. Failures
go to the exception handler and never end the loop.
*/

pub mod batch;
pub mod handlers;
pub mod ids;

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::CommandCatalog;
use crate::config::{ProcessorOptions, TerminalOptions};
use crate::error::{
    Result, TermError, invalid_request, request_canceled, request_timeout, server_error,
};
use crate::model::Request;
use crate::parse::CommandParser;
use crate::text::TextHandler;

pub use batch::split_batch;
pub use handlers::{
    CommandExecutor, EchoExecutor, ExceptionContext, ExceptionHandler, LoggingExceptionHandler,
    ProcessingContext, RoutingContext, SENDER_ENDPOINT_PROPERTY, SENDER_ID_PROPERTY,
    UNKNOWN_SENDER_ENDPOINT,
};
pub use ids::{SHORT_ID_HINT, new_unique_id};

/* ---------------------------- Responses ---------------------------- */

/// Outcome of one request of a synchronous submission.
#[derive(Debug, Clone)]
pub struct ResponseItem {
    pub request: Request,
    /// What the executor returned; `None` when it returned nothing or failed.
    pub result: Option<Value>,
    pub error: Option<String>,
}

/// Results of `process_request`, in request order.
#[derive(Debug, Clone)]
pub struct Response {
    pub batch_id: String,
    pub items: Vec<ResponseItem>,
}

impl Response {
    pub fn to_json(&self) -> Value {
        let items: Vec<Value> = self
            .items
            .iter()
            .map(|item| {
                json!({
                    "request_id": item.request.id,
                    "raw": item.request.raw,
                    "result": item.result,
                    "error": item.error,
                })
            })
            .collect();
        json!({ "batch_id": self.batch_id, "items": items })
    }
}

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    Idle,
    Processing { background: bool },
    Draining,
}

/* ----------------------------- Internals ---------------------------- */

struct QueueItem {
    request: Request,
    enqueued_at: Instant,
}

struct Outcome {
    result: Option<Value>,
    error: Option<String>,
}

enum Lifecycle {
    Idle,
    Processing {
        sender: mpsc::Sender<QueueItem>,
        stopped: watch::Receiver<bool>,
        background: bool,
    },
    Draining {
        stopped: watch::Receiver<bool>,
    },
}

struct Shared {
    options: ProcessorOptions,
    router_timeout: Option<Duration>,
    text: TextHandler,
    parser: CommandParser,
    executor: Arc<dyn CommandExecutor>,
    handler: Arc<dyn ExceptionHandler>,
    lifecycle: Mutex<Lifecycle>,
    waiters: DashMap<String, oneshot::Sender<Outcome>>,
}

/* ----------------------------- Processor ---------------------------- */

/// Cheap to clone; clones share the queue and the lifecycle.
#[derive(Clone)]
pub struct RequestProcessor {
    shared: Arc<Shared>,
}

impl RequestProcessor {
    pub fn new(
        options: &TerminalOptions,
        catalog: Arc<dyn CommandCatalog>,
        executor: Arc<dyn CommandExecutor>,
        handler: Arc<dyn ExceptionHandler>,
    ) -> Result<Self> {
        options.validate()?;
        let router_timeout = (options.router.timeout_ms > 0)
            .then(|| Duration::from_millis(options.router.timeout_ms));
        Ok(Self {
            shared: Arc::new(Shared {
                options: options.processor.clone(),
                router_timeout,
                text: options.text_handler(),
                parser: CommandParser::new(options, catalog),
                executor,
                handler,
                lifecycle: Mutex::new(Lifecycle::Idle),
                waiters: DashMap::new(),
            }),
        })
    }

    pub fn new_unique_id(&self, hint: Option<&str>) -> String {
        new_unique_id(hint)
    }

    pub fn state(&self) -> ProcessorState {
        match &*self.shared.lifecycle.lock() {
            Lifecycle::Idle => ProcessorState::Idle,
            Lifecycle::Processing { background, .. } => ProcessorState::Processing {
                background: *background,
            },
            Lifecycle::Draining { .. } => ProcessorState::Draining,
        }
    }

    /// True until the consumer has fully stopped.
    pub fn is_processing(&self) -> bool {
        self.state() != ProcessorState::Idle
    }

    /// Start the consumer. With `background` the loop is spawned and this
    /// returns at once; otherwise it runs here until stopped or canceled.
    pub async fn start_processing(&self, context: ProcessingContext, background: bool) -> Result<()> {
        let (sender, receiver) = mpsc::channel(self.shared.options.queue_capacity);
        let (done, stopped) = watch::channel(false);
        {
            let mut lifecycle = self.shared.lifecycle.lock();
            if !matches!(*lifecycle, Lifecycle::Idle) {
                return Err(invalid_request(
                    "The request processor is already running.",
                    &[],
                ));
            }
            *lifecycle = Lifecycle::Processing {
                sender,
                stopped,
                background,
            };
        }
        info!(
            background,
            capacity = self.shared.options.queue_capacity,
            batch = self.shared.options.batch_enabled,
            "request processing started"
        );

        let consumer = Consumer {
            shared: Arc::clone(&self.shared),
            receiver,
            cancellation: context.cancellation,
            done,
        };
        if background {
            tokio::spawn(consumer.run());
        } else {
            consumer.run().await;
        }
        Ok(())
    }

    /// Stop accepting requests and wait for the queue to drain.
    ///
    /// Returns `true` when `timeout` elapsed first; the consumer keeps
    /// draining and the processor stays in [`ProcessorState::Draining`].
    pub async fn stop_processing(&self, timeout: Option<Duration>) -> bool {
        let mut stopped = {
            let mut lifecycle = self.shared.lifecycle.lock();
            match std::mem::replace(&mut *lifecycle, Lifecycle::Idle) {
                Lifecycle::Idle => return false,
                Lifecycle::Processing { stopped, .. } | Lifecycle::Draining { stopped } => {
                    *lifecycle = Lifecycle::Draining {
                        stopped: stopped.clone(),
                    };
                    stopped
                }
            }
        };
        debug!("request processing stopping");

        let wait = stopped.wait_for(|done| *done);
        let timed_out = match timeout {
            Some(limit) => tokio::time::timeout(limit, wait).await.is_err(),
            None => {
                let _ = wait.await;
                false
            }
        };
        if timed_out {
            warn!("request processing did not stop within the timeout");
        }
        timed_out
    }

    /// Queue `raw` without waiting for results. Returns the batch id.
    pub async fn add_request(
        &self,
        raw: &str,
        sender_id: Option<&str>,
        sender_endpoint: Option<&str>,
    ) -> Result<String> {
        let sender = self.sender(invalid_request)?;
        let (batch_id, requests) = self.frame(raw, sender_id, sender_endpoint)?;
        debug!(batch = %batch_id, count = requests.len(), "requests queued");
        for request in requests {
            enqueue(&sender, request).await?;
        }
        Ok(batch_id)
    }

    /// Queue `raw` and wait until every request it carries has been handled.
    pub async fn process_request(
        &self,
        raw: &str,
        sender_id: Option<&str>,
        sender_endpoint: Option<&str>,
    ) -> Result<Response> {
        let sender = self.sender(server_error)?;
        let (batch_id, requests) = self.frame(raw, sender_id, sender_endpoint)?;

        let mut receivers = Vec::with_capacity(requests.len());
        for request in &requests {
            let (tx, rx) = oneshot::channel();
            self.shared.waiters.insert(request.id.clone(), tx);
            receivers.push(rx);
        }
        for request in &requests {
            if let Err(err) = enqueue(&sender, request.clone()).await {
                for request in &requests {
                    self.shared.waiters.remove(&request.id);
                }
                return Err(err);
            }
        }
        drop(sender);

        let mut items = Vec::with_capacity(requests.len());
        for (request, receiver) in requests.into_iter().zip(receivers) {
            let outcome = receiver.await.map_err(|_| {
                server_error(
                    "The request was abandoned before it was processed.",
                    &[("request", &request.id)],
                )
            })?;
            items.push(ResponseItem {
                request,
                result: outcome.result,
                error: outcome.error,
            });
        }
        Ok(Response { batch_id, items })
    }

    fn sender(
        &self,
        not_running: fn(&str, &[(&str, &str)]) -> TermError,
    ) -> Result<mpsc::Sender<QueueItem>> {
        match &*self.shared.lifecycle.lock() {
            Lifecycle::Processing { sender, .. } => Ok(sender.clone()),
            _ => Err(not_running("The request processor is not running.", &[])),
        }
    }

    fn frame(
        &self,
        raw: &str,
        sender_id: Option<&str>,
        sender_endpoint: Option<&str>,
    ) -> Result<(String, Vec<Request>)> {
        let commands = split_batch(raw, &self.shared.options, &self.shared.text)?;
        let batch_id = new_unique_id(None);
        let sender_id = sender_id.filter(|s| !s.is_empty()).map(str::to_string);
        let endpoint = sender_endpoint
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_SENDER_ENDPOINT)
            .to_string();
        let requests = commands
            .into_iter()
            .map(|raw| {
                Request::new(raw)
                    .with_batch_id(batch_id.clone())
                    .with_sender(sender_id.clone(), Some(endpoint.clone()))
            })
            .collect();
        Ok((batch_id, requests))
    }
}

async fn enqueue(sender: &mpsc::Sender<QueueItem>, request: Request) -> Result<()> {
    let id = request.id.clone();
    sender
        .send(QueueItem {
            request,
            enqueued_at: Instant::now(),
        })
        .await
        .map_err(|_| server_error("The request queue is closed.", &[("request", &id)]))
}

/* ------------------------------ Consumer ---------------------------- */

struct Consumer {
    shared: Arc<Shared>,
    receiver: mpsc::Receiver<QueueItem>,
    cancellation: CancellationToken,
    done: watch::Sender<bool>,
}

impl Consumer {
    async fn run(mut self) {
        let canceled = loop {
            tokio::select! {
                biased;
                _ = self.cancellation.cancelled() => break true,
                item = self.receiver.recv() => match item {
                    Some(item) => self.shared.process(item).await,
                    None => break false,
                },
            }
        };

        if canceled {
            self.shared
                .report(
                    request_canceled("The request processing was canceled.", &[]).into(),
                    None,
                )
                .await;
            self.shared.begin_drain();
            self.final_drain().await;
        }
        info!(canceled, "request processing stopped");
    }

    async fn final_drain(&mut self) {
        let limit = Duration::from_millis(self.shared.options.drain_timeout_ms);
        let shared = &self.shared;
        let receiver = &mut self.receiver;
        let drained = tokio::time::timeout(limit, async {
            while let Some(item) = receiver.recv().await {
                shared.process(item).await;
            }
        })
        .await;
        if drained.is_err() {
            warn!(
                timeout_ms = self.shared.options.drain_timeout_ms,
                "final drain timed out"
            );
        }
    }
}

/// Runs on every exit path: normal return, a panic in the loop, or the
/// foreground future being dropped.
impl Drop for Consumer {
    fn drop(&mut self) {
        self.receiver.close();
        let mut abandoned = 0usize;
        while self.receiver.try_recv().is_ok() {
            abandoned += 1;
        }
        abandoned += self.shared.waiters.len();
        self.shared.waiters.clear();
        if abandoned > 0 {
            warn!(abandoned, "requests abandoned at shutdown");
        }

        *self.shared.lifecycle.lock() = Lifecycle::Idle;
        let _ = self.done.send(true);
    }
}

impl Shared {
    fn begin_drain(&self) {
        let mut lifecycle = self.lifecycle.lock();
        let current = std::mem::replace(&mut *lifecycle, Lifecycle::Idle);
        *lifecycle = match current {
            Lifecycle::Processing { stopped, .. } => Lifecycle::Draining { stopped },
            other => other,
        };
    }

    async fn process(&self, item: QueueItem) {
        let QueueItem {
            request,
            enqueued_at,
        } = item;
        debug!(
            request = %request.id,
            batch = request.batch_id.as_deref().unwrap_or("-"),
            queued_ms = enqueued_at.elapsed().as_millis() as u64,
            "processing request"
        );

        let outcome = match self.route(&request).await {
            Ok(result) => Outcome {
                result,
                error: None,
            },
            Err(error) => {
                let message = format!("{error:#}");
                self.report(error, Some(request.clone())).await;
                Outcome {
                    result: None,
                    error: Some(message),
                }
            }
        };
        if let Some((_, waiter)) = self.waiters.remove(&request.id) {
            let _ = waiter.send(outcome);
        }
    }

    async fn route(&self, request: &Request) -> anyhow::Result<Option<Value>> {
        let parsed = self.parser.parse(request.clone()).await?;
        let context = RoutingContext::new(request.clone());
        let executor = Arc::clone(&self.executor);
        // A separate task keeps a panicking executor from taking the loop down.
        let mut execution =
            tokio::spawn(async move { executor.execute(&parsed, &context).await });

        let Some(limit) = self.router_timeout else {
            return joined(execution.await);
        };
        let finished = tokio::select! {
            result = &mut execution => Some(result),
            _ = tokio::time::sleep(limit) => None,
        };
        match finished {
            Some(result) => joined(result),
            None => {
                let timeout_ms = limit.as_millis().to_string();
                self.report(
                    request_timeout(
                        "The request execution exceeded the router timeout.",
                        &[("request", &request.id), ("timeout_ms", &timeout_ms)],
                    )
                    .into(),
                    Some(request.clone()),
                )
                .await;
                joined(execution.await)
            }
        }
    }

    async fn report(&self, error: anyhow::Error, request: Option<Request>) {
        self.handler
            .handle(ExceptionContext { error, request })
            .await;
    }
}

fn joined(
    result: std::result::Result<anyhow::Result<Option<Value>>, JoinError>,
) -> anyhow::Result<Option<Value>> {
    result.map_err(|e| anyhow::anyhow!("The command execution did not complete: {e}"))?
}
