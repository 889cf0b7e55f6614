//! Batch dispatcher: fan out one task per prompt, fan in once all finish.

use super::generator::{BatchGenerator, Prompts};
use crate::client::{ClientError, PromptClient};
use crate::types::{Record, RequestId};
use futures::FutureExt;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn, Instrument};

/// Responses keyed by the identifier of the prompt that produced them.
pub type Responses = HashMap<RequestId, String>;

/// Per-identifier outcomes from [`Dispatcher::dispatch_settled`].
pub type SettledResponses = HashMap<RequestId, std::result::Result<String, ClientError>>;

/// Identifier, prompt and response of one finished request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptResult {
    pub id: RequestId,
    pub prompt: String,
    pub response: String,
}

/// A batch aborted by its first failed request.
///
/// Every submitted identifier appears exactly once: as `failed`, or in one of
/// `completed`, `also_failed` and `cancelled` (each sorted).
#[derive(Debug, Error)]
#[error(
    "batch aborted by request {failed}: {source} ({} completed, {} also failed, {} cancelled)",
    .completed.len(),
    .also_failed.len(),
    .cancelled.len()
)]
pub struct BatchError {
    pub failed: RequestId,
    pub source: ClientError,
    /// Finished successfully; their responses were discarded.
    pub completed: Vec<RequestId>,
    /// Failed while the batch was being cancelled.
    pub also_failed: Vec<RequestId>,
    /// Aborted before finishing.
    pub cancelled: Vec<RequestId>,
}

impl BatchError {
    pub fn total(&self) -> usize {
        1 + self.completed.len() + self.also_failed.len() + self.cancelled.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Upper bound for a single request; `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl DispatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Defaults, overridden by `PROMPT_FANOUT_REQUEST_TIMEOUT_MS` when set (0 disables).
    pub fn from_env() -> Self {
        let request_timeout = std::env::var("PROMPT_FANOUT_REQUEST_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);
        Self { request_timeout }
    }
}

/// Runs a batch of prompts against a [`PromptClient`], one task per prompt.
///
/// There is no bound on in-flight requests: a batch of N prompts starts N
/// tasks at once. Responses are paired with identifiers by the task that
/// produced them, never by completion order.
pub struct Dispatcher {
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            config: DispatchConfig::default(),
        }
    }

    pub fn with_config(config: DispatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Fail-fast dispatch.
    ///
    /// Returns every response, or on the first failure aborts all outstanding
    /// requests, waits for them to wind down and returns a [`BatchError`].
    /// No partial mapping is ever returned.
    pub async fn dispatch<C>(
        &self,
        requests: &Prompts,
        client: Arc<C>,
    ) -> std::result::Result<Responses, BatchError>
    where
        C: PromptClient + ?Sized + 'static,
    {
        let total = requests.len();
        if total == 0 {
            return Ok(Responses::new());
        }

        let start = Instant::now();
        info!(total, client = client.name(), "dispatching prompt batch");
        let mut tasks = self.spawn_all(requests, client);
        let mut pending: HashSet<RequestId> = requests.keys().copied().collect();
        let mut responses = Responses::with_capacity(total);
        let mut failure: Option<ClientError> = None;
        let mut also_failed = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            let (id, outcome) = match joined {
                Ok(pair) => pair,
                // Aborted by us, or the runtime is shutting down.
                Err(e) => {
                    debug!(error = %e, "prompt task ended without a result");
                    continue;
                }
            };
            pending.remove(&id);
            match outcome {
                Ok(response) => {
                    responses.insert(id, response);
                }
                Err(e) if failure.is_none() => {
                    warn!(%id, error = %e, remaining = pending.len(), "prompt request failed, cancelling batch");
                    tasks.abort_all();
                    failure = Some(e);
                }
                Err(e) => {
                    debug!(%id, error = %e, "prompt request failed during cancellation");
                    also_failed.push(id);
                }
            }
        }

        let source = match failure {
            Some(e) => e,
            None => match pending.iter().min().copied() {
                None => {
                    info!(
                        total,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "prompt batch complete"
                    );
                    return Ok(responses);
                }
                Some(id) => {
                    pending.remove(&id);
                    ClientError::Cancelled { id }
                }
            },
        };

        let mut completed: Vec<RequestId> = responses.into_keys().collect();
        let mut cancelled: Vec<RequestId> = pending.into_iter().collect();
        completed.sort();
        also_failed.sort();
        cancelled.sort();
        Err(BatchError {
            failed: source.id(),
            source,
            completed,
            also_failed,
            cancelled,
        })
    }

    /// Collect-all dispatch: waits for every request and reports each outcome.
    ///
    /// The result has exactly the input's key set; failures never cancel
    /// siblings.
    pub async fn dispatch_settled<C>(&self, requests: &Prompts, client: Arc<C>) -> SettledResponses
    where
        C: PromptClient + ?Sized + 'static,
    {
        let total = requests.len();
        if total == 0 {
            return SettledResponses::new();
        }

        let start = Instant::now();
        info!(total, client = client.name(), "dispatching prompt batch (settled)");
        let mut tasks = self.spawn_all(requests, client);
        let mut settled = SettledResponses::with_capacity(total);

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, outcome)) => {
                    if let Err(e) = &outcome {
                        warn!(%id, error = %e, "prompt request failed");
                    }
                    settled.insert(id, outcome);
                }
                Err(e) => debug!(error = %e, "prompt task ended without a result"),
            }
        }

        for id in requests.keys() {
            settled
                .entry(*id)
                .or_insert_with(|| Err(ClientError::Cancelled { id: *id }));
        }

        let failures = settled.values().filter(|r| r.is_err()).count();
        info!(
            total,
            failures,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "prompt batch settled"
        );
        settled
    }

    /// Generates prompts for `records` and dispatches them fail-fast.
    ///
    /// Results follow the order of `records`.
    pub async fn run<C>(
        &self,
        generator: &BatchGenerator,
        template: &str,
        records: &[Record],
        client: Arc<C>,
    ) -> crate::Result<Vec<PromptResult>>
    where
        C: PromptClient + ?Sized + 'static,
    {
        let rendered = generator.render_requests(template, records)?;
        let prompts: Prompts = rendered
            .iter()
            .map(|r| (r.id, r.prompt.clone()))
            .collect();
        let mut responses = self.dispatch(&prompts, client).await?;
        Ok(rendered
            .into_iter()
            .filter_map(|r| {
                responses.remove(&r.id).map(|response| PromptResult {
                    id: r.id,
                    prompt: r.prompt,
                    response,
                })
            })
            .collect())
    }

    fn spawn_all<C>(
        &self,
        requests: &Prompts,
        client: Arc<C>,
    ) -> JoinSet<(RequestId, std::result::Result<String, ClientError>)>
    where
        C: PromptClient + ?Sized + 'static,
    {
        let mut tasks = JoinSet::new();
        for (id, text) in requests {
            let id = *id;
            let text = text.clone();
            let client = Arc::clone(&client);
            let timeout = self.config.request_timeout;
            tasks.spawn(
                async move {
                    let outcome = send_one(client.as_ref(), id, &text, timeout).await;
                    (id, outcome)
                }
                .instrument(tracing::debug_span!("prompt_request", %id)),
            );
        }
        tasks
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

async fn send_one<C>(
    client: &C,
    id: RequestId,
    text: &str,
    timeout: Option<Duration>,
) -> std::result::Result<String, ClientError>
where
    C: PromptClient + ?Sized,
{
    let call = AssertUnwindSafe(client.send_request(id, text)).catch_unwind();
    let caught = match timeout {
        Some(after) => tokio::time::timeout(after, call)
            .await
            .map_err(|_| ClientError::Timeout { id, after })?,
        None => call.await,
    };
    caught.unwrap_or_else(|payload| {
        Err(ClientError::Panicked {
            id,
            message: panic_message(payload.as_ref()),
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
