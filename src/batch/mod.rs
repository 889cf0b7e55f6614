//! 批处理模块：为每条记录生成提示，并发分发并按标识符回收结果。
//!
//! # Prompt Batch Module
//!
//! Turns a template plus a list of records into a batch of prompts, sends every
//! prompt concurrently and pairs each response with the prompt that produced it.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`BatchGenerator`] | Assigns an identifier to each record and renders its prompt |
//! | [`Dispatcher`] | Fans out one task per prompt and collects the responses |
//! | [`DispatchConfig`] | Per-request timeout |
//! | [`BatchError`] | Fail-fast outcome: first failure plus what happened to the rest |
//! | [`PromptResult`] | Identifier, prompt and response triple |
//!
//! ## Failure Policies
//!
//! - [`Dispatcher::dispatch`]: **fail-fast**. The first failed request cancels the
//!   remaining ones and the batch resolves to a single [`BatchError`].
//! - [`Dispatcher::dispatch_settled`]: **collect-all**. Every request runs to
//!   completion and each identifier maps to its own `Result`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use prompt_fanout::batch::{BatchGenerator, Dispatcher};
//! use prompt_fanout::client::EmulatedClient;
//! use prompt_fanout::types::Record;
//! use std::sync::Arc;
//!
//! # async fn demo() -> prompt_fanout::Result<()> {
//! let records = vec![Record::new().with("name", "Alice"), Record::new().with("name", "Bob")];
//! let prompts = BatchGenerator::new().generate("Hi {{name}}", &records)?;
//!
//! let client = Arc::new(EmulatedClient::with_seed(7));
//! let responses = Dispatcher::new().dispatch(&prompts, client).await?;
//! assert_eq!(responses.len(), prompts.len());
//! # Ok(())
//! # }
//! ```

mod dispatcher;
mod generator;

pub use dispatcher::{
    BatchError, DispatchConfig, Dispatcher, PromptResult, Responses, SettledResponses,
};
pub use generator::{generate, BatchGenerator, Prompts, RenderedRequest};

use crate::client::PromptClient;
use crate::types::Record;
use std::sync::Arc;

/// Fail-fast dispatch with default settings.
pub async fn dispatch<C>(requests: &Prompts, client: Arc<C>) -> Result<Responses, BatchError>
where
    C: PromptClient + ?Sized + 'static,
{
    Dispatcher::new().dispatch(requests, client).await
}

/// Generates and dispatches a batch with default settings; results follow `records` order.
pub async fn run_batch<C>(
    template: &str,
    records: &[Record],
    client: Arc<C>,
) -> crate::Result<Vec<PromptResult>>
where
    C: PromptClient + ?Sized + 'static,
{
    Dispatcher::new()
        .run(&BatchGenerator::new(), template, records, client)
        .await
}
