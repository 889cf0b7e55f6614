//! # prompt-fanout
//!
//! 按记录渲染提示模板，并发分发到可插拔的请求客户端，并按请求标识符重新配对响应。
//!
//! Renders a prompt template once per record, sends every rendered prompt
//! concurrently through a pluggable request client, and pairs each response
//! with the request that produced it, whatever order the responses arrive in.
//!
//! ## Overview
//!
//! A batch moves through three stages:
//!
//! 1. **Generate**: [`batch::BatchGenerator`] gives each [`types::Record`] a fresh
//!    [`types::RequestId`] and fills the template with its fields.
//! 2. **Fan out**: [`batch::Dispatcher`] starts one task per prompt against a
//!    [`client::PromptClient`].
//! 3. **Fan in**: the dispatcher waits for every task and returns responses
//!    keyed by identifier.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use prompt_fanout::batch::run_batch;
//! use prompt_fanout::client::EmulatedClient;
//! use prompt_fanout::types::Record;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> prompt_fanout::Result<()> {
//!     let records = vec![
//!         Record::new().with("name", "Alice").with("subject", "Kotlin"),
//!         Record::new().with("name", "Bob").with("subject", "Rust"),
//!     ];
//!     let client = Arc::new(EmulatedClient::new());
//!
//!     for result in run_batch("I'm {{name}}, help me with {{subject}}", &records, client).await? {
//!         println!("{} -> {}", result.id, result.response);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Records, values, identifiers and identifier generators |
//! | [`template`] | `{{name}}` placeholder substitution |
//! | [`client`] | Request-client capability and the emulated client |
//! | [`batch`] | Batch generation and concurrent dispatch |
//! | [`job`] | Loading template + records from YAML/JSON |

pub mod batch;
pub mod client;
pub mod job;
pub mod template;
pub mod types;

// Re-export main types for convenience
pub use batch::{BatchError, BatchGenerator, DispatchConfig, Dispatcher, PromptResult, Prompts, Responses};
pub use client::{ClientError, EmulatedClient, PromptClient};
pub use job::BatchJob;
pub use template::{render, RenderError, Template};
pub use types::{Record, RequestId, Value};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
