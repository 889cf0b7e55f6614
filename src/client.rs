//! 请求客户端模块：定义发送单个提示请求的可插拔能力。
//!
//! # Request Client Module
//!
//! [`PromptClient`] is the transport boundary: send one rendered prompt, get one
//! response back. The dispatcher only ever talks to this trait, so a real HTTP
//! backend and the latency-emulating [`EmulatedClient`] are interchangeable.
//!
//! Implementations are shared across concurrently running tasks through an
//! `Arc` and must tolerate concurrent calls without external locking.

pub mod emulated;

pub use emulated::{EmulatedClient, EmulatedClientConfig};

use crate::types::RequestId;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single request.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request {id} failed: {message}")]
    Transport { id: RequestId, message: String },

    #[error("request {id} timed out after {}ms", .after.as_millis())]
    Timeout { id: RequestId, after: Duration },

    #[error("request {id} panicked: {message}")]
    Panicked { id: RequestId, message: String },

    #[error("request {id} was cancelled")]
    Cancelled { id: RequestId },
}

impl ClientError {
    pub fn transport(id: RequestId, message: impl Into<String>) -> Self {
        ClientError::Transport {
            id,
            message: message.into(),
        }
    }

    /// The request this failure belongs to.
    pub fn id(&self) -> RequestId {
        match self {
            ClientError::Transport { id, .. }
            | ClientError::Timeout { id, .. }
            | ClientError::Panicked { id, .. }
            | ClientError::Cancelled { id } => *id,
        }
    }
}

/// Sends one prompt and resolves to one response.
///
/// A call may take a long time; it must not block other in-flight calls.
/// Every accepted call completes or fails exactly once.
#[async_trait]
pub trait PromptClient: Send + Sync {
    async fn send_request(&self, id: RequestId, text: &str) -> Result<String, ClientError>;

    /// Short name used in logs.
    fn name(&self) -> &'static str {
        "prompt_client"
    }
}
