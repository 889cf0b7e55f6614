//! 类型系统模块：定义批量提示生成与分发所需的核心数据类型。
//!
//! # Types Module
//!
//! This module defines the data model shared by generation and dispatch.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Value`] | Scalar field value (string, integer, float, boolean) |
//! | [`Record`] | Immutable field → value mapping used to fill one template |
//! | [`RequestId`] | Opaque correlation token assigned per record |
//! | [`IdGenerator`] | Injectable source of fresh identifiers |
//!
//! ## Submodules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`id`] | Identifiers and identifier generators |
//! | [`record`] | Records and scalar values |
//!
//! ## Example
//!
//! ```rust
//! use prompt_fanout::types::{IdGenerator, Record, SequentialIdGenerator};
//!
//! let record = Record::new().with("name", "Alice").with("time", 10);
//! assert_eq!(record.get("time").map(|v| v.to_string()), Some("10".to_string()));
//!
//! let ids = SequentialIdGenerator::new();
//! assert_ne!(ids.next_id(), ids.next_id());
//! ```

pub mod id;
pub mod record;

pub use id::{IdGenerator, RandomIdGenerator, RequestId, SequentialIdGenerator};
pub use record::{Record, Value};
