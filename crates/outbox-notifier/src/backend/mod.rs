//! Queue backends.
//!
//! A backend stores a registry set of queue names plus one FIFO list per
//! queue. A push registers the queue and appends the job as a single atomic
//! operation, so a job is never visible in a list whose queue is missing
//! from the registry.
//!
//! - `RedisQueueBackend`: Resque-compatible Redis lists (production)
//! - `MemoryQueueBackend`: in-process state with fault injection (dry runs, tests)

pub mod memory;
pub mod redis_backend;

pub use memory::{Fault, MemoryQueueBackend};
pub use redis_backend::RedisQueueBackend;

use crate::error::DeliveryError;
use async_trait::async_trait;

/// One registry-add plus list-push, applied atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuePush {
    /// Registry set key.
    pub registry_key: String,
    /// Queue name added to the registry.
    pub queue_name: String,
    /// List key the payload is pushed onto.
    pub list_key: String,
    /// Serialized job.
    pub payload: String,
}

/// Length and registration of one queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueDepth {
    pub queue_name: String,
    pub registered: bool,
    pub length: usize,
}

/// Storage the notifier pushes jobs into.
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// Register the queue and append the payload in one atomic operation.
    async fn push(&self, push: &QueuePush) -> Result<(), DeliveryError>;

    /// Report registration and length of the given queues.
    async fn depths(
        &self,
        registry_key: &str,
        queue_key_prefix: &str,
        queue_names: &[&str],
    ) -> Result<Vec<QueueDepth>, DeliveryError>;
}
