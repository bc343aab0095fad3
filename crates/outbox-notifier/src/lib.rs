//! Outbox notifier: enqueues "message created" jobs for downstream processing.
//!
//! After a write to the primary store commits, the write path hands the new
//! message (or the transaction-log record describing it) to the notifier,
//! which pushes a Resque-style job onto a Redis work queue.
//!
//! # Core Invariants
//!
//! 1. **Filtered**: only message creation produces a job; anything else is a
//!    no-op that never touches the backend
//! 2. **Coupled**: registering the queue name and pushing the job happen in
//!    one MULTI/EXEC pipeline, both or neither
//! 3. **Fail-open routing**: an unresolvable message or account routes to the
//!    default queue instead of dropping the job
//! 4. **Loud delivery**: backend failures always reach the caller
//! 5. **At-least-once**: no deduplication; consumers are idempotent
//!
//! # Architecture
//!
//! ```text
//! write path --commit--> OutboxNotifier --route--> QueueRouter
//!                              |
//!                              v
//!                        QueueBackend --pool--> Redis
//!                     SADD resque:queues <queue>
//!                     LPUSH resque:queue:<queue> <job>
//! ```

pub mod backend;
pub mod config;
pub mod directory;
pub mod error;
pub mod job;
pub mod model;
pub mod notifier;
pub mod pool;
pub mod router;

#[cfg(test)]
mod tests;

pub use backend::{Fault, MemoryQueueBackend, QueueBackend, QueueDepth, QueuePush, RedisQueueBackend};
pub use config::{NotifyConfig, TriggerPath};
pub use directory::{Directory, MemoryDirectory};
pub use error::{DeliveryError, DirectoryError, NotifyError, NotifyResult};
pub use job::{Job, JOB_CLASS, NOTIFICATION_KIND};
pub use model::{Account, ChangeEvent, Command, CommittedWrite, Message, Namespace, MESSAGE_ENTITY};
pub use notifier::{Delivery, Notification, OutboxNotifier, SkipReason};
pub use pool::{PoolConfig, PoolStatus, PooledConnection, RedisPool};
pub use router::{QueueKind, QueueRouter};
