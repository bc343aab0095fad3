//! Redis queue backend.
//!
//! Issues `SADD <registry> <queue>` and `LPUSH <prefix><queue> <job>` as one
//! MULTI/EXEC pipeline over a pooled connection.

use super::{QueueBackend, QueueDepth, QueuePush};
use crate::error::DeliveryError;
use crate::pool::{PooledConnection, RedisPool};
use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, warn};

/// Redis-backed queue store.
pub struct RedisQueueBackend {
    pool: RedisPool,
    command_timeout: Duration,
}

impl RedisQueueBackend {
    pub fn new(pool: RedisPool, command_timeout: Duration) -> Self {
        Self {
            pool,
            command_timeout,
        }
    }

    pub fn pool(&self) -> &RedisPool {
        &self.pool
    }
}

/// Build the transactional pipeline for one push.
fn push_pipeline(push: &QueuePush) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .sadd(&push.registry_key, &push.queue_name)
        .ignore()
        .lpush(&push.list_key, &push.payload)
        .ignore();
    pipe
}

/// Detach a connection from the pool so it is closed instead of reused.
fn discard(conn: PooledConnection) {
    drop(PooledConnection::take(conn));
}

#[async_trait]
impl QueueBackend for RedisQueueBackend {
    async fn push(&self, push: &QueuePush) -> Result<(), DeliveryError> {
        let mut conn = self.pool.acquire().await?;
        let mut pipe = push_pipeline(push);

        let result = tokio::time::timeout(self.command_timeout, async {
            let outcome: redis::RedisResult<()> = pipe.query_async(&mut conn).await;
            outcome
        })
        .await;

        pipe.clear();

        match result {
            Ok(Ok(())) => {
                debug!(
                    queue = %push.queue_name,
                    list = %push.list_key,
                    "Pipeline executed"
                );
                Ok(())
            }
            Ok(Err(e)) => {
                if e.is_io_error() || e.is_connection_dropped() {
                    discard(conn);
                }
                Err(e.into())
            }
            Err(_) => {
                warn!(
                    queue = %push.queue_name,
                    timeout_ms = self.command_timeout.as_millis() as u64,
                    "Pipeline timed out, push outcome unknown"
                );
                discard(conn);
                Err(DeliveryError::Timeout(self.command_timeout))
            }
        }
    }

    async fn depths(
        &self,
        registry_key: &str,
        queue_key_prefix: &str,
        queue_names: &[&str],
    ) -> Result<Vec<QueueDepth>, DeliveryError> {
        let mut conn = self.pool.acquire().await?;
        let mut depths = Vec::with_capacity(queue_names.len());

        for name in queue_names {
            let registered: bool = conn.sismember(registry_key, *name).await?;
            let length: usize = conn.llen(format!("{}{}", queue_key_prefix, name)).await?;
            depths.push(QueueDepth {
                queue_name: name.to_string(),
                registered,
                length,
            });
        }

        Ok(depths)
    }
}
