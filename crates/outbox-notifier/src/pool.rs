//! Bounded connection pool for the queue backend.
//!
//! Built once per process and shared by handle. When every connection is
//! checked out, callers wait for one to come back (backpressure) instead of
//! failing. The wait is unbounded unless an acquire timeout is configured.

use crate::config::NotifyConfig;
use crate::error::DeliveryError;
use deadpool_redis::{Config, Pool, PoolError, Runtime, Timeouts};
use std::time::Duration;
use tracing::{info, warn};

/// A checked-out connection. Returned to the pool on drop.
pub type PooledConnection = deadpool_redis::Connection;

/// Pool settings.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub redis_url: String,
    pub max_connections: usize,
    /// `None` waits without bound for a free connection.
    pub acquire_timeout: Option<Duration>,
}

impl PoolConfig {
    pub fn from_notify_config(config: &NotifyConfig) -> Self {
        Self {
            redis_url: config.redis_url(),
            max_connections: config.max_connections,
            acquire_timeout: config.acquire_timeout(),
        }
    }
}

/// Snapshot of pool usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub max_connections: usize,
    /// Connections currently open, checked out or idle.
    pub open: usize,
    /// Open connections parked in the pool.
    pub idle: usize,
    /// Callers waiting for a connection.
    pub waiting: usize,
}

/// Handle to the shared pool. Cloning shares the same connections.
#[derive(Clone)]
pub struct RedisPool {
    pool: Pool,
    acquire_timeout: Option<Duration>,
}

impl RedisPool {
    /// Create the pool. No connection is opened until the first acquire.
    pub fn new(config: PoolConfig) -> Result<Self, DeliveryError> {
        let mut pool_config = deadpool_redis::PoolConfig::new(config.max_connections);
        pool_config.timeouts = Timeouts {
            wait: config.acquire_timeout,
            ..Timeouts::default()
        };

        let mut cfg = Config::from_url(config.redis_url.as_str());
        cfg.pool = Some(pool_config);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| DeliveryError::Unavailable(format!("invalid pool config: {}", e)))?;

        match config.acquire_timeout {
            Some(wait) => info!(
                max_connections = config.max_connections,
                acquire_timeout_ms = wait.as_millis() as u64,
                "Queue connection pool created"
            ),
            None => warn!(
                max_connections = config.max_connections,
                "Queue connection pool created with unbounded acquire wait; \
                 callers block indefinitely when the pool is exhausted"
            ),
        }

        Ok(Self {
            pool,
            acquire_timeout: config.acquire_timeout,
        })
    }

    /// Check out a connection, waiting while the pool is exhausted.
    pub async fn acquire(&self) -> Result<PooledConnection, DeliveryError> {
        self.pool.get().await.map_err(|e| match e {
            PoolError::Backend(e) => DeliveryError::Redis(e),
            // Only the wait timeout is configured.
            PoolError::Timeout(_) => {
                DeliveryError::PoolExhausted(self.acquire_timeout.unwrap_or_default())
            }
            other => DeliveryError::Unavailable(other.to_string()),
        })
    }

    pub fn status(&self) -> PoolStatus {
        let status = self.pool.status();
        PoolStatus {
            max_connections: status.max_size,
            open: status.size,
            idle: status.available,
            waiting: status.waiting,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fake_redis::FakeRedis;

    fn config(redis_url: String, acquire_timeout: Option<Duration>) -> PoolConfig {
        PoolConfig {
            redis_url,
            max_connections: 1,
            acquire_timeout,
        }
    }

    #[test]
    fn test_rejects_bad_url() {
        assert!(RedisPool::new(config("not a url".to_string(), None)).is_err());
    }

    #[test]
    fn test_from_notify_config() {
        let mut notify = NotifyConfig::new("queue.internal", 4);
        notify.max_connections = 12;
        notify.acquire_timeout_ms = Some(100);

        let cfg = PoolConfig::from_notify_config(&notify);
        assert_eq!(cfg.redis_url, "redis://queue.internal:6379/4");
        assert_eq!(cfg.max_connections, 12);
        assert_eq!(cfg.acquire_timeout, Some(Duration::from_millis(100)));
    }

    #[tokio::test]
    async fn test_exhausted_pool_times_out() {
        let server = FakeRedis::start().await;
        let pool = RedisPool::new(config(server.url(), Some(Duration::from_millis(50)))).unwrap();

        let _held = pool.acquire().await.unwrap();
        let result = pool.acquire().await;
        assert!(matches!(result, Err(DeliveryError::PoolExhausted(_))));
    }

    #[tokio::test]
    async fn test_connection_is_reused() {
        let server = FakeRedis::start().await;
        let pool = RedisPool::new(config(server.url(), None)).unwrap();

        drop(pool.acquire().await.unwrap());
        drop(pool.acquire().await.unwrap());

        assert_eq!(server.connections(), 1);
        let status = pool.status();
        assert_eq!(status.open, 1);
        assert_eq!(status.idle, 1);
    }

    #[tokio::test]
    async fn test_failed_connect_is_redis_error() {
        let pool = RedisPool::new(config(
            "redis://127.0.0.1:1/0".to_string(),
            Some(Duration::from_millis(200)),
        ))
        .unwrap();

        assert!(matches!(pool.acquire().await, Err(DeliveryError::Redis(_))));
        assert!(matches!(pool.acquire().await, Err(DeliveryError::Redis(_))));

        let status = pool.status();
        assert_eq!(status.max_connections, 1);
        assert_eq!(status.open, 0);
        assert_eq!(status.waiting, 0);
    }
}
