//! Pool exhaustion holds callers back until a connection is returned.

use super::fake_redis::FakeRedis;
use crate::backend::{QueueBackend, QueuePush, RedisQueueBackend};
use crate::error::DeliveryError;
use crate::pool::{PoolConfig, RedisPool};
use std::time::Duration;

fn single_connection_pool(server: &FakeRedis, acquire_timeout: Option<Duration>) -> RedisPool {
    RedisPool::new(PoolConfig {
        redis_url: server.url(),
        max_connections: 1,
        acquire_timeout,
    })
    .unwrap()
}

#[tokio::test]
async fn test_waiter_proceeds_once_connection_returns() {
    let server = FakeRedis::start().await;
    let pool = single_connection_pool(&server, None);

    let held = pool.acquire().await.unwrap();

    let waiter = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.acquire().await.map(drop) })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!waiter.is_finished(), "acquire should block while the pool is exhausted");
    assert_eq!(pool.status().waiting, 1);

    drop(held);

    let result = tokio::time::timeout(Duration::from_secs(2), waiter)
        .await
        .expect("waiter should wake after the connection is returned")
        .unwrap();
    assert!(result.is_ok());
    assert_eq!(server.connections(), 1, "the returned connection is reused");
}

#[tokio::test]
async fn test_bounded_wait_gives_up() {
    let server = FakeRedis::start().await;
    let pool = single_connection_pool(&server, Some(Duration::from_millis(50)));

    let _held = pool.acquire().await.unwrap();
    let err = pool.acquire().await.err().expect("acquire should fail while the pool is exhausted");

    assert!(matches!(err, DeliveryError::PoolExhausted(wait) if wait == Duration::from_millis(50)));
    assert!(!err.is_ambiguous());
}

#[tokio::test]
async fn test_pushes_queue_behind_a_held_connection() {
    let server = FakeRedis::start().await;
    let pool = single_connection_pool(&server, None);
    let backend = RedisQueueBackend::new(pool.clone(), Duration::from_secs(2));

    let held = pool.acquire().await.unwrap();
    let push = QueuePush {
        registry_key: "resque:queues".to_string(),
        queue_name: "nylas_default".to_string(),
        list_key: "resque:queue:nylas_default".to_string(),
        payload: "{}".to_string(),
    };

    let pending = tokio::spawn(async move { backend.push(&push).await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!pending.is_finished());
    assert!(server.data_commands().is_empty());

    drop(held);

    tokio::time::timeout(Duration::from_secs(2), pending)
        .await
        .expect("push should complete once the connection is free")
        .unwrap()
        .unwrap();
    assert_eq!(server.data_commands().len(), 4);
}
