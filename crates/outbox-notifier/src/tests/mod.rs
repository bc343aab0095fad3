//! Scenario tests for the outbox notifier.
//!
//! - `harness.rs`          - Notifier wired to in-memory backend and directory
//! - `fake_redis.rs`       - RESP server standing in for Redis
//! - `backpressure.rs`     - Exhausted pool blocks callers, then lets them through
//! - `filtering.rs`        - Non-qualifying writes never reach the backend
//! - `routing.rs`          - Backlog vs live mail, fail-open fallbacks
//! - `payload.rs`          - Job content is independent of routing
//! - `atomicity.rs`        - Registry add and list push are both-or-neither
//! - `concurrency.rs`      - Concurrent pushes to one queue are all kept
//! - `delivery_failure.rs` - Backend failures surface, committed writes stay
//! - `trigger.rs`          - Only the canonical trigger path enqueues

mod atomicity;
mod backpressure;
mod filtering;
