//! In-memory queue backend.
//!
//! Mirrors the Redis layout (registry sets and lists keyed by name) and
//! applies each push as a staged transaction: commands are queued and only
//! applied together on commit. Faults can be injected to exercise delivery
//! failure handling.

use super::{QueueBackend, QueueDepth, QueuePush};
use crate::error::DeliveryError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// Failure to inject into the next push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The backend cannot be reached; nothing is applied.
    Unreachable,
    /// The connection drops after the first command is queued and before
    /// the transaction commits; nothing is applied.
    AbortBetweenCommands,
    /// The push is applied but the reply never arrives.
    TimeoutAfterApply,
}

#[derive(Debug)]
enum Op {
    SAdd { key: String, member: String },
    LPush { key: String, value: String },
}

#[derive(Debug, Default)]
struct MemoryState {
    sets: HashMap<String, HashSet<String>>,
    lists: HashMap<String, VecDeque<String>>,
}

impl MemoryState {
    fn commit(&mut self, ops: Vec<Op>) {
        for op in ops {
            match op {
                Op::SAdd { key, member } => {
                    self.sets.entry(key).or_default().insert(member);
                }
                Op::LPush { key, value } => {
                    self.lists.entry(key).or_default().push_front(value);
                }
            }
        }
    }
}

/// In-process queue store.
#[derive(Debug, Default)]
pub struct MemoryQueueBackend {
    state: Mutex<MemoryState>,
    faults: Mutex<VecDeque<Fault>>,
    calls: AtomicUsize,
    latency: Option<Duration>,
}

impl MemoryQueueBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every push by `latency` before it is applied.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Make the next push fail with `fault`. Faults are consumed in order.
    pub fn inject_fault(&self, fault: Fault) {
        lock(&self.faults).push_back(fault);
    }

    /// Number of backend operations issued so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Members of a registry set.
    pub fn registry(&self, key: &str) -> HashSet<String> {
        lock(&self.state).sets.get(key).cloned().unwrap_or_default()
    }

    /// List contents, most recently pushed first (Redis `LRANGE 0 -1` order).
    pub fn list(&self, key: &str) -> Vec<String> {
        lock(&self.state)
            .lists
            .get(key)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn list_len(&self, key: &str) -> usize {
        lock(&self.state).lists.get(key).map(VecDeque::len).unwrap_or(0)
    }

    fn next_fault(&self) -> Option<Fault> {
        lock(&self.faults).pop_front()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl QueueBackend for MemoryQueueBackend {
    async fn push(&self, push: &QueuePush) -> Result<(), DeliveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let fault = self.next_fault();
        if fault == Some(Fault::Unreachable) {
            return Err(DeliveryError::Unavailable("connection refused".to_string()));
        }

        let mut staged = vec![Op::SAdd {
            key: push.registry_key.clone(),
            member: push.queue_name.clone(),
        }];

        if fault == Some(Fault::AbortBetweenCommands) {
            debug!(queue = %push.queue_name, "Discarding staged transaction");
            return Err(DeliveryError::Unavailable(
                "connection lost before EXEC".to_string(),
            ));
        }

        staged.push(Op::LPush {
            key: push.list_key.clone(),
            value: push.payload.clone(),
        });

        lock(&self.state).commit(staged);

        if fault == Some(Fault::TimeoutAfterApply) {
            return Err(DeliveryError::Timeout(Duration::from_millis(0)));
        }

        Ok(())
    }

    async fn depths(
        &self,
        registry_key: &str,
        queue_key_prefix: &str,
        queue_names: &[&str],
    ) -> Result<Vec<QueueDepth>, DeliveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let state = lock(&self.state);
        let registry = state.sets.get(registry_key);

        Ok(queue_names
            .iter()
            .map(|name| QueueDepth {
                queue_name: name.to_string(),
                registered: registry.map(|set| set.contains(*name)).unwrap_or(false),
                length: state
                    .lists
                    .get(&format!("{}{}", queue_key_prefix, name))
                    .map(VecDeque::len)
                    .unwrap_or(0),
            })
            .collect())
    }
}
