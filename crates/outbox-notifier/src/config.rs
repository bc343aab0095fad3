//! Configuration for the outbox notifier.

use crate::error::{NotifyError, NotifyResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default Redis port.
pub const DEFAULT_REDIS_PORT: u16 = 6379;

/// Default ceiling on concurrent backend connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 40;

/// Default timeout for one pipelined push round-trip.
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 5000;

/// Set of queue names that backlog-scanning workers poll.
pub const DEFAULT_REGISTRY_KEY: &str = "resque:queues";

/// Prefix of the per-queue job lists.
pub const DEFAULT_QUEUE_KEY_PREFIX: &str = "resque:queue:";

/// Queue for live mail.
pub const DEFAULT_QUEUE: &str = "nylas_default";

/// Queue for backlog / historical import traffic.
pub const DEFAULT_LOW_PRIORITY_QUEUE: &str = "nylas_low";

/// Which inbound shape is the canonical trigger.
///
/// Both shapes are accepted by the notifier API, but only the configured one
/// enqueues. Wiring both would enqueue one logical event twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerPath {
    /// The write path hands over the newly created message.
    #[default]
    MessageCreated,
    /// Records are read back from the transaction log.
    TransactionLog,
}

impl TriggerPath {
    fn parse(value: &str) -> NotifyResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "message_created" | "message" => Ok(Self::MessageCreated),
            "transaction_log" | "transaction" => Ok(Self::TransactionLog),
            other => Err(NotifyError::Config(format!(
                "Unknown trigger path '{}', expected message_created or transaction_log",
                other
            ))),
        }
    }
}

/// Outbox notifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Queue backend hostname.
    pub redis_host: String,

    /// Queue backend port.
    #[serde(default = "default_redis_port")]
    pub redis_port: u16,

    /// Logical database index.
    #[serde(default)]
    pub redis_db: i64,

    /// Maximum number of concurrent backend connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// How long a caller waits for a pooled connection.
    /// `None` waits without bound.
    #[serde(default)]
    pub acquire_timeout_ms: Option<u64>,

    /// Timeout for one pipelined push.
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,

    /// Registry set key.
    #[serde(default = "default_registry_key")]
    pub registry_key: String,

    /// Prefix prepended to a queue name to form its list key.
    #[serde(default = "default_queue_key_prefix")]
    pub queue_key_prefix: String,

    /// Name of the normal-priority queue.
    #[serde(default = "default_queue")]
    pub default_queue: String,

    /// Name of the low-priority queue.
    #[serde(default = "default_low_priority_queue")]
    pub low_priority_queue: String,

    /// Canonical trigger path.
    #[serde(default)]
    pub trigger: TriggerPath,
}

fn default_redis_port() -> u16 {
    DEFAULT_REDIS_PORT
}

fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}

fn default_command_timeout_ms() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_MS
}

fn default_registry_key() -> String {
    DEFAULT_REGISTRY_KEY.to_string()
}

fn default_queue_key_prefix() -> String {
    DEFAULT_QUEUE_KEY_PREFIX.to_string()
}

fn default_queue() -> String {
    DEFAULT_QUEUE.to_string()
}

fn default_low_priority_queue() -> String {
    DEFAULT_LOW_PRIORITY_QUEUE.to_string()
}

impl NotifyConfig {
    /// Create a config for the given host with defaults everywhere else.
    pub fn new(redis_host: impl Into<String>, redis_db: i64) -> Self {
        Self {
            redis_host: redis_host.into(),
            redis_port: DEFAULT_REDIS_PORT,
            redis_db,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout_ms: None,
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
            registry_key: default_registry_key(),
            queue_key_prefix: default_queue_key_prefix(),
            default_queue: default_queue(),
            low_priority_queue: default_low_priority_queue(),
            trigger: TriggerPath::default(),
        }
    }

    /// Load configuration from the process environment.
    ///
    /// `NOTIFY_QUEUE_REDIS_HOSTNAME` and `NOTIFY_QUEUE_REDIS_DB` are required.
    pub fn from_env() -> NotifyResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> NotifyResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("NOTIFY_QUEUE_REDIS_HOSTNAME").ok_or_else(|| {
            NotifyError::Config("NOTIFY_QUEUE_REDIS_HOSTNAME is not set".to_string())
        })?;
        let db_raw = lookup("NOTIFY_QUEUE_REDIS_DB")
            .ok_or_else(|| NotifyError::Config("NOTIFY_QUEUE_REDIS_DB is not set".to_string()))?;
        let db = parse_int("NOTIFY_QUEUE_REDIS_DB", &db_raw)?;

        let mut config = Self::new(host, db);

        if let Some(port) = lookup("NOTIFY_QUEUE_REDIS_PORT") {
            config.redis_port = parse_int("NOTIFY_QUEUE_REDIS_PORT", &port)?;
        }
        if let Some(max) = lookup("NOTIFY_QUEUE_MAX_CONNECTIONS") {
            config.max_connections = parse_int("NOTIFY_QUEUE_MAX_CONNECTIONS", &max)?;
        }
        if let Some(ms) = lookup("NOTIFY_QUEUE_ACQUIRE_TIMEOUT_MS") {
            config.acquire_timeout_ms = Some(parse_int("NOTIFY_QUEUE_ACQUIRE_TIMEOUT_MS", &ms)?);
        }
        if let Some(ms) = lookup("NOTIFY_QUEUE_COMMAND_TIMEOUT_MS") {
            config.command_timeout_ms = parse_int("NOTIFY_QUEUE_COMMAND_TIMEOUT_MS", &ms)?;
        }
        if let Some(trigger) = lookup("NOTIFY_QUEUE_TRIGGER") {
            config.trigger = TriggerPath::parse(&trigger)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Like [`from_lookup`](Self::from_lookup), but an unset hostname yields
    /// local defaults instead of an error. Other invalid values still fail.
    pub fn from_lookup_or_local<F>(lookup: F) -> NotifyResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if lookup("NOTIFY_QUEUE_REDIS_HOSTNAME").is_some() {
            return Self::from_lookup(lookup);
        }
        let local = |key: &str| match key {
            "NOTIFY_QUEUE_REDIS_HOSTNAME" => Some("127.0.0.1".to_string()),
            "NOTIFY_QUEUE_REDIS_DB" => Some(lookup(key).unwrap_or_else(|| "0".to_string())),
            _ => lookup(key),
        };
        Self::from_lookup(local)
    }

    /// Load configuration from a JSON file.
    pub fn load_from_file(path: &Path) -> NotifyResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: NotifyConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the notifier cannot run with.
    pub fn validate(&self) -> NotifyResult<()> {
        if self.redis_host.trim().is_empty() {
            return Err(NotifyError::Config("redis_host must not be empty".to_string()));
        }
        if self.max_connections == 0 {
            return Err(NotifyError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.command_timeout_ms == 0 {
            return Err(NotifyError::Config(
                "command_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.default_queue.is_empty() || self.low_priority_queue.is_empty() {
            return Err(NotifyError::Config("queue names must not be empty".to_string()));
        }
        if self.default_queue == self.low_priority_queue {
            return Err(NotifyError::Config(
                "default_queue and low_priority_queue must differ".to_string(),
            ));
        }
        Ok(())
    }

    /// Connection URL for the queue backend.
    pub fn redis_url(&self) -> String {
        format!(
            "redis://{}:{}/{}",
            self.redis_host, self.redis_port, self.redis_db
        )
    }

    /// Wait bound for pool acquisition.
    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_ms.map(Duration::from_millis)
    }

    /// Round-trip bound for one push.
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

fn parse_int<T: std::str::FromStr>(key: &str, raw: &str) -> NotifyResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| NotifyError::Config(format!("{} must be an integer, got '{}'", key, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_from_lookup_defaults() {
        let config = NotifyConfig::from_lookup(lookup(&[
            ("NOTIFY_QUEUE_REDIS_HOSTNAME", "queue.internal"),
            ("NOTIFY_QUEUE_REDIS_DB", "3"),
        ]))
        .unwrap();

        assert_eq!(config.redis_host, "queue.internal");
        assert_eq!(config.redis_port, 6379);
        assert_eq!(config.redis_db, 3);
        assert_eq!(config.max_connections, 40);
        assert!(config.acquire_timeout().is_none());
        assert_eq!(config.command_timeout(), Duration::from_secs(5));
        assert_eq!(config.trigger, TriggerPath::MessageCreated);
        assert_eq!(config.redis_url(), "redis://queue.internal:6379/3");
    }

    #[test]
    fn test_config_from_lookup_overrides() {
        let config = NotifyConfig::from_lookup(lookup(&[
            ("NOTIFY_QUEUE_REDIS_HOSTNAME", "localhost"),
            ("NOTIFY_QUEUE_REDIS_DB", "0"),
            ("NOTIFY_QUEUE_REDIS_PORT", "6380"),
            ("NOTIFY_QUEUE_MAX_CONNECTIONS", "8"),
            ("NOTIFY_QUEUE_ACQUIRE_TIMEOUT_MS", "250"),
            ("NOTIFY_QUEUE_COMMAND_TIMEOUT_MS", "1500"),
            ("NOTIFY_QUEUE_TRIGGER", "transaction_log"),
        ]))
        .unwrap();

        assert_eq!(config.redis_port, 6380);
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.acquire_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.command_timeout(), Duration::from_millis(1500));
        assert_eq!(config.trigger, TriggerPath::TransactionLog);
    }

    #[test]
    fn test_config_requires_host_and_db() {
        let err = NotifyConfig::from_lookup(lookup(&[("NOTIFY_QUEUE_REDIS_DB", "0")])).unwrap_err();
        assert!(err.to_string().contains("NOTIFY_QUEUE_REDIS_HOSTNAME"));

        let err =
            NotifyConfig::from_lookup(lookup(&[("NOTIFY_QUEUE_REDIS_HOSTNAME", "h")])).unwrap_err();
        assert!(err.to_string().contains("NOTIFY_QUEUE_REDIS_DB"));
    }

    #[test]
    fn test_config_rejects_non_integer_db() {
        let err = NotifyConfig::from_lookup(lookup(&[
            ("NOTIFY_QUEUE_REDIS_HOSTNAME", "h"),
            ("NOTIFY_QUEUE_REDIS_DB", "zero"),
        ]))
        .unwrap_err();
        assert!(matches!(err, NotifyError::Config(_)));
    }

    #[test]
    fn test_config_rejects_unknown_trigger() {
        let err = NotifyConfig::from_lookup(lookup(&[
            ("NOTIFY_QUEUE_REDIS_HOSTNAME", "h"),
            ("NOTIFY_QUEUE_REDIS_DB", "0"),
            ("NOTIFY_QUEUE_TRIGGER", "both"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("Unknown trigger path"));
    }

    #[test]
    fn test_local_fallback_only_when_host_unset() {
        let config = NotifyConfig::from_lookup_or_local(lookup(&[])).unwrap();
        assert_eq!(config.redis_url(), "redis://127.0.0.1:6379/0");

        let config = NotifyConfig::from_lookup_or_local(lookup(&[
            ("NOTIFY_QUEUE_MAX_CONNECTIONS", "3"),
        ]))
        .unwrap();
        assert_eq!(config.max_connections, 3);

        let err = NotifyConfig::from_lookup_or_local(lookup(&[(
            "NOTIFY_QUEUE_REDIS_DB",
            "zero",
        )]))
        .unwrap_err();
        assert!(matches!(err, NotifyError::Config(_)));

        let err = NotifyConfig::from_lookup_or_local(lookup(&[
            ("NOTIFY_QUEUE_REDIS_HOSTNAME", "queue.internal"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("NOTIFY_QUEUE_REDIS_DB"));
    }

    #[test]
    fn test_validate() {
        let mut config = NotifyConfig::new("localhost", 0);
        assert!(config.validate().is_ok());

        config.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = NotifyConfig::new("localhost", 0);
        config.low_priority_queue = config.default_queue.clone();
        assert!(config.validate().is_err());

        let config = NotifyConfig::new("  ", 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_load_from_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("notify.json");

        let config_json = r#"{
            "redis_host": "redis.local",
            "redis_db": 2,
            "max_connections": 10,
            "low_priority_queue": "mail_backfill"
        }"#;
        std::fs::write(&config_path, config_json).unwrap();

        let config = NotifyConfig::load_from_file(&config_path).unwrap();
        assert_eq!(config.redis_host, "redis.local");
        assert_eq!(config.redis_db, 2);
        assert_eq!(config.redis_port, DEFAULT_REDIS_PORT);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.default_queue, DEFAULT_QUEUE);
        assert_eq!(config.low_priority_queue, "mail_backfill");
        assert_eq!(config.registry_key, DEFAULT_REGISTRY_KEY);
    }

    #[test]
    fn test_config_load_from_missing_file() {
        let dir = tempdir().unwrap();
        let result = NotifyConfig::load_from_file(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(NotifyError::Io(_))));
    }
}
