//! outbox-notifier binary entry point.
//!
//! Usage:
//!   outbox-notifier [--config <file>] enqueue --namespace-id <id> ...
//!   outbox-notifier [--config <file>] status
//!
//! `enqueue` re-drives the notification of one message, e.g. after the write
//! path reported a delivery failure. `status` prints queue depths.
//! Without `--config`, settings come from the NOTIFY_QUEUE_* environment.

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use outbox_notifier::{
    Account, ChangeEvent, Command, CommittedWrite, MemoryDirectory, MemoryQueueBackend, Message,
    Namespace, Notification, NotifyConfig, OutboxNotifier, PoolConfig, QueueBackend, RedisPool,
    RedisQueueBackend, TriggerPath, MESSAGE_ENTITY,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Enqueue "message created" jobs onto the notification work queues.
#[derive(Parser, Debug)]
#[command(name = "outbox-notifier")]
#[command(about = "Enqueue message notifications onto Redis work queues")]
struct Args {
    /// JSON config file. Falls back to NOTIFY_QUEUE_* variables.
    #[arg(long, env = "NOTIFY_QUEUE_CONFIG")]
    config: Option<PathBuf>,

    /// Queue backend hostname.
    #[arg(long)]
    redis_host: Option<String>,

    /// Queue backend port.
    #[arg(long)]
    redis_port: Option<u16>,

    /// Logical database index.
    #[arg(long)]
    redis_db: Option<i64>,

    /// Use an in-memory backend instead of Redis.
    #[arg(long)]
    dry_run: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format (compact, json)
    #[arg(long, default_value = "compact")]
    log_format: String,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Enqueue the notification for one message.
    Enqueue {
        /// Internal namespace id.
        #[arg(long)]
        namespace_id: i64,

        /// Namespace public id carried in the job.
        #[arg(long)]
        namespace_public_id: String,

        /// Message public id carried in the job.
        #[arg(long)]
        message_public_id: String,

        /// When the message was received (RFC 3339).
        #[arg(long)]
        received_at: DateTime<Utc>,

        /// When the owning account was created (RFC 3339). Without it the
        /// job goes to the default queue.
        #[arg(long)]
        account_created_at: Option<DateTime<Utc>>,
    },

    /// Print registry membership and length of both queues.
    Status,
}

fn load_config(args: &Args) -> anyhow::Result<NotifyConfig> {
    let mut config = match &args.config {
        Some(path) => NotifyConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None if args.dry_run => NotifyConfig::from_lookup_or_local(|key| std::env::var(key).ok())
            .context("loading NOTIFY_QUEUE_* environment")?,
        None => NotifyConfig::from_env().context("loading NOTIFY_QUEUE_* environment")?,
    };

    if let Some(host) = &args.redis_host {
        config.redis_host = host.clone();
    }
    if let Some(port) = args.redis_port {
        config.redis_port = port;
    }
    if let Some(db) = args.redis_db {
        config.redis_db = db;
    }

    config.validate()?;
    Ok(config)
}

fn build_backend(config: &NotifyConfig, dry_run: bool) -> anyhow::Result<Arc<dyn QueueBackend>> {
    if dry_run {
        info!("Dry run, jobs go to an in-memory backend");
        return Ok(Arc::new(MemoryQueueBackend::new()));
    }

    let pool = RedisPool::new(PoolConfig::from_notify_config(config))?;
    Ok(Arc::new(RedisQueueBackend::new(pool, config.command_timeout())))
}

fn redrive_write(
    trigger: TriggerPath,
    namespace_id: i64,
    message: &Message,
) -> CommittedWrite {
    match trigger {
        TriggerPath::MessageCreated => CommittedWrite::MessageCreated(message.clone()),
        TriggerPath::TransactionLog => CommittedWrite::Transaction(ChangeEvent::new(
            Command::Insert,
            MESSAGE_ENTITY,
            message.public_id.clone(),
            namespace_id,
            0,
        )),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    observability::init_with_config(observability::LogConfig {
        service_name: "outbox-notifier".into(),
        default_level: args.log_level.clone(),
        format: observability::LogFormat::from_name(&args.log_format),
    });

    let config = load_config(&args)?;
    info!(
        redis_url = %config.redis_url(),
        max_connections = config.max_connections,
        trigger = ?config.trigger,
        dry_run = args.dry_run,
        "Configuration loaded"
    );

    let backend = build_backend(&config, args.dry_run)?;
    let directory = Arc::new(MemoryDirectory::new());
    let notifier = OutboxNotifier::new(&config, backend, directory.clone());

    match args.command {
        CliCommand::Enqueue {
            namespace_id,
            namespace_public_id,
            message_public_id,
            received_at,
            account_created_at,
        } => {
            directory.insert_namespace(Namespace {
                id: namespace_id,
                public_id: namespace_public_id,
                account: account_created_at.map(|created_at| Account {
                    id: 0,
                    public_id: String::new(),
                    email_address: String::new(),
                    provider: "unknown".to_string(),
                    created_at,
                }),
            })?;

            let message = Message {
                public_id: message_public_id,
                namespace_id,
                received_at,
            };
            directory.insert_message(message.clone());

            let write = redrive_write(notifier.trigger(), namespace_id, &message);
            match notifier.on_commit(&write).await {
                Ok(Notification::Enqueued(delivery)) => {
                    println!(
                        "enqueued on {} ({}): {}",
                        delivery.queue_name,
                        delivery.queue,
                        delivery.job.to_json()?
                    );
                }
                Ok(Notification::Skipped(reason)) => {
                    println!("skipped: {:?}", reason);
                }
                Err(e) => {
                    error!(error = %e, "Enqueue failed");
                    return Err(e.into());
                }
            }
        }
        CliCommand::Status => {
            for depth in notifier.queue_depths().await? {
                println!(
                    "{:<24} registered={:<5} length={}",
                    depth.queue_name, depth.registered, depth.length
                );
            }
        }
    }

    Ok(())
}
