//! Keylatch lock operator CLI.

#![forbid(unsafe_code)]

mod command;
mod lockctl_config;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use keylatch_application::{LockBackend, LockClient, LockStore, ScopedLock, StoreLockBackend};
use keylatch_core::{LockError, LockResult};
use keylatch_domain::{AcquiredLock, format_timestamp};
use keylatch_infrastructure::{InMemoryLockStore, PostgresLockStore, RedisLockStore};
use sqlx::postgres::PgPoolOptions;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::command::{Cli, Command, LeaseArgs};
use crate::lockctl_config::{LockStoreConfig, LockctlConfig, init_tracing};

#[tokio::main]
async fn main() -> Result<(), LockError> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    init_tracing();

    let config = LockctlConfig::load()?;

    let store = connect_store(&config.store).await?;
    let backend: Arc<dyn LockBackend> = Arc::new(StoreLockBackend::new(store));

    run_command(backend, cli.command, config.default_ttl_seconds).await
}

async fn connect_store(config: &LockStoreConfig) -> LockResult<Arc<dyn LockStore>> {
    match config {
        LockStoreConfig::Memory => {
            warn!("using in-memory lock store; locks are not shared with other processes");
            Ok(Arc::new(InMemoryLockStore::new()))
        }
        LockStoreConfig::Redis {
            url,
            key_prefix,
            key_attribute,
        } => {
            let client = redis::Client::open(url.as_str())
                .map_err(|error| LockError::Validation(format!("invalid REDIS_URL: {error}")))?;
            let store = RedisLockStore::with_key_attribute(
                client,
                key_prefix.as_str(),
                key_attribute.as_str(),
            )?;
            info!(key_prefix = %key_prefix, "using redis lock store");
            Ok(Arc::new(store))
        }
        LockStoreConfig::Postgres {
            database_url,
            table,
            key_attribute,
        } => {
            let pool = PgPoolOptions::new()
                .max_connections(2)
                .connect(database_url.as_str())
                .await
                .map_err(|error| {
                    LockError::Store(format!("failed to connect to database: {error}"))
                })?;
            let store =
                PostgresLockStore::with_layout(pool, table.as_str(), key_attribute.as_str())?;
            store.ensure_schema().await?;
            info!(table = %table, "using postgres lock store");
            Ok(Arc::new(store))
        }
    }
}

async fn run_command(
    backend: Arc<dyn LockBackend>,
    command: Command,
    default_ttl_seconds: u32,
) -> LockResult<()> {
    let client = LockClient::new(Arc::clone(&backend));

    match command {
        Command::Acquire(LeaseArgs { key, ttl_seconds }) => {
            let ttl_seconds = ttl_seconds.unwrap_or(default_ttl_seconds);
            let lock = client.acquire(key.as_str(), ttl_seconds).await?;
            print_lock(&lock)
        }
        Command::Release(owner) => {
            let released = client
                .release(owner.key.as_str(), owner.owner_token.as_str())
                .await;
            println!("{}", if released { "released" } else { "not released" });
            Ok(())
        }
        Command::Refresh { owner, ttl_seconds } => {
            let ttl_seconds = ttl_seconds.unwrap_or(default_ttl_seconds);
            let lock = client
                .refresh(owner.key.as_str(), owner.owner_token.as_str(), ttl_seconds)
                .await?;
            println!("{}", format_timestamp(lock.expires_at()));
            Ok(())
        }
        Command::Status { key } => {
            let locked = client.is_locked(key.as_str()).await?;
            println!("{}", if locked { "locked" } else { "unlocked" });
            Ok(())
        }
        Command::Hold(LeaseArgs { key, ttl_seconds }) => {
            let ttl_seconds = ttl_seconds.unwrap_or(default_ttl_seconds);
            let mut handle = ScopedLock::new(backend, key, ttl_seconds)?;
            let interrupted = listen_for_interrupt();
            handle
                .run(|lock| keep_alive(client, lock, ttl_seconds, interrupted))
                .await?
        }
    }
}

/// Starts listening for Ctrl-C before the lock is taken.
///
/// The channel keeps a delivered interrupt until `keep_alive` reads it, so a
/// signal arriving during a store round trip is not lost.
fn listen_for_interrupt() -> oneshot::Receiver<()> {
    let (sender, receiver) = oneshot::channel();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = sender.send(());
            }
            Err(error) => {
                warn!(error = %error, "failed to listen for interrupt");
                // Keep the sender alive so the hold is not ended.
                std::future::pending::<()>().await;
            }
        }
    });

    receiver
}

/// Refreshes the lock every half ttl until interrupted.
async fn keep_alive(
    client: LockClient,
    lock: AcquiredLock,
    ttl_seconds: u32,
    mut interrupted: oneshot::Receiver<()>,
) -> LockResult<()> {
    print_lock(&lock)?;

    let period = Duration::from_secs(u64::from((ttl_seconds / 2).max(1)));
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = &mut interrupted => {
                info!(lock_key = %lock.key(), "interrupted; releasing lock");
                return Ok(());
            }
            _ = ticker.tick() => {
                client
                    .refresh(lock.key().as_str(), lock.owner_token().as_str(), ttl_seconds)
                    .await?;
            }
        }
    }
}

fn print_lock(lock: &AcquiredLock) -> LockResult<()> {
    let rendered = serde_json::to_string(lock)
        .map_err(|error| LockError::Validation(format!("failed to render lock: {error}")))?;
    println!("{rendered}");
    Ok(())
}
