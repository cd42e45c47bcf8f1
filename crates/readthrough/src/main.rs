use std::sync::Arc;

#[cfg(feature = "redis")]
use anyhow::Context;
use anyhow::Result;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use readthrough::cache::MemoryCache;
use readthrough::models::Book;
use readthrough::storage::{CachedRepository, InMemoryRepository};
use readthrough::Config;
use readthrough_core::cache::Cache;
use readthrough_core::cursor::{CursorFilter, CursorManager, CursorType, SortOrder};
use readthrough_core::storage::{FieldUpdates, Repository};

/// Readthrough - cache-aside repository layer and keyset cursor tools
#[derive(Parser, Debug)]
#[command(name = "readthrough")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the read/update/paginate walkthrough against an in-memory store
    Demo {
        /// Use Redis (REDIS_URL) instead of the in-memory cache
        #[cfg(feature = "redis")]
        #[arg(long)]
        redis: bool,
    },
    /// Inspect and mint pagination cursors
    #[command(subcommand)]
    Cursor(CursorCommand),
}

#[derive(Subcommand, Debug)]
enum CursorCommand {
    /// Mint a cursor token
    Encode {
        /// Cursor type: offset, timestamp or id
        #[arg(long = "type")]
        cursor_type: CursorType,
        /// Sort key value as JSON; anything that is not JSON is taken as a string
        #[arg(long)]
        value: String,
    },
    /// Print the contents of a cursor token
    Decode { token: String },
    /// Print the continuation filter a cursor token produces
    Filter {
        token: String,
        #[arg(long, default_value = "created_at")]
        sort_field: String,
        /// asc or desc
        #[arg(long, default_value = "desc")]
        order: SortOrder,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = Config::from_env();

    match cli.command {
        #[cfg(feature = "redis")]
        Command::Demo { redis: true } => {
            let cache = readthrough::cache::RedisCache::new(&config.redis_url)
                .await
                .with_context(|| format!("connecting to {}", config.redis_url))?;
            run_demo(&config, Arc::new(cache)).await
        }
        Command::Demo { .. } => {
            let cache = MemoryCache::new(config.cache_max_entries);
            run_demo(&config, Arc::new(cache)).await
        }
        Command::Cursor(command) => run_cursor(&config.cursor_manager(), command),
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "readthrough=debug,readthrough_core=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run_demo<C: Cache + 'static>(config: &Config, cache: Arc<C>) -> Result<()> {
    let store = InMemoryRepository::<Book>::new();
    let books = CachedRepository::<Book, _, _>::new(
        Arc::new(store.clone()),
        cache,
        config.cache_config()?,
    )?;

    // Read-through, then invalidate on update.
    store.create(&Book::new("abc", "X")).await?;
    books.get_by_id("abc").await?;
    books.shutdown().await;
    let cached = books.get_by_id("abc").await?;
    tracing::info!(title = %cached.title, store_reads = store.read_count(), "Read twice");

    let mut updates = FieldUpdates::new();
    updates.insert("title".to_string(), json!("Y"));
    books.update("abc", &updates).await?;
    let fresh = books.get_by_id("abc").await?;
    tracing::info!(title = %fresh.title, store_reads = store.read_count(), "Read after update");

    // Unknown ids hit the store once.
    for _ in 0..2 {
        let exists = books.exists("ghost").await?;
        books.shutdown().await;
        tracing::info!(exists, store_reads = store.read_count(), "Looked up unknown id");
    }

    // Keyset pagination, newest first.
    let base = Utc::now() - Duration::hours(1);
    for i in 0..7 {
        let created_at = base + Duration::minutes(i);
        store
            .create(&Book {
                id: format!("page-{:02}", i),
                title: format!("Volume {}", i),
                created_at,
                updated_at: created_at,
            })
            .await?;
    }

    let manager = config.cursor_manager();
    let mut filter = CursorFilter::empty();
    let mut page_number = 1;
    loop {
        let page = store
            .stream_page(&filter, "created_at", SortOrder::Descending, 3)
            .await;
        if page.is_empty() {
            break;
        }

        let ids: Vec<&str> = page.iter().map(|book| book.id.as_str()).collect();
        let token =
            manager.generate_next_cursor(page.last(), CursorType::Timestamp, "created_at")?;
        println!("page {}: {} (next: {})", page_number, ids.join(", "), token);

        filter = manager.build_cursor_filter(&token, "created_at", SortOrder::Descending)?;
        page_number += 1;
    }

    books.shutdown().await;
    println!(
        "title: {}, store reads: {}, breaker: {}",
        fresh.title,
        store.read_count(),
        books.breaker().state()
    );
    Ok(())
}

fn run_cursor(manager: &CursorManager, command: CursorCommand) -> Result<()> {
    match command {
        CursorCommand::Encode { cursor_type, value } => {
            let value = serde_json::from_str::<Value>(&value).unwrap_or(Value::String(value));
            println!("{}", manager.encode_cursor(cursor_type, value)?);
        }
        CursorCommand::Decode { token } => {
            let cursor = manager.decode_cursor(&token)?;
            let expires_at = DateTime::<Utc>::from_timestamp(
                cursor.timestamp.saturating_add(cursor.ttl),
                0,
            )
            .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true));
            let expired = cursor.is_expired_at(Utc::now().timestamp());

            let report = json!({
                "cursor": cursor,
                "expires_at": expires_at,
                "expired": expired,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        CursorCommand::Filter {
            token,
            sort_field,
            order,
        } => {
            let filter = manager.build_cursor_filter(&token, &sort_field, order)?;
            println!("{}", serde_json::to_string_pretty(&filter.to_document())?);
        }
    }
    Ok(())
}
