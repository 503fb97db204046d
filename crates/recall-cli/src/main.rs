// ============================================================================
// recall-db — CLI inspection tool for the structured memory store
// ============================================================================
// Usage:
//   recall-db stats --user USER             Show memory statistics for a user
//   recall-db list --user USER [--type T]   List a user's memories
//   recall-db export --user USER            Export a user's memories as JSON
//   recall-db sweep --user USER [--dry-run] Apply importance decay
// ============================================================================

use anyhow::Result;
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use recall_core::{decayed_importance, MemoryConfig, MemoryType, RedbStore, StructuredStore};

/// Recall memory store inspection tool
#[derive(Parser)]
#[command(name = "recall-db", version, about = "Inspect and maintain the recall memory store")]
struct Cli {
    /// Path to the database file (default: ~/.recall/memories.redb)
    #[arg(long, global = true)]
    db_path: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show memory statistics for a user
    Stats {
        /// User whose memories to inspect
        #[arg(long)]
        user: String,
    },

    /// List a user's memories, optionally filtered by type
    List {
        #[arg(long)]
        user: String,

        /// Filter by type: preference, fact, emotion, goal, interest, context
        #[arg(long = "type")]
        memory_type: Option<String>,
    },

    /// Export a user's memories as JSON
    Export {
        #[arg(long)]
        user: String,

        /// Output format (currently only json is supported)
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Apply importance decay to a user's memories
    Sweep {
        #[arg(long)]
        user: String,

        /// Show what would change without writing anything
        #[arg(long)]
        dry_run: bool,
    },
}

fn parse_memory_type(s: &str) -> Result<MemoryType> {
    s.parse::<MemoryType>().map_err(|e| anyhow::anyhow!(e))
}

fn format_timestamp(ts: i64) -> String {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("(invalid: {})", ts))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let store = RedbStore::open(cli.db_path.as_deref())?;

    match cli.command {
        Commands::Stats { user } => cmd_stats(&store, &user).await,
        Commands::List { user, memory_type } => cmd_list(&store, &user, memory_type).await,
        Commands::Export { user, format } => cmd_export(&store, &user, &format).await,
        Commands::Sweep { user, dry_run } => cmd_sweep(&store, &user, dry_run).await,
    }
}

async fn cmd_stats(store: &RedbStore, user: &str) -> Result<()> {
    let stats = store.stats(user).await?;

    println!("=== Recall Memory Stats ===");
    println!("Database: {}", store.path().display());
    println!("User:     {}", user);
    println!();
    println!("Memories: {} total", stats.total_memories);
    for (memory_type, count) in &stats.type_counts {
        println!("  {:12} {}", memory_type, count);
    }
    println!("Average importance: {:.1}", stats.avg_importance);

    Ok(())
}

async fn cmd_list(store: &RedbStore, user: &str, type_filter: Option<String>) -> Result<()> {
    let filter = type_filter.as_deref().map(parse_memory_type).transpose()?;
    let memories = store.list_by_user(user, filter).await?;

    if memories.is_empty() {
        println!("No memories found.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<10}  {:>3}  {:<22}  {}",
        "MEMORY ID", "TYPE", "IMP", "LAST ACCESSED", "CONTENT"
    );
    println!("{}", "-".repeat(110));

    for memory in &memories {
        let content = memory.content.chars().take(40).collect::<String>();
        println!(
            "{:<36}  {:<10}  {:>3}  {:<22}  {}",
            memory.id,
            memory.memory_type.to_string(),
            memory.importance,
            format_timestamp(memory.last_accessed),
            content
        );
    }

    println!("\nTotal: {} memories", memories.len());
    Ok(())
}

async fn cmd_export(store: &RedbStore, user: &str, format: &str) -> Result<()> {
    if format != "json" {
        anyhow::bail!("Unsupported format '{}'. Only 'json' is supported.", format);
    }

    let mut memories = store.list_by_user(user, None).await?;
    let stats = store.stats(user).await?;

    // Embeddings are large and meaningless outside the index
    for memory in memories.iter_mut() {
        memory.embedding = Vec::new();
    }

    let export = serde_json::json!({
        "exported_at": Utc::now().to_rfc3339(),
        "user": user,
        "stats": stats,
        "memories": memories,
    });

    println!("{}", serde_json::to_string_pretty(&export)?);
    Ok(())
}

async fn cmd_sweep(store: &RedbStore, user: &str, dry_run: bool) -> Result<()> {
    let config = MemoryConfig::from_env()?;
    let now = Utc::now().timestamp();
    let memories = store.list_by_user(user, None).await?;

    let mut lowered = 0usize;
    let mut removed = 0usize;

    for mut memory in memories {
        let decayed = decayed_importance(&config.scoring, &memory, now);

        if decayed == 0 {
            if dry_run {
                println!("would delete {}  ({})", memory.id, memory.content);
            } else {
                store.delete(memory.id).await?;
            }
            removed += 1;
        } else if decayed < memory.importance {
            if dry_run {
                println!(
                    "would lower  {}  {} -> {}",
                    memory.id, memory.importance, decayed
                );
            } else {
                memory.importance = decayed;
                memory.last_decayed = now;
                store.update(&memory).await?;
            }
            lowered += 1;
        }
    }

    if dry_run {
        println!("\n=== DRY RUN — nothing was written ===");
    }
    println!("Sweep for {}: {} lowered, {} removed", user, lowered, removed);
    if removed > 0 && !dry_run {
        println!("Note: matching vector index points are cleaned up on next retrieval.");
    }

    Ok(())
}
