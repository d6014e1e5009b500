use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use prepaint::data::{Database, SnapshotStore, SqliteSnapshotStore};
use prepaint::{util, Config};

#[derive(Debug, Parser)]
#[command(name = "prepaint", version, about = "Inspect and maintain stored page snapshots")]
struct Cli {
    /// Data directory (defaults to ~/.prepaint)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List stored snapshots, newest first
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print the stored snapshot for a route
    Show {
        route: String,
        #[arg(long)]
        json: bool,
    },
    /// Remove the snapshot for a route
    Evict { route: String },
    /// Remove snapshots older than the configured maximum age
    Prune,
    /// Remove every snapshot
    Clear,
    /// Print the effective configuration
    Config,
}

fn init_logging() -> Result<()> {
    fs::create_dir_all(util::logs_dir())?;

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(util::log_file_path())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .init();
    Ok(())
}

fn open_store(config: &Config) -> Result<SqliteSnapshotStore> {
    let db = Database::open(config.database_path.clone()).with_context(|| {
        format!(
            "failed to open snapshot database at {}",
            config.database_path.display()
        )
    })?;
    Ok(SqliteSnapshotStore::new(db))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    util::init_data_dir(cli.data_dir);
    init_logging()?;

    let config = Config::load();

    match cli.command {
        Command::List { json } => {
            let snapshots = open_store(&config)?.list().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshots)?);
            } else if snapshots.is_empty() {
                println!("No snapshots stored");
            } else {
                let now = Utc::now();
                for summary in snapshots {
                    let age = now - summary.timestamp;
                    println!(
                        "{:<32} {:>8} bytes {:>3} styles  {}h old",
                        summary.route,
                        summary.body_bytes,
                        summary.style_count,
                        age.num_hours()
                    );
                }
            }
        }
        Command::Show { route, json } => {
            let Some(snapshot) = open_store(&config)?.get(&route).await? else {
                anyhow::bail!("no snapshot stored for {route}");
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                println!("route:     {}", snapshot.route);
                println!("captured:  {}", snapshot.timestamp.to_rfc3339());
                println!("fresh:     {}", snapshot.is_fresh(Utc::now(), config.max_age));
                println!("styles:    {}", snapshot.styles.len());
                println!();
                println!("{}", snapshot.body);
            }
        }
        Command::Evict { route } => {
            if open_store(&config)?.delete(&route).await? {
                println!("Evicted {route}");
            } else {
                println!("No snapshot stored for {route}");
            }
        }
        Command::Prune => {
            let removed = open_store(&config)?
                .prune_expired(config.max_age, Utc::now())
                .await?;
            println!("Removed {removed} expired snapshot(s)");
        }
        Command::Clear => {
            let removed = open_store(&config)?.clear().await?;
            println!("Removed {removed} snapshot(s)");
        }
        Command::Config => {
            println!("config file:   {}", util::config_path().display());
            println!("database:      {}", config.database_path.display());
            println!("max age:       {} days", config.max_age.num_days());
            match &config.capture.routes {
                Some(routes) => println!("capture routes: {}", routes.join(", ")),
                None => println!("capture routes: all"),
            }
            println!(
                "inline styles: {}",
                config.capture.inline_same_origin_styles
            );
            println!("container:     #{}", config.restore.container_id);
            println!("overlay:       {}", config.restore.overlay);
            println!("transitions:   {}", config.attach.transitions);
        }
    }

    Ok(())
}
