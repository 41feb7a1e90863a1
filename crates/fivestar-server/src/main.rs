//! fivestar server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! record store, and serves the rating API over HTTP.
//!
//! # Repairing an aggregate
//!
//! ```
//! cargo run -p fivestar-server -- --reconcile item-42
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use fivestar_core::coordinator::AggregationCoordinator;
use fivestar_server::{ServerConfig, expand_tilde};
use fivestar_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Five-star rating server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Rebuild the summary of one rated item from its ratings and exit.
  #[arg(long, value_name = "RATING_ID")]
  reconcile: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("FIVESTAR"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let coordinator = Arc::new(AggregationCoordinator::new(Arc::new(store)));

  // Maintenance mode: repair one aggregate and exit.
  if let Some(rating_id) = cli.reconcile {
    let summary = coordinator
      .reconcile(&rating_id)
      .await
      .with_context(|| format!("failed to reconcile {rating_id:?}"))?;
    println!(
      "{}: count={} total={} average={}",
      summary.rating_id,
      summary.count,
      summary.total,
      summary
        .average()
        .map_or_else(|| "not rated".to_owned(), |a| format!("{a:.2}")),
    );
    return Ok(());
  }

  let app = fivestar_server::app(coordinator);
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
