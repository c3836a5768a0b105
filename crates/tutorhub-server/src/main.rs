//! tutorhub server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `TUTORHUB_*` environment variables, opens the SQLite store, and serves
//! the JSON API over HTTP.
//!
//! # Session secret generation
//!
//! ```
//! cargo run -p tutorhub-server --bin server -- --generate-secret
//! ```
//!
//! # Granting admin
//!
//! ```
//! cargo run -p tutorhub-server --bin server -- --promote 2006123456
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::{Context as _, bail};
use clap::Parser;
use rand_core::{OsRng, RngCore};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tutorhub_api::{AppState, Binder, MemoryCache, SessionKeys};
use tutorhub_core::engine::CourseEngine;
use tutorhub_server::{ServerConfig, cas::CasVerifier, webhook::WebhookNotifier};
use tutorhub_store_sqlite::SqliteStore;

#[derive(Parser)]
#[command(author, version, about = "tutorhub API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print a fresh random session secret and exit.
  #[arg(long)]
  generate_secret: bool,

  /// Grant admin rights to the user with this NPM and exit.
  #[arg(long, value_name = "NPM")]
  promote: Option<i64>,
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

  if cli.generate_secret {
    let mut secret = [0u8; 32];
    OsRng.fill_bytes(&mut secret);
    println!("{}", hex::encode(secret));
    return Ok(());
  }

  let cfg = ServerConfig::load(&cli.config).context("failed to load configuration")?;

  let store_path = expand_tilde(&cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  if let Some(npm) = cli.promote {
    if !store.set_admin(npm, true).await? {
      bail!("no user with NPM {npm}; they must log in once first");
    }
    println!("{npm} is now an admin");
    return Ok(());
  }

  let keys = SessionKeys::new(
    cfg.session_secret.as_bytes(),
    chrono::Duration::hours(i64::from(cfg.session_ttl_hours)),
  )
  .context("invalid session_secret")?;

  let verifier =
    CasVerifier::new(&cfg.sso.base_url, &cfg.callback_url(), cfg.sso.faculty_table())
      .context("invalid SSO configuration")?;

  let cache = match cfg.cache_ttl_secs {
    Some(secs) => MemoryCache::with_ttl(Duration::from_secs(secs)),
    None => MemoryCache::new(),
  };

  let repo = Arc::new(store);
  let mut engine = CourseEngine::new(Arc::clone(&repo), Arc::new(cache));
  if let Some(url) = &cfg.webhook_url {
    let notifier = WebhookNotifier::new(url.as_str())
      .context("failed to build webhook client")?;
    engine = engine.with_notifier(Arc::new(notifier));
    tracing::info!("announcing new courses to webhook");
  }

  let binder = Binder::new(repo, Arc::new(verifier), keys)
    .with_allowed_faculty(cfg.sso.allowed_faculty.clone())
    .with_app_root(cfg.app_root.clone());

  let state = AppState { engine: Arc::new(engine), binder: Arc::new(binder) };
  let app = tutorhub_api::router(state).layer(TraceLayer::new_for_http());

  let address = cfg.bind_address();
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
