//! npc server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the JSON API over HTTP.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use npc_api::AppState;
use npc_llm::AnthropicClient;
use npc_mailer::{HttpMailer, Mailer, NoopMailer};
use npc_store_sqlite::SqliteStore;
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "npc companion server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
struct ServerConfig {
  #[serde(default = "default_host")]
  host: String,
  #[serde(default = "default_port")]
  port: u16,
  #[serde(default = "default_database_path")]
  database_path: PathBuf,
  /// Public base URL the frontend is served from; used in magic links.
  #[serde(default = "default_base_url")]
  public_base_url: String,

  llm: LlmConfig,
  #[serde(default)]
  mail: MailConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct LlmConfig {
  #[serde(default = "default_llm_api_base")]
  api_base: String,
  api_key: String,
  model: String,
  #[serde(default = "default_max_tokens")]
  max_tokens: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct MailConfig {
  #[serde(default = "default_mail_api_base")]
  api_base: String,
  /// When unset, outgoing mail is logged and dropped.
  api_key: Option<String>,
  #[serde(default = "default_from_address")]
  from_address: String,
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8080 }
fn default_database_path() -> PathBuf { PathBuf::from("npc.db") }
fn default_base_url() -> String { "http://localhost:8080".into() }
fn default_llm_api_base() -> String { "https://api.anthropic.com".into() }
fn default_max_tokens() -> u32 { 1024 }
fn default_mail_api_base() -> String { "https://api.resend.com".into() }
fn default_from_address() -> String { "npc <reports@npc.invalid>".into() }

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
    .add_source(config::Environment::with_prefix("NPC").separator("__"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let database_path = expand_tilde(&server_cfg.database_path);
  let store = SqliteStore::open(&database_path)
    .await
    .with_context(|| format!("failed to open store at {database_path:?}"))?;

  let model = AnthropicClient::new(
    &server_cfg.llm.api_base,
    &server_cfg.llm.api_key,
    &server_cfg.llm.model,
    server_cfg.llm.max_tokens,
  );

  let mailer: Arc<dyn Mailer> = match &server_cfg.mail.api_key {
    Some(key) => Arc::new(HttpMailer::new(
      &server_cfg.mail.api_base,
      key,
      &server_cfg.mail.from_address,
    )),
    None => {
      tracing::warn!("no mail API key configured, emails will be dropped");
      Arc::new(NoopMailer)
    }
  };

  let state = AppState {
    store: Arc::new(store),
    model: Arc::new(model),
    mailer,
    public_base_url: server_cfg.public_base_url.clone(),
  };

  let app = axum::Router::new()
    .nest("/api", npc_api::api_router(state))
    .layer(TraceLayer::new_for_http());

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
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
