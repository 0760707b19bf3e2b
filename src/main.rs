mod admin;
mod api;
mod app;
mod auth;
mod cache;
mod config;
mod event;
mod logging;
mod mutation;
mod ui;
mod validation;

use api::{ApiClient, EventsApi};
use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "eventadmin")]
#[command(about = "A terminal admin console for events and attendee bookings")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/eventadmin/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Server root URL, overrides api.url from the config file
  #[arg(long, env = "EVENTADMIN_API_URL")]
  api_url: Option<String>,

  /// Bearer token; saved to the token file for later runs
  #[arg(long)]
  token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let config = config::Config::load(args.config.as_deref())?.with_api_url(args.api_url);

  // Keep the guard alive until exit so buffered log lines are flushed
  let _log_guard = match logging::log_dir() {
    Some(dir) => Some(logging::init(&dir)?),
    None => None,
  };

  let token_store = auth::TokenStore::default_location();
  match &token_store {
    Some(store) => info!(path = %store.path().display(), "using token file"),
    None => warn!("no config directory, token will not be persisted"),
  }
  let token = auth::resolve_token(
    args.token,
    std::env::var("EVENTADMIN_TOKEN").ok(),
    token_store.as_ref(),
  )?;

  let client = ApiClient::new(&config.api, None)?;
  info!(api = %client.base_url(), "starting");
  let api: Arc<dyn EventsApi> = Arc::new(client);
  let session = auth::resolve_session(api.as_ref(), token_store.as_ref(), token).await;

  let admin = admin::Admin::new(api);
  let mut app = app::App::new(config, admin, session, token_store);
  app.run().await?;

  Ok(())
}
