use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://eventify-s-backend.onrender.com";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
  #[serde(default)]
  pub ui: UiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Server root; endpoints live under `<url>/api`
  #[serde(default = "default_api_url")]
  pub url: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: default_api_url(),
      timeout_secs: default_timeout_secs(),
    }
  }
}

fn default_api_url() -> String {
  DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
  30
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
  #[serde(default = "default_tick_rate_ms")]
  pub tick_rate_ms: u64,
  /// How long a notice stays on the status line
  #[serde(default = "default_notice_secs")]
  pub notice_secs: u64,
}

impl Default for UiConfig {
  fn default() -> Self {
    Self {
      tick_rate_ms: default_tick_rate_ms(),
      notice_secs: default_notice_secs(),
    }
  }
}

impl UiConfig {
  pub fn tick_rate(&self) -> Duration {
    Duration::from_millis(self.tick_rate_ms)
  }

  pub fn notice_ttl(&self) -> Duration {
    Duration::from_secs(self.notice_secs)
  }
}

fn default_tick_rate_ms() -> u64 {
  250
}

fn default_notice_secs() -> u64 {
  4
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./eventadmin.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/eventadmin/config.yaml
  ///
  /// Without any file the defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("eventadmin.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("eventadmin").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Override the API url (from `--api-url` or `EVENTADMIN_API_URL`)
  pub fn with_api_url(mut self, url: Option<String>) -> Self {
    if let Some(url) = url {
      self.api.url = url;
    }
    self
  }

  /// Header label: the configured title, else the API host
  pub fn header_title(&self) -> String {
    if let Some(title) = &self.title {
      return title.clone();
    }
    url::Url::parse(&self.api.url)
      .ok()
      .and_then(|u| u.host_str().map(String::from))
      .unwrap_or_else(|| self.api.url.clone())
  }
}
