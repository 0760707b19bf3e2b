//! Bearer token persistence and session resolution.

use color_eyre::{eyre::eyre, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::api::types::User;
use crate::api::EventsApi;

/// Token file on disk, `$XDG_CONFIG_HOME/eventadmin/token` by default
#[derive(Debug, Clone)]
pub struct TokenStore {
  path: PathBuf,
}

impl TokenStore {
  pub fn at(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn default_location() -> Option<Self> {
    dirs::config_dir().map(|dir| Self::at(dir.join("eventadmin").join("token")))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn load(&self) -> Result<Option<String>> {
    match std::fs::read_to_string(&self.path) {
      Ok(contents) => {
        let token = contents.trim();
        Ok((!token.is_empty()).then(|| token.to_string()))
      }
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
      Err(e) => Err(eyre!("Failed to read token file {}: {}", self.path.display(), e)),
    }
  }

  pub fn save(&self, token: &str) -> Result<()> {
    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create {}: {}", parent.display(), e))?;
    }
    std::fs::write(&self.path, token)
      .map_err(|e| eyre!("Failed to write token file {}: {}", self.path.display(), e))
  }

  pub fn remove(&self) -> Result<()> {
    match std::fs::remove_file(&self.path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
      Err(e) => Err(eyre!("Failed to remove token file {}: {}", self.path.display(), e)),
    }
  }
}

/// Pick the token to use: the CLI flag (persisted), then the environment, then the file.
pub fn resolve_token(
  flag: Option<String>,
  env: Option<String>,
  store: Option<&TokenStore>,
) -> Result<Option<String>> {
  if let Some(token) = flag.filter(|t| !t.is_empty()) {
    if let Some(store) = store {
      store.save(&token)?;
    }
    return Ok(Some(token));
  }

  if let Some(token) = env.filter(|t| !t.is_empty()) {
    return Ok(Some(token));
  }

  match store {
    Some(store) => store.load(),
    None => Ok(None),
  }
}

/// Who is using the console
#[derive(Debug, Clone, Default)]
pub struct Session {
  pub user: Option<User>,
}

impl Session {
  pub fn is_authenticated(&self) -> bool {
    self.user.is_some()
  }

  pub fn is_admin(&self) -> bool {
    self.user.as_ref().is_some_and(User::is_admin)
  }
}

/// Resolve the user behind `token`.
///
/// A rejected or unreachable `/auth/me` drops the token everywhere and leaves
/// an anonymous session; it never aborts startup.
pub async fn resolve_session(
  api: &dyn EventsApi,
  store: Option<&TokenStore>,
  token: Option<String>,
) -> Session {
  let Some(token) = token else {
    return Session::default();
  };

  api.set_token(Some(token));
  match api.current_user().await {
    Ok(user) => {
      info!(email = %user.email, role = %user.role, "session resolved");
      Session { user: Some(user) }
    }
    Err(e) => {
      if e.is_unauthorized() {
        warn!(error = %e, "token rejected, discarding it");
      } else {
        warn!(error = %e, "could not resolve session, discarding token");
      }
      api.set_token(None);
      if let Some(store) = store {
        if let Err(e) = store.remove() {
          warn!(error = %e, "failed to remove stored token");
        }
      }
      Session::default()
    }
  }
}

/// Forget the token and the user
pub fn logout(api: &dyn EventsApi, store: Option<&TokenStore>, session: &mut Session) -> Result<()> {
  api.set_token(None);
  session.user = None;
  if let Some(store) = store {
    store.remove()?;
  }
  info!("logged out");
  Ok(())
}
