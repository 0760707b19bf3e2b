use crate::admin::{Action, Admin, Confirmation};
use crate::auth::Session;
use crate::event::{AppEvent, Notice};
use crate::mutation::Settlement;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tracing::warn;

/// What every view needs: the admin handle, the session and a way to post notices
#[derive(Clone)]
pub struct Context {
  pub admin: Admin,
  session: Arc<RwLock<Session>>,
  events: mpsc::UnboundedSender<AppEvent>,
}

impl Context {
  pub fn new(admin: Admin, session: Session, events: mpsc::UnboundedSender<AppEvent>) -> Self {
    Self {
      admin,
      session: Arc::new(RwLock::new(session)),
      events,
    }
  }

  pub fn session(&self) -> Session {
    self
      .session
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  pub fn update_session(&self, f: impl FnOnce(&mut Session)) {
    f(&mut self.session.write().unwrap_or_else(PoisonError::into_inner));
  }

  pub fn is_admin(&self) -> bool {
    self.session().is_admin()
  }

  pub fn notify(&self, notice: Notice) {
    let _ = self.events.send(AppEvent::Notice(notice));
  }

  /// Run a mutation in the background and post its outcome as a notice
  pub fn dispatch<R, Fut>(&self, action: Action, mutation: Fut)
  where
    R: Confirmation + Send + 'static,
    Fut: Future<Output = Settlement<R>> + Send + 'static,
  {
    let ctx = self.clone();
    tokio::spawn(async move {
      let mut settlement = mutation.await;
      let notice = match action.describe(settlement.outcome()) {
        Ok(text) => Notice::success(text),
        Err(text) => Notice::error(text),
      };
      ctx.notify(notice);

      if let Err(e) = settlement.synced().await {
        warn!(?action, error = %e, "refetch after mutation failed");
      }
    });
  }
}
