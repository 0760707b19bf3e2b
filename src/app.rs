use crate::admin::Admin;
use crate::auth::{self, Session, TokenStore};
use crate::config::Config;
use crate::event::{AppEvent, EventHandler, Notice};
use crate::ui;
use crate::ui::context::Context;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::EventListView;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// Terminal input, ticks and notices from background mutations
  events: EventHandler,

  ctx: Context,

  token_store: Option<TokenStore>,

  /// Current notice and when it was posted
  notice: Option<(Notice, Instant)>,

  notice_ttl: Duration,

  title: String,

  should_quit: bool,
}

impl App {
  pub fn new(config: Config, admin: Admin, session: Session, token_store: Option<TokenStore>) -> Self {
    let events = EventHandler::new(config.ui.tick_rate());
    let ctx = Context::new(admin, session, events.sender());
    let root = EventListView::new(ctx.clone());

    Self {
      view_stack: vec![Box::new(root)],
      events,
      ctx,
      token_store,
      notice: None,
      notice_ttl: config.ui.notice_ttl(),
      title: config.header_title(),
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.event_loop(&mut terminal).await;

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match self.events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }
    Ok(())
  }

  fn handle_event(&mut self, event: AppEvent) {
    match event {
      AppEvent::Key(key) => self.handle_key(key),
      AppEvent::Tick => self.tick(),
      AppEvent::Notice(notice) => {
        info!(kind = ?notice.kind, text = %notice.text, "notice");
        self.notice = Some((notice, Instant::now()));
      }
    }
  }

  fn tick(&mut self) {
    if let Some(view) = self.view_stack.last_mut() {
      view.tick();
    }
    if let Some((_, posted)) = &self.notice {
      if posted.elapsed() >= self.notice_ttl {
        self.notice = None;
      }
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let capturing = self
      .view_stack
      .last()
      .map(|v| v.is_capturing_input())
      .unwrap_or(false);
    if !capturing && key.code == KeyCode::Char('L') {
      self.logout();
      return;
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => return,
    };

    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
          // Pick up changes made while the child view was open
          if let Some(view) = self.view_stack.last_mut() {
            view.tick();
          }
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn logout(&mut self) {
    let mut session = self.ctx.session();
    if !session.is_authenticated() {
      return;
    }
    match auth::logout(self.ctx.admin.api().as_ref(), self.token_store.as_ref(), &mut session) {
      Ok(()) => self.ctx.notify(Notice::success("Logged out")),
      Err(e) => {
        error!(error = %e, "logout failed");
        self.ctx.notify(Notice::error("Failed to log out"));
      }
    }
    self.ctx.update_session(|s| *s = session);
  }

  // Accessors for UI rendering

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn user_label(&self) -> Option<String> {
    let session = self.ctx.session();
    session.user.map(|user| {
      if user.is_admin() {
        format!("{} (admin)", user.display_name())
      } else {
        user.display_name().to_string()
      }
    })
  }

  pub fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = self
      .view_stack
      .last()
      .map(|v| v.shortcuts())
      .unwrap_or_default();
    if self.ctx.session().is_authenticated() {
      shortcuts.push(ShortcutInfo::new("L", "logout").with_priority(95));
    }
    shortcuts
  }

  pub fn notice(&self) -> Option<&Notice> {
    self.notice.as_ref().map(|(notice, _)| notice)
  }

  pub fn breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }
}
