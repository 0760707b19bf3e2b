use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;

/// Severity of a notice shown on the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
  Success,
  Error,
}

/// Short-lived message for the operator (the outcome of a mutation)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
  pub kind: NoticeKind,
  pub text: String,
}

impl Notice {
  pub fn success(text: impl Into<String>) -> Self {
    Self {
      kind: NoticeKind::Success,
      text: text.into(),
    }
  }

  pub fn error(text: impl Into<String>) -> Self {
    Self {
      kind: NoticeKind::Error,
      text: text.into(),
    }
  }
}

/// Application events
#[derive(Debug)]
pub enum AppEvent {
  /// Terminal key press
  Key(KeyEvent),
  /// Periodic tick for UI refresh and cache polling
  Tick,
  /// Posted by background mutations when they settle
  Notice(Notice),
}

/// Event handler that produces events from terminal input and a tick timer
pub struct EventHandler {
  tx: mpsc::UnboundedSender<AppEvent>,
  rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    let input_tx = tx.clone();
    // crossterm's poll/read block, keep them off the async workers
    tokio::task::spawn_blocking(move || loop {
      let sent = if event::poll(tick_rate).unwrap_or(false) {
        match event::read() {
          Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
            input_tx.send(AppEvent::Key(key))
          }
          _ => Ok(()),
        }
      } else {
        input_tx.send(AppEvent::Tick)
      };

      if sent.is_err() {
        break;
      }
    });

    Self { tx, rx }
  }

  /// Sender for background tasks that want to post events
  pub fn sender(&self) -> mpsc::UnboundedSender<AppEvent> {
    self.tx.clone()
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<AppEvent> {
    self.rx.recv().await
  }
}
