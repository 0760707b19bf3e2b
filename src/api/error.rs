use reqwest::StatusCode;

/// Errors raised by the remote API client
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  #[error("request failed: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("server returned {status}: {}", message.as_deref().unwrap_or("no details"))]
  Status {
    status: StatusCode,
    message: Option<String>,
  },
  #[error("invalid response: {0}")]
  Decode(String),
  #[error("invalid configuration: {0}")]
  Config(String),
}

impl ApiError {
  /// The `error` field of the server's response body, when it sent one
  pub fn server_message(&self) -> Option<&str> {
    match self {
      ApiError::Status { message, .. } => message.as_deref().filter(|m| !m.is_empty()),
      _ => None,
    }
  }

  pub fn status(&self) -> Option<StatusCode> {
    match self {
      ApiError::Status { status, .. } => Some(*status),
      ApiError::Transport(e) => e.status(),
      _ => None,
    }
  }

  pub fn is_unauthorized(&self) -> bool {
    matches!(
      self.status(),
      Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN)
    )
  }
}
