use crate::api::error::ApiError;
use crate::api::types::{
  Attendee, AttendeePayload, ErrorBody, Event, EventPayload, EventsResponse, MeResponse,
  MessageResponse, NewAttendeePayload, StatusUpdate, User,
};
use crate::api::EventsApi;
use crate::config::ApiConfig;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// REST client for the events service
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base: Url,
  token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
  pub fn new(config: &ApiConfig, token: Option<String>) -> Result<Self, ApiError> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;

    let mut base = Url::parse(&config.url)
      .map_err(|e| ApiError::Config(format!("invalid API url '{}': {}", config.url, e)))?;
    base
      .path_segments_mut()
      .map_err(|_| ApiError::Config(format!("API url '{}' cannot be a base", config.url)))?
      .pop_if_empty()
      .push("api");

    Ok(Self {
      http,
      base,
      token: Arc::new(RwLock::new(token)),
    })
  }

  /// Root of the API, including the `/api` prefix
  pub fn base_url(&self) -> &Url {
    &self.base
  }

  fn token(&self) -> Option<String> {
    self.token.read().ok().and_then(|t| t.clone())
  }

  fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
    let mut url = self.base.clone();
    url
      .path_segments_mut()
      .map_err(|_| ApiError::Config("API url cannot be a base".to_string()))?
      .extend(segments);
    Ok(url)
  }

  fn request(&self, method: Method, url: Url) -> RequestBuilder {
    let request = self.http.request(method, url);
    match self.token() {
      Some(token) => request.bearer_auth(token),
      None => request,
    }
  }

  async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
    let url = self.endpoint(segments)?;
    self.send(self.request(Method::GET, url)).await
  }

  async fn send_json<T, B>(&self, method: Method, segments: &[&str], body: &B) -> Result<T, ApiError>
  where
    T: DeserializeOwned,
    B: Serialize + ?Sized,
  {
    let url = self.endpoint(segments)?;
    self.send(self.request(method, url).json(body)).await
  }

  async fn delete_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
    let url = self.endpoint(segments)?;
    self.send(self.request(Method::DELETE, url)).await
  }

  async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
    let response = request.send().await?;
    let status = response.status();
    let url = response.url().clone();

    if !status.is_success() {
      let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.error);
      warn!(%url, %status, error = ?message, "request rejected");
      return Err(ApiError::Status { status, message });
    }

    let bytes = response.bytes().await?;
    debug!(%url, %status, len = bytes.len(), "request succeeded");

    // Some confirmations come back with an empty body
    let bytes: &[u8] = if bytes.is_empty() { b"{}" } else { &bytes };
    serde_json::from_slice(bytes).map_err(|e| ApiError::Decode(format!("{}: {}", url, e)))
  }
}

#[async_trait]
impl EventsApi for ApiClient {
  fn set_token(&self, token: Option<String>) {
    if let Ok(mut current) = self.token.write() {
      *current = token;
    }
  }

  async fn list_events(&self) -> Result<Vec<Event>, ApiError> {
    let response: EventsResponse = self.get_json(&["events"]).await?;
    Ok(response.into())
  }

  async fn list_public_events(&self) -> Result<Vec<Event>, ApiError> {
    let response: EventsResponse = self.get_json(&["events", "public"]).await?;
    Ok(response.into())
  }

  async fn create_event(&self, payload: EventPayload) -> Result<Event, ApiError> {
    self.send_json(Method::POST, &["events"], &payload).await
  }

  async fn update_event(&self, id: &str, payload: EventPayload) -> Result<Event, ApiError> {
    self.send_json(Method::PATCH, &["events", id], &payload).await
  }

  async fn delete_event(&self, id: &str) -> Result<MessageResponse, ApiError> {
    self.delete_json(&["events", id]).await
  }

  async fn create_attendee(&self, payload: NewAttendeePayload) -> Result<Attendee, ApiError> {
    self.send_json(Method::POST, &["attendees"], &payload).await
  }

  async fn update_attendee(&self, id: &str, payload: AttendeePayload) -> Result<Attendee, ApiError> {
    self
      .send_json(Method::PATCH, &["attendees", id], &payload)
      .await
  }

  async fn delete_attendee(&self, id: &str) -> Result<MessageResponse, ApiError> {
    self.delete_json(&["attendees", id]).await
  }

  async fn update_booking_status(
    &self,
    id: &str,
    update: StatusUpdate,
  ) -> Result<MessageResponse, ApiError> {
    self
      .send_json(Method::PATCH, &["attendees", id, "status"], &update)
      .await
  }

  async fn current_user(&self) -> Result<User, ApiError> {
    let response: MeResponse = self.get_json(&["auth", "me"]).await?;
    Ok(response.user)
  }
}
