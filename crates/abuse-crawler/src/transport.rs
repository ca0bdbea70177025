//! The HTTP seam between the fetcher and the upstream API.

use std::{future::Future, sync::Arc, time::Duration};

use reqwest::Client;
use serde_json::Value;

use crate::FetchError;

/// Status and body of one HTTP exchange, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
  pub status: u16,
  pub body:   String,
}

impl RawResponse {
  pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }
}

/// Sends one GraphQL request body and returns the raw response.
///
/// Implementations report network-level failures as
/// [`FetchError::Transport`] and leave status handling to the caller.
pub trait Transport: Send + Sync {
  fn post<'a>(
    &'a self,
    body: &'a Value,
  ) -> impl Future<Output = Result<RawResponse, FetchError>> + Send + 'a;
}

impl<T: Transport> Transport for Arc<T> {
  fn post<'a>(
    &'a self,
    body: &'a Value,
  ) -> impl Future<Output = Result<RawResponse, FetchError>> + Send + 'a {
    (**self).post(body)
  }
}

/// [`Transport`] over `reqwest` with a static bearer token.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpTransport {
  client: Client,
  url:    String,
  token:  String,
}

impl HttpTransport {
  pub fn new(
    url: impl Into<String>,
    token: impl Into<String>,
    timeout: Duration,
  ) -> reqwest::Result<Self> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self { client, url: url.into(), token: token.into() })
  }
}

impl Transport for HttpTransport {
  async fn post(&self, body: &Value) -> Result<RawResponse, FetchError> {
    let mut req = self.client.post(&self.url).json(body);
    if !self.token.is_empty() {
      req = req.bearer_auth(&self.token);
    }

    let resp = req
      .send()
      .await
      .map_err(|e| FetchError::Transport(e.to_string()))?;
    let status = resp.status().as_u16();
    let body = resp
      .text()
      .await
      .map_err(|e| FetchError::Transport(format!("reading response body: {e}")))?;

    Ok(RawResponse { status, body })
  }
}
