//! Page retrieval with bounded exponential backoff.

use std::sync::Arc;

use abuse_core::config::RunConfig;

use crate::{
  FetchError,
  retry::RetryBudget,
  transport::Transport,
  wire::{self, Page},
};

/// Fetches single pages of reports for a partition.
pub struct Fetcher<T> {
  transport: T,
  config:    Arc<RunConfig>,
}

impl<T: Transport> Fetcher<T> {
  pub fn new(transport: T, config: Arc<RunConfig>) -> Self { Self { transport, config } }

  /// Fetch the page after `cursor` (or the first page).
  ///
  /// Transport failures and retryable statuses are retried while `budget`
  /// allows, sleeping `2^n` seconds before the n-th retry. A successful
  /// response resets `budget`. Non-retryable statuses fail immediately;
  /// malformed payloads surface as [`FetchError::Protocol`].
  pub async fn fetch_page(
    &self,
    partition: &str,
    cursor:    Option<&str>,
    budget:    &mut RetryBudget,
  ) -> Result<Page, FetchError> {
    let body = wire::request_body(partition, &self.config.order_by, self.config.page_size, cursor);

    loop {
      tracing::debug!(partition, cursor = ?cursor, attempt = budget.retries() + 1, "requesting page");

      let failure = match self.transport.post(&body).await {
        Ok(resp) if resp.is_success() => {
          budget.reset();
          return wire::parse_page(&resp.body);
        }
        Ok(resp) => FetchError::upstream(resp.status, &resp.body),
        Err(e) => e,
      };

      if !failure.is_retryable() {
        return Err(failure);
      }

      match budget.next_delay() {
        Some(delay) => {
          tracing::warn!(
            partition,
            error = %failure,
            retry = budget.retries(),
            max_retries = budget.max_retries(),
            delay_secs = delay.as_secs(),
            "transient upstream failure, backing off"
          );
          tokio::time::sleep(delay).await;
        }
        None => {
          tracing::warn!(
            partition,
            error = %failure,
            retries = budget.max_retries(),
            "retry budget exhausted, abandoning partition run"
          );
          return Err(FetchError::RetriesExhausted {
            retries: budget.max_retries(),
            last:    Box::new(failure),
          });
        }
      }
    }
  }
}
