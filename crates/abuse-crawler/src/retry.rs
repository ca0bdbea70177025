//! Retry and wall-clock policy as plain values.
//!
//! [`RetryBudget`] decides how long to back off and when to give up;
//! [`Deadline`] tracks a partition's time budget. Neither performs I/O, and
//! both read [`tokio::time::Instant`] so tests can drive them with a paused
//! clock.

use std::time::Duration;

use tokio::time::Instant;

/// Largest exponent used for backoff; caps a single wait at ~9 hours.
const MAX_BACKOFF_EXPONENT: u32 = 15;

/// Bounded exponential backoff: the n-th consecutive retry waits `2^n`
/// seconds. Any successful response resets the count.
#[derive(Debug, Clone)]
pub struct RetryBudget {
  max_retries: u32,
  retries:     u32,
}

impl RetryBudget {
  pub fn new(max_retries: u32) -> Self { Self { max_retries, retries: 0 } }

  /// Consume one retry and return how long to wait before it, or `None`
  /// once the budget is spent.
  pub fn next_delay(&mut self) -> Option<Duration> {
    if self.retries >= self.max_retries {
      return None;
    }
    self.retries += 1;
    Some(Duration::from_secs(1u64 << self.retries.min(MAX_BACKOFF_EXPONENT)))
  }

  pub fn reset(&mut self) { self.retries = 0; }

  /// Retries consumed since the last reset.
  pub fn retries(&self) -> u32 { self.retries }

  pub fn max_retries(&self) -> u32 { self.max_retries }
}

/// A wall-clock budget that starts when it is created.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
  started: Instant,
  budget:  Duration,
}

impl Deadline {
  pub fn new(budget: Duration) -> Self { Self { started: Instant::now(), budget } }

  pub fn expired(&self) -> bool { self.started.elapsed() >= self.budget }

  pub fn elapsed(&self) -> Duration { self.started.elapsed() }

  pub fn remaining(&self) -> Duration { self.budget.saturating_sub(self.started.elapsed()) }
}
