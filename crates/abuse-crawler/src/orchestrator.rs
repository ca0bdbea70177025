//! Sequential partition driver: fetch, process and checkpoint each partition
//! in turn, isolating failures and aggregating statistics.

use std::{sync::Arc, time::Duration};

use abuse_core::{
  checkpoint::{Checkpoint, CheckpointStore},
  config::RunConfig,
  store::RecordStore,
};
use strum::Display;
use tokio::time::Instant;

use crate::{
  FetchError, PartitionError,
  fetcher::Fetcher,
  processor::{PageStats, Processor},
  retry::{Deadline, RetryBudget},
  transport::Transport,
};

/// Why a partition stopped paginating without failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum StopReason {
  /// No further pages, or an empty page.
  Exhausted,
  PageCap,
  TimeBudget,
  /// Incremental mode hit its run of already-stored reports.
  EarlyStop,
  /// Upstream answered with GraphQL errors or a malformed payload.
  Protocol,
}

impl StopReason {
  /// Whether the partition was read to its end; such checkpoints are marked
  /// completed and not resumed from.
  fn finished(self) -> bool { matches!(self, Self::Exhausted | Self::EarlyStop) }
}

#[derive(Debug)]
pub enum PartitionStatus {
  Completed(StopReason),
  Failed(PartitionError),
}

/// Outcome of one partition's crawl. Counts are kept even when it failed.
#[derive(Debug)]
pub struct PartitionStats {
  pub partition:       String,
  pub counts:          PageStats,
  pub pages_processed: u64,
  pub elapsed:         Duration,
  pub status:          PartitionStatus,
}

impl PartitionStats {
  pub fn succeeded(&self) -> bool { matches!(self.status, PartitionStatus::Completed(_)) }
}

/// Aggregate outcome of a run. `totals` sums successful partitions only.
#[derive(Debug, Default)]
pub struct RunStats {
  pub totals:               PageStats,
  pub partitions_succeeded: u32,
  pub partitions_failed:    u32,
  pub elapsed:              Duration,
  pub partitions:           Vec<PartitionStats>,
}

/// Drives the crawl over every configured partition, one at a time.
pub struct Orchestrator<T, S, C> {
  fetcher:     Fetcher<T>,
  processor:   Processor<S>,
  store:       Arc<S>,
  checkpoints: C,
  config:      Arc<RunConfig>,
}

impl<T, S, C> Orchestrator<T, S, C>
where
  T: Transport,
  S: RecordStore,
  C: CheckpointStore,
{
  pub fn new(transport: T, store: Arc<S>, checkpoints: C, config: Arc<RunConfig>) -> Self {
    Self {
      fetcher: Fetcher::new(transport, config.clone()),
      processor: Processor::new(store.clone(), config.clone()),
      store,
      checkpoints,
      config,
    }
  }

  /// Crawl every partition in order.
  ///
  /// `start_cursor` is a `(partition, cursor)` pair; that partition starts
  /// from the cursor instead of its checkpoint. A failing partition is
  /// recorded and the next one still runs.
  ///
  /// Consecutive successful requests are at least `request_delay` apart,
  /// across partition boundaries too.
  pub async fn run(&self, start_cursor: Option<(&str, &str)>) -> RunStats {
    let started = Instant::now();
    let mut run = RunStats::default();
    let mut last_success = None;

    if let Some((partition, _)) = start_cursor
      && !self.config.partitions.iter().any(|p| p == partition)
    {
      tracing::warn!(partition, "start cursor names a partition that is not configured");
    }

    tracing::info!(
      partitions = self.config.partitions.len(),
      mode = %self.config.mode,
      order_by = %self.config.order_by.field,
      direction = %self.config.order_by.direction,
      "starting crawl"
    );

    for (index, partition) in self.config.partitions.iter().enumerate() {
      let cursor = start_cursor
        .filter(|(p, _)| *p == partition.as_str())
        .map(|(_, c)| c);
      let stats = self
        .run_partition(partition, index == 0, cursor, &mut last_success)
        .await;

      match &stats.status {
        PartitionStatus::Completed(reason) => {
          tracing::info!(
            partition,
            stop_reason = %reason,
            pages = stats.pages_processed,
            accepted = stats.counts.accepted,
            skipped = stats.counts.skipped,
            failed = stats.counts.failed,
            addresses = stats.counts.addresses_written,
            elapsed_secs = stats.elapsed.as_secs_f64(),
            "partition finished"
          );
          run.totals += stats.counts;
          run.partitions_succeeded += 1;
        }
        PartitionStatus::Failed(e) => {
          tracing::error!(
            partition,
            error = %e,
            pages = stats.pages_processed,
            accepted = stats.counts.accepted,
            elapsed_secs = stats.elapsed.as_secs_f64(),
            "partition failed"
          );
          run.partitions_failed += 1;
        }
      }
      run.partitions.push(stats);
    }

    run.elapsed = started.elapsed();
    tracing::info!(
      accepted = run.totals.accepted,
      skipped = run.totals.skipped,
      failed_records = run.totals.failed,
      addresses = run.totals.addresses_written,
      partitions_succeeded = run.partitions_succeeded,
      partitions_failed = run.partitions_failed,
      elapsed_secs = run.elapsed.as_secs_f64(),
      "crawl complete"
    );
    match self.store.counts().await {
      Ok(counts) => tracing::info!(
        reports = counts.reports,
        report_addresses = counts.report_addresses,
        unified_addresses = counts.unified_addresses,
        "store totals"
      ),
      Err(e) => tracing::warn!(error = %e, "failed to count stored rows"),
    }
    run
  }

  async fn run_partition(
    &self,
    partition: &str,
    first: bool,
    start_cursor: Option<&str>,
    last_success: &mut Option<Instant>,
  ) -> PartitionStats {
    let started = Instant::now();
    let mut counts = PageStats::default();
    let mut pages_processed = 0;

    let result = self
      .crawl(partition, first, start_cursor, last_success, &mut counts, &mut pages_processed)
      .await;

    PartitionStats {
      partition: partition.to_owned(),
      counts,
      pages_processed,
      elapsed: started.elapsed(),
      status: match result {
        Ok(reason) => PartitionStatus::Completed(reason),
        Err(e) => PartitionStatus::Failed(e),
      },
    }
  }

  async fn crawl(
    &self,
    partition: &str,
    first: bool,
    start_cursor: Option<&str>,
    last_success: &mut Option<Instant>,
    counts: &mut PageStats,
    pages_processed: &mut u64,
  ) -> Result<StopReason, PartitionError> {
    if first && self.config.clear_existing_data {
      tracing::warn!("clearing existing reports and report addresses");
      self
        .store
        .clear_reports()
        .await
        .map_err(|e| PartitionError::Store(Box::new(e)))?;
    }

    let (mut cursor, mut page_count) = self.starting_point(partition, start_cursor).await;
    let deadline = Deadline::new(self.config.time_budget);
    let mut budget = RetryBudget::new(self.config.max_retries);

    tracing::info!(partition, cursor = ?cursor, "crawling partition");

    loop {
      if let Some(cap) = self.config.max_pages_per_partition {
        if *pages_processed >= cap {
          tracing::info!(partition, cap, "page cap reached");
          return Ok(StopReason::PageCap);
        }
      }
      if let Some(at) = *last_success {
        let wait = self.config.request_delay.saturating_sub(at.elapsed());
        if !wait.is_zero() {
          tokio::time::sleep(wait).await;
        }
      }
      if deadline.expired() {
        tracing::warn!(
          partition,
          elapsed_secs = deadline.elapsed().as_secs(),
          "time budget exhausted, stopping partition"
        );
        return Ok(StopReason::TimeBudget);
      }

      let page = match self
        .fetcher
        .fetch_page(partition, cursor.as_deref(), &mut budget)
        .await
      {
        Ok(page) => {
          *last_success = Some(Instant::now());
          page
        }
        Err(FetchError::Protocol(message)) => {
          *last_success = Some(Instant::now());
          tracing::warn!(partition, error = %message, "unusable response, stopping partition");
          return Ok(StopReason::Protocol);
        }
        Err(e) => return Err(e.into()),
      };

      if page.edges.is_empty() {
        tracing::info!(partition, "empty page, partition exhausted");
        let checkpoint = Checkpoint::new(partition, cursor.unwrap_or_default(), page_count);
        self.save_checkpoint(checkpoint.completed()).await;
        return Ok(StopReason::Exhausted);
      }

      let outcome = self.processor.process_page(&page.edges, partition).await;
      *counts += outcome.stats;
      *pages_processed += 1;
      page_count += 1;

      tracing::debug!(
        partition,
        page = page_count,
        edges = page.edges.len(),
        accepted = outcome.stats.accepted,
        skipped = outcome.stats.skipped,
        failed = outcome.stats.failed,
        budget_left_secs = deadline.remaining().as_secs(),
        "processed page"
      );

      let next = page.next_cursor.filter(|c| !c.is_empty());
      let stop = if outcome.early_stop {
        Some(StopReason::EarlyStop)
      } else if !page.has_more || next.is_none() {
        Some(StopReason::Exhausted)
      } else {
        None
      };

      let saved_cursor = next.clone().or_else(|| cursor.clone()).unwrap_or_default();
      let checkpoint = Checkpoint::new(partition, saved_cursor, page_count);
      match stop {
        Some(reason) => {
          if reason.finished() {
            self.save_checkpoint(checkpoint.completed()).await;
          }
          return Ok(reason);
        }
        None => self.save_checkpoint(checkpoint).await,
      }

      cursor = next;
    }
  }

  /// Cursor and page count to start `partition` from.
  async fn starting_point(
    &self,
    partition: &str,
    start_cursor: Option<&str>,
  ) -> (Option<String>, u64) {
    if let Some(cursor) = start_cursor {
      tracing::info!(partition, cursor, "using explicit start cursor");
      return (Some(cursor.to_owned()), 0);
    }
    if self.config.clear_existing_data {
      return (None, 0);
    }

    match self.checkpoints.load(partition).await {
      Ok(Some(checkpoint)) => match checkpoint.resume_cursor() {
        Some(cursor) => {
          tracing::info!(
            partition,
            cursor,
            page_count = checkpoint.page_count,
            "resuming from checkpoint"
          );
          (Some(cursor.to_owned()), checkpoint.page_count)
        }
        None => (None, 0),
      },
      Ok(None) => (None, 0),
      Err(e) => {
        tracing::warn!(partition, error = %e, "failed to load checkpoint, starting from the beginning");
        (None, 0)
      }
    }
  }

  async fn save_checkpoint(&self, checkpoint: Checkpoint) {
    if let Err(e) = self.checkpoints.save(&checkpoint).await {
      tracing::warn!(
        partition = %checkpoint.partition,
        page_count = checkpoint.page_count,
        error = %e,
        "failed to save checkpoint"
      );
    }
  }
}

#[cfg(test)]
mod tests {
  use abuse_core::config::ParseMode;
  use abuse_store_sqlite::SqliteStore;

  use super::*;
  use crate::{
    checkpoint::FileCheckpointStore,
    test_support::{MemoryCheckpoints, ScriptedTransport, page_body, report_edge, test_config},
  };

  type TestOrchestrator<C> = Orchestrator<Arc<ScriptedTransport>, SqliteStore, C>;

  impl RunStats {
    fn partition(&self, name: &str) -> Option<&PartitionStats> {
      self.partitions.iter().find(|p| p.partition == name)
    }
  }

  impl PartitionStats {
    fn stop_reason(&self) -> Option<StopReason> {
      match self.status {
        PartitionStatus::Completed(reason) => Some(reason),
        PartitionStatus::Failed(_) => None,
      }
    }
  }

  struct Harness<C> {
    transport:    Arc<ScriptedTransport>,
    store:        Arc<SqliteStore>,
    orchestrator: TestOrchestrator<C>,
  }

  async fn memory_store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::open_in_memory().await.unwrap())
  }

  fn harness<C: CheckpointStore>(
    store: Arc<SqliteStore>,
    checkpoints: C,
    config: RunConfig,
  ) -> Harness<C> {
    let transport = Arc::new(ScriptedTransport::default());
    let orchestrator =
      Orchestrator::new(transport.clone(), store.clone(), checkpoints, Arc::new(config));
    Harness { transport, store, orchestrator }
  }

  fn edges(prefix: &str, n: usize) -> Vec<serde_json::Value> {
    (0..n).map(|i| report_edge(&format!("{prefix}{i}"), true)).collect()
  }

  fn script_two_pages(transport: &ScriptedTransport, partition: &str) {
    transport.push_ok(partition, page_body(&edges(&format!("{partition}-a"), 3), Some("c1"), true));
    transport.push_ok(partition, page_body(&edges(&format!("{partition}-b"), 2), Some("c2"), false));
  }

  #[tokio::test]
  async fn crawls_all_pages_and_marks_checkpoint_completed() {
    let h = harness(memory_store().await, MemoryCheckpoints::default(), test_config());
    script_two_pages(&h.transport, "ETH");

    let run = h.orchestrator.run(None).await;
    assert_eq!(run.partitions_succeeded, 1);
    assert_eq!(run.totals.accepted, 5);
    assert_eq!(run.totals.addresses_written, 5);

    let eth = run.partition("ETH").unwrap();
    assert_eq!(eth.pages_processed, 2);
    assert_eq!(eth.stop_reason(), Some(StopReason::Exhausted));
    assert_eq!(h.transport.cursors("ETH"), vec![None, Some("c1".to_owned())]);

    let checkpoint = h.orchestrator.checkpoints.get("ETH").unwrap();
    assert!(checkpoint.completed);
    assert_eq!(checkpoint.page_count, 2);
  }

  #[tokio::test]
  async fn rerun_is_idempotent() {
    let store = memory_store().await;

    let first = harness(store.clone(), MemoryCheckpoints::default(), test_config());
    script_two_pages(&first.transport, "ETH");
    first.orchestrator.run(None).await;
    let counts = store.counts().await.unwrap();

    let checkpoints = MemoryCheckpoints::default();
    checkpoints.put(first.orchestrator.checkpoints.get("ETH").unwrap());
    let second = harness(store.clone(), checkpoints, test_config());
    script_two_pages(&second.transport, "ETH");
    let run = second.orchestrator.run(None).await;

    assert_eq!(store.counts().await.unwrap(), counts);
    assert_eq!(counts.reports, 5);
    assert_eq!(counts.unified_addresses, 5);
    assert_eq!(run.totals.accepted, 0);
    assert_eq!(run.totals.skipped, 5);
    // A completed checkpoint restarts from the first page, and its page
    // count restarts with it.
    assert_eq!(second.transport.cursors("ETH")[0], None);
    assert_eq!(second.orchestrator.checkpoints.get("ETH").unwrap().page_count, 2);
  }

  #[tokio::test]
  async fn failing_partition_does_not_stop_the_run() {
    let config = RunConfig {
      partitions: vec!["ETH".into(), "BTC".into(), "SOL".into()],
      ..test_config()
    };
    let h = harness(memory_store().await, MemoryCheckpoints::default(), config);
    h.transport.push_ok("ETH", page_body(&edges("e", 2), None, false));
    h.transport.push_status("BTC", 401);
    h.transport.push_ok("SOL", page_body(&edges("s", 1), None, false));

    let run = h.orchestrator.run(None).await;
    assert_eq!(run.partitions_succeeded, 2);
    assert_eq!(run.partitions_failed, 1);
    assert_eq!(run.totals.accepted, 3);

    let btc = run.partition("BTC").unwrap();
    assert!(matches!(
      btc.status,
      PartitionStatus::Failed(PartitionError::Fetch(FetchError::Upstream { status: 401, .. }))
    ));
    assert!(h.store.report_exists("s0").await.unwrap());
  }

  #[tokio::test]
  async fn resumes_from_saved_cursor_after_failure() {
    let dir = tempfile::tempdir().unwrap();
    let store = memory_store().await;

    let first = harness(store.clone(), FileCheckpointStore::new(dir.path()), test_config());
    first.transport.push_ok("ETH", page_body(&edges("a", 3), Some("c1"), true));
    first.transport.push_status("ETH", 403);
    let run = first.orchestrator.run(None).await;
    assert_eq!(run.partitions_failed, 1);
    assert_eq!(run.partition("ETH").unwrap().counts.accepted, 3);

    let second = harness(store.clone(), FileCheckpointStore::new(dir.path()), test_config());
    second.transport.push_ok("ETH", page_body(&edges("b", 2), None, false));
    let run = second.orchestrator.run(None).await;

    assert_eq!(run.partitions_succeeded, 1);
    assert_eq!(second.transport.cursors("ETH"), vec![Some("c1".to_owned())]);
    assert_eq!(store.counts().await.unwrap().reports, 5);

    let checkpoint = second.orchestrator.checkpoints.load("ETH").await.unwrap().unwrap();
    assert_eq!(checkpoint.page_count, 2);
    assert!(checkpoint.completed);
  }

  #[tokio::test]
  async fn start_cursor_overrides_checkpoint() {
    let checkpoints = MemoryCheckpoints::default();
    checkpoints.put(Checkpoint::new("ETH", "saved", 4));
    let h = harness(memory_store().await, checkpoints, test_config());
    h.transport.push_ok("ETH", page_body(&edges("a", 1), None, false));

    h.orchestrator.run(Some(("ETH", "explicit"))).await;
    assert_eq!(h.transport.cursors("ETH"), vec![Some("explicit".to_owned())]);
  }

  #[tokio::test]
  async fn start_cursor_applies_to_its_partition_only() {
    let checkpoints = MemoryCheckpoints::default();
    checkpoints.put(Checkpoint::new("ETH", "eth-saved", 2));
    checkpoints.put(Checkpoint::new("BTC", "btc-saved", 3));
    let config = RunConfig {
      partitions: vec!["ETH".into(), "BTC".into()],
      ..test_config()
    };
    let h = harness(memory_store().await, checkpoints, config);
    h.transport.push_ok("ETH", page_body(&edges("e", 1), None, false));
    h.transport.push_ok("BTC", page_body(&edges("b", 1), None, false));

    h.orchestrator.run(Some(("BTC", "explicit"))).await;
    assert_eq!(h.transport.cursors("ETH"), vec![Some("eth-saved".to_owned())]);
    assert_eq!(h.transport.cursors("BTC"), vec![Some("explicit".to_owned())]);
  }

  #[tokio::test(start_paused = true)]
  async fn request_delay_spans_partition_boundaries() {
    let config = RunConfig {
      partitions: vec!["ETH".into(), "BTC".into()],
      request_delay: Duration::from_secs(1),
      ..test_config()
    };
    let h = harness(memory_store().await, MemoryCheckpoints::default(), config);
    h.transport.push_ok("ETH", page_body(&edges("e", 1), None, false));
    h.transport.push_ok("BTC", page_body(&edges("b", 1), None, false));

    let run = h.orchestrator.run(None).await;
    assert_eq!(run.partitions_succeeded, 2);

    let times = h.transport.request_times();
    assert_eq!(times.len(), 2);
    assert!(times[1] - times[0] >= Duration::from_secs(1), "gap {:?}", times[1] - times[0]);
  }

  #[tokio::test(start_paused = true)]
  async fn first_request_of_a_run_is_not_delayed() {
    let config = RunConfig { request_delay: Duration::from_secs(30), ..test_config() };
    let h = harness(memory_store().await, MemoryCheckpoints::default(), config);
    h.transport.push_ok("ETH", page_body(&edges("e", 1), None, false));

    let started = Instant::now();
    h.orchestrator.run(None).await;
    assert_eq!(h.transport.request_times()[0], started);
  }

  #[tokio::test]
  async fn incremental_run_stops_early_on_known_reports() {
    let store = memory_store().await;
    let seed = harness(store.clone(), MemoryCheckpoints::default(), test_config());
    seed.transport.push_ok("ETH", page_body(&edges("old", 6), None, false));
    seed.orchestrator.run(None).await;

    let config = RunConfig { mode: ParseMode::NewOnly, ..test_config() };
    let h = harness(store.clone(), MemoryCheckpoints::default(), config);
    let mut first_page = edges("new", 2);
    first_page.extend(edges("old", 6));
    h.transport.push_ok("ETH", page_body(&first_page, Some("c1"), true));
    h.transport.push_ok("ETH", page_body(&edges("older", 3), None, false));

    let run = h.orchestrator.run(None).await;
    let eth = run.partition("ETH").unwrap();
    assert_eq!(eth.stop_reason(), Some(StopReason::EarlyStop));
    assert_eq!(eth.counts.accepted, 2);
    assert_eq!(h.transport.request_count("ETH"), 1, "second page never requested");
    assert!(!store.report_exists("older0").await.unwrap());
  }

  #[tokio::test]
  async fn page_cap_limits_pages_per_partition() {
    let config = RunConfig { max_pages_per_partition: Some(1), ..test_config() };
    let h = harness(memory_store().await, MemoryCheckpoints::default(), config);
    script_two_pages(&h.transport, "ETH");

    let run = h.orchestrator.run(None).await;
    let eth = run.partition("ETH").unwrap();
    assert_eq!(eth.stop_reason(), Some(StopReason::PageCap));
    assert_eq!(eth.pages_processed, 1);
    assert_eq!(h.transport.request_count("ETH"), 1);

    let checkpoint = h.orchestrator.checkpoints.get("ETH").unwrap();
    assert_eq!(checkpoint.resume_cursor(), Some("c1"));
  }

  #[tokio::test(start_paused = true)]
  async fn time_budget_stops_between_pages() {
    let config = RunConfig {
      request_delay: Duration::from_secs(6),
      time_budget: Duration::from_secs(10),
      ..test_config()
    };
    let h = harness(memory_store().await, MemoryCheckpoints::default(), config);
    h.transport.push_ok("ETH", page_body(&edges("a", 1), Some("c1"), true));
    h.transport.push_ok("ETH", page_body(&edges("b", 1), Some("c2"), true));
    h.transport.push_ok("ETH", page_body(&edges("c", 1), Some("c3"), true));

    let run = h.orchestrator.run(None).await;
    let eth = run.partition("ETH").unwrap();
    assert_eq!(eth.stop_reason(), Some(StopReason::TimeBudget));
    assert_eq!(eth.pages_processed, 2);

    let times = h.transport.request_times();
    assert_eq!(times[1] - times[0], Duration::from_secs(6));

    let checkpoint = h.orchestrator.checkpoints.get("ETH").unwrap();
    assert_eq!(checkpoint.resume_cursor(), Some("c2"));
  }

  #[tokio::test]
  async fn empty_page_exhausts_partition() {
    let h = harness(memory_store().await, MemoryCheckpoints::default(), test_config());
    h.transport.push_ok("ETH", page_body(&edges("a", 1), Some("c1"), true));
    h.transport.push_ok("ETH", page_body(&[], Some("c2"), true));

    let run = h.orchestrator.run(None).await;
    let eth = run.partition("ETH").unwrap();
    assert_eq!(eth.stop_reason(), Some(StopReason::Exhausted));
    assert_eq!(eth.pages_processed, 1);
    assert!(h.orchestrator.checkpoints.get("ETH").unwrap().completed);
  }

  #[tokio::test]
  async fn protocol_error_stops_partition_without_failing_it() {
    let h = harness(memory_store().await, MemoryCheckpoints::default(), test_config());
    h.transport.push_ok("ETH", page_body(&edges("a", 2), Some("c1"), true));
    h.transport.push_ok("ETH", serde_json::json!({ "errors": [ { "message": "rate" } ] }));

    let run = h.orchestrator.run(None).await;
    assert_eq!(run.partitions_failed, 0);
    let eth = run.partition("ETH").unwrap();
    assert_eq!(eth.stop_reason(), Some(StopReason::Protocol));

    let checkpoint = h.orchestrator.checkpoints.get("ETH").unwrap();
    assert_eq!(checkpoint.resume_cursor(), Some("c1"));
  }

  #[tokio::test(start_paused = true)]
  async fn exhausted_retries_fail_only_that_partition() {
    let config = RunConfig {
      partitions: vec!["ETH".into(), "BTC".into()],
      max_retries: 2,
      ..test_config()
    };
    let h = harness(memory_store().await, MemoryCheckpoints::default(), config);
    for _ in 0..3 {
      h.transport.push_status("ETH", 502);
    }
    h.transport.push_ok("BTC", page_body(&edges("b", 1), None, false));

    let run = h.orchestrator.run(None).await;
    assert_eq!(run.partitions_failed, 1);
    assert_eq!(run.partitions_succeeded, 1);
    assert!(matches!(
      run.partition("ETH").unwrap().status,
      PartitionStatus::Failed(PartitionError::Fetch(FetchError::RetriesExhausted { .. }))
    ));
    assert_eq!(h.transport.request_count("ETH"), 3);
  }

  #[tokio::test]
  async fn checkpoint_save_failures_are_not_fatal() {
    let checkpoints = MemoryCheckpoints::failing();
    let h = harness(memory_store().await, checkpoints, test_config());
    script_two_pages(&h.transport, "ETH");

    let run = h.orchestrator.run(None).await;
    assert_eq!(run.partitions_succeeded, 1);
    assert_eq!(run.totals.accepted, 5);
  }

  #[tokio::test]
  async fn clear_flag_truncates_before_first_partition_only() {
    let store = memory_store().await;
    let seed = harness(store.clone(), MemoryCheckpoints::default(), test_config());
    seed.transport.push_ok("ETH", page_body(&edges("stale", 2), None, false));
    seed.orchestrator.run(None).await;

    let checkpoints = MemoryCheckpoints::default();
    checkpoints.put(Checkpoint::new("ETH", "stale-cursor", 9));
    let config = RunConfig {
      partitions: vec!["ETH".into(), "BTC".into()],
      clear_existing_data: true,
      ..test_config()
    };
    let h = harness(store.clone(), checkpoints, config);
    h.transport.push_ok("ETH", page_body(&edges("e", 1), None, false));
    h.transport.push_ok("BTC", page_body(&edges("b", 1), None, false));

    let run = h.orchestrator.run(None).await;
    assert_eq!(run.partitions_succeeded, 2);
    assert_eq!(h.transport.cursors("ETH"), vec![None], "checkpoints ignored when clearing");

    assert!(!store.report_exists("stale0").await.unwrap());
    assert!(store.report_exists("e0").await.unwrap());
    assert!(store.report_exists("b0").await.unwrap());
    let counts = store.counts().await.unwrap();
    assert_eq!(counts.reports, 2);
    assert_eq!(counts.unified_addresses, 4, "registry survives the clear");
  }
}
