//! Executes the allocation plan against the library servers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::activity::{ActivityEvent, ActivityLog};
use crate::arr::{ArrClient, ArrError, ClientFactory};
use crate::context::{CycleContext, EngineError};
use crate::detection::{DetectionResult, DetectionResults};
use crate::metrics::{RATE_LIMIT_SKIPS, SEARCHES_TRIGGERED, TRIGGER_FAILURES};

use super::allocation::{plan_allocations, ServerAllocation};
use super::{SearchCategory, SearchLimits, TriggerResult, TriggerResults};

/// Pause between successive search commands.
pub const DEFAULT_CALL_DELAY: Duration = Duration::from_millis(100);

/// Default ids per search command; 0 sends one command per server and category.
pub const DEFAULT_BATCH_SIZE: usize = 0;

/// Consecutive rate-limited commands after which a server is skipped.
pub const MAX_CONSECUTIVE_RATE_LIMITS: u32 = 3;

/// Search phase of a cycle.
#[async_trait]
pub trait SearchTrigger: Send + Sync {
    async fn trigger_searches(
        &self,
        ctx: &CycleContext,
        detection: &DetectionResults,
        limits: SearchLimits,
        dry_run: bool,
    ) -> Result<TriggerResults, EngineError>;
}

/// Trigger that sends `*Search` commands through `ArrClient`s.
///
/// Servers are handled one after another, missing before cutoff, each as a
/// single command unless a batch size is set.
pub struct ArrSearchTrigger {
    factory: Arc<dyn ClientFactory>,
    activity: Arc<dyn ActivityLog>,
    batch_size: usize,
    call_delay: Duration,
}

impl ArrSearchTrigger {
    pub fn new(factory: Arc<dyn ClientFactory>, activity: Arc<dyn ActivityLog>) -> Self {
        Self {
            factory,
            activity,
            batch_size: DEFAULT_BATCH_SIZE,
            call_delay: DEFAULT_CALL_DELAY,
        }
    }

    /// Ids per command; 0 sends each server/category in a single command.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_call_delay(mut self, call_delay: Duration) -> Self {
        self.call_delay = call_delay;
        self
    }

    fn batches<'a>(&self, ids: &'a [i64]) -> std::slice::Chunks<'a, i64> {
        let size = if self.batch_size == 0 {
            ids.len().max(1)
        } else {
            self.batch_size
        };
        ids.chunks(size)
    }

    fn record_dry_run(
        &self,
        detected: &DetectionResult,
        plan: &ServerAllocation,
        out: &mut TriggerResults,
    ) {
        for category in SearchCategory::ALL {
            for batch in self.batches(plan.ids(category)) {
                out.record(TriggerResult::succeeded(
                    detected.server_name(),
                    detected.server.kind,
                    category,
                    batch.to_vec(),
                    true,
                ));
            }
        }
        info!(
            server = %detected.server_name(),
            missing = plan.missing.len(),
            cutoff = plan.cutoff.len(),
            "Dry run, searches not sent"
        );
    }

    async fn log_items(
        &self,
        ctx: &CycleContext,
        detected: &DetectionResult,
        category: SearchCategory,
        batch: &[i64],
    ) {
        for &id in batch {
            let (media_kind, title, quality_profile) = match detected.item(category, id) {
                Some(item) => (
                    item.kind(),
                    item.display_title(),
                    item.quality_profile().to_string(),
                ),
                None => (
                    detected.server.kind.media_kind(),
                    format!("#{}", id),
                    "Unknown".to_string(),
                ),
            };
            debug!(
                server = %detected.server_name(),
                category = %category,
                item = %title,
                "Triggering search"
            );
            self.activity
                .record(ActivityEvent::SearchItemTriggered {
                    cycle_id: ctx.cycle_id,
                    server: detected.server_name().to_string(),
                    category,
                    media_kind,
                    item_id: id,
                    title,
                    quality_profile,
                })
                .await;
        }
    }

    /// Runs one server's batches. Returns false when cancellation stopped it.
    async fn trigger_server(
        &self,
        ctx: &CycleContext,
        client: &dyn ArrClient,
        detected: &DetectionResult,
        plan: &ServerAllocation,
        calls_made: &mut usize,
        out: &mut TriggerResults,
    ) -> bool {
        let server = detected.server_name();
        let kind = detected.server.kind;
        let mut strikes = 0u32;
        let mut submitted = 0usize;

        for category in SearchCategory::ALL {
            for batch in self.batches(plan.ids(category)) {
                if ctx.is_cancelled() {
                    return false;
                }
                if *calls_made > 0 && !self.call_delay.is_zero() {
                    tokio::select! {
                        _ = tokio::time::sleep(self.call_delay) => {}
                        _ = ctx.cancelled() => return false,
                    }
                }
                *calls_made += 1;

                self.log_items(ctx, detected, category, batch).await;

                let outcome = tokio::select! {
                    result = client.trigger_search(batch) => result,
                    _ = ctx.cancelled() => Err(ArrError::Cancelled),
                };
                submitted += batch.len();

                match outcome {
                    Ok(()) => {
                        strikes = 0;
                        SEARCHES_TRIGGERED
                            .with_label_values(&[category.as_str()])
                            .inc_by(batch.len() as u64);
                        out.record(TriggerResult::succeeded(
                            server,
                            kind,
                            category,
                            batch.to_vec(),
                            false,
                        ));
                    }
                    Err(e) => {
                        let rate_limited = e.is_rate_limited();
                        let failure_kind = if rate_limited { "rate_limited" } else { "error" };
                        TRIGGER_FAILURES.with_label_values(&[failure_kind]).inc();
                        warn!(
                            server = %server,
                            category = %category,
                            error = %e,
                            "Search command failed"
                        );
                        out.record(TriggerResult::failed(
                            server,
                            kind,
                            category,
                            batch.to_vec(),
                            e.to_string(),
                            rate_limited,
                        ));

                        if rate_limited {
                            strikes += 1;
                        }
                        if strikes >= MAX_CONSECUTIVE_RATE_LIMITS {
                            let skipped_items = plan.len() - submitted;
                            warn!(
                                server = %server,
                                skipped_items = skipped_items,
                                "Server keeps rate limiting, skipping it for this cycle"
                            );
                            RATE_LIMIT_SKIPS.inc();
                            out.rate_limited_servers.push(server.to_string());
                            self.activity
                                .record(ActivityEvent::ServerRateLimitSkipped {
                                    cycle_id: ctx.cycle_id,
                                    server: server.to_string(),
                                    skipped_items,
                                })
                                .await;
                            return true;
                        }
                    }
                }
            }
        }
        true
    }
}

#[async_trait]
impl SearchTrigger for ArrSearchTrigger {
    async fn trigger_searches(
        &self,
        ctx: &CycleContext,
        detection: &DetectionResults,
        limits: SearchLimits,
        dry_run: bool,
    ) -> Result<TriggerResults, EngineError> {
        if ctx.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let plan = plan_allocations(detection, &limits);
        let mut out = TriggerResults::default();
        if plan.is_empty() {
            debug!("Nothing allocated, no searches to trigger");
            return Ok(out);
        }

        let mut calls_made = 0usize;
        for allocation in &plan {
            let detected = &detection.results[allocation.server_index];

            if dry_run {
                self.record_dry_run(detected, allocation, &mut out);
                continue;
            }

            let client = match self.factory.client_for(&detected.server) {
                Ok(client) => client,
                Err(e) => {
                    warn!(server = %detected.server_name(), error = %e, "Could not build client");
                    for category in SearchCategory::ALL {
                        let ids = allocation.ids(category);
                        if ids.is_empty() {
                            continue;
                        }
                        out.record(TriggerResult::failed(
                            detected.server_name(),
                            detected.server.kind,
                            category,
                            ids.to_vec(),
                            format!("client setup failed: {}", e),
                            false,
                        ));
                    }
                    continue;
                }
            };

            let finished = self
                .trigger_server(
                    ctx,
                    client.as_ref(),
                    detected,
                    allocation,
                    &mut calls_made,
                    &mut out,
                )
                .await;
            if !finished {
                warn!("Cycle cancelled, remaining searches not sent");
                break;
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::DetectionResult;
    use crate::testing::{fixtures, MockArrClient, MockClientFactory, RecordingActivityLog};

    fn missing_only(movies: u32) -> SearchLimits {
        SearchLimits {
            missing_movies: movies,
            missing_episodes: 0,
            cutoff_movies: 0,
            cutoff_episodes: 0,
        }
    }

    fn rate_limited() -> ArrError {
        ArrError::RateLimited { retry_after: None }
    }

    fn single_server(missing: usize, cutoff: usize) -> DetectionResults {
        DetectionResults::from_results(vec![DetectionResult::success(
            fixtures::radarr_server("movies"),
            fixtures::movies(1, missing),
            fixtures::movies(1000, cutoff),
        )])
    }

    struct Harness {
        trigger: ArrSearchTrigger,
        client: MockArrClient,
        activity: Arc<RecordingActivityLog>,
    }

    fn harness(batch_size: usize) -> Harness {
        let client = MockArrClient::new();
        let factory = MockClientFactory::new();
        factory.insert("movies", client.clone());
        let activity = Arc::new(RecordingActivityLog::new());
        let trigger = ArrSearchTrigger::new(Arc::new(factory), activity.clone())
            .with_batch_size(batch_size)
            .with_call_delay(Duration::ZERO);
        Harness {
            trigger,
            client,
            activity,
        }
    }

    #[tokio::test]
    async fn test_triggers_missing_then_cutoff() {
        let h = harness(0);
        let detection = single_server(3, 2);
        let limits = SearchLimits {
            missing_movies: 10,
            missing_episodes: 0,
            cutoff_movies: 10,
            cutoff_episodes: 0,
        };

        let results = h
            .trigger
            .trigger_searches(&CycleContext::new(false), &detection, limits, false)
            .await
            .unwrap();

        assert_eq!(h.client.trigger_calls(), vec![vec![1, 2, 3], vec![1000, 1001]]);
        assert_eq!(results.total_missing_triggered, 3);
        assert_eq!(results.total_cutoff_triggered, 2);
        assert_eq!(results.success_count, 2);
        assert_eq!(h.activity.count_of("search_item_triggered"), 5);
    }

    #[tokio::test]
    async fn test_default_sends_one_command_per_category() {
        let client = MockArrClient::new();
        let factory = MockClientFactory::new();
        factory.insert("movies", client.clone());
        let activity = Arc::new(RecordingActivityLog::new());
        let trigger = ArrSearchTrigger::new(Arc::new(factory), activity)
            .with_call_delay(Duration::ZERO);
        let detection = single_server(25, 12);
        let limits = SearchLimits {
            missing_movies: 25,
            missing_episodes: 0,
            cutoff_movies: 12,
            cutoff_episodes: 0,
        };

        let results = trigger
            .trigger_searches(&CycleContext::new(false), &detection, limits, false)
            .await
            .unwrap();

        let calls = client.trigger_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].len(), 25);
        assert_eq!(calls[1].len(), 12);
        assert_eq!(results.results.len(), 2);
        assert_eq!(results.total_triggered(), 37);
    }

    #[tokio::test]
    async fn test_dry_run_makes_no_calls_and_reports_same_counts() {
        let h = harness(2);
        let detection = single_server(5, 0);

        let results = h
            .trigger
            .trigger_searches(&CycleContext::new(false), &detection, missing_only(4), true)
            .await
            .unwrap();

        assert!(h.client.trigger_calls().is_empty());
        assert_eq!(results.total_missing_triggered, 4);
        assert_eq!(results.results.len(), 2);
        assert!(results.results.iter().all(|r| r.success && r.dry_run));
        assert_eq!(h.activity.count_of("search_item_triggered"), 0);
    }

    #[tokio::test]
    async fn test_zero_limit_sends_nothing() {
        let h = harness(10);
        let detection = single_server(5, 5);

        let results = h
            .trigger
            .trigger_searches(&CycleContext::new(false), &detection, SearchLimits::none(), false)
            .await
            .unwrap();

        assert!(h.client.trigger_calls().is_empty());
        assert_eq!(results.total_triggered(), 0);
        assert!(results.results.is_empty());
    }

    #[tokio::test]
    async fn test_three_rate_limits_skip_server() {
        let h = harness(1);
        for _ in 0..3 {
            h.client.push_trigger_error(rate_limited());
        }
        let detection = single_server(6, 0);

        let results = h
            .trigger
            .trigger_searches(&CycleContext::new(false), &detection, missing_only(6), false)
            .await
            .unwrap();

        assert_eq!(h.client.trigger_calls().len(), 3);
        assert_eq!(results.failure_count, 3);
        assert_eq!(results.total_missing_triggered, 0);
        assert_eq!(results.rate_limited_servers, vec!["movies".to_string()]);
        assert!(results.results.iter().all(|r| r.rate_limited));
        assert_eq!(h.activity.count_of("server_rate_limit_skipped"), 1);
    }

    #[tokio::test]
    async fn test_success_resets_rate_limit_counter() {
        let h = harness(1);
        h.client.push_trigger_error(rate_limited());
        h.client.push_trigger_error(rate_limited());
        h.client.push_trigger_ok();
        h.client.push_trigger_error(rate_limited());
        h.client.push_trigger_error(rate_limited());
        let detection = single_server(6, 0);

        let results = h
            .trigger
            .trigger_searches(&CycleContext::new(false), &detection, missing_only(6), false)
            .await
            .unwrap();

        assert_eq!(h.client.trigger_calls().len(), 6);
        assert_eq!(results.failure_count, 4);
        assert_eq!(results.success_count, 2);
        assert!(results.rate_limited_servers.is_empty());
    }

    #[tokio::test]
    async fn test_other_errors_do_not_touch_rate_limit_counter() {
        let h = harness(1);
        h.client.push_trigger_error(rate_limited());
        h.client.push_trigger_error(rate_limited());
        h.client.push_trigger_error(ArrError::ApiError("HTTP 500".to_string()));
        h.client.push_trigger_error(rate_limited());
        let detection = single_server(6, 0);

        let results = h
            .trigger
            .trigger_searches(&CycleContext::new(false), &detection, missing_only(6), false)
            .await
            .unwrap();

        assert_eq!(h.client.trigger_calls().len(), 4);
        assert_eq!(results.rate_limited_servers, vec!["movies".to_string()]);
        assert!(!results.results[2].rate_limited);
    }

    #[tokio::test]
    async fn test_rate_limited_server_does_not_stop_others() {
        let movies = MockArrClient::new();
        for _ in 0..3 {
            movies.push_trigger_error(rate_limited());
        }
        let tv = MockArrClient::new();
        let factory = MockClientFactory::new();
        factory.insert("movies", movies.clone());
        factory.insert("tv", tv.clone());
        let trigger = ArrSearchTrigger::new(Arc::new(factory), Arc::new(RecordingActivityLog::new()))
            .with_batch_size(1)
            .with_call_delay(Duration::ZERO);

        let detection = DetectionResults::from_results(vec![
            DetectionResult::success(fixtures::radarr_server("movies"), fixtures::movies(1, 5), vec![]),
            DetectionResult::success(fixtures::sonarr_server("tv"), fixtures::episodes(100, 5), vec![]),
        ]);
        let limits = SearchLimits {
            missing_movies: 5,
            missing_episodes: 5,
            cutoff_movies: 0,
            cutoff_episodes: 0,
        };

        let results = trigger
            .trigger_searches(&CycleContext::new(false), &detection, limits, false)
            .await
            .unwrap();

        assert_eq!(movies.trigger_calls().len(), 3);
        assert_eq!(tv.trigger_calls().len(), 5);
        assert_eq!(results.total_missing_triggered, 5);
    }

    #[tokio::test]
    async fn test_pacing_between_calls() {
        let client = MockArrClient::new();
        let factory = MockClientFactory::new();
        factory.insert("movies", client.clone());
        let trigger = ArrSearchTrigger::new(Arc::new(factory), Arc::new(RecordingActivityLog::new()))
            .with_batch_size(1)
            .with_call_delay(Duration::from_millis(100));
        let detection = single_server(3, 0);

        let start = std::time::Instant::now();
        trigger
            .trigger_searches(&CycleContext::new(false), &detection, missing_only(3), false)
            .await
            .unwrap();

        // Two pauses for three calls, none before the first.
        assert!(start.elapsed() >= Duration::from_millis(200));
        assert_eq!(client.trigger_calls().len(), 3);
    }

    #[tokio::test]
    async fn test_item_events_carry_titles() {
        let h = harness(10);
        let detection = single_server(1, 0);

        h.trigger
            .trigger_searches(&CycleContext::new(false), &detection, missing_only(1), false)
            .await
            .unwrap();

        let events = h.activity.events();
        match &events[0] {
            ActivityEvent::SearchItemTriggered {
                title,
                category,
                item_id,
                ..
            } => {
                assert_eq!(title, "Movie 1 (2000)");
                assert_eq!(*category, SearchCategory::Missing);
                assert_eq!(*item_id, 1);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let h = harness(10);
        let ctx = CycleContext::new(false);
        ctx.cancel_token().cancel();

        let result = h
            .trigger
            .trigger_searches(&ctx, &single_server(1, 0), missing_only(1), false)
            .await;
        assert_eq!(result.unwrap_err(), EngineError::Cancelled);
        assert!(h.client.trigger_calls().is_empty());
    }
}
