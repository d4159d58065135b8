//! One automation cycle: detect, allocate, trigger, report.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info, warn};

use crate::activity::{ActivityEvent, ActivityLog};
use crate::config::SettingsProvider;
use crate::context::CycleContext;
use crate::detection::{DetectionResults, Detector};
use crate::metrics::{CYCLES_TOTAL, CYCLE_DURATION, DETECTION_FAILURES, ITEMS_DETECTED};
use crate::search::{SearchCategory, SearchTrigger, TriggerResults};

use super::types::{CycleFailure, CycleResult};

/// Something the scheduler can run once per tick.
#[async_trait]
pub trait CycleRunner: Send + Sync {
    /// Run a full cycle. Any recorded failure turns the outcome into
    /// `CycleFailure`, which still carries the complete result.
    async fn run_cycle(&self, ctx: CycleContext) -> Result<CycleResult, CycleFailure>;
}

/// Wires detection and search triggering into a cycle.
pub struct AutomationOrchestrator {
    settings: Arc<dyn SettingsProvider>,
    detector: Arc<dyn Detector>,
    trigger: Arc<dyn SearchTrigger>,
    activity: Arc<dyn ActivityLog>,
}

impl AutomationOrchestrator {
    pub fn new(
        settings: Arc<dyn SettingsProvider>,
        detector: Arc<dyn Detector>,
        trigger: Arc<dyn SearchTrigger>,
        activity: Arc<dyn ActivityLog>,
    ) -> Self {
        Self {
            settings,
            detector,
            trigger,
            activity,
        }
    }

    async fn report_detection(
        &self,
        ctx: &CycleContext,
        detection: &DetectionResults,
        errors: &mut Vec<String>,
    ) {
        for result in &detection.results {
            let server = result.server_name().to_string();
            match &result.error {
                None => {
                    info!(
                        cycle_id = %ctx.cycle_id,
                        server = %server,
                        missing = result.missing_ids.len(),
                        cutoff = result.cutoff_ids.len(),
                        "Server detected"
                    );
                    for category in SearchCategory::ALL {
                        ITEMS_DETECTED
                            .with_label_values(&[category.as_str()])
                            .inc_by(result.ids(category).len() as u64);
                    }
                    self.activity
                        .record(ActivityEvent::ServerDetected {
                            cycle_id: ctx.cycle_id,
                            server,
                            server_kind: result.server.kind,
                            missing: result.missing_ids.len(),
                            cutoff: result.cutoff_ids.len(),
                        })
                        .await;
                }
                Some(e) => {
                    error!(
                        cycle_id = %ctx.cycle_id,
                        server = %server,
                        error = %e,
                        "Server detection failed"
                    );
                    DETECTION_FAILURES.inc();
                    errors.push(format!("server {}: {}", server, e));
                    self.activity
                        .record(ActivityEvent::ServerDetectionFailed {
                            cycle_id: ctx.cycle_id,
                            server,
                            server_kind: result.server.kind,
                            error: e.clone(),
                        })
                        .await;
                }
            }
        }
    }

    async fn report_triggers(
        &self,
        ctx: &CycleContext,
        triggers: &TriggerResults,
        errors: &mut Vec<String>,
    ) {
        for result in &triggers.results {
            if result.success {
                info!(
                    cycle_id = %ctx.cycle_id,
                    server = %result.server,
                    category = %result.category,
                    items = result.item_ids.len(),
                    dry_run = result.dry_run,
                    "Search batch triggered"
                );
                self.activity
                    .record(ActivityEvent::SearchBatchTriggered {
                        cycle_id: ctx.cycle_id,
                        server: result.server.clone(),
                        category: result.category,
                        item_count: result.item_ids.len(),
                        dry_run: result.dry_run,
                    })
                    .await;
            } else {
                let message = result
                    .error
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string());
                error!(
                    cycle_id = %ctx.cycle_id,
                    server = %result.server,
                    category = %result.category,
                    items = result.item_ids.len(),
                    error = %message,
                    "Search batch failed"
                );
                errors.push(format!(
                    "server {} ({}): {}",
                    result.server, result.category, message
                ));
                self.activity
                    .record(ActivityEvent::SearchBatchFailed {
                        cycle_id: ctx.cycle_id,
                        server: result.server.clone(),
                        category: result.category,
                        item_count: result.item_ids.len(),
                        error: message,
                        rate_limited: result.rate_limited,
                    })
                    .await;
            }
        }
    }
}

#[async_trait]
impl CycleRunner for AutomationOrchestrator {
    async fn run_cycle(&self, ctx: CycleContext) -> Result<CycleResult, CycleFailure> {
        let started_at = Utc::now();
        let timer = std::time::Instant::now();
        let settings = self.settings.automation();
        let trigger_label = if ctx.is_manual { "manual" } else { "scheduled" };

        info!(
            cycle_id = %ctx.cycle_id,
            is_manual = ctx.is_manual,
            dry_run = settings.dry_run,
            "Automation cycle started"
        );
        self.activity
            .record(ActivityEvent::CycleStarted {
                cycle_id: ctx.cycle_id,
                is_manual: ctx.is_manual,
                dry_run: settings.dry_run,
            })
            .await;

        let mut errors = Vec::new();
        // Phases that returned an error instead of per-server results.
        let mut phase_failures = 0;

        let detection = match self.detector.detect_all(&ctx).await {
            Ok(detection) => Some(detection),
            Err(e) => {
                warn!(cycle_id = %ctx.cycle_id, error = %e, "Detection did not run");
                errors.push(e.to_string());
                phase_failures += 1;
                None
            }
        };

        let (detection, triggers) = match detection {
            Some(detection) => {
                self.report_detection(&ctx, &detection, &mut errors).await;
                let triggers = match self
                    .trigger
                    .trigger_searches(&ctx, &detection, settings.limits, settings.dry_run)
                    .await
                {
                    Ok(triggers) => triggers,
                    Err(e) => {
                        warn!(
                            cycle_id = %ctx.cycle_id,
                            error = %e,
                            "Search triggering did not run"
                        );
                        errors.push(e.to_string());
                        phase_failures += 1;
                        TriggerResults::default()
                    }
                };
                (detection, triggers)
            }
            None => (DetectionResults::default(), TriggerResults::default()),
        };
        self.report_triggers(&ctx, &triggers, &mut errors).await;

        let duration = timer.elapsed();
        let total_failures = detection.failure_count + triggers.failure_count + phase_failures;
        let result = CycleResult {
            cycle_id: ctx.cycle_id,
            is_manual: ctx.is_manual,
            dry_run: settings.dry_run,
            started_at,
            finished_at: Utc::now(),
            success: total_failures == 0 && errors.is_empty(),
            total_searches_triggered: triggers.total_triggered(),
            total_failures,
            errors,
            duration_ms: duration.as_millis() as u64,
            detection,
            triggers,
        };

        CYCLES_TOTAL
            .with_label_values(&[
                trigger_label,
                if result.success { "success" } else { "partial_failure" },
            ])
            .inc();
        CYCLE_DURATION
            .with_label_values(&[trigger_label])
            .observe(duration.as_secs_f64());

        info!(
            cycle_id = %result.cycle_id,
            is_manual = result.is_manual,
            servers = result.detection.results.len(),
            missing = result.detection.total_missing,
            cutoff = result.detection.total_cutoff,
            searches = result.total_searches_triggered,
            failures = result.total_failures,
            duration_ms = result.duration_ms,
            "Automation cycle completed"
        );
        self.activity
            .record(ActivityEvent::CycleCompleted {
                cycle_id: result.cycle_id,
                is_manual: result.is_manual,
                success: result.success,
                searches_triggered: result.total_searches_triggered,
                failures: result.total_failures,
                duration_ms: result.duration_ms,
            })
            .await;

        if result.success {
            Ok(result)
        } else {
            Err(CycleFailure::new(result))
        }
    }
}
