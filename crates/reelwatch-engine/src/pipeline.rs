//! Run orchestration.
//!
//! ## Stages (in order):
//! 1. Fetching - pull the raw feed
//! 2. Normalizing - flatten into records; malformed occurrences are collected
//! 3. LocatingReference - newest stored snapshot other than this run's
//! 4. Diffing - new minus old against the reference
//! 5. PersistingArtifacts - snapshot, then diff (always, even when empty)
//! 6. Notifying - one message per new record, failures collected
//! 7. Retaining - purge both collections, failures collected
//!
//! Fetching, Normalizing, LocatingReference and PersistingArtifacts abort
//! the run on a fatal error, tagged with the stage. Diffing cannot fail.
//! Nothing is sent unless both artifacts were written.

use crate::config::AppConfig;
use crate::feed::{FeedSource, HttpFeedClient};
use crate::notify::{dispatch_all, Notifier, TelegramNotifier};
use crate::retention::{purge, RetentionReport};
use chrono::{DateTime, Utc};
use reelwatch_core::diff::{compute_diff, render_diff_summary};
use reelwatch_core::errors::{ExError, ExErrorKind, Result};
use reelwatch_core::model::IdentityKey;
use reelwatch_core::normalize::normalize;
use reelwatch_core::retention::RetentionPolicy;
use reelwatch_core::snapshot::Snapshot;
use reelwatch_core::{log_op_end, log_op_error, log_op_start};
use reelwatch_core_types::{RunContext, RunId};
use reelwatch_store::{Collection, FsBlobStore, Location, SnapshotStore};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Fetching,
    Normalizing,
    LocatingReference,
    Diffing,
    PersistingArtifacts,
    Notifying,
    Retaining,
    Done,
    Failed,
}

impl RunStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStage::Fetching => "fetching",
            RunStage::Normalizing => "normalizing",
            RunStage::LocatingReference => "locating_reference",
            RunStage::Diffing => "diffing",
            RunStage::PersistingArtifacts => "persisting_artifacts",
            RunStage::Notifying => "notifying",
            RunStage::Retaining => "retaining",
            RunStage::Done => "done",
            RunStage::Failed => "failed",
        }
    }

    /// Whether an error in this stage moves the run to `Failed`.
    pub fn can_fail(&self) -> bool {
        matches!(
            self,
            RunStage::Fetching
                | RunStage::Normalizing
                | RunStage::LocatingReference
                | RunStage::PersistingArtifacts
        )
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Knobs of a run that do not concern the collaborators themselves.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub snapshots: Collection,
    pub diffs: Collection,
    pub retention: RetentionPolicy,
    pub notify_concurrency: usize,
    /// Bound on each single notification
    pub notify_timeout: Duration,
    /// Recorded on every run context
    pub trigger: String,
}

impl PipelineSettings {
    /// # Errors
    ///
    /// `Config` if the retention window is invalid.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            snapshots: Collection::snapshots(config.snapshots_prefix.clone()),
            diffs: Collection::diffs(config.diffs_prefix.clone()),
            retention: config.retention_policy()?,
            notify_concurrency: config.notify_concurrency,
            notify_timeout: config.http_timeout(),
            trigger: "cli".to_string(),
        })
    }
}

/// Summary of a completed run.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub snapshot_location: Location,
    pub diff_location: Location,
    /// `None` on bootstrap
    pub reference_location: Option<Location>,
    pub record_count: usize,
    pub new_records: usize,
    pub duplicate_keys: Vec<IdentityKey>,
    /// Skipped occurrences
    pub soft_errors: Vec<ExError>,
    /// Stored objects passed over while locating the reference
    pub skipped_artifacts: Vec<ExError>,
    pub notified: usize,
    pub notify_failures: Vec<ExError>,
    /// One report per collection (snapshots, then diffs)
    pub retention: Vec<RetentionReport>,
    pub final_stage: RunStage,
}

impl RunReport {
    pub fn retention_failures(&self) -> impl Iterator<Item = &ExError> {
        self.retention.iter().flat_map(|r| r.failures.iter())
    }

    pub fn purged(&self) -> usize {
        self.retention.iter().map(|r| r.deleted.len()).sum()
    }

    /// Whether any non-fatal failure was collected.
    pub fn has_failures(&self) -> bool {
        !self.soft_errors.is_empty()
            || !self.skipped_artifacts.is_empty()
            || !self.notify_failures.is_empty()
            || self.retention_failures().next().is_some()
    }

    /// Plain-text summary for the CLI.
    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Run {} ({})\n", self.run_id, self.final_stage));
        out.push_str(&format!(
            "  snapshot:  {} ({} records)\n",
            self.snapshot_location, self.record_count
        ));
        out.push_str(&format!(
            "  reference: {}\n",
            self.reference_location
                .as_ref()
                .map(Location::to_string)
                .unwrap_or_else(|| "none (bootstrap)".to_string())
        ));
        out.push_str(&format!(
            "  diff:      {} ({} new)\n",
            self.diff_location, self.new_records
        ));
        out.push_str(&format!(
            "  notified:  {}/{}\n",
            self.notified, self.new_records
        ));
        out.push_str(&format!("  purged:    {}\n", self.purged()));

        let failures: Vec<&ExError> = self
            .soft_errors
            .iter()
            .chain(self.skipped_artifacts.iter())
            .chain(self.notify_failures.iter())
            .chain(self.retention_failures())
            .collect();
        if !failures.is_empty() {
            out.push_str(&format!("  non-fatal failures ({}):\n", failures.len()));
            for failure in failures {
                out.push_str(&format!("    - {}\n", failure));
            }
        }
        out
    }
}

pub struct Pipeline {
    feed: Arc<dyn FeedSource>,
    store: SnapshotStore,
    notifier: Arc<dyn Notifier>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        store: SnapshotStore,
        notifier: Arc<dyn Notifier>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            feed,
            store,
            notifier,
            settings,
        }
    }

    /// Wire the HTTP feed, filesystem bucket and Telegram channel.
    ///
    /// # Errors
    ///
    /// `Config` or `Internal` if a collaborator cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let backend = Arc::new(FsBlobStore::new(config.bucket_path()));
        Ok(Self::new(
            Arc::new(HttpFeedClient::from_config(config)?),
            SnapshotStore::new(backend, config.store_timeout()),
            Arc::new(TelegramNotifier::from_config(config)?),
            PipelineSettings::from_config(config)?,
        ))
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run once against the wall clock.
    ///
    /// # Errors
    ///
    /// As [`Pipeline::run_at`].
    pub async fn run(&self) -> Result<RunReport> {
        self.run_at(Utc::now()).await
    }

    /// Run once as of `now`, which becomes the snapshot creation time.
    ///
    /// # Errors
    ///
    /// A fatal error from Fetching, Normalizing, LocatingReference or
    /// PersistingArtifacts, tagged with that stage and the run id.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunReport> {
        let ctx = RunContext::new(self.settings.trigger.clone());
        let started = Instant::now();
        log_op_start!("run", run_id = %ctx.run_id, trigger = %ctx.trigger);

        let result = self.execute(&ctx, now).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(report) => {
                log_op_end!(
                    "run",
                    duration_ms = duration_ms,
                    run_id = %ctx.run_id,
                    record_count = report.record_count as u64,
                    new_records = report.new_records as u64
                );
            }
            Err(e) => {
                log_op_error!("run", *e, duration_ms = duration_ms, run_id = %ctx.run_id);
            }
        }
        result
    }

    async fn execute(&self, ctx: &RunContext, now: DateTime<Utc>) -> Result<RunReport> {
        enter(ctx, RunStage::Fetching);
        let raw = self
            .feed
            .fetch()
            .await
            .map_err(|e| failed(e, RunStage::Fetching, ctx))?;

        enter(ctx, RunStage::Normalizing);
        let normalized = normalize(&raw).map_err(|e| failed(e, RunStage::Normalizing, ctx))?;
        let soft_errors: Vec<ExError> = normalized
            .soft_errors
            .into_iter()
            .map(|e| {
                let err = ExError::from(e)
                    .with_stage(RunStage::Normalizing.as_str())
                    .with_run_id(ctx.run_id.clone());
                tracing::warn!(run_id = %ctx.run_id, error = %err, "skipped malformed occurrence");
                err
            })
            .collect();
        let current = Snapshot::new(normalized.records, now)
            .map_err(|e| failed(e, RunStage::Normalizing, ctx))?;
        let current_location = self.settings.snapshots.location_for(now);

        enter(ctx, RunStage::LocatingReference);
        let (reference, skipped) = self
            .locate_reference(&current_location)
            .await
            .map_err(|e| failed(e, RunStage::LocatingReference, ctx))?;
        let skipped_artifacts = skipped
            .into_iter()
            .map(|e| {
                e.with_stage(RunStage::LocatingReference.as_str())
                    .with_run_id(ctx.run_id.clone())
            })
            .collect();

        enter(ctx, RunStage::Diffing);
        let diff = compute_diff(reference.as_ref(), &current);
        tracing::debug!(run_id = %ctx.run_id, "{}", render_diff_summary(&diff));

        enter(ctx, RunStage::PersistingArtifacts);
        let snapshot_location = self
            .store
            .put_snapshot(&self.settings.snapshots, &current)
            .await
            .map_err(|e| failed(e, RunStage::PersistingArtifacts, ctx))?;
        let diff_location = self
            .store
            .put_diff(&self.settings.diffs, &diff)
            .await
            .map_err(|e| failed(e, RunStage::PersistingArtifacts, ctx))?;

        enter(ctx, RunStage::Notifying);
        let notified = dispatch_all(
            self.notifier.as_ref(),
            &diff.entries,
            self.settings.notify_concurrency,
            self.settings.notify_timeout,
        )
        .await;
        let notify_failures = notified
            .failures
            .into_iter()
            .map(|e| {
                e.with_stage(RunStage::Notifying.as_str())
                    .with_run_id(ctx.run_id.clone())
            })
            .collect();

        enter(ctx, RunStage::Retaining);
        let mut retention = Vec::with_capacity(2);
        for collection in [&self.settings.snapshots, &self.settings.diffs] {
            let mut report = purge(&self.store, collection, &self.settings.retention, now).await;
            report.failures = report
                .failures
                .into_iter()
                .map(|e| {
                    e.with_stage(RunStage::Retaining.as_str())
                        .with_run_id(ctx.run_id.clone())
                })
                .collect();
            retention.push(report);
        }

        enter(ctx, RunStage::Done);
        Ok(RunReport {
            run_id: ctx.run_id.clone(),
            started_at: now,
            snapshot_location,
            diff_location,
            reference_location: reference
                .as_ref()
                .and_then(|r| r.location.clone())
                .map(Location::new),
            record_count: current.len(),
            new_records: diff.len(),
            duplicate_keys: diff.duplicate_keys,
            soft_errors,
            skipped_artifacts,
            notified: notified.sent,
            notify_failures,
            retention,
            final_stage: RunStage::Done,
        })
    }

    /// Newest readable stored snapshot other than `current`.
    ///
    /// Skipping `current` makes a re-run at the same instant diff against
    /// the same predecessor as the first attempt. Objects that do not decode
    /// as snapshots are skipped and returned alongside the reference. A
    /// reference that vanished between listing and reading is treated as no
    /// reference.
    async fn locate_reference(
        &self,
        current: &Location,
    ) -> Result<(Option<Snapshot>, Vec<ExError>)> {
        let entries = self
            .store
            .list_sorted_by_recency(&self.settings.snapshots)
            .await?;

        let mut skipped = Vec::new();
        for entry in entries.iter().filter(|e| &e.location != current) {
            match self.store.load_snapshot(entry).await {
                Ok(snapshot) => return Ok((Some(snapshot), skipped)),
                Err(e) if e.kind() == ExErrorKind::NotFound => {
                    tracing::warn!(location = %entry.location, "reference snapshot vanished; treating run as bootstrap");
                    return Ok((None, skipped));
                }
                Err(e) if e.kind() == ExErrorKind::InvalidArtifact => {
                    tracing::warn!(location = %entry.location, error = %e, "skipping unreadable snapshot");
                    skipped.push(e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok((None, skipped))
    }
}

fn enter(ctx: &RunContext, stage: RunStage) {
    tracing::debug!(run_id = %ctx.run_id, stage = stage.as_str(), "entering stage");
}

fn failed(err: ExError, stage: RunStage, ctx: &RunContext) -> ExError {
    debug_assert!(stage.can_fail());
    err.with_stage(stage.as_str())
        .with_run_id(ctx.run_id.clone())
}
