use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use futures::stream::{self, StreamExt};
use log::{debug, info, trace, warn};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::error::{AppError, Result};
use crate::fetch::RecordSource;
use crate::records::StreamerRecord;

mod ledger;
pub mod progress;
#[cfg(test)]
pub(crate) mod testing;

use ledger::RetryLedger;
pub use progress::{
    update_channel, AcquisitionProgress, AcquisitionUpdate, RunId, RunTracker, UpdateReceiver,
    UpdateSender,
};

/// Retry rounds run after the first pass.
pub const DEFAULT_RETRY_ROUNDS: u32 = 3;
/// Spacing between consecutive lookups inside one retry round.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retry_rounds: u32,
    pub retry_delay: Duration,
    /// `None` fires every first-pass lookup at once.
    pub first_pass_concurrency: Option<NonZeroUsize>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retry_rounds: DEFAULT_RETRY_ROUNDS,
            retry_delay: DEFAULT_RETRY_DELAY,
            first_pass_concurrency: None,
        }
    }
}

impl RetryPolicy {
    /// First pass plus every retry round.
    pub fn max_attempts(&self) -> u32 {
        self.max_retry_rounds.saturating_add(1)
    }

    fn first_pass_limit(&self, planned: usize) -> usize {
        match self.first_pass_concurrency {
            Some(limit) => limit.get(),
            None => planned.max(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run: RunId,
    /// Arrival order, not input order.
    pub records: Vec<StreamerRecord>,
    /// Identifiers that used up every attempt, in input order.
    pub abandoned: Vec<String>,
    pub total_planned: usize,
    pub retry_rounds: u32,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl RunOutcome {
    pub fn is_complete(&self) -> bool {
        self.abandoned.is_empty()
    }

    pub fn into_records(self) -> Vec<StreamerRecord> {
        self.records
    }
}

/// Fetches a batch of channels: one parallel pass, then bounded sequential
/// retry rounds for whatever failed.
pub struct BoundedRetryAcquirer<S> {
    source: S,
    policy: RetryPolicy,
    last_run: AtomicU64,
}

impl<S: RecordSource> BoundedRetryAcquirer<S> {
    pub fn new(source: S, policy: RetryPolicy) -> Self {
        Self {
            source,
            policy,
            last_run: AtomicU64::new(0),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn allocate_run(&self) -> RunId {
        RunId(self.last_run.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Acquire every identifier, publishing an update after each state change.
    ///
    /// Individual lookup failures never surface here; identifiers that exhaust
    /// their attempts are listed in [`RunOutcome::abandoned`]. An error means
    /// the run itself broke and its partial results must be discarded.
    pub async fn run(&self, identifiers: &[String], updates: &UpdateSender) -> Result<RunOutcome> {
        let run = self.allocate_run();
        self.run_as(run, identifiers, updates).await
    }

    async fn run_as(
        &self,
        run: RunId,
        identifiers: &[String],
        updates: &UpdateSender,
    ) -> Result<RunOutcome> {
        let started_at = Local::now();
        let planned = dedupe_identifiers(identifiers);

        let mut ctx = RunContext::new(run, planned.len(), updates);
        info!("{}: acquiring {} channels", run, planned.len());
        ctx.publish();

        let mut failed = self.first_pass(&planned, &mut ctx).await;
        info!(
            "{}: first pass loaded {}/{} channels, {} failed",
            run,
            ctx.records.len(),
            planned.len(),
            failed.len()
        );

        let mut round = 1;
        while !failed.is_empty() && round <= self.policy.max_retry_rounds {
            failed = self.retry_round(round, failed, &mut ctx).await?;
            round += 1;
        }

        // only reachable when the policy allows no retry rounds
        for identifier in failed {
            warn!("{}: giving up on {} without retrying", run, identifier);
            ctx.abandon(identifier);
        }

        let outcome = ctx.finish(started_at, round - 1);
        info!(
            "{}: loaded {}/{} channels in {} retry rounds",
            run,
            outcome.records.len(),
            outcome.total_planned,
            outcome.retry_rounds
        );
        if !outcome.abandoned.is_empty() {
            info!("{}: failed channels: {}", run, outcome.abandoned.join(", "));
        }
        Ok(outcome)
    }

    /// Issue every lookup up front and handle each resolution as it lands.
    /// Returns the failed identifiers in input order.
    async fn first_pass(&self, planned: &[String], ctx: &mut RunContext<'_>) -> Vec<String> {
        let source = &self.source;
        let limit = self.policy.first_pass_limit(planned.len());

        let mut lookups = stream::iter(planned.iter().cloned())
            .map(move |identifier| async move {
                let result = source.fetch_record(&identifier).await;
                (identifier, result)
            })
            .buffer_unordered(limit);

        let mut failed = HashSet::new();
        while let Some((identifier, result)) = lookups.next().await {
            match result {
                Ok(record) => {
                    debug!("{}: loaded {}", ctx.run, identifier);
                    ctx.accept_first(record);
                }
                Err(err) => {
                    debug!("{}: {}", ctx.run, err);
                    ctx.reject_first(&identifier);
                    failed.insert(identifier);
                }
            }
        }

        planned
            .iter()
            .filter(|identifier| failed.contains(*identifier))
            .cloned()
            .collect()
    }

    /// One sequential sweep over the failed set. Returns the identifiers to
    /// carry into the next round.
    async fn retry_round(
        &self,
        round: u32,
        failed: Vec<String>,
        ctx: &mut RunContext<'_>,
    ) -> Result<Vec<String>> {
        info!(
            "{}: retry round {}/{}: retrying {} channels",
            ctx.run,
            round,
            self.policy.max_retry_rounds,
            failed.len()
        );
        ctx.begin_round(round, failed.len());

        let last = failed.len().saturating_sub(1);
        let mut carried = Vec::new();

        for (index, identifier) in failed.into_iter().enumerate() {
            match self.source.fetch_record(&identifier).await {
                Ok(record) => {
                    let attempts = ctx.ledger.attempts(&identifier).unwrap_or(1) + 1;
                    debug!(
                        "{}: loaded {} after {} attempts",
                        ctx.run, identifier, attempts
                    );
                    ctx.accept_retry(record);
                }
                Err(err) => {
                    let attempts = ctx.ledger.record_failure(&identifier)?;
                    debug!(
                        "{}: attempt {}/{} failed: {}",
                        ctx.run,
                        attempts,
                        self.policy.max_attempts(),
                        err
                    );
                    if attempts < self.policy.max_attempts() {
                        carried.push(identifier);
                    } else {
                        warn!(
                            "{}: giving up on {} after {} attempts",
                            ctx.run, identifier, attempts
                        );
                        ctx.abandon(identifier);
                    }
                }
            }

            if index < last && !self.policy.retry_delay.is_zero() {
                sleep(self.policy.retry_delay).await;
            }
        }

        Ok(carried)
    }
}

impl<S: RecordSource + 'static> BoundedRetryAcquirer<S> {
    /// Run on the tokio runtime. The run id is known before the first update
    /// so callers can register it with a [`RunTracker`].
    pub fn spawn_run(
        self: Arc<Self>,
        identifiers: Vec<String>,
        updates: UpdateSender,
    ) -> AcquisitionHandle {
        let run = self.allocate_run();
        let task = tokio::spawn(async move { self.run_as(run, &identifiers, &updates).await });
        AcquisitionHandle { run, task }
    }
}

pub struct AcquisitionHandle {
    run: RunId,
    task: JoinHandle<Result<RunOutcome>>,
}

impl AcquisitionHandle {
    pub fn run(&self) -> RunId {
        self.run
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn abort(&self) {
        self.task.abort();
    }

    pub async fn join(self) -> Result<RunOutcome> {
        let run = self.run;
        match self.task.await {
            Ok(result) => result,
            Err(err) if err.is_cancelled() => Err(AppError::Cancelled),
            Err(err) => Err(AppError::orchestration(format!(
                "{} task failed: {}",
                run, err
            ))),
        }
    }
}

/// Per-run state. Owned by the run's task and never shared.
struct RunContext<'a> {
    run: RunId,
    updates: &'a UpdateSender,
    progress: AcquisitionProgress,
    records: Vec<StreamerRecord>,
    ledger: RetryLedger,
    abandoned: Vec<String>,
}

impl<'a> RunContext<'a> {
    fn new(run: RunId, total_planned: usize, updates: &'a UpdateSender) -> Self {
        Self {
            run,
            updates,
            progress: AcquisitionProgress::planned(total_planned),
            records: Vec::with_capacity(total_planned),
            ledger: RetryLedger::default(),
            abandoned: Vec::new(),
        }
    }

    fn publish(&self) {
        debug_assert!(self.progress.is_idle() || self.progress.succeeded == self.records.len());
        let update = AcquisitionUpdate {
            run: self.run,
            progress: self.progress,
            records: Arc::new(self.records.clone()),
        };
        if self.updates.send(update).is_err() {
            trace!("{}: update dropped, no subscriber", self.run);
        }
    }

    fn accept_first(&mut self, record: StreamerRecord) {
        self.records.push(record);
        self.progress = self.progress.first_pass_success();
        self.publish();
    }

    fn reject_first(&mut self, identifier: &str) {
        self.ledger.first_failure(identifier);
        self.progress = self.progress.first_pass_failure();
        self.publish();
    }

    fn begin_round(&mut self, round: u32, retrying: usize) {
        self.progress = self.progress.begin_round(round, retrying);
        self.publish();
    }

    fn accept_retry(&mut self, record: StreamerRecord) {
        self.records.push(record);
        self.progress = self.progress.retry_success();
        self.publish();
    }

    fn abandon(&mut self, identifier: String) {
        self.abandoned.push(identifier);
        self.progress = self.progress.retry_abandoned();
        self.publish();
    }

    fn finish(mut self, started_at: DateTime<Local>, retry_rounds: u32) -> RunOutcome {
        let total_planned = self.progress.total_planned;
        self.progress = AcquisitionProgress::default();
        self.publish();

        RunOutcome {
            run: self.run,
            records: self.records,
            abandoned: self.abandoned,
            total_planned,
            retry_rounds,
            started_at,
            finished_at: Local::now(),
        }
    }
}

/// Keep the first occurrence of each identifier so every one maps to a single
/// ledger slot. Kick slugs are case-insensitive, so `Keoxer` and `keoxer` are
/// the same channel.
fn dedupe_identifiers(identifiers: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let planned: Vec<String> = identifiers
        .iter()
        .filter(|identifier| seen.insert(identifier.to_lowercase()))
        .cloned()
        .collect();

    if planned.len() < identifiers.len() {
        warn!(
            "Ignoring {} duplicate channel identifiers",
            identifiers.len() - planned.len()
        );
    }
    planned
}
