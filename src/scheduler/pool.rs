/*!
 * Batch scheduler and worker pool.
 *
 * The pending list is read once per run, so a unit is scheduled at most once
 * per run. Each unit goes pending/in_progress -> in_progress -> done | error;
 * a unit halted by `stop_after` stays in_progress and is picked up again by
 * the next run. Unit failures never abort the run.
 */

use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use uuid::Uuid;

use super::execution::ExecutionContext;
use super::monitor::ResourceMonitor;
use crate::corpus::BatchId;
use crate::database::{BatchLedger, BatchStatus};
use crate::errors::AppError;
use crate::pipeline::{StageKind, StageOutcome, StagePipeline};

/// Run-level scheduling knobs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulerOptions {
    /// Use the worker pool instead of one unit at a time
    pub parallel: bool,
    /// Explicit pool size; derived from the execution context when unset
    pub max_workers: Option<usize>,
    pub stop_after: Option<StageKind>,
    /// Schedule only the first N pending units
    pub max_batches: Option<usize>,
}

/// How one unit ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    Done,
    Failed,
    /// Halted by `stop_after`, left in_progress
    Stopped,
    /// Could not be claimed in the ledger, nothing ran
    Skipped,
}

#[derive(Debug, Clone, Copy)]
struct UnitReport {
    outcome: UnitOutcome,
    ledger_errors: usize,
}

impl UnitReport {
    fn new(outcome: UnitOutcome) -> Self {
        Self {
            outcome,
            ledger_errors: 0,
        }
    }
}

/// Totals for one scheduler run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub workers: usize,
    pub scheduled: usize,
    pub done: usize,
    pub failed: usize,
    pub stopped: usize,
    pub skipped: usize,
    pub ledger_errors: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    fn empty(run_id: Uuid) -> Self {
        Self {
            run_id,
            workers: 0,
            scheduled: 0,
            done: 0,
            failed: 0,
            stopped: 0,
            skipped: 0,
            ledger_errors: 0,
            elapsed: Duration::ZERO,
        }
    }

    fn record(&mut self, report: UnitReport) {
        match report.outcome {
            UnitOutcome::Done => self.done += 1,
            UnitOutcome::Failed => self.failed += 1,
            UnitOutcome::Stopped => self.stopped += 1,
            UnitOutcome::Skipped => self.skipped += 1,
        }
        self.ledger_errors += report.ledger_errors;
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Run {}: {} scheduled on {} worker(s), {} done, {} failed, {} stopped, {} skipped, {} ledger errors in {:.2}s",
            self.run_id,
            self.scheduled,
            self.workers,
            self.done,
            self.failed,
            self.stopped,
            self.skipped,
            self.ledger_errors,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Drives pending units through the stage pipeline
#[derive(Clone)]
pub struct BatchScheduler {
    ledger: BatchLedger,
    pipeline: Arc<StagePipeline>,
    monitor: Arc<ResourceMonitor>,
    context: ExecutionContext,
    options: SchedulerOptions,
}

impl BatchScheduler {
    pub fn new(
        ledger: BatchLedger,
        pipeline: Arc<StagePipeline>,
        monitor: Arc<ResourceMonitor>,
        context: ExecutionContext,
        options: SchedulerOptions,
    ) -> Self {
        Self {
            ledger,
            pipeline,
            monitor,
            context,
            options,
        }
    }

    /// Process every pending unit once
    pub async fn run(&self) -> Result<RunSummary, AppError> {
        let started = Instant::now();
        let run_id = Uuid::new_v4();

        let mut pending = self.ledger.list_pending().await?;
        if let Some(cap) = self.options.max_batches {
            pending.truncate(cap);
        }

        let mut summary = RunSummary::empty(run_id);
        if pending.is_empty() {
            info!("No batches to process: every batch is done or in error");
            return Ok(summary);
        }

        let workers = if self.options.parallel {
            self.options
                .max_workers
                .unwrap_or_else(|| self.context.default_workers(pending.len()))
                .max(1)
        } else {
            1
        };
        summary.workers = workers;
        summary.scheduled = pending.len();

        info!(
            "Run {}: {} batch(es) to process, {} mode, {} worker(s)",
            run_id,
            pending.len(),
            if self.options.parallel { "parallel" } else { "sequential" },
            workers
        );

        let progress_bar = ProgressBar::new(pending.len() as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("=>-"));

        let reports = if self.options.parallel {
            self.run_parallel(pending, workers, &progress_bar).await
        } else {
            let mut reports = Vec::with_capacity(pending.len());
            for batch_id in pending {
                progress_bar.set_message(batch_id.clone());
                reports.push(self.process_unit(&batch_id).await);
                progress_bar.inc(1);
            }
            reports
        };

        for report in reports {
            summary.record(report);
        }
        summary.elapsed = started.elapsed();
        progress_bar.finish_with_message("done");

        if summary.failed > 0 || summary.ledger_errors > 0 {
            warn!("{}", summary);
        } else {
            info!("{}", summary);
        }
        Ok(summary)
    }

    async fn run_parallel(
        &self,
        pending: Vec<String>,
        workers: usize,
        progress_bar: &ProgressBar,
    ) -> Vec<UnitReport> {
        let semaphore = Arc::new(Semaphore::new(workers));

        let handles: Vec<_> = pending
            .into_iter()
            .map(|batch_id| {
                let scheduler = self.clone();
                let semaphore = Arc::clone(&semaphore);
                let progress_bar = progress_bar.clone();

                tokio::spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        error!("[{}] worker pool closed before the batch could start", batch_id);
                        return UnitReport::new(UnitOutcome::Skipped);
                    };
                    let report = scheduler.process_unit(&batch_id).await;
                    progress_bar.inc(1);
                    report
                })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .map(|joined| {
                joined.unwrap_or_else(|e| {
                    error!("Worker task aborted: {}", e);
                    UnitReport::new(UnitOutcome::Failed)
                })
            })
            .collect()
    }

    /// Claim, run and settle one unit
    async fn process_unit(&self, batch_id: &str) -> UnitReport {
        if let Err(e) = self
            .ledger
            .transition(batch_id, BatchStatus::InProgress, None)
            .await
        {
            error!("[{}] could not claim batch: {}", batch_id, e);
            return UnitReport {
                outcome: UnitOutcome::Skipped,
                ledger_errors: 1,
            };
        }

        let started = Instant::now();
        let result = match BatchId::parse(batch_id) {
            Ok(id) => self.pipeline.run(&id, self.options.stop_after).await,
            Err(e) => Err(e),
        };
        self.monitor.check_elapsed(batch_id, started.elapsed());

        let (outcome, settle) = match result {
            Ok(StageOutcome::Completed { .. }) => {
                info!("[{}] done in {:.2}s", batch_id, started.elapsed().as_secs_f64());
                (UnitOutcome::Done, Some((BatchStatus::Done, None)))
            }
            Ok(StageOutcome::Stopped { after, .. }) => {
                info!("[{}] stopped after {}, left in progress", batch_id, after);
                (UnitOutcome::Stopped, None)
            }
            Err(e) => {
                error!("[{}] failed: {}", batch_id, e);
                (UnitOutcome::Failed, Some((BatchStatus::Error, Some(e.to_string()))))
            }
        };

        let mut report = UnitReport::new(outcome);
        if let Some((status, comment)) = settle {
            if let Err(e) = self.ledger.transition(batch_id, status, comment).await {
                error!("[{}] could not record status {}: {}", batch_id, status, e);
                report.ledger_errors += 1;
            }
        }
        report
    }
}
