/*!
 * Stage pipeline runner.
 *
 * Stages occupy fixed slots in `StageKind::ORDER`. An empty slot is an
 * absent capability and is skipped. `stop_after` ends the run after that
 * slot, whether or not a stage was installed there.
 */

use log::{debug, info};
use std::sync::Arc;
use std::time::Instant;

use super::stage::{Stage, StageKind};
use crate::corpus::BatchId;
use crate::errors::AppError;

/// How a pipeline run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// Every slot was visited
    Completed {
        ran: Vec<StageKind>,
        skipped: Vec<StageKind>,
    },
    /// Halted on request after `after`; the batch is not finished
    Stopped {
        after: StageKind,
        ran: Vec<StageKind>,
    },
}

/// Ordered set of optional stages
#[derive(Default)]
pub struct StagePipeline {
    slots: [Option<Arc<dyn Stage>>; 4],
}

impl StagePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `stage` in its slot, replacing any previous occupant
    pub fn with_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        let index = stage.kind().index();
        self.slots[index] = Some(stage);
        self
    }

    /// Installed stages in execution order
    pub fn installed(&self) -> Vec<StageKind> {
        StageKind::ORDER
            .into_iter()
            .filter(|kind| self.slots[kind.index()].is_some())
            .collect()
    }

    /// Run every installed stage for `batch_id`; the first failure aborts
    pub async fn run(
        &self,
        batch_id: &BatchId,
        stop_after: Option<StageKind>,
    ) -> Result<StageOutcome, AppError> {
        let mut ran = Vec::new();
        let mut skipped = Vec::new();

        for kind in StageKind::ORDER {
            match &self.slots[kind.index()] {
                Some(stage) => {
                    let started = Instant::now();
                    stage.run(batch_id).await?;
                    debug!(
                        "[{}] {} finished in {:.2}s",
                        batch_id,
                        kind,
                        started.elapsed().as_secs_f64()
                    );
                    ran.push(kind);
                }
                None => {
                    debug!("[{}] no {} stage installed, skipping", batch_id, kind);
                    skipped.push(kind);
                }
            }

            if stop_after == Some(kind) {
                info!("[{}] stop requested after {}", batch_id, kind);
                return Ok(StageOutcome::Stopped { after: kind, ran });
            }
        }

        Ok(StageOutcome::Completed { ran, skipped })
    }
}
