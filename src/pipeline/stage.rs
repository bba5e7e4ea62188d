/*!
 * Stage identity and the stage capability trait.
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::corpus::BatchId;
use crate::errors::AppError;

/// The fixed stage slots, in execution order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    /// Trim and validate the source batch
    Normalize,
    /// Translate and assemble the derived batch
    Translate,
    /// Clean up translated text
    Postprocess,
    /// Write per-batch statistics
    Analyze,
}

impl StageKind {
    /// Every stage in execution order
    pub const ORDER: [StageKind; 4] = [
        StageKind::Normalize,
        StageKind::Translate,
        StageKind::Postprocess,
        StageKind::Analyze,
    ];

    /// Slot position
    pub fn index(self) -> usize {
        match self {
            StageKind::Normalize => 0,
            StageKind::Translate => 1,
            StageKind::Postprocess => 2,
            StageKind::Analyze => 3,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Normalize => write!(f, "normalize"),
            StageKind::Translate => write!(f, "translate"),
            StageKind::Postprocess => write!(f, "postprocess"),
            StageKind::Analyze => write!(f, "analyze"),
        }
    }
}

/// One per-batch processing phase.
///
/// A stage reads its input artifact and rewrites its output artifact in
/// full, so running it again on the same batch is safe.
#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    async fn run(&self, batch_id: &BatchId) -> Result<(), AppError>;
}
