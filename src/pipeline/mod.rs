/*!
 * Per-batch stage pipeline.
 *
 * Stages run in a fixed order: normalize, translate, postprocess, analyze.
 * Only the stages that are installed run; see `runner`.
 */

pub mod analyze;
pub mod normalize;
pub mod postprocess;
pub mod runner;
pub mod stage;
pub mod translate;

pub use analyze::{clear_reports, AnalyzeStage, BatchAnalysis};
pub use normalize::NormalizeStage;
pub use postprocess::PostprocessStage;
pub use runner::{StageOutcome, StagePipeline};
pub use stage::{Stage, StageKind};
pub use translate::TranslateStage;
