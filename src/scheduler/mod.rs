/*!
 * Batch scheduling: execution detection, advisory monitoring and the worker pool.
 */

pub mod execution;
pub mod monitor;
pub mod pool;

pub use execution::{Device, ExecutionContext};
pub use monitor::{ResourceMonitor, ResourceSnapshot};
pub use pool::{BatchScheduler, RunSummary, SchedulerOptions, UnitOutcome};
