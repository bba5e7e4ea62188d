/*!
 * Source corpus handling: loading, batch identity and partitioning.
 */

pub mod batch_id;
pub mod partitioner;
pub mod source;

pub use batch_id::BatchId;
pub use partitioner::{Batch, PartitionOutcome, Partitioner, plan_batches};
pub use source::SourceCorpus;
