//! Pretraining data handling crate
//!
//! Everything here reads or writes the control-character delimited corpus
//! files used across the pipeline: the ranked sentence [`Pool`] consumed by
//! the curriculum builder, the domain-partitioned [`DomainCorpus`], and the
//! reviewer sub-corpora derived from it.

pub mod corpora;
pub mod delimited;
pub mod errors;
pub mod pool;
pub mod reviewers;

// Re-export main types
pub use corpora::{DomainCorpus, DomainShard};
pub use delimited::{DelimitedReader, DelimitedWriter, Header, Record, UNIT_SEPARATOR};
pub use errors::{Error, Result};
pub use pool::{load_pool, Pool, PoolEntry, ID_FIELD, SENTENCE_FIELD};
pub use reviewers::{
    build_reviewer_corpora, discover_splits, flatten_shuffled, partition_round_robin,
    ReviewerConfig, ReviewerSummary, Split, SplitFile,
};
