//! Surprisal-ranked curriculum builder.
//!
//! Re-exports the workspace crates under one roof:
//! [`data`] for the delimited corpus files and reviewer corpora,
//! [`curriculum`] for the root schedule and sampling loop, and
//! [`tokenizer`] for the encoder used when tokenizing corpora.

pub use curriculum;
pub use pretraining_data as data;
pub use tokenizer;

pub use ::curriculum::{
    build_curriculum_files, run_curriculum, visible_proportion, CurriculumConfig,
    CurriculumError, ScheduleConfig,
};
pub use ::pretraining_data::{load_pool, Pool, PoolEntry};
