//! Root-schedule curriculum over a ranked sentence pool.
//!
//! A curriculum run produces `T` batches. At step `t` only the first
//! `floor(N * visible_proportion(t))` pool entries are eligible, where the
//! visible proportion grows from `c0` towards 1 along a `p`-th root curve.
//! Each batch is drawn without replacement from that prefix; entries may
//! reappear in later steps.
//!
//! The random source is always supplied by the caller, so a run is fully
//! determined by its seed, pool and [`ScheduleConfig`].

pub mod builder;
pub mod config;
pub mod errors;
pub mod manifest;
pub mod sampler;
pub mod schedule;
pub mod sink;

pub use builder::{
    build_curriculum_files, build_curriculum_files_with_progress, run_curriculum,
    run_curriculum_with_progress, CurriculumArtifacts, CurriculumSummary, StepReport,
};
pub use config::{
    default_output_base, CurriculumConfig, DataConfig, RuntimeConfig, ScheduleConfig,
    ScheduleParameters, ScheduleSection,
};
pub use errors::{CurriculumError, Result};
pub use manifest::{manifest_path, read_manifest, write_manifest, FileRecord, RunManifest};
pub use sampler::{sample_batch, StepBatch};
pub use schedule::{prefix_size, visible_proportion, StepPlan};
pub use sink::{BatchSink, CurriculumFileSink, MemoryRow, MemorySink, OutputPaths};
