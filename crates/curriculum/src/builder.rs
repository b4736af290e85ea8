use std::path::PathBuf;

use pretraining_data::{Pool, PoolEntry};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{CurriculumConfig, ScheduleConfig};
use crate::errors::Result;
use crate::manifest::{manifest_path, write_manifest, RunManifest};
use crate::sampler::sample_step;
use crate::sink::{BatchSink, CurriculumFileSink, OutputPaths};

/// Progress after one completed step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub total_steps: usize,
    pub proportion: f64,
    pub prefix_size: usize,
    pub rows_written: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurriculumSummary {
    pub pool_size: usize,
    pub steps_completed: usize,
    pub rows_written: usize,
    pub final_proportion: f64,
    pub final_prefix_size: usize,
}

/// Runs every step of `schedule` over `pool`, writing each batch to `sink`.
pub fn run_curriculum<R, S>(
    pool: &[PoolEntry],
    schedule: &ScheduleConfig,
    rng: &mut R,
    sink: &mut S,
) -> Result<CurriculumSummary>
where
    R: Rng + ?Sized,
    S: BatchSink + ?Sized,
{
    run_curriculum_with_progress(pool, schedule, rng, sink, |_| {})
}

/// Like [`run_curriculum`], calling `on_step` after each step is written.
///
/// The first step whose prefix cannot supply a full batch aborts the run with
/// `InsufficientPrefix`. Rows from earlier steps are flushed before the error
/// is returned.
pub fn run_curriculum_with_progress<R, S, F>(
    pool: &[PoolEntry],
    schedule: &ScheduleConfig,
    rng: &mut R,
    sink: &mut S,
    mut on_step: F,
) -> Result<CurriculumSummary>
where
    R: Rng + ?Sized,
    S: BatchSink + ?Sized,
    F: FnMut(&StepReport),
{
    let total_steps = schedule.total_steps();
    let batch_size = schedule.batch_size();

    info!(
        pool_size = pool.len(),
        total_steps,
        batch_size,
        initial_proportion = schedule.initial_proportion(),
        root = schedule.root(),
        "starting curriculum run"
    );

    let mut summary = CurriculumSummary {
        pool_size: pool.len(),
        steps_completed: 0,
        rows_written: 0,
        final_proportion: 0.0,
        final_prefix_size: 0,
    };

    for plan in schedule.plan(pool.len()) {
        let written = sample_step(plan, pool, batch_size, rng)
            .and_then(|batch| sink.write_batch(&batch).map(|_| batch.len()));

        let written = match written {
            Ok(written) => written,
            Err(err) => {
                warn!(
                    step = plan.step,
                    steps_completed = summary.steps_completed,
                    rows_written = summary.rows_written,
                    "curriculum run aborted; keeping rows from completed steps"
                );
                if let Err(flush_err) = sink.flush() {
                    warn!(error = %flush_err, "failed to flush rows from completed steps");
                }
                return Err(err);
            }
        };

        summary.steps_completed += 1;
        summary.rows_written += written;
        summary.final_proportion = plan.proportion;
        summary.final_prefix_size = plan.prefix_size;

        debug!(
            step = plan.step,
            proportion = plan.proportion,
            prefix_size = plan.prefix_size,
            "sampled step"
        );

        on_step(&StepReport {
            step: plan.step,
            total_steps,
            proportion: plan.proportion,
            prefix_size: plan.prefix_size,
            rows_written: summary.rows_written,
        });
    }

    sink.flush()?;

    info!(
        steps = summary.steps_completed,
        rows = summary.rows_written,
        final_proportion = summary.final_proportion,
        "curriculum run complete"
    );

    Ok(summary)
}

/// Files produced by [`build_curriculum_files`].
#[derive(Debug, Clone)]
pub struct CurriculumArtifacts {
    pub summary: CurriculumSummary,
    pub paths: OutputPaths,
    pub manifest: Option<PathBuf>,
}

/// Loads the pool named by `config`, runs the curriculum with a generator
/// seeded from `runtime.seed` and writes `<base>.csv` and `<base>.txt`.
pub fn build_curriculum_files(config: &CurriculumConfig) -> Result<CurriculumArtifacts> {
    build_curriculum_files_with_progress(config, |_| {})
}

pub fn build_curriculum_files_with_progress<F>(
    config: &CurriculumConfig,
    mut on_step: F,
) -> Result<CurriculumArtifacts>
where
    F: FnMut(&StepReport),
{
    config.validate()?;
    let schedule = config.schedule()?;
    let pool = Pool::load_with_separator(&config.data.input, config.data.separator)?;
    let base = config.output_base(&schedule);

    let mut rng = StdRng::seed_from_u64(config.runtime.seed);
    let mut sink = CurriculumFileSink::create(&base, config.data.separator)?;
    let log_every = config.runtime.log_every_n_steps.max(1);

    let summary = run_curriculum_with_progress(
        pool.entries(),
        &schedule,
        &mut rng,
        &mut sink,
        |report| {
            if (report.step + 1) % log_every == 0 {
                info!(
                    step = report.step + 1,
                    total_steps = report.total_steps,
                    proportion = report.proportion,
                    prefix_size = report.prefix_size,
                    "curriculum progress"
                );
            }
            on_step(report);
        },
    )?;
    let paths = sink.finish()?;

    let manifest = if config.runtime.write_manifest {
        let path = manifest_path(&base);
        let record = RunManifest::new(
            &config.data.input,
            pool.len(),
            config.runtime.seed,
            schedule,
            summary.rows_written,
            &paths,
        )?;
        write_manifest(&path, &record)?;
        info!(path = %path.display(), "wrote run manifest");
        Some(path)
    } else {
        None
    };

    Ok(CurriculumArtifacts {
        summary,
        paths,
        manifest,
    })
}
