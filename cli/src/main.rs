//! `curriculum` command line front-end.
//!
//! * `curriculum build`: sample a root-schedule curriculum from a ranked pool
//!   and write `<base>.csv` / `<base>.txt`.
//! * `curriculum schedule`: print the visible prefix per step without writing
//!   anything.
//! * `curriculum reviewers`: split a train/dev/test corpus directory into
//!   tokenized reviewer corpora.

use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    str::FromStr,
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use curriculum::{
    build_curriculum_files_with_progress, CurriculumConfig, ScheduleConfig, StepPlan,
};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use pretraining_data::{build_reviewer_corpora, Pool, ReviewerConfig};
use rand::{rngs::StdRng, SeedableRng};
use tokenizer::{Encoder, TokenizerEncoder, WhitespaceEncoder};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_REVIEWER_SEED: u64 = 5;

#[derive(Parser)]
#[command(name = "curriculum")]
#[command(version)]
#[command(about = "Build surprisal-ranked training curricula and reviewer corpora")]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Hide progress bars
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample the curriculum and write the structured and plain-text outputs
    Build(BuildArgs),
    /// Print the visible proportion and prefix size of each step
    Schedule(ScheduleArgs),
    /// Build reviewer corpora from a directory of *_train/_dev/_test csv files
    Reviewers(ReviewerArgs),
}

/// Flags shared by `build` and `schedule`; each one overrides the config file.
#[derive(Args, Debug, Clone)]
struct CurriculumArgs {
    /// TOML or JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ranked pool (0x1F-delimited, with `sentid` and `sentence` columns)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output base path; `.csv` and `.txt` are appended
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of training steps (T); prompted for when missing
    #[arg(short = 'T', long = "total-steps")]
    total_steps: Option<usize>,

    /// Root exponent (p); prompted for when missing
    #[arg(short = 'p', long)]
    root: Option<f64>,

    /// Proportion of the pool visible at step 0 (c0)
    #[arg(long)]
    initial_proportion: Option<f64>,

    /// Sentences sampled per step
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Seed of the sampling generator
    #[arg(short, long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct BuildArgs {
    #[command(flatten)]
    curriculum: CurriculumArgs,

    /// Write `<base>.manifest.json` with digests of both outputs
    #[arg(long)]
    manifest: bool,

    /// Print the schedule preview instead of writing files
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct ScheduleArgs {
    #[command(flatten)]
    curriculum: CurriculumArgs,

    /// Pool size to plan for instead of counting the input file
    #[arg(long)]
    pool_size: Option<usize>,

    /// Print every n-th step (the last step is always printed)
    #[arg(long, default_value_t = 1)]
    every: usize,
}

#[derive(Args, Debug)]
struct ReviewerArgs {
    /// Directory holding the *_train.csv, *_dev.csv and *_test.csv files
    #[arg(short, long)]
    input_dir: PathBuf,

    /// Destination directory for the reviewer corpora
    #[arg(short, long)]
    output_dir: PathBuf,

    /// Number of reviewer partitions of the training split
    #[arg(short = 'n', long, default_value_t = 5)]
    reviewers: usize,

    /// Trained tokenizer.json; whitespace tokenization when omitted
    #[arg(short, long)]
    tokenizer: Option<PathBuf>,

    /// Seed of the shuffling generator
    #[arg(short, long, default_value_t = DEFAULT_REVIEWER_SEED)]
    seed: u64,
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let result = match cli.command {
        Commands::Build(args) => run_build(args, cli.quiet),
        Commands::Schedule(args) => run_schedule(args),
        Commands::Reviewers(args) => run_reviewers(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run_build(args: BuildArgs, quiet: bool) -> Result<()> {
    let mut config = resolve_config(&args.curriculum)?;
    if args.manifest {
        config.runtime.write_manifest = true;
    }
    let schedule = config.schedule()?;

    if args.dry_run {
        let pool = load_pool(&config)?;
        print_schedule(&schedule, pool.len(), 1);
        return Ok(());
    }

    let progress = step_progress(schedule.total_steps() as u64, quiet)?;
    let result = build_curriculum_files_with_progress(&config, |report| {
        progress.set_position(report.step as u64 + 1);
        progress.set_message(format!(
            "{:.1}% visible, {} entries",
            report.proportion * 100.0,
            report.prefix_size
        ));
    });

    let artifacts = match result {
        Ok(artifacts) => {
            progress.finish_with_message("done");
            artifacts
        }
        Err(err) => {
            progress.abandon();
            return Err(err).context("curriculum build failed");
        }
    };

    println!(
        "Wrote {} rows over {} steps to {} and {}",
        artifacts.summary.rows_written,
        artifacts.summary.steps_completed,
        artifacts.paths.structured.display(),
        artifacts.paths.text.display()
    );
    if let Some(manifest) = &artifacts.manifest {
        println!("Manifest: {}", manifest.display());
    }
    Ok(())
}

fn run_schedule(args: ScheduleArgs) -> Result<()> {
    if args.every == 0 {
        bail!("--every must be greater than zero");
    }

    let config = resolve_config_with(&args.curriculum, args.pool_size.is_some())?;
    let schedule = config.schedule()?;
    let pool_len = match args.pool_size {
        Some(len) => len,
        None => load_pool(&config)?.len(),
    };

    print_schedule(&schedule, pool_len, args.every);
    Ok(())
}

fn run_reviewers(args: ReviewerArgs) -> Result<()> {
    let mut config = ReviewerConfig::new(&args.input_dir, &args.output_dir);
    config.num_reviewers = args.reviewers;

    let encoder: Box<dyn Encoder> = match &args.tokenizer {
        Some(path) => Box::new(
            TokenizerEncoder::from_file(path)
                .with_context(|| format!("failed to load tokenizer from {}", path.display()))?,
        ),
        None => {
            warn!("no tokenizer supplied; falling back to whitespace tokenization");
            Box::new(WhitespaceEncoder)
        }
    };

    let mut rng = StdRng::seed_from_u64(args.seed);
    let summary = build_reviewer_corpora(&config, encoder.as_ref(), &mut rng)
        .with_context(|| format!("failed to build reviewer corpora from {}", args.input_dir.display()))?;

    println!(
        "Vocabulary: {} ({} tokens)",
        summary.vocabulary.display(),
        summary.vocabulary_size
    );
    for reviewer in &summary.reviewers {
        println!(
            "{}: {} sentences -> {}",
            reviewer.model,
            reviewer.sentences,
            reviewer.tokenized.display()
        );
    }
    for split in &summary.evaluation {
        println!(
            "{}: {} sentences -> {}",
            split.split,
            split.sentences,
            split.tokenized.display()
        );
    }
    Ok(())
}

fn resolve_config(args: &CurriculumArgs) -> Result<CurriculumConfig> {
    resolve_config_with(args, false)
}

/// Loads the config file (if any), applies flag overrides and prompts for
/// `T` and `p` when neither source provides them.
fn resolve_config_with(args: &CurriculumArgs, input_optional: bool) -> Result<CurriculumConfig> {
    let mut config = match (&args.config, &args.input) {
        (Some(path), _) => CurriculumConfig::read_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        (None, Some(input)) => CurriculumConfig::new(input),
        (None, None) if input_optional => CurriculumConfig::new(PathBuf::from(".")),
        (None, None) => bail!("either --config or --input is required"),
    };

    apply_overrides(&mut config, args);

    if config.schedule.total_steps.is_none() {
        config.schedule.total_steps = Some(prompt("T (num of training steps): ")?);
    }
    if config.schedule.root.is_none() {
        config.schedule.root = Some(prompt("p (base of the root): ")?);
    }

    config.validate()?;
    Ok(config)
}

fn apply_overrides(config: &mut CurriculumConfig, args: &CurriculumArgs) {
    if let Some(input) = &args.input {
        config.data.input = input.clone();
    }
    if let Some(output) = &args.output {
        config.data.output = Some(output.clone());
    }
    if let Some(total_steps) = args.total_steps {
        config.schedule.total_steps = Some(total_steps);
    }
    if let Some(root) = args.root {
        config.schedule.root = Some(root);
    }
    if let Some(initial_proportion) = args.initial_proportion {
        config.schedule.initial_proportion = initial_proportion;
    }
    if let Some(batch_size) = args.batch_size {
        config.schedule.batch_size = batch_size;
    }
    if let Some(seed) = args.seed {
        config.runtime.seed = seed;
    }
}

fn prompt<T>(label: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    print!("{label}");
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Err(anyhow!("no value given for `{}`", label.trim_end_matches([':', ' '])));
    }
    line.trim()
        .parse()
        .with_context(|| format!("could not parse {:?}", line.trim()))
}

fn load_pool(config: &CurriculumConfig) -> Result<Pool> {
    let pool = Pool::load_with_separator(&config.data.input, config.data.separator)
        .with_context(|| format!("failed to load pool {}", config.data.input.display()))?;
    info!(entries = pool.len(), "pool loaded");
    Ok(pool)
}

fn print_schedule(schedule: &ScheduleConfig, pool_len: usize, every: usize) {
    let last = schedule.total_steps().saturating_sub(1);
    let shortfall = schedule.first_insufficient_step(pool_len);

    println!(
        "T={} c0={} p={} batch_size={} pool={}",
        schedule.total_steps(),
        schedule.initial_proportion(),
        schedule.root(),
        schedule.batch_size(),
        pool_len
    );
    println!("{:>8}  {:>10}  {:>12}", "step", "proportion", "prefix_size");
    for plan in schedule.plan(pool_len) {
        let flagged = shortfall.is_some_and(|first| first.step == plan.step);
        if plan.step % every == 0 || plan.step == last || flagged {
            print_plan_row(&plan, flagged);
        }
    }

    match shortfall {
        Some(first) => println!(
            "step {} exposes {} entries, fewer than the batch size of {}; a build would abort there",
            first.step,
            first.prefix_size,
            schedule.batch_size()
        ),
        None => println!(
            "every step can supply a batch of {} ({} rows in total)",
            schedule.batch_size(),
            schedule.total_rows()
        ),
    }
}

fn print_plan_row(plan: &StepPlan, flagged: bool) {
    let marker = if flagged { "  <- insufficient" } else { "" };
    println!(
        "{:>8}  {:>10.6}  {:>12}{}",
        plan.step, plan.proportion, plan.prefix_size, marker
    );
}

fn step_progress(total: u64, quiet: bool) -> Result<ProgressBar> {
    let progress = ProgressBar::new(total.max(1));
    if quiet {
        progress.set_draw_target(ProgressDrawTarget::hidden());
        return Ok(progress);
    }
    progress.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} steps {msg}",
        )?
        .progress_chars("=>-"),
    );
    Ok(progress)
}
