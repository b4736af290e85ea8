use std::{
    fs,
    path::{Path, PathBuf},
};

use pretraining_data::UNIT_SEPARATOR;
use serde::{Deserialize, Serialize};

use crate::errors::{CurriculumError, Result};

pub const DEFAULT_INITIAL_PROPORTION: f64 = 0.01;
pub const DEFAULT_ROOT: f64 = 2.0;
pub const DEFAULT_BATCH_SIZE: usize = 32;
pub const DEFAULT_SEED: u64 = 17;

/// Plain, unvalidated schedule parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleParameters {
    pub total_steps: usize,
    pub initial_proportion: f64,
    pub root: f64,
    pub batch_size: usize,
}

/// Validated curriculum schedule: `T` steps, initial proportion `c0`, root
/// exponent `p` and batch size.
///
/// Only obtainable through [`ScheduleConfig::new`] (or deserialization, which
/// runs the same checks), so every instance satisfies `T >= 1`, `p > 0`,
/// `0 < c0 <= 1` and `batch_size >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScheduleParameters", into = "ScheduleParameters")]
pub struct ScheduleConfig {
    total_steps: usize,
    initial_proportion: f64,
    root: f64,
    batch_size: usize,
}

impl ScheduleConfig {
    pub fn new(
        total_steps: usize,
        initial_proportion: f64,
        root: f64,
        batch_size: usize,
    ) -> Result<Self> {
        let errors = schedule_errors(total_steps, initial_proportion, root, batch_size);
        if !errors.is_empty() {
            return Err(CurriculumError::invalid(errors));
        }
        Ok(Self {
            total_steps,
            initial_proportion,
            root,
            batch_size,
        })
    }

    /// Reference settings with `c0 = 0.01` and 32 sentences per step.
    pub fn reference(total_steps: usize, root: f64) -> Result<Self> {
        Self::new(
            total_steps,
            DEFAULT_INITIAL_PROPORTION,
            root,
            DEFAULT_BATCH_SIZE,
        )
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn initial_proportion(&self) -> f64 {
        self.initial_proportion
    }

    pub fn root(&self) -> f64 {
        self.root
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Rows a complete run emits: `T * batch_size`.
    pub fn total_rows(&self) -> usize {
        self.total_steps.saturating_mul(self.batch_size)
    }
}

impl TryFrom<ScheduleParameters> for ScheduleConfig {
    type Error = CurriculumError;

    fn try_from(value: ScheduleParameters) -> Result<Self> {
        Self::new(
            value.total_steps,
            value.initial_proportion,
            value.root,
            value.batch_size,
        )
    }
}

impl From<ScheduleConfig> for ScheduleParameters {
    fn from(value: ScheduleConfig) -> Self {
        Self {
            total_steps: value.total_steps,
            initial_proportion: value.initial_proportion,
            root: value.root,
            batch_size: value.batch_size,
        }
    }
}

fn schedule_errors(
    total_steps: usize,
    initial_proportion: f64,
    root: f64,
    batch_size: usize,
) -> Vec<String> {
    let mut errors = Vec::new();

    if total_steps < 1 {
        errors.push("total_steps (T) must be at least 1".to_string());
    }

    if !root.is_finite() || root <= 0.0 {
        errors.push(format!("root (p) must be a positive number (got {})", root));
    }

    if !initial_proportion.is_finite() || !(0.0..=1.0).contains(&initial_proportion) {
        errors.push(format!(
            "initial_proportion (c0) must be in [0, 1] (got {})",
            initial_proportion
        ));
    } else if initial_proportion == 0.0 {
        // c0 = 0 gives an empty prefix at t = 0, which no batch can be drawn from.
        errors.push("initial_proportion (c0) of 0 leaves step 0 with an empty prefix".to_string());
    }

    if batch_size < 1 {
        errors.push("batch_size must be at least 1".to_string());
    }

    errors
}

/// File-level configuration for a curriculum build.
///
/// ```toml
/// [data]
/// input = "data/train_by_sum_surp.csv"
///
/// [schedule]
/// total_steps = 20000
/// root = 2.0
///
/// [runtime]
/// seed = 17
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurriculumConfig {
    pub data: DataConfig,
    #[serde(default)]
    pub schedule: ScheduleSection,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl CurriculumConfig {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            data: DataConfig {
                input: input.into(),
                output: None,
                separator: default_separator(),
            },
            schedule: ScheduleSection::default(),
            runtime: RuntimeConfig::default(),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let config = Self::read_path(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a config file and resolves its relative paths without
    /// validating, so callers can override values before [`Self::validate`].
    pub fn read_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let mut config: CurriculumConfig = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&contents)?,
            Some("toml") | Some("tml") | None => toml::from_str(&contents)?,
            Some(other) => {
                return Err(CurriculumError::ConfigFormat(format!(
                    "unsupported configuration extension '{}'",
                    other
                )));
            }
        };

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        config.apply_base_path(base_dir);

        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_path(path)
    }

    /// Checks every value that is present. Missing `total_steps` or `root`
    /// are reported by [`CurriculumConfig::schedule`] instead, so callers can
    /// fill them in after loading.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.data.input.as_os_str().is_empty() {
            errors.push("data.input must not be empty".to_string());
        }

        if matches!(self.data.separator, '\n' | '\r') {
            errors.push("data.separator must not be a line break".to_string());
        }

        if let Some(output) = &self.data.output {
            if output.as_os_str().is_empty() {
                errors.push("data.output must not be empty when set".to_string());
            }
        }

        if self.runtime.log_every_n_steps == 0 {
            errors.push("runtime.log_every_n_steps must be greater than 0".to_string());
        }

        errors.extend(schedule_errors(
            self.schedule.total_steps.unwrap_or(1),
            self.schedule.initial_proportion,
            self.schedule.root.unwrap_or(DEFAULT_ROOT),
            self.schedule.batch_size,
        ));

        if !errors.is_empty() {
            return Err(CurriculumError::invalid(errors));
        }

        Ok(())
    }

    /// Resolves the `[schedule]` section into a validated [`ScheduleConfig`].
    pub fn schedule(&self) -> Result<ScheduleConfig> {
        let mut missing = Vec::new();
        if self.schedule.total_steps.is_none() {
            missing.push("schedule.total_steps is required".to_string());
        }
        if self.schedule.root.is_none() {
            missing.push("schedule.root is required".to_string());
        }
        if !missing.is_empty() {
            return Err(CurriculumError::invalid(missing));
        }

        ScheduleConfig::new(
            self.schedule.total_steps.unwrap_or_default(),
            self.schedule.initial_proportion,
            self.schedule.root.unwrap_or(DEFAULT_ROOT),
            self.schedule.batch_size,
        )
    }

    /// Output base path; `.csv` and `.txt` are appended to it.
    pub fn output_base(&self, schedule: &ScheduleConfig) -> PathBuf {
        match &self.data.output {
            Some(output) => output.clone(),
            None => {
                let dir = self
                    .data
                    .input
                    .parent()
                    .unwrap_or_else(|| Path::new("."));
                default_output_base(dir, schedule)
            }
        }
    }

    fn apply_base_path(&mut self, base: &Path) {
        absolutize_in_place(&mut self.data.input, base);
        if let Some(output) = self.data.output.as_mut() {
            absolutize_in_place(output, base);
        }
    }
}

/// `<dir>/curriculum_root{p}_T{T}`, with `p` printed as a float (`2.0`).
pub fn default_output_base(dir: &Path, schedule: &ScheduleConfig) -> PathBuf {
    dir.join(format!(
        "curriculum_root{:?}_T{}",
        schedule.root(),
        schedule.total_steps()
    ))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub input: PathBuf,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default = "default_separator")]
    pub separator: char,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSection {
    #[serde(default)]
    pub total_steps: Option<usize>,
    #[serde(default = "default_initial_proportion")]
    pub initial_proportion: f64,
    #[serde(default)]
    pub root: Option<f64>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            total_steps: None,
            initial_proportion: default_initial_proportion(),
            root: None,
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_log_every_n_steps")]
    pub log_every_n_steps: usize,
    #[serde(default)]
    pub write_manifest: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            log_every_n_steps: default_log_every_n_steps(),
            write_manifest: false,
        }
    }
}

fn absolutize_in_place(path: &mut PathBuf, base: &Path) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}

fn default_separator() -> char {
    UNIT_SEPARATOR
}

fn default_initial_proportion() -> f64 {
    DEFAULT_INITIAL_PROPORTION
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_log_every_n_steps() -> usize {
    100
}
