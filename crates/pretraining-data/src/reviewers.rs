//! Reviewer sub-corpora.
//!
//! Reviewer models are trained on disjoint slices of the training split. Each
//! slice receives a round-robin share of every domain so the domain mix is
//! preserved. Dev and test splits are shuffled and tokenized whole.

use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;
use tokenizer::{write_vocabulary, Encoder};
use tracing::{info, warn};

use crate::corpora::{DomainCorpus, DomainShard};
use crate::delimited::{DelimitedWriter, UNIT_SEPARATOR};
use crate::errors::{Error, Result};
use crate::pool::PoolEntry;

pub const VOCAB_FILENAME: &str = "BPEVocab.txt";
const DEFAULT_NUM_REVIEWERS: usize = 5;

/// Role of a corpus file, taken from the last `_`-separated part of its stem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Split {
    Train,
    Dev,
    Test,
}

impl Split {
    pub fn from_path(path: &Path) -> Option<Self> {
        if path.extension()?.to_str()? != "csv" {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        match stem.rsplit('_').next()? {
            "train" => Some(Split::Train),
            "dev" => Some(Split::Dev),
            "test" => Some(Split::Test),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Dev => "dev",
            Split::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitFile {
    pub split: Split,
    pub path: PathBuf,
}

/// Split files in `dir`, sorted by path. Files that are not recognised
/// splits are skipped.
pub fn discover_splits(dir: &Path) -> Result<Vec<SplitFile>> {
    if !dir.is_dir() {
        return Err(Error::InvalidArgument(format!(
            "directory not found: {}",
            dir.display()
        )));
    }

    let mut splits = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(split) = Split::from_path(&path) {
            splits.push(SplitFile { split, path });
        }
    }
    splits.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(splits)
}

/// Deals every domain's sentences round-robin over `num_reviewers`
/// partitions after shuffling them with `rng`.
///
/// Every partition receives every domain, even when its share is empty. Word
/// counts of the partitions are sentence lengths in characters.
pub fn partition_round_robin<R: Rng + ?Sized>(
    corpus: &DomainCorpus,
    num_reviewers: usize,
    rng: &mut R,
) -> Result<Vec<DomainCorpus>> {
    if num_reviewers == 0 {
        return Err(Error::InvalidArgument(
            "number of reviewers must be greater than zero".into(),
        ));
    }

    let mut partitions = vec![DomainCorpus::new(); num_reviewers];
    for (domain, shard) in corpus.iter() {
        for partition in partitions.iter_mut() {
            partition.shard_mut(domain);
        }

        let mut order: Vec<&PoolEntry> = shard.sentences().iter().collect();
        order.shuffle(rng);
        for (position, entry) in order.into_iter().enumerate() {
            partitions[position % num_reviewers].insert(
                domain,
                &entry.id,
                &entry.text,
                entry.text.chars().count(),
            );
        }
    }
    Ok(partitions)
}

/// Merges all domains into one list keyed by sentence id and shuffles it.
///
/// An id present in several domains keeps the sentence of the last domain.
pub fn flatten_shuffled<R: Rng + ?Sized>(corpus: &DomainCorpus, rng: &mut R) -> Vec<PoolEntry> {
    let mut merged = DomainShard::default();
    for (_, shard) in corpus.iter() {
        for entry in shard.sentences() {
            merged.insert(&entry.id, &entry.text, 0);
        }
    }
    let mut entries = merged.into_sentences();
    entries.shuffle(rng);
    entries
}

/// Writes one encoded sentence per line, tokens joined by a space.
///
/// Lines are joined with `\n`; the file has no trailing newline.
pub fn write_tokenized_sentences<E: Encoder + ?Sized>(
    path: &Path,
    entries: &[PoolEntry],
    encoder: &E,
) -> Result<usize> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for (index, entry) in entries.iter().enumerate() {
        if index > 0 {
            writer.write_all(b"\n")?;
        }
        let tokens = encoder.encode(&entry.text)?;
        writer.write_all(tokens.join(" ").as_bytes())?;
    }
    writer.flush()?;
    Ok(entries.len())
}

/// Writes the `model, sentid, sentnum, sentence` listing of a reviewer
/// corpus. `sentnum` is the 0-based position in `entries`.
pub fn write_reviewer_manifest(
    path: &Path,
    model: &str,
    entries: &[PoolEntry],
    separator: char,
) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = DelimitedWriter::new(BufWriter::new(file), separator);
    writer.write_record(&["model", "sentid", "sentnum", "sentence"])?;
    for (position, entry) in entries.iter().enumerate() {
        let sentnum = position.to_string();
        writer.write_record(&[model, entry.id.as_str(), sentnum.as_str(), entry.text.as_str()])?;
    }
    writer.flush()
}

#[derive(Debug, Clone)]
pub struct ReviewerConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub num_reviewers: usize,
    pub separator: char,
}

impl ReviewerConfig {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            num_reviewers: DEFAULT_NUM_REVIEWERS,
            separator: UNIT_SEPARATOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewerOutput {
    pub model: String,
    pub tokenized: PathBuf,
    pub manifest: PathBuf,
    pub sentences: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationOutput {
    pub split: Split,
    pub tokenized: PathBuf,
    pub sentences: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewerSummary {
    pub vocabulary: PathBuf,
    pub vocabulary_size: usize,
    pub reviewers: Vec<ReviewerOutput>,
    pub evaluation: Vec<EvaluationOutput>,
}

/// Materializes the reviewer training corpora and the tokenized dev/test
/// splits found in `config.input_dir`.
///
/// Files written to `config.output_dir`:
/// * `BPEVocab.txt`, the encoder vocabulary;
/// * `rev{i}_tokenized.txt` and `rev{i}_sentids.csv` per reviewer;
/// * `tokenized_dev` / `tokenized_test` (no extension) when those splits exist.
pub fn build_reviewer_corpora<E: Encoder + ?Sized, R: Rng + ?Sized>(
    config: &ReviewerConfig,
    encoder: &E,
    rng: &mut R,
) -> Result<ReviewerSummary> {
    if config.num_reviewers == 0 {
        return Err(Error::InvalidArgument(
            "number of reviewers must be greater than zero".into(),
        ));
    }

    let splits = discover_splits(&config.input_dir)?;
    let mut seen: HashMap<Split, &Path> = HashMap::new();
    for file in &splits {
        if let Some(previous) = seen.insert(file.split, &file.path) {
            return Err(Error::InvalidArgument(format!(
                "multiple {} files: {} and {}",
                file.split,
                previous.display(),
                file.path.display()
            )));
        }
    }
    if splits.is_empty() {
        warn!(dir = %config.input_dir.display(), "no train/dev/test csv files found");
    }

    fs::create_dir_all(&config.output_dir)?;
    let vocabulary = config.output_dir.join(VOCAB_FILENAME);
    let vocabulary_size = write_vocabulary(&vocabulary, encoder)?;

    let mut reviewers = Vec::new();
    let mut evaluation = Vec::new();

    for file in &splits {
        let corpus = DomainCorpus::load_with_separator(&file.path, config.separator)?;
        info!(
            split = %file.split,
            path = %file.path.display(),
            domains = corpus.len(),
            sentences = corpus.total_sentences(),
            "processing split"
        );

        match file.split {
            Split::Train => {
                let partitions = partition_round_robin(&corpus, config.num_reviewers, rng)?;
                for (index, partition) in partitions.iter().enumerate() {
                    let model = format!("rev{index}");
                    let entries = flatten_shuffled(partition, rng);

                    let tokenized = config.output_dir.join(format!("{model}_tokenized.txt"));
                    write_tokenized_sentences(&tokenized, &entries, encoder)?;

                    let manifest = config.output_dir.join(format!("{model}_sentids.csv"));
                    write_reviewer_manifest(&manifest, &model, &entries, config.separator)?;

                    info!(model = %model, sentences = entries.len(), "wrote reviewer corpus");
                    reviewers.push(ReviewerOutput {
                        model,
                        tokenized,
                        manifest,
                        sentences: entries.len(),
                    });
                }
            }
            Split::Dev | Split::Test => {
                let entries = flatten_shuffled(&corpus, rng);
                let tokenized = config
                    .output_dir
                    .join(format!("tokenized_{}", file.split));
                write_tokenized_sentences(&tokenized, &entries, encoder)?;
                evaluation.push(EvaluationOutput {
                    split: file.split,
                    tokenized,
                    sentences: entries.len(),
                });
            }
        }
    }

    Ok(ReviewerSummary {
        vocabulary,
        vocabulary_size,
        reviewers,
        evaluation,
    })
}
