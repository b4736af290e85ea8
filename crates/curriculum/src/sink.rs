use std::{
    ffi::OsString,
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use pretraining_data::{DelimitedWriter, ID_FIELD, SENTENCE_FIELD};
use tracing::debug;

use crate::errors::Result;
use crate::sampler::StepBatch;

/// Destination for sampled step batches.
pub trait BatchSink {
    fn write_batch(&mut self, batch: &StepBatch<'_>) -> Result<()>;

    fn flush(&mut self) -> Result<()>;
}

/// The aligned output pair derived from one base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// `<base>.csv`: header plus one `(sentid, sentence)` row per sample.
    pub structured: PathBuf,
    /// `<base>.txt`: one sentence per line, no header.
    pub text: PathBuf,
}

impl OutputPaths {
    /// Appends the suffixes to the full base name, so `run.v2` becomes
    /// `run.v2.csv` rather than `run.csv`.
    pub fn from_base(base: &Path) -> Self {
        Self {
            structured: with_suffix(base, ".csv"),
            text: with_suffix(base, ".txt"),
        }
    }
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Writes the structured and the plain-text curriculum files side by side.
///
/// Every row is validated for both files before either is touched, which
/// keeps the two outputs line-aligned even when a sentence is rejected.
/// Buffers are flushed on drop so an aborted run keeps its completed steps.
pub struct CurriculumFileSink {
    paths: OutputPaths,
    structured: DelimitedWriter<BufWriter<File>>,
    text: BufWriter<File>,
    rows: usize,
}

impl CurriculumFileSink {
    pub fn create(base: &Path, separator: char) -> Result<Self> {
        let paths = OutputPaths::from_base(base);
        if let Some(parent) = paths.structured.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut structured =
            DelimitedWriter::new(BufWriter::new(File::create(&paths.structured)?), separator);
        structured.write_record(&[ID_FIELD, SENTENCE_FIELD])?;
        let text = BufWriter::new(File::create(&paths.text)?);

        debug!(
            structured = %paths.structured.display(),
            text = %paths.text.display(),
            "opened curriculum outputs"
        );

        Ok(Self {
            paths,
            structured,
            text,
            rows: 0,
        })
    }

    /// Data rows written so far, header excluded.
    pub fn rows_written(&self) -> usize {
        self.rows
    }

    /// Flushes both files and returns their paths.
    pub fn finish(mut self) -> Result<OutputPaths> {
        BatchSink::flush(&mut self)?;
        Ok(self.paths.clone())
    }
}

impl BatchSink for CurriculumFileSink {
    fn write_batch(&mut self, batch: &StepBatch<'_>) -> Result<()> {
        for entry in batch.iter() {
            // The structured writer rejects the same sentences the text file
            // cannot hold, so it goes first.
            self.structured
                .write_record(&[entry.id.as_str(), entry.text.as_str()])?;
            self.text.write_all(entry.text.as_bytes())?;
            self.text.write_all(b"\n")?;
            self.rows += 1;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.structured.flush()?;
        self.text.flush()?;
        Ok(())
    }
}

impl Drop for CurriculumFileSink {
    fn drop(&mut self) {
        let _ = self.structured.flush();
        let _ = self.text.flush();
    }
}

/// Keeps emitted rows in memory; handy for previews and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySink {
    rows: Vec<MemoryRow>,
    flushes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRow {
    pub step: usize,
    pub id: String,
    pub text: String,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[MemoryRow] {
        &self.rows
    }

    pub fn ids(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.id.as_str()).collect()
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl BatchSink for MemorySink {
    fn write_batch(&mut self, batch: &StepBatch<'_>) -> Result<()> {
        self.rows.extend(batch.iter().map(|entry| MemoryRow {
            step: batch.step,
            id: entry.id.clone(),
            text: entry.text.clone(),
        }));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CurriculumError;
    use pretraining_data::{PoolEntry, UNIT_SEPARATOR};

    fn batch<'a>(step: usize, entries: &'a [PoolEntry]) -> StepBatch<'a> {
        StepBatch {
            step,
            proportion: 1.0,
            prefix_size: entries.len(),
            entries: entries.iter().collect(),
        }
    }

    #[test]
    fn suffixes_are_appended_to_the_whole_name() {
        let paths = OutputPaths::from_base(Path::new("out/curriculum_root2.0_T10"));
        assert_eq!(
            paths.structured,
            PathBuf::from("out/curriculum_root2.0_T10.csv")
        );
        assert_eq!(paths.text, PathBuf::from("out/curriculum_root2.0_T10.txt"));
    }

    #[test]
    fn file_sink_writes_aligned_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("nested").join("B");
        let entries = vec![
            PoolEntry::new("s1", "The cat sat."),
            PoolEntry::new("s2", "Commas, \"quotes\" stay raw."),
        ];

        let mut sink = CurriculumFileSink::create(&base, UNIT_SEPARATOR).unwrap();
        sink.write_batch(&batch(0, &entries)).unwrap();
        sink.write_batch(&batch(1, &entries[..1])).unwrap();
        assert_eq!(sink.rows_written(), 3);
        let paths = sink.finish().unwrap();

        assert_eq!(
            fs::read_to_string(&paths.structured).unwrap(),
            "sentid\u{1f}sentence\n\
             s1\u{1f}The cat sat.\n\
             s2\u{1f}Commas, \"quotes\" stay raw.\n\
             s1\u{1f}The cat sat.\n"
        );
        assert_eq!(
            fs::read_to_string(&paths.text).unwrap(),
            "The cat sat.\nCommas, \"quotes\" stay raw.\nThe cat sat.\n"
        );
    }

    #[test]
    fn rejected_sentence_leaves_outputs_aligned() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("B");
        let entries = vec![
            PoolEntry::new("ok", "fine"),
            PoolEntry::new("bad", "two\nlines"),
        ];

        let mut sink = CurriculumFileSink::create(&base, UNIT_SEPARATOR).unwrap();
        let err = sink.write_batch(&batch(0, &entries)).unwrap_err();
        assert!(matches!(
            err,
            CurriculumError::Data(pretraining_data::Error::UnencodableField(_))
        ));
        drop(sink);

        let paths = OutputPaths::from_base(&base);
        assert_eq!(
            fs::read_to_string(&paths.structured).unwrap(),
            "sentid\u{1f}sentence\nok\u{1f}fine\n"
        );
        assert_eq!(fs::read_to_string(&paths.text).unwrap(), "fine\n");
    }

    #[test]
    fn memory_sink_records_steps() {
        let entries = vec![PoolEntry::new("a", "x"), PoolEntry::new("b", "y")];
        let mut sink = MemorySink::new();
        sink.write_batch(&batch(3, &entries)).unwrap();
        sink.flush().unwrap();

        assert_eq!(sink.ids(), vec!["a", "b"]);
        assert!(sink.rows().iter().all(|row| row.step == 3));
        assert_eq!(sink.flushes(), 1);
    }
}
