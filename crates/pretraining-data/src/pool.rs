use std::io::BufRead;
use std::path::Path;

use tracing::debug;

use crate::delimited::{DelimitedReader, UNIT_SEPARATOR};
use crate::errors::Result;

pub const ID_FIELD: &str = "sentid";
pub const SENTENCE_FIELD: &str = "sentence";

/// A candidate sentence and its identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolEntry {
    pub id: String,
    pub text: String,
}

impl PoolEntry {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Ranked sentence pool.
///
/// Row order of the source is the difficulty ranking, so entries are kept
/// exactly as read and never re-sorted. Earlier entries are "easier" and
/// become visible to the curriculum first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pool {
    entries: Vec<PoolEntry>,
}

impl Pool {
    pub fn new(entries: Vec<PoolEntry>) -> Self {
        Self { entries }
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_separator(path, UNIT_SEPARATOR)
    }

    pub fn load_with_separator(path: &Path, separator: char) -> Result<Self> {
        let reader = DelimitedReader::open(path, separator)?;
        let pool = Self::from_records(reader)?;
        debug!(path = %path.display(), entries = pool.len(), "loaded sentence pool");
        Ok(pool)
    }

    pub fn from_reader<R: BufRead>(reader: R, separator: char) -> Result<Self> {
        Self::from_records(DelimitedReader::from_reader(reader, separator)?)
    }

    fn from_records<R: BufRead>(reader: DelimitedReader<R>) -> Result<Self> {
        let header = reader.header();
        let id_index = header.require(ID_FIELD)?;
        let sentence_index = header.require(SENTENCE_FIELD)?;

        let mut entries = Vec::new();
        for record in reader {
            let mut record = record?;
            let id = record.take(id_index);
            let text = record.take(sentence_index);
            entries.push(PoolEntry { id, text });
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PoolEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&PoolEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PoolEntry> {
        self.entries.iter()
    }
}

impl FromIterator<PoolEntry> for Pool {
    fn from_iter<I: IntoIterator<Item = PoolEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Pool {
    type Item = &'a PoolEntry;
    type IntoIter = std::slice::Iter<'a, PoolEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Loads a ranked pool from a unit-separator delimited file.
pub fn load_pool(path: &Path) -> Result<Pool> {
    Pool::load(path)
}
