use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use tracing::debug;

use crate::delimited::{DelimitedReader, UNIT_SEPARATOR};
use crate::errors::{Error, Result};
use crate::pool::{PoolEntry, ID_FIELD, SENTENCE_FIELD};

pub const DOMAIN_FIELD: &str = "domain";
pub const LENGTH_FIELD: &str = "length";

/// Sentences of one domain, keyed by sentence id in first-seen order.
///
/// Inserting an id that is already present replaces its sentence in place;
/// the position of the first occurrence is kept. The counters track every
/// insertion, duplicates included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainShard {
    sentences: Vec<PoolEntry>,
    index: HashMap<String, usize>,
    sentence_count: usize,
    word_count: usize,
}

impl DomainShard {
    pub fn insert(&mut self, id: &str, text: &str, words: usize) {
        match self.index.get(id) {
            Some(&position) => self.sentences[position].text = text.to_string(),
            None => {
                self.index.insert(id.to_string(), self.sentences.len());
                self.sentences.push(PoolEntry::new(id, text));
            }
        }
        self.sentence_count += 1;
        self.word_count += words;
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.index
            .get(id)
            .map(|&position| self.sentences[position].text.as_str())
    }

    pub fn sentences(&self) -> &[PoolEntry] {
        &self.sentences
    }

    pub fn into_sentences(self) -> Vec<PoolEntry> {
        self.sentences
    }

    /// Distinct sentence ids.
    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// Rows inserted, duplicates included.
    pub fn sentence_count(&self) -> usize {
        self.sentence_count
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }
}

/// Corpus grouped by domain.
///
/// Domains iterate in the order they were first inserted; lookups by name are
/// constant time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainCorpus {
    domains: Vec<(String, DomainShard)>,
    index: HashMap<String, usize>,
}

impl DomainCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_separator(path, UNIT_SEPARATOR)
    }

    pub fn load_with_separator(path: &Path, separator: char) -> Result<Self> {
        let reader = DelimitedReader::open(path, separator)?;
        let corpus = Self::from_records(reader)?;
        debug!(
            path = %path.display(),
            domains = corpus.len(),
            sentences = corpus.total_sentences(),
            "loaded domain corpus"
        );
        Ok(corpus)
    }

    pub fn from_reader<R: BufRead>(reader: R, separator: char) -> Result<Self> {
        Self::from_records(DelimitedReader::from_reader(reader, separator)?)
    }

    fn from_records<R: BufRead>(reader: DelimitedReader<R>) -> Result<Self> {
        let header = reader.header();
        let id_index = header.require(ID_FIELD)?;
        let sentence_index = header.require(SENTENCE_FIELD)?;
        let domain_index = header.require(DOMAIN_FIELD)?;
        let length_index = header.require(LENGTH_FIELD)?;

        let mut corpus = Self::new();
        for record in reader {
            let record = record?;
            let raw_length = record.field(length_index);
            let words = raw_length
                .trim()
                .parse::<usize>()
                .map_err(|_| Error::InvalidField {
                    line: record.line(),
                    field: LENGTH_FIELD.to_string(),
                    value: raw_length.to_string(),
                })?;
            corpus.insert(
                record.field(domain_index),
                record.field(id_index),
                record.field(sentence_index),
                words,
            );
        }
        Ok(corpus)
    }

    /// Shard for `domain`, created empty if it does not exist yet.
    pub fn shard_mut(&mut self, domain: &str) -> &mut DomainShard {
        let position = match self.index.get(domain) {
            Some(&position) => position,
            None => {
                let position = self.domains.len();
                self.domains.push((domain.to_string(), DomainShard::default()));
                self.index.insert(domain.to_string(), position);
                position
            }
        };
        &mut self.domains[position].1
    }

    pub fn insert(&mut self, domain: &str, id: &str, text: &str, words: usize) {
        self.shard_mut(domain).insert(id, text, words);
    }

    pub fn get(&self, domain: &str) -> Option<&DomainShard> {
        self.index
            .get(domain)
            .map(|&position| &self.domains[position].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DomainShard)> {
        self.domains
            .iter()
            .map(|(name, shard)| (name.as_str(), shard))
    }

    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.domains.iter().map(|(name, _)| name.as_str())
    }

    /// Number of domains.
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Distinct sentences across all domains.
    pub fn total_sentences(&self) -> usize {
        self.domains.iter().map(|(_, shard)| shard.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str = "sentid\u{1f}sentence\u{1f}domain\u{1f}length\n";

    fn corpus_from(rows: &[(&str, &str, &str, &str)]) -> Result<DomainCorpus> {
        let mut text = HEADER.to_string();
        for (id, sentence, domain, length) in rows {
            text.push_str(&format!(
                "{id}\u{1f}{sentence}\u{1f}{domain}\u{1f}{length}\n"
            ));
        }
        DomainCorpus::from_reader(Cursor::new(text.into_bytes()), UNIT_SEPARATOR)
    }

    #[test]
    fn groups_by_domain_in_insertion_order() {
        let corpus = corpus_from(&[
            ("1", "a b c", "wiki", "3"),
            ("2", "d e", "childes", "2"),
            ("3", "f", "wiki", "1"),
        ])
        .unwrap();

        assert_eq!(corpus.domains().collect::<Vec<_>>(), vec!["wiki", "childes"]);
        let wiki = corpus.get("wiki").unwrap();
        assert_eq!(wiki.sentence_count(), 2);
        assert_eq!(wiki.word_count(), 4);
        assert_eq!(wiki.get("3"), Some("f"));
        assert_eq!(corpus.total_sentences(), 3);
    }

    #[test]
    fn duplicate_id_replaces_text_but_still_counts() {
        let corpus = corpus_from(&[
            ("1", "first", "wiki", "1"),
            ("2", "second", "wiki", "1"),
            ("1", "replaced", "wiki", "1"),
        ])
        .unwrap();

        let wiki = corpus.get("wiki").unwrap();
        assert_eq!(wiki.len(), 2);
        assert_eq!(wiki.sentence_count(), 3);
        assert_eq!(wiki.word_count(), 3);
        assert_eq!(wiki.sentences()[0], PoolEntry::new("1", "replaced"));
    }

    #[test]
    fn non_numeric_length_is_rejected() {
        let err = corpus_from(&[("1", "x", "wiki", "many")]).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidField { line: 2, ref field, ref value } if field == "length" && value == "many"
        ));
    }

    #[test]
    fn missing_domain_field_is_malformed() {
        let text = "sentid\u{1f}sentence\u{1f}length\n1\u{1f}x\u{1f}1\n";
        let err = DomainCorpus::from_reader(Cursor::new(text.as_bytes().to_vec()), UNIT_SEPARATOR)
            .unwrap_err();
        assert!(matches!(err, Error::MalformedSource(msg) if msg.contains("domain")));
    }

    #[test]
    fn shard_mut_creates_empty_domains() {
        let mut corpus = DomainCorpus::new();
        assert!(corpus.shard_mut("news").is_empty());
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.total_sentences(), 0);
    }
}
