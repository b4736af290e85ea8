use std::path::Path;

use tokenizers::Tokenizer;

use crate::artifacts::load_tokenizer_from_json;
use crate::errors::Result;

/// Turns text into an ordered sequence of token strings.
pub trait Encoder: Send + Sync {
    fn encode(&self, text: &str) -> Result<Vec<String>>;

    /// Known tokens ordered by id. Encoders without a fixed vocabulary
    /// return an empty list.
    fn vocabulary(&self) -> Vec<String>;
}

/// [`Encoder`] backed by a trained `tokenizers` pipeline.
#[derive(Clone)]
pub struct TokenizerEncoder {
    inner: Tokenizer,
}

impl TokenizerEncoder {
    pub fn new(inner: Tokenizer) -> Self {
        Self { inner }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        load_tokenizer_from_json(path).map(Self::new)
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.inner
    }
}

impl Encoder for TokenizerEncoder {
    fn encode(&self, text: &str) -> Result<Vec<String>> {
        let encoding = self.inner.encode(text, false)?;
        Ok(encoding.get_tokens().to_vec())
    }

    fn vocabulary(&self) -> Vec<String> {
        let mut entries: Vec<(String, u32)> = self.inner.get_vocab(true).into_iter().collect();
        entries.sort_by_key(|(_, id)| *id);
        entries.into_iter().map(|(token, _)| token).collect()
    }
}

/// Splits on Unicode whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceEncoder;

impl Encoder for WhitespaceEncoder {
    fn encode(&self, text: &str) -> Result<Vec<String>> {
        Ok(text.split_whitespace().map(str::to_string).collect())
    }

    fn vocabulary(&self) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_encoder_collapses_runs() {
        let tokens = WhitespaceEncoder.encode("  the\tcat  sat\n").unwrap();
        assert_eq!(tokens, vec!["the", "cat", "sat"]);
    }

    #[test]
    fn whitespace_encoder_handles_empty_text() {
        assert!(WhitespaceEncoder.encode("").unwrap().is_empty());
    }

    const WORD_LEVEL_JSON: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {"cat": 2, "[UNK]": 0, "the": 1},
            "unk_token": "[UNK]"
        }
    }"#;

    #[test]
    fn tokenizer_encoder_returns_token_strings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokenizer.json");
        std::fs::write(&path, WORD_LEVEL_JSON).unwrap();

        let encoder = TokenizerEncoder::from_file(&path).unwrap();
        assert_eq!(
            encoder.encode("the cat dog").unwrap(),
            vec!["the", "cat", "[UNK]"]
        );
        assert_eq!(encoder.vocabulary(), vec!["[UNK]", "the", "cat"]);
    }

    #[test]
    fn encoders_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WhitespaceEncoder>();
        assert_send_sync::<TokenizerEncoder>();
    }
}
