use crate::encoder::Encoder;
use crate::errors::{Error, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tokenizers::Tokenizer;

const TOKENIZER_JSON_ERR: &str = "tokenizer json not found at";

pub fn load_tokenizer_from_json(path: &Path) -> Result<Tokenizer> {
    ensure_file(path, TOKENIZER_JSON_ERR)?;
    Tokenizer::from_file(path).map_err(Error::from)
}

/// Writes the encoder vocabulary, one token per line in id order.
///
/// Lines are joined with `\n` and the file has no trailing newline, so an
/// empty vocabulary produces an empty file.
pub fn write_vocabulary<E: Encoder + ?Sized>(path: &Path, encoder: &E) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let vocabulary = encoder.vocabulary();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(vocabulary.join("\n").as_bytes())?;
    writer.flush()?;
    Ok(vocabulary.len())
}

fn ensure_file(path: &Path, context: &str) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::Artifact(format!("{context} {}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::WhitespaceEncoder;

    struct FixedVocab(Vec<String>);

    impl Encoder for FixedVocab {
        fn encode(&self, text: &str) -> Result<Vec<String>> {
            Ok(vec![text.to_string()])
        }

        fn vocabulary(&self) -> Vec<String> {
            self.0.clone()
        }
    }

    #[test]
    fn missing_tokenizer_json_is_an_artifact_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_tokenizer_from_json(&dir.path().join("tokenizer.json")).unwrap_err();
        assert!(matches!(err, Error::Artifact(msg) if msg.starts_with(TOKENIZER_JSON_ERR)));
    }

    #[test]
    fn vocabulary_is_written_in_order_without_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("BPEVocab.txt");
        let encoder = FixedVocab(vec!["<|endoftext|>".into(), "a".into(), "Ġthe".into()]);

        let written = write_vocabulary(&path, &encoder).unwrap();
        assert_eq!(written, 3);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "<|endoftext|>\na\nĠthe"
        );
    }

    #[test]
    fn whitespace_encoder_writes_empty_vocabulary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.txt");
        assert_eq!(write_vocabulary(&path, &WhitespaceEncoder).unwrap(), 0);
        assert!(std::fs::read_to_string(&path).unwrap().is_empty());
    }
}
