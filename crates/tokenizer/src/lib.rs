//! Encoder collaborator for corpus materialization.
//!
//! The curriculum and reviewer pipelines only need one thing from a
//! tokenizer: turn a sentence into an ordered list of token strings. That
//! contract is the [`Encoder`] trait. Two implementations ship here:
//!
//! * [`TokenizerEncoder`] wraps a trained `tokenizers` pipeline loaded from a
//!   `tokenizer.json` artifact. Training that artifact happens elsewhere.
//! * [`WhitespaceEncoder`] splits on Unicode whitespace and carries no
//!   vocabulary. It is the fallback when no artifact is configured.
//!
//! Encoders are `Send + Sync` so a single instance can be shared by the
//! writers that consume it.

pub mod encoder;
pub mod errors;

mod artifacts;

pub use artifacts::{load_tokenizer_from_json, write_vocabulary};
pub use encoder::{Encoder, TokenizerEncoder, WhitespaceEncoder};
pub use errors::{Error, Result};
