use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed source: {0}")]
    MalformedSource(String),

    #[error("malformed row at line {line}: expected {expected} fields, found {found}")]
    MalformedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid value {value:?} for field `{field}` at line {line}")]
    InvalidField {
        line: usize,
        field: String,
        value: String,
    },

    #[error("cannot encode field {0:?}: it contains the separator or a line break")]
    UnencodableField(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("tokenizer error: {0}")]
    Tokenizer(#[from] tokenizer::Error),
}
