use thiserror::Error;

pub type Result<T> = std::result::Result<T, CurriculumError>;

#[derive(Error, Debug)]
pub enum CurriculumError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Data(#[from] pretraining_data::Error),

    #[error("failed to parse config: {0}")]
    ConfigFormat(String),

    #[error("invalid schedule configuration: {}", .0.join("; "))]
    InvalidScheduleConfig(Vec<String>),

    #[error("manifest error: {0}")]
    Manifest(String),

    #[error(
        "insufficient prefix at step {step}: {prefix_size} visible entries cannot supply a batch of {batch_size}"
    )]
    InsufficientPrefix {
        step: usize,
        prefix_size: usize,
        batch_size: usize,
    },
}

impl CurriculumError {
    pub fn invalid(messages: Vec<String>) -> Self {
        Self::InvalidScheduleConfig(messages)
    }
}

impl From<toml::de::Error> for CurriculumError {
    fn from(value: toml::de::Error) -> Self {
        CurriculumError::ConfigFormat(value.to_string())
    }
}

impl From<serde_json::Error> for CurriculumError {
    fn from(value: serde_json::Error) -> Self {
        CurriculumError::ConfigFormat(value.to_string())
    }
}
