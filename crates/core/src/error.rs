#[derive(Debug, thiserror::Error)]
pub enum CritiqueError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid repository URL: {0}")]
    InvalidUrl(String),
    #[error("failed to fetch file: {0}")]
    Fetch(String),
    #[error("unsupported file format: {0} (only .py and .ipynb files are supported)")]
    UnsupportedFormat(String),
    #[error("failed to parse notebook: {0}")]
    NotebookParse(String),
    #[error("conversation not found: {0}")]
    NotFound(String),
    #[error("backend request failed: {0}")]
    Backend(String),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write conversation file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read conversation file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize record: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
    #[error("malformed conversation file: {0}")]
    ThreadParse(String),
    #[error("invalid identifier: {0}")]
    Uuid(#[from] critique_uuid::UuidError),
}

impl CritiqueError {
    /// True for failures caused by the caller's input or the file host rather than by this
    /// service's own storage.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            CritiqueError::Configuration(_)
                | CritiqueError::InvalidInput(_)
                | CritiqueError::InvalidUrl(_)
                | CritiqueError::Fetch(_)
                | CritiqueError::UnsupportedFormat(_)
                | CritiqueError::NotebookParse(_)
                | CritiqueError::Backend(_)
                | CritiqueError::Uuid(_)
        )
    }
}

pub type CritiqueResult<T> = std::result::Result<T, CritiqueError>;
