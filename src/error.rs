use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeasursError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid character {character:?} at position {position}")]
    InvalidCharacter { character: char, position: usize },

    #[error("Decryption failed: {0}")]
    AuthenticationOrPaddingError(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Persistence failed on {sinks}: {detail}")]
    PersistenceFailure { sinks: String, detail: String },

    #[error("Encryption key unavailable: {0}")]
    KeyUnavailable(String),

    #[error("Unsupported grammar: {0}")]
    UnsupportedGrammar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, MeasursError>;
