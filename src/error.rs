use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Network name must not be empty")]
    EmptyNetworkName,

    #[error("Unknown network '{name}'")]
    UnknownNetwork { name: String },

    #[error("Network name '{name}' must not contain path separators")]
    InvalidNetworkName { name: String },

    #[error("Network '{name}' is declared more than once")]
    DuplicateNetwork { name: String },

    #[error("Missing secret '{variable}' required by network '{network}'")]
    MissingSecret { network: String, variable: String },

    #[error("Invalid numeric field '{field}': {value}")]
    InvalidNumericField { field: String, value: String },

    #[error("Invalid endpoint for network '{network}': {reason}")]
    InvalidEndpoint {
        network: String,
        reason: &'static str,
    },

    #[error("Invalid sender address for network '{network}': {address}")]
    InvalidAddress { network: String, address: String },

    /// Word count only; the phrase itself is never put into an error.
    #[error("Mnemonic in '{variable}' has {words} words, expected 12, 15, 18, 21 or 24")]
    InvalidMnemonic { variable: String, words: usize },
}
