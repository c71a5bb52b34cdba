use thiserror::Error;

/// Errors from writing transcript snapshots to a blob store.
///
/// These never reach a client; the persistence sink logs and drops them.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("invalid blob key: '{0}'")]
    InvalidKey(String),
}

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {message}")]
    Read { path: String, message: String },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid value for {field}: {message}")]
    Invalid { field: String, message: String },
}
