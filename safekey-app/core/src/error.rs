use thiserror::Error;

#[derive(Error, Debug)]
pub enum SafeKeyError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// App lock cannot be enabled before a PIN exists.
    #[error("Please set up your PIN first")]
    PinRequired,

    #[error("Settings are still loading")]
    NotLoaded,

    #[error("Vault is locked")]
    Locked,

    #[error("Account not found: {0}")]
    AccountNotFound(i64),

    #[error("Biometric error: {0}")]
    Biometric(#[from] safekey_biometric::Error),

    #[error("Channel receive error")]
    ChannelReceive,
}

pub type Result<T> = std::result::Result<T, SafeKeyError>;
