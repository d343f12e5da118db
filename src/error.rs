use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::contract::encoder::EncodingError;

/// Exit code used when the wallet keystore cannot be opened.
pub const EXIT_WALLET_OPEN: i32 = 2;

/// Exit code used when building, deploying or invoking fails.
pub const EXIT_BUILD_FAILED: i32 = 701;

#[derive(Error, Debug)]
pub enum WalletCliError {
    /// Missing or contradictory flags, malformed amounts or JSON.
    #[error("{0}")]
    UserInput(String),

    /// Hex decode failures, undecodable transactions, wrong-length hashes.
    #[error("Format error: {0}")]
    Format(String),

    #[error("Parameter encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("{0}")]
    ScriptClassification(String),

    #[error("{0}")]
    Transport(String),

    #[error("{path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WalletCliError {
    pub fn user_input(msg: impl Into<String>) -> Self {
        WalletCliError::UserInput(msg.into())
    }

    pub fn format(msg: impl Into<String>) -> Self {
        WalletCliError::Format(msg.into())
    }

    pub fn wallet(msg: impl Into<String>) -> Self {
        WalletCliError::Wallet(msg.into())
    }

    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WalletCliError::Filesystem {
            path: path.into(),
            source,
        }
    }
}

impl From<hex::FromHexError> for WalletCliError {
    fn from(error: hex::FromHexError) -> Self {
        WalletCliError::Format(format!("hex decode: {}", error))
    }
}

impl From<reqwest::Error> for WalletCliError {
    fn from(error: reqwest::Error) -> Self {
        WalletCliError::Transport(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WalletCliError>;
