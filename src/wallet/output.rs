use std::path::Path;

use log::debug;

use crate::crypto::SigningProgress;
use crate::error::{Result, WalletCliError};
use crate::types::Transaction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTransaction {
    pub hex: String,
    pub file_name: String,
}

pub fn file_name(progress: SigningProgress) -> String {
    let SigningProgress { have, need } = progress;
    if have == 0 {
        "to_be_signed.txn".to_string()
    } else if have < need {
        format!("to_be_signed_{}_of_{}.txn", have, need)
    } else {
        "ready_to_send.txn".to_string()
    }
}

pub fn render(txn: &Transaction, progress: SigningProgress) -> RenderedTransaction {
    RenderedTransaction {
        hex: hex::encode(txn.serialize()),
        file_name: file_name(progress),
    }
}

/// Render `txn`, overwrite its file under `dir` and print both.
pub fn output(txn: &Transaction, progress: SigningProgress, dir: &Path) -> Result<RenderedTransaction> {
    let rendered = render(txn, progress);
    println!("{}", rendered.hex);

    let path = dir.join(&rendered.file_name);
    std::fs::write(&path, rendered.hex.as_bytes())
        .map_err(|e| WalletCliError::filesystem(&path, e))?;
    debug!("wrote {} bytes to {}", rendered.hex.len(), path.display());

    println!("File: {}", rendered.file_name);
    Ok(rendered)
}

pub fn parse_transaction_hex(content: &str) -> Result<Transaction> {
    let bytes = hex::decode(content.trim())
        .map_err(|e| WalletCliError::format(format!("decode transaction content failed: {}", e)))?;
    Transaction::deserialize(&bytes)
}
