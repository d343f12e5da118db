//! `tx sign` and `tx send`.

use std::path::Path;

use log::{debug, info};

use super::output::{output, parse_transaction_hex, RenderedTransaction};
use super::{PasswordSource, Wallet};
use crate::crypto::{classify, SignatureCounter, SigningProgress};
use crate::error::{Result, WalletCliError};
use crate::rpc::RpcClient;
use crate::types::Transaction;

/// Transaction hex from `--hex` or `--file`. Hex wins when both are given.
pub fn read_transaction_content(hex: Option<&str>, file: Option<&Path>) -> Result<String> {
    if let Some(hex) = hex.map(str::trim).filter(|h| !h.is_empty()) {
        return Ok(hex.to_string());
    }
    let Some(path) = file else {
        return Err(WalletCliError::user_input(
            "missing transaction content, use --hex or --file",
        ));
    };
    if !path.exists() {
        return Err(WalletCliError::user_input(format!(
            "file {} does not exist",
            path.display()
        )));
    }
    let content =
        std::fs::read_to_string(path).map_err(|e| WalletCliError::filesystem(path, e))?;
    let content = content.trim();
    if content.is_empty() {
        return Err(WalletCliError::user_input(format!(
            "file {} is empty",
            path.display()
        )));
    }
    Ok(content.to_string())
}

/// Progress of the first program, the one carrying the spender's signatures.
pub fn transaction_progress(counter: &dyn SignatureCounter, txn: &Transaction) -> Result<SigningProgress> {
    let program = txn
        .programs
        .first()
        .ok_or_else(|| WalletCliError::format("transaction has no program"))?;
    classify(counter, &program.code, &program.parameter)
}

/// Add this wallet's signatures to `content` and write the next `.txn` file.
pub fn sign_transaction(
    wallet: &dyn Wallet,
    counter: &dyn SignatureCounter,
    passwords: &dyn PasswordSource,
    content: &str,
    dir: &Path,
) -> Result<(SigningProgress, RenderedTransaction)> {
    let mut txn = parse_transaction_hex(content)?;

    let before = transaction_progress(counter, &txn)?;
    if before.is_complete() {
        return Err(WalletCliError::user_input(
            "transaction was fully signed, no need more sign",
        ));
    }
    debug!("signing transaction {}, status {}", txn.hash(), before);

    let password = passwords.password()?;
    wallet.sign(&password, &mut txn)?;
    drop(password);

    let mut progress = transaction_progress(counter, &txn)?;
    // A contract verification parameter reads (0, 0) once filled in.
    if progress.have == 0 && progress.need == 0 {
        progress = SigningProgress::new(before.need, before.need);
    }

    println!("{} Transaction successfully signed", progress);
    let rendered = output(&txn, progress, dir)?;
    info!("signed transaction written to {}", rendered.file_name);
    Ok((progress, rendered))
}

/// Broadcast `content`; returns the txid reported by the node.
pub fn send_transaction(rpc: &RpcClient, content: &str) -> Result<String> {
    let txn = parse_transaction_hex(content)?;
    debug!("sending transaction {}", txn.hash());
    rpc.send_raw_transaction(&hex::encode(txn.serialize()))
}
