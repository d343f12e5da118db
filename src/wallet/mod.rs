//! Transaction assembly: the wallet service seam, intent resolution, signing
//! and the `.txn` hand-off files.

pub mod keystore;
pub mod local;
pub mod multi_output;
pub mod output;
pub mod resolver;
pub mod signer;

use std::collections::HashMap;
use std::io::{self, BufRead, Write};

use zeroize::Zeroizing;

use crate::contract::Contract;
use crate::crypto::ScriptType;
use crate::error::{Result, WalletCliError};
use crate::types::{Fixed64, Transaction, Uint168};

pub use local::{LocalWallet, Utxo, UtxoSource};
pub use output::{output, parse_transaction_hex, render, RenderedTransaction};
pub use resolver::{Resolution, TransactionOptions, TransactionResolver, DEFAULT_DEPLOY_GAS};

/// One `address, amount` pair of a multi-output transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub address: String,
    pub amount: Fixed64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressInfo {
    pub address: String,
    pub program_hash: Uint168,
    pub code: Vec<u8>,
    pub kind: ScriptType,
}

/// Descriptive fields stored in a deploy payload, taken from `--msg`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractInfo {
    pub name: String,
    pub version: String,
    pub author: String,
    pub email: String,
    pub description: String,
}

impl ContractInfo {
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).cloned().unwrap_or_default();
        ContractInfo {
            name: get("name"),
            version: get("version"),
            author: get("author"),
            email: get("email"),
            description: get("desc"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    pub from: String,
    /// Contract code including the trailing smart contract marker.
    pub code: Vec<u8>,
    pub parameter_types: Vec<u8>,
    pub return_type: u8,
    pub info: ContractInfo,
    pub fee: Fixed64,
    pub gas: Fixed64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeRequest {
    pub from: String,
    pub to: Option<String>,
    pub amount: Fixed64,
    pub program: Vec<u8>,
    pub code_hash: Uint168,
    pub fee: Fixed64,
    pub gas: Fixed64,
}

/// Owns keys and addresses and turns transfer intents into unsigned
/// transactions.
pub trait Wallet {
    fn create_transaction(&self, from: &str, to: &str, amount: Fixed64, fee: Fixed64)
        -> Result<Transaction>;

    fn create_locked_transaction(
        &self,
        from: &str,
        to: &str,
        amount: Fixed64,
        fee: Fixed64,
        lock: u32,
    ) -> Result<Transaction>;

    /// `to` is the chain's deposit or destroy address, `cross_chain_address`
    /// the receiver on the other chain.
    fn create_cross_chain_transaction(
        &self,
        from: &str,
        to: &str,
        cross_chain_address: &str,
        amount: Fixed64,
        fee: Fixed64,
    ) -> Result<Transaction>;

    fn create_multi_output_transaction(
        &self,
        from: &str,
        fee: Fixed64,
        outputs: &[Transfer],
    ) -> Result<Transaction>;

    fn create_locked_multi_output_transaction(
        &self,
        from: &str,
        fee: Fixed64,
        lock: u32,
        outputs: &[Transfer],
    ) -> Result<Transaction>;

    /// Spend from a contract address; `parameter` is the verification
    /// program's argument bytes.
    fn create_verify_transaction(
        &self,
        from: &str,
        to: &str,
        amount: Fixed64,
        fee: Fixed64,
        parameter: &[u8],
    ) -> Result<Transaction>;

    fn create_deploy_transaction(&self, request: &DeployRequest) -> Result<Transaction>;

    fn create_invoke_transaction(&self, request: &InvokeRequest) -> Result<Transaction>;

    /// Add every signature this wallet can provide.
    fn sign(&self, password: &[u8], txn: &mut Transaction) -> Result<()>;

    fn get_addresses(&self) -> Result<Vec<AddressInfo>>;

    fn add_contract_address(&mut self, contract: Contract) -> Result<()>;
}

/// Picks the origin account when `--from` is absent.
pub trait AccountSelector {
    fn select(&self, accounts: &[AddressInfo]) -> Result<String>;
}

/// Supplies the keystore password for signing.
pub trait PasswordSource {
    fn password(&self) -> Result<Zeroizing<Vec<u8>>>;
}

/// Uses the only account, or asks on stderr/stdin when there are several.
pub struct PromptSelector;

impl AccountSelector for PromptSelector {
    fn select(&self, accounts: &[AddressInfo]) -> Result<String> {
        match accounts {
            [] => Err(WalletCliError::wallet("wallet has no accounts")),
            [only] => Ok(only.address.clone()),
            _ => {
                let mut stderr = io::stderr();
                for (i, account) in accounts.iter().enumerate() {
                    writeln!(stderr, "{:>3}  {}", i + 1, account.address)?;
                }
                write!(stderr, "Select an account [1-{}]: ", accounts.len())?;
                stderr.flush()?;

                let mut line = String::new();
                io::stdin().lock().read_line(&mut line)?;
                let choice: usize = line
                    .trim()
                    .parse()
                    .map_err(|_| WalletCliError::user_input("invalid account selection"))?;
                accounts
                    .get(choice.wrapping_sub(1))
                    .map(|a| a.address.clone())
                    .ok_or_else(|| WalletCliError::user_input("invalid account selection"))
            }
        }
    }
}

/// `--password` when given, otherwise an interactive prompt.
pub struct CliPassword {
    given: Option<Zeroizing<String>>,
}

impl CliPassword {
    pub fn new(given: Option<String>) -> Self {
        CliPassword {
            given: given.map(Zeroizing::new),
        }
    }
}

impl PasswordSource for CliPassword {
    fn password(&self) -> Result<Zeroizing<Vec<u8>>> {
        if let Some(p) = &self.given {
            return Ok(Zeroizing::new(p.as_bytes().to_vec()));
        }
        let entered = Zeroizing::new(rpassword::prompt_password("Password: ")?);
        Ok(Zeroizing::new(entered.as_bytes().to_vec()))
    }
}

/// Fixed password, for non-interactive callers.
pub struct StaticPassword(pub Zeroizing<Vec<u8>>);

impl PasswordSource for StaticPassword {
    fn password(&self) -> Result<Zeroizing<Vec<u8>>> {
        Ok(self.0.clone())
    }
}
