//! Maps `tx create` options onto exactly one wallet builder call.
//!
//! The fee is parsed first. Then, first match wins: deploy and invoke
//! together are rejected, deploy, invoke, deposit, withdraw, `--to`
//! (contract verification, locked or plain), a multi-output file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, info};

use super::multi_output::read_multi_output;
use super::{
    AccountSelector, AddressInfo, ContractInfo, DeployRequest, InvokeRequest, Wallet,
};
use crate::config::NetworkParams;
use crate::contract::program::op;
use crate::contract::{encoder, Contract, ParameterType};
use crate::crypto::address::is_smart_contract_address;
use crate::error::{Result, WalletCliError};
use crate::types::{Fixed64, Transaction, Uint168, COIN};

/// Gas attached to a deploy when `--gas` is absent.
pub const DEFAULT_DEPLOY_GAS: Fixed64 = Fixed64(10 * COIN);

#[derive(Debug, Clone, Default)]
pub struct TransactionOptions {
    pub fee: Option<String>,
    pub deploy: bool,
    pub invoke: bool,
    /// Contract code for deploy, target code hash for invoke.
    pub hex: Option<String>,
    pub avm: Option<PathBuf>,
    pub params: Option<String>,
    pub return_type: Option<String>,
    pub message: Option<String>,
    pub gas: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub amount: Option<String>,
    pub lock: Option<String>,
    pub deposit: Option<String>,
    pub withdraw: Option<String>,
    pub file: Option<PathBuf>,
}

/// A built transaction. Deploys also report the registered contract and the
/// wallet's addresses after registration.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub transaction: Transaction,
    pub deployed: Option<(Contract, Vec<AddressInfo>)>,
}

impl From<Transaction> for Resolution {
    fn from(transaction: Transaction) -> Self {
        Resolution {
            transaction,
            deployed: None,
        }
    }
}

pub struct TransactionResolver<'a> {
    wallet: &'a mut dyn Wallet,
    network: &'a NetworkParams,
    selector: &'a dyn AccountSelector,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| WalletCliError::filesystem(path, e))
}

/// `--amount` of an invoke, which may be zero.
fn parse_amount_or_zero(value: Option<&str>) -> Result<Fixed64> {
    let s = value.ok_or_else(|| WalletCliError::user_input("use --amount to specify transfer amount"))?;
    s.parse()
        .map_err(|_| WalletCliError::user_input("invalid transaction amount"))
}

fn parse_amount(value: Option<&str>) -> Result<Fixed64> {
    let amount = parse_amount_or_zero(value)?;
    if amount == Fixed64::ZERO {
        return Err(WalletCliError::user_input("transaction amount must be greater than zero"));
    }
    Ok(amount)
}

fn parse_gas(value: Option<&str>, default: Fixed64) -> Result<Fixed64> {
    match value {
        Some(g) => g
            .parse()
            .map_err(|_| WalletCliError::user_input("invalid gas amount")),
        None => Ok(default),
    }
}

/// Target of a trailing `TAILCALL <code hash>` in an invoke program.
fn tail_call_target(program: &[u8]) -> Option<Uint168> {
    let start = program.len().checked_sub(Uint168::LEN + 1)?;
    if program[start] != op::TAILCALL {
        return None;
    }
    Uint168::from_bytes(&program[start + 1..]).ok()
}

fn parse_lock(value: &str) -> Result<u32> {
    value
        .parse()
        .map_err(|_| WalletCliError::user_input("invalid lock height"))
}

impl<'a> TransactionResolver<'a> {
    pub fn new(
        wallet: &'a mut dyn Wallet,
        network: &'a NetworkParams,
        selector: &'a dyn AccountSelector,
    ) -> Self {
        TransactionResolver {
            wallet,
            network,
            selector,
        }
    }

    pub fn resolve(&mut self, opts: &TransactionOptions) -> Result<Resolution> {
        let fee_str = present(&opts.fee)
            .ok_or_else(|| WalletCliError::user_input("use --fee to specify transfer fee"))?;
        let fee: Fixed64 = fee_str
            .parse()
            .map_err(|_| WalletCliError::user_input("invalid transaction fee"))?;

        if opts.deploy && opts.invoke {
            return Err(WalletCliError::user_input(
                "ambiguous intent: both --deploy and --invoke given",
            ));
        }
        if opts.deploy {
            return self.deploy(opts, fee);
        }
        if opts.invoke {
            return self.invoke(opts, fee).map(Resolution::from);
        }

        if let Some(receiver) = present(&opts.deposit) {
            if self.network.deposit_address.trim().is_empty() {
                return Err(WalletCliError::user_input(
                    "deposit address is not configured, set params.deposit_address",
                ));
            }
            let from = self.origin(opts)?;
            let amount = parse_amount(present(&opts.amount))?;
            debug!("deposit to {} via {}", receiver, self.network.deposit_address);
            return self
                .wallet
                .create_cross_chain_transaction(&from, &self.network.deposit_address, receiver, amount, fee)
                .map(Resolution::from);
        }
        if let Some(receiver) = present(&opts.withdraw) {
            let from = self.origin(opts)?;
            let amount = parse_amount(present(&opts.amount))?;
            debug!("withdraw to {} via {}", receiver, self.network.destroy_address);
            return self
                .wallet
                .create_cross_chain_transaction(&from, &self.network.destroy_address, receiver, amount, fee)
                .map(Resolution::from);
        }
        if let Some(to) = present(&opts.to) {
            let from = self.origin(opts)?;
            let amount = parse_amount(present(&opts.amount))?;
            if is_smart_contract_address(&from)? {
                let parameter = match present(&opts.params) {
                    Some(json) => encoder::encode_json(json)?,
                    None => Vec::new(),
                };
                return self
                    .wallet
                    .create_verify_transaction(&from, to, amount, fee, &parameter)
                    .map(Resolution::from);
            }
            return match present(&opts.lock) {
                Some(lock) => self
                    .wallet
                    .create_locked_transaction(&from, to, amount, fee, parse_lock(lock)?),
                None => self.wallet.create_transaction(&from, to, amount, fee),
            }
            .map(Resolution::from);
        }
        if let Some(path) = &opts.file {
            let from = self.origin(opts)?;
            let transfers = read_multi_output(path)?;
            return match present(&opts.lock) {
                Some(lock) => self.wallet.create_locked_multi_output_transaction(
                    &from,
                    fee,
                    parse_lock(lock)?,
                    &transfers,
                ),
                None => self.wallet.create_multi_output_transaction(&from, fee, &transfers),
            }
            .map(Resolution::from);
        }

        Err(WalletCliError::user_input(
            "use --to or --deposit or --withdraw to specify receiver address",
        ))
    }

    fn origin(&self, opts: &TransactionOptions) -> Result<String> {
        match present(&opts.from) {
            Some(from) => Ok(from.to_string()),
            None => self.selector.select(&self.wallet.get_addresses()?),
        }
    }

    fn deploy(&mut self, opts: &TransactionOptions, fee: Fixed64) -> Result<Resolution> {
        let from = self.origin(opts)?;
        let mut code = match (present(&opts.hex), &opts.avm) {
            (Some(_), Some(_)) => {
                return Err(WalletCliError::user_input(
                    "deploy takes only one of --hex and --avm",
                ))
            }
            (Some(hex), None) => hex::decode(hex)?,
            (None, Some(path)) => read_file(path)?,
            (None, None) => {
                return Err(WalletCliError::user_input(
                    "deploy needs --hex or --avm <avm file>",
                ))
            }
        };
        if code.is_empty() {
            return Err(WalletCliError::user_input("contract code is empty"));
        }

        let parameters = match present(&opts.params) {
            Some(json) => {
                let names: Vec<String> = serde_json::from_str(json).map_err(|_| {
                    WalletCliError::user_input("invalid format with --params <parameter type json>")
                })?;
                names
                    .iter()
                    .map(|name| {
                        ParameterType::from_name(name).ok_or_else(|| {
                            WalletCliError::user_input(format!("unsupported parameter type: {:?}", name))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?
            }
            None => Vec::new(),
        };

        let return_name = present(&opts.return_type).unwrap_or_default();
        let return_type = ParameterType::from_name(return_name).ok_or_else(|| {
            WalletCliError::user_input(format!("unsupported return type: {:?}", return_name))
        })?;

        let info = match present(&opts.message) {
            Some(json) => {
                let map: HashMap<String, String> = serde_json::from_str(json)
                    .map_err(|_| WalletCliError::user_input("invalid args --msg <message json>"))?;
                ContractInfo::from_map(&map)
            }
            None => ContractInfo::default(),
        };

        let gas = parse_gas(present(&opts.gas), DEFAULT_DEPLOY_GAS)?;

        code.push(op::SMARTCONTRACT);
        let request = DeployRequest {
            from,
            code: code.clone(),
            parameter_types: parameters.iter().map(|p| *p as u8).collect(),
            return_type: return_type as u8,
            info,
            fee,
            gas,
        };
        let transaction = self.wallet.create_deploy_transaction(&request)?;

        let contract = Contract::new(code, parameters)?;
        self.wallet.add_contract_address(contract.clone())?;
        let addresses = self.wallet.get_addresses()?;
        info!("deploy transaction built for contract {}", contract.program_hash);

        Ok(Resolution {
            transaction,
            deployed: Some((contract, addresses)),
        })
    }

    /// `--hex` names the invoked code hash. An `--avm` program is used
    /// verbatim and must end with the tail call naming the contract.
    fn invoke(&mut self, opts: &TransactionOptions, fee: Fixed64) -> Result<Transaction> {
        let (program, code_hash) = match (present(&opts.hex), &opts.avm) {
            (Some(_), Some(_)) => {
                return Err(WalletCliError::user_input(
                    "invoke takes only one of --hex and --avm",
                ))
            }
            (None, Some(path)) => {
                let program = read_file(path)?;
                if program.is_empty() {
                    return Err(WalletCliError::user_input("invoke program file is empty"));
                }
                let code_hash = tail_call_target(&program).ok_or_else(|| {
                    WalletCliError::user_input(
                        "avm file must end with a tail call to the invoked contract",
                    )
                })?;
                (program, code_hash)
            }
            (Some(hex), None) => {
                let hash_bytes = hex::decode(hex)?;
                let code_hash = Uint168::from_bytes(&hash_bytes)?;
                let mut program = match present(&opts.params) {
                    Some(json) => {
                        let args = encoder::encode_json(json)?;
                        if args.is_empty() {
                            return Err(WalletCliError::user_input("invalid --params <parameter json>"));
                        }
                        args
                    }
                    None => Vec::new(),
                };
                program.push(op::TAILCALL);
                program.extend_from_slice(&hash_bytes);
                (program, code_hash)
            }
            (None, None) => {
                return Err(WalletCliError::user_input(
                    "invoke needs --hex or --avm <avm file>",
                ))
            }
        };

        let from = self.origin(opts)?;
        let amount = parse_amount_or_zero(present(&opts.amount))?;
        let gas = parse_gas(present(&opts.gas), Fixed64::ZERO)?;

        let request = InvokeRequest {
            from,
            to: present(&opts.to).map(str::to_string),
            amount,
            program,
            code_hash,
            fee,
            gas,
        };
        self.wallet.create_invoke_transaction(&request)
    }
}
