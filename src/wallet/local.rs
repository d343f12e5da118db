use std::path::{Path, PathBuf};

use log::{debug, info};
use rand::Rng;

use super::keystore::Keystore;
use super::{AddressInfo, DeployRequest, InvokeRequest, Transfer, Wallet};
use crate::contract::{Contract, ParameterType};
use crate::crypto::address::{
    address_from_program_hash, program_hash_from_address, to_program_hash,
};
use crate::crypto::keys::{self, KeyPair};
use crate::crypto::script::{
    public_keys, script_type, standard_redeem_script, ScriptType, SIGNATURE_SCRIPT_LEN,
};
use crate::error::{Result, WalletCliError};
use crate::types::transaction::ATTRIBUTE_NONCE;
use crate::types::{
    Attribute, DeployPayload, Fixed64, FunctionCode, Input, InvokePayload, OutPoint, Output,
    Payload, Program, Transaction, TransferCrossChainAsset, Uint168, SYSTEM_ASSET_ID,
};

/// Spendable output of an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    pub outpoint: OutPoint,
    pub amount: Fixed64,
    pub output_lock: u32,
}

/// Where the wallet learns which outputs it can spend.
pub trait UtxoSource {
    fn list_unspent(&self, address: &str) -> Result<Vec<Utxo>>;
}

/// Wallet backed by a keystore file and a UTXO source.
pub struct LocalWallet<S: UtxoSource> {
    path: PathBuf,
    keystore: Keystore,
    source: S,
}

struct Spend {
    code: Vec<u8>,
    parameter: Vec<u8>,
}

impl<S: UtxoSource> LocalWallet<S> {
    pub fn open(path: &Path, source: S) -> Result<Self> {
        let keystore = Keystore::load(path)?;
        debug!("opened keystore {}", path.display());
        Ok(LocalWallet {
            path: path.to_path_buf(),
            keystore,
            source,
        })
    }

    /// Write a fresh keystore to `path`; refuses to overwrite.
    pub fn create(path: &Path, keystore: Keystore, source: S) -> Result<Self> {
        if path.exists() {
            return Err(WalletCliError::wallet(format!(
                "{} already exists",
                path.display()
            )));
        }
        keystore.save(path)?;
        Ok(LocalWallet {
            path: path.to_path_buf(),
            keystore,
            source,
        })
    }

    fn account_code(&self) -> Result<Vec<u8>> {
        standard_redeem_script(&self.keystore.public_key_bytes()?)
    }

    /// Redeem script owning `address`, if this wallet holds it.
    fn code_for(&self, address: &str) -> Result<Vec<u8>> {
        let hash = program_hash_from_address(address)?;
        let account = self.account_code()?;
        if to_program_hash(&account)? == hash {
            return Ok(account);
        }
        self.keystore
            .contracts()?
            .into_iter()
            .find(|c| c.program_hash == hash)
            .map(|c| c.code)
            .ok_or_else(|| WalletCliError::wallet(format!("address {} is not in this wallet", address)))
    }

    fn output_to(address: &str, value: Fixed64, output_lock: u32) -> Result<Output> {
        Ok(Output {
            asset_id: SYSTEM_ASSET_ID,
            value,
            output_lock,
            program_hash: program_hash_from_address(address)?,
        })
    }

    /// Fund `outputs + fee + extra` from `from`, largest outputs first, with
    /// change returned to `from`.
    fn build(
        &self,
        from: &str,
        payload: Payload,
        mut outputs: Vec<Output>,
        fee: Fixed64,
        extra: Fixed64,
        spend: Spend,
    ) -> Result<Transaction> {
        if fee < Fixed64::ZERO || extra < Fixed64::ZERO || outputs.iter().any(|o| o.value < Fixed64::ZERO) {
            return Err(WalletCliError::user_input("amounts must not be negative"));
        }
        let overflow = || WalletCliError::user_input("amount overflow");
        let mut total = fee.checked_add(extra).ok_or_else(overflow)?;
        for output in &outputs {
            total = total.checked_add(output.value).ok_or_else(overflow)?;
        }

        let mut utxos: Vec<Utxo> = self
            .source
            .list_unspent(from)?
            .into_iter()
            .filter(|u| u.output_lock == 0)
            .collect();
        utxos.sort_by(|a, b| b.amount.cmp(&a.amount));

        let mut inputs = Vec::new();
        let mut gathered = Fixed64::ZERO;
        for utxo in utxos {
            if gathered >= total {
                break;
            }
            gathered = gathered.checked_add(utxo.amount).ok_or_else(overflow)?;
            inputs.push(Input {
                previous: utxo.outpoint,
                sequence: u32::MAX,
            });
        }
        if gathered < total {
            return Err(WalletCliError::wallet(format!(
                "insufficient balance: need {}, available {}",
                total, gathered
            )));
        }
        if inputs.is_empty() {
            return Err(WalletCliError::wallet("transaction spends no input"));
        }

        let change = gathered.checked_sub(total).ok_or_else(overflow)?;
        if change > Fixed64::ZERO {
            outputs.push(Self::output_to(from, change, 0)?);
        }

        let mut txn = Transaction::new(payload);
        txn.attributes.push(Attribute {
            usage: ATTRIBUTE_NONCE,
            data: rand::thread_rng().gen::<u64>().to_string().into_bytes(),
        });
        txn.inputs = inputs;
        txn.outputs = outputs;
        txn.programs.push(Program {
            code: spend.code,
            parameter: spend.parameter,
        });
        debug!(
            "built {:?} with {} inputs and {} outputs",
            txn.tx_type(),
            txn.inputs.len(),
            txn.outputs.len()
        );
        Ok(txn)
    }

    fn build_transfer(
        &self,
        from: &str,
        transfers: &[Transfer],
        fee: Fixed64,
        lock: u32,
    ) -> Result<Transaction> {
        let outputs = transfers
            .iter()
            .map(|t| Self::output_to(&t.address, t.amount, lock))
            .collect::<Result<Vec<_>>>()?;
        let spend = Spend {
            code: self.code_for(from)?,
            parameter: Vec::new(),
        };
        self.build(from, Payload::TransferAsset, outputs, fee, Fixed64::ZERO, spend)
    }

    /// Signature parameter for a registered contract whose arguments are all
    /// signatures.
    fn contract_signatures(&self, code: &[u8], keypair: &KeyPair, message: &[u8]) -> Result<Option<Vec<u8>>> {
        let Some(contract) = self
            .keystore
            .contracts()?
            .into_iter()
            .find(|c| c.code == code)
        else {
            return Ok(None);
        };
        if contract.parameters.is_empty()
            || contract.parameters.iter().any(|p| *p != ParameterType::Signature)
        {
            return Err(WalletCliError::wallet(
                "contract verification needs arguments; pass them with --params",
            ));
        }
        let signature = keypair.sign(message);
        let mut parameter = Vec::new();
        for _ in &contract.parameters {
            parameter.push(keys::SIGNATURE_LEN as u8);
            parameter.extend_from_slice(&signature);
        }
        Ok(Some(parameter))
    }
}

fn signature_push(signature: &[u8; keys::SIGNATURE_LEN]) -> Vec<u8> {
    let mut push = Vec::with_capacity(SIGNATURE_SCRIPT_LEN);
    push.push(keys::SIGNATURE_LEN as u8);
    push.extend_from_slice(signature);
    push
}

impl<S: UtxoSource> Wallet for LocalWallet<S> {
    fn create_transaction(&self, from: &str, to: &str, amount: Fixed64, fee: Fixed64) -> Result<Transaction> {
        let transfer = Transfer {
            address: to.to_string(),
            amount,
        };
        self.build_transfer(from, &[transfer], fee, 0)
    }

    fn create_locked_transaction(
        &self,
        from: &str,
        to: &str,
        amount: Fixed64,
        fee: Fixed64,
        lock: u32,
    ) -> Result<Transaction> {
        let transfer = Transfer {
            address: to.to_string(),
            amount,
        };
        self.build_transfer(from, &[transfer], fee, lock)
    }

    fn create_cross_chain_transaction(
        &self,
        from: &str,
        to: &str,
        cross_chain_address: &str,
        amount: Fixed64,
        fee: Fixed64,
    ) -> Result<Transaction> {
        let payload = Payload::TransferCrossChainAsset(TransferCrossChainAsset {
            cross_chain_addresses: vec![cross_chain_address.to_string()],
            output_indexes: vec![0],
            cross_chain_amounts: vec![amount],
        });
        let outputs = vec![Self::output_to(to, amount, 0)?];
        let spend = Spend {
            code: self.code_for(from)?,
            parameter: Vec::new(),
        };
        self.build(from, payload, outputs, fee, Fixed64::ZERO, spend)
    }

    fn create_multi_output_transaction(
        &self,
        from: &str,
        fee: Fixed64,
        outputs: &[Transfer],
    ) -> Result<Transaction> {
        self.build_transfer(from, outputs, fee, 0)
    }

    fn create_locked_multi_output_transaction(
        &self,
        from: &str,
        fee: Fixed64,
        lock: u32,
        outputs: &[Transfer],
    ) -> Result<Transaction> {
        self.build_transfer(from, outputs, fee, lock)
    }

    fn create_verify_transaction(
        &self,
        from: &str,
        to: &str,
        amount: Fixed64,
        fee: Fixed64,
        parameter: &[u8],
    ) -> Result<Transaction> {
        let code = self.code_for(from)?;
        if script_type(&code) != ScriptType::SmartContract {
            return Err(WalletCliError::user_input(format!(
                "{} is not a contract address",
                from
            )));
        }
        let outputs = vec![Self::output_to(to, amount, 0)?];
        let spend = Spend {
            code,
            parameter: parameter.to_vec(),
        };
        self.build(from, Payload::TransferAsset, outputs, fee, Fixed64::ZERO, spend)
    }

    fn create_deploy_transaction(&self, request: &DeployRequest) -> Result<Transaction> {
        let payload = Payload::Deploy(DeployPayload {
            code: FunctionCode {
                code: request.code.clone(),
                parameter_types: request.parameter_types.clone(),
                return_type: request.return_type,
            },
            name: request.info.name.clone(),
            code_version: request.info.version.clone(),
            author: request.info.author.clone(),
            email: request.info.email.clone(),
            description: request.info.description.clone(),
            program_hash: program_hash_from_address(&request.from)?,
            gas: request.gas,
        });
        let spend = Spend {
            code: self.code_for(&request.from)?,
            parameter: Vec::new(),
        };
        self.build(&request.from, payload, Vec::new(), request.fee, request.gas, spend)
    }

    fn create_invoke_transaction(&self, request: &InvokeRequest) -> Result<Transaction> {
        let payload = Payload::Invoke(InvokePayload {
            code_hash: request.code_hash,
            code: request.program.clone(),
            program_hash: program_hash_from_address(&request.from)?,
            gas: request.gas,
        });
        let mut outputs = Vec::new();
        match &request.to {
            Some(to) => outputs.push(Self::output_to(to, request.amount, 0)?),
            None if request.amount > Fixed64::ZERO => {
                let contract = address_from_program_hash(&request.code_hash);
                outputs.push(Self::output_to(&contract, request.amount, 0)?);
            }
            None => {}
        }
        let spend = Spend {
            code: self.code_for(&request.from)?,
            parameter: Vec::new(),
        };
        self.build(&request.from, payload, outputs, request.fee, request.gas, spend)
    }

    fn sign(&self, password: &[u8], txn: &mut Transaction) -> Result<()> {
        let keypair = self.keystore.unlock(password)?;
        let own_key = keypair.public_key_bytes();
        let message = txn.serialize_unsigned();

        let mut signed = 0;
        for program in txn.programs.iter_mut() {
            match script_type(&program.code) {
                ScriptType::Standard => {
                    if program.parameter.is_empty() && public_keys(&program.code).contains(&own_key) {
                        program.parameter = signature_push(&keypair.sign(&message));
                        signed += 1;
                    }
                }
                ScriptType::MultiSig | ScriptType::CrossChain => {
                    if !public_keys(&program.code).contains(&own_key) {
                        continue;
                    }
                    let already = program
                        .parameter
                        .chunks(SIGNATURE_SCRIPT_LEN)
                        .any(|chunk| chunk.len() == SIGNATURE_SCRIPT_LEN && keys::verify(&own_key, &message, &chunk[1..]));
                    if !already {
                        program
                            .parameter
                            .extend_from_slice(&signature_push(&keypair.sign(&message)));
                        signed += 1;
                    }
                }
                ScriptType::SmartContract => {
                    if !program.parameter.is_empty() {
                        continue;
                    }
                    if let Some(parameter) = self.contract_signatures(&program.code, &keypair, &message)? {
                        program.parameter = parameter;
                        signed += 1;
                    }
                }
                ScriptType::Unknown => {}
            }
        }

        if signed == 0 {
            return Err(WalletCliError::wallet(
                "no program in this transaction can be signed by this wallet",
            ));
        }
        info!("added {} signature(s)", signed);
        Ok(())
    }

    fn get_addresses(&self) -> Result<Vec<AddressInfo>> {
        let mut addresses = Vec::new();
        let account = self.account_code()?;
        let hash = to_program_hash(&account)?;
        addresses.push(AddressInfo {
            address: address_from_program_hash(&hash),
            program_hash: hash,
            kind: script_type(&account),
            code: account,
        });
        for contract in self.keystore.contracts()? {
            addresses.push(AddressInfo {
                address: address_from_program_hash(&contract.program_hash),
                program_hash: contract.program_hash,
                kind: script_type(&contract.code),
                code: contract.code,
            });
        }
        Ok(addresses)
    }

    fn add_contract_address(&mut self, contract: Contract) -> Result<()> {
        if self.keystore.add_contract(&contract)? {
            self.keystore.save(&self.path)?;
            info!(
                "registered contract address {}",
                address_from_program_hash(&contract.program_hash)
            );
        }
        Ok(())
    }
}

/// Program hash owned by the wallet account.
pub fn account_program_hash(keystore: &Keystore) -> Result<Uint168> {
    to_program_hash(&standard_redeem_script(&keystore.public_key_bytes()?)?)
}
