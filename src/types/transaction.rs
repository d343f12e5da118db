//! Canonical side-chain transaction encoding.
//!
//! `tx_type u8 | payload_version u8 | payload | attributes | inputs | outputs |
//! lock_time u32 | programs`, little-endian with var-uint list lengths. The
//! unsigned form (what gets signed and hashed) stops before `programs`.

use sha2::{Digest, Sha256};

use super::common::{Fixed64, Uint168, Uint256};
use super::serialization::{write_var_bytes, write_var_string, write_var_uint, Reader};
use crate::error::{Result, WalletCliError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TransactionType {
    TransferAsset = 0x02,
    TransferCrossChainAsset = 0x08,
    Deploy = 0xf0,
    Invoke = 0xf1,
}

impl TryFrom<u8> for TransactionType {
    type Error = WalletCliError;

    fn try_from(b: u8) -> Result<Self> {
        match b {
            0x02 => Ok(TransactionType::TransferAsset),
            0x08 => Ok(TransactionType::TransferCrossChainAsset),
            0xf0 => Ok(TransactionType::Deploy),
            0xf1 => Ok(TransactionType::Invoke),
            other => Err(WalletCliError::format(format!(
                "unsupported transaction type 0x{:02x}",
                other
            ))),
        }
    }
}

/// Attribute usage tag for the random nonce that keeps otherwise identical
/// transactions distinct.
pub const ATTRIBUTE_NONCE: u8 = 0x00;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub usage: u8,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutPoint {
    pub txid: Uint256,
    pub index: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub previous: OutPoint,
    pub sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub asset_id: Uint256,
    pub value: Fixed64,
    pub output_lock: u32,
    pub program_hash: Uint168,
}

/// Redeem script plus the signature parameter that satisfies it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
    pub code: Vec<u8>,
    pub parameter: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransferCrossChainAsset {
    pub cross_chain_addresses: Vec<String>,
    pub output_indexes: Vec<u64>,
    pub cross_chain_amounts: Vec<Fixed64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FunctionCode {
    pub code: Vec<u8>,
    pub parameter_types: Vec<u8>,
    pub return_type: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeployPayload {
    pub code: FunctionCode,
    pub name: String,
    pub code_version: String,
    pub author: String,
    pub email: String,
    pub description: String,
    pub program_hash: Uint168,
    pub gas: Fixed64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InvokePayload {
    pub code_hash: Uint168,
    pub code: Vec<u8>,
    pub program_hash: Uint168,
    pub gas: Fixed64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    TransferAsset,
    TransferCrossChainAsset(TransferCrossChainAsset),
    Deploy(DeployPayload),
    Invoke(InvokePayload),
}

impl Payload {
    pub fn tx_type(&self) -> TransactionType {
        match self {
            Payload::TransferAsset => TransactionType::TransferAsset,
            Payload::TransferCrossChainAsset(_) => TransactionType::TransferCrossChainAsset,
            Payload::Deploy(_) => TransactionType::Deploy,
            Payload::Invoke(_) => TransactionType::Invoke,
        }
    }

    fn serialize(&self, out: &mut Vec<u8>) {
        match self {
            Payload::TransferAsset => {}
            Payload::TransferCrossChainAsset(p) => {
                write_var_uint(out, p.cross_chain_addresses.len() as u64);
                for i in 0..p.cross_chain_addresses.len() {
                    write_var_string(out, &p.cross_chain_addresses[i]);
                    write_var_uint(out, p.output_indexes.get(i).copied().unwrap_or_default());
                    let amount = p.cross_chain_amounts.get(i).copied().unwrap_or_default();
                    out.extend_from_slice(&amount.0.to_le_bytes());
                }
            }
            Payload::Deploy(p) => {
                write_var_bytes(out, &p.code.code);
                write_var_bytes(out, &p.code.parameter_types);
                out.push(p.code.return_type);
                write_var_string(out, &p.name);
                write_var_string(out, &p.code_version);
                write_var_string(out, &p.author);
                write_var_string(out, &p.email);
                write_var_string(out, &p.description);
                out.extend_from_slice(p.program_hash.as_bytes());
                out.extend_from_slice(&p.gas.0.to_le_bytes());
            }
            Payload::Invoke(p) => {
                out.extend_from_slice(p.code_hash.as_bytes());
                write_var_bytes(out, &p.code);
                out.extend_from_slice(p.program_hash.as_bytes());
                out.extend_from_slice(&p.gas.0.to_le_bytes());
            }
        }
    }

    fn deserialize(tx_type: TransactionType, r: &mut Reader<'_>) -> Result<Self> {
        Ok(match tx_type {
            TransactionType::TransferAsset => Payload::TransferAsset,
            TransactionType::TransferCrossChainAsset => {
                let n = r.read_count()?;
                let mut p = TransferCrossChainAsset::default();
                for _ in 0..n {
                    p.cross_chain_addresses.push(r.read_var_string()?);
                    p.output_indexes.push(r.read_var_uint()?);
                    p.cross_chain_amounts.push(Fixed64(r.read_i64_le()?));
                }
                Payload::TransferCrossChainAsset(p)
            }
            TransactionType::Deploy => Payload::Deploy(DeployPayload {
                code: FunctionCode {
                    code: r.read_var_bytes()?,
                    parameter_types: r.read_var_bytes()?,
                    return_type: r.read_u8()?,
                },
                name: r.read_var_string()?,
                code_version: r.read_var_string()?,
                author: r.read_var_string()?,
                email: r.read_var_string()?,
                description: r.read_var_string()?,
                program_hash: Uint168(r.read_array()?),
                gas: Fixed64(r.read_i64_le()?),
            }),
            TransactionType::Invoke => Payload::Invoke(InvokePayload {
                code_hash: Uint168(r.read_array()?),
                code: r.read_var_bytes()?,
                program_hash: Uint168(r.read_array()?),
                gas: Fixed64(r.read_i64_le()?),
            }),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub payload_version: u8,
    pub payload: Payload,
    pub attributes: Vec<Attribute>,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub lock_time: u32,
    pub programs: Vec<Program>,
}

impl Transaction {
    pub fn new(payload: Payload) -> Self {
        Transaction {
            payload_version: 0,
            payload,
            attributes: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
            programs: Vec::new(),
        }
    }

    pub fn tx_type(&self) -> TransactionType {
        self.payload.tx_type()
    }

    /// Everything but the programs; this is the signed message.
    pub fn serialize_unsigned(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_unsigned(&mut out);
        out
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_unsigned(&mut out);
        write_var_uint(&mut out, self.programs.len() as u64);
        for program in &self.programs {
            write_var_bytes(&mut out, &program.parameter);
            write_var_bytes(&mut out, &program.code);
        }
        out
    }

    fn write_unsigned(&self, out: &mut Vec<u8>) {
        out.push(self.tx_type() as u8);
        out.push(self.payload_version);
        self.payload.serialize(out);

        write_var_uint(out, self.attributes.len() as u64);
        for attr in &self.attributes {
            out.push(attr.usage);
            write_var_bytes(out, &attr.data);
        }

        write_var_uint(out, self.inputs.len() as u64);
        for input in &self.inputs {
            out.extend_from_slice(&input.previous.txid.0);
            out.extend_from_slice(&input.previous.index.to_le_bytes());
            out.extend_from_slice(&input.sequence.to_le_bytes());
        }

        write_var_uint(out, self.outputs.len() as u64);
        for output in &self.outputs {
            out.extend_from_slice(&output.asset_id.0);
            out.extend_from_slice(&output.value.0.to_le_bytes());
            out.extend_from_slice(&output.output_lock.to_le_bytes());
            out.extend_from_slice(output.program_hash.as_bytes());
        }

        out.extend_from_slice(&self.lock_time.to_le_bytes());
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        let tx_type = TransactionType::try_from(r.read_u8()?)?;
        let payload_version = r.read_u8()?;
        let payload = Payload::deserialize(tx_type, &mut r)?;

        let n = r.read_count()?;
        let mut attributes = Vec::with_capacity(n);
        for _ in 0..n {
            attributes.push(Attribute {
                usage: r.read_u8()?,
                data: r.read_var_bytes()?,
            });
        }

        let n = r.read_count()?;
        let mut inputs = Vec::with_capacity(n);
        for _ in 0..n {
            inputs.push(Input {
                previous: OutPoint {
                    txid: Uint256(r.read_array()?),
                    index: r.read_u16_le()?,
                },
                sequence: r.read_u32_le()?,
            });
        }

        let n = r.read_count()?;
        let mut outputs = Vec::with_capacity(n);
        for _ in 0..n {
            outputs.push(Output {
                asset_id: Uint256(r.read_array()?),
                value: Fixed64(r.read_i64_le()?),
                output_lock: r.read_u32_le()?,
                program_hash: Uint168(r.read_array()?),
            });
        }

        let lock_time = r.read_u32_le()?;

        let n = r.read_count()?;
        let mut programs = Vec::with_capacity(n);
        for _ in 0..n {
            let parameter = r.read_var_bytes()?;
            let code = r.read_var_bytes()?;
            programs.push(Program { code, parameter });
        }

        if r.remaining() != 0 {
            return Err(WalletCliError::format(format!(
                "{} trailing bytes after transaction",
                r.remaining()
            )));
        }

        Ok(Transaction {
            payload_version,
            payload,
            attributes,
            inputs,
            outputs,
            lock_time,
            programs,
        })
    }

    /// Double SHA-256 of the unsigned encoding.
    pub fn hash(&self) -> Uint256 {
        let first = Sha256::digest(self.serialize_unsigned());
        let second = Sha256::digest(first);
        let mut out = [0u8; 32];
        out.copy_from_slice(&second);
        Uint256(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::common::SYSTEM_ASSET_ID;

    fn sample_transfer() -> Transaction {
        let mut txn = Transaction::new(Payload::TransferAsset);
        txn.attributes.push(Attribute {
            usage: ATTRIBUTE_NONCE,
            data: vec![1, 2, 3, 4],
        });
        txn.inputs.push(Input {
            previous: OutPoint {
                txid: Uint256([7; 32]),
                index: 1,
            },
            sequence: u32::MAX,
        });
        txn.outputs.push(Output {
            asset_id: SYSTEM_ASSET_ID,
            value: Fixed64(150_000_000),
            output_lock: 0,
            program_hash: Uint168([0x21; 21]),
        });
        txn.programs.push(Program {
            code: vec![0x21; 35],
            parameter: vec![],
        });
        txn
    }

    #[test]
    fn transfer_layout() {
        let txn = sample_transfer();
        let bytes = txn.serialize_unsigned();
        assert_eq!(bytes[0], 0x02);
        assert_eq!(bytes[1], 0x00);
        // one attribute: usage, len, data
        assert_eq!(&bytes[2..8], &[1u8, 0x00, 0x04, 1, 2, 3]);
        let expected_len = 2 + (1 + 1 + 1 + 4) + (1 + 32 + 2 + 4) + (1 + 32 + 8 + 4 + 21) + 4;
        assert_eq!(bytes.len(), expected_len);
        assert!(txn.serialize().starts_with(&bytes));
    }

    #[test]
    fn deserialize_inverts_serialize() {
        let txn = sample_transfer();
        let decoded = Transaction::deserialize(&txn.serialize()).unwrap();
        assert_eq!(decoded, txn);
        assert_eq!(decoded.hash(), txn.hash());
    }

    #[test]
    fn contract_payloads_decode() {
        let mut deploy = Transaction::new(Payload::Deploy(DeployPayload {
            code: FunctionCode {
                code: vec![0x51, 0x1c],
                parameter_types: vec![0x02, 0x07],
                return_type: 0xff,
            },
            name: "token".into(),
            gas: Fixed64(1_000_000_000),
            ..DeployPayload::default()
        }));
        deploy.lock_time = 9;
        let invoke = Transaction::new(Payload::Invoke(InvokePayload {
            code_hash: Uint168([0x1c; 21]),
            code: vec![0x00, 0x69],
            ..InvokePayload::default()
        }));
        let cross = Transaction::new(Payload::TransferCrossChainAsset(TransferCrossChainAsset {
            cross_chain_addresses: vec!["EXyz".into()],
            output_indexes: vec![0],
            cross_chain_amounts: vec![Fixed64(5)],
        }));
        for txn in [deploy, invoke, cross] {
            assert_eq!(Transaction::deserialize(&txn.serialize()).unwrap(), txn);
        }
    }

    #[test]
    fn rejects_unknown_type_and_trailing_bytes() {
        assert!(Transaction::deserialize(&[0x99, 0x00]).is_err());
        let mut bytes = sample_transfer().serialize();
        bytes.push(0);
        assert!(matches!(
            Transaction::deserialize(&bytes),
            Err(WalletCliError::Format(_))
        ));
    }
}
