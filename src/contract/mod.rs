pub mod encoder;
pub mod program;

use serde::{Deserialize, Serialize};

use crate::crypto::address::to_program_hash;
use crate::error::{Result, WalletCliError};
use crate::types::Uint168;

pub use encoder::{encode, encode_json, EncodingError, Parameter, ParameterValue};
pub use program::ProgramBuilder;

/// Contract parameter and return types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ParameterType {
    Signature = 0x00,
    Boolean = 0x01,
    Integer = 0x02,
    Hash160 = 0x03,
    Hash256 = 0x04,
    ByteArray = 0x05,
    PublicKey = 0x06,
    String = 0x07,
    Hash168 = 0x08,
    Array = 0x10,
    InteropInterface = 0xf0,
    Void = 0xff,
}

const TYPE_TABLE: [(&str, ParameterType); 12] = [
    ("signature", ParameterType::Signature),
    ("boolean", ParameterType::Boolean),
    ("integer", ParameterType::Integer),
    ("hash160", ParameterType::Hash160),
    ("hash256", ParameterType::Hash256),
    ("bytearray", ParameterType::ByteArray),
    ("publickey", ParameterType::PublicKey),
    ("string", ParameterType::String),
    ("hash168", ParameterType::Hash168),
    ("array", ParameterType::Array),
    ("interopinterface", ParameterType::InteropInterface),
    ("void", ParameterType::Void),
];

impl ParameterType {
    /// Case-sensitive lookup of a type tag.
    pub fn from_name(name: &str) -> Option<Self> {
        TYPE_TABLE
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, t)| *t)
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        TYPE_TABLE
            .iter()
            .find(|(_, t)| *t as u8 == b)
            .map(|(_, t)| *t)
    }

    pub fn name(&self) -> &'static str {
        TYPE_TABLE
            .iter()
            .find(|(_, t)| t == self)
            .map(|(n, _)| *n)
            .unwrap_or("void")
    }
}

pub fn parameter_types_from_bytes(bytes: &[u8]) -> Result<Vec<ParameterType>> {
    bytes
        .iter()
        .map(|b| {
            ParameterType::from_byte(*b).ok_or_else(|| {
                WalletCliError::user_input(format!("unknown parameter type byte 0x{:02x}", b))
            })
        })
        .collect()
}

/// Deployed contract the wallet can spend from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    pub code: Vec<u8>,
    pub parameters: Vec<ParameterType>,
    pub program_hash: Uint168,
}

impl Contract {
    /// `code` must already carry its trailing script marker.
    pub fn new(code: Vec<u8>, parameters: Vec<ParameterType>) -> Result<Self> {
        let program_hash = to_program_hash(&code)?;
        Ok(Contract {
            code,
            parameters,
            program_hash,
        })
    }

    pub fn parameter_bytes(&self) -> Vec<u8> {
        self.parameters.iter().map(|p| *p as u8).collect()
    }
}
