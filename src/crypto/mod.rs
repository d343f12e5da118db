pub mod address;
pub mod keys;
pub mod script;
pub mod sign_status;

pub use address::{
    address_from_program_hash, program_hash_from_address, to_program_hash, PREFIX_CROSS_CHAIN,
    PREFIX_MULTISIG, PREFIX_SMART_CONTRACT, PREFIX_STANDARD,
};
pub use keys::KeyPair;
pub use script::{ScriptTable, ScriptType, SignatureCounter};
pub use sign_status::{classify, SigningProgress};
