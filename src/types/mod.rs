pub mod common;
pub mod serialization;
pub mod transaction;

pub use common::{Fixed64, Uint168, Uint256, COIN, SYSTEM_ASSET_ID};
pub use transaction::{
    Attribute, DeployPayload, FunctionCode, Input, InvokePayload, OutPoint, Output, Payload,
    Program, Transaction, TransactionType, TransferCrossChainAsset,
};
