//! Command line wallet for a smart-contract side chain.
//!
//! Builds, signs and broadcasts transactions: plain and locked transfers,
//! multi-output transfers, cross-chain deposits and withdrawals, and contract
//! deploy, invoke and verification.

pub mod config;
pub mod contract;
pub mod crypto;
pub mod error;
pub mod rpc;
pub mod types;
pub mod wallet;

pub use error::{Result, WalletCliError};
