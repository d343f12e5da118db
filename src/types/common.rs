use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, WalletCliError};

/// Base units per coin.
pub const COIN: i64 = 100_000_000;
const DECIMALS: usize = 8;

/// Fixed-point currency amount with eight decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Fixed64(pub i64);

impl Fixed64 {
    pub const ZERO: Fixed64 = Fixed64(0);

    pub fn from_coins(coins: i64) -> Option<Self> {
        coins.checked_mul(COIN).map(Fixed64)
    }

    pub fn checked_add(self, other: Fixed64) -> Option<Fixed64> {
        self.0.checked_add(other.0).map(Fixed64)
    }

    pub fn checked_sub(self, other: Fixed64) -> Option<Fixed64> {
        self.0.checked_sub(other.0).map(Fixed64)
    }
}

impl FromStr for Fixed64 {
    type Err = WalletCliError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || WalletCliError::user_input(format!("invalid amount: {:?}", s));

        // Amounts typed by users are never signed.
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if frac.len() > DECIMALS {
            return Err(invalid());
        }
        if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let mut frac_units: i64 = 0;
        for (i, c) in frac.chars().enumerate() {
            let digit = i64::from(c as u8 - b'0');
            frac_units += digit * 10_i64.pow((DECIMALS - 1 - i) as u32);
        }

        let units = whole
            .checked_mul(COIN)
            .and_then(|w| w.checked_add(frac_units))
            .ok_or_else(invalid)?;
        Ok(Fixed64(units))
    }
}

impl fmt::Display for Fixed64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.0.unsigned_abs();
        let sign = if self.0 < 0 { "-" } else { "" };
        let whole = value / COIN as u64;
        let frac = value % COIN as u64;
        if frac == 0 {
            write!(f, "{}{}", sign, whole)
        } else {
            write!(f, "{}{}.{:08}", sign, whole, frac)
        }
    }
}

/// 21-byte program hash: one prefix byte followed by ripemd160(sha256(code)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Uint168(pub [u8; 21]);

impl Uint168 {
    pub const LEN: usize = 21;

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 21] = bytes.try_into().map_err(|_| {
            WalletCliError::format(format!(
                "program hash must be {} bytes, got {}",
                Self::LEN,
                bytes.len()
            ))
        })?;
        Ok(Uint168(arr))
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        Self::from_bytes(&hex::decode(s.trim())?)
    }

    pub fn prefix(&self) -> u8 {
        self.0[0]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Uint168 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// 32-byte hash. Displayed byte-reversed, the way nodes print txids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Uint256(pub [u8; 32]);

impl Uint256 {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| {
            WalletCliError::format(format!("hash must be 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Uint256(arr))
    }

    /// Parse the reversed hex form printed by [`fmt::Display`].
    pub fn from_reversed_hex(s: &str) -> Result<Self> {
        let mut bytes = hex::decode(s.trim())?;
        bytes.reverse();
        Self::from_bytes(&bytes)
    }
}

impl fmt::Display for Uint256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        f.write_str(&hex::encode(reversed))
    }
}

/// Native asset of the side chain.
pub const SYSTEM_ASSET_ID: Uint256 = Uint256([
    0xb0, 0x37, 0xdb, 0x96, 0x4a, 0x23, 0x14, 0x58, 0xd2, 0xd6, 0xff, 0xd5, 0xea, 0x18, 0x94, 0x4c,
    0x4f, 0x90, 0xe6, 0x3d, 0x54, 0x7c, 0x5d, 0x3b, 0x98, 0x74, 0xdf, 0x66, 0xa4, 0xea, 0xd0, 0xa3,
]);
