//! Redeem script shapes and raw signature counting.

use crate::contract::program::{op, ProgramBuilder};
use crate::crypto::keys::{compress, validate_public_key, PUBLIC_KEY_LEN, SIGNATURE_LEN};
use crate::error::{Result, WalletCliError};

/// A signature push inside a program parameter: `0x40 || r || s`.
pub const SIGNATURE_SCRIPT_LEN: usize = SIGNATURE_LEN + 1;

/// `PUSHBYTES33 <key> CHECKSIG`
pub const STANDARD_SCRIPT_LEN: usize = PUBLIC_KEY_LEN + 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptType {
    Standard,
    MultiSig,
    CrossChain,
    SmartContract,
    Unknown,
}

pub fn script_type(code: &[u8]) -> ScriptType {
    match code.last() {
        Some(&op::CHECKSIG) if code.len() == STANDARD_SCRIPT_LEN => ScriptType::Standard,
        Some(&op::CHECKMULTISIG) => ScriptType::MultiSig,
        Some(&op::CROSSCHAIN) => ScriptType::CrossChain,
        Some(&op::SMARTCONTRACT) => ScriptType::SmartContract,
        _ => ScriptType::Unknown,
    }
}

pub fn standard_redeem_script(public_key: &[u8]) -> Result<Vec<u8>> {
    let key = validate_public_key(public_key)?;
    let mut builder = ProgramBuilder::new();
    builder.push_bytes(&compress(&key));
    builder.emit(op::CHECKSIG);
    Ok(builder.into_bytes())
}

/// `PUSH<m> <sorted keys> PUSH<n> CHECKMULTISIG`
pub fn multisig_redeem_script(required: usize, public_keys: &[Vec<u8>]) -> Result<Vec<u8>> {
    if required == 0 || required > public_keys.len() || public_keys.len() > 16 {
        return Err(WalletCliError::user_input(format!(
            "invalid multi-sign threshold {} of {}",
            required,
            public_keys.len()
        )));
    }
    let mut keys = public_keys
        .iter()
        .map(|k| validate_public_key(k).map(|pk| compress(&pk)))
        .collect::<Result<Vec<_>>>()?;
    keys.sort_by(|a, b| a[1..].cmp(&b[1..]));

    let mut builder = ProgramBuilder::new();
    builder.push_integer(required as i64);
    for key in &keys {
        builder.push_bytes(key);
    }
    builder.push_integer(keys.len() as i64);
    builder.emit(op::CHECKMULTISIG);
    Ok(builder.into_bytes())
}

/// Public keys embedded in a standard or multi-signature script, in script
/// order.
pub fn public_keys(code: &[u8]) -> Vec<[u8; PUBLIC_KEY_LEN]> {
    let mut keys = Vec::new();
    let mut rest = match script_type(code) {
        ScriptType::Standard => code,
        ScriptType::MultiSig | ScriptType::CrossChain => code.get(1..).unwrap_or_default(),
        ScriptType::SmartContract | ScriptType::Unknown => return keys,
    };
    while let Some((&len, tail)) = rest.split_first() {
        if usize::from(len) != PUBLIC_KEY_LEN || tail.len() < PUBLIC_KEY_LEN {
            break;
        }
        let mut key = [0u8; PUBLIC_KEY_LEN];
        key.copy_from_slice(&tail[..PUBLIC_KEY_LEN]);
        keys.push(key);
        rest = &tail[PUBLIC_KEY_LEN..];
    }
    keys
}

/// Reports how many signatures a redeem script carries and needs.
pub trait SignatureCounter {
    /// `(have, need)`, or `(0, 0)` when the script encodes no threshold.
    fn raw_counts(&self, code: &[u8], param: &[u8]) -> Result<(usize, usize)>;
}

/// Counts signatures for the script shapes the chain defines.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptTable;

impl SignatureCounter for ScriptTable {
    fn raw_counts(&self, code: &[u8], param: &[u8]) -> Result<(usize, usize)> {
        let have = param.len() / SIGNATURE_SCRIPT_LEN;
        match script_type(code) {
            ScriptType::Standard => Ok((have, 1)),
            ScriptType::MultiSig | ScriptType::CrossChain => {
                let first = code[0];
                if !(op::PUSH1..=op::PUSH16).contains(&first) {
                    return Err(WalletCliError::ScriptClassification(format!(
                        "multi-sign script starts with 0x{:02x}",
                        first
                    )));
                }
                Ok((have, usize::from(first - op::PUSH1) + 1))
            }
            ScriptType::SmartContract | ScriptType::Unknown => Ok((0, 0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::KeyPair;

    #[test]
    fn standard_script_shape() {
        let pair = KeyPair::generate();
        let code = standard_redeem_script(&pair.public_key_bytes()).unwrap();
        assert_eq!(code.len(), STANDARD_SCRIPT_LEN);
        assert_eq!(code[0], 33);
        assert_eq!(script_type(&code), ScriptType::Standard);
        assert_eq!(public_keys(&code), vec![pair.public_key_bytes()]);
    }

    #[test]
    fn multisig_counts() {
        let keys: Vec<Vec<u8>> = (0..3)
            .map(|_| KeyPair::generate().public_key_bytes().to_vec())
            .collect();
        let code = multisig_redeem_script(2, &keys).unwrap();
        assert_eq!(code[0], op::PUSH1 + 1);
        assert_eq!(code[code.len() - 2], op::PUSH1 + 2);
        assert_eq!(script_type(&code), ScriptType::MultiSig);
        assert_eq!(public_keys(&code).len(), 3);

        let param = vec![0u8; SIGNATURE_SCRIPT_LEN];
        assert_eq!(ScriptTable.raw_counts(&code, &param).unwrap(), (1, 2));
        assert_eq!(ScriptTable.raw_counts(&code, &[]).unwrap(), (0, 2));
    }

    #[test]
    fn multisig_threshold_validated() {
        let keys = vec![KeyPair::generate().public_key_bytes().to_vec()];
        assert!(multisig_redeem_script(0, &keys).is_err());
        assert!(multisig_redeem_script(2, &keys).is_err());
    }

    #[test]
    fn unknown_scripts_report_nothing() {
        assert_eq!(ScriptTable.raw_counts(&[0x51], &[0x01]).unwrap(), (0, 0));
        assert_eq!(
            ScriptTable.raw_counts(&[0x00, op::SMARTCONTRACT], &[]).unwrap(),
            (0, 0)
        );
        assert!(ScriptTable.raw_counts(&[0x00, op::CHECKMULTISIG], &[]).is_err());
    }
}
