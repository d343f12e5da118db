use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::contract::program::op;
use crate::error::{Result, WalletCliError};
use crate::types::Uint168;

pub const PREFIX_STANDARD: u8 = 0x21;
pub const PREFIX_MULTISIG: u8 = 0x12;
pub const PREFIX_CROSS_CHAIN: u8 = 0x4b;
pub const PREFIX_SMART_CONTRACT: u8 = 0x1c;

/// Program hash of a redeem script. The prefix follows the script's last
/// opcode.
pub fn to_program_hash(code: &[u8]) -> Result<Uint168> {
    let prefix = match code.last() {
        Some(&op::CHECKSIG) => PREFIX_STANDARD,
        Some(&op::CHECKMULTISIG) => PREFIX_MULTISIG,
        Some(&op::CROSSCHAIN) => PREFIX_CROSS_CHAIN,
        Some(&op::SMARTCONTRACT) => PREFIX_SMART_CONTRACT,
        Some(other) => {
            return Err(WalletCliError::ScriptClassification(format!(
                "unknown code sign type 0x{:02x}",
                other
            )))
        }
        None => {
            return Err(WalletCliError::ScriptClassification(
                "empty redeem script".into(),
            ))
        }
    };

    let digest = Ripemd160::digest(Sha256::digest(code));
    let mut out = [0u8; 21];
    out[0] = prefix;
    out[1..].copy_from_slice(&digest);
    Ok(Uint168(out))
}

fn checksum(data: &[u8]) -> [u8; 4] {
    let twice = Sha256::digest(Sha256::digest(data));
    let mut out = [0u8; 4];
    out.copy_from_slice(&twice[..4]);
    out
}

pub fn address_from_program_hash(hash: &Uint168) -> String {
    let mut data = hash.0.to_vec();
    data.extend_from_slice(&checksum(&hash.0));
    bs58::encode(data).into_string()
}

pub fn program_hash_from_address(address: &str) -> Result<Uint168> {
    let invalid = |why: &str| WalletCliError::user_input(format!("invalid address {:?}: {}", address, why));

    let data = bs58::decode(address.trim())
        .into_vec()
        .map_err(|_| invalid("not base58"))?;
    if data.len() != Uint168::LEN + 4 {
        return Err(invalid("wrong length"));
    }
    let (hash, check) = data.split_at(Uint168::LEN);
    if checksum(hash) != check {
        return Err(invalid("checksum mismatch"));
    }
    Uint168::from_bytes(hash)
}

pub fn is_smart_contract_address(address: &str) -> Result<bool> {
    Ok(program_hash_from_address(address)?.prefix() == PREFIX_SMART_CONTRACT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(vec![0x51, op::CHECKSIG], PREFIX_STANDARD)]
    #[case(vec![0x51, op::CHECKMULTISIG], PREFIX_MULTISIG)]
    #[case(vec![0x51, op::CROSSCHAIN], PREFIX_CROSS_CHAIN)]
    #[case(vec![0x51, op::SMARTCONTRACT], PREFIX_SMART_CONTRACT)]
    fn prefix_follows_last_opcode(#[case] code: Vec<u8>, #[case] prefix: u8) {
        assert_eq!(to_program_hash(&code).unwrap().prefix(), prefix);
    }

    #[test]
    fn unknown_script_has_no_program_hash() {
        assert!(to_program_hash(&[0x51]).is_err());
        assert!(to_program_hash(&[]).is_err());
    }

    #[test]
    fn address_round_trip() {
        let hash = to_program_hash(&[0x00, op::SMARTCONTRACT]).unwrap();
        let address = address_from_program_hash(&hash);
        assert_eq!(program_hash_from_address(&address).unwrap(), hash);
        assert!(is_smart_contract_address(&address).unwrap());
    }

    #[test]
    fn corrupted_address_rejected() {
        let address = address_from_program_hash(&Uint168([PREFIX_STANDARD; 21]));
        let mut chars: Vec<char> = address.chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == '1' { '2' } else { '1' };
        let corrupted: String = chars.into_iter().collect();
        assert!(program_hash_from_address(&corrupted).is_err());
        assert!(program_hash_from_address("0OIl").is_err());
    }
}
