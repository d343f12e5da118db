//! Encrypted keystore file.
//!
//! One P-256 account per file. The secret scalar is sealed with
//! XChaCha20-Poly1305 under a key derived from the password by Argon2id; the
//! salt, nonce and KDF cost are bound in as associated data. The public key
//! and registered contracts are kept in clear so addresses can be listed
//! without the password.

use std::path::Path;

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::aead::{Aead, Payload};
use chacha20poly1305::{KeyInit, XChaCha20Poly1305, XNonce};
use log::info;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::contract::{parameter_types_from_bytes, Contract};
use crate::crypto::keys::{validate_public_key, KeyPair};
use crate::error::{Result, WalletCliError};

const KEYSTORE_VERSION: u8 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub time: u32,
    pub mem_kib: u32,
    pub lanes: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        KdfParams {
            time: 3,
            mem_kib: 65_536,
            lanes: 1,
        }
    }
}

impl KdfParams {
    fn validate(&self) -> Result<()> {
        if !(1..=10).contains(&self.time) {
            return Err(WalletCliError::wallet("argon2 time cost out of bounds"));
        }
        if !(8..=4_194_304).contains(&self.mem_kib) {
            return Err(WalletCliError::wallet("argon2 memory out of bounds"));
        }
        if !(1..=8).contains(&self.lanes) {
            return Err(WalletCliError::wallet("argon2 lanes out of bounds"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredContract {
    code: String,
    parameters: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keystore {
    version: u8,
    public_key: String,
    kdf: KdfParams,
    salt: String,
    nonce: String,
    ciphertext: String,
    #[serde(default)]
    contracts: Vec<StoredContract>,
}

fn derive_key(password: &[u8], salt: &[u8], kdf: &KdfParams) -> Result<Zeroizing<[u8; 32]>> {
    let params = Params::new(kdf.mem_kib, kdf.time, kdf.lanes, None)
        .map_err(|e| WalletCliError::wallet(format!("argon2 params: {}", e)))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let mut key = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(password, salt, &mut key[..])
        .map_err(|e| WalletCliError::wallet(format!("argon2: {}", e)))?;
    Ok(key)
}

fn associated_data(kdf: &KdfParams, salt: &[u8], nonce: &[u8]) -> Vec<u8> {
    let mut aad = Vec::with_capacity(8 + 12 + salt.len() + nonce.len());
    aad.extend_from_slice(b"SIDE-KS");
    aad.push(KEYSTORE_VERSION);
    aad.extend_from_slice(&kdf.time.to_le_bytes());
    aad.extend_from_slice(&kdf.mem_kib.to_le_bytes());
    aad.extend_from_slice(&kdf.lanes.to_le_bytes());
    aad.extend_from_slice(salt);
    aad.extend_from_slice(nonce);
    aad
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>> {
    hex::decode(value).map_err(|_| WalletCliError::wallet(format!("keystore {} is not hex", name)))
}

impl Keystore {
    pub fn create(password: &[u8], keypair: &KeyPair) -> Result<Self> {
        Self::create_with_params(password, keypair, KdfParams::default())
    }

    pub fn create_with_params(password: &[u8], keypair: &KeyPair, kdf: KdfParams) -> Result<Self> {
        kdf.validate()?;
        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        rand::thread_rng().fill_bytes(&mut nonce);

        let key = derive_key(password, &salt, &kdf)?;
        let cipher = XChaCha20Poly1305::new_from_slice(&key[..])
            .map_err(|_| WalletCliError::wallet("bad key length"))?;
        let secret = keypair.secret_bytes();
        let aad = associated_data(&kdf, &salt, &nonce);
        let ciphertext = cipher
            .encrypt(
                XNonce::from_slice(&nonce),
                Payload {
                    msg: secret.as_slice(),
                    aad: &aad,
                },
            )
            .map_err(|_| WalletCliError::wallet("encryption failed"))?;

        Ok(Keystore {
            version: KEYSTORE_VERSION,
            public_key: hex::encode(keypair.public_key_bytes()),
            kdf,
            salt: hex::encode(salt),
            nonce: hex::encode(nonce),
            ciphertext: hex::encode(ciphertext),
            contracts: Vec::new(),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| WalletCliError::filesystem(path, e))?;
        let keystore: Keystore = serde_json::from_str(&content)
            .map_err(|e| WalletCliError::wallet(format!("{}: {}", path.display(), e)))?;
        keystore.validate()?;
        Ok(keystore)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| WalletCliError::wallet(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| WalletCliError::filesystem(path, e))?;
        info!("keystore saved to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != KEYSTORE_VERSION {
            return Err(WalletCliError::wallet(format!(
                "unsupported keystore version {}",
                self.version
            )));
        }
        self.kdf.validate()?;
        if decode_field("salt", &self.salt)?.len() != SALT_LEN {
            return Err(WalletCliError::wallet("keystore salt has wrong length"));
        }
        if decode_field("nonce", &self.nonce)?.len() != NONCE_LEN {
            return Err(WalletCliError::wallet("keystore nonce has wrong length"));
        }
        validate_public_key(&self.public_key_bytes()?)?;
        Ok(())
    }

    /// Decrypt the account key. A wrong password fails authentication.
    pub fn unlock(&self, password: &[u8]) -> Result<KeyPair> {
        let salt = decode_field("salt", &self.salt)?;
        let nonce = decode_field("nonce", &self.nonce)?;
        let ciphertext = decode_field("ciphertext", &self.ciphertext)?;
        if nonce.len() != NONCE_LEN {
            return Err(WalletCliError::wallet("keystore nonce has wrong length"));
        }

        let key = derive_key(password, &salt, &self.kdf)?;
        let cipher = XChaCha20Poly1305::new_from_slice(&key[..])
            .map_err(|_| WalletCliError::wallet("bad key length"))?;
        let aad = associated_data(&self.kdf, &salt, &nonce);
        let secret = Zeroizing::new(
            cipher
                .decrypt(
                    XNonce::from_slice(&nonce),
                    Payload {
                        msg: &ciphertext,
                        aad: &aad,
                    },
                )
                .map_err(|_| WalletCliError::wallet("wrong password or corrupted keystore"))?,
        );

        let keypair = KeyPair::from_secret(&secret)?;
        if hex::encode(keypair.public_key_bytes()) != self.public_key {
            return Err(WalletCliError::wallet("keystore public key does not match its secret"));
        }
        Ok(keypair)
    }

    pub fn public_key_bytes(&self) -> Result<Vec<u8>> {
        decode_field("public key", &self.public_key)
    }

    pub fn contracts(&self) -> Result<Vec<Contract>> {
        self.contracts
            .iter()
            .map(|c| {
                let code = decode_field("contract code", &c.code)?;
                let parameters =
                    parameter_types_from_bytes(&decode_field("contract parameters", &c.parameters)?)?;
                Contract::new(code, parameters)
            })
            .collect()
    }

    /// Returns false when a contract with the same program hash is already
    /// registered.
    pub fn add_contract(&mut self, contract: &Contract) -> Result<bool> {
        if self
            .contracts()?
            .iter()
            .any(|c| c.program_hash == contract.program_hash)
        {
            return Ok(false);
        }
        self.contracts.push(StoredContract {
            code: hex::encode(&contract.code),
            parameters: hex::encode(contract.parameter_bytes()),
        });
        Ok(true)
    }
}

#[cfg(test)]
pub(crate) fn test_kdf() -> KdfParams {
    KdfParams {
        time: 1,
        mem_kib: 64,
        lanes: 1,
    }
}
