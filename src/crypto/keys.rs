use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::PublicKey;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::error::{Result, WalletCliError};

pub const PUBLIC_KEY_LEN: usize = 33;
pub const SIGNATURE_LEN: usize = 64;

/// Parse a SEC1 encoded P-256 point, compressed or not.
pub fn validate_public_key(bytes: &[u8]) -> Result<PublicKey> {
    PublicKey::from_sec1_bytes(bytes)
        .map_err(|_| WalletCliError::format(format!("invalid public key {}", hex::encode(bytes))))
}

/// Compressed SEC1 encoding of `key`.
pub fn compress(key: &PublicKey) -> [u8; PUBLIC_KEY_LEN] {
    let point = key.to_encoded_point(true);
    let mut out = [0u8; PUBLIC_KEY_LEN];
    out.copy_from_slice(point.as_bytes());
    out
}

/// Verify a raw `r || s` signature over SHA-256 of `message`.
pub fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
    let Ok(key) = VerifyingKey::from_sec1_bytes(public_key) else {
        return false;
    };
    let Ok(sig) = Signature::from_slice(signature) else {
        return false;
    };
    key.verify(message, &sig).is_ok()
}

pub struct KeyPair {
    signing: SigningKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        KeyPair {
            signing: SigningKey::random(&mut OsRng),
        }
    }

    pub fn from_secret(secret: &[u8]) -> Result<Self> {
        let signing = SigningKey::from_slice(secret)
            .map_err(|_| WalletCliError::wallet("stored private key is not a valid P-256 scalar"))?;
        Ok(KeyPair { signing })
    }

    pub fn secret_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.signing.to_bytes().to_vec())
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from(self.signing.verifying_key())
    }

    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        compress(&self.public_key())
    }

    /// ECDSA over SHA-256 of `message`, as 64 bytes `r || s`.
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LEN] {
        let sig: Signature = self.signing.sign(message);
        let mut out = [0u8; SIGNATURE_LEN];
        out.copy_from_slice(&sig.to_bytes());
        out
    }
}
