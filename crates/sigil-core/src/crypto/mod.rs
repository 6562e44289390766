//! Cryptographic operations facade.
//!
//! Every entry point validates its parameters before any primitive runs, so
//! an unsupported length, hash or iteration count never reaches PBKDF2, HKDF
//! or the ciphers.
//!
//! | Concern        | Primitive                      |
//! |----------------|--------------------------------|
//! | Password KDF   | PBKDF2-HMAC-SHA-{256,384,512}  |
//! | Key wrap       | AES-KW 128/192/256             |
//! | AEAD           | AES-GCM 128/192/256, 96-bit IV |
//! | Signatures     | Ed25519                        |
//! | Key agreement  | X25519 + HKDF                  |

mod keypair;
mod symmetric;

pub use keypair::{
    verify_signature, ExchangeKeyPair, GeneratedKeyPair, KeyAlgorithm, SigningKeyPair,
    EXCHANGE_ALG, SIGNING_ALG,
};
pub use symmetric::{SymmetricKey, WrappingKey, AEAD_ALG, IV_LENGTH, WRAP_ALG};

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::EncodePublicKey;
use hkdf::Hkdf;
use rand::RngCore;
use sha2::{Sha256, Sha384, Sha512};
use zeroize::Zeroizing;

use crate::error::{VaultError, VaultResult};
use crate::schema::{KeyPub, KeyWrapped};

/// Lowest PBKDF2 iteration count accepted anywhere.
pub const MIN_ITERATIONS: u32 = 100_000;

/// Default and bounds for generated IV lengths.
pub const DEFAULT_IV_LENGTH: usize = 12;
pub const MIN_IV_LENGTH: usize = 6;
pub const MAX_IV_LENGTH: usize = 64;

/// Default and bounds for generated salt lengths.
pub const DEFAULT_SALT_LENGTH: usize = 24;
pub const MIN_SALT_LENGTH: usize = 6;
pub const MAX_SALT_LENGTH: usize = 128;

/// Derived key lengths in bits.
pub const SUPPORTED_KEY_LENGTHS: [u32; 3] = [128, 192, 256];

/// Hash used by PBKDF2 and HKDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "SHA-256",
            HashAlgorithm::Sha384 => "SHA-384",
            HashAlgorithm::Sha512 => "SHA-512",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SHA-256" => Ok(HashAlgorithm::Sha256),
            "SHA-384" => Ok(HashAlgorithm::Sha384),
            "SHA-512" => Ok(HashAlgorithm::Sha512),
            other => Err(VaultError::Validation(format!(
                "unsupported hash '{}'",
                other
            ))),
        }
    }
}

/// PBKDF2 parameters for deriving a wrapping key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub iterations: u32,
    /// Derived key length in bits
    pub length: u32,
    pub hash: HashAlgorithm,
}

impl KdfParams {
    /// Reconstruct the parameters stored alongside a wrapped key.
    pub fn from_wrapped(wrapped: &KeyWrapped) -> VaultResult<Self> {
        let params = Self {
            iterations: wrapped.iterations,
            length: wrapped.derive_length,
            hash: wrapped.derive_hash.parse()?,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> VaultResult<()> {
        check_length(self.length)?;
        if self.iterations < MIN_ITERATIONS {
            return Err(VaultError::Validation(format!(
                "{} iterations is below the minimum of {}",
                self.iterations, MIN_ITERATIONS
            )));
        }
        Ok(())
    }
}

/// HKDF parameters for deriving a channel key from a key agreement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedKeyParams {
    pub info: Vec<u8>,
    /// Derived key length in bits
    pub length: u32,
    pub hash: HashAlgorithm,
}

/// A key argument resolved once at the API boundary.
#[derive(Debug, Clone, Copy)]
pub enum KeySource<'a> {
    Pair(&'a SigningKeyPair),
    Public(&'a KeyPub),
}

impl KeySource<'_> {
    fn verifying_key(&self) -> VaultResult<ed25519_dalek::VerifyingKey> {
        match self {
            KeySource::Pair(pair) => Ok(pair.verifying_key()),
            KeySource::Public(key) => keypair::verifying_key(key),
        }
    }
}

fn check_length(bits: u32) -> VaultResult<()> {
    if SUPPORTED_KEY_LENGTHS.contains(&bits) {
        Ok(())
    } else {
        Err(VaultError::Validation(format!(
            "unsupported key length {} (expected 128, 192 or 256)",
            bits
        )))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Randomness
// ═══════════════════════════════════════════════════════════════════════

/// Fill a fresh buffer from the system CSPRNG.
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    bytes
}

/// Random IV; lengths outside 6..=64 fall back to 12.
pub fn random_iv(len: usize) -> Vec<u8> {
    let len = if (MIN_IV_LENGTH..=MAX_IV_LENGTH).contains(&len) {
        len
    } else {
        DEFAULT_IV_LENGTH
    };
    random_bytes(len)
}

/// Random salt; lengths outside 6..=128 fall back to 24.
pub fn random_salt(len: usize) -> Vec<u8> {
    let len = if (MIN_SALT_LENGTH..=MAX_SALT_LENGTH).contains(&len) {
        len
    } else {
        DEFAULT_SALT_LENGTH
    };
    random_bytes(len)
}

pub(crate) fn random_uid() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ═══════════════════════════════════════════════════════════════════════
// Key derivation
// ═══════════════════════════════════════════════════════════════════════

/// Derive an AES-KW wrapping key from a password with PBKDF2.
pub fn derive_wrapping_key(
    password: &str,
    salt: &[u8],
    params: &KdfParams,
) -> VaultResult<WrappingKey> {
    params.validate()?;
    if salt.is_empty() {
        return Err(VaultError::Validation("salt must not be empty".into()));
    }

    let mut okm = Zeroizing::new(vec![0u8; (params.length / 8) as usize]);
    let password = password.as_bytes();
    match params.hash {
        HashAlgorithm::Sha256 => {
            pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, params.iterations, &mut okm)
        }
        HashAlgorithm::Sha384 => {
            pbkdf2::pbkdf2_hmac::<Sha384>(password, salt, params.iterations, &mut okm)
        }
        HashAlgorithm::Sha512 => {
            pbkdf2::pbkdf2_hmac::<Sha512>(password, salt, params.iterations, &mut okm)
        }
    }
    WrappingKey::from_bytes(okm)
}

/// Derive an AES-GCM key from X25519 agreement followed by HKDF.
pub fn derive_shared_key(
    peer_public: &KeyPub,
    own: &ExchangeKeyPair,
    salt: &[u8],
    params: &SharedKeyParams,
    extractable: bool,
) -> VaultResult<SymmetricKey> {
    check_length(params.length)?;
    let shared = own.diffie_hellman(peer_public)?;
    let ikm = shared.as_slice();

    let mut okm = Zeroizing::new(vec![0u8; (params.length / 8) as usize]);
    let expanded = match params.hash {
        HashAlgorithm::Sha256 => {
            Hkdf::<Sha256>::new(Some(salt), ikm).expand(&params.info, &mut okm)
        }
        HashAlgorithm::Sha384 => {
            Hkdf::<Sha384>::new(Some(salt), ikm).expand(&params.info, &mut okm)
        }
        HashAlgorithm::Sha512 => {
            Hkdf::<Sha512>::new(Some(salt), ikm).expand(&params.info, &mut okm)
        }
    };
    expanded.map_err(|_| VaultError::Validation("HKDF output length out of range".into()))?;
    SymmetricKey::from_bytes(okm, extractable)
}

// ═══════════════════════════════════════════════════════════════════════
// Password wrapping
// ═══════════════════════════════════════════════════════════════════════

/// Wrap `key` under a key derived from `password`, using a fresh salt.
pub fn wrap_with_password(
    key: &SymmetricKey,
    password: &str,
    params: &KdfParams,
    salt_len: usize,
) -> VaultResult<KeyWrapped> {
    params.validate()?;
    let salt = random_bytes(salt_len.max(1));
    let wrapping_key = derive_wrapping_key(password, &salt, params)?;
    let wrapped_key = wrapping_key.wrap(key, WRAP_ALG)?;

    Ok(KeyWrapped {
        uid: Some(random_uid()),
        alg: AEAD_ALG.to_string(),
        wrapped_key,
        derive_alg: WRAP_ALG.to_string(),
        derive_length: params.length,
        derive_hash: params.hash.as_str().to_string(),
        salt,
        iterations: params.iterations,
    })
}

/// Recover a non-extractable key from a [`KeyWrapped`].
///
/// Malformed parameters fail with `Validation`; a wrong password fails with
/// `Decrypt`.
pub fn unwrap_with_password(wrapped: &KeyWrapped, password: &str) -> VaultResult<SymmetricKey> {
    if wrapped.derive_alg != WRAP_ALG {
        return Err(VaultError::Validation(format!(
            "unsupported wrapping algorithm '{}'",
            wrapped.derive_alg
        )));
    }
    let params = KdfParams::from_wrapped(wrapped)?;
    let wrapping_key = derive_wrapping_key(password, &wrapped.salt, &params)?;
    wrapping_key.unwrap(&wrapped.wrapped_key, &wrapped.alg)
}

// ═══════════════════════════════════════════════════════════════════════
// Public key export
// ═══════════════════════════════════════════════════════════════════════

/// SPKI PEM encoding of a signing public key.
pub fn export_public_key_pem(source: KeySource<'_>) -> VaultResult<String> {
    source
        .verifying_key()?
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| VaultError::Validation(format!("SPKI export failed: {}", e)))
}

/// SPKI DER encoding of a signing public key.
pub fn export_public_key_der(source: KeySource<'_>) -> VaultResult<Vec<u8>> {
    source
        .verifying_key()?
        .to_public_key_der()
        .map(|doc| doc.as_bytes().to_vec())
        .map_err(|e| VaultError::Validation(format!("SPKI export failed: {}", e)))
}
