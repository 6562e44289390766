//! Asymmetric key pairs: Ed25519 for signatures, X25519 for key agreement.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::RngCore;
use x25519_dalek::{PublicKey as ExchangePublicKey, StaticSecret};
use zeroize::Zeroizing;

use super::random_uid;
use crate::error::{VaultError, VaultResult};
use crate::schema::{KeyPair, KeyPub, PrivateKeyFormat, PublicKeyFormat};

/// Algorithm name of signing key pairs.
pub const SIGNING_ALG: &str = "Ed25519";

/// Algorithm name of exchange key pairs.
pub const EXCHANGE_ALG: &str = "X25519";

/// Supported asymmetric algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Ed25519,
    X25519,
}

impl KeyAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyAlgorithm::Ed25519 => SIGNING_ALG,
            KeyAlgorithm::X25519 => EXCHANGE_ALG,
        }
    }
}

impl FromStr for KeyAlgorithm {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            SIGNING_ALG => Ok(KeyAlgorithm::Ed25519),
            EXCHANGE_ALG => Ok(KeyAlgorithm::X25519),
            other => Err(VaultError::Validation(format!(
                "unsupported key algorithm '{}'",
                other
            ))),
        }
    }
}

/// Result of [`GeneratedKeyPair::generate`].
#[derive(Debug)]
pub enum GeneratedKeyPair {
    Signing(SigningKeyPair),
    Exchange(ExchangeKeyPair),
}

impl GeneratedKeyPair {
    /// Generate a key pair for a named algorithm.
    pub fn generate(alg: &str, lifetime_secs: i64) -> VaultResult<Self> {
        Ok(match alg.parse::<KeyAlgorithm>()? {
            KeyAlgorithm::Ed25519 => GeneratedKeyPair::Signing(SigningKeyPair::generate(lifetime_secs)),
            KeyAlgorithm::X25519 => {
                GeneratedKeyPair::Exchange(ExchangeKeyPair::generate(lifetime_secs))
            }
        })
    }

    pub fn key_pub(&self) -> KeyPub {
        match self {
            GeneratedKeyPair::Signing(pair) => pair.key_pub(),
            GeneratedKeyPair::Exchange(pair) => pair.key_pub(),
        }
    }
}

fn seed() -> Zeroizing<[u8; 32]> {
    let mut seed = Zeroizing::new([0u8; 32]);
    rand::rng().fill_bytes(seed.as_mut_slice());
    seed
}

fn check_alg(alg: &str, expected: &str) -> VaultResult<()> {
    if alg == expected {
        Ok(())
    } else {
        Err(VaultError::Validation(format!(
            "expected a {} key, got '{}'",
            expected, alg
        )))
    }
}

fn raw_32(bytes: &[u8], what: &str) -> VaultResult<[u8; 32]> {
    bytes
        .try_into()
        .map_err(|_| VaultError::Validation(format!("{} must be 32 bytes", what)))
}

/// Ed25519 signing key pair with its identity metadata.
pub struct SigningKeyPair {
    uid: String,
    signing_key: SigningKey,
    created_at: i64,
    expires_at: i64,
}

impl SigningKeyPair {
    /// Generate a fresh key pair valid for `lifetime_secs`.
    pub fn generate(lifetime_secs: i64) -> Self {
        let created_at = Utc::now().timestamp();
        Self {
            uid: random_uid(),
            signing_key: SigningKey::from_bytes(&seed()),
            created_at,
            expires_at: created_at + lifetime_secs,
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Sign a message, returning the 64-byte signature.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }

    /// Public half as a schema record (RAW format).
    pub fn key_pub(&self) -> KeyPub {
        KeyPub {
            uid: self.uid.clone(),
            alg: SIGNING_ALG.to_string(),
            public_key: self.verifying_key().to_bytes().to_vec(),
            public_key_format: PublicKeyFormat::Raw,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }

    /// Export as a schema record; the private key is stored as PKCS#8.
    pub fn to_record(&self) -> VaultResult<KeyPair> {
        let pkcs8 = self
            .signing_key
            .to_pkcs8_der()
            .map_err(|e| VaultError::Validation(format!("PKCS#8 export failed: {}", e)))?;
        Ok(KeyPair {
            uid: self.uid.clone(),
            alg: SIGNING_ALG.to_string(),
            public_key: self.verifying_key().to_bytes().to_vec(),
            public_key_format: PublicKeyFormat::Raw,
            private_key: pkcs8.as_bytes().to_vec(),
            private_key_format: PrivateKeyFormat::Pkcs8,
            created_at: self.created_at,
            expires_at: self.expires_at,
        })
    }

    /// Import from a schema record, checking the public half matches.
    pub fn from_record(record: &KeyPair) -> VaultResult<Self> {
        check_alg(&record.alg, SIGNING_ALG)?;
        let signing_key = match record.private_key_format {
            PrivateKeyFormat::Pkcs8 => SigningKey::from_pkcs8_der(&record.private_key)
                .map_err(|_| VaultError::Validation("invalid PKCS#8 signing key".into()))?,
            PrivateKeyFormat::Raw => {
                let seed = Zeroizing::new(raw_32(&record.private_key, "Ed25519 private key")?);
                SigningKey::from_bytes(&seed)
            }
        };

        let pair = Self {
            uid: record.uid.clone(),
            signing_key,
            created_at: record.created_at,
            expires_at: record.expires_at,
        };
        if verifying_key(&record.to_pub())? != pair.verifying_key() {
            return Err(VaultError::Validation(
                "public key does not match private key".into(),
            ));
        }
        Ok(pair)
    }
}

impl fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("uid", &self.uid)
            .field("public_key", &hex::encode(self.verifying_key().to_bytes()))
            .finish()
    }
}

/// X25519 key pair used once per relationship handshake.
pub struct ExchangeKeyPair {
    uid: String,
    secret: StaticSecret,
    public: ExchangePublicKey,
    created_at: i64,
    expires_at: i64,
}

impl ExchangeKeyPair {
    pub fn generate(lifetime_secs: i64) -> Self {
        let secret = StaticSecret::from(*seed());
        let public = ExchangePublicKey::from(&secret);
        let created_at = Utc::now().timestamp();
        Self {
            uid: random_uid(),
            secret,
            public,
            created_at,
            expires_at: created_at + lifetime_secs,
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn key_pub(&self) -> KeyPub {
        KeyPub {
            uid: self.uid.clone(),
            alg: EXCHANGE_ALG.to_string(),
            public_key: self.public.as_bytes().to_vec(),
            public_key_format: PublicKeyFormat::Raw,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }

    pub fn to_record(&self) -> KeyPair {
        KeyPair {
            uid: self.uid.clone(),
            alg: EXCHANGE_ALG.to_string(),
            public_key: self.public.as_bytes().to_vec(),
            public_key_format: PublicKeyFormat::Raw,
            private_key: self.secret.to_bytes().to_vec(),
            private_key_format: PrivateKeyFormat::Raw,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }

    pub fn from_record(record: &KeyPair) -> VaultResult<Self> {
        check_alg(&record.alg, EXCHANGE_ALG)?;
        if record.private_key_format != PrivateKeyFormat::Raw {
            return Err(VaultError::Validation(
                "X25519 private keys must be RAW".into(),
            ));
        }
        let secret = StaticSecret::from(raw_32(&record.private_key, "X25519 private key")?);
        let public = ExchangePublicKey::from(&secret);
        if public.as_bytes().as_slice() != record.public_key.as_slice() {
            return Err(VaultError::Validation(
                "public key does not match private key".into(),
            ));
        }
        Ok(Self {
            uid: record.uid.clone(),
            secret,
            public,
            created_at: record.created_at,
            expires_at: record.expires_at,
        })
    }

    /// Raw X25519 shared secret with a peer's public key.
    pub(crate) fn diffie_hellman(&self, peer: &KeyPub) -> VaultResult<Zeroizing<[u8; 32]>> {
        check_alg(&peer.alg, EXCHANGE_ALG)?;
        if peer.public_key_format != PublicKeyFormat::Raw {
            return Err(VaultError::Validation(
                "X25519 public keys must be RAW".into(),
            ));
        }
        let peer = ExchangePublicKey::from(raw_32(&peer.public_key, "X25519 public key")?);
        let shared = self.secret.diffie_hellman(&peer);
        if !shared.was_contributory() {
            return Err(VaultError::Validation("low-order X25519 public key".into()));
        }
        Ok(Zeroizing::new(shared.to_bytes()))
    }
}

impl fmt::Debug for ExchangeKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeKeyPair")
            .field("uid", &self.uid)
            .field("public_key", &hex::encode(self.public.as_bytes()))
            .finish()
    }
}

/// Parse an Ed25519 public key record (RAW or SPKI).
pub(crate) fn verifying_key(key: &KeyPub) -> VaultResult<VerifyingKey> {
    check_alg(&key.alg, SIGNING_ALG)?;
    match key.public_key_format {
        PublicKeyFormat::Raw => {
            VerifyingKey::from_bytes(&raw_32(&key.public_key, "Ed25519 public key")?)
                .map_err(|_| VaultError::Validation("invalid Ed25519 public key".into()))
        }
        PublicKeyFormat::Spki => VerifyingKey::from_public_key_der(&key.public_key)
            .map_err(|_| VaultError::Validation("invalid SPKI public key".into())),
    }
}

/// Verify `signature` over `message` against a signer record.
///
/// Every failure, including an unparseable key, is reported as
/// [`VaultError::Signature`].
pub fn verify_signature(signer: &KeyPub, message: &[u8], signature: &[u8]) -> VaultResult<()> {
    let key = verifying_key(signer).map_err(|_| VaultError::Signature)?;
    let signature = Signature::from_slice(signature).map_err(|_| VaultError::Signature)?;
    key.verify_strict(message, &signature)
        .map_err(|_| VaultError::Signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: i64 = 3600;

    #[test]
    fn test_sign_verify_roundtrip() {
        let pair = SigningKeyPair::generate(HOUR);
        let signature = pair.sign(b"test message");
        assert_eq!(signature.len(), 64);
        assert!(verify_signature(&pair.key_pub(), b"test message", &signature).is_ok());
    }

    #[test]
    fn test_verify_wrong_message_fails() {
        let pair = SigningKeyPair::generate(HOUR);
        let signature = pair.sign(b"original");
        assert!(matches!(
            verify_signature(&pair.key_pub(), b"tampered", &signature),
            Err(VaultError::Signature)
        ));
    }

    #[test]
    fn test_verify_wrong_key_fails() {
        let pair = SigningKeyPair::generate(HOUR);
        let other = SigningKeyPair::generate(HOUR);
        let signature = pair.sign(b"message");
        assert!(matches!(
            verify_signature(&other.key_pub(), b"message", &signature),
            Err(VaultError::Signature)
        ));
    }

    #[test]
    fn test_verify_with_exchange_key_is_signature_error() {
        let pair = SigningKeyPair::generate(HOUR);
        let exchange = ExchangeKeyPair::generate(HOUR);
        let signature = pair.sign(b"message");
        assert!(matches!(
            verify_signature(&exchange.key_pub(), b"message", &signature),
            Err(VaultError::Signature)
        ));
        assert!(matches!(
            verify_signature(&pair.key_pub(), b"message", &signature[..63]),
            Err(VaultError::Signature)
        ));
    }

    #[test]
    fn test_signing_record_roundtrip() {
        let pair = SigningKeyPair::generate(HOUR);
        let record = pair.to_record().unwrap();
        assert_eq!(record.private_key_format, PrivateKeyFormat::Pkcs8);
        assert_eq!(record.expires_at - record.created_at, HOUR);

        let restored = SigningKeyPair::from_record(&record).unwrap();
        assert_eq!(restored.uid(), pair.uid());
        assert_eq!(restored.verifying_key(), pair.verifying_key());

        let signature = restored.sign(b"hello");
        assert!(verify_signature(&pair.key_pub(), b"hello", &signature).is_ok());
    }

    #[test]
    fn test_signing_record_mismatched_public_key() {
        let pair = SigningKeyPair::generate(HOUR);
        let other = SigningKeyPair::generate(HOUR);
        let mut record = pair.to_record().unwrap();
        record.public_key = other.key_pub().public_key;
        assert!(matches!(
            SigningKeyPair::from_record(&record),
            Err(VaultError::Validation(_))
        ));
    }

    #[test]
    fn test_exchange_record_roundtrip() {
        let pair = ExchangeKeyPair::generate(HOUR);
        let restored = ExchangeKeyPair::from_record(&pair.to_record()).unwrap();
        assert_eq!(restored.key_pub(), pair.key_pub());
    }

    #[test]
    fn test_exchange_rejects_signing_record() {
        let record = SigningKeyPair::generate(HOUR).to_record().unwrap();
        assert!(matches!(
            ExchangeKeyPair::from_record(&record),
            Err(VaultError::Validation(_))
        ));
    }

    #[test]
    fn test_diffie_hellman_rejects_low_order_point() {
        let pair = ExchangeKeyPair::generate(HOUR);
        let mut zero = pair.key_pub();
        zero.public_key = vec![0u8; 32];
        assert!(matches!(
            pair.diffie_hellman(&zero),
            Err(VaultError::Validation(_))
        ));
    }

    #[test]
    fn test_generate_by_name() {
        let signing = GeneratedKeyPair::generate("Ed25519", HOUR).unwrap();
        assert!(matches!(signing, GeneratedKeyPair::Signing(_)));
        assert_eq!(signing.key_pub().alg, SIGNING_ALG);

        let exchange = GeneratedKeyPair::generate("X25519", HOUR).unwrap();
        assert_eq!(exchange.key_pub().alg, EXCHANGE_ALG);

        assert!(matches!(
            GeneratedKeyPair::generate("P-384", HOUR),
            Err(VaultError::Validation(_))
        ));
    }

    #[test]
    fn test_spki_public_key_is_accepted() {
        let pair = SigningKeyPair::generate(HOUR);
        let mut key_pub = pair.key_pub();
        key_pub.public_key =
            crate::crypto::export_public_key_der(crate::crypto::KeySource::Pair(&pair)).unwrap();
        key_pub.public_key_format = PublicKeyFormat::Spki;

        let signature = pair.sign(b"spki");
        assert!(verify_signature(&key_pub, b"spki", &signature).is_ok());
    }
}
