//! Symmetric keys: AES-GCM content keys and AES-KW wrapping keys.

use std::fmt;

use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes192;
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm, Nonce};
use aes_kw::{KekAes128, KekAes192, KekAes256};
use zeroize::Zeroizing;

use crate::error::{VaultError, VaultResult};

type Aes192Gcm = AesGcm<Aes192, U12>;

/// Algorithm name of content keys.
pub const AEAD_ALG: &str = "AES-GCM";

/// Algorithm name of wrapping keys.
pub const WRAP_ALG: &str = "AES-KW";

/// IV length accepted by AES-GCM.
pub const IV_LENGTH: usize = 12;

fn key_length_ok(len: usize) -> VaultResult<()> {
    match len {
        16 | 24 | 32 => Ok(()),
        other => Err(VaultError::Validation(format!(
            "unsupported key length {} bits",
            other * 8
        ))),
    }
}

fn to_array<const N: usize>(bytes: &[u8]) -> VaultResult<[u8; N]> {
    bytes
        .try_into()
        .map_err(|_| VaultError::Validation(format!("expected {} key bytes", N)))
}

/// AES-GCM key.
///
/// Keys produced by [`WrappingKey::unwrap`] are non-extractable: the raw bytes
/// stay inside this type for its whole life.
pub struct SymmetricKey {
    bytes: Zeroizing<Vec<u8>>,
    extractable: bool,
}

impl SymmetricKey {
    pub(crate) fn from_bytes(bytes: Zeroizing<Vec<u8>>, extractable: bool) -> VaultResult<Self> {
        key_length_ok(bytes.len())?;
        Ok(Self { bytes, extractable })
    }

    /// Generate a fresh extractable key of `length` bits.
    pub fn generate(length: u32) -> VaultResult<Self> {
        super::check_length(length)?;
        let bytes = Zeroizing::new(super::random_bytes((length / 8) as usize));
        Self::from_bytes(bytes, true)
    }

    /// Import raw key bytes.
    pub fn import_raw(bytes: &[u8], extractable: bool) -> VaultResult<Self> {
        Self::from_bytes(Zeroizing::new(bytes.to_vec()), extractable)
    }

    /// Raw key bytes. Fails for non-extractable keys.
    pub fn export_raw(&self) -> VaultResult<Zeroizing<Vec<u8>>> {
        if !self.extractable {
            return Err(VaultError::Validation("key is not extractable".into()));
        }
        Ok(self.bytes.clone())
    }

    pub fn bits(&self) -> u32 {
        (self.bytes.len() * 8) as u32
    }

    pub fn is_extractable(&self) -> bool {
        self.extractable
    }

    /// Encrypt with a caller-supplied 12-byte IV. The IV is not prepended.
    pub fn encrypt_with_iv(&self, plaintext: &[u8], iv: &[u8]) -> VaultResult<Vec<u8>> {
        let nonce = check_iv(iv)?;
        let sealed = match self.bytes.len() {
            16 => cipher::<Aes128Gcm>(&self.bytes)?.encrypt(nonce, plaintext),
            24 => cipher::<Aes192Gcm>(&self.bytes)?.encrypt(nonce, plaintext),
            _ => cipher::<Aes256Gcm>(&self.bytes)?.encrypt(nonce, plaintext),
        };
        sealed.map_err(|_| VaultError::Validation("encryption failed".into()))
    }

    /// Decrypt with the IV used for encryption. Any authentication failure
    /// is reported as [`VaultError::Decrypt`].
    pub fn decrypt_with_iv(&self, ciphertext: &[u8], iv: &[u8]) -> VaultResult<Vec<u8>> {
        let nonce = check_iv(iv)?;
        let opened = match self.bytes.len() {
            16 => cipher::<Aes128Gcm>(&self.bytes)?.decrypt(nonce, ciphertext),
            24 => cipher::<Aes192Gcm>(&self.bytes)?.decrypt(nonce, ciphertext),
            _ => cipher::<Aes256Gcm>(&self.bytes)?.decrypt(nonce, ciphertext),
        };
        opened.map_err(|_| VaultError::Decrypt)
    }
}

fn check_iv(iv: &[u8]) -> VaultResult<&Nonce<U12>> {
    if iv.len() != IV_LENGTH {
        return Err(VaultError::Validation(format!(
            "AES-GCM needs a {}-byte IV, got {}",
            IV_LENGTH,
            iv.len()
        )));
    }
    Ok(Nonce::from_slice(iv))
}

fn cipher<C: KeyInit>(key: &[u8]) -> VaultResult<C> {
    C::new_from_slice(key).map_err(|_| VaultError::Validation("invalid key length".into()))
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("bits", &self.bits())
            .field("extractable", &self.extractable)
            .finish()
    }
}

/// AES-KW key-encryption key derived from a password. Never exported.
pub struct WrappingKey {
    bytes: Zeroizing<Vec<u8>>,
}

impl WrappingKey {
    pub(crate) fn from_bytes(bytes: Zeroizing<Vec<u8>>) -> VaultResult<Self> {
        key_length_ok(bytes.len())?;
        Ok(Self { bytes })
    }

    /// Wrap an extractable key. Only `AES-KW` is supported.
    pub fn wrap(&self, key: &SymmetricKey, derive_alg: &str) -> VaultResult<Vec<u8>> {
        if derive_alg != WRAP_ALG {
            return Err(VaultError::Validation(format!(
                "unsupported wrapping algorithm '{}'",
                derive_alg
            )));
        }
        let raw = key.export_raw()?;
        let wrapped = match self.bytes.len() {
            16 => KekAes128::from(to_array::<16>(&self.bytes)?).wrap_vec(&raw),
            24 => KekAes192::from(to_array::<24>(&self.bytes)?).wrap_vec(&raw),
            _ => KekAes256::from(to_array::<32>(&self.bytes)?).wrap_vec(&raw),
        };
        wrapped.map_err(|e| VaultError::Validation(format!("key wrap failed: {}", e)))
    }

    /// Unwrap into a non-extractable key of algorithm `alg` (`AES-GCM`).
    pub fn unwrap(&self, wrapped: &[u8], alg: &str) -> VaultResult<SymmetricKey> {
        if alg != AEAD_ALG {
            return Err(VaultError::Validation(format!(
                "unsupported wrapped key algorithm '{}'",
                alg
            )));
        }
        let unwrapped = match self.bytes.len() {
            16 => KekAes128::from(to_array::<16>(&self.bytes)?).unwrap_vec(wrapped),
            24 => KekAes192::from(to_array::<24>(&self.bytes)?).unwrap_vec(wrapped),
            _ => KekAes256::from(to_array::<32>(&self.bytes)?).unwrap_vec(wrapped),
        };
        let raw = Zeroizing::new(unwrapped.map_err(|_| VaultError::Decrypt)?);
        SymmetricKey::from_bytes(raw, false).map_err(|_| VaultError::Decrypt)
    }
}

impl fmt::Debug for WrappingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrappingKey")
            .field("bits", &(self.bytes.len() * 8))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::random_iv;

    #[test]
    fn test_encrypt_decrypt_all_lengths() {
        for bits in [128, 192, 256] {
            let key = SymmetricKey::generate(bits).unwrap();
            let iv = random_iv(IV_LENGTH);
            let ciphertext = key.encrypt_with_iv(b"Hello, World!", &iv).unwrap();
            assert_eq!(ciphertext.len(), 13 + 16);
            assert_eq!(key.decrypt_with_iv(&ciphertext, &iv).unwrap(), b"Hello, World!");
        }
    }

    #[test]
    fn test_generate_rejects_odd_length() {
        assert!(matches!(
            SymmetricKey::generate(512),
            Err(VaultError::Validation(_))
        ));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = SymmetricKey::generate(256).unwrap();
        let iv = random_iv(IV_LENGTH);
        let mut ciphertext = key.encrypt_with_iv(b"secret", &iv).unwrap();
        ciphertext[0] ^= 0xff;
        assert!(matches!(
            key.decrypt_with_iv(&ciphertext, &iv),
            Err(VaultError::Decrypt)
        ));
    }

    #[test]
    fn test_wrong_key_fails() {
        let key = SymmetricKey::generate(256).unwrap();
        let other = SymmetricKey::generate(256).unwrap();
        let iv = random_iv(IV_LENGTH);
        let ciphertext = key.encrypt_with_iv(b"secret", &iv).unwrap();
        assert!(matches!(
            other.decrypt_with_iv(&ciphertext, &iv),
            Err(VaultError::Decrypt)
        ));
    }

    #[test]
    fn test_rejects_non_standard_iv() {
        let key = SymmetricKey::generate(256).unwrap();
        assert!(matches!(
            key.encrypt_with_iv(b"x", &[0u8; 16]),
            Err(VaultError::Validation(_))
        ));
    }

    #[test]
    fn test_wrap_unwrap_is_non_extractable() {
        let kek = WrappingKey::from_bytes(Zeroizing::new(vec![9u8; 32])).unwrap();
        let key = SymmetricKey::generate(256).unwrap();
        let wrapped = kek.wrap(&key, WRAP_ALG).unwrap();
        assert_eq!(wrapped.len(), 40);

        let unwrapped = kek.unwrap(&wrapped, AEAD_ALG).unwrap();
        assert!(!unwrapped.is_extractable());
        assert!(matches!(
            unwrapped.export_raw(),
            Err(VaultError::Validation(_))
        ));
        assert!(matches!(
            kek.wrap(&unwrapped, WRAP_ALG),
            Err(VaultError::Validation(_))
        ));
    }

    #[test]
    fn test_wrap_rejects_other_algorithms() {
        let kek = WrappingKey::from_bytes(Zeroizing::new(vec![1u8; 16])).unwrap();
        let key = SymmetricKey::generate(128).unwrap();
        assert!(matches!(
            kek.wrap(&key, "RSA-OAEP"),
            Err(VaultError::Validation(_))
        ));
        let wrapped = kek.wrap(&key, WRAP_ALG).unwrap();
        assert!(matches!(
            kek.unwrap(&wrapped, "HMAC"),
            Err(VaultError::Validation(_))
        ));
    }

    #[test]
    fn test_unwrap_with_wrong_kek() {
        let kek = WrappingKey::from_bytes(Zeroizing::new(vec![1u8; 24])).unwrap();
        let other = WrappingKey::from_bytes(Zeroizing::new(vec![2u8; 24])).unwrap();
        let key = SymmetricKey::generate(256).unwrap();
        let wrapped = kek.wrap(&key, WRAP_ALG).unwrap();
        assert!(matches!(
            other.unwrap(&wrapped, AEAD_ALG),
            Err(VaultError::Decrypt)
        ));
    }

    #[test]
    fn test_debug_hides_key_bytes() {
        let key = SymmetricKey::import_raw(&[0x41; 16], true).unwrap();
        let debug = format!("{:?}", key);
        assert!(debug.contains("128"));
        assert!(!debug.contains("65"));
    }
}
