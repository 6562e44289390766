//! Vault configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! overrides:
//!
//! ```json
//! { "iterations": 500000, "armor_width": 76 }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crypto::{HashAlgorithm, KdfParams, MIN_ITERATIONS};
use crate::error::{VaultError, VaultResult};

/// Default PBKDF2 iteration count for new wrapped keys.
pub const DEFAULT_ITERATIONS: u32 = 360_000;

/// Default lifetime of generated key pairs.
pub const DEFAULT_KEY_LIFETIME_DAYS: u32 = 182;

/// Default base64 column width for armored blocks.
pub const DEFAULT_ARMOR_WIDTH: usize = 64;

/// Default salt length for password wrapping.
pub const DEFAULT_WRAP_SALT_LENGTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// PBKDF2 iterations used when wrapping a master key
    pub iterations: u32,
    /// Wrapping key length in bits (128, 192 or 256)
    pub derive_length: u32,
    /// PBKDF2 hash name ("SHA-256", "SHA-384" or "SHA-512")
    pub derive_hash: String,
    /// Salt length in bytes for password wrapping
    pub wrap_salt_length: usize,
    /// Validity window stamped on generated key pairs
    pub key_lifetime_days: u32,
    /// Column width of armored base64 blocks
    pub armor_width: usize,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            derive_length: 256,
            derive_hash: HashAlgorithm::Sha256.as_str().to_string(),
            wrap_salt_length: DEFAULT_WRAP_SALT_LENGTH,
            key_lifetime_days: DEFAULT_KEY_LIFETIME_DAYS,
            armor_width: DEFAULT_ARMOR_WIDTH,
        }
    }
}

impl VaultConfig {
    /// Read a JSON config file, filling missing fields with defaults.
    pub fn load(path: impl AsRef<Path>) -> VaultResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path)?;
        let config: VaultConfig = serde_json::from_slice(&raw)
            .map_err(|e| VaultError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Override the iteration count.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn validate(&self) -> VaultResult<()> {
        if self.iterations < MIN_ITERATIONS {
            return Err(VaultError::Config(format!(
                "iterations must be at least {}",
                MIN_ITERATIONS
            )));
        }
        if self.wrap_salt_length == 0 {
            return Err(VaultError::Config("wrap_salt_length must be non-zero".into()));
        }
        if self.armor_width == 0 {
            return Err(VaultError::Config("armor_width must be non-zero".into()));
        }
        self.kdf_params()
            .map_err(|e| VaultError::Config(e.to_string()))?
            .validate()
            .map_err(|e| VaultError::Config(e.to_string()))
    }

    /// PBKDF2 parameters for wrapping a new master key.
    pub fn kdf_params(&self) -> VaultResult<KdfParams> {
        Ok(KdfParams {
            iterations: self.iterations,
            length: self.derive_length,
            hash: self.derive_hash.parse()?,
        })
    }

    /// Key pair lifetime in seconds.
    pub fn key_lifetime_secs(&self) -> i64 {
        i64::from(self.key_lifetime_days) * 24 * 60 * 60
    }
}
