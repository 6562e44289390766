//! Binary schema for every persisted or exchanged record.
//!
//! Records are plain serde types encoded with postcard. Decoding is strict:
//! a truncated buffer, an unknown enum tag or trailing bytes after the record
//! all fail with [`VaultError::Schema`], and no partially populated record is
//! ever returned.

mod keys;
mod message;
mod records;

pub use keys::{KeyPair, KeyPub, KeyWrapped, PrivateKeyFormat, PublicKeyFormat};
pub use message::{MessageType, RelationRequest, RelationResponse, ResponseDetails, SignedMessage};
pub use records::{
    Account, PendingAccount, PendingOrigin, ProfileRecord, SecretKeyRef, SubProfile,
};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{VaultError, VaultResult};

/// A record type with a stable binary encoding.
pub trait Record: Serialize + DeserializeOwned {
    /// Record name used in error messages.
    const NAME: &'static str;

    fn encode(&self) -> VaultResult<Vec<u8>> {
        encode(self)
    }

    fn decode(bytes: &[u8]) -> VaultResult<Self> {
        decode(bytes)
    }
}

/// Encode a record to bytes.
pub fn encode<R: Record>(record: &R) -> VaultResult<Vec<u8>> {
    postcard::to_allocvec(record).map_err(|e| VaultError::schema(R::NAME, e))
}

/// Decode a record, rejecting trailing bytes.
pub fn decode<R: Record>(bytes: &[u8]) -> VaultResult<R> {
    let (record, rest) =
        postcard::take_from_bytes::<R>(bytes).map_err(|e| VaultError::schema(R::NAME, e))?;
    if !rest.is_empty() {
        return Err(VaultError::schema(
            R::NAME,
            format!("{} trailing bytes", rest.len()),
        ));
    }
    Ok(record)
}
