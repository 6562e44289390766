//! Error types for Sigil

use thiserror::Error;

/// Main error type for vault operations
///
/// `Decrypt` and `Signature` carry no detail about which step failed.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Caller-supplied parameter outside the supported set
    #[error("Invalid parameter: {0}")]
    Validation(String),

    /// Bytes do not carry the expected framing (magic header, armor markers)
    #[error("Invalid format: {0}")]
    Format(String),

    /// Bytes could not be decoded as the named record
    #[error("Malformed {record}: {reason}")]
    Schema {
        record: &'static str,
        reason: String,
    },

    /// Unwrap or AEAD authentication failed
    #[error("Decryption failed")]
    Decrypt,

    /// Signature did not verify against the embedded signer key
    #[error("Signature verification failed")]
    Signature,

    /// Operation not allowed in the current container state
    #[error("Invalid state: {0}")]
    State(String),

    /// Error during storage operations (redb)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database creation/opening error
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    /// Table error
    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    /// Storage operation error
    #[error("Storage operation error: {0}")]
    StorageOp(#[from] redb::StorageError),

    /// Commit error
    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    /// Configuration file could not be read or holds invalid values
    #[error("Config error: {0}")]
    Config(String),

    /// Blocking worker failed to complete
    #[error("Background task failed: {0}")]
    Task(String),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using VaultError
pub type VaultResult<T> = Result<T, VaultError>;

impl VaultError {
    pub(crate) fn schema(record: &'static str, reason: impl ToString) -> Self {
        VaultError::Schema {
            record,
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VaultError::State("profile is locked".to_string());
        assert_eq!(format!("{}", err), "Invalid state: profile is locked");

        let err = VaultError::schema("Account", "unexpected end of input");
        assert_eq!(
            format!("{}", err),
            "Malformed Account: unexpected end of input"
        );
    }

    #[test]
    fn test_security_errors_carry_no_detail() {
        assert_eq!(VaultError::Decrypt.to_string(), "Decryption failed");
        assert_eq!(
            VaultError::Signature.to_string(),
            "Signature verification failed"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: VaultError = io_err.into();
        assert!(matches!(err, VaultError::Io(_)));
    }
}
