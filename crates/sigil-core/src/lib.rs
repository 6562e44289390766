//! Sigil Core Library
//!
//! Password-protected identity vault with a signed relationship handshake.
//!
//! ## Overview
//!
//! A profile holds a long-term Ed25519 signing key, the accounts of peers a
//! relationship was established with, and the pending requests still in
//! flight. At rest the profile is a master key wrapped under one or two
//! passwords (PBKDF2 + AES-KW) plus the AES-GCM encrypted sub-profile.
//!
//! Relationships are established out of band: the requester sends a signed
//! request carrying a one-time X25519 key, the receiver answers with a signed
//! response, and both derive the same channel key.
//!
//! ## Quick Start
//!
//! ```ignore
//! use sigil_core::{relation, MemoryStore, Profile, ProfileMetadata, VaultConfig};
//!
//! let store = MemoryStore::new();
//! let mut profile = Profile::new(VaultConfig::default());
//! profile.create_new("correct horse", ProfileMetadata::named("Alice"), None)?;
//! let request = relation::send_request(&mut profile, "bob", "alice", "https://a.example", None, None)?;
//! println!("{}", relation::armor_signed_message(&request, 64)?);
//! profile.save_to(&store)?;
//! ```

pub mod armor;
pub mod config;
pub mod crypto;
pub mod error;
pub mod profile;
pub mod relation;
pub mod schema;
pub mod storage;

// Re-exports
pub use config::VaultConfig;
pub use error::{VaultError, VaultResult};
pub use profile::{Profile, ProfileMetadata, ProfileState, SharedProfile, PROFILE_MAGIC};
pub use relation::{SignedPayload, VerifiedMessage};
pub use storage::{BlobStore, MemoryStore, RedbStore, PROFILE_KEY};
