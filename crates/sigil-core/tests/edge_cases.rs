//! Edge case and boundary condition tests
//!
//! Parameter validation, malformed input and refused mutations.

use std::collections::BTreeMap;

use sigil_core::crypto::{
    self, derive_wrapping_key, HashAlgorithm, KdfParams, SigningKeyPair, MIN_ITERATIONS,
};
use sigil_core::schema::{
    Account, KeyPair, PendingAccount, PendingOrigin, Record, RelationRequest, SubProfile,
};
use sigil_core::{Profile, ProfileMetadata, ProfileState, VaultConfig, VaultError};

// ============================================================================
// Test Utilities
// ============================================================================

fn open_profile() -> Profile {
    let mut profile = Profile::new(VaultConfig::default().with_iterations(MIN_ITERATIONS));
    profile
        .create_new("pw", ProfileMetadata::named("Alice"), None)
        .unwrap();
    profile
}

fn account(name: &str) -> Account {
    Account {
        name: name.into(),
        url: None,
        email: None,
        public_sign_key: SigningKeyPair::generate(60).key_pub(),
        public_exchange_key: None,
        hkdf_salt: None,
        shared_key: None,
        established_at: 0,
    }
}

fn pending(uid: &str) -> PendingAccount {
    let outgoing = sigil_core::relation::create_request(
        "bob",
        "alice",
        "https://a.example",
        None,
        None,
        &VaultConfig::default(),
    )
    .unwrap();
    PendingAccount {
        request: RelationRequest {
            uid: uid.into(),
            ..outgoing.request
        },
        ..outgoing.pending
    }
}

// ============================================================================
// Key Derivation Parameters
// ============================================================================

/// An iteration count below the floor is refused immediately
#[test]
fn test_iteration_floor() {
    let params = KdfParams {
        iterations: MIN_ITERATIONS - 1,
        length: 256,
        hash: HashAlgorithm::Sha256,
    };
    assert!(matches!(
        derive_wrapping_key("pw", b"0123456789abcdef", &params),
        Err(VaultError::Validation(_))
    ));

    let config = VaultConfig::default().with_iterations(1_000);
    let mut profile = Profile::new(config);
    assert!(matches!(
        profile.create_new("pw", ProfileMetadata::default(), None),
        Err(VaultError::Validation(_))
    ));
    assert_eq!(profile.state(), ProfileState::Empty);
}

/// Unsupported lengths and hashes are rejected
#[test]
fn test_unsupported_kdf_parameters() {
    for length in [0, 64, 100, 512] {
        let params = KdfParams {
            iterations: MIN_ITERATIONS,
            length,
            hash: HashAlgorithm::Sha512,
        };
        assert!(matches!(
            derive_wrapping_key("pw", b"salt-salt", &params),
            Err(VaultError::Validation(_))
        ));
    }
    for hash in ["SHA-1", "sha-256", "MD5", ""] {
        assert!(matches!(
            hash.parse::<HashAlgorithm>(),
            Err(VaultError::Validation(_))
        ));
    }
}

/// Every supported length/hash pair wraps and unwraps
#[test]
fn test_all_supported_kdf_parameters() {
    let key = crypto::SymmetricKey::generate(256).unwrap();
    for length in [128, 192, 256] {
        for hash in [HashAlgorithm::Sha256, HashAlgorithm::Sha384, HashAlgorithm::Sha512] {
            let params = KdfParams {
                iterations: MIN_ITERATIONS,
                length,
                hash,
            };
            let wrapped = crypto::wrap_with_password(&key, "pw", &params, 16).unwrap();
            assert_eq!(wrapped.derive_hash, hash.as_str());
            assert!(crypto::unwrap_with_password(&wrapped, "pw").is_ok());
        }
    }
}

// ============================================================================
// Account and Pending Uniqueness
// ============================================================================

/// Adding an existing account id fails and keeps the first value
#[test]
fn test_duplicate_account() {
    let mut profile = open_profile();
    let first = account("first");
    assert!(profile.add_account("id", first.clone()).unwrap());
    assert!(!profile.add_account("id", account("second")).unwrap());
    assert_eq!(profile.account("id").unwrap(), Some(&first));
}

/// An account id may not shadow a pending entry
#[test]
fn test_add_account_over_pending() {
    let mut profile = open_profile();
    let waiting = pending("id");
    assert!(profile.add_pending("id", waiting.clone()).unwrap());

    assert!(!profile.add_account("id", account("Mallory")).unwrap());
    assert!(profile.account("id").unwrap().is_none());
    assert_eq!(profile.pending("id").unwrap(), Some(&waiting));

    // The pending entry can still be completed
    assert!(profile.upgrade_pending("id", account("bob")).unwrap());
    assert_eq!(profile.account("id").unwrap().unwrap().name, "bob");
}

/// A replacement sub-profile may not put one id in both maps
#[test]
fn test_update_sub_profile_with_shared_id() {
    let mut profile = open_profile();
    profile.add_account("id", account("existing")).unwrap();
    let mut sub = profile.sub_profile().unwrap().clone();
    sub.pendings.insert("id".into(), pending("id"));

    assert!(matches!(
        profile.update_sub_profile(sub),
        Err(VaultError::Validation(_))
    ));
    assert!(profile.pending("id").unwrap().is_none());
    assert!(!profile.upgrade_pending("id", account("new")).unwrap());
    assert_eq!(profile.account("id").unwrap().unwrap().name, "existing");
}

/// Upgrading a missing pending entry is refused
#[test]
fn test_upgrade_missing_pending() {
    let mut profile = open_profile();
    assert!(!profile.upgrade_pending("ghost", account("ghost")).unwrap());
    assert!(profile.account("ghost").unwrap().is_none());
}

/// A successful upgrade moves the entry between maps
#[test]
fn test_upgrade_moves_entry() {
    let mut profile = open_profile();
    assert!(profile.add_pending("id", pending("id")).unwrap());
    assert!(profile.upgrade_pending("id", account("done")).unwrap());
    assert!(profile.pending("id").unwrap().is_none());
    assert_eq!(profile.account("id").unwrap().unwrap().name, "done");
}

/// A pending id may not shadow an account or another pending entry
#[test]
fn test_add_pending_uniqueness() {
    let mut profile = open_profile();
    profile.add_account("taken", account("taken")).unwrap();
    assert!(!profile.add_pending("taken", pending("taken")).unwrap());

    assert!(profile.add_pending("p", pending("p")).unwrap());
    assert!(!profile.add_pending("p", pending("p")).unwrap());
    assert!(profile.remove_pending("p").unwrap());
    assert!(!profile.remove_pending("p").unwrap());
}

// ============================================================================
// Malformed Input
// ============================================================================

/// Wrong magic header, empty input and truncated records are format errors
#[test]
fn test_load_malformed_bytes() {
    let mut good = open_profile().serialize().unwrap();
    let mut profile = Profile::default();

    assert!(matches!(profile.load(&[]), Err(VaultError::Format(_))));
    assert!(matches!(
        profile.load(&good[..good.len() / 2]),
        Err(VaultError::Format(_))
    ));

    good[0] = 0x64;
    assert!(matches!(profile.load(&good), Err(VaultError::Format(_))));
}

/// Garbage handed to the signed-message decoder is a schema error
#[test]
fn test_open_garbage_signed_message() {
    assert!(matches!(
        sigil_core::relation::open_signed_message(&[1, 2, 3]),
        Err(VaultError::Schema { .. })
    ));
}

/// A sub-profile with a foreign key pair type cannot be installed
#[test]
fn test_update_sub_profile_with_exchange_key() {
    let mut profile = open_profile();
    let exchange: KeyPair = crypto::ExchangeKeyPair::generate(60).to_record();
    let sub = SubProfile {
        name: None,
        email: None,
        url: None,
        signing_keypair: exchange,
        accounts: BTreeMap::new(),
        pendings: BTreeMap::new(),
    };
    assert!(matches!(
        profile.update_sub_profile(sub),
        Err(VaultError::Validation(_))
    ));
    assert_eq!(profile.state(), ProfileState::Open);
}

/// Pending origin survives encoding
#[test]
fn test_pending_origin_encoding() {
    let mut incoming = pending("x");
    incoming.origin = PendingOrigin::Incoming {
        requester_sign_key: SigningKeyPair::generate(60).key_pub(),
    };
    let decoded = PendingAccount::decode(&incoming.encode().unwrap()).unwrap();
    assert_eq!(decoded, incoming);
    assert!(!decoded.is_outgoing());
}
