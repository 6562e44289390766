//! Accepting requests and completing the handshake.

use chrono::Utc;
use tracing::info;

use super::envelope::{SignedPayload, VerifiedMessage};
use crate::crypto::{
    derive_shared_key, random_iv, ExchangeKeyPair, HashAlgorithm, SharedKeyParams, SymmetricKey,
    IV_LENGTH,
};
use crate::error::{VaultError, VaultResult};
use crate::profile::Profile;
use crate::schema::{
    decode, Account, KeyPub, PendingAccount, PendingOrigin, Record, RelationResponse,
    ResponseDetails, SecretKeyRef, SignedMessage,
};

/// HKDF info prefix; the request uid is appended.
pub const CHANNEL_INFO_PREFIX: &str = "sigil-relation:";

fn channel_params(uid: &str) -> SharedKeyParams {
    SharedKeyParams {
        info: format!("{}{}", CHANNEL_INFO_PREFIX, uid).into_bytes(),
        length: 256,
        hash: HashAlgorithm::Sha512,
    }
}

fn derive_channel(pending: &PendingAccount, peer: &KeyPub) -> VaultResult<SymmetricKey> {
    let own = ExchangeKeyPair::from_record(&pending.ephemeral_keypair)?;
    derive_shared_key(
        peer,
        &own,
        &pending.request.hkdf_salt,
        &channel_params(&pending.request.uid),
        true,
    )
}

fn pending_entry(profile: &mut Profile, uid: &str) -> VaultResult<PendingAccount> {
    profile
        .pending(uid)?
        .cloned()
        .ok_or_else(|| VaultError::Validation(format!("no pending request {}", uid)))
}

/// Accept an incoming request.
///
/// Derives the channel key, seals `details` under it, turns the pending entry
/// into an account and returns the signed response for the requester.
pub fn accept_request(
    profile: &mut Profile,
    uid: &str,
    details: ResponseDetails,
) -> VaultResult<SignedMessage> {
    let pending = pending_entry(profile, uid)?;
    let requester_sign_key = match &pending.origin {
        PendingOrigin::Incoming { requester_sign_key } => requester_sign_key.clone(),
        PendingOrigin::Outgoing => {
            return Err(VaultError::Validation(format!(
                "{} is our own request and cannot be accepted here",
                uid
            )))
        }
    };
    let request = &pending.request;
    let channel = derive_channel(&pending, &request.public_exchange_key)?;

    let iv = random_iv(IV_LENGTH);
    let sealed_details = channel.encrypt_with_iv(&details.encode()?, &iv)?;
    let response = RelationResponse {
        uid: uid.to_string(),
        created_at: Utc::now().timestamp(),
        public_exchange_key: ExchangeKeyPair::from_record(&pending.ephemeral_keypair)?.key_pub(),
        iv,
        sealed_details,
    };
    let signed = profile.sign_message(&SignedPayload::RelationResponse(response))?;

    let account = Account {
        name: request.nickname.clone(),
        url: Some(request.url.clone()),
        email: request.email.clone(),
        public_sign_key: requester_sign_key,
        public_exchange_key: Some(request.public_exchange_key.clone()),
        hkdf_salt: Some(request.hkdf_salt.clone()),
        shared_key: Some(SecretKeyRef::Inline(channel.export_raw()?.to_vec())),
        established_at: Utc::now().timestamp(),
    };
    if !profile.upgrade_pending(uid, account)? {
        return Err(VaultError::State(format!("account {} already exists", uid)));
    }
    info!(uid, "Relation request accepted");
    Ok(signed)
}

/// Complete an outgoing request with the receiver's verified response.
///
/// Returns the id of the new account. A response that does not open under
/// the derived channel key fails with [`VaultError::Decrypt`] and leaves the
/// pending entry in place.
pub fn complete_request(profile: &mut Profile, verified: &VerifiedMessage) -> VaultResult<String> {
    let response = match &verified.payload {
        SignedPayload::RelationResponse(response) => response,
        other => {
            return Err(VaultError::Validation(format!(
                "expected a relation response, got {}",
                other.message_type().as_str()
            )))
        }
    };
    let pending = pending_entry(profile, &response.uid)?;
    if !pending.is_outgoing() {
        return Err(VaultError::Validation(format!(
            "{} was not requested by this profile",
            response.uid
        )));
    }

    let channel = derive_channel(&pending, &response.public_exchange_key)?;
    let plaintext = channel.decrypt_with_iv(&response.sealed_details, &response.iv)?;
    let details: ResponseDetails = decode(&plaintext)?;

    let account = Account {
        name: details.nickname,
        url: Some(details.url),
        email: details.email,
        public_sign_key: verified.signer().clone(),
        public_exchange_key: Some(response.public_exchange_key.clone()),
        hkdf_salt: Some(pending.request.hkdf_salt.clone()),
        shared_key: Some(SecretKeyRef::Inline(channel.export_raw()?.to_vec())),
        established_at: Utc::now().timestamp(),
    };
    if !profile.upgrade_pending(&response.uid, account)? {
        return Err(VaultError::State(format!(
            "account {} already exists",
            response.uid
        )));
    }
    info!(uid = %response.uid, "Relation established");
    Ok(response.uid.clone())
}

/// The channel key stored on an account, as a non-extractable key.
pub fn channel_key(account: &Account) -> VaultResult<SymmetricKey> {
    match &account.shared_key {
        Some(SecretKeyRef::Inline(bytes)) => SymmetricKey::import_raw(bytes, false),
        Some(SecretKeyRef::StoredKeyId(id)) => Err(VaultError::Validation(format!(
            "channel key {} is held outside the profile",
            id
        ))),
        None => Err(VaultError::Validation("account has no channel key".into())),
    }
}
