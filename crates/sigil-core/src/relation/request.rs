//! Creating, receiving and managing relationship requests.

use chrono::Utc;
use tracing::info;

use super::envelope::{SignedPayload, VerifiedMessage};
use crate::armor::{self, PENDING_ACCOUNT_LABEL};
use crate::config::VaultConfig;
use crate::crypto::{
    random_salt, random_uid, ExchangeKeyPair, DEFAULT_SALT_LENGTH, EXCHANGE_ALG,
};
use crate::error::{VaultError, VaultResult};
use crate::profile::Profile;
use crate::schema::{
    decode, PendingAccount, PendingOrigin, Record, RelationRequest, SignedMessage,
};

/// A new request together with the pending entry that keeps its private key.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    /// Public part, to be signed and sent
    pub request: RelationRequest,
    /// Local record holding the one-time exchange key pair
    pub pending: PendingAccount,
}

impl OutgoingRequest {
    pub fn uid(&self) -> &str {
        &self.request.uid
    }
}

fn non_empty(value: &str, field: &str) -> VaultResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(VaultError::Validation(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

/// Build a relationship request with a fresh one-time exchange key pair.
pub fn create_request(
    receiver_label: &str,
    nickname: &str,
    url: &str,
    email: Option<&str>,
    message: Option<&str>,
    config: &VaultConfig,
) -> VaultResult<OutgoingRequest> {
    let receiver_label = non_empty(receiver_label, "receiver label")?;
    let nickname = non_empty(nickname, "nickname")?;

    let exchange = ExchangeKeyPair::generate(config.key_lifetime_secs());
    let request = RelationRequest {
        nickname,
        url: url.trim().to_string(),
        email: email.map(str::to_string),
        short_message: message.map(str::to_string),
        uid: random_uid(),
        created_at: Utc::now().timestamp(),
        public_exchange_key: exchange.key_pub(),
        hkdf_salt: random_salt(DEFAULT_SALT_LENGTH),
    };
    let pending = PendingAccount {
        receiver_label,
        request: request.clone(),
        ephemeral_keypair: exchange.to_record(),
        origin: PendingOrigin::Outgoing,
    };
    Ok(OutgoingRequest { request, pending })
}

/// Create a request, sign it with the profile key and record it as pending.
pub fn send_request(
    profile: &mut Profile,
    receiver_label: &str,
    nickname: &str,
    url: &str,
    email: Option<&str>,
    message: Option<&str>,
) -> VaultResult<SignedMessage> {
    let outgoing = create_request(receiver_label, nickname, url, email, message, profile.config())?;
    let signed = profile.sign_message(&SignedPayload::RelationRequest(outgoing.request.clone()))?;
    if !profile.add_pending(outgoing.uid(), outgoing.pending.clone())? {
        return Err(VaultError::State(format!(
            "request id {} already in use",
            outgoing.uid()
        )));
    }
    info!(uid = outgoing.uid(), "Relation request created");
    Ok(signed)
}

/// Store a verified incoming request as a pending entry.
///
/// Returns `Ok(false)` if a pending entry or account with the request's uid
/// already exists.
pub fn receive_request(
    profile: &mut Profile,
    verified: &VerifiedMessage,
    label: &str,
) -> VaultResult<bool> {
    let request = match &verified.payload {
        SignedPayload::RelationRequest(request) => request.clone(),
        other => {
            return Err(VaultError::Validation(format!(
                "expected a relation request, got {}",
                other.message_type().as_str()
            )))
        }
    };
    if request.public_exchange_key.alg != EXCHANGE_ALG {
        return Err(VaultError::Validation(format!(
            "request exchange key must be {}",
            EXCHANGE_ALG
        )));
    }
    if request.hkdf_salt.is_empty() {
        return Err(VaultError::Validation("request carries no salt".into()));
    }

    let label = if label.trim().is_empty() {
        request.nickname.clone()
    } else {
        label.trim().to_string()
    };
    let uid = request.uid.clone();
    let exchange = ExchangeKeyPair::generate(profile.config().key_lifetime_secs());
    // Malformed or low-order requester keys never become pending entries.
    exchange.diffie_hellman(&request.public_exchange_key)?;
    let pending = PendingAccount {
        receiver_label: label,
        request,
        ephemeral_keypair: exchange.to_record(),
        origin: PendingOrigin::Incoming {
            requester_sign_key: verified.signer().clone(),
        },
    };

    let added = profile.add_pending(&uid, pending)?;
    if added {
        info!(uid = %uid, "Relation request received");
    }
    Ok(added)
}

/// Drop a pending entry without answering it.
pub fn decline_request(profile: &mut Profile, uid: &str) -> VaultResult<bool> {
    profile.remove_pending(uid)
}

/// Armor a pending entry, private key included, for backup.
pub fn export_pending(profile: &mut Profile, uid: &str) -> VaultResult<String> {
    let width = profile.config().armor_width;
    let pending = profile
        .pending(uid)?
        .ok_or_else(|| VaultError::Validation(format!("no pending entry {}", uid)))?;
    Ok(armor::armor(PENDING_ACCOUNT_LABEL, &pending.encode()?, width))
}

/// Restore an armored pending entry. `Ok(false)` if its uid is taken.
pub fn import_pending(profile: &mut Profile, text: &str) -> VaultResult<bool> {
    let bytes = armor::dearmor_expecting(text, PENDING_ACCOUNT_LABEL)?;
    let pending: PendingAccount = decode(&bytes)?;
    ExchangeKeyPair::from_record(&pending.ephemeral_keypair)?;
    let uid = pending.request.uid.clone();
    profile.add_pending(&uid, pending)
}
