//! Signed message envelope.
//!
//! The signature covers a domain tag, the message type and the encoded
//! payload, so a payload can never be replayed under a different type.

use crate::armor::{self, SIGNED_MESSAGE_LABEL};
use crate::crypto::{random_uid, verify_signature, SigningKeyPair};
use crate::error::VaultResult;
use crate::schema::{
    decode, KeyPub, MessageType, Record, RelationRequest, RelationResponse, SignedMessage,
};

const SIGNING_DOMAIN: &[u8] = b"sigil-signed-message\0";

/// Payload carried by a [`SignedMessage`], one variant per [`MessageType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignedPayload {
    RelationRequest(RelationRequest),
    RelationResponse(RelationResponse),
}

impl SignedPayload {
    pub fn message_type(&self) -> MessageType {
        match self {
            SignedPayload::RelationRequest(_) => MessageType::RelationRequest,
            SignedPayload::RelationResponse(_) => MessageType::RelationResponse,
        }
    }

    fn encode(&self) -> VaultResult<Vec<u8>> {
        match self {
            SignedPayload::RelationRequest(request) => request.encode(),
            SignedPayload::RelationResponse(response) => response.encode(),
        }
    }

    fn decode(message_type: MessageType, bytes: &[u8]) -> VaultResult<Self> {
        Ok(match message_type {
            MessageType::RelationRequest => SignedPayload::RelationRequest(decode(bytes)?),
            MessageType::RelationResponse => SignedPayload::RelationResponse(decode(bytes)?),
        })
    }
}

/// A signed message whose signature has been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedMessage {
    pub envelope: SignedMessage,
    pub payload: SignedPayload,
}

impl VerifiedMessage {
    pub fn signer(&self) -> &KeyPub {
        &self.envelope.signer_public_key
    }
}

fn signing_input(message_type: MessageType, message: &[u8]) -> Vec<u8> {
    let tag = message_type.as_str().as_bytes();
    let mut input = Vec::with_capacity(SIGNING_DOMAIN.len() + tag.len() + 1 + message.len());
    input.extend_from_slice(SIGNING_DOMAIN);
    input.extend_from_slice(tag);
    input.push(0);
    input.extend_from_slice(message);
    input
}

/// Encode and sign a payload.
pub fn sign_message(
    payload: &SignedPayload,
    signer: &SigningKeyPair,
    identity_ref: Option<String>,
) -> VaultResult<SignedMessage> {
    let message_type = payload.message_type();
    let message = payload.encode()?;
    let signature = signer.sign(&signing_input(message_type, &message));

    Ok(SignedMessage {
        signature,
        uid: Some(random_uid()),
        identity_ref,
        signer_public_key: signer.key_pub(),
        message_type,
        message,
    })
}

/// Decode an envelope, verify it, and only then decode its payload.
pub fn open_signed_message(bytes: &[u8]) -> VaultResult<VerifiedMessage> {
    let envelope: SignedMessage = decode(bytes)?;
    verify_signature(
        &envelope.signer_public_key,
        &signing_input(envelope.message_type, &envelope.message),
        &envelope.signature,
    )?;
    let payload = SignedPayload::decode(envelope.message_type, &envelope.message)?;
    tracing::debug!(
        message_type = envelope.message_type.as_str(),
        "Verified signed message"
    );
    Ok(VerifiedMessage { envelope, payload })
}

/// Armor a signed message for copy/paste.
pub fn armor_signed_message(message: &SignedMessage, width: usize) -> VaultResult<String> {
    Ok(armor::armor(SIGNED_MESSAGE_LABEL, &message.encode()?, width))
}

/// Dearmor and open a signed message block.
pub fn open_armored(text: &str) -> VaultResult<VerifiedMessage> {
    let bytes = armor::dearmor_expecting(text, SIGNED_MESSAGE_LABEL)?;
    open_signed_message(&bytes)
}
