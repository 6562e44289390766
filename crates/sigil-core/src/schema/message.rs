use serde::{Deserialize, Serialize};

use super::{KeyPub, Record};

/// Kind of payload carried by a [`SignedMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    RelationRequest,
    RelationResponse,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::RelationRequest => "relation_request",
            MessageType::RelationResponse => "relation_response",
        }
    }
}

/// Proposal to establish a relationship.
///
/// Carries only the public half of the requester's one-time exchange key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationRequest {
    pub nickname: String,
    pub url: String,
    pub email: Option<String>,
    pub short_message: Option<String>,
    pub uid: String,
    pub created_at: i64,
    pub public_exchange_key: KeyPub,
    pub hkdf_salt: Vec<u8>,
}

/// Acceptance of a [`RelationRequest`], answering with the receiver's
/// exchange key and its sealed contact details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationResponse {
    /// Uid of the request being answered
    pub uid: String,
    pub created_at: i64,
    pub public_exchange_key: KeyPub,
    pub iv: Vec<u8>,
    /// [`ResponseDetails`] encrypted under the channel key
    pub sealed_details: Vec<u8>,
}

/// Contact details a receiver shares when accepting a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseDetails {
    pub nickname: String,
    pub url: String,
    pub email: Option<String>,
    pub short_message: Option<String>,
}

/// Signed envelope around an encoded payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedMessage {
    pub signature: Vec<u8>,
    pub uid: Option<String>,
    pub identity_ref: Option<String>,
    pub signer_public_key: KeyPub,
    pub message_type: MessageType,
    pub message: Vec<u8>,
}

impl Record for MessageType {
    const NAME: &'static str = "MessageType";
}

impl Record for RelationRequest {
    const NAME: &'static str = "RelationRequest";
}

impl Record for RelationResponse {
    const NAME: &'static str = "RelationResponse";
}

impl Record for ResponseDetails {
    const NAME: &'static str = "ResponseDetails";
}

impl Record for SignedMessage {
    const NAME: &'static str = "SignedMessage";
}
