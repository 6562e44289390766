//! Relationship establishment between two profiles.
//!
//! ## Handshake
//!
//! ```text
//! Requester                                   Receiver
//! ─────────                                   ────────
//! create_request  ── signed RelationRequest ─▶ receive_request
//!   (pending, Outgoing)                         (pending, Incoming)
//!                                               accept_request
//!                                                 derive channel key
//!                                                 pending ─▶ account
//! complete_request ◀─ signed RelationResponse ──
//!   derive channel key, open sealed details
//!   pending ─▶ account
//! ```
//!
//! Both sides run X25519 between their one-time exchange keys, then
//! HKDF-SHA-512 with the request's salt and `sigil-relation:<uid>` as info.
//! Each side signs with its long-term Ed25519 key, so every step is
//! verified before it is decoded.

mod confirm;
mod envelope;
mod request;

pub use confirm::{accept_request, channel_key, complete_request, CHANNEL_INFO_PREFIX};
pub use envelope::{
    armor_signed_message, open_armored, open_signed_message, sign_message, SignedPayload,
    VerifiedMessage,
};
pub use request::{
    create_request, decline_request, export_pending, import_pending, receive_request,
    send_request, OutgoingRequest,
};
