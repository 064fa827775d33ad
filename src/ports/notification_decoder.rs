//! NotificationDecoder port - Provider payload to normalized event.
//!
//! Each provider plugs in its own decoder; the orchestrator only ever sees
//! `DecodedNotification`.

use std::collections::HashMap;

use crate::domain::billing::{DecodeError, RenewalEvent};

/// A pushed message as received, before provider-specific decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundMessage {
    /// Push delivery id; becomes the event's dedup key.
    pub message_id: Option<String>,

    /// Opaque provider payload (base64).
    pub data: String,

    pub publish_time: Option<String>,
    pub attributes: HashMap<String, String>,
}

/// What a payload turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedNotification {
    /// A subscription lifecycle event to reconcile.
    Renewal(RenewalEvent),

    /// Console test publish; acknowledged and otherwise ignored.
    Test,

    /// A notification this engine does not handle; acknowledged and logged.
    Unsupported(String),
}

pub trait NotificationDecoder: Send + Sync {
    /// Decodes a pushed message.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError` if the payload cannot be parsed.
    fn decode(&self, message: &InboundMessage) -> Result<DecodedNotification, DecodeError>;
}
