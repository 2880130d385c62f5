//! Error types for the envelope client.
//!
//! # Design
//! Faults are split by who is to blame. `Transport`, `Encode` and `Decode`
//! are infrastructure faults with no business meaning; callers usually
//! abort on them. `Business` carries the service's own error code and
//! description, and is the variant callers are expected to branch on (show
//! a validation message, treat "not found" as empty, ...).

use crate::envelope::ServiceError;

/// Errors returned by `WsClient` and `RestClient` calls.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced a response: connection refused, DNS
    /// failure, timeout, or the body could not be read.
    #[error("transport failed: {message}")]
    Transport { message: String },

    /// The request could not be built: bad URL or unserializable body.
    #[error("request encoding failed: {message}")]
    Encode { message: String },

    /// The response body was not a well-formed envelope of the expected shape.
    #[error("response decoding failed: {message}")]
    Decode { message: String },

    /// The service answered with a non-`OK` envelope.
    #[error(transparent)]
    Business(ServiceError),
}

impl ClientError {
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Self::Transport { message: message.into() }
    }

    pub(crate) fn encode(message: impl Into<String>) -> Self {
        Self::Encode { message: message.into() }
    }

    pub(crate) fn decode(message: impl Into<String>) -> Self {
        Self::Decode { message: message.into() }
    }

    /// `true` when the service rejected the call through its envelope.
    #[must_use]
    pub fn is_business(&self) -> bool {
        matches!(self, Self::Business(_))
    }

    /// `true` for transport, encode and decode faults.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !self.is_business()
    }

    #[must_use]
    pub fn as_business(&self) -> Option<&ServiceError> {
        match self {
            Self::Business(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ServiceError> for ClientError {
    fn from(err: ServiceError) -> Self {
        Self::Business(err)
    }
}
