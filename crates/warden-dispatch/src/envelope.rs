//! Call and result envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use warden_session::AccessToken;

use crate::descriptor::ProtectionLevel;
use crate::error::{DispatchError, ErrorBody};

/// Inbound call as decoded by a transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEnvelope {
    /// Function to invoke.
    pub func_id: String,
    /// Access token, if the caller presented one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Argument payload; absent means `null`.
    #[serde(default)]
    pub payload: Value,
}

impl CallEnvelope {
    /// Split into dispatcher inputs.
    ///
    /// `channel` is the protection level the transport provides.
    pub fn into_call(self, channel: ProtectionLevel) -> (CallArguments, PresentedToken) {
        let token = PresentedToken::parse(self.access_token.as_deref());
        let call = CallArguments::new(self.func_id, self.payload).with_channel(channel);
        (call, token)
    }
}

/// A token as presented by a caller, before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresentedToken {
    /// No token (or an empty string).
    #[default]
    Absent,
    /// A well-formed token.
    Token(AccessToken),
    /// Something that cannot be a token; never names a session.
    Malformed,
}

impl PresentedToken {
    /// Parse the raw string form a transport received.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::Absent,
            Some(s) => s.parse().map_or(Self::Malformed, Self::Token),
        }
    }

    /// Whether the caller presented anything at all.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl From<AccessToken> for PresentedToken {
    fn from(token: AccessToken) -> Self {
        Self::Token(token)
    }
}

impl From<Option<AccessToken>> for PresentedToken {
    fn from(token: Option<AccessToken>) -> Self {
        token.map_or(Self::Absent, Self::Token)
    }
}

/// Arguments of one call.
#[derive(Debug, Clone)]
pub struct CallArguments {
    /// Function to invoke.
    pub func_id: String,
    /// Argument payload, decoded into the handler's argument type.
    pub payload: Value,
    /// Protection provided by the channel the call arrived on.
    pub channel: ProtectionLevel,
}

impl CallArguments {
    /// Create call arguments over an unprotected channel.
    pub fn new(func_id: impl Into<String>, payload: Value) -> Self {
        Self {
            func_id: func_id.into(),
            payload,
            channel: ProtectionLevel::None,
        }
    }

    /// Create call arguments by serializing a typed payload.
    pub fn typed<T: Serialize>(func_id: impl Into<String>, payload: &T) -> serde_json::Result<Self> {
        Ok(Self::new(func_id, serde_json::to_value(payload)?))
    }

    /// Set the channel protection level.
    pub fn with_channel(mut self, channel: ProtectionLevel) -> Self {
        self.channel = channel;
        self
    }
}

/// Result of one call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallResult {
    /// Function that was called.
    pub func_id: String,
    /// Serialized handler result, or the classified failure.
    pub outcome: Result<Value, DispatchError>,
}

impl CallResult {
    /// Successful result.
    pub fn success(func_id: impl Into<String>, payload: Value) -> Self {
        Self {
            func_id: func_id.into(),
            outcome: Ok(payload),
        }
    }

    /// Failed result.
    pub fn failure(func_id: impl Into<String>, error: DispatchError) -> Self {
        Self {
            func_id: func_id.into(),
            outcome: Err(error),
        }
    }

    /// Whether the call succeeded.
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The failure, if any.
    pub fn error(&self) -> Option<&DispatchError> {
        self.outcome.as_ref().err()
    }

    /// Decode the success payload into a typed result.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Option<serde_json::Result<T>> {
        self.outcome
            .as_ref()
            .ok()
            .map(|v| serde_json::from_value(v.clone()))
    }

    /// Convert into the outbound wire envelope.
    pub fn into_envelope(self) -> ResultEnvelope {
        match self.outcome {
            Ok(payload) => ResultEnvelope {
                success: true,
                payload: Some(payload),
                error: None,
            },
            Err(e) => ResultEnvelope {
                success: false,
                payload: None,
                error: Some(e.to_body()),
            },
        }
    }
}

/// Outbound result as sent by a transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    /// Whether the call succeeded.
    pub success: bool,
    /// Result payload on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Error on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl ResultEnvelope {
    /// Envelope for a failure detected before dispatch (e.g. an undecodable body).
    pub fn from_error(error: &DispatchError) -> Self {
        Self {
            success: false,
            payload: None,
            error: Some(error.to_body()),
        }
    }
}
