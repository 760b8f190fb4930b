//! Access policy evaluation.
//!
//! Pure functions over a descriptor and what is known about the caller. A
//! decision is recomputed for every call and never stored.

use serde::Serialize;
use warden_session::{SessionRecord, UnauthorizedReason};

use crate::descriptor::{AccessRequirement, FunctionDescriptor, ProtectionLevel};
use crate::error::DispatchError;

/// What the dispatcher learned about the caller's session.
#[derive(Debug, Clone, Copy)]
pub enum SessionEvidence<'a> {
    /// The function is anonymous, so no session was looked at.
    NotRequired,
    /// The validator accepted the token.
    Valid(&'a SessionRecord),
    /// The validator refused the token.
    Refused(UnauthorizedReason),
}

/// Why a call was allowed or denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    AnonymousAccess,
    ValidSession,
    InsufficientProtection,
    MissingToken,
    SessionNotFoundOrExpired,
}

/// Outcome of policy evaluation for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessPolicyDecision {
    pub allowed: bool,
    pub reason: DecisionReason,
}

impl AccessPolicyDecision {
    fn allow(reason: DecisionReason) -> Self {
        Self {
            allowed: true,
            reason,
        }
    }

    fn deny(reason: DecisionReason) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }

    /// The caller-facing error for a denial, `None` when allowed.
    pub fn denial(&self, descriptor: &FunctionDescriptor) -> Option<DispatchError> {
        if self.allowed {
            return None;
        }
        Some(match self.reason {
            DecisionReason::InsufficientProtection => DispatchError::InsufficientProtection {
                func_id: descriptor.func_id.clone(),
                required: descriptor.protection,
            },
            DecisionReason::MissingToken => DispatchError::MissingToken,
            // An allow reason on a denied decision cannot be built by
            // `evaluate`; treat it as the conservative outcome.
            DecisionReason::SessionNotFoundOrExpired
            | DecisionReason::AnonymousAccess
            | DecisionReason::ValidSession => DispatchError::SessionNotFoundOrExpired,
        })
    }
}

/// Whether the channel satisfies the descriptor's protection level.
///
/// Checked before any session I/O so a denied call never consumes a
/// one-time token.
pub fn protection_satisfied(descriptor: &FunctionDescriptor, channel: ProtectionLevel) -> bool {
    channel.satisfies(descriptor.protection)
}

/// Decide whether a call may proceed.
pub fn evaluate(
    descriptor: &FunctionDescriptor,
    channel: ProtectionLevel,
    session: SessionEvidence<'_>,
) -> AccessPolicyDecision {
    if !protection_satisfied(descriptor, channel) {
        return AccessPolicyDecision::deny(DecisionReason::InsufficientProtection);
    }

    match descriptor.access {
        AccessRequirement::Anonymous => AccessPolicyDecision::allow(DecisionReason::AnonymousAccess),
        AccessRequirement::Authenticated => match session {
            SessionEvidence::Valid(_) => AccessPolicyDecision::allow(DecisionReason::ValidSession),
            SessionEvidence::Refused(UnauthorizedReason::MissingToken)
            | SessionEvidence::NotRequired => {
                AccessPolicyDecision::deny(DecisionReason::MissingToken)
            }
            SessionEvidence::Refused(UnauthorizedReason::SessionNotFoundOrExpired) => {
                AccessPolicyDecision::deny(DecisionReason::SessionNotFoundOrExpired)
            }
        },
    }
}
