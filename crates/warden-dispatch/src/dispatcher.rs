//! The authenticated dispatch pipeline.
//!
//! ```text
//! Received → Resolved → Decoded → (AuthChecked | AuthSkipped) → Invoked → Succeeded | Failed(kind)
//! ```
//!
//! Protection and argument shape are checked before the session is looked
//! at, so a call refused for either reason never consumes a one-time token.
//! Anonymous functions never reach the session subsystem.

use std::sync::Arc;

use tracing::debug;
use warden_session::{AccessTokenValidator, SessionRecord, ValidationError};

use crate::envelope::{CallArguments, CallResult, PresentedToken};
use crate::error::DispatchError;
use crate::handler::CallContext;
use crate::policy::{self, SessionEvidence};
use crate::registry::{BusinessObject, FunctionRegistry};

/// Routes calls to business object handlers after enforcing access policy.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<FunctionRegistry>,
    validator: AccessTokenValidator,
}

impl Dispatcher {
    /// Create a dispatcher over a built registry.
    pub fn new(registry: Arc<FunctionRegistry>, validator: AccessTokenValidator) -> Self {
        Self {
            registry,
            validator,
        }
    }

    /// The function registry.
    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    /// The token validator.
    pub fn validator(&self) -> &AccessTokenValidator {
        &self.validator
    }

    /// Dispatch one call to `owner`.
    ///
    /// Never panics and never returns an unclassified failure: every error
    /// is a [`DispatchError`] inside the returned [`CallResult`].
    pub async fn dispatch<O: BusinessObject>(
        &self,
        owner: &Arc<O>,
        call: CallArguments,
        token: impl Into<PresentedToken>,
    ) -> CallResult {
        let token = token.into();
        let func_id = call.func_id;
        debug!(owner_type = O::OWNER_TYPE, func_id = %func_id, "Call received");

        let Some(function) = self
            .registry
            .table::<O>()
            .and_then(|table| table.get(&func_id))
        else {
            debug!(owner_type = O::OWNER_TYPE, func_id = %func_id, "No such function");
            let err = DispatchError::NoSuchFunction {
                owner_type: O::OWNER_TYPE.to_string(),
                func_id: func_id.clone(),
            };
            return CallResult::failure(func_id, err);
        };
        let descriptor = &function.descriptor;
        debug!(
            func_id = %func_id,
            access = ?descriptor.access,
            protection = %descriptor.protection,
            "Call resolved"
        );

        if !policy::protection_satisfied(descriptor, call.channel) {
            let err = DispatchError::InsufficientProtection {
                func_id: func_id.clone(),
                required: descriptor.protection,
            };
            return self.failed(func_id, err);
        }

        let args = match function.handler.decode(call.payload) {
            Ok(args) => args,
            Err(err) => return self.failed(func_id, err),
        };

        let session = if descriptor.requires_session() {
            match self.authenticate(&token).await {
                Ok(record) => Some(record),
                Err(ValidationError::StorageUnavailable(_)) => {
                    return self.failed(func_id, DispatchError::StorageUnavailable);
                }
                Err(ValidationError::Unauthorized(reason)) => {
                    let decision =
                        policy::evaluate(descriptor, call.channel, SessionEvidence::Refused(reason));
                    let err = decision
                        .denial(descriptor)
                        .unwrap_or(DispatchError::SessionNotFoundOrExpired);
                    return self.failed(func_id, err);
                }
            }
        } else {
            debug!(func_id = %func_id, "Auth skipped");
            None
        };

        let evidence = session
            .as_ref()
            .map_or(SessionEvidence::NotRequired, SessionEvidence::Valid);
        let decision = policy::evaluate(descriptor, call.channel, evidence);
        if let Some(err) = decision.denial(descriptor) {
            return self.failed(func_id, err);
        }
        if let Some(record) = &session {
            debug!(func_id = %func_id, user_id = %record.user_id, "Auth checked");
        }

        let ctx = CallContext {
            func_id: func_id.clone(),
            session,
        };
        debug!(func_id = %func_id, "Handler invoked");
        match function
            .handler
            .invoke(Arc::clone(owner), ctx, args)
            .await
        {
            Ok(payload) => {
                debug!(func_id = %func_id, "Call succeeded");
                CallResult::success(func_id, payload)
            }
            Err(err) => self.failed(func_id, err),
        }
    }

    async fn authenticate(&self, token: &PresentedToken) -> Result<SessionRecord, ValidationError> {
        match token {
            PresentedToken::Absent => self.validator.validate_presented(None).await,
            // An unparsable token cannot name a session; no lookup needed.
            PresentedToken::Malformed => Err(ValidationError::not_found()),
            PresentedToken::Token(token) => self.validator.validate(token).await,
        }
    }

    fn failed(&self, func_id: String, err: DispatchError) -> CallResult {
        debug!(func_id = %func_id, kind = %err.kind(), "Call failed");
        CallResult::failure(func_id, err)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
