//! RPC endpoints.
//!
//! `POST /rpc/{object}` decodes a [`CallEnvelope`] and dispatches it to the
//! hosted object of that owner type. `GET /rpc/{object}` lists the
//! object's function descriptors.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State, rejection::BytesRejection},
    http::{HeaderMap, header::AUTHORIZATION},
};
use serde::Serialize;
use tracing::debug;
use warden_dispatch::{CallEnvelope, DispatchError, FunctionDescriptor, ResultEnvelope};

use crate::error::{Result, ServerError};
use crate::state::AppState;

/// Descriptor listing for one owner type.
#[derive(Debug, Serialize)]
pub struct ListFunctionsResponse {
    /// Owner type name.
    pub owner_type: String,
    /// Declared functions, ordered by id.
    pub functions: Vec<FunctionDescriptor>,
}

/// Extract a bearer token from the `Authorization` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Dispatch one call.
pub async fn call_handler(
    State(state): State<AppState>,
    Path(object): Path<String>,
    headers: HeaderMap,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Json<ResultEnvelope>> {
    let body = body.map_err(|rejection| ServerError::Body {
        status: rejection.status(),
        error: DispatchError::MalformedArguments(rejection.body_text()),
    })?;

    let mut envelope: CallEnvelope = serde_json::from_slice(&body)
        .map_err(|e| DispatchError::MalformedArguments(format!("invalid call envelope: {e}")))?;

    let envelope_has_token = envelope
        .access_token
        .as_deref()
        .is_some_and(|t| !t.trim().is_empty());
    if !envelope_has_token {
        envelope.access_token = bearer_token(&headers).map(str::to_string);
    }

    let Some(hosted) = state.objects.get(&object) else {
        return Err(DispatchError::NoSuchFunction {
            owner_type: object,
            func_id: envelope.func_id,
        }
        .into());
    };

    debug!(object = %object, func_id = %envelope.func_id, "RPC request");
    let (call, token) = envelope.into_call(state.config.channel_protection);
    let result = hosted.dispatch(&state.dispatcher, call, token).await;

    match result.outcome {
        Ok(payload) => Ok(Json(ResultEnvelope {
            success: true,
            payload: Some(payload),
            error: None,
        })),
        Err(e) => Err(e.into()),
    }
}

/// List the functions of a hosted object.
pub async fn list_functions_handler(
    State(state): State<AppState>,
    Path(object): Path<String>,
) -> Result<Json<ListFunctionsResponse>> {
    if state.objects.get(&object).is_none() {
        return Err(ServerError::NotFound(format!("object '{object}'")));
    }

    let functions = state
        .dispatcher
        .registry()
        .functions_of(&object)
        .into_iter()
        .cloned()
        .collect();

    Ok(Json(ListFunctionsResponse {
        owner_type: object,
        functions,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc-123"));
        assert_eq!(bearer_token(&headers), Some("abc-123"));
    }
}
