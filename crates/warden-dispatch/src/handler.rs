//! Typed handlers and their type-erased form.
//!
//! A handler is an async function `(Arc<O>, CallContext, A) -> anyhow::Result<R>`
//! where `A` and `R` are serde types. The registry stores it behind
//! [`ErasedHandler`] so heterogeneous argument and result shapes share one
//! call signature over `serde_json::Value`.

use std::any::Any;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use warden_session::SessionRecord;

use crate::error::DispatchError;

/// What a handler knows about the call it is serving.
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Function being invoked.
    pub func_id: String,
    /// Validated session. Always `Some` for authenticated functions and
    /// always `None` for anonymous ones.
    pub session: Option<SessionRecord>,
}

impl CallContext {
    /// The calling user, if authenticated.
    pub fn user_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.user_id.as_str())
    }

    /// The validated session, or an error for handlers that need one.
    pub fn require_session(&self) -> anyhow::Result<&SessionRecord> {
        self.session
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("this function requires an authenticated session"))
    }
}

/// Future returned by an erased handler.
pub type HandlerFuture = BoxFuture<'static, Result<Value, DispatchError>>;

/// Arguments decoded by [`ErasedHandler::decode`], waiting to be invoked.
pub type DecodedArgs = Box<dyn Any + Send>;

/// Type-erased handler for owner type `O`.
///
/// Decoding and invocation are separate steps so the dispatcher can reject
/// a malformed payload before it touches the caller's session.
pub trait ErasedHandler<O>: Send + Sync {
    /// Decode `payload` into the handler's argument type.
    fn decode(&self, payload: Value) -> Result<DecodedArgs, DispatchError>;

    /// Run the handler on arguments produced by [`decode`](Self::decode)
    /// and serialize its result.
    ///
    /// Errors returned by the handler are surfaced unchanged as
    /// [`DispatchError::HandlerFailure`]; so are panics.
    fn invoke(&self, owner: Arc<O>, ctx: CallContext, args: DecodedArgs) -> HandlerFuture;

    /// Decode and invoke in one step.
    fn call(&self, owner: Arc<O>, ctx: CallContext, payload: Value) -> HandlerFuture {
        match self.decode(payload) {
            Ok(args) => self.invoke(owner, ctx, args),
            Err(err) => futures::future::ready(Err(err)).boxed(),
        }
    }
}

/// Adapter from a typed async function to [`ErasedHandler`].
pub(crate) struct TypedHandler<F, A, R> {
    f: F,
    _shape: PhantomData<fn(A) -> R>,
}

impl<F, A, R> TypedHandler<F, A, R> {
    pub(crate) fn new(f: F) -> Self {
        Self {
            f,
            _shape: PhantomData,
        }
    }
}

impl<O, F, Fut, A, R> ErasedHandler<O> for TypedHandler<F, A, R>
where
    O: Send + Sync + 'static,
    F: Fn(Arc<O>, CallContext, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    A: DeserializeOwned + Send + 'static,
    R: Serialize + 'static,
{
    fn decode(&self, payload: Value) -> Result<DecodedArgs, DispatchError> {
        serde_json::from_value::<A>(payload)
            .map(|args| Box::new(args) as DecodedArgs)
            .map_err(|e| DispatchError::MalformedArguments(e.to_string()))
    }

    fn invoke(&self, owner: Arc<O>, ctx: CallContext, args: DecodedArgs) -> HandlerFuture {
        let args = match args.downcast::<A>() {
            Ok(args) => *args,
            Err(_) => {
                let err = DispatchError::MalformedArguments(
                    "arguments were decoded for a different function".to_string(),
                );
                return futures::future::ready(Err(err)).boxed();
            }
        };

        let fut = match std::panic::catch_unwind(AssertUnwindSafe(|| (self.f)(owner, ctx, args))) {
            Ok(fut) => fut,
            Err(panic) => {
                let err = DispatchError::HandlerFailure(panic_message(panic.as_ref()));
                return futures::future::ready(Err(err)).boxed();
            }
        };

        async move {
            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(result)) => serde_json::to_value(result).map_err(|e| {
                    DispatchError::HandlerFailure(format!("result could not be encoded: {e}"))
                }),
                Ok(Err(e)) => Err(DispatchError::HandlerFailure(e.to_string())),
                Err(panic) => Err(DispatchError::HandlerFailure(panic_message(panic.as_ref()))),
            }
        }
        .boxed()
    }
}

/// Extract the message a panic was raised with.
fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
