//! Authenticated function dispatch for Warden.
//!
//! Business object types declare their functions once, each with an access
//! requirement and a channel protection level. The [`Dispatcher`] resolves
//! a call by function id, enforces the policy, validates the caller's
//! session when required, and invokes the typed handler.
//!
//! # Example
//!
//! ```rust,ignore
//! use warden_dispatch::{BusinessObject, CallArguments, CallContext, Dispatcher, FunctionRegistry, FunctionTable};
//!
//! struct Greeter;
//!
//! impl BusinessObject for Greeter {
//!     const OWNER_TYPE: &'static str = "Greeter";
//!
//!     fn declare(table: &mut FunctionTable<Self>) {
//!         table.authenticated("Hello", |_g, ctx: CallContext, args: HelloArgs| async move {
//!             Ok(format!("Hello, {}", args.user_name))
//!         });
//!     }
//! }
//!
//! let registry = Arc::new(FunctionRegistry::builder().object::<Greeter>().build()?);
//! let dispatcher = Dispatcher::new(registry, validator);
//! let result = dispatcher
//!     .dispatch(&Arc::new(Greeter), CallArguments::new("Hello", payload), token)
//!     .await;
//! ```

mod descriptor;
mod dispatcher;
mod envelope;
mod error;
mod handler;
mod host;
mod policy;
mod registry;

pub use descriptor::{AccessRequirement, FunctionDescriptor, ProtectionLevel};
pub use dispatcher::Dispatcher;
pub use envelope::{CallArguments, CallEnvelope, CallResult, PresentedToken, ResultEnvelope};
pub use error::{DispatchError, ErrorBody, ErrorKind};
pub use handler::{CallContext, DecodedArgs, ErasedHandler, HandlerFuture};
pub use host::{Hosted, HostedObject, ObjectHost};
pub use policy::{AccessPolicyDecision, DecisionReason, SessionEvidence, evaluate, protection_satisfied};
pub use registry::{BuildError, BusinessObject, FunctionRegistry, FunctionTable, RegistryBuilder};
