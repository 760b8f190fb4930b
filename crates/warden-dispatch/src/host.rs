//! Live business object instances addressed by owner type name.
//!
//! Transports receive the owner type as a string; [`ObjectHost`] maps it
//! back to a typed instance so the dispatcher can stay generic over `O`.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::dispatcher::Dispatcher;
use crate::envelope::{CallArguments, CallResult, PresentedToken};
use crate::registry::BusinessObject;

/// Object-safe view of a hosted business object.
pub trait HostedObject: Send + Sync {
    /// Owner type name.
    fn owner_type(&self) -> &'static str;

    /// Dispatch a call to this object.
    fn dispatch<'a>(
        &'a self,
        dispatcher: &'a Dispatcher,
        call: CallArguments,
        token: PresentedToken,
    ) -> BoxFuture<'a, CallResult>;
}

/// A typed business object behind [`HostedObject`].
pub struct Hosted<O>(pub Arc<O>);

impl<O: BusinessObject> HostedObject for Hosted<O> {
    fn owner_type(&self) -> &'static str {
        O::OWNER_TYPE
    }

    fn dispatch<'a>(
        &'a self,
        dispatcher: &'a Dispatcher,
        call: CallArguments,
        token: PresentedToken,
    ) -> BoxFuture<'a, CallResult> {
        dispatcher.dispatch(&self.0, call, token).boxed()
    }
}

/// Hosted objects keyed by owner type name.
#[derive(Clone, Default)]
pub struct ObjectHost {
    objects: BTreeMap<&'static str, Arc<dyn HostedObject>>,
}

impl ObjectHost {
    /// Create an empty host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Host an object instance, replacing any previous instance of its type.
    pub fn with_object<O: BusinessObject>(mut self, object: Arc<O>) -> Self {
        self.insert(object);
        self
    }

    /// Host an object instance, replacing any previous instance of its type.
    pub fn insert<O: BusinessObject>(&mut self, object: Arc<O>) {
        self.objects
            .insert(O::OWNER_TYPE, Arc::new(Hosted(object)));
    }

    /// Look up a hosted object.
    pub fn get(&self, owner_type: &str) -> Option<&Arc<dyn HostedObject>> {
        self.objects.get(owner_type)
    }

    /// Hosted owner type names.
    pub fn owner_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.objects.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl std::fmt::Debug for ObjectHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectHost")
            .field("objects", &self.objects.keys().collect::<Vec<_>>())
            .finish()
    }
}
