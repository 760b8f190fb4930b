//! Function registry.
//!
//! Each business object type declares its functions once through
//! [`BusinessObject::declare`]. The resulting [`FunctionRegistry`] is
//! immutable and shared read-only by every dispatch.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::descriptor::{AccessRequirement, FunctionDescriptor, ProtectionLevel};
use crate::handler::{CallContext, ErasedHandler, TypedHandler};

/// Error building a registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Two functions share an id within one owner type.
    #[error("Duplicate function: {owner_type}.{func_id}")]
    DuplicateFunction {
        owner_type: &'static str,
        func_id: String,
    },

    /// A function was declared with an empty id.
    #[error("Empty function id declared by {owner_type}")]
    EmptyFuncId { owner_type: &'static str },

    /// The owner type name is already registered.
    #[error("Duplicate owner type: {0}")]
    DuplicateOwner(&'static str),
}

/// A type whose methods are callable through the dispatcher.
///
/// ```rust,ignore
/// impl BusinessObject for Greeter {
///     const OWNER_TYPE: &'static str = "Greeter";
///
///     fn declare(table: &mut FunctionTable<Self>) {
///         table
///             .authenticated("Hello", Greeter::hello)
///             .anonymous("Ping", Greeter::ping);
///     }
/// }
/// ```
pub trait BusinessObject: Send + Sync + Sized + 'static {
    /// Name the owner type is registered and addressed under.
    const OWNER_TYPE: &'static str;

    /// Register this type's functions.
    fn declare(table: &mut FunctionTable<Self>);
}

pub(crate) struct RegisteredFunction<O> {
    pub(crate) descriptor: FunctionDescriptor,
    pub(crate) handler: Arc<dyn ErasedHandler<O>>,
}

/// Declared functions of one owner type.
pub struct FunctionTable<O> {
    functions: HashMap<String, RegisteredFunction<O>>,
    errors: Vec<BuildError>,
}

impl<O: BusinessObject> FunctionTable<O> {
    fn new() -> Self {
        Self {
            functions: HashMap::new(),
            errors: Vec::new(),
        }
    }

    /// Register a handler with an explicit access requirement and protection level.
    pub fn function<F, Fut, A, R>(
        &mut self,
        func_id: impl Into<String>,
        access: AccessRequirement,
        protection: ProtectionLevel,
        handler: F,
    ) -> &mut Self
    where
        F: Fn(Arc<O>, CallContext, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        A: DeserializeOwned + Send + 'static,
        R: Serialize + 'static,
    {
        let func_id = func_id.into();
        if func_id.trim().is_empty() {
            self.errors.push(BuildError::EmptyFuncId {
                owner_type: O::OWNER_TYPE,
            });
            return self;
        }
        if self.functions.contains_key(&func_id) {
            self.errors.push(BuildError::DuplicateFunction {
                owner_type: O::OWNER_TYPE,
                func_id,
            });
            return self;
        }

        let descriptor = FunctionDescriptor {
            func_id: func_id.clone(),
            owner_type: O::OWNER_TYPE,
            access,
            protection,
        };
        self.functions.insert(
            func_id,
            RegisteredFunction {
                descriptor,
                handler: Arc::new(TypedHandler::new(handler)),
            },
        );
        self
    }

    /// Register a handler callable without a session.
    pub fn anonymous<F, Fut, A, R>(&mut self, func_id: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(Arc<O>, CallContext, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        A: DeserializeOwned + Send + 'static,
        R: Serialize + 'static,
    {
        self.function(
            func_id,
            AccessRequirement::Anonymous,
            ProtectionLevel::None,
            handler,
        )
    }

    /// Register a handler that requires a valid session.
    pub fn authenticated<F, Fut, A, R>(
        &mut self,
        func_id: impl Into<String>,
        handler: F,
    ) -> &mut Self
    where
        F: Fn(Arc<O>, CallContext, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        A: DeserializeOwned + Send + 'static,
        R: Serialize + 'static,
    {
        self.function(
            func_id,
            AccessRequirement::Authenticated,
            ProtectionLevel::None,
            handler,
        )
    }

    pub(crate) fn get(&self, func_id: &str) -> Option<&RegisteredFunction<O>> {
        self.functions.get(func_id)
    }
}

/// Builder for [`FunctionRegistry`].
#[derive(Default)]
pub struct RegistryBuilder {
    tables: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    descriptors: BTreeMap<&'static str, BTreeMap<String, FunctionDescriptor>>,
    errors: Vec<BuildError>,
}

impl RegistryBuilder {
    /// Collect the functions declared by `O`.
    pub fn object<O: BusinessObject>(mut self) -> Self {
        if self.descriptors.contains_key(O::OWNER_TYPE)
            || self.tables.contains_key(&TypeId::of::<O>())
        {
            self.errors.push(BuildError::DuplicateOwner(O::OWNER_TYPE));
            return self;
        }

        let mut table = FunctionTable::<O>::new();
        O::declare(&mut table);
        self.errors.append(&mut table.errors);

        let descriptors = table
            .functions
            .iter()
            .map(|(id, f)| (id.clone(), f.descriptor.clone()))
            .collect();
        self.descriptors.insert(O::OWNER_TYPE, descriptors);
        self.tables.insert(TypeId::of::<O>(), Box::new(table));
        self
    }

    /// Finish the registry, failing on the first declaration error.
    pub fn build(mut self) -> Result<FunctionRegistry, BuildError> {
        if !self.errors.is_empty() {
            return Err(self.errors.swap_remove(0));
        }
        let count: usize = self.descriptors.values().map(BTreeMap::len).sum();
        tracing::info!(
            owner_types = self.descriptors.len(),
            functions = count,
            "Function registry built"
        );
        Ok(FunctionRegistry {
            tables: self.tables,
            descriptors: self.descriptors,
        })
    }
}

/// Immutable map from `(owner type, func id)` to descriptor and handler.
pub struct FunctionRegistry {
    tables: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    descriptors: BTreeMap<&'static str, BTreeMap<String, FunctionDescriptor>>,
}

impl FunctionRegistry {
    /// Start building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Look up a function's descriptor.
    pub fn resolve(&self, owner_type: &str, func_id: &str) -> Option<&FunctionDescriptor> {
        self.descriptors.get(owner_type)?.get(func_id)
    }

    /// All descriptors, ordered by owner type then function id.
    pub fn descriptors(&self) -> impl Iterator<Item = &FunctionDescriptor> {
        self.descriptors.values().flat_map(BTreeMap::values)
    }

    /// Descriptors of one owner type, ordered by function id.
    pub fn functions_of(&self, owner_type: &str) -> Vec<&FunctionDescriptor> {
        self.descriptors
            .get(owner_type)
            .map(|fns| fns.values().collect())
            .unwrap_or_default()
    }

    /// Registered owner type names.
    pub fn owner_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.descriptors.keys().copied()
    }

    /// Whether an owner type is registered.
    pub fn contains_owner(&self, owner_type: &str) -> bool {
        self.descriptors.contains_key(owner_type)
    }

    pub(crate) fn table<O: BusinessObject>(&self) -> Option<&FunctionTable<O>> {
        self.tables
            .get(&TypeId::of::<O>())
            .and_then(|t| t.downcast_ref::<FunctionTable<O>>())
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("descriptors", &self.descriptors)
            .finish()
    }
}
