//! Capability-based handler invocation.
//!
//! Handlers declare an arbitrary parameter list instead of a fixed signature.
//! Each parameter is one of two capabilities:
//!
//! - [`Ctx`] — the request context, passed by ownership (it is a cheap
//!   handle), and
//! - [`Dep<T>`] — a dependency of type `T` resolved from the
//!   [`ServiceRegistry`].
//!
//! The parameter list is described once at registration time as a vector of
//! [`ParamKind`] descriptors. There is no runtime type introspection: the
//! descriptors let the application validate dependency availability eagerly
//! at startup, and the erased call binds each argument through
//! [`HandlerParam::bind`] on every request.

use crate::context::Ctx;
use crate::registry::ServiceRegistry;
use std::any::{type_name, Any, TypeId};
use std::ops::Deref;
use std::sync::Arc;
use thiserror::Error;

/// Descriptor of one declared handler parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// The request context capability.
    Context,
    /// A dependency resolved from the service registry by type identity.
    Dependency {
        id: TypeId,
        type_name: &'static str,
    },
}

/// A handler declared a dependency the registry cannot resolve. Missing
/// wiring is a programming error, not a runtime condition; the dispatcher
/// aborts the request and the application fails startup validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing dependency: {type_name}")]
pub struct MissingDependency {
    pub type_name: &'static str,
}

/// An injected dependency. Dereferences to `T`.
pub struct Dep<T: ?Sized>(Arc<T>);

impl<T: ?Sized> Dep<T> {
    /// The shared instance behind this injection.
    #[must_use]
    pub fn into_inner(self) -> Arc<T> {
        self.0
    }
}

impl<T: ?Sized> Deref for Dep<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: ?Sized> Clone for Dep<T> {
    fn clone(&self) -> Self {
        Dep(Arc::clone(&self.0))
    }
}

/// A value that can be bound as a handler parameter.
pub trait HandlerParam: Sized + Send + 'static {
    /// Descriptor recorded at registration time.
    fn kind() -> ParamKind;

    /// Resolve the value for one request.
    fn bind(ctx: &Ctx, registry: &ServiceRegistry) -> Result<Self, MissingDependency>;
}

impl HandlerParam for Ctx {
    fn kind() -> ParamKind {
        ParamKind::Context
    }

    fn bind(ctx: &Ctx, _registry: &ServiceRegistry) -> Result<Self, MissingDependency> {
        Ok(ctx.clone())
    }
}

impl<T: Any + Send + Sync> HandlerParam for Dep<T> {
    fn kind() -> ParamKind {
        ParamKind::Dependency {
            id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    fn bind(_ctx: &Ctx, registry: &ServiceRegistry) -> Result<Self, MissingDependency> {
        registry.get::<T>().map(Dep).ok_or(MissingDependency {
            type_name: type_name::<T>(),
        })
    }
}

pub(crate) type ErasedCall =
    Box<dyn Fn(&Ctx, &ServiceRegistry) -> Result<(), MissingDependency> + Send + Sync>;

/// A registered handler: its parameter descriptors plus the erased call.
pub struct ErasedHandler {
    pub(crate) kinds: Vec<ParamKind>,
    pub(crate) call: ErasedCall,
}

impl ErasedHandler {
    /// Parameter descriptors recorded at registration.
    #[must_use]
    pub fn param_kinds(&self) -> &[ParamKind] {
        &self.kinds
    }
}

/// Conversion from a plain function or closure into an [`ErasedHandler`].
///
/// Implemented for `Fn` arities 0 through 6 whose arguments all implement
/// [`HandlerParam`], so `|ctx: Ctx, db: Dep<Db>| { ... }` registers directly.
pub trait IntoHandler<Args> {
    fn param_kinds() -> Vec<ParamKind>;
    fn into_erased(self) -> ErasedHandler;
}

macro_rules! impl_into_handler {
    ($(($ty:ident, $arg:ident)),*) => {
        impl<F, $($ty,)*> IntoHandler<($($ty,)*)> for F
        where
            F: Fn($($ty),*) + Send + Sync + 'static,
            $($ty: HandlerParam,)*
        {
            fn param_kinds() -> Vec<ParamKind> {
                vec![$($ty::kind()),*]
            }

            fn into_erased(self) -> ErasedHandler {
                ErasedHandler {
                    kinds: <F as IntoHandler<($($ty,)*)>>::param_kinds(),
                    call: Box::new(move |_ctx, _registry| {
                        $(let $arg = $ty::bind(_ctx, _registry)?;)*
                        (self)($($arg),*);
                        Ok(())
                    }),
                }
            }
        }
    };
}

impl_into_handler!();
impl_into_handler!((A1, a1));
impl_into_handler!((A1, a1), (A2, a2));
impl_into_handler!((A1, a1), (A2, a2), (A3, a3));
impl_into_handler!((A1, a1), (A2, a2), (A3, a3), (A4, a4));
impl_into_handler!((A1, a1), (A2, a2), (A3, a3), (A4, a4), (A5, a5));
impl_into_handler!((A1, a1), (A2, a2), (A3, a3), (A4, a4), (A5, a5), (A6, a6));
