//! Process-wide dependency store.
//!
//! Maps a dependency's type identity to its single instance. Populated by the
//! application before serving begins and read-only during request handling;
//! the last registration for a type silently wins.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Type-keyed registry of shared service instances.
#[derive(Default)]
pub struct ServiceRegistry {
    services: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl ServiceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instance. At most one instance per type is kept; a second
    /// `add` of the same type replaces the first.
    pub fn add<T: Any + Send + Sync>(&self, service: T) {
        self.add_arc(Arc::new(service));
    }

    /// Register an already-shared instance.
    pub fn add_arc<T: Any + Send + Sync>(&self, service: Arc<T>) {
        let mut services = self
            .services
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        services.insert(TypeId::of::<T>(), service);
    }

    /// Look up the instance registered for `T`.
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        let services = self
            .services
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        services
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|entry| entry.downcast::<T>().ok())
    }

    pub(crate) fn contains(&self, id: TypeId) -> bool {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Db {
        dsn: String,
    }

    #[test]
    fn add_then_get_round_trips() {
        let registry = ServiceRegistry::new();
        registry.add(Db {
            dsn: "postgres://localhost".to_string(),
        });
        let db = registry.get::<Db>().unwrap();
        assert_eq!(db.dsn, "postgres://localhost");
    }

    #[test]
    fn last_registration_wins() {
        let registry = ServiceRegistry::new();
        registry.add(Db {
            dsn: "first".to_string(),
        });
        registry.add(Db {
            dsn: "second".to_string(),
        });
        assert_eq!(registry.get::<Db>().unwrap().dsn, "second");
    }

    #[test]
    fn missing_type_is_absent() {
        let registry = ServiceRegistry::new();
        assert!(registry.get::<Db>().is_none());
    }
}
