//! The service container.
//!
//! Services are values handlers fetch by key at dispatch time: a database
//! pool, an HTTP client, a counter. Each binding has a lifecycle fixed when
//! it is bound:
//!
//! - **constructed**: the builder runs on every [`get`](ServiceContainer::get)
//! - **singleton**: the builder runs on first fetch; later fetches share it
//! - **instance**: a ready value, never rebuilt
//!
//! Builders are async and receive the container, so a service can depend on
//! others.
//!
//! ```rust
//! use parley_framework::ServiceContainer;
//!
//! # tokio_test::block_on(async {
//! let services = ServiceContainer::new();
//! services.bind_instance("greeting", String::from("hello")).unwrap();
//! services.alias("greeting", "hi").unwrap();
//!
//! let greeting = services.get::<String>("hi").await.unwrap();
//! assert_eq!(greeting.as_str(), "hello");
//! # });
//! ```

use std::any::{Any, type_name};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use tokio::sync::OnceCell;
use tracing::trace;

use crate::error::{ServiceError, ServiceResult};
use crate::registry::{AliasTable, TableError};

/// A type-erased service value.
pub type ServiceArc = Arc<dyn Any + Send + Sync>;

type Builder = Arc<dyn Fn(ServiceContainer) -> BoxFuture<'static, ServiceArc> + Send + Sync>;

/// The lifecycle of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Constructed,
    Singleton,
    Instance,
}

#[derive(Clone)]
enum Binding {
    Constructed(Builder),
    Singleton {
        build: Builder,
        cell: Arc<OnceCell<ServiceArc>>,
    },
    Instance(ServiceArc),
}

impl Binding {
    fn kind(&self) -> ServiceKind {
        match self {
            Self::Constructed(_) => ServiceKind::Constructed,
            Self::Singleton { .. } => ServiceKind::Singleton,
            Self::Instance(_) => ServiceKind::Instance,
        }
    }
}

impl From<TableError> for ServiceError {
    fn from(err: TableError) -> Self {
        match err {
            TableError::DuplicateName(key) => ServiceError::DuplicateKey(key),
            TableError::DuplicateAlias { alias, owner } => {
                ServiceError::AliasConflict { alias, owner }
            }
            TableError::NotFound(key) | TableError::NotAnAlias(key) => ServiceError::NotFound(key),
        }
    }
}

fn builder<T, F, Fut>(f: F) -> Builder
where
    T: Send + Sync + 'static,
    F: Fn(ServiceContainer) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = T> + Send + 'static,
{
    Arc::new(move |container| {
        let fut = f(container);
        async move { Arc::new(fut.await) as ServiceArc }.boxed()
    })
}

/// Keyed, aliasable service bindings. Cheap to clone; clones share bindings.
#[derive(Clone)]
pub struct ServiceContainer {
    table: Arc<RwLock<AliasTable<Binding>>>,
}

impl Default for ServiceContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceContainer {
    pub fn new() -> Self {
        Self {
            table: Arc::new(RwLock::new(AliasTable::new(true))),
        }
    }

    fn bind(&self, key: &str, binding: Binding) -> ServiceResult<()> {
        let kind = binding.kind();
        self.table
            .write()
            .insert(key, std::iter::empty::<&str>(), binding)?;
        trace!(service = key, ?kind, "Service bound");
        Ok(())
    }

    /// Binds a builder that runs on every fetch.
    pub fn bind_constructed<T, F, Fut>(&self, key: &str, f: F) -> ServiceResult<()>
    where
        T: Send + Sync + 'static,
        F: Fn(ServiceContainer) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        self.bind(key, Binding::Constructed(builder(f)))
    }

    /// Binds a builder that runs once, on first fetch.
    pub fn bind_singleton<T, F, Fut>(&self, key: &str, f: F) -> ServiceResult<()>
    where
        T: Send + Sync + 'static,
        F: Fn(ServiceContainer) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        self.bind(
            key,
            Binding::Singleton {
                build: builder(f),
                cell: Arc::new(OnceCell::new()),
            },
        )
    }

    /// Binds a ready value.
    pub fn bind_instance<T: Send + Sync + 'static>(&self, key: &str, value: T) -> ServiceResult<()> {
        self.bind(key, Binding::Instance(Arc::new(value)))
    }

    /// Makes `alias` resolve to the binding answering to `key`.
    pub fn alias(&self, key: &str, alias: &str) -> ServiceResult<()> {
        self.table.write().add_alias(key, alias)?;
        Ok(())
    }

    /// Removes the binding answering to `key` and all its aliases.
    pub fn unbind(&self, key: &str) -> ServiceResult<()> {
        let (name, _) = self.table.write().remove(key)?;
        trace!(service = %name, "Service unbound");
        Ok(())
    }

    pub fn has(&self, key: &str) -> bool {
        self.table.read().contains(key)
    }

    pub fn kind_of(&self, key: &str) -> Option<ServiceKind> {
        self.table.read().get(key).map(Binding::kind)
    }

    /// Bound keys, sorted. Aliases are not listed.
    pub fn keys(&self) -> Vec<String> {
        self.table.read().names()
    }

    /// Fetches the service answering to `key` as a `T`.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] for an unknown key and
    /// [`ServiceError::TypeMismatch`] when the bound value is not a `T`.
    pub async fn get<T: Send + Sync + 'static>(&self, key: &str) -> ServiceResult<Arc<T>> {
        // The lock is released before any builder runs.
        let binding = self
            .table
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(key.to_string()))?;

        let value = match binding {
            Binding::Constructed(build) => build(self.clone()).await,
            Binding::Singleton { build, cell } => cell
                .get_or_init(|| build(self.clone()))
                .await
                .clone(),
            Binding::Instance(value) => value,
        };

        value.downcast::<T>().map_err(|_| ServiceError::TypeMismatch {
            key: key.to_string(),
            expected: type_name::<T>(),
        })
    }
}

impl fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("keys", &self.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug)]
    struct Counter(usize);

    fn counted(builds: &Arc<AtomicUsize>) -> impl Fn(ServiceContainer) -> futures::future::Ready<Counter> + Send + Sync + 'static {
        let builds = builds.clone();
        move |_| futures::future::ready(Counter(builds.fetch_add(1, Ordering::SeqCst) + 1))
    }

    #[tokio::test]
    async fn test_constructed_rebuilds() {
        let builds = Arc::new(AtomicUsize::new(0));
        let services = ServiceContainer::new();
        services.bind_constructed("counter", counted(&builds)).unwrap();

        assert_eq!(services.get::<Counter>("counter").await.unwrap().0, 1);
        assert_eq!(services.get::<Counter>("counter").await.unwrap().0, 2);
        assert_eq!(services.kind_of("counter"), Some(ServiceKind::Constructed));
    }

    #[tokio::test]
    async fn test_singleton_builds_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let services = ServiceContainer::new();
        services.bind_singleton("counter", counted(&builds)).unwrap();

        let a = services.get::<Counter>("counter").await.unwrap();
        let b = services.get::<Counter>("counter").await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_builders_can_depend_on_services() {
        let services = ServiceContainer::new();
        services.bind_instance("base", 40u32).unwrap();
        services
            .bind_singleton("answer", |c: ServiceContainer| async move {
                c.get::<u32>("base").await.map(|b| *b + 2).unwrap_or(0)
            })
            .unwrap();

        assert_eq!(*services.get::<u32>("answer").await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_errors() {
        let services = ServiceContainer::new();
        services.bind_instance("name", String::from("parley")).unwrap();

        assert_eq!(
            services.bind_instance("name", 1u8).unwrap_err(),
            ServiceError::DuplicateKey("name".into())
        );
        assert_eq!(
            services.get::<String>("missing").await.unwrap_err(),
            ServiceError::NotFound("missing".into())
        );
        assert!(matches!(
            services.get::<u64>("name").await.unwrap_err(),
            ServiceError::TypeMismatch { ref key, .. } if key == "name"
        ));
    }

    #[tokio::test]
    async fn test_unbind_releases_aliases() {
        let services = ServiceContainer::new();
        services.bind_instance("db", 1u8).unwrap();
        services.alias("db", "database").unwrap();
        services.alias("database", "store").unwrap();
        assert_eq!(
            services.alias("db", "store").unwrap_err(),
            ServiceError::AliasConflict {
                alias: "store".into(),
                owner: "db".into()
            }
        );

        services.unbind("store").unwrap();
        assert!(!services.has("db"));
        assert!(!services.has("database"));
        assert!(!services.has("store"));
        assert!(services.keys().is_empty());
    }
}
