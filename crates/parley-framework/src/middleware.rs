//! Middleware composition.
//!
//! A [`Middleware`] is one layer of an onion: it receives the request and a
//! [`Next`] handle to the rest of the chain. Calling [`Next::run`] continues
//! inward; returning without calling it halts the chain, and whatever the
//! layer returns becomes the result seen by the layers outside it.
//!
//! Layers are ordinary tower [`Layer`]s, so [`apply`] composes them by folding
//! from the right: `apply([a, b]).around(core)` nests as `a(b(core))`.
//! Requests travel a → b → core, results travel core → b → a.
//!
//! ```rust
//! use parley_framework::middleware::{apply, from_fn};
//! use tower::{BoxError, ServiceExt, service_fn};
//!
//! # tokio_test::block_on(async {
//! let tag = |t: &'static str| {
//!     from_fn(move |req: String, next| async move { next.run(format!("{req}+{t}")).await })
//! };
//! let core = service_fn(|req: String| async move { Ok::<_, BoxError>(req) });
//!
//! let svc = apply([tag("A"), tag("B")]).around(core);
//! assert_eq!(svc.oneshot("x".to_string()).await.unwrap(), "x+A+B");
//! # });
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use tower::util::BoxCloneSyncService;
use tower::{BoxError, Layer, Service, ServiceExt};

/// A type-erased, cloneable service with [`BoxError`] errors.
pub type BoxService<Req, Res> = BoxCloneSyncService<Req, Res, BoxError>;

type LayerFn<Req, Res> =
    dyn Fn(Req, Next<Req, Res>) -> BoxFuture<'static, Result<Res, BoxError>> + Send + Sync;

/// The remainder of a middleware chain.
pub struct Next<Req, Res> {
    inner: BoxService<Req, Res>,
}

impl<Req, Res> Next<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    /// Runs the rest of the chain with `req`.
    pub async fn run(self, req: Req) -> Result<Res, BoxError> {
        self.inner.oneshot(req).await
    }
}

impl<Req, Res> fmt::Debug for Next<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

/// One layer of middleware.
pub struct Middleware<Req, Res> {
    f: Arc<LayerFn<Req, Res>>,
}

impl<Req, Res> Clone for Middleware<Req, Res> {
    fn clone(&self) -> Self {
        Self { f: self.f.clone() }
    }
}

impl<Req, Res> fmt::Debug for Middleware<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware").finish_non_exhaustive()
    }
}

/// Creates a [`Middleware`] from an async closure.
///
/// ```rust
/// use parley_framework::middleware::from_fn;
///
/// let logging = from_fn(|req: String, next| async move {
///     tracing::debug!(%req, "entering");
///     next.run(req).await
/// });
/// # let _: parley_framework::middleware::Middleware<String, String> = logging;
/// ```
pub fn from_fn<Req, Res, F, Fut>(f: F) -> Middleware<Req, Res>
where
    F: Fn(Req, Next<Req, Res>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Res, BoxError>> + Send + 'static,
{
    Middleware {
        f: Arc::new(move |req, next| f(req, next).boxed()),
    }
}

impl<S, Req, Res> Layer<S> for Middleware<Req, Res>
where
    S: Service<Req, Response = Res, Error = BoxError> + Clone + Send + Sync + 'static,
    S::Future: Send + 'static,
    Req: Send + 'static,
    Res: Send + 'static,
{
    type Service = MiddlewareService<Req, Res>;

    fn layer(&self, inner: S) -> Self::Service {
        MiddlewareService {
            f: self.f.clone(),
            inner: BoxCloneSyncService::new(inner),
        }
    }
}

/// A [`Middleware`] wrapped around an inner service.
pub struct MiddlewareService<Req, Res> {
    f: Arc<LayerFn<Req, Res>>,
    inner: BoxService<Req, Res>,
}

impl<Req, Res> Clone for MiddlewareService<Req, Res> {
    fn clone(&self) -> Self {
        Self {
            f: self.f.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<Req, Res> Service<Req> for MiddlewareService<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    type Response = Res;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Res, BoxError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let next = Next {
            inner: self.inner.clone(),
        };
        (self.f)(req, next)
    }
}

/// An ordered stack of layers, outermost first.
pub struct Compose<Req, Res> {
    layers: Vec<Middleware<Req, Res>>,
}

impl<Req, Res> Clone for Compose<Req, Res> {
    fn clone(&self) -> Self {
        Self {
            layers: self.layers.clone(),
        }
    }
}

impl<Req, Res> fmt::Debug for Compose<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compose")
            .field("layers", &self.layers.len())
            .finish()
    }
}

impl<Req, Res> Compose<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    /// Wraps `core` in every layer, the first layer outermost.
    pub fn around<S>(&self, core: S) -> BoxService<Req, Res>
    where
        S: Service<Req, Response = Res, Error = BoxError> + Clone + Send + Sync + 'static,
        S::Future: Send + 'static,
    {
        self.layers
            .iter()
            .rev()
            .fold(BoxCloneSyncService::new(core), |inner, layer| {
                BoxCloneSyncService::new(layer.layer(inner))
            })
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl<S, Req, Res> Layer<S> for Compose<Req, Res>
where
    S: Service<Req, Response = Res, Error = BoxError> + Clone + Send + Sync + 'static,
    S::Future: Send + 'static,
    Req: Send + 'static,
    Res: Send + 'static,
{
    type Service = BoxService<Req, Res>;

    fn layer(&self, inner: S) -> Self::Service {
        self.around(inner)
    }
}

/// Collects `layers` into a [`Compose`] stack.
pub fn apply<Req, Res, I>(layers: I) -> Compose<Req, Res>
where
    I: IntoIterator<Item = Middleware<Req, Res>>,
{
    Compose {
        layers: layers.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use tower::service_fn;

    use super::*;

    fn tag(t: &'static str) -> Middleware<String, String> {
        from_fn(move |req: String, next| async move { next.run(format!("{req}+{t}")).await })
    }

    fn echo() -> BoxService<String, String> {
        BoxCloneSyncService::new(service_fn(|req: String| async move {
            Ok::<_, BoxError>(req)
        }))
    }

    #[tokio::test]
    async fn test_layers_nest_first_outermost() {
        let svc = apply([tag("A"), tag("B")]).around(echo());
        assert_eq!(svc.oneshot("x".to_string()).await.unwrap(), "x+A+B");
    }

    #[tokio::test]
    async fn test_unwinding_order() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let layer = |name: &'static str| {
            let trace = trace.clone();
            from_fn(move |req: String, next: Next<String, String>| {
                let trace = trace.clone();
                async move {
                    trace.lock().push(format!("{name} in"));
                    let out = next.run(req).await;
                    trace.lock().push(format!("{name} out"));
                    out
                }
            })
        };

        let svc = apply([layer("a"), layer("b")]).around(echo());
        svc.oneshot(String::new()).await.unwrap();

        assert_eq!(*trace.lock(), vec!["a in", "b in", "b out", "a out"]);
    }

    #[tokio::test]
    async fn test_short_circuit_skips_core() {
        let calls = Arc::new(AtomicUsize::new(0));
        let core = {
            let calls = calls.clone();
            service_fn(move |req: String| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, BoxError>(req) }
            })
        };
        let block = from_fn(|_req: String, _next| async move {
            Ok::<_, BoxError>("blocked".to_string())
        });
        let seen = Arc::new(Mutex::new(None));
        let outer = {
            let seen = seen.clone();
            from_fn(move |req: String, next: Next<String, String>| {
                let seen = seen.clone();
                async move {
                    let out = next.run(req).await?;
                    *seen.lock() = Some(out.clone());
                    Ok(out)
                }
            })
        };

        let svc = apply([outer, block]).around(core);
        let out = svc.oneshot("x".to_string()).await.unwrap();

        assert_eq!(out, "blocked");
        assert_eq!(seen.lock().as_deref(), Some("blocked"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_errors_propagate_outward() {
        let fail = from_fn(|_req: String, _next| async move {
            Err::<String, BoxError>("nope".into())
        });
        let svc = apply([tag("A"), fail]).around(echo());
        let err = svc.oneshot("x".to_string()).await.unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }

    #[tokio::test]
    async fn test_empty_stack_is_core() {
        let stack: Compose<String, String> = apply([]);
        assert!(stack.is_empty());
        let svc = stack.around(echo());
        assert_eq!(svc.oneshot("x".to_string()).await.unwrap(), "x");
    }

    #[tokio::test]
    async fn test_compose_is_a_layer() {
        let svc = tower::ServiceBuilder::new()
            .layer(apply([tag("A")]))
            .layer(tag("B"))
            .service(echo());
        assert_eq!(svc.oneshot("x".to_string()).await.unwrap(), "x+A+B");
    }
}
