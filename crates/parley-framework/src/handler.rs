//! Handler services.
//!
//! [`HandlerFn`] adapts an async function `Fn(Context) -> impl IntoReply`
//! into a tower [`Service`], the core that command middleware wraps.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::task::Poll;

use futures::FutureExt;
use futures::future::BoxFuture;
use tower::{BoxError, Service};

use crate::context::Context;
use crate::middleware::BoxService;
use crate::response::{IntoReply, Response};

/// A type-erased command handler with its middleware applied.
pub type BoxHandler = BoxService<Context, Response>;

/// A tower [`Service`] that calls one async handler function.
pub struct HandlerFn<F, Fut> {
    f: Arc<F>,
    // fn() -> Fut keeps the marker Send + Sync whatever Fut is.
    _marker: PhantomData<fn() -> Fut>,
}

impl<F, Fut> Clone for HandlerFn<F, Fut> {
    fn clone(&self) -> Self {
        Self {
            f: self.f.clone(),
            _marker: PhantomData,
        }
    }
}

/// Wraps `f` in a [`HandlerFn`].
///
/// ```rust
/// use parley_framework::{Context, handler_fn};
///
/// let ping = handler_fn(|_ctx: Context| async { "pong" });
/// # drop(ping);
/// ```
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F, Fut>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoReply,
{
    HandlerFn {
        f: Arc::new(f),
        _marker: PhantomData,
    }
}

impl<F, Fut> Service<Context> for HandlerFn<F, Fut>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoReply,
{
    type Response = Response;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Response, BoxError>>;

    fn poll_ready(&mut self, _cx: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, ctx: Context) -> Self::Future {
        let fut = (self.f)(ctx);
        async move { fut.await.into_reply() }.boxed()
    }
}
