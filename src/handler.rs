//! Handler trait and type erasure.
//!
//! # How handlers end up in a route table
//!
//! `Router<Endpoint>` stores every route in one `Vec`, and each `Endpoint`
//! keeps its handlers in one per-method list. Both need a single element
//! type, while every `async fn` has its own anonymous future type. The
//! concrete handler is therefore hidden behind the [`ErasedHandler`] trait
//! object:
//!
//! ```text
//! async fn show(req: Request) -> Response { … }   ← user code
//!        ↓ Endpoint::new().get(show)
//! show.into_boxed_handler()                       ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(show))                       ← stored as BoxedHandler
//!        ↓ App::handle, once the route and method match
//! handler.call(req)                               ← one virtual call
//!        ↓
//! Box::pin(async { show(req).await.into_response() })
//! ```
//!
//! Handlers returning `trowel::Result<Response>` go through the same path:
//! an `Err` becomes its status code in `into_response`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Internal types ────────────────────────────────────────────────────────────

/// A boxed future resolving to a [`Response`].
///
/// `Pin<Box<…>>` because the runtime polls the future in place and it must
/// not move after the first poll. `Send + 'static` lets tokio run it on any
/// worker thread.
#[doc(hidden)]
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Dispatch interface behind every stored handler.
///
/// `#[doc(hidden)] pub` instead of `pub(crate)` because it shows up in the
/// return type of [`Handler::into_boxed_handler`].
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased handler shared by every request routed to it.
///
/// `Arc` so the connection tasks can share one handler without copying it;
/// a request costs one atomic increment.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every `Fn(Request) -> impl Future<Output = impl IntoResponse>`,
/// which covers plain `async fn` items and closures returning async blocks,
/// such as the ones that capture a shared database handle.
///
/// The trait is sealed through the private `Sealed` supertrait, so the
/// blanket impl below is the only one.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

/// `Sealed` is unnameable outside this module, so other crates can not
/// implement `Handler` for their own types.
mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Holds a concrete handler `F` and implements [`ErasedHandler`] for it.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        // The wrapped function returns its own concrete future. Mapping it
        // through `IntoResponse` and boxing it gives the trait's return type.
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}
