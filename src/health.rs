//! Liveness and readiness probe handlers.
//!
//! ```rust
//! use trowel::{App, Endpoint, health};
//!
//! let app = App::new()
//!     .route("healthz", Endpoint::new().get(health::liveness))?
//!     .route("readyz", Endpoint::new().get(health::readiness))?;
//! # Ok::<(), trowel::Error>(())
//! ```
//!
//! Replace `readiness` with your own handler when readiness depends on the
//! database or another dependency.

use crate::{Request, Response};

/// Always `200 ok`: answering at all means the process is alive.
pub async fn liveness(_req: Request) -> Response {
    Response::text("ok")
}

/// Default readiness probe, `200 ready`.
pub async fn readiness(_req: Request) -> Response {
    Response::text("ready")
}
