//! # trowel
//!
//! A small web scaffold: regex route dispatch and an ActiveRecord-style
//! query builder for SQLite-backed models.
//!
//! The two halves are independent:
//!
//! - [`Router`] compiles templates like `users/{id:\d+}` into anchored,
//!   case-insensitive regexes and resolves request paths first-match-wins.
//! - [`Model`] + [`Query`] build SQL through method chaining, enforce clause
//!   ordering with an explicit state machine, and decode rows into your types.
//!
//! [`App`] and [`Server`] wire the router to hyper for the binary; the query
//! builder never sees HTTP.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use serde::Deserialize;
//! use trowel::{App, Endpoint, Model, Request, Response, Server};
//!
//! #[derive(Deserialize)]
//! struct User { id: i64, name: String }
//!
//! impl Model for User {
//!     const TABLE: &'static str = "users";
//!     fn id(&self) -> Option<i64> { Some(self.id) }
//! }
//!
//! async fn show(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::text(format!("user {id}"))
//! }
//!
//! #[tokio::main]
//! async fn main() -> trowel::Result<()> {
//!     let app = App::new().route("/users/{id:\\d+}", Endpoint::new().get(show))?;
//!     Server::bind("127.0.0.1:3000".parse().unwrap()).serve(app).await
//! }
//! ```

mod app;
mod db;
mod error;
mod handler;
mod model;
mod request;
mod response;
mod router;
mod server;

pub mod config;
pub mod health;
pub mod query;

pub use app::{App, Endpoint};
pub use config::Config;
pub use db::{Bindings, Connection, Row};
pub use error::{Error, Result};
pub use handler::Handler;
pub use model::{Fields, Model};
pub use query::{Direction, JoinCondition, JoinKind, Query, Stage, Value};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::{Param, ParamKind, Params, RouteMatch, Router, compile, strip_query};
pub use server::Server;
