//! Bootstrap: configuration, logging, database, routes, server.
//!
//! Run with:
//!   TROWEL_IN_MEMORY=true cargo run
//!
//! Try:
//!   curl -X POST localhost:3000/users -d '{"name":"alice","age":30}'
//!   curl localhost:3000/users?min_age=18
//!   curl localhost:3000/users/1
//!   curl -X PATCH localhost:3000/users/1 -d '{"age":31}'
//!   curl -X DELETE localhost:3000/users/1

use std::sync::Arc;

use anyhow::Context;
use http::StatusCode;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use trowel::{App, Config, Direction, Endpoint, Fields, Model, Param, Request, Response, Server, health};

type Db = Arc<Mutex<rusqlite::Connection>>;

#[derive(Debug, Deserialize, Serialize)]
struct User {
    id: i64,
    name: String,
    email: Option<String>,
    age: Option<i64>,
}

impl Model for User {
    const TABLE: &'static str = "users";

    fn id(&self) -> Option<i64> {
        Some(self.id)
    }
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    name  TEXT NOT NULL,
    email TEXT,
    age   INTEGER
)";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let conn = config.open_database().context("opening database")?;
    conn.execute_batch(SCHEMA).context("creating schema")?;
    let db: Db = Arc::new(Mutex::new(conn));

    let app = App::new()
        .route(
            "users",
            Endpoint::new()
                .get(with_db(&db, list_users))
                .post(with_db(&db, create_user)),
        )?
        .route(
            "users/{id:\\d+}",
            Endpoint::new()
                .get(with_db(&db, show_user))
                .patch(with_db(&db, update_user))
                .delete(with_db(&db, delete_user)),
        )?
        .route("healthz", Endpoint::new().get(health::liveness))?
        .route("readyz", Endpoint::new().get(health::readiness))?;

    Server::bind(config.bind).serve(app).await?;
    Ok(())
}

/// Bind a shared connection to a handler taking it as its first argument.
fn with_db<F, Fut>(db: &Db, f: F) -> impl Fn(Request) -> Fut + Send + Sync + 'static
where
    F: Fn(Db, Request) -> Fut + Send + Sync + 'static,
{
    let db = Arc::clone(db);
    move |req| f(Arc::clone(&db), req)
}

fn json<T: Serialize>(status: StatusCode, value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => Response::builder().status(status).json(body),
        Err(_) => Response::status(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

fn id_param(req: &Request) -> Option<i64> {
    match req.typed_param("id")? {
        Param::Int(id) => Some(id),
        Param::Str(_) => None,
    }
}

fn body_fields(req: &Request) -> Option<Fields> {
    match serde_json::from_slice::<serde_json::Value>(req.body()).ok()? {
        serde_json::Value::Object(map) => Some(Fields::from(map)),
        _ => None,
    }
}

// GET /users[?min_age=N]
async fn list_users(db: Db, req: Request) -> trowel::Result<Response> {
    let min_age = req.query_param("min_age").and_then(|v| v.parse::<i64>().ok());

    let users = {
        let conn = db.lock();
        let query = match min_age {
            Some(age) => User::where_("age", ">=", age)?,
            None => User::select_all(),
        };
        query.order_by([("name", Direction::Asc)])?.get(&*conn)?
    };
    Ok(json(StatusCode::OK, &users))
}

// POST /users
async fn create_user(db: Db, req: Request) -> trowel::Result<Response> {
    let Some(fields) = body_fields(&req) else {
        return Ok(Response::status(StatusCode::BAD_REQUEST));
    };

    let created = User::create(&*db.lock(), &fields)?;
    Ok(match created {
        Some(user) => Response::builder()
            .status(StatusCode::CREATED)
            .header("location", &format!("/users/{}", user.id))
            .json(serde_json::to_vec(&user).unwrap_or_default()),
        None => Response::status(StatusCode::UNPROCESSABLE_ENTITY),
    })
}

// GET /users/{id}
async fn show_user(db: Db, req: Request) -> trowel::Result<Response> {
    let Some(id) = id_param(&req) else {
        return Ok(Response::status(StatusCode::NOT_FOUND));
    };

    let user = User::find(&*db.lock(), id)?;
    Ok(match user {
        Some(user) => json(StatusCode::OK, &user),
        None => Response::status(StatusCode::NOT_FOUND),
    })
}

// PATCH /users/{id}
async fn update_user(db: Db, req: Request) -> trowel::Result<Response> {
    let (Some(id), Some(fields)) = (id_param(&req), body_fields(&req)) else {
        return Ok(Response::status(StatusCode::BAD_REQUEST));
    };

    let updated = {
        let conn = db.lock();
        match User::find(&*conn, id)? {
            Some(user) => user.update(&*conn, &fields)?,
            None => None,
        }
    };
    Ok(match updated {
        Some(user) => json(StatusCode::OK, &user),
        None => Response::status(StatusCode::NOT_FOUND),
    })
}

// DELETE /users/{id}
async fn delete_user(db: Db, req: Request) -> trowel::Result<Response> {
    let Some(id) = id_param(&req) else {
        return Ok(Response::status(StatusCode::NOT_FOUND));
    };

    let removed = User::destroy(&*db.lock(), id)?;
    Ok(if removed {
        Response::status(StatusCode::NO_CONTENT)
    } else {
        Response::status(StatusCode::NOT_FOUND)
    })
}
