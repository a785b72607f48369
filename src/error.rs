//! Unified error type.

use http::StatusCode;
use thiserror::Error;

/// The error type returned by trowel's fallible operations.
///
/// Builder ordering violations are programmer errors and name the model type
/// plus the rule that was broken. `RouteNotFound` is the one expected,
/// user-facing condition; [`Error::status`] maps it to `404`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{model}: {rule}")]
    Ordering { model: &'static str, rule: &'static str },

    #[error("{model}: JOIN needs at least one ON condition")]
    EmptyJoin { model: &'static str },

    #[error("{model}: instance has no id")]
    MissingId { model: &'static str },

    #[error("Route [{path}] not found")]
    RouteNotFound { path: String },

    #[error("invalid route pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("SQLite error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("row decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("value can not be bound as a parameter: {0}")]
    UnsupportedValue(&'static str),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// HTTP status a front controller should answer with.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = Error::RouteNotFound { path: "users/abc".into() };
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Route [users/abc] not found");
    }

    #[test]
    fn ordering_names_model_and_rule() {
        let err = Error::Ordering { model: "User", rule: "JOIN can not be before SELECT" };
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "User: JOIN can not be before SELECT");
    }
}
