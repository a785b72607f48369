//! ActiveRecord-style model trait.
//!
//! A model names its table and exposes its id; rows decode into it by column
//! name through serde. Everything else comes for free:
//!
//! ```rust
//! use serde::Deserialize;
//! use trowel::{Fields, Model};
//!
//! #[derive(Debug, Deserialize)]
//! struct Post {
//!     id: i64,
//!     title: String,
//! }
//!
//! impl Model for Post {
//!     const TABLE: &'static str = "posts";
//!     fn id(&self) -> Option<i64> { Some(self.id) }
//! }
//!
//! # fn main() -> trowel::Result<()> {
//! let db = rusqlite::Connection::open_in_memory()?;
//! db.execute_batch("CREATE TABLE posts (id INTEGER PRIMARY KEY, title TEXT)")?;
//!
//! let post = Post::create(&db, &Fields::new().set("title", "hello"))?.unwrap();
//! assert_eq!(Post::find(&db, post.id)?.unwrap().title, "hello");
//! # Ok(()) }
//! ```

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::db::{Connection, Row};
use crate::error::{Error, Result};
use crate::query::{Query, Value};

// ── Fields ────────────────────────────────────────────────────────────────────

/// Ordered column → value map for `create` and `update`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fields(Vec<(String, Value)>);

impl Fields {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Set `column`, replacing an earlier value in place.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.0.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.0.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(c, _)| c.as_str())
    }

    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    fn bindings(&self) -> Vec<(&str, Value)> {
        self.0.iter().map(|(c, v)| (c.as_str(), v.clone())).collect()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (column, value) in iter {
            fields.insert(column, value);
        }
        fields
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Fields {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        map.into_iter().collect()
    }
}

// ── Model ─────────────────────────────────────────────────────────────────────

pub trait Model: DeserializeOwned + Sized {
    /// Table the model reads from and writes to.
    const TABLE: &'static str;

    /// Primary key, if the instance has been persisted.
    fn id(&self) -> Option<i64>;

    /// Name used in ordering errors. Defaults to the bare type name.
    fn name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// An empty builder; see [`Query::new`].
    fn query() -> Query<Self> {
        Query::new()
    }

    fn select<I, S>(columns: I) -> Query<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Query::select(columns)
    }

    fn select_all() -> Query<Self> {
        Query::select(["*"])
    }

    /// `SELECT * ... WHERE <column> <operator> <value>`.
    fn where_(column: &str, operator: &str, value: impl Into<Value>) -> Result<Query<Self>> {
        Self::select_all().where_(column, operator, value)
    }

    fn all<C: Connection + ?Sized>(db: &C) -> Result<Vec<Self>> {
        Self::select_all().get(db)
    }

    fn find<C: Connection + ?Sized>(db: &C, id: i64) -> Result<Option<Self>> {
        let sql = format!("SELECT * FROM {} WHERE id = :id", Self::TABLE);
        debug!(model = Self::name(), %sql, id, "find");
        db.fetch_optional(&sql, &[("id", Value::Int(id))])?
            .map(decode)
            .transpose()
    }

    fn find_by<C: Connection + ?Sized>(
        db: &C,
        column: &str,
        value: impl Into<Value>,
    ) -> Result<Option<Self>> {
        let sql = format!("SELECT * FROM {} WHERE {column} = :value", Self::TABLE);
        debug!(model = Self::name(), %sql, "find_by");
        db.fetch_optional(&sql, &[("value", value.into())])?
            .map(decode)
            .transpose()
    }

    /// Insert `fields` and return the stored row.
    ///
    /// A failed insert is logged and reported as `Ok(None)`.
    fn create<C: Connection + ?Sized>(db: &C, fields: &Fields) -> Result<Option<Self>> {
        let sql = if fields.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", Self::TABLE)
        } else {
            let columns: Vec<&str> = fields.columns().collect();
            let placeholders: Vec<String> = columns.iter().map(|c| format!(":{c}")).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                Self::TABLE,
                columns.join(", "),
                placeholders.join(", "),
            )
        };
        debug!(model = Self::name(), %sql, "create");

        if let Err(err) = db.execute(&sql, &fields.bindings()) {
            warn!(model = Self::name(), error = %err, "insert failed");
            return Ok(None);
        }
        Self::find(db, db.last_insert_id())
    }

    /// Write `fields` to this instance's row and return the refreshed row.
    fn update<C: Connection + ?Sized>(&self, db: &C, fields: &Fields) -> Result<Option<Self>> {
        let id = self.id().ok_or(Error::MissingId { model: Self::name() })?;
        if fields.is_empty() {
            return Self::find(db, id);
        }

        let assignments: Vec<String> = fields.columns().map(|c| format!("{c} = :{c}")).collect();
        let sql = format!("UPDATE {} SET {} WHERE id = :id", Self::TABLE, assignments.join(", "));
        debug!(model = Self::name(), %sql, id, "update");

        let mut bound = fields.clone();
        bound.insert("id", id);
        db.execute(&sql, &bound.bindings())?;
        Self::find(db, id)
    }

    /// Delete the row with `id`. Returns whether a row was removed.
    fn destroy<C: Connection + ?Sized>(db: &C, id: i64) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = :id", Self::TABLE);
        debug!(model = Self::name(), %sql, id, "destroy");
        Ok(db.execute(&sql, &[("id", Value::Int(id))])? > 0)
    }

    /// Delete this instance's row. An instance without an id deletes nothing.
    fn delete<C: Connection + ?Sized>(&self, db: &C) -> Result<bool> {
        match self.id() {
            Some(id) => Self::destroy(db, id),
            None => Ok(false),
        }
    }
}

pub(crate) fn decode<M: DeserializeOwned>(row: Row) -> Result<M> {
    Ok(serde_json::from_value(serde_json::Value::Object(row))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_in_place() {
        let fields = Fields::new().set("a", 1).set("b", "x").set("a", 2);
        assert_eq!(fields.columns().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(fields.get("a"), Some(&Value::Int(2)));
    }

    #[test]
    fn fields_from_json_object() {
        let serde_json::Value::Object(map) = serde_json::json!({"name": "x", "age": 3}) else {
            unreachable!()
        };
        let fields = Fields::from(map);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get("age"), Some(&Value::Int(3)));
    }

    #[test]
    fn collects_from_pairs() {
        let fields: Fields = [("name", "x"), ("email", "x@example.com")].into_iter().collect();
        assert_eq!(fields.get("email"), Some(&Value::from("x@example.com")));
    }
}
