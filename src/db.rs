//! Database boundary.
//!
//! The builder needs very little from a driver: run a statement with named
//! parameters, fetch rows, report the last inserted id. [`Connection`] names
//! exactly that, and `rusqlite::Connection` implements it.

use rusqlite::ToSql;
use rusqlite::types::ValueRef;

use crate::error::Result;
use crate::query::Value;

/// One fetched row, keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// `(name, value)` pairs bound as `:name` placeholders.
pub type Bindings<'a> = [(&'a str, Value)];

pub trait Connection {
    /// Run a statement, returning the number of rows it changed.
    fn execute(&self, sql: &str, params: &Bindings<'_>) -> Result<usize>;

    fn fetch_all(&self, sql: &str, params: &Bindings<'_>) -> Result<Vec<Row>>;

    fn fetch_optional(&self, sql: &str, params: &Bindings<'_>) -> Result<Option<Row>> {
        Ok(self.fetch_all(sql, params)?.into_iter().next())
    }

    /// Unbound shortcut for statements with every value inlined.
    fn query(&self, sql: &str) -> Result<Vec<Row>> {
        self.fetch_all(sql, &[])
    }

    fn last_insert_id(&self) -> i64;
}

impl Connection for rusqlite::Connection {
    fn execute(&self, sql: &str, params: &Bindings<'_>) -> Result<usize> {
        let names = placeholder_names(params);
        let mut stmt = self.prepare(sql)?;
        Ok(stmt.execute(named(&names, params).as_slice())?)
    }

    fn fetch_all(&self, sql: &str, params: &Bindings<'_>) -> Result<Vec<Row>> {
        let names = placeholder_names(params);
        let mut stmt = self.prepare(sql)?;
        // SQLite stores booleans as 0/1, so the declared column type is the only
        // place the distinction survives.
        let columns: Vec<(String, bool)> = stmt
            .columns()
            .iter()
            .map(|c| (c.name().to_owned(), c.decl_type().is_some_and(is_boolean)))
            .collect();

        let mut rows = stmt.query(named(&names, params).as_slice())?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut fields = Row::new();
            for (idx, (column, boolean)) in columns.iter().enumerate() {
                fields.insert(column.clone(), to_json(row.get_ref(idx)?, *boolean));
            }
            out.push(fields);
        }
        Ok(out)
    }

    fn last_insert_id(&self) -> i64 {
        self.last_insert_rowid()
    }
}

fn placeholder_names(params: &Bindings<'_>) -> Vec<String> {
    params
        .iter()
        .map(|(name, _)| match name.strip_prefix(':') {
            Some(_) => (*name).to_owned(),
            None => format!(":{name}"),
        })
        .collect()
}

fn named<'a>(names: &'a [String], params: &'a Bindings<'_>) -> Vec<(&'a str, &'a dyn ToSql)> {
    names
        .iter()
        .zip(params)
        .map(|(name, (_, value))| (name.as_str(), value as &dyn ToSql))
        .collect()
}

fn is_boolean(decl_type: &str) -> bool {
    decl_type.eq_ignore_ascii_case("BOOLEAN") || decl_type.eq_ignore_ascii_case("BOOL")
}

fn to_json(value: ValueRef<'_>, boolean: bool) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i @ (0 | 1)) if boolean => serde_json::Value::Bool(i == 1),
        ValueRef::Integer(i) => i.into(),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned().into(),
        ValueRef::Blob(bytes) => bytes.iter().copied().map(serde_json::Value::from).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> rusqlite::Connection {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT, score REAL, raw BLOB);
             INSERT INTO t (name, score, raw) VALUES ('a', 1.5, x'0102'), ('b', NULL, NULL);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn rows_are_keyed_by_column() {
        let db = db();
        let rows = db.query("SELECT * FROM t ORDER BY id").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "a");
        assert_eq!(rows[0]["score"], 1.5);
        assert_eq!(rows[0]["raw"], serde_json::json!([1, 2]));
        assert!(rows[1]["score"].is_null());
    }

    #[test]
    fn named_parameters_bind_with_or_without_colon() {
        let db = db();
        let row = db
            .fetch_optional("SELECT id FROM t WHERE name = :name", &[("name", Value::from("b"))])
            .unwrap()
            .unwrap();
        assert_eq!(row["id"], 2);

        let changed = Connection::execute(&db, "DELETE FROM t WHERE id = :id", &[(":id", Value::from(1))]).unwrap();
        assert_eq!(changed, 1);
    }

    #[test]
    fn last_insert_id_tracks_inserts() {
        let db = db();
        Connection::execute(&db, "INSERT INTO t (name) VALUES (:name)", &[("name", Value::from("c"))]).unwrap();
        assert_eq!(db.last_insert_id(), 3);
    }

    #[test]
    fn boolean_columns_come_back_as_bools() {
        let db = rusqlite::Connection::open_in_memory().unwrap();
        db.execute_batch(
            "CREATE TABLE f (id INTEGER PRIMARY KEY, on_ BOOLEAN, off BOOL, n INTEGER);
             INSERT INTO f (on_, off, n) VALUES (1, 0, 1);",
        )
        .unwrap();
        let rows = db.query("SELECT on_, off, n, on_ + 0 AS sum FROM f").unwrap();
        assert_eq!(rows[0]["on_"], true);
        assert_eq!(rows[0]["off"], false);
        // plain integers and computed columns are left alone
        assert_eq!(rows[0]["n"], 1);
        assert_eq!(rows[0]["sum"], 1);
    }

    #[test]
    fn bad_sql_propagates() {
        let db = db();
        assert!(matches!(db.query("SELEC nope"), Err(crate::Error::Database(_))));
    }
}
