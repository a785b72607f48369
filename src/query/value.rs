//! Values that flow into SQL, either inlined as literals by the builder or
//! bound as named parameters by the connection.

use rusqlite::ToSql;
use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};

use crate::error::Error;

/// Text passed through unquoted wherever a value is rendered.
pub const NULL_SENTINEL: &str = "NULL";

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
}

impl Value {
    /// Render as the right-hand side of `<column> <operator> <value>`.
    ///
    /// Text is single-quoted unless it is numeric, is the `NULL` sentinel,
    /// or the operator is `IN` / `NOT IN`. List elements are quoted one by
    /// one regardless of the operator.
    pub fn to_literal(&self, operator: &str) -> String {
        match self {
            Value::Text(s) if s == NULL_SENTINEL || is_membership(operator) || is_numeric(s) => {
                s.clone()
            }
            Value::List(items) => {
                let items: Vec<String> = items.iter().map(Value::to_element).collect();
                format!("({})", items.join(", "))
            }
            other => other.to_element(),
        }
    }

    fn to_element(&self) -> String {
        match self {
            Value::Null => NULL_SENTINEL.to_owned(),
            Value::Bool(b) => String::from(if *b { "1" } else { "0" }),
            Value::Int(i) => i.to_string(),
            // NaN and the infinities have no SQL literal.
            Value::Float(f) if !f.is_finite() => NULL_SENTINEL.to_owned(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) if s == NULL_SENTINEL => s.clone(),
            Value::Text(s) => quote(s),
            Value::List(_) => self.to_literal(""),
        }
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn is_membership(operator: &str) -> bool {
    let mut words = operator.split_whitespace();
    match (words.next(), words.next(), words.next()) {
        (Some(a), None, None) => a.eq_ignore_ascii_case("IN"),
        (Some(a), Some(b), None) => a.eq_ignore_ascii_case("NOT") && b.eq_ignore_ascii_case("IN"),
        _ => false,
    }
}

/// Decimal integers and floats, with optional sign and exponent.
fn is_numeric(s: &str) -> bool {
    let s = s.trim();
    !s.is_empty()
        && s.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        && s.parse::<f64>().is_ok()
}

// ── Conversions ───────────────────────────────────────────────────────────────

impl From<bool> for Value {
    fn from(v: bool) -> Self { Value::Bool(v) }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self { Value::Int(v.into()) }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self { Value::Int(v) }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self { Value::Int(v.into()) }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self { Value::Float(v) }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self { Value::Text(v.to_owned()) }
}

impl From<String> for Value {
    fn from(v: String) -> Self { Value::Text(v) }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self { Value::Text(v.clone()) }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(v: [T; N]) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

/// JSON objects have no SQL counterpart and are stored as their JSON text.
impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Null, Value::Float),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => Value::List(items.into_iter().map(Into::into).collect()),
            obj @ serde_json::Value::Object(_) => Value::Text(obj.to_string()),
        }
    }
}

// ── Parameter binding ─────────────────────────────────────────────────────────

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Value::Int(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Float(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::List(_) => {
                return Err(rusqlite::Error::ToSqlConversionFailure(Box::new(
                    Error::UnsupportedValue("list"),
                )));
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_are_never_quoted() {
        assert_eq!(Value::from(18).to_literal(">"), "18");
        assert_eq!(Value::from(2.5).to_literal("<"), "2.5");
        assert_eq!(Value::from(true).to_literal("="), "1");
        assert_eq!(Value::from(false).to_literal("="), "0");
        assert_eq!(Value::Null.to_literal("IS"), "NULL");
        assert_eq!(Value::from(None::<i64>).to_literal("IS"), "NULL");
    }

    #[test]
    fn non_finite_floats_render_as_null() {
        assert_eq!(Value::from(f64::NAN).to_literal("="), "NULL");
        assert_eq!(Value::from(f64::INFINITY).to_literal(">"), "NULL");
        assert_eq!(Value::from(vec![1.0, f64::NEG_INFINITY]).to_literal("IN"), "(1, NULL)");
    }

    #[test]
    fn text_is_quoted() {
        assert_eq!(Value::from("Bob").to_literal("="), "'Bob'");
        assert_eq!(Value::from("O'Hara").to_literal("="), "'O''Hara'");
        assert_eq!(Value::from("").to_literal("="), "''");
    }

    #[test]
    fn numeric_text_and_sentinel_pass_through() {
        assert_eq!(Value::from("42").to_literal("="), "42");
        assert_eq!(Value::from("-1.5e3").to_literal("="), "-1.5e3");
        assert_eq!(Value::from("NULL").to_literal("IS NOT"), "NULL");
        assert_eq!(Value::from("inf").to_literal("="), "'inf'");
    }

    #[test]
    fn membership_operator_disables_quoting() {
        assert_eq!(Value::from("(1, 2)").to_literal("IN"), "(1, 2)");
        assert_eq!(Value::from("(1, 2)").to_literal("not  in"), "(1, 2)");
        assert_eq!(Value::from("(1, 2)").to_literal("="), "'(1, 2)'");
    }

    #[test]
    fn lists_quote_each_text_element() {
        assert_eq!(Value::from(["a", "b"]).to_literal("IN"), "('a', 'b')");
        assert_eq!(Value::from(vec![1, 2, 3]).to_literal("IN"), "(1, 2, 3)");
        assert_eq!(Value::from(["7", "NULL"]).to_literal("NOT IN"), "('7', NULL)");
    }

    #[test]
    fn json_numbers_keep_their_kind() {
        assert_eq!(Value::from(serde_json::json!(3)), Value::Int(3));
        assert_eq!(Value::from(serde_json::json!(0.5)), Value::Float(0.5));
        assert_eq!(Value::from(serde_json::json!({"a": 1})), Value::Text(r#"{"a":1}"#.into()));
    }

    #[test]
    fn lists_can_not_be_bound() {
        assert!(Value::from(vec![1]).to_sql().is_err());
        assert!(Value::from("x").to_sql().is_ok());
    }
}
