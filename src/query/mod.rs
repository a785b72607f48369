//! Fluent SQL statement builder bound to a [`Model`].
//!
//! Every chained call consumes the builder and returns the next one, so each
//! chain owns its statement outright. Ordering rules live in [`Stage`];
//! a violation surfaces as [`Error::Ordering`] from the offending call.
//!
//! ```rust,no_run
//! # use trowel::{Direction, Model, Result};
//! # #[derive(serde::Deserialize)] struct User { id: i64 }
//! # impl Model for User {
//! #     const TABLE: &'static str = "users";
//! #     fn id(&self) -> Option<i64> { Some(self.id) }
//! # }
//! # fn run(db: &rusqlite::Connection) -> Result<()> {
//! let adults: Vec<User> = User::select(["id", "name"])
//!     .where_("age", ">=", 18)?
//!     .start_condition()
//!     .and_where("name", "=", "Bob")?
//!     .or_where("name", "=", "Alice")?
//!     .end_condition()
//!     .order_by([("name", Direction::Asc)])?
//!     .get(db)?;
//! # Ok(()) }
//! ```
//!
//! The builder checks ordering, nothing more. It does not validate column
//! names or the overall SQL grammar.

mod stage;
mod value;

use std::fmt;
use std::marker::PhantomData;

use tracing::debug;

use crate::db::Connection;
use crate::error::{Error, Result};
use crate::model::{Model, decode};

pub use stage::{Command, Stage};
pub use value::{NULL_SENTINEL, Value};

// ── Clause vocabulary ─────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum JoinKind {
    Inner,
    #[default]
    Left,
    Right,
    Full,
    Cross,
}

impl JoinKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inner => "INNER",
            Self::Left  => "LEFT",
            Self::Right => "RIGHT",
            Self::Full  => "FULL",
            Self::Cross => "CROSS",
        }
    }
}

/// One `left operator right` term of a join's `ON` clause, written verbatim.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JoinCondition {
    pub left: String,
    pub operator: String,
    pub right: String,
}

impl JoinCondition {
    pub fn new(left: impl Into<String>, operator: impl Into<String>, right: impl Into<String>) -> Self {
        Self { left: left.into(), operator: operator.into(), right: right.into() }
    }
}

impl fmt::Display for JoinCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.operator, self.right)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Intent {
    Select,
    Delete,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Conjunction {
    And,
    Or,
}

impl Conjunction {
    fn as_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

// ── Query ─────────────────────────────────────────────────────────────────────

/// A statement under construction for model `M`.
pub struct Query<M> {
    columns: Vec<String>,
    /// Join clauses, rendered right after `FROM` whenever they were added.
    joins: Vec<String>,
    body: String,
    stage: Stage,
    pending_group: bool,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Query<M> {
    /// A builder with nothing written yet. `where_` selects implicitly;
    /// `join`, `order_by` and the other trailing clauses fail until a
    /// select happens.
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            joins: Vec::new(),
            body: String::new(),
            stage: Stage::Unselected,
            pending_group: false,
            _model: PhantomData,
        }
    }

    /// `SELECT <columns> FROM <table>`. No columns means `*`.
    pub fn select<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            columns.push("*".to_owned());
        }
        Self { columns, stage: Stage::Selected, ..Self::new() }
    }

    pub fn stage(&self) -> Stage { self.stage }

    /// `WHERE <column> <operator> <value>` for the first condition of the
    /// chain, `<column> <operator> <value>` after that.
    pub fn where_(self, column: &str, operator: &str, value: impl Into<Value>) -> Result<Self> {
        self.condition(None, column, operator, value.into())
    }

    /// `AND <condition>`, opening a `(` when
    /// [`start_condition`](Query::start_condition) is pending.
    pub fn and_where(self, column: &str, operator: &str, value: impl Into<Value>) -> Result<Self> {
        self.condition(Some(Conjunction::And), column, operator, value.into())
    }

    pub fn or_where(self, column: &str, operator: &str, value: impl Into<Value>) -> Result<Self> {
        self.condition(Some(Conjunction::Or), column, operator, value.into())
    }

    /// Mark the next `and_where` to open a parenthesised group.
    pub fn start_condition(mut self) -> Self {
        self.pending_group = true;
        self
    }

    /// Close a group with `)`. Balancing is the caller's job.
    pub fn end_condition(mut self) -> Self {
        self.body.push(')');
        self
    }

    /// `<KIND> JOIN <table> ON c1 AND c2 ...`, placed after `FROM` and any
    /// earlier joins even when conditions are already written.
    pub fn join(mut self, table: &str, conditions: &[JoinCondition], kind: JoinKind) -> Result<Self> {
        self.advance(Command::Join)?;
        if conditions.is_empty() {
            return Err(Error::EmptyJoin { model: M::name() });
        }

        let on: Vec<String> = conditions.iter().map(ToString::to_string).collect();
        self.joins.push(format!("{} JOIN {table} ON {}", kind.as_str(), on.join(" AND ")));
        Ok(self)
    }

    pub fn left_join(self, table: &str, conditions: &[JoinCondition]) -> Result<Self> {
        self.join(table, conditions, JoinKind::Left)
    }

    /// `ORDER BY c1 d1, c2 d2`, in the order given.
    pub fn order_by<I, S>(mut self, columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Direction)>,
        S: AsRef<str>,
    {
        self.advance(Command::OrderBy)?;
        let terms: Vec<String> = columns
            .into_iter()
            .map(|(column, dir)| format!("{} {}", column.as_ref(), dir.as_str()))
            .collect();
        self.push(&format!("ORDER BY {}", terms.join(", ")));
        Ok(self)
    }

    pub fn group_by<I, S>(mut self, columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.advance(Command::GroupBy)?;
        let columns: Vec<String> = columns.into_iter().map(|c| c.as_ref().to_owned()).collect();
        self.push(&format!("GROUP BY {}", columns.join(", ")));
        Ok(self)
    }

    /// `HAVING <column> <operator> <value>`, quoted like `where_`.
    pub fn having(mut self, column: &str, operator: &str, value: impl Into<Value>) -> Result<Self> {
        self.advance(Command::Having)?;
        let value = value.into().to_literal(operator);
        self.push(&format!("HAVING {column} {operator} {value}"));
        Ok(self)
    }

    pub fn limit(mut self, n: u64) -> Result<Self> {
        self.advance(Command::Limit)?;
        self.push(&format!("LIMIT {n}"));
        Ok(self)
    }

    /// The SELECT statement as accumulated so far. Empty before any select.
    pub fn sql(&self) -> String {
        self.render(Intent::Select)
    }

    /// The same chain as a DELETE statement. Empty before any select.
    pub fn delete_sql(&self) -> String {
        self.render(Intent::Delete)
    }

    /// Run the statement and decode every row. No rows is an empty vector.
    ///
    /// An unselected builder runs `SELECT * FROM <table>`.
    pub fn get<C: Connection + ?Sized>(self, db: &C) -> Result<Vec<M>> {
        let sql = self.selected().render(Intent::Select);
        debug!(model = M::name(), %sql, "get");
        db.query(&sql)?.into_iter().map(decode).collect()
    }

    /// Whether the statement yields at least one row.
    pub fn exists<C: Connection + ?Sized>(mut self, db: &C) -> Result<bool> {
        self.advance(Command::Exists)?;
        let sql = self.render(Intent::Select);
        debug!(model = M::name(), %sql, "exists");
        Ok(!db.query(&sql)?.is_empty())
    }

    /// Delete every row this chain selects. Returns whether any row went.
    ///
    /// An unselected builder has no statement and deletes nothing.
    pub fn delete<C: Connection + ?Sized>(self, db: &C) -> Result<bool> {
        if self.stage == Stage::Unselected {
            return Ok(false);
        }
        let sql = self.render(Intent::Delete);
        debug!(model = M::name(), %sql, "delete");
        Ok(db.execute(&sql, &[])? > 0)
    }

    // ── internals ─────────────────────────────────────────────────────────────

    fn condition(
        mut self,
        conjunction: Option<Conjunction>,
        column: &str,
        operator: &str,
        value: Value,
    ) -> Result<Self> {
        if self.stage == Stage::Unselected {
            let pending = self.pending_group;
            self = Self::select(["*"]);
            self.pending_group = pending;
        }
        let first = !self.stage.has_condition();
        self.advance(Command::Where)?;

        if first {
            self.push("WHERE");
        } else if let Some(conjunction) = conjunction {
            self.push(conjunction.as_str());
        }
        if conjunction == Some(Conjunction::And) && self.pending_group {
            self.push("(");
            self.pending_group = false;
        }

        let value = value.to_literal(operator);
        self.push(&format!("{column} {operator} {value}"));
        Ok(self)
    }

    fn advance(&mut self, command: Command) -> Result<()> {
        self.stage = self
            .stage
            .apply(command)
            .map_err(|rule| Error::Ordering { model: M::name(), rule })?;
        Ok(())
    }

    /// Append a fragment, single-space separated, never after an open `(`.
    fn push(&mut self, fragment: &str) {
        if !self.body.is_empty() && !self.body.ends_with('(') {
            self.body.push(' ');
        }
        self.body.push_str(fragment);
    }

    fn selected(self) -> Self {
        match self.stage {
            Stage::Unselected => Self::select(["*"]),
            _ => self,
        }
    }

    fn render(&self, intent: Intent) -> String {
        if self.stage == Stage::Unselected {
            return String::new();
        }
        let mut sql = match intent {
            Intent::Select => format!("SELECT {} FROM {}", self.columns.join(", "), M::TABLE),
            Intent::Delete => format!("DELETE FROM {}", M::TABLE),
        };
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        if !self.body.is_empty() {
            sql.push(' ');
            sql.push_str(&self.body);
        }
        sql
    }
}

impl<M: Model> Default for Query<M> {
    fn default() -> Self { Self::new() }
}

impl<M: Model> fmt::Debug for Query<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("model", &M::name())
            .field("stage", &self.stage)
            .field("sql", &self.sql())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct User {
        id: i64,
    }

    impl Model for User {
        const TABLE: &'static str = "users";
        fn id(&self) -> Option<i64> { Some(self.id) }
    }

    fn users() -> Query<User> {
        Query::select(["*"])
    }

    #[test]
    fn select_lists_columns() {
        assert_eq!(users().sql(), "SELECT * FROM users");
        assert_eq!(
            Query::<User>::select(["name", "users.email as mail"]).sql(),
            "SELECT name, users.email as mail FROM users",
        );
        assert_eq!(Query::<User>::select(Vec::<String>::new()).sql(), "SELECT * FROM users");
    }

    #[test]
    fn where_quoting() {
        assert_eq!(users().where_("age", ">", 18).unwrap().sql(), "SELECT * FROM users WHERE age > 18");
        assert_eq!(
            users().where_("name", "=", "Bob").unwrap().sql(),
            "SELECT * FROM users WHERE name = 'Bob'",
        );
        assert_eq!(
            users().where_("status", "IN", ["a", "b"]).unwrap().sql(),
            "SELECT * FROM users WHERE status IN ('a', 'b')",
        );
        assert_eq!(
            users().where_("deleted_at", "IS", Value::Null).unwrap().sql(),
            "SELECT * FROM users WHERE deleted_at IS NULL",
        );
        assert_eq!(
            users().where_("active", "=", true).unwrap().sql(),
            "SELECT * FROM users WHERE active = 1",
        );
    }

    #[test]
    fn where_keyword_is_written_once() {
        let sql = users()
            .where_("age", ">", 18).unwrap()
            .and_where("name", "=", "Bob").unwrap()
            .or_where("name", "=", "Al").unwrap()
            .sql();
        assert_eq!(sql, "SELECT * FROM users WHERE age > 18 AND name = 'Bob' OR name = 'Al'");
    }

    #[test]
    fn grouped_conditions() {
        let sql = users()
            .where_("age", ">", 18).unwrap()
            .start_condition()
            .and_where("name", "=", "Bob").unwrap()
            .or_where("name", "=", "Al").unwrap()
            .end_condition()
            .and_where("id", "<", 100).unwrap()
            .sql();
        assert_eq!(
            sql,
            "SELECT * FROM users WHERE age > 18 AND (name = 'Bob' OR name = 'Al') AND id < 100",
        );
    }

    #[test]
    fn conjunction_as_first_condition_writes_where() {
        assert_eq!(
            users().and_where("a", "=", 1).unwrap().sql(),
            "SELECT * FROM users WHERE a = 1",
        );
        assert_eq!(
            users().or_where("a", "=", 1).unwrap().sql(),
            "SELECT * FROM users WHERE a = 1",
        );
        assert_eq!(
            users().where_("a", "=", 1).unwrap().where_("b", "=", 2).unwrap().sql(),
            "SELECT * FROM users WHERE a = 1 b = 2",
        );
    }

    #[test]
    fn pending_group_survives_implicit_select() {
        let sql = Query::<User>::new()
            .start_condition()
            .and_where("a", "=", 1).unwrap()
            .or_where("b", "=", 2).unwrap()
            .end_condition()
            .sql();
        assert_eq!(sql, "SELECT * FROM users WHERE (a = 1 OR b = 2)");
    }

    #[test]
    fn group_opens_on_one_and_where_only() {
        let sql = users()
            .start_condition()
            .or_where("a", "=", 1).unwrap()
            .and_where("b", "=", 2).unwrap()
            .or_where("c", "=", 3).unwrap()
            .end_condition()
            .and_where("d", "=", 4).unwrap()
            .sql();
        assert_eq!(sql, "SELECT * FROM users WHERE a = 1 AND (b = 2 OR c = 3) AND d = 4");
    }

    #[test]
    fn where_on_unselected_builder_selects_first() {
        let q = Query::<User>::new().where_("id", "=", 1).unwrap();
        assert_eq!(q.stage(), Stage::Filtered);
        assert_eq!(q.sql(), "SELECT * FROM users WHERE id = 1");
    }

    #[test]
    fn where_after_trailing_clause_fails() {
        let err = users()
            .order_by([("name", Direction::Asc)]).unwrap()
            .where_("id", "=", 1)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "User: WHERE can not be after GROUP BY, HAVING, ORDER BY or LIMIT",
        );
        assert!(users().limit(5).unwrap().and_where("id", "=", 1).is_err());
        assert!(users().group_by(["age"]).unwrap().or_where("id", "=", 1).is_err());
    }

    #[test]
    fn join_needs_select() {
        let on = [JoinCondition::new("users.id", "=", "posts.user_id")];
        let err = Query::<User>::new().left_join("posts", &on).unwrap_err();
        assert!(matches!(err, Error::Ordering { model: "User", .. }));

        let sql = users().left_join("posts", &on).unwrap().sql();
        assert_eq!(sql, "SELECT * FROM users LEFT JOIN posts ON users.id = posts.user_id");
    }

    #[test]
    fn join_writes_one_clause_per_call() {
        let sql = users()
            .join(
                "posts",
                &[
                    JoinCondition::new("users.id", "=", "posts.user_id"),
                    JoinCondition::new("posts.published", "=", "1"),
                ],
                JoinKind::Inner,
            ).unwrap()
            .left_join("tags", &[JoinCondition::new("tags.post_id", "=", "posts.id")]).unwrap()
            .sql();
        assert_eq!(
            sql,
            "SELECT * FROM users INNER JOIN posts ON users.id = posts.user_id AND posts.published = 1 \
             LEFT JOIN tags ON tags.post_id = posts.id",
        );
        assert_eq!(sql.matches("JOIN").count(), 2);
    }

    #[test]
    fn join_after_where_lands_before_it() {
        let on = [JoinCondition::new("users.id", "=", "posts.user_id")];
        let q = users()
            .where_("age", ">", 18).unwrap()
            .left_join("posts", &on).unwrap()
            .order_by([("age", Direction::Asc)]).unwrap();
        assert_eq!(
            q.sql(),
            "SELECT * FROM users LEFT JOIN posts ON users.id = posts.user_id WHERE age > 18 \
             ORDER BY age ASC",
        );
        assert_eq!(
            q.delete_sql(),
            "DELETE FROM users LEFT JOIN posts ON users.id = posts.user_id WHERE age > 18 \
             ORDER BY age ASC",
        );
    }

    #[test]
    fn join_without_conditions_fails() {
        assert!(matches!(users().left_join("posts", &[]), Err(Error::EmptyJoin { .. })));
    }

    #[test]
    fn order_by_keeps_column_order() {
        let sql = users()
            .order_by([("name", Direction::Asc), ("age", Direction::Desc)]).unwrap()
            .sql();
        assert_eq!(sql, "SELECT * FROM users ORDER BY name ASC, age DESC");
        assert!(Query::<User>::new().order_by([("name", Direction::Asc)]).is_err());
    }

    #[test]
    fn trailing_clauses() {
        let sql = Query::<User>::select(["age", "count(*) as n"])
            .where_("active", "=", true).unwrap()
            .group_by(["age"]).unwrap()
            .having("n", ">", 2).unwrap()
            .order_by([("age", Direction::Desc)]).unwrap()
            .limit(10).unwrap()
            .sql();
        assert_eq!(
            sql,
            "SELECT age, count(*) as n FROM users WHERE active = 1 GROUP BY age HAVING n > 2 \
             ORDER BY age DESC LIMIT 10",
        );
    }

    #[test]
    fn delete_intent_drops_projection() {
        let q = Query::<User>::select(["id", "name"]).where_("age", "<", 13).unwrap();
        assert_eq!(q.delete_sql(), "DELETE FROM users WHERE age < 13");
        assert_eq!(q.sql(), "SELECT id, name FROM users WHERE age < 13");
        assert_eq!(Query::<User>::new().delete_sql(), "");
    }

    #[test]
    fn unselected_builder_renders_nothing() {
        assert_eq!(Query::<User>::new().sql(), "");
        assert_eq!(Query::<User>::new().start_condition().end_condition().sql(), "");
    }
}
