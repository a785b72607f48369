//! Chaining rules for the query builder as an explicit state machine.
//!
//! ```text
//!               select                 where
//!  Unselected ─────────▶ Selected ──────────────▶ Filtered
//!      │                    │                        │
//!      │ where (implicit    │ group/having/          │ group/having/
//!      │ select)            │ order/limit            │ order/limit
//!      └──────▶ Filtered    └──────▶ Closed ◀────────┘
//! ```
//!
//! `Closed` rejects `where`. `Unselected` rejects everything that needs a
//! `FROM` clause to attach to.
//!
//! `select` is not a command: [`Query::select`](super::Query::select) builds a
//! `Selected` builder directly. Group brackets never change the stage, so they
//! are not commands either.

const WHERE_AFTER_CLOSE: &str = "WHERE can not be after GROUP BY, HAVING, ORDER BY or LIMIT";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
    /// No `SELECT` issued yet.
    Unselected,
    /// `SELECT ... FROM` written, no condition yet.
    Selected,
    /// At least one condition written; further ones are conjunctions.
    Filtered,
    /// A trailing clause was written; conditions are no longer accepted.
    Closed,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Command {
    Where,
    Join,
    GroupBy,
    Having,
    OrderBy,
    Limit,
    Exists,
}

impl Stage {
    /// Transition table. `Err` carries the rule that `command` violates.
    pub fn apply(self, command: Command) -> Result<Stage, &'static str> {
        use Command::*;
        use Stage::*;

        match (self, command) {
            (Closed, Where) => Err(WHERE_AFTER_CLOSE),
            (_, Where) => Ok(Filtered),

            (Unselected, Join) => Err("JOIN can not be before SELECT"),
            (Unselected, GroupBy) => Err("GROUP BY can not be before SELECT"),
            (Unselected, Having) => Err("HAVING can not be before SELECT"),
            (Unselected, OrderBy) => Err("ORDER BY can not be called before SELECT"),
            (Unselected, Limit) => Err("LIMIT can not be before SELECT"),
            (Unselected, Exists) => Err("exists can not be called before SELECT"),

            (_, GroupBy | Having | OrderBy | Limit) => Ok(Closed),
            (stage, Join | Exists) => Ok(stage),
        }
    }

    /// Whether a `WHERE` keyword has already been written.
    pub fn has_condition(self) -> bool {
        self == Stage::Filtered
    }
}
