//! Regex route compiler and first-match dispatcher.
//!
//! A template like `/users/{id:\d+}` is compiled once, at registration, into
//! the anchored case-insensitive regex `(?i)^users/(?P<id>\d+)$`. Dispatch
//! walks the table in insertion order and the first hit wins. Nothing is
//! cached between dispatches: each call returns its own [`RouteMatch`], so a
//! single `Router` can be shared across threads.
//!
//! ```rust
//! use trowel::{Param, Router};
//!
//! let mut router = Router::new();
//! router.add("/users/{id:\\d+}", "show_user").unwrap();
//!
//! let hit = router.dispatch("/users/42?tab=profile").unwrap();
//! assert_eq!(*hit.payload(), "show_user");
//! assert_eq!(hit.param("id"), Some("42"));
//! assert_eq!(hit.typed("id"), Some(Param::Int(42)));
//! ```

use std::borrow::Cow;
use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// `{name:pattern}` placeholder inside a route template.
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-z_]+):([^}]+)\}").expect("placeholder regex"));

/// A path run followed by `?` and a query-string run.
static QUERY_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([\w/\-]+)\?([\w/=%*&?]+)").expect("query suffix regex"));

// ── Placeholder types ─────────────────────────────────────────────────────────

/// Declared type of a placeholder, derived from its pattern fragment.
///
/// Fragments built from `\d` (`\d`, `\d+`, `\d*`) carry the integer tag `d`;
/// anything else carries the string tag `.`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParamKind {
    Int,
    Str,
}

impl ParamKind {
    fn from_fragment(fragment: &str) -> Self {
        match fragment {
            r"\d" | r"\d+" | r"\d*" => Self::Int,
            _ => Self::Str,
        }
    }

    /// The single-character type tag (`d` or `.`).
    pub fn tag(self) -> char {
        match self {
            Self::Int => 'd',
            Self::Str => '.',
        }
    }
}

/// A captured placeholder value coerced to its declared type.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Param<'a> {
    Int(i64),
    Str(&'a str),
}

// ── Params ────────────────────────────────────────────────────────────────────

/// Placeholder values captured by one successful match.
#[derive(Clone, Debug, Default)]
pub struct Params {
    values: HashMap<String, String>,
    kinds: HashMap<String, ParamKind>,
}

impl Params {
    /// Raw captured text.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Captured value coerced by its placeholder tag.
    ///
    /// An integer-tagged capture that overflows `i64` falls back to
    /// [`Param::Str`].
    pub fn typed(&self, name: &str) -> Option<Param<'_>> {
        let raw = self.get(name)?;
        match self.kinds.get(name) {
            Some(ParamKind::Int) => Some(raw.parse().map_or(Param::Str(raw), Param::Int)),
            _ => Some(Param::Str(raw)),
        }
    }

    pub fn kind(&self, name: &str) -> Option<ParamKind> {
        self.kinds.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize { self.values.len() }
    pub fn is_empty(&self) -> bool { self.values.is_empty() }
}

// ── RouteMatch ────────────────────────────────────────────────────────────────

/// Result of a successful dispatch: the route's payload and its captures.
#[derive(Debug)]
pub struct RouteMatch<'r, P> {
    payload: &'r P,
    pattern: &'r str,
    params: Params,
}

impl<'r, P> RouteMatch<'r, P> {
    pub fn payload(&self) -> &'r P { self.payload }

    /// Compiled pattern text of the route that matched.
    pub fn pattern(&self) -> &'r str { self.pattern }

    pub fn params(&self) -> &Params { &self.params }

    pub fn param(&self, name: &str) -> Option<&str> { self.params.get(name) }

    pub fn typed(&self, name: &str) -> Option<Param<'_>> { self.params.typed(name) }

    pub fn into_params(self) -> Params { self.params }
}

// ── Router ────────────────────────────────────────────────────────────────────

struct Route<P> {
    pattern: String,
    regex: Regex,
    kinds: HashMap<String, ParamKind>,
    payload: P,
}

/// Ordered table of compiled routes, generic over the payload each route
/// carries. The payload is opaque here: an [`Endpoint`](crate::Endpoint) in
/// the HTTP front, anything at all in tests.
pub struct Router<P> {
    routes: Vec<Route<P>>,
}

impl<P> Router<P> {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Compile `template` and register it with `payload`.
    ///
    /// A template that compiles to an already-registered pattern replaces
    /// that route's payload and keeps its position in the table.
    pub fn add(&mut self, template: &str, payload: P) -> Result<&mut Self> {
        let (pattern, kinds) = compile(template);
        let regex = Regex::new(&pattern)?;
        debug!(template, %pattern, "route registered");

        match self.routes.iter_mut().find(|r| r.pattern == pattern) {
            Some(existing) => existing.payload = payload,
            None => self.routes.push(Route { pattern, regex, kinds, payload }),
        }
        Ok(self)
    }

    /// Consuming form of [`add`](Router::add) for builder-style setup.
    pub fn route(mut self, template: &str, payload: P) -> Result<Self> {
        self.add(template, payload)?;
        Ok(self)
    }

    /// Resolve a raw request path, query string included.
    pub fn dispatch(&self, path: &str) -> Result<RouteMatch<'_, P>> {
        let path = strip_query(path);
        self.match_path(path.trim_matches('/'))
    }

    /// Find the first route matching an already-normalized path.
    pub fn match_path(&self, path: &str) -> Result<RouteMatch<'_, P>> {
        for route in &self.routes {
            let Some(caps) = route.regex.captures(path) else { continue };

            let values = route.regex
                .capture_names()
                .flatten()
                .filter_map(|name| caps.name(name).map(|m| (name.to_owned(), m.as_str().to_owned())))
                .collect();

            trace!(path, pattern = %route.pattern, "route matched");
            return Ok(RouteMatch {
                payload: &route.payload,
                pattern: &route.pattern,
                params: Params { values, kinds: route.kinds.clone() },
            });
        }

        Err(Error::RouteNotFound { path: path.to_owned() })
    }

    pub fn len(&self) -> usize { self.routes.len() }
    pub fn is_empty(&self) -> bool { self.routes.is_empty() }

    /// Compiled pattern texts in registration order.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|r| r.pattern.as_str())
    }
}

impl<P> Default for Router<P> {
    fn default() -> Self { Self::new() }
}

/// Compile a route template into pattern text plus its placeholder types.
pub fn compile(template: &str) -> (String, HashMap<String, ParamKind>) {
    let template = template.trim_matches('/');

    let kinds = PLACEHOLDER
        .captures_iter(template)
        .map(|c| (c[1].to_owned(), ParamKind::from_fragment(&c[2])))
        .collect();

    let body = PLACEHOLDER.replace_all(template, "(?P<${1}>${2})");
    (format!("(?i)^{body}$"), kinds)
}

/// Drop query-string suffixes (`users/42?tab=profile` → `users/42`).
pub fn strip_query(path: &str) -> Cow<'_, str> {
    QUERY_SUFFIX.replace_all(path, "${1}")
}
