//! Per-dimension predicate fragments for the raw event query.
//!
//! Each dimension renders to a boolean fragment over one table alias. The
//! fragments are OR-ed together, so an event is selected if any active
//! dimension matches it. Scope exclusivity comes from the zero checks on the
//! other foreign keys: a course event has `groupid = 0`, a category event has
//! both `groupid = 0` and `courseid = 0`, and so on. Group events are the
//! exception and may also carry a course id.
//!
//! The same filters are rendered once per alias. Every rendering draws new
//! placeholder names from the caller's [`Placeholders`], so the outer query
//! and the de-duplication subquery never share a bound parameter.

use std::collections::BTreeSet;

use rusqlite::types::Value;

use crate::filter::{Dimension, FilterSpec, ScopeFilters};

/// Placeholder prefix reserved for generated parameters. Caller-supplied
/// parameter names must not start with it.
pub const RESERVED_PARAM_PREFIX: &str = "rawev_";

/// A named parameter and its bound value.
pub type NamedParam = (String, Value);

/// Allocates unique named placeholders for a single query.
#[derive(Debug, Default)]
pub struct Placeholders {
    next: u32,
}

impl Placeholders {
    /// Returns a fresh placeholder such as `:rawev_3`.
    pub fn fresh(&mut self) -> String {
        self.next += 1;
        format!(":{RESERVED_PARAM_PREFIX}{}", self.next)
    }

    /// Returns the fixed placeholder for a named query slot such as `limit`.
    pub fn named(slot: &str) -> String {
        format!(":{RESERVED_PARAM_PREFIX}{slot}")
    }
}

/// Fragments for one table alias, plus the parameters they reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicates {
    /// One fragment per active dimension, in dimension order.
    pub fragments: Vec<String>,
    /// Parameters referenced by `fragments`.
    pub params: Vec<NamedParam>,
}

impl Predicates {
    /// The fragments OR-ed together and wrapped in parentheses.
    pub fn clause(&self) -> String {
        format!("({})", self.fragments.join(" OR "))
    }
}

/// Renders the scope filters against `alias`.
///
/// Returns `None` if no dimension produced a fragment, meaning the query
/// must not run at all.
pub fn build_predicates(
    filters: &ScopeFilters,
    alias: &str,
    placeholders: &mut Placeholders,
) -> Option<Predicates> {
    let mut predicates = Predicates::default();

    for dimension in Dimension::ALL {
        if let Some(fragment) = dimension_fragment(
            dimension,
            filters.get(dimension),
            alias,
            placeholders,
            &mut predicates.params,
        ) {
            predicates.fragments.push(fragment);
        }
    }

    if predicates.fragments.is_empty() {
        None
    } else {
        Some(predicates)
    }
}

fn dimension_fragment(
    dimension: Dimension,
    spec: &FilterSpec,
    alias: &str,
    placeholders: &mut Placeholders,
    params: &mut Vec<NamedParam>,
) -> Option<String> {
    let key = format!("{alias}.{}", dimension.column());
    let test = match spec {
        FilterSpec::None => return None,
        FilterSpec::Specific(ids) if ids.is_empty() => return None,
        FilterSpec::Specific(ids) => in_or_equal(&key, ids, placeholders, params),
        FilterSpec::All => format!("{key} != 0"),
    };

    let fragment = match dimension {
        Dimension::Users => format!(
            "({test} AND {alias}.courseid = 0 AND {alias}.groupid = 0 AND {alias}.categoryid = 0)"
        ),
        Dimension::Groups => test,
        Dimension::Courses => format!("({alias}.groupid = 0 AND {test})"),
        Dimension::Categories => {
            format!("({alias}.groupid = 0 AND {alias}.courseid = 0 AND {test})")
        }
    };
    Some(fragment)
}

/// Renders `column = :p` for one id and `column IN (:p1, :p2, ...)` for more.
fn in_or_equal(
    column: &str,
    ids: &BTreeSet<i64>,
    placeholders: &mut Placeholders,
    params: &mut Vec<NamedParam>,
) -> String {
    let names: Vec<String> = ids
        .iter()
        .map(|id| {
            let name = placeholders.fresh();
            params.push((name.clone(), Value::Integer(*id)));
            name
        })
        .collect();

    match names.as_slice() {
        [single] => format!("{column} = {single}"),
        _ => format!("{column} IN ({})", names.join(", ")),
    }
}
