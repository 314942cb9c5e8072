//! Scope filters: which users, groups, courses and categories to read events for.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::EventQueryError;

/// One of the four scoping facets an event can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    /// Personal events owned by a user.
    Users,
    /// Events shared with a course group.
    Groups,
    /// Course-wide events.
    Courses,
    /// Events attached to a course category.
    Categories,
}

impl Dimension {
    /// Fixed evaluation order of the dimensions.
    pub const ALL: [Dimension; 4] = [
        Dimension::Users,
        Dimension::Groups,
        Dimension::Courses,
        Dimension::Categories,
    ];

    /// Returns the lowercase label used in error messages and request bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Groups => "groups",
            Self::Courses => "courses",
            Self::Categories => "categories",
        }
    }

    /// The `event` column holding this dimension's foreign key.
    pub fn column(self) -> &'static str {
        match self {
            Self::Users => "userid",
            Self::Groups => "groupid",
            Self::Courses => "courseid",
            Self::Categories => "categoryid",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which events a single dimension selects.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FilterSpec {
    /// The dimension selects nothing.
    #[default]
    None,
    /// Every event scoped to this dimension (non-zero foreign key).
    All,
    /// Events whose foreign key is one of these ids.
    Specific(BTreeSet<i64>),
}

impl FilterSpec {
    /// Builds a filter for a set of ids. An empty set selects nothing.
    pub fn specific<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        let ids: BTreeSet<i64> = ids.into_iter().collect();
        if ids.is_empty() {
            Self::None
        } else {
            Self::Specific(ids)
        }
    }

    /// Returns `true` if this filter contributes no predicate.
    pub fn is_none(&self) -> bool {
        match self {
            Self::None => true,
            Self::All => false,
            Self::Specific(ids) => ids.is_empty(),
        }
    }

    /// Converts a loosely typed value into a filter.
    ///
    /// `null`, `false` and `[]` select nothing, `true` selects everything,
    /// and an integer (or integer string) or a list of them selects those ids.
    ///
    /// # Errors
    ///
    /// Returns `EventQueryError::InvalidFilterSpec` for any other shape.
    pub fn from_value(dimension: Dimension, value: &Value) -> Result<Self, EventQueryError> {
        parse_value(value)
            .map_err(|reason| EventQueryError::InvalidFilterSpec { dimension, reason })
    }
}

fn parse_value(value: &Value) -> Result<FilterSpec, String> {
    match value {
        Value::Null | Value::Bool(false) => Ok(FilterSpec::None),
        Value::Bool(true) => Ok(FilterSpec::All),
        Value::Number(_) | Value::String(_) => parse_id(value).map(|id| FilterSpec::specific([id])),
        Value::Array(items) => {
            let ids = items
                .iter()
                .map(parse_id)
                .collect::<Result<BTreeSet<i64>, String>>()?;
            Ok(FilterSpec::specific(ids))
        }
        Value::Object(_) => Err("expected a boolean, an id, or a list of ids".to_string()),
    }
}

fn parse_id(value: &Value) -> Result<i64, String> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| format!("{n} is not an integer id")),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("'{s}' is not an integer id")),
        other => Err(format!("{other} is not an integer id")),
    }
}

impl<'de> Deserialize<'de> for FilterSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        parse_value(&value).map_err(serde::de::Error::custom)
    }
}

/// The four scope filters of a raw event request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ScopeFilters {
    /// User events.
    #[serde(default)]
    pub users: FilterSpec,
    /// Group events.
    #[serde(default)]
    pub groups: FilterSpec,
    /// Course events.
    #[serde(default)]
    pub courses: FilterSpec,
    /// Category events.
    #[serde(default)]
    pub categories: FilterSpec,
}

impl ScopeFilters {
    /// Returns the filter for a dimension.
    pub fn get(&self, dimension: Dimension) -> &FilterSpec {
        match dimension {
            Dimension::Users => &self.users,
            Dimension::Groups => &self.groups,
            Dimension::Courses => &self.courses,
            Dimension::Categories => &self.categories,
        }
    }

    /// Returns `true` if no dimension selects anything.
    pub fn is_empty(&self) -> bool {
        Dimension::ALL.iter().all(|d| self.get(*d).is_none())
    }

    /// Total number of explicit ids across all dimensions.
    ///
    /// Every id is bound once in the outer query and once in the subquery.
    pub fn specific_id_count(&self) -> usize {
        Dimension::ALL
            .iter()
            .map(|d| match self.get(*d) {
                FilterSpec::Specific(ids) => ids.len(),
                FilterSpec::None | FilterSpec::All => 0,
            })
            .sum()
    }
}
