//! Raw event retrieval: assembles and runs the filtered, de-duplicated query.
//!
//! Events generated by an activity module can be overridden per group or per
//! user. Overrides share the `(modulename, instance, eventtype)` triple of the
//! event they replace and carry a `priority`. The query joins `event` against a
//! subquery holding the minimum priority of each triple, so only the winning
//! rows survive. `MIN` ignores nulls. A triple whose rows all have a null
//! priority therefore keeps every row, and a null row never displaces a
//! numbered one.

use std::collections::BTreeSet;

use rusqlite::types::{ToSql, Value};
use rusqlite::Connection;

use crate::error::EventQueryError;
use crate::event::CalendarEvent;
use crate::filter::{FilterSpec, ScopeFilters};
use crate::predicate::{build_predicates, NamedParam, Placeholders, RESERVED_PARAM_PREFIX};

/// Ordering applied when the request does not supply one.
pub const DEFAULT_ORDER_BY: &str = "e.timestart ASC, e.id ASC";

/// Everything a caller can ask of the raw event query.
///
/// `extra_conditions` and `order_by` are raw SQL over the outer `event e`
/// alias and are trusted as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEventsRequest {
    /// Scope filters; at least one must be active for anything to be returned.
    pub filters: ScopeFilters,
    /// Conditions AND-ed onto the outer query.
    pub extra_conditions: Vec<String>,
    /// Named parameters referenced by `extra_conditions`.
    pub extra_params: Vec<NamedParam>,
    /// `ORDER BY` clause body; defaults to [`DEFAULT_ORDER_BY`].
    pub order_by: Option<String>,
    /// Rows to skip.
    pub offset: Option<u32>,
    /// Maximum rows to return; `0` means unlimited.
    pub limit: Option<u32>,
    /// Return only events with `visible = 1`.
    pub ignore_hidden: bool,
}

impl Default for RawEventsRequest {
    fn default() -> Self {
        Self {
            filters: ScopeFilters::default(),
            extra_conditions: Vec::new(),
            extra_params: Vec::new(),
            order_by: None,
            offset: None,
            limit: None,
            ignore_hidden: true,
        }
    }
}

impl RawEventsRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(mut self, spec: FilterSpec) -> Self {
        self.filters.users = spec;
        self
    }

    pub fn groups(mut self, spec: FilterSpec) -> Self {
        self.filters.groups = spec;
        self
    }

    pub fn courses(mut self, spec: FilterSpec) -> Self {
        self.filters.courses = spec;
        self
    }

    pub fn categories(mut self, spec: FilterSpec) -> Self {
        self.filters.categories = spec;
        self
    }

    /// Adds a raw SQL condition over the `e` alias.
    pub fn condition(mut self, sql: impl Into<String>) -> Self {
        self.extra_conditions.push(sql.into());
        self
    }

    /// Binds a named parameter used by an extra condition. A bare name gets
    /// a `:` prefix.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra_params.push((name.into(), value.into()));
        self
    }

    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn ignore_hidden(mut self, ignore_hidden: bool) -> Self {
        self.ignore_hidden = ignore_hidden;
        self
    }
}

/// SQL text and bound parameters ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEventQuery {
    pub sql: String,
    pub params: Vec<NamedParam>,
}

/// Builds the raw event query for `request`.
///
/// Returns `Ok(None)` when no scope filter is active. Such a query would
/// select every event matching the extra conditions alone, so it must not
/// run.
///
/// # Errors
///
/// Returns `EventQueryError::ReservedParameter` if an extra parameter name
/// collides with the generated placeholders.
pub fn build_raw_events_query(
    request: &RawEventsRequest,
) -> Result<Option<RawEventQuery>, EventQueryError> {
    let extra_params = normalize_extra_params(&request.extra_params)?;

    let mut placeholders = Placeholders::default();
    let outer = build_predicates(&request.filters, "e", &mut placeholders);
    let inner = build_predicates(&request.filters, "ev", &mut placeholders);
    let (Some(outer), Some(inner)) = (outer, inner) else {
        return Ok(None);
    };

    let mut sub_where = vec![inner.clause()];
    let mut outer_where = vec!["(m.visible = 1 OR m.visible IS NULL)".to_string()];
    outer_where.extend(request.extra_conditions.iter().map(|c| format!("({c})")));
    outer_where.push(outer.clause());
    if request.ignore_hidden {
        outer_where.push("(e.visible = 1)".to_string());
        sub_where.push("(ev.visible = 1)".to_string());
    }

    let subquery = format!(
        "SELECT ev.modulename, ev.instance, ev.eventtype, MIN(ev.priority) AS priority
           FROM event ev
          WHERE {}
       GROUP BY ev.modulename, ev.instance, ev.eventtype",
        sub_where.join(" AND ")
    );

    let order_by = request
        .order_by
        .as_deref()
        .filter(|o| !o.trim().is_empty())
        .unwrap_or(DEFAULT_ORDER_BY);

    let mut sql = format!(
        "SELECT e.*
           FROM event e
     INNER JOIN ({subquery}) fe
             ON e.modulename = fe.modulename
            AND e.instance = fe.instance
            AND e.eventtype = fe.eventtype
            AND (e.priority = fe.priority OR (e.priority IS NULL AND fe.priority IS NULL))
      LEFT JOIN modules m
             ON e.modulename = m.name
          WHERE {}
       ORDER BY {order_by}",
        outer_where.join(" AND ")
    );

    let mut params = outer.params;
    params.extend(inner.params);
    params.extend(extra_params);

    let limit = request.limit.filter(|l| *l > 0);
    let offset = request.offset.filter(|o| *o > 0);
    match limit {
        Some(limit) => {
            let name = Placeholders::named("limit");
            sql.push_str(&format!(" LIMIT {name}"));
            params.push((name, Value::Integer(i64::from(limit))));
        }
        // SQLite only accepts OFFSET after a LIMIT.
        None if offset.is_some() => sql.push_str(" LIMIT -1"),
        None => {}
    }
    if let Some(offset) = offset {
        let name = Placeholders::named("offset");
        sql.push_str(&format!(" OFFSET {name}"));
        params.push((name, Value::Integer(i64::from(offset))));
    }

    tracing::debug!(
        fragments = outer.fragments.len(),
        params = params.len(),
        extra_conditions = request.extra_conditions.len(),
        "built raw event query"
    );

    Ok(Some(RawEventQuery { sql, params }))
}

fn normalize_extra_params(params: &[NamedParam]) -> Result<Vec<NamedParam>, EventQueryError> {
    let mut seen = BTreeSet::new();
    params
        .iter()
        .map(|(name, value)| {
            let bare = name.trim_start_matches([':', '@', '$']);
            if bare.starts_with(RESERVED_PARAM_PREFIX) {
                return Err(EventQueryError::ReservedParameter(name.clone()));
            }
            // A second binding would silently replace the first one's value.
            if !seen.insert(bare.to_string()) {
                return Err(EventQueryError::DuplicateParameter(name.clone()));
            }
            let name = if bare.len() == name.len() {
                format!(":{name}")
            } else {
                name.clone()
            };
            Ok((name, value.clone()))
        })
        .collect()
}

/// Reads calendar events for a set of scope filters.
pub trait RawEventRetrievalStrategy: Send + Sync {
    /// Returns the events visible under `request`, ordered and paginated.
    ///
    /// # Errors
    ///
    /// Returns `EventQueryError` if the request is malformed or the
    /// datastore rejects the query.
    fn get_raw_events(
        &self,
        conn: &Connection,
        request: &RawEventsRequest,
    ) -> Result<Vec<CalendarEvent>, EventQueryError>;
}

/// Runs the raw event query against the `event` and `modules` tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlRawEventStrategy;

impl RawEventRetrievalStrategy for SqlRawEventStrategy {
    fn get_raw_events(
        &self,
        conn: &Connection,
        request: &RawEventsRequest,
    ) -> Result<Vec<CalendarEvent>, EventQueryError> {
        let Some(query) = build_raw_events_query(request)? else {
            tracing::debug!("no scope filter active, returning no events");
            return Ok(Vec::new());
        };

        let bound: Vec<(&str, &dyn ToSql)> = query
            .params
            .iter()
            .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
            .collect();

        let mut stmt = conn.prepare(&query.sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let rows = stmt.query_map(bound.as_slice(), |row| CalendarEvent::from_row(row, &columns))?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }

        Ok(events)
    }
}
