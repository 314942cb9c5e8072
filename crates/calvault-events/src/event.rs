//! Calendar event records.

use std::collections::BTreeMap;

use rusqlite::types::ValueRef;
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Columns mapped onto named [`CalendarEvent`] fields. Every other column of
/// the row ends up in [`CalendarEvent::extra`].
const MAPPED_COLUMNS: &[&str] = &[
    "id",
    "name",
    "userid",
    "groupid",
    "courseid",
    "categoryid",
    "modulename",
    "instance",
    "eventtype",
    "visible",
    "priority",
    "timestart",
    "timeduration",
];

/// A stored calendar event, as read back by the retrieval strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Internal database ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Owning user, or 0.
    pub user_id: i64,
    /// Owning group, or 0.
    pub group_id: i64,
    /// Owning course, or 0.
    pub course_id: i64,
    /// Owning category, or 0.
    pub category_id: i64,
    /// Activity module that generated the event, or empty.
    pub module_name: String,
    /// Module instance the event belongs to, or 0.
    pub instance: i64,
    /// Event type within the module (e.g. `open`, `close`, `due`).
    pub event_type: String,
    /// Whether the event itself is visible.
    pub visible: bool,
    /// Override precedence; lower wins, `None` loses to any number.
    pub priority: Option<i64>,
    /// Start time, unix seconds.
    pub time_start: i64,
    /// Duration in seconds.
    pub time_duration: i64,
    /// Remaining columns, passed through untouched.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl CalendarEvent {
    /// Maps a row selected with `e.*`. `columns` must be the statement's
    /// column names in order.
    pub(crate) fn from_row(row: &Row<'_>, columns: &[String]) -> rusqlite::Result<Self> {
        let mut extra = BTreeMap::new();
        for (idx, column) in columns.iter().enumerate() {
            if MAPPED_COLUMNS.contains(&column.as_str()) {
                continue;
            }
            extra.insert(column.clone(), json_from_sql(row.get_ref(idx)?));
        }

        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            user_id: row.get("userid")?,
            group_id: row.get("groupid")?,
            course_id: row.get("courseid")?,
            category_id: row.get("categoryid")?,
            module_name: row.get("modulename")?,
            instance: row.get("instance")?,
            event_type: row.get("eventtype")?,
            visible: row.get("visible")?,
            priority: row.get("priority")?,
            time_start: row.get("timestart")?,
            time_duration: row.get("timeduration")?,
            extra,
        })
    }
}

fn json_from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::from(b.to_vec()),
    }
}

/// Parameters for inserting a new event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub name: String,
    pub description: String,
    pub component: Option<String>,
    pub user_id: i64,
    pub group_id: i64,
    pub course_id: i64,
    pub category_id: i64,
    pub module_name: String,
    pub instance: i64,
    pub event_type: String,
    pub time_start: i64,
    pub time_duration: i64,
    pub visible: bool,
    pub priority: Option<i64>,
    pub location: Option<String>,
}

impl NewEvent {
    /// A visible site event with the given name and every other field zeroed.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Default for NewEvent {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            component: None,
            user_id: 0,
            group_id: 0,
            course_id: 0,
            category_id: 0,
            module_name: String::new(),
            instance: 0,
            event_type: String::new(),
            time_start: 0,
            time_duration: 0,
            visible: true,
            priority: None,
            location: None,
        }
    }
}
