//! Write-side helpers for the `event` and `modules` tables.

use rusqlite::{params, Connection};

use crate::error::EventQueryError;
use crate::event::NewEvent;

/// Inserts an event and returns its row ID.
///
/// # Errors
///
/// Returns `EventQueryError::Database` on SQL failure.
pub fn insert_event(conn: &Connection, event: &NewEvent) -> Result<i64, EventQueryError> {
    conn.execute(
        "INSERT INTO event (
            name, description, component, userid, groupid, courseid, categoryid,
            modulename, instance, eventtype, timestart, timeduration, visible,
            priority, location, timemodified
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
            CAST(strftime('%s', 'now') AS INTEGER)
        )",
        params![
            event.name,
            event.description,
            event.component,
            event.user_id,
            event.group_id,
            event.course_id,
            event.category_id,
            event.module_name,
            event.instance,
            event.event_type,
            event.time_start,
            event.time_duration,
            event.visible,
            event.priority,
            event.location,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Registers a module type, or updates its visibility if it already exists.
///
/// # Errors
///
/// Returns `EventQueryError::Database` on SQL failure.
pub fn register_module(conn: &Connection, name: &str, visible: bool) -> Result<(), EventQueryError> {
    conn.execute(
        "INSERT INTO modules (name, visible) VALUES (?1, ?2)
         ON CONFLICT(name) DO UPDATE SET visible = excluded.visible",
        params![name, visible],
    )?;
    tracing::debug!(module = name, visible, "registered module");
    Ok(())
}

/// Shows or hides every event generated by a registered module.
///
/// # Errors
///
/// Returns `EventQueryError::ModuleNotFound` if the module was never
/// registered.
pub fn set_module_visibility(
    conn: &Connection,
    name: &str,
    visible: bool,
) -> Result<(), EventQueryError> {
    let changed = conn.execute(
        "UPDATE modules SET visible = ?2 WHERE name = ?1",
        params![name, visible],
    )?;
    if changed == 0 {
        return Err(EventQueryError::ModuleNotFound(name.to_string()));
    }
    Ok(())
}
