//! Calendar event API handlers.
//!
//! Provides `POST /api/events`, a read-only view over the raw event
//! strategy. Clients send scope filters and an optional time window. Raw SQL
//! conditions and ordering are not accepted over HTTP.

use crate::config::EventsConfig;
use crate::AppState;
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use calvault_events::{
    CalendarEvent, Dimension, EventQueryError, FilterSpec, RawEventRetrievalStrategy,
    RawEventsRequest, ScopeFilters, TimeWindow,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Errors returned by API handlers as JSON `{"error": ...}` bodies.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<EventQueryError> for ApiError {
    fn from(err: EventQueryError) -> Self {
        match err {
            EventQueryError::InvalidFilterSpec { .. }
            | EventQueryError::InvalidWindow { .. }
            | EventQueryError::ReservedParameter(_)
            | EventQueryError::DuplicateParameter(_) => ApiError::BadRequest(err.to_string()),
            // Module registration is not exposed over HTTP.
            EventQueryError::ModuleNotFound(_) | EventQueryError::Database(_) => {
                tracing::error!(error = %err, "event query failed");
                ApiError::InternalServerError("event query failed".to_string())
            }
        }
    }
}

/// Request body for `POST /api/events`.
///
/// Each dimension accepts `true` (all), `false`/`null`/absent (none), an id,
/// or a list of ids.
#[derive(Debug, Default, Deserialize)]
pub struct EventsQueryBody {
    #[serde(default)]
    pub users: Value,
    #[serde(default)]
    pub groups: Value,
    #[serde(default)]
    pub courses: Value,
    #[serde(default)]
    pub categories: Value,
    /// Window start, unix seconds.
    pub from: Option<i64>,
    /// Window end, unix seconds.
    pub to: Option<i64>,
    pub offset: Option<u32>,
    /// Page size; capped at the configured maximum.
    pub limit: Option<u32>,
    /// Include events whose own visibility flag is off.
    #[serde(default)]
    pub include_hidden: bool,
}

impl EventsQueryBody {
    /// Validates the body and turns it into a strategy request.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::BadRequest` for malformed filters, too many filter
    /// ids, or an inverted window.
    pub fn into_request(self, limits: &EventsConfig) -> Result<RawEventsRequest, ApiError> {
        let filters = ScopeFilters {
            users: FilterSpec::from_value(Dimension::Users, &self.users)?,
            groups: FilterSpec::from_value(Dimension::Groups, &self.groups)?,
            courses: FilterSpec::from_value(Dimension::Courses, &self.courses)?,
            categories: FilterSpec::from_value(Dimension::Categories, &self.categories)?,
        };

        let id_count = filters.specific_id_count();
        if id_count > limits.max_filter_ids {
            return Err(ApiError::BadRequest(format!(
                "filters list {id_count} ids, at most {} are allowed",
                limits.max_filter_ids
            )));
        }

        let max_page_size = limits.max_page_size.max(1);
        let limit = match self.limit {
            Some(limit) if limit > 0 => limit.min(max_page_size),
            _ => max_page_size,
        };

        let mut request = RawEventsRequest {
            filters,
            ..RawEventsRequest::default()
        }
        .limit(limit)
        .ignore_hidden(!self.include_hidden);
        if let Some(offset) = self.offset {
            request = request.offset(offset);
        }

        Ok(TimeWindow::new(self.from, self.to).apply(request)?)
    }
}

/// Response for `POST /api/events`.
#[derive(Debug, Serialize, Deserialize)]
pub struct EventsResponse {
    /// Matching events in start order.
    pub events: Vec<CalendarEvent>,
    /// The number of events returned.
    pub count: usize,
}

/// Handler for `POST /api/events`.
pub async fn query_events_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<EventsQueryBody>,
) -> Result<Json<EventsResponse>, ApiError> {
    let request = body.into_request(&state.limits)?;

    let pool = state.pool.clone();
    let strategy = Arc::clone(&state.strategy);
    let events = tokio::task::spawn_blocking(move || {
        let conn = pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("database pool error: {e}")))?;
        strategy
            .get_raw_events(&conn, &request)
            .map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {e}")))??;

    tracing::debug!(count = events.len(), "served calendar events");

    Ok(Json(EventsResponse {
        count: events.len(),
        events,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> EventsQueryBody {
        serde_json::from_value(value).expect("body should deserialize")
    }

    fn limits(max_page_size: u32, max_filter_ids: usize) -> EventsConfig {
        EventsConfig {
            max_page_size,
            max_filter_ids,
        }
    }

    #[test]
    fn limit_is_capped_and_defaulted() {
        let capped = body(json!({"users": true, "limit": 1000}))
            .into_request(&limits(50, 10))
            .unwrap();
        assert_eq!(capped.limit, Some(50));

        let defaulted = body(json!({"users": true}))
            .into_request(&limits(50, 10))
            .unwrap();
        assert_eq!(defaulted.limit, Some(50));
        assert!(defaulted.ignore_hidden);
    }

    #[test]
    fn zero_page_size_still_bounds_the_page() {
        let request = body(json!({"users": true, "limit": 20}))
            .into_request(&limits(0, 10))
            .unwrap();
        assert_eq!(request.limit, Some(1));
    }

    #[test]
    fn window_becomes_extra_conditions() {
        let request = body(json!({"courses": [2, 3], "from": 10, "to": 20, "include_hidden": true}))
            .into_request(&limits(100, 10))
            .unwrap();
        assert_eq!(request.filters.courses, FilterSpec::specific([2, 3]));
        assert_eq!(request.extra_conditions.len(), 2);
        assert!(!request.ignore_hidden);
    }

    #[test]
    fn invalid_filter_maps_to_bad_request() {
        let err = body(json!({"groups": {"id": 1}}))
            .into_request(&limits(100, 10))
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg.contains("groups")));
    }

    #[test]
    fn filter_id_limit_counts_every_dimension() {
        let at_limit = body(json!({"users": [1, 2], "courses": [3, 4, 5], "groups": true}))
            .into_request(&limits(100, 5));
        assert!(at_limit.is_ok());

        let err = body(json!({"users": [1, 2, 6], "courses": [3, 4, 5]}))
            .into_request(&limits(100, 5))
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg.contains("6 ids")));
    }

    #[test]
    fn query_errors_map_to_status_classes() {
        let duplicate: ApiError = EventQueryError::DuplicateParameter(":x".to_string()).into();
        assert!(matches!(duplicate, ApiError::BadRequest(_)));

        let missing: ApiError = EventQueryError::ModuleNotFound("forum".to_string()).into();
        assert!(matches!(missing, ApiError::InternalServerError(msg) if msg == "event query failed"));
    }
}
