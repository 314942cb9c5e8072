//! Calendar event retrieval for the Calvault platform.
//!
//! Events are scoped to exactly one of a user, group, course or category, or
//! to none of them (site events). Callers describe what a viewer may see as
//! four [`FilterSpec`]s, one per dimension. The retrieval strategy turns those
//! into a single query over the `event` table. Events overridden by a
//! higher-precedence copy are dropped, as are events of hidden module types
//! and, by default, hidden events.
//!
//! # Usage
//!
//! ```rust,ignore
//! use calvault_events::{
//!     FilterSpec, RawEventRetrievalStrategy, RawEventsRequest, SqlRawEventStrategy, TimeWindow,
//! };
//!
//! let request = RawEventsRequest::new()
//!     .users(FilterSpec::specific([user_id]))
//!     .courses(FilterSpec::specific(enrolled_course_ids))
//!     .limit(50);
//! let request = TimeWindow::new(Some(from), Some(to)).apply(request)?;
//!
//! let events = SqlRawEventStrategy.get_raw_events(&conn, &request)?;
//! ```

mod error;
mod event;
mod filter;
mod predicate;
mod store;
mod strategy;
mod window;

pub use error::EventQueryError;
pub use event::{CalendarEvent, NewEvent};
pub use filter::{Dimension, FilterSpec, ScopeFilters};
pub use predicate::{build_predicates, NamedParam, Placeholders, Predicates, RESERVED_PARAM_PREFIX};
pub use store::{insert_event, register_module, set_module_visibility};
pub use strategy::{
    build_raw_events_query, RawEventQuery, RawEventRetrievalStrategy, RawEventsRequest,
    SqlRawEventStrategy, DEFAULT_ORDER_BY,
};
pub use window::TimeWindow;
