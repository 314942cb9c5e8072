//! Time-window conditions for raw event requests.

use serde::{Deserialize, Serialize};

use crate::error::EventQueryError;
use crate::strategy::RawEventsRequest;

/// An optional `[from, to]` range in unix seconds.
///
/// An event is inside the window if it is still running at `from` and starts
/// no later than `to`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl TimeWindow {
    pub fn new(from: Option<i64>, to: Option<i64>) -> Self {
        Self { from, to }
    }

    /// Adds this window's conditions and parameters to `request`.
    ///
    /// # Errors
    ///
    /// Returns `EventQueryError::InvalidWindow` if `from` is after `to`.
    pub fn apply(self, request: RawEventsRequest) -> Result<RawEventsRequest, EventQueryError> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(EventQueryError::InvalidWindow { from, to });
            }
        }

        let mut request = request;
        if let Some(from) = self.from {
            request = request
                .condition("e.timestart >= :timefrom OR e.timestart + e.timeduration > :timefrom")
                .param(":timefrom", from);
        }
        if let Some(to) = self.to {
            request = request
                .condition("e.timestart <= :timeto")
                .param(":timeto", to);
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterSpec;
    use crate::strategy::build_raw_events_query;
    use rusqlite::types::Value;

    #[test]
    fn open_window_adds_nothing() {
        let request = TimeWindow::default().apply(RawEventsRequest::new()).unwrap();
        assert!(request.extra_conditions.is_empty());
        assert!(request.extra_params.is_empty());
    }

    #[test]
    fn bounded_window_adds_both_conditions() {
        let request = TimeWindow::new(Some(100), Some(200))
            .apply(RawEventsRequest::new())
            .unwrap();
        assert_eq!(request.extra_conditions.len(), 2);
        assert_eq!(
            request.extra_params,
            vec![
                (":timefrom".to_string(), Value::Integer(100)),
                (":timeto".to_string(), Value::Integer(200)),
            ]
        );
    }

    #[test]
    fn stacked_windows_cannot_share_parameters() {
        let request = TimeWindow::new(Some(100), None)
            .apply(RawEventsRequest::new().courses(FilterSpec::All))
            .unwrap();
        let request = TimeWindow::new(Some(500), None).apply(request).unwrap();

        assert!(matches!(
            build_raw_events_query(&request),
            Err(EventQueryError::DuplicateParameter(name)) if name == ":timefrom"
        ));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let err = TimeWindow::new(Some(300), Some(200))
            .apply(RawEventsRequest::new())
            .unwrap_err();
        assert!(matches!(
            err,
            EventQueryError::InvalidWindow { from: 300, to: 200 }
        ));
    }
}
