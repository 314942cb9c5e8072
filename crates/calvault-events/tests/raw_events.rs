//! Behavioural tests for the SQL raw event strategy against a migrated
//! in-memory database.

use calvault_events::{
    insert_event, register_module, CalendarEvent, EventQueryError, FilterSpec, NewEvent,
    RawEventRetrievalStrategy, RawEventsRequest, SqlRawEventStrategy, TimeWindow,
};
use rusqlite::Connection;

fn test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("should open in-memory db");
    calvault_db::run_migrations(&conn).expect("migrations should succeed");
    conn
}

fn fetch(conn: &Connection, request: RawEventsRequest) -> Vec<CalendarEvent> {
    SqlRawEventStrategy
        .get_raw_events(conn, &request)
        .expect("query should succeed")
}

fn names(events: &[CalendarEvent]) -> Vec<&str> {
    events.iter().map(|e| e.name.as_str()).collect()
}

fn add(conn: &Connection, event: NewEvent) -> i64 {
    insert_event(conn, &event).expect("insert should succeed")
}

/// One event per scope: user 3, group 2 (in course 5), course 5, category 9, site.
fn seed_scopes(conn: &Connection) {
    add(
        conn,
        NewEvent {
            user_id: 3,
            event_type: "user".into(),
            time_start: 10,
            ..NewEvent::new("user event")
        },
    );
    add(
        conn,
        NewEvent {
            group_id: 2,
            course_id: 5,
            event_type: "group".into(),
            time_start: 20,
            ..NewEvent::new("group event")
        },
    );
    add(
        conn,
        NewEvent {
            course_id: 5,
            event_type: "course".into(),
            time_start: 30,
            ..NewEvent::new("course event")
        },
    );
    add(
        conn,
        NewEvent {
            category_id: 9,
            event_type: "category".into(),
            time_start: 40,
            ..NewEvent::new("category event")
        },
    );
    add(
        conn,
        NewEvent {
            event_type: "site".into(),
            time_start: 50,
            ..NewEvent::new("site event")
        },
    );
}

fn quiz_open(name: &str, course_id: i64, priority: Option<i64>) -> NewEvent {
    NewEvent {
        course_id,
        module_name: "quiz".into(),
        instance: 7,
        event_type: "open".into(),
        priority,
        ..NewEvent::new(name)
    }
}

#[test]
fn no_filters_returns_empty_without_touching_the_datastore() {
    // No migrations: any statement against `event` would fail.
    let conn = Connection::open_in_memory().expect("should open in-memory db");
    let events = SqlRawEventStrategy
        .get_raw_events(&conn, &RawEventsRequest::new().condition("e.id > 0"))
        .expect("short-circuit should not error");
    assert!(events.is_empty());
}

#[test]
fn all_users_selects_only_personal_events() {
    let conn = test_db();
    seed_scopes(&conn);

    let events = fetch(&conn, RawEventsRequest::new().users(FilterSpec::All));
    assert_eq!(names(&events), vec!["user event"]);
    for event in &events {
        assert_ne!(event.user_id, 0);
        assert_eq!((event.course_id, event.group_id, event.category_id), (0, 0, 0));
    }
}

#[test]
fn specific_course_excludes_group_events_of_that_course() {
    let conn = test_db();
    seed_scopes(&conn);

    let events = fetch(&conn, RawEventsRequest::new().courses(FilterSpec::specific([5])));
    assert_eq!(names(&events), vec!["course event"]);
    for event in &events {
        assert_eq!(event.group_id, 0);
        assert_eq!(event.course_id, 5);
    }
}

#[test]
fn dimensions_combine_as_a_union() {
    let conn = test_db();
    seed_scopes(&conn);

    let events = fetch(
        &conn,
        RawEventsRequest::new()
            .users(FilterSpec::specific([3]))
            .groups(FilterSpec::specific([2]))
            .courses(FilterSpec::specific([5]))
            .categories(FilterSpec::specific([9])),
    );
    assert_eq!(
        names(&events),
        vec!["user event", "group event", "course event", "category event"]
    );
}

#[test]
fn lowest_priority_override_wins() {
    let conn = test_db();
    add(&conn, quiz_open("group override", 4, Some(2)));
    add(&conn, quiz_open("user override", 4, Some(5)));

    let events = fetch(&conn, RawEventsRequest::new().courses(FilterSpec::specific([4])));
    assert_eq!(names(&events), vec!["group override"]);
    assert_eq!(events[0].priority, Some(2));
}

#[test]
fn null_priority_ties_are_all_returned() {
    let conn = test_db();
    add(&conn, quiz_open("first", 4, None));
    add(&conn, quiz_open("second", 4, None));

    let events = fetch(&conn, RawEventsRequest::new().courses(FilterSpec::All));
    assert_eq!(names(&events), vec!["first", "second"]);
}

#[test]
fn numbered_priority_displaces_null_priority() {
    let conn = test_db();
    add(&conn, quiz_open("base event", 4, None));
    add(&conn, quiz_open("override", 4, Some(1)));

    let events = fetch(&conn, RawEventsRequest::new().courses(FilterSpec::All));
    assert_eq!(names(&events), vec!["override"]);
}

#[test]
fn ignore_hidden_controls_event_visibility() {
    let conn = test_db();
    add(
        &conn,
        NewEvent {
            course_id: 1,
            event_type: "course".into(),
            time_start: 1,
            ..NewEvent::new("shown")
        },
    );
    add(
        &conn,
        NewEvent {
            course_id: 1,
            event_type: "course".into(),
            time_start: 2,
            visible: false,
            ..NewEvent::new("hidden")
        },
    );

    let request = RawEventsRequest::new().courses(FilterSpec::specific([1]));
    assert_eq!(names(&fetch(&conn, request.clone())), vec!["shown"]);
    assert_eq!(
        names(&fetch(&conn, request.ignore_hidden(false))),
        vec!["shown", "hidden"]
    );
}

#[test]
fn hidden_override_does_not_suppress_visible_event() {
    let conn = test_db();
    add(&conn, quiz_open("base event", 4, Some(5)));
    add(
        &conn,
        NewEvent {
            visible: false,
            ..quiz_open("hidden override", 4, Some(1))
        },
    );

    let request = RawEventsRequest::new().courses(FilterSpec::All);
    assert_eq!(names(&fetch(&conn, request.clone())), vec!["base event"]);
    assert_eq!(
        names(&fetch(&conn, request.ignore_hidden(false))),
        vec!["hidden override"]
    );
}

#[test]
fn hidden_modules_are_excluded_and_unregistered_modules_kept() {
    let conn = test_db();
    register_module(&conn, "assign", false).unwrap();
    register_module(&conn, "forum", true).unwrap();
    for (name, module) in [
        ("assignment due", "assign"),
        ("forum post", "forum"),
        ("quiz open", "quiz"),
    ] {
        add(
            &conn,
            NewEvent {
                course_id: 2,
                module_name: module.into(),
                instance: 1,
                event_type: "due".into(),
                ..NewEvent::new(name)
            },
        );
    }

    let events = fetch(
        &conn,
        RawEventsRequest::new()
            .courses(FilterSpec::All)
            .ignore_hidden(false),
    );
    assert_eq!(names(&events), vec!["forum post", "quiz open"]);
}

#[test]
fn offset_and_limit_page_through_start_order() {
    let conn = test_db();
    // Inserted out of order so the ORDER BY does the work.
    for start in [9, 3, 7, 1, 5, 10, 2, 8, 4, 6] {
        add(
            &conn,
            NewEvent {
                user_id: 11,
                event_type: "user".into(),
                time_start: start * 100,
                ..NewEvent::new(format!("event {start}"))
            },
        );
    }

    let events = fetch(
        &conn,
        RawEventsRequest::new()
            .users(FilterSpec::specific([11]))
            .offset(2)
            .limit(3),
    );
    assert_eq!(names(&events), vec!["event 3", "event 4", "event 5"]);
}

#[test]
fn time_window_keeps_events_still_running_at_its_start() {
    let conn = test_db();
    for (name, start, duration) in [
        ("finished", 10, 20),
        ("running", 50, 100),
        ("upcoming", 150, 0),
        ("later", 400, 0),
    ] {
        add(
            &conn,
            NewEvent {
                course_id: 3,
                event_type: "course".into(),
                time_start: start,
                time_duration: duration,
                ..NewEvent::new(name)
            },
        );
    }

    let request = TimeWindow::new(Some(100), Some(300))
        .apply(RawEventsRequest::new().courses(FilterSpec::specific([3])))
        .unwrap();
    assert_eq!(names(&fetch(&conn, request)), vec!["running", "upcoming"]);
}

#[test]
fn unmapped_columns_are_passed_through() {
    let conn = test_db();
    add(
        &conn,
        NewEvent {
            user_id: 1,
            event_type: "user".into(),
            location: Some("Room 4".into()),
            ..NewEvent::new("meeting")
        },
    );

    let events = fetch(&conn, RawEventsRequest::new().users(FilterSpec::All));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].extra["location"], "Room 4");
    assert_eq!(events[0].extra["repeatid"], 0);
    assert!(events[0].extra.contains_key("description"));
    assert!(!events[0].extra.contains_key("timestart"));
}

#[test]
fn malformed_extra_condition_is_a_database_error() {
    let conn = test_db();
    seed_scopes(&conn);

    let err = SqlRawEventStrategy
        .get_raw_events(
            &conn,
            &RawEventsRequest::new()
                .users(FilterSpec::All)
                .condition("e.no_such_column = 1"),
        )
        .unwrap_err();
    assert!(matches!(err, EventQueryError::Database(_)), "got {err:?}");
}

#[test]
fn custom_order_by_is_honoured() {
    let conn = test_db();
    seed_scopes(&conn);

    let events = fetch(
        &conn,
        RawEventsRequest::new()
            .users(FilterSpec::All)
            .groups(FilterSpec::All)
            .courses(FilterSpec::All)
            .order_by("e.timestart DESC"),
    );
    assert_eq!(names(&events), vec!["course event", "group event", "user event"]);
}
