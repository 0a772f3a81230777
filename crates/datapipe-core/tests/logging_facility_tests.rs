#![allow(clippy::unwrap_used, clippy::expect_used)]

use datapipe_core::errors::PipelineError;
use datapipe_core::logging_facility::test_capture::init_test_capture;
use datapipe_core::types::schema::{
    EVENT_END, EVENT_END_ERROR, EVENT_START, FIELD_COMPONENT, FIELD_DURATION_MS, FIELD_ERR_CODE,
    FIELD_ERR_KIND,
};
use datapipe_core::{log_op_end, log_op_error, log_op_start};

#[test]
fn test_log_op_start_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name);

    let starts = capture.count_events(|e| {
        e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_START)
    });
    assert_eq!(starts, 1);
}

#[test]
fn test_log_op_end_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_2";

    log_op_end!(op_name, duration_ms = 42);

    let events = capture.events();
    let end_event = events
        .iter()
        .find(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END))
        .expect("Should have end event");

    assert_eq!(end_event.field(FIELD_DURATION_MS), Some("42"));
    assert_eq!(end_event.field(FIELD_COMPONENT), Some(module_path!()));
}

#[test]
fn test_log_op_error_includes_code() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_3";

    let err = PipelineError::InvalidPropertyName {
        property: "a,b".to_string(),
    };
    log_op_error!(op_name, err, duration_ms = 10);

    let events = capture.events();
    let error_event = events
        .iter()
        .find(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END_ERROR))
        .expect("Should have error event");

    assert_eq!(error_event.field(FIELD_ERR_CODE), Some("ERR_INVALID_PROPERTY_NAME"));
    assert_eq!(error_event.field(FIELD_ERR_KIND), Some("InvalidPropertyName"));
    assert_eq!(error_event.level, tracing::Level::ERROR);
}

#[test]
fn test_boundary_ownership_single_start_end() {
    let capture = init_test_capture();
    let op_name = "test_boundary_ownership_unique_4";

    log_op_start!(op_name, entity = "user");
    log_op_end!(op_name, duration_ms = 1);

    let starts = capture.count_events(|e| {
        e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_START)
    });
    let ends = capture.count_events(|e| {
        e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END)
    });

    assert_eq!(starts, 1);
    assert_eq!(ends, 1);
}

#[test]
fn test_entity_field_is_indexed() {
    let capture = init_test_capture();
    let entity = "test_entity_field_unique_5";

    log_op_start!("ingest", entity = entity, property_hash = 7u32);

    let events = capture.events_for_entity(entity);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].field("property_hash"), Some("7"));
}

#[test]
#[should_panic(expected = "Expected event")]
fn test_assert_event_exists_fails() {
    let capture = init_test_capture();
    capture.assert_event_exists("nonexistent_op_truly_unique_999", EVENT_START);
}
