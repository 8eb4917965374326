#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use arbor_core::errors::{ExErrorKind, ReconcileError};
use arbor_core::logging_facility::test_capture::init_test_capture;
use arbor_core::{log_op_end, log_op_error, log_op_start, Child, Component, Element, RenderInterrupt};
use arbor_core_types::schema::{
    EVENT_END, EVENT_END_ERROR, EVENT_START, FIELD_COMMIT_ID, FIELD_COMPONENT, FIELD_DURATION_MS,
    FIELD_ERR_CODE, FIELD_ERR_KIND, FIELD_LANES, FIELD_PLACEMENTS,
};
use common::{keyed_list, new_reconciler, render_sync};

#[test]
fn test_log_op_start_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name);

    let start_events: Vec<_> = capture
        .events_for_op(op_name)
        .into_iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_START))
        .collect();
    assert_eq!(start_events.len(), 1);
}

#[test]
fn test_log_op_end_records_duration() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_2";

    log_op_end!(op_name, duration_ms = 42);

    let events = capture.events_for_op(op_name);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event.as_deref(), Some(EVENT_END));
    assert_eq!(events[0].field(FIELD_DURATION_MS), Some("42"));
}

#[test]
fn test_log_op_error_includes_kind_and_code() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_3";

    let err = ReconcileError::MissingFinishedWork;
    log_op_error!(op_name, err, duration_ms = 10);

    let events = capture.events_for_op(op_name);
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.event.as_deref(), Some(EVENT_END_ERROR));
    assert_eq!(event.field(FIELD_ERR_CODE), Some("ERR_MISSING_FINISHED_WORK"));
    assert_eq!(
        event.field(FIELD_ERR_KIND),
        Some(format!("{:?}", ExErrorKind::MissingFinishedWork).as_str())
    );
}

#[test]
fn test_commit_emits_single_start_end_pair() {
    let capture = init_test_capture();
    let mut reconciler = new_reconciler();
    render_sync(&mut reconciler, keyed_list(&["a", "b"]));
    let commit_id = reconciler.last_commit().unwrap().commit_id.to_string();

    let commit_events = capture.events_with_field("commit_root", FIELD_COMMIT_ID, &commit_id);
    assert_eq!(commit_events.len(), 1);
    assert_eq!(commit_events[0].event.as_deref(), Some(EVENT_END));
    assert_eq!(commit_events[0].field(FIELD_PLACEMENTS), Some("1"));
    assert_eq!(
        commit_events[0].field(FIELD_COMPONENT),
        Some("arbor_core::work_loop")
    );

    capture.assert_event_exists("perform_sync_work_on_root", EVENT_START);
    capture.assert_event_exists("commit_root", EVENT_START);
}

#[test]
fn test_failed_render_logs_error_boundary() {
    let capture = init_test_capture();
    let component = Component::new("LoggedFailure", |_, _| {
        Err::<Child, RenderInterrupt>(
            ReconcileError::component_failed("LoggedFailure", "log me").into(),
        )
    });
    let mut reconciler = new_reconciler();

    render_sync(&mut reconciler, Element::component(&component));

    let failures = capture.count_events(|e| {
        e.op.as_deref() == Some("perform_sync_work_on_root")
            && e.event.as_deref() == Some(EVENT_END_ERROR)
            && e.field(FIELD_ERR_CODE) == Some("ERR_COMPONENT_FAILED")
            && e.field(FIELD_LANES) == Some("1")
    });
    assert!(failures >= 1);
}
