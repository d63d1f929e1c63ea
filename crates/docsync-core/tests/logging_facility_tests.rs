#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::*;
use docsync_core::docsync_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};
use docsync_core::docsync_core_types::{RequestContext, RequestId};
use docsync_core::errors::DocSyncError;
use docsync_core::logging_facility::test_capture::init_test_capture;
use docsync_core::{
    apply_command, log_op_end, log_op_error, log_op_start, Attributes, Command, IgnoreDenials,
    Registry,
};
use tracing::Level;

#[test]
fn test_log_op_start_and_end_macros() {
    let capture = init_test_capture();
    let op_name = "test_log_op_pair_unique_1";

    log_op_start!(op_name, node_id = "n-1");
    log_op_end!(op_name, duration_ms = 42);

    let events = capture.events_for_op(op_name);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event.as_deref(), Some(EVENT_START));
    assert_eq!(events[0].field("node_id"), Some("n-1"));
    assert_eq!(events[1].event.as_deref(), Some(EVENT_END));
    assert_eq!(events[1].field("duration_ms"), Some("42"));
}

#[test]
fn test_log_op_error_carries_code() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_2";

    let err = DocSyncError::CycleDetected {
        node: "p1".to_string(),
        collection: "c1".to_string(),
    };
    log_op_error!(op_name, err, duration_ms = 5);

    capture.assert_event_exists(op_name, EVENT_END_ERROR);
    let event = capture
        .events_for_op(op_name)
        .into_iter()
        .find(|e| e.event.as_deref() == Some(EVENT_END_ERROR))
        .expect("error event");
    assert_eq!(event.level, Level::ERROR);
    assert_eq!(event.field("err_code"), Some("ERR_CYCLE_DETECTED"));
}

#[test]
fn test_apply_command_logs_one_boundary_pair() {
    // GIVEN a request with a known id
    let capture = init_test_capture();
    let mut reg = Registry::authoritative();
    let blog = get_app(&mut reg);
    let post_id = reg.identifier(blog.first_post(&reg)).cloned().unwrap();
    let author = blog.author_requester(&reg);
    let request_id = RequestId::from_string("req-logging-boundary".to_string());
    let ctx = RequestContext::with_request_id(request_id);

    // WHEN a command is applied
    apply_command(
        &mut reg,
        &Command::set(post_id, Attributes::new().with("title", "logged")),
        &author,
        &mut IgnoreDenials,
        &ctx,
    )
    .unwrap();

    // THEN exactly one start and one end carry that request id
    let events: Vec<_> = capture
        .events_for_op("apply_command")
        .into_iter()
        .filter(|e| e.field("request_id") == Some("req-logging-boundary"))
        .collect();
    let starts = events
        .iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_START))
        .count();
    let ends = events
        .iter()
        .filter(|e| e.event.as_deref() == Some(EVENT_END))
        .count();
    assert_eq!(starts, 1);
    assert_eq!(ends, 1);
    let start = events
        .iter()
        .find(|e| e.event.as_deref() == Some(EVENT_START))
        .unwrap();
    assert_eq!(start.field("command"), Some("set"));
}

#[test]
fn test_failed_command_logs_error_event() {
    let capture = init_test_capture();
    let mut reg = Registry::authoritative();
    let blog = get_app(&mut reg);
    let author = blog.author_requester(&reg);
    let ctx = RequestContext::with_request_id(RequestId::from_string(
        "req-logging-failure".to_string(),
    ));

    let result = apply_command(
        &mut reg,
        &Command::delete("no-such-node"),
        &author,
        &mut IgnoreDenials,
        &ctx,
    );

    assert!(result.is_err());
    let error = capture
        .events_for_op("apply_command")
        .into_iter()
        .find(|e| {
            e.field("request_id") == Some("req-logging-failure")
                && e.event.as_deref() == Some(EVENT_END_ERROR)
        })
        .expect("error event");
    assert_eq!(error.field("err_code"), Some("ERR_NOT_FOUND"));
}

#[test]
fn test_denials_are_logged_as_warnings() {
    let capture = init_test_capture();
    let mut reg = Registry::authoritative();
    let blog = get_app(&mut reg);
    let post = blog.first_post(&reg);
    let post_id = reg.identifier(post).cloned().unwrap();
    let intruder = stranger(&mut reg, "intruder-logging");

    apply_command(
        &mut reg,
        &Command::delete(post_id.clone()),
        &intruder,
        &mut IgnoreDenials,
        &RequestContext::new(),
    )
    .unwrap();

    let requester = intruder.to_string();
    let warning = capture
        .events()
        .into_iter()
        .find(|e| e.level == Level::WARN && e.field("requester") == Some(requester.as_str()))
        .expect("denial warning");
    assert_eq!(warning.field("denial_kind"), Some("delete"));
    assert_eq!(warning.field("node_id"), Some(post_id.as_str()));
}
