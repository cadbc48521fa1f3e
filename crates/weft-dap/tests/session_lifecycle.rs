//! End-to-end session behaviour through the in-process harness:
//! run-to-completion, breakpoint pause and inspection, resume
//! invalidation, error stops and cancellation.

use std::time::Duration;

use serde_json::{json, Value};
use weft_dap::TestHarness;
use weft_engine::{
    EngineValue, NodeKind, NodeValue, OutputCategory, ScriptAction, SourceLocation, StepEvent,
};

fn init_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn harness(script: Vec<ScriptAction>) -> TestHarness {
    init_logging();
    TestHarness::with_script(script)
}

fn enter(line: u32) -> ScriptAction {
    ScriptAction::Enter(StepEvent::at("/work/file.x", line, 1))
}

/// Nested run: enters lines 1, 2, 3 then unwinds.
fn nested_script() -> Vec<ScriptAction> {
    vec![
        enter(1),
        enter(2),
        enter(3),
        ScriptAction::Leave,
        ScriptAction::Leave,
        ScriptAction::Leave,
    ]
}

#[test]
fn run_without_breakpoints_terminates_without_stopping() {
    let mut harness = harness(nested_script());
    harness.start_run(&[]);
    harness.wait_for_event("terminated");
    harness.expect_no_event("stopped", Duration::from_millis(100));
}

#[test]
fn breakpoint_pauses_with_inspectable_stack_then_resumes() {
    let mut harness = harness(nested_script());
    // Client line 1 is engine line 2.
    harness.start_run(&[("/work/file.x", 1)]);

    let stopped = harness.wait_for_event("stopped");
    let body = stopped.body.unwrap();
    assert_eq!(body["reason"], "breakpoint");
    assert_eq!(body["threadId"], 1);

    // Paused after entering line 2; line 3 not entered yet.
    let trace = harness.request_ok("stackTrace", json!({ "threadId": 1 }));
    assert_eq!(trace["totalFrames"], 2);
    let frames = trace["stackFrames"].as_array().unwrap();
    assert_eq!(frames[0]["line"], 1, "innermost frame first, client line");
    assert_eq!(frames[1]["line"], 0);
    assert_eq!(frames[0]["source"]["name"], "file.x");

    harness.expect_no_event("terminated", Duration::from_millis(100));

    let resumed = harness.request_ok("continue", json!({ "threadId": 1 }));
    assert_eq!(resumed["allThreadsContinued"], true);
    harness.wait_for_event("terminated");
}

#[test]
fn stack_queries_require_a_pause() {
    let mut harness = harness(nested_script());
    harness.start_run(&[]);
    harness.wait_for_event("terminated");

    let response = harness.request("stackTrace", json!({ "threadId": 1 }));
    assert!(!response.success);
    assert!(response.message.unwrap().contains("not paused"));
}

#[test]
fn left_constructs_disappear_from_the_stack() {
    // Enter 1, enter and leave 2, then pause at 3: the stack must be
    // [1, 3].
    let script = vec![
        enter(1),
        enter(2),
        ScriptAction::Leave,
        enter(3),
        ScriptAction::Leave,
        ScriptAction::Leave,
    ];
    let mut harness = harness(script);
    harness.start_run(&[("/work/file.x", 2)]);
    harness.wait_for_event("stopped");

    let trace = harness.request_ok("stackTrace", json!({ "threadId": 1 }));
    assert_eq!(trace["totalFrames"], 2);
    let frames = trace["stackFrames"].as_array().unwrap();
    assert_eq!(frames[0]["line"], 2);
    assert_eq!(frames[1]["line"], 0);

    harness.request_ok("continue", json!({ "threadId": 1 }));
    harness.wait_for_event("terminated");
}

fn script_with_bindings() -> Vec<ScriptAction> {
    let step = StepEvent::at("/work/file.x", 2, 1)
        .with_context(EngineValue::node(
            NodeValue::new(NodeKind::Element, "root").with_location(SourceLocation::new(
                "/work/in.xml",
                1,
                1,
            )),
        ))
        .with_parameter("mode", EngineValue::text("strict"))
        .with_local(
            "x",
            EngineValue::sequence(vec![
                EngineValue::text("a"),
                EngineValue::text("b"),
                EngineValue::text("c"),
            ]),
        );
    vec![
        enter(1),
        ScriptAction::Enter(step),
        ScriptAction::Leave,
        ScriptAction::Leave,
    ]
}

#[test]
fn variables_expand_lazily_and_idempotently_within_a_pause() {
    let mut harness = harness(script_with_bindings());
    harness.start_run(&[("/work/file.x", 1)]);
    harness.wait_for_event("stopped");

    let trace = harness.request_ok("stackTrace", json!({ "threadId": 1 }));
    let frame_id = trace["stackFrames"][0]["id"].as_u64().unwrap();
    assert!(frame_id >= 1000);

    let scopes = harness.request_ok("scopes", json!({ "frameId": frame_id }));
    assert_eq!(scopes["scopes"][0]["name"], "Locals");
    let scope_ref = scopes["scopes"][0]["variablesReference"].as_u64().unwrap();

    let vars = harness.request_ok("variables", json!({ "variablesReference": scope_ref }));
    let vars = vars["variables"].as_array().unwrap().clone();
    let names: Vec<&str> = vars.iter().map(|v| v["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["(context)", "mode", "x"]);
    assert_eq!(vars[1]["value"], "\"strict\"");
    assert_eq!(vars[1]["variablesReference"], 0, "strings are leaves");

    let x_ref = vars[2]["variablesReference"].as_u64().unwrap();
    assert_ne!(x_ref, 0, "sequence is expandable");
    let children = harness.request_ok("variables", json!({ "variablesReference": x_ref }));
    let children = children["variables"].as_array().unwrap().clone();
    assert_eq!(children.len(), 3);
    assert_eq!(children[0]["name"], "0");
    assert_eq!(children[0]["value"], "\"a\"");

    // Same pause, same expansion: ids must not change.
    let again = harness.request_ok("variables", json!({ "variablesReference": scope_ref }));
    assert_eq!(again["variables"], Value::Array(vars));

    harness.request_ok("continue", json!({ "threadId": 1 }));
    harness.wait_for_event("terminated");
}

#[test]
fn resume_invalidates_outstanding_references() {
    let mut harness = harness(script_with_bindings());
    harness.start_run(&[("/work/file.x", 1)]);
    harness.wait_for_event("stopped");

    let trace = harness.request_ok("stackTrace", json!({ "threadId": 1 }));
    let frame_id = trace["stackFrames"][0]["id"].as_u64().unwrap();

    harness.request_ok("continue", json!({ "threadId": 1 }));
    harness.wait_for_event("terminated");

    let vars = harness.request_ok("variables", json!({ "variablesReference": frame_id }));
    assert_eq!(vars["variables"], json!([]));

    let scopes = harness.request("scopes", json!({ "frameId": frame_id }));
    assert!(!scopes.success, "stale frame ids must not resolve");
}

#[test]
fn fatal_engine_error_stops_then_terminates() {
    let script = vec![
        enter(1),
        ScriptAction::Fail {
            message: "bad cast in template".into(),
            location: Some(SourceLocation::new("/work/file.x", 1, 4)),
        },
    ];
    let mut harness = harness(script);
    harness.start_run(&[]);

    let stopped = harness.wait_for_event("stopped");
    let body = stopped.body.unwrap();
    assert_eq!(body["reason"], "error");
    assert_eq!(body["text"], "bad cast in template");
    assert_eq!(body["line"], 0);
    assert_eq!(body["source"]["name"], "file.x");

    harness.wait_for_event("terminated");
}

#[test]
fn output_is_forwarded_with_category_and_location() {
    let script = vec![
        enter(1),
        ScriptAction::Output {
            category: OutputCategory::Stdout,
            text: "hello from the run\n".into(),
            location: Some(SourceLocation::new("/work/file.x", 1, 1)),
        },
        ScriptAction::Leave,
    ];
    let mut harness = harness(script);
    harness.start_run(&[]);

    let output = harness.wait_for_event("output");
    let body = output.body.unwrap();
    assert_eq!(body["category"], "stdout");
    assert_eq!(body["output"], "hello from the run\n");
    assert_eq!(body["line"], 0);

    harness.wait_for_event("terminated");
}

#[test]
fn disconnect_while_paused_cancels_the_run() {
    let mut harness = harness(nested_script());
    harness.start_run(&[("/work/file.x", 1)]);
    harness.wait_for_event("stopped");

    harness.request_ok("disconnect", Value::Null);
    harness.wait_for_event("terminated");

    // The run is gone; resuming is no longer possible.
    let response = harness.request("continue", json!({ "threadId": 1 }));
    assert!(!response.success);
}

#[test]
fn disconnect_before_launch_terminates_immediately() {
    let mut harness = harness(nested_script());
    harness.request_ok("initialize", json!({}));
    harness.request_ok("disconnect", Value::Null);
    harness.wait_for_event("terminated");
}

#[test]
fn configuration_done_without_launch_fails() {
    let mut harness = harness(nested_script());
    harness.request_ok("initialize", json!({}));
    let response = harness.request("configurationDone", Value::Null);
    assert!(!response.success);
    assert!(response.message.unwrap().contains("launch"));
}

#[test]
fn initialize_advertises_configuration_done_and_emits_initialized() {
    let mut harness = harness(Vec::new());
    let body = harness.request_ok("initialize", json!({}));
    assert_eq!(body["supportsConfigurationDoneRequest"], true);
    harness.wait_for_event("initialized");
}

#[test]
fn threads_always_reports_the_single_main_thread() {
    let mut harness = harness(Vec::new());
    let body = harness.request_ok("threads", Value::Null);
    assert_eq!(body["threads"], json!([{ "id": 1, "name": "main" }]));
}

#[test]
fn set_breakpoints_verifies_at_client_lines() {
    let mut harness = harness(Vec::new());
    harness.request_ok("initialize", json!({}));
    let body = harness.request_ok(
        "setBreakpoints",
        json!({
            "source": { "path": "file:///work/file.x" },
            "breakpoints": [{ "line": 1 }, { "line": 7 }],
        }),
    );
    assert_eq!(
        body["breakpoints"],
        json!([
            { "verified": true, "line": 1 },
            { "verified": true, "line": 7 },
        ])
    );
}

#[test]
fn set_breakpoints_rejects_unrepresentable_lines() {
    let mut harness = harness(Vec::new());
    harness.request_ok("initialize", json!({}));
    let response = harness.request(
        "setBreakpoints",
        json!({
            "source": { "path": "/work/file.x" },
            "breakpoints": [{ "line": u32::MAX }],
        }),
    );
    assert!(!response.success);
    assert!(response.message.unwrap().contains("out of range"));

    // Session still answers after the rejected request.
    harness.request_ok("threads", Value::Null);
}

#[test]
fn unrecognized_command_fails_but_keeps_the_session() {
    let mut harness = harness(Vec::new());
    let response = harness.request("frobnicate", Value::Null);
    assert!(!response.success);
    assert!(response.message.unwrap().contains("unrecognized"));

    // Session still answers.
    harness.request_ok("threads", Value::Null);
}
