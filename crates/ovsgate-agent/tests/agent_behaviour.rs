//! End-to-end transaction behaviour against a scripted database server.

use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::{Value, json};

use ovsgate_agent::{BlockMode, ComponentId, GatewayActions, OvsAgent};
use ovsgate_config::{Config, DbEndpoint};
use ovsgate_types::{
    Feedback, GatewayConfig, InterfaceCommand, InterfaceType, OvsStatus, TableRecord,
};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

struct Harness {
    agent: Arc<OvsAgent>,
    server: UnixStream,
    _dir: tempfile::TempDir,
}

fn harness(block_timeout_ms: u64) -> Harness {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("db.sock");
    let listener = UnixListener::bind(&path).expect("bind fake server");

    let config = Config {
        block_timeout_ms,
        ..Config::with_endpoint(DbEndpoint::unix(path.to_str().expect("utf8 path")))
    };
    let agent = OvsAgent::connect(ComponentId::TestApp, config).expect("connect agent");
    let (server, _) = listener.accept().expect("accept agent");
    server
        .set_read_timeout(Some(RECV_TIMEOUT))
        .expect("set read timeout");

    Harness {
        agent: Arc::new(agent),
        server,
        _dir: dir,
    }
}

/// Reads one complete JSON document from the server side of the socket.
fn read_message(stream: &mut UnixStream) -> Value {
    try_read_message(stream).expect("expected a client request")
}

/// Reads one document, or `None` when the client stays quiet until the
/// socket's read timeout.
fn try_read_message(stream: &mut UnixStream) -> Option<Value> {
    let mut pending = Vec::new();
    let mut chunk = [0_u8; 4096];
    loop {
        let count = match stream.read(&mut chunk) {
            Ok(0) => return None,
            Ok(count) => count,
            Err(_) => return None,
        };
        pending.extend_from_slice(&chunk[..count]);

        let mut parser = serde_json::Deserializer::from_slice(&pending).into_iter::<Value>();
        match parser.next() {
            Some(Ok(message)) => return Some(message),
            Some(Err(error)) if error.is_eof() => {}
            Some(Err(error)) => panic!("malformed client request: {error}"),
            None => {}
        }
    }
}

fn write_message(stream: &mut UnixStream, message: &Value) {
    stream
        .write_all(message.to_string().as_bytes())
        .expect("server write");
}

fn sample_config() -> TableRecord {
    TableRecord::GatewayConfig(GatewayConfig {
        if_name: "brlan0".to_string(),
        if_type: InterfaceType::Bridge,
        if_cmd: InterfaceCommand::Up,
        ..GatewayConfig::default()
    })
}

fn uuid_response(rid: &Value, uuid: &str) -> Value {
    json!({"id": rid, "result": [{"uuid": ["uuid", uuid]}], "error": null})
}

fn feedback_update(monitor_id: &str, row_uuid: &str, req_uuid: &str, status: OvsStatus) -> Value {
    let mut rows = serde_json::Map::new();
    rows.insert(
        row_uuid.to_string(),
        json!({"new": {"req_uuid": req_uuid, "status": status.code()}}),
    );
    json!({
        "id": null,
        "method": "update",
        "params": [monitor_id, {"Feedback": rows}],
    })
}

#[test]
fn non_blocking_submission_runs_the_full_lifecycle() {
    let mut fixture = harness(3000);
    let (sender, receiver) = mpsc::channel();

    let status = fixture
        .agent
        .submit(
            sample_config(),
            BlockMode::NonBlocking,
            Some(Box::new(move |status, record| {
                let TableRecord::GatewayConfig(config) = record else {
                    panic!("expected the submitted payload");
                };
                sender
                    .send((status, config.if_name.clone()))
                    .expect("report completion");
            })),
        )
        .expect("submit configuration");
    assert_eq!(status, OvsStatus::Unknown);
    assert_eq!(fixture.agent.outstanding(), 1);

    // Exactly one insert envelope with the submitted fields.
    let insert = read_message(&mut fixture.server);
    assert_eq!(insert["method"], "transact");
    assert_eq!(insert["params"][1]["op"], "insert");
    assert_eq!(insert["params"][1]["table"], "Gateway_Config");
    assert_eq!(insert["params"][1]["row"]["if_name"], "brlan0");
    assert_eq!(insert["params"][1]["row"]["if_type"], 1);
    assert_eq!(insert["params"][1]["row"]["if_cmd"], 0);

    // Acknowledging the insert must provoke the feedback subscription.
    write_message(&mut fixture.server, &uuid_response(&insert["id"], "abc-123"));
    let monitor = read_message(&mut fixture.server);
    assert_eq!(monitor["method"], "monitor");
    assert_eq!(monitor["params"][2], json!({"Feedback": {}}));
    let monitor_id = monitor["params"][1].as_str().expect("monitor id").to_string();

    // Feedback completes the transaction and settles the caller.
    write_message(
        &mut fixture.server,
        &feedback_update(&monitor_id, "fb-row-1", "abc-123", OvsStatus::Success),
    );
    let (status, if_name) = receiver.recv_timeout(RECV_TIMEOUT).expect("completion");
    assert_eq!(status, OvsStatus::Success);
    assert_eq!(if_name, "brlan0");

    // Both rows the transaction produced are cleaned up.
    let first_delete = read_message(&mut fixture.server);
    assert_eq!(first_delete["params"][1]["op"], "delete");
    assert_eq!(first_delete["params"][1]["table"], "Gateway_Config");
    assert_eq!(
        first_delete["params"][1]["where"],
        json!([["_uuid", "==", ["uuid", "abc-123"]]])
    );
    let second_delete = read_message(&mut fixture.server);
    assert_eq!(second_delete["params"][1]["table"], "Feedback");
    assert_eq!(
        second_delete["params"][1]["where"],
        json!([["req_uuid", "==", "abc-123"]])
    );

    assert_eq!(fixture.agent.outstanding(), 0);
}

#[test]
fn the_feedback_monitor_is_registered_once() {
    let mut fixture = harness(3000);

    fixture
        .agent
        .submit(sample_config(), BlockMode::NonBlocking, None)
        .expect("submit first");
    let first_insert = read_message(&mut fixture.server);
    write_message(
        &mut fixture.server,
        &uuid_response(&first_insert["id"], "aaa-111"),
    );
    let monitor = read_message(&mut fixture.server);
    assert_eq!(monitor["method"], "monitor");

    fixture
        .agent
        .submit(sample_config(), BlockMode::NonBlocking, None)
        .expect("submit second");
    let second_insert = read_message(&mut fixture.server);
    write_message(
        &mut fixture.server,
        &uuid_response(&second_insert["id"], "bbb-222"),
    );

    // The second acknowledgement must not re-subscribe.
    let unexpected = try_read_message(&mut fixture.server);
    assert!(
        unexpected.is_none(),
        "unexpected request after second insert: {unexpected:?}"
    );
}

#[test]
fn blocking_submission_returns_the_completion_status() {
    let mut fixture = harness(3000);

    let agent = Arc::clone(&fixture.agent);
    let caller = thread::spawn(move || {
        agent.submit(sample_config(), BlockMode::Blocking, None)
    });

    let insert = read_message(&mut fixture.server);
    write_message(&mut fixture.server, &uuid_response(&insert["id"], "ccc-333"));
    let monitor = read_message(&mut fixture.server);
    let monitor_id = monitor["params"][1].as_str().expect("monitor id").to_string();
    write_message(
        &mut fixture.server,
        &feedback_update(&monitor_id, "fb-row-1", "ccc-333", OvsStatus::Success),
    );

    let status = caller
        .join()
        .expect("join caller")
        .expect("submit configuration");
    assert_eq!(status, OvsStatus::Success);

    // The deletes were already on the wire when the caller woke.
    let first_delete = read_message(&mut fixture.server);
    assert_eq!(first_delete["params"][1]["op"], "delete");
    let second_delete = read_message(&mut fixture.server);
    assert_eq!(second_delete["params"][1]["op"], "delete");
}

#[test]
fn blocking_submission_times_out_without_a_reply() {
    let mut fixture = harness(200);

    let started = Instant::now();
    let status = fixture
        .agent
        .submit(sample_config(), BlockMode::Blocking, None)
        .expect("submit configuration");
    let elapsed = started.elapsed();

    assert_eq!(status, OvsStatus::TimedOut);
    assert!(
        elapsed >= Duration::from_millis(150),
        "returned before the deadline: {elapsed:?}"
    );
    // The local wait was abandoned; nothing is left outstanding.
    assert_eq!(fixture.agent.outstanding(), 0);

    let _insert = read_message(&mut fixture.server);
}

#[test]
fn a_late_completion_after_timeout_is_tolerated() {
    let mut fixture = harness(200);
    let (sender, receiver) = mpsc::channel();

    let status = fixture
        .agent
        .submit(
            sample_config(),
            BlockMode::Blocking,
            Some(Box::new(move |status, _| {
                sender.send(status).expect("report completion");
            })),
        )
        .expect("submit configuration");
    assert_eq!(status, OvsStatus::TimedOut);

    let insert = read_message(&mut fixture.server);
    write_message(&mut fixture.server, &uuid_response(&insert["id"], "ddd-444"));

    // The uuid acknowledgement for the abandoned transaction is a logged
    // correlation miss; no feedback monitor request may follow and the
    // abandoned callback must never fire.
    assert!(try_read_message(&mut fixture.server).is_none());
    assert!(receiver.recv_timeout(Duration::from_millis(300)).is_err());
}

#[test]
fn shutdown_wakes_a_blocked_caller_with_a_failure() {
    let mut fixture = harness(5000);

    let agent = Arc::clone(&fixture.agent);
    let caller = thread::spawn(move || {
        agent.submit(sample_config(), BlockMode::Blocking, None)
    });
    let _insert = read_message(&mut fixture.server);

    let started = Instant::now();
    fixture.agent.shutdown().expect("shutdown");
    let status = caller
        .join()
        .expect("join caller")
        .expect("submit configuration");

    assert_eq!(status, OvsStatus::Failed);
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "caller was left suspended across shutdown"
    );
}

#[test]
fn serving_the_configuration_table_answers_with_feedback() {
    struct RecordingActions {
        applied: Mutex<Vec<String>>,
    }

    impl GatewayActions for RecordingActions {
        fn apply(&self, config: &GatewayConfig) -> OvsStatus {
            self.applied
                .lock()
                .expect("actions mutex poisoned")
                .push(config.if_name.clone());
            OvsStatus::Success
        }
    }

    let mut fixture = harness(3000);
    let actions = Arc::new(RecordingActions {
        applied: Mutex::new(Vec::new()),
    });

    fixture
        .agent
        .serve_gateway_config(Arc::clone(&actions) as Arc<dyn GatewayActions>)
        .expect("serve configuration table");

    let monitor = read_message(&mut fixture.server);
    assert_eq!(monitor["method"], "monitor");
    assert_eq!(monitor["params"][2], json!({"Gateway_Config": {}}));
    let monitor_id = monitor["params"][1].as_str().expect("monitor id").to_string();

    let update = json!({
        "id": null,
        "method": "update",
        "params": [monitor_id, {"Gateway_Config": {"gw-row-7": {"new": {
            "if_name": "brlan0",
            "if_type": 1,
            "if_cmd": 0,
            "mtu": 1500,
            "vlan_id": 0,
        }}}}],
    });
    write_message(&mut fixture.server, &update);

    // The handler's outcome comes back as a Feedback insert keyed by the
    // configuration row's identifier.
    let feedback = read_message(&mut fixture.server);
    assert_eq!(feedback["method"], "transact");
    assert_eq!(feedback["params"][1]["op"], "insert");
    assert_eq!(feedback["params"][1]["table"], "Feedback");
    assert_eq!(feedback["params"][1]["row"]["req_uuid"], "gw-row-7");
    assert_eq!(
        feedback["params"][1]["row"]["status"],
        OvsStatus::Success.code()
    );
    assert_eq!(
        *actions.applied.lock().expect("actions mutex poisoned"),
        vec!["brlan0".to_string()]
    );
}

#[test]
fn submitting_feedback_rows_is_supported() {
    let mut fixture = harness(3000);

    fixture
        .agent
        .submit(
            TableRecord::Feedback(Feedback::new("abc-123", OvsStatus::Success)),
            BlockMode::NonBlocking,
            None,
        )
        .expect("submit feedback row");

    let insert = read_message(&mut fixture.server);
    assert_eq!(insert["params"][1]["table"], "Feedback");
    assert_eq!(insert["params"][1]["row"]["req_uuid"], "abc-123");
    assert_eq!(insert["params"][1]["row"]["status"], 0);
}
