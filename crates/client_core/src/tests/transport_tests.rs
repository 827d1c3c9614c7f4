use super::*;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use shared::protocol::WireValue;
use tokio::{net::TcpListener, sync::Mutex};

use crate::{navigation::Level, session::PanelSession, TracingNotifier};

type Recorded = Arc<Mutex<Vec<Value>>>;

async fn spawn_device(app: Router) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn client(base: &str) -> HttpRemoteTree {
    HttpRemoteTree::new(base, Duration::from_secs(5)).expect("client")
}

async fn root_commands() -> Json<Value> {
    Json(json!([{ "name": "rf", "hasChildren": true }]))
}

async fn root_variables() -> Json<Value> {
    Json(json!([{
        "name": "verbosity",
        "type": "loglvl",
        "value": "info",
        "choices": ["error", "info", "debug"]
    }]))
}

async fn rf_commands() -> Json<Value> {
    Json(json!([{ "name": "tx" }]))
}

async fn rf_variables() -> Json<Value> {
    Json(json!([{ "name": "gain", "type": "integer", "value": "10" }]))
}

async fn tx_arguments() -> Json<Value> {
    Json(json!([
        { "name": "x", "type": "integer", "value": 1 },
        { "name": "y", "type": "string", "value": "a" }
    ]))
}

async fn record_set(State(recorded): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    let value = body["value"].clone();
    recorded.lock().await.push(body);
    Json(json!({ "accepted": true, "currentValue": value }))
}

async fn record_run(State(recorded): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    recorded.lock().await.push(body);
    Json(json!({
        "display": ["OK"],
        "logs": [{ "component": "RF", "level": "info", "output": "stdout", "enabled": true }]
    }))
}

fn device_router(recorded: Recorded) -> Router {
    Router::new()
        .route("/oaisoftmodem/commands/", get(root_commands))
        .route("/oaisoftmodem/variables/", get(root_variables))
        .route("/oaisoftmodem/rf/commands/", get(rf_commands).post(record_run))
        .route("/oaisoftmodem/rf/variables/", get(rf_variables).post(record_set))
        .route("/oaisoftmodem/rf/tx/variables/", get(tx_arguments))
        .with_state(recorded)
}

#[tokio::test]
async fn lists_root_commands_and_variables() {
    let base = spawn_device(device_router(Recorded::default())).await;
    let remote = client(&base);

    let commands = remote
        .list_commands(&ScopePath::root())
        .await
        .expect("commands");
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].name, "rf");
    assert!(commands[0].has_children);

    let variables = remote
        .list_variables(&ScopePath::root())
        .await
        .expect("variables");
    assert_eq!(variables[0].type_tag, Some(shared::domain::TypeTag::Choice));
}

#[tokio::test]
async fn scope_segments_become_url_path_segments() {
    let base = spawn_device(device_router(Recorded::default())).await;
    let remote = client(&base);

    let arguments = remote
        .list_variables(&ScopePath::parse("rf/tx"))
        .await
        .expect("arguments");
    let names: Vec<&str> = arguments.iter().map(|arg| arg.name.as_str()).collect();
    assert_eq!(names, ["x", "y"]);
}

#[tokio::test]
async fn base_path_prefix_is_preserved() {
    let app = Router::new().route("/panel/oaisoftmodem/commands/", get(root_commands));
    let base = spawn_device(app).await;
    let remote = client(&format!("{base}/panel"));

    let commands = remote
        .list_commands(&ScopePath::root())
        .await
        .expect("commands");
    assert_eq!(commands[0].name, "rf");
}

#[tokio::test]
async fn set_variable_posts_name_value_and_type() {
    let recorded = Recorded::default();
    let base = spawn_device(device_router(recorded.clone())).await;
    let remote = client(&base);

    let response = remote
        .set_variable(
            &SetVariableRequest {
                name: "gain".to_string(),
                value: WireValue::from("12"),
                type_tag: shared::domain::TypeTag::Integer,
            },
            &ScopePath::parse("rf"),
        )
        .await
        .expect("set");

    assert!(response.accepted);
    assert_eq!(response.current_value.as_deref(), Some("12"));
    assert_eq!(
        recorded.lock().await.as_slice(),
        [json!({ "name": "gain", "value": "12", "type": "integer" })]
    );
}

#[tokio::test]
async fn error_status_is_remote_rejection_with_body() {
    let app = Router::new().route(
        "/oaisoftmodem/variables/",
        post(|| async { (StatusCode::BAD_REQUEST, "value out of range") }),
    );
    let base = spawn_device(app).await;
    let remote = client(&base);

    let err = remote
        .set_variable(
            &SetVariableRequest {
                name: "gain".to_string(),
                value: WireValue::from("99"),
                type_tag: shared::domain::TypeTag::Integer,
            },
            &ScopePath::root(),
        )
        .await
        .expect_err("rejected");
    assert!(
        matches!(&err, PanelError::RemoteRejected { message } if message == "value out of range"),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn undecodable_body_is_transport_failure() {
    let app = Router::new().route("/oaisoftmodem/commands/", get(|| async { "not json" }));
    let base = spawn_device(app).await;

    let err = client(&base)
        .list_commands(&ScopePath::root())
        .await
        .expect_err("malformed");
    assert!(matches!(err, PanelError::Transport(_)), "unexpected error: {err}");
}

#[tokio::test]
async fn unreachable_device_is_transport_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let err = client(&format!("http://{addr}"))
        .list_commands(&ScopePath::root())
        .await
        .expect_err("unreachable");
    assert!(matches!(err, PanelError::Transport(_)), "unexpected error: {err}");
}

#[tokio::test]
async fn fetches_help_text_by_file_name() {
    let app = Router::new().route(
        "/oaisoftmodem/helpfiles/softmodem_rf_gain.html",
        get(|| async { Json(json!({ "text": "Receive gain in dB" })) }),
    );
    let base = spawn_device(app).await;

    let text = client(&base)
        .fetch_help(&HelpRequest {
            component: "softmodem".to_string(),
            module: "rf".to_string(),
            object: "gain".to_string(),
        })
        .await
        .expect("help");
    assert_eq!(text, "Receive gain in dB");
}

#[test]
fn rejects_urls_without_a_path() {
    assert!(matches!(
        HttpRemoteTree::new("mailto:ops@example.com", Duration::from_secs(1)),
        Err(PanelError::InvalidBackendUrl { .. })
    ));
    assert!(matches!(
        HttpRemoteTree::new("not a url", Duration::from_secs(1)),
        Err(PanelError::InvalidBackendUrl { .. })
    ));
}

#[tokio::test]
async fn session_navigates_and_runs_command_over_http() {
    let recorded = Recorded::default();
    let base = spawn_device(device_router(recorded.clone())).await;
    let session = PanelSession::new(Arc::new(client(&base)), Arc::new(TracingNotifier));

    assert!(session.load_root().await);
    assert!(session.select_module("rf").await.expect("rf"));
    assert!(session.select_command("tx").await.expect("tx"));
    session.edit_argument("y", "b").await.expect("edit");

    let response = session.submit_command().await.expect("run");
    assert_eq!(response.display, ["OK"]);
    assert_eq!(
        recorded.lock().await.as_slice(),
        [json!({ "name": "tx", "args": ["1", "b"] })]
    );
    assert_eq!(session.logs().await.len(), 1);

    session
        .edit_variable(Level::Module, "gain", "12")
        .await
        .expect("edit gain");
    let set = session
        .submit_variable(Level::Module, "gain")
        .await
        .expect("set gain");
    assert_eq!(set.current_value.as_deref(), Some("12"));
}
