// Path: crates/http-gateway/tests/runtime_e2e.rs
//! Drives a live router on an ephemeral port through the public client and a
//! WebSocket client.

use aether_client::RuntimeClient;
use aether_http_gateway::{serve, AppState, GatewayConfig};
use aether_services::bridge::{Bridge, InMemoryStore};
use aether_services::testing::FakeTonRpc;
use aether_services::ton::ActionGateway;
use aether_types::app::{ActionPayload, ActionResult, ControlCommand};
use aether_types::config::{BridgeConfig, RuntimeConfig, TonConfig};
use aether_types::error::GatewayErrorKind;
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

const ADDR: &str = "EQAAFhjXzKuQ5N0c96nsdZQWATcJm909LYSaCAvWFxVJP80D";

struct Runtime {
    client: RuntimeClient,
    fake: Arc<FakeTonRpc>,
    shutdown: watch::Sender<bool>,
    server: JoinHandle<anyhow::Result<()>>,
}

async fn spawn_runtime(fake: FakeTonRpc) -> Runtime {
    let fake = Arc::new(fake);
    let gateway = ActionGateway::new(fake.clone(), &TonConfig::default());
    let bridge = Bridge::new(
        Arc::new(InMemoryStore::new()),
        &BridgeConfig {
            poll_interval_ms: 20,
            ..BridgeConfig::default()
        },
    );
    let config = GatewayConfig::from(&RuntimeConfig::default());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown, shutdown_rx) = watch::channel(false);
    let server = tokio::spawn(async move {
        serve(listener, &config, AppState::new(gateway, bridge), shutdown_rx).await
    });

    Runtime {
        client: RuntimeClient::new(format!("http://{addr}")),
        fake,
        shutdown,
        server,
    }
}

fn command(action: &str, selector: &str, value: Option<&str>) -> ControlCommand {
    ControlCommand {
        action: action.into(),
        selector: selector.into(),
        value: value.map(str::to_string),
    }
}

#[tokio::test]
async fn health_endpoint_responds() {
    let rt = spawn_runtime(FakeTonRpc::default()).await;
    assert!(rt.client.healthz().await.unwrap());
}

#[tokio::test]
async fn second_control_write_replaces_first() {
    let rt = spawn_runtime(FakeTonRpc::default()).await;
    assert_eq!(rt.client.current_command().await.unwrap(), None);

    let first = command("CLICK", "#buy", None);
    let second = command("TYPE", "#amount", Some("1.5"));
    let ack = rt.client.control(&first).await.unwrap();
    assert_eq!(ack.command, first);
    rt.client.control(&second).await.unwrap();

    assert_eq!(rt.client.current_command().await.unwrap(), Some(second));
}

#[tokio::test]
async fn malformed_bodies_are_rejected_with_structured_errors() {
    let rt = spawn_runtime(FakeTonRpc::default()).await;
    let http = reqwest::Client::new();

    let resp = http
        .post(format!("{}/control", rt.client.base))
        .json(&json!({"action": "CLICK", "selector": "#a", "script": "alert(1)"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");

    let err = rt
        .client
        .control(&command("CLICK", "", None))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("BRIDGE_INVALID_COMMAND"), "{err}");

    let resp = http
        .post(format!("{}/ton", rt.client.base))
        .json(&json!({"action": "transfer", "address": ADDR}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "UNKNOWN_ACTION");

    let resp = http
        .post(format!("{}/ton", rt.client.base))
        .json(&json!({"action": "balance"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = http
        .post(format!("{}/snapshot", rt.client.base))
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    assert_eq!(rt.fake.calls(), 0);
}

#[tokio::test]
async fn ton_balance_round_trip() {
    let rt = spawn_runtime(FakeTonRpc::default().with_balance_nano(1_500_000_000)).await;
    match rt.client.ton_balance(ADDR).await.unwrap() {
        ActionResult::Success(ActionPayload::Balance { balance, unit, .. }) => {
            assert_eq!(balance, 1.5);
            assert_eq!(unit, "TON");
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(rt.fake.calls(), 1);
}

#[tokio::test]
async fn gateway_rejections_are_data_not_http_errors() {
    let rt = spawn_runtime(FakeTonRpc::default()).await;

    let res = rt.client.ton_balance("EQ-too-short").await.unwrap();
    assert_eq!(res.error_kind(), Some(GatewayErrorKind::InvalidAddress));

    let res = rt
        .client
        .ton_call(ADDR, "send_boc", vec![json!("te6cc")])
        .await
        .unwrap();
    assert_eq!(res.error_kind(), Some(GatewayErrorKind::UnauthorizedMethod));

    let res = rt
        .client
        .ton_call(ADDR, "seqno", vec![json!(1.25)])
        .await
        .unwrap();
    assert_eq!(res.error_kind(), Some(GatewayErrorKind::UnsupportedParamType));

    assert_eq!(rt.fake.calls(), 0);
}

#[tokio::test]
async fn upstream_timeout_is_reported_in_band() {
    let rt = spawn_runtime(FakeTonRpc::default().timing_out()).await;
    let res = rt.client.ton_call(ADDR, "seqno", vec![]).await.unwrap();
    assert_eq!(res.error_kind(), Some(GatewayErrorKind::Timeout));
    assert_eq!(rt.fake.calls(), 1);
}

async fn next_text<S>(ws: &mut S) -> String
where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("no frame within 5s")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return text;
        }
    }
}

#[tokio::test]
async fn observe_streams_empty_then_published_snapshot() {
    let rt = spawn_runtime(FakeTonRpc::default()).await;
    let (mut ws, _) = connect_async(rt.client.observe_url()).await.unwrap();

    assert_eq!(next_text(&mut ws).await, "{}");

    let snapshot = r#"{"elements":[{"id":"buy","tag":"BUTTON","text":"Buy"}]}"#;
    rt.client.publish_snapshot(snapshot).await.unwrap();

    loop {
        let frame = next_text(&mut ws).await;
        if frame != "{}" {
            assert_eq!(frame, snapshot);
            break;
        }
    }
}

#[tokio::test]
async fn shutdown_closes_observers_and_stops_server() {
    let rt = spawn_runtime(FakeTonRpc::default()).await;
    let (mut ws, _) = connect_async(rt.client.observe_url()).await.unwrap();
    assert_eq!(next_text(&mut ws).await, "{}");

    rt.shutdown.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(5), rt.server)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();

    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return true,
                Some(Ok(_)) => {}
            }
        }
    })
    .await
    .expect("observer was not closed");
    assert!(closed);
}
