//! End-to-end tests: real HTTP server, real WebSocket clients.

#![allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt, stream};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use taskboard_hub::app_state::AppState;
use taskboard_hub::bridge::{BrokerMessage, EventBridge};
use taskboard_hub::domain::{TaskEvent, TaskEventKind};
use taskboard_hub::hub::{Hub, HubHandle};
use taskboard_hub::ws::SessionSettings;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> (SocketAddr, HubHandle) {
    let hub = Hub::spawn(64);
    let app = taskboard_hub::app(AppState {
        hub: hub.clone(),
        session: SessionSettings::default(),
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server");
    });
    (addr, hub)
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("websocket handshake");
    client
}

async fn wait_for_clients(hub: &HubHandle, expected: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if hub.stats().await.expect("hub running").clients == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("hub never reached {expected} clients"));
}

/// Reads text frames until `count` payloads have arrived, splitting
/// coalesced frames on the newline delimiter.
async fn read_payloads(client: &mut Client, count: usize) -> Vec<String> {
    let mut payloads = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        while payloads.len() < count {
            match client.next().await {
                Some(Ok(Message::Text(text))) => {
                    payloads.extend(text.as_str().split('\n').map(str::to_string));
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                other => panic!("unexpected websocket item: {other:?}"),
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {count} payloads"));
    payloads
}

#[tokio::test]
async fn health_reports_connected_clients() {
    let (addr, hub) = start_server().await;
    let _a = connect(addr).await;
    let _b = connect(addr).await;
    wait_for_clients(&hub, 2).await;

    let body: serde_json::Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .expect("health request")
        .json()
        .await
        .expect("health body");

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["hub"]["clients"], 2);
}

#[tokio::test]
async fn bridged_event_reaches_every_client_unchanged() {
    let (addr, hub) = start_server().await;
    let mut clients = Vec::new();
    for _ in 0..3 {
        clients.push(connect(addr).await);
    }
    wait_for_clients(&hub, 3).await;

    let payload = r#"{"type":"created","task_id":1,"board_id":1}"#;
    let feed = stream::iter([BrokerMessage {
        subject: "tasks.created".to_string(),
        payload: payload.as_bytes().to_vec().into(),
    }]);
    let forwarded = EventBridge::new(hub.clone())
        .run(feed)
        .await
        .expect("bridge");
    assert_eq!(forwarded, 1);

    for client in &mut clients {
        assert_eq!(read_payloads(client, 1).await, vec![payload.to_string()]);
    }
}

#[tokio::test]
async fn departed_client_misses_later_events() {
    let (addr, hub) = start_server().await;
    let mut first = connect(addr).await;
    let mut second = connect(addr).await;
    let mut third = connect(addr).await;
    wait_for_clients(&hub, 3).await;

    let p = TaskEvent::new(TaskEventKind::Created, 10, 2, "P")
        .to_payload()
        .expect("serialize P");
    let q = TaskEvent::new(TaskEventKind::Updated, 10, 2, "Q")
        .completed()
        .to_payload()
        .expect("serialize Q");
    let p_text = String::from_utf8(p.to_vec()).expect("utf8");
    let q_text = String::from_utf8(q.to_vec()).expect("utf8");

    hub.broadcast(p).await.expect("broadcast P");
    assert_eq!(read_payloads(&mut second, 1).await, vec![p_text.clone()]);

    second.close(None).await.expect("close second");
    wait_for_clients(&hub, 2).await;

    hub.broadcast(q).await.expect("broadcast Q");
    for client in [&mut first, &mut third] {
        assert_eq!(
            read_payloads(client, 2).await,
            vec![p_text.clone(), q_text.clone()]
        );
    }
}

#[tokio::test]
async fn client_close_removes_it_from_the_registry() {
    let (addr, hub) = start_server().await;
    let mut client = connect(addr).await;
    wait_for_clients(&hub, 1).await;

    client.send(Message::text("hello hub")).await.expect("send");
    client.close(None).await.expect("close");

    wait_for_clients(&hub, 0).await;
}

#[tokio::test]
async fn oversized_client_message_drops_the_connection() {
    let (addr, hub) = start_server().await;
    let mut client = connect(addr).await;
    wait_for_clients(&hub, 1).await;

    let _ = client.send(Message::text("x".repeat(4096))).await;

    wait_for_clients(&hub, 0).await;
}
