//! Relay tests driven by real transport channels.

use std::time::Duration;

use chat_core::ChatMessage;
use chat_relay::{Hub, spawn_on};
use chat_transport::{ChannelConfig, ConnectionState, TransportChannel};
use futures::SinkExt;
use tokio::{net::TcpListener, sync::mpsc, time::timeout};
use tokio_test::assert_ok;
use tokio_tungstenite::{connect_async, tungstenite::Message};

const TIMEOUT: Duration = Duration::from_secs(5);

async fn start_relay() -> (Hub, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());
    let hub = Hub::default();
    let _server = spawn_on(listener, hub.clone(), "/ws");
    (hub, url)
}

async fn wait_for_clients(hub: &Hub, count: usize) {
    let waited = timeout(TIMEOUT, async {
        while hub.client_count() != count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "expected {count} clients, have {}", hub.client_count());
}

async fn open_client(url: &str) -> (TransportChannel, mpsc::UnboundedReceiver<ChatMessage>) {
    let channel = assert_ok!(TransportChannel::new(ChannelConfig::new(url)));
    let (tx, rx) = mpsc::unbounded_channel();
    assert_ok!(channel.connect(move |msg| {
        let _ = tx.send(msg);
    }));

    let mut state = channel.subscribe_state();
    let opened = timeout(TIMEOUT, state.wait_for(|s| *s == ConnectionState::Open)).await;
    assert!(opened.is_ok(), "client did not open");
    drop(opened);

    (channel, rx)
}

async fn next_body(rx: &mut mpsc::UnboundedReceiver<ChatMessage>) -> String {
    timeout(TIMEOUT, rx.recv()).await.unwrap().unwrap().into_body()
}

#[tokio::test]
async fn test_message_reaches_every_client() {
    let (hub, url) = start_relay().await;
    let (alice, mut alice_rx) = open_client(&url).await;
    let (_bob, mut bob_rx) = open_client(&url).await;
    wait_for_clients(&hub, 2).await;

    assert_ok!(alice.send("hello everyone"));

    assert_eq!(next_body(&mut alice_rx).await, "hello everyone");
    assert_eq!(next_body(&mut bob_rx).await, "hello everyone");
}

#[tokio::test]
async fn test_raw_text_client_is_relayed_as_envelope() {
    let (hub, url) = start_relay().await;
    let (_bob, mut bob_rx) = open_client(&url).await;

    let (mut legacy, _) = connect_async(url.as_str()).await.unwrap();
    wait_for_clients(&hub, 2).await;

    legacy.send(Message::Text("plain words".into())).await.unwrap();

    assert_eq!(next_body(&mut bob_rx).await, "plain words");
}

#[tokio::test]
async fn test_disconnect_unregisters_client() {
    let (hub, url) = start_relay().await;
    let (alice, _alice_rx) = open_client(&url).await;
    wait_for_clients(&hub, 1).await;

    alice.close();
    wait_for_clients(&hub, 0).await;
}
