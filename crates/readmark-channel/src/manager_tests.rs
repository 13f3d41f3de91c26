use super::*;

use std::net::SocketAddr;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::timeout;

fn manager_for(addr: SocketAddr, channel: ChannelConfig) -> ConnectionManager {
    let backend = BackendConfig {
        base_url: format!("http://{addr}"),
    };
    ConnectionManager::new(backend, channel)
}

fn fast_channel() -> ChannelConfig {
    ChannelConfig {
        backoff_base_ms: 10,
        backoff_cap_ms: 50,
        ..ChannelConfig::default()
    }
}

async fn listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

#[tokio::test]
async fn events_arrive_in_order_and_garbage_is_dropped() {
    let (listener, addr) = listener().await;
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::Text(r#"{"type":"chat_ready","data":{}}"#.into()))
            .await
            .unwrap();
        ws.send(Message::Text("not a frame".into())).await.unwrap();
        ws.send(Message::Text(
            r#"{"type":"progress_percentage","data":{"value":40}}"#.into(),
        ))
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
    });

    let manager = manager_for(addr, fast_channel());
    let mut rx = manager.subscribe();
    manager.connect("u-1").await.unwrap();
    assert_eq!(manager.state(), ConnectionState::Open);

    let first = timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(first, ChannelEvent::ChatReady { .. }));

    // The malformed frame in between never surfaces.
    let second = timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    match second {
        ChannelEvent::ProgressPercentage { data } => assert_eq!(data["value"], 40),
        other => panic!("unexpected event: {other:?}"),
    }

    manager.shutdown().await;
    server.await.unwrap();
}

#[tokio::test]
async fn concurrent_connects_open_a_single_connection() {
    let (listener, addr) = listener().await;
    let accepts = Arc::new(AtomicUsize::new(0));
    let counter = accepts.clone();
    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            counter.fetch_add(1, Ordering::SeqCst);
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            while ws.next().await.is_some() {}
        }
    });

    let manager = manager_for(addr, fast_channel());
    let (a, b) = tokio::join!(manager.connect("u-1"), manager.connect("u-1"));
    a.unwrap();
    b.unwrap();
    // A third connect against an open channel is a no-op too.
    manager.connect("u-1").await.unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(accepts.load(Ordering::SeqCst), 1);
    manager.shutdown().await;
}

#[tokio::test]
async fn reconnects_after_server_drop() {
    let (listener, addr) = listener().await;
    tokio::spawn(async move {
        // First connection is dropped right after the handshake.
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        drop(ws);

        // Second connection delivers an event.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::Text(r#"{"type":"chat_ready","data":{}}"#.into()))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
    });

    let manager = manager_for(addr, fast_channel());
    let mut rx = manager.subscribe();
    manager.connect("u-1").await.unwrap();

    let event = timeout(Duration::from_secs(3), rx.recv())
        .await
        .expect("channel should have reconnected")
        .unwrap();
    assert!(matches!(event, ChannelEvent::ChatReady { .. }));
    assert_eq!(manager.state(), ConnectionState::Open);
    manager.shutdown().await;
}

#[tokio::test]
async fn heartbeat_pings_on_the_wire() {
    let (listener, addr) = listener().await;
    let (ping_tx, ping_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(text) = msg {
                let _ = ping_tx.send(text.to_string());
                break;
            }
        }
    });

    let channel = ChannelConfig {
        heartbeat_secs: 1,
        ..fast_channel()
    };
    let manager = manager_for(addr, channel);
    manager.connect("u-1").await.unwrap();

    let ping = timeout(Duration::from_secs(3), ping_rx).await.unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&ping).unwrap();
    assert_eq!(value, serde_json::json!({"type": "ping"}));
    manager.shutdown().await;
}

#[tokio::test]
async fn state_stays_reconnecting_between_backoff_attempts() {
    let (listener, addr) = listener().await;
    let server = tokio::spawn(async move {
        // One connection, then the port goes dark so every retry fails.
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        drop(ws);
        drop(listener);
    });

    let manager = manager_for(addr, fast_channel());
    manager.connect("u-1").await.unwrap();
    server.await.unwrap();

    // Sampled mid-budget: the retry loop must not report a premature idle.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let state = manager.state();
    assert!(
        state == ConnectionState::Reconnecting || state == ConnectionState::Connecting,
        "unexpected state mid-reconnect: {state}"
    );
    manager.shutdown().await;
}

#[tokio::test]
async fn watchdog_revives_channel_after_reconnects_give_up() {
    let (listener, addr) = listener().await;
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        drop(ws);
        drop(listener);
    });

    let channel = ChannelConfig {
        watchdog_secs: 1,
        max_reconnect_attempts: 1,
        ..fast_channel()
    };
    let manager = manager_for(addr, channel);
    let mut rx = manager.subscribe();
    manager.connect("u-1").await.unwrap();
    server.await.unwrap();

    // The single-attempt budget fails against the closed port and gives up.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(manager.state(), ConnectionState::Idle);

    // The server comes back; a later watchdog tick reopens the channel.
    let listener = TcpListener::bind(addr).await.unwrap();
    let revived = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::Text(r#"{"type":"chat_ready","data":{}}"#.into()))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
    });

    let event = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("watchdog should have revived the channel")
        .unwrap();
    assert!(matches!(event, ChannelEvent::ChatReady { .. }));
    assert_eq!(manager.state(), ConnectionState::Open);
    manager.shutdown().await;
    revived.await.unwrap();
}

#[tokio::test]
async fn shutdown_resets_state_and_stops_reconnects() {
    let (listener, addr) = listener().await;
    let accepts = Arc::new(AtomicUsize::new(0));
    let counter = accepts.clone();
    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            counter.fetch_add(1, Ordering::SeqCst);
            let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            drop(ws);
        }
    });

    let manager = manager_for(addr, fast_channel());
    manager.connect("u-1").await.unwrap();
    manager.shutdown().await;
    assert_eq!(manager.state(), ConnectionState::Idle);

    let before = accepts.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(accepts.load(Ordering::SeqCst), before);
}
