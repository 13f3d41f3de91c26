//! Duplex channel connection manager.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use readmark_config::{BackendConfig, ChannelConfig};
use readmark_protocols::{ChannelEvent, OutboundFrame};

use crate::error::ChannelError;
use crate::state::ConnectionState;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

#[derive(Default)]
struct TaskSet {
    recv: Option<JoinHandle<()>>,
    heartbeat: Option<JoinHandle<()>>,
    watchdog: Option<JoinHandle<()>>,
}

struct Inner {
    backend: BackendConfig,
    channel: ChannelConfig,
    state: Mutex<ConnectionState>,
    /// Guards against a second handshake while one is in flight.
    connecting: AtomicBool,
    /// Set during shutdown so a closing stream does not trigger reconnects.
    shutting_down: AtomicBool,
    /// The user the channel is (or should be) connected for.
    uid: Mutex<Option<String>>,
    events: broadcast::Sender<ChannelEvent>,
    sink: tokio::sync::Mutex<Option<WsSink>>,
    tasks: Mutex<TaskSet>,
}

/// Manages the one server-push connection per signed-in user.
///
/// Events received on the channel are rebroadcast to subscribers in arrival
/// order. Frames that fail to parse are logged and dropped without
/// disturbing the ordering of the frames around them.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    pub fn new(backend: BackendConfig, channel: ChannelConfig) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Inner {
                backend,
                channel,
                state: Mutex::new(ConnectionState::Idle),
                connecting: AtomicBool::new(false),
                shutting_down: AtomicBool::new(false),
                uid: Mutex::new(None),
                events,
                sink: tokio::sync::Mutex::new(None),
                tasks: Mutex::new(TaskSet::default()),
            }),
        }
    }

    /// Subscribe to channel events. Safe to call before `connect`.
    pub fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.inner.events.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.lock()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Open the channel for a user.
    ///
    /// Idempotent: a connect while the channel is open, or while another
    /// connect is still in flight, is a no-op. The first successful call
    /// also arms the watchdog that revives a dead channel later.
    pub async fn connect(&self, uid: &str) -> Result<(), ChannelError> {
        self.inner.shutting_down.store(false, Ordering::SeqCst);
        *self.inner.uid.lock() = Some(uid.to_string());
        self.spawn_watchdog();

        if self.is_open() {
            return Ok(());
        }
        if self.inner.connecting.swap(true, Ordering::SeqCst) {
            debug!("Channel connect already in flight, ignoring");
            return Ok(());
        }
        let result = Inner::establish(&self.inner, uid).await;
        if result.is_err() {
            *self.inner.state.lock() = ConnectionState::Idle;
        }
        self.inner.connecting.store(false, Ordering::SeqCst);
        result
    }

    /// Tear the channel down and stop all background tasks.
    pub async fn shutdown(&self) {
        self.inner.shutting_down.store(true, Ordering::SeqCst);
        *self.inner.uid.lock() = None;

        let (recv, heartbeat, watchdog) = {
            let mut tasks = self.inner.tasks.lock();
            (
                tasks.recv.take(),
                tasks.heartbeat.take(),
                tasks.watchdog.take(),
            )
        };
        if let Some(task) = heartbeat {
            task.abort();
        }
        if let Some(task) = watchdog {
            task.abort();
        }
        if let Some(mut sink) = self.inner.sink.lock().await.take() {
            let _ = sink.send(Message::Close(None)).await;
        }
        if let Some(task) = recv {
            task.abort();
        }
        *self.inner.state.lock() = ConnectionState::Idle;
        info!("Channel shut down");
    }

    /// Arm the periodic watchdog, once. It reconnects a channel that is down
    /// while a user is still signed in.
    fn spawn_watchdog(&self) {
        let mut tasks = self.inner.tasks.lock();
        if tasks.watchdog.is_some() {
            return;
        }
        let inner = self.inner.clone();
        tasks.watchdog = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(inner.channel.watchdog_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if inner.shutting_down.load(Ordering::SeqCst) {
                    continue;
                }
                let uid = inner.uid.lock().clone();
                let down = *inner.state.lock() != ConnectionState::Open;
                if let (Some(uid), true) = (uid, down) {
                    if inner.connecting.swap(true, Ordering::SeqCst) {
                        continue;
                    }
                    debug!("Watchdog reviving channel");
                    if let Err(e) = Inner::establish(&inner, &uid).await {
                        warn!("Watchdog connect failed: {e}");
                        *inner.state.lock() = ConnectionState::Idle;
                    }
                    inner.connecting.store(false, Ordering::SeqCst);
                }
            }
        }));
    }
}

impl Inner {
    /// Perform one handshake and start the per-connection tasks.
    ///
    /// Returns a boxed future to break the recursive cycle (establish spawns
    /// receive_loop, which awaits run_reconnect, which awaits establish) so
    /// the compiler can prove the future is `Send`.
    fn establish<'a>(
        inner: &'a Arc<Inner>,
        uid: &'a str,
    ) -> futures::future::BoxFuture<'a, Result<(), ChannelError>> {
        Box::pin(Self::establish_inner(inner, uid))
    }

    async fn establish_inner(inner: &Arc<Inner>, uid: &str) -> Result<(), ChannelError> {
        if *inner.state.lock() == ConnectionState::Open {
            return Ok(());
        }
        // A reconnect task that outlived shutdown must not reopen the
        // channel.
        if inner.shutting_down.load(Ordering::SeqCst) {
            *inner.state.lock() = ConnectionState::Idle;
            return Ok(());
        }
        *inner.state.lock() = ConnectionState::Connecting;

        let url = inner.backend.ws_url(uid);
        debug!(%url, "Opening duplex channel");
        // On failure the caller decides the state: external connects and the
        // watchdog settle on Idle, the backoff loop stays Reconnecting.
        let (ws_stream, _) = match tokio_tungstenite::connect_async(&url).await {
            Ok(pair) => pair,
            Err(e) => return Err(ChannelError::Connect(e.to_string())),
        };

        let (sink, source) = ws_stream.split();
        *inner.sink.lock().await = Some(sink);
        *inner.state.lock() = ConnectionState::Open;
        info!("Channel open for uid {uid}");

        let recv = tokio::spawn(Self::receive_loop(
            inner.clone(),
            source,
            uid.to_string(),
        ));
        let heartbeat = tokio::spawn(Self::heartbeat_loop(inner.clone()));

        let mut tasks = inner.tasks.lock();
        // The previous recv task, if any, has already exited; dropping the
        // handle detaches it.
        tasks.recv = Some(recv);
        if let Some(old) = tasks.heartbeat.replace(heartbeat) {
            old.abort();
        }
        Ok(())
    }

    /// Read frames until the stream ends, then hand off to reconnection.
    async fn receive_loop(inner: Arc<Inner>, mut source: WsSource, uid: String) {
        while let Some(msg) = source.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<ChannelEvent>(&text) {
                    Ok(event) => {
                        debug!(kind = event.kind(), "Channel event");
                        let _ = inner.events.send(event);
                    }
                    Err(e) => {
                        warn!("Dropping unparseable channel frame: {e}");
                    }
                },
                Ok(Message::Close(_)) => {
                    debug!("Channel closed by server");
                    break;
                }
                Err(e) => {
                    warn!("Channel stream error: {e}");
                    break;
                }
                _ => {}
            }
        }

        inner.sink.lock().await.take();
        if let Some(heartbeat) = inner.tasks.lock().heartbeat.take() {
            heartbeat.abort();
        }
        if inner.shutting_down.load(Ordering::SeqCst) {
            *inner.state.lock() = ConnectionState::Idle;
            return;
        }
        *inner.state.lock() = ConnectionState::Reconnecting;
        Self::run_reconnect(inner, uid).await;
    }

    /// Backoff reconnect loop. Gives up after the configured attempt budget
    /// and leaves revival to the watchdog or the next external connect.
    async fn run_reconnect(inner: Arc<Inner>, uid: String) {
        let max = inner.channel.max_reconnect_attempts;
        for attempt in 0..max {
            let delay = inner.channel.backoff_delay(attempt);
            debug!(attempt = attempt + 1, ?delay, "Reconnecting after backoff");
            tokio::time::sleep(delay).await;
            if inner.shutting_down.load(Ordering::SeqCst) {
                *inner.state.lock() = ConnectionState::Idle;
                return;
            }
            if inner.connecting.swap(true, Ordering::SeqCst) {
                continue;
            }
            let result = Self::establish(&inner, &uid).await;
            inner.connecting.store(false, Ordering::SeqCst);
            match result {
                Ok(()) => return,
                Err(e) => {
                    warn!("Reconnect attempt {} failed: {e}", attempt + 1);
                    *inner.state.lock() = ConnectionState::Reconnecting;
                }
            }
        }
        warn!("Reconnect budget exhausted, channel stays down until next trigger");
        *inner.state.lock() = ConnectionState::Idle;
    }

    /// Periodic keepalive ping over the open connection.
    async fn heartbeat_loop(inner: Arc<Inner>) {
        let mut ticker = tokio::time::interval(inner.channel.heartbeat_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let frame = match serde_json::to_string(&OutboundFrame::Ping) {
                Ok(frame) => frame,
                Err(_) => return,
            };
            let mut sink = inner.sink.lock().await;
            match sink.as_mut() {
                Some(sink) => {
                    if let Err(e) = sink.send(Message::Text(frame.into())).await {
                        warn!("Heartbeat send failed: {e}");
                        return;
                    }
                }
                None => return,
            }
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
