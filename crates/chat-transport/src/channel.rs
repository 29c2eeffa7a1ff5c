//! WebSocket transport channel.
//!
//! One [`TransportChannel`] owns at most one live connection. `connect` and
//! `send` return immediately; the connection itself runs on a background
//! task that delivers decoded messages and lifecycle events in arrival order.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use chat_core::{ChatMessage, CloseReason, CodecError, ConnectionState, codec};
use futures::{SinkExt, StreamExt};
use tokio::{
    net::TcpStream,
    runtime::Handle,
    sync::{mpsc, oneshot, watch},
    time::timeout,
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Message, protocol::CloseFrame},
};

use crate::{
    config::ChannelConfig,
    error::{ChannelError, ConfigError},
    observer::{ChannelObserver, LoggingObserver},
    reconnect::{ExponentialBackoff, NoReconnect, ReconnectPolicy},
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type MessageHandler = Box<dyn Fn(ChatMessage) + Send + Sync>;

/// Close code reported when the relay closes without a status.
const NO_STATUS_RECEIVED: u16 = 1005;

/// How long to keep reading after the relay's close frame so the reply is
/// flushed and the relay can end the TCP connection.
const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// State shared between the channel handle and its connection task.
struct Shared {
    state: watch::Sender<ConnectionState>,
    /// Present only while the connection is `Open`.
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

impl Shared {
    /// Apply a state-machine edge. Invalid edges are logged and ignored.
    fn transition(&self, next: ConnectionState) -> bool {
        self.state.send_if_modified(|state| match state.transition(next) {
            Ok(next) => {
                tracing::debug!(from = %state, to = %next, "Connection state changed");
                *state = next;
                true
            }
            Err(e) => {
                tracing::warn!("{e}");
                false
            }
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Transport channel to a relay endpoint.
///
/// # Example
/// ```ignore
/// let channel = TransportChannel::new(ChannelConfig::from_env()?)?;
/// channel.connect(|msg| println!("{}", msg.body()))?;
/// channel.send("hello")?;
/// ```
pub struct TransportChannel {
    config: ChannelConfig,
    policy: Arc<dyn ReconnectPolicy>,
    observer: Arc<dyn ChannelObserver>,
    shared: Arc<Shared>,
    /// Dropping or firing this stops the current connection task.
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
}

impl TransportChannel {
    /// Create an idle channel.
    ///
    /// The reconnection policy comes from `config.reconnect`; lifecycle
    /// events are logged through `tracing` until another observer is set.
    ///
    /// # Errors
    /// Returns error if the endpoint is invalid.
    pub fn new(config: ChannelConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let policy: Arc<dyn ReconnectPolicy> = match &config.reconnect {
            Some(reconnect) => Arc::new(ExponentialBackoff::from(reconnect)),
            None => Arc::new(NoReconnect),
        };
        let observer = Arc::new(LoggingObserver::new(config.endpoint_url.clone()));
        let (state, _) = watch::channel(ConnectionState::Idle);

        Ok(Self {
            config,
            policy,
            observer,
            shared: Arc::new(Shared {
                state,
                outbound: Mutex::new(None),
            }),
            shutdown: Mutex::new(None),
        })
    }

    /// Replace the lifecycle observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ChannelObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Replace the reconnection policy.
    #[must_use]
    pub fn with_reconnect_policy(mut self, policy: Arc<dyn ReconnectPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Channel configuration.
    #[must_use]
    pub const fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Receiver that observes every state transition.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Start connecting and deliver each decoded inbound message to `on_message`.
    ///
    /// Returns as soon as the state is `Connecting`; the handshake runs on a
    /// background task. From `Closed` this starts a fresh connection and
    /// cancels any pending retry.
    ///
    /// # Errors
    /// Returns [`ChannelError::NoRuntime`] outside a Tokio runtime, leaving the
    /// state unchanged. Returns [`ChannelError::AlreadyConnected`] if a
    /// connection is `Connecting`, `Open`, or still reporting an error. The
    /// existing connection and handler are left untouched.
    pub fn connect<F>(&self, on_message: F) -> Result<(), ChannelError>
    where
        F: Fn(ChatMessage) + Send + Sync + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| ChannelError::NoRuntime)?;

        let mut observed = ConnectionState::Idle;
        let started = self.shared.state.send_if_modified(|state| {
            observed = *state;
            if matches!(*state, ConnectionState::Idle | ConnectionState::Closed) {
                *state = ConnectionState::Connecting;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(ChannelError::AlreadyConnected { state: observed });
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        // Replacing the sender stops a task still waiting to reconnect.
        *lock(&self.shutdown) = Some(shutdown_tx);

        let connection = Connection {
            config: self.config.clone(),
            policy: Arc::clone(&self.policy),
            observer: Arc::clone(&self.observer),
            shared: Arc::clone(&self.shared),
            on_message: Box::new(on_message),
        };
        runtime.spawn(connection.run(shutdown_rx));

        tracing::info!(endpoint = %self.config.endpoint_url, "Connecting...");
        Ok(())
    }

    /// Send `text` as one outbound frame.
    ///
    /// # Errors
    /// Returns [`ChannelError::NotConnected`] unless the state is `Open`.
    /// Nothing is transmitted in that case.
    pub fn send(&self, text: &str) -> Result<(), ChannelError> {
        let state = self.state();
        if state != ConnectionState::Open {
            return Err(ChannelError::NotConnected { state });
        }

        let frame = codec::encode_with(self.config.outbound_format, text);
        let outbound = lock(&self.shared.outbound);
        let sent = outbound.as_ref().is_some_and(|tx| tx.send(frame).is_ok());
        drop(outbound);

        if sent {
            tracing::debug!("Sending message: {text}");
            Ok(())
        } else {
            Err(ChannelError::NotConnected {
                state: self.state(),
            })
        }
    }

    /// Close the connection and stop reconnecting.
    ///
    /// From `Connecting` the handshake is abandoned; from `Open` a close frame
    /// is sent. Either ends in `Closed` with [`CloseReason::Local`]. A pending
    /// retry is cancelled and the state stays `Closed`. No-op when idle.
    pub fn close(&self) {
        if let Some(tx) = lock(&self.shutdown).take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for TransportChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// How one connection attempt ended.
enum Outcome {
    /// Local close or shutdown; do not reconnect.
    Stopped,
    /// Ended by the remote side or a failure.
    Ended { opened: bool },
}

/// Why an open session ended.
enum SessionEnd {
    Local,
    Remote(CloseReason),
    Failed(ChannelError),
}

/// Connection task state.
struct Connection {
    config: ChannelConfig,
    policy: Arc<dyn ReconnectPolicy>,
    observer: Arc<dyn ChannelObserver>,
    shared: Arc<Shared>,
    on_message: MessageHandler,
}

impl Connection {
    /// Connect, serve, and reconnect per policy until stopped.
    async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        let mut attempt: u32 = 0;

        loop {
            match self.attempt(&mut shutdown).await {
                Outcome::Stopped => return,
                Outcome::Ended { opened: true } => attempt = 0,
                Outcome::Ended { opened: false } => {}
            }

            let Some(delay) = self.policy.next_delay(attempt) else {
                return;
            };
            attempt = attempt.saturating_add(1);
            tracing::info!(
                endpoint = %self.config.endpoint_url,
                attempt,
                "Reconnecting in {delay:?}"
            );

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                _ = &mut shutdown => return,
            }

            // A fresh `connect` may have claimed the channel meanwhile.
            if !self.shared.transition(ConnectionState::Connecting) {
                return;
            }
        }
    }

    /// One handshake plus, if it succeeds, one session.
    async fn attempt(&self, shutdown: &mut oneshot::Receiver<()>) -> Outcome {
        let limit = self.config.connect_timeout();
        let handshake = timeout(limit, connect_async(self.config.endpoint_url.as_str()));

        let result = tokio::select! {
            result = handshake => result,
            _ = &mut *shutdown => {
                self.finish(&CloseReason::Local);
                return Outcome::Stopped;
            }
        };

        match result {
            Ok(Ok((ws, _response))) => self.session(ws, shutdown).await,
            Ok(Err(e)) => {
                self.fail(ChannelError::ConnectionFailed(e.to_string()));
                Outcome::Ended { opened: false }
            }
            Err(_) => {
                self.fail(ChannelError::ConnectTimeout(limit));
                Outcome::Ended { opened: false }
            }
        }
    }

    async fn session(&self, ws: WsStream, shutdown: &mut oneshot::Receiver<()>) -> Outcome {
        let (mut sink, mut stream) = ws.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        *lock(&self.shared.outbound) = Some(tx);
        if !self.shared.transition(ConnectionState::Open) {
            lock(&self.shared.outbound).take();
            let _ = sink.send(Message::Close(None)).await;
            return Outcome::Stopped;
        }
        self.observer.on_open();

        let end = loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.deliver(text.as_str()),
                    Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                        Ok(text) => self.deliver(text),
                        Err(e) => self.observer.on_frame_rejected(&CodecError::Malformed {
                            raw: String::from_utf8_lossy(&data).into_owned(),
                            reason: e.to_string(),
                        }),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        // Reading flushes the queued close reply.
                        let drained = timeout(CLOSE_HANDSHAKE_TIMEOUT, async {
                            while stream.next().await.is_some() {}
                        });
                        if drained.await.is_err() {
                            tracing::debug!("Relay did not finish the close handshake");
                        }
                        break SessionEnd::Remote(remote_reason(frame));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        break SessionEnd::Failed(ChannelError::Transport(e.to_string()));
                    }
                    None => {
                        break SessionEnd::Remote(CloseReason::Dropped("stream ended".to_string()));
                    }
                },
                Some(frame) = rx.recv() => {
                    if let Err(e) = sink.send(Message::Text(frame.into())).await {
                        break SessionEnd::Failed(ChannelError::Transport(e.to_string()));
                    }
                }
                _ = &mut *shutdown => {
                    if let Err(e) = sink.send(Message::Close(None)).await {
                        tracing::debug!("Close frame not sent: {e}");
                    }
                    break SessionEnd::Local;
                }
            }
        };

        lock(&self.shared.outbound).take();

        match end {
            SessionEnd::Local => {
                self.finish(&CloseReason::Local);
                Outcome::Stopped
            }
            SessionEnd::Remote(reason) => {
                self.finish(&reason);
                Outcome::Ended { opened: true }
            }
            SessionEnd::Failed(error) => {
                self.fail(error);
                Outcome::Ended { opened: true }
            }
        }
    }

    fn deliver(&self, text: &str) {
        tracing::debug!("Message from websocket: {text}");
        match codec::decode_text(text) {
            Ok(msg) => (self.on_message)(msg),
            Err(e) => self.observer.on_frame_rejected(&e),
        }
    }

    /// `Error` then `Closed`, reporting both.
    fn fail(&self, error: ChannelError) {
        self.shared.transition(ConnectionState::Error);
        self.observer.on_error(&error);
        self.finish(&CloseReason::Dropped(error.to_string()));
    }

    fn finish(&self, reason: &CloseReason) {
        self.shared.transition(ConnectionState::Closed);
        self.observer.on_close(reason);
    }
}

fn remote_reason(frame: Option<CloseFrame>) -> CloseReason {
    frame.map_or(
        CloseReason::Remote {
            code: NO_STATUS_RECEIVED,
            reason: String::new(),
        },
        |frame| CloseReason::Remote {
            code: u16::from(frame.code),
            reason: frame.reason.as_str().to_owned(),
        },
    )
}
