/// Streaming channel to the correlation server
///
/// One [`ConnectionManager`] owns one channel for the lifetime of a session. The channel is
/// never re-established: once it reaches [`ConnectionState::Disconnected`] after being open, a
/// new manager has to be created.

use crate::shared::{config::ClientConfig, session::SymbolSink, types::CorrelationMatrix};
use futures::{SinkExt, StreamExt};
use std::{fmt, time::Duration};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Connection status of the streaming channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    /// Channel open, no snapshot received yet
    Waiting,
    /// At least one snapshot received since the channel opened
    Connected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Waiting => "waiting",
            ConnectionState::Connected => "connected",
        }
    }

    /// Check if an outbound message can usefully be sent
    pub fn is_open(&self) -> bool {
        !matches!(self, ConnectionState::Disconnected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle signal observed on the channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Opened,
    Message(String),
    Failed(String),
    Closed,
}

/// Connection state machine, fed with [`ChannelEvent`]s
///
/// Well-formed inbound messages are returned as snapshots. Malformed ones are dropped here and
/// leave the state untouched.
#[derive(Debug, Default)]
pub struct ConnectionTracker {
    state: ConnectionState,
    terminated: bool,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn apply(&mut self, event: ChannelEvent) -> Option<CorrelationMatrix> {
        match event {
            ChannelEvent::Opened => {
                if self.terminated || self.state.is_open() {
                    debug!(state = %self.state, "ignoring open on a used channel");
                } else {
                    self.state = ConnectionState::Waiting;
                }
                None
            }
            ChannelEvent::Message(text) => {
                if !self.state.is_open() {
                    debug!("ignoring message on a closed channel");
                    return None;
                }
                match text.parse::<CorrelationMatrix>() {
                    Ok(matrix) => {
                        self.state = ConnectionState::Connected;
                        Some(matrix)
                    }
                    Err(e) => {
                        warn!("Dropping malformed snapshot: {}", e);
                        debug!("Raw message: {}", text.chars().take(200).collect::<String>());
                        None
                    }
                }
            }
            ChannelEvent::Failed(reason) => {
                warn!(%reason, "correlation stream failed");
                self.terminate();
                None
            }
            ChannelEvent::Closed => {
                self.terminate();
                None
            }
        }
    }

    fn terminate(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.terminated = true;
    }
}

enum Outbound {
    Symbols(String),
    Close,
}

/// Owner of the session's single streaming channel
pub struct ConnectionManager {
    state_rx: watch::Receiver<ConnectionState>,
    outbound_tx: mpsc::UnboundedSender<Outbound>,
    task: JoinHandle<()>,
}

impl ConnectionManager {
    /// Open the channel described by `config`
    ///
    /// Must be called from within a tokio runtime. Returns the manager and a receiver of
    /// snapshots in arrival order.
    pub fn connect(config: &ClientConfig) -> (Self, mpsc::Receiver<CorrelationMatrix>) {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (snapshot_tx, snapshot_rx) = mpsc::channel(config.channel_buffer_size.max(1));
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let url = config.stream_url.clone();
        let ping_interval = config.ping_interval;
        let task = tokio::spawn(async move {
            run_channel(url, ping_interval, state_tx, snapshot_tx, outbound_rx).await;
        });

        (
            Self {
                state_rx,
                outbound_tx,
                task,
            },
            snapshot_rx,
        )
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Watch state transitions
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Transmit `symbols` as one comma-joined text message
    ///
    /// Fire-and-forget: nothing is sent while the channel is disconnected.
    pub fn send(&self, symbols: &[String]) {
        let state = self.state();
        if !state.is_open() {
            debug!(%state, "channel not open, dropping symbol submission");
            return;
        }

        let payload = symbols.join(",");
        info!(%payload, "submitting symbols");
        if self.outbound_tx.send(Outbound::Symbols(payload)).is_err() {
            debug!("channel task already finished");
        }
    }

    /// Request an orderly close of the channel
    pub fn close(&self) {
        let _ = self.outbound_tx.send(Outbound::Close);
    }

    /// Check if the channel task has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl SymbolSink for ConnectionManager {
    fn send_symbols(&self, symbols: &[String]) {
        self.send(symbols);
    }
}

/// Drive one channel instance from dial to termination
async fn run_channel(
    url: String,
    ping_interval: Duration,
    state_tx: watch::Sender<ConnectionState>,
    snapshot_tx: mpsc::Sender<CorrelationMatrix>,
    mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
) {
    let mut tracker = ConnectionTracker::new();
    let mut apply = |event: ChannelEvent| {
        let snapshot = tracker.apply(event);
        state_tx.send_replace(tracker.state());
        snapshot
    };

    info!("Opening correlation stream at {}", url);
    let ws_stream = match connect_async(url.as_str()).await {
        Ok((ws_stream, _)) => ws_stream,
        Err(e) => {
            error!("Failed to connect to {}: {}", url, e);
            apply(ChannelEvent::Failed(e.to_string()));
            return;
        }
    };

    info!("Connected to correlation server at {}", url);
    apply(ChannelEvent::Opened);

    let (mut write, mut read) = ws_stream.split();
    let mut ping = tokio::time::interval(ping_interval.max(Duration::from_secs(1)));
    // First tick completes immediately
    ping.tick().await;

    loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let Some(matrix) = apply(ChannelEvent::Message(text.as_str().to_owned())) else {
                        continue;
                    };
                    if snapshot_tx.send(matrix).await.is_err() {
                        warn!("Snapshot receiver dropped, closing stream");
                        let _ = write.close().await;
                        apply(ChannelEvent::Closed);
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("Server closed connection");
                    apply(ChannelEvent::Closed);
                    break;
                }
                Some(Ok(_)) => {
                    // Ping/pong handled by tungstenite, binary frames are not part of the protocol
                }
                Some(Err(e)) => {
                    error!("WebSocket error: {}", e);
                    apply(ChannelEvent::Failed(e.to_string()));
                    break;
                }
            },
            outbound = outbound_rx.recv() => match outbound {
                Some(Outbound::Symbols(payload)) => {
                    if let Err(e) = write.send(Message::Text(payload.into())).await {
                        error!("Failed to send symbols: {}", e);
                        apply(ChannelEvent::Failed(e.to_string()));
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    debug!("Closing correlation stream");
                    let _ = write.close().await;
                    apply(ChannelEvent::Closed);
                    break;
                }
            },
            _ = ping.tick() => {
                if write.send(Message::Ping(vec![].into())).await.is_err() {
                    debug!("Failed to send ping, connection likely dead");
                    apply(ChannelEvent::Failed("ping failed".to_string()));
                    break;
                }
            }
        }
    }

    info!("Correlation stream closed");
}
