//! Connection lifecycle: connect with retries, reply routing and health
//! checking

use std::{
    collections::HashMap,
    fmt,
    path::Path,
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, AtomicU16, Ordering},
    },
};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{MissedTickBehavior, interval, sleep},
};
use tracing::{debug, error, info, warn};
use vapi_binapi::{
    MessageType,
    codec::peek_context,
    memclnt::{ControlPing, ControlPingReply},
};

use crate::{
    Adapter, Channel, ClientError, ConnectionConfig, Result, SocketClient,
    adapter::MsgCallback,
    channel::{ReplyFrame, unpack_context},
};

const EVENT_BUFFER: usize = 100;

/// State of a connection as reported through [`ConnectionEvent`]s
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connected and registered, or recovered after missed probes
    Connected,
    /// A health probe failed but the threshold has not been reached
    NotResponding,
    /// The connection was lost and will be re-established
    Disconnected,
    /// Every connection attempt failed; no further attempts are made
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            Self::Connected => "Connected",
            Self::NotResponding => "NotResponding",
            Self::Disconnected => "Disconnected",
            Self::Failed => "Failed",
        };
        f.write_str(state)
    }
}

/// A change of connection state
#[derive(Debug, Clone)]
pub struct ConnectionEvent {
    pub timestamp: DateTime<Utc>,
    pub state: ConnectionState,
    /// Cause of the change, if it was caused by an error
    pub error: Option<Arc<ClientError>>,
}

impl ConnectionEvent {
    fn new(state: ConnectionState, error: Option<ClientError>) -> Self {
        Self {
            timestamp: Utc::now(),
            state,
            error: error.map(Arc::new),
        }
    }
}

/// A connection to the forwarding plane
///
/// Created by [`Connection::async_connect`]. Channels opened from the
/// connection share its transport; replies are routed to them by the
/// channel id packed into each message context.
pub struct Connection {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) adapter: Arc<dyn Adapter>,
    pub(crate) config: ConnectionConfig,
    channels: RwLock<HashMap<u16, mpsc::UnboundedSender<ReplyFrame>>>,
    next_channel_id: AtomicU16,
    stop: watch::Sender<bool>,
    monitor: Mutex<Option<JoinHandle<()>>>,
    released: AtomicBool,
}

impl Inner {
    pub(crate) fn register_channel(&self, replies: mpsc::UnboundedSender<ReplyFrame>) -> Result<u16> {
        if !self.adapter.is_connected() {
            return Err(ClientError::NotConnected);
        }

        let mut channels = self.channels.write();
        for _ in 0..=u16::MAX {
            let id = self.next_channel_id.fetch_add(1, Ordering::Relaxed);
            if id == 0 || channels.contains_key(&id) {
                continue;
            }
            channels.insert(id, replies);
            return Ok(id);
        }
        Err(ClientError::ChannelsExhausted)
    }

    pub(crate) fn unregister_channel(&self, id: u16) {
        self.channels.write().remove(&id);
    }

    fn dispatch(&self, msg_id: u16, data: Bytes) {
        let context = match peek_context(&data, MessageType::Reply) {
            Ok(context) => context,
            Err(e) => {
                warn!(msg_id, "Dropping message without context: {e}");
                return;
            }
        };
        let (channel_id, _, _) = unpack_context(context);

        let Some(replies) = self.channels.read().get(&channel_id).cloned() else {
            debug!(msg_id, channel = channel_id, "Dropping reply for unknown channel");
            return;
        };
        if replies
            .send(ReplyFrame {
                msg_id,
                context,
                data,
            })
            .is_err()
        {
            debug!(msg_id, channel = channel_id, "Dropping reply for closed channel");
        }
    }
}

impl Connection {
    /// Connect to the API socket at `socket_path`
    ///
    /// Returns immediately; connection attempts run in the background and
    /// their outcome is reported on the returned event stream. The first
    /// event is either [`ConnectionState::Connected`] or
    /// [`ConnectionState::Failed`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] if `config` is unusable
    pub fn async_connect(
        socket_path: impl AsRef<Path>,
        config: ConnectionConfig,
    ) -> Result<(Self, mpsc::Receiver<ConnectionEvent>)> {
        config.validate()?;
        let adapter = SocketClient::new(socket_path.as_ref())
            .with_client_name(config.client_name.clone())
            .with_connect_timeout(config.connect_timeout());
        Self::async_connect_with(Arc::new(adapter), config)
    }

    /// Like [`Connection::async_connect`], over any [`Adapter`]
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] if `config` is unusable
    pub fn async_connect_with(
        adapter: Arc<dyn Adapter>,
        config: ConnectionConfig,
    ) -> Result<(Self, mpsc::Receiver<ConnectionEvent>)> {
        config.validate()?;

        let (stop, stop_rx) = watch::channel(false);
        let (events_tx, events) = mpsc::channel(EVENT_BUFFER);
        let inner = Arc::new(Inner {
            adapter,
            config,
            channels: RwLock::new(HashMap::new()),
            next_channel_id: AtomicU16::new(1),
            stop,
            monitor: Mutex::new(None),
            released: AtomicBool::new(false),
        });

        let weak: Weak<Inner> = Arc::downgrade(&inner);
        let on_message: MsgCallback = Arc::new(move |msg_id, data| {
            if let Some(inner) = weak.upgrade() {
                inner.dispatch(msg_id, data);
            }
        });

        let handle = tokio::spawn(monitor(Arc::clone(&inner), on_message, events_tx, stop_rx));
        *inner.monitor.lock() = Some(handle);

        Ok((Self { inner }, events))
    }

    /// Open a new channel on this connection
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] while the connection is down
    pub fn new_channel(&self) -> Result<Channel> {
        Channel::open(&self.inner)
    }

    /// Number of open channels
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.inner.channels.read().len()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.adapter.is_connected()
    }

    /// Stop reconnecting and health checking, then deregister and close the
    /// transport
    ///
    /// Calling this more than once has no further effect.
    pub async fn disconnect(&self) {
        if self.inner.released.swap(true, Ordering::SeqCst) {
            return;
        }

        self.inner.stop.send_replace(true);
        let monitor = self.inner.monitor.lock().take();
        if let Some(monitor) = monitor
            && let Err(e) = monitor.await
        {
            warn!("Connection monitor ended abnormally: {e}");
        }

        if let Err(e) = self.inner.adapter.disconnect().await {
            warn!("Error while disconnecting: {e}");
        }
        info!("Disconnected");
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.inner.stop.send_replace(true);
    }
}

async fn wait_stopped(stop: &mut watch::Receiver<bool>) {
    // A dropped sender also means stop
    let _ = stop.wait_for(|stopped| *stopped).await;
}

fn emit(events: &mpsc::Sender<ConnectionEvent>, state: ConnectionState, error: Option<ClientError>) {
    if let Err(e) = events.try_send(ConnectionEvent::new(state, error)) {
        debug!(%state, "Connection event not delivered: {e}");
    }
}

async fn monitor(
    inner: Arc<Inner>,
    on_message: MsgCallback,
    events: mpsc::Sender<ConnectionEvent>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        match connect_with_retries(&inner, &on_message, &mut stop).await {
            None => return,
            Some(Ok(())) => {
                info!("Connected");
                emit(&events, ConnectionState::Connected, None);
            }
            Some(Err(e)) => {
                error!("Unable to connect: {e}");
                emit(&events, ConnectionState::Failed, Some(e));
                return;
            }
        }

        if !inner.config.health_check.enabled {
            wait_stopped(&mut stop).await;
            return;
        }

        match health_check(&inner, &events, &mut stop).await {
            None => return,
            Some(e) => {
                warn!("Connection lost: {e}");
                if let Err(e) = inner.adapter.disconnect().await {
                    debug!("Error while releasing lost connection: {e}");
                }
                emit(&events, ConnectionState::Disconnected, Some(e));
            }
        }
    }
}

/// Returns `None` if stopped before an attempt succeeded
async fn connect_with_retries(
    inner: &Inner,
    on_message: &MsgCallback,
    stop: &mut watch::Receiver<bool>,
) -> Option<Result<()>> {
    let attempts = inner.config.max_reconnect_attempts;
    let mut last_error = ClientError::NotConnected;

    for attempt in 1..=attempts {
        let result = tokio::select! {
            () = wait_stopped(stop) => return None,
            result = inner.adapter.connect(Arc::clone(on_message)) => result,
        };

        match result {
            Ok(()) => return Some(Ok(())),
            Err(e) => {
                debug!(attempt, attempts, "Connection attempt failed: {e}");
                last_error = e;
            }
        }

        if attempt < attempts {
            tokio::select! {
                () = wait_stopped(stop) => return None,
                () = sleep(inner.config.reconnect_interval()) => {}
            }
        }
    }

    Some(Err(last_error))
}

/// Probe the connection until it is stopped (`None`) or declared lost
async fn health_check(
    inner: &Arc<Inner>,
    events: &mpsc::Sender<ConnectionEvent>,
    stop: &mut watch::Receiver<bool>,
) -> Option<ClientError> {
    let config = &inner.config.health_check;
    let mut channel = match Channel::open(inner) {
        Ok(channel) => channel,
        Err(e) => return Some(e),
    };
    channel.set_reply_timeout(config.reply_timeout());

    let mut ticker = interval(config.probe_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    let mut failures = 0;
    loop {
        tokio::select! {
            () = wait_stopped(stop) => return None,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            () = wait_stopped(stop) => return None,
            result = probe(&mut channel) => result,
        };

        match result {
            Ok(()) => {
                if failures > 0 {
                    info!("Connection responding again");
                    emit(events, ConnectionState::Connected, None);
                }
                failures = 0;
            }
            Err(e) => {
                failures += 1;
                if failures >= config.threshold {
                    return Some(e);
                }
                warn!(failures, threshold = config.threshold, "Health probe failed: {e}");
                emit(events, ConnectionState::NotResponding, Some(e));
            }
        }
    }
}

async fn probe(channel: &mut Channel) -> Result<()> {
    channel
        .send_request(&ControlPing {})
        .await?
        .receive_reply::<ControlPingReply>()
        .await
        .map(|_| ())
}
