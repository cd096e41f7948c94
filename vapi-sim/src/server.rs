//! Socket server answering binary API requests

use std::{
    collections::{HashMap, VecDeque},
    io,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::{UnixListener, UnixStream},
    task::{JoinHandle, JoinSet},
};
use tracing::{debug, error, info, trace, warn};
use vapi_binapi::{
    Message, MessageType,
    codec::{decode_message, encode_message, peek_context, peek_msg_id},
    frame,
    interface::{
        CreateLoopback, CreateLoopbackReply, DeleteLoopback, DeleteLoopbackReply,
        SwInterfaceDetails, SwInterfaceDump, SwInterfaceSetFlags, SwInterfaceSetFlagsReply,
    },
    memclnt::{
        ControlPing, ControlPingReply, SockclntCreate, SockclntCreateReply, SockclntDelete,
        SockclntDeleteReply,
    },
    sr_pt::{
        SrPtIfaceAdd, SrPtIfaceAddReply, SrPtIfaceDel, SrPtIfaceDelReply, SrPtIfaceDetails,
        SrPtIfaceDump,
    },
    vpe::{ShowVersion, ShowVersionReply, ShowVpeSystemTime, ShowVpeSystemTimeReply},
};

use crate::{Result, SimConfig, SimError, registry::MessageRegistry, state::Dataplane};

/// Number of request names kept in [`SimStats::requests`]
pub const REQUEST_LOG_LEN: usize = 256;

/// Counters observed by the simulator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimStats {
    pub connections_accepted: usize,
    pub connections_closed: usize,
    pub clients_registered: usize,
    pub clients_deleted: usize,
    /// Names of the most recent requests, oldest first
    pub requests: VecDeque<String>,
    request_counts: HashMap<String, usize>,
}

impl SimStats {
    /// Number of `name` requests received since the simulator started
    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.request_counts.get(name).copied().unwrap_or_default()
    }

    fn record_request(&mut self, name: &str) {
        *self.request_counts.entry(name.to_string()).or_default() += 1;
        if self.requests.len() == REQUEST_LOG_LEN {
            self.requests.pop_front();
        }
        self.requests.push_back(name.to_string());
    }
}

struct Shared {
    config: SimConfig,
    registry: MessageRegistry,
    dataplane: Mutex<Dataplane>,
    stats: Mutex<SimStats>,
    next_client_index: AtomicU32,
}

/// Entry point for starting a simulator
pub struct SimServer;

impl SimServer {
    /// Bind `socket_path` and start serving in the background
    ///
    /// A stale socket file left by a crashed process is removed first.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::SocketInUse`] if another process is serving on
    /// the socket, or an I/O error if it cannot be bound
    pub async fn spawn(socket_path: impl AsRef<Path>, config: SimConfig) -> Result<SimHandle> {
        let socket_path = socket_path.as_ref().to_path_buf();
        if socket_path.exists() {
            if UnixStream::connect(&socket_path).await.is_ok() {
                return Err(SimError::SocketInUse(socket_path));
            }
            info!("Removing stale socket file: {}", socket_path.display());
            tokio::fs::remove_file(&socket_path).await?;
        }

        let listener = UnixListener::bind(&socket_path)?;
        info!("Simulator listening on: {}", socket_path.display());

        let shared = Arc::new(Shared {
            registry: MessageRegistry::new(&config),
            dataplane: Mutex::new(Dataplane::with_pt_ifaces(&config.pt_ifaces)),
            stats: Mutex::new(SimStats::default()),
            next_client_index: AtomicU32::new(1),
            config,
        });

        let accept = tokio::spawn(accept_loop(listener, Arc::clone(&shared)));
        Ok(SimHandle {
            socket_path,
            shared,
            accept,
        })
    }
}

/// A running simulator; dropping it stops serving
pub struct SimHandle {
    socket_path: PathBuf,
    shared: Arc<Shared>,
    accept: JoinHandle<()>,
}

impl SimHandle {
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    #[must_use]
    pub fn stats(&self) -> SimStats {
        self.shared.stats.lock().clone()
    }

    /// Current path tracing records
    #[must_use]
    pub fn pt_ifaces(&self) -> Vec<SrPtIfaceDetails> {
        self.shared.dataplane.lock().pt_ifaces()
    }

    /// Current interfaces
    #[must_use]
    pub fn interfaces(&self) -> Vec<SwInterfaceDetails> {
        self.shared
            .dataplane
            .lock()
            .interfaces(vapi_binapi::InterfaceIndex::ANY)
    }

    /// Stop accepting, drop every open connection and remove the socket
    /// file
    pub async fn shutdown(mut self) -> SimStats {
        self.accept.abort();
        if let Err(e) = (&mut self.accept).await
            && !e.is_cancelled()
        {
            error!("Simulator accept loop failed: {e}");
        }
        if let Err(e) = tokio::fs::remove_file(&self.socket_path).await {
            debug!("Socket file not removed: {e}");
        }
        info!("Simulator stopped");
        self.shared.stats.lock().clone()
    }
}

impl Drop for SimHandle {
    fn drop(&mut self) {
        self.accept.abort();
    }
}

async fn accept_loop(listener: UnixListener, shared: Arc<Shared>) {
    // Connection tasks are aborted when this set is dropped
    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            result = listener.accept() => match result {
                Ok((stream, _addr)) => {
                    shared.stats.lock().connections_accepted += 1;
                    let shared = Arc::clone(&shared);
                    connections.spawn(async move {
                        if let Err(e) = handle_connection(stream, &shared).await {
                            warn!("Error handling API connection: {e}");
                        }
                        shared.stats.lock().connections_closed += 1;
                    });
                }
                Err(e) => error!("Error accepting API connection: {e}"),
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }
}

async fn handle_connection(stream: UnixStream, shared: &Shared) -> Result<()> {
    let (mut reader, mut writer) = stream.into_split();
    let mut client_index = None;

    loop {
        let data = match read_frame(&mut reader).await {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                debug!("Client went away");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let msg_id = peek_msg_id(&data)?;
        let Some(def) = shared.registry.get(msg_id) else {
            warn!(msg_id, "Ignoring unknown message");
            continue;
        };
        if def.kind != MessageType::Request {
            warn!(msg_id, "Ignoring {} sent by a client", def.name);
            continue;
        }
        trace!(msg_id, message = def.name, "Received request");
        shared.stats.lock().record_request(def.name);
        if shared.config.is_ignored(def.name) {
            debug!(msg_id, "Not answering {}", def.name);
            continue;
        }

        let context = peek_context(&data, MessageType::Request)?;
        let mut replies = Replies::new(&shared.registry, context);

        match (def.name, client_index) {
            (SockclntCreate::NAME, _) => {
                let index = register(shared, &data, &mut replies)?;
                client_index = Some(index);
            }
            (_, None) => return Err(SimError::NotRegistered(msg_id)),
            (SockclntDelete::NAME, Some(index)) => {
                let request: SockclntDelete = decode_message(&data)?;
                debug!(index, requested = request.index, "Client deregistered");
                shared.stats.lock().clients_deleted += 1;
                replies.push(&SockclntDeleteReply { response: 0 });
                write_replies(&mut writer, replies).await?;
                return Ok(());
            }
            (name, Some(index)) => handle_request(shared, name, index, &data, &mut replies)?,
        }

        write_replies(&mut writer, replies).await?;
    }
}

fn register(shared: &Shared, data: &[u8], replies: &mut Replies<'_>) -> Result<u32> {
    let request: SockclntCreate = decode_message(data)?;
    let index = shared.next_client_index.fetch_add(1, Ordering::Relaxed);
    let reply = SockclntCreateReply::new(0, index, shared.registry.table())?;
    info!(index, name = %request.name, messages = reply.count, "Client registered");

    shared.stats.lock().clients_registered += 1;
    replies.push(&reply);
    Ok(index)
}

fn handle_request(
    shared: &Shared,
    name: &str,
    client_index: u32,
    data: &[u8],
    replies: &mut Replies<'_>,
) -> Result<()> {
    let forced = shared.config.forced_retval(name);
    if let Some(retval) = forced {
        debug!(request = name, retval, "Forcing retval");
    }
    let outcome = |result: std::result::Result<(), i32>| forced.unwrap_or_else(|| result.err().unwrap_or(0));

    match name {
        ControlPing::NAME => replies.push(&ControlPingReply {
            retval: forced.unwrap_or(0),
            client_index,
            vpe_pid: shared.config.vpe_pid,
        }),
        ShowVersion::NAME => replies.push(&ShowVersionReply {
            retval: forced.unwrap_or(0),
            program: "vpe".to_string(),
            version: shared.config.version.clone(),
            build_date: String::new(),
            build_directory: String::new(),
        }),
        ShowVpeSystemTime::NAME => {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0.0, |elapsed| elapsed.as_secs_f64());
            replies.push(&ShowVpeSystemTimeReply {
                retval: forced.unwrap_or(0),
                vpe_system_time: now,
            });
        }
        CreateLoopback::NAME => {
            let request: CreateLoopback = decode_message(data)?;
            let reply = match forced {
                Some(retval) => CreateLoopbackReply {
                    retval,
                    sw_if_index: vapi_binapi::InterfaceIndex::ANY,
                },
                None => CreateLoopbackReply {
                    retval: 0,
                    sw_if_index: shared.dataplane.lock().create_loopback(request.mac_address),
                },
            };
            replies.push(&reply);
        }
        DeleteLoopback::NAME => {
            let request: DeleteLoopback = decode_message(data)?;
            let result = if forced.is_some() {
                Ok(())
            } else {
                shared.dataplane.lock().delete_loopback(request.sw_if_index)
            };
            replies.push(&DeleteLoopbackReply {
                retval: outcome(result),
            });
        }
        SwInterfaceSetFlags::NAME => {
            let request: SwInterfaceSetFlags = decode_message(data)?;
            let result = if forced.is_some() {
                Ok(())
            } else {
                shared
                    .dataplane
                    .lock()
                    .set_flags(request.sw_if_index, request.flags)
            };
            replies.push(&SwInterfaceSetFlagsReply {
                retval: outcome(result),
            });
        }
        SwInterfaceDump::NAME => {
            let request: SwInterfaceDump = decode_message(data)?;
            for details in shared.dataplane.lock().interfaces(request.sw_if_index) {
                replies.push(&details);
            }
        }
        SrPtIfaceAdd::NAME => {
            let request: SrPtIfaceAdd = decode_message(data)?;
            let result = if forced.is_some() {
                Ok(())
            } else {
                shared.dataplane.lock().add_pt_iface(&request)
            };
            replies.push(&SrPtIfaceAddReply {
                retval: outcome(result),
            });
        }
        SrPtIfaceDel::NAME => {
            let request: SrPtIfaceDel = decode_message(data)?;
            let result = if forced.is_some() {
                Ok(())
            } else {
                shared.dataplane.lock().del_pt_iface(request.sw_if_index)
            };
            replies.push(&SrPtIfaceDelReply {
                retval: outcome(result),
            });
        }
        SrPtIfaceDump::NAME => {
            for details in shared.dataplane.lock().pt_ifaces() {
                replies.push(&details);
            }
        }
        other => warn!("No handler for {other}"),
    }
    Ok(())
}

/// Replies to one request, encoded with the request's context
struct Replies<'a> {
    registry: &'a MessageRegistry,
    context: u32,
    frames: Vec<Bytes>,
}

impl<'a> Replies<'a> {
    const fn new(registry: &'a MessageRegistry, context: u32) -> Self {
        Self {
            registry,
            context,
            frames: Vec::new(),
        }
    }

    fn push<M: Message>(&mut self, reply: &M) {
        match self.registry.id_of::<M>() {
            Some(msg_id) => self
                .frames
                .push(encode_message(reply, msg_id, 0, self.context)),
            None => warn!("Not sending hidden message {}", M::NAME),
        }
    }
}

async fn write_replies<W: AsyncWrite + Unpin>(writer: &mut W, replies: Replies<'_>) -> io::Result<()> {
    for data in replies.frames {
        let len = u32::try_from(data.len()).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writer.write_all(&frame::encode_header(len)).await?;
        writer.write_all(&data).await?;
    }
    writer.flush().await
}

async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Bytes> {
    let mut header = [0u8; frame::HEADER_LEN];
    reader.read_exact(&mut header).await?;
    let len = frame::decode_header(&header)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let len = usize::try_from(len).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Bytes::from(body))
}

#[cfg(test)]
mod tests {
    use vapi_binapi::memclnt::SOCKCLNT_CREATE_MSG_ID;

    use super::*;

    #[test]
    fn handshake_id_is_registered() {
        let registry = MessageRegistry::new(&SimConfig::default());
        assert_eq!(
            registry.get(SOCKCLNT_CREATE_MSG_ID).map(|def| def.name),
            Some(SockclntCreate::NAME)
        );
    }

    #[test]
    fn replies_carry_the_request_context() {
        let registry = MessageRegistry::new(&SimConfig::default());
        let mut replies = Replies::new(&registry, 0x0001_1005);
        replies.push(&SrPtIfaceAddReply { retval: -81 });

        assert_eq!(replies.frames.len(), 1);
        let data = &replies.frames[0];
        assert_eq!(peek_context(data, MessageType::Reply).unwrap(), 0x0001_1005);
        assert_eq!(decode_message::<SrPtIfaceAddReply>(data).unwrap().retval, -81);
    }

    #[test]
    fn hidden_replies_are_not_sent() {
        let registry = MessageRegistry::new(&SimConfig::default().hide_message("show_version_reply"));
        let mut replies = Replies::new(&registry, 1);
        replies.push(&ShowVersionReply::default());
        assert!(replies.frames.is_empty());
    }

    #[test]
    fn stats_count_requests_by_name() {
        let mut stats = SimStats::default();
        for name in ["control_ping", "sr_pt_iface_dump", "control_ping"] {
            stats.record_request(name);
        }
        assert_eq!(stats.count("control_ping"), 2);
        assert_eq!(stats.count("create_loopback"), 0);
        assert_eq!(stats.requests, ["control_ping", "sr_pt_iface_dump", "control_ping"]);
    }

    #[test]
    fn request_log_keeps_only_the_latest_names() {
        let mut stats = SimStats::default();
        for _ in 0..REQUEST_LOG_LEN {
            stats.record_request("control_ping");
        }
        stats.record_request("show_version");

        assert_eq!(stats.requests.len(), REQUEST_LOG_LEN);
        assert_eq!(stats.requests.back().map(String::as_str), Some("show_version"));
        assert_eq!(stats.count("control_ping"), REQUEST_LOG_LEN);
        assert_eq!(stats.count("show_version"), 1);
    }
}
