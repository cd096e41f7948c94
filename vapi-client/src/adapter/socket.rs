//! Unix socket transport

use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU32, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::{
        UnixStream,
        unix::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::{Mutex, Notify},
    task::JoinHandle,
    time::timeout,
};
use tracing::{debug, trace, warn};
use vapi_binapi::{
    ApiError, Message,
    codec::{decode_message, encode_message, peek_msg_id},
    frame,
    memclnt::{
        SOCKCLNT_CREATE_MSG_ID, SOCKCLNT_CREATE_REPLY_MSG_ID, SockclntCreate, SockclntCreateReply,
        SockclntDelete, SockclntDeleteReply,
    },
};

use super::{Adapter, MsgCallback};
use crate::{ClientError, Result};

const DEFAULT_CLIENT_NAME: &str = "vapi-client";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
const DISCONNECT_TIMEOUT: Duration = Duration::from_millis(100);

/// Client for the binary API socket of the forwarding plane
pub struct SocketClient {
    socket_path: PathBuf,
    client_name: String,
    connect_timeout: Duration,
    msg_table: RwLock<HashMap<String, u16>>,
    client_index: AtomicU32,
    connected: Arc<AtomicBool>,
    session: Mutex<Option<Session>>,
    delete_ack: Arc<Notify>,
}

struct Session {
    writer: OwnedWriteHalf,
    reader: JoinHandle<()>,
}

impl Drop for Session {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl SocketClient {
    #[must_use]
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            msg_table: RwLock::new(HashMap::new()),
            client_index: AtomicU32::new(0),
            connected: Arc::new(AtomicBool::new(false)),
            session: Mutex::new(None),
            delete_ack: Arc::new(Notify::new()),
        }
    }

    /// Set the name registered with the forwarding plane
    #[must_use]
    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    /// Set the timeout for opening the socket and registering
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Number of messages in the table received at registration
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.msg_table.read().len()
    }

    async fn register(&self, reader: &mut OwnedReadHalf, writer: &mut OwnedWriteHalf) -> Result<SockclntCreateReply> {
        let request = SockclntCreate {
            name: self.client_name.clone(),
        };
        write_frame(writer, &encode_message(&request, SOCKCLNT_CREATE_MSG_ID, 0, 0)).await?;

        let data = timeout(self.connect_timeout, read_frame(reader))
            .await
            .map_err(|_| ClientError::Timeout(self.connect_timeout))??;

        let msg_id = peek_msg_id(&data)?;
        if msg_id != SOCKCLNT_CREATE_REPLY_MSG_ID {
            return Err(ClientError::Handshake(format!(
                "expected {}, received message id {msg_id}",
                SockclntCreateReply::NAME
            )));
        }

        let reply: SockclntCreateReply = decode_message(&data)?;
        if reply.response != 0 {
            return Err(ClientError::Handshake(format!(
                "registration refused: {}",
                ApiError(reply.response)
            )));
        }
        Ok(reply)
    }

    async fn deregister(&self, writer: &mut OwnedWriteHalf) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            // Peer already went away, nobody left to deregister from
            return Ok(());
        }

        let index = self.client_index.load(Ordering::SeqCst);
        let msg_id = self.message_id(&SockclntDelete::name_crc())?;
        let request = SockclntDelete { index };
        write_frame(writer, &encode_message(&request, msg_id, index, 0)).await?;

        if timeout(DISCONNECT_TIMEOUT, self.delete_ack.notified())
            .await
            .is_err()
        {
            debug!("No {} before timeout", SockclntDeleteReply::NAME);
        }
        Ok(())
    }
}

#[async_trait]
impl Adapter for SocketClient {
    async fn connect(&self, on_message: MsgCallback) -> Result<()> {
        let mut session = self.session.lock().await;
        if session.is_some() && self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }
        // A session whose reader has stopped is dead; release it first
        drop(session.take());

        debug!("Connecting to API socket: {}", self.socket_path.display());
        let stream = timeout(self.connect_timeout, UnixStream::connect(&self.socket_path))
            .await
            .map_err(|_| ClientError::Timeout(self.connect_timeout))??;
        let (mut reader, mut writer) = stream.into_split();

        let reply = self.register(&mut reader, &mut writer).await?;
        let table: HashMap<String, u16> = reply
            .message_table
            .into_iter()
            .map(|entry| (entry.name, entry.index))
            .collect();
        let delete_reply_id = table.get(&SockclntDeleteReply::name_crc()).copied();

        debug!(
            client_index = reply.index,
            messages = table.len(),
            "Registered as {}",
            self.client_name
        );

        *self.msg_table.write() = table;
        self.client_index.store(reply.index, Ordering::SeqCst);
        self.connected.store(true, Ordering::SeqCst);

        let reader = tokio::spawn(read_loop(
            reader,
            on_message,
            delete_reply_id,
            Arc::clone(&self.delete_ack),
            Arc::clone(&self.connected),
        ));
        *session = Some(Session { writer, reader });

        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let Some(mut session) = self.session.lock().await.take() else {
            return Ok(());
        };

        let result = self.deregister(&mut session.writer).await;
        if let Err(e) = session.writer.shutdown().await {
            trace!("Error shutting down API socket: {e}");
        }
        self.connected.store(false, Ordering::SeqCst);
        self.msg_table.write().clear();
        debug!("Disconnected from API socket: {}", self.socket_path.display());

        result
    }

    fn message_id(&self, name_crc: &str) -> Result<u16> {
        self.msg_table
            .read()
            .get(name_crc)
            .copied()
            .ok_or_else(|| ClientError::UnknownMessage(name_crc.to_string()))
    }

    fn client_index(&self) -> u32 {
        self.client_index.load(Ordering::SeqCst)
    }

    async fn send_msg(&self, data: Bytes) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ClientError::NotConnected);
        }
        let mut session = self.session.lock().await;
        let session = session.as_mut().ok_or(ClientError::NotConnected)?;

        trace!(len = data.len(), "Sending message");
        write_frame(&mut session.writer, &data).await?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

async fn read_loop(
    mut reader: OwnedReadHalf,
    on_message: MsgCallback,
    delete_reply_id: Option<u16>,
    delete_ack: Arc<Notify>,
    connected: Arc<AtomicBool>,
) {
    loop {
        let data = match read_frame(&mut reader).await {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                debug!("API socket closed by peer");
                break;
            }
            Err(e) => {
                warn!("Error reading from API socket: {e}");
                break;
            }
        };

        let msg_id = match peek_msg_id(&data) {
            Ok(id) => id,
            Err(e) => {
                warn!("Dropping malformed message: {e}");
                continue;
            }
        };
        trace!(msg_id, len = data.len(), "Received message");

        if Some(msg_id) == delete_reply_id {
            delete_ack.notify_one();
            continue;
        }
        on_message(msg_id, data);
    }

    connected.store(false, Ordering::SeqCst);
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

async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, data: &[u8]) -> io::Result<()> {
    let len = u32::try_from(data.len()).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writer.write_all(&frame::encode_header(len)).await?;
    writer.write_all(data).await?;
    writer.flush().await
}
