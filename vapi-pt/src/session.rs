//! The demo workflow
//!
//! [`run_demo`] is the whole program: connect, check compatibility, run the
//! path tracing steps and always release the channel and the connection
//! before returning. The first failing step ends the run; nothing is rolled
//! back, so a loopback created before a later failure stays in place.

use std::{io::Write, sync::Arc};

use serde::Serialize;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};
use vapi_binapi::{
    InterfaceIndex, MessageDef,
    interface::{self, CreateLoopback, CreateLoopbackReply},
    sr_pt::{SrPtIfaceAdd, SrPtIfaceAddReply, SrPtIfaceDel, SrPtIfaceDelReply, SrPtIfaceDetails, SrPtIfaceDump},
    vpe,
};
use vapi_client::{Channel, Connection, ConnectionEvent, ConnectionState};

use crate::{PtConfig, Report, Result, SessionError};

/// Path tracing id assigned to the demo interface
pub const PT_IFACE_ID: u16 = 400;
/// Timestamp template of the demo interface
pub const PT_TTS_TEMPLATE: u8 = 2;
pub const PT_INGRESS_LOAD: u8 = 1;
pub const PT_EGRESS_LOAD: u8 = 1;

/// What a completed run observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DemoSummary {
    /// Index of the loopback created by the run
    pub loopback: InterfaceIndex,
    /// Records dumped before anything was changed
    pub before: Vec<SrPtIfaceDetails>,
    pub after_add: Vec<SrPtIfaceDetails>,
    pub after_delete: Vec<SrPtIfaceDetails>,
}

/// An open connection with one channel
pub struct Session {
    conn: Connection,
    channel: Channel,
    watcher: JoinHandle<()>,
}

/// Run the whole demo against the socket named in `config`
///
/// # Errors
///
/// Returns the first error met; the connection has been released by then
pub async fn run_demo<W: Write>(config: &PtConfig, report: &mut Report<W>) -> Result<DemoSummary> {
    let mut session = Session::connect(config).await?;

    let result = match session.check_compatibility() {
        Ok(()) => session.run(report).await,
        Err(e) => Err(e),
    };

    session.close().await;
    result
}

impl Session {
    /// Connect and open a channel
    ///
    /// Waits for the first connection event; anything but
    /// [`ConnectionState::Connected`] is an error.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Connect`] or [`SessionError::Channel`]
    pub async fn connect(config: &PtConfig) -> Result<Self> {
        info!("Connecting to {}", config.socket.display());
        let (conn, mut events) =
            Connection::async_connect(&config.socket, config.connection.clone()).map_err(|e| {
                SessionError::Connect {
                    state: ConnectionState::Failed,
                    source: Some(Arc::new(e)),
                }
            })?;

        let first = events.recv().await;
        match first {
            Some(event) if event.state == ConnectionState::Connected => {}
            Some(event) => {
                conn.disconnect().await;
                return Err(SessionError::Connect {
                    state: event.state,
                    source: event.error,
                });
            }
            None => {
                conn.disconnect().await;
                return Err(SessionError::Connect {
                    state: ConnectionState::Failed,
                    source: None,
                });
            }
        }

        let channel = match conn.new_channel() {
            Ok(channel) => channel,
            Err(e) => {
                conn.disconnect().await;
                return Err(SessionError::Channel(e));
            }
        };

        Ok(Self {
            conn,
            channel,
            watcher: tokio::spawn(watch_events(events)),
        })
    }

    /// The underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Verify the `vpe` and `interface` message groups
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Compatibility`] listing every missing message
    pub fn check_compatibility(&self) -> Result<()> {
        let groups: [(&str, Vec<MessageDef>); 2] = [
            ("vpe", vpe::all_messages()),
            ("interface", interface::all_messages()),
        ];
        for (group, messages) in groups {
            self.channel
                .check_compatibility(&messages)
                .map_err(SessionError::Compatibility)?;
            debug!("{group} messages are compatible");
        }
        Ok(())
    }

    /// Dump, create a loopback, add a record on it, dump, delete the record
    /// and dump again
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error
    pub async fn run<W: Write>(&mut self, report: &mut Report<W>) -> Result<DemoSummary> {
        let before = self.dump_pt_ifaces(report).await?;
        let loopback = self.create_loopback(report).await?;
        self.add_pt_iface(report, loopback).await?;
        let after_add = self.dump_pt_ifaces(report).await?;
        self.del_pt_iface(report, loopback).await?;
        let after_delete = self.dump_pt_ifaces(report).await?;

        Ok(DemoSummary {
            loopback,
            before,
            after_add,
            after_delete,
        })
    }

    /// Release the channel, then the connection
    pub async fn close(self) {
        let Self {
            conn,
            channel,
            watcher,
        } = self;

        channel.close();
        conn.disconnect().await;
        if let Err(e) = watcher.await {
            debug!("Connection event watcher ended abnormally: {e}");
        }
    }

    /// Dump all path tracing records
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Dump`] if any reply fails
    pub async fn dump_pt_ifaces<W: Write>(&mut self, report: &mut Report<W>) -> Result<Vec<SrPtIfaceDetails>> {
        const OPERATION: &str = "dumping pt interfaces";
        report.line("Dumping pt interfaces..")?;

        let mut records = Vec::new();
        let mut dump = self
            .channel
            .send_multi_request(&SrPtIfaceDump {})
            .await
            .map_err(SessionError::dump(OPERATION))?;
        while let Some(record) = dump
            .receive_reply::<SrPtIfaceDetails>()
            .await
            .map_err(SessionError::dump(OPERATION))?
        {
            report.record("pt interface", records.len() + 1, &record)?;
            records.push(record);
        }

        report.ok()?;
        Ok(records)
    }

    /// Create a loopback and return its index
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Request`] if the loopback is not created
    pub async fn create_loopback<W: Write>(&mut self, report: &mut Report<W>) -> Result<InterfaceIndex> {
        report.line("Creating loopback..")?;

        let reply: CreateLoopbackReply = self
            .channel
            .send_request(&CreateLoopback::default())
            .await
            .map_err(SessionError::request("creating loopback"))?
            .receive_reply()
            .await
            .map_err(SessionError::request("creating loopback"))?;

        report.line(&format!("Loopback created, index: {}", reply.sw_if_index))?;
        report.ok()?;
        Ok(reply.sw_if_index)
    }

    /// Add the demo path tracing record on `sw_if_index`
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Request`] if the record is refused
    pub async fn add_pt_iface<W: Write>(&mut self, report: &mut Report<W>, sw_if_index: InterfaceIndex) -> Result<()> {
        report.line("Adding pt interface..")?;
        let request = SrPtIfaceAdd {
            sw_if_index,
            id: PT_IFACE_ID,
            ingress_load: PT_INGRESS_LOAD,
            egress_load: PT_EGRESS_LOAD,
            tts_template: PT_TTS_TEMPLATE,
        };
        report.message(&request)?;

        self.channel
            .send_request(&request)
            .await
            .map_err(SessionError::request("adding pt interface"))?
            .receive_reply::<SrPtIfaceAddReply>()
            .await
            .map_err(SessionError::request("adding pt interface"))?;

        report.ok()
    }

    /// Remove the path tracing record on `sw_if_index`
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Request`] if there is no record to remove
    pub async fn del_pt_iface<W: Write>(&mut self, report: &mut Report<W>, sw_if_index: InterfaceIndex) -> Result<()> {
        report.line("Deleting pt interface..")?;
        let request = SrPtIfaceDel { sw_if_index };
        report.message(&request)?;

        self.channel
            .send_request(&request)
            .await
            .map_err(SessionError::request("deleting pt interface"))?
            .receive_reply::<SrPtIfaceDelReply>()
            .await
            .map_err(SessionError::request("deleting pt interface"))?;

        report.ok()
    }
}

async fn watch_events(mut events: mpsc::Receiver<ConnectionEvent>) {
    while let Some(event) = events.recv().await {
        match (event.state, event.error) {
            (ConnectionState::Connected, _) => info!("Connection re-established"),
            (state, Some(error)) => warn!(%state, "Connection state changed: {error}"),
            (state, None) => warn!(%state, "Connection state changed"),
        }
    }
}
