//! Integration tests for connections and channels against the simulated
//! API socket
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::{path::Path, time::Duration};

use tempfile::TempDir;
use tokio::{sync::mpsc, time::timeout};
use vapi_binapi::{
    ApiError, InterfaceIndex, MacAddress, Message, MessageDef,
    interface::{self, CreateLoopback, CreateLoopbackReply, SwInterfaceDetails, SwInterfaceDump},
    sr_pt::{SrPtIfaceDetails, SrPtIfaceDump},
    vpe::{self, ShowVersion, ShowVersionReply},
};
use vapi_client::{
    ClientError, Connection, ConnectionConfig, ConnectionEvent, ConnectionState, HealthCheckConfig,
};
use vapi_sim::{SimConfig, SimServer};

fn quiet_config() -> ConnectionConfig {
    ConnectionConfig {
        client_name: "connection-test".to_string(),
        max_reconnect_attempts: 2,
        reconnect_interval_ms: 50,
        health_check: HealthCheckConfig {
            enabled: false,
            ..HealthCheckConfig::default()
        },
        ..ConnectionConfig::default()
    }
}

async fn next_event(events: &mut mpsc::Receiver<ConnectionEvent>) -> ConnectionEvent {
    timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for a connection event")
        .expect("event stream closed")
}

async fn connect(path: &Path, config: ConnectionConfig) -> (Connection, mpsc::Receiver<ConnectionEvent>) {
    let (conn, mut events) = Connection::async_connect(path, config).unwrap();
    let event = next_event(&mut events).await;
    assert_eq!(event.state, ConnectionState::Connected, "{:?}", event.error);
    (conn, events)
}

#[tokio::test]
async fn request_reply_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("api.sock");
    let server = SimServer::spawn(&path, SimConfig::default()).await.unwrap();
    let (conn, _events) = connect(&path, quiet_config()).await;

    let mut channel = conn.new_channel().unwrap();
    let reply: ShowVersionReply = channel
        .send_request(&ShowVersion {})
        .await
        .unwrap()
        .receive_reply()
        .await
        .unwrap();
    assert_eq!(reply.program, "vpe");
    assert_eq!(reply.version, "24.02-sim");

    let created: CreateLoopbackReply = channel
        .send_request(&CreateLoopback {
            mac_address: MacAddress::default(),
        })
        .await
        .unwrap()
        .receive_reply()
        .await
        .unwrap();
    assert_eq!(created.sw_if_index, InterfaceIndex(1));

    channel.close();
    assert_eq!(conn.channel_count(), 0);
    conn.disconnect().await;

    let stats = server.shutdown().await;
    assert_eq!(stats.clients_registered, 1);
    assert_eq!(stats.clients_deleted, 1);
}

#[tokio::test]
async fn dump_ends_at_the_control_ping_reply() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("api.sock");
    let _server = SimServer::spawn(&path, SimConfig::default()).await.unwrap();
    let (conn, _events) = connect(&path, quiet_config()).await;
    let mut channel = conn.new_channel().unwrap();

    let mut records = Vec::new();
    let mut dump = channel.send_multi_request(&SrPtIfaceDump {}).await.unwrap();
    while let Some(record) = dump.receive_reply::<SrPtIfaceDetails>().await.unwrap() {
        records.push(record);
    }
    assert!(records.is_empty());
    assert!(dump.receive_reply::<SrPtIfaceDetails>().await.unwrap().is_none());

    let mut interfaces = Vec::new();
    let mut dump = channel
        .send_multi_request(&SwInterfaceDump::default())
        .await
        .unwrap();
    while let Some(details) = dump.receive_reply::<SwInterfaceDetails>().await.unwrap() {
        interfaces.push(details.interface_name);
    }
    assert_eq!(interfaces, ["local0"]);

    drop(channel);
    conn.disconnect().await;
}

#[tokio::test]
async fn compatibility_check_lists_every_missing_message() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("api.sock");
    let config = SimConfig::default()
        .hide_message("show_version")
        .hide_message("delete_loopback_reply");
    let _server = SimServer::spawn(&path, config).await.unwrap();
    let (conn, _events) = connect(&path, quiet_config()).await;
    let channel = conn.new_channel().unwrap();

    let mut messages: Vec<MessageDef> = vpe::all_messages();
    messages.extend(interface::all_messages());
    match channel.check_compatibility(&messages) {
        Err(ClientError::Incompatible { missing }) => {
            assert_eq!(
                missing,
                [ShowVersion::name_crc(), interface::DeleteLoopbackReply::name_crc()]
            );
        }
        other => panic!("expected an incompatibility, got {other:?}"),
    }

    assert!(channel.check_compatibility(&[MessageDef::of::<SrPtIfaceDump>()]).is_ok());
    drop(channel);
    conn.disconnect().await;
}

#[tokio::test]
async fn non_zero_retval_is_an_api_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("api.sock");
    let _server = SimServer::spawn(&path, SimConfig::default().fail_request("create_loopback", -7))
        .await
        .unwrap();
    let (conn, _events) = connect(&path, quiet_config()).await;
    let mut channel = conn.new_channel().unwrap();

    let result = channel
        .send_request(&CreateLoopback::default())
        .await
        .unwrap()
        .receive_reply::<CreateLoopbackReply>()
        .await;
    assert!(matches!(result, Err(ClientError::Api(ApiError(-7)))));

    drop(channel);
    conn.disconnect().await;
}

#[tokio::test]
async fn wrong_reply_type_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("api.sock");
    let _server = SimServer::spawn(&path, SimConfig::default()).await.unwrap();
    let (conn, _events) = connect(&path, quiet_config()).await;
    let mut channel = conn.new_channel().unwrap();

    let result = channel
        .send_request(&ShowVersion {})
        .await
        .unwrap()
        .receive_reply::<CreateLoopbackReply>()
        .await;
    assert!(matches!(result, Err(ClientError::UnexpectedReply { .. })));

    drop(channel);
    conn.disconnect().await;
}

#[tokio::test]
async fn stale_reply_is_skipped() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("api.sock");
    let _server = SimServer::spawn(&path, SimConfig::default()).await.unwrap();
    let (conn, _events) = connect(&path, quiet_config()).await;
    let mut channel = conn.new_channel().unwrap();

    // The first reply is never collected and arrives ahead of the second
    drop(channel.send_request(&ShowVersion {}).await.unwrap());
    let reply: CreateLoopbackReply = channel
        .send_request(&CreateLoopback::default())
        .await
        .unwrap()
        .receive_reply()
        .await
        .unwrap();
    assert_eq!(reply.retval, 0);

    drop(channel);
    conn.disconnect().await;
}

#[tokio::test]
async fn missing_reply_times_out() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("api.sock");
    let _server = SimServer::spawn(&path, SimConfig::default().ignore_request("show_version"))
        .await
        .unwrap();
    let (conn, _events) = connect(&path, quiet_config()).await;
    let mut channel = conn.new_channel().unwrap();
    channel.set_reply_timeout(Duration::from_millis(100));

    let result = channel
        .send_request(&ShowVersion {})
        .await
        .unwrap()
        .receive_reply::<ShowVersionReply>()
        .await;
    assert!(matches!(result, Err(ClientError::Timeout(_))));

    drop(channel);
    conn.disconnect().await;
}

#[tokio::test]
async fn hidden_reply_cannot_be_awaited() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("api.sock");
    let _server = SimServer::spawn(&path, SimConfig::default().hide_message("control_ping_reply"))
        .await
        .unwrap();
    let (conn, _events) = connect(&path, quiet_config()).await;
    let mut channel = conn.new_channel().unwrap();

    assert!(matches!(
        channel.send_multi_request(&SrPtIfaceDump {}).await,
        Err(ClientError::UnknownMessage(_))
    ));

    drop(channel);
    conn.disconnect().await;
}

#[tokio::test]
async fn unreachable_endpoint_fails_after_all_attempts() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nobody-home.sock");

    let (conn, mut events) = Connection::async_connect(&path, quiet_config()).unwrap();
    let event = next_event(&mut events).await;
    assert_eq!(event.state, ConnectionState::Failed);
    assert!(matches!(event.error.as_deref(), Some(ClientError::Io(_))));

    assert!(!conn.is_connected());
    assert!(matches!(conn.new_channel(), Err(ClientError::NotConnected)));
    conn.disconnect().await;
    conn.disconnect().await;
}

#[tokio::test]
async fn invalid_config_is_rejected_up_front() {
    let config = ConnectionConfig {
        reply_timeout_ms: 0,
        ..quiet_config()
    };
    assert!(matches!(
        Connection::async_connect("/nonexistent/api.sock", config),
        Err(ClientError::InvalidConfig(_))
    ));
}

#[tokio::test]
async fn health_check_reports_a_lost_service() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("api.sock");
    let server = SimServer::spawn(&path, SimConfig::default()).await.unwrap();

    let config = ConnectionConfig {
        health_check: HealthCheckConfig {
            enabled: true,
            probe_interval_ms: 50,
            reply_timeout_ms: 50,
            threshold: 1,
        },
        ..quiet_config()
    };
    let (conn, mut events) = connect(&path, config).await;

    // Let a few probes succeed first
    tokio::time::sleep(Duration::from_millis(200)).await;
    let stats = server.shutdown().await;
    assert!(stats.count("control_ping") >= 1);

    let event = next_event(&mut events).await;
    assert_eq!(event.state, ConnectionState::Disconnected);
    assert!(event.error.is_some());

    let event = next_event(&mut events).await;
    assert_eq!(event.state, ConnectionState::Failed);
    assert!(!conn.is_connected());

    conn.disconnect().await;
}
