//! Shared setup for session tests
#![allow(dead_code)] // Not every helper is used by every test binary

use std::path::Path;

use tempfile::TempDir;
use vapi_binapi::{InterfaceIndex, sr_pt::SrPtIfaceDetails};
use vapi_client::{ConnectionConfig, HealthCheckConfig};
use vapi_pt::PtConfig;
use vapi_sim::{SimConfig, SimHandle, SimServer};

/// A simulator serving on a socket inside its own temporary directory
pub struct Harness {
    pub server: SimHandle,
    pub config: PtConfig,
    _dir: TempDir,
}

impl Harness {
    pub async fn start(sim: SimConfig) -> Self {
        let dir = TempDir::new().unwrap();
        let socket = dir.path().join("api.sock");
        let server = SimServer::spawn(&socket, sim).await.unwrap();
        Self {
            server,
            config: pt_config(&socket),
            _dir: dir,
        }
    }

    /// Names of the requests seen by the simulator, without the
    /// `control_ping`s that terminate dumps
    pub fn requests(&self) -> Vec<String> {
        self.server
            .stats()
            .requests
            .into_iter()
            .filter(|name| name != "control_ping")
            .collect()
    }
}

/// Fast-failing settings with the health check off, so the simulator only
/// sees the demo's own requests
pub fn pt_config(socket: &Path) -> PtConfig {
    PtConfig {
        socket: socket.to_path_buf(),
        connection: ConnectionConfig {
            client_name: "session-test".to_string(),
            max_reconnect_attempts: 2,
            reconnect_interval_ms: 20,
            health_check: HealthCheckConfig {
                enabled: false,
                ..HealthCheckConfig::default()
            },
            ..ConnectionConfig::default()
        },
    }
}

/// The record the demo adds on `sw_if_index`
pub fn demo_record(sw_if_index: u32) -> SrPtIfaceDetails {
    SrPtIfaceDetails {
        sw_if_index: InterfaceIndex(sw_if_index),
        id: 400,
        ingress_load: 1,
        egress_load: 1,
        tts_template: 2,
    }
}
