//! Per-instance behaviour of the simulator

use std::collections::{HashMap, HashSet};

use vapi_binapi::sr_pt::SrPtIfaceDetails;

/// Builder-style configuration for a [`crate::SimServer`]
///
/// ```rust
/// use vapi_sim::SimConfig;
///
/// let config = SimConfig::default()
///     .hide_message("show_version")
///     .fail_request("create_loopback", -7);
/// assert!(config.is_hidden("show_version"));
/// assert_eq!(config.forced_retval("create_loopback"), Some(-7));
/// ```
#[derive(Debug, Clone)]
pub struct SimConfig {
    hidden: HashSet<String>,
    ignored: HashSet<String>,
    failures: HashMap<String, i32>,
    pub(crate) pt_ifaces: Vec<SrPtIfaceDetails>,
    /// Reported in `control_ping_reply`
    pub vpe_pid: u32,
    /// Reported in `show_version_reply`
    pub version: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            hidden: HashSet::new(),
            ignored: HashSet::new(),
            failures: HashMap::new(),
            pt_ifaces: Vec::new(),
            vpe_pid: std::process::id(),
            version: "24.02-sim".to_string(),
        }
    }
}

impl SimConfig {
    /// Leave the message `name` out of the message table
    #[must_use]
    pub fn hide_message(mut self, name: impl Into<String>) -> Self {
        self.hidden.insert(name.into());
        self
    }

    /// Never answer `name` requests
    #[must_use]
    pub fn ignore_request(mut self, name: impl Into<String>) -> Self {
        self.ignored.insert(name.into());
        self
    }

    /// Answer every `name` request with `retval` instead of handling it
    #[must_use]
    pub fn fail_request(mut self, name: impl Into<String>, retval: i32) -> Self {
        self.failures.insert(name.into(), retval);
        self
    }

    /// Start with a path tracing record, on a loopback created for it
    #[must_use]
    pub fn with_pt_iface(mut self, record: SrPtIfaceDetails) -> Self {
        self.pt_ifaces.push(record);
        self
    }

    #[must_use]
    pub fn is_hidden(&self, name: &str) -> bool {
        self.hidden.contains(name)
    }

    #[must_use]
    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignored.contains(name)
    }

    #[must_use]
    pub fn forced_retval(&self, name: &str) -> Option<i32> {
        self.failures.get(name).copied()
    }
}
