//! Path tracing interface demo for the VPP binary API
//!
//! Connects to the forwarding plane, checks that the `vpe` and `interface`
//! messages are supported, then walks a path tracing record through its
//! lifecycle on a fresh loopback: dump, create loopback, add, dump, delete,
//! dump. Every step is reported on stdout; see [`session::run_demo`].

pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod session;

pub use config::PtConfig;
pub use error::{Result, SessionError};
pub use output::Report;
pub use session::{DemoSummary, Session, run_demo};
