//! Message model for the VPP binary API
//!
//! This crate contains everything needed to put a binary API message on the
//! wire and take it off again, without doing any I/O itself:
//! - [`frame`]: the 16 byte header that precedes every message on the socket
//! - [`codec`]: big-endian field encoding and the per-kind message headers
//! - [`message`]: the [`Message`] trait and [`MessageDef`] descriptors used
//!   for compatibility checks
//! - the message groups [`memclnt`], [`vpe`], [`interface`] and [`sr_pt`]

pub mod codec;
pub mod error;
pub mod frame;
pub mod interface;
pub mod memclnt;
pub mod message;
pub mod sr_pt;
pub mod types;
pub mod vpe;

pub use error::{ApiError, CodecError, Result, check_retval};
pub use message::{Message, MessageDef, MessageType};
pub use types::{IfStatusFlags, InterfaceIndex, MacAddress};
