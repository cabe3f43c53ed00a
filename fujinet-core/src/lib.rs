//! # fujinet-core
//!
//! Core FujiBus protocol implementation for the FujiNet companion device.
//!
//! This crate provides the sans-I/O protocol primitives:
//! - Additive checksum
//! - SLIP framing and stream reassembly
//! - Packet structure and descriptor encoding/decoding
//! - Typed requests and responses for the network and clock services
//! - Client-side session table

pub mod checksum;
pub mod command;
pub mod constants;
pub mod error;
pub mod packet;
pub mod request;
pub mod response;
pub mod session;
pub mod slip;
pub mod status;

pub use command::{Command, DeviceId};
pub use error::{Error, ErrorKind, Result};
pub use packet::{Field, Packet};
pub use request::Request;
pub use response::{InfoResponse, OpenResponse, ReadResponse, Response, WriteResponse};
pub use session::{Reservation, Session, SessionKind, SessionTable};
pub use slip::FrameAccumulator;
pub use status::Status;
