//! Protocol module containing the frame codec, command table, and encoders.

pub mod cid;
pub mod commands;
pub mod frame;
pub mod messages;

pub use cid::{Cid, CommandTable, EventKind};
pub use frame::{build_request, decode_header, FrameError, FrameHeader};
pub use messages::*;
