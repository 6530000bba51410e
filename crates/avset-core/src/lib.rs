//! # avset-core
//!
//! Shared library for the AV settings controller containing the wire frame
//! codec, the command identifier table, the sub-packet encoders, and the
//! video mode catalog with its auto-selection rules.
//!
//! It has zero dependencies on transports, async runtimes, or the host
//! firmware.  Everything in here is a pure function over bytes or tables.
//!
//! # Architecture overview (for beginners)
//!
//! A game console drives its HDMI, analog multi-out, and optical outputs
//! through a small AV controller.  The host talks to that controller over a
//! dedicated serial-style channel: it sends a *request* frame and waits for
//! the matching *reply* frame.  The controller may also push *event* frames
//! (cable plugged, HDCP authenticated) at any moment, so the host must tell
//! replies and events apart.
//!
//! This crate (`avset-core`) is the foundation.  It defines:
//!
//! - **`protocol`** – How bytes travel over the channel.  Every frame starts
//!   with an 8-byte header (version, body size, command id).  The command
//!   table says which ids exist and which of them are events.
//!
//! - **`domain`** – Pure rules with no I/O: the fixed video mode catalog,
//!   the mode id with its flag bits, the hardware port layout, monitor
//!   capability reports, and the decision rules that pick a default mode.

pub mod domain;
pub mod protocol;

pub use domain::hw_config::{AvPort, HwConfig, HwConfigError, PortLayout};
pub use domain::mode::{ModeFlags, ModeId};
pub use domain::monitor::{MonitorInfo, MonitorType, Region};
pub use domain::video_mode::{CatalogError, VideoMode};
pub use protocol::cid::{Cid, CommandTable, EventKind};
pub use protocol::frame::{FrameError, FrameHeader};
