//! Domain entities for the AV settings controller.
//!
//! This module contains pure rules with no infrastructure dependencies: no
//! transport, no clock, no async runtime.  Everything here can be unit-tested
//! on any machine.
//!
//! # What lives here?
//!
//! - **`mode`** – the mode id: a catalog index plus flag bits (DVI, RGB,
//!   HDCP-off, ...).
//! - **`video_mode`** – the fixed catalog mapping a mode index to concrete
//!   signal parameters.
//! - **`hw_config`** – how many HDMI, analog multi-out, and optical ports the
//!   console has, and the port id tables derived from those counts.
//! - **`monitor`** – per-port monitor capability reports and the console's
//!   configured region.
//! - **`negotiator`** – the rules that turn monitor reports into a default
//!   mode id.

pub mod hw_config;
pub mod mode;
pub mod monitor;
pub mod negotiator;
pub mod video_mode;
