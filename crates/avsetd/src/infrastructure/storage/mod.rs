//! Storage infrastructure: the daemon's configuration file.
//!
//! The daemon only reads configuration; nothing is persisted across
//! restarts.

pub mod config;
