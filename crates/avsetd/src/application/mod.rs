//! Application layer use cases for the AV settings daemon.
//!
//! # What is the "application" layer? (for beginners)
//!
//! The application layer sits between the pure protocol/domain code in
//! `avset_core` and the infrastructure (sockets, files, GPU power).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** protocol requests to fulfil a goal ("switch to 1080p").
//! - **Depend on abstractions** ([`transaction::AvTransport`],
//!   [`av_settings::GpuPower`]) so tests can swap in mocks.
//! - **Contain no direct I/O** beyond what those traits expose.
//!
//! # Sub-modules
//!
//! - **`transaction`** – The serialised request/reply engine.  Every byte
//!   exchanged with the AV controller goes through it.
//! - **`commands`**    – Typed wrappers: one async method per request,
//!   reply status checked.
//! - **`discovery`**   – Reads the hardware configuration and derives the
//!   port tables.
//! - **`auto_mode`**   – Queries HDMI monitors and picks the automatic mode.
//! - **`audio`** / **`mode_switch`** – The multi-step audio and video
//!   sequences; the latter runs on a background worker.
//! - **`av_settings`** – The public facade tying all of the above together.

pub mod audio;
pub mod auto_mode;
pub mod av_settings;
pub mod commands;
pub mod discovery;
pub mod mode_switch;
pub mod report;
pub mod transaction;
