//! Transports carrying frames to and from the AV controller.
//!
//! - **`stream`** – any Tokio byte stream (TCP socket, serial bridge, pipe).
//! - **`mock`**   – an in-process scripted controller for tests.

pub mod mock;
pub mod stream;

pub use stream::StreamTransport;
