//! Infrastructure layer for the AV settings daemon.
//!
//! Contains the adapters behind the application traits: the byte-stream
//! transport (and its scripted mock), the GPU power stub, and configuration
//! file loading.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `avset_core`, but MUST NOT be imported by the `application` layer outside
//! of tests.

pub mod gpu;
pub mod storage;
pub mod transport;
