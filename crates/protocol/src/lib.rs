//! Wire types for the build gateway protocol.
//!
//! This crate contains the serde-serializable records exchanged with a
//! build-execution backend: capability handshake entries, one request and
//! one response record per gateway operation, worker records from the
//! control API, and the solve options and status events used by a build.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! - **Pure data**: No behavior beyond serialization/deserialization
//! - **1:1 with the wire**: Field names match what the backend sends
//! - **Stable**: Changes only when the wire protocol changes
//!
//! Call plumbing (metadata, cancellation, capability checks) lives in
//! `buildgate-runtime`; session bridging lives in `buildgate`.

pub mod caps;
pub mod gateway;
pub mod solve;
pub mod worker;

pub use caps::*;
pub use gateway::*;
pub use solve::*;
pub use worker::*;
