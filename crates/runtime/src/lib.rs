//! Build gateway runtime - shared connection, call context and capabilities
//!
//! This crate provides the low-level infrastructure every gateway call goes
//! through:
//!
//! - **Call context**: Outgoing metadata, deadlines and cancellation
//! - **Connection**: JSON-RPC request/response correlation over one shared pipe
//! - **Gateway client**: The [`GatewayClient`] trait listing every backend
//!   operation, and [`RpcGateway`], its direct implementation over a connection
//! - **Capabilities**: The immutable [`CapabilitySet`] negotiated per session
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │  buildgate   │  SessionBridge, build orchestration
//! └──────┬───────┘
//!        │ implements GatewayClient
//! ┌──────▼───────┐
//! │   runtime    │  This crate
//! │  ┌────────┐  │
//! │  │Gateway │  │  Typed operations
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Conn   │  │  JSON-RPC correlation
//! │  └────────┘  │
//! └──────────────┘
//! ```
//!
//! The transport feeding the connection is supplied by the embedder.

pub mod caps;
pub mod connection;
pub mod context;
pub mod error;
pub mod gateway;

pub use caps::CapabilitySet;
pub use connection::{Connection, ConnectionLike, ErrorPayload, Message, Request, Response};
pub use context::{BUILD_ID_METADATA_KEY, CallContext, MetadataMap};
pub use error::{Error, Result};
pub use gateway::{GatewayClient, RpcGateway, methods};
