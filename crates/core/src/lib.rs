//! buildgate - run a build routine as the frontend of a remote build
//!
//! A [`Client`] drives builds on a backend reached through one shared
//! connection. For every build it opens a [`SessionBridge`]: a gateway client
//! that tags each call with the build's id and refuses operations whose
//! capability the backend did not advertise. Where a degraded equivalent
//! exists (evaluate via a stat of the reference root) the bridge issues that
//! instead.
//!
//! # Example
//!
//! ```ignore
//! use buildgate::{Client, EvaluateRequest, GatewayClient, SolveOpt};
//!
//! let client = Client::new(connection, solver);
//! let resp = client
//! 	.build(&ctx, SolveOpt::default(), "", |ctx, build| async move {
//! 		build.gateway().evaluate(&ctx, EvaluateRequest { reference: "r1".into() }).await?;
//! 		Ok(())
//! 	}, Some(status_tx))
//! 	.await?;
//! ```

mod bridge;
mod build;
mod config;
mod fallback;
mod negotiate;
mod solver;
mod status;
mod workers;

pub use bridge::SessionBridge;
pub use build::{BuildClient, Client};
pub use buildgate_protocol::*;
pub use buildgate_runtime::{CallContext, CapabilitySet, Connection, ConnectionLike, Error, GatewayClient, Result, RpcGateway, methods};
pub use config::{ClientConfig, EXPORTED_PRODUCT};
pub use fallback::{Fallback, FallbackPolicy, Operation, Route, Substitute};
pub use negotiate::{BuildOpts, NegotiateParams, Negotiator, PingNegotiator};
pub use solver::{Session, SessionCallback, Solver};
pub use status::StatusWriter;
pub use workers::{ControlClient, LIST_WORKERS, WorkerLister};
