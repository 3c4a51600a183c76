//! Per-session option negotiation with the backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use buildgate_protocol::{PingRequest, WorkerInfo};
use buildgate_runtime::{CallContext, CapabilitySet, GatewayClient, Result};
use tracing::debug;

/// Options a build routine sees for its session.
#[derive(Debug, Clone, Default)]
pub struct BuildOpts {
	/// Frontend options, session-provided entries over the caller's.
	pub opts: BTreeMap<String, String>,
	pub session_id: String,
	pub product: String,
	pub workers: Vec<WorkerInfo>,
	/// Gateway capabilities the backend advertised.
	pub caps: CapabilitySet,
	/// Build-graph capabilities the backend advertised.
	pub llb_caps: CapabilitySet,
}

/// Inputs to [`Negotiator::negotiate`].
#[derive(Debug, Clone, Default)]
pub struct NegotiateParams {
	pub opts: BTreeMap<String, String>,
	pub session_id: String,
	pub product: String,
	pub workers: Vec<WorkerInfo>,
}

/// Turns session parameters into the options and capabilities of a build.
#[async_trait]
pub trait Negotiator: Send + Sync {
	async fn negotiate(&self, ctx: &CallContext, gateway: &dyn GatewayClient, params: NegotiateParams) -> Result<BuildOpts>;
}

/// Negotiates by pinging the backend and recording what it advertises.
#[derive(Debug, Clone, Copy, Default)]
pub struct PingNegotiator;

#[async_trait]
impl Negotiator for PingNegotiator {
	async fn negotiate(&self, ctx: &CallContext, gateway: &dyn GatewayClient, params: NegotiateParams) -> Result<BuildOpts> {
		let pong = gateway.ping(ctx, PingRequest::default()).await?;
		let caps = CapabilitySet::new(pong.framework_caps);
		let llb_caps = CapabilitySet::new(pong.llb_caps);
		debug!(
			target = "buildgate.build",
			session_id = %params.session_id,
			caps = caps.len(),
			llb_caps = llb_caps.len(),
			"negotiated session capabilities"
		);

		Ok(BuildOpts {
			opts: params.opts,
			session_id: params.session_id,
			product: params.product,
			workers: params.workers,
			caps,
			llb_caps,
		})
	}
}
