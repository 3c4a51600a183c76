//! Per-build session bridge over a shared gateway client.
//!
//! A [`SessionBridge`] wraps the client every build shares, a build id and
//! the capability set negotiated for that build. Each call is tagged with the
//! build id, checked against the capability set, and then forwarded with
//! the inner client's result returned unchanged.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use buildgate_protocol::{
	EvaluateRequest, EvaluateResponse, ExecProcessRequest, ExecProcessResponse, InputsRequest, InputsResponse, NewContainerRequest,
	NewContainerResponse, PingRequest, PongResponse, ReadDirRequest, ReadDirResponse, ReadFileRequest, ReadFileResponse,
	ReleaseContainerRequest, ReleaseContainerResponse, ResolveImageConfigRequest, ResolveImageConfigResponse, ResolveSourceMetaRequest,
	ResolveSourceMetaResponse, ReturnRequest, ReturnResponse, SolveRequest, SolveResponse, StatFileRequest, StatFileResponse, WarnRequest,
	WarnResponse,
};
use buildgate_runtime::{CallContext, CapabilitySet, Error, GatewayClient, Result};
use tracing::debug;

use crate::fallback::{FallbackPolicy, Operation, Route, Substitute};

/// Gateway client scoped to one build on a shared connection.
///
/// Safe for concurrent use: the only mutable state is the capability slot,
/// written once during session setup before the build routine runs.
pub struct SessionBridge {
	inner: Arc<dyn GatewayClient>,
	build_id: Arc<str>,
	caps: OnceLock<Arc<CapabilitySet>>,
}

impl SessionBridge {
	/// Creates a bridge with no capability set; every gate passes until one is set.
	pub fn new(inner: Arc<dyn GatewayClient>, build_id: impl Into<Arc<str>>) -> Self {
		Self {
			inner,
			build_id: build_id.into(),
			caps: OnceLock::new(),
		}
	}

	/// Creates a bridge whose capability set is already known.
	pub fn with_caps(inner: Arc<dyn GatewayClient>, build_id: impl Into<Arc<str>>, caps: Arc<CapabilitySet>) -> Self {
		Self {
			inner,
			build_id: build_id.into(),
			caps: OnceLock::from(caps),
		}
	}

	pub fn build_id(&self) -> &str {
		&self.build_id
	}

	/// Capability set used for gating, once negotiated.
	pub fn caps(&self) -> Option<&Arc<CapabilitySet>> {
		self.caps.get()
	}

	/// Stores the negotiated capability set. Fails if one was already stored.
	pub fn set_caps(&self, caps: Arc<CapabilitySet>) -> Result<()> {
		self.caps
			.set(caps)
			.map_err(|_| Error::ProtocolError(format!("capabilities already negotiated for build {}", self.build_id)))
	}

	fn gating_caps(&self) -> Option<&CapabilitySet> {
		self.caps.get().map(|caps| &**caps)
	}

	fn tag(&self, ctx: &CallContext) -> CallContext {
		ctx.with_build_id(&self.build_id)
	}

	fn check(&self, op: Operation) -> Result<()> {
		FallbackPolicy::check(op, self.gating_caps()).inspect_err(|err| {
			debug!(target = "buildgate.bridge", build_id = %self.build_id, op = %op, "refusing call: {}", err);
		})
	}
}

#[async_trait]
impl GatewayClient for SessionBridge {
	async fn resolve_image_config(&self, ctx: &CallContext, req: ResolveImageConfigRequest) -> Result<ResolveImageConfigResponse> {
		self.check(Operation::ResolveImageConfig)?;
		self.inner.resolve_image_config(&self.tag(ctx), req).await
	}

	async fn resolve_source_meta(&self, ctx: &CallContext, req: ResolveSourceMetaRequest) -> Result<ResolveSourceMetaResponse> {
		self.check(Operation::ResolveSourceMeta)?;
		self.inner.resolve_source_meta(&self.tag(ctx), req).await
	}

	async fn solve(&self, ctx: &CallContext, req: SolveRequest) -> Result<SolveResponse> {
		self.check(Operation::Solve)?;
		self.inner.solve(&self.tag(ctx), req).await
	}

	async fn read_file(&self, ctx: &CallContext, req: ReadFileRequest) -> Result<ReadFileResponse> {
		self.check(Operation::ReadFile)?;
		self.inner.read_file(&self.tag(ctx), req).await
	}

	async fn read_dir(&self, ctx: &CallContext, req: ReadDirRequest) -> Result<ReadDirResponse> {
		self.check(Operation::ReadDir)?;
		self.inner.read_dir(&self.tag(ctx), req).await
	}

	async fn stat_file(&self, ctx: &CallContext, req: StatFileRequest) -> Result<StatFileResponse> {
		self.check(Operation::StatFile)?;
		self.inner.stat_file(&self.tag(ctx), req).await
	}

	async fn evaluate(&self, ctx: &CallContext, req: EvaluateRequest) -> Result<EvaluateResponse> {
		let route = FallbackPolicy::route(Operation::Evaluate, self.gating_caps()).inspect_err(|err| {
			debug!(target = "buildgate.bridge", build_id = %self.build_id, "refusing evaluate: {}", err);
		})?;

		match route {
			Route::Direct => self.inner.evaluate(&self.tag(ctx), req).await,
			Route::Substitute(Substitute::StatRoot) => {
				debug!(
					target = "buildgate.bridge",
					build_id = %self.build_id,
					reference = %req.reference,
					"backend lacks evaluate; forcing reference with stat"
				);
				let stat = StatFileRequest {
					reference: req.reference,
					path: ".".to_string(),
				};
				self.inner.stat_file(&self.tag(ctx), stat).await?;
				Ok(EvaluateResponse::default())
			}
		}
	}

	async fn ping(&self, ctx: &CallContext, req: PingRequest) -> Result<PongResponse> {
		self.check(Operation::Ping)?;
		self.inner.ping(&self.tag(ctx), req).await
	}

	async fn return_result(&self, ctx: &CallContext, req: ReturnRequest) -> Result<ReturnResponse> {
		self.check(Operation::Return)?;
		self.inner.return_result(&self.tag(ctx), req).await
	}

	async fn inputs(&self, ctx: &CallContext, req: InputsRequest) -> Result<InputsResponse> {
		self.check(Operation::Inputs)?;
		self.inner.inputs(&self.tag(ctx), req).await
	}

	async fn new_container(&self, ctx: &CallContext, req: NewContainerRequest) -> Result<NewContainerResponse> {
		self.check(Operation::NewContainer)?;
		self.inner.new_container(&self.tag(ctx), req).await
	}

	async fn release_container(&self, ctx: &CallContext, req: ReleaseContainerRequest) -> Result<ReleaseContainerResponse> {
		self.check(Operation::ReleaseContainer)?;
		self.inner.release_container(&self.tag(ctx), req).await
	}

	async fn exec_process(&self, ctx: &CallContext, req: ExecProcessRequest) -> Result<ExecProcessResponse> {
		self.check(Operation::ExecProcess)?;
		self.inner.exec_process(&self.tag(ctx), req).await
	}

	async fn warn(&self, ctx: &CallContext, req: WarnRequest) -> Result<WarnResponse> {
		self.check(Operation::Warn)?;
		self.inner.warn(&self.tag(ctx), req).await
	}
}

#[cfg(test)]
mod tests;
