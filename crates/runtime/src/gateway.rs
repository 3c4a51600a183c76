//! Gateway operations and their direct implementation over a connection.
//!
//! [`GatewayClient`] is the call surface a build routine drives. It has two
//! implementers: [`RpcGateway`], which forwards straight onto the shared
//! connection, and the session bridge in `buildgate`, which tags and gates
//! each call before handing it to an inner client.

use std::sync::Arc;

use async_trait::async_trait;
use buildgate_protocol::{
	EvaluateRequest, EvaluateResponse, ExecProcessRequest, ExecProcessResponse, InputsRequest, InputsResponse, NewContainerRequest,
	NewContainerResponse, PingRequest, PongResponse, ReadDirRequest, ReadDirResponse, ReadFileRequest, ReadFileResponse,
	ReleaseContainerRequest, ReleaseContainerResponse, ResolveImageConfigRequest, ResolveImageConfigResponse, ResolveSourceMetaRequest,
	ResolveSourceMetaResponse, ReturnRequest, ReturnResponse, SolveRequest, SolveResponse, StatFileRequest, StatFileResponse, WarnRequest,
	WarnResponse,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::connection::ConnectionLike;
use crate::context::CallContext;
use crate::error::Result;

/// Wire method names of the gateway operations.
pub mod methods {
	pub const RESOLVE_IMAGE_CONFIG: &str = "gateway.ResolveImageConfig";
	pub const RESOLVE_SOURCE_META: &str = "gateway.ResolveSourceMeta";
	pub const SOLVE: &str = "gateway.Solve";
	pub const READ_FILE: &str = "gateway.ReadFile";
	pub const READ_DIR: &str = "gateway.ReadDir";
	pub const STAT_FILE: &str = "gateway.StatFile";
	pub const EVALUATE: &str = "gateway.Evaluate";
	pub const PING: &str = "gateway.Ping";
	pub const RETURN: &str = "gateway.Return";
	pub const INPUTS: &str = "gateway.Inputs";
	pub const NEW_CONTAINER: &str = "gateway.NewContainer";
	pub const RELEASE_CONTAINER: &str = "gateway.ReleaseContainer";
	pub const EXEC_PROCESS: &str = "gateway.ExecProcess";
	pub const WARN: &str = "gateway.Warn";
}

/// Every operation a build routine can issue against the backend.
///
/// Implementations must be safe for concurrent use: a routine may issue
/// several calls at once on the same client.
#[async_trait]
pub trait GatewayClient: Send + Sync {
	/// Resolves the configuration of an image reference.
	async fn resolve_image_config(&self, ctx: &CallContext, req: ResolveImageConfigRequest) -> Result<ResolveImageConfigResponse>;

	/// Resolves metadata of an arbitrary source.
	async fn resolve_source_meta(&self, ctx: &CallContext, req: ResolveSourceMetaRequest) -> Result<ResolveSourceMetaResponse>;

	/// Submits a build graph.
	async fn solve(&self, ctx: &CallContext, req: SolveRequest) -> Result<SolveResponse>;

	async fn read_file(&self, ctx: &CallContext, req: ReadFileRequest) -> Result<ReadFileResponse>;

	async fn read_dir(&self, ctx: &CallContext, req: ReadDirRequest) -> Result<ReadDirResponse>;

	async fn stat_file(&self, ctx: &CallContext, req: StatFileRequest) -> Result<StatFileResponse>;

	/// Forces a lazy reference to be computed.
	async fn evaluate(&self, ctx: &CallContext, req: EvaluateRequest) -> Result<EvaluateResponse>;

	/// Handshake; answers with the backend's capabilities.
	async fn ping(&self, ctx: &CallContext, req: PingRequest) -> Result<PongResponse>;

	/// Reports the final result of the build routine.
	async fn return_result(&self, ctx: &CallContext, req: ReturnRequest) -> Result<ReturnResponse>;

	/// Lists the inputs passed to the frontend.
	async fn inputs(&self, ctx: &CallContext, req: InputsRequest) -> Result<InputsResponse>;

	async fn new_container(&self, ctx: &CallContext, req: NewContainerRequest) -> Result<NewContainerResponse>;

	async fn release_container(&self, ctx: &CallContext, req: ReleaseContainerRequest) -> Result<ReleaseContainerResponse>;

	async fn exec_process(&self, ctx: &CallContext, req: ExecProcessRequest) -> Result<ExecProcessResponse>;

	/// Emits a build warning.
	async fn warn(&self, ctx: &CallContext, req: WarnRequest) -> Result<WarnResponse>;
}

/// Gateway client that forwards each call unchanged onto a shared connection.
#[derive(Clone)]
pub struct RpcGateway {
	connection: Arc<dyn ConnectionLike>,
}

impl RpcGateway {
	pub fn new(connection: Arc<dyn ConnectionLike>) -> Self {
		Self { connection }
	}

	/// Serializes `req`, sends it as `method` and decodes the response.
	pub async fn call<P: Serialize, R: DeserializeOwned>(&self, ctx: &CallContext, method: &str, req: P) -> Result<R> {
		let params = serde_json::to_value(req)?;
		let response = self.connection.send_message(method, params, ctx).await?;
		// Empty acknowledgements may come back as `null`.
		let response = match response {
			Value::Null => Value::Object(Default::default()),
			other => other,
		};
		serde_json::from_value(response).map_err(Into::into)
	}
}

#[async_trait]
impl GatewayClient for RpcGateway {
	async fn resolve_image_config(&self, ctx: &CallContext, req: ResolveImageConfigRequest) -> Result<ResolveImageConfigResponse> {
		self.call(ctx, methods::RESOLVE_IMAGE_CONFIG, req).await
	}

	async fn resolve_source_meta(&self, ctx: &CallContext, req: ResolveSourceMetaRequest) -> Result<ResolveSourceMetaResponse> {
		self.call(ctx, methods::RESOLVE_SOURCE_META, req).await
	}

	async fn solve(&self, ctx: &CallContext, req: SolveRequest) -> Result<SolveResponse> {
		self.call(ctx, methods::SOLVE, req).await
	}

	async fn read_file(&self, ctx: &CallContext, req: ReadFileRequest) -> Result<ReadFileResponse> {
		self.call(ctx, methods::READ_FILE, req).await
	}

	async fn read_dir(&self, ctx: &CallContext, req: ReadDirRequest) -> Result<ReadDirResponse> {
		self.call(ctx, methods::READ_DIR, req).await
	}

	async fn stat_file(&self, ctx: &CallContext, req: StatFileRequest) -> Result<StatFileResponse> {
		self.call(ctx, methods::STAT_FILE, req).await
	}

	async fn evaluate(&self, ctx: &CallContext, req: EvaluateRequest) -> Result<EvaluateResponse> {
		self.call(ctx, methods::EVALUATE, req).await
	}

	async fn ping(&self, ctx: &CallContext, req: PingRequest) -> Result<PongResponse> {
		self.call(ctx, methods::PING, req).await
	}

	async fn return_result(&self, ctx: &CallContext, req: ReturnRequest) -> Result<ReturnResponse> {
		self.call(ctx, methods::RETURN, req).await
	}

	async fn inputs(&self, ctx: &CallContext, req: InputsRequest) -> Result<InputsResponse> {
		self.call(ctx, methods::INPUTS, req).await
	}

	async fn new_container(&self, ctx: &CallContext, req: NewContainerRequest) -> Result<NewContainerResponse> {
		self.call(ctx, methods::NEW_CONTAINER, req).await
	}

	async fn release_container(&self, ctx: &CallContext, req: ReleaseContainerRequest) -> Result<ReleaseContainerResponse> {
		self.call(ctx, methods::RELEASE_CONTAINER, req).await
	}

	async fn exec_process(&self, ctx: &CallContext, req: ExecProcessRequest) -> Result<ExecProcessResponse> {
		self.call(ctx, methods::EXEC_PROCESS, req).await
	}

	async fn warn(&self, ctx: &CallContext, req: WarnRequest) -> Result<WarnResponse> {
		self.call(ctx, methods::WARN, req).await
	}
}
