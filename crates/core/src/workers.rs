//! Worker enumeration on the control service.

use std::sync::Arc;

use async_trait::async_trait;
use buildgate_protocol::{ListWorkersRequest, ListWorkersResponse, WorkerRecord};
use buildgate_runtime::{CallContext, ConnectionLike, Result, RpcGateway};
use tracing::debug;

/// Wire method listing the backend's workers.
pub const LIST_WORKERS: &str = "control.ListWorkers";

/// Source of the workers available to a build.
#[async_trait]
pub trait WorkerLister: Send + Sync {
	async fn list_workers(&self, ctx: &CallContext) -> Result<Vec<WorkerRecord>>;
}

/// Lists workers through the control service on the shared connection.
#[derive(Clone)]
pub struct ControlClient {
	rpc: RpcGateway,
	filter: Vec<String>,
}

impl ControlClient {
	pub fn new(connection: Arc<dyn ConnectionLike>) -> Self {
		Self {
			rpc: RpcGateway::new(connection),
			filter: Vec::new(),
		}
	}

	/// Restricts listing to workers matching every filter expression.
	pub fn with_filter(mut self, filter: impl IntoIterator<Item = impl Into<String>>) -> Self {
		self.filter = filter.into_iter().map(Into::into).collect();
		self
	}
}

#[async_trait]
impl WorkerLister for ControlClient {
	async fn list_workers(&self, ctx: &CallContext) -> Result<Vec<WorkerRecord>> {
		let req = ListWorkersRequest { filter: self.filter.clone() };
		let resp: ListWorkersResponse = self.rpc.call(ctx, LIST_WORKERS, req).await?;
		debug!(target = "buildgate.build", count = resp.record.len(), "listed workers");
		Ok(resp.record)
	}
}
