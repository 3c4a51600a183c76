//! Seam to the component that runs a gateway session against the backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use buildgate_protocol::{BuildResponse, SolveOpt};
use buildgate_runtime::{CallContext, Result};
use futures_util::future::BoxFuture;

use crate::status::StatusWriter;

/// Backend session the solver opened for a build.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
	id: String,
	shared_key: String,
}

impl Session {
	pub fn new(id: impl Into<String>, shared_key: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			shared_key: shared_key.into(),
		}
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn shared_key(&self) -> &str {
		&self.shared_key
	}
}

/// Invoked by the solver once the gateway session is up.
///
/// Arguments are the build reference, the session and the options the
/// backend attached to the session.
pub type SessionCallback<'a> = Box<dyn FnOnce(String, Session, BTreeMap<String, String>) -> BoxFuture<'a, Result<()>> + Send + 'a>;

/// Runs one build session.
///
/// Implementations must call `on_session` at most once and finish only
/// after it has completed.
#[async_trait]
pub trait Solver: Send + Sync {
	async fn solve<'a>(
		&'a self,
		ctx: &'a CallContext,
		opt: SolveOpt,
		on_session: SessionCallback<'a>,
		status: Option<StatusWriter>,
	) -> Result<BuildResponse>;
}
