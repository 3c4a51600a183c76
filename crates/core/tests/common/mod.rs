//! Shared stubs for build orchestration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use buildgate::{
	BuildResponse, CallContext, CapId, Capability, ConnectionLike, Error, LIST_WORKERS, Result, Session, SessionCallback, SolveOpt,
	SolveStatus, Solver, StatusWriter, WorkerRecord, methods,
};
use parking_lot::Mutex;
use serde_json::{Value, json};

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

/// One call seen by the stub backend.
#[derive(Debug, Clone)]
pub struct RecordedCall {
	pub method: String,
	pub params: Value,
	pub build_ids: Vec<String>,
}

/// In-memory backend answering gateway and control calls.
#[derive(Default)]
pub struct StubBackend {
	pub framework_caps: Vec<Capability>,
	pub workers: Vec<WorkerRecord>,
	pub list_workers_error: Option<String>,
	pub stat_error: Option<String>,
	pub calls: Mutex<Vec<RecordedCall>>,
}

impl StubBackend {
	pub fn with_caps(ids: &[CapId]) -> Self {
		Self {
			framework_caps: ids.iter().cloned().map(Capability::enabled).collect(),
			..Default::default()
		}
	}

	pub fn calls(&self) -> Vec<RecordedCall> {
		self.calls.lock().clone()
	}

	pub fn calls_to(&self, method: &str) -> Vec<RecordedCall> {
		self.calls.lock().iter().filter(|call| call.method == method).cloned().collect()
	}

	fn answer(&self, method: &str) -> Result<Value> {
		match method {
			LIST_WORKERS => match &self.list_workers_error {
				Some(message) => Err(Error::Remote {
					code: 14,
					message: message.clone(),
				}),
				None => Ok(json!({ "record": self.workers })),
			},
			methods::PING => Ok(json!({ "frameworkCaps": self.framework_caps })),
			methods::STAT_FILE => match &self.stat_error {
				Some(message) => Err(Error::Remote {
					code: 5,
					message: message.clone(),
				}),
				None => Ok(json!({ "stat": { "path": ".", "mode": 2147484141u32, "uid": 0, "gid": 0, "size": 0, "modTime": 0 } })),
			},
			_ => Ok(json!({})),
		}
	}
}

impl ConnectionLike for StubBackend {
	fn send_message<'a>(&'a self, method: &'a str, params: Value, ctx: &'a CallContext) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>> {
		self.calls.lock().push(RecordedCall {
			method: method.to_string(),
			params,
			build_ids: ctx.build_ids().to_vec(),
		});
		let answer = self.answer(method);
		Box::pin(async move { answer })
	}
}

/// Solver that opens one session and reports one status update.
pub struct StubSolver {
	pub build_ref: String,
	pub session_id: String,
	pub session_opts: BTreeMap<String, String>,
	pub received: Mutex<Option<SolveOpt>>,
}

impl Default for StubSolver {
	fn default() -> Self {
		Self {
			build_ref: "ref-1".to_string(),
			session_id: "sess-1".to_string(),
			session_opts: BTreeMap::new(),
			received: Mutex::new(None),
		}
	}
}

impl StubSolver {
	pub fn with_session_opts(opts: &[(&str, &str)]) -> Self {
		Self {
			session_opts: opts.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
			..Default::default()
		}
	}

	pub fn received(&self) -> Option<SolveOpt> {
		self.received.lock().clone()
	}
}

#[async_trait]
impl Solver for StubSolver {
	async fn solve<'a>(
		&'a self,
		_ctx: &'a CallContext,
		opt: SolveOpt,
		on_session: SessionCallback<'a>,
		status: Option<StatusWriter>,
	) -> Result<BuildResponse> {
		*self.received.lock() = Some(opt);

		if let Some(status) = &status {
			status.send(SolveStatus::default()).await?;
		}

		on_session(self.build_ref.clone(), Session::new(self.session_id.clone(), "shared"), self.session_opts.clone()).await?;

		Ok(BuildResponse {
			exporter_response: BTreeMap::from([("image.name".to_string(), "example".to_string())]),
		})
	}
}

pub fn setup(backend: StubBackend, solver: StubSolver) -> (buildgate::Client, Arc<StubBackend>, Arc<StubSolver>) {
	init_tracing();
	let backend = Arc::new(backend);
	let solver = Arc::new(solver);
	let client = buildgate::Client::new(backend.clone(), solver.clone());
	(client, backend, solver)
}
