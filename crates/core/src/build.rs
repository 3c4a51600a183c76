//! Build orchestration on top of a shared backend connection.
//!
//! [`Client::build`] lists workers, hands a session-setup callback to the
//! [`Solver`], and inside that callback wires a [`SessionBridge`] with the
//! negotiated capabilities before running the caller's build routine. The
//! status channel passed in is closed on every exit path.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use buildgate_protocol::{BuildResponse, SolveOpt, SolveStatus, WorkerInfo};
use buildgate_runtime::{CallContext, CapabilitySet, ConnectionLike, Error, Result, RpcGateway};
use futures_util::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::bridge::SessionBridge;
use crate::config::ClientConfig;
use crate::negotiate::{BuildOpts, NegotiateParams, Negotiator, PingNegotiator};
use crate::solver::{Session, SessionCallback, Solver};
use crate::status::StatusWriter;
use crate::workers::{ControlClient, WorkerLister};

/// Handle a build routine receives for its session.
#[derive(Clone)]
pub struct BuildClient {
	gateway: Arc<SessionBridge>,
	opts: Arc<BuildOpts>,
}

impl BuildClient {
	/// Gateway scoped to this build; every call is gated and tagged.
	pub fn gateway(&self) -> &Arc<SessionBridge> {
		&self.gateway
	}

	pub fn opts(&self) -> &BuildOpts {
		&self.opts
	}

	pub fn caps(&self) -> &CapabilitySet {
		&self.opts.caps
	}
}

/// Entry point for running builds against one backend connection.
#[derive(Clone)]
pub struct Client {
	connection: Arc<dyn ConnectionLike>,
	workers: Arc<dyn WorkerLister>,
	solver: Arc<dyn Solver>,
	negotiator: Arc<dyn Negotiator>,
	config: ClientConfig,
}

impl Client {
	/// Creates a client that lists workers over `connection` and negotiates by ping.
	pub fn new(connection: Arc<dyn ConnectionLike>, solver: Arc<dyn Solver>) -> Self {
		Self {
			workers: Arc::new(ControlClient::new(Arc::clone(&connection))),
			connection,
			solver,
			negotiator: Arc::new(PingNegotiator),
			config: ClientConfig::default(),
		}
	}

	pub fn with_worker_lister(mut self, workers: Arc<dyn WorkerLister>) -> Self {
		self.workers = workers;
		self
	}

	pub fn with_negotiator(mut self, negotiator: Arc<dyn Negotiator>) -> Self {
		self.negotiator = negotiator;
		self
	}

	pub fn with_config(mut self, config: ClientConfig) -> Self {
		self.config = config;
		self
	}

	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Gateway client for `build_id` over the shared connection, with no
	/// capability set attached.
	pub fn gateway_client_for_build(&self, build_id: impl Into<Arc<str>>) -> SessionBridge {
		SessionBridge::new(Arc::new(RpcGateway::new(Arc::clone(&self.connection))), build_id)
	}

	/// Runs `build_fn` as the frontend of a build.
	///
	/// An empty `product` falls back to the configured product, then to
	/// [`EXPORTED_PRODUCT`](crate::EXPORTED_PRODUCT). `status`, if given, is
	/// closed when this returns or unwinds.
	pub async fn build<F, Fut>(
		&self,
		ctx: &CallContext,
		mut opt: SolveOpt,
		product: &str,
		build_fn: F,
		status: Option<mpsc::Sender<SolveStatus>>,
	) -> Result<BuildResponse>
	where
		F: FnOnce(CallContext, BuildClient) -> Fut + Send,
		Fut: Future<Output = anyhow::Result<()>> + Send,
	{
		let (status, _closer) = match status {
			Some(tx) => {
				let (writer, closer) = StatusWriter::new(tx);
				(Some(writer), Some(closer))
			}
			None => (None, None),
		};

		let frontend_attrs = opt.frontend_attrs.clone();
		opt.frontend.clear();

		let product = self.config.resolve_product(product);

		let ctx = match (ctx.deadline(), self.config.build_timeout()) {
			(None, Some(timeout)) => ctx.clone().with_timeout(timeout),
			_ => ctx.clone(),
		};

		let workers: Vec<WorkerInfo> = self
			.workers
			.list_workers(&ctx)
			.await
			.map_err(|err| {
				warn!(target = "buildgate.build", "listing workers failed: {}", err);
				Error::WorkerListing { source: Box::new(err) }
			})?
			.into_iter()
			.map(WorkerInfo::from)
			.collect();

		let ctx = &ctx;
		let on_session: SessionCallback<'_> = Box::new(move |build_ref: String, session: Session, session_opts: BTreeMap<String, String>| {
			async move {
				let mut opts = frontend_attrs;
				opts.extend(session_opts);

				debug!(target = "buildgate.build", build_ref = %build_ref, session_id = session.id(), "session established");
				let gateway = Arc::new(self.gateway_client_for_build(build_ref));

				let params = NegotiateParams {
					opts,
					session_id: session.id().to_string(),
					product,
					workers,
				};
				let build_opts = self.negotiator.negotiate(ctx, &*gateway, params).await?;
				gateway.set_caps(Arc::new(build_opts.caps.clone()))?;

				let client = BuildClient {
					gateway,
					opts: Arc::new(build_opts),
				};
				build_fn(ctx.clone(), client).await.map_err(|source| Error::BuildFunction { source })
			}
			.boxed()
		});

		self.solver.solve(ctx, opt, on_session, status).await
	}
}
