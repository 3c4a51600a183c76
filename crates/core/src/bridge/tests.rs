use buildgate_protocol::{CAP_GATEWAY_EVALUATE, CAP_GATEWAY_EXEC, CAP_READ_DIR, CAP_STAT_FILE, CapId, Capability, Stat};
use buildgate_runtime::methods;
use parking_lot::Mutex;

use super::*;

/// Inner client that records every forwarded call.
#[derive(Default)]
struct RecordingGateway {
	calls: Mutex<Vec<Call>>,
	stat_error: Mutex<Option<Error>>,
}

#[derive(Debug, Clone)]
struct Call {
	method: &'static str,
	build_ids: Vec<String>,
	reference: Option<String>,
	path: Option<String>,
}

impl RecordingGateway {
	fn record(&self, method: &'static str, ctx: &CallContext) {
		self.push(method, ctx, None, None);
	}

	fn push(&self, method: &'static str, ctx: &CallContext, reference: Option<String>, path: Option<String>) {
		self.calls.lock().push(Call {
			method,
			build_ids: ctx.build_ids().to_vec(),
			reference,
			path,
		});
	}

	fn calls(&self) -> Vec<Call> {
		self.calls.lock().clone()
	}

	fn count(&self, method: &str) -> usize {
		self.calls.lock().iter().filter(|call| call.method == method).count()
	}
}

#[async_trait]
impl GatewayClient for RecordingGateway {
	async fn resolve_image_config(&self, ctx: &CallContext, _req: ResolveImageConfigRequest) -> Result<ResolveImageConfigResponse> {
		self.record(methods::RESOLVE_IMAGE_CONFIG, ctx);
		Ok(ResolveImageConfigResponse::default())
	}

	async fn resolve_source_meta(&self, ctx: &CallContext, _req: ResolveSourceMetaRequest) -> Result<ResolveSourceMetaResponse> {
		self.record(methods::RESOLVE_SOURCE_META, ctx);
		Ok(ResolveSourceMetaResponse::default())
	}

	async fn solve(&self, ctx: &CallContext, _req: SolveRequest) -> Result<SolveResponse> {
		self.record(methods::SOLVE, ctx);
		Ok(SolveResponse::default())
	}

	async fn read_file(&self, ctx: &CallContext, req: ReadFileRequest) -> Result<ReadFileResponse> {
		self.push(methods::READ_FILE, ctx, Some(req.reference), Some(req.file_path));
		Ok(ReadFileResponse { data: b"FROM scratch".to_vec() })
	}

	async fn read_dir(&self, ctx: &CallContext, req: ReadDirRequest) -> Result<ReadDirResponse> {
		self.push(methods::READ_DIR, ctx, Some(req.reference), Some(req.dir_path));
		Ok(ReadDirResponse::default())
	}

	async fn stat_file(&self, ctx: &CallContext, req: StatFileRequest) -> Result<StatFileResponse> {
		self.push(methods::STAT_FILE, ctx, Some(req.reference), Some(req.path.clone()));
		if let Some(err) = self.stat_error.lock().take() {
			return Err(err);
		}
		Ok(StatFileResponse {
			stat: Some(Stat {
				path: req.path,
				..Stat::default()
			}),
		})
	}

	async fn evaluate(&self, ctx: &CallContext, req: EvaluateRequest) -> Result<EvaluateResponse> {
		self.push(methods::EVALUATE, ctx, Some(req.reference), None);
		Ok(EvaluateResponse::default())
	}

	async fn ping(&self, ctx: &CallContext, _req: PingRequest) -> Result<PongResponse> {
		self.record(methods::PING, ctx);
		Ok(PongResponse::default())
	}

	async fn return_result(&self, ctx: &CallContext, _req: ReturnRequest) -> Result<ReturnResponse> {
		self.record(methods::RETURN, ctx);
		Ok(ReturnResponse::default())
	}

	async fn inputs(&self, ctx: &CallContext, _req: InputsRequest) -> Result<InputsResponse> {
		self.record(methods::INPUTS, ctx);
		Ok(InputsResponse::default())
	}

	async fn new_container(&self, ctx: &CallContext, _req: NewContainerRequest) -> Result<NewContainerResponse> {
		self.record(methods::NEW_CONTAINER, ctx);
		Ok(NewContainerResponse::default())
	}

	async fn release_container(&self, ctx: &CallContext, _req: ReleaseContainerRequest) -> Result<ReleaseContainerResponse> {
		self.record(methods::RELEASE_CONTAINER, ctx);
		Ok(ReleaseContainerResponse::default())
	}

	async fn exec_process(&self, ctx: &CallContext, _req: ExecProcessRequest) -> Result<ExecProcessResponse> {
		self.record(methods::EXEC_PROCESS, ctx);
		Ok(ExecProcessResponse::default())
	}

	async fn warn(&self, ctx: &CallContext, _req: WarnRequest) -> Result<WarnResponse> {
		self.record(methods::WARN, ctx);
		Ok(WarnResponse::default())
	}
}

fn caps(ids: &[CapId]) -> Arc<CapabilitySet> {
	Arc::new(ids.iter().cloned().map(Capability::enabled).collect())
}

fn bridge_with(ids: &[CapId]) -> (SessionBridge, Arc<RecordingGateway>) {
	let inner = Arc::new(RecordingGateway::default());
	let bridge = SessionBridge::with_caps(inner.clone(), "ref-1", caps(ids));
	(bridge, inner)
}

fn evaluate_req(reference: &str) -> EvaluateRequest {
	EvaluateRequest {
		reference: reference.to_string(),
	}
}

#[tokio::test]
async fn forwards_ungated_call_with_build_id() {
	let (bridge, inner) = bridge_with(&[]);

	let resp = bridge
		.read_file(
			&CallContext::new(),
			ReadFileRequest {
				reference: "r1".to_string(),
				file_path: "Dockerfile".to_string(),
				range: None,
			},
		)
		.await
		.unwrap();
	assert_eq!(resp.data, b"FROM scratch");

	let calls = inner.calls();
	assert_eq!(calls.len(), 1);
	assert_eq!(calls[0].method, methods::READ_FILE);
	assert_eq!(calls[0].build_ids, ["ref-1".to_string()]);
	assert_eq!(calls[0].path.as_deref(), Some("Dockerfile"));
}

#[tokio::test]
async fn caller_metadata_is_kept_alongside_build_id() {
	let (bridge, inner) = bridge_with(&[]);
	let ctx = CallContext::new().append_metadata("x-trace", "t1");

	bridge.ping(&ctx, PingRequest::default()).await.unwrap();

	let calls = inner.calls();
	assert_eq!(calls[0].build_ids, ["ref-1".to_string()]);
	assert!(ctx.build_ids().is_empty());
}

#[tokio::test]
async fn gated_call_without_capability_never_reaches_inner() {
	let (bridge, inner) = bridge_with(&[CAP_STAT_FILE]);

	let err = bridge.read_dir(&CallContext::new(), ReadDirRequest::default()).await.unwrap_err();
	assert_eq!(err.unsupported_cap(), Some(&CAP_READ_DIR));
	assert!(inner.calls().is_empty());
}

#[tokio::test]
async fn container_calls_share_exec_capability() {
	let (bridge, inner) = bridge_with(&[]);
	let ctx = CallContext::new();

	for err in [
		bridge.new_container(&ctx, NewContainerRequest::default()).await.unwrap_err(),
		bridge.release_container(&ctx, ReleaseContainerRequest::default()).await.unwrap_err(),
		bridge.exec_process(&ctx, ExecProcessRequest::default()).await.unwrap_err(),
	] {
		assert_eq!(err.unsupported_cap(), Some(&CAP_GATEWAY_EXEC));
	}
	assert!(inner.calls().is_empty());

	let (bridge, inner) = bridge_with(&[CAP_GATEWAY_EXEC]);
	bridge.new_container(&ctx, NewContainerRequest::default()).await.unwrap();
	bridge.exec_process(&ctx, ExecProcessRequest::default()).await.unwrap();
	bridge.release_container(&ctx, ReleaseContainerRequest::default()).await.unwrap();
	assert_eq!(inner.calls().len(), 3);
}

#[tokio::test]
async fn disabled_capability_is_refused_with_reason() {
	let inner = Arc::new(RecordingGateway::default());
	let set = Arc::new(CapabilitySet::new([Capability::disabled(CAP_READ_DIR, "not on this worker")]));
	let bridge = SessionBridge::with_caps(inner.clone(), "ref-1", set);

	let err = bridge.read_dir(&CallContext::new(), ReadDirRequest::default()).await.unwrap_err();
	assert_eq!(err.unsupported_cap(), Some(&CAP_READ_DIR));
	assert!(err.to_string().contains("not on this worker"), "{err}");
	assert!(inner.calls().is_empty());
}

#[tokio::test]
async fn evaluate_goes_direct_when_supported() {
	let (bridge, inner) = bridge_with(&[CAP_GATEWAY_EVALUATE, CAP_STAT_FILE]);

	bridge.evaluate(&CallContext::new(), evaluate_req("r1")).await.unwrap();

	assert_eq!(inner.count(methods::EVALUATE), 1);
	assert_eq!(inner.count(methods::STAT_FILE), 0);
}

#[tokio::test]
async fn evaluate_falls_back_to_stat_of_root() {
	let (bridge, inner) = bridge_with(&[CAP_STAT_FILE]);

	bridge.evaluate(&CallContext::new(), evaluate_req("r1")).await.unwrap();

	let calls = inner.calls();
	assert_eq!(calls.len(), 1);
	assert_eq!(calls[0].method, methods::STAT_FILE);
	assert_eq!(calls[0].reference.as_deref(), Some("r1"));
	assert_eq!(calls[0].path.as_deref(), Some("."));
	assert_eq!(calls[0].build_ids, ["ref-1".to_string()]);
}

#[tokio::test]
async fn evaluate_fallback_passes_stat_error_through() {
	let (bridge, inner) = bridge_with(&[CAP_STAT_FILE]);
	*inner.stat_error.lock() = Some(Error::Remote {
		code: 5,
		message: "ref r1 not found".to_string(),
	});

	let err = bridge.evaluate(&CallContext::new(), evaluate_req("r1")).await.unwrap_err();
	assert!(matches!(err, Error::Remote { code: 5, .. }));
	assert_eq!(inner.count(methods::STAT_FILE), 1);
}

#[tokio::test]
async fn evaluate_without_any_route_reports_evaluate_capability() {
	let (bridge, inner) = bridge_with(&[CAP_READ_DIR]);

	let err = bridge.evaluate(&CallContext::new(), evaluate_req("r1")).await.unwrap_err();
	assert_eq!(err.unsupported_cap(), Some(&CAP_GATEWAY_EVALUATE));
	assert!(inner.calls().is_empty());
}

#[tokio::test]
async fn missing_caps_let_everything_through() {
	let inner = Arc::new(RecordingGateway::default());
	let bridge = SessionBridge::new(inner.clone(), "ref-1");

	bridge.read_dir(&CallContext::new(), ReadDirRequest::default()).await.unwrap();
	bridge.evaluate(&CallContext::new(), evaluate_req("r1")).await.unwrap();
	assert_eq!(inner.count(methods::READ_DIR), 1);
	assert_eq!(inner.count(methods::EVALUATE), 1);
}

#[test]
fn caps_can_only_be_set_once() {
	let bridge = SessionBridge::new(Arc::new(RecordingGateway::default()), "ref-1");
	assert!(bridge.caps().is_none());

	bridge.set_caps(caps(&[CAP_STAT_FILE])).unwrap();
	let err = bridge.set_caps(caps(&[CAP_READ_DIR])).unwrap_err();
	assert!(matches!(err, Error::ProtocolError(_)));
	assert!(bridge.caps().unwrap().contains(&CAP_STAT_FILE));
	assert_eq!(bridge.build_id(), "ref-1");
}

#[test]
fn caps_given_at_construction_are_final() {
	let (bridge, _) = bridge_with(&[CAP_STAT_FILE]);
	assert!(bridge.caps().unwrap().contains(&CAP_STAT_FILE));

	let err = bridge.set_caps(caps(&[CAP_READ_DIR])).unwrap_err();
	assert!(matches!(err, Error::ProtocolError(_)));
	assert!(!bridge.caps().unwrap().contains(&CAP_READ_DIR));
}

#[tokio::test]
async fn concurrent_calls_are_each_tagged() {
	let (bridge, inner) = bridge_with(&[CAP_STAT_FILE]);
	let bridge = Arc::new(bridge);

	let mut handles = Vec::new();
	for i in 0..8 {
		let bridge = Arc::clone(&bridge);
		handles.push(tokio::spawn(async move {
			bridge
				.stat_file(
					&CallContext::new(),
					StatFileRequest {
						reference: format!("r{i}"),
						path: ".".to_string(),
					},
				)
				.await
		}));
	}
	for handle in handles {
		handle.await.unwrap().unwrap();
	}

	let calls = inner.calls();
	assert_eq!(calls.len(), 8);
	assert!(calls.iter().all(|call| call.build_ids == ["ref-1".to_string()]));
}
