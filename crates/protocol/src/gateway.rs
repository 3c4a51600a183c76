//! Request and response records for every gateway operation.
//!
//! Each backend operation takes exactly one request record and answers with
//! exactly one response record. Byte payloads travel as JSON arrays of
//! numbers, matching the rest of the protocol.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::caps::Capability;
use crate::worker::WorkerRecord;

/// Target platform of an image or a worker.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Platform {
	pub os: String,
	pub architecture: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub variant: String,
}

impl Platform {
	pub fn new(os: impl Into<String>, architecture: impl Into<String>) -> Self {
		Self {
			os: os.into(),
			architecture: architecture.into(),
			variant: String::new(),
		}
	}
}

/// Serialized build graph.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Definition {
	/// Marshalled graph vertices, one entry per operation.
	#[serde(default)]
	pub def: Vec<Vec<u8>>,
	/// Per-vertex metadata keyed by vertex digest.
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub metadata: BTreeMap<String, BTreeMap<String, String>>,
}

/// File metadata returned by stat and directory listings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stat {
	pub path: String,
	pub mode: u32,
	pub uid: u32,
	pub gid: u32,
	pub size: i64,
	/// Modification time in nanoseconds since the Unix epoch.
	pub mod_time: i64,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub linkname: String,
}

/// Status carried by a failed build result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RpcStatus {
	pub code: i32,
	pub message: String,
}

/// Result of a frontend solve: one or more references plus metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BuildResult {
	/// Single result reference, when the solve produced one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reference: Option<String>,
	/// Named result references (multi-platform builds).
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub refs: BTreeMap<String, String>,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub metadata: BTreeMap<String, Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveImageConfigRequest {
	pub reference: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub platform: Option<Platform>,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub resolve_mode: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub log_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResolveImageConfigResponse {
	pub reference: String,
	pub digest: String,
	#[serde(default)]
	pub config: Vec<u8>,
}

/// Source operation whose metadata is being resolved.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceOp {
	pub identifier: String,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub attrs: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveSourceMetaRequest {
	pub source: SourceOp,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub platform: Option<Platform>,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub log_name: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub resolve_mode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveSourceMetaResponse {
	pub source: SourceOp,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub image_digest: Option<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub image_config: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub definition: Option<Definition>,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub frontend: String,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub frontend_opt: BTreeMap<String, String>,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub frontend_inputs: BTreeMap<String, Definition>,
	#[serde(default)]
	pub allow_result_return: bool,
	#[serde(default)]
	pub allow_result_array_ref: bool,
	/// Evaluate the result eagerly instead of returning a lazy reference.
	#[serde(default)]
	pub evaluate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SolveResponse {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result: Option<BuildResult>,
}

/// Byte range of a file read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRange {
	pub offset: i64,
	pub length: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadFileRequest {
	#[serde(rename = "ref")]
	pub reference: String,
	pub file_path: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub range: Option<FileRange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReadFileResponse {
	#[serde(default)]
	pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadDirRequest {
	#[serde(rename = "ref")]
	pub reference: String,
	pub dir_path: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub include_pattern: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReadDirResponse {
	#[serde(default)]
	pub entries: Vec<Stat>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatFileRequest {
	#[serde(rename = "ref")]
	pub reference: String,
	pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatFileResponse {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stat: Option<Stat>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EvaluateRequest {
	#[serde(rename = "ref")]
	pub reference: String,
}

/// Empty acknowledgement that a reference has been evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EvaluateResponse {}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PingRequest {}

/// Backend handshake: advertised capabilities and known workers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PongResponse {
	#[serde(default)]
	pub framework_caps: Vec<Capability>,
	#[serde(default)]
	pub llb_caps: Vec<Capability>,
	#[serde(default)]
	pub workers: Vec<WorkerRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReturnRequest {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result: Option<BuildResult>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<RpcStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReturnResponse {}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputsRequest {}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputsResponse {
	#[serde(default)]
	pub definitions: BTreeMap<String, Definition>,
}

/// Mount of a build reference into a gateway container.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mount {
	pub dest: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub result_id: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub selector: String,
	#[serde(default)]
	pub readonly: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContainerRequest {
	pub container_id: String,
	#[serde(default)]
	pub mounts: Vec<Mount>,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub network: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub platform: Option<Platform>,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub hostname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewContainerResponse {}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseContainerRequest {
	pub container_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReleaseContainerResponse {}

/// Process to start inside a gateway container.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProcessMeta {
	pub args: Vec<String>,
	#[serde(default)]
	pub env: Vec<String>,
	#[serde(default)]
	pub cwd: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub user: String,
	#[serde(default)]
	pub tty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecProcessRequest {
	pub container_id: String,
	pub process_id: String,
	pub meta: ProcessMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecProcessResponse {
	pub process_id: String,
	/// Exit code, present once the process has terminated.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub exit_code: Option<u32>,
}

/// Build warning attached to a graph vertex.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WarnRequest {
	pub digest: String,
	pub level: i64,
	#[serde(default)]
	pub short: Vec<u8>,
	#[serde(default)]
	pub detail: Vec<Vec<u8>>,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WarnResponse {}
