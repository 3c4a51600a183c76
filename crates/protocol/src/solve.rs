//! Solve options, build responses and status events.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Output destination for a finished build.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExportEntry {
	/// Exporter name, e.g. `image` or `local`.
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub attrs: BTreeMap<String, String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub output_dir: Option<String>,
}

/// Cache import or export source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheOptionsEntry {
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub attrs: BTreeMap<String, String>,
}

/// Per-build options supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveOpt {
	#[serde(default)]
	pub exports: Vec<ExportEntry>,
	/// Named frontend for the backend to resolve; empty when the caller
	/// drives the build itself.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub frontend: String,
	#[serde(default)]
	pub frontend_attrs: BTreeMap<String, String>,
	#[serde(default)]
	pub cache_imports: Vec<CacheOptionsEntry>,
	#[serde(default)]
	pub cache_exports: Vec<CacheOptionsEntry>,
	/// Key used to share session resources between builds.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub shared_key: String,
}

/// Final result of a build as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResponse {
	#[serde(default)]
	pub exporter_response: BTreeMap<String, String>,
}

/// Progress of one graph vertex.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VertexStatus {
	pub digest: String,
	pub name: String,
	#[serde(default)]
	pub cached: bool,
	#[serde(default)]
	pub completed: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

/// Output line produced by a vertex.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VertexLog {
	pub vertex: String,
	pub stream: i32,
	#[serde(default)]
	pub data: Vec<u8>,
}

/// Batch of build progress events.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SolveStatus {
	#[serde(default)]
	pub vertexes: Vec<VertexStatus>,
	#[serde(default)]
	pub logs: Vec<VertexLog>,
}
