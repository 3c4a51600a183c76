//! Worker records from the control API and their build-facing projection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::gateway::Platform;

/// Garbage-collection policy entry reported for a worker.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcPolicy {
	#[serde(default)]
	pub all: bool,
	#[serde(default)]
	pub keep_bytes: i64,
	#[serde(default)]
	pub filters: Vec<String>,
}

/// Worker as listed by the backend's control API.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerRecord {
	#[serde(rename = "ID")]
	pub id: String,
	#[serde(default)]
	pub labels: BTreeMap<String, String>,
	#[serde(default)]
	pub platforms: Vec<Platform>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub gc_policy: Vec<GcPolicy>,
	/// Version string of the executor backing this worker.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListWorkersRequest {
	/// Label filters, each `key==value`; empty lists every worker.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub filter: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListWorkersResponse {
	#[serde(default)]
	pub record: Vec<WorkerRecord>,
}

/// Read-only worker snapshot handed to a build routine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkerInfo {
	pub id: String,
	pub labels: BTreeMap<String, String>,
	pub platforms: Vec<Platform>,
}

impl From<WorkerRecord> for WorkerInfo {
	fn from(record: WorkerRecord) -> Self {
		Self {
			id: record.id,
			labels: record.labels,
			platforms: record.platforms,
		}
	}
}
