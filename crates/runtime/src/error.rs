//! Error types for the gateway runtime.

use buildgate_protocol::CapId;
use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while issuing gateway calls or running a build.
#[derive(Debug, Error)]
pub enum Error {
	/// The backend did not advertise (or has disabled) a required capability.
	#[error("requested feature {cap} is not supported by the build backend{}", detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
	CapabilityUnsupported {
		cap: CapId,
		/// Disabled reason and alternative, when the backend sent them.
		detail: Option<String>,
	},

	/// Listing workers before a build failed.
	#[error("listing workers for Build: {source}")]
	WorkerListing {
		#[source]
		source: Box<Error>,
	},

	/// The caller-supplied build routine returned an error.
	#[error("failed to run Build function: {source}")]
	BuildFunction {
		#[source]
		source: anyhow::Error,
	},

	/// Error reported by the backend for a call.
	#[error("{message} (code {code})")]
	Remote {
		/// Backend status code.
		code: i32,
		/// Human-readable error message.
		message: String,
	},

	/// The call's context was cancelled before the backend answered.
	#[error("call cancelled")]
	Cancelled,

	/// The call's deadline passed before the backend answered.
	#[error("deadline exceeded")]
	DeadlineExceeded,

	/// The shared connection or a status stream closed.
	#[error("Channel closed unexpectedly")]
	ChannelClosed,

	/// Protocol-level error (JSON-RPC framing or correlation).
	#[error("Protocol error: {0}")]
	ProtocolError(String),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns the capability id if this is a gating failure.
	pub fn unsupported_cap(&self) -> Option<&CapId> {
		match self {
			Error::CapabilityUnsupported { cap, .. } => Some(cap),
			_ => None,
		}
	}

	/// Returns true if the call was aborted by its context, including when
	/// the abort happened while listing workers.
	pub fn is_cancelled(&self) -> bool {
		match self {
			Error::Cancelled | Error::DeadlineExceeded => true,
			Error::WorkerListing { source } => source.is_cancelled(),
			_ => false,
		}
	}
}
