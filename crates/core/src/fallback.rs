//! Capability gating and degraded substitutes for gateway operations.
//!
//! Each [`Operation`] is either ungated or gated on one capability. When a
//! gated operation's capability is missing, [`FallbackPolicy`] decides
//! whether another call with the same side effect can be issued instead.

use std::fmt;

use buildgate_protocol::{CAP_FRONTEND_INPUTS, CAP_GATEWAY_EVALUATE, CAP_GATEWAY_EXEC, CAP_READ_DIR, CAP_STAT_FILE, CapId};
use buildgate_runtime::{CapabilitySet, Result, methods};

/// Logical gateway operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
	ResolveImageConfig,
	ResolveSourceMeta,
	Solve,
	ReadFile,
	ReadDir,
	StatFile,
	Evaluate,
	Ping,
	Return,
	Inputs,
	NewContainer,
	ReleaseContainer,
	ExecProcess,
	Warn,
}

impl Operation {
	pub const ALL: [Operation; 14] = [
		Operation::ResolveImageConfig,
		Operation::ResolveSourceMeta,
		Operation::Solve,
		Operation::ReadFile,
		Operation::ReadDir,
		Operation::StatFile,
		Operation::Evaluate,
		Operation::Ping,
		Operation::Return,
		Operation::Inputs,
		Operation::NewContainer,
		Operation::ReleaseContainer,
		Operation::ExecProcess,
		Operation::Warn,
	];

	/// Capability the backend must advertise before this operation is forwarded.
	pub fn gate(self) -> Option<CapId> {
		match self {
			Operation::ReadDir => Some(CAP_READ_DIR),
			Operation::StatFile => Some(CAP_STAT_FILE),
			Operation::Evaluate => Some(CAP_GATEWAY_EVALUATE),
			Operation::Inputs => Some(CAP_FRONTEND_INPUTS),
			Operation::NewContainer | Operation::ReleaseContainer | Operation::ExecProcess => Some(CAP_GATEWAY_EXEC),
			Operation::ResolveImageConfig
			| Operation::ResolveSourceMeta
			| Operation::Solve
			| Operation::ReadFile
			| Operation::Ping
			| Operation::Return
			| Operation::Warn => None,
		}
	}

	/// Wire method name.
	pub fn method(self) -> &'static str {
		match self {
			Operation::ResolveImageConfig => methods::RESOLVE_IMAGE_CONFIG,
			Operation::ResolveSourceMeta => methods::RESOLVE_SOURCE_META,
			Operation::Solve => methods::SOLVE,
			Operation::ReadFile => methods::READ_FILE,
			Operation::ReadDir => methods::READ_DIR,
			Operation::StatFile => methods::STAT_FILE,
			Operation::Evaluate => methods::EVALUATE,
			Operation::Ping => methods::PING,
			Operation::Return => methods::RETURN,
			Operation::Inputs => methods::INPUTS,
			Operation::NewContainer => methods::NEW_CONTAINER,
			Operation::ReleaseContainer => methods::RELEASE_CONTAINER,
			Operation::ExecProcess => methods::EXEC_PROCESS,
			Operation::Warn => methods::WARN,
		}
	}
}

impl fmt::Display for Operation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.method())
	}
}

/// Call issued in place of an operation whose capability is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Substitute {
	/// Stat path `.` on the operation's reference. Forces the reference to
	/// be computed; the stat payload is discarded.
	StatRoot,
}

/// Degraded equivalent of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fallback {
	/// Capability that must be present for the substitute to be usable.
	pub probe: CapId,
	pub substitute: Substitute,
}

/// How a call should be forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
	/// Forward the requested operation itself.
	Direct,
	/// Forward the substitute instead.
	Substitute(Substitute),
}

/// Per-operation gating and fallback rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackPolicy;

impl FallbackPolicy {
	/// Degraded equivalent of `op`, if it has one.
	pub fn fallback(op: Operation) -> Option<Fallback> {
		match op {
			Operation::Evaluate => Some(Fallback {
				probe: CAP_STAT_FILE,
				substitute: Substitute::StatRoot,
			}),
			_ => None,
		}
	}

	/// Checks `op`'s gate only. A missing set means every gate passes.
	pub fn check(op: Operation, caps: Option<&CapabilitySet>) -> Result<()> {
		match (caps, op.gate()) {
			(Some(caps), Some(cap)) => caps.supports(&cap),
			_ => Ok(()),
		}
	}

	/// Decides how to forward `op`.
	///
	/// Fails with the gate's own `CapabilityUnsupported` error when the
	/// capability is missing and no usable fallback exists.
	pub fn route(op: Operation, caps: Option<&CapabilitySet>) -> Result<Route> {
		let Err(unsupported) = Self::check(op, caps) else {
			return Ok(Route::Direct);
		};

		match (caps, Self::fallback(op)) {
			(Some(caps), Some(fallback)) if caps.supports(&fallback.probe).is_ok() => Ok(Route::Substitute(fallback.substitute)),
			_ => Err(unsupported),
		}
	}
}
