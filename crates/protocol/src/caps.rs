//! Capability identifiers and handshake records.
//!
//! A backend advertises the optional features it implements as a list of
//! [`Capability`] records when a build session starts. Clients gate calls on
//! the [`CapId`]s they depend on.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of an optional backend feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapId(Cow<'static, str>);

impl CapId {
	/// Creates an identifier from a static string, usable in `const` items.
	pub const fn from_static(id: &'static str) -> Self {
		Self(Cow::Borrowed(id))
	}

	/// Creates an identifier from an owned string.
	pub fn new(id: impl Into<String>) -> Self {
		Self(Cow::Owned(id.into()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for CapId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for CapId {
	fn from(id: &str) -> Self {
		Self::new(id)
	}
}

impl From<String> for CapId {
	fn from(id: String) -> Self {
		Self::new(id)
	}
}

/// Listing directory entries of a build reference.
pub const CAP_READ_DIR: CapId = CapId::from_static("readdir");
/// Stat of a single path inside a build reference.
pub const CAP_STAT_FILE: CapId = CapId::from_static("statfile");
/// Forcing evaluation of a lazy build reference.
pub const CAP_GATEWAY_EVALUATE: CapId = CapId::from_static("gateway.evaluate");
/// Listing the inputs passed to the frontend.
pub const CAP_FRONTEND_INPUTS: CapId = CapId::from_static("frontend.inputs");
/// Creating containers and executing processes in them.
pub const CAP_GATEWAY_EXEC: CapId = CapId::from_static("gateway.exec");

/// One entry of the backend's capability handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capability {
	/// Capability identifier.
	#[serde(rename = "ID")]
	pub id: CapId,
	/// Whether the backend currently allows use of the capability.
	#[serde(default = "enabled_by_default")]
	pub enabled: bool,
	/// Whether the capability is scheduled for removal.
	#[serde(default)]
	pub deprecated: bool,
	/// Short machine-readable reason the capability is disabled.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub disabled_reason: String,
	/// Human-readable explanation of why the capability is disabled.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub disabled_reason_msg: String,
	/// Capability to use instead while this one is disabled.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub disabled_alternative: String,
}

fn enabled_by_default() -> bool {
	true
}

impl Capability {
	/// An enabled, non-deprecated capability.
	pub fn enabled(id: CapId) -> Self {
		Self {
			id,
			enabled: true,
			deprecated: false,
			disabled_reason: String::new(),
			disabled_reason_msg: String::new(),
			disabled_alternative: String::new(),
		}
	}

	/// A capability the backend knows about but refuses to serve.
	pub fn disabled(id: CapId, reason: impl Into<String>) -> Self {
		Self {
			enabled: false,
			disabled_reason: reason.into(),
			..Self::enabled(id)
		}
	}
}
