//! Capability set negotiated with the backend at session start.

use buildgate_protocol::{CapId, Capability};
use indexmap::IndexMap;
use tracing::debug;

use crate::error::{Error, Result};

/// Immutable record of the capabilities a backend advertised.
///
/// Populated once from the handshake and never mutated afterwards, so it can
/// be shared freely between concurrent callers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
	caps: IndexMap<CapId, Capability>,
}

impl CapabilitySet {
	/// Builds a set from handshake entries. Later duplicates replace earlier ones
	/// but keep the first entry's position.
	pub fn new(caps: impl IntoIterator<Item = Capability>) -> Self {
		Self {
			caps: caps.into_iter().map(|cap| (cap.id.clone(), cap)).collect(),
		}
	}

	/// Fails with [`Error::CapabilityUnsupported`] unless `id` was advertised and is enabled.
	pub fn supports(&self, id: &CapId) -> Result<()> {
		let Some(cap) = self.caps.get(id) else {
			return Err(Error::CapabilityUnsupported {
				cap: id.clone(),
				detail: None,
			});
		};

		if !cap.enabled {
			return Err(Error::CapabilityUnsupported {
				cap: id.clone(),
				detail: Some(disabled_detail(cap)),
			});
		}

		if cap.deprecated {
			debug!(target = "buildgate.caps", cap = %id, "using deprecated capability");
		}
		Ok(())
	}

	/// Returns true if `id` was advertised, enabled or not.
	pub fn contains(&self, id: &CapId) -> bool {
		self.caps.contains_key(id)
	}

	pub fn get(&self, id: &CapId) -> Option<&Capability> {
		self.caps.get(id)
	}

	/// Handshake entries in advertised order.
	pub fn iter(&self) -> impl Iterator<Item = &Capability> {
		self.caps.values()
	}

	pub fn len(&self) -> usize {
		self.caps.len()
	}

	pub fn is_empty(&self) -> bool {
		self.caps.is_empty()
	}
}

impl FromIterator<Capability> for CapabilitySet {
	fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
		Self::new(iter)
	}
}

fn disabled_detail(cap: &Capability) -> String {
	let mut detail = String::from("disabled");
	if !cap.disabled_reason.is_empty() {
		detail.push_str(&format!(" ({})", cap.disabled_reason));
	}
	if !cap.disabled_reason_msg.is_empty() {
		detail.push_str(&format!(": {}", cap.disabled_reason_msg));
	}
	if !cap.disabled_alternative.is_empty() {
		detail.push_str(&format!("; use {} instead", cap.disabled_alternative));
	}
	detail
}
