//! Client configuration.

use std::time::Duration;

use buildgate_runtime::Result;
use serde::{Deserialize, Serialize};

/// Product name reported when neither the caller nor the config names one.
pub const EXPORTED_PRODUCT: &str = "buildgate";

/// Settings shared by every build a [`Client`](crate::Client) runs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
	/// Product name used when a build is started without one.
	pub product: Option<String>,
	/// Upper bound on a build's duration when the caller sets no deadline.
	pub build_timeout_ms: Option<u64>,
}

impl ClientConfig {
	pub fn from_json(json: &str) -> Result<Self> {
		Ok(serde_json::from_str(json)?)
	}

	pub fn build_timeout(&self) -> Option<Duration> {
		self.build_timeout_ms.map(Duration::from_millis)
	}

	/// Returns `product` unless empty, then the configured product, then [`EXPORTED_PRODUCT`].
	pub fn resolve_product(&self, product: &str) -> String {
		if !product.is_empty() {
			return product.to_string();
		}
		match self.product.as_deref() {
			Some(configured) if !configured.is_empty() => configured.to_string(),
			_ => EXPORTED_PRODUCT.to_string(),
		}
	}
}
