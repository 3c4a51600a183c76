//! Per-call context: outgoing metadata, deadline and cancellation.
//!
//! A [`CallContext`] is cheap to clone and immutable from the caller's point
//! of view: [`append_metadata`](CallContext::append_metadata) and friends
//! return a derived context, so tagging a call never leaks into sibling calls
//! issued with the original context.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Metadata key carrying the build identifier of a gateway call.
pub const BUILD_ID_METADATA_KEY: &str = "buildkit-controlapi-buildid";

/// Ordered multi-map of outgoing call metadata.
pub type MetadataMap = IndexMap<String, Vec<String>>;

/// Context every gateway call is issued under.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
	metadata: Arc<MetadataMap>,
	deadline: Option<Instant>,
	cancel: CancellationToken,
}

impl CallContext {
	/// Creates a context with no metadata, no deadline and a fresh cancellation token.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns a context that is cancelled together with `token`.
	pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
		self.cancel = token;
		self
	}

	/// Returns a context bounded by `deadline`. An earlier existing deadline wins.
	pub fn with_deadline(mut self, deadline: Instant) -> Self {
		self.deadline = Some(match self.deadline {
			Some(current) if current < deadline => current,
			_ => deadline,
		});
		self
	}

	/// Returns a context bounded by `timeout` from now.
	pub fn with_timeout(self, timeout: Duration) -> Self {
		self.with_deadline(Instant::now() + timeout)
	}

	/// Returns a derived context with `value` appended under `key`.
	pub fn append_metadata(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
		let mut metadata = (*self.metadata).clone();
		metadata.entry(key.into()).or_default().push(value.into());
		Self {
			metadata: Arc::new(metadata),
			deadline: self.deadline,
			cancel: self.cancel.clone(),
		}
	}

	/// Returns a derived context tagged with `build_id`.
	pub fn with_build_id(&self, build_id: &str) -> Self {
		self.append_metadata(BUILD_ID_METADATA_KEY, build_id)
	}

	/// Build identifiers attached to this context, in append order.
	pub fn build_ids(&self) -> &[String] {
		self.metadata(BUILD_ID_METADATA_KEY)
	}

	/// Values attached under `key`.
	pub fn metadata(&self, key: &str) -> &[String] {
		self.metadata.get(key).map(Vec::as_slice).unwrap_or_default()
	}

	/// All outgoing metadata.
	pub fn metadata_map(&self) -> &MetadataMap {
		&self.metadata
	}

	pub fn deadline(&self) -> Option<Instant> {
		self.deadline
	}

	/// Token observed by every call issued under this context.
	pub fn cancellation(&self) -> &CancellationToken {
		&self.cancel
	}

	/// Cancels this context and every context derived from it.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Drives `call` to completion unless the context is cancelled or its
	/// deadline passes first; in both cases `call` is dropped.
	pub async fn run<T, F>(&self, call: F) -> Result<T>
	where
		F: Future<Output = Result<T>>,
	{
		if self.cancel.is_cancelled() {
			return Err(Error::Cancelled);
		}

		let bounded = async {
			match self.deadline {
				Some(deadline) => tokio::time::timeout_at(deadline, call).await.map_err(|_| Error::DeadlineExceeded)?,
				None => call.await,
			}
		};

		tokio::select! {
			biased;
			_ = self.cancel.cancelled() => Err(Error::Cancelled),
			result = bounded => result,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn append_does_not_touch_original() {
		let base = CallContext::new();
		let tagged = base.with_build_id("b1");

		assert!(base.build_ids().is_empty());
		assert_eq!(tagged.build_ids(), ["b1".to_string()]);
	}

	#[test]
	fn repeated_keys_accumulate_in_order() {
		let ctx = CallContext::new().append_metadata("k", "a").append_metadata("k", "b");
		assert_eq!(ctx.metadata("k"), ["a".to_string(), "b".to_string()]);
		assert!(ctx.metadata("missing").is_empty());
	}

	#[test]
	fn earlier_deadline_wins() {
		let now = Instant::now();
		let ctx = CallContext::new()
			.with_deadline(now + Duration::from_secs(1))
			.with_deadline(now + Duration::from_secs(10));
		assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(1)));
	}

	#[tokio::test]
	async fn run_returns_call_result() {
		let ctx = CallContext::new();
		let value = ctx.run(async { Ok::<_, Error>(7) }).await.unwrap();
		assert_eq!(value, 7);
	}

	#[tokio::test]
	async fn run_aborts_on_cancellation() {
		let ctx = CallContext::new();
		let derived = ctx.with_build_id("b1");
		ctx.cancel();

		let err = derived.run(std::future::pending::<Result<()>>()).await.unwrap_err();
		assert!(matches!(err, Error::Cancelled));
	}

	#[tokio::test(start_paused = true)]
	async fn run_aborts_on_deadline() {
		let ctx = CallContext::new().with_timeout(Duration::from_millis(50));
		let err = ctx.run(std::future::pending::<Result<()>>()).await.unwrap_err();
		assert!(matches!(err, Error::DeadlineExceeded));
	}
}
