//! Progress stream handed to the solver for one build.

use std::sync::Arc;

use buildgate_protocol::SolveStatus;
use buildgate_runtime::{Error, Result};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

/// Shared sending half of a build's status channel.
///
/// Clones share one slot. Once the build finishes the slot is emptied, which
/// drops the sender and lets the receiver observe the end of the stream.
#[derive(Debug, Clone)]
pub struct StatusWriter {
	slot: Arc<Mutex<Option<mpsc::Sender<SolveStatus>>>>,
}

impl StatusWriter {
	pub(crate) fn new(tx: mpsc::Sender<SolveStatus>) -> (Self, StatusCloser) {
		let slot = Arc::new(Mutex::new(Some(tx)));
		(Self { slot: Arc::clone(&slot) }, StatusCloser { slot })
	}

	/// Sends one status update. Fails with [`Error::ChannelClosed`] once the
	/// build has finished or the receiver went away.
	pub async fn send(&self, status: SolveStatus) -> Result<()> {
		let Some(tx) = self.slot.lock().clone() else {
			return Err(Error::ChannelClosed);
		};
		tx.send(status).await.map_err(|_| Error::ChannelClosed)
	}

	pub fn is_closed(&self) -> bool {
		self.slot.lock().as_ref().is_none_or(mpsc::Sender::is_closed)
	}
}

/// Closes the status channel when dropped, whichever way the build exits.
#[derive(Debug)]
pub(crate) struct StatusCloser {
	slot: Arc<Mutex<Option<mpsc::Sender<SolveStatus>>>>,
}

impl Drop for StatusCloser {
	fn drop(&mut self) {
		if self.slot.lock().take().is_some() {
			debug!(target = "buildgate.build", "status channel closed");
		}
	}
}
