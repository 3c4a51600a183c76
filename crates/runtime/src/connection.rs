//! JSON-RPC connection shared by every build session
//!
//! This module implements request/response correlation on top of a message
//! pipe owned by the transport. It handles:
//! - Generating unique request IDs
//! - Attaching the caller's outgoing metadata to each request
//! - Correlating responses with pending requests
//! - Cleaning up pending requests whose caller gave up
//!
//! # Message Flow
//!
//! 1. A client calls `send_message()` with method, params and a [`CallContext`]
//! 2. Connection generates a unique ID and creates a oneshot channel
//! 3. The request is queued on the outbound pipe
//! 4. The client awaits the oneshot receiver, bounded by its context
//! 5. The dispatch loop receives the response from the inbound pipe
//! 6. The response is correlated by ID and sent via the oneshot channel
//!
//! Many sessions share one [`Connection`]; none of them can block another,
//! and the connection never retries a call.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::task::{Context, Poll};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex as TokioMutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::context::{CallContext, MetadataMap};
use crate::error::{Error, Result};

/// Interface the gateway clients need from a shared connection.
///
/// Object safe so that one `Arc<dyn ConnectionLike>` can be handed to every
/// session multiplexed on the connection.
pub trait ConnectionLike: Send + Sync {
	/// Send a call to the backend and await its response, bounded by `ctx`.
	fn send_message<'a>(&'a self, method: &'a str, params: Value, ctx: &'a CallContext) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>>;
}

/// Request sent to the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
	/// Unique request ID for correlating responses
	pub id: u32,
	/// Fully qualified method name, e.g. `gateway.StatFile`
	pub method: String,
	/// Method parameters as JSON object
	pub params: Value,
	/// Outgoing call metadata (build id and friends)
	#[serde(default, skip_serializing_if = "MetadataMap::is_empty")]
	pub metadata: MetadataMap,
}

/// Response received from the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
	/// Request ID this response correlates to
	pub id: u32,
	/// Success result (mutually exclusive with error)
	#[serde(skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	/// Error result (mutually exclusive with result)
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<ErrorPayload>,
}

/// Backend error details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
	/// Status code, `2` (unknown) when the backend omits it
	#[serde(default = "unknown_code")]
	pub code: i32,
	/// Error message
	pub message: String,
}

fn unknown_code() -> i32 {
	2
}

/// Discriminated union of inbound messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
	/// Response message (has `id` field)
	Response(Response),
	/// Unknown message type (forward-compatible catch-all)
	Unknown(Value),
}

/// Pending request callbacks keyed by request ID.
type CallbackMap = Arc<TokioMutex<HashMap<u32, oneshot::Sender<Result<Value>>>>>;

/// RAII guard ensuring callback cleanup when a request future is dropped.
struct CancelGuard {
	id: u32,
	callbacks: CallbackMap,
	completed: bool,
}

impl CancelGuard {
	fn new(id: u32, callbacks: CallbackMap) -> Self {
		Self {
			id,
			callbacks,
			completed: false,
		}
	}

	fn complete(&mut self) {
		self.completed = true;
	}
}

impl Drop for CancelGuard {
	fn drop(&mut self) {
		if self.completed {
			return;
		}

		let id = self.id;
		let callbacks = Arc::clone(&self.callbacks);

		if let Ok(handle) = tokio::runtime::Handle::try_current() {
			handle.spawn(async move {
				if callbacks.lock().await.remove(&id).is_some() {
					debug!(target = "buildgate.connection", id, "removed orphaned callback");
				}
			});
		} else if let Ok(mut pending) = callbacks.try_lock() {
			if pending.remove(&id).is_some() {
				debug!(target = "buildgate.connection", id, "removed orphaned callback outside runtime");
			}
		}
	}
}

/// Future returned by [`Connection::send_message`] with automatic cancellation cleanup.
struct ResponseFuture {
	rx: oneshot::Receiver<Result<Value>>,
	guard: CancelGuard,
}

impl Future for ResponseFuture {
	type Output = Result<Value>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match Pin::new(&mut self.rx).poll(cx) {
			Poll::Ready(result) => {
				self.guard.complete();
				Poll::Ready(result.map_err(|_| Error::ChannelClosed).and_then(|r| r))
			}
			Poll::Pending => Poll::Pending,
		}
	}
}

/// Multiplexed JSON-RPC connection to the build backend.
///
/// The transport pumps serialized messages through the two pipes passed to
/// [`Connection::new`]; this type only correlates them.
pub struct Connection {
	/// Sequential request ID counter (atomic for thread safety)
	last_id: AtomicU32,
	/// Pending request callbacks keyed by request ID
	callbacks: CallbackMap,
	/// Outbound pipe towards the transport writer
	outbound_tx: mpsc::UnboundedSender<Value>,
	/// Inbound pipe from the transport reader (taken by run())
	inbound_rx: TokioMutex<Option<mpsc::UnboundedReceiver<Value>>>,
	/// Set once the inbound pipe has closed; no response can arrive after that
	closed: AtomicBool,
}

impl Connection {
	/// Create a connection over the transport's outbound and inbound pipes.
	pub fn new(outbound_tx: mpsc::UnboundedSender<Value>, inbound_rx: mpsc::UnboundedReceiver<Value>) -> Self {
		Self {
			last_id: AtomicU32::new(0),
			callbacks: Arc::new(TokioMutex::new(HashMap::new())),
			outbound_tx,
			inbound_rx: TokioMutex::new(Some(inbound_rx)),
			closed: AtomicBool::new(false),
		}
	}

	/// Sends a call to the backend and awaits the response.
	///
	/// Dropping the returned future (including through `ctx` cancellation or
	/// deadline) removes the pending entry; a late response is then ignored.
	pub async fn send_message(&self, method: &str, params: Value, ctx: &CallContext) -> Result<Value> {
		if ctx.is_cancelled() {
			return Err(Error::Cancelled);
		}

		let id = self.last_id.fetch_add(1, Ordering::SeqCst);
		debug!(target = "buildgate.connection", id, method, "sending request");

		let (tx, rx) = oneshot::channel();
		self.callbacks.lock().await.insert(id, tx);

		let mut guard = CancelGuard::new(id, Arc::clone(&self.callbacks));

		// Checked after the insert: run() sets the flag before draining, so
		// either the drain fails this entry or the flag is already visible.
		if self.closed.load(Ordering::SeqCst) {
			self.callbacks.lock().await.remove(&id);
			guard.complete();
			return Err(Error::ChannelClosed);
		}

		let request = Request {
			id,
			method: method.to_string(),
			params,
			metadata: ctx.metadata_map().clone(),
		};

		let request_value = serde_json::to_value(&request)?;

		if self.outbound_tx.send(request_value).is_err() {
			error!(target = "buildgate.connection", "failed to queue request: outbound pipe closed");
			return Err(Error::ChannelClosed);
		}

		ctx.run(ResponseFuture { rx, guard }).await
	}

	/// Number of requests still awaiting a response.
	pub async fn pending(&self) -> usize {
		self.callbacks.lock().await.len()
	}

	/// Run the inbound dispatch loop until the transport closes the pipe.
	///
	/// Every call still pending when the pipe closes, and every call issued
	/// afterwards, fails with [`Error::ChannelClosed`].
	pub async fn run(&self) -> Result<()> {
		let mut inbound_rx = self
			.inbound_rx
			.lock()
			.await
			.take()
			.ok_or_else(|| Error::ProtocolError("connection dispatch loop already running".to_string()))?;

		while let Some(message_value) = inbound_rx.recv().await {
			match serde_json::from_value::<Message>(message_value) {
				Ok(message) => {
					if let Err(e) = self.dispatch(message).await {
						error!(target = "buildgate.connection", "error dispatching message: {}", e);
					}
				}
				Err(e) => {
					error!(target = "buildgate.connection", "failed to parse message: {}", e);
				}
			}
		}

		self.closed.store(true, Ordering::SeqCst);
		let orphaned: Vec<_> = self.callbacks.lock().await.drain().collect();
		if !orphaned.is_empty() {
			warn!(target = "buildgate.connection", pending = orphaned.len(), "inbound pipe closed with calls in flight");
		}
		for (_, callback) in orphaned {
			let _ = callback.send(Err(Error::ChannelClosed));
		}
		Ok(())
	}

	/// Dispatch one inbound message.
	pub async fn dispatch(&self, message: Message) -> Result<()> {
		match message {
			Message::Response(response) => {
				let callback = self
					.callbacks
					.lock()
					.await
					.remove(&response.id)
					.ok_or_else(|| Error::ProtocolError(format!("Cannot find request to respond: id={}", response.id)))?;

				let result = match response.error {
					Some(payload) => Err(parse_remote_error(payload)),
					None => Ok(response.result.unwrap_or(Value::Null)),
				};

				let _ = callback.send(result);
				Ok(())
			}
			Message::Unknown(value) => {
				debug!(
					target = "buildgate.connection",
					"unknown message type (forward-compatible, ignored): {}",
					serde_json::to_string(&value).unwrap_or_else(|_| "<serialization failed>".to_string())
				);
				Ok(())
			}
		}
	}
}

/// Converts a backend [`ErrorPayload`] into [`Error::Remote`].
fn parse_remote_error(payload: ErrorPayload) -> Error {
	Error::Remote {
		code: payload.code,
		message: payload.message,
	}
}

impl ConnectionLike for Connection {
	fn send_message<'a>(&'a self, method: &'a str, params: Value, ctx: &'a CallContext) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>> {
		Box::pin(Connection::send_message(self, method, params, ctx))
	}
}
