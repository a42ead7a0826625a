//! Request/response engine for talking to the controller.
//!
//! Every remote call is correlated by a [`RequestId`], submitted through a
//! [`Transport`] and awaited until the matching [`Response`] arrives or the
//! call's timeout elapses. Responses are delivered by a background loop that
//! [`LoopManager`] starts before the first call.

mod correlator;
mod error;
mod event_loop;
mod tcp;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::messages::ControllerRequest;

pub use correlator::RequestCorrelator;
pub use error::RpcError;
pub use event_loop::{EventLoop, LOOP_THREAD_NAME, LoopManager, ReadySignal};
pub use tcp::{Credentials, TcpTransport};

/// Default bound on how long a call waits for its response.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Correlation token pairing a request with its response.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlated request handed to the transport.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Correlation identifier.
    pub id: RequestId,
    /// Message for the controller.
    pub payload: ControllerRequest,
}

/// Correlated response delivered by the transport.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Identifier of the request this answers.
    pub id: RequestId,
    /// Whether the controller carried out the request.
    pub success: bool,
    /// Result payload, or failure detail when `success` is false.
    #[serde(default)]
    pub result: Value,
}

/// Receiver resolved with the response to a submitted request.
pub type PendingResponse = oneshot::Receiver<Response>;

/// Submission half of the transport to the controller.
pub trait Transport: Send + Sync {
    /// Submits a request. The returned receiver resolves with the response
    /// carrying the same identifier; it errors if the transport gives up on
    /// the request.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Transport`] when the request cannot be submitted.
    fn submit(&self, request: Request) -> Result<PendingResponse, RpcError>;

    /// Withdraws interest in a request whose caller stopped waiting.
    fn cancel(&self, _request_id: RequestId) {}
}

/// Issues correlated, timeout-bound calls to the controller.
#[derive(Debug)]
pub struct RpcClient<T> {
    transport: T,
    correlator: Arc<RequestCorrelator>,
    default_timeout: Duration,
}

impl<T: Transport> RpcClient<T> {
    /// Ensures the transport loop is running and builds a client.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Bootstrap`] when the loop cannot be started.
    pub async fn connect<L: EventLoop>(
        transport: T,
        loop_manager: &LoopManager<L>,
        correlator: Arc<RequestCorrelator>,
    ) -> Result<Self, RpcError> {
        loop_manager.ensure_running().await?;
        Ok(Self {
            transport,
            correlator,
            default_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Overrides the timeout applied to calls that do not specify one.
    #[must_use]
    pub const fn with_default_timeout(mut self, default_timeout: Duration) -> Self {
        self.default_timeout = default_timeout;
        self
    }

    /// Returns the underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends `payload` and waits for the controller's answer.
    ///
    /// `timeout` bounds the wait; `None` applies the client's default. The
    /// call is attempted once and never retried.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Timeout`] when no response arrives in time,
    /// [`RpcError::Rejected`] when the controller reports failure, and
    /// [`RpcError::Transport`] or [`RpcError::Correlation`] when delivery
    /// breaks down.
    pub async fn call(
        &self,
        payload: ControllerRequest,
        timeout: Option<Duration>,
    ) -> Result<Value, RpcError> {
        let operation = payload.operation();
        let wait = timeout.unwrap_or(self.default_timeout);
        let request_id = self.correlator.next_id();

        info!(
            %request_id,
            operation,
            resource = payload.resource_name(),
            payload = %payload,
            "sending request"
        );
        let pending = self.transport.submit(Request {
            id: request_id,
            payload,
        })?;

        let response = match tokio::time::timeout(wait, pending).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                warn!(%request_id, operation, "transport dropped request");
                return Err(RpcError::Transport {
                    message: format!("request {request_id} dropped before a response arrived"),
                });
            }
            Err(_) => {
                self.transport.cancel(request_id);
                warn!(%request_id, operation, timeout = ?wait, "request timed out");
                return Err(RpcError::Timeout {
                    operation,
                    request_id,
                    timeout: wait,
                });
            }
        };

        if response.id != request_id {
            return Err(RpcError::Correlation {
                expected: request_id,
                received: response.id,
            });
        }

        if !response.success {
            warn!(%request_id, operation, detail = %response.result, "request failed");
            return Err(RpcError::Rejected {
                operation,
                request_id,
                detail: render_detail(&response.result),
            });
        }

        info!(%request_id, operation, result = %response.result, "request succeeded");
        Ok(response.result)
    }
}

fn render_detail(result: &Value) -> String {
    match result {
        Value::String(message) => message.clone(),
        other => other.to_string(),
    }
}
