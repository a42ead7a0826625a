//! Error types for the controller RPC layer.

use std::time::Duration;

use thiserror::Error;

use super::RequestId;

/// Errors raised while talking to the controller.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RpcError {
    /// Raised when the background transport loop cannot be observed running.
    #[error("transport loop failed to start: {message}")]
    Bootstrap {
        /// Description of the startup failure.
        message: String,
    },
    /// Raised when a request cannot be submitted or the transport drops it.
    #[error("transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },
    /// Raised when no response arrives before the deadline.
    #[error("{operation} request {request_id} timed out after {timeout:?}")]
    Timeout {
        /// Operation that was requested.
        operation: &'static str,
        /// Correlation identifier of the request.
        request_id: RequestId,
        /// Deadline that elapsed.
        timeout: Duration,
    },
    /// Raised when the controller reports failure.
    #[error("{operation} request {request_id} failed: {detail}")]
    Rejected {
        /// Operation that was requested.
        operation: &'static str,
        /// Correlation identifier of the request.
        request_id: RequestId,
        /// Failure detail returned by the controller.
        detail: String,
    },
    /// Raised when the transport delivers a response for another request.
    #[error("response {received} does not match request {expected}")]
    Correlation {
        /// Identifier of the request that was waiting.
        expected: RequestId,
        /// Identifier carried by the delivered response.
        received: RequestId,
    },
}
