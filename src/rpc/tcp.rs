//! Newline-delimited JSON transport over a single TCP connection.
//!
//! The same [`TcpTransport`] value is both the [`Transport`] used by clients
//! and the [`EventLoop`] run by the [`super::LoopManager`]: clones share the
//! connection state. Outbound frames are tagged by `kind`; every inbound line
//! is a [`Response`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::{
    EventLoop, PendingResponse, ReadySignal, Request, RequestId, Response, RpcError, Transport,
};

/// Credentials presented when the connection opens.
#[derive(Clone, Eq, PartialEq)]
pub struct Credentials {
    /// User name.
    pub user: String,
    /// Password.
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum OutboundFrame<'a> {
    Connect { user: &'a str, password: &'a str },
    Request(&'a Request),
}

#[derive(Debug)]
struct Shared {
    endpoint: String,
    credentials: Option<Credentials>,
    pending: Mutex<HashMap<RequestId, oneshot::Sender<Response>>>,
    outbound: Mutex<Option<mpsc::UnboundedSender<Request>>>,
    running: AtomicBool,
}

/// Transport that exchanges JSON lines with the controller's message endpoint.
#[derive(Clone, Debug)]
pub struct TcpTransport {
    shared: Arc<Shared>,
}

impl TcpTransport {
    /// Creates a transport for `endpoint` (`host:port`). No connection is
    /// made until the loop runs.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, credentials: Option<Credentials>) -> Self {
        Self {
            shared: Arc::new(Shared {
                endpoint: endpoint.into(),
                credentials,
                pending: Mutex::new(HashMap::new()),
                outbound: Mutex::new(None),
                running: AtomicBool::new(false),
            }),
        }
    }

    /// Returns the configured endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.shared.endpoint
    }

    /// Number of requests still waiting for a response.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.shared.pending.lock().len()
    }

    async fn serve(&self, ready: ReadySignal) {
        let endpoint = self.endpoint();
        let stream = match TcpStream::connect(endpoint).await {
            Ok(stream) => stream,
            Err(err) => {
                error!(endpoint, error = %err, "failed to connect to controller");
                return;
            }
        };
        if let Err(err) = stream.set_nodelay(true) {
            warn!(error = %err, "failed to set nodelay for connection");
        }
        let (read_half, mut write_half) = stream.into_split();

        if let Some(credentials) = &self.shared.credentials {
            let hello = OutboundFrame::Connect {
                user: &credentials.user,
                password: &credentials.password,
            };
            if let Err(err) = write_frame(&mut write_half, &hello).await {
                error!(endpoint, error = %err, "failed to authenticate with controller");
                return;
            }
        }

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Request>();
        *self.shared.outbound.lock() = Some(outbound_tx);
        self.shared.running.store(true, Ordering::Release);
        info!(endpoint, "connected to controller");
        ready.fire();

        let writer = async {
            while let Some(request) = outbound_rx.recv().await {
                let frame = OutboundFrame::Request(&request);
                if let Err(err) = write_frame(&mut write_half, &frame).await {
                    warn!(request_id = %request.id, error = %err, "failed to send request");
                    break;
                }
            }
        };

        let reader = async {
            let mut lines = BufReader::new(read_half).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => self.dispatch(&line),
                    Ok(None) => {
                        info!(endpoint, "controller closed the connection");
                        break;
                    }
                    Err(err) => {
                        warn!(endpoint, error = %err, "failed to read from controller");
                        break;
                    }
                }
            }
        };

        tokio::select! {
            () = writer => {}
            () = reader => {}
        }

        self.shut_down();
    }

    fn dispatch(&self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        let response: Response = match serde_json::from_str(line) {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "discarding malformed response");
                return;
            }
        };
        let waiter = self.shared.pending.lock().remove(&response.id);
        match waiter {
            Some(waiter) => {
                let request_id = response.id;
                if waiter.send(response).is_err() {
                    debug!(%request_id, "caller stopped waiting for response");
                }
            }
            None => debug!(request_id = %response.id, "discarding response with no waiting caller"),
        }
    }

    fn shut_down(&self) {
        self.shared.running.store(false, Ordering::Release);
        self.shared.outbound.lock().take();
        let abandoned = {
            let mut pending = self.shared.pending.lock();
            let count = pending.len();
            pending.clear();
            count
        };
        if abandoned > 0 {
            warn!(abandoned, "transport loop stopped with requests in flight");
        }
    }
}

async fn write_frame<W>(writer: &mut W, frame: &OutboundFrame<'_>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut bytes = serde_json::to_vec(frame).map_err(std::io::Error::other)?;
    bytes.push(b'\n');
    writer.write_all(&bytes).await?;
    writer.flush().await
}

impl Transport for TcpTransport {
    fn submit(&self, request: Request) -> Result<PendingResponse, RpcError> {
        let request_id = request.id;
        let (response_tx, response_rx) = oneshot::channel();
        self.shared.pending.lock().insert(request_id, response_tx);

        let sent = self
            .shared
            .outbound
            .lock()
            .as_ref()
            .map(|outbound| outbound.send(request).is_ok());

        if sent == Some(true) {
            return Ok(response_rx);
        }

        self.shared.pending.lock().remove(&request_id);
        Err(RpcError::Transport {
            message: format!("transport loop for {} is not running", self.endpoint()),
        })
    }

    fn cancel(&self, request_id: RequestId) {
        self.shared.pending.lock().remove(&request_id);
    }
}

impl EventLoop for TcpTransport {
    fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    fn run(&self, ready: ReadySignal) {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                error!(error = %err, "failed to build transport runtime");
                return;
            }
        };
        runtime.block_on(self.serve(ready));
    }
}
