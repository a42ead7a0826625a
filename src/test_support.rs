//! Test support utilities shared across unit and integration tests.

use std::collections::{BTreeSet, VecDeque};
use std::env;
use std::ffi::OsString;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard, oneshot};

use crate::agent_properties::AgentProperties;
use crate::config::CloudConfig;
use crate::esx::{EsxCloud, EsxCloudError};
use crate::messages::ControllerRequest;
use crate::rpc::{
    EventLoop, LoopManager, PendingResponse, ReadySignal, Request, RequestCorrelator, RequestId,
    Response, RpcError, Transport,
};

/// Reply a [`ScriptedTransport`] gives to the next submitted request.
#[derive(Clone, Debug, PartialEq)]
pub enum ScriptedReply {
    /// Respond with `success = true` and the given result.
    Success(Value),
    /// Respond with `success = false` and the given failure detail.
    Failure(Value),
    /// Never respond; the request stays pending until the caller gives up.
    Silent,
    /// Drop the request without responding.
    Dropped,
    /// Refuse the submission outright.
    Refused,
}

#[derive(Debug, Default)]
struct ScriptState {
    replies: VecDeque<ScriptedReply>,
    requests: Vec<Request>,
    held: Vec<oneshot::Sender<Response>>,
    cancelled: usize,
}

/// Transport double that answers requests from a FIFO script.
///
/// Requests with no scripted reply succeed with a `null` result. Every
/// submitted request is recorded for assertions.
#[derive(Clone, Debug, Default)]
pub struct ScriptedTransport {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedTransport {
    /// Creates a transport with no queued replies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply for the next unanswered request.
    pub fn push_reply(&self, reply: ScriptedReply) {
        self.state.lock().replies.push_back(reply);
    }

    /// Queues a successful reply.
    pub fn push_success(&self, result: Value) {
        self.push_reply(ScriptedReply::Success(result));
    }

    /// Queues a failed reply carrying `detail`.
    pub fn push_failure(&self, detail: impl Into<String>) {
        self.push_reply(ScriptedReply::Failure(Value::String(detail.into())));
    }

    /// Returns a snapshot of all submitted requests.
    #[must_use]
    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().requests.clone()
    }

    /// Returns the payloads of all submitted requests.
    #[must_use]
    pub fn payloads(&self) -> Vec<ControllerRequest> {
        self.state
            .lock()
            .requests
            .iter()
            .map(|request| request.payload.clone())
            .collect()
    }

    /// Number of requests submitted so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    /// Number of requests withdrawn by callers that timed out.
    #[must_use]
    pub fn cancelled_count(&self) -> usize {
        self.state.lock().cancelled
    }
}

impl Transport for ScriptedTransport {
    fn submit(&self, request: Request) -> Result<PendingResponse, RpcError> {
        let mut state = self.state.lock();
        let reply = state
            .replies
            .pop_front()
            .unwrap_or(ScriptedReply::Success(Value::Null));
        if reply == ScriptedReply::Refused {
            return Err(RpcError::Transport {
                message: String::from("scripted refusal"),
            });
        }

        let id = request.id;
        state.requests.push(request);
        let (response_tx, response_rx) = oneshot::channel();
        let response = match reply {
            ScriptedReply::Success(result) => Some(Response {
                id,
                success: true,
                result,
            }),
            ScriptedReply::Failure(result) => Some(Response {
                id,
                success: false,
                result,
            }),
            ScriptedReply::Silent => {
                state.held.push(response_tx);
                return Ok(response_rx);
            }
            ScriptedReply::Dropped | ScriptedReply::Refused => None,
        };
        if let Some(response) = response {
            response_tx.send(response).ok();
        }
        Ok(response_rx)
    }

    fn cancel(&self, _request_id: RequestId) {
        self.state.lock().cancelled += 1;
    }
}

/// Event loop double that records how often it is started.
#[derive(Debug, Default)]
pub struct CountingLoop {
    running: AtomicBool,
    starts: AtomicUsize,
}

impl CountingLoop {
    /// Creates a loop that is not yet running.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a loop that reports itself as already running.
    #[must_use]
    pub fn already_running() -> Self {
        Self {
            running: AtomicBool::new(true),
            starts: AtomicUsize::new(0),
        }
    }

    /// Number of times [`EventLoop::run`] was invoked.
    #[must_use]
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

impl EventLoop for CountingLoop {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn run(&self, ready: ReadySignal) {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        ready.fire();
    }
}

/// Event loop double that exits without ever becoming ready.
#[derive(Debug, Default)]
pub struct StillbornLoop;

impl EventLoop for StillbornLoop {
    fn is_running(&self) -> bool {
        false
    }

    fn run(&self, ready: ReadySignal) {
        drop(ready);
    }
}

/// Configuration pointing at a loopback controller whose upload port is
/// `upload_port`. Uploads settle immediately.
#[must_use]
pub fn loopback_config(upload_port: u16) -> CloudConfig {
    CloudConfig {
        mq_host: String::from("127.0.0.1"),
        mq_port: 4222,
        mq_user: None,
        mq_password: None,
        esxmgr_host: String::from("127.0.0.1"),
        file_upload_port: upload_port,
        upload_settle_secs: 0,
        request_timeout_secs: 5,
        stemcell_timeout_secs: 5,
        agent_properties_file: None,
    }
}

/// Builds a driver over `transport` with an in-process loop double.
///
/// # Errors
///
/// Returns [`EsxCloudError`] when `config` is invalid.
pub async fn scripted_cloud(
    config: &CloudConfig,
    transport: ScriptedTransport,
    agent_properties: AgentProperties,
) -> Result<EsxCloud<ScriptedTransport>, EsxCloudError> {
    let manager = LoopManager::new(CountingLoop::new());
    EsxCloud::connect(
        config,
        transport,
        &manager,
        Arc::new(RequestCorrelator::new()),
        agent_properties,
    )
    .await
}

/// Event loop double that stays alive for `hold` without ever signalling
/// readiness.
#[derive(Debug)]
pub struct HangingLoop {
    hold: Duration,
}

impl HangingLoop {
    /// Creates a loop that keeps its readiness signal for `hold`.
    #[must_use]
    pub const fn new(hold: Duration) -> Self {
        Self { hold }
    }
}

impl EventLoop for HangingLoop {
    fn is_running(&self) -> bool {
        false
    }

    fn run(&self, ready: ReadySignal) {
        thread::sleep(self.hold);
        drop(ready);
    }
}

static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

/// Guard that serialises environment mutation and restores the previous
/// values on drop.
#[derive(Debug)]
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: AsyncMutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets environment variables while holding a process-wide lock.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let previous = pairs
            .iter()
            .map(|(key, value)| {
                let old = env::var_os(key);
                // SAFETY: environment mutation is serialised by `ENV_LOCK`.
                unsafe { env::set_var(key, value) };
                ((*key).to_owned(), old)
            })
            .collect();

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(value) => env::set_var(key, value),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
