//! Background transport loop bootstrap.
//!
//! The transport delivers responses from a loop that runs on its own thread.
//! [`LoopManager::ensure_running`] starts that loop at most once and returns
//! only after the loop has signalled readiness.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tokio::sync::{Mutex, oneshot};
use tokio::time::timeout;
use tracing::{debug, info};

use super::RpcError;

/// Name given to the dedicated loop thread.
pub const LOOP_THREAD_NAME: &str = "esxcloud-transport";

const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// One-shot signal fired by a loop once it is able to process requests.
#[derive(Debug)]
pub struct ReadySignal(oneshot::Sender<()>);

impl ReadySignal {
    /// Reports the loop as active. Dropping the signal without firing it
    /// reports a startup failure.
    pub fn fire(self) {
        if self.0.send(()).is_err() {
            debug!("loop readiness observed by nobody");
        }
    }
}

/// Background processing loop driven by the transport.
pub trait EventLoop: Send + Sync + 'static {
    /// Returns `true` while the loop is able to deliver responses.
    fn is_running(&self) -> bool;

    /// Runs the loop on the calling thread until it stops. Implementations
    /// fire `ready` once they are active.
    fn run(&self, ready: ReadySignal);
}

/// Starts a background loop at most once.
#[derive(Debug)]
pub struct LoopManager<L> {
    event_loop: Arc<L>,
    bootstrap: Mutex<()>,
    startup_timeout: Duration,
}

impl<L: EventLoop> LoopManager<L> {
    /// Wraps the loop; nothing is started until [`Self::ensure_running`].
    #[must_use]
    pub fn new(event_loop: L) -> Self {
        Self {
            event_loop: Arc::new(event_loop),
            bootstrap: Mutex::new(()),
            startup_timeout: STARTUP_TIMEOUT,
        }
    }

    /// Overrides how long to wait for the loop to signal readiness.
    #[must_use]
    pub const fn with_startup_timeout(mut self, startup_timeout: Duration) -> Self {
        self.startup_timeout = startup_timeout;
        self
    }

    /// Returns the managed loop.
    #[must_use]
    pub fn event_loop(&self) -> &L {
        &self.event_loop
    }

    /// Ensures the loop is running, starting it on a dedicated thread when
    /// needed. Concurrent callers serialise on the bootstrap lock, so at most
    /// one loop is ever started; every caller returns only once the loop is
    /// observed running.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Bootstrap`] when the thread cannot be spawned, the
    /// loop stops before signalling readiness, readiness does not arrive in
    /// time, or the loop is not running after signalling.
    pub async fn ensure_running(&self) -> Result<(), RpcError> {
        let _guard = self.bootstrap.lock().await;
        if self.event_loop.is_running() {
            return Ok(());
        }

        let (ready_tx, ready_rx) = oneshot::channel();
        let event_loop = Arc::clone(&self.event_loop);
        thread::Builder::new()
            .name(LOOP_THREAD_NAME.to_owned())
            .spawn(move || event_loop.run(ReadySignal(ready_tx)))
            .map_err(|err| RpcError::Bootstrap {
                message: format!("failed to spawn loop thread: {err}"),
            })?;

        match timeout(self.startup_timeout, ready_rx).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                return Err(RpcError::Bootstrap {
                    message: String::from("loop stopped before signalling readiness"),
                });
            }
            Err(_) => {
                return Err(RpcError::Bootstrap {
                    message: format!("loop not ready after {:?}", self.startup_timeout),
                });
            }
        }

        if !self.event_loop.is_running() {
            return Err(RpcError::Bootstrap {
                message: String::from("loop signalled readiness but is not running"),
            });
        }

        info!(thread = LOOP_THREAD_NAME, "transport loop started");
        Ok(())
    }
}
