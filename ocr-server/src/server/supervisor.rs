use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, Weak};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot, watch, Mutex};
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::state::{
    ServerEvent, ServerState, STATUS_CRASH_RESTARTING, STATUS_RESTARTING, STATUS_RUNNING,
    STATUS_STARTING, STATUS_START_FAILED, STATUS_STOPPED,
};
use crate::api::{create_router, AppState};
use crate::config::{ServerConfig, ServerConfigPatch};
use crate::error::{OcrServerError, Result};
use crate::ocr::OcrProvider;

const EVENT_CAPACITY: usize = 64;

/// Invoked each time the listener exits without being asked to.
pub type OnStopped = Arc<dyn Fn() + Send + Sync>;

struct RunningServer {
    generation: u64,
    local_addr: SocketAddr,
    drain_timeout: Duration,
    shutdown: CancellationToken,
    serve: AbortHandle,
    done: oneshot::Receiver<()>,
}

#[derive(Default)]
struct Lifecycle {
    running: Option<RunningServer>,
    pending_restart: Option<JoinHandle<()>>,
    generation: u64,
}

struct Inner {
    ocr: OcrProvider,
    lifecycle: Mutex<Lifecycle>,
    config: RwLock<Arc<ServerConfig>>,
    local_addr: RwLock<Option<SocketAddr>>,
    auto_restart: AtomicBool,
    on_stopped: RwLock<Option<OnStopped>>,
    state: watch::Sender<ServerState>,
    status: RwLock<&'static str>,
    events: broadcast::Sender<ServerEvent>,
}

/// Owns the HTTP listener and keeps it available.
///
/// `start`, `stop`, `restart` and the crash handler all run under one async
/// mutex, so lifecycle transitions never interleave. The handle is cheap to
/// clone; clones share the same listener.
#[derive(Clone)]
pub struct ServerSupervisor {
    inner: Arc<Inner>,
}

impl ServerSupervisor {
    pub fn new(config: ServerConfig, ocr: OcrProvider) -> Self {
        let (state, _) = watch::channel(ServerState::Stopped);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                ocr,
                lifecycle: Mutex::new(Lifecycle::default()),
                auto_restart: AtomicBool::new(config.auto_restart),
                config: RwLock::new(Arc::new(config)),
                local_addr: RwLock::new(None),
                on_stopped: RwLock::new(None),
                state,
                status: RwLock::new(STATUS_STOPPED),
                events,
            }),
        }
    }

    /// Current configuration snapshot. A running listener keeps the snapshot
    /// it was bound with until the next restart.
    pub fn config(&self) -> Arc<ServerConfig> {
        Arc::clone(
            &self
                .inner
                .config
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }

    /// Merge `patch` into the held configuration, replacing the snapshot.
    pub fn configure(&self, patch: &ServerConfigPatch) -> Result<Arc<ServerConfig>> {
        let mut guard = self
            .inner
            .config
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let next = Arc::new(patch.apply(&guard)?);
        *guard = Arc::clone(&next);
        info!(
            port = next.port,
            level = %next.recognition.level,
            language_correction = next.recognition.language_correction,
            auto_detect_language = next.recognition.auto_detect_language,
            "Server configuration updated"
        );
        Ok(next)
    }

    pub fn set_auto_restart(&self, enabled: bool) {
        self.inner.auto_restart.store(enabled, Ordering::SeqCst);
    }

    pub fn auto_restart(&self) -> bool {
        self.inner.auto_restart.load(Ordering::SeqCst)
    }

    pub fn set_on_stopped<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self
            .inner
            .on_stopped
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Arc::new(callback));
    }

    pub fn state(&self) -> ServerState {
        *self.inner.state.borrow()
    }

    /// Status line of the latest transition. `Failed` reads "server stopped"
    /// after a crash and "unable to start the server" after a start error.
    pub fn status(&self) -> &'static str {
        *self
            .inner
            .status
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn watch_state(&self) -> watch::Receiver<ServerState> {
        self.inner.state.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.inner.events.subscribe()
    }

    /// Address of the live listener, if any.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self
            .inner
            .local_addr
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Bind and serve with the current configuration.
    ///
    /// Returns the bound address. Does nothing when a listener is already
    /// up. Bind errors leave the supervisor `Failed` and are not retried.
    pub async fn start(&self) -> Result<SocketAddr> {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        if let Some(pending) = lifecycle.pending_restart.take() {
            pending.abort();
        }
        self.start_locked(&mut lifecycle).await
    }

    /// Shut the listener down gracefully and cancel any pending restart.
    pub async fn stop(&self) {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        let was_up = self.shutdown_locked(&mut lifecycle).await;
        if was_up || self.state() != ServerState::Stopped {
            self.transition(ServerState::Stopped, STATUS_STOPPED);
        }
    }

    /// Stop then start, with no other transition in between. Used to apply a
    /// new configuration.
    pub async fn restart(&self) -> Result<SocketAddr> {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        self.transition(ServerState::Restarting, STATUS_RESTARTING);
        self.shutdown_locked(&mut lifecycle).await;
        self.start_locked(&mut lifecycle).await
    }

    /// Abort the listener without draining. Handled exactly like a crash.
    ///
    /// Returns false when no listener was running.
    pub async fn kill(&self) -> bool {
        let lifecycle = self.inner.lifecycle.lock().await;
        match &lifecycle.running {
            Some(running) => {
                warn!(addr = %running.local_addr, "Killing server listener");
                running.serve.abort();
                true
            }
            None => false,
        }
    }

    async fn start_locked(&self, lifecycle: &mut Lifecycle) -> Result<SocketAddr> {
        if let Some(running) = &lifecycle.running {
            return Ok(running.local_addr);
        }

        let config = self.config();
        let addr = match config.socket_addr() {
            Ok(addr) => addr,
            Err(e) => {
                error!(error = %e, "Invalid listen address");
                self.transition(ServerState::Failed, STATUS_START_FAILED);
                return Err(e);
            }
        };

        self.transition(ServerState::Starting, STATUS_STARTING);

        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(source) => {
                error!(%addr, error = %source, "Unable to bind server listener");
                self.transition(ServerState::Failed, STATUS_START_FAILED);
                return Err(OcrServerError::Bind { addr, source });
            }
        };
        let local_addr = listener.local_addr()?;

        let app = create_router(AppState::new(Arc::clone(&config), self.inner.ocr.clone()));
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let serve = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
        });

        lifecycle.generation += 1;
        let generation = lifecycle.generation;
        let (done_tx, done_rx) = oneshot::channel();

        lifecycle.running = Some(RunningServer {
            generation,
            local_addr,
            drain_timeout: config.drain_timeout(),
            shutdown: shutdown.clone(),
            serve: serve.abort_handle(),
            done: done_rx,
        });
        *self
            .inner
            .local_addr
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(local_addr);

        tokio::spawn(monitor(
            Arc::downgrade(&self.inner),
            generation,
            serve,
            shutdown,
            done_tx,
        ));

        info!(addr = %local_addr, generation, "Server listening");
        self.transition(ServerState::Running, STATUS_RUNNING);
        Ok(local_addr)
    }

    /// Cancel any pending restart and drain the listener. Returns whether a
    /// listener was up.
    async fn shutdown_locked(&self, lifecycle: &mut Lifecycle) -> bool {
        if let Some(pending) = lifecycle.pending_restart.take() {
            info!("Cancelling pending automatic restart");
            pending.abort();
        }

        let Some(mut running) = lifecycle.running.take() else {
            return false;
        };
        self.clear_local_addr();

        running.shutdown.cancel();
        if tokio::time::timeout(running.drain_timeout, &mut running.done)
            .await
            .is_err()
        {
            warn!(
                addr = %running.local_addr,
                timeout_ms = running.drain_timeout.as_millis() as u64,
                "Listener did not drain in time, aborting"
            );
            running.serve.abort();
            // The listener socket is only closed once the aborted task is dropped.
            let _ = running.done.await;
        }
        info!(addr = %running.local_addr, "Server listener shut down");
        true
    }

    async fn handle_crash(&self, generation: u64) {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        match &lifecycle.running {
            Some(running) if running.generation == generation => {}
            _ => return,
        }
        lifecycle.running = None;
        self.clear_local_addr();

        self.transition(ServerState::Failed, STATUS_STOPPED);

        let callback = self
            .inner
            .on_stopped
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        if let Some(callback) = callback {
            callback();
        }

        if !self.auto_restart() {
            warn!("Automatic restart disabled, server stays down");
            return;
        }

        let delay = self.config().restart_delay();
        self.transition(ServerState::Restarting, STATUS_CRASH_RESTARTING);
        info!(delay_ms = delay.as_millis() as u64, "Scheduling automatic restart");

        let inner = Arc::downgrade(&self.inner);
        lifecycle.pending_restart = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = inner.upgrade() {
                ServerSupervisor { inner }.finish_auto_restart().await;
            }
        }));
    }

    async fn finish_auto_restart(&self) {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        // This task owns the handle; dropping it detaches instead of aborting.
        lifecycle.pending_restart = None;
        if let Err(e) = self.start_locked(&mut lifecycle).await {
            error!(error = %e, "Automatic restart failed");
        }
    }

    fn clear_local_addr(&self) {
        *self
            .inner
            .local_addr
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    fn transition(&self, state: ServerState, status: &'static str) {
        *self
            .inner
            .status
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = status;
        self.inner.state.send_replace(state);
        info!(%state, status, "Server state changed");
        let _ = self.inner.events.send(ServerEvent::new(state, status));
    }
}

/// Waits for the serve task and reports exits nobody asked for.
///
/// Boxed because a crash restarts the listener, which spawns a new monitor.
fn monitor(
    inner: Weak<Inner>,
    generation: u64,
    serve: JoinHandle<std::io::Result<()>>,
    shutdown: CancellationToken,
    done: oneshot::Sender<()>,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async move {
        let outcome = serve.await;
        // Signal before taking the lifecycle lock: stop() holds it while waiting.
        let _ = done.send(());

        if shutdown.is_cancelled() {
            return;
        }

        match outcome {
            Ok(Ok(())) => warn!(generation, "Server listener exited unexpectedly"),
            Ok(Err(e)) => error!(generation, error = %e, "Server listener failed"),
            Err(e) if e.is_cancelled() => warn!(generation, "Server listener was killed"),
            Err(e) => error!(generation, error = %e, "Server listener panicked"),
        }

        if let Some(inner) = inner.upgrade() {
            ServerSupervisor { inner }.handle_crash(generation).await;
        }
    })
}
