//! Decides when the current wallpaper is (re)loaded.
//!
//! Reloads requested while the surface is hidden are remembered and replayed
//! on the next show. Only one load runs at a time, and bursts of queued
//! requests collapse into a single load once the debounce window goes quiet.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use anyhow::{Context, Result};
use crossbeam_channel::{after, never, select, unbounded, Receiver, Sender};
use tracing::{debug, trace, warn};

use crate::handle::{Completion, LoadOutcome, RendererHandle};
use crate::loader::ImageLoader;
use crate::types::{ControllerConfig, ReloadReason, UploadMode};

/// Where the controller sends loads; implemented by [`RendererHandle`].
pub trait WallpaperSink: Send + Sync {
    fn enqueue_wallpaper(&self, loader: Arc<dyn ImageLoader>, mode: UploadMode, completion: Completion);
}

impl WallpaperSink for RendererHandle {
    fn enqueue_wallpaper(&self, loader: Arc<dyn ImageLoader>, mode: UploadMode, completion: Completion) {
        RendererHandle::enqueue_wallpaper(self, loader, mode, completion);
    }
}

/// Host collaborator that knows what the "current wallpaper" is.
pub trait WallpaperProvider: Send + Sync {
    fn current_loader(&self) -> Arc<dyn ImageLoader>;

    fn upload_mode(&self) -> UploadMode {
        UploadMode::Crossfade
    }
}

enum TimerCommand {
    Arm(Instant),
    Cancel,
    Shutdown,
}

struct Inner {
    config: ControllerConfig,
    sink: Arc<dyn WallpaperSink>,
    provider: Arc<dyn WallpaperProvider>,
    visible: AtomicBool,
    loading: AtomicBool,
    pending: AtomicBool,
    disposed: AtomicBool,
}

impl Inner {
    fn request(self: &Arc<Self>, reason: ReloadReason, timer: &Sender<TimerCommand>) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }
        if !self.visible.load(Ordering::Acquire) {
            trace!(?reason, "surface hidden; reload deferred");
            self.pending.store(true, Ordering::Release);
            return;
        }
        if self.loading.load(Ordering::Acquire) {
            debug!(?reason, "load already in flight; reload dropped");
            return;
        }
        match reason {
            ReloadReason::Immediate => {
                let _ = timer.send(TimerCommand::Cancel);
                self.execute();
            }
            ReloadReason::Queued => match Instant::now().checked_add(self.config.debounce) {
                Some(deadline) => {
                    let _ = timer.send(TimerCommand::Arm(deadline));
                }
                None => {
                    // A window past the clock's range never closes.
                    warn!(debounce = ?self.config.debounce, "debounce window out of range; queued reload dropped");
                    let _ = timer.send(TimerCommand::Cancel);
                }
            },
        }
    }

    /// Debounce window elapsed with no newer queued request.
    fn debounce_elapsed(self: &Arc<Self>) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }
        if !self.visible.load(Ordering::Acquire) {
            self.pending.store(true, Ordering::Release);
            return;
        }
        self.execute();
    }

    fn execute(self: &Arc<Self>) {
        if self
            .loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("load already in flight; reload dropped");
            return;
        }

        let loader = self.provider.current_loader();
        let mode = self.provider.upload_mode();
        let inner = Arc::clone(self);
        let completion = Completion::new(move |outcome| {
            inner.loading.store(false, Ordering::Release);
            match outcome {
                LoadOutcome::Failed => warn!("wallpaper load failed"),
                other => debug!(outcome = ?other, "wallpaper load finished"),
            }
        });
        debug!(?mode, "starting wallpaper load");
        self.sink.enqueue_wallpaper(loader, mode, completion);
    }
}

/// Visibility- and throttle-aware reload orchestrator.
pub struct RenderController {
    inner: Arc<Inner>,
    timer: Sender<TimerCommand>,
    timer_thread: Mutex<Option<JoinHandle<()>>>,
}

impl RenderController {
    /// Starts hidden; call [`RenderController::set_visible`] once the surface is shown.
    pub fn new(
        sink: Arc<dyn WallpaperSink>,
        provider: Arc<dyn WallpaperProvider>,
        config: ControllerConfig,
    ) -> Result<Self> {
        let inner = Arc::new(Inner {
            config,
            sink,
            provider,
            visible: AtomicBool::new(false),
            loading: AtomicBool::new(false),
            pending: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        });
        let (timer, commands) = unbounded();
        let timer_inner = Arc::clone(&inner);
        let timer_thread = thread::Builder::new()
            .name("reload-debounce".into())
            .spawn(move || run_debounce_timer(timer_inner, commands))
            .context("failed to spawn reload debounce thread")?;

        Ok(Self {
            inner,
            timer,
            timer_thread: Mutex::new(Some(timer_thread)),
        })
    }

    pub fn set_visible(&self, visible: bool) {
        let was_visible = self.inner.visible.swap(visible, Ordering::AcqRel);
        if visible && !was_visible {
            trace!("surface shown");
        }
        if visible && self.inner.pending.swap(false, Ordering::AcqRel) {
            debug!("replaying reload deferred while hidden");
            self.inner.request(ReloadReason::Immediate, &self.timer);
        }
    }

    pub fn reload(&self, reason: ReloadReason) {
        self.inner.request(reason, &self.timer);
    }

    /// Host attached: load whatever is current right away.
    pub fn start(&self) {
        self.reload(ReloadReason::Immediate);
    }

    /// Host detached: drop any pending debounce. A load already running finishes.
    pub fn stop(&self) {
        let _ = self.timer.send(TimerCommand::Cancel);
    }

    /// Cancels the timer and joins its thread; later requests are ignored.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.timer.send(TimerCommand::Shutdown);
        let handle = match self.timer_thread.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("reload debounce thread panicked");
            }
        }
    }

    pub fn is_visible(&self) -> bool {
        self.inner.visible.load(Ordering::Acquire)
    }

    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::Acquire)
    }

    pub fn has_pending_reload(&self) -> bool {
        self.inner.pending.load(Ordering::Acquire)
    }
}

impl Drop for RenderController {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn run_debounce_timer(inner: Arc<Inner>, commands: Receiver<TimerCommand>) {
    let mut deadline: Option<Instant> = None;
    loop {
        let timeout = match deadline {
            Some(at) => after(at.saturating_duration_since(Instant::now())),
            None => never(),
        };
        select! {
            recv(commands) -> command => match command {
                Ok(TimerCommand::Arm(at)) => deadline = Some(at),
                Ok(TimerCommand::Cancel) => deadline = None,
                Ok(TimerCommand::Shutdown) | Err(_) => break,
            },
            recv(timeout) -> _ => {
                deadline = None;
                inner.debounce_elapsed();
            }
        }
    }
    trace!("reload debounce thread exiting");
}
