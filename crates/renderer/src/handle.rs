use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tracing::{debug, warn};

use crate::gpu::Renderer;
use crate::host::GpuDispatcher;
use crate::loader::{brightness_factor, fit_within, ImageLoader};
use crate::shared::{LoadTicket, SharedState};
use crate::types::{EffectsConfig, RendererConfig, ScalingMode, SurfaceSize, UploadMode};

/// Terminal result of the background half of a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Decoded and handed to the GPU thread for upload.
    Delivered,
    /// The loader produced no image.
    Empty,
    /// A newer load or a teardown superseded this one.
    Cancelled,
    /// The worker could not run or panicked.
    Failed,
}

/// Completion callback that is guaranteed to fire exactly once.
///
/// Dropping an unfinished completion reports [`LoadOutcome::Failed`], so a
/// worker that never starts or unwinds still releases whoever is waiting.
pub struct Completion(Option<Box<dyn FnOnce(LoadOutcome) + Send + 'static>>);

impl Completion {
    pub fn new(callback: impl FnOnce(LoadOutcome) + Send + 'static) -> Self {
        Self(Some(Box::new(callback)))
    }

    pub fn noop() -> Self {
        Self(None)
    }

    pub fn finish(mut self, outcome: LoadOutcome) {
        if let Some(callback) = self.0.take() {
            callback(outcome);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(callback) = self.0.take() {
            callback(LoadOutcome::Failed);
        }
    }
}

/// Thread-safe front of a [`crate::Renderer`].
///
/// Setters publish whole values that the GPU thread picks up on its next
/// frame; none of them trigger a reload.
#[derive(Clone)]
pub struct RendererHandle {
    shared: Arc<SharedState>,
    config: RendererConfig,
    dispatcher: Arc<dyn GpuDispatcher>,
}

impl RendererHandle {
    pub(crate) fn new(
        shared: Arc<SharedState>,
        config: RendererConfig,
        dispatcher: Arc<dyn GpuDispatcher>,
    ) -> Self {
        Self {
            shared,
            config,
            dispatcher,
        }
    }

    pub fn surface(&self) -> SurfaceSize {
        self.shared.surface()
    }

    pub fn effects(&self) -> EffectsConfig {
        *self.shared.effects()
    }

    pub fn set_effects(&self, effects: EffectsConfig) {
        self.shared.set_effects(effects);
        self.dispatcher.request_redraw();
    }

    pub fn update_effects(&self, update: impl FnOnce(&mut EffectsConfig)) {
        self.shared.update_effects(update);
        self.dispatcher.request_redraw();
    }

    pub fn set_adaptive_brightness(&self, enabled: bool) {
        self.update_effects(|effects| effects.adaptive_brightness = enabled);
    }

    pub fn scaling(&self) -> ScalingMode {
        self.shared.scaling()
    }

    pub fn set_scaling(&self, mode: ScalingMode) {
        self.shared.set_scaling(mode);
        self.dispatcher.request_redraw();
    }

    pub fn parallax_offset(&self) -> f32 {
        self.shared.parallax_offset()
    }

    /// Normalised horizontal offset; 0.5 is centred. Out-of-range values clamp.
    pub fn set_parallax_offset(&self, offset: f32) {
        self.shared.set_parallax_offset(offset);
        self.dispatcher.request_redraw();
    }

    pub fn cancel_loads(&self) {
        self.shared.cancel_loads();
    }

    /// Decodes `loader`'s image on a worker thread and swaps it in on the GPU thread.
    ///
    /// Any earlier load still running is cancelled. `completion` fires once the
    /// background phase ends, before the upload itself has run.
    pub fn enqueue_wallpaper(
        &self,
        loader: Arc<dyn ImageLoader>,
        mode: UploadMode,
        completion: Completion,
    ) -> LoadTicket {
        let ticket = self.shared.begin_load();
        let job = LoadJob {
            shared: Arc::clone(&self.shared),
            config: self.config.clone(),
            dispatcher: Arc::clone(&self.dispatcher),
            ticket: ticket.clone(),
            loader,
            mode,
        };

        let spawned = thread::Builder::new()
            .name(format!("wallpaper-load-{}", ticket.generation()))
            .spawn(move || job.run(completion));
        if let Err(err) = spawned {
            // The closure, and with it the completion, is dropped: Failed fires.
            warn!(error = %err, "failed to spawn wallpaper loader");
        }
        ticket
    }
}

struct LoadJob {
    shared: Arc<SharedState>,
    config: RendererConfig,
    dispatcher: Arc<dyn GpuDispatcher>,
    ticket: LoadTicket,
    loader: Arc<dyn ImageLoader>,
    mode: UploadMode,
}

impl LoadJob {
    fn run(self, completion: Completion) {
        let surface = self.wait_for_surface();
        if self.ticket.is_cancelled() {
            debug!(generation = self.ticket.generation(), "load cancelled before decode");
            completion.finish(LoadOutcome::Cancelled);
            return;
        }

        let loader = Arc::clone(&self.loader);
        let decoded =
            panic::catch_unwind(AssertUnwindSafe(|| loader.load(surface.width, surface.height)));
        let image = match decoded {
            Ok(Some(image)) => image,
            Ok(None) => {
                debug!(generation = self.ticket.generation(), "loader produced no image");
                completion.finish(LoadOutcome::Empty);
                return;
            }
            Err(_) => {
                warn!(generation = self.ticket.generation(), "wallpaper loader panicked");
                completion.finish(LoadOutcome::Failed);
                return;
            }
        };

        let image = fit_within(image, self.shared.max_texture_dimension());

        let brightness = if self.shared.effects().adaptive_brightness {
            brightness_factor(&image)
        } else {
            1.0
        };

        if self.ticket.is_cancelled() {
            debug!(generation = self.ticket.generation(), "discarding decoded image from cancelled load");
            completion.finish(LoadOutcome::Cancelled);
            return;
        }

        let ticket = self.ticket.clone();
        let mode = self.mode;
        let dispatcher = Arc::clone(&self.dispatcher);
        self.dispatcher.run_on_gpu_thread(Box::new(move |renderer: &mut Renderer| {
            if ticket.is_cancelled() {
                debug!(generation = ticket.generation(), "dropping stale upload");
                return;
            }
            match renderer.upload_picture(&image, brightness, mode) {
                Ok(()) => dispatcher.request_redraw(),
                Err(err) => warn!(error = %err, "rejected decoded wallpaper"),
            }
        }));
        completion.finish(LoadOutcome::Delivered);
    }

    /// Polls for the first resize, falling back to the display size once the
    /// wait budget is spent.
    /// A budget past the clock's range waits until the surface is known or
    /// the load is cancelled.
    fn wait_for_surface(&self) -> SurfaceSize {
        let deadline = Instant::now().checked_add(self.config.surface_wait);
        loop {
            let surface = self.shared.surface();
            if surface.is_known() || self.ticket.is_cancelled() {
                return surface;
            }
            let mut pause = self.config.surface_poll;
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    let fallback = self.dispatcher.display_size();
                    warn!(
                        width = fallback.width,
                        height = fallback.height,
                        "surface size unknown after wait; using display size"
                    );
                    return fallback;
                }
                pause = pause.min(deadline - now);
            }
            thread::sleep(pause);
        }
    }
}
