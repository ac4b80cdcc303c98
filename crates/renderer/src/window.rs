//! Desktop preview host: a winit window that plays the GPU-thread role.
//!
//! The event loop thread owns the [`Renderer`] and the wgpu surface. Background
//! loads reach it through [`WinitDispatcher`], which posts closures as user
//! events on the loop.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{EventLoopBuilder, EventLoopProxy};
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowBuilder;

use crate::controller::{RenderController, WallpaperProvider, WallpaperSink};
use crate::gpu::{FrameStatus, GpuContext, Renderer};
use crate::handle::RendererHandle;
use crate::host::{GpuDispatcher, GpuTask};
use crate::loader::{EmptyLoader, FileSource, ImageLoader, SourceLoader};
use crate::types::{
    ControllerConfig, EffectSetting, EffectsConfig, ReloadReason, RendererConfig, ScalingMode,
    SurfaceSize,
};

/// Everything the preview window needs to start.
#[derive(Debug, Clone)]
pub struct PreviewOptions {
    pub title: String,
    pub size: SurfaceSize,
    pub images: Vec<PathBuf>,
    pub effects: EffectsConfig,
    pub scaling: ScalingMode,
    pub renderer: RendererConfig,
    pub controller: ControllerConfig,
}

enum HostEvent {
    Gpu(GpuTask),
    Redraw,
}

/// Marshals work onto the event loop thread via an [`EventLoopProxy`].
struct WinitDispatcher {
    proxy: Mutex<EventLoopProxy<HostEvent>>,
    display: AtomicU64,
}

impl WinitDispatcher {
    fn new(proxy: EventLoopProxy<HostEvent>, display: SurfaceSize) -> Self {
        Self {
            proxy: Mutex::new(proxy),
            display: AtomicU64::new(display.pack()),
        }
    }

    fn send(&self, event: HostEvent) {
        let proxy = match self.proxy.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if proxy.send_event(event).is_err() {
            debug!("event loop closed; dropping host event");
        }
    }
}

impl GpuDispatcher for WinitDispatcher {
    fn run_on_gpu_thread(&self, task: GpuTask) {
        self.send(HostEvent::Gpu(task));
    }

    fn request_redraw(&self) {
        self.send(HostEvent::Redraw);
    }

    fn display_size(&self) -> SurfaceSize {
        SurfaceSize::unpack(self.display.load(Ordering::Acquire))
    }
}

/// Cycles through image files; an empty list shows nothing.
#[derive(Debug)]
pub struct Playlist {
    images: Vec<PathBuf>,
    index: AtomicUsize,
}

impl Playlist {
    pub fn new(images: Vec<PathBuf>) -> Self {
        Self {
            images,
            index: AtomicUsize::new(0),
        }
    }

    pub fn current(&self) -> Option<&PathBuf> {
        if self.images.is_empty() {
            return None;
        }
        self.images.get(self.index.load(Ordering::Acquire) % self.images.len())
    }

    pub fn advance(&self) {
        let len = self.images.len().max(1);
        let _ = self
            .index
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |index| {
                Some((index + 1) % len)
            });
    }
}

impl WallpaperProvider for Playlist {
    fn current_loader(&self) -> Arc<dyn ImageLoader> {
        match self.current() {
            Some(path) => {
                info!(path = %path.display(), "loading wallpaper");
                Arc::new(SourceLoader::new(FileSource(path.clone())))
            }
            None => Arc::new(EmptyLoader),
        }
    }
}

/// Keyboard shortcuts understood by the preview window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyAction {
    NextImage,
    ToggleBlur,
    BlurUp,
    BlurDown,
    ToggleGrayscale,
    ToggleVignette,
    ToggleAdaptiveBrightness,
}

pub(crate) fn key_action(key: &Key) -> Option<KeyAction> {
    match key {
        Key::Named(NamedKey::Space) | Key::Named(NamedKey::ArrowRight) => Some(KeyAction::NextImage),
        Key::Character(value) => match value.to_lowercase().as_str() {
            " " => Some(KeyAction::NextImage),
            "b" => Some(KeyAction::ToggleBlur),
            "+" | "=" => Some(KeyAction::BlurUp),
            "-" | "_" => Some(KeyAction::BlurDown),
            "g" => Some(KeyAction::ToggleGrayscale),
            "v" => Some(KeyAction::ToggleVignette),
            "a" => Some(KeyAction::ToggleAdaptiveBrightness),
            _ => None,
        },
        _ => None,
    }
}

const BLUR_STEP: u8 = 10;

fn toggle(setting: &mut EffectSetting, default_percent: u8) {
    setting.enabled = !setting.enabled;
    if setting.enabled && setting.percent == 0 {
        setting.percent = default_percent;
    }
}

/// Applies an effect shortcut in place. Returns false for actions that are
/// not pure effect edits.
pub(crate) fn apply_effect_action(effects: &mut EffectsConfig, action: KeyAction) -> bool {
    match action {
        KeyAction::ToggleBlur => toggle(&mut effects.blur, 50),
        KeyAction::BlurUp => {
            effects.blur.percent = effects.blur.percent.saturating_add(BLUR_STEP).min(100);
            effects.blur.enabled = true;
        }
        KeyAction::BlurDown => {
            effects.blur.percent = effects.blur.percent.saturating_sub(BLUR_STEP);
            effects.blur.enabled = effects.blur.percent > 0;
        }
        KeyAction::ToggleGrayscale => toggle(&mut effects.grayscale, 100),
        KeyAction::ToggleVignette => toggle(&mut effects.vignette, 60),
        KeyAction::ToggleAdaptiveBrightness => {
            effects.adaptive_brightness = !effects.adaptive_brightness;
        }
        KeyAction::NextImage => return false,
    }
    true
}

/// Maps a cursor x coordinate onto the normalised parallax offset.
pub(crate) fn parallax_from_cursor(x: f64, width: u32) -> f32 {
    if width == 0 || !x.is_finite() {
        return 0.5;
    }
    (x / f64::from(width)).clamp(0.0, 1.0) as f32
}

fn handle_key(
    action: KeyAction,
    handle: &RendererHandle,
    controller: &RenderController,
    playlist: &Playlist,
) {
    match action {
        KeyAction::NextImage => {
            playlist.advance();
            controller.reload(ReloadReason::Immediate);
        }
        KeyAction::ToggleAdaptiveBrightness => {
            handle.update_effects(|effects| {
                apply_effect_action(effects, action);
            });
            // The factor is measured at decode time.
            controller.reload(ReloadReason::Queued);
        }
        _ => handle.update_effects(|effects| {
            apply_effect_action(effects, action);
        }),
    }
    debug!(?action, effects = ?handle.effects(), "applied shortcut");
}

/// Opens a preview window and runs until it is closed.
pub fn run_preview(options: PreviewOptions) -> Result<()> {
    let event_loop = EventLoopBuilder::<HostEvent>::with_user_event()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let proxy = event_loop.create_proxy();

    let window_size = PhysicalSize::new(options.size.width.max(1), options.size.height.max(1));
    let window = WindowBuilder::new()
        .with_title(options.title.clone())
        .with_inner_size(window_size)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create preview window: {err}"))?;
    let window = Arc::new(window);

    let display = window
        .current_monitor()
        .map(|monitor| SurfaceSize::new(monitor.size().width, monitor.size().height))
        .filter(|size| size.is_known())
        .unwrap_or(options.size);

    let inner = window.inner_size();
    let initial = SurfaceSize::new(inner.width, inner.height);
    let mut context = GpuContext::new(window.as_ref(), initial)?;

    let dispatcher = Arc::new(WinitDispatcher::new(proxy, display));
    let mut renderer = Renderer::new(options.renderer.clone());
    let handle = renderer.handle(Arc::clone(&dispatcher) as Arc<dyn GpuDispatcher>);
    handle.set_effects(options.effects);
    handle.set_scaling(options.scaling);

    renderer
        .on_init(
            context.device.clone(),
            context.queue.clone(),
            context.surface_format,
        )
        .context("failed to initialise renderer")?;
    renderer
        .on_resize(initial.width, initial.height)
        .context("failed to allocate blur targets")?;

    let playlist = Arc::new(Playlist::new(options.images.clone()));
    let controller = RenderController::new(
        Arc::new(handle.clone()) as Arc<dyn WallpaperSink>,
        Arc::clone(&playlist) as Arc<dyn WallpaperProvider>,
        options.controller.clone(),
    )?;
    controller.set_visible(true);
    controller.start();
    info!(
        images = options.images.len(),
        width = initial.width,
        height = initial.height,
        "preview started"
    );

    let mut result = Ok(());
    let run_result = event_loop.run(|event, elwt| match event {
        Event::UserEvent(HostEvent::Gpu(task)) => task(&mut renderer),
        Event::UserEvent(HostEvent::Redraw) => window.request_redraw(),
        Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
            WindowEvent::Resized(size) => {
                let size = SurfaceSize::new(size.width, size.height);
                context.resize(size);
                if let Err(err) = renderer.on_resize(size.width, size.height) {
                    error!(error = %err, "failed to rebuild off-screen targets");
                    result = Err(anyhow!(err));
                    elwt.exit();
                    return;
                }
                window.request_redraw();
            }
            WindowEvent::Focused(focused) => controller.set_visible(focused),
            WindowEvent::Occluded(occluded) => controller.set_visible(!occluded),
            WindowEvent::CursorMoved { position, .. } => {
                let width = window.inner_size().width;
                handle.set_parallax_offset(parallax_from_cursor(position.x, width));
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed && !event.repeat {
                    if let Some(action) = key_action(&event.logical_key) {
                        handle_key(action, &handle, &controller, &playlist);
                    }
                }
            }
            WindowEvent::RedrawRequested => match context.surface.get_current_texture() {
                Ok(frame) => {
                    let view = frame
                        .texture
                        .create_view(&wgpu::TextureViewDescriptor::default());
                    match renderer.on_draw_frame(&view) {
                        Ok(status) => {
                            window.pre_present_notify();
                            frame.present();
                            if status == FrameStatus::Animating {
                                window.request_redraw();
                            }
                        }
                        Err(err) => {
                            error!(error = %err, "failed to draw frame");
                            result = Err(anyhow!(err));
                            elwt.exit();
                        }
                    }
                }
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    context.reconfigure();
                    window.request_redraw();
                }
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    error!("surface out of memory; exiting preview");
                    elwt.exit();
                }
                Err(other) => {
                    warn!(error = ?other, "surface error; retrying next frame");
                    window.request_redraw();
                }
            },
            _ => {}
        },
        Event::LoopExiting => {
            controller.dispose();
            renderer.teardown();
            info!("preview closed");
        }
        _ => {}
    });

    if let Err(err) = run_result {
        return Err(anyhow!("window event loop error: {err}"));
    }
    result
}
