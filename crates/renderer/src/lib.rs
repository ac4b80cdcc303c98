//! Renderer crate for lumawall, a still-image live wallpaper engine.
//!
//! The crate splits work between a GPU thread and background loaders:
//!
//! ```text
//!   host (window / compositor)
//!          │ visibility, reload requests
//!          ▼
//!   RenderController ──▶ RendererHandle::enqueue_wallpaper ──▶ load thread
//!                                                                 │ decode + downsample
//!                                                                 ▼
//!   GpuDispatcher::run_on_gpu_thread ◀──────────────────────── upload task
//!          │
//!          ▼
//!   Renderer::on_draw_frame ──▶ blur H ──▶ blur V ──▶ effects ──▶ surface
//! ```
//!
//! [`Renderer`] owns every GPU object and is only touched from the thread the
//! host designates. Everything that crosses threads goes through the cloneable
//! [`RendererHandle`], which publishes settings atomically and never blocks on
//! the GPU. The [`window`] module provides a desktop preview host built on
//! winit.

mod controller;
mod error;
pub mod geometry;
mod gpu;
mod handle;
mod host;
mod loader;
mod shaders;
mod shared;
pub mod transform;
mod types;
pub mod window;

pub use controller::{RenderController, WallpaperProvider, WallpaperSink};
pub use error::RenderError;
pub use gpu::{FrameStatus, GpuObjectCounts, Renderer};
pub use handle::{Completion, LoadOutcome, RendererHandle};
pub use host::{GpuDispatcher, GpuTask};
pub use loader::{
    brightness_factor, downsample_factor, fit_within, limit_factor, mean_luminance, EmptyLoader,
    FileSource, ImageLoader, ImageSource, MemorySource, ReadSeek, SourceLoader,
};
pub use shared::LoadTicket;
pub use transform::{Mat4, Placement};
pub use types::{
    ControllerConfig, CrossfadeCurve, EffectSetting, EffectsConfig, ReloadReason, RendererConfig,
    ScalingMode, SurfaceSize, UploadMode,
};
pub use window::{run_preview, Playlist, PreviewOptions};
