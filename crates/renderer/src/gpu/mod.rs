//! GPU side of the renderer.
//!
//! - `context` owns wgpu instance/device/surface wiring for window hosts.
//! - `pipeline` compiles the blur and effects programs against one layout.
//! - `targets` holds the two off-screen blur textures sized to the surface.
//! - `picture` uploads decoded images into sampled textures.
//! - `plan` turns slot state plus effects into a list of draws, without a device.
//! - `timeline` tracks the crossfade envelope on the wall clock.
//! - `state` glues everything together behind [`Renderer`].

mod context;
mod picture;
mod pipeline;
mod plan;
mod state;
mod targets;
mod timeline;
mod uniforms;

pub(crate) use context::GpuContext;
pub use state::{FrameStatus, GpuObjectCounts, Renderer};
