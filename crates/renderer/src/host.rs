//! What the engine needs from whoever owns the window and the GPU thread.

use crate::gpu::Renderer;
use crate::types::SurfaceSize;

/// Work marshalled onto the GPU thread; runs against the live renderer.
pub type GpuTask = Box<dyn FnOnce(&mut Renderer) + Send + 'static>;

/// Host-provided dispatch onto the single GPU thread.
pub trait GpuDispatcher: Send + Sync {
    /// Queues `task` to run on the GPU thread. Tasks posted after the host has
    /// shut down are dropped.
    fn run_on_gpu_thread(&self, task: GpuTask);

    /// Asks the host to schedule another `on_draw_frame`.
    fn request_redraw(&self);

    /// Native size of the display, used when no resize has arrived in time.
    fn display_size(&self) -> SurfaceSize;
}
