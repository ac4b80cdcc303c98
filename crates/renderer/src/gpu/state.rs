use std::sync::Arc;
use std::time::Instant;

use image::RgbaImage;
use tracing::{debug, info, warn};
use wgpu::util::DeviceExt;

use crate::error::RenderError;
use crate::geometry::{QUAD_VERTEX_COUNT, QUAD_VERTICES};
use crate::handle::RendererHandle;
use crate::host::GpuDispatcher;
use crate::shared::SharedState;
use crate::transform::fullscreen_transform;
use crate::types::{RendererConfig, SurfaceSize, UploadMode};

use super::picture::Picture;
use super::pipeline::{PipelineLayouts, Programs};
use super::plan::{plan_frame, FrameInputs, Route, Slot, SlotDraw, SlotInfo};
use super::targets::{BlurTargets, OffscreenTarget};
use super::timeline::Crossfade;
use super::uniforms::{PassUniforms, PASS_UNIFORMS_SIZE};

/// Whether the host should schedule another frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Idle,
    Animating,
}

/// GPU objects currently owned by a [`Renderer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GpuObjectCounts {
    pub programs: usize,
    pub targets: usize,
    pub pictures: usize,
}

impl GpuObjectCounts {
    pub fn total(&self) -> usize {
        self.programs + self.targets + self.pictures
    }
}

/// Everything created once per GPU context.
struct GpuResources {
    device: wgpu::Device,
    queue: wgpu::Queue,
    layouts: PipelineLayouts,
    programs: Programs,
    quad: wgpu::Buffer,
    sampler: wgpu::Sampler,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
}

impl GpuResources {
    fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_format: wgpu::TextureFormat,
    ) -> Result<Self, RenderError> {
        let layouts = PipelineLayouts::new(&device);
        let programs = Programs::new(&device, &layouts, surface_format)?;

        let quad = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad vertices"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("picture sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("pass uniform buffer"),
            size: PASS_UNIFORMS_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("pass uniform bind group"),
            layout: &layouts.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Ok(Self {
            device,
            queue,
            layouts,
            programs,
            quad,
            sampler,
            uniform_buffer,
            uniform_bind_group,
        })
    }

    fn destroy(self) {
        self.quad.destroy();
        self.uniform_buffer.destroy();
    }
}

/// Owns every GPU-context-scoped object and executes the per-frame draw.
///
/// All methods must run on the host's GPU thread. Other threads talk to the
/// renderer through a [`RendererHandle`], which publishes configuration
/// atomically and marshals uploads back here.
pub struct Renderer {
    shared: Arc<SharedState>,
    config: RendererConfig,
    gpu: Option<GpuResources>,
    targets: Option<BlurTargets>,
    current: Option<Picture>,
    incoming: Option<Picture>,
    crossfade: Crossfade,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self {
            shared: Arc::new(SharedState::new()),
            config,
            gpu: None,
            targets: None,
            current: None,
            incoming: None,
            crossfade: Crossfade::Idle,
        }
    }

    /// Cross-thread handle sharing this renderer's published state.
    pub fn handle(&self, dispatcher: Arc<dyn GpuDispatcher>) -> RendererHandle {
        RendererHandle::new(Arc::clone(&self.shared), self.config.clone(), dispatcher)
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Compiles every program and allocates shared geometry. Safe to call again
    /// after a context loss; previous resources are dropped first.
    pub fn on_init(
        &mut self,
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_format: wgpu::TextureFormat,
    ) -> Result<(), RenderError> {
        self.release_all();
        let max_dimension = device.limits().max_texture_dimension_2d;
        let resources = GpuResources::new(device, queue, surface_format)?;
        self.gpu = Some(resources);
        self.shared.set_max_texture_dimension(max_dimension);
        self.shared.revive();
        info!(?surface_format, "renderer initialised");
        Ok(())
    }

    /// Publishes the new surface size and rebuilds both blur targets at it.
    pub fn on_resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        let size = SurfaceSize::new(width, height);
        if !size.is_known() {
            warn!(width, height, "ignoring degenerate surface size");
            return Ok(());
        }
        self.shared.set_surface(size);

        let gpu = self.gpu.as_ref().ok_or(RenderError::NotInitialised)?;
        if self.targets.as_ref().is_some_and(|targets| targets.size == size) {
            return Ok(());
        }
        if let Some(old) = self.targets.take() {
            old.destroy();
        }
        self.targets = Some(BlurTargets::new(
            &gpu.device,
            &gpu.layouts,
            &gpu.sampler,
            size,
        )?);
        Ok(())
    }

    pub fn on_draw_frame(&mut self, view: &wgpu::TextureView) -> Result<FrameStatus, RenderError> {
        self.draw_frame_at(view, Instant::now())
    }

    /// [`Renderer::on_draw_frame`] for hosts that supply their own frame timestamps.
    pub fn draw_frame_at(
        &mut self,
        view: &wgpu::TextureView,
        now: Instant,
    ) -> Result<FrameStatus, RenderError> {
        let gpu = self.gpu.as_ref().ok_or(RenderError::NotInitialised)?;

        self.crossfade.advance(now);
        let mix = self.crossfade.mixes(self.config.crossfade_curve);
        let effects = self.shared.effects();
        let surface = self.shared.surface();
        let plan = plan_frame(&FrameInputs {
            surface,
            effects: &effects,
            scaling: self.shared.scaling(),
            parallax_offset: self.shared.parallax_offset(),
            max_blur_radius: self.config.max_blur_radius,
            current: self.current.as_ref().map(slot_info),
            incoming: self.incoming.as_ref().map(slot_info),
            mix,
        });

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        clear(&mut encoder, view, "clear screen");

        for draw in &plan.draws {
            let picture = match draw.slot {
                Slot::Current => self.current.as_ref(),
                Slot::Incoming => self.incoming.as_ref(),
            };
            let Some(picture) = picture else { continue };
            let targets = self.targets.as_ref();
            encode_slot(gpu, &mut encoder, view, picture, targets, draw, surface);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));

        if mix.finished {
            self.finish_crossfade();
        }
        Ok(if self.crossfade.is_transitioning() {
            FrameStatus::Animating
        } else {
            FrameStatus::Idle
        })
    }

    /// Makes a decoded image GPU-resident and swaps it in.
    ///
    /// Invalid buffers are rejected before any GPU call, leaving both slots as
    /// they were.
    pub fn upload_picture(
        &mut self,
        image: &RgbaImage,
        brightness: f32,
        mode: UploadMode,
    ) -> Result<(), RenderError> {
        self.upload_picture_at(image, brightness, mode, Instant::now())
    }

    /// [`Renderer::upload_picture`] with an explicit crossfade start time.
    pub fn upload_picture_at(
        &mut self,
        image: &RgbaImage,
        brightness: f32,
        mode: UploadMode,
        now: Instant,
    ) -> Result<(), RenderError> {
        let gpu = self.gpu.as_ref().ok_or(RenderError::NotInitialised)?;
        let picture = Picture::upload(
            &gpu.device,
            &gpu.queue,
            &gpu.layouts,
            &gpu.sampler,
            image,
            brightness,
        )?;
        info!(
            width = picture.width(),
            height = picture.height(),
            brightness = picture.brightness(),
            ?mode,
            "uploaded picture"
        );

        match mode {
            UploadMode::Immediate => {
                release(self.current.take());
                release(self.incoming.take());
                self.current = Some(picture);
                self.crossfade = Crossfade::Idle;
            }
            UploadMode::Crossfade => {
                if self.incoming.is_some() {
                    self.finish_crossfade();
                }
                self.incoming = Some(picture);
                self.crossfade = Crossfade::start(self.config.crossfade, now);
            }
        }
        Ok(())
    }

    /// Cancels background loads and frees every GPU object.
    pub fn teardown(&mut self) {
        self.shared.mark_torn_down();
        self.release_all();
        debug!("renderer torn down");
    }

    pub fn live_gpu_objects(&self) -> GpuObjectCounts {
        GpuObjectCounts {
            programs: if self.gpu.is_some() { 3 } else { 0 },
            targets: if self.targets.is_some() { 2 } else { 0 },
            pictures: usize::from(self.current.is_some()) + usize::from(self.incoming.is_some()),
        }
    }

    pub fn has_current(&self) -> bool {
        self.current.is_some()
    }

    pub fn has_incoming(&self) -> bool {
        self.incoming.is_some()
    }

    pub fn is_transitioning(&self) -> bool {
        self.crossfade.is_transitioning()
    }

    pub fn crossfade_progress(&self) -> f32 {
        self.crossfade.progress()
    }

    pub fn current_dimensions(&self) -> Option<(u32, u32)> {
        self.current.as_ref().map(|p| (p.width(), p.height()))
    }

    /// Size of the off-screen blur targets, once a resize has created them.
    pub fn target_size(&self) -> Option<SurfaceSize> {
        self.targets.as_ref().map(|targets| targets.size)
    }

    fn finish_crossfade(&mut self) {
        if let Some(incoming) = self.incoming.take() {
            release(self.current.replace(incoming));
            debug!("crossfade complete");
        }
        self.crossfade = Crossfade::Idle;
    }

    fn release_all(&mut self) {
        release(self.current.take());
        release(self.incoming.take());
        self.crossfade = Crossfade::Idle;
        if let Some(targets) = self.targets.take() {
            targets.destroy();
        }
        if let Some(gpu) = self.gpu.take() {
            gpu.destroy();
        }
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.shared.mark_torn_down();
    }
}

fn release(picture: Option<Picture>) {
    if let Some(picture) = picture {
        picture.release();
    }
}

fn slot_info(picture: &Picture) -> SlotInfo {
    SlotInfo {
        width: picture.width(),
        height: picture.height(),
        brightness: picture.brightness(),
    }
}

fn encode_slot(
    gpu: &GpuResources,
    encoder: &mut wgpu::CommandEncoder,
    screen: &wgpu::TextureView,
    picture: &Picture,
    targets: Option<&BlurTargets>,
    draw: &SlotDraw,
    surface: SurfaceSize,
) {
    let fullscreen = fullscreen_transform();
    match (draw.route, targets) {
        (Route::Blurred { radius }, Some(targets)) => {
            blur_into(
                gpu,
                encoder,
                &targets.a,
                &gpu.programs.blur_horizontal,
                picture.bind_group(),
                PassUniforms::blur_horizontal(&draw.transform, radius, draw.scaled_width),
            );
            blur_into(
                gpu,
                encoder,
                &targets.b,
                &gpu.programs.blur_vertical,
                &targets.a.bind_group,
                PassUniforms::blur_vertical(&fullscreen, radius, surface.height as f32),
            );
            effects_onto(
                gpu,
                encoder,
                screen,
                &targets.b.bind_group,
                PassUniforms::effects(&fullscreen, draw.effects, draw.alpha),
            );
        }
        (route, _) => {
            if matches!(route, Route::Blurred { .. }) {
                debug!("blur targets missing; drawing unblurred");
            }
            effects_onto(
                gpu,
                encoder,
                screen,
                picture.bind_group(),
                PassUniforms::effects(&draw.transform, draw.effects, draw.alpha),
            );
        }
    }
}

fn blur_into(
    gpu: &GpuResources,
    encoder: &mut wgpu::CommandEncoder,
    target: &OffscreenTarget,
    pipeline: &wgpu::RenderPipeline,
    source: &wgpu::BindGroup,
    uniforms: PassUniforms,
) {
    upload_uniforms(gpu, encoder, &uniforms);
    let mut pass = begin_pass(
        encoder,
        &target.view,
        wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
        "blur pass",
    );
    draw_quad(gpu, &mut pass, pipeline, source);
}

fn effects_onto(
    gpu: &GpuResources,
    encoder: &mut wgpu::CommandEncoder,
    screen: &wgpu::TextureView,
    source: &wgpu::BindGroup,
    uniforms: PassUniforms,
) {
    upload_uniforms(gpu, encoder, &uniforms);
    let mut pass = begin_pass(encoder, screen, wgpu::LoadOp::Load, "color effects pass");
    draw_quad(gpu, &mut pass, &gpu.programs.effects, source);
}

// Each pass gets its own staging copy so one slot's parameters never bleed
// into the next pass recorded on the same encoder.
fn upload_uniforms(gpu: &GpuResources, encoder: &mut wgpu::CommandEncoder, uniforms: &PassUniforms) {
    let staging = gpu
        .device
        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("uniform staging"),
            contents: bytemuck::bytes_of(uniforms),
            usage: wgpu::BufferUsages::COPY_SRC,
        });
    encoder.copy_buffer_to_buffer(&staging, 0, &gpu.uniform_buffer, 0, PASS_UNIFORMS_SIZE);
}

fn begin_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    view: &wgpu::TextureView,
    load: wgpu::LoadOp<wgpu::Color>,
    label: &'static str,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        occlusion_query_set: None,
        timestamp_writes: None,
    })
}

fn clear(encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView, label: &'static str) {
    let _pass = begin_pass(encoder, view, wgpu::LoadOp::Clear(wgpu::Color::BLACK), label);
}

fn draw_quad(
    gpu: &GpuResources,
    pass: &mut wgpu::RenderPass<'_>,
    pipeline: &wgpu::RenderPipeline,
    source: &wgpu::BindGroup,
) {
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, &gpu.uniform_bind_group, &[]);
    pass.set_bind_group(1, source, &[]);
    pass.set_vertex_buffer(0, gpu.quad.slice(..));
    pass.draw(0..QUAD_VERTEX_COUNT, 0..1);
}

#[cfg(test)]
mod tests {
    use super::*;

    use image::Rgba;

    fn picture(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([90, 120, 200, 255]))
    }

    #[test]
    fn calls_before_init_report_not_initialised() {
        let mut renderer = Renderer::new(RendererConfig::default());
        assert!(matches!(
            renderer.upload_picture(&picture(2, 2), 1.0, UploadMode::Immediate),
            Err(RenderError::NotInitialised)
        ));
        assert!(matches!(
            renderer.on_resize(10, 10),
            Err(RenderError::NotInitialised)
        ));
        assert_eq!(renderer.live_gpu_objects().total(), 0);
    }
}
