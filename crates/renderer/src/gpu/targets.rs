use crate::error::RenderError;
use crate::types::SurfaceSize;

use super::pipeline::{PipelineLayouts, TARGET_FORMAT};

/// One off-screen color target plus the bind group that samples it.
pub(crate) struct OffscreenTarget {
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub bind_group: wgpu::BindGroup,
}

impl OffscreenTarget {
    fn new(
        device: &wgpu::Device,
        layouts: &PipelineLayouts,
        sampler: &wgpu::Sampler,
        label: &'static str,
        size: SurfaceSize,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = layouts.source_bind_group(device, label, &view, sampler);
        Self {
            texture,
            view,
            bind_group,
        }
    }

    fn destroy(self) {
        self.texture.destroy();
    }
}

/// The ping-pong pair used by the separable blur, sized to the surface.
pub(crate) struct BlurTargets {
    pub a: OffscreenTarget,
    pub b: OffscreenTarget,
    pub size: SurfaceSize,
}

impl BlurTargets {
    /// Allocates both targets inside a validation scope so an unusable
    /// framebuffer surfaces as an error instead of rendering garbage.
    pub fn new(
        device: &wgpu::Device,
        layouts: &PipelineLayouts,
        sampler: &wgpu::Sampler,
        size: SurfaceSize,
    ) -> Result<Self, RenderError> {
        let max = device.limits().max_texture_dimension_2d;
        if size.width > max || size.height > max {
            return Err(RenderError::TextureTooLarge {
                width: size.width,
                height: size.height,
                max,
            });
        }
        if !size.is_known() {
            return Err(RenderError::IncompleteTarget {
                width: size.width,
                height: size.height,
                reason: "zero-sized surface".to_string(),
            });
        }

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let a = OffscreenTarget::new(device, layouts, sampler, "blur target a", size);
        let b = OffscreenTarget::new(device, layouts, sampler, "blur target b", size);
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            a.destroy();
            b.destroy();
            return Err(RenderError::IncompleteTarget {
                width: size.width,
                height: size.height,
                reason: err.to_string(),
            });
        }

        tracing::debug!(width = size.width, height = size.height, "created blur targets");
        Ok(Self { a, b, size })
    }

    pub fn destroy(self) {
        self.a.destroy();
        self.b.destroy();
    }
}
