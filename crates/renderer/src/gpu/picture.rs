use image::RgbaImage;
use wgpu::util::DeviceExt;

use crate::error::RenderError;

use super::pipeline::PipelineLayouts;

/// A decoded image resident on the GPU.
///
/// Dimensions and brightness are fixed at upload. [`Picture::release`] takes
/// `self`, so the texture is destroyed exactly once by whoever owns the slot.
pub(crate) struct Picture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
    brightness: f32,
}

impl Picture {
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layouts: &PipelineLayouts,
        sampler: &wgpu::Sampler,
        image: &RgbaImage,
        brightness: f32,
    ) -> Result<Self, RenderError> {
        let (width, height) = image.dimensions();
        validate(image)?;
        let max = device.limits().max_texture_dimension_2d;
        if width > max || height > max {
            return Err(RenderError::TextureTooLarge { width, height, max });
        }

        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("picture texture"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            image.as_raw(),
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = layouts.source_bind_group(device, "picture bind group", &view, sampler);

        Ok(Self {
            texture,
            bind_group,
            width,
            height,
            brightness: if brightness.is_finite() {
                brightness
            } else {
                1.0
            },
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn release(self) {
        tracing::trace!(width = self.width, height = self.height, "released picture");
        self.texture.destroy();
    }
}

/// Rejects buffers that cannot back a texture: zero-sized or short on bytes.
pub(crate) fn validate(image: &RgbaImage) -> Result<(), RenderError> {
    let (width, height) = image.dimensions();
    let expected = width as usize * height as usize * 4;
    if width == 0 || height == 0 || image.as_raw().len() < expected {
        return Err(RenderError::InvalidImage { width, height });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_images_are_rejected() {
        let image = RgbaImage::new(0, 10);
        assert!(matches!(
            validate(&image),
            Err(RenderError::InvalidImage { width: 0, height: 10 })
        ));
    }

    #[test]
    fn populated_images_pass() {
        let image = RgbaImage::new(3, 2);
        assert!(validate(&image).is_ok());
    }
}
