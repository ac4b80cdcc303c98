//! Headless device and dispatcher shared by the GPU integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use image::{Rgba, RgbaImage};
use renderer::{GpuDispatcher, GpuTask, Renderer, SurfaceSize};

pub fn headless() -> Option<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::LowPower,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .ok()?;
    pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default())).ok()
}

pub fn screen(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("screen"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

/// Queues tasks instead of running them, like a host whose GPU thread is busy.
#[derive(Default)]
pub struct QueueingDispatcher {
    tasks: Mutex<Vec<GpuTask>>,
}

impl QueueingDispatcher {
    pub fn drain_into(&self, renderer: &mut Renderer) -> usize {
        let tasks: Vec<GpuTask> = self.tasks.lock().unwrap().drain(..).collect();
        let count = tasks.len();
        for task in tasks {
            task(renderer);
        }
        count
    }
}

impl GpuDispatcher for QueueingDispatcher {
    fn run_on_gpu_thread(&self, task: GpuTask) {
        self.tasks.lock().unwrap().push(task);
    }

    fn request_redraw(&self) {}

    fn display_size(&self) -> SurfaceSize {
        SurfaceSize::new(1920, 1080)
    }
}

pub fn png_bytes(width: u32, height: u32) -> Arc<[u8]> {
    let image = RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255]));
    let mut bytes = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, image::ImageFormat::Png)
        .unwrap();
    bytes.into_inner().into()
}

