use std::sync::Arc;
use std::time::Duration;

use image::{Rgba, RgbaImage};
use renderer::{
    Completion, EffectSetting, EffectsConfig, FrameStatus, GpuDispatcher, LoadOutcome, MemorySource,
    RenderError, Renderer, RendererConfig, SourceLoader, SurfaceSize, UploadMode,
};

mod common;

use common::{headless, png_bytes, screen, QueueingDispatcher};

#[test]
fn lifecycle_from_init_to_teardown_releases_everything() {
    let Some((device, queue)) = headless() else {
        eprintln!("skipping: no GPU adapter available");
        return;
    };
    let portrait = screen(&device, 108, 192);
    let landscape = screen(&device, 192, 108);

    let mut renderer = Renderer::new(RendererConfig::default());
    renderer
        .on_init(device, queue, wgpu::TextureFormat::Rgba8Unorm)
        .unwrap();
    renderer.on_resize(108, 192).unwrap();
    assert_eq!(renderer.target_size(), Some(SurfaceSize::new(108, 192)));

    let picture = RgbaImage::from_pixel(64, 40, Rgba([10, 200, 90, 255]));
    renderer
        .upload_picture(&picture, 1.0, UploadMode::Immediate)
        .unwrap();
    assert_eq!(renderer.on_draw_frame(&portrait).unwrap(), FrameStatus::Idle);

    renderer.on_resize(192, 108).unwrap();
    assert_eq!(renderer.target_size(), Some(SurfaceSize::new(192, 108)));
    assert_eq!(renderer.current_dimensions(), Some((64, 40)));

    let handle = renderer.handle(Arc::new(QueueingDispatcher::default()));
    handle.set_effects(EffectsConfig {
        blur: EffectSetting::new(true, 50),
        darken: EffectSetting::new(true, 30),
        vignette: EffectSetting::new(true, 60),
        grayscale: EffectSetting::new(true, 100),
        ..EffectsConfig::default()
    });
    handle.set_parallax_offset(0.25);
    renderer.on_draw_frame(&landscape).unwrap();

    assert!(renderer.live_gpu_objects().total() > 0);
    renderer.teardown();
    assert_eq!(renderer.live_gpu_objects().total(), 0);
    assert!(!renderer.has_current());
    assert!(!renderer.has_incoming());
    assert!(matches!(
        renderer.on_draw_frame(&landscape),
        Err(RenderError::NotInitialised)
    ));
}

#[test]
fn invalid_image_is_rejected_without_touching_slots() {
    let Some((device, queue)) = headless() else {
        eprintln!("skipping: no GPU adapter available");
        return;
    };
    let mut renderer = Renderer::new(RendererConfig::default());
    renderer
        .on_init(device, queue, wgpu::TextureFormat::Rgba8Unorm)
        .unwrap();
    renderer
        .upload_picture(
            &RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255])),
            1.0,
            UploadMode::Immediate,
        )
        .unwrap();

    let result = renderer.upload_picture(&RgbaImage::new(0, 0), 1.0, UploadMode::Crossfade);
    assert!(matches!(result, Err(RenderError::InvalidImage { .. })));
    assert_eq!(renderer.current_dimensions(), Some((4, 4)));
    assert!(!renderer.has_incoming());
    assert!(!renderer.is_transitioning());
}

#[test]
fn background_load_lands_through_the_dispatcher() {
    let Some((device, queue)) = headless() else {
        eprintln!("skipping: no GPU adapter available");
        return;
    };
    let view = screen(&device, 32, 32);
    let mut renderer = Renderer::new(RendererConfig {
        crossfade: Duration::from_millis(10),
        ..RendererConfig::default()
    });
    renderer
        .on_init(device, queue, wgpu::TextureFormat::Rgba8Unorm)
        .unwrap();
    renderer.on_resize(32, 32).unwrap();

    let dispatcher = Arc::new(QueueingDispatcher::default());
    let handle = renderer.handle(Arc::clone(&dispatcher) as Arc<dyn GpuDispatcher>);
    let (done_tx, done_rx) = std::sync::mpsc::channel();
    handle.enqueue_wallpaper(
        Arc::new(SourceLoader::new(MemorySource(png_bytes(128, 128)))),
        UploadMode::Crossfade,
        Completion::new(move |outcome| {
            let _ = done_tx.send(outcome);
        }),
    );

    let outcome = done_rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(outcome, LoadOutcome::Delivered);
    assert_eq!(dispatcher.drain_into(&mut renderer), 1);
    assert!(renderer.has_incoming());
    assert!(renderer.is_transitioning());

    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(renderer.on_draw_frame(&view).unwrap(), FrameStatus::Idle);
    // 128 / 32 leaves a factor of four.
    assert_eq!(renderer.current_dimensions(), Some((32, 32)));
}

#[test]
fn panorama_wider_than_the_texture_limit_is_shrunk_before_upload() {
    let Some((device, queue)) = headless() else {
        eprintln!("skipping: no GPU adapter available");
        return;
    };
    let limit = device.limits().max_texture_dimension_2d;
    let mut renderer = Renderer::new(RendererConfig {
        crossfade: Duration::ZERO,
        ..RendererConfig::default()
    });
    renderer
        .on_init(device, queue, wgpu::TextureFormat::Rgba8Unorm)
        .unwrap();
    renderer.on_resize(32, 32).unwrap();

    let dispatcher = Arc::new(QueueingDispatcher::default());
    let handle = renderer.handle(Arc::clone(&dispatcher) as Arc<dyn GpuDispatcher>);
    let (done_tx, done_rx) = std::sync::mpsc::channel();
    handle.enqueue_wallpaper(
        Arc::new(SourceLoader::new(MemorySource(png_bytes(limit * 2 + 8, 4)))),
        UploadMode::Immediate,
        Completion::new(move |outcome| {
            let _ = done_tx.send(outcome);
        }),
    );

    assert_eq!(
        done_rx.recv_timeout(Duration::from_secs(30)).unwrap(),
        LoadOutcome::Delivered
    );
    assert_eq!(dispatcher.drain_into(&mut renderer), 1);
    let (width, height) = renderer.current_dimensions().unwrap();
    assert!(width <= limit && height <= limit);
    assert!(width > limit / 4);
}
