use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use renderer::{
    ControllerConfig, FrameStatus, GpuDispatcher, ImageLoader, MemorySource, ReloadReason,
    RenderController, Renderer, RendererConfig, SourceLoader, WallpaperProvider, WallpaperSink,
};

mod common;

use common::{headless, png_bytes, screen, QueueingDispatcher};

/// Serves one in-memory picture and counts how often it was asked for.
struct CountingProvider {
    bytes: Arc<[u8]>,
    calls: AtomicUsize,
}

impl WallpaperProvider for CountingProvider {
    fn current_loader(&self) -> Arc<dyn ImageLoader> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Arc::new(SourceLoader::new(MemorySource(Arc::clone(&self.bytes))))
    }
}

fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    done()
}

#[test]
fn reload_while_hidden_fades_in_once_shown() {
    let Some((device, queue)) = headless() else {
        eprintln!("skipping: no GPU adapter available");
        return;
    };
    let view = screen(&device, 48, 32);
    let mut renderer = Renderer::new(RendererConfig {
        crossfade: Duration::from_millis(30),
        ..RendererConfig::default()
    });
    renderer
        .on_init(device, queue, wgpu::TextureFormat::Rgba8Unorm)
        .unwrap();
    renderer.on_resize(48, 32).unwrap();

    let dispatcher = Arc::new(QueueingDispatcher::default());
    let handle = renderer.handle(Arc::clone(&dispatcher) as Arc<dyn GpuDispatcher>);
    let provider = Arc::new(CountingProvider {
        bytes: png_bytes(96, 64),
        calls: AtomicUsize::new(0),
    });
    let controller = RenderController::new(
        Arc::new(handle) as Arc<dyn WallpaperSink>,
        Arc::clone(&provider) as Arc<dyn WallpaperProvider>,
        ControllerConfig {
            debounce: Duration::from_millis(20),
        },
    )
    .unwrap();

    // Hidden: the request is remembered, nothing is decoded.
    controller.reload(ReloadReason::Immediate);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    assert!(controller.has_pending_reload());
    assert!(!controller.is_loading());
    assert_eq!(dispatcher.drain_into(&mut renderer), 0);

    controller.set_visible(true);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    assert!(!controller.has_pending_reload());
    assert!(wait_until(Duration::from_secs(10), || !controller.is_loading()));

    assert_eq!(dispatcher.drain_into(&mut renderer), 1);
    assert!(!renderer.has_current());
    assert!(renderer.has_incoming());
    assert!(renderer.is_transitioning());

    thread::sleep(Duration::from_millis(60));
    assert_eq!(renderer.on_draw_frame(&view).unwrap(), FrameStatus::Idle);
    assert!(renderer.has_current());
    assert!(!renderer.has_incoming());
    // 96x64 halves once before dropping below 48x32.
    assert_eq!(renderer.current_dimensions(), Some((48, 32)));

    controller.dispose();
    renderer.teardown();
}
