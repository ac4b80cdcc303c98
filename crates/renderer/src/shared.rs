//! Values written from arbitrary threads and read by the GPU thread.
//!
//! Scalars are atomics. The effects bundle is swapped as a whole `Arc`, so a
//! reader sees either the old or the new configuration and never a mix.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, RwLock};

use crate::types::{EffectsConfig, ScalingMode, SurfaceSize};

#[derive(Debug)]
pub(crate) struct SharedState {
    surface: AtomicU64,
    effects: RwLock<Arc<EffectsConfig>>,
    scaling: AtomicU8,
    parallax_offset: AtomicU32,
    load_generation: AtomicU64,
    torn_down: AtomicBool,
    max_texture_dimension: AtomicU32,
}

impl SharedState {
    pub(crate) fn new() -> Self {
        Self {
            surface: AtomicU64::new(SurfaceSize::default().pack()),
            effects: RwLock::new(Arc::new(EffectsConfig::default())),
            scaling: AtomicU8::new(ScalingMode::default().to_raw()),
            parallax_offset: AtomicU32::new(0.5f32.to_bits()),
            load_generation: AtomicU64::new(0),
            torn_down: AtomicBool::new(false),
            max_texture_dimension: AtomicU32::new(0),
        }
    }

    pub(crate) fn surface(&self) -> SurfaceSize {
        SurfaceSize::unpack(self.surface.load(Ordering::Acquire))
    }

    pub(crate) fn set_surface(&self, size: SurfaceSize) {
        self.surface.store(size.pack(), Ordering::Release);
    }

    pub(crate) fn effects(&self) -> Arc<EffectsConfig> {
        match self.effects.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub(crate) fn set_effects(&self, effects: EffectsConfig) {
        self.update_effects(|current| *current = effects);
    }

    /// Read-modify-write under the write lock; readers still only ever see whole values.
    pub(crate) fn update_effects(&self, update: impl FnOnce(&mut EffectsConfig)) {
        let mut guard = match self.effects.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut next = **guard;
        update(&mut next);
        *guard = Arc::new(next);
    }

    pub(crate) fn scaling(&self) -> ScalingMode {
        ScalingMode::from_raw(self.scaling.load(Ordering::Acquire))
    }

    pub(crate) fn set_scaling(&self, mode: ScalingMode) {
        self.scaling.store(mode.to_raw(), Ordering::Release);
    }

    pub(crate) fn parallax_offset(&self) -> f32 {
        f32::from_bits(self.parallax_offset.load(Ordering::Acquire))
    }

    pub(crate) fn set_parallax_offset(&self, offset: f32) {
        let offset = if offset.is_finite() {
            offset.clamp(0.0, 1.0)
        } else {
            0.5
        };
        self.parallax_offset
            .store(offset.to_bits(), Ordering::Release);
    }

    /// Largest texture side the device accepts; zero until a device is attached.
    pub(crate) fn max_texture_dimension(&self) -> u32 {
        self.max_texture_dimension.load(Ordering::Acquire)
    }

    pub(crate) fn set_max_texture_dimension(&self, max: u32) {
        self.max_texture_dimension.store(max, Ordering::Release);
    }

    /// Starts a new load generation, implicitly cancelling every older one.
    pub(crate) fn begin_load(self: &Arc<Self>) -> LoadTicket {
        let generation = self.load_generation.fetch_add(1, Ordering::AcqRel) + 1;
        LoadTicket {
            generation,
            shared: Arc::clone(self),
        }
    }

    pub(crate) fn cancel_loads(&self) {
        self.load_generation.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn mark_torn_down(&self) {
        self.torn_down.store(true, Ordering::Release);
        self.cancel_loads();
    }

    pub(crate) fn revive(&self) {
        self.torn_down.store(false, Ordering::Release);
    }
}

/// Cancellation token for one background load.
///
/// A ticket is cancelled as soon as a newer load starts or the renderer is torn down.
#[derive(Debug, Clone)]
pub struct LoadTicket {
    generation: u64,
    shared: Arc<SharedState>,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.torn_down.load(Ordering::Acquire)
            || self.shared.load_generation.load(Ordering::Acquire) != self.generation
    }
}
