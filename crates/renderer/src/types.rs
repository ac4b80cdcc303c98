use std::time::Duration;

/// Physical surface dimensions in pixels.
///
/// `(0, 0)` means the host has not reported a size yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True once both axes are non-zero.
    pub fn is_known(self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub(crate) fn pack(self) -> u64 {
        (u64::from(self.width) << 32) | u64::from(self.height)
    }

    pub(crate) fn unpack(raw: u64) -> Self {
        Self {
            width: (raw >> 32) as u32,
            height: raw as u32,
        }
    }
}

/// How image aspect maps onto surface aspect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScalingMode {
    /// Cover the surface, cropping the overflowing axis.
    #[default]
    Fill,
    /// Fit inside the surface, letterboxing the short axis.
    Fit,
    /// Scale each axis independently to the surface.
    Stretch,
    /// Draw at native pixel size.
    None,
}

impl ScalingMode {
    pub(crate) fn to_raw(self) -> u8 {
        match self {
            ScalingMode::Fill => 0,
            ScalingMode::Fit => 1,
            ScalingMode::Stretch => 2,
            ScalingMode::None => 3,
        }
    }

    pub(crate) fn from_raw(raw: u8) -> Self {
        match raw {
            1 => ScalingMode::Fit,
            2 => ScalingMode::Stretch,
            3 => ScalingMode::None,
            _ => ScalingMode::Fill,
        }
    }
}

impl std::fmt::Display for ScalingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalingMode::Fill => f.write_str("fill"),
            ScalingMode::Fit => f.write_str("fit"),
            ScalingMode::Stretch => f.write_str("stretch"),
            ScalingMode::None => f.write_str("none"),
        }
    }
}

/// Enable flag plus intensity for a single effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EffectSetting {
    pub enabled: bool,
    /// Intensity in percent; values above 100 are clamped when read.
    pub percent: u8,
}

impl EffectSetting {
    pub const fn new(enabled: bool, percent: u8) -> Self {
        Self { enabled, percent }
    }

    pub const fn off() -> Self {
        Self::new(false, 0)
    }

    /// Normalised intensity in `0.0..=1.0`; zero whenever the effect is disabled.
    pub fn factor(self) -> f32 {
        if self.enabled {
            f32::from(self.percent.min(100)) / 100.0
        } else {
            0.0
        }
    }
}

/// Every user-tunable visual effect, published to the GPU thread as one value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EffectsConfig {
    pub darken: EffectSetting,
    pub blur: EffectSetting,
    pub vignette: EffectSetting,
    pub grayscale: EffectSetting,
    pub parallax: EffectSetting,
    pub adaptive_brightness: bool,
}

/// Shape applied to crossfade progress before it becomes an alpha value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CrossfadeCurve {
    #[default]
    Linear,
    Smoothstep,
    EaseInOut,
}

/// Why a reload was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadReason {
    /// Start the load now, cancelling any pending debounce.
    Immediate,
    /// Coalesce with other queued requests inside the debounce window.
    Queued,
}

/// How a freshly decoded picture replaces what is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    Crossfade,
    Immediate,
}

/// Engine tuning shared by the renderer and its background loader.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Wall-clock length of a crossfade.
    pub crossfade: Duration,
    pub crossfade_curve: CrossfadeCurve,
    /// Blur radius in pixels at 100% intensity.
    pub max_blur_radius: f32,
    /// Longest the loader waits for the first resize before using the display size.
    pub surface_wait: Duration,
    pub surface_poll: Duration,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            crossfade: Duration::from_millis(1000),
            crossfade_curve: CrossfadeCurve::Linear,
            max_blur_radius: 24.0,
            surface_wait: Duration::from_secs(2),
            surface_poll: Duration::from_millis(50),
        }
    }
}

/// Controller tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Window in which queued reloads are coalesced.
    pub debounce: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(250),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_size_packs_losslessly() {
        let size = SurfaceSize::new(1920, 1080);
        assert_eq!(SurfaceSize::unpack(size.pack()), size);
        assert!(!SurfaceSize::default().is_known());
    }

    #[test]
    fn disabled_effect_has_zero_factor() {
        assert_eq!(EffectSetting::new(false, 80).factor(), 0.0);
        assert!((EffectSetting::new(true, 50).factor() - 0.5).abs() < 1e-6);
        assert_eq!(EffectSetting::new(true, 250).factor(), 1.0);
    }

    #[test]
    fn scaling_mode_round_trips_raw_encoding() {
        for mode in [
            ScalingMode::Fill,
            ScalingMode::Fit,
            ScalingMode::Stretch,
            ScalingMode::None,
        ] {
            assert_eq!(ScalingMode::from_raw(mode.to_raw()), mode);
        }
    }
}
