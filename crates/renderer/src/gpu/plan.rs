//! Decides what a frame draws before any GPU work is encoded.

use crate::transform::{picture_transform, Mat4, Parallax};
use crate::types::{EffectsConfig, ScalingMode, SurfaceSize};

use super::timeline::FadeMix;

/// Blur radii at or below this many pixels skip the blur passes.
pub(crate) const BLUR_EPSILON: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Current,
    Incoming,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SlotInfo {
    pub width: u32,
    pub height: u32,
    pub brightness: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Route {
    /// Color effects straight from the picture texture to the screen.
    Direct,
    /// Horizontal blur, vertical blur, then color effects.
    Blurred { radius: f32 },
}

/// Factors consumed by the color-effects stage; zero is always a no-op.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ColorEffects {
    pub darken: f32,
    pub vignette: f32,
    pub grayscale: f32,
    pub brightness: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SlotDraw {
    pub slot: Slot,
    pub alpha: f32,
    pub transform: Mat4,
    /// On-screen width of the picture, used to scale horizontal blur taps.
    pub scaled_width: f32,
    pub route: Route,
    pub effects: ColorEffects,
}

pub(crate) struct FrameInputs<'a> {
    pub surface: SurfaceSize,
    pub effects: &'a EffectsConfig,
    pub scaling: ScalingMode,
    pub parallax_offset: f32,
    pub max_blur_radius: f32,
    pub current: Option<SlotInfo>,
    pub incoming: Option<SlotInfo>,
    pub mix: FadeMix,
}

/// Ordered draws for one frame; empty means clear only.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct FramePlan {
    pub draws: Vec<SlotDraw>,
}

pub(crate) fn blur_radius(effects: &EffectsConfig, max_radius: f32) -> f32 {
    if effects.blur.enabled {
        effects.blur.factor() * max_radius.max(0.0)
    } else {
        0.0
    }
}

pub(crate) fn plan_frame(inputs: &FrameInputs<'_>) -> FramePlan {
    let radius = blur_radius(inputs.effects, inputs.max_blur_radius);
    let route = if inputs.effects.blur.enabled && radius > BLUR_EPSILON {
        Route::Blurred { radius }
    } else {
        Route::Direct
    };
    let parallax = if inputs.effects.parallax.enabled {
        Parallax {
            intensity: inputs.effects.parallax.factor(),
            offset: inputs.parallax_offset,
        }
    } else {
        Parallax::NONE
    };

    let slots = [
        (Slot::Current, inputs.current, inputs.mix.current),
        (Slot::Incoming, inputs.incoming, inputs.mix.incoming),
    ];

    let draws = slots
        .into_iter()
        .filter_map(|(slot, info, alpha)| info.map(|info| (slot, info, alpha)))
        .filter(|(_, _, alpha)| *alpha > f32::EPSILON)
        .map(|(slot, info, alpha)| {
            let image = (info.width, info.height);
            let placement =
                crate::transform::placement(inputs.scaling, inputs.surface, image, parallax);
            SlotDraw {
                slot,
                alpha,
                transform: picture_transform(inputs.scaling, inputs.surface, image, parallax),
                scaled_width: placement.scaled_width,
                route,
                effects: ColorEffects {
                    darken: inputs.effects.darken.factor(),
                    vignette: inputs.effects.vignette.factor(),
                    grayscale: inputs.effects.grayscale.factor(),
                    brightness: if inputs.effects.adaptive_brightness {
                        info.brightness
                    } else {
                        1.0
                    },
                },
            }
        })
        .collect();

    FramePlan { draws }
}
