use std::time::{Duration, Instant};

use crate::types::CrossfadeCurve;

impl CrossfadeCurve {
    pub(crate) fn sample(self, t: f32) -> f32 {
        let clamped = t.clamp(0.0, 1.0);
        match self {
            CrossfadeCurve::Linear => clamped,
            CrossfadeCurve::Smoothstep => clamped * clamped * (3.0 - 2.0 * clamped),
            CrossfadeCurve::EaseInOut => {
                if clamped < 0.5 {
                    2.0 * clamped * clamped
                } else {
                    -1.0 + (4.0 - 2.0 * clamped) * clamped
                }
            }
        }
    }
}

/// Crossfade between the current and incoming picture slots.
///
/// Progress is derived from wall-clock time on every query, never accumulated
/// per frame, so the fade runs at the same speed at any refresh rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Crossfade {
    Idle,
    Transitioning {
        start: Instant,
        duration: Duration,
        progress: f32,
    },
}

/// Alphas for one frame plus whether the transition just reached its end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct FadeMix {
    pub current: f32,
    pub incoming: f32,
    pub finished: bool,
}

impl Crossfade {
    pub fn start(duration: Duration, now: Instant) -> Self {
        Crossfade::Transitioning {
            start: now,
            duration,
            progress: 0.0,
        }
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(self, Crossfade::Transitioning { .. })
    }

    pub fn progress(&self) -> f32 {
        match self {
            Crossfade::Idle => 0.0,
            Crossfade::Transitioning { progress, .. } => *progress,
        }
    }

    /// Recomputes progress for `now`; a zero duration completes immediately.
    pub fn advance(&mut self, now: Instant) -> f32 {
        if let Crossfade::Transitioning {
            start,
            duration,
            progress,
        } = self
        {
            let elapsed = now.saturating_duration_since(*start);
            let next = if duration.is_zero() || elapsed >= *duration {
                1.0
            } else {
                (elapsed.as_secs_f32() / duration.as_secs_f32()).clamp(0.0, 1.0)
            };
            // Monotonic even if the host hands us an earlier timestamp.
            *progress = progress.max(next);
            *progress
        } else {
            0.0
        }
    }

    pub fn mixes(&self, curve: CrossfadeCurve) -> FadeMix {
        match self {
            Crossfade::Idle => FadeMix {
                current: 1.0,
                incoming: 0.0,
                finished: false,
            },
            Crossfade::Transitioning { progress, .. } => {
                let mix = curve.sample(*progress);
                FadeMix {
                    current: 1.0 - mix,
                    incoming: mix,
                    finished: *progress >= 1.0,
                }
            }
        }
    }
}
