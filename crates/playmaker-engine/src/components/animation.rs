//! Time-boxed behavior animations.
//!
//! A running jump arc or fade is plain data on its behavior. The stage calls
//! [`advance`] once per frame with the current time; nothing here schedules
//! callbacks, so cancelling an animation is just replacing it with
//! [`Animation::Idle`].

use std::f32::consts::PI;

/// In-flight animation owned by one behavior.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Animation {
    /// Nothing running.
    #[default]
    Idle,
    /// Vertical arc: `y = baseline_y - sin(pi * progress) * height`.
    Jump {
        start_ms: f64,
        baseline_y: f32,
        height: f32,
        duration_ms: f32,
    },
    /// Opacity ramp from 0 to 1.
    Fade { start_ms: f64, duration_ms: f32 },
}

/// What one [`advance`] call wants written back to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnimationStep {
    /// New top-left y, if the animation drives position.
    pub y: Option<f32>,
    /// New opacity, if the animation drives opacity.
    pub opacity: Option<f32>,
    /// The animation reached progress 1 on this step.
    pub finished: bool,
}

impl Animation {
    pub fn jump(start_ms: f64, baseline_y: f32, height: f32, duration_ms: f32) -> Self {
        Animation::Jump {
            start_ms,
            baseline_y,
            height,
            duration_ms,
        }
    }

    pub fn fade(start_ms: f64, duration_ms: f32) -> Self {
        Animation::Fade {
            start_ms,
            duration_ms,
        }
    }

    pub fn is_running(&self) -> bool {
        !matches!(self, Animation::Idle)
    }

    /// Whether this animation owns the entity's position.
    pub fn drives_position(&self) -> bool {
        matches!(self, Animation::Jump { .. })
    }
}

/// Normalized progress in [0, 1]. A non-positive duration is already complete.
pub fn progress(start_ms: f64, duration_ms: f32, now_ms: f64) -> f32 {
    if duration_ms <= 0.0 {
        return 1.0;
    }
    (((now_ms - start_ms) / duration_ms as f64) as f32).clamp(0.0, 1.0)
}

/// Advance `state` to `now_ms`.
///
/// Returns the next state and the entity writes for this frame. A jump that
/// completes snaps exactly to its baseline rather than evaluating the arc at
/// progress 1, so no float residue is left behind.
pub fn advance(state: &Animation, now_ms: f64) -> (Animation, AnimationStep) {
    match *state {
        Animation::Idle => (Animation::Idle, AnimationStep::default()),
        Animation::Jump {
            start_ms,
            baseline_y,
            height,
            duration_ms,
        } => {
            let t = progress(start_ms, duration_ms, now_ms);
            if t >= 1.0 {
                let step = AnimationStep {
                    y: Some(baseline_y),
                    finished: true,
                    ..AnimationStep::default()
                };
                (Animation::Idle, step)
            } else {
                let step = AnimationStep {
                    y: Some(baseline_y - (PI * t).sin() * height),
                    ..AnimationStep::default()
                };
                (*state, step)
            }
        }
        Animation::Fade {
            start_ms,
            duration_ms,
        } => {
            let t = progress(start_ms, duration_ms, now_ms);
            if t >= 1.0 {
                let step = AnimationStep {
                    opacity: Some(1.0),
                    finished: true,
                    ..AnimationStep::default()
                };
                (Animation::Idle, step)
            } else {
                let step = AnimationStep {
                    opacity: Some(t),
                    ..AnimationStep::default()
                };
                (*state, step)
            }
        }
    }
}
