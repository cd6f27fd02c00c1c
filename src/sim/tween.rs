//! Timed interpolation for knockback, snap-back and shrink animations
//!
//! Tweens only ever touch presentation values (`visual`, `scale`). When the
//! elapsed time reaches the duration they report exactly `1.0`, so the
//! animated value lands on its target without accumulated drift.

use serde::{Deserialize, Serialize};

use super::chain::{Chain, TokenId};
use crate::{lerp, smoothstep};

/// Easing curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ease {
    Linear,
    Smooth,
}

impl Ease {
    #[inline]
    pub fn apply(self, t: f32) -> f32 {
        match self {
            Ease::Linear => t.clamp(0.0, 1.0),
            Ease::Smooth => smoothstep(t),
        }
    }
}

/// Elapsed-time clock for one animation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tween {
    pub elapsed: f32,
    pub duration: f32,
    pub ease: Ease,
}

impl Tween {
    pub fn new(duration: f32, ease: Ease) -> Self {
        Self {
            elapsed: 0.0,
            duration: duration.max(0.0),
            ease,
        }
    }

    /// Advance by `dt`, returning the time left over once finished
    pub fn step(&mut self, dt: f32) -> Option<f32> {
        self.elapsed += dt;
        if self.elapsed >= self.duration {
            let leftover = self.elapsed - self.duration;
            self.elapsed = self.duration;
            Some(leftover)
        } else {
            None
        }
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Eased progress in [0, 1]
    pub fn progress(&self) -> f32 {
        if self.is_finished() {
            1.0
        } else {
            self.ease.apply(self.elapsed / self.duration)
        }
    }
}

/// Per-token visual slide from one parameter to another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub id: TokenId,
    pub from: f32,
    pub to: f32,
}

/// Apply `progress` to each slide; tokens removed meanwhile are skipped
pub fn apply_slides(chain: &mut Chain, slides: &[Slide], progress: f32) {
    for slide in slides {
        if let Some(index) = chain.index_of(slide.id) {
            chain.tokens_mut()[index].visual = if progress >= 1.0 {
                slide.to
            } else {
                lerp(slide.from, slide.to, progress)
            };
        }
    }
}

/// Shrink the listed tokens from full size towards zero
pub fn apply_shrink(chain: &mut Chain, ids: &[TokenId], progress: f32) {
    let scale = lerp(1.0, 0.0, progress);
    for &id in ids {
        if let Some(index) = chain.index_of(id) {
            chain.tokens_mut()[index].scale = scale;
        }
    }
}
