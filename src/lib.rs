//! Spline Chain - a ball-chain shooter simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (curve, chain, match resolution, animation)
//! - `config`: Data-driven chain tuning
//! - `error`: Configuration errors surfaced at initialization

pub mod config;
pub mod error;
pub mod sim;

pub use config::{ChainConfig, SequenceStyle};
pub use error::ConfigError;

/// Simulation configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Default world-space distance between neighbouring balls
    pub const BALL_SPACING: f32 = 0.5;
    /// Default chain speed (world units per second)
    pub const CHAIN_SPEED: f32 = 2.0;
    /// Default buffer zone, as a fraction of the curve length behind t=0
    pub const BUFFER_ZONE_SIZE: f32 = 0.2;
    /// Default smallest run that gets destroyed
    pub const MIN_MATCH_COUNT: usize = 3;

    /// Delay before a settled insertion is checked for matches (seconds)
    pub const MATCH_CHECK_DELAY: f32 = 0.1;
    /// Shrink-to-zero duration for matched balls (seconds)
    pub const DESTROY_ANIMATION_TIME: f32 = 0.3;
    /// Base knockback distance in curve parameter units
    pub const KNOCKBACK_FORCE: f32 = 0.1;
    /// Knockback tween duration (seconds)
    pub const KNOCKBACK_DURATION: f32 = 0.3;
    /// Gap-closing tween duration (seconds)
    pub const SNAP_BACK_DURATION: f32 = 0.2;

    /// Knockback grows by this fraction per ball beyond the minimum match
    pub const KNOCKBACK_GROWTH: f32 = 0.2;
    /// Knockback never exceeds this fraction of the buffer zone
    pub const KNOCKBACK_BUFFER_CAP: f32 = 0.8;

    /// Coarse nearest-point samples along the curve
    pub const NEAREST_SAMPLES: u32 = 100;
}

/// Linear interpolation
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Hermite smoothstep of `t` clamped to [0, 1]
#[inline]
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
