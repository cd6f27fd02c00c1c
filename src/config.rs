//! Chain tuning
//!
//! Loaded from JSON (or built in code) and validated once before a
//! simulation is created.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;
use crate::sim::curve::NearestSampling;
use crate::sim::health::DamageRules;

/// Color generator used by [`crate::sim::ChainSim::from_seed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceStyle {
    /// Random same-color groups of `min_group_size..=max_group_size`
    Grouped,
    /// The palette shuffled once and repeated
    Shuffled,
}

/// All knobs for one ball chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    // === Chain ===
    /// World-space distance between neighbouring balls
    pub ball_spacing: f32,
    /// World units per second along the curve
    pub chain_speed: f32,
    /// Fraction of the curve length behind t=0 where balls queue up unseen
    pub buffer_zone_size: f32,

    // === Matching ===
    /// Smallest same-color run that gets destroyed
    pub min_match_count: usize,
    /// Delay before an insertion (or exposed boundary) is checked
    pub match_check_delay: f32,
    /// Shrink-to-zero time for matched balls
    pub destroy_animation_time: f32,
    /// Base recoil distance (curve parameter units)
    pub knockback_force: f32,
    /// Recoil tween time
    pub knockback_duration: f32,
    /// Gap-closing tween time
    pub snap_back_duration: f32,

    // === Sequence ===
    /// Number of distinct colors
    pub palette_size: u8,
    /// Balls generated for the whole level
    pub total_ball_count: usize,
    /// Balls placed on the curve at start
    pub initial_visible_count: usize,
    /// Shortest generated same-color group
    pub min_group_size: usize,
    /// Longest generated same-color group
    pub max_group_size: usize,
    /// How the level's colors are generated
    pub sequence_style: SequenceStyle,

    // === Hit resolution ===
    /// Curve sampling used to map a hit point onto the chain
    pub sampling: NearestSampling,

    // === Scoring ===
    /// How shot reports translate into damage and healing
    pub damage: DamageRules,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            ball_spacing: BALL_SPACING,
            chain_speed: CHAIN_SPEED,
            buffer_zone_size: BUFFER_ZONE_SIZE,

            min_match_count: MIN_MATCH_COUNT,
            match_check_delay: MATCH_CHECK_DELAY,
            destroy_animation_time: DESTROY_ANIMATION_TIME,
            knockback_force: KNOCKBACK_FORCE,
            knockback_duration: KNOCKBACK_DURATION,
            snap_back_duration: SNAP_BACK_DURATION,

            palette_size: 4,
            total_ball_count: 30,
            initial_visible_count: 10,
            min_group_size: 3,
            max_group_size: 5,
            sequence_style: SequenceStyle::Grouped,

            sampling: NearestSampling::default(),
            damage: DamageRules::default(),
        }
    }
}

impl ChainConfig {
    /// Parse a config from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded chain config from {}", path.display());
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values that would make ticking produce NaN or loop forever
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.palette_size == 0 {
            return Err(ConfigError::EmptyPalette);
        }
        positive("ball_spacing", self.ball_spacing)?;
        non_negative("chain_speed", self.chain_speed)?;
        non_negative("buffer_zone_size", self.buffer_zone_size)?;
        non_negative("match_check_delay", self.match_check_delay)?;
        non_negative("destroy_animation_time", self.destroy_animation_time)?;
        non_negative("knockback_force", self.knockback_force)?;
        non_negative("knockback_duration", self.knockback_duration)?;
        non_negative("snap_back_duration", self.snap_back_duration)?;

        if self.min_match_count < 2 {
            return Err(ConfigError::MinMatchTooSmall(self.min_match_count));
        }
        if self.min_group_size == 0 || self.min_group_size > self.max_group_size {
            return Err(ConfigError::InvalidRunLength {
                min: self.min_group_size,
                max: self.max_group_size,
            });
        }
        if self.sampling.coarse == 0 || self.sampling.refine == Some(0) {
            return Err(ConfigError::ZeroSampling);
        }
        Ok(())
    }

    /// Knockback distance for a destroyed run of `count` balls
    pub fn knockback_for(&self, count: usize) -> f32 {
        let extra = count.saturating_sub(self.min_match_count) as f32;
        (self.knockback_force * (1.0 + extra * KNOCKBACK_GROWTH))
            .min(self.buffer_zone_size * KNOCKBACK_BUFFER_CAP)
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}
