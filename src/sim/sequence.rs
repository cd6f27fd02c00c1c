//! Pre-generated color sequences for the spawner
//!
//! Grouped runs are what make a chain feel like Zuma: tight clusters that are
//! easy to complete, with no guarantee the level is solvable.

use rand::Rng;
use rand::seq::SliceRandom;
use rand_pcg::Pcg32;

use super::chain::Color;
use crate::error::ConfigError;

/// Repeatedly pick a color and a run length in `min_run..=max_run`, append
/// that many copies, until `count` colors exist. The final run is truncated.
pub fn grouped(
    rng: &mut Pcg32,
    palette: u8,
    count: usize,
    min_run: usize,
    max_run: usize,
) -> Result<Vec<Color>, ConfigError> {
    if palette == 0 {
        return Err(ConfigError::EmptyPalette);
    }
    if min_run == 0 || min_run > max_run {
        return Err(ConfigError::InvalidRunLength {
            min: min_run,
            max: max_run,
        });
    }

    let mut seq = Vec::with_capacity(count);
    while seq.len() < count {
        let color: Color = rng.random_range(0..palette);
        let run = rng.random_range(min_run..=max_run);
        let take = run.min(count - seq.len());
        seq.extend(std::iter::repeat_n(color, take));
    }
    Ok(seq)
}

/// A shuffled palette repeated until `count` colors exist (no runs at all)
pub fn shuffled_cycle(rng: &mut Pcg32, palette: u8, count: usize) -> Result<Vec<Color>, ConfigError> {
    if palette == 0 {
        return Err(ConfigError::EmptyPalette);
    }

    let mut order: Vec<Color> = (0..palette).collect();
    order.shuffle(rng);
    Ok(order.iter().copied().cycle().take(count).collect())
}

/// Check a caller-provided sequence against the palette
pub fn validate(seq: &[Color], palette: u8) -> Result<(), ConfigError> {
    if palette == 0 {
        return Err(ConfigError::EmptyPalette);
    }
    match seq.iter().find(|&&c| c >= palette) {
        Some(&color) => Err(ConfigError::ColorOutOfPalette { color, palette }),
        None => Ok(()),
    }
}
