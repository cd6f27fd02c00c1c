//! Shooter ammunition: the ball in the mouth and the one waiting behind it

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::chain::Color;
use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct Ammo {
    current: Color,
    next: Color,
    palette: u8,
    rng: Pcg32,
}

impl Ammo {
    pub fn new(palette: u8, seed: u64) -> Result<Self, ConfigError> {
        if palette == 0 {
            return Err(ConfigError::EmptyPalette);
        }
        let mut rng = Pcg32::seed_from_u64(seed);
        let current = rng.random_range(0..palette);
        let next = rng.random_range(0..palette);
        Ok(Self {
            current,
            next,
            palette,
            rng,
        })
    }

    pub fn current(&self) -> Color {
        self.current
    }

    pub fn next(&self) -> Color {
        self.next
    }

    /// Shoot the current ball; the next one moves up and a new one is drawn
    pub fn fire(&mut self) -> Color {
        let fired = self.current;
        self.current = self.next;
        self.next = self.rng.random_range(0..self.palette);
        fired
    }

    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
    }
}
