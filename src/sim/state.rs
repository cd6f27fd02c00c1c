//! Simulation state: the chain, its queue and the reaction in flight
//!
//! `ChainSim` owns everything one ball chain needs. Stepping lives in
//! `tick.rs`; this file covers construction, hit reporting and lifecycle.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use glam::Vec3;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::chain::{Chain, Color, Token, TokenId};
use super::curve::Curve;
use super::events::{ChainObserver, RemovalCause};
use super::resolve::Cycle;
use super::sequence;
use crate::config::{ChainConfig, SequenceStyle};
use crate::error::ConfigError;

/// Running totals for one simulation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimStats {
    /// Ticks that actually ran (not paused)
    pub ticks: u64,
    /// Hits accepted
    pub shots: u32,
    /// Balls that reached the end of the path
    pub escaped: u32,
    /// Sum of `ShotReport::destroyed`; buffer-exempt balls included
    pub destroyed: u32,
    /// Matches across all reactions
    pub combos: u32,
}

/// Shared flag that abandons the reaction in flight on the next tick
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }

    /// Read and clear
    pub(crate) fn take(&self) -> bool {
        self.0.replace(false)
    }
}

/// One ball chain on one curve
pub struct ChainSim {
    pub(crate) config: ChainConfig,
    pub(crate) curve: Curve,
    pub(crate) chain: Chain,
    /// Colors still waiting to enter through the buffer zone
    pub(crate) queue: VecDeque<Color>,
    /// Colors that entered since the last shot report
    pub(crate) entered: Vec<Color>,
    /// Reaction in flight; while present the chain neither moves nor spawns
    pub(crate) cycle: Option<Cycle>,
    pub(crate) observers: Vec<Box<dyn ChainObserver>>,
    pub(crate) paused: bool,
    pub(crate) cancel: CancelToken,
    pub(crate) stats: SimStats,
    next_id: u32,
}

impl ChainSim {
    /// Build a chain from an explicit color sequence
    ///
    /// The first `initial_visible_count` colors are laid out from the back of
    /// the buffer zone at exact spacing; the rest wait in the queue. Observers
    /// are attached afterwards, so the initial tokens produce no spawn events.
    pub fn new(curve: Curve, sequence: Vec<Color>, config: ChainConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        sequence::validate(&sequence, config.palette_size)?;

        let spacing = config.ball_spacing / curve.length();
        let mut sim = Self {
            chain: Chain::new(spacing),
            queue: sequence.into(),
            entered: Vec::new(),
            cycle: None,
            observers: Vec::new(),
            paused: false,
            cancel: CancelToken::default(),
            stats: SimStats::default(),
            next_id: 1,
            config,
            curve,
        };

        let rear = -sim.config.buffer_zone_size;
        let visible = sim.config.initial_visible_count.min(sim.queue.len());
        for i in 0..visible {
            let Some(color) = sim.queue.pop_front() else {
                break;
            };
            let id = sim.next_token_id();
            let token = Token::new(id, color, rear + i as f32 * spacing);
            let end = sim.chain.len();
            sim.chain.insert(end, token);
        }

        log::info!(
            "Chain initialized: length {:.2}, spacing {:.4}, {} visible, {} queued",
            sim.curve.length(),
            spacing,
            sim.chain.len(),
            sim.queue.len()
        );
        Ok(sim)
    }

    /// Build a chain whose colors come from a seeded generator
    pub fn from_seed(curve: Curve, config: ChainConfig, seed: u64) -> Result<Self, ConfigError> {
        let mut rng = Pcg32::seed_from_u64(seed);
        let sequence = match config.sequence_style {
            SequenceStyle::Grouped => sequence::grouped(
                &mut rng,
                config.palette_size,
                config.total_ball_count,
                config.min_group_size,
                config.max_group_size,
            )?,
            SequenceStyle::Shuffled => {
                sequence::shuffled_cycle(&mut rng, config.palette_size, config.total_ball_count)?
            }
        };
        Self::new(curve, sequence, config)
    }

    pub(crate) fn next_token_id(&mut self) -> TokenId {
        let id = TokenId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Advance by `dt` seconds (see [`super::tick::tick`])
    pub fn tick(&mut self, dt: f32) {
        super::tick::tick(self, dt);
    }

    /// Register an observer; callbacks run in registration order
    pub fn add_observer(&mut self, observer: Box<dyn ChainObserver>) {
        self.observers.push(observer);
    }

    /// Insert a ball where a shot hit the chain
    ///
    /// Returns `false` (and changes nothing) while a reaction is running,
    /// while paused, or for a color outside the palette. Each physical hit
    /// must be reported exactly once.
    pub fn report_hit(&mut self, world: Vec3, color: Color) -> bool {
        if color >= self.config.palette_size {
            log::warn!(
                "Rejected hit with color {color}, palette has {}",
                self.config.palette_size
            );
            return false;
        }
        if self.paused || self.cycle.is_some() {
            log::debug!("Hit dropped: simulation busy");
            return false;
        }

        let hit_t = self.curve.nearest_parameter(world, self.config.sampling);
        let index = self.chain.insertion_index(hit_t);
        let tokens = self.chain.tokens();
        let position = match (index.checked_sub(1).map(|i| &tokens[i]), tokens.get(index)) {
            (Some(before), Some(after)) => (before.position + after.position) * 0.5,
            (None, Some(first)) => {
                (first.position - self.chain.spacing()).max(-self.config.buffer_zone_size)
            }
            _ => hit_t,
        };

        let id = self.next_token_id();
        self.chain.insert(index, Token::new(id, color, position));
        self.chain.rearrange_from(index.saturating_sub(1));
        if let Some(token) = self.chain.get(index) {
            let world = self.curve.position(token.visual);
            for observer in &mut self.observers {
                observer.on_spawn_visual(token, world);
            }
        }

        log::debug!("Inserted color {color} at index {index} (hit t={hit_t:.4})");
        self.cycle = Some(Cycle::begin(index, color, &self.config));
        self.stats.shots += 1;
        true
    }

    /// Freeze or resume everything, reactions included
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether a hit's reaction is still running
    pub fn is_processing(&self) -> bool {
        self.cycle.is_some()
    }

    /// The reaction in flight, if any
    pub fn cycle(&self) -> Option<&Cycle> {
        self.cycle.as_ref()
    }

    /// Handle for cancelling the reaction in flight from elsewhere
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Abandon any reaction and remove every token (e.g. the boss died)
    pub fn teardown(&mut self) {
        self.cycle = None;
        self.queue.clear();
        self.entered.clear();
        let removed = self.chain.drain();
        for token in &removed {
            for observer in &mut self.observers {
                observer.on_remove_visual(token, RemovalCause::Teardown);
            }
        }
        log::info!("Chain torn down, {} balls removed", removed.len());
    }

    pub fn tokens(&self) -> &[Token] {
        self.chain.tokens()
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn stats(&self) -> SimStats {
        self.stats
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn curve(&self) -> &Curve {
        &self.curve
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Nothing left on the path or in the queue
    pub fn is_cleared(&self) -> bool {
        self.chain.is_empty() && self.queue.is_empty()
    }
}
