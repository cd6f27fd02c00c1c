//! Outbound notifications to the presentation layer
//!
//! The simulation never renders, plays audio or touches health bars itself.
//! It calls registered observers, in registration order, at well-defined
//! points of a tick.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::chain::{Color, Token, TokenId};

/// Summary of one hit, published once its chain reaction finishes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotReport {
    /// Balls in every matched run of the reaction
    ///
    /// Run members still inside the buffer zone count here but stay on the
    /// chain, so this can exceed the number of balls actually removed.
    pub destroyed: u32,
    /// Matches in the reaction (0 if the shot matched nothing)
    pub combos: u32,
    /// Colors that entered the chain from the queue since the previous report
    pub entered: Vec<Color>,
}

/// Why a token's visual should go away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalCause {
    /// Reached the end of the path
    Escaped,
    /// Destroyed by a match
    Matched,
    /// Simulation torn down
    Teardown,
}

/// Presentation-side collaborator
///
/// Every method has a no-op default so observers implement only what they
/// care about.
pub trait ChainObserver {
    /// A token was created at `world`
    fn on_spawn_visual(&mut self, _token: &Token, _world: Vec3) {}
    /// A token left the chain
    fn on_remove_visual(&mut self, _token: &Token, _cause: RemovalCause) {}
    /// A token's presented position this tick
    fn on_position_updated(&mut self, _token: &Token, _world: Vec3) {}
    /// A matched token's shrink scale this tick
    fn on_token_scale(&mut self, _token: &Token, _scale: f32) {}
    /// A match was found
    fn on_match_sound(&mut self) {}
    /// A hit's chain reaction finished
    fn on_shot_report(&mut self, _report: &ShotReport) {}
    /// Damage derived from the last shot report
    fn on_damage_to_entity(&mut self, _amount: u32) {}
}

/// Lets callers keep a handle on an observer they registered
impl<T: ChainObserver> ChainObserver for Rc<RefCell<T>> {
    fn on_spawn_visual(&mut self, token: &Token, world: Vec3) {
        self.borrow_mut().on_spawn_visual(token, world);
    }
    fn on_remove_visual(&mut self, token: &Token, cause: RemovalCause) {
        self.borrow_mut().on_remove_visual(token, cause);
    }
    fn on_position_updated(&mut self, token: &Token, world: Vec3) {
        self.borrow_mut().on_position_updated(token, world);
    }
    fn on_token_scale(&mut self, token: &Token, scale: f32) {
        self.borrow_mut().on_token_scale(token, scale);
    }
    fn on_match_sound(&mut self) {
        self.borrow_mut().on_match_sound();
    }
    fn on_shot_report(&mut self, report: &ShotReport) {
        self.borrow_mut().on_shot_report(report);
    }
    fn on_damage_to_entity(&mut self, amount: u32) {
        self.borrow_mut().on_damage_to_entity(amount);
    }
}

/// Discrete events, as recorded by [`EventLog`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChainEvent {
    Spawned { id: TokenId, color: Color },
    Removed { id: TokenId, color: Color, cause: RemovalCause },
    MatchSound,
    Report(ShotReport),
    Damage(u32),
}

/// Observer that records discrete events (position and scale updates are
/// counted, not stored)
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    pub events: Vec<ChainEvent>,
    pub position_updates: u64,
    pub scale_updates: u64,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<&ShotReport> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ChainEvent::Report(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    /// Colors of tokens removed for `cause`, in removal order
    pub fn removed(&self, cause: RemovalCause) -> Vec<Color> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ChainEvent::Removed { color, cause: c, .. } if *c == cause => Some(*color),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.position_updates = 0;
        self.scale_updates = 0;
    }
}

impl ChainObserver for EventLog {
    fn on_spawn_visual(&mut self, token: &Token, _world: Vec3) {
        self.events.push(ChainEvent::Spawned {
            id: token.id,
            color: token.color,
        });
    }

    fn on_remove_visual(&mut self, token: &Token, cause: RemovalCause) {
        self.events.push(ChainEvent::Removed {
            id: token.id,
            color: token.color,
            cause,
        });
    }

    fn on_position_updated(&mut self, _token: &Token, _world: Vec3) {
        self.position_updates += 1;
    }

    fn on_token_scale(&mut self, _token: &Token, _scale: f32) {
        self.scale_updates += 1;
    }

    fn on_match_sound(&mut self) {
        self.events.push(ChainEvent::MatchSound);
    }

    fn on_shot_report(&mut self, report: &ShotReport) {
        self.events.push(ChainEvent::Report(report.clone()));
    }

    fn on_damage_to_entity(&mut self, amount: u32) {
        self.events.push(ChainEvent::Damage(amount));
    }
}
