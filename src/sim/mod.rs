//! Deterministic simulation module
//!
//! All chain logic lives here. This module must be pure and deterministic:
//! - Caller-driven timestep only
//! - Seeded RNG only
//! - Stable iteration order (chain order, observers in registration order)
//! - No rendering, audio or platform dependencies

pub mod ammo;
pub mod chain;
pub mod curve;
pub mod events;
pub mod health;
pub mod resolve;
pub mod sequence;
pub mod state;
pub mod tick;
pub mod tween;

pub use ammo::Ammo;
pub use chain::{Chain, Color, Token, TokenId, TokenState};
pub use curve::{Curve, NearestSampling};
pub use events::{ChainEvent, ChainObserver, EventLog, RemovalCause, ShotReport};
pub use health::{BossHealth, DamageRules, Health, HealthChange};
pub use resolve::{Cycle, Outcome, Stage};
pub use state::{CancelToken, ChainSim, SimStats};
pub use tick::tick;
pub use tween::{Ease, Slide, Tween};
