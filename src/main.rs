//! Spline Chain - headless demo
//!
//! Runs a seeded chain along a spiral boss path with an auto-aiming shooter
//! and logs every shot report until the boss dies or the chain is gone.
//!
//! Usage: `spline-chain [config.json] [seed]`

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;

use spline_chain::consts::{MAX_SUBSTEPS, SIM_DT};
use spline_chain::sim::{Ammo, BossHealth, ChainSim, Color, Curve, Token};
use spline_chain::{ChainConfig, ConfigError};

/// Simulated frame time of the driving loop
const FRAME_DT: f32 = 1.0 / 60.0;
/// Seconds between shots
const FIRE_INTERVAL: f32 = 0.6;
/// Give up after this much simulated time
const MAX_SECONDS: f32 = 600.0;
const BOSS_HEALTH: u32 = 120;

struct Demo {
    sim: ChainSim,
    ammo: Ammo,
    boss: Rc<RefCell<BossHealth>>,
    accumulator: f32,
    cooldown: f32,
    elapsed: f32,
}

impl Demo {
    fn new(config: ChainConfig, seed: u64) -> Result<Self, ConfigError> {
        let curve = Curve::spiral(Vec3::ZERO, 5.0, 4.0, 2.0, 200)?;
        let boss = Rc::new(RefCell::new(BossHealth::new(BOSS_HEALTH, config.damage)));
        let ammo = Ammo::new(config.palette_size, seed.wrapping_add(1))?;
        let mut sim = ChainSim::from_seed(curve, config, seed)?;
        sim.add_observer(Box::new(boss.clone()));
        Ok(Self {
            sim,
            ammo,
            boss,
            accumulator: 0.0,
            cooldown: FIRE_INTERVAL,
            elapsed: 0.0,
        })
    }

    /// Run fixed simulation ticks for one frame
    fn update(&mut self, dt: f32) {
        let dt = dt.min(0.1);
        self.accumulator += dt;
        self.elapsed += dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.sim.tick(SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;
        }

        self.cooldown -= dt;
        if self.cooldown <= 0.0 && !self.sim.is_processing() {
            self.auto_fire();
            self.cooldown = FIRE_INTERVAL;
        }
    }

    /// Aim at the front-most visible ball of the loaded color, swapping if
    /// only the spare ball has a target
    fn auto_fire(&mut self) {
        if find_target(self.sim.tokens(), self.ammo.current()).is_none()
            && find_target(self.sim.tokens(), self.ammo.next()).is_some()
        {
            self.ammo.swap();
        }

        let color = self.ammo.current();
        let target = find_target(self.sim.tokens(), color)
            .or_else(|| self.sim.tokens().iter().rev().find(|t| !t.in_buffer()))
            .map(|t| t.position);
        let Some(t) = target else {
            return;
        };

        let aim = self.sim.curve().position(t);
        if self.sim.report_hit(aim, color) {
            self.ammo.fire();
        }
    }

    fn is_over(&self) -> bool {
        self.boss.borrow().health.is_dead() || self.sim.is_cleared() || self.elapsed >= MAX_SECONDS
    }
}

fn find_target(tokens: &[Token], color: Color) -> Option<&Token> {
    tokens
        .iter()
        .rev()
        .find(|t| t.is_active() && !t.in_buffer() && t.color == color)
}

fn run() -> Result<(), ConfigError> {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => ChainConfig::load(path)?,
        None => ChainConfig::default(),
    };
    let seed = args
        .next()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0)
        });
    log::info!("Demo starting with seed: {}", seed);

    let mut demo = Demo::new(config, seed)?;
    while !demo.is_over() {
        demo.update(FRAME_DT);
    }

    if demo.boss.borrow().health.is_dead() {
        demo.sim.teardown();
    }

    let stats = demo.sim.stats();
    let boss = demo.boss.borrow();
    log::info!(
        "Demo finished after {:.1}s: {} shots, {} destroyed, {} combos, {} escaped, boss {}/{}",
        demo.elapsed,
        stats.shots,
        stats.destroyed,
        stats.combos,
        stats.escaped,
        boss.health.current,
        boss.health.max
    );
    Ok(())
}

fn main() {
    env_logger::init();
    log::info!("Spline Chain (native) starting...");

    if let Err(e) = run() {
        log::error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}
