//! Fixed timestep simulation tick
//!
//! One tick either advances a running chain reaction or, when none is in
//! flight, moves the chain and lets the next queued ball in. Positions are
//! published to observers at the end of every unpaused tick.

use super::chain::Token;
use super::events::{RemovalCause, ShotReport};
use super::resolve::ResolveContext;
use super::state::ChainSim;

/// Advance the simulation by `dt` seconds
pub fn tick(sim: &mut ChainSim, dt: f32) {
    if !dt.is_finite() || dt < 0.0 {
        log::warn!("Ignoring tick with invalid dt {dt}");
        return;
    }

    // Cancellation is honoured even while paused, without a report
    if sim.cancel.take() {
        abandon_cycle(sim);
    }

    if sim.paused {
        return;
    }
    sim.stats.ticks += 1;

    if sim.cycle.is_some() {
        step_cycle(sim, dt);
    } else {
        advance(sim, dt);
        try_spawn(sim);
    }

    publish_positions(sim);
}

fn abandon_cycle(sim: &mut ChainSim) {
    let Some(cycle) = sim.cycle.take() else {
        return;
    };
    let mut ctx = ResolveContext {
        chain: &mut sim.chain,
        config: &sim.config,
        observers: sim.observers.as_mut_slice(),
    };
    cycle.abandon(&mut ctx);
    log::info!("Chain reaction cancelled");
}

fn step_cycle(sim: &mut ChainSim, dt: f32) {
    let Some(cycle) = sim.cycle.as_mut() else {
        return;
    };
    let mut ctx = ResolveContext {
        chain: &mut sim.chain,
        config: &sim.config,
        observers: sim.observers.as_mut_slice(),
    };
    let Some(outcome) = cycle.step(&mut ctx, dt) else {
        return;
    };
    sim.cycle = None;

    sim.stats.destroyed += outcome.destroyed;
    sim.stats.combos += outcome.combos;

    let report = ShotReport {
        destroyed: outcome.destroyed,
        combos: outcome.combos,
        entered: std::mem::take(&mut sim.entered),
    };
    let damage = sim.config.damage.damage(&report);
    log::info!(
        "Shot resolved: destroyed {} in {} combos, {} entered, damage {}",
        report.destroyed,
        report.combos,
        report.entered.len(),
        damage
    );

    for observer in &mut sim.observers {
        observer.on_shot_report(&report);
    }
    if damage > 0 {
        for observer in &mut sim.observers {
            observer.on_damage_to_entity(damage);
        }
    }
}

/// Move the chain forward; balls past the end escape silently
fn advance(sim: &mut ChainSim, dt: f32) {
    let step = sim.config.chain_speed * dt / sim.curve.length();
    let escaped = sim.chain.advance(step);
    for token in &escaped {
        log::debug!("Ball {} (color {}) escaped", token.id.0, token.color);
        sim.stats.escaped += 1;
        for observer in &mut sim.observers {
            observer.on_remove_visual(token, RemovalCause::Escaped);
        }
    }
}

/// Let the next queued color in at the back of the buffer zone
///
/// The gate opens once every ball is more than one spacing ahead of the
/// spawn point, which itself moves forward by any unrecovered recoil.
fn try_spawn(sim: &mut ChainSim) -> bool {
    if sim.queue.is_empty() {
        return false;
    }
    let spawn_at = -sim.config.buffer_zone_size;
    if !sim.chain.rear_is_clear(spawn_at + sim.chain.recoil()) {
        return false;
    }
    let Some(color) = sim.queue.pop_front() else {
        return false;
    };

    let id = sim.next_token_id();
    sim.chain.insert(0, Token::new(id, color, spawn_at));
    sim.chain.rearrange_from(0);
    sim.entered.push(color);

    if let Some(token) = sim.chain.get(0) {
        let world = sim.curve.position(token.visual);
        for observer in &mut sim.observers {
            observer.on_spawn_visual(token, world);
        }
    }
    true
}

fn publish_positions(sim: &mut ChainSim) {
    for token in sim.chain.tokens() {
        let world = sim.curve.position(token.visual);
        for observer in &mut sim.observers {
            observer.on_position_updated(token, world);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec3;

    use crate::config::ChainConfig;
    use crate::consts::SIM_DT;
    use crate::sim::chain::Color;
    use crate::sim::curve::Curve;
    use crate::sim::chain::TokenState;
    use crate::sim::events::{ChainEvent, EventLog, RemovalCause};
    use crate::sim::resolve::Stage;
    use crate::sim::state::ChainSim;

    const A: Color = 0;
    const B: Color = 1;
    const C: Color = 2;

    fn line() -> Curve {
        Curve::polyline(vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)]).expect("valid")
    }

    /// Zero-length animations, no buffer, no recoil
    fn instant_config(visible: usize) -> ChainConfig {
        ChainConfig {
            buffer_zone_size: 0.0,
            match_check_delay: 0.0,
            destroy_animation_time: 0.0,
            knockback_duration: 0.0,
            snap_back_duration: 0.0,
            knockback_force: 0.0,
            initial_visible_count: visible,
            ..Default::default()
        }
    }

    fn observed(sim: &mut ChainSim) -> Rc<RefCell<EventLog>> {
        let log = Rc::new(RefCell::new(EventLog::new()));
        sim.add_observer(Box::new(log.clone()));
        log
    }

    fn colors(sim: &ChainSim) -> Vec<Color> {
        sim.tokens().iter().map(|t| t.color).collect()
    }

    fn run_until_idle(sim: &mut ChainSim) {
        for _ in 0..10_000 {
            if !sim.is_processing() {
                return;
            }
            sim.tick(SIM_DT);
        }
        panic!("reaction never finished");
    }

    #[test]
    fn test_spawn_backpressure() {
        let config = ChainConfig {
            initial_visible_count: 1,
            ..Default::default()
        };
        let mut sim = ChainSim::new(line(), vec![A, B, C], config).expect("valid");
        let log = observed(&mut sim);

        // The rear ball covers one spacing (0.05) in 30 ticks at 1/600 per tick
        let mut ticks = 0;
        while sim.tokens().len() == 1 {
            sim.tick(SIM_DT);
            ticks += 1;
            assert!(ticks < 100);
        }
        assert!((30..=31).contains(&ticks));
        assert_eq!(sim.queue_len(), 1);

        // New ball at the back of the buffer, old one repacked one spacing ahead
        assert!((sim.tokens()[0].position + 0.2).abs() < 1e-6);
        assert!((sim.tokens()[1].position + 0.15).abs() < 1e-6);
        assert!(matches!(log.borrow().events[0], ChainEvent::Spawned { color: B, .. }));
    }

    #[test]
    fn test_escape_is_silent() {
        let config = ChainConfig {
            chain_speed: 50.0,
            ..instant_config(2)
        };
        let mut sim = ChainSim::new(line(), vec![A, B], config).expect("valid");
        let log = observed(&mut sim);

        for _ in 0..120 {
            sim.tick(SIM_DT);
        }
        assert!(sim.tokens().is_empty());
        assert_eq!(sim.stats().escaped, 2);
        let log = log.borrow();
        assert_eq!(log.removed(RemovalCause::Escaped), vec![B, A]);
        assert!(log.reports().is_empty());
        assert!(!log.events.iter().any(|e| matches!(e, ChainEvent::Damage(_))));
    }

    #[test]
    fn test_match_removes_exactly_the_run() {
        // [A,A,B,B,A] + B between the two B's: [A,A,B,B,B,A]
        let mut sim = ChainSim::new(line(), vec![A, A, B, B, A], instant_config(5)).expect("valid");
        let log = observed(&mut sim);
        assert!(sim.report_hit(Vec3::new(1.2, 0.0, 0.0), B));
        assert_eq!(colors(&sim), vec![A, A, B, B, B, A]);

        run_until_idle(&mut sim);
        let log = log.borrow();
        let removed = log.removed(RemovalCause::Matched);
        assert_eq!(&removed[..3], &[B, B, B]);

        // The outer A's meet and go too
        assert!(sim.tokens().is_empty());
        let reports = log.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].combos, 2);
        assert_eq!(reports[0].destroyed, 6);
    }

    #[test]
    fn test_isolated_match_is_one_combo() {
        let mut sim = ChainSim::new(line(), vec![A, A, B, B, C], instant_config(5)).expect("valid");
        let log = observed(&mut sim);
        assert!(sim.report_hit(Vec3::new(1.2, 0.0, 0.0), B));
        run_until_idle(&mut sim);

        assert_eq!(colors(&sim), vec![A, A, C]);
        let log = log.borrow();
        assert_eq!(log.reports()[0].combos, 1);
        assert_eq!(log.reports()[0].destroyed, 3);
        assert_eq!(
            log.events.iter().filter(|e| **e == ChainEvent::MatchSound).count(),
            1
        );
        // Damage 3 balls + 1 combo with the default rules
        assert!(log.events.contains(&ChainEvent::Damage(4)));
        for pair in sim.tokens().windows(2) {
            assert!((pair[1].position - pair[0].position - 0.05).abs() < 1e-6);
        }
    }

    #[test]
    fn test_report_counts_matched_not_removed() {
        let config = ChainConfig {
            buffer_zone_size: 0.2,
            knockback_force: 0.07,
            ..instant_config(7)
        };
        // Laid out from -0.2; the B's sit at 0.0 and 0.05
        let mut sim = ChainSim::new(line(), vec![C, A, C, A, B, B, A], config).expect("valid");
        let log = observed(&mut sim);
        assert!(sim.report_hit(Vec3::new(0.7, 0.0, 0.0), B));
        run_until_idle(&mut sim);

        // Knockback leaves two of the three B's behind t=0, where they survive
        let log = log.borrow();
        assert_eq!(log.reports()[0].destroyed, 3);
        assert_eq!(log.removed(RemovalCause::Matched), vec![B]);
        assert_eq!(colors(&sim), vec![C, A, C, A, B, B, A]);
        assert_eq!(sim.stats().destroyed, 3);
    }

    #[test]
    fn test_chain_reaction_stops_on_short_pair() {
        // [A,A,B,B] + A between the A's and B's: [A,A,A,B,B]
        let mut sim = ChainSim::new(line(), vec![A, A, B, B], instant_config(4)).expect("valid");
        let log = observed(&mut sim);
        assert!(sim.report_hit(Vec3::new(0.7, 0.0, 0.0), A));
        assert_eq!(colors(&sim), vec![A, A, A, B, B]);
        run_until_idle(&mut sim);

        assert_eq!(colors(&sim), vec![B, B]);
        assert_eq!(log.borrow().reports()[0].combos, 1);
    }

    #[test]
    fn test_miss_still_reports() {
        let mut sim = ChainSim::new(line(), vec![A, B, C], instant_config(3)).expect("valid");
        let log = observed(&mut sim);
        assert!(sim.report_hit(Vec3::new(0.7, 0.0, 0.0), A));
        run_until_idle(&mut sim);

        let log = log.borrow();
        assert_eq!(log.reports().len(), 1);
        assert_eq!(log.reports()[0].combos, 0);
        assert!(!log.events.iter().any(|e| matches!(e, ChainEvent::Damage(_))));
        assert_eq!(sim.tokens().len(), 4);
    }

    #[test]
    fn test_frozen_while_processing() {
        let config = ChainConfig {
            match_check_delay: 0.5,
            ..ChainConfig::default()
        };
        let mut sim = ChainSim::from_seed(line(), config, 5).expect("valid");
        assert!(sim.report_hit(Vec3::new(0.5, 0.0, 0.0), A));
        let before: Vec<f32> = sim.tokens().iter().map(|t| t.position).collect();
        let queued = sim.queue_len();
        for _ in 0..30 {
            sim.tick(SIM_DT);
        }
        let after: Vec<f32> = sim.tokens().iter().map(|t| t.position).collect();
        assert_eq!(before, after);
        assert_eq!(sim.queue_len(), queued);
        assert!(sim.is_processing());
    }

    #[test]
    fn test_entered_colors_reach_the_report() {
        let mut sim = ChainSim::new(line(), vec![A, B, C, A], instant_config(1)).expect("valid");
        let log = observed(&mut sim);
        // Three spacings of travel lets everything in
        for _ in 0..120 {
            sim.tick(SIM_DT);
        }
        assert_eq!(sim.queue_len(), 0);

        assert!(sim.report_hit(Vec3::new(9.9, 0.0, 0.0), B));
        run_until_idle(&mut sim);
        assert_eq!(log.borrow().reports()[0].entered, vec![B, C, A]);

        // Cleared after the report
        assert!(sim.report_hit(Vec3::new(9.9, 0.0, 0.0), C));
        run_until_idle(&mut sim);
        assert!(log.borrow().reports()[1].entered.is_empty());
    }

    #[test]
    fn test_pause_freezes_everything() {
        let mut sim = ChainSim::from_seed(line(), ChainConfig::default(), 1).expect("valid");
        sim.set_paused(true);
        let before: Vec<f32> = sim.tokens().iter().map(|t| t.position).collect();
        for _ in 0..60 {
            sim.tick(SIM_DT);
        }
        let after: Vec<f32> = sim.tokens().iter().map(|t| t.position).collect();
        assert_eq!(before, after);
        assert_eq!(sim.stats().ticks, 0);
    }

    #[test]
    fn test_cancel_abandons_without_report() {
        let config = ChainConfig {
            match_check_delay: 1.0,
            ..instant_config(5)
        };
        let mut sim = ChainSim::new(line(), vec![A, A, B, B, C], config).expect("valid");
        let log = observed(&mut sim);
        let cancel = sim.cancel_token();
        assert!(sim.report_hit(Vec3::new(1.2, 0.0, 0.0), B));

        cancel.cancel();
        sim.tick(SIM_DT);
        assert!(!sim.is_processing());
        assert!(!cancel.is_cancelled());
        assert!(log.borrow().reports().is_empty());
        // Inserted ball stays where it landed
        assert_eq!(colors(&sim), vec![A, A, B, B, B, C]);
    }

    /// Hit `[A,A,B,B,C]` with B, run until `in_stage` holds, then cancel
    fn cancel_during(in_stage: impl Fn(&Stage) -> bool) -> (ChainSim, Rc<RefCell<EventLog>>) {
        let config = ChainConfig {
            knockback_duration: 0.5,
            destroy_animation_time: 0.5,
            snap_back_duration: 0.5,
            ..instant_config(5)
        };
        let mut sim = ChainSim::new(line(), vec![A, A, B, B, C], config).expect("valid");
        let log = observed(&mut sim);
        let cancel = sim.cancel_token();
        assert!(sim.report_hit(Vec3::new(1.2, 0.0, 0.0), B));

        let mut guard = 0;
        while !sim.cycle().is_some_and(|c| in_stage(c.stage())) {
            sim.tick(SIM_DT);
            guard += 1;
            assert!(guard < 1000, "stage never reached");
        }

        cancel.cancel();
        sim.tick(SIM_DT);
        assert!(!sim.is_processing());
        (sim, log)
    }

    fn assert_settled(sim: &ChainSim) {
        for token in sim.tokens() {
            assert_eq!(token.state, TokenState::Active);
            assert_eq!(token.scale, 1.0);
            assert_eq!(token.visual, token.position);
        }
        let spacing = sim.chain().spacing();
        for pair in sim.tokens().windows(2) {
            assert!(pair[1].position - pair[0].position >= spacing - 1e-5);
        }
    }

    /// Nothing is left behind: every remaining ball travels out
    fn assert_runs_out(mut sim: ChainSim) {
        let remaining = sim.tokens().len() as u32;
        for _ in 0..2000 {
            sim.tick(SIM_DT);
        }
        assert!(sim.is_cleared());
        assert_eq!(sim.stats().escaped, remaining);
    }

    #[test]
    fn test_cancel_during_knockback_keeps_every_ball() {
        let (sim, log) = cancel_during(|s| matches!(s, Stage::Knockback { .. }));
        assert_eq!(colors(&sim), vec![A, A, B, B, B, C]);
        assert_settled(&sim);
        {
            let log = log.borrow();
            assert!(log.removed(RemovalCause::Matched).is_empty());
            assert!(log.reports().is_empty());
        }
        assert_runs_out(sim);
    }

    #[test]
    fn test_cancel_during_destroy_drops_shrinking_balls() {
        let (sim, log) = cancel_during(|s| matches!(s, Stage::Destroy { .. }));
        assert_eq!(colors(&sim), vec![A, A, C]);
        assert_settled(&sim);
        {
            let log = log.borrow();
            assert_eq!(log.removed(RemovalCause::Matched), vec![B, B, B]);
            assert!(log.reports().is_empty());
        }
        assert_runs_out(sim);
    }

    #[test]
    fn test_cancel_during_snap_back_settles_the_gap() {
        let (sim, log) = cancel_during(|s| matches!(s, Stage::SnapBack { .. }));
        assert_eq!(colors(&sim), vec![A, A, C]);
        assert_settled(&sim);
        {
            let log = log.borrow();
            assert_eq!(log.removed(RemovalCause::Matched), vec![B, B, B]);
            assert!(log.reports().is_empty());
        }
        assert_runs_out(sim);
    }

    #[test]
    fn test_free_tick_matches_method() {
        let config = ChainConfig::default();
        let mut by_method = ChainSim::from_seed(line(), config.clone(), 9).expect("valid");
        let mut by_fn = ChainSim::from_seed(line(), config, 9).expect("valid");
        for _ in 0..90 {
            by_method.tick(SIM_DT);
            super::tick(&mut by_fn, SIM_DT);
        }
        let layout = |sim: &ChainSim| -> Vec<(Color, f32)> {
            sim.tokens().iter().map(|t| (t.color, t.position)).collect()
        };
        assert_eq!(layout(&by_method), layout(&by_fn));
        assert_eq!(by_method.stats(), by_fn.stats());
    }

    #[test]
    fn test_recoil_speeds_up_and_decays() {
        let config = ChainConfig {
            knockback_force: 0.1,
            buffer_zone_size: 0.2,
            ..instant_config(6)
        };
        let mut sim = ChainSim::new(line(), vec![C, A, A, B, B, C], config).expect("valid");
        for _ in 0..120 {
            sim.tick(SIM_DT);
        }
        assert!(sim.report_hit(Vec3::new(sim.tokens()[3].position * 10.0 + 0.01, 0.0, 0.0), B));
        run_until_idle(&mut sim);
        assert!(sim.chain().recoil() > 0.0);

        let head = sim.tokens()[0].position;
        sim.tick(SIM_DT);
        let moved = sim.tokens()[0].position - head;
        let base = 2.0 * SIM_DT / 10.0;
        assert!((moved - 2.0 * base).abs() < 1e-5);

        for _ in 0..600 {
            sim.tick(SIM_DT);
        }
        assert_eq!(sim.chain().recoil(), 0.0);
    }

    #[test]
    fn test_same_seed_same_run() {
        let run = |seed: u64| {
            let mut sim = ChainSim::from_seed(line(), ChainConfig::default(), seed).expect("valid");
            for step in 0..600 {
                if step % 97 == 0 {
                    sim.report_hit(Vec3::new(1.0, 0.0, 0.0), (step % 4) as u8);
                }
                sim.tick(SIM_DT);
            }
            sim.tokens()
                .iter()
                .map(|t| (t.id, t.color, t.position))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(77), run(77));
    }

    #[test]
    fn test_positions_published_each_tick() {
        let mut sim = ChainSim::new(line(), vec![A, B, C], instant_config(3)).expect("valid");
        let log = observed(&mut sim);
        sim.tick(SIM_DT);
        sim.tick(SIM_DT);
        assert_eq!(log.borrow().position_updates, 6);
    }
}
