//! Match resolution: one chain reaction per accepted hit
//!
//! A reaction is an explicit state machine advanced once per tick:
//!
//! ```text
//! Settle(index, color) -> Knockback -> Destroy -> SnapBack -> Settle(next) | Done
//!        \-> Done (run shorter than min_match_count)
//! ```
//!
//! Logical positions jump to their targets when a stage begins; the tweens
//! only move `visual` and `scale`. Matches are looked for solely around the
//! insertion point and then around each boundary a removal exposes. Runs
//! that become adjacent anywhere else are not re-scanned.

use serde::{Deserialize, Serialize};

use super::chain::{Chain, Color, TokenId, TokenState};
use super::events::{ChainObserver, RemovalCause};
use super::tween::{Ease, Slide, Tween, apply_shrink, apply_slides};
use crate::config::ChainConfig;

/// Everything a reaction step may read or mutate
pub struct ResolveContext<'a> {
    pub chain: &'a mut Chain,
    pub config: &'a ChainConfig,
    pub observers: &'a mut [Box<dyn ChainObserver>],
}

/// Current stage with its own clock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stage {
    /// Waiting `match_check_delay` before looking at `index`
    Settle {
        index: usize,
        color: Color,
        wait: Tween,
    },
    /// Whole chain recoiling after a match
    Knockback {
        left: usize,
        run: Vec<TokenId>,
        slides: Vec<Slide>,
        tween: Tween,
    },
    /// Matched balls shrinking
    Destroy {
        left: usize,
        doomed: Vec<TokenId>,
        tween: Tween,
    },
    /// Gap closing
    SnapBack {
        left: usize,
        slides: Vec<Slide>,
        tween: Tween,
    },
}

/// Totals of a finished reaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outcome {
    pub destroyed: u32,
    pub combos: u32,
}

/// An in-flight chain reaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    stage: Stage,
    destroyed: u32,
    combos: u32,
}

enum Progress {
    /// Stage still running; the tick's time is used up
    Waiting,
    /// Stage finished with time to spare
    Next(f32),
    Done,
}

impl Cycle {
    /// Start a reaction around a freshly inserted token
    pub fn begin(index: usize, color: Color, config: &ChainConfig) -> Self {
        Self {
            stage: Stage::Settle {
                index,
                color,
                wait: Tween::new(config.match_check_delay, Ease::Linear),
            },
            destroyed: 0,
            combos: 0,
        }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn combos(&self) -> u32 {
        self.combos
    }

    pub fn destroyed(&self) -> u32 {
        self.destroyed
    }

    /// Advance by `dt`; returns the totals once the reaction is over
    ///
    /// Leftover time flows into the next stage, so zero-length delays and
    /// animations resolve within the same tick.
    pub fn step(&mut self, ctx: &mut ResolveContext<'_>, dt: f32) -> Option<Outcome> {
        let mut remaining = dt;
        loop {
            match self.step_stage(ctx, remaining) {
                Progress::Waiting => return None,
                Progress::Next(leftover) => remaining = leftover,
                Progress::Done => {
                    return Some(Outcome {
                        destroyed: self.destroyed,
                        combos: self.combos,
                    });
                }
            }
        }
    }

    /// Drop the reaction where it stands, without a report
    ///
    /// Balls already shrinking are removed; the rest snap to their logical
    /// position at full size and the chain is repacked, so no token is left
    /// outside `TokenState::Active`.
    pub fn abandon(self, ctx: &mut ResolveContext<'_>) {
        log::debug!(
            "Abandoning reaction after {} combos ({} destroyed)",
            self.combos,
            self.destroyed
        );

        let doomed: Vec<TokenId> = ctx
            .chain
            .tokens()
            .iter()
            .filter(|t| !t.is_active())
            .map(|t| t.id)
            .collect();
        for id in doomed {
            if let Some(token) = ctx.chain.remove(id) {
                for observer in ctx.observers.iter_mut() {
                    observer.on_remove_visual(&token, RemovalCause::Matched);
                }
            }
        }

        for token in ctx.chain.tokens_mut() {
            token.visual = token.position;
            token.scale = 1.0;
        }
        ctx.chain.rearrange_from(0);
    }

    fn step_stage(&mut self, ctx: &mut ResolveContext<'_>, dt: f32) -> Progress {
        match &mut self.stage {
            Stage::Settle { index, color, wait } => {
                let Some(leftover) = wait.step(dt) else {
                    return Progress::Waiting;
                };
                let (index, color) = (*index, *color);
                match self.check_match(ctx, index, color) {
                    Some(stage) => {
                        self.stage = stage;
                        Progress::Next(leftover)
                    }
                    None => Progress::Done,
                }
            }

            Stage::Knockback {
                left,
                run,
                slides,
                tween,
            } => {
                let left = *left;
                let finished = tween.step(dt);
                apply_slides(ctx.chain, slides, tween.progress());
                let Some(leftover) = finished else {
                    return Progress::Waiting;
                };

                // Balls still in the buffer have not arrived and survive
                let mut doomed = Vec::with_capacity(run.len());
                for &id in run.iter() {
                    if let Some(index) = ctx.chain.index_of(id) {
                        let token = &mut ctx.chain.tokens_mut()[index];
                        if !token.in_buffer() {
                            token.state = TokenState::Destroying;
                            doomed.push(id);
                        }
                    }
                }

                self.stage = Stage::Destroy {
                    left,
                    doomed,
                    tween: Tween::new(ctx.config.destroy_animation_time, Ease::Linear),
                };
                Progress::Next(leftover)
            }

            Stage::Destroy {
                left,
                doomed,
                tween,
            } => {
                let left = *left;
                let finished = tween.step(dt);
                apply_shrink(ctx.chain, doomed, tween.progress());
                for &id in doomed.iter() {
                    if let Some(token) = ctx.chain.index_of(id).and_then(|i| ctx.chain.get(i)) {
                        for observer in ctx.observers.iter_mut() {
                            observer.on_token_scale(token, token.scale);
                        }
                    }
                }
                let Some(leftover) = finished else {
                    return Progress::Waiting;
                };

                for &id in doomed.iter() {
                    if let Some(token) = ctx.chain.remove(id) {
                        for observer in ctx.observers.iter_mut() {
                            observer.on_remove_visual(&token, RemovalCause::Matched);
                        }
                    }
                }

                // Close the gap: logical positions settle now, visuals slide over
                let before: Vec<f32> = ctx.chain.tokens().iter().map(|t| t.visual).collect();
                ctx.chain.rearrange_from(0);
                let slides: Vec<Slide> = ctx
                    .chain
                    .tokens_mut()
                    .iter_mut()
                    .zip(before)
                    .map(|(token, from)| {
                        token.visual = from;
                        Slide {
                            id: token.id,
                            from,
                            to: token.position,
                        }
                    })
                    .collect();

                self.stage = Stage::SnapBack {
                    left,
                    slides,
                    tween: Tween::new(ctx.config.snap_back_duration, Ease::Smooth),
                };
                Progress::Next(leftover)
            }

            Stage::SnapBack {
                left,
                slides,
                tween,
            } => {
                let left = *left;
                let finished = tween.step(dt);
                apply_slides(ctx.chain, slides, tween.progress());
                let Some(leftover) = finished else {
                    return Progress::Waiting;
                };

                // The boundary the removal exposed: [left - 1] meets [left]
                let Some(index) = left.checked_sub(1) else {
                    return Progress::Done;
                };
                let (Some(color), Some(after)) =
                    (ctx.chain.color_at(index), ctx.chain.color_at(index + 1))
                else {
                    return Progress::Done;
                };
                if color != after {
                    return Progress::Done;
                }

                log::debug!("Chain reaction continues at index {index} (color {color})");
                self.stage = Stage::Settle {
                    index,
                    color,
                    wait: Tween::new(ctx.config.match_check_delay, Ease::Linear),
                };
                Progress::Next(leftover)
            }
        }
    }

    /// Expand around `index`; on a match, count it and start the knockback
    fn check_match(&mut self, ctx: &mut ResolveContext<'_>, index: usize, color: Color) -> Option<Stage> {
        let (left, right) = ctx.chain.run_around(index, color)?;
        let count = right - left + 1;
        if count < ctx.config.min_match_count {
            return None;
        }

        self.combos += 1;
        self.destroyed += count as u32;
        log::debug!(
            "Match of {count} (color {color}) at {left}..={right}, combo {}",
            self.combos
        );
        for observer in ctx.observers.iter_mut() {
            observer.on_match_sound();
        }

        let run: Vec<TokenId> = ctx.chain.tokens()[left..=right].iter().map(|t| t.id).collect();
        let amount = ctx.config.knockback_for(count);
        let slides: Vec<Slide> = ctx
            .chain
            .tokens()
            .iter()
            .map(|t| Slide {
                id: t.id,
                from: t.visual,
                to: t.position - amount,
            })
            .collect();
        ctx.chain.push_back(amount);
        ctx.chain.add_recoil(amount);

        Some(Stage::Knockback {
            left,
            run,
            slides,
            tween: Tween::new(ctx.config.knockback_duration, Ease::Smooth),
        })
    }
}
