//! The ball chain: ordered tokens on the curve
//!
//! Index 0 is the rearmost ball (the one most recently spawned out of the
//! buffer zone); positions ascend with index once the chain is settled.

use serde::{Deserialize, Serialize};

/// Palette index of a ball
pub type Color = u8;

/// Stable handle for a token, never reused within one simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(pub u32);

/// Token lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenState {
    /// On the chain, moving
    Active,
    /// Matched, shrinking, about to be removed
    Destroying,
}

/// A ball in the chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: TokenId,
    pub color: Color,
    /// Authoritative curve parameter
    pub position: f32,
    /// Parameter shown to observers; trails `position` during tweens
    pub visual: f32,
    /// Presentation scale, 1.0 unless shrinking
    pub scale: f32,
    pub state: TokenState,
}

impl Token {
    pub fn new(id: TokenId, color: Color, position: f32) -> Self {
        Self {
            id,
            color,
            position,
            visual: position,
            scale: 1.0,
            state: TokenState::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == TokenState::Active
    }

    /// Still in the buffer zone behind t=0
    pub fn in_buffer(&self) -> bool {
        self.position < 0.0
    }
}

/// Ordered tokens plus the spacing that keeps them apart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chain {
    tokens: Vec<Token>,
    /// Parameter-space gap between neighbours (ball spacing / curve length)
    spacing: f32,
    /// Knockback not yet recovered by the catch-up speed
    recoil: f32,
}

impl Chain {
    pub fn new(spacing: f32) -> Self {
        Self {
            tokens: Vec::new(),
            spacing,
            recoil: 0.0,
        }
    }

    #[inline]
    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    #[inline]
    pub fn recoil(&self) -> f32 {
        self.recoil
    }

    pub fn add_recoil(&mut self, amount: f32) {
        self.recoil += amount;
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn tokens_mut(&mut self) -> &mut [Token] {
        &mut self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn color_at(&self, index: usize) -> Option<Color> {
        self.tokens.get(index).map(|t| t.color)
    }

    pub fn index_of(&self, id: TokenId) -> Option<usize> {
        self.tokens.iter().position(|t| t.id == id)
    }

    /// Insert at `index` (clamped to the end)
    pub fn insert(&mut self, index: usize, token: Token) {
        let index = index.min(self.tokens.len());
        self.tokens.insert(index, token);
    }

    /// Remove a token by id, if it is still present
    pub fn remove(&mut self, id: TokenId) -> Option<Token> {
        let index = self.index_of(id)?;
        Some(self.tokens.remove(index))
    }

    /// Remove every token
    pub fn drain(&mut self) -> Vec<Token> {
        self.recoil = 0.0;
        std::mem::take(&mut self.tokens)
    }

    /// First index whose position is strictly greater than `t`
    pub fn insertion_index(&self, t: f32) -> usize {
        self.tokens.partition_point(|token| token.position <= t)
    }

    /// Pack everything after `start` behind it at exact spacing
    ///
    /// `position[i] = position[i-1] + spacing` for every i > start.
    pub fn rearrange_from(&mut self, start: usize) {
        for i in start + 1..self.tokens.len() {
            let next = self.tokens[i - 1].position + self.spacing;
            let token = &mut self.tokens[i];
            token.position = next;
            token.visual = next;
        }
    }

    /// Move every active token forward and pull out the ones that escaped
    ///
    /// While recoil is outstanding the chain moves at double speed and the
    /// extra distance pays the recoil down.
    pub fn advance(&mut self, step: f32) -> Vec<Token> {
        let catch_up = step.min(self.recoil);
        self.recoil -= catch_up;
        let delta = step + catch_up;

        for token in self.tokens.iter_mut().filter(|t| t.is_active()) {
            token.position += delta;
            token.visual = token.position;
        }

        let mut escaped = Vec::new();
        self.tokens.retain(|t| {
            if t.is_active() && t.position >= 1.0 {
                escaped.push(t.clone());
                false
            } else {
                true
            }
        });
        escaped
    }

    /// Shift every token backwards (knockback)
    pub fn push_back(&mut self, amount: f32) {
        for token in &mut self.tokens {
            token.position -= amount;
        }
    }

    /// Whether the rear slot at `spawn_at` is free
    pub fn rear_is_clear(&self, spawn_at: f32) -> bool {
        self.tokens
            .iter()
            .all(|t| t.position > spawn_at + self.spacing)
    }

    /// Bounds of the maximal run of `color` that contains `index`
    ///
    /// The token at `index` itself counts regardless of color, matching how
    /// a fresh insertion is always part of its own run.
    pub fn run_around(&self, index: usize, color: Color) -> Option<(usize, usize)> {
        if index >= self.tokens.len() {
            return None;
        }
        let mut left = index;
        while left > 0 && self.tokens[left - 1].color == color {
            left -= 1;
        }
        let mut right = index;
        while right + 1 < self.tokens.len() && self.tokens[right + 1].color == color {
            right += 1;
        }
        Some((left, right))
    }

    /// Test fixture: tokens at exact spacing from `rear`
    #[cfg(test)]
    pub(crate) fn from_colors(colors: &[Color], rear: f32, spacing: f32) -> Self {
        let mut chain = Self::new(spacing);
        for (i, &color) in colors.iter().enumerate() {
            chain
                .tokens
                .push(Token::new(TokenId(i as u32 + 1), color, rear + i as f32 * spacing));
        }
        chain
    }
}
