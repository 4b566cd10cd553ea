/// Board rules: landing, out-of-bounds and height, truth-table driven.
///
/// Pure functions over positions and physics signals, no side effects.
/// These decide "what happened" without acting on it; the sim systems
/// perform the transitions.
///
/// ## Landing (Dropping → Locked)
/// ┌───────────────────────────────────────────┬──────────┐
/// │ Condition                                  │ Landed?  │
/// ├───────────────────────────────────────────┼──────────┤
/// │ resting on static ground                   │ YES      │
/// │ resting on another body beneath            │ YES      │
/// │ speed < landing_speed AND                  │          │
/// │   centre > spawn_y + landing_depth         │ YES      │
/// │ Otherwise                                  │ NO       │
/// └───────────────────────────────────────────┴──────────┘
/// The third row is the failsafe for contacts missed by a discrete step.
///
/// ## Out of bounds (immediate game over, priority order)
/// ┌───────────────────────────────────────────┬──────────────┐
/// │ Condition                                  │ Reason       │
/// ├───────────────────────────────────────────┼──────────────┤
/// │ centre.y > stage.height + fall_margin      │ fallen_out   │
/// │ top > base surface                         │ bottom_out   │
/// │ Locked AND centre.x outside base span      │ base_out     │
/// │ Otherwise                                  │ in bounds    │
/// └───────────────────────────────────────────┴──────────────┘
///
/// ## Height limit (lingering game over)
/// A piece is over the line when its top is at or above `line_y`
/// (`top <= line_y`, y grows down).

use std::fmt;

use crate::config::{GameOverConfig, PhysicsConfig, ScoreConfig, StageConfig};
use crate::domain::physics::{RestingContact, Vec2};
use crate::domain::piece::PieceState;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameOverReason {
    HeightLimit,
    BaseOut,
    BottomOut,
    FallenOut,
}

impl GameOverReason {
    pub fn as_str(self) -> &'static str {
        match self {
            GameOverReason::HeightLimit => "height_limit",
            GameOverReason::BaseOut => "base_out",
            GameOverReason::BottomOut => "bottom_out",
            GameOverReason::FallenOut => "fallen_out",
        }
    }
}

impl fmt::Display for GameOverReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a piece is and how big it is.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Extent {
    pub center: Vec2,
    pub radius: f32,
}

impl Extent {
    pub fn top(&self) -> f32 {
        self.center.y - self.radius
    }
}

/// Physics evidence gathered for one Dropping piece.
#[derive(Clone, Copy, Debug)]
pub struct LandingSignals {
    pub resting: RestingContact,
    pub velocity: Vec2,
    pub center_y: f32,
}

// ── Landing ──

/// Support evidence: resting on ground or on another piece.
pub fn has_support(signals: &LandingSignals) -> bool {
    signals.resting.any()
}

/// Failsafe evidence: practically stopped, well below the spawn height.
pub fn has_stopped(signals: &LandingSignals, spawn_y: f32, tuning: &PhysicsConfig) -> bool {
    signals.velocity.length() < tuning.landing_speed
        && signals.center_y > spawn_y + tuning.landing_depth
}

/// See the landing truth table above.
pub fn is_landed(signals: &LandingSignals, spawn_y: f32, tuning: &PhysicsConfig) -> bool {
    has_support(signals) || has_stopped(signals, spawn_y, tuning)
}

// ── Out of bounds ──

/// See the out-of-bounds truth table above.
pub fn out_of_bounds(
    extent: &Extent,
    state: PieceState,
    stage: &StageConfig,
    limits: &GameOverConfig,
) -> Option<GameOverReason> {
    if extent.center.y > stage.height + limits.fall_margin {
        return Some(GameOverReason::FallenOut);
    }
    if extent.top() > stage.base_top() {
        return Some(GameOverReason::BottomOut);
    }
    if state == PieceState::Locked
        && (extent.center.x < stage.base_left() || extent.center.x > stage.base_right())
    {
        return Some(GameOverReason::BaseOut);
    }
    None
}

// ── Height ──

pub fn over_height_line(extent: &Extent, line_y: f32) -> bool {
    extent.top() <= line_y
}

/// Tallest stack height above the base surface, measured from each piece's top.
/// Zero when nothing rises above the base.
pub fn stack_height<I>(extents: I, base_top: f32) -> f32
where
    I: IntoIterator<Item = Extent>,
{
    extents
        .into_iter()
        .map(|e| base_top - e.top())
        .fold(0.0_f32, f32::max)
}

/// Points for one height sample: clamped height × rate, floored.
pub fn height_bonus(height: f32, score: &ScoreConfig) -> u32 {
    let h = height.clamp(0.0, score.height_clamp.max(0.0));
    (h * score.height_bonus_per_unit).floor().max(0.0) as u32
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
