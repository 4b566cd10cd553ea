/// ScoreLedger: the single running total.
///
/// Awards come from landings, merges and (optionally) the periodic height
/// sample. The total only grows; it is frozen at game over and replaced by a
/// fresh ledger on restart.

use crate::config::{GameConfig, ScoreConfig};
use crate::domain::physics::{PhysicsPort, Vec2};
use crate::domain::rules::{self, Extent};
use crate::sim::event::{GameEvent, ScoreEvent, ScoreSource};
use crate::sim::checked;
use crate::sim::world::World;

#[derive(Clone, Debug, Default)]
pub struct ScoreLedger {
    total: u32,
    frozen: bool,
}

impl ScoreLedger {
    pub fn new() -> Self {
        ScoreLedger::default()
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Apply an award. Returns false (nothing changed) when frozen or zero.
    pub fn award(&mut self, event: &ScoreEvent) -> bool {
        if self.frozen || event.amount == 0 {
            return false;
        }
        self.total = self.total.saturating_add(event.amount);
        true
    }
}

/// Credit an award to the world's ledger and report it.
pub fn credit(world: &mut World, award: ScoreEvent, events: &mut Vec<GameEvent>) {
    if world.ledger.award(&award) {
        events.push(GameEvent::ScoreAwarded(award));
        events.push(GameEvent::ScoreChanged { total: world.ledger.total() });
    }
}

// ── Height bonus ──

/// Periodic height bonus. Samples every `height_sample` seconds and at most
/// once per call; non-finite or non-positive `dt` is ignored.
pub fn resolve_height_bonus<P: PhysicsPort>(
    world: &mut World,
    physics: &P,
    config: &GameConfig,
    dt: f32,
    events: &mut Vec<GameEvent>,
) {
    let score: &ScoreConfig = &config.score;
    if !score.height_bonus_enabled || world.is_over() || !dt.is_finite() || dt <= 0.0 {
        return;
    }

    world.height_timer += dt;
    if world.height_timer < score.height_sample {
        return;
    }
    // A long tick still yields a single sample.
    world.height_timer %= score.height_sample;

    let base_top = config.stage.base_top();
    let extents: Vec<Extent> = world
        .pieces
        .iter()
        .filter(|p| !p.is_active())
        .filter_map(|p| {
            checked(physics.position(p.body), "height sample").map(|center| Extent {
                center,
                radius: config.tiers.radius(p.tier),
            })
        })
        .collect();
    let height = rules::stack_height(extents, base_top);
    let amount = rules::height_bonus(height, score);
    let position = Vec2::new(config.stage.center_x(), base_top - height);

    credit(
        world,
        ScoreEvent { source: ScoreSource::Height, tier: None, position, amount },
        events,
    );
}
