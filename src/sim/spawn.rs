/// SpawnScheduler: look-ahead queue, spawn gating and the post-drop cooldown.
///
/// ## Gating
///
///   spawn_next()  → no-op unless (no active piece) AND (game not over)
///   tick()        → counts "quiet" time: no active piece, nothing Dropping,
///                   game running. Anything Dropping resets the count.
///                   Quiet time reaching `next_delay` calls spawn_next().
///
/// The look-ahead is a single slot drawn uniformly from the spawn pool, so
/// higher (merge-only) tiers never appear directly.

use log::debug;
use rand::rngs::SmallRng;
use rand::Rng;

use crate::config::GameConfig;
use crate::domain::physics::{BodyDesc, PhysicsPort, Vec2};
use crate::domain::piece::{Piece, PieceId, PieceState};
use crate::domain::tier::TierId;
use crate::sim::event::GameEvent;
use crate::sim::world::World;

#[derive(Clone, Debug)]
pub struct SpawnScheduler {
    next: TierId,
    quiet: f32,
}

impl SpawnScheduler {
    pub fn new(pool: &[TierId], rng: &mut SmallRng) -> Self {
        SpawnScheduler { next: roll(pool, rng), quiet: 0.0 }
    }

    pub fn peek_next(&self) -> TierId {
        self.next
    }

    /// Hand out the queued tier and refill the slot.
    pub fn consume_next(&mut self, pool: &[TierId], rng: &mut SmallRng) -> TierId {
        let tier = self.next;
        self.next = roll(pool, rng);
        tier
    }

    /// Accumulated quiet time toward the next spawn (seconds).
    pub fn quiet_time(&self) -> f32 {
        self.quiet
    }

    #[cfg(test)]
    pub(crate) fn force_next(&mut self, tier: TierId) {
        self.next = tier;
    }

    /// Create the next piece as the held piece, at board centre.
    /// Returns `None` (and changes nothing) when a piece is already held or
    /// the game is over.
    ///
    /// The Holding profile is carried by the body description: a new body is
    /// at rest, and gravity starts off.
    pub fn spawn_next<P: PhysicsPort>(
        &mut self,
        world: &mut World,
        physics: &mut P,
        config: &GameConfig,
        rng: &mut SmallRng,
        events: &mut Vec<GameEvent>,
    ) -> Option<PieceId> {
        if world.active.is_some() || world.is_over() {
            return None;
        }

        let tier = self.consume_next(&config.spawn.pool, rng);
        let position = Vec2::new(config.stage.center_x(), config.spawn.y);
        let body = physics.create_body(BodyDesc {
            position,
            radius: config.tiers.radius(tier),
            restitution: config.physics.restitution,
            friction: config.physics.friction,
            gravity: false,
        });

        let id = world.alloc_id();
        world.pieces.push(Piece::new(id, tier, body, PieceState::Holding));
        world.active = Some(id);
        world.aim_x = position.x;
        self.quiet = 0.0;

        debug!("spawned piece {:?} tier {}", id, config.tiers.name(tier));
        events.push(GameEvent::PieceSpawned { id, tier });
        events.push(GameEvent::NextTierChanged { tier: self.next });
        Some(id)
    }

    /// Advance the post-drop cooldown and spawn once the board has been quiet
    /// for `next_delay`.
    pub fn tick<P: PhysicsPort>(
        &mut self,
        dt: f32,
        world: &mut World,
        physics: &mut P,
        config: &GameConfig,
        rng: &mut SmallRng,
        events: &mut Vec<GameEvent>,
    ) -> Option<PieceId> {
        if world.active.is_some() || world.is_over() {
            return None;
        }
        if world.any_dropping() {
            self.quiet = 0.0;
            return None;
        }
        self.quiet += dt;
        if self.quiet < config.spawn.next_delay {
            return None;
        }
        self.spawn_next(world, physics, config, rng, events)
    }
}

fn roll(pool: &[TierId], rng: &mut SmallRng) -> TierId {
    match pool.len() {
        0 => TierId(0),
        n => pool[rng.gen_range(0..n)],
    }
}
