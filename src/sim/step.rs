/// The step function: advances the game by one tick of `dt` seconds.
///
/// Processing order:
///   1. Input        (held piece follows clamped x; release → Dropping)
///   2. Physics      (PhysicsPort::advance)
///   3. Landing      (Dropping → Locked, landing bonus)
///   4. Merge        (cooldowns, then reported contact pairs)
///   5. Game over    (out of bounds, height linger)
///   6. Height score (periodic sample, if enabled)
///   7. Spawn        (post-drop cooldown)
///
/// Once the game is over `step` returns immediately: physics stops, nothing
/// transitions, merges or spawns, and no events are emitted.

use log::debug;

use crate::domain::physics::{PhysicsPort, Vec2};
use crate::domain::piece::PieceState;
use crate::sim::checked;
use crate::sim::event::GameEvent;
use crate::sim::game::Game;
use crate::sim::{game_over, landing, merge, score};

/// Player intent for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    /// Desired horizontal position of the held piece (clamped by the core).
    pub pointer_x: Option<f32>,
    /// Let go of the held piece.
    pub release: bool,
}

impl<P: PhysicsPort> Game<P> {
    pub fn step(&mut self, input: FrameInput, dt: f32) -> Vec<GameEvent> {
        if self.world.is_over() || !(dt.is_finite() && dt > 0.0) {
            return Vec::new();
        }
        let mut events = Vec::new();
        self.world.tick += 1;
        self.world.elapsed += dt;

        self.resolve_input(input, &mut events);
        self.physics.advance(dt);
        landing::resolve_landings(&mut self.world, &mut self.physics, &self.config, &mut events);
        self.resolve_merges(dt, &mut events);
        self.resolve_game_over(dt, &mut events);
        score::resolve_height_bonus(&mut self.world, &self.physics, &self.config, dt, &mut events);
        self.scheduler.tick(
            dt,
            &mut self.world,
            &mut self.physics,
            &self.config,
            &mut self.rng,
            &mut events,
        );

        self.publish(events)
    }

    // ══════════════════════════════════════════════════════════════
    // Input
    // ══════════════════════════════════════════════════════════════

    fn resolve_input(&mut self, input: FrameInput, events: &mut Vec<GameEvent>) {
        let Some(id) = self.world.active else { return };
        if let Some(x) = input.pointer_x {
            self.world.aim_x = self.config.spawn.clamp_x(x);
        }
        let Some(piece) = self.world.piece(id) else { return };
        let body = piece.body;

        // Pin the held piece: gravity is off but collisions may still nudge it.
        let pin = Vec2::new(self.world.aim_x, self.config.spawn.y);
        checked(self.physics.set_position(body, pin), "hold");
        checked(self.physics.set_velocity(body, Vec2::ZERO), "hold");
        checked(self.physics.set_angular_velocity(body, 0.0), "hold");

        if !input.release {
            return;
        }
        let spin = merge::symmetric(&mut self.rng, self.config.physics.drop_spin);
        let Some(piece) = self.world.piece_mut(id) else { return };
        let dropped = checked(
            piece.transition(PieceState::Dropping, &mut self.physics, &self.config.physics, spin),
            "release",
        );
        if dropped == Some(true) {
            self.world.active = None;
            debug!("piece {:?} released at x={:.0}", id, pin.x);
            events.push(GameEvent::PieceDropped { id });
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Merge
    // ══════════════════════════════════════════════════════════════

    fn resolve_merges(&mut self, dt: f32, events: &mut Vec<GameEvent>) {
        merge::tick_cooldowns(&mut self.world, dt);
        let pairs = self.physics.drain_contacts();
        if pairs.is_empty() {
            return;
        }
        merge::resolve_contacts(
            &pairs,
            &mut self.world,
            &mut self.physics,
            &self.config,
            &mut self.rng,
            events,
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Game over
    // ══════════════════════════════════════════════════════════════

    fn resolve_game_over(&mut self, dt: f32, events: &mut Vec<GameEvent>) {
        let Some(reason) = game_over::evaluate(&mut self.world, &self.physics, &self.config, dt) else {
            return;
        };
        game_over::trigger(
            &mut self.world,
            reason,
            self.store.as_mut(),
            &mut self.best_score,
            events,
        );
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
