/// LandingDetector: Dropping → Locked, evaluated for every falling piece
/// every tick. Locked pieces are never looked at again, so a landing is
/// scored exactly once.

use log::debug;

use crate::config::GameConfig;
use crate::domain::physics::{BodyHandle, PhysicsPort};
use crate::domain::piece::PieceState;
use crate::domain::rules::{self, LandingSignals};
use crate::sim::checked;
use crate::sim::event::{GameEvent, ScoreEvent, ScoreSource};
use crate::sim::score;
use crate::sim::world::World;

/// Returns the number of pieces that landed this tick.
pub fn resolve_landings<P: PhysicsPort>(
    world: &mut World,
    physics: &mut P,
    config: &GameConfig,
    events: &mut Vec<GameEvent>,
) -> usize {
    if world.is_over() {
        return 0;
    }

    let mut landed = 0;
    for i in 0..world.pieces.len() {
        if world.pieces[i].state() != PieceState::Dropping {
            continue;
        }
        let body = world.pieces[i].body;
        let Some(signals) = read_signals(physics, body) else { continue };
        if !rules::is_landed(&signals, config.spawn.y, &config.physics) {
            continue;
        }

        let piece = &mut world.pieces[i];
        let moved = checked(
            piece.transition(PieceState::Locked, physics, &config.physics, 0.0),
            "landing",
        );
        if moved != Some(true) {
            continue;
        }
        let (id, tier) = (piece.id, piece.tier);
        landed += 1;

        debug!("piece {:?} landed at y={:.0}", id, signals.center_y);
        events.push(GameEvent::PieceLanded { id, tier });
        let position = checked(physics.position(body), "landing").unwrap_or_default();
        score::credit(
            world,
            ScoreEvent {
                source: ScoreSource::Landing,
                tier: Some(tier),
                position,
                amount: config.score.landing_bonus,
            },
            events,
        );
    }
    landed
}

fn read_signals<P: PhysicsPort>(physics: &P, body: BodyHandle) -> Option<LandingSignals> {
    let resting = checked(physics.resting_contact(body), "landing")?;
    let velocity = checked(physics.velocity(body), "landing")?;
    let position = checked(physics.position(body), "landing")?;
    Some(LandingSignals { resting, velocity, center_y: position.y })
}
