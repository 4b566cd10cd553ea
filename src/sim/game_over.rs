/// GameOverMonitor: watches the board and ends the game.
///
/// ## Rules (non-active pieces only)
///
///   out of bounds  → immediate; reason from `rules::out_of_bounds`
///   over the line  → `linger` accumulates while ANY piece is over;
///                    the first tick with none over resets it to zero;
///                    reaching `game_over.linger` → `height_limit`
///
/// The held piece is exempt from both. Out-of-bounds is checked first, so
/// a tick that satisfies both reports the out-of-bounds reason.
///
/// `trigger` is the single exit: idempotent, freezes the ledger, records
/// the best score and emits exactly one `GameOver`.

use log::{info, warn};

use crate::config::GameConfig;
use crate::domain::physics::PhysicsPort;
use crate::domain::rules::{self, Extent, GameOverReason};
use crate::sim::checked;
use crate::sim::event::GameEvent;
use crate::sim::save::ScoreStore;
use crate::sim::world::World;

/// Evaluate the board after `dt` seconds. Returns the reason the game must
/// end, if any. Does not end it.
pub fn evaluate<P: PhysicsPort>(
    world: &mut World,
    physics: &P,
    config: &GameConfig,
    dt: f32,
) -> Option<GameOverReason> {
    if world.is_over() {
        return None;
    }

    let mut over_line = false;
    for piece in world.pieces.iter().filter(|p| !p.is_active()) {
        let Some(center) = checked(physics.position(piece.body), "game over check") else {
            continue;
        };
        let extent = Extent { center, radius: config.tiers.radius(piece.tier) };

        if let Some(reason) = rules::out_of_bounds(&extent, piece.state(), &config.stage, &config.game_over) {
            return Some(reason);
        }
        over_line |= rules::over_height_line(&extent, config.game_over.line_y);
    }

    if over_line {
        world.linger += dt;
        if world.linger >= config.game_over.linger {
            return Some(GameOverReason::HeightLimit);
        }
    } else {
        world.linger = 0.0;
    }
    None
}

/// End the game. Only the first call has any effect.
pub fn trigger(
    world: &mut World,
    reason: GameOverReason,
    store: &mut dyn ScoreStore,
    best_score: &mut u32,
    events: &mut Vec<GameEvent>,
) -> bool {
    if world.is_over() {
        return false;
    }
    world.game_over = Some(reason);
    world.ledger.freeze();

    let final_score = world.ledger.total();
    let new_record = final_score > *best_score;
    if new_record {
        *best_score = final_score;
        if let Err(e) = store.save(final_score) {
            warn!("could not save best score {final_score}: {e}");
        }
    }

    info!("game over ({reason}), score {final_score}, best {}", *best_score);
    events.push(GameEvent::GameOver {
        reason,
        final_score,
        best_score: *best_score,
        new_record,
    });
    true
}
