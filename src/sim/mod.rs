/// Simulation: the gameplay core and its collaborators.
///
/// Everything here is presentation-agnostic. `Game` is the entry point;
/// the other modules are the systems it runs each tick.

pub mod arena;
pub mod event;
pub mod game;
pub mod game_over;
pub mod landing;
pub mod merge;
pub mod save;
pub mod score;
pub mod spawn;
pub mod step;
pub mod world;

#[cfg(test)]
pub(crate) mod testkit;

use log::warn;

use crate::domain::physics::PhysicsResult;

pub use game::Game;
pub use step::FrameInput;

/// Unwrap a physics call that should never fail.
///
/// A missing body means the core's bookkeeping and the physics layer have
/// drifted apart. Debug builds stop right there; release builds log it and
/// carry on with the operation skipped.
pub(crate) fn checked<T>(result: PhysicsResult<T>, context: &str) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("{context}: {e}");
            debug_assert!(false, "{context}: {e}");
            None
        }
    }
}
