/// World: the board plus the per-game mutable state.
///
/// ## Ownership
///
///   - `pieces` is the board: every live piece, in creation order.
///     A piece is removed only by a merge or by `restart`.
///   - `active` points at the single `Holding` piece, if any.
///   - Timers (`linger`, `height_timer`) are plain accumulated seconds.
///
/// Physics bodies are NOT stored here; pieces hold handles into the
/// PhysicsPort. The world is rebuilt from scratch on restart.

use crate::domain::physics::{BodyHandle, Vec2};
use crate::domain::piece::{Piece, PieceId, PieceState};
use crate::domain::rules::GameOverReason;
use crate::domain::tier::TierId;
use crate::sim::score::ScoreLedger;

#[derive(Clone, Debug)]
pub struct World {
    pub pieces: Vec<Piece>,
    pub active: Option<PieceId>,
    pub game_over: Option<GameOverReason>,
    pub ledger: ScoreLedger,
    /// Horizontal position the held piece follows (already clamped).
    pub aim_x: f32,
    /// Seconds the height-limit violation has persisted without a gap.
    pub linger: f32,
    /// Seconds since the last height-bonus sample.
    pub height_timer: f32,
    pub tick: u64,
    pub elapsed: f32,
    next_id: u32,
}

/// Read-only snapshot of one piece for presentation.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct PieceView {
    pub id: PieceId,
    pub tier: TierId,
    pub state: PieceState,
    pub position: Vec2,
    pub radius: f32,
}

impl World {
    pub fn new() -> Self {
        World {
            pieces: Vec::new(),
            active: None,
            game_over: None,
            ledger: ScoreLedger::new(),
            aim_x: 0.0,
            linger: 0.0,
            height_timer: 0.0,
            tick: 0,
            elapsed: 0.0,
            next_id: 1,
        }
    }

    pub fn alloc_id(&mut self) -> PieceId {
        let id = PieceId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn is_over(&self) -> bool {
        self.game_over.is_some()
    }

    pub fn piece(&self, id: PieceId) -> Option<&Piece> {
        self.pieces.iter().find(|p| p.id == id)
    }

    pub fn piece_mut(&mut self, id: PieceId) -> Option<&mut Piece> {
        self.pieces.iter_mut().find(|p| p.id == id)
    }

    pub fn index_of_body(&self, body: BodyHandle) -> Option<usize> {
        self.pieces.iter().position(|p| p.body == body)
    }

    /// Take a piece off the board. Clears `active` if it was the held piece.
    pub fn remove(&mut self, id: PieceId) -> Option<Piece> {
        let idx = self.pieces.iter().position(|p| p.id == id)?;
        if self.active == Some(id) {
            self.active = None;
        }
        Some(self.pieces.remove(idx))
    }

    pub fn active_piece(&self) -> Option<&Piece> {
        self.active.and_then(|id| self.piece(id))
    }

    pub fn any_dropping(&self) -> bool {
        self.pieces.iter().any(|p| p.state() == PieceState::Dropping)
    }

    pub fn count_in(&self, state: PieceState) -> usize {
        self.pieces.iter().filter(|p| p.state() == state).count()
    }
}

impl Default for World {
    fn default() -> Self {
        World::new()
    }
}
