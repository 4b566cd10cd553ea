/// Domain types and pure rules: tiers, pieces, the physics port and the
/// board rules. Nothing in here owns game state.

pub mod physics;
pub mod piece;
pub mod rules;
pub mod tier;
