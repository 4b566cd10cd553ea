/// Brother Stack: a merge-and-stack arcade core.
///
/// `sim::Game` runs the rules against any `domain::physics::PhysicsPort`;
/// `sim::arena::Arena` is the bundled circle physics and `ui` is the
/// terminal front end used by the binary.

pub mod config;
pub mod domain;
pub mod sim;
pub mod ui;
