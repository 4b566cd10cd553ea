/// Terminal front end: keyboard input, frame composition and the
/// diff renderer. Only the binary drives these.

pub mod hud;
pub mod input;
pub mod renderer;
