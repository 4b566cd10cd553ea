/// Physics port: the rigid-body simulation the core drives but does not own.
///
/// ## Contract
///
/// The core never integrates motion itself. It:
///   - creates / destroys one circular body per piece,
///   - toggles gravity, sets velocity / angular velocity / damping /
///     restitution on state transitions,
///   - reads position, velocity and resting-contact flags,
///   - drains the piece-vs-piece contact pairs reported by the last advance.
///
/// Every per-body accessor returns `Err(MissingBody)` for a handle that was
/// never created or has been destroyed. The core treats that as a lifecycle
/// bug, never as a gameplay condition.
///
/// Coordinates are screen space: x grows right, y grows down.

use std::ops::{Add, AddAssign, Mul, Sub};

use thiserror::Error;

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn midpoint(self, other: Vec2) -> Vec2 {
        Vec2::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, o: Vec2) -> Vec2 {
        Vec2::new(self.x + o.x, self.y + o.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, o: Vec2) {
        self.x += o.x;
        self.y += o.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, o: Vec2) -> Vec2 {
        Vec2::new(self.x - o.x, self.y - o.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, k: f32) -> Vec2 {
        Vec2::new(self.x * k, self.y * k)
    }
}

/// Axis-aligned rectangle: top-left corner + size.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Rect {
    pub min: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub const fn new(min: Vec2, size: Vec2) -> Self {
        Rect { min, size }
    }

    pub fn max(&self) -> Vec2 {
        self.min + self.size
    }

    /// Closest point inside the rectangle to `p`.
    pub fn clamp_point(&self, p: Vec2) -> Vec2 {
        let max = self.max();
        Vec2::new(p.x.clamp(self.min.x, max.x), p.y.clamp(self.min.y, max.y))
    }
}

/// Opaque body handle issued by the port.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct BodyHandle(pub u32);

/// Creation parameters for a piece body.
#[derive(Clone, Copy, Debug)]
pub struct BodyDesc {
    pub position: Vec2,
    pub radius: f32,
    pub restitution: f32,
    pub friction: f32,
    pub gravity: bool,
}

/// Linear and angular drag (velocity decay toward zero, units/sec²).
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Damping {
    pub linear: f32,
    pub angular: f32,
}

/// Resting-contact flags from the most recent advance.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct RestingContact {
    /// Blocked from below by static stage geometry.
    pub on_ground: bool,
    /// Touching another body beneath it.
    pub on_body: bool,
}

impl RestingContact {
    pub fn any(&self) -> bool {
        self.on_ground || self.on_body
    }
}

/// Two dynamic bodies overlapping / touching during the last advance.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ContactPair {
    pub a: BodyHandle,
    pub b: BodyHandle,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PhysicsError {
    #[error("no physics body for handle {0:?}")]
    MissingBody(BodyHandle),
}

pub type PhysicsResult<T> = Result<T, PhysicsError>;

pub trait PhysicsPort {
    /// Advance the simulation by `dt` seconds. Resets and recomputes resting
    /// flags and collects contact pairs.
    fn advance(&mut self, dt: f32);

    /// New bodies start at rest: zero velocity, zero angular velocity and
    /// no damping. Gravity follows `desc.gravity`.
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle;
    fn destroy_body(&mut self, body: BodyHandle) -> PhysicsResult<()>;

    /// Immovable stage geometry (base platform, walls).
    fn add_static_rect(&mut self, rect: Rect) -> BodyHandle;

    fn position(&self, body: BodyHandle) -> PhysicsResult<Vec2>;
    fn set_position(&mut self, body: BodyHandle, pos: Vec2) -> PhysicsResult<()>;

    fn velocity(&self, body: BodyHandle) -> PhysicsResult<Vec2>;
    fn set_velocity(&mut self, body: BodyHandle, vel: Vec2) -> PhysicsResult<()>;

    fn angular_velocity(&self, body: BodyHandle) -> PhysicsResult<f32>;
    fn set_angular_velocity(&mut self, body: BodyHandle, omega: f32) -> PhysicsResult<()>;

    fn set_gravity_enabled(&mut self, body: BodyHandle, enabled: bool) -> PhysicsResult<()>;
    fn set_damping(&mut self, body: BodyHandle, damping: Damping) -> PhysicsResult<()>;
    fn set_restitution(&mut self, body: BodyHandle, restitution: f32) -> PhysicsResult<()>;

    fn resting_contact(&self, body: BodyHandle) -> PhysicsResult<RestingContact>;

    /// Piece-vs-piece contacts from the last advance, in report order.
    fn drain_contacts(&mut self) -> Vec<ContactPair>;
}
