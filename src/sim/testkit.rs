/// Test doubles shared by the unit tests.
///
/// `FakePhysics` is a scripted PhysicsPort: nothing moves on `advance`,
/// tests set positions, velocities, resting flags and contact pairs by hand.

use std::collections::BTreeMap;

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::config::GameConfig;
use crate::domain::physics::{
    BodyDesc, BodyHandle, ContactPair, Damping, PhysicsError, PhysicsPort, PhysicsResult, Rect,
    RestingContact, Vec2,
};

/// Tiers A → B → C (terminal), merge scores 50 / 150 / 300, spawn pool
/// A and B, no landing bonus.
pub(crate) const TEST_TOML: &str = r#"
    [[tiers]]
    id = "A"
    size = 40
    score = 50

    [[tiers]]
    id = "B"
    size = 52
    score = 150

    [[tiers]]
    id = "C"
    size = 66
    score = 300

    [spawn]
    pool = ["A", "B"]
    next_delay_ms = 500

    [physics]
    allow_rotation = true

    [score]
    landing_bonus = 0
"#;

pub(crate) fn test_config() -> GameConfig {
    GameConfig::from_toml_str(TEST_TOML).expect("test config is valid")
}

pub(crate) fn rng() -> SmallRng {
    SmallRng::seed_from_u64(7)
}

#[derive(Clone, Debug, Default)]
pub(crate) struct FakeBody {
    pub position: Vec2,
    pub velocity: Vec2,
    pub angular_velocity: f32,
    pub radius: f32,
    pub gravity: bool,
    pub damping: Damping,
    pub restitution: f32,
    pub resting: RestingContact,
}

#[derive(Debug, Default)]
pub(crate) struct FakePhysics {
    bodies: BTreeMap<BodyHandle, FakeBody>,
    pub statics: Vec<Rect>,
    pub pending_contacts: Vec<ContactPair>,
    pub advanced: f32,
    pub advances: u32,
    next: u32,
}

impl FakePhysics {
    pub fn new() -> Self {
        FakePhysics { next: 1, ..Default::default() }
    }

    pub fn body(&self, h: BodyHandle) -> &FakeBody {
        self.bodies.get(&h).expect("fake body exists")
    }

    pub fn body_mut(&mut self, h: BodyHandle) -> &mut FakeBody {
        self.bodies.get_mut(&h).expect("fake body exists")
    }

    pub fn exists(&self, h: BodyHandle) -> bool {
        self.bodies.contains_key(&h)
    }

    pub fn live_bodies(&self) -> usize {
        self.bodies.len()
    }

    /// Queue a contact to be reported by the next `drain_contacts`.
    pub fn touch(&mut self, a: BodyHandle, b: BodyHandle) {
        self.pending_contacts.push(ContactPair { a, b });
    }

    fn get(&self, h: BodyHandle) -> PhysicsResult<&FakeBody> {
        self.bodies.get(&h).ok_or(PhysicsError::MissingBody(h))
    }

    fn get_mut(&mut self, h: BodyHandle) -> PhysicsResult<&mut FakeBody> {
        self.bodies.get_mut(&h).ok_or(PhysicsError::MissingBody(h))
    }
}

impl PhysicsPort for FakePhysics {
    fn advance(&mut self, dt: f32) {
        self.advanced += dt;
        self.advances += 1;
    }

    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let h = BodyHandle(self.next);
        self.next += 1;
        self.bodies.insert(
            h,
            FakeBody {
                position: desc.position,
                radius: desc.radius,
                gravity: desc.gravity,
                restitution: desc.restitution,
                ..Default::default()
            },
        );
        h
    }

    fn destroy_body(&mut self, body: BodyHandle) -> PhysicsResult<()> {
        self.bodies.remove(&body).map(|_| ()).ok_or(PhysicsError::MissingBody(body))
    }

    fn add_static_rect(&mut self, rect: Rect) -> BodyHandle {
        let h = BodyHandle(self.next);
        self.next += 1;
        self.statics.push(rect);
        h
    }

    fn position(&self, body: BodyHandle) -> PhysicsResult<Vec2> {
        Ok(self.get(body)?.position)
    }

    fn set_position(&mut self, body: BodyHandle, pos: Vec2) -> PhysicsResult<()> {
        self.get_mut(body)?.position = pos;
        Ok(())
    }

    fn velocity(&self, body: BodyHandle) -> PhysicsResult<Vec2> {
        Ok(self.get(body)?.velocity)
    }

    fn set_velocity(&mut self, body: BodyHandle, vel: Vec2) -> PhysicsResult<()> {
        self.get_mut(body)?.velocity = vel;
        Ok(())
    }

    fn angular_velocity(&self, body: BodyHandle) -> PhysicsResult<f32> {
        Ok(self.get(body)?.angular_velocity)
    }

    fn set_angular_velocity(&mut self, body: BodyHandle, omega: f32) -> PhysicsResult<()> {
        self.get_mut(body)?.angular_velocity = omega;
        Ok(())
    }

    fn set_gravity_enabled(&mut self, body: BodyHandle, enabled: bool) -> PhysicsResult<()> {
        self.get_mut(body)?.gravity = enabled;
        Ok(())
    }

    fn set_damping(&mut self, body: BodyHandle, damping: Damping) -> PhysicsResult<()> {
        self.get_mut(body)?.damping = damping;
        Ok(())
    }

    fn set_restitution(&mut self, body: BodyHandle, restitution: f32) -> PhysicsResult<()> {
        self.get_mut(body)?.restitution = restitution;
        Ok(())
    }

    fn resting_contact(&self, body: BodyHandle) -> PhysicsResult<RestingContact> {
        Ok(self.get(body)?.resting)
    }

    fn drain_contacts(&mut self) -> Vec<ContactPair> {
        std::mem::take(&mut self.pending_contacts)
    }
}
