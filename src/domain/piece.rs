/// Piece: one falling/resting brother, tracked through a small state machine.
///
/// ```text
///   spawn ──► Holding ──(release)──► Dropping ──(landing)──► Locked
///   merge ─────────────────────────► Dropping
/// ```
///
/// `Locked` is never left: a merge destroys pieces and creates new ones
/// instead of reusing state. Each state carries a physical profile that is
/// applied to the body on entry (see `apply_profile`).
///
/// The piece holds a handle to its body, never the body itself.

use crate::config::PhysicsConfig;
use crate::domain::physics::{BodyHandle, Damping, PhysicsPort, PhysicsResult, Vec2};
use crate::domain::tier::TierId;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct PieceId(pub u32);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PieceState {
    /// Player-controlled: no gravity, follows input x, no spin.
    Holding,
    /// Free physical motion.
    Dropping,
    /// Settled. Still simulated, but at rest for scoring / game-over purposes.
    Locked,
}

impl PieceState {
    /// Legal transitions. Anything else is refused.
    pub fn can_become(self, to: PieceState) -> bool {
        matches!(
            (self, to),
            (PieceState::Holding, PieceState::Dropping) | (PieceState::Dropping, PieceState::Locked)
        )
    }
}

#[derive(Clone, Debug)]
pub struct Piece {
    pub id: PieceId,
    pub tier: TierId,
    pub body: BodyHandle,
    state: PieceState,
    /// Set while the piece may not take part in a merge.
    pub merge_locked: bool,
    /// Seconds until `merge_locked` is released (merge-created pieces only).
    pub merge_cooldown: f32,
}

impl Piece {
    pub fn new(id: PieceId, tier: TierId, body: BodyHandle, state: PieceState) -> Self {
        Piece {
            id,
            tier,
            body,
            state,
            merge_locked: false,
            merge_cooldown: 0.0,
        }
    }

    /// A piece born from a merge: Dropping, merge-locked for `cooldown` seconds.
    pub fn merged(id: PieceId, tier: TierId, body: BodyHandle, cooldown: f32) -> Self {
        Piece {
            merge_locked: cooldown > 0.0,
            merge_cooldown: cooldown.max(0.0),
            ..Piece::new(id, tier, body, PieceState::Dropping)
        }
    }

    pub fn state(&self) -> PieceState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == PieceState::Holding
    }

    /// Eligible for a merge right now. The held piece never merges.
    pub fn can_merge(&self) -> bool {
        !self.merge_locked && self.state != PieceState::Holding
    }

    /// Attempt a transition. Returns `Ok(false)` (nothing touched) when the
    /// transition is not legal from the current state.
    pub fn transition<P: PhysicsPort>(
        &mut self,
        to: PieceState,
        physics: &mut P,
        tuning: &PhysicsConfig,
        spin: f32,
    ) -> PhysicsResult<bool> {
        if !self.state.can_become(to) {
            return Ok(false);
        }
        apply_profile(physics, self.body, to, tuning, spin)?;
        self.state = to;
        Ok(true)
    }

    /// Count down the post-merge lock. Returns true when the lock was released.
    pub fn tick_merge_cooldown(&mut self, dt: f32) -> bool {
        if self.merge_cooldown <= 0.0 {
            return false;
        }
        self.merge_cooldown -= dt;
        if self.merge_cooldown <= 0.0 {
            self.merge_cooldown = 0.0;
            self.merge_locked = false;
            return true;
        }
        false
    }
}

/// Apply the physical profile of `state` to a body.
///
/// | state    | gravity | velocity      | spin        | damping                 | bounce        |
/// |----------|---------|---------------|-------------|-------------------------|---------------|
/// | Holding  | off     | zeroed        | zeroed      | unchanged               | unchanged     |
/// | Dropping | on      | unchanged     | `spin`*     | drop_drag               | unchanged     |
/// | Locked   | on      | unchanged     | unchanged   | locked_drag / ang. drag | locked_bounce |
///
/// *only when rotation is allowed.
pub fn apply_profile<P: PhysicsPort>(
    physics: &mut P,
    body: BodyHandle,
    state: PieceState,
    tuning: &PhysicsConfig,
    spin: f32,
) -> PhysicsResult<()> {
    match state {
        PieceState::Holding => {
            physics.set_gravity_enabled(body, false)?;
            physics.set_velocity(body, Vec2::ZERO)?;
            physics.set_angular_velocity(body, 0.0)?;
        }
        PieceState::Dropping => {
            physics.set_gravity_enabled(body, true)?;
            if tuning.allow_rotation {
                physics.set_angular_velocity(body, spin)?;
            }
            physics.set_damping(body, Damping { linear: tuning.drop_drag, angular: 0.0 })?;
        }
        PieceState::Locked => {
            physics.set_gravity_enabled(body, true)?;
            physics.set_damping(
                body,
                Damping { linear: tuning.locked_drag, angular: tuning.locked_angular_drag },
            )?;
            physics.set_restitution(body, tuning.locked_bounce)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::physics::BodyDesc;
    use crate::sim::testkit::{test_config, FakePhysics};

    fn body(physics: &mut FakePhysics) -> BodyHandle {
        physics.create_body(BodyDesc {
            position: Vec2::new(100.0, 100.0),
            radius: 20.0,
            restitution: 0.2,
            friction: 0.3,
            gravity: true,
        })
    }

    #[test]
    fn transition_table() {
        use PieceState::*;
        assert!(Holding.can_become(Dropping));
        assert!(Dropping.can_become(Locked));
        assert!(!Holding.can_become(Locked));
        assert!(!Locked.can_become(Dropping));
        assert!(!Locked.can_become(Holding));
        assert!(!Dropping.can_become(Holding));
        assert!(!Locked.can_become(Locked));
    }

    #[test]
    fn holding_profile_disables_gravity_and_motion() {
        let cfg = test_config();
        let mut ph = FakePhysics::new();
        let b = body(&mut ph);
        ph.set_velocity(b, Vec2::new(5.0, 5.0)).unwrap();
        apply_profile(&mut ph, b, PieceState::Holding, &cfg.physics, 0.0).unwrap();
        let fb = ph.body(b);
        assert!(!fb.gravity);
        assert_eq!(fb.velocity, Vec2::ZERO);
        assert_eq!(fb.angular_velocity, 0.0);
    }

    #[test]
    fn drop_then_lock_applies_profiles() {
        let cfg = test_config();
        let mut ph = FakePhysics::new();
        let b = body(&mut ph);
        let mut p = Piece::new(PieceId(1), TierId(0), b, PieceState::Holding);

        assert!(p.transition(PieceState::Dropping, &mut ph, &cfg.physics, 12.0).unwrap());
        assert_eq!(p.state(), PieceState::Dropping);
        assert!(ph.body(b).gravity);
        assert_eq!(ph.body(b).angular_velocity, 12.0);
        assert_eq!(ph.body(b).damping.linear, cfg.physics.drop_drag);

        assert!(p.transition(PieceState::Locked, &mut ph, &cfg.physics, 0.0).unwrap());
        assert_eq!(p.state(), PieceState::Locked);
        assert_eq!(ph.body(b).damping.linear, cfg.physics.locked_drag);
        assert_eq!(ph.body(b).restitution, cfg.physics.locked_bounce);
    }

    #[test]
    fn illegal_transition_is_noop() {
        let cfg = test_config();
        let mut ph = FakePhysics::new();
        let b = body(&mut ph);
        let mut p = Piece::new(PieceId(1), TierId(0), b, PieceState::Locked);
        assert!(!p.transition(PieceState::Dropping, &mut ph, &cfg.physics, 0.0).unwrap());
        assert_eq!(p.state(), PieceState::Locked);
    }

    #[test]
    fn transition_on_destroyed_body_errors() {
        let cfg = test_config();
        let mut ph = FakePhysics::new();
        let b = body(&mut ph);
        ph.destroy_body(b).unwrap();
        let mut p = Piece::new(PieceId(1), TierId(0), b, PieceState::Holding);
        assert!(p.transition(PieceState::Dropping, &mut ph, &cfg.physics, 0.0).is_err());
        assert_eq!(p.state(), PieceState::Holding);
    }

    #[test]
    fn merged_piece_lock_expires() {
        let mut p = Piece::merged(PieceId(3), TierId(1), BodyHandle(9), 0.25);
        assert_eq!(p.state(), PieceState::Dropping);
        assert!(p.merge_locked);
        assert!(!p.can_merge());
        assert!(!p.tick_merge_cooldown(0.125));
        assert!(p.merge_locked);
        assert!(p.tick_merge_cooldown(0.125));
        assert!(!p.merge_locked);
        assert!(p.can_merge());
        assert!(!p.tick_merge_cooldown(0.125));
    }

    #[test]
    fn holding_piece_never_merges() {
        let p = Piece::new(PieceId(1), TierId(0), BodyHandle(1), PieceState::Holding);
        assert!(!p.can_merge());
    }
}
