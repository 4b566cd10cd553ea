/// Arena: a small circle-vs-rectangle rigid-body world implementing
/// `PhysicsPort`. Enough physics for the terminal driver and for
/// end-to-end tests; a host engine would supply its own port instead.
///
/// ## Model
///
///   - Dynamic bodies are circles. Mass ∝ r², so big pieces push small ones.
///   - Gravity-disabled bodies are kinematic: they move only by their own
///     velocity and never yield in a collision (the held piece).
///   - Static bodies are axis-aligned rectangles (base platform, walls).
///   - Semi-implicit Euler, `SUBSTEPS` per advance. Drag removes a fixed
///     amount of speed per second, never reversing direction.
///   - Collisions: positional correction + restitution impulse along the
///     normal + Coulomb friction along the tangent.
///
/// Resting flags are recomputed on every advance. Circle pairs that overlap
/// in any substep are reported once, lower handle first.

use std::collections::BTreeSet;

use crate::config::PhysicsConfig;
use crate::domain::physics::{
    BodyDesc, BodyHandle, ContactPair, Damping, PhysicsError, PhysicsPort, PhysicsResult, Rect,
    RestingContact, Vec2,
};

const SUBSTEPS: u32 = 8;

/// Normal component (y, pointing up) above which a contact counts as support.
const SUPPORT_NORMAL: f32 = 0.5;

#[derive(Clone, Debug)]
struct Circle {
    handle: BodyHandle,
    pos: Vec2,
    vel: Vec2,
    omega: f32,
    radius: f32,
    restitution: f32,
    friction: f32,
    gravity: bool,
    damping: Damping,
    resting: RestingContact,
}

impl Circle {
    fn inv_mass(&self) -> f32 {
        if self.gravity {
            1.0 / (self.radius * self.radius)
        } else {
            0.0
        }
    }
}

#[derive(Clone, Debug)]
pub struct Arena {
    gravity_y: f32,
    bodies: Vec<Circle>,
    statics: Vec<(BodyHandle, Rect)>,
    contacts: BTreeSet<(BodyHandle, BodyHandle)>,
    next: u32,
}

impl Arena {
    pub fn new(gravity_y: f32) -> Self {
        Arena {
            gravity_y,
            bodies: Vec::new(),
            statics: Vec::new(),
            contacts: BTreeSet::new(),
            next: 1,
        }
    }

    pub fn from_config(physics: &PhysicsConfig) -> Self {
        Arena::new(physics.gravity_y)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn static_count(&self) -> usize {
        self.statics.len()
    }

    fn alloc(&mut self) -> BodyHandle {
        let h = BodyHandle(self.next);
        self.next += 1;
        h
    }

    fn get(&self, h: BodyHandle) -> PhysicsResult<&Circle> {
        self.bodies
            .iter()
            .find(|c| c.handle == h)
            .ok_or(PhysicsError::MissingBody(h))
    }

    fn get_mut(&mut self, h: BodyHandle) -> PhysicsResult<&mut Circle> {
        self.bodies
            .iter_mut()
            .find(|c| c.handle == h)
            .ok_or(PhysicsError::MissingBody(h))
    }

    // ── Integration ──

    fn integrate(&mut self, h: f32) {
        let g = Vec2::new(0.0, self.gravity_y);
        for c in self.bodies.iter_mut() {
            if c.gravity {
                c.vel += g * h;
            }
            c.vel = decay_vec(c.vel, c.damping.linear * h);
            c.omega = decay(c.omega, c.damping.angular * h);
            c.pos += c.vel * h;
        }
    }

    fn collide_statics(&mut self) {
        for c in self.bodies.iter_mut().filter(|c| c.gravity) {
            for (_, rect) in &self.statics {
                let closest = rect.clamp_point(c.pos);
                let delta = c.pos - closest;
                let dist = delta.length();
                if dist >= c.radius {
                    continue;
                }
                // Centre inside the rectangle: push out through the top.
                let normal = if dist > f32::EPSILON { delta * (1.0 / dist) } else { Vec2::new(0.0, -1.0) };
                c.pos += normal * (c.radius - dist);

                let vn = c.vel.dot(normal);
                if vn < 0.0 {
                    let jn = -(1.0 + c.restitution) * vn;
                    c.vel += normal * jn;
                    c.vel = apply_friction(c.vel, normal, c.friction * jn);
                }
                if -normal.y > SUPPORT_NORMAL {
                    c.resting.on_ground = true;
                }
            }
        }
    }

    fn collide_pairs(&mut self) {
        let n = self.bodies.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let (left, right) = self.bodies.split_at_mut(j);
                let (a, b) = (&mut left[i], &mut right[0]);

                let delta = b.pos - a.pos;
                let dist = delta.length();
                let reach = a.radius + b.radius;
                if dist >= reach {
                    continue;
                }
                let key = if a.handle < b.handle { (a.handle, b.handle) } else { (b.handle, a.handle) };
                self.contacts.insert(key);

                let (ia, ib) = (a.inv_mass(), b.inv_mass());
                let total = ia + ib;
                if total == 0.0 {
                    continue;
                }
                // Normal points from a to b (down when b is beneath a).
                let normal = if dist > f32::EPSILON { delta * (1.0 / dist) } else { Vec2::new(0.0, 1.0) };
                let depth = reach - dist;
                a.pos += normal * (-depth * ia / total);
                b.pos += normal * (depth * ib / total);

                let vn = (b.vel - a.vel).dot(normal);
                if vn < 0.0 {
                    let e = a.restitution.min(b.restitution);
                    let j = -(1.0 + e) * vn / total;
                    a.vel += normal * (-j * ia);
                    b.vel += normal * (j * ib);

                    let mu = (a.friction + b.friction) * 0.5;
                    let rel = b.vel - a.vel;
                    let tangent = rel - normal * rel.dot(normal);
                    let t_len = tangent.length();
                    if t_len > f32::EPSILON {
                        let jt = (t_len / total).min(mu * j);
                        let dir = tangent * (1.0 / t_len);
                        a.vel += dir * (jt * ia);
                        b.vel += dir * (-jt * ib);
                    }
                }

                if normal.y > SUPPORT_NORMAL {
                    a.resting.on_body = true;
                } else if -normal.y > SUPPORT_NORMAL {
                    b.resting.on_body = true;
                }
            }
        }
    }
}

/// Reduce `v` toward zero by `amount`, never past it.
fn decay(v: f32, amount: f32) -> f32 {
    if v > 0.0 {
        (v - amount).max(0.0)
    } else {
        (v + amount).min(0.0)
    }
}

fn decay_vec(v: Vec2, amount: f32) -> Vec2 {
    let speed = v.length();
    if speed <= f32::EPSILON {
        return v;
    }
    v * ((speed - amount).max(0.0) / speed)
}

/// Remove up to `limit` of the tangential velocity relative to a static surface.
fn apply_friction(vel: Vec2, normal: Vec2, limit: f32) -> Vec2 {
    let tangent = vel - normal * vel.dot(normal);
    let t_len = tangent.length();
    if t_len <= f32::EPSILON {
        return vel;
    }
    let cut = t_len.min(limit);
    vel - tangent * (cut / t_len)
}

impl PhysicsPort for Arena {
    fn advance(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        for c in self.bodies.iter_mut() {
            c.resting = RestingContact::default();
        }
        let h = dt / SUBSTEPS as f32;
        for _ in 0..SUBSTEPS {
            self.integrate(h);
            self.collide_pairs();
            self.collide_statics();
        }
    }

    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = self.alloc();
        self.bodies.push(Circle {
            handle,
            pos: desc.position,
            vel: Vec2::ZERO,
            omega: 0.0,
            radius: desc.radius,
            restitution: desc.restitution,
            friction: desc.friction,
            gravity: desc.gravity,
            damping: Damping::default(),
            resting: RestingContact::default(),
        });
        handle
    }

    fn destroy_body(&mut self, body: BodyHandle) -> PhysicsResult<()> {
        let idx = self
            .bodies
            .iter()
            .position(|c| c.handle == body)
            .ok_or(PhysicsError::MissingBody(body))?;
        self.bodies.remove(idx);
        self.contacts.retain(|&(a, b)| a != body && b != body);
        Ok(())
    }

    fn add_static_rect(&mut self, rect: Rect) -> BodyHandle {
        let handle = self.alloc();
        self.statics.push((handle, rect));
        handle
    }

    fn position(&self, body: BodyHandle) -> PhysicsResult<Vec2> {
        Ok(self.get(body)?.pos)
    }

    fn set_position(&mut self, body: BodyHandle, pos: Vec2) -> PhysicsResult<()> {
        self.get_mut(body)?.pos = pos;
        Ok(())
    }

    fn velocity(&self, body: BodyHandle) -> PhysicsResult<Vec2> {
        Ok(self.get(body)?.vel)
    }

    fn set_velocity(&mut self, body: BodyHandle, vel: Vec2) -> PhysicsResult<()> {
        self.get_mut(body)?.vel = vel;
        Ok(())
    }

    fn angular_velocity(&self, body: BodyHandle) -> PhysicsResult<f32> {
        Ok(self.get(body)?.omega)
    }

    fn set_angular_velocity(&mut self, body: BodyHandle, omega: f32) -> PhysicsResult<()> {
        self.get_mut(body)?.omega = omega;
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
        std::mem::take(&mut self.contacts)
            .into_iter()
            .map(|(a, b)| ContactPair { a, b })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::sim::game::install_stage;
    use crate::sim::testkit::test_config;

    const DT: f32 = 1.0 / 60.0;

    fn staged(cfg: &GameConfig) -> Arena {
        let mut arena = Arena::from_config(&cfg.physics);
        install_stage(&mut arena, &cfg.stage);
        arena
    }

    fn ball(arena: &mut Arena, x: f32, y: f32, r: f32) -> BodyHandle {
        arena.create_body(BodyDesc {
            position: Vec2::new(x, y),
            radius: r,
            restitution: 0.1,
            friction: 0.3,
            gravity: true,
        })
    }

    fn run(arena: &mut Arena, seconds: f32) {
        let steps = (seconds / DT) as usize;
        for _ in 0..steps {
            arena.advance(DT);
        }
    }

    #[test]
    fn ball_falls_and_rests_on_base() {
        let cfg = test_config();
        let mut arena = staged(&cfg);
        let b = ball(&mut arena, cfg.stage.center_x(), 100.0, 20.0);
        arena.set_damping(b, Damping { linear: 50.0, angular: 0.0 }).unwrap();

        run(&mut arena, 3.0);

        let p = arena.position(b).unwrap();
        let rest_y = cfg.stage.base_top() - 20.0;
        assert!((p.y - rest_y).abs() < 2.0, "y = {}", p.y);
        assert!(arena.resting_contact(b).unwrap().on_ground);
        assert!(arena.velocity(b).unwrap().length() < 30.0);
    }

    #[test]
    fn kinematic_body_ignores_gravity() {
        let mut arena = Arena::new(900.0);
        let b = ball(&mut arena, 100.0, 100.0, 20.0);
        arena.set_gravity_enabled(b, false).unwrap();
        run(&mut arena, 1.0);
        assert_eq!(arena.position(b).unwrap(), Vec2::new(100.0, 100.0));
    }

    #[test]
    fn stacked_balls_report_contact_and_support() {
        let mut arena = Arena::new(900.0);
        arena.add_static_rect(Rect::new(Vec2::new(0.0, 500.0), Vec2::new(400.0, 40.0)));
        let low = ball(&mut arena, 200.0, 480.0, 20.0);
        let high = ball(&mut arena, 200.0, 300.0, 20.0);

        let mut seen = false;
        for _ in 0..120 {
            arena.advance(DT);
            let pairs = arena.drain_contacts();
            if pairs.contains(&ContactPair { a: low, b: high }) {
                seen = true;
            }
        }
        assert!(seen);
        assert!(arena.resting_contact(high).unwrap().on_body);
        assert!(arena.resting_contact(low).unwrap().on_ground);
        assert!(arena.position(high).unwrap().y < arena.position(low).unwrap().y);
    }

    #[test]
    fn contacts_are_drained_once() {
        let mut arena = Arena::new(0.0);
        let a = ball(&mut arena, 100.0, 100.0, 20.0);
        let b = ball(&mut arena, 130.0, 100.0, 20.0);
        arena.advance(DT);
        assert_eq!(arena.drain_contacts(), vec![ContactPair { a, b }]);
        assert!(arena.drain_contacts().is_empty());
    }

    #[test]
    fn drag_never_reverses_motion() {
        assert_eq!(decay(5.0, 10.0), 0.0);
        assert_eq!(decay(-5.0, 2.0), -3.0);
        assert_eq!(decay_vec(Vec2::new(3.0, 4.0), 10.0), Vec2::ZERO);
    }

    #[test]
    fn walls_follow_the_toggle() {
        let mut cfg = test_config();
        assert_eq!(staged(&cfg).static_count(), 1);
        cfg.stage.side_walls = true;
        assert_eq!(staged(&cfg).static_count(), 3);
    }

    #[test]
    fn destroyed_body_is_missing() {
        let mut arena = Arena::new(900.0);
        let b = ball(&mut arena, 0.0, 0.0, 10.0);
        arena.destroy_body(b).unwrap();
        assert_eq!(arena.position(b), Err(PhysicsError::MissingBody(b)));
        assert_eq!(arena.destroy_body(b), Err(PhysicsError::MissingBody(b)));
        assert_eq!(arena.body_count(), 0);
    }

    #[test]
    fn ball_off_the_base_keeps_falling() {
        let cfg = test_config();
        let mut arena = staged(&cfg);
        let b = ball(&mut arena, 10.0, 100.0, 20.0);
        run(&mut arena, 2.0);
        assert!(arena.position(b).unwrap().y > cfg.stage.base_top());
        assert!(!arena.resting_contact(b).unwrap().on_ground);
    }
}
