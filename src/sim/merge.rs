/// MergeResolver: turns same-tier contacts into next-tier pieces.
///
/// ## Per contact pair (in the order physics reported them)
///
///   1. Both bodies must still map to live pieces       (else: stale → skip)
///   2. Both pieces `can_merge()` and share a tier      (else: skip)
///   3. The tier must have a successor                  (else: terminal → skip)
///   4. Lock both, destroy both, spawn the successor at the midpoint
///
/// Step 4 runs to completion before the next pair is looked at. Consumed
/// pieces leave the board immediately, so a later pair naming one of them
/// falls out at step 1 and no piece can feed two merges.

use log::debug;
use rand::rngs::SmallRng;
use rand::Rng;

use crate::config::GameConfig;
use crate::domain::physics::{BodyDesc, ContactPair, PhysicsPort, Vec2};
use crate::domain::piece::{apply_profile, Piece, PieceId, PieceState};
use crate::domain::tier::TierId;
use crate::sim::checked;
use crate::sim::event::{GameEvent, ScoreEvent, ScoreSource};
use crate::sim::score;
use crate::sim::world::World;

/// Release merge locks whose cooldown has run out.
pub fn tick_cooldowns(world: &mut World, dt: f32) {
    for p in world.pieces.iter_mut() {
        p.tick_merge_cooldown(dt);
    }
}

/// Resolve every reported contact pair. Returns the number of merges.
pub fn resolve_contacts<P: PhysicsPort>(
    pairs: &[ContactPair],
    world: &mut World,
    physics: &mut P,
    config: &GameConfig,
    rng: &mut SmallRng,
    events: &mut Vec<GameEvent>,
) -> usize {
    pairs
        .iter()
        .filter(|pair| try_merge(pair, world, physics, config, rng, events).is_some())
        .count()
}

/// One merge transaction. `None` means the pair was not eligible.
pub fn try_merge<P: PhysicsPort>(
    pair: &ContactPair,
    world: &mut World,
    physics: &mut P,
    config: &GameConfig,
    rng: &mut SmallRng,
    events: &mut Vec<GameEvent>,
) -> Option<PieceId> {
    if world.is_over() || pair.a == pair.b {
        return None;
    }
    let ia = world.index_of_body(pair.a)?;
    let ib = world.index_of_body(pair.b)?;
    let (a, b) = (&world.pieces[ia], &world.pieces[ib]);
    if a.tier != b.tier || !a.can_merge() || !b.can_merge() {
        return None;
    }
    let source = a.tier;
    let result = config.tiers.successor(source)?;

    let pos_a = checked(physics.position(a.body), "merge")?;
    let pos_b = checked(physics.position(b.body), "merge")?;
    let consumed = [a.id, b.id];

    for &id in &consumed {
        if let Some(p) = world.piece_mut(id) {
            p.merge_locked = true;
        }
        if let Some(p) = world.remove(id) {
            checked(physics.destroy_body(p.body), "merge destroy");
        }
    }

    let midpoint = pos_a.midpoint(pos_b);
    let created = spawn_merged(result, midpoint, world, physics, config, rng);

    let amount = config.tiers.score(source);
    debug!(
        "merged {} + {} -> {} at ({:.0}, {:.0})",
        config.tiers.name(source),
        config.tiers.name(source),
        config.tiers.name(result),
        midpoint.x,
        midpoint.y
    );
    events.push(GameEvent::MergeResolved {
        position: midpoint,
        source_tier: source,
        result_tier: result,
        score_awarded: amount,
        consumed,
        created,
    });
    score::credit(
        world,
        ScoreEvent { source: ScoreSource::Merge, tier: Some(source), position: midpoint, amount },
        events,
    );
    Some(created)
}

/// Create the successor piece with its pop: lifted, flung up, merge-locked.
fn spawn_merged<P: PhysicsPort>(
    tier: TierId,
    midpoint: Vec2,
    world: &mut World,
    physics: &mut P,
    config: &GameConfig,
    rng: &mut SmallRng,
) -> PieceId {
    let tuning = &config.physics;
    let position = Vec2::new(midpoint.x, midpoint.y - tuning.merge_pop_offset);
    let body = physics.create_body(BodyDesc {
        position,
        radius: config.tiers.radius(tier),
        restitution: tuning.restitution,
        friction: tuning.friction,
        gravity: true,
    });

    let spin = symmetric(rng, tuning.drop_spin);
    checked(apply_profile(physics, body, PieceState::Dropping, tuning, spin), "merge pop");
    let pop = Vec2::new(symmetric(rng, tuning.merge_pop_spread), -tuning.merge_pop_speed);
    checked(physics.set_velocity(body, pop), "merge pop");

    let id = world.alloc_id();
    world.pieces.push(Piece::merged(id, tier, body, tuning.merge_cooldown));
    id
}

/// Uniform sample in `[-limit, limit]`.
pub(crate) fn symmetric(rng: &mut SmallRng, limit: f32) -> f32 {
    let limit = limit.abs();
    if limit == 0.0 {
        0.0
    } else {
        rng.gen_range(-limit..=limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::physics::BodyHandle;
    use crate::sim::testkit::{rng, test_config, FakePhysics};

    const A: TierId = TierId(0);
    const B: TierId = TierId(1);
    const C: TierId = TierId(2);

    struct Rig {
        cfg: GameConfig,
        ph: FakePhysics,
        world: World,
        rng: SmallRng,
        events: Vec<GameEvent>,
    }

    fn rig() -> Rig {
        Rig { cfg: test_config(), ph: FakePhysics::new(), world: World::new(), rng: rng(), events: vec![] }
    }

    impl Rig {
        fn place(&mut self, tier: TierId, x: f32, y: f32, state: PieceState) -> BodyHandle {
            let body = self.ph.create_body(BodyDesc {
                position: Vec2::new(x, y),
                radius: self.cfg.tiers.radius(tier),
                restitution: 0.2,
                friction: 0.3,
                gravity: state != PieceState::Holding,
            });
            let id = self.world.alloc_id();
            self.world.pieces.push(Piece::new(id, tier, body, state));
            if state == PieceState::Holding {
                self.world.active = Some(id);
            }
            body
        }

        fn resolve(&mut self, pairs: &[ContactPair]) -> usize {
            resolve_contacts(pairs, &mut self.world, &mut self.ph, &self.cfg, &mut self.rng, &mut self.events)
        }

        fn tiers(&self) -> Vec<TierId> {
            self.world.pieces.iter().map(|p| p.tier).collect()
        }
    }

    fn pair(a: BodyHandle, b: BodyHandle) -> ContactPair {
        ContactPair { a, b }
    }

    #[test]
    fn two_a_become_one_b_at_midpoint() {
        let mut r = rig();
        let a = r.place(A, 200.0, 700.0, PieceState::Locked);
        let b = r.place(A, 240.0, 680.0, PieceState::Dropping);

        assert_eq!(r.resolve(&[pair(a, b)]), 1);

        assert_eq!(r.tiers(), vec![B]);
        assert_eq!(r.world.ledger.total(), 50);
        assert!(!r.ph.exists(a));
        assert!(!r.ph.exists(b));

        let created = &r.world.pieces[0];
        assert_eq!(created.state(), PieceState::Dropping);
        assert!(created.merge_locked);
        let body = r.ph.body(created.body);
        let lift = r.cfg.physics.merge_pop_offset;
        assert_eq!(body.position, Vec2::new(220.0, 690.0 - lift));
        assert_eq!(body.velocity.y, -r.cfg.physics.merge_pop_speed);
        assert!(body.velocity.x.abs() <= r.cfg.physics.merge_pop_spread);
        assert!(body.gravity);

        match &r.events[0] {
            GameEvent::MergeResolved { position, source_tier, result_tier, score_awarded, created: c, .. } => {
                assert_eq!(*position, Vec2::new(220.0, 690.0));
                assert_eq!(*source_tier, A);
                assert_eq!(*result_tier, B);
                assert_eq!(*score_awarded, 50);
                assert_eq!(*c, created.id);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(r.events.last(), Some(&GameEvent::ScoreChanged { total: 50 }));
    }

    #[test]
    fn different_tiers_do_not_merge() {
        let mut r = rig();
        let a = r.place(A, 200.0, 700.0, PieceState::Locked);
        let b = r.place(B, 240.0, 700.0, PieceState::Locked);
        assert_eq!(r.resolve(&[pair(a, b)]), 0);
        assert_eq!(r.tiers(), vec![A, B]);
        assert!(r.events.is_empty());
    }

    #[test]
    fn terminal_tier_never_merges() {
        let mut r = rig();
        let a = r.place(C, 200.0, 700.0, PieceState::Locked);
        let b = r.place(C, 260.0, 700.0, PieceState::Locked);
        for _ in 0..10 {
            assert_eq!(r.resolve(&[pair(a, b), pair(b, a)]), 0);
        }
        assert_eq!(r.tiers(), vec![C, C]);
        assert_eq!(r.world.ledger.total(), 0);
    }

    #[test]
    fn held_piece_does_not_merge() {
        let mut r = rig();
        let held = r.place(A, 270.0, 120.0, PieceState::Holding);
        let other = r.place(A, 270.0, 150.0, PieceState::Dropping);
        assert_eq!(r.resolve(&[pair(held, other)]), 0);
        assert_eq!(r.world.pieces.len(), 2);
    }

    #[test]
    fn locked_piece_does_not_merge() {
        let mut r = rig();
        let a = r.place(A, 200.0, 700.0, PieceState::Locked);
        let b = r.place(A, 240.0, 700.0, PieceState::Locked);
        r.world.pieces[1].merge_locked = true;
        assert_eq!(r.resolve(&[pair(a, b)]), 0);
    }

    #[test]
    fn no_piece_feeds_two_merges() {
        // x touches both y and z in the same tick: exactly one merge happens.
        let mut r = rig();
        let x = r.place(A, 200.0, 700.0, PieceState::Locked);
        let y = r.place(A, 240.0, 700.0, PieceState::Locked);
        let z = r.place(A, 160.0, 700.0, PieceState::Locked);

        assert_eq!(r.resolve(&[pair(x, y), pair(x, z), pair(y, z)]), 1);
        assert_eq!(r.tiers(), vec![A, B]);
        assert!(r.ph.exists(z));
        assert_eq!(r.world.ledger.total(), 50);
    }

    #[test]
    fn duplicate_and_reversed_pairs_are_stale() {
        let mut r = rig();
        let a = r.place(A, 200.0, 700.0, PieceState::Locked);
        let b = r.place(A, 240.0, 700.0, PieceState::Locked);
        assert_eq!(r.resolve(&[pair(a, b), pair(b, a), pair(a, b)]), 1);
        assert_eq!(r.world.pieces.len(), 1);
    }

    #[test]
    fn fresh_merge_result_waits_for_cooldown() {
        let mut r = rig();
        let a = r.place(A, 200.0, 700.0, PieceState::Locked);
        let b = r.place(A, 240.0, 700.0, PieceState::Locked);
        r.resolve(&[pair(a, b)]);
        let fresh = r.world.pieces[0].body;
        let other_b = r.place(B, 260.0, 700.0, PieceState::Locked);

        assert_eq!(r.resolve(&[pair(fresh, other_b)]), 0);
        tick_cooldowns(&mut r.world, r.cfg.physics.merge_cooldown);
        assert_eq!(r.resolve(&[pair(fresh, other_b)]), 1);
        assert_eq!(r.tiers(), vec![C]);
        assert_eq!(r.world.ledger.total(), 200);
    }

    #[test]
    fn unknown_bodies_are_ignored() {
        let mut r = rig();
        let a = r.place(A, 200.0, 700.0, PieceState::Locked);
        assert_eq!(r.resolve(&[pair(a, BodyHandle(999)), pair(a, a)]), 0);
        assert_eq!(r.world.pieces.len(), 1);
    }

    #[test]
    fn no_merges_after_game_over() {
        let mut r = rig();
        let a = r.place(A, 200.0, 700.0, PieceState::Locked);
        let b = r.place(A, 240.0, 700.0, PieceState::Locked);
        r.world.game_over = Some(crate::domain::rules::GameOverReason::BaseOut);
        assert_eq!(r.resolve(&[pair(a, b)]), 0);
        assert_eq!(r.world.pieces.len(), 2);
    }

    #[test]
    fn symmetric_range() {
        let mut g = rng();
        assert_eq!(symmetric(&mut g, 0.0), 0.0);
        for _ in 0..100 {
            let v = symmetric(&mut g, -5.0);
            assert!((-5.0..=5.0).contains(&v));
        }
    }
}
