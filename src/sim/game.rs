/// Game: owns every piece of mutable state and the physics port.
///
/// The presentation layer talks to the core only through this type:
/// `start` / `step` / `restart` drive it, `subscribe` and the returned
/// event lists report what happened, and the read-only accessors expose
/// the board for drawing.

use log::{debug, info};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::config::{GameConfig, StageConfig};
use crate::domain::physics::PhysicsPort;
use crate::domain::piece::PieceId;
use crate::domain::rules::GameOverReason;
use crate::domain::tier::TierId;
use crate::sim::checked;
use crate::sim::event::{EventBus, GameEvent};
use crate::sim::save::ScoreStore;
use crate::sim::spawn::SpawnScheduler;
use crate::sim::world::{PieceView, World};

pub struct Game<P: PhysicsPort> {
    pub(super) config: GameConfig,
    pub(super) physics: P,
    pub(super) world: World,
    pub(super) scheduler: SpawnScheduler,
    pub(super) rng: SmallRng,
    pub(super) store: Box<dyn ScoreStore>,
    pub(super) best_score: u32,
    pub(super) bus: EventBus,
}

/// Register the stage's immovable geometry with the physics port.
pub fn install_stage<P: PhysicsPort>(physics: &mut P, stage: &StageConfig) {
    physics.add_static_rect(stage.base_rect());
    if stage.side_walls {
        for wall in stage.wall_rects() {
            physics.add_static_rect(wall);
        }
    }
}

impl<P: PhysicsPort> Game<P> {
    /// Build a game around `physics`. Stage geometry is installed here;
    /// no piece exists until `start`.
    pub fn new(config: GameConfig, mut physics: P, store: Box<dyn ScoreStore>, seed: u64) -> Self {
        install_stage(&mut physics, &config.stage);
        let mut rng = SmallRng::seed_from_u64(seed);
        let scheduler = SpawnScheduler::new(&config.spawn.pool, &mut rng);
        let best_score = store.load();
        debug!("game created, best score {best_score}, seed {seed}");
        Game {
            config,
            physics,
            world: World::new(),
            scheduler,
            rng,
            store,
            best_score,
            bus: EventBus::new(),
        }
    }

    /// Put the first piece in the player's hands.
    pub fn start(&mut self) -> Vec<GameEvent> {
        let mut events = vec![GameEvent::NextTierChanged { tier: self.scheduler.peek_next() }];
        self.scheduler.spawn_next(
            &mut self.world,
            &mut self.physics,
            &self.config,
            &mut self.rng,
            &mut events,
        );
        self.publish(events)
    }

    /// Spawn the queued tier now. No-op while a piece is held or after
    /// game over.
    pub fn spawn_next(&mut self) -> Option<PieceId> {
        let mut events = Vec::new();
        let id = self.scheduler.spawn_next(
            &mut self.world,
            &mut self.physics,
            &self.config,
            &mut self.rng,
            &mut events,
        );
        self.publish(events);
        id
    }

    /// Throw away the board and begin again. The best score carries over.
    pub fn restart(&mut self) -> Vec<GameEvent> {
        for piece in self.world.pieces.drain(..) {
            checked(self.physics.destroy_body(piece.body), "restart");
        }
        self.physics.drain_contacts();
        self.world = World::new();
        self.scheduler = SpawnScheduler::new(&self.config.spawn.pool, &mut self.rng);
        info!("restart");

        let mut events = vec![
            GameEvent::ScoreChanged { total: 0 },
            GameEvent::NextTierChanged { tier: self.scheduler.peek_next() },
        ];
        self.scheduler.spawn_next(
            &mut self.world,
            &mut self.physics,
            &self.config,
            &mut self.rng,
            &mut events,
        );
        self.publish(events)
    }

    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&GameEvent) + 'static,
    {
        self.bus.subscribe(listener);
    }

    pub(super) fn publish(&mut self, events: Vec<GameEvent>) -> Vec<GameEvent> {
        self.bus.publish(&events);
        events
    }

    // ── Read-only views ──

    pub fn pieces(&self) -> Vec<PieceView> {
        self.world
            .pieces
            .iter()
            .filter_map(|p| {
                let position = checked(self.physics.position(p.body), "piece view")?;
                Some(PieceView {
                    id: p.id,
                    tier: p.tier,
                    state: p.state(),
                    position,
                    radius: self.config.tiers.radius(p.tier),
                })
            })
            .collect()
    }

    pub fn active_piece(&self) -> Option<PieceView> {
        let id = self.world.active?;
        self.pieces().into_iter().find(|v| v.id == id)
    }

    pub fn score(&self) -> u32 {
        self.world.ledger.total()
    }

    pub fn best_score(&self) -> u32 {
        self.best_score
    }

    pub fn is_game_over(&self) -> bool {
        self.world.is_over()
    }

    pub fn game_over_reason(&self) -> Option<GameOverReason> {
        self.world.game_over
    }

    pub fn next_tier(&self) -> TierId {
        self.scheduler.peek_next()
    }

    /// Seconds the height-limit violation has persisted.
    pub fn linger(&self) -> f32 {
        self.world.linger
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn physics(&self) -> &P {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut P {
        &mut self.physics
    }

    #[cfg(test)]
    pub(crate) fn queue_next(&mut self, tier: TierId) {
        self.scheduler.force_next(tier);
    }
}
