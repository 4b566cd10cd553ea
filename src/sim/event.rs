/// Events emitted during a simulation step.
/// The presentation layer consumes these for HUD updates and effects,
/// either from the `Vec` returned by `Game::step` or through listeners
/// registered with `Game::subscribe`.

use std::fmt;

use crate::domain::physics::Vec2;
use crate::domain::piece::PieceId;
use crate::domain::rules::GameOverReason;
use crate::domain::tier::TierId;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ScoreSource {
    Landing,
    Merge,
    Height,
}

/// One point award, as handed to the ledger.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ScoreEvent {
    pub source: ScoreSource,
    /// Tier behind the award (none for the height bonus).
    pub tier: Option<TierId>,
    pub position: Vec2,
    pub amount: u32,
}

#[derive(Clone, PartialEq, Debug)]
pub enum GameEvent {
    PieceSpawned { id: PieceId, tier: TierId },
    PieceDropped { id: PieceId },
    PieceLanded { id: PieceId, tier: TierId },
    MergeResolved {
        position: Vec2,
        source_tier: TierId,
        result_tier: TierId,
        score_awarded: u32,
        consumed: [PieceId; 2],
        created: PieceId,
    },
    NextTierChanged { tier: TierId },
    ScoreAwarded(ScoreEvent),
    ScoreChanged { total: u32 },
    GameOver {
        reason: GameOverReason,
        final_score: u32,
        best_score: u32,
        new_record: bool,
    },
}

/// One-to-many broadcast of game events to registered listeners.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Box<dyn FnMut(&GameEvent)>>,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus { listeners: Vec::new() }
    }

    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&GameEvent) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Deliver every event, in order, to every listener.
    pub fn publish(&mut self, events: &[GameEvent]) {
        for event in events {
            for listener in self.listeners.iter_mut() {
                listener(event);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn every_listener_sees_every_event_in_order() {
        let mut bus = EventBus::new();
        let first = Rc::new(RefCell::new(Vec::new()));
        let second = Rc::new(RefCell::new(0usize));

        let sink = Rc::clone(&first);
        bus.subscribe(move |e| sink.borrow_mut().push(e.clone()));
        let count = Rc::clone(&second);
        bus.subscribe(move |_| *count.borrow_mut() += 1);

        bus.publish(&[
            GameEvent::ScoreChanged { total: 10 },
            GameEvent::NextTierChanged { tier: TierId(1) },
        ]);

        assert_eq!(bus.len(), 2);
        assert_eq!(
            *first.borrow(),
            vec![
                GameEvent::ScoreChanged { total: 10 },
                GameEvent::NextTierChanged { tier: TierId(1) },
            ]
        );
        assert_eq!(*second.borrow(), 2);
    }

    #[test]
    fn publish_without_listeners_is_fine() {
        let mut bus = EventBus::new();
        assert!(bus.is_empty());
        bus.publish(&[GameEvent::PieceDropped { id: PieceId(1) }]);
    }
}
