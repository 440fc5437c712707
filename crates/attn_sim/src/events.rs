use serde::{Deserialize, Serialize};

use crate::entities::{EntityId, EntitySnapshot};
use crate::session::GameOverReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreReason {
    Collectible,
    HazardDestroyed,
    PlatformDestroyed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// A pickup overlapped the player and its effect was applied.
    CollectibleCollected { entity: EntitySnapshot },
    /// A hazard overlapped the player. `powered` hazards are destroyed
    /// instead of taking effect.
    ObstacleHit { entity: EntitySnapshot, powered: bool },
    /// The player landed on a platform this tick.
    PlatformCollision { platform: EntityId },
    /// A powered-up player smashed through a platform.
    PlatformDestroyed { platform: EntitySnapshot },
    /// The player stayed out of view long enough to lose.
    PlayerOutOfBounds { timer: f32 },
    /// The camera crossed into a new layer.
    LevelUp { level: u32 },
    ScrollPaused { duration_ms: f32 },
    ScrollResumed,
    ScrollSpeedChanged { multiplier: f32 },
    ScrollSpeedRestored,
    PowerupStarted { duration: f32 },
    PowerupEnded,
    MovementSlowed { multiplier: f32 },
    MovementRestored,
    ScoreAwarded { points: u32, reason: ScoreReason },
    GameOver { reason: GameOverReason },
}

pub trait EventListener {
    fn on_event(&mut self, event: &GameEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Queue of pending events plus the listeners they fan out to.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(ListenerId, Box<dyn EventListener>)>,
    pending: Vec<GameEvent>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Box<dyn EventListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> Option<Box<dyn EventListener>> {
        let index = self.listeners.iter().position(|(lid, _)| *lid == id)?;
        Some(self.listeners.remove(index).1)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn emit(&mut self, event: GameEvent) {
        log::trace!("emit {event:?}");
        self.pending.push(event);
    }

    pub fn pending(&self) -> &[GameEvent] {
        &self.pending
    }

    /// Deliver every queued event to every listener in subscription order,
    /// then hand the drained batch back to the caller.
    pub fn dispatch(&mut self) -> Vec<GameEvent> {
        let batch = std::mem::take(&mut self.pending);
        for event in &batch {
            for (_, listener) in self.listeners.iter_mut() {
                listener.on_event(event);
            }
        }
        batch
    }

    /// Drop queued events without delivering them.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .field("pending", &self.pending)
            .finish()
    }
}
