//! Simulation core for a vertically descending platformer: the camera sinks
//! at a rising speed and the player has to keep up by dropping between
//! platforms, collecting notifications and avoiding ad-blocks.
//!
//! [`GameSession`] owns every component and advances them in a fixed order
//! once per [`GameSession::tick`].

pub mod camera;
pub mod collision;
pub mod config;
pub mod effects;
pub mod entities;
pub mod error;
pub mod events;
pub mod generator;
pub mod player;
pub mod replay;
pub mod score;
pub mod session;
pub mod world;

pub use camera::{Camera, CameraState};
pub use config::{load_config_from_path, GameConfig, ModifierKind};
pub use entities::{EntityId, EntitySnapshot, EntityStore};
pub use error::{ConfigError, LoadError};
pub use events::{EventBus, EventListener, GameEvent, ListenerId};
pub use player::{MotionState, Player, PlayerState};
pub use replay::{load_replay_from_path, replay_session, run_replay, state_digest, ReplaySequence};
pub use score::{ModifierStats, ScoreManager, ScoreModifierSystem};
pub use session::{GameOverReason, GameSession, SessionSnapshot, SessionState, SessionSummary, TickOutcome};
pub use world::{World, WorldState};
