//! One game session: owns every component and runs the fixed tick order.
//!
//! Within a tick the camera is fully advanced before anything reads it, the
//! generator is the only inserter, and removals happen after iteration. A
//! session that reached `GameOver` has cancelled its timers and ignores
//! further ticks.

use std::fmt;

use attn_core::InputIntent;
use serde::{Deserialize, Serialize};

use crate::camera::{Camera, CameraState};
use crate::collision::{resolve_boundaries, resolve_platforms};
use crate::config::GameConfig;
use crate::effects::{ActiveEffects, EffectContext};
use crate::entities::{EntitySnapshot, EntityStore};
use crate::error::ConfigError;
use crate::events::{EventBus, EventListener, GameEvent, ListenerId};
use crate::generator::EntityGenerator;
use crate::player::{Player, PlayerState};
use crate::score::{create_modifier, ModifierStats, ScoreManager};
use crate::world::{World, WorldState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    /// Out of the camera view for longer than allowed.
    OutOfView,
    /// Dropped too far below the bottom of the view.
    FellBelow,
    /// Touched an ad-block without a powerup.
    HazardHit,
}

impl fmt::Display for GameOverReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            GameOverReason::OutOfView => "player left the view for too long",
            GameOverReason::FellBelow => "player fell below the camera",
            GameOverReason::HazardHit => "player hit an ad-block",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum SessionState {
    Running,
    GameOver(GameOverReason),
}

impl SessionState {
    pub fn is_over(&self) -> bool {
        matches!(self, SessionState::GameOver(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub state: SessionState,
    /// Events dispatched at the end of this tick.
    pub events: Vec<GameEvent>,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub tick: u64,
    pub time: f64,
    pub state: SessionState,
    pub camera: CameraState,
    pub world: WorldState,
    pub player: PlayerState,
    pub entities: Vec<EntitySnapshot>,
    pub score: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub seed: u64,
    pub ticks: u64,
    pub simulated_seconds: f64,
    pub state: SessionState,
    pub score: u64,
    pub bonus_points: u64,
    pub level: u32,
    pub depth: f32,
    pub landings: u64,
    pub collectibles_collected: u64,
    pub hazards_destroyed: u64,
    pub platforms_destroyed: u64,
    pub ground_repairs: u64,
    pub modifier: Option<ModifierStats>,
}

#[derive(Debug, Clone, Copy, Default)]
struct SessionStats {
    landings: u64,
    collectibles_collected: u64,
    hazards_destroyed: u64,
    platforms_destroyed: u64,
    ground_repairs: u64,
}

#[derive(Debug)]
pub struct GameSession {
    config: GameConfig,
    seed: u64,
    camera: Camera,
    world: World,
    player: Player,
    store: EntityStore,
    generator: EntityGenerator,
    effects: ActiveEffects,
    events: EventBus,
    score: ScoreManager,
    state: SessionState,
    time: f64,
    tick_count: u64,
    stats: SessionStats,
}

impl GameSession {
    pub fn new(config: GameConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let camera = Camera::new(&config.camera);
        let world = World::new(&config.world, &camera);
        let player = Player::new(&config.player);
        let generator = EntityGenerator::new(&config.generator, config.world.world_width, seed);
        let score = ScoreManager::new(create_modifier(config.modifier));
        let mut session = Self {
            config,
            seed,
            camera,
            world,
            player,
            store: EntityStore::new(),
            generator,
            effects: ActiveEffects::new(),
            events: EventBus::new(),
            score,
            state: SessionState::Running,
            time: 0.0,
            tick_count: 0,
            stats: SessionStats::default(),
        };
        session.populate();
        log::info!(
            "session started: seed {seed}, modifier {:?}, {} platforms",
            session.config.modifier,
            session.store.platform_count()
        );
        Ok(session)
    }

    fn populate(&mut self) {
        self.generator
            .spawn_start_platform(&self.player, &mut self.store);
        self.generator
            .generate_initial(&self.camera, self.world.current_layer(), &mut self.store);
    }

    /// Start over with the same config and seed. Listeners stay subscribed.
    pub fn reset(&mut self) {
        self.camera = Camera::new(&self.config.camera);
        self.world = World::new(&self.config.world, &self.camera);
        self.player = Player::new(&self.config.player);
        self.store.clear();
        self.generator =
            EntityGenerator::new(&self.config.generator, self.config.world.world_width, self.seed);
        self.effects = ActiveEffects::new();
        self.events.clear();
        self.score.reset();
        self.state = SessionState::Running;
        self.time = 0.0;
        self.tick_count = 0;
        self.stats = SessionStats::default();
        self.populate();
        log::info!("session reset: seed {}", self.seed);
    }

    pub fn subscribe(&mut self, listener: Box<dyn EventListener>) -> ListenerId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.events.unsubscribe(id).is_some()
    }

    pub fn tick(&mut self, dt: f32, intent: InputIntent) -> TickOutcome {
        if self.state.is_over() {
            return TickOutcome {
                state: self.state,
                events: Vec::new(),
            };
        }

        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        self.time += f64::from(dt);
        self.tick_count += 1;

        if let Some(reason) = self.step(dt, intent) {
            self.finish(reason);
        }

        let events = self.events.dispatch();
        for event in &events {
            self.score.on_event(event);
            self.count(event);
        }
        TickOutcome {
            state: self.state,
            events,
        }
    }

    fn step(&mut self, dt: f32, intent: InputIntent) -> Option<GameOverReason> {
        let now = self.time;

        self.effects
            .expire(now, &mut self.player, &mut self.camera, &mut self.events);

        if !self.camera.update(dt, self.player.position) {
            self.events.emit(GameEvent::PlayerOutOfBounds {
                timer: self.camera.out_of_bounds_timer(),
            });
            return Some(GameOverReason::OutOfView);
        }

        let update = self.world.update(now, &self.camera, &mut self.events);
        for layer in update.layers_crossed {
            self.camera.bump_descent_speed(
                self.config.camera.speed_increment,
                self.config.camera.max_descent_speed,
            );
            self.generator
                .generate_layer(layer, &self.camera, &mut self.store);
        }

        let level = self.world.current_layer();
        self.generator
            .update_platform_motion(now as f32, &mut self.store);
        self.generator.generate_ahead(
            self.camera.position.y,
            self.camera.view_height,
            level,
            &mut self.store,
        );
        self.generator
            .spawn_periodic(now, &self.camera, level, &mut self.store);
        self.generator.cull(
            self.camera.position.y,
            self.camera.view_height,
            &mut self.store,
        );

        let ground = self
            .player
            .validate_ground(&self.store, self.config.player.ground_tolerance);
        if ground.was_repaired() {
            self.stats.ground_repairs += 1;
        }

        self.player.handle_input(intent, dt, &self.config.player);
        self.player.apply_gravity(dt, &self.config.player);
        self.player.integrate(
            dt,
            self.camera.effective_descent_speed(),
            self.config.player.frame_factor,
            &self.store,
        );

        resolve_platforms(
            &mut self.player,
            &mut self.store,
            &self.camera,
            &self.config,
            &mut self.events,
        );
        resolve_boundaries(&mut self.player, &self.camera, &self.config.world);

        let mut ctx = EffectContext {
            player: &mut self.player,
            camera: &mut self.camera,
            world: &mut self.world,
            store: &mut self.store,
            events: &mut self.events,
            config: &self.config,
            now,
        };
        if let Some(reason) = self.effects.resolve_pickups(&mut ctx) {
            return Some(reason);
        }

        if self.player.position.y > self.camera.view_bottom() + self.config.world.fall_margin {
            return Some(GameOverReason::FellBelow);
        }

        self.score.update_modifier(dt);
        None
    }

    fn finish(&mut self, reason: GameOverReason) {
        self.state = SessionState::GameOver(reason);
        self.effects.cancel_all();
        self.world.cancel_timers();
        self.events.emit(GameEvent::GameOver { reason });
        log::info!(
            "game over after {} ticks ({:.2}s): {reason}",
            self.tick_count,
            self.time
        );
    }

    fn count(&mut self, event: &GameEvent) {
        match event {
            GameEvent::PlatformCollision { .. } => self.stats.landings += 1,
            GameEvent::CollectibleCollected { .. } => self.stats.collectibles_collected += 1,
            GameEvent::ObstacleHit { powered: true, .. } => self.stats.hazards_destroyed += 1,
            GameEvent::PlatformDestroyed { .. } => self.stats.platforms_destroyed += 1,
            _ => {}
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    pub fn score(&self) -> &ScoreManager {
        &self.score
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            tick: self.tick_count,
            time: self.time,
            state: self.state,
            camera: self.camera.state(),
            world: self.world.state(),
            player: self.player.snapshot(),
            entities: self.store.snapshots(),
            score: self.score.score(),
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            seed: self.seed,
            ticks: self.tick_count,
            simulated_seconds: self.time,
            state: self.state,
            score: self.score.score(),
            bonus_points: self.score.bonus_points(),
            level: self.world.current_layer(),
            depth: self.camera.position.y,
            landings: self.stats.landings,
            collectibles_collected: self.stats.collectibles_collected,
            hazards_destroyed: self.stats.hazards_destroyed,
            platforms_destroyed: self.stats.platforms_destroyed,
            ground_repairs: self.stats.ground_repairs,
            modifier: self.score.modifier_stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModifierKind;
    use crate::entities::{EntityId, Obstacle, ObstacleKind};
    use crate::player::MotionState;
    use glam::Vec2;

    const DT: f32 = 1.0 / 60.0;

    fn session() -> GameSession {
        GameSession::new(GameConfig::default(), 9).expect("default config is valid")
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = GameConfig::default();
        config.camera.view_height = 0.0;
        assert!(GameSession::new(config, 1).is_err());
    }

    #[test]
    fn player_settles_on_start_platform() {
        let mut session = session();
        let mut landed = false;
        for _ in 0..10 {
            let outcome = session.tick(DT, InputIntent::IDLE);
            landed |= outcome
                .events
                .iter()
                .any(|e| matches!(e, GameEvent::PlatformCollision { .. }));
        }
        assert!(landed);
        assert_eq!(session.player().state(), MotionState::Grounded);
        let platform = session
            .player()
            .current_platform
            .and_then(|id| session.store().platform(id))
            .expect("standing on a platform");
        assert!((session.player().bottom() - platform.top()).abs() < 1e-3);
    }

    #[test]
    fn player_held_above_view_is_lost() {
        let mut config = GameConfig::default();
        config.camera.max_out_of_bounds_time = 0.1;
        let mut session = GameSession::new(config, 9).expect("valid config");
        let top = session.camera().view_top();
        let player = session.player_mut();
        player.leave_ground();
        player.position.y = top - 200.0;

        let mut last = SessionState::Running;
        for _ in 0..30 {
            let outcome = session.tick(DT, InputIntent::IDLE);
            last = outcome.state;
            if last.is_over() {
                assert!(outcome
                    .events
                    .iter()
                    .any(|e| matches!(e, GameEvent::PlayerOutOfBounds { .. })));
                break;
            }
        }
        assert_eq!(last, SessionState::GameOver(GameOverReason::OutOfView));
    }

    #[test]
    fn falling_past_margin_ends_session() {
        let mut session = session();
        let bottom = session.camera().view_bottom();
        let margin = session.config().world.fall_margin;
        let player = session.player_mut();
        player.leave_ground();
        player.position.y = bottom + margin + 100.0;

        let outcome = session.tick(DT, InputIntent::IDLE);
        assert_eq!(
            outcome.state,
            SessionState::GameOver(GameOverReason::FellBelow)
        );
    }

    #[test]
    fn game_over_freezes_session() {
        let mut session = session();
        let position = session.player().position;
        session.store_mut().insert_obstacle(Obstacle::new(
            EntityId(u64::MAX),
            position,
            Vec2::new(80.0, 24.0),
            ObstacleKind::AdBlock,
        ));
        let outcome = session.tick(DT, InputIntent::IDLE);
        assert_eq!(
            outcome.state,
            SessionState::GameOver(GameOverReason::HazardHit)
        );
        assert_eq!(
            outcome.events.last(),
            Some(&GameEvent::GameOver {
                reason: GameOverReason::HazardHit
            })
        );

        let frozen = session.snapshot();
        let after = session.tick(DT, InputIntent::IDLE);
        assert!(after.events.is_empty());
        assert_eq!(session.snapshot(), frozen);
    }

    #[test]
    fn reset_replays_identically() {
        let mut session = session();
        let run = |session: &mut GameSession| {
            for step in 0..240 {
                let intent = InputIntent {
                    right: step % 90 < 45,
                    left: step % 90 >= 45,
                    ..InputIntent::IDLE
                };
                session.tick(DT, intent);
            }
            session.snapshot()
        };
        let first = run(&mut session);
        session.reset();
        assert_eq!(session.tick_count(), 0);
        let second = run(&mut session);
        assert_eq!(first, second);
    }

    #[test]
    fn summary_reports_modifier_stats() {
        let config = GameConfig {
            modifier: ModifierKind::Alignment,
            ..GameConfig::default()
        };
        let mut session = GameSession::new(config, 3).expect("valid config");
        session.tick(DT, InputIntent::IDLE);
        let summary = session.summary();
        assert_eq!(summary.ticks, 1);
        assert!(matches!(summary.modifier, Some(ModifierStats::Alignment { .. })));
        assert_eq!(summary.state, SessionState::Running);
    }
}
