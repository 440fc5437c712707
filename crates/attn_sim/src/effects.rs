//! Pickup and hazard effects, and the timers that revert them.
//!
//! An entity is removed from the store *before* its effect runs, so every
//! effect applies at most once. Timed effects re-arm their timer on repeat
//! activation instead of stacking.

use attn_core::EffectTimer;

use crate::camera::Camera;
use crate::config::GameConfig;
use crate::entities::{CollectibleKind, EntitySnapshot, EntityStore, ObstacleKind};
use crate::events::{EventBus, GameEvent, ScoreReason};
use crate::player::Player;
use crate::session::GameOverReason;
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pickup {
    Collectible(CollectibleKind),
    Obstacle(ObstacleKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectOutcome {
    Applied,
    /// A powered-up player destroyed the hazard instead.
    Destroyed,
    GameOver(GameOverReason),
}

/// Everything an effect may touch during one tick.
pub struct EffectContext<'a> {
    pub player: &'a mut Player,
    pub camera: &'a mut Camera,
    pub world: &'a mut World,
    pub store: &'a mut EntityStore,
    pub events: &'a mut EventBus,
    pub config: &'a GameConfig,
    pub now: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ActiveEffects {
    powerup: EffectTimer,
    focus: EffectTimer,
    speed_boost: EffectTimer,
}

impl ActiveEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn powerup_remaining(&self, now: f64) -> f64 {
        self.powerup.remaining(now)
    }

    pub fn focus_remaining(&self, now: f64) -> f64 {
        self.focus.remaining(now)
    }

    pub fn speed_boost_remaining(&self, now: f64) -> f64 {
        self.speed_boost.remaining(now)
    }

    /// Revert every effect whose timer has run out.
    pub fn expire(&mut self, now: f64, player: &mut Player, camera: &mut Camera, events: &mut EventBus) {
        if self.powerup.poll_expired(now) {
            player.deactivate_powerup();
            events.emit(GameEvent::PowerupEnded);
        }
        if self.focus.poll_expired(now) {
            player.set_move_speed_multiplier(1.0);
            events.emit(GameEvent::MovementRestored);
        }
        if self.speed_boost.poll_expired(now) {
            camera.set_speed_multiplier(1.0);
            events.emit(GameEvent::ScrollSpeedRestored);
        }
    }

    pub fn cancel_all(&mut self) {
        self.powerup.cancel();
        self.focus.cancel();
        self.speed_boost.cancel();
    }

    pub fn apply(&mut self, pickup: Pickup, ctx: &mut EffectContext<'_>) -> EffectOutcome {
        let config = ctx.config;
        let effects = &config.effects;
        match pickup {
            Pickup::Collectible(CollectibleKind::Powerup) => {
                ctx.player.activate_powerup();
                self.powerup.arm(ctx.now, f64::from(effects.powerup_duration));
                ctx.events.emit(GameEvent::PowerupStarted {
                    duration: effects.powerup_duration,
                });
                clear_obstacles_in_view(ctx);
                award(ctx.events, effects.collectible_points, ScoreReason::Collectible);
                EffectOutcome::Applied
            }
            Pickup::Collectible(CollectibleKind::Notification) => {
                ctx.world
                    .pause_for(effects.scroll_pause_ms, ctx.now, ctx.events);
                award(ctx.events, effects.collectible_points, ScoreReason::Collectible);
                EffectOutcome::Applied
            }
            Pickup::Obstacle(_) if ctx.player.powerup_active => {
                award(
                    ctx.events,
                    effects.hazard_destroyed_points,
                    ScoreReason::HazardDestroyed,
                );
                EffectOutcome::Destroyed
            }
            Pickup::Obstacle(ObstacleKind::AdBlock) => {
                EffectOutcome::GameOver(GameOverReason::HazardHit)
            }
            Pickup::Obstacle(ObstacleKind::FocusZone) => {
                let multiplier = config.player.focus_speed_multiplier;
                ctx.player.set_move_speed_multiplier(multiplier);
                self.focus.arm(ctx.now, f64::from(effects.focus_duration));
                ctx.events.emit(GameEvent::MovementSlowed { multiplier });
                EffectOutcome::Applied
            }
            Pickup::Obstacle(ObstacleKind::Battery) => {
                ctx.camera.set_speed_multiplier(effects.battery_multiplier);
                self.speed_boost
                    .arm(ctx.now, f64::from(effects.battery_duration));
                ctx.events.emit(GameEvent::ScrollSpeedChanged {
                    multiplier: effects.battery_multiplier,
                });
                EffectOutcome::Applied
            }
        }
    }

    /// Consume every pickup and hazard the player overlaps this tick.
    /// Returns the first terminal outcome, if any.
    pub fn resolve_pickups(&mut self, ctx: &mut EffectContext<'_>) -> Option<GameOverReason> {
        let bounds = ctx.player.rect();
        let collected: Vec<_> = ctx
            .store
            .collectibles()
            .iter()
            .filter(|c| c.rect().overlaps(&bounds))
            .map(|c| c.id)
            .collect();
        let hit: Vec<_> = ctx
            .store
            .obstacles()
            .iter()
            .filter(|o| o.rect().overlaps(&bounds))
            .map(|o| o.id)
            .collect();

        for id in collected {
            let Some(collectible) = ctx.store.remove_collectible(id) else {
                continue;
            };
            ctx.events.emit(GameEvent::CollectibleCollected {
                entity: EntitySnapshot::from(&collectible),
            });
            self.apply(Pickup::Collectible(collectible.kind), ctx);
        }

        let mut terminal = None;
        for id in hit {
            // A powerup collected above may already have cleared it.
            let Some(obstacle) = ctx.store.remove_obstacle(id) else {
                continue;
            };
            ctx.events.emit(GameEvent::ObstacleHit {
                entity: EntitySnapshot::from(&obstacle),
                powered: ctx.player.powerup_active,
            });
            if let EffectOutcome::GameOver(reason) = self.apply(Pickup::Obstacle(obstacle.kind), ctx) {
                terminal.get_or_insert(reason);
            }
        }
        terminal
    }
}

fn award(events: &mut EventBus, points: u32, reason: ScoreReason) {
    if points > 0 {
        events.emit(GameEvent::ScoreAwarded { points, reason });
    }
}

fn clear_obstacles_in_view(ctx: &mut EffectContext<'_>) {
    let top = ctx.camera.view_top();
    let bottom = ctx.camera.view_bottom();
    let cleared = ctx
        .store
        .remove_obstacles_where(|rect| rect.bottom() >= top && rect.top() <= bottom);
    if cleared > 0 {
        log::debug!("powerup cleared {cleared} obstacles in view");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{EntityId, Obstacle};
    use glam::Vec2;

    struct Fixture {
        player: Player,
        camera: Camera,
        world: World,
        store: EntityStore,
        events: EventBus,
        config: GameConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let config = GameConfig::default();
            let camera = Camera::new(&config.camera);
            let world = World::new(&config.world, &camera);
            Self {
                player: Player::new(&config.player),
                camera,
                world,
                store: EntityStore::new(),
                events: EventBus::new(),
                config,
            }
        }

        fn apply(&mut self, effects: &mut ActiveEffects, pickup: Pickup, now: f64) -> EffectOutcome {
            let mut ctx = EffectContext {
                player: &mut self.player,
                camera: &mut self.camera,
                world: &mut self.world,
                store: &mut self.store,
                events: &mut self.events,
                config: &self.config,
                now,
            };
            effects.apply(pickup, &mut ctx)
        }

        fn expire(&mut self, effects: &mut ActiveEffects, now: f64) {
            effects.expire(now, &mut self.player, &mut self.camera, &mut self.events);
        }
    }

    #[test]
    fn powerup_retrigger_extends_instead_of_reverting_early() {
        let mut fx = Fixture::new();
        let mut effects = ActiveEffects::new();
        fx.apply(&mut effects, Pickup::Collectible(CollectibleKind::Powerup), 0.0);
        fx.apply(&mut effects, Pickup::Collectible(CollectibleKind::Powerup), 2.0);

        fx.expire(&mut effects, 3.0);
        assert!(fx.player.powerup_active);
        fx.expire(&mut effects, 5.0);
        assert!(!fx.player.powerup_active);

        let ended = fx
            .events
            .dispatch()
            .into_iter()
            .filter(|e| *e == GameEvent::PowerupEnded)
            .count();
        assert_eq!(ended, 1);
    }

    #[test]
    fn ad_block_ends_game_unless_powered() {
        let mut fx = Fixture::new();
        let mut effects = ActiveEffects::new();
        assert_eq!(
            fx.apply(&mut effects, Pickup::Obstacle(ObstacleKind::AdBlock), 0.0),
            EffectOutcome::GameOver(GameOverReason::HazardHit)
        );

        fx.player.activate_powerup();
        assert_eq!(
            fx.apply(&mut effects, Pickup::Obstacle(ObstacleKind::AdBlock), 0.0),
            EffectOutcome::Destroyed
        );
        assert_eq!(
            fx.events.dispatch(),
            vec![GameEvent::ScoreAwarded {
                points: 50,
                reason: ScoreReason::HazardDestroyed
            }]
        );
    }

    #[test]
    fn battery_boosts_scroll_then_restores() {
        let mut fx = Fixture::new();
        let mut effects = ActiveEffects::new();
        fx.apply(&mut effects, Pickup::Obstacle(ObstacleKind::Battery), 1.0);
        assert_eq!(fx.camera.speed_multiplier(), 1.5);
        assert_eq!(fx.camera.effective_descent_speed(), 60.0);

        fx.expire(&mut effects, 5.9);
        assert_eq!(fx.camera.speed_multiplier(), 1.5);
        fx.expire(&mut effects, 6.0);
        assert_eq!(fx.camera.speed_multiplier(), 1.0);
        assert_eq!(
            fx.events.dispatch().last(),
            Some(&GameEvent::ScrollSpeedRestored)
        );
    }

    #[test]
    fn focus_zone_slows_movement_for_duration() {
        let mut fx = Fixture::new();
        let mut effects = ActiveEffects::new();
        fx.apply(&mut effects, Pickup::Obstacle(ObstacleKind::FocusZone), 0.0);
        assert_eq!(fx.player.move_speed_multiplier, 0.48);
        fx.expire(&mut effects, 5.0);
        assert_eq!(fx.player.move_speed_multiplier, 1.0);
    }

    #[test]
    fn notification_pauses_scroll() {
        let mut fx = Fixture::new();
        let mut effects = ActiveEffects::new();
        fx.apply(
            &mut effects,
            Pickup::Collectible(CollectibleKind::Notification),
            0.0,
        );
        assert!(fx.world.is_paused());
    }

    #[test]
    fn powerup_clears_obstacles_in_view_only() {
        let mut fx = Fixture::new();
        let mut effects = ActiveEffects::new();
        for (id, y) in [(1, 400.0), (2, 5_000.0)] {
            fx.store.insert_obstacle(Obstacle::new(
                EntityId(id),
                Vec2::new(0.0, y),
                Vec2::new(80.0, 24.0),
                ObstacleKind::AdBlock,
            ));
        }
        fx.apply(&mut effects, Pickup::Collectible(CollectibleKind::Powerup), 0.0);
        assert_eq!(fx.store.obstacle_count(), 1);
        assert_eq!(fx.store.obstacles()[0].id, EntityId(2));
    }

    #[test]
    fn overlapped_pickups_apply_once_and_are_removed() {
        let mut fx = Fixture::new();
        let mut effects = ActiveEffects::new();
        let feet = fx.player.position;
        fx.store.insert_obstacle(Obstacle::new(
            EntityId(7),
            feet,
            Vec2::new(80.0, 24.0),
            ObstacleKind::AdBlock,
        ));

        let mut ctx = EffectContext {
            player: &mut fx.player,
            camera: &mut fx.camera,
            world: &mut fx.world,
            store: &mut fx.store,
            events: &mut fx.events,
            config: &fx.config,
            now: 0.0,
        };
        assert_eq!(
            effects.resolve_pickups(&mut ctx),
            Some(GameOverReason::HazardHit)
        );
        assert_eq!(effects.resolve_pickups(&mut ctx), None);
        assert_eq!(fx.store.obstacle_count(), 0);
    }
}
