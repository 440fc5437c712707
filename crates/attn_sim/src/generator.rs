//! Rolling window of platforms, pickups and hazards around the camera.
//!
//! All randomness comes from one seeded `ChaCha8Rng`, so a session replays
//! identically from the same seed and inputs.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::camera::Camera;
use crate::config::{ramp_chance, GeneratorConfig};
use crate::entities::{
    Collectible, CollectibleKind, EntityId, EntityStore, Obstacle, ObstacleKind, Platform,
    PlatformKind,
};
use crate::player::Player;

const AD_BLOCK_SHARE: f32 = 0.4;
const FOCUS_ZONE_SHARE: f32 = 0.3;

#[derive(Debug, Clone)]
pub struct EntityGenerator {
    config: GeneratorConfig,
    world_width: f32,
    rng: ChaCha8Rng,
    next_id: u64,
    /// Top of the lowest platform spawned so far.
    last_y: f32,
    /// Centre x of the lowest platform spawned so far.
    last_center_x: f32,
    next_collectible_roll: f64,
    next_obstacle_roll: f64,
}

impl EntityGenerator {
    pub fn new(config: &GeneratorConfig, world_width: f32, seed: u64) -> Self {
        Self {
            config: config.clone(),
            world_width,
            rng: ChaCha8Rng::seed_from_u64(seed),
            next_id: 1,
            last_y: 0.0,
            last_center_x: world_width * 0.5,
            next_collectible_roll: 0.0,
            next_obstacle_roll: 0.0,
        }
    }

    pub fn last_y(&self) -> f32 {
        self.last_y
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    /// A normal platform centred under the player's feet.
    pub fn spawn_start_platform(&mut self, player: &Player, store: &mut EntityStore) -> EntityId {
        let width = self.config.platform_width_max;
        let center = player.position.x + player.size.x * 0.5;
        let x = (center - width * 0.5).clamp(0.0, (self.world_width - width).max(0.0));
        let y = player.bottom();
        let id = self.allocate_id();
        store.insert_platform(Platform::new(
            id,
            Vec2::new(x, y),
            Vec2::new(width, self.config.platform_height),
            PlatformKind::Normal,
        ));
        self.last_y = y;
        self.last_center_x = x + width * 0.5;
        id
    }

    /// Fill platforms down to the spawn horizon.
    pub fn generate_initial(&mut self, camera: &Camera, level: u32, store: &mut EntityStore) {
        let mut spawned = 0usize;
        while self
            .generate_ahead(camera.position.y, camera.view_height, level, store)
            .is_some()
        {
            spawned += 1;
        }
        log::debug!("initial generation placed {spawned} platforms");
    }

    /// Spawn at most one platform below the lowest one, if the lowest is still
    /// inside the spawn horizon.
    pub fn generate_ahead(
        &mut self,
        camera_y: f32,
        view_height: f32,
        level: u32,
        store: &mut EntityStore,
    ) -> Option<EntityId> {
        if self.last_y >= camera_y + self.config.spawn_ahead_factor * view_height {
            return None;
        }

        let cfg = &self.config;
        let gap = self.rng.gen_range(cfg.gap_min..=cfg.gap_max);
        let width = self.rng.gen_range(cfg.platform_width_min..=cfg.platform_width_max);

        let moving_chance = ramp_chance(
            cfg.moving_chance_base,
            cfg.moving_chance_per_level,
            cfg.moving_chance_cap,
            level,
        );
        let kind = if self.rng.gen_bool(f64::from(moving_chance)) {
            let amplitude = self
                .rng
                .gen_range(cfg.moving_amplitude_min..=cfg.moving_amplitude_max)
                .min((self.world_width - width).max(0.0));
            PlatformKind::Moving {
                amplitude,
                period: self
                    .rng
                    .gen_range(cfg.moving_period_min..=cfg.moving_period_max),
                phase: self.rng.gen_range(0.0..TAU),
            }
        } else {
            PlatformKind::Normal
        };

        // Keep the whole sweep inside the world and near the previous platform.
        let travel = match kind {
            PlatformKind::Moving { amplitude, .. } => amplitude,
            PlatformKind::Normal => 0.0,
        };
        let x_max_world = (self.world_width - width - travel).max(0.0);
        let x_min = (self.last_center_x - cfg.path_max_shift - width * 0.5).clamp(0.0, x_max_world);
        let x_max = (self.last_center_x + cfg.path_max_shift - width * 0.5).clamp(0.0, x_max_world);
        let x = if x_min >= x_max {
            x_min
        } else {
            self.rng.gen_range(x_min..=x_max)
        };

        let y = self.last_y + gap;
        let id = self.allocate_id();
        let height = self.config.platform_height;
        store.insert_platform(Platform::new(
            id,
            Vec2::new(x, y),
            Vec2::new(width, height),
            kind,
        ));
        log::trace!("spawned platform {id:?} at ({x:.1}, {y:.1}) width {width:.1} {kind:?}");
        self.last_y = y;
        self.last_center_x = x + (width + travel) * 0.5;
        Some(id)
    }

    /// One-shot pickups and hazards for a freshly entered layer, scattered in
    /// the band just below the view.
    pub fn generate_layer(&mut self, layer: u32, camera: &Camera, store: &mut EntityStore) {
        let collectibles = 5 + layer / 10;
        let obstacles = 3 + layer / 5;
        for _ in 0..collectibles {
            let y = self.band_below_view(camera);
            self.spawn_collectible(y, store);
        }
        for _ in 0..obstacles {
            let y = self.band_below_view(camera);
            self.spawn_obstacle(y, store);
        }
        log::debug!("layer {layer}: {collectibles} collectibles, {obstacles} obstacles");
    }

    /// Cooldown-gated random spawns; each kind rolls at most once per interval.
    pub fn spawn_periodic(&mut self, now: f64, camera: &Camera, level: u32, store: &mut EntityStore) {
        if now >= self.next_collectible_roll {
            self.next_collectible_roll = now + f64::from(self.config.collectible_interval);
            let chance = ramp_chance(
                self.config.collectible_chance_base,
                self.config.collectible_chance_per_level,
                self.config.collectible_chance_cap,
                level,
            );
            if self.rng.gen_bool(f64::from(chance)) {
                let y = self.band_below_view(camera);
                self.spawn_collectible(y, store);
            }
        }

        if now >= self.next_obstacle_roll {
            self.next_obstacle_roll = now + f64::from(self.config.obstacle_interval);
            let chance = ramp_chance(
                self.config.obstacle_chance_base,
                self.config.obstacle_chance_per_level,
                self.config.obstacle_chance_cap,
                level,
            );
            if self.rng.gen_bool(f64::from(chance)) {
                let y = self.band_below_view(camera);
                self.spawn_obstacle(y, store);
            }
        }
    }

    fn band_below_view(&mut self, camera: &Camera) -> f32 {
        let top = camera.view_bottom();
        top + self.rng.gen_range(0.0..=camera.view_height * 0.5)
    }

    fn spawn_collectible(&mut self, y: f32, store: &mut EntityStore) -> EntityId {
        let size = self.config.collectible_size;
        let x = self.rng.gen_range(0.0..=(self.world_width - size).max(0.0));
        let kind = if self.rng.gen::<f32>() < self.config.notification_share {
            CollectibleKind::Notification
        } else {
            CollectibleKind::Powerup
        };
        let id = self.allocate_id();
        store.insert_collectible(Collectible::new(
            id,
            Vec2::new(x, y),
            Vec2::splat(size),
            kind,
        ));
        id
    }

    fn spawn_obstacle(&mut self, y: f32, store: &mut EntityStore) -> EntityId {
        let size = Vec2::new(self.config.obstacle_width, self.config.obstacle_height);
        let x = self.rng.gen_range(0.0..=(self.world_width - size.x).max(0.0));
        let roll = self.rng.gen::<f32>();
        let kind = if roll < AD_BLOCK_SHARE {
            ObstacleKind::AdBlock
        } else if roll < AD_BLOCK_SHARE + FOCUS_ZONE_SHARE {
            ObstacleKind::FocusZone
        } else {
            ObstacleKind::Battery
        };
        let id = self.allocate_id();
        store.insert_obstacle(Obstacle::new(id, Vec2::new(x, y), size, kind));
        id
    }

    /// Remove everything too far from the camera in either direction.
    pub fn cull(&self, camera_y: f32, view_height: f32, store: &mut EntityStore) -> usize {
        let limit = self.config.cull_factor * view_height;
        let removed = store.remove_where(|rect| (rect.y - camera_y).abs() > limit);
        if removed > 0 {
            log::trace!("culled {removed} entities");
        }
        removed
    }

    pub fn update_platform_motion(&self, time: f32, store: &mut EntityStore) {
        for platform in store.platforms_mut() {
            platform.update_motion(time);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CameraConfig, GameConfig};

    fn setup(seed: u64) -> (EntityGenerator, Camera, EntityStore) {
        let config = GameConfig::default();
        (
            EntityGenerator::new(&config.generator, config.world.world_width, seed),
            Camera::new(&CameraConfig::default()),
            EntityStore::new(),
        )
    }

    #[test]
    fn start_platform_sits_under_player() {
        let (mut generator, _, mut store) = setup(1);
        let player = Player::new(&GameConfig::default().player);
        let id = generator.spawn_start_platform(&player, &mut store);
        let platform = store.platform(id).expect("start platform");
        assert_eq!(platform.top(), player.bottom());
        assert!(player.rect().horizontal_overlap(&platform.rect()));
        assert!(!platform.is_moving());
    }

    #[test]
    fn generated_platforms_respect_gap_width_and_bounds() {
        let (mut generator, camera, mut store) = setup(42);
        let player = Player::new(&GameConfig::default().player);
        generator.spawn_start_platform(&player, &mut store);
        generator.generate_initial(&camera, 20, &mut store);

        let cfg = GeneratorConfig::default();
        let platforms = store.platforms();
        assert!(platforms.len() > 3);
        for pair in platforms.windows(2) {
            let gap = pair[1].top() - pair[0].top();
            assert!(
                gap >= cfg.gap_min - 1e-3 && gap <= cfg.gap_max + 1e-3,
                "gap {gap}"
            );
        }
        for p in &platforms[1..] {
            assert!(p.size.x >= cfg.platform_width_min && p.size.x <= cfg.platform_width_max);
            assert!(p.anchor_x >= 0.0);
            assert!(p.anchor_x + p.size.x + p.travel() <= 360.0 + 1e-3);
        }
        assert!(generator.last_y() >= camera.position.y + camera.view_height);
    }

    #[test]
    fn same_seed_same_world() {
        let build = |seed| {
            let (mut generator, camera, mut store) = setup(seed);
            generator.generate_initial(&camera, 1, &mut store);
            generator.generate_layer(3, &camera, &mut store);
            store.snapshots()
        };
        assert_eq!(build(7), build(7));
        assert_ne!(build(7), build(8));
    }

    #[test]
    fn layer_generation_counts_scale_with_layer() {
        let (mut generator, camera, mut store) = setup(3);
        generator.generate_layer(10, &camera, &mut store);
        assert_eq!(store.collectible_count(), 6);
        assert_eq!(store.obstacle_count(), 5);
        for c in store.collectibles() {
            assert!(c.position.y >= camera.view_bottom());
        }
    }

    #[test]
    fn periodic_spawns_wait_for_cooldown() {
        let (mut generator, camera, mut store) = setup(5);
        let mut rolls = 0;
        for step in 0..600 {
            let now = step as f64 / 60.0;
            let before = generator.next_collectible_roll;
            generator.spawn_periodic(now, &camera, 1, &mut store);
            if generator.next_collectible_roll != before {
                rolls += 1;
            }
        }
        // Ten seconds at one roll every two seconds.
        assert_eq!(rolls, 5);
    }

    #[test]
    fn culling_bounds_live_platforms() {
        let (mut generator, mut camera, mut store) = setup(11);
        let mut peak = 0;
        for _ in 0..20_000 {
            camera.advance(1.0 / 60.0 * 10.0);
            generator.generate_ahead(camera.position.y, camera.view_height, 1, &mut store);
            generator.cull(camera.position.y, camera.view_height, &mut store);
            peak = peak.max(store.platform_count());
        }
        // Cull line 960 above to spawn horizon 760 below, 80px minimum gap.
        assert!(peak <= 23, "peak {peak}");
        assert!(store.platform_count() > 0);
    }
}
