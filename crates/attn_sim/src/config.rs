//! Tuning for a session, loadable from JSON.
//!
//! Every section is `#[serde(default)]`, so a config file only needs the
//! values it changes. Units: positions in world pixels, times in seconds
//! (except `scroll_pause_ms`), vertical velocities in pixels per reference
//! frame (scaled by `frame_factor` when integrated), gravity in pixels per
//! frame per second.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, LoadError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub camera: CameraConfig,
    pub player: PlayerConfig,
    pub world: WorldConfig,
    pub generator: GeneratorConfig,
    pub effects: EffectsConfig,
    pub modifier: ModifierKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub start_y: f32,
    pub view_width: f32,
    pub view_height: f32,
    pub descent_speed: f32,
    pub speed_increment: f32,
    pub max_descent_speed: f32,
    pub max_out_of_bounds_time: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            start_y: 300.0,
            view_width: 360.0,
            view_height: 640.0,
            descent_speed: 40.0,
            speed_increment: 1.0,
            max_descent_speed: 80.0,
            max_out_of_bounds_time: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub spawn_x: f32,
    pub spawn_y: f32,
    pub width: f32,
    pub height: f32,
    pub gravity: f32,
    pub jump_force: f32,
    pub terminal_velocity: f32,
    pub frame_factor: f32,
    pub max_jumps: u32,
    pub move_speed: f32,
    pub powerup_speed: f32,
    pub focus_speed_multiplier: f32,
    pub ground_tolerance: f32,
    pub landing_epsilon: f32,
    pub head_bump_velocity: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            spawn_x: 150.0,
            spawn_y: 300.0,
            width: 30.0,
            height: 40.0,
            gravity: 21.0,
            jump_force: -12.0,
            terminal_velocity: 15.0,
            frame_factor: 60.0,
            max_jumps: 1,
            move_speed: 250.0,
            powerup_speed: 350.0,
            focus_speed_multiplier: 0.48,
            ground_tolerance: 5.0,
            landing_epsilon: 5.0,
            head_bump_velocity: 1.0,
        }
    }
}

impl PlayerConfig {
    /// Height of a jump apex above the take-off point, ignoring world descent.
    pub fn jump_apex_height(&self) -> f32 {
        let v0 = self.jump_force.abs();
        self.frame_factor * v0 * v0 / (2.0 * self.gravity)
    }

    pub fn jump_ascent_time(&self) -> f32 {
        self.jump_force.abs() / self.gravity
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub world_width: f32,
    pub layer_height: f32,
    pub above_view_margin: f32,
    pub fall_margin: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            world_width: 360.0,
            layer_height: 500.0,
            above_view_margin: 50.0,
            fall_margin: 320.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub platform_width_min: f32,
    pub platform_width_max: f32,
    pub platform_height: f32,
    pub gap_min: f32,
    pub gap_max: f32,
    pub moving_amplitude_min: f32,
    pub moving_amplitude_max: f32,
    pub moving_period_min: f32,
    pub moving_period_max: f32,
    pub moving_chance_base: f32,
    pub moving_chance_per_level: f32,
    pub moving_chance_cap: f32,
    pub collectible_interval: f32,
    pub collectible_chance_base: f32,
    pub collectible_chance_per_level: f32,
    pub collectible_chance_cap: f32,
    pub notification_share: f32,
    pub obstacle_interval: f32,
    pub obstacle_chance_base: f32,
    pub obstacle_chance_per_level: f32,
    pub obstacle_chance_cap: f32,
    pub collectible_size: f32,
    pub obstacle_width: f32,
    pub obstacle_height: f32,
    /// Furthest a platform's centre may sit horizontally from the previous
    /// platform's centre.
    pub path_max_shift: f32,
    /// New platforms are added while the lowest one is closer than
    /// `spawn_ahead_factor * view_height` below the camera.
    pub spawn_ahead_factor: f32,
    /// Entities further than `cull_factor * view_height` from the camera go.
    pub cull_factor: f32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            platform_width_min: 80.0,
            platform_width_max: 180.0,
            platform_height: 20.0,
            gap_min: 80.0,
            gap_max: 120.0,
            moving_amplitude_min: 50.0,
            moving_amplitude_max: 100.0,
            moving_period_min: 6.0,
            moving_period_max: 10.0,
            moving_chance_base: 0.05,
            moving_chance_per_level: 0.01,
            moving_chance_cap: 0.25,
            collectible_interval: 2.0,
            collectible_chance_base: 0.20,
            collectible_chance_per_level: 0.02,
            collectible_chance_cap: 0.40,
            notification_share: 0.8,
            obstacle_interval: 3.0,
            obstacle_chance_base: 0.15,
            obstacle_chance_per_level: 0.03,
            obstacle_chance_cap: 0.45,
            collectible_size: 24.0,
            obstacle_width: 80.0,
            obstacle_height: 24.0,
            path_max_shift: 140.0,
            spawn_ahead_factor: 1.0,
            cull_factor: 1.5,
        }
    }
}

/// Linear ramp in `level`, clamped to `cap`. Levels start at 1.
pub fn ramp_chance(base: f32, per_level: f32, cap: f32, level: u32) -> f32 {
    (base + per_level * level as f32).min(cap).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    pub powerup_duration: f32,
    pub scroll_pause_ms: f32,
    pub focus_duration: f32,
    pub battery_multiplier: f32,
    pub battery_duration: f32,
    pub collectible_points: u32,
    pub hazard_destroyed_points: u32,
    pub platform_destroyed_points: u32,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            powerup_duration: 3.0,
            scroll_pause_ms: 2000.0,
            focus_duration: 5.0,
            battery_multiplier: 1.5,
            battery_duration: 5.0,
            collectible_points: 100,
            hazard_destroyed_points: 50,
            platform_destroyed_points: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModifierKind {
    #[default]
    None,
    Noticeability,
    Alignment,
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.camera;
        positive("camera.view_width", c.view_width)?;
        positive("camera.view_height", c.view_height)?;
        finite("camera.start_y", c.start_y)?;
        non_negative("camera.descent_speed", c.descent_speed)?;
        non_negative("camera.speed_increment", c.speed_increment)?;
        ordered("camera.descent_speed", c.descent_speed, c.max_descent_speed)?;
        positive("camera.max_out_of_bounds_time", c.max_out_of_bounds_time)?;

        let p = &self.player;
        finite("player.spawn_x", p.spawn_x)?;
        finite("player.spawn_y", p.spawn_y)?;
        positive("player.width", p.width)?;
        positive("player.height", p.height)?;
        positive("player.gravity", p.gravity)?;
        if !(p.jump_force.is_finite() && p.jump_force < 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "player.jump_force",
                value: p.jump_force as f64,
                min: f64::NEG_INFINITY,
                max: 0.0,
            });
        }
        positive("player.terminal_velocity", p.terminal_velocity)?;
        positive("player.frame_factor", p.frame_factor)?;
        positive("player.max_jumps", p.max_jumps as f32)?;
        positive("player.move_speed", p.move_speed)?;
        positive("player.powerup_speed", p.powerup_speed)?;
        unit_interval("player.focus_speed_multiplier", p.focus_speed_multiplier)?;
        positive("player.ground_tolerance", p.ground_tolerance)?;
        positive("player.landing_epsilon", p.landing_epsilon)?;
        non_negative("player.head_bump_velocity", p.head_bump_velocity)?;

        let w = &self.world;
        positive("world.world_width", w.world_width)?;
        positive("world.layer_height", w.layer_height)?;
        non_negative("world.above_view_margin", w.above_view_margin)?;
        non_negative("world.fall_margin", w.fall_margin)?;
        if p.width > w.world_width {
            return Err(ConfigError::OutOfRange {
                field: "player.width",
                value: p.width as f64,
                min: 0.0,
                max: w.world_width as f64,
            });
        }

        let g = &self.generator;
        positive("generator.platform_width_min", g.platform_width_min)?;
        ordered(
            "generator.platform_width",
            g.platform_width_min,
            g.platform_width_max,
        )?;
        if g.platform_width_max > w.world_width {
            return Err(ConfigError::OutOfRange {
                field: "generator.platform_width_max",
                value: g.platform_width_max as f64,
                min: 0.0,
                max: w.world_width as f64,
            });
        }
        positive("generator.platform_height", g.platform_height)?;
        positive("generator.gap_min", g.gap_min)?;
        ordered("generator.gap", g.gap_min, g.gap_max)?;
        non_negative("generator.moving_amplitude_min", g.moving_amplitude_min)?;
        ordered(
            "generator.moving_amplitude",
            g.moving_amplitude_min,
            g.moving_amplitude_max,
        )?;
        positive("generator.moving_period_min", g.moving_period_min)?;
        ordered(
            "generator.moving_period",
            g.moving_period_min,
            g.moving_period_max,
        )?;
        unit_interval("generator.moving_chance_base", g.moving_chance_base)?;
        unit_interval("generator.moving_chance_cap", g.moving_chance_cap)?;
        unit_interval("generator.collectible_chance_base", g.collectible_chance_base)?;
        unit_interval("generator.collectible_chance_cap", g.collectible_chance_cap)?;
        unit_interval("generator.obstacle_chance_base", g.obstacle_chance_base)?;
        unit_interval("generator.obstacle_chance_cap", g.obstacle_chance_cap)?;
        unit_interval("generator.notification_share", g.notification_share)?;
        positive("generator.collectible_interval", g.collectible_interval)?;
        positive("generator.obstacle_interval", g.obstacle_interval)?;
        positive("generator.collectible_size", g.collectible_size)?;
        positive("generator.obstacle_width", g.obstacle_width)?;
        positive("generator.obstacle_height", g.obstacle_height)?;
        positive("generator.path_max_shift", g.path_max_shift)?;
        positive("generator.spawn_ahead_factor", g.spawn_ahead_factor)?;
        positive("generator.cull_factor", g.cull_factor)?;
        // A freshly spawned platform must not already be past the cull line.
        let spawn_reach =
            g.spawn_ahead_factor * c.view_height + g.gap_max + g.platform_height;
        let cull_line = g.cull_factor * c.view_height;
        if spawn_reach > cull_line {
            return Err(ConfigError::OutOfRange {
                field: "generator.spawn_ahead_factor",
                value: g.spawn_ahead_factor as f64,
                min: 0.0,
                max: ((cull_line - g.gap_max - g.platform_height) / c.view_height) as f64,
            });
        }

        let e = &self.effects;
        non_negative("effects.powerup_duration", e.powerup_duration)?;
        non_negative("effects.scroll_pause_ms", e.scroll_pause_ms)?;
        non_negative("effects.focus_duration", e.focus_duration)?;
        positive("effects.battery_multiplier", e.battery_multiplier)?;
        non_negative("effects.battery_duration", e.battery_duration)?;

        // A free-falling player must be able to hop between neighbours even
        // while the world descends underneath the jump at full speed.
        let reach = self.jump_reach();
        if g.gap_max > reach {
            return Err(ConfigError::UnreachableGap {
                gap_max: g.gap_max,
                reach,
            });
        }

        // Walking off one platform, the player must drift far enough sideways
        // to reach the next one before dropping past it.
        let needed = self.required_drift();
        let drift = self.drop_drift();
        if needed > drift {
            return Err(ConfigError::UnreachableShift {
                path_max_shift: g.path_max_shift,
                needed,
                drift,
            });
        }
        Ok(())
    }

    pub fn jump_reach(&self) -> f32 {
        let p = &self.player;
        p.jump_apex_height() - self.camera.max_descent_speed * p.jump_ascent_time()
    }

    /// Sideways distance covered at full move speed while falling from rest
    /// through the smallest gap, with the world descending at max speed.
    pub fn drop_drift(&self) -> f32 {
        let p = &self.player;
        let accel = p.frame_factor * p.gravity;
        let scroll = self.camera.max_descent_speed;
        let gap = self.generator.gap_min;
        let fall_time = ((scroll * scroll + 2.0 * accel * gap).sqrt() - scroll) / accel;
        p.move_speed * fall_time
    }

    /// Worst-case edge-to-edge distance between consecutive platforms, less
    /// the player's own width.
    pub fn required_drift(&self) -> f32 {
        let g = &self.generator;
        (g.path_max_shift - g.platform_width_min - self.player.width).max(0.0)
    }
}

pub fn load_config_from_path(path: &Path) -> Result<GameConfig, LoadError> {
    let raw = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: GameConfig = serde_json::from_str(&raw).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate().map_err(|err| LoadError::Invalid {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    Ok(config)
}

fn finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotFinite { field })
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive {
            field,
            value: value as f64,
        })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value: value as f64,
            min: 0.0,
            max: f64::INFINITY,
        })
    }
}

fn unit_interval(field: &'static str, value: f32) -> Result<(), ConfigError> {
    finite(field, value)?;
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value: value as f64,
            min: 0.0,
            max: 1.0,
        })
    }
}

fn ordered(field: &'static str, min: f32, max: f32) -> Result<(), ConfigError> {
    finite(field, min)?;
    finite(field, max)?;
    if min <= max {
        Ok(())
    } else {
        Err(ConfigError::InvertedRange {
            field,
            min: min as f64,
            max: max as f64,
        })
    }
}
