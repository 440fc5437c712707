use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::CameraConfig;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub position: Vec2,
    pub descent_speed: f32,
    pub out_of_bounds_timer: f32,
}

/// Only ever moves down, at `descent_speed * speed_multiplier` px/s.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec2,
    pub view_width: f32,
    pub view_height: f32,
    descent_speed: f32,
    speed_multiplier: f32,
    out_of_bounds_timer: f32,
    max_out_of_bounds_time: f32,
    player_lost: bool,
}

impl Camera {
    pub fn new(config: &CameraConfig) -> Self {
        assert!(
            config.view_height > 0.0 && config.view_width > 0.0,
            "camera view must have a positive size"
        );
        Self {
            position: Vec2::new(config.view_width * 0.5, config.start_y),
            view_width: config.view_width,
            view_height: config.view_height,
            descent_speed: config.descent_speed.max(0.0),
            speed_multiplier: 1.0,
            out_of_bounds_timer: 0.0,
            max_out_of_bounds_time: config.max_out_of_bounds_time,
            player_lost: false,
        }
    }

    pub fn reset(&mut self, config: &CameraConfig) {
        *self = Self::new(config);
    }

    /// Move the camera down by one tick. Negative or non-finite `dt` is a no-op.
    pub fn advance(&mut self, dt: f32) {
        let dt = sanitize_dt(dt);
        self.position.y += self.effective_descent_speed() * dt;
    }

    /// Closed interval test on the vertical axis only.
    pub fn is_in_view(&self, point: Vec2) -> bool {
        point.y >= self.view_top() && point.y <= self.view_bottom()
    }

    /// Advance, then judge the player. Returns `false` once the player has
    /// been out of view for `max_out_of_bounds_time`, and forever after.
    pub fn update(&mut self, dt: f32, player_position: Vec2) -> bool {
        if self.player_lost {
            return false;
        }
        self.advance(dt);

        if self.is_in_view(player_position) {
            self.out_of_bounds_timer = 0.0;
            return true;
        }

        self.out_of_bounds_timer += sanitize_dt(dt);
        if self.out_of_bounds_timer >= self.max_out_of_bounds_time {
            log::debug!(
                "player out of view for {:.2}s at camera y {:.1}",
                self.out_of_bounds_timer,
                self.position.y
            );
            self.player_lost = true;
            return false;
        }
        true
    }

    pub fn view_top(&self) -> f32 {
        self.position.y - self.view_height * 0.5
    }

    pub fn view_bottom(&self) -> f32 {
        self.position.y + self.view_height * 0.5
    }

    pub fn descent_speed(&self) -> f32 {
        self.descent_speed
    }

    pub fn speed_multiplier(&self) -> f32 {
        self.speed_multiplier
    }

    /// Descent rate including any temporary boost; this is what everything
    /// riding the scroll must move at.
    pub fn effective_descent_speed(&self) -> f32 {
        self.descent_speed * self.speed_multiplier
    }

    pub fn set_descent_speed(&mut self, speed: f32) {
        if speed.is_finite() && speed > self.descent_speed {
            self.descent_speed = speed;
        }
    }

    /// Difficulty step. The base speed never decreases.
    pub fn bump_descent_speed(&mut self, increment: f32, cap: f32) {
        let next = (self.descent_speed + increment.max(0.0)).min(cap);
        self.set_descent_speed(next);
    }

    pub fn set_speed_multiplier(&mut self, multiplier: f32) {
        if multiplier.is_finite() && multiplier > 0.0 {
            self.speed_multiplier = multiplier;
        }
    }

    pub fn out_of_bounds_timer(&self) -> f32 {
        self.out_of_bounds_timer
    }

    pub fn player_lost(&self) -> bool {
        self.player_lost
    }

    pub fn state(&self) -> CameraState {
        CameraState {
            position: self.position,
            descent_speed: self.effective_descent_speed(),
            out_of_bounds_timer: self.out_of_bounds_timer,
        }
    }
}

fn sanitize_dt(dt: f32) -> f32 {
    if dt.is_finite() && dt > 0.0 {
        dt
    } else {
        0.0
    }
}
