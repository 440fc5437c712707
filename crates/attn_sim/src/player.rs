//! Player motion and the ground-tracking state machine.
//!
//! Three states: `Grounded` rides the scroll on a platform, `Airborne` falls
//! under gravity *plus* the scroll, `Powerup` ignores gravity and moves freely
//! on both axes. The platform under a grounded player is held by id only; the
//! store owns the platform and may drop it at any time, so the relation is
//! re-checked by `validate_ground` every tick.

use attn_core::InputIntent;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::PlayerConfig;
use crate::entities::{EntityId, EntityStore, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionState {
    Grounded,
    Airborne,
    Powerup,
}

/// Result of the per-tick ground check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroundCheck {
    NotGrounded,
    Supported,
    /// Grounded with no platform bound at all.
    MissingPlatform,
    /// The bound platform no longer exists in the store.
    DanglingPlatform(EntityId),
    /// Feet and platform top drifted apart by more than the tolerance.
    Drifted { gap: f32 },
    /// The player is no longer horizontally over the platform.
    WalkedOff,
}

impl GroundCheck {
    pub fn was_repaired(&self) -> bool {
        !matches!(self, GroundCheck::NotGrounded | GroundCheck::Supported)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub position: Vec2,
    pub velocity_y: f32,
    pub is_on_ground: bool,
    pub mode: MotionState,
}

#[derive(Debug, Clone)]
pub struct Player {
    pub position: Vec2,
    pub size: Vec2,
    pub velocity_y: f32,
    pub is_on_ground: bool,
    pub jump_count: u32,
    pub current_platform: Option<EntityId>,
    pub last_platform_x: Option<f32>,
    pub powerup_active: bool,
    pub move_speed_multiplier: f32,
    previous_bottom: f32,
}

impl Player {
    pub fn new(config: &PlayerConfig) -> Self {
        let position = Vec2::new(config.spawn_x, config.spawn_y);
        let size = Vec2::new(config.width, config.height);
        assert!(
            position.is_finite() && size.x > 0.0 && size.y > 0.0,
            "malformed player bounds: position {position:?} size {size:?}"
        );
        Self {
            position,
            size,
            velocity_y: 0.0,
            is_on_ground: false,
            jump_count: 0,
            current_platform: None,
            last_platform_x: None,
            powerup_active: false,
            move_speed_multiplier: 1.0,
            previous_bottom: position.y + size.y,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.position, self.size)
    }

    pub fn bottom(&self) -> f32 {
        self.position.y + self.size.y
    }

    /// Lower edge before the most recent `integrate`.
    pub fn previous_bottom(&self) -> f32 {
        self.previous_bottom
    }

    pub fn state(&self) -> MotionState {
        if self.powerup_active {
            MotionState::Powerup
        } else if self.is_on_ground {
            MotionState::Grounded
        } else {
            MotionState::Airborne
        }
    }

    pub fn snapshot(&self) -> PlayerState {
        PlayerState {
            position: self.position,
            velocity_y: self.velocity_y,
            is_on_ground: self.is_on_ground,
            mode: self.state(),
        }
    }

    /// Re-check that a grounded player really stands on its platform. Any
    /// failure drops the player into the air and clears the relation.
    pub fn validate_ground(&mut self, store: &EntityStore, tolerance: f32) -> GroundCheck {
        if !self.is_on_ground {
            return GroundCheck::NotGrounded;
        }

        let check = match self.current_platform {
            None => GroundCheck::MissingPlatform,
            Some(id) => match store.platform(id) {
                None => GroundCheck::DanglingPlatform(id),
                Some(platform) => {
                    let gap = (self.bottom() - platform.top()).abs();
                    // Compare against where the player will be once carried.
                    let carry = self
                        .last_platform_x
                        .map_or(0.0, |last| platform.position.x - last);
                    let mut feet = self.rect();
                    feet.x += carry;
                    if gap > tolerance {
                        GroundCheck::Drifted { gap }
                    } else if !feet.horizontal_overlap(&platform.rect()) {
                        GroundCheck::WalkedOff
                    } else {
                        GroundCheck::Supported
                    }
                }
            },
        };

        match check {
            GroundCheck::Supported | GroundCheck::NotGrounded => {}
            GroundCheck::WalkedOff => {
                log::debug!("player walked off platform {:?}", self.current_platform);
                self.leave_ground();
            }
            repair => {
                log::warn!("ground state desync repaired: {repair:?}");
                self.leave_ground();
            }
        }
        check
    }

    pub fn handle_input(&mut self, intent: InputIntent, dt: f32, config: &PlayerConfig) {
        if self.powerup_active {
            self.position.x += intent.horizontal_axis() * config.powerup_speed * dt;
            self.position.y += intent.vertical_axis() * config.powerup_speed * dt;
            return;
        }

        let speed = config.move_speed * self.move_speed_multiplier;
        self.position.x += intent.horizontal_axis() * speed * dt;

        if intent.wants_jump() && (self.is_on_ground || self.jump_count < config.max_jumps) {
            self.velocity_y = config.jump_force;
            self.jump_count += 1;
            self.leave_ground();
        }
    }

    pub fn apply_gravity(&mut self, dt: f32, config: &PlayerConfig) {
        if self.powerup_active {
            self.velocity_y = 0.0;
        } else if !self.is_on_ground {
            self.velocity_y = (self.velocity_y + config.gravity * dt).min(config.terminal_velocity);
        }
    }

    /// Move for one tick. `descent_speed` is the camera's effective rate; every
    /// state rides it so the player cannot passively escape upward.
    pub fn integrate(&mut self, dt: f32, descent_speed: f32, frame_factor: f32, store: &EntityStore) {
        self.previous_bottom = self.bottom();
        let scroll = descent_speed * dt;

        match self.state() {
            MotionState::Grounded => {
                self.velocity_y = 0.0;
                self.position.y += scroll;
                let platform_x = self
                    .current_platform
                    .and_then(|id| store.platform(id))
                    .map(|p| p.position.x);
                if let (Some(now), Some(last)) = (platform_x, self.last_platform_x) {
                    self.position.x += now - last;
                }
                self.last_platform_x = platform_x;
            }
            MotionState::Airborne => {
                self.position.y += self.velocity_y * dt * frame_factor + scroll;
                self.current_platform = None;
                self.last_platform_x = None;
            }
            MotionState::Powerup => {
                self.position.y += scroll;
            }
        }
    }

    /// Stand on `platform_id` with feet exactly at `top`.
    pub fn land(&mut self, platform_id: EntityId, top: f32, platform_x: f32) {
        self.position.y = top - self.size.y;
        self.velocity_y = 0.0;
        self.is_on_ground = true;
        self.jump_count = 0;
        self.current_platform = Some(platform_id);
        self.last_platform_x = Some(platform_x);
    }

    pub fn leave_ground(&mut self) {
        self.is_on_ground = false;
        self.current_platform = None;
        self.last_platform_x = None;
    }

    pub fn activate_powerup(&mut self) {
        self.powerup_active = true;
        self.velocity_y = 0.0;
        self.leave_ground();
    }

    /// Back to normal physics; the player resumes falling from rest.
    pub fn deactivate_powerup(&mut self) {
        self.powerup_active = false;
        self.velocity_y = 0.0;
    }

    pub fn set_move_speed_multiplier(&mut self, multiplier: f32) {
        self.move_speed_multiplier = multiplier.clamp(0.0, 1.0);
    }
}
