//! Scripted input source for headless runs.
//!
//! Each tick it ranks the platforms below the player by distance, steers
//! toward the closest reachable one and walks off edges to drop onto it.
//! A jump is pressed when horizontal progress stalls against a platform.

use attn_core::{InputIntent, InputState, Key};
use attn_sim::entities::{ObstacleKind, Rect};
use attn_sim::{GameSession, MotionState};

/// Pixels of horizontal slack before the autopilot bothers to steer.
const STEER_DEADZONE: f32 = 4.0;
/// Ticks of pressing a direction without moving before it jumps.
const STALL_TICKS: u32 = 8;
/// How far below the feet a hazard is worth dodging.
const HAZARD_LOOKAHEAD: f32 = 160.0;

#[derive(Debug, Default)]
pub struct Autopilot {
    keys: InputState,
    last_x: Option<f32>,
    stalled_for: u32,
}

impl Autopilot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_intent(&mut self, session: &GameSession) -> InputIntent {
        self.keys.end_frame();
        self.keys.release_all();

        let player = session.player();
        let feet = player.bottom();
        let centre = player.position.x + player.size.x * 0.5;

        let target = target_platform_x(session, feet, centre);
        let mut steer = match target {
            Some(x) if x > centre + STEER_DEADZONE => 1.0,
            Some(x) if x < centre - STEER_DEADZONE => -1.0,
            _ => 0.0,
        };
        if let Some(dodge) = hazard_dodge(session, centre) {
            steer = dodge;
        }

        if steer > 0.0 {
            self.keys.key_down(Key::Right);
        } else if steer < 0.0 {
            self.keys.key_down(Key::Left);
        }

        let moved = self
            .last_x
            .map_or(true, |last| (player.position.x - last).abs() > 0.01);
        self.last_x = Some(player.position.x);
        if steer != 0.0 && !moved {
            self.stalled_for += 1;
        } else {
            self.stalled_for = 0;
        }

        if self.stalled_for >= STALL_TICKS && player.state() == MotionState::Grounded {
            log::trace!("autopilot stalled at x {:.1}, jumping", player.position.x);
            self.keys.key_down(Key::Space);
            self.stalled_for = 0;
        }

        self.keys.intent()
    }
}

/// Centre x of the nearest platform whose top lies below the player's feet
/// and that is still inside the view.
fn target_platform_x(session: &GameSession, feet: f32, centre: f32) -> Option<f32> {
    let view_bottom = session.camera().view_bottom();
    let standing_on = session.player().current_platform;

    session
        .store()
        .platforms()
        .iter()
        .filter(|p| Some(p.id) != standing_on)
        .filter(|p| p.top() > feet + 1.0 && p.top() <= view_bottom)
        .map(|p| {
            let x = p.position.x + p.size.x * 0.5;
            let dx = x - centre;
            let dy = p.top() - feet;
            (dx * dx + dy * dy, x)
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, x)| x)
}

/// Direction away from an ad-block sitting in the drop column, unless a
/// powerup makes it harmless.
fn hazard_dodge(session: &GameSession, centre: f32) -> Option<f32> {
    let player = session.player();
    if player.powerup_active {
        return None;
    }
    let column = Rect {
        x: player.position.x,
        y: player.position.y,
        w: player.size.x,
        h: player.size.y + HAZARD_LOOKAHEAD,
    };
    session
        .store()
        .obstacles()
        .iter()
        .filter(|o| o.kind == ObstacleKind::AdBlock)
        .find(|o| o.rect().overlaps(&column))
        .map(|o| {
            let hazard_centre = o.position.x + o.size.x * 0.5;
            if hazard_centre >= centre {
                -1.0
            } else {
                1.0
            }
        })
}
