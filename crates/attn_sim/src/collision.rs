//! Player-versus-platform resolution, run once per tick after integration.
//!
//! Landing is tested before anything else and recomputed from scratch each
//! tick: the player is grounded after this pass only if some platform in
//! view passed the landing test *this* tick. Everything else that overlaps is
//! pushed apart along the axis of least penetration, or smashed when the
//! player is powered up.

use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::config::{GameConfig, WorldConfig};
use crate::entities::{EntityId, EntitySnapshot, EntityStore, Platform, Rect};
use crate::events::{EventBus, GameEvent, ScoreReason};
use crate::player::Player;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PushAxis {
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Push {
    pub platform: EntityId,
    pub axis: PushAxis,
    pub depth: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveReport {
    pub landed_on: Option<EntityId>,
    pub destroyed: Vec<EntitySnapshot>,
    pub pushes: Vec<Push>,
}

/// Platforms whose vertical extent touches the camera view.
fn in_view<'a>(store: &'a EntityStore, camera: &Camera) -> impl Iterator<Item = &'a Platform> {
    let top = camera.view_top();
    let bottom = camera.view_bottom();
    store
        .platforms()
        .iter()
        .filter(move |p| p.rect().bottom() >= top && p.rect().top() <= bottom)
}

/// Highest y the player's top edge may reach: `above_view_margin` above the
/// top of the view.
pub fn ceiling(camera: &Camera, world: &WorldConfig) -> f32 {
    camera.view_top() - world.above_view_margin
}

/// True when the player's feet qualify to stand on `platform` this tick.
pub fn is_landing(player: &Player, platform: &Platform, epsilon: f32) -> bool {
    if player.powerup_active || player.velocity_y < 0.0 {
        return false;
    }
    if !player.rect().horizontal_overlap(&platform.rect()) {
        return false;
    }
    let top = platform.top();
    let bottom = player.bottom();
    let within = (bottom - top).abs() <= epsilon;
    // Swept test so a fast fall cannot skip over a thin platform in one tick.
    let crossed = player.previous_bottom() <= top && top <= bottom;
    within || crossed
}

/// Penetration depth on each side, returned as the push needed to separate.
fn min_overlap_push(player: &Rect, platform: &Rect) -> (PushAxis, f32) {
    let candidates = [
        (PushAxis::Left, player.right() - platform.left()),
        (PushAxis::Right, platform.right() - player.left()),
        (PushAxis::Up, player.bottom() - platform.top()),
        (PushAxis::Down, platform.bottom() - player.top()),
    ];
    let mut best = candidates[0];
    for candidate in &candidates[1..] {
        if candidate.1 < best.1 {
            best = *candidate;
        }
    }
    best
}

pub fn resolve_platforms(
    player: &mut Player,
    store: &mut EntityStore,
    camera: &Camera,
    config: &GameConfig,
    events: &mut EventBus,
) -> ResolveReport {
    let mut report = ResolveReport::default();
    let previous = player.current_platform.filter(|_| player.is_on_ground);
    let ceiling = ceiling(camera, &config.world);
    // Standing on a platform whose top has scrolled this high would leave
    // the player above the ceiling.
    let height = player.size.y;
    let standable = move |p: &Platform| p.top() - height >= ceiling;

    let landing = in_view(store, camera)
        .filter(|p| standable(p))
        .filter(|p| is_landing(player, p, config.player.landing_epsilon))
        .min_by(|a, b| a.top().total_cmp(&b.top()))
        .map(|p| (p.id, p.top(), p.position.x));

    match landing {
        Some((id, top, x)) => {
            player.land(id, top, x);
            report.landed_on = Some(id);
            if previous != Some(id) {
                log::trace!("landed on {id:?} at y {top:.1}");
                events.emit(GameEvent::PlatformCollision { platform: id });
            }
        }
        None => {
            if player.is_on_ground {
                player.leave_ground();
            }
        }
    }

    let mut doomed = Vec::new();
    for platform in in_view(store, camera) {
        if Some(platform.id) == report.landed_on {
            continue;
        }
        let player_rect = player.rect();
        let platform_rect = platform.rect();
        if !player_rect.overlaps(&platform_rect) {
            continue;
        }

        if player.powerup_active {
            doomed.push(EntitySnapshot::from(platform));
            continue;
        }

        let (mut axis, mut depth) = min_overlap_push(&player_rect, &platform_rect);
        if axis == PushAxis::Up && !standable(platform) {
            // Scrolled out from under the player: drop below it instead.
            axis = PushAxis::Down;
            depth = platform_rect.bottom() - player_rect.top();
        }
        match axis {
            PushAxis::Left => player.position.x -= depth,
            PushAxis::Right => player.position.x += depth,
            PushAxis::Up => player.position.y -= depth,
            PushAxis::Down => {
                player.position.y += depth;
                player.velocity_y = config.player.head_bump_velocity;
            }
        }
        report.pushes.push(Push {
            platform: platform.id,
            axis,
            depth,
        });
    }

    for snapshot in doomed {
        if store.remove_platform(snapshot.id).is_some() {
            events.emit(GameEvent::PlatformDestroyed { platform: snapshot });
            events.emit(GameEvent::ScoreAwarded {
                points: config.effects.platform_destroyed_points,
                reason: ScoreReason::PlatformDestroyed,
            });
            report.destroyed.push(snapshot);
        }
    }
    report
}

/// Keep the player inside the world horizontally and no further than
/// `above_view_margin` above the top of the view.
pub fn resolve_boundaries(player: &mut Player, camera: &Camera, world: &WorldConfig) {
    let max_x = (world.world_width - player.size.x).max(0.0);
    player.position.x = player.position.x.clamp(0.0, max_x);

    let ceiling = ceiling(camera, world);
    if player.position.y < ceiling {
        player.position.y = ceiling;
        player.velocity_y = player.velocity_y.max(0.0);
        // Dragged off a platform that scrolled past the top edge.
        if player.is_on_ground {
            player.leave_ground();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;
    use crate::entities::PlatformKind;
    use glam::Vec2;

    fn camera_at(y: f32) -> Camera {
        Camera::new(&CameraConfig {
            start_y: y,
            ..CameraConfig::default()
        })
    }

    fn store_with(platforms: &[(u64, f32, f32, f32)]) -> EntityStore {
        let mut store = EntityStore::new();
        for &(id, x, y, w) in platforms {
            store.insert_platform(Platform::new(
                EntityId(id),
                Vec2::new(x, y),
                Vec2::new(w, 20.0),
                PlatformKind::Normal,
            ));
        }
        store
    }

    fn falling_player(x: f32, bottom: f32, velocity_y: f32) -> Player {
        let mut player = Player::new(&GameConfig::default().player);
        player.position = Vec2::new(x, bottom - player.size.y);
        player.velocity_y = velocity_y;
        player
    }

    #[test]
    fn landing_snaps_feet_to_platform_top() {
        let config = GameConfig::default();
        let camera = camera_at(500.0);
        let mut store = store_with(&[(1, 100.0, 500.0, 120.0)]);
        let mut player = falling_player(120.0, 497.5, 4.0);
        let mut bus = EventBus::new();

        let report = resolve_platforms(&mut player, &mut store, &camera, &config, &mut bus);
        assert_eq!(report.landed_on, Some(EntityId(1)));
        assert_eq!(player.bottom(), 500.0);
        assert_eq!(player.velocity_y, 0.0);
        assert!(player.is_on_ground);
        assert_eq!(player.jump_count, 0);
        assert_eq!(
            bus.dispatch(),
            vec![GameEvent::PlatformCollision {
                platform: EntityId(1)
            }]
        );
    }

    #[test]
    fn rising_player_does_not_land() {
        let config = GameConfig::default();
        let camera = camera_at(500.0);
        let mut store = store_with(&[(1, 100.0, 500.0, 120.0)]);
        let mut player = falling_player(120.0, 499.0, -3.0);
        let mut bus = EventBus::new();

        let report = resolve_platforms(&mut player, &mut store, &camera, &config, &mut bus);
        assert_eq!(report.landed_on, None);
        assert!(!player.is_on_ground);
    }

    #[test]
    fn fast_fall_is_caught_by_swept_test() {
        let config = GameConfig::default();
        let camera = camera_at(500.0);
        let mut store = store_with(&[(1, 100.0, 500.0, 120.0)]);
        let mut player = falling_player(120.0, 490.0, 60.0);
        player.integrate(0.25, 40.0, 1.0, &store);
        // One tick carries the feet from 490 to 515, well past the window.
        assert_eq!(player.previous_bottom(), 490.0);
        assert_eq!(player.bottom(), 515.0);

        let mut bus = EventBus::new();
        let report = resolve_platforms(&mut player, &mut store, &camera, &config, &mut bus);
        assert_eq!(report.landed_on, Some(EntityId(1)));
        assert_eq!(player.bottom(), 500.0);
    }

    #[test]
    fn highest_qualifying_platform_wins() {
        let config = GameConfig::default();
        let camera = camera_at(500.0);
        let mut store = store_with(&[(1, 100.0, 503.0, 120.0), (2, 100.0, 498.0, 120.0)]);
        let mut player = falling_player(120.0, 500.0, 1.0);
        let mut bus = EventBus::new();

        let report = resolve_platforms(&mut player, &mut store, &camera, &config, &mut bus);
        assert_eq!(report.landed_on, Some(EntityId(2)));
        assert_eq!(player.bottom(), 498.0);
    }

    #[test]
    fn platforms_outside_view_are_ignored() {
        let config = GameConfig::default();
        let camera = camera_at(0.0);
        let mut store = store_with(&[(1, 100.0, 2_000.0, 120.0)]);
        let mut player = falling_player(120.0, 2_000.0, 2.0);
        let mut bus = EventBus::new();

        let report = resolve_platforms(&mut player, &mut store, &camera, &config, &mut bus);
        assert_eq!(report.landed_on, None);
    }

    #[test]
    fn side_overlap_pushes_horizontally() {
        let config = GameConfig::default();
        let camera = camera_at(500.0);
        // Player's right edge is 4px into the platform's left edge.
        let mut store = store_with(&[(1, 100.0, 480.0, 120.0)]);
        let mut player = falling_player(74.0, 500.0, 0.0);
        player.velocity_y = -1.0;
        let mut bus = EventBus::new();

        let report = resolve_platforms(&mut player, &mut store, &camera, &config, &mut bus);
        assert_eq!(report.pushes.len(), 1);
        assert_eq!(report.pushes[0].axis, PushAxis::Left);
        assert_eq!(player.position.x, 70.0);
    }

    #[test]
    fn head_bump_pushes_down_and_starts_fall() {
        let config = GameConfig::default();
        let camera = camera_at(500.0);
        let mut store = store_with(&[(1, 100.0, 480.0, 120.0)]);
        // Head 3px into the underside of the platform, bottom at 500.
        let mut player = falling_player(130.0, 537.0, -8.0);
        let mut bus = EventBus::new();

        let report = resolve_platforms(&mut player, &mut store, &camera, &config, &mut bus);
        assert_eq!(report.pushes[0].axis, PushAxis::Down);
        assert_eq!(player.position.y, 500.0);
        assert_eq!(player.velocity_y, config.player.head_bump_velocity);
    }

    #[test]
    fn powerup_smashes_overlapping_platforms() {
        let config = GameConfig::default();
        let camera = camera_at(500.0);
        let mut store = store_with(&[(1, 100.0, 500.0, 120.0), (2, 0.0, 300.0, 80.0)]);
        let mut player = falling_player(120.0, 510.0, 0.0);
        player.activate_powerup();
        let mut bus = EventBus::new();

        let report = resolve_platforms(&mut player, &mut store, &camera, &config, &mut bus);
        assert_eq!(report.landed_on, None);
        assert_eq!(report.destroyed.len(), 1);
        assert_eq!(report.destroyed[0].id, EntityId(1));
        assert!(store.platform(EntityId(1)).is_none());
        assert!(store.platform(EntityId(2)).is_some());

        let events = bus.dispatch();
        assert!(matches!(events[0], GameEvent::PlatformDestroyed { .. }));
        assert_eq!(
            events[1],
            GameEvent::ScoreAwarded {
                points: 10,
                reason: ScoreReason::PlatformDestroyed
            }
        );
    }

    #[test]
    fn platform_scrolled_past_ceiling_drops_the_player() {
        let config = GameConfig::default();
        let camera = camera_at(500.0);
        // Ceiling sits at 130; standing on a top at 165 would put the head at 125.
        let mut store = store_with(&[(1, 100.0, 165.0, 120.0)]);
        let mut player = falling_player(120.0, 165.0, 0.0);
        player.land(EntityId(1), 165.0, 100.0);
        player.position.y += 0.7;
        let mut bus = EventBus::new();

        let report = resolve_platforms(&mut player, &mut store, &camera, &config, &mut bus);
        assert_eq!(report.landed_on, None);
        assert!(!player.is_on_ground);
        assert_eq!(report.pushes.len(), 1);
        assert_eq!(report.pushes[0].axis, PushAxis::Down);
        assert!((player.position.y - 185.0).abs() < 1e-3);
        assert_eq!(player.velocity_y, config.player.head_bump_velocity);
        assert!(bus.dispatch().is_empty());

        resolve_boundaries(&mut player, &camera, &config.world);
        assert!((player.position.y - 185.0).abs() < 1e-3);
    }

    #[test]
    fn boundaries_clamp_horizontally_and_above_view() {
        let config = GameConfig::default();
        let camera = camera_at(1_000.0);
        let mut player = falling_player(400.0, 0.0, -5.0);

        resolve_boundaries(&mut player, &camera, &config.world);
        assert_eq!(player.position.x, 330.0);
        assert_eq!(player.position.y, 1_000.0 - 320.0 - 50.0);
        assert_eq!(player.velocity_y, 0.0);

        player.position.x = -12.0;
        resolve_boundaries(&mut player, &camera, &config.world);
        assert_eq!(player.position.x, 0.0);
    }
}
