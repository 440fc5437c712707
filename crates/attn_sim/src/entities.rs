use std::f32::consts::TAU;

use glam::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            x: position.x,
            y: position.y,
            w: size.x,
            h: size.y,
        }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Strict overlap: boxes that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }

    pub fn horizontal_overlap(&self, other: &Rect) -> bool {
        self.left() < other.right() && self.right() > other.left()
    }
}

fn assert_bounds(position: Vec2, size: Vec2) {
    assert!(
        position.is_finite() && size.is_finite() && size.x > 0.0 && size.y > 0.0,
        "malformed entity bounds: position {position:?} size {size:?}"
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PlatformKind {
    Normal,
    /// Eased horizontal oscillation between `anchor_x` and
    /// `anchor_x + amplitude`, one full back-and-forth every `period` seconds.
    Moving {
        amplitude: f32,
        period: f32,
        phase: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Platform {
    pub id: EntityId,
    pub anchor_x: f32,
    pub position: Vec2,
    pub size: Vec2,
    pub kind: PlatformKind,
}

impl Platform {
    pub fn new(id: EntityId, position: Vec2, size: Vec2, kind: PlatformKind) -> Self {
        assert_bounds(position, size);
        if let PlatformKind::Moving {
            amplitude, period, ..
        } = kind
        {
            assert!(
                amplitude.is_finite() && amplitude >= 0.0 && period.is_finite() && period > 0.0,
                "malformed moving platform: amplitude {amplitude} period {period}"
            );
        }
        Self {
            id,
            anchor_x: position.x,
            position,
            size,
            kind,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.position, self.size)
    }

    pub fn top(&self) -> f32 {
        self.position.y
    }

    pub fn is_moving(&self) -> bool {
        matches!(self.kind, PlatformKind::Moving { .. })
    }

    /// Horizontal extent the platform can sweep, including its oscillation.
    pub fn travel(&self) -> f32 {
        match self.kind {
            PlatformKind::Normal => 0.0,
            PlatformKind::Moving { amplitude, .. } => amplitude,
        }
    }

    pub fn x_at(&self, time: f32) -> f32 {
        match self.kind {
            PlatformKind::Normal => self.anchor_x,
            PlatformKind::Moving {
                amplitude,
                period,
                phase,
            } => {
                let cycle = TAU * time / period + phase;
                self.anchor_x + amplitude * (1.0 - cycle.cos()) * 0.5
            }
        }
    }

    pub fn update_motion(&mut self, time: f32) {
        self.position.x = self.x_at(time);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectibleKind {
    Powerup,
    Notification,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Collectible {
    pub id: EntityId,
    pub position: Vec2,
    pub size: Vec2,
    pub kind: CollectibleKind,
}

impl Collectible {
    pub fn new(id: EntityId, position: Vec2, size: Vec2, kind: CollectibleKind) -> Self {
        assert_bounds(position, size);
        Self {
            id,
            position,
            size,
            kind,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.position, self.size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleKind {
    AdBlock,
    FocusZone,
    Battery,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub id: EntityId,
    pub position: Vec2,
    pub size: Vec2,
    pub kind: ObstacleKind,
}

impl Obstacle {
    pub fn new(id: EntityId, position: Vec2, size: Vec2, kind: ObstacleKind) -> Self {
        assert_bounds(position, size);
        Self {
            id,
            position,
            size,
            kind,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.position, self.size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKindTag {
    Platform,
    MovingPlatform,
    Powerup,
    Notification,
    AdBlock,
    FocusZone,
    Battery,
}

impl From<CollectibleKind> for EntityKindTag {
    fn from(kind: CollectibleKind) -> Self {
        match kind {
            CollectibleKind::Powerup => EntityKindTag::Powerup,
            CollectibleKind::Notification => EntityKindTag::Notification,
        }
    }
}

impl From<ObstacleKind> for EntityKindTag {
    fn from(kind: ObstacleKind) -> Self {
        match kind {
            ObstacleKind::AdBlock => EntityKindTag::AdBlock,
            ObstacleKind::FocusZone => EntityKindTag::FocusZone,
            ObstacleKind::Battery => EntityKindTag::Battery,
        }
    }
}

/// What a renderer needs to draw one entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: EntityKindTag,
    pub position: Vec2,
    pub size: Vec2,
}

impl From<&Platform> for EntitySnapshot {
    fn from(platform: &Platform) -> Self {
        Self {
            id: platform.id,
            kind: if platform.is_moving() {
                EntityKindTag::MovingPlatform
            } else {
                EntityKindTag::Platform
            },
            position: platform.position,
            size: platform.size,
        }
    }
}

impl From<&Collectible> for EntitySnapshot {
    fn from(collectible: &Collectible) -> Self {
        Self {
            id: collectible.id,
            kind: collectible.kind.into(),
            position: collectible.position,
            size: collectible.size,
        }
    }
}

impl From<&Obstacle> for EntitySnapshot {
    fn from(obstacle: &Obstacle) -> Self {
        Self {
            id: obstacle.id,
            kind: obstacle.kind.into(),
            position: obstacle.position,
            size: obstacle.size,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    platforms: Vec<Platform>,
    collectibles: Vec<Collectible>,
    obstacles: Vec<Obstacle>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.platforms.clear();
        self.collectibles.clear();
        self.obstacles.clear();
    }

    pub fn insert_platform(&mut self, platform: Platform) {
        self.platforms.push(platform);
    }

    pub fn insert_collectible(&mut self, collectible: Collectible) {
        self.collectibles.push(collectible);
    }

    pub fn insert_obstacle(&mut self, obstacle: Obstacle) {
        self.obstacles.push(obstacle);
    }

    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }

    pub fn platforms_mut(&mut self) -> &mut [Platform] {
        &mut self.platforms
    }

    pub fn collectibles(&self) -> &[Collectible] {
        &self.collectibles
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn platform(&self, id: EntityId) -> Option<&Platform> {
        self.platforms.iter().find(|p| p.id == id)
    }

    pub fn platform_mut(&mut self, id: EntityId) -> Option<&mut Platform> {
        self.platforms.iter_mut().find(|p| p.id == id)
    }

    pub fn remove_platform(&mut self, id: EntityId) -> Option<Platform> {
        let index = self.platforms.iter().position(|p| p.id == id)?;
        Some(self.platforms.remove(index))
    }

    pub fn remove_collectible(&mut self, id: EntityId) -> Option<Collectible> {
        let index = self.collectibles.iter().position(|c| c.id == id)?;
        Some(self.collectibles.remove(index))
    }

    pub fn remove_obstacle(&mut self, id: EntityId) -> Option<Obstacle> {
        let index = self.obstacles.iter().position(|o| o.id == id)?;
        Some(self.obstacles.remove(index))
    }

    /// Drop every entity whose bounds match `predicate`; returns how many went.
    pub fn remove_where(&mut self, mut predicate: impl FnMut(&Rect) -> bool) -> usize {
        let before = self.len();
        self.platforms.retain(|p| !predicate(&p.rect()));
        self.collectibles.retain(|c| !predicate(&c.rect()));
        self.obstacles.retain(|o| !predicate(&o.rect()));
        before - self.len()
    }

    pub fn remove_obstacles_where(&mut self, mut predicate: impl FnMut(&Rect) -> bool) -> usize {
        let before = self.obstacles.len();
        self.obstacles.retain(|o| !predicate(&o.rect()));
        before - self.obstacles.len()
    }

    pub fn platform_count(&self) -> usize {
        self.platforms.len()
    }

    pub fn collectible_count(&self) -> usize {
        self.collectibles.len()
    }

    pub fn obstacle_count(&self) -> usize {
        self.obstacles.len()
    }

    pub fn len(&self) -> usize {
        self.platforms.len() + self.collectibles.len() + self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshots(&self) -> Vec<EntitySnapshot> {
        self.platforms
            .iter()
            .map(EntitySnapshot::from)
            .chain(self.collectibles.iter().map(EntitySnapshot::from))
            .chain(self.obstacles.iter().map(EntitySnapshot::from))
            .collect()
    }
}
