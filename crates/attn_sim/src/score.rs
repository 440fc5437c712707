//! Scoring and the pluggable score-modifier mechanics.
//!
//! Both live strictly downstream of the simulation: they see the event batch
//! after each tick and never feed anything back into movement or collision.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::ModifierKind;
use crate::entities::{CollectibleKind, EntityKindTag, ObstacleKind};
use crate::events::{EventListener, GameEvent};

const LEVEL_UP_POINTS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBonus {
    pub multiplier: f32,
    pub reason: &'static str,
}

impl ScoreBonus {
    pub const NONE: ScoreBonus = ScoreBonus {
        multiplier: 1.0,
        reason: "",
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Neutral,
    Orderly,
    Chaotic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "system", rename_all = "snake_case")]
pub enum ModifierStats {
    Noticeability {
        level: f32,
        notice_mode: bool,
        intensity: f32,
        combo: u32,
        total_notifications: u32,
    },
    Alignment {
        alignment: Alignment,
        strength: f32,
        streak: u32,
        orderly: f32,
        chaotic: f32,
    },
}

/// A score-modifier mechanic. Implementations react to pickups and hazards
/// and expose a multiplier for subsequent awards.
pub trait ScoreModifierSystem {
    fn update(&mut self, dt: f32);
    fn on_collect(&mut self, kind: CollectibleKind);
    fn on_hazard(&mut self, kind: ObstacleKind, powerup_active: bool);
    fn score_bonus(&self) -> ScoreBonus;
    fn stats(&self) -> ModifierStats;
    fn reset(&mut self);
}

pub fn create_modifier(kind: ModifierKind) -> Option<Box<dyn ScoreModifierSystem>> {
    match kind {
        ModifierKind::None => None,
        ModifierKind::Noticeability => Some(Box::new(NoticeabilitySystem::new())),
        ModifierKind::Alignment => Some(Box::new(AlignmentSystem::new())),
    }
}

#[derive(Debug, Clone, Default)]
pub struct NoticeabilitySystem {
    level: f32,
    target: f32,
    notice_remaining: f32,
    intensity: f32,
    combo: u32,
    since_last_notification: f32,
    total_notifications: u32,
}

impl NoticeabilitySystem {
    const MAX_LEVEL: f32 = 100.0;
    const DECAY_PER_SECOND: f32 = 0.1;
    /// Fraction of the remaining distance closed per reference frame.
    const SMOOTHING_PER_FRAME: f32 = 0.05;
    const SNAP_DISTANCE: f32 = 0.1;
    const COMBO_WINDOW: f32 = 5.0;
    const BASE_NOTICE_DURATION: f32 = 5.0;
    const NOTIFICATION_GAIN: f32 = 15.0;
    const POWERED_HAZARD_GAIN: f32 = 10.0;
    const FOCUS_PENALTY: f32 = 15.0;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn is_notice_mode(&self) -> bool {
        self.notice_remaining > 0.0
    }

    pub fn intensity(&self) -> f32 {
        if self.is_notice_mode() {
            self.intensity
        } else {
            0.0
        }
    }

    pub fn notice_duration(&self) -> f32 {
        Self::BASE_NOTICE_DURATION * (1.0 - self.level / (2.0 * Self::MAX_LEVEL))
    }

    /// Raise the target level; the combo bonus counts notifications picked up
    /// within the combo window of each other.
    pub fn increase(&mut self, amount: f32, activate: bool) -> f32 {
        let bonus = amount * (1.0 + 0.2 * self.combo as f32);
        self.target = (self.level + bonus).min(Self::MAX_LEVEL);
        if activate {
            self.total_notifications += 1;
            self.combo += 1;
            self.since_last_notification = 0.0;
            self.activate_notice_mode();
        }
        bonus
    }

    pub fn decrease(&mut self, amount: f32) {
        self.target = (self.level - amount).max(0.0);
        self.combo = 0;
    }

    fn activate_notice_mode(&mut self) {
        self.intensity = (self.target / 50.0).min(1.0);
        self.notice_remaining = self.notice_duration();
    }
}

impl ScoreModifierSystem for NoticeabilitySystem {
    fn update(&mut self, dt: f32) {
        let diff = self.target - self.level;
        if diff.abs() < Self::SNAP_DISTANCE {
            self.level = self.target;
        } else {
            let step = (Self::SMOOTHING_PER_FRAME * dt * 60.0).min(1.0);
            self.level += diff * step;
        }

        if self.is_notice_mode() {
            self.notice_remaining = (self.notice_remaining - dt).max(0.0);
        } else if self.level > 0.0 {
            self.target = (self.level - Self::DECAY_PER_SECOND * dt).max(0.0);
        }

        if self.combo > 0 {
            self.since_last_notification += dt;
            if self.since_last_notification > Self::COMBO_WINDOW {
                self.combo = 0;
            }
        }
    }

    fn on_collect(&mut self, kind: CollectibleKind) {
        if kind == CollectibleKind::Notification {
            self.increase(Self::NOTIFICATION_GAIN, true);
        }
    }

    fn on_hazard(&mut self, kind: ObstacleKind, powerup_active: bool) {
        match (kind, powerup_active) {
            (ObstacleKind::AdBlock | ObstacleKind::FocusZone, true) => {
                self.increase(Self::POWERED_HAZARD_GAIN, false);
            }
            (ObstacleKind::FocusZone, false) => self.decrease(Self::FOCUS_PENALTY),
            _ => {}
        }
    }

    fn score_bonus(&self) -> ScoreBonus {
        if self.is_notice_mode() {
            ScoreBonus {
                multiplier: 1.0 + self.intensity(),
                reason: "noticed",
            }
        } else {
            ScoreBonus::NONE
        }
    }

    fn stats(&self) -> ModifierStats {
        ModifierStats::Noticeability {
            level: self.level,
            notice_mode: self.is_notice_mode(),
            intensity: self.intensity(),
            combo: self.combo,
            total_notifications: self.total_notifications,
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone)]
pub struct AlignmentSystem {
    alignment: Alignment,
    strength: f32,
    streak: u32,
    history: VecDeque<Alignment>,
    orderly_score: f32,
    chaotic_score: f32,
}

impl Default for AlignmentSystem {
    fn default() -> Self {
        Self {
            alignment: Alignment::Neutral,
            strength: 0.0,
            streak: 0,
            history: VecDeque::with_capacity(Self::HISTORY_LEN),
            orderly_score: 0.0,
            chaotic_score: 0.0,
        }
    }
}

impl AlignmentSystem {
    const HISTORY_LEN: usize = 10;
    const MAX_STRENGTH: f32 = 100.0;
    const NEUTRAL_DRAIN: f32 = 5.0;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn history(&self) -> impl Iterator<Item = &Alignment> {
        self.history.iter()
    }

    /// Record an orderly or chaotic action. Repeating the current side grows
    /// the streak; switching sides restarts it.
    pub fn record(&mut self, side: Alignment, points: f32) {
        if side == Alignment::Neutral {
            self.record_neutral();
            return;
        }
        if self.alignment == side {
            self.streak += 1;
        } else {
            self.streak = 0;
        }
        self.strength = (self.strength + points).min(Self::MAX_STRENGTH);
        self.alignment = side;
        self.push_history(side);

        let earned = points * (1.0 + 0.1 * self.streak as f32);
        match side {
            Alignment::Orderly => self.orderly_score += earned,
            Alignment::Chaotic => self.chaotic_score += earned,
            Alignment::Neutral => {}
        }
    }

    pub fn record_neutral(&mut self) {
        self.strength = (self.strength - Self::NEUTRAL_DRAIN).max(0.0);
        if self.strength == 0.0 {
            self.alignment = Alignment::Neutral;
            self.streak = 0;
        }
        self.push_history(Alignment::Neutral);
    }

    fn push_history(&mut self, side: Alignment) {
        if self.history.len() >= Self::HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(side);
    }
}

impl ScoreModifierSystem for AlignmentSystem {
    fn update(&mut self, _dt: f32) {}

    fn on_collect(&mut self, kind: CollectibleKind) {
        match kind {
            CollectibleKind::Powerup => self.record(Alignment::Orderly, 10.0),
            CollectibleKind::Notification => self.record(Alignment::Chaotic, 10.0),
        }
    }

    fn on_hazard(&mut self, kind: ObstacleKind, powerup_active: bool) {
        match (kind, powerup_active) {
            (ObstacleKind::AdBlock | ObstacleKind::FocusZone, true) => {
                self.record(Alignment::Chaotic, 5.0)
            }
            (ObstacleKind::FocusZone, false) => self.record(Alignment::Orderly, 5.0),
            _ => {}
        }
    }

    fn score_bonus(&self) -> ScoreBonus {
        if self.streak >= 3 {
            ScoreBonus {
                multiplier: 1.0 + 0.2 * self.streak as f32,
                reason: "streak",
            }
        } else {
            ScoreBonus::NONE
        }
    }

    fn stats(&self) -> ModifierStats {
        ModifierStats::Alignment {
            alignment: self.alignment,
            strength: self.strength,
            streak: self.streak,
            orderly: self.orderly_score,
            chaotic: self.chaotic_score,
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Running score, fed from the event batch at the end of every tick.
pub struct ScoreManager {
    score: u64,
    bonus_points: u64,
    level: u32,
    modifier: Option<Box<dyn ScoreModifierSystem>>,
}

impl ScoreManager {
    pub fn new(modifier: Option<Box<dyn ScoreModifierSystem>>) -> Self {
        Self {
            score: 0,
            bonus_points: 0,
            level: 1,
            modifier,
        }
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn bonus_points(&self) -> u64 {
        self.bonus_points
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn modifier_stats(&self) -> Option<ModifierStats> {
        self.modifier.as_ref().map(|m| m.stats())
    }

    pub fn update_modifier(&mut self, dt: f32) {
        if let Some(modifier) = self.modifier.as_mut() {
            modifier.update(dt);
        }
    }

    /// Add `points` scaled by the active modifier's bonus. The extra part is
    /// floored. Returns what was actually added.
    pub fn add_score(&mut self, points: u32) -> u64 {
        let bonus = self
            .modifier
            .as_ref()
            .map_or(ScoreBonus::NONE, |m| m.score_bonus());
        let mut total = u64::from(points);
        if bonus.multiplier > 1.0 {
            let extra = (points as f32 * (bonus.multiplier - 1.0)).floor() as u64;
            if extra > 0 {
                log::trace!("{extra} bonus points ({})", bonus.reason);
            }
            self.bonus_points += extra;
            total += extra;
        }
        self.score += total;
        total
    }

    pub fn reset(&mut self) {
        self.score = 0;
        self.bonus_points = 0;
        self.level = 1;
        if let Some(modifier) = self.modifier.as_mut() {
            modifier.reset();
        }
    }
}

impl EventListener for ScoreManager {
    fn on_event(&mut self, event: &GameEvent) {
        match event {
            GameEvent::CollectibleCollected { entity } => {
                let kind = match entity.kind {
                    EntityKindTag::Powerup => Some(CollectibleKind::Powerup),
                    EntityKindTag::Notification => Some(CollectibleKind::Notification),
                    _ => None,
                };
                if let (Some(kind), Some(modifier)) = (kind, self.modifier.as_mut()) {
                    modifier.on_collect(kind);
                }
            }
            GameEvent::ObstacleHit { entity, powered } => {
                let kind = match entity.kind {
                    EntityKindTag::AdBlock => Some(ObstacleKind::AdBlock),
                    EntityKindTag::FocusZone => Some(ObstacleKind::FocusZone),
                    EntityKindTag::Battery => Some(ObstacleKind::Battery),
                    _ => None,
                };
                if let (Some(kind), Some(modifier)) = (kind, self.modifier.as_mut()) {
                    modifier.on_hazard(kind, *powered);
                }
            }
            GameEvent::LevelUp { level } if *level > self.level => {
                self.level = *level;
                self.add_score(LEVEL_UP_POINTS);
            }
            GameEvent::ScoreAwarded { points, .. } => {
                self.add_score(*points);
            }
            _ => {}
        }
    }
}

impl std::fmt::Debug for ScoreManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoreManager")
            .field("score", &self.score)
            .field("level", &self.level)
            .field("modifier", &self.modifier_stats())
            .finish()
    }
}
