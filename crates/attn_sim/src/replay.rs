use std::fs;
use std::path::Path;

use attn_core::InputIntent;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::config::GameConfig;
use crate::error::{ConfigError, LoadError};
use crate::session::{GameSession, SessionSnapshot, SessionSummary};

#[derive(Debug, Deserialize, Clone)]
pub struct ReplaySequence {
    #[serde(default = "default_dt")]
    pub fixed_dt: f32,
    /// Seed the replay was recorded with, if it pins one.
    #[serde(default)]
    pub seed: Option<u64>,
    pub frames: Vec<ReplayFrame>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplayFrame {
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
    #[serde(default)]
    pub up: bool,
    #[serde(default)]
    pub down: bool,
    #[serde(default)]
    pub action: bool,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

impl ReplayFrame {
    pub fn intent(&self) -> InputIntent {
        InputIntent {
            left: self.left,
            right: self.right,
            up: self.up,
            down: self.down,
            action: self.action,
        }
    }
}

impl ReplaySequence {
    pub fn expanded_inputs(&self) -> Vec<InputIntent> {
        let mut out = Vec::new();
        for frame in &self.frames {
            let intent = frame.intent();
            for _ in 0..frame.repeat.max(1) {
                out.push(intent);
            }
        }
        out
    }

    pub fn duration(&self) -> f64 {
        let ticks: u64 = self.frames.iter().map(|f| u64::from(f.repeat.max(1))).sum();
        ticks as f64 * f64::from(self.fixed_dt)
    }
}

pub fn load_replay_from_path(path: &Path) -> Result<ReplaySequence, LoadError> {
    let raw = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let replay: ReplaySequence = serde_json::from_str(&raw).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    validate_replay(&replay).map_err(|reason| LoadError::Invalid {
        path: path.to_path_buf(),
        reason,
    })?;
    Ok(replay)
}

fn validate_replay(replay: &ReplaySequence) -> Result<(), String> {
    if !replay.fixed_dt.is_finite() || replay.fixed_dt <= 0.0 {
        return Err("fixed_dt must be > 0".to_string());
    }
    if replay.frames.is_empty() {
        return Err("frames list is empty".to_string());
    }
    Ok(())
}

/// Play every frame into a fresh session and hand the session back. Stops
/// early once the session is over.
pub fn replay_session(
    config: GameConfig,
    seed: u64,
    replay: &ReplaySequence,
) -> Result<GameSession, ConfigError> {
    let mut session = GameSession::new(config, seed)?;
    for intent in replay.expanded_inputs() {
        if session.tick(replay.fixed_dt, intent).state.is_over() {
            break;
        }
    }
    log::debug!(
        "replay finished after {} ticks in state {:?}",
        session.tick_count(),
        session.state()
    );
    Ok(session)
}

pub fn run_replay(
    config: GameConfig,
    seed: u64,
    replay: &ReplaySequence,
) -> Result<SessionSummary, ConfigError> {
    Ok(replay_session(config, seed, replay)?.summary())
}

/// SHA-256 of the snapshot's JSON form, as lowercase hex.
pub fn state_digest(snapshot: &SessionSnapshot) -> String {
    // Plain data never fails to serialize; fall back to the debug form anyway.
    let bytes = serde_json::to_vec(snapshot)
        .unwrap_or_else(|_| format!("{snapshot:?}").into_bytes());
    let digest = Sha256::digest(&bytes);
    format!("{digest:x}")
}

const fn default_dt() -> f32 {
    1.0 / 60.0
}

const fn default_repeat() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "attn_replay_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn write_replay(name_hint: &str, body: &str) -> PathBuf {
        let path = temp_file_path(name_hint);
        fs::write(&path, body).expect("write replay file");
        path
    }

    #[test]
    fn replay_file_parses_and_expands() {
        let path = write_replay(
            "parse",
            r#"{
              "seed": 42,
              "frames": [
                { "right": true, "repeat": 3 },
                { "up": true },
                { "repeat": 0 }
              ]
            }"#,
        );

        let replay = load_replay_from_path(&path).expect("replay should load");
        assert_eq!(replay.seed, Some(42));
        assert!((replay.fixed_dt - 1.0 / 60.0).abs() < 1e-9);

        let expanded = replay.expanded_inputs();
        assert_eq!(expanded.len(), 5);
        assert!(expanded[0].right && !expanded[0].left);
        assert!(expanded[3].wants_jump());
        assert_eq!(expanded[4], InputIntent::IDLE);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn replay_validation_rejects_bad_files() {
        let empty = write_replay("empty", r#"{ "frames": [] }"#);
        assert!(matches!(
            load_replay_from_path(&empty),
            Err(LoadError::Invalid { .. })
        ));

        let bad_dt = write_replay("bad_dt", r#"{ "fixed_dt": 0.0, "frames": [{}] }"#);
        assert!(matches!(
            load_replay_from_path(&bad_dt),
            Err(LoadError::Invalid { .. })
        ));

        let garbage = write_replay("garbage", "not json");
        assert!(matches!(
            load_replay_from_path(&garbage),
            Err(LoadError::Parse { .. })
        ));

        let missing = temp_file_path("missing");
        assert!(matches!(
            load_replay_from_path(&missing),
            Err(LoadError::Io { .. })
        ));

        for path in [empty, bad_dt, garbage] {
            let _ = fs::remove_file(path);
        }
    }

    #[test]
    fn replay_run_is_deterministic() {
        let path = write_replay(
            "deterministic",
            r#"{
              "fixed_dt": 0.016666667,
              "frames": [
                { "right": true, "repeat": 60 },
                { "right": true, "up": true, "repeat": 1 },
                { "right": true, "repeat": 120 },
                { "left": true, "repeat": 45 },
                { "repeat": 120 }
              ]
            }"#,
        );
        let replay = load_replay_from_path(&path).expect("replay should load");

        let run_a = replay_session(GameConfig::default(), 7, &replay).expect("valid config");
        let run_b = replay_session(GameConfig::default(), 7, &replay).expect("valid config");
        assert_eq!(run_a.snapshot(), run_b.snapshot());
        assert_eq!(
            state_digest(&run_a.snapshot()),
            state_digest(&run_b.snapshot())
        );
        assert_eq!(run_a.summary(), run_b.summary());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn digest_changes_with_state() {
        let replay = ReplaySequence {
            fixed_dt: 1.0 / 60.0,
            seed: None,
            frames: vec![ReplayFrame {
                left: false,
                right: false,
                up: false,
                down: false,
                action: false,
                repeat: 30,
            }],
        };
        let session = replay_session(GameConfig::default(), 1, &replay).expect("valid config");
        let fresh = GameSession::new(GameConfig::default(), 1).expect("valid config");

        let digest = state_digest(&session.snapshot());
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(digest, state_digest(&fresh.snapshot()));
    }

    #[test]
    fn summary_matches_session_length() {
        let replay = ReplaySequence {
            fixed_dt: 0.02,
            seed: None,
            frames: vec![ReplayFrame {
                left: false,
                right: false,
                up: false,
                down: false,
                action: false,
                repeat: 50,
            }],
        };
        assert!((replay.duration() - 1.0).abs() < 1e-6);
        let summary = run_replay(GameConfig::default(), 5, &replay).expect("valid config");
        assert_eq!(summary.ticks, 50);
        assert_eq!(summary.state, SessionState::Running);
        assert!((summary.simulated_seconds - 1.0).abs() < 1e-5);
    }
}
