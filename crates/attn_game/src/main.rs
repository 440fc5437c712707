//! Headless runner: drives one session with a fixed-step clock and prints a
//! JSON summary when it ends.

mod autopilot;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use attn_core::{InputIntent, TimeState};
use attn_sim::{
    load_config_from_path, load_replay_from_path, state_digest, GameConfig, GameEvent,
    GameSession, ReplaySequence, SessionState,
};
use clap::Parser;

use autopilot::Autopilot;

#[derive(Debug, Parser)]
#[command(name = "attn_game")]
#[command(about = "Run the Attention Game simulation headlessly")]
struct Cli {
    /// Game config JSON; defaults are used for anything it leaves out
    #[arg(long)]
    config: Option<PathBuf>,
    /// Replay JSON to feed as input instead of idling
    #[arg(long)]
    replay: Option<PathBuf>,
    /// World generation seed (a replay's own seed wins)
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Steer with the built-in autopilot
    #[arg(long, conflicts_with = "replay")]
    autopilot: bool,
    /// Stop after this much simulated time
    #[arg(long, default_value_t = 120.0)]
    max_seconds: f64,
    /// Run twice and fail if the final state digests differ
    #[arg(long)]
    verify: bool,
}

enum InputSource {
    Idle,
    Replay { inputs: Vec<InputIntent>, cursor: usize },
    Autopilot(Autopilot),
}

impl InputSource {
    /// `None` once a replay has run out of frames.
    fn next(&mut self, session: &GameSession) -> Option<InputIntent> {
        match self {
            InputSource::Idle => Some(InputIntent::IDLE),
            InputSource::Replay { inputs, cursor } => {
                let intent = inputs.get(*cursor).copied();
                *cursor += 1;
                intent
            }
            InputSource::Autopilot(pilot) => Some(pilot.next_intent(session)),
        }
    }
}

struct RunSetup {
    config: GameConfig,
    seed: u64,
    fixed_dt: f64,
    replay: Option<ReplaySequence>,
    autopilot: bool,
    max_seconds: f64,
}

impl RunSetup {
    fn input_source(&self) -> InputSource {
        match &self.replay {
            Some(replay) => InputSource::Replay {
                inputs: replay.expanded_inputs(),
                cursor: 0,
            },
            None if self.autopilot => InputSource::Autopilot(Autopilot::new()),
            None => InputSource::Idle,
        }
    }
}

fn run(setup: &RunSetup) -> Result<GameSession> {
    let mut session =
        GameSession::new(setup.config.clone(), setup.seed).context("Invalid game config")?;
    let mut input = setup.input_source();
    let mut time = TimeState::with_fixed_dt(setup.fixed_dt);
    let frame_ms = setup.fixed_dt * 1000.0;
    let mut timestamp_ms = 0.0;

    'frames: loop {
        time.begin_frame(timestamp_ms);
        while time.should_step() {
            let Some(intent) = input.next(&session) else {
                log::info!("Replay exhausted after {} ticks", session.tick_count());
                break 'frames;
            };
            let outcome = session.tick(setup.fixed_dt as f32, intent);
            for event in &outcome.events {
                if let GameEvent::LevelUp { level } = event {
                    log::info!(
                        "Level {level} reached at {:.1}s (score {})",
                        session.time(),
                        session.score().score()
                    );
                }
            }
            if let SessionState::GameOver(reason) = outcome.state {
                log::info!("Game over: {reason}");
                break 'frames;
            }
            if session.time() >= setup.max_seconds {
                log::info!("Reached the {:.0}s limit", setup.max_seconds);
                break 'frames;
            }
        }
        time.end_frame();
        timestamp_ms += frame_ms;
    }
    Ok(session)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config_from_path(path)
            .map_err(|err| {
                log::error!("{err}");
                err
            })
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => GameConfig::default(),
    };
    let replay = match &cli.replay {
        Some(path) => Some(
            load_replay_from_path(path)
                .map_err(|err| {
                    log::error!("{err}");
                    err
                })
                .with_context(|| format!("Failed to load replay {}", path.display()))?,
        ),
        None => None,
    };

    if !(cli.max_seconds.is_finite() && cli.max_seconds > 0.0) {
        bail!("--max-seconds must be a positive number, got {}", cli.max_seconds);
    }

    let seed = match replay.as_ref().and_then(|r| r.seed) {
        Some(pinned) => {
            if pinned != cli.seed {
                log::info!("Using seed {pinned} pinned by the replay");
            }
            pinned
        }
        None => cli.seed,
    };
    let fixed_dt = replay
        .as_ref()
        .map_or(1.0 / 60.0, |r| f64::from(r.fixed_dt));

    let setup = RunSetup {
        config,
        seed,
        fixed_dt,
        replay,
        autopilot: cli.autopilot,
        max_seconds: cli.max_seconds,
    };

    log::info!(
        "Attention Game starting: seed {seed}, modifier {:?}, {}",
        setup.config.modifier,
        match (&setup.replay, setup.autopilot) {
            (Some(_), _) => "replay input",
            (None, true) => "autopilot input",
            (None, false) => "idle input",
        }
    );

    let session = run(&setup)?;
    let digest = state_digest(&session.snapshot());
    log::info!("Final state digest {digest}");

    if cli.verify {
        let second = run(&setup)?;
        let second_digest = state_digest(&second.snapshot());
        if second_digest != digest {
            bail!("Determinism check failed: {digest} != {second_digest}");
        }
        log::info!("Determinism check passed");
    }

    let summary = serde_json::to_string_pretty(&session.summary())
        .context("Failed to serialize session summary")?;
    println!("{summary}");
    Ok(())
}
