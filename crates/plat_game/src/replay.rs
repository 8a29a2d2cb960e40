use plat_core::input::{InputState, Key};
use plat_core::time::ManualClock;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::draw::DrawCommand;
use crate::engine::{Engine, GameState};

/// Scripted play-through: held keys per frame, run at a fixed step.
#[derive(Debug, Deserialize, Clone)]
pub struct ReplaySequence {
    #[serde(default = "default_dt")]
    pub fixed_dt: f32,
    pub frames: Vec<ReplayFrame>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ReplayFrame {
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
    #[serde(default)]
    pub jump: bool,
    #[serde(default)]
    pub interact: bool,
    #[serde(default)]
    pub restart: bool,
    /// Leave play mode; the run stops after this frame.
    #[serde(default)]
    pub exit: bool,
    /// 0-based character index held down this frame.
    #[serde(default)]
    pub choose: Option<usize>,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

impl ReplayFrame {
    fn held_keys(&self) -> Vec<Key> {
        let mut keys = Vec::new();
        if self.left {
            keys.push(Key::Left);
        }
        if self.right {
            keys.push(Key::Right);
        }
        if self.jump {
            keys.push(Key::Space);
        }
        if self.interact {
            keys.push(Key::E);
        }
        if self.restart {
            keys.push(Key::R);
        }
        if self.exit {
            keys.push(Key::Escape);
        }
        if let Some(key) = self.choose.and_then(Key::digit) {
            keys.push(key);
        }
        keys
    }
}

impl ReplaySequence {
    pub fn expanded_inputs(&self) -> Vec<InputState> {
        let mut out = Vec::new();
        for frame in &self.frames {
            let input = InputState::with_held(&frame.held_keys());
            for _ in 0..frame.repeat.max(1) {
                out.push(input.clone());
            }
        }
        out
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f32(self.fixed_dt)
    }

    /// Press jump to start, walk right until something happens.
    pub fn demo() -> Self {
        Self {
            fixed_dt: default_dt(),
            frames: vec![
                ReplayFrame {
                    jump: true,
                    repeat: 1,
                    ..ReplayFrame::default()
                },
                ReplayFrame {
                    right: true,
                    repeat: 600,
                    ..ReplayFrame::default()
                },
            ],
        }
    }
}

pub fn load_replay_from_path(path: &Path) -> Result<ReplaySequence, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let replay: ReplaySequence = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse replay JSON {}: {e}", path.display()))?;
    validate_replay(&replay)?;
    Ok(replay)
}

fn validate_replay(replay: &ReplaySequence) -> Result<(), String> {
    if replay.fixed_dt <= 0.0 {
        return Err("Replay validation failed: fixed_dt must be > 0".to_string());
    }
    if replay.frames.is_empty() {
        return Err("Replay validation failed: frames list is empty".to_string());
    }
    Ok(())
}

const fn default_dt() -> f32 {
    1.0 / 60.0
}

const fn default_repeat() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayOutcome {
    pub state: GameState,
    pub score: u32,
    pub frames_run: usize,
    pub completion_time: Option<Duration>,
    pub player_position: (f32, f32),
    pub draw_commands: usize,
}

/// Drive `engine` headlessly, advancing `clock` by `frame_dt` before each tick.
/// Stops after the frame that presses exit.
pub fn run_replay(
    engine: &mut Engine,
    inputs: &[InputState],
    clock: &ManualClock,
    frame_dt: Duration,
) -> ReplayOutcome {
    let mut frames_run = 0;
    let mut draw_commands = 0;
    let mut sink: Vec<DrawCommand> = Vec::new();
    for input in inputs {
        clock.advance(frame_dt);
        sink.clear();
        engine.tick(input, &mut sink);
        draw_commands += sink.len();
        frames_run += 1;
        if engine.exit_requested() {
            break;
        }
    }
    let player = engine.player();
    ReplayOutcome {
        state: engine.state(),
        score: engine.level().score,
        frames_run,
        completion_time: engine.completion_time(),
        player_position: (player.x, player.y),
        draw_commands,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::characters::CharacterRoster;
    use crate::entity::{Entity, EntityKind};
    use crate::level::Level;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "plat_replay_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn run(level: Level, replay: &ReplaySequence) -> ReplayOutcome {
        let clock = ManualClock::new();
        let mut engine = Engine::new(
            level,
            CharacterRoster::builtin(),
            "boxy",
            Box::new(clock.clone()),
        )
        .expect("valid level");
        run_replay(
            &mut engine,
            &replay.expanded_inputs(),
            &clock,
            replay.frame_duration(),
        )
    }

    #[test]
    fn replay_file_parses_and_expands() {
        let path = temp_file_path("parse");
        fs::write(
            &path,
            r#"{
              "frames": [
                { "right": true, "repeat": 3 },
                { "jump": true, "choose": 1 }
              ]
            }"#,
        )
        .expect("write replay file");

        let replay = load_replay_from_path(&path).expect("replay should load");
        assert!((replay.fixed_dt - 1.0 / 60.0).abs() < 1e-6);
        let expanded = replay.expanded_inputs();
        assert_eq!(expanded.len(), 4);
        assert!(expanded[0].is_held(Key::Right));
        assert!(expanded[3].is_held(Key::Space));
        assert!(expanded[3].is_held(Key::Digit2));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn replay_rejects_empty_frames() {
        let path = temp_file_path("empty");
        fs::write(&path, r#"{ "frames": [] }"#).expect("write replay file");
        let err = load_replay_from_path(&path).expect_err("empty replay should fail");
        assert!(err.contains("frames list is empty"));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn bundled_replay_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("replays/first_steps.json");
        let replay = load_replay_from_path(&path).expect("bundled replay");
        assert!(replay.expanded_inputs().len() > 300);
    }

    #[test]
    fn exit_frame_ends_the_run_early() {
        let replay: ReplaySequence = serde_json::from_str(
            r#"{
              "frames": [
                { "jump": true },
                { "right": true, "repeat": 2 },
                { "exit": true },
                { "right": true, "repeat": 50 }
              ]
            }"#,
        )
        .expect("inline replay parses");
        let outcome = run(Level::default_layout(), &replay);
        assert_eq!(outcome.frames_run, 4);
        assert_eq!(outcome.state, GameState::Playing);
    }

    #[test]
    fn demo_on_default_layout_ends_in_the_spike_pit() {
        let outcome = run(Level::default_layout(), &ReplaySequence::demo());
        assert_eq!(outcome.state, GameState::Lost);
        assert!(outcome.completion_time.is_none());
        assert!(outcome.draw_commands > outcome.frames_run);
    }

    #[test]
    fn replay_run_is_deterministic() {
        let mut level = Level::default_layout();
        level.coins.push(Entity::coin(160.0, 440.0, 100));
        level
            .objects
            .push(Entity::new(EntityKind::DoubleJumpOrb, 280.0, 360.0));
        let replay: ReplaySequence = serde_json::from_str(
            r#"{
              "frames": [
                { "jump": true },
                { "right": true, "repeat": 20 },
                { "right": true, "jump": true, "repeat": 1 },
                { "right": true, "repeat": 8 },
                { "right": true, "jump": true, "repeat": 1 },
                { "right": true, "repeat": 120 },
                { "restart": true },
                { "left": true, "repeat": 30 }
              ]
            }"#,
        )
        .expect("inline replay parses");

        let a = run(level.clone(), &replay);
        let b = run(level, &replay);
        assert_eq!(a, b);
        assert_eq!(a.frames_run, replay.expanded_inputs().len());
    }
}
