//! Headless play-test runner.
//!
//! Loads a level (or the built-in starter layout), refuses to start if it is
//! invalid, then drives the engine with a scripted replay and logs the result.
//! By default time is simulated at the replay's fixed step; `--realtime` paces
//! the same script against the wall clock through a fixed-step `FrameTimer`.

use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use plat_core::time::{FrameTimer, ManualClock, SystemClock};
use plat_game::characters::{load_roster_from_path, CharacterRoster};
use plat_game::draw::DrawCommand;
use plat_game::engine::Engine;
use plat_game::level::Level;
use plat_game::replay::{load_replay_from_path, run_replay, ReplayOutcome, ReplaySequence};
use plat_game::snapshot::load_level_from_path;

struct Args {
    level: Option<PathBuf>,
    replay: Option<PathBuf>,
    roster: Option<PathBuf>,
    character: String,
    realtime: bool,
}

fn usage() -> String {
    "Usage: cargo run -p plat_game -- [level.json] [--replay <replay.json>] [--character <id>] [--roster <roster.json>] [--realtime]\nExample: cargo run -p plat_game -- crates/plat_game/levels/first_steps.json --character isquio".to_string()
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        level: None,
        replay: None,
        roster: None,
        character: "boxy".to_string(),
        realtime: false,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--replay" => args.replay = Some(PathBuf::from(iter.next().ok_or_else(usage)?)),
            "--roster" => args.roster = Some(PathBuf::from(iter.next().ok_or_else(usage)?)),
            "--character" => args.character = iter.next().ok_or_else(usage)?,
            "--realtime" => args.realtime = true,
            "-h" | "--help" => return Err(usage()),
            flag if flag.starts_with("--") => {
                return Err(format!("Unknown option '{flag}'\n{}", usage()))
            }
            path if args.level.is_none() => args.level = Some(PathBuf::from(path)),
            extra => return Err(format!("Unexpected argument '{extra}'\n{}", usage())),
        }
    }
    Ok(args)
}

fn run_realtime(
    level: Level,
    roster: CharacterRoster,
    character: &str,
    replay: &ReplaySequence,
) -> Result<ReplayOutcome, String> {
    let clock = Rc::new(SystemClock::new());
    let mut engine = Engine::new(level, roster, character, Box::new(Rc::clone(&clock)))?;
    let inputs = replay.expanded_inputs();
    let mut timer = FrameTimer::new();
    timer.fixed_dt = replay.fixed_dt as f64;

    let mut next = 0;
    let mut draw_commands = 0;
    let mut sink: Vec<DrawCommand> = Vec::new();
    while next < inputs.len() && !engine.exit_requested() {
        timer.begin_frame(clock.as_ref());
        while timer.should_step() && next < inputs.len() {
            sink.clear();
            engine.tick(&inputs[next], &mut sink);
            draw_commands += sink.len();
            next += 1;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    log::debug!(
        "Realtime run: {} frames, {:.1} fps smoothed",
        timer.frame_count,
        timer.smoothed_fps
    );

    let player = engine.player();
    Ok(ReplayOutcome {
        state: engine.state(),
        score: engine.level().score,
        frames_run: next,
        completion_time: engine.completion_time(),
        player_position: (player.x, player.y),
        draw_commands,
    })
}

fn main() -> Result<(), String> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = parse_args()?;

    let level = match &args.level {
        Some(path) => load_level_from_path(path)?,
        None => {
            log::info!("No level given, using the starter layout");
            Level::default_layout()
        }
    };
    let report = level.validate();
    if !report.valid {
        for error in &report.errors {
            log::error!("Level invalid: {error}");
        }
        return report.into_result();
    }

    let roster = match &args.roster {
        Some(path) => load_roster_from_path(path)?,
        None => CharacterRoster::builtin(),
    };
    let replay = match &args.replay {
        Some(path) => load_replay_from_path(path)?,
        None => ReplaySequence::demo(),
    };

    let outcome = if args.realtime {
        run_realtime(level, roster, &args.character, &replay)?
    } else {
        let clock = ManualClock::new();
        let mut engine = Engine::new(level, roster, &args.character, Box::new(clock.clone()))?;
        run_replay(
            &mut engine,
            &replay.expanded_inputs(),
            &clock,
            replay.frame_duration(),
        )
    };

    log::info!(
        "Replay finished after {} frames: {:?}, score {}, player at ({:.1}, {:.1})",
        outcome.frames_run,
        outcome.state,
        outcome.score,
        outcome.player_position.0,
        outcome.player_position.1
    );
    if let Some(time) = outcome.completion_time {
        log::info!("Completion time {:.2}s", time.as_secs_f32());
    }
    Ok(())
}
