//! End-to-end sessions over the JSON-lines protocol.

use std::io::Cursor;

use orbit_core::difficulty::Difficulty;
use orbit_core::persistence::ProgressStore;
use orbit_core::progression::PlayerData;
use orbit_core::replay::{Replay, ReplayPlayer};
use orbit_headless::{HeadlessConfig, HeadlessRunner, RonFileStore};
use serde_json::Value;

fn play(config: HeadlessConfig, input: &[&str]) -> (Vec<Value>, Replay) {
    let runner = HeadlessRunner::new(config).expect("runner starts");
    let mut out = Vec::new();
    let replay = runner
        .run(Cursor::new(input.join("\n")), &mut out)
        .expect("session runs");
    let lines = String::from_utf8(out)
        .expect("utf-8 output")
        .lines()
        .map(|l| serde_json::from_str(l).expect("every line is JSON"))
        .collect();
    (lines, replay)
}

fn of_type<'a>(lines: &'a [Value], kind: &str) -> Vec<&'a Value> {
    lines.iter().filter(|l| l["type"] == kind).collect()
}

#[test]
fn test_controller_session() {
    let config = HeadlessConfig {
        difficulty: Difficulty::Medium,
        seed: 3,
        ..Default::default()
    };
    let (lines, _) = play(
        config,
        &[
            r#"{"cmd":"query"}"#,
            r#"{"cmd":"tick","count":120}"#,
            r#"{"cmd":"query"}"#,
            r#"{"cmd":"ability","ability":"shield"}"#,
            r#"{"cmd":"hash"}"#,
            r#"{"cmd":"quit"}"#,
        ],
    );

    assert_eq!(lines[0]["type"], "ready");
    assert_eq!(lines[0]["difficulty"], "medium");

    let states = of_type(&lines, "state");
    assert_eq!(states.len(), 2);
    assert_eq!(states[0]["tick"], 0);
    assert_eq!(states[1]["tick"], 120);
    let planets = states[1]["planets"].as_array().expect("planet list");
    assert!(planets.iter().any(|p| p["owner"] == 0));

    let errors = of_type(&lines, "error");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["cmd"], "ability");

    assert_eq!(of_type(&lines, "state_hash")[0]["tick"], 120);
    assert_eq!(lines.last().expect("bye")["type"], "bye");
}

#[test]
fn test_autopilot_session_replays() {
    let config = HeadlessConfig {
        difficulty: Difficulty::Easy,
        seed: 40,
        autopilot: true,
        ..Default::default()
    };
    let (lines, replay) = play(
        config,
        &[
            r#"{"cmd":"tick","count":300}"#,
            r#"{"cmd":"pause"}"#,
            r#"{"cmd":"tick","count":30}"#,
            r#"{"cmd":"resume"}"#,
            r#"{"cmd":"tick","count":300}"#,
        ],
    );
    assert_eq!(of_type(&lines, "ack").len(), 5);
    assert!(replay.command_count() > 2);

    let expected = replay.final_hash;
    let mut player = ReplayPlayer::new(replay).expect("replay restores");
    assert_eq!(player.verify().expect("no desync"), expected);
}

#[test]
fn test_saved_progress_is_loaded() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut player = PlayerData::new();
    player.add_coins(4321);
    RonFileStore::open(dir.path())
        .expect("store opens")
        .save_player(&player)
        .expect("player saved");

    let config = HeadlessConfig {
        profile_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    let (lines, _) = play(
        config,
        &[
            r#"{"cmd":"query"}"#,
            r#"{"cmd":"new_game","difficulty":"easy","seed":2}"#,
            r#"{"cmd":"query"}"#,
            r#"{"cmd":"challenges"}"#,
        ],
    );
    let states = of_type(&lines, "state");
    assert_eq!(states[0]["coins"], 4321);
    assert_eq!(states[1]["coins"], 4321);

    let ready = of_type(&lines, "ready");
    assert_eq!(ready.len(), 2);
    assert_eq!(ready[1]["difficulty"], "easy");
    assert_eq!(ready[1]["seed"], 2);

    assert!(!of_type(&lines, "challenges")[0]["challenges"]
        .as_array()
        .expect("challenge list")
        .is_empty());
    assert!(of_type(&lines, "warning").is_empty());
}
