//! Whole-session scenarios driven through the scheduler.

use orbit_core::prelude::*;
use orbit_test_utils::fixtures::{
    duel_layout, fixture_game, generated_game, planet, typed_planet, uncontested_layout, GameRunner,
};

fn wins(events: &[GameEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, GameEvent::GameWon { .. }))
        .count()
}

#[test]
fn test_uncontested_world_is_won_on_first_tick() {
    let mut runner = GameRunner::new(fixture_game(uncontested_layout(), 1));
    let first = runner.step();
    assert!(runner.game().is_game_won());
    assert!(first.game_over());
    assert_eq!(wins(&first.events), 1);
    assert!(first.events.contains(&GameEvent::GameWon {
        elapsed_ms: 0,
        difficulty: Difficulty::Easy,
    }));

    // Further ticks neither advance the session nor announce again.
    let later = runner.run(120);
    assert_eq!(wins(&later), 0);
    assert_eq!(runner.game().tick_count(), 1);
}

/// The player's planet next to a nearly dead bot planet of `planet_type`.
fn last_stand_layout(planet_type: PlanetType) -> WorldLayout {
    let mut target = typed_planet(300.0, 425.0, Some(OperatorId(1)), planet_type);
    target.health_fraction = 0.01;
    WorldLayout {
        width: 1200.0,
        height: 850.0,
        bot_count: 1,
        planets: vec![planet(200.0, 425.0, Some(OperatorId::PLAYER)), target],
    }
}

fn win_by_capturing(planet_type: PlanetType) -> GameRunner {
    let mut runner = GameRunner::new(fixture_game(last_stand_layout(planet_type), 2));
    runner
        .command(PlayerCommand::ToggleTarget {
            from: PlanetId(0),
            to: PlanetId(1),
        })
        .unwrap();
    let events = runner.run_until_over(60 * 60);
    assert!(runner.game().is_game_won());
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, GameEvent::PlanetCaptured { by, .. } if by.is_player()))
            .count(),
        1
    );
    runner
}

#[test]
fn test_winning_capture_counts_against_type_exclusion() {
    let runner = win_by_capturing(PlanetType::Attack);
    let challenges = runner.game().profile().challenges();
    assert!(!challenges.challenge("no_attack_planets").unwrap().is_completed());
    assert!(challenges.challenge("no_defence_planets").unwrap().is_completed());
    assert!(challenges.challenge("no_speed_planets").unwrap().is_completed());
    assert_eq!(challenges.counters().planets_captured, 1);
}

#[test]
fn test_winning_capture_of_other_type_keeps_exclusion() {
    let runner = win_by_capturing(PlanetType::Speed);
    let challenges = runner.game().profile().challenges();
    assert!(challenges.challenge("no_attack_planets").unwrap().is_completed());
    assert!(!challenges.challenge("no_speed_planets").unwrap().is_completed());
    assert_eq!(
        challenges.counters().perfect_games.get(&Difficulty::Easy),
        Some(&1)
    );
}

#[test]
fn test_victory_credits_profile_once() {
    let mut runner = GameRunner::new(fixture_game(uncontested_layout(), 1));
    runner.step();
    let coins = runner.game().profile().player().coins();
    assert!(coins > 0);
    assert_eq!(
        runner.game().profile().player().best_time(Difficulty::Easy),
        Some(0)
    );
    runner.run(60);
    assert_eq!(runner.game().profile().player().coins(), coins);
}

#[test]
fn test_commands_rejected_without_side_effects() {
    let mut runner = GameRunner::new(fixture_game(duel_layout(), 4));
    runner.step();
    let before = runner.game().state_hash();
    let err = runner
        .command(PlayerCommand::ToggleTarget {
            from: PlanetId(1),
            to: PlanetId(0),
        })
        .unwrap_err();
    assert!(matches!(err, GameError::NotOwner { .. }));
    let err = runner
        .command(PlayerCommand::ActivateAbility {
            ability: AbilityType::BlackHole,
        })
        .unwrap_err();
    assert!(matches!(err, GameError::AbilityLocked(AbilityType::BlackHole)));
    assert_eq!(runner.game().state_hash(), before);
}

#[test]
fn test_pause_preserves_effect_windows() {
    let mut game = fixture_game(duel_layout(), 5);
    game.profile_mut()
        .player_mut()
        .set_ability_level(AbilityType::Shield, 1);
    let mut runner = GameRunner::new(game);
    runner.step();
    runner
        .command(PlayerCommand::ActivateAbility {
            ability: AbilityType::Shield,
        })
        .unwrap();
    let cooldown = runner.game().cooldown_remaining(AbilityType::Shield);

    runner.command(PlayerCommand::Pause).unwrap();
    // Twenty seconds of wall time, longer than the 9 s shield.
    runner.run(1200);
    assert_eq!(runner.game().cooldown_remaining(AbilityType::Shield), cooldown);
    assert!(runner
        .game()
        .active_abilities(OperatorId::PLAYER)
        .contains(&AbilityType::Shield));

    runner.command(PlayerCommand::Resume).unwrap();
    runner.run(60);
    assert!(runner
        .game()
        .active_abilities(OperatorId::PLAYER)
        .contains(&AbilityType::Shield));
    assert!(runner.game().cooldown_remaining(AbilityType::Shield) < cooldown);
}

#[test]
fn test_player_route_produces_attack() {
    let mut runner = GameRunner::new(fixture_game(duel_layout(), 6));
    runner
        .command(PlayerCommand::ToggleTarget {
            from: PlanetId(0),
            to: PlanetId(2),
        })
        .unwrap();
    // 2 s production interval, then about two seconds of travel.
    let mut lowest = f64::MAX;
    for _ in 0..60 * 6 {
        runner.step();
        let neutral = runner.game().world().planet(PlanetId(2)).unwrap();
        lowest = lowest.min(neutral.health());
    }
    assert!(lowest <= 9500.0 + 1e-9);
}

#[test]
fn test_capture_feeds_challenges() {
    let mut runner = GameRunner::new(fixture_game(duel_layout(), 6));
    runner
        .command(PlayerCommand::ToggleTarget {
            from: PlanetId(0),
            to: PlanetId(2),
        })
        .unwrap();
    let events = runner.run(60 * 30);
    let player_captures = events
        .iter()
        .filter(|e| matches!(e, GameEvent::PlanetCaptured { by: OperatorId::PLAYER, .. }))
        .count() as u64;
    assert_eq!(
        runner.game().profile().challenges().counters().planets_captured,
        player_captures
    );
}

#[test]
fn test_slow_mode_changes_only_the_interval() {
    let mut runner = GameRunner::new(fixture_game(duel_layout(), 8));
    runner.step();
    runner
        .command(PlayerCommand::SetSlowMode { enabled: true })
        .unwrap();
    assert!((runner.game().tick_interval_ms() - 50.0).abs() < 1e-9);
    runner.run(20);
    assert_eq!(runner.game().game_time(), 1000);
    runner
        .command(PlayerCommand::SetSlowMode { enabled: false })
        .unwrap();
    assert!((runner.game().tick_interval_ms() - 1000.0 / 60.0).abs() < 1e-9);
}

#[test]
fn test_generated_worlds_stay_sound() {
    for difficulty in Difficulty::ALL {
        let mut runner = GameRunner::new(generated_game(difficulty, 31));
        for _ in 0..600 {
            runner.step();
            let violations = runner.game().world().invariant_violations();
            assert!(violations.is_empty(), "{difficulty} at tick {}: {violations:?}", runner.game().tick_count());
        }
    }
}
