//! Reducer flow tests driven through EffectStore.

use chrono::Utc;
use pokearena::{
    action::Action,
    battle::{BattlePhase, Side},
    effect::Effect,
    reducer::reducer,
    state::{AppState, CatalogEntry, PokemonSummary, Screen, TrainerProfile},
};
use tui_dispatch::EffectStore;

fn summary(id: u16, name: &str, hp: u16, attack: u16, defense: u16) -> PokemonSummary {
    PokemonSummary {
        id,
        name: name.to_string(),
        types: vec!["normal".to_string()],
        hp: Some(hp),
        attack: Some(attack),
        defense: Some(defense),
        speed: Some(50),
        sprite_front: None,
    }
}

fn arena_store(roster: Vec<PokemonSummary>) -> EffectStore<AppState, Action, Effect> {
    let mut store = EffectStore::new(AppState::new(), reducer);
    let result = store.dispatch(Action::ScreenChange(Screen::Arena));
    assert!(result
        .effects
        .iter()
        .any(|effect| matches!(effect, Effect::LoadRoster { .. })));
    assert!(store.state().arena.roster.is_loading());
    store.dispatch(Action::RosterDidLoad(roster));
    assert!(store.state().arena.roster.is_loaded());
    store
}

#[test]
fn battle_start_opens_with_log_line() {
    let mut store = arena_store(vec![summary(25, "pikachu", 35, 55, 40)]);

    let result = store.dispatch(Action::BattleStart);
    assert!(result.changed);

    let battle = store.state().arena.battle.as_ref().expect("battle running");
    assert_eq!(battle.phase, BattlePhase::InProgress { turn: Side::Player });
    assert_eq!(battle.log.len(), 1);
    assert!(battle.log[0].ends_with("Battle begins!"));
    assert_eq!(battle.player.hp, battle.player.max_hp);
}

#[test]
fn player_attack_schedules_delayed_counter() {
    // Tanky stats so the first hit cannot end the battle.
    let mut store = arena_store(vec![summary(143, "snorlax", 160, 110, 65)]);
    store.dispatch(Action::BattleStart);

    let result = store.dispatch(Action::BattleAttack);
    assert!(result.changed);
    assert!(result
        .effects
        .iter()
        .any(|effect| matches!(effect, Effect::PlayAttackSound)));
    assert!(result
        .effects
        .iter()
        .any(|effect| matches!(effect, Effect::ScheduleCounterAttack { delay_ms: 1500 })));

    let battle = store.state().arena.battle.as_ref().expect("battle running");
    assert_eq!(
        battle.phase,
        BattlePhase::InProgress {
            turn: Side::Opponent
        }
    );
    assert!(battle.opponent.hp < battle.opponent.max_hp);
    // Attacking again out of turn changes nothing.
    let repeat = store.dispatch(Action::BattleAttack);
    assert!(!repeat.changed);
}

#[test]
fn counter_attack_hits_back_and_returns_turn() {
    let mut store = arena_store(vec![summary(143, "snorlax", 160, 110, 65)]);
    store.dispatch(Action::BattleStart);
    store.dispatch(Action::BattleAttack);

    let result = store.dispatch(Action::CounterAttackDue);
    assert!(result.changed);

    let battle = store.state().arena.battle.as_ref().expect("battle running");
    assert_eq!(battle.phase, BattlePhase::InProgress { turn: Side::Player });
    assert!(battle.player.hp < battle.player.max_hp);
}

#[test]
fn reset_cancels_pending_counter_and_stale_timer_is_ignored() {
    let mut store = arena_store(vec![summary(143, "snorlax", 160, 110, 65)]);
    store.dispatch(Action::BattleStart);
    store.dispatch(Action::BattleAttack);

    let result = store.dispatch(Action::BattleReset);
    assert!(result.changed);
    assert!(result
        .effects
        .iter()
        .any(|effect| matches!(effect, Effect::CancelCounterAttack)));
    assert!(store.state().arena.battle.is_none());

    // The timer firing after teardown must be a no-op.
    let stale = store.dispatch(Action::CounterAttackDue);
    assert!(!stale.changed);
    assert!(stale.effects.is_empty());
}

#[test]
fn leaving_the_arena_tears_down_the_battle() {
    let mut store = arena_store(vec![summary(143, "snorlax", 160, 110, 65)]);
    store.dispatch(Action::BattleStart);
    store.dispatch(Action::BattleAttack);

    let result = store.dispatch(Action::ScreenChange(Screen::Pokedex));
    assert!(result
        .effects
        .iter()
        .any(|effect| matches!(effect, Effect::CancelCounterAttack)));
    assert!(store.state().arena.battle.is_none());
}

#[test]
fn winning_persists_record_and_counters() {
    // 5 HP falls to the 5-damage floor in one hit, so the single roster
    // entry (a mirror match) always ends on the first attack.
    let mut store = arena_store(vec![summary(129, "magikarp", 5, 10, 200)]);
    store.dispatch(Action::BattleStart);

    let result = store.dispatch(Action::BattleAttack);
    assert!(result.changed);
    assert!(result
        .effects
        .iter()
        .any(|effect| matches!(effect, Effect::PlayFaintSound)));

    let saved = result.effects.iter().find_map(|effect| match effect {
        Effect::SaveBattleRecord { record, profile } => Some((record.clone(), profile.clone())),
        _ => None,
    });
    let (record, profile) = saved.expect("battle record effect");
    assert_eq!(record.winner, Side::Player);
    assert_eq!(record.opponent_hp, 0);
    assert_eq!(profile.battles_won, 1);
    assert_eq!(profile.battles_lost, 0);
    assert_eq!(profile.total_battles, 1);
    assert_eq!(profile.total_score, 3);

    let state = store.state();
    assert!(state.arena.saving_result);
    let battle = state.arena.battle.as_ref().expect("terminal battle shown");
    assert_eq!(battle.phase, BattlePhase::Ended { winner: Side::Player });
    assert!(battle.log.last().expect("log").contains("You win!"));

    store.dispatch(Action::RecordDidSave);
    assert!(!store.state().arena.saving_result);
}

#[test]
fn battle_reaches_terminal_state_in_finite_turns() {
    // Single-entry roster forces a mirror match at 35 HP a side.
    let mut store = arena_store(vec![summary(1, "bulbasaur", 35, 49, 49)]);
    store.dispatch(Action::BattleStart);

    let mut steps = 0;
    loop {
        let battle = store.state().arena.battle.as_ref().expect("battle");
        match battle.phase {
            BattlePhase::Ended { .. } => break,
            BattlePhase::InProgress { turn: Side::Player } => {
                store.dispatch(Action::BattleAttack);
            }
            BattlePhase::InProgress {
                turn: Side::Opponent,
            } => {
                store.dispatch(Action::CounterAttackDue);
            }
        }
        steps += 1;
        assert!(steps < 1000, "battle failed to terminate");
    }

    let battle = store.state().arena.battle.as_ref().expect("battle");
    let winner = battle.winner().expect("winner");
    match winner {
        Side::Player => assert_eq!(battle.opponent.hp, 0),
        Side::Opponent => assert_eq!(battle.player.hp, 0),
    }
}

#[test]
fn catalog_search_filters_by_name_and_number() {
    let mut store = EffectStore::new(AppState::new(), reducer);
    store.dispatch(Action::CatalogDidLoad(vec![
        CatalogEntry {
            id: 1,
            name: "bulbasaur".to_string(),
        },
        CatalogEntry {
            id: 4,
            name: "charmander".to_string(),
        },
        CatalogEntry {
            id: 7,
            name: "squirtle".to_string(),
        },
    ]));
    assert_eq!(store.state().filtered_indices.len(), 3);

    store.dispatch(Action::SearchStart);
    store.dispatch(Action::SearchInput('c'));
    store.dispatch(Action::SearchInput('h'));
    assert_eq!(store.state().filtered_indices.len(), 1);
    assert_eq!(
        store.state().selected_name().as_deref(),
        Some("charmander")
    );

    store.dispatch(Action::SearchCancel);
    assert_eq!(store.state().filtered_indices.len(), 3);

    store.dispatch(Action::SearchStart);
    store.dispatch(Action::SearchInput('7'));
    assert_eq!(store.state().selected_name().as_deref(), Some("squirtle"));
}

#[test]
fn favorite_toggle_saves_and_removes() {
    let mut store = EffectStore::new(AppState::new(), reducer);
    store.dispatch(Action::CatalogDidLoad(vec![CatalogEntry {
        id: 25,
        name: "pikachu".to_string(),
    }]));

    let result = store.dispatch(Action::FavoriteToggle);
    assert!(result
        .effects
        .iter()
        .any(|effect| matches!(effect, Effect::SaveFavorites { .. })));
    assert_eq!(store.state().favorites.len(), 1);
    assert!(store.state().is_favorite(25));

    let result = store.dispatch(Action::FavoriteToggle);
    assert!(result
        .effects
        .iter()
        .any(|effect| matches!(effect, Effect::SaveFavorites { .. })));
    assert!(store.state().favorites.is_empty());
}

#[test]
fn export_without_favorites_is_refused() {
    let mut store = EffectStore::new(AppState::new(), reducer);
    let result = store.dispatch(Action::FavoritesExport);
    assert!(result.effects.is_empty());
    assert_eq!(
        store.state().message.as_deref(),
        Some("No favorites to export.")
    );
}

#[test]
fn leaderboard_ranking_filters_and_sorts() {
    let mut store = EffectStore::new(AppState::new(), reducer);
    let entry = |name: &str, won: u32, lost: u32| {
        let mut profile = TrainerProfile::new(name.to_string(), Utc::now());
        for _ in 0..won {
            profile.record_result(true);
        }
        for _ in 0..lost {
            profile.record_result(false);
        }
        profile
    };

    store.dispatch(Action::LeaderboardDidLoad(vec![
        entry("rookie", 2, 1),   // below the 5-battle minimum
        entry("misty", 6, 4),    // 18 points
        entry("brock", 6, 0),    // 18 points, fewer losses but same wins
        entry("lance", 20, 2),   // 60 points
    ]));

    let board = store
        .state()
        .leaderboard
        .data()
        .expect("leaderboard loaded");
    assert_eq!(board.len(), 3);
    assert_eq!(board[0].username, "lance");
    assert_eq!(board[0].rank(), "Champion");
    // Equal score and wins keep input order.
    assert_eq!(board[1].username, "misty");
    assert_eq!(board[2].username, "brock");
}

#[test]
fn profile_rename_round_trip() {
    let mut store = EffectStore::new(AppState::new(), reducer);
    let result = store.dispatch(Action::ScreenChange(Screen::Profile));
    assert!(result
        .effects
        .iter()
        .any(|effect| matches!(effect, Effect::LoadRecentBattles { limit: 10 })));

    store.dispatch(Action::ProfileEditStart);
    assert!(store.state().profile_edit.active);

    // Clear the prefilled name, then type a new one.
    let prefill = store.state().profile_edit.input.len();
    for _ in 0..prefill {
        store.dispatch(Action::ProfileEditBackspace);
    }
    for ch in "ash".chars() {
        store.dispatch(Action::ProfileEditInput(ch));
    }
    let result = store.dispatch(Action::ProfileEditSubmit);
    assert!(result
        .effects
        .iter()
        .any(|effect| matches!(effect, Effect::SaveProfile { .. })));
    assert_eq!(store.state().profile.username, "ash");
    assert!(!store.state().profile_edit.active);
}

#[test]
fn trainer_override_starts_fresh_career() {
    let mut state = AppState::new();
    state.trainer_override = Some("gary".to_string());
    let mut store = EffectStore::new(state, reducer);

    let mut saved = TrainerProfile::new("red".to_string(), Utc::now());
    saved.record_result(true);

    let result = store.dispatch(Action::StoresDidLoad {
        profile: saved,
        favorites: Vec::new(),
    });
    assert!(result
        .effects
        .iter()
        .any(|effect| matches!(effect, Effect::SaveProfile { .. })));
    assert_eq!(store.state().profile.username, "gary");
    assert_eq!(store.state().profile.total_battles, 0);
}
