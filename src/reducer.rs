use chrono::Utc;
use tui_dispatch::{DataResource, DispatchResult};

use crate::action::Action;
use crate::battle::{self, Battle, Combatant, Side, COUNTER_DELAY_MS};
use crate::effect::Effect;
use crate::persist::FavoriteExportRow;
use crate::state::{
    AppState, BattleRecord, FavoriteEntry, Screen, TrainerProfile, ARENA_ROSTER_SIZE,
    FAVORITES_LIMIT, RECENT_BATTLES_LIMIT,
};

pub fn reducer(state: &mut AppState, action: Action) -> DispatchResult<Effect> {
    match action {
        Action::Init => {
            state.catalog = DataResource::Loading;
            DispatchResult::changed_with_many(vec![
                Effect::LoadStores,
                Effect::LoadCatalog {
                    limit: state.catalog_limit,
                },
            ])
        }

        Action::UiTerminalResize(width, height) => {
            if state.terminal_size != (width, height) {
                state.terminal_size = (width, height);
                DispatchResult::changed()
            } else {
                DispatchResult::unchanged()
            }
        }

        Action::Tick => {
            state.tick = state.tick.wrapping_add(1);
            // Only the "opponent is attacking" indicator animates.
            let waiting = state.screen == Screen::Arena
                && state
                    .arena
                    .battle
                    .as_ref()
                    .and_then(Battle::turn)
                    .map(|turn| turn == Side::Opponent)
                    .unwrap_or(false);
            if waiting {
                DispatchResult::changed()
            } else {
                DispatchResult::unchanged()
            }
        }

        Action::ScreenChange(screen) => screen_change(state, screen),

        // ===== Catalog =====
        Action::CatalogDidLoad(entries) => {
            state.catalog = DataResource::Loaded(entries);
            state.selected_index = 0;
            state.rebuild_filtered();
            DispatchResult::changed()
        }

        Action::CatalogDidError(error) => {
            state.catalog = DataResource::Failed(error.clone());
            state.message = Some(format!("Pokedex error: {}", error));
            DispatchResult::changed()
        }

        Action::SelectionMove(delta) => selection_move(state, delta),
        Action::SelectionPage(delta) => selection_move(state, delta.saturating_mul(10)),
        Action::SelectionJumpTop => selection_jump(state, 0),
        Action::SelectionJumpBottom => selection_jump(state, usize::MAX),

        Action::DetailOpen => detail_open(state),

        Action::DetailClose => {
            if state.screen != Screen::Detail {
                return DispatchResult::unchanged();
            }
            state.screen = Screen::Pokedex;
            state.detail_name = None;
            state.detail_loading = false;
            DispatchResult::changed()
        }

        Action::PokemonDidLoad(summary) => pokemon_loaded(state, summary),

        Action::PokemonDidError { name, error } => {
            if state.detail_name.as_deref() == Some(name.as_str()) {
                state.detail_loading = false;
            }
            state.message = Some(format!("Failed to load {}: {}", name, error));
            DispatchResult::changed()
        }

        Action::SpriteDidLoad { url, sprite } => {
            state.sprites_loading.remove(&url);
            state.sprite_cache.insert(url, sprite);
            DispatchResult::changed()
        }

        Action::SpriteDidError { url, error } => {
            state.sprites_loading.remove(&url);
            state.message = Some(format!("Sprite error: {}", error));
            DispatchResult::changed()
        }

        // ===== Search =====
        Action::SearchStart => {
            if state.screen != Screen::Pokedex || state.search.active {
                return DispatchResult::unchanged();
            }
            state.search.active = true;
            DispatchResult::changed()
        }

        Action::SearchCancel => {
            if !state.search.active {
                return DispatchResult::unchanged();
            }
            state.search.active = false;
            state.search.query.clear();
            state.rebuild_filtered();
            DispatchResult::changed()
        }

        Action::SearchSubmit => {
            if !state.search.active {
                return DispatchResult::unchanged();
            }
            state.search.active = false;
            DispatchResult::changed()
        }

        Action::SearchInput(ch) => {
            if !state.search.active {
                return DispatchResult::unchanged();
            }
            state.search.query.push(ch);
            state.rebuild_filtered();
            DispatchResult::changed()
        }

        Action::SearchBackspace => {
            if !state.search.active {
                return DispatchResult::unchanged();
            }
            state.search.query.pop();
            state.rebuild_filtered();
            DispatchResult::changed()
        }

        // ===== Favorites =====
        Action::FavoriteToggle => favorite_toggle(state),
        Action::FavoriteRemove => favorite_remove(state),
        Action::FavoritesExport => favorites_export(state),

        Action::FavoritesDidSave => DispatchResult::unchanged(),

        Action::FavoritesDidError(error) => {
            state.message = Some(format!("Failed to save favorites: {}", error));
            DispatchResult::changed()
        }

        Action::ExportDidFinish(path) => {
            state.message = Some(format!("Favorites exported to {}", path));
            DispatchResult::changed()
        }

        Action::ExportDidError(error) => {
            state.message = Some(format!("Export failed: {}", error));
            DispatchResult::changed()
        }

        // ===== Stores =====
        Action::StoresDidLoad { profile, favorites } => {
            let mut effects = Vec::new();
            let mut profile = profile;
            if let Some(name) = state.trainer_override.take() {
                // A fresh name starts a fresh career; the old profile
                // stays on the leaderboard.
                if profile.username != name {
                    profile = TrainerProfile::new(name, Utc::now());
                    effects.push(Effect::SaveProfile {
                        profile: profile.clone(),
                    });
                }
            }
            state.profile = profile;
            state.favorites = favorites;
            state.favorites_selected = 0;
            if effects.is_empty() {
                DispatchResult::changed()
            } else {
                DispatchResult::changed_with_many(effects)
            }
        }

        Action::StoresDidError(error) => {
            state.message = Some(format!("Failed to load trainer data: {}", error));
            DispatchResult::changed()
        }

        // ===== Battle arena =====
        Action::RosterDidLoad(roster) => {
            state.arena.selected = 0;
            state.arena.roster = DataResource::Loaded(roster);
            DispatchResult::changed()
        }

        Action::RosterDidError(error) => {
            state.arena.roster = DataResource::Failed(error.clone());
            state.message = Some(format!("Failed to load fighters: {}", error));
            DispatchResult::changed()
        }

        Action::BattleStart => battle_start(state),
        Action::BattleAttack => battle_attack(state),
        Action::CounterAttackDue => counter_attack(state),
        Action::BattleReset => battle_reset(state),

        Action::RecordDidSave => {
            state.arena.saving_result = false;
            DispatchResult::changed()
        }

        Action::RecordDidError(error) => {
            state.arena.saving_result = false;
            state.message = Some(format!("Failed to save battle result: {}", error));
            DispatchResult::changed()
        }

        // ===== Leaderboard =====
        Action::LeaderboardDidLoad(entries) => {
            state.leaderboard = DataResource::Loaded(crate::state::rank_leaderboard(entries));
            DispatchResult::changed()
        }

        Action::LeaderboardDidError(error) => {
            state.leaderboard = DataResource::Failed(error);
            DispatchResult::changed()
        }

        // ===== Profile =====
        Action::RecentBattlesDidLoad(records) => {
            state.recent_battles = DataResource::Loaded(records);
            DispatchResult::changed()
        }

        Action::RecentBattlesDidError(error) => {
            state.recent_battles = DataResource::Failed(error);
            DispatchResult::changed()
        }

        Action::ProfileEditStart => {
            if state.screen != Screen::Profile || state.profile_edit.active {
                return DispatchResult::unchanged();
            }
            state.profile_edit.active = true;
            state.profile_edit.input = state.profile.username.clone();
            DispatchResult::changed()
        }

        Action::ProfileEditCancel => {
            if !state.profile_edit.active {
                return DispatchResult::unchanged();
            }
            state.profile_edit.active = false;
            state.profile_edit.input.clear();
            DispatchResult::changed()
        }

        Action::ProfileEditInput(ch) => {
            if !state.profile_edit.active || state.profile_edit.input.len() >= 20 {
                return DispatchResult::unchanged();
            }
            state.profile_edit.input.push(ch);
            DispatchResult::changed()
        }

        Action::ProfileEditBackspace => {
            if !state.profile_edit.active {
                return DispatchResult::unchanged();
            }
            state.profile_edit.input.pop();
            DispatchResult::changed()
        }

        Action::ProfileEditSubmit => {
            if !state.profile_edit.active {
                return DispatchResult::unchanged();
            }
            let username = state.profile_edit.input.trim().to_string();
            state.profile_edit.active = false;
            state.profile_edit.input.clear();
            if username.is_empty() || username == state.profile.username {
                return DispatchResult::changed();
            }
            state.profile.username = username;
            state.message = Some("Profile updated!".to_string());
            DispatchResult::changed_with(Effect::SaveProfile {
                profile: state.profile.clone(),
            })
        }

        Action::ProfileDidSave => DispatchResult::unchanged(),

        Action::ProfileDidError(error) => {
            state.message = Some(format!("Failed to save profile: {}", error));
            DispatchResult::changed()
        }

        Action::Quit => DispatchResult::unchanged(),
    }
}

fn screen_change(state: &mut AppState, screen: Screen) -> DispatchResult<Effect> {
    if state.screen == screen {
        return DispatchResult::unchanged();
    }

    let mut effects = Vec::new();

    // Leaving the arena mid-battle tears the battle down; the pending
    // counter-attack must not outlive it.
    if state.screen == Screen::Arena && state.arena.battle.is_some() {
        state.arena.battle = None;
        effects.push(Effect::CancelCounterAttack);
    }

    state.screen = screen;
    state.message = None;
    match screen {
        Screen::Arena => {
            if !state.arena.roster.is_loaded() {
                state.arena.roster = DataResource::Loading;
                effects.push(Effect::LoadRoster {
                    count: ARENA_ROSTER_SIZE,
                });
            }
        }
        Screen::Leaderboard => {
            state.leaderboard = DataResource::Loading;
            effects.push(Effect::LoadLeaderboard);
        }
        Screen::Profile => {
            state.recent_battles = DataResource::Loading;
            effects.push(Effect::LoadRecentBattles {
                limit: RECENT_BATTLES_LIMIT,
            });
        }
        Screen::Favorites => {
            if state.favorites_selected >= state.favorites.len() {
                state.favorites_selected = 0;
            }
        }
        Screen::Pokedex | Screen::Detail => {}
    }

    if effects.is_empty() {
        DispatchResult::changed()
    } else {
        DispatchResult::changed_with_many(effects)
    }
}

fn selection_move(state: &mut AppState, delta: i16) -> DispatchResult<Effect> {
    let (current, len) = match state.screen {
        Screen::Pokedex => (state.selected_index, state.filtered_indices.len()),
        Screen::Favorites => (state.favorites_selected, state.favorites.len()),
        Screen::Arena if state.arena.battle.is_none() => {
            (state.arena.selected, state.arena.roster_entries().len())
        }
        _ => return DispatchResult::unchanged(),
    };
    if len == 0 {
        return DispatchResult::unchanged();
    }

    let next = move_index(current, len, delta);
    if next == current {
        return DispatchResult::unchanged();
    }
    match state.screen {
        Screen::Pokedex => state.selected_index = next,
        Screen::Favorites => state.favorites_selected = next,
        Screen::Arena => state.arena.selected = next,
        _ => {}
    }
    DispatchResult::changed()
}

fn selection_jump(state: &mut AppState, index: usize) -> DispatchResult<Effect> {
    match state.screen {
        Screen::Pokedex => {
            if state.set_selected_index(index) {
                DispatchResult::changed()
            } else {
                DispatchResult::unchanged()
            }
        }
        _ => DispatchResult::unchanged(),
    }
}

fn move_index(current: usize, len: usize, delta: i16) -> usize {
    let next = current as i64 + delta as i64;
    next.clamp(0, len as i64 - 1) as usize
}

fn detail_open(state: &mut AppState) -> DispatchResult<Effect> {
    if state.screen != Screen::Pokedex {
        return DispatchResult::unchanged();
    }
    let Some(entry) = state.selected_entry().cloned() else {
        return DispatchResult::unchanged();
    };

    state.screen = Screen::Detail;
    state.detail_name = Some(entry.name.clone());

    let mut effects = Vec::new();
    let cached_sprite = state
        .summaries
        .get(&entry.name)
        .map(|summary| summary.sprite_front.clone());
    match cached_sprite {
        Some(sprite_front) => {
            if let Some(effect) = sprite_load_effect(state, &entry.name, sprite_front) {
                effects.push(effect);
            }
        }
        None => {
            state.detail_loading = true;
            effects.push(Effect::LoadPokemon { name: entry.name });
        }
    }

    if effects.is_empty() {
        DispatchResult::changed()
    } else {
        DispatchResult::changed_with_many(effects)
    }
}

fn pokemon_loaded(state: &mut AppState, summary: crate::state::PokemonSummary) -> DispatchResult<Effect> {
    let name = summary.name.clone();
    let sprite_url = summary.sprite_front.clone();
    state.summaries.insert(name.clone(), summary);

    // Newly known type tags can widen an active type search.
    if !state.search.query.trim().is_empty() {
        state.rebuild_filtered();
    }

    let mut effects = Vec::new();
    if state.detail_name.as_deref() == Some(name.as_str()) {
        state.detail_loading = false;
        if let Some(effect) = sprite_load_effect(state, &name, sprite_url) {
            effects.push(effect);
        }
    }

    if effects.is_empty() {
        DispatchResult::changed()
    } else {
        DispatchResult::changed_with_many(effects)
    }
}

fn sprite_load_effect(
    state: &mut AppState,
    name: &str,
    sprite_url: Option<String>,
) -> Option<Effect> {
    let url = sprite_url?;
    if state.sprite_cache.contains_key(&url) || state.sprites_loading.contains(&url) {
        return None;
    }
    state.sprites_loading.insert(url.clone());
    Some(Effect::LoadSprite {
        name: name.to_string(),
        url,
    })
}

fn favorite_target(state: &AppState) -> Option<(u16, String)> {
    match state.screen {
        Screen::Detail => state
            .current_detail()
            .map(|summary| (summary.id, summary.name.clone())),
        Screen::Pokedex => state
            .selected_entry()
            .map(|entry| (entry.id, entry.name.clone())),
        _ => None,
    }
}

fn favorite_toggle(state: &mut AppState) -> DispatchResult<Effect> {
    let Some((pokemon_id, pokemon_name)) = favorite_target(state) else {
        return DispatchResult::unchanged();
    };

    if let Some(pos) = state
        .favorites
        .iter()
        .position(|fav| fav.pokemon_id == pokemon_id)
    {
        state.favorites.remove(pos);
        state.message = Some("Removed from favorites.".to_string());
    } else {
        if state.favorites.len() >= FAVORITES_LIMIT {
            state.message =
                Some("You can only have up to 10 favorite Pokemon!".to_string());
            return DispatchResult::changed();
        }
        state.favorites.insert(
            0,
            FavoriteEntry {
                pokemon_id,
                pokemon_name,
                added_at: Utc::now(),
            },
        );
        state.message = if state.favorites.len() == FAVORITES_LIMIT {
            Some("Added to favorites. Favorites limit reached (10).".to_string())
        } else {
            Some("Added to favorites.".to_string())
        };
    }

    DispatchResult::changed_with(Effect::SaveFavorites {
        favorites: state.favorites.clone(),
    })
}

fn favorite_remove(state: &mut AppState) -> DispatchResult<Effect> {
    if state.screen != Screen::Favorites || state.favorites.is_empty() {
        return DispatchResult::unchanged();
    }
    let index = state.favorites_selected.min(state.favorites.len() - 1);
    state.favorites.remove(index);
    if state.favorites_selected >= state.favorites.len() && state.favorites_selected > 0 {
        state.favorites_selected -= 1;
    }
    state.message = Some("Removed from favorites.".to_string());
    DispatchResult::changed_with(Effect::SaveFavorites {
        favorites: state.favorites.clone(),
    })
}

fn favorites_export(state: &mut AppState) -> DispatchResult<Effect> {
    if state.favorites.is_empty() {
        state.message = Some("No favorites to export.".to_string());
        return DispatchResult::changed();
    }

    let rows: Vec<FavoriteExportRow> = state
        .favorites
        .iter()
        .map(|fav| {
            let summary = state.summaries.get(&fav.pokemon_name);
            FavoriteExportRow {
                pokemon_id: fav.pokemon_id,
                pokemon_name: fav.pokemon_name.clone(),
                types: summary.map(|s| s.types.clone()).unwrap_or_default(),
                hp: summary.and_then(|s| s.hp),
                attack: summary.and_then(|s| s.attack),
                defense: summary.and_then(|s| s.defense),
                added_at: fav.added_at,
            }
        })
        .collect();

    DispatchResult::changed_with(Effect::ExportFavoritesCsv { rows })
}

fn battle_start(state: &mut AppState) -> DispatchResult<Effect> {
    if state.screen != Screen::Arena {
        return DispatchResult::unchanged();
    }
    if state.arena.battle.is_some() {
        return DispatchResult::unchanged();
    }
    let Some(fighter) = state.arena.selected_fighter().cloned() else {
        state.message = Some("Select a Pokemon first!".to_string());
        return DispatchResult::changed();
    };

    let roster_len = state.arena.roster_entries().len();
    let opponent_index = (next_rand(state) as usize) % roster_len;
    let opponent = state.arena.roster_entries()[opponent_index].clone();

    let player = Combatant::from_summary(&fighter);
    let rival = Combatant::from_summary(&opponent);

    let mut effects = Vec::new();
    if let Some(effect) = sprite_load_effect(state, &fighter.name, player.sprite_url.clone()) {
        effects.push(effect);
    }
    if let Some(effect) = sprite_load_effect(state, &opponent.name, rival.sprite_url.clone()) {
        effects.push(effect);
    }

    state.message = None;
    state.arena.battle = Some(Battle::new(player, rival));

    if effects.is_empty() {
        DispatchResult::changed()
    } else {
        DispatchResult::changed_with_many(effects)
    }
}

fn battle_attack(state: &mut AppState) -> DispatchResult<Effect> {
    let roll = roll_pct(state);
    let Some(battle) = state.arena.battle.as_mut() else {
        return DispatchResult::unchanged();
    };
    if !battle.resolve_attack(Side::Player, roll) {
        return DispatchResult::unchanged();
    }

    if battle.is_over() {
        finish_battle(state)
    } else {
        DispatchResult::changed_with_many(vec![
            Effect::PlayAttackSound,
            Effect::ScheduleCounterAttack {
                delay_ms: COUNTER_DELAY_MS,
            },
        ])
    }
}

/// The delayed counter-attack. The timer may fire after the battle was
/// reset or already decided; such stale wakeups change nothing.
fn counter_attack(state: &mut AppState) -> DispatchResult<Effect> {
    let roll = roll_pct(state);
    let Some(battle) = state.arena.battle.as_mut() else {
        return DispatchResult::unchanged();
    };
    if !battle.resolve_attack(Side::Opponent, roll) {
        return DispatchResult::unchanged();
    }

    if battle.is_over() {
        finish_battle(state)
    } else {
        DispatchResult::changed_with(Effect::PlayAttackSound)
    }
}

fn finish_battle(state: &mut AppState) -> DispatchResult<Effect> {
    let Some(outcome) = state
        .arena
        .battle
        .as_ref()
        .and_then(Battle::outcome)
    else {
        return DispatchResult::changed();
    };

    state.profile.record_result(outcome.winner == Side::Player);
    state.arena.saving_result = true;
    let record = BattleRecord::from_outcome(&outcome, Utc::now());
    DispatchResult::changed_with_many(vec![
        Effect::PlayFaintSound,
        Effect::SaveBattleRecord {
            record,
            profile: state.profile.clone(),
        },
    ])
}

fn battle_reset(state: &mut AppState) -> DispatchResult<Effect> {
    if state.arena.battle.take().is_none() {
        return DispatchResult::unchanged();
    }
    state.message = None;
    DispatchResult::changed_with(Effect::CancelCounterAttack)
}

fn next_rand(state: &mut AppState) -> u32 {
    state.rng_seed = state
        .rng_seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    (state.rng_seed >> 32) as u32
}

fn roll_pct(state: &mut AppState) -> u32 {
    battle::ROLL_MIN_PCT + next_rand(state) % battle::ROLL_SPAN_PCT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roll_stays_in_variance_window() {
        let mut state = AppState::new();
        for _ in 0..1000 {
            let roll = roll_pct(&mut state);
            assert!((80..120).contains(&roll), "roll {} out of window", roll);
        }
    }

    #[test]
    fn move_index_clamps() {
        assert_eq!(move_index(0, 5, -1), 0);
        assert_eq!(move_index(4, 5, 1), 4);
        assert_eq!(move_index(2, 5, -2), 0);
        assert_eq!(move_index(0, 5, 10), 4);
    }

    #[test]
    fn init_loads_stores_and_catalog() {
        let mut state = AppState::new();
        let result = reducer(&mut state, Action::Init);
        assert!(result.changed);
        assert!(state.catalog.is_loading());
        assert!(matches!(result.effects[0], Effect::LoadStores));
        assert!(matches!(result.effects[1], Effect::LoadCatalog { limit } if limit == state.catalog_limit));
    }

    #[test]
    fn favorite_cap_blocks_eleventh() {
        let mut state = AppState::new();
        for i in 0..FAVORITES_LIMIT {
            state.favorites.push(FavoriteEntry {
                pokemon_id: i as u16 + 1,
                pokemon_name: format!("mon-{}", i),
                added_at: Utc::now(),
            });
        }
        state.catalog = DataResource::Loaded(vec![crate::state::CatalogEntry {
            id: 99,
            name: "onix".to_string(),
        }]);
        state.rebuild_filtered();

        let result = reducer(&mut state, Action::FavoriteToggle);
        assert!(result.changed);
        assert!(result.effects.is_empty(), "no save when the cap blocks");
        assert_eq!(state.favorites.len(), FAVORITES_LIMIT);
        assert!(state.message.as_deref().unwrap_or("").contains("up to 10"));
    }
}
