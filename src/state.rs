use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tui_dispatch::DataResource;
use tui_dispatch_debug::debug::{ron_string, DebugSection, DebugState};

use crate::battle::{Battle, BattleOutcome, Side};
use crate::sprite::Sprite;

pub const FAVORITES_LIMIT: usize = 10;
pub const SCORE_PER_WIN: u32 = 3;
pub const LEADERBOARD_MIN_BATTLES: u32 = 5;
pub const LEADERBOARD_LIMIT: usize = 50;
pub const RECENT_BATTLES_LIMIT: usize = 10;

pub const DEFAULT_CATALOG_LIMIT: u16 = 151;
pub const ARENA_ROSTER_SIZE: u16 = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Screen {
    Pokedex,
    Detail,
    Favorites,
    Arena,
    Leaderboard,
    Profile,
}

impl Screen {
    pub fn label(self) -> &'static str {
        match self {
            Screen::Pokedex => "Pokedex",
            Screen::Detail => "Detail",
            Screen::Favorites => "Favorites",
            Screen::Arena => "Battle Arena",
            Screen::Leaderboard => "Leaderboard",
            Screen::Profile => "Profile",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CatalogEntry {
    pub id: u16,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PokemonSummary {
    pub id: u16,
    pub name: String,
    pub types: Vec<String>,
    pub hp: Option<u16>,
    pub attack: Option<u16>,
    pub defense: Option<u16>,
    pub speed: Option<u16>,
    pub sprite_front: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FavoriteEntry {
    pub pokemon_id: u16,
    pub pokemon_name: String,
    pub added_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrainerProfile {
    pub username: String,
    pub battles_won: u32,
    pub battles_lost: u32,
    pub total_battles: u32,
    pub total_score: u32,
    pub created_at: DateTime<Utc>,
}

impl TrainerProfile {
    pub fn new(username: String, created_at: DateTime<Utc>) -> Self {
        Self {
            username,
            battles_won: 0,
            battles_lost: 0,
            total_battles: 0,
            total_score: 0,
            created_at,
        }
    }

    pub fn record_result(&mut self, won: bool) {
        self.total_battles = self.total_battles.saturating_add(1);
        if won {
            self.battles_won = self.battles_won.saturating_add(1);
            self.total_score = self.total_score.saturating_add(SCORE_PER_WIN);
        } else {
            self.battles_lost = self.battles_lost.saturating_add(1);
        }
    }

    pub fn win_rate_pct(&self) -> f32 {
        if self.total_battles == 0 {
            return 0.0;
        }
        self.battles_won as f32 / self.total_battles as f32 * 100.0
    }

    pub fn rank(&self) -> &'static str {
        let rate = self.win_rate_pct();
        let battles = self.total_battles;
        if rate >= 80.0 && battles >= 20 {
            "Champion"
        } else if rate >= 70.0 && battles >= 15 {
            "Elite"
        } else if rate >= 60.0 && battles >= 10 {
            "Veteran"
        } else if rate >= 50.0 && battles >= 5 {
            "Trainer"
        } else {
            "Rookie"
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BattleRecord {
    pub player_pokemon: String,
    pub opponent_pokemon: String,
    pub winner: Side,
    pub player_hp: u16,
    pub opponent_hp: u16,
    pub recorded_at: DateTime<Utc>,
}

impl BattleRecord {
    pub fn from_outcome(outcome: &BattleOutcome, recorded_at: DateTime<Utc>) -> Self {
        Self {
            player_pokemon: outcome.player_pokemon.clone(),
            opponent_pokemon: outcome.opponent_pokemon.clone(),
            winner: outcome.winner,
            player_hp: outcome.player_hp,
            opponent_hp: outcome.opponent_hp,
            recorded_at,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchState {
    pub active: bool,
    pub query: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProfileEditState {
    pub active: bool,
    pub input: String,
}

/// Battle arena screen state. `battle: None` is the fighter-selection
/// stage; the running machine lives in [`Battle`].
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct ArenaState {
    pub roster: DataResource<Vec<PokemonSummary>>,
    pub selected: usize,
    pub battle: Option<Battle>,
    pub saving_result: bool,
}

impl Default for ArenaState {
    fn default() -> Self {
        Self {
            roster: DataResource::Empty,
            selected: 0,
            battle: None,
            saving_result: false,
        }
    }
}

impl ArenaState {
    pub fn roster_entries(&self) -> &[PokemonSummary] {
        self.roster.data().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn selected_fighter(&self) -> Option<&PokemonSummary> {
        self.roster_entries().get(self.selected)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AppState {
    pub terminal_size: (u16, u16),
    pub screen: Screen,

    pub catalog_limit: u16,
    pub catalog: DataResource<Vec<CatalogEntry>>,
    pub filtered_indices: Vec<usize>,
    pub selected_index: usize,
    pub search: SearchState,

    pub detail_name: Option<String>,
    pub detail_loading: bool,
    pub summaries: HashMap<String, PokemonSummary>,
    pub sprite_cache: HashMap<String, Sprite>,
    pub sprites_loading: HashSet<String>,

    pub favorites: Vec<FavoriteEntry>,
    pub favorites_selected: usize,

    pub profile: TrainerProfile,
    pub leaderboard: DataResource<Vec<TrainerProfile>>,
    pub recent_battles: DataResource<Vec<BattleRecord>>,
    pub profile_edit: ProfileEditState,

    pub arena: ArenaState,

    pub message: Option<String>,
    /// `--trainer` CLI override, consumed once the stores load.
    pub trainer_override: Option<String>,
    pub rng_seed: u64,
    pub tick: u64,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            terminal_size: (80, 24),
            screen: Screen::Pokedex,
            catalog_limit: DEFAULT_CATALOG_LIMIT,
            catalog: DataResource::Empty,
            filtered_indices: Vec::new(),
            selected_index: 0,
            search: SearchState::default(),
            detail_name: None,
            detail_loading: false,
            summaries: HashMap::new(),
            sprite_cache: HashMap::new(),
            sprites_loading: HashSet::new(),
            favorites: Vec::new(),
            favorites_selected: 0,
            profile: TrainerProfile::new("red".to_string(), Utc::now()),
            leaderboard: DataResource::Empty,
            recent_battles: DataResource::Empty,
            profile_edit: ProfileEditState::default(),
            arena: ArenaState::default(),
            message: None,
            trainer_override: None,
            rng_seed: seed_from_time(),
            tick: 0,
        }
    }

    pub fn catalog_entries(&self) -> &[CatalogEntry] {
        self.catalog.data().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn selected_entry(&self) -> Option<&CatalogEntry> {
        self.filtered_indices
            .get(self.selected_index)
            .and_then(|idx| self.catalog_entries().get(*idx))
    }

    pub fn selected_name(&self) -> Option<String> {
        self.selected_entry().map(|entry| entry.name.clone())
    }

    pub fn set_selected_index(&mut self, index: usize) -> bool {
        if self.filtered_indices.is_empty() {
            self.selected_index = 0;
            return false;
        }
        let bounded = index.min(self.filtered_indices.len() - 1);
        if bounded != self.selected_index {
            self.selected_index = bounded;
            return true;
        }
        false
    }

    /// Recomputes the visible catalog slice. The query matches the name,
    /// the dex number, or a type tag of an already-fetched summary.
    pub fn rebuild_filtered(&mut self) {
        let query = self.search.query.trim().to_lowercase();
        self.filtered_indices = self
            .catalog_entries()
            .iter()
            .enumerate()
            .filter(|(_, entry)| {
                if query.is_empty() {
                    return true;
                }
                entry.name.to_lowercase().contains(&query)
                    || entry.id.to_string().contains(&query)
                    || self
                        .summaries
                        .get(&entry.name)
                        .map(|summary| {
                            summary
                                .types
                                .iter()
                                .any(|tag| tag.to_lowercase().contains(&query))
                        })
                        .unwrap_or(false)
            })
            .map(|(idx, _)| idx)
            .collect();

        if self.selected_index >= self.filtered_indices.len() {
            self.selected_index = 0;
        }
    }

    pub fn is_favorite(&self, pokemon_id: u16) -> bool {
        self.favorites
            .iter()
            .any(|fav| fav.pokemon_id == pokemon_id)
    }

    pub fn current_detail(&self) -> Option<&PokemonSummary> {
        let name = self.detail_name.as_ref()?;
        self.summaries.get(name)
    }
}

/// Leaderboard view of raw profile entries: minimum battle count, score
/// then wins descending, capped list.
pub fn rank_leaderboard(mut entries: Vec<TrainerProfile>) -> Vec<TrainerProfile> {
    entries.retain(|entry| entry.total_battles >= LEADERBOARD_MIN_BATTLES);
    entries.sort_by(|a, b| {
        b.total_score
            .cmp(&a.total_score)
            .then(b.battles_won.cmp(&a.battles_won))
    });
    entries.truncate(LEADERBOARD_LIMIT);
    entries
}

pub fn format_name(name: &str) -> String {
    name.split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    let rest = chars.as_str();
                    format!("{}{}", first.to_ascii_uppercase(), rest)
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl DebugState for AppState {
    fn debug_sections(&self) -> Vec<DebugSection> {
        let mut sections = vec![
            DebugSection::new("Screen")
                .entry("screen", ron_string(&self.screen))
                .entry("message", ron_string(&self.message)),
            DebugSection::new("Catalog")
                .entry("total", ron_string(&self.catalog_entries().len()))
                .entry("filtered", ron_string(&self.filtered_indices.len()))
                .entry("selected", ron_string(&self.selected_index))
                .entry("search", ron_string(&self.search.query))
                .entry("detail", ron_string(&self.detail_name)),
            DebugSection::new("Trainer")
                .entry("username", ron_string(&self.profile.username))
                .entry("wins", ron_string(&self.profile.battles_won))
                .entry("losses", ron_string(&self.profile.battles_lost))
                .entry("favorites", ron_string(&self.favorites.len())),
        ];

        if let Some(battle) = &self.arena.battle {
            sections.push(
                DebugSection::new("Battle")
                    .entry("phase", ron_string(&battle.phase))
                    .entry("player", ron_string(&battle.player.name))
                    .entry("player_hp", ron_string(&battle.player.hp))
                    .entry("opponent", ron_string(&battle.opponent.name))
                    .entry("opponent_hp", ron_string(&battle.opponent.hp)),
            );
        }

        sections
    }
}

fn seed_from_time() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    (now.as_secs() << 32) ^ now.subsec_nanos() as u64
}
