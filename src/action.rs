use serde::{Deserialize, Serialize};

use crate::sprite::Sprite;
use crate::state::{
    BattleRecord, CatalogEntry, FavoriteEntry, PokemonSummary, Screen, TrainerProfile,
};

#[derive(tui_dispatch::Action, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[action(infer_categories)]
pub enum Action {
    Init,
    UiTerminalResize(u16, u16),
    Tick,
    ScreenChange(Screen),

    // Catalog browsing
    CatalogDidLoad(Vec<CatalogEntry>),
    CatalogDidError(String),
    SelectionMove(i16),
    SelectionPage(i16),
    SelectionJumpTop,
    SelectionJumpBottom,
    DetailOpen,
    DetailClose,
    PokemonDidLoad(PokemonSummary),
    PokemonDidError {
        name: String,
        error: String,
    },
    SpriteDidLoad {
        url: String,
        sprite: Sprite,
    },
    SpriteDidError {
        url: String,
        error: String,
    },

    // Search
    SearchStart,
    SearchCancel,
    SearchSubmit,
    SearchInput(char),
    SearchBackspace,

    // Favorites
    FavoriteToggle,
    FavoriteRemove,
    FavoritesExport,
    FavoritesDidSave,
    FavoritesDidError(String),
    ExportDidFinish(String),
    ExportDidError(String),

    // Persistence bootstrap
    StoresDidLoad {
        profile: TrainerProfile,
        favorites: Vec<FavoriteEntry>,
    },
    StoresDidError(String),

    // Battle arena
    RosterDidLoad(Vec<PokemonSummary>),
    RosterDidError(String),
    BattleStart,
    BattleAttack,
    CounterAttackDue,
    BattleReset,
    RecordDidSave,
    RecordDidError(String),

    // Leaderboard
    LeaderboardDidLoad(Vec<TrainerProfile>),
    LeaderboardDidError(String),

    // Profile
    RecentBattlesDidLoad(Vec<BattleRecord>),
    RecentBattlesDidError(String),
    ProfileEditStart,
    ProfileEditCancel,
    ProfileEditInput(char),
    ProfileEditBackspace,
    ProfileEditSubmit,
    ProfileDidSave,
    ProfileDidError(String),

    Quit,
}
