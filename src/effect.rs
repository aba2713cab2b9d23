use crate::persist::FavoriteExportRow;
use crate::state::{BattleRecord, FavoriteEntry, TrainerProfile};

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    // Data loading
    LoadStores,
    LoadCatalog { limit: u16 },
    LoadPokemon { name: String },
    LoadSprite { name: String, url: String },
    LoadRoster { count: u16 },
    LoadLeaderboard,
    LoadRecentBattles { limit: usize },

    // Battle
    ScheduleCounterAttack { delay_ms: u64 },
    CancelCounterAttack,
    SaveBattleRecord { record: BattleRecord, profile: TrainerProfile },
    PlayAttackSound,
    PlayFaintSound,

    // Collection persistence
    SaveFavorites { favorites: Vec<FavoriteEntry> },
    ExportFavoritesCsv { rows: Vec<FavoriteExportRow> },
    SaveProfile { profile: TrainerProfile },
}
