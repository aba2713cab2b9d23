use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::state::{BattleRecord, FavoriteEntry, TrainerProfile};

pub const EXPORT_FILE_NAME: &str = "pokemon-favorites.csv";
const DEFAULT_USERNAME: &str = "red";

fn data_root() -> PathBuf {
    let base = dirs_next::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("pokearena")
}

fn trainer_path() -> PathBuf {
    data_root().join("trainer.json")
}

fn leaderboard_path() -> PathBuf {
    data_root().join("leaderboard.json")
}

fn favorites_path() -> PathBuf {
    data_root().join("favorites.json")
}

fn battles_path() -> PathBuf {
    data_root().join("battles.jsonl")
}

/// Loads the trainer profile and favorites, creating a fresh rookie
/// profile on first launch.
pub async fn load_stores() -> Result<(TrainerProfile, Vec<FavoriteEntry>), String> {
    let profile = match tokio::fs::read_to_string(trainer_path()).await {
        Ok(json) => serde_json::from_str(&json)
            .map_err(|e| format!("Trainer file corrupted: {}", e))?,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            TrainerProfile::new(DEFAULT_USERNAME.to_string(), Utc::now())
        }
        Err(e) => return Err(format!("Failed to read trainer file: {}", e)),
    };

    let favorites = match tokio::fs::read_to_string(favorites_path()).await {
        Ok(json) => serde_json::from_str(&json)
            .map_err(|e| format!("Favorites file corrupted: {}", e))?,
        Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(format!("Failed to read favorites file: {}", e)),
    };

    Ok((profile, favorites))
}

pub async fn save_favorites(favorites: &[FavoriteEntry]) -> Result<(), String> {
    write_json(favorites_path(), favorites).await
}

/// Persists the trainer profile and mirrors it into the leaderboard file,
/// upserted by username.
pub async fn save_trainer(profile: &TrainerProfile) -> Result<(), String> {
    write_json(trainer_path(), profile).await?;

    let mut entries = load_leaderboard().await?;
    match entries
        .iter_mut()
        .find(|entry| entry.username == profile.username)
    {
        Some(entry) => *entry = profile.clone(),
        None => entries.push(profile.clone()),
    }
    write_json(leaderboard_path(), &entries).await
}

pub async fn load_leaderboard() -> Result<Vec<TrainerProfile>, String> {
    match tokio::fs::read_to_string(leaderboard_path()).await {
        Ok(json) => serde_json::from_str(&json)
            .map_err(|e| format!("Leaderboard file corrupted: {}", e)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(format!("Failed to read leaderboard file: {}", e)),
    }
}

/// Records a finished battle: appends the record to the battle log and
/// saves the updated trainer counters.
pub async fn save_battle_result(
    record: &BattleRecord,
    profile: &TrainerProfile,
) -> Result<(), String> {
    append_battle_record(record).await?;
    save_trainer(profile).await
}

pub async fn append_battle_record(record: &BattleRecord) -> Result<(), String> {
    let path = battles_path();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| format!("Failed to create data directory: {}", e))?;
    }
    let line = serde_json::to_string(record)
        .map_err(|e| format!("Failed to serialize battle record: {}", e))?;
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
        .map_err(|e| format!("Failed to open battle log: {}", e))?;
    file.write_all(line.as_bytes())
        .await
        .map_err(|e| format!("Failed to write battle log: {}", e))?;
    file.write_all(b"\n")
        .await
        .map_err(|e| format!("Failed to write battle log: {}", e))?;
    Ok(())
}

/// Most recent battle records, newest first.
pub async fn load_recent_battles(limit: usize) -> Result<Vec<BattleRecord>, String> {
    let contents = match tokio::fs::read_to_string(battles_path()).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(format!("Failed to read battle log: {}", e)),
    };

    let mut records: Vec<BattleRecord> = Vec::new();
    for line in contents.lines().filter(|line| !line.trim().is_empty()) {
        let record = serde_json::from_str(line)
            .map_err(|e| format!("Battle log corrupted: {}", e))?;
        records.push(record);
    }
    if records.len() > limit {
        records.drain(..records.len() - limit);
    }
    records.reverse();
    Ok(records)
}

/// One favorites CSV line, assembled by the reducer from the favorite
/// entry plus whatever summary data is cached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FavoriteExportRow {
    pub pokemon_id: u16,
    pub pokemon_name: String,
    pub types: Vec<String>,
    pub hp: Option<u16>,
    pub attack: Option<u16>,
    pub defense: Option<u16>,
    pub added_at: DateTime<Utc>,
}

pub fn render_favorites_csv(rows: &[FavoriteExportRow]) -> String {
    let mut lines = vec![
        "Pokemon ID,Pokemon Name,Types,HP,Attack,Defense,Date Added".to_string(),
    ];
    for row in rows {
        let stat = |value: Option<u16>| value.map(|v| v.to_string()).unwrap_or_default();
        lines.push(format!(
            "{},{},{},{},{},{},{}",
            row.pokemon_id,
            row.pokemon_name,
            row.types.join("/"),
            stat(row.hp),
            stat(row.attack),
            stat(row.defense),
            row.added_at.format("%Y-%m-%d"),
        ));
    }
    lines.join("\n")
}

/// Writes the favorites CSV into the working directory and returns the
/// path it landed at.
pub async fn export_favorites_csv(rows: &[FavoriteExportRow]) -> Result<PathBuf, String> {
    let path = PathBuf::from(EXPORT_FILE_NAME);
    let csv = render_favorites_csv(rows);
    tokio::fs::write(&path, csv)
        .await
        .map_err(|e| format!("Failed to write CSV: {}", e))?;
    Ok(path)
}

async fn write_json<T: Serialize + ?Sized>(path: PathBuf, value: &T) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| format!("Failed to create data directory: {}", e))?;
    }
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize: {}", e))?;
    tokio::fs::write(&path, json)
        .await
        .map_err(|e| format!("Failed to write {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn csv_layout_matches_export_columns() {
        let added_at = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        let rows = vec![
            FavoriteExportRow {
                pokemon_id: 6,
                pokemon_name: "charizard".to_string(),
                types: vec!["fire".to_string(), "flying".to_string()],
                hp: Some(78),
                attack: Some(84),
                defense: Some(78),
                added_at,
            },
            FavoriteExportRow {
                pokemon_id: 151,
                pokemon_name: "mew".to_string(),
                types: Vec::new(),
                hp: None,
                attack: None,
                defense: None,
                added_at,
            },
        ];

        let csv = render_favorites_csv(&rows);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("Pokemon ID,Pokemon Name,Types,HP,Attack,Defense,Date Added")
        );
        assert_eq!(
            lines.next(),
            Some("6,charizard,fire/flying,78,84,78,2024-03-09")
        );
        assert_eq!(lines.next(), Some("151,mew,,,,,2024-03-09"));
        assert_eq!(lines.next(), None);
    }
}
