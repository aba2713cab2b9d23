use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::fs;

use crate::state::{CatalogEntry, PokemonSummary};

const API_BASE: &str = "https://pokeapi.co/api/v2";

#[derive(Clone, Debug, Deserialize)]
struct NamedResource {
    name: String,
    #[serde(default)]
    url: String,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonIndexResponse {
    results: Vec<NamedResource>,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonResponse {
    id: u16,
    name: String,
    stats: Vec<PokemonStatSlot>,
    types: Vec<PokemonTypeSlot>,
    sprites: serde_json::Value,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonStatSlot {
    base_stat: u16,
    stat: NamedResource,
}

#[derive(Clone, Debug, Deserialize)]
struct PokemonTypeSlot {
    slot: u8,
    #[serde(rename = "type")]
    kind: NamedResource,
}

pub async fn fetch_catalog(limit: u16) -> Result<Vec<CatalogEntry>, String> {
    let url = format!("{API_BASE}/pokemon?limit={limit}");
    let response: PokemonIndexResponse = fetch_json_cached(&url).await?;
    Ok(response
        .results
        .into_iter()
        .filter_map(|resource| {
            id_from_url(&resource.url).map(|id| CatalogEntry {
                id,
                name: resource.name,
            })
        })
        .collect())
}

pub async fn fetch_pokemon(name: &str) -> Result<PokemonSummary, String> {
    let url = format!("{API_BASE}/pokemon/{name}");
    let response: PokemonResponse = fetch_json_cached(&url).await?;

    let get_stat = |stat_name: &str| -> Option<u16> {
        response
            .stats
            .iter()
            .find(|slot| slot.stat.name == stat_name)
            .map(|slot| slot.base_stat)
    };

    let mut types = response.types.clone();
    types.sort_by_key(|slot| slot.slot);

    Ok(PokemonSummary {
        id: response.id,
        name: response.name,
        types: types.into_iter().map(|slot| slot.kind.name).collect(),
        hp: get_stat("hp"),
        attack: get_stat("attack"),
        defense: get_stat("defense"),
        speed: get_stat("speed"),
        sprite_front: pointer_string(&response.sprites, "/front_default"),
    })
}

/// Fetches the arena roster: the first `count` catalog entries with full
/// stats, in dex order.
pub async fn fetch_roster(count: u16) -> Result<Vec<PokemonSummary>, String> {
    let catalog = fetch_catalog(count).await?;
    let mut roster = Vec::with_capacity(catalog.len());
    for entry in catalog {
        roster.push(fetch_pokemon(&entry.name).await?);
    }
    Ok(roster)
}

pub async fn fetch_bytes(url: &str) -> Result<Vec<u8>, String> {
    fetch_bytes_cached(url).await
}

fn id_from_url(url: &str) -> Option<u16> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse().ok())
}

fn pointer_string(value: &serde_json::Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(|val| val.as_str())
        .map(|s| s.to_string())
}

async fn fetch_json_cached<T: serde::de::DeserializeOwned>(url: &str) -> Result<T, String> {
    let bytes = fetch_bytes_cached(url).await?;
    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(value),
        Err(err) => {
            // A stale or truncated cache entry must not wedge the app.
            let cache_path = cache_path("http", url);
            let _ = fs::remove_file(&cache_path).await;
            Err(err.to_string())
        }
    }
}

async fn fetch_bytes_cached(url: &str) -> Result<Vec<u8>, String> {
    let cache_path = cache_path("http", url);
    if let Some(bytes) = read_cache(&cache_path).await {
        return Ok(bytes);
    }

    let client = http_client();
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|err| err.to_string())?;
    let response = response.error_for_status().map_err(|err| err.to_string())?;
    let bytes = response
        .bytes()
        .await
        .map_err(|err| err.to_string())?
        .to_vec();
    write_cache(&cache_path, &bytes).await;
    Ok(bytes)
}

fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(reqwest::Client::new)
}

fn cache_root() -> PathBuf {
    let base = dirs_next::cache_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("pokearena")
}

fn cache_path(kind: &str, url: &str) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = hex::encode(hasher.finalize());
    cache_root().join(kind).join(digest)
}

async fn read_cache(path: &Path) -> Option<Vec<u8>> {
    if let Ok(bytes) = fs::read(path).await {
        return Some(bytes);
    }
    None
}

async fn write_cache(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent).await;
    }
    let _ = fs::write(path, bytes).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_id_from_resource_url() {
        assert_eq!(
            id_from_url("https://pokeapi.co/api/v2/pokemon/25/"),
            Some(25)
        );
        assert_eq!(id_from_url("https://pokeapi.co/api/v2/pokemon/151"), Some(151));
        assert_eq!(id_from_url("not-a-url"), None);
    }
}
