//! Bundled data used when no remote project is configured, and as the
//! last-known cache before the first successful remote read. Each file is an
//! array of documents shaped like the remote ones plus an `id` key.

use crate::memory::MemoryStore;
use crate::repository::{decode_bracket, decode_game, decode_team};
use crate::store::{Document, Fields, StoreError, StoreResult};
use crate::{BRACKETS, Bracket, DAILY_INFO, GAMES, Game, SCHEDULES, TEAMS, Team};
use serde_json::Value;

const TEAMS_JSON: &str = include_str!("../data/teams.json");
const SCHEDULES_JSON: &str = include_str!("../data/schedules.json");
const DAILY_INFO_JSON: &str = include_str!("../data/daily_info.json");
const GAMES_JSON: &str = include_str!("../data/games.json");
const BRACKETS_JSON: &str = include_str!("../data/brackets.json");

const BUNDLED: [(&str, &str); 5] = [
    (TEAMS, TEAMS_JSON),
    (SCHEDULES, SCHEDULES_JSON),
    (DAILY_INFO, DAILY_INFO_JSON),
    (GAMES, GAMES_JSON),
    (BRACKETS, BRACKETS_JSON),
];

/// Bundled documents of one collection; empty for unknown collections.
pub fn documents(collection: &str) -> StoreResult<Vec<Document>> {
    BUNDLED
        .iter()
        .find(|(name, _)| *name == collection)
        .map(|(name, json)| parse_documents(name, json))
        .unwrap_or_else(|| Ok(Vec::new()))
}

fn parse_documents(collection: &str, json: &str) -> StoreResult<Vec<Document>> {
    let rows: Vec<Fields> = serde_json::from_str(json)
        .map_err(|e| StoreError::Parsing(format!("bundled {collection}: {e}")))?;
    rows.into_iter()
        .map(|mut fields| {
            let id = match fields.remove("id") {
                Some(Value::String(s)) => s,
                Some(Value::Number(n)) => n.to_string(),
                _ => return Err(StoreError::Parsing(format!("bundled {collection}: document without id"))),
            };
            Ok(Document::new(id, fields))
        })
        .collect()
}

/// Fill `store` with every bundled collection.
pub fn load_into(store: &MemoryStore) {
    for (collection, _) in BUNDLED {
        match documents(collection) {
            Ok(docs) => store.replace_collection(collection, docs),
            Err(e) => log::error!("{e}"),
        }
    }
}

pub fn memory_store() -> MemoryStore {
    let store = MemoryStore::new();
    load_into(&store);
    store
}

/// The bundled team registry in file order.
pub fn teams() -> Vec<Team> {
    documents(TEAMS)
        .unwrap_or_default()
        .iter()
        .filter_map(|doc| decode_team(doc).ok())
        .collect()
}

pub fn games() -> Vec<Game> {
    documents(GAMES)
        .unwrap_or_default()
        .iter()
        .filter_map(|doc| decode_game(doc).ok())
        .collect()
}

/// Bundled brackets keyed by game id.
pub fn brackets() -> Vec<(String, Bracket)> {
    documents(BRACKETS)
        .unwrap_or_default()
        .iter()
        .filter_map(|doc| Some((doc.id.clone(), decode_bracket(doc).ok()?)))
        .collect()
}
