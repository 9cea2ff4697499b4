use crate::memory::MemoryStore;
use crate::schedule::{TeamSchedule, clean_events};
use crate::seed;
use crate::standings::{Standings, adjusted};
use crate::store::{Document, DocumentStore, Fields, OrderBy, Query, Snapshot, StoreError, StoreResult, Subscription};
use crate::{BRACKETS, Bracket, DAILY_INFO, DailyInfo, Event, GAMES, Game, GameStatus, SCHEDULES, TEAMS, Team, TeamId, clamp_points};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// Document shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamRecord {
    id: TeamId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    color: String,
    #[serde(default)]
    points: Option<f64>,
    #[serde(default)]
    dark_text: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct GameRecord {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    status: Option<String>,
}

pub fn decode_team(doc: &Document) -> StoreResult<Team> {
    let record: TeamRecord = doc.decode()?;
    let team = Team::new(record.id, record.name, record.color, record.points.unwrap_or_default());
    Ok(match record.dark_text {
        Some(dark) => team.with_dark_text(dark),
        None => team,
    })
}

pub fn decode_game(doc: &Document) -> StoreResult<Game> {
    let record: GameRecord = doc.decode()?;
    let name = if record.name.trim().is_empty() { record.id.clone() } else { record.name };
    Ok(Game {
        id: record.id,
        name,
        status: record.status.as_deref().map(GameStatus::from).unwrap_or_default(),
    })
}

pub fn decode_bracket(doc: &Document) -> StoreResult<Bracket> {
    doc.decode()
}

/// Teams in a collection snapshot; undecodable documents are skipped.
pub fn teams_from_snapshot(snapshot: &Snapshot) -> Vec<Team> {
    match snapshot {
        Snapshot::Collection(docs) => decode_all(docs, decode_team),
        Snapshot::Document(doc) => doc.iter().filter_map(|d| decode_team(d).ok()).collect(),
    }
}

/// Bracket in a document snapshot; `None` when absent or malformed.
pub fn bracket_from_snapshot(snapshot: &Snapshot) -> Option<Bracket> {
    match snapshot {
        Snapshot::Document(Some(doc)) => decode_bracket(doc)
            .map_err(|e| warn!("{e}"))
            .ok(),
        _ => None,
    }
}

fn decode_all<T>(docs: &[Document], decode: impl Fn(&Document) -> StoreResult<T>) -> Vec<T> {
    docs.iter()
        .filter_map(|doc| decode(doc).map_err(|e| warn!("skipping {}: {e}", doc.id)).ok())
        .collect()
}

/// Points are stored as integers when whole, like the web client does.
fn points_value(points: f64) -> Value {
    if points.fract() == 0.0 && points.abs() < 9_007_199_254_740_992.0 {
        json!(points as i64)
    } else {
        json!(points)
    }
}

fn to_fields(value: Value) -> StoreResult<Fields> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Other(format!("expected an object, got {other}"))),
    }
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// Typed access to the board's collections.
///
/// Reads never fail: when the store is unreachable they log and answer from
/// the last data seen, which starts out as the bundled data. Writes report
/// their errors.
#[derive(Debug, Clone)]
pub struct Repository<S> {
    store: S,
    cache: MemoryStore,
}

impl<S: DocumentStore> Repository<S> {
    pub fn new(store: S) -> Self {
        Self { store, cache: seed::memory_store() }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn read_list(&self, collection: &str, order: Option<&OrderBy>) -> Vec<Document> {
        match self.store.list(collection, order).await {
            Ok(docs) => {
                if order.is_none() {
                    self.cache.replace_collection(collection, docs.clone());
                } else {
                    for doc in &docs {
                        self.cache.put(collection, &doc.id, doc.fields.clone());
                    }
                }
                docs
            }
            Err(e) => {
                warn!("reading {collection} failed, using last known data: {e}");
                self.cache.list_now(collection, order)
            }
        }
    }

    async fn read_doc(&self, collection: &str, id: &str) -> Option<Document> {
        match self.store.get(collection, id).await {
            Ok(Some(doc)) => {
                self.cache.put(collection, id, doc.fields.clone());
                Some(doc)
            }
            Ok(None) => {
                self.cache.remove(collection, id);
                None
            }
            Err(e) => {
                warn!("reading {collection}/{id} failed, using last known data: {e}");
                self.cache.get_now(collection, id)
            }
        }
    }

    async fn write(&self, collection: &str, id: &str, fields: Fields, merge: bool) -> StoreResult<()> {
        debug!("writing {collection}/{id}");
        self.store.set(collection, id, fields.clone(), merge).await?;
        self.cache.write(collection, id, fields, merge);
        Ok(())
    }

    // --- teams -------------------------------------------------------------

    /// All teams, alphabetical.
    pub async fn teams(&self) -> Vec<Team> {
        decode_all(&self.read_list(TEAMS, Some(&OrderBy::asc("name"))).await, decode_team)
    }

    /// The standings engine over every team, in id order so ties are stable.
    pub async fn standings(&self) -> Standings {
        Standings::from_unordered(decode_all(&self.read_list(TEAMS, None).await, decode_team))
    }

    /// Add `delta` (negative to remove) inside a transaction; never below 0.
    pub async fn adjust_points(&self, id: &TeamId, delta: f64) -> StoreResult<Team> {
        let merged = self
            .store
            .transact(TEAMS, id.as_str(), |current| {
                let current = current.ok_or_else(|| StoreError::NotFound(format!("{TEAMS}/{id}")))?;
                let points = current.get("points").and_then(Value::as_f64).unwrap_or_default();
                to_fields(json!({ "points": points_value(adjusted(points, delta)) }))
            })
            .await?;
        self.cache.put(TEAMS, id.as_str(), merged.clone());
        decode_team(&Document::new(id.as_str(), merged))
    }

    pub async fn set_points(&self, id: &TeamId, value: f64) -> StoreResult<Team> {
        let fields = to_fields(json!({ "points": points_value(clamp_points(value)) }))?;
        self.store.update(TEAMS, id.as_str(), fields.clone()).await?;
        self.cache.write(TEAMS, id.as_str(), fields, true);
        match self.read_doc(TEAMS, id.as_str()).await {
            Some(doc) => decode_team(&doc),
            None => Err(StoreError::NotFound(format!("{TEAMS}/{id}"))),
        }
    }

    pub fn subscribe_standings(&self) -> Subscription {
        self.store.subscribe(Query::collection(TEAMS, None))
    }

    // --- schedules ---------------------------------------------------------

    pub async fn team_schedule(&self, team: &TeamId) -> TeamSchedule {
        let Some(doc) = self.read_doc(SCHEDULES, team.as_str()).await else {
            return TeamSchedule::new();
        };
        doc.fields
            .iter()
            .filter_map(|(day, events)| {
                let day = day.parse::<u32>().ok()?;
                let events = serde_json::from_value::<Vec<Event>>(events.clone())
                    .map_err(|e| warn!("schedule {team} day {day}: {e}"))
                    .ok()?;
                Some((day, events))
            })
            .collect()
    }

    /// Events of one team on one day; empty when nothing is scheduled.
    pub async fn schedule(&self, team: &TeamId, day: u32) -> Vec<Event> {
        self.team_schedule(team).await.remove(&day).unwrap_or_default()
    }

    /// Replace one day of a team's schedule, leaving other days alone.
    /// Incomplete events are dropped; the stored list is returned.
    pub async fn set_schedule(&self, team: &TeamId, day: u32, events: Vec<Event>) -> StoreResult<Vec<Event>> {
        let events = clean_events(events);
        let mut fields = Fields::new();
        fields.insert(
            day.to_string(),
            serde_json::to_value(&events).map_err(|e| StoreError::Other(e.to_string()))?,
        );
        self.write(SCHEDULES, team.as_str(), fields, true).await?;
        Ok(events)
    }

    // --- daily info --------------------------------------------------------

    pub async fn daily_info(&self, day: u32) -> Option<DailyInfo> {
        let doc = self.read_doc(DAILY_INFO, &day.to_string()).await?;
        doc.decode().map_err(|e| warn!("daily info {day}: {e}")).ok()
    }

    pub async fn set_daily_info(&self, day: u32, info: &DailyInfo) -> StoreResult<()> {
        let value = serde_json::to_value(info).map_err(|e| StoreError::Other(e.to_string()))?;
        self.write(DAILY_INFO, &day.to_string(), to_fields(value)?, false).await
    }

    // --- games -------------------------------------------------------------

    /// Games in stored order, or the bundled list when none are stored.
    pub async fn games(&self) -> Vec<Game> {
        let games = decode_all(&self.read_list(GAMES, None).await, decode_game);
        if games.is_empty() {
            debug!("no games stored, using bundled list");
            return seed::games();
        }
        games
    }

    pub async fn set_game(&self, game: &Game) -> StoreResult<()> {
        let fields = to_fields(json!({ "name": game.name, "status": game.status.label() }))?;
        self.write(GAMES, &game.id, fields, true).await
    }

    pub async fn set_game_status(&self, id: &str, status: GameStatus) -> StoreResult<Game> {
        let mut game = self
            .games()
            .await
            .into_iter()
            .find(|g| g.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("{GAMES}/{id}")))?;
        game.status = status;
        self.set_game(&game).await?;
        Ok(game)
    }

    // --- brackets ----------------------------------------------------------

    pub async fn bracket(&self, game_id: &str) -> Option<Bracket> {
        let doc = self.read_doc(BRACKETS, game_id).await?;
        decode_bracket(&doc).map_err(|e| warn!("{e}")).ok()
    }

    pub async fn set_bracket(&self, game_id: &str, bracket: &Bracket) -> StoreResult<()> {
        let value = serde_json::to_value(bracket).map_err(|e| StoreError::Other(e.to_string()))?;
        self.write(BRACKETS, game_id, to_fields(value)?, false).await
    }

    pub fn subscribe_bracket(&self, game_id: &str) -> Subscription {
        self.store.subscribe(Query::document(BRACKETS, game_id))
    }
}
