pub mod bracket;
pub mod client;
pub mod config;
pub mod firestore;
pub mod memory;
pub mod repository;
pub mod schedule;
pub mod seed;
pub mod standings;
pub mod store;

use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::fmt;

pub const TEAMS: &str = "teams";
pub const SCHEDULES: &str = "schedules";
pub const DAILY_INFO: &str = "dailyInfo";
pub const GAMES: &str = "games";
pub const BRACKETS: &str = "brackets";

// ---------------------------------------------------------------------------
// Domain types: clean model, independent of the Firestore wire format
// ---------------------------------------------------------------------------

/// Opaque team identifier.
///
/// Local seed data uses small integers, remote documents use string ids.
/// Both land here as their string form, so `TeamId::from(5)` and
/// `TeamId::from("5")` are the same team.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TeamId(String);

impl TeamId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TeamId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for TeamId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u32> for TeamId {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

/// Numeric ids sort numerically ("2" before "10"), everything else by text.
impl Ord for TeamId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0.parse::<u64>(), other.0.parse::<u64>()) {
            (Ok(a), Ok(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for TeamId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'de> Deserialize<'de> for TeamId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Int(i64),
            Float(f64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => TeamId(s),
            Raw::Int(n) => TeamId(n.to_string()),
            Raw::Float(f) => TeamId(f.to_string()),
        })
    }
}

/// Bracket slots use `null`, a missing key or an empty string for "TBD".
fn deserialize_slot<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<TeamId>, D::Error> {
    let id = Option::<TeamId>::deserialize(deserializer)?;
    Ok(id.filter(|id| !id.as_str().trim().is_empty()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub color: String, // "#RRGGBB"
    /// Derived from `color` once at construction; never recomputed.
    pub dark_text: bool,
    /// Never negative.
    pub points: f64,
}

impl Team {
    pub fn new(id: impl Into<TeamId>, name: impl Into<String>, color: impl Into<String>, points: f64) -> Self {
        let color = color.into();
        Self {
            id: id.into(),
            name: name.into(),
            dark_text: dark_text_for(&color),
            color,
            points: clamp_points(points),
        }
    }

    /// Keep an explicitly stored text-contrast flag instead of deriving it.
    pub fn with_dark_text(mut self, dark_text: bool) -> Self {
        self.dark_text = dark_text;
        self
    }
}

/// Clamp a points value to the valid range. NaN and infinities become 0.
pub fn clamp_points(points: f64) -> f64 {
    if points.is_finite() && points > 0.0 { points } else { 0.0 }
}

/// Parse `#RRGGBB` or the `#RGB` shorthand (leading `#` optional) into its
/// channels.
pub fn parse_hex_color(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.trim().trim_start_matches('#');
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some((channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
        3 => {
            let short = |i: usize| channel(&hex[i..=i]).map(|v| v * 17);
            Some((short(0)?, short(1)?, short(2)?))
        }
        _ => None,
    }
}

/// Relative luminance `(0.299 R + 0.587 G + 0.114 B) / 255`.
pub fn luminance(color: &str) -> f64 {
    let (r, g, b) = parse_hex_color(color).unwrap_or((0, 0, 0));
    (0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)) / 255.0
}

/// Dark text reads better on light backgrounds (luminance above one half).
pub fn dark_text_for(color: &str) -> bool {
    luminance(color) > 0.5
}

/// One scheduled event for a team on a given day. Identified only by its
/// position in the day's list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub time: String, // free text, "9:00 AM"
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
}

/// Announcements and practical info shared by every team for one day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyInfo {
    pub title: String,
    pub announcements: Vec<String>,
    pub tips: Vec<String>,
    pub locations: String,
    pub contact: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Game {
    pub id: String,
    pub name: String,
    pub status: GameStatus,
}

/// Game progress. Stored as free text; unknown values are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GameStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Other(String),
}

impl GameStatus {
    pub fn label(&self) -> &str {
        match self {
            GameStatus::NotStarted => "Not Started",
            GameStatus::InProgress => "In Progress",
            GameStatus::Completed => "Completed",
            GameStatus::Other(s) => s.as_str(),
        }
    }
}

impl From<&str> for GameStatus {
    fn from(s: &str) -> Self {
        match s.trim() {
            "" | "Not Started" => GameStatus::NotStarted,
            "In Progress" => GameStatus::InProgress,
            "Completed" | "Complete" | "Finished" => GameStatus::Completed,
            other => GameStatus::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Single-elimination bracket. The tree is implied by position: match `m` of
/// round `r` feeds match `m / 2` of round `r + 1`. The third-place decider is
/// tracked outside `rounds`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    #[serde(default)]
    pub rounds: Vec<Round>,
    #[serde(rename = "thirdPlace", default)]
    pub third_place: Option<Match>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Round {
    #[serde(default)]
    pub matches: Vec<Match>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Match {
    #[serde(default, deserialize_with = "deserialize_slot")]
    pub team1: Option<TeamId>, // None = TBD
    #[serde(default, deserialize_with = "deserialize_slot")]
    pub team2: Option<TeamId>,
    #[serde(default)]
    pub score1: Option<f64>,
    #[serde(default)]
    pub score2: Option<f64>,
    /// Should name `team1` or `team2`; not enforced on write.
    #[serde(default, deserialize_with = "deserialize_slot")]
    pub winner: Option<TeamId>,
    #[serde(default)]
    pub time: Option<String>,
}
