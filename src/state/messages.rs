use crate::state::network::LoadingState;
use crossterm::event::KeyEvent;
use gamesboard_api::{Bracket, DailyInfo, Event, Game, Team, TeamId};

#[derive(Debug, Clone, PartialEq)]
pub enum NetworkRequest {
    /// Registry for the schedule picker and bracket chips.
    LoadTeams,
    LoadSchedule { team: TeamId, day: u32 },
    LoadDailyInfo { day: u32 },
    LoadGames,
    WatchStandings,
    StopStandings,
    WatchBracket { game_id: String },
    StopBracket,
    AdjustPoints { team: TeamId, delta: f64 },
    SetPoints { team: TeamId, value: f64 },
}

#[derive(Debug)]
pub enum NetworkResponse {
    LoadingStateChanged { loading_state: LoadingState },
    TeamsLoaded { teams: Vec<Team> },
    StandingsUpdated { teams: Vec<Team> },
    ScheduleLoaded { team: TeamId, day: u32, events: Vec<Event> },
    DailyInfoLoaded { day: u32, info: Option<DailyInfo> },
    GamesLoaded { games: Vec<Game> },
    BracketUpdated { game_id: String, bracket: Option<Bracket> },
    PointsSaved { team: Team, message: String },
    WriteFailed { message: String },
    Error { message: String },
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    KeyPressed(KeyEvent),
    Resize,
    AppStarted,
    Tick,
}
