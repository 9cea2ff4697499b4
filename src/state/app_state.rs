use crate::app::MenuItem;
use gamesboard_api::bracket::{BracketLayout, render};
use gamesboard_api::schedule::DAYS;
use gamesboard_api::standings::{Standings, parse_points};
use gamesboard_api::{Bracket, DailyInfo, Event, Game, Team, TeamId};
use std::time::{Duration, Instant};

/// Quick amounts offered by the points panel.
pub const QUICK_AMOUNTS: [f64; 6] = [1.0, 5.0, 10.0, 25.0, 50.0, 100.0];

/// How long a write result stays on screen.
pub const NOTICE_TTL: Duration = Duration::from_secs(3);

// ---------------------------------------------------------------------------
// Standings + points administration
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct StandingsState {
    pub standings: Standings,
    /// Sorted view of `standings`, rebuilt on every update.
    pub ranked: Vec<Team>,
    pub loaded: bool,
    pub scroll_offset: u16,
}

impl StandingsState {
    pub fn update(&mut self, teams: Vec<Team>) {
        self.ranked = self.standings.replace(teams).standings();
        self.loaded = true;
    }

    pub fn upsert(&mut self, team: Team) {
        self.standings.upsert(team);
        self.ranked = self.standings.standings();
    }
}

#[derive(Debug, Default)]
pub struct AdminState {
    pub enabled: bool,
    pub selected: Option<TeamId>,
    pub amount_idx: usize,
    /// Exact-value entry; `Some` while the input line is open.
    pub input: Option<String>,
}

impl AdminState {
    pub fn amount(&self) -> f64 {
        QUICK_AMOUNTS[self.amount_idx % QUICK_AMOUNTS.len()]
    }

    pub fn next_amount(&mut self) {
        self.amount_idx = (self.amount_idx + 1) % QUICK_AMOUNTS.len();
    }

    pub fn prev_amount(&mut self) {
        self.amount_idx = (self.amount_idx + QUICK_AMOUNTS.len() - 1) % QUICK_AMOUNTS.len();
    }

    /// Move the selection `step` rows within `ranked`, keeping it on the same
    /// team across re-sorts.
    pub fn move_selection(&mut self, ranked: &[Team], step: isize) {
        if ranked.is_empty() {
            self.selected = None;
            return;
        }
        let current = self
            .selected
            .as_ref()
            .and_then(|id| ranked.iter().position(|t| &t.id == id));
        let next = match current {
            Some(pos) => pos.saturating_add_signed(step).min(ranked.len() - 1),
            None => 0,
        };
        self.selected = Some(ranked[next].id.clone());
    }

    pub fn push_input(&mut self, c: char) {
        if let Some(input) = self.input.as_mut()
            && (c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
            && input.len() < 16
        {
            input.push(c);
        }
    }

    /// Close the input line, returning the value typed.
    pub fn take_input(&mut self) -> Option<f64> {
        self.input.take().map(|text| parse_points(&text))
    }
}

// ---------------------------------------------------------------------------
// Schedule + daily info
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ScheduleState {
    pub selected_team: usize,
    pub day: u32,
    pub events: Vec<Event>,
    /// Which (team, day) `events` belongs to.
    pub events_for: Option<(TeamId, u32)>,
    pub info: Option<DailyInfo>,
    pub info_day: Option<u32>,
    pub show_info: bool,
}

impl Default for ScheduleState {
    fn default() -> Self {
        Self {
            selected_team: 0,
            day: *DAYS.start(),
            events: Vec::new(),
            events_for: None,
            info: None,
            info_day: None,
            show_info: true,
        }
    }
}

impl ScheduleState {
    pub fn next_day(&mut self) -> bool {
        if self.day < *DAYS.end() {
            self.day += 1;
            return true;
        }
        false
    }

    pub fn prev_day(&mut self) -> bool {
        if self.day > *DAYS.start() {
            self.day -= 1;
            return true;
        }
        false
    }

    pub fn set_day(&mut self, day: u32) -> bool {
        if DAYS.contains(&day) && day != self.day {
            self.day = day;
            return true;
        }
        false
    }

    pub fn team_down(&mut self, team_count: usize) -> bool {
        if self.selected_team + 1 < team_count {
            self.selected_team += 1;
            return true;
        }
        false
    }

    pub fn team_up(&mut self) -> bool {
        if self.selected_team > 0 {
            self.selected_team -= 1;
            return true;
        }
        false
    }

    /// Loaded events only if they belong to the current selection.
    pub fn current_events(&self, team: Option<&TeamId>) -> Option<&[Event]> {
        match (&self.events_for, team) {
            (Some((id, day)), Some(team)) if id == team && *day == self.day => Some(&self.events),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Games + brackets
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct BracketsState {
    pub games: Vec<Game>,
    pub selected_game: usize,
    /// Game whose bracket is open, with its latest snapshot.
    pub open: Option<OpenBracket>,
}

#[derive(Debug)]
pub struct OpenBracket {
    pub game_id: String,
    pub bracket: Option<Bracket>,
    pub loaded: bool,
    pub scroll_offset: u16,
    pub first_column: usize,
}

impl OpenBracket {
    pub fn new(game_id: String) -> Self {
        Self { game_id, bracket: None, loaded: false, scroll_offset: 0, first_column: 0 }
    }

    pub fn layout(&self, teams: &[Team]) -> BracketLayout {
        render(self.bracket.as_ref(), teams)
    }
}

impl BracketsState {
    pub fn set_games(&mut self, games: Vec<Game>) {
        let selected_id = self.games.get(self.selected_game).map(|g| g.id.clone());
        self.games = games;
        self.selected_game = selected_id
            .and_then(|id| self.games.iter().position(|g| g.id == id))
            .unwrap_or(0)
            .min(self.games.len().saturating_sub(1));
    }

    pub fn game_down(&mut self) {
        if self.selected_game + 1 < self.games.len() {
            self.selected_game += 1;
        }
    }

    pub fn game_up(&mut self) {
        self.selected_game = self.selected_game.saturating_sub(1);
    }

    pub fn selected(&self) -> Option<&Game> {
        self.games.get(self.selected_game)
    }

    pub fn open_game_name(&self) -> Option<&str> {
        let open = self.open.as_ref()?;
        Some(
            self.games
                .iter()
                .find(|g| g.id == open.game_id)
                .map(|g| g.name.as_str())
                .unwrap_or(open.game_id.as_str()),
        )
    }
}

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub message: String,
    pub kind: NoticeKind,
    pub shown_at: Instant,
}

impl Notice {
    pub fn new(message: impl Into<String>, kind: NoticeKind) -> Self {
        Self { message: message.into(), kind, shown_at: Instant::now() }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.shown_at) >= NOTICE_TTL
    }
}

// ---------------------------------------------------------------------------
// Top-level state
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppState {
    pub active_tab: MenuItem,
    pub previous_tab: MenuItem,
    pub show_logs: bool,
    /// `firestore` or `local`, shown in the tab bar.
    pub backend: &'static str,
    /// Registry in picker order (alphabetical).
    pub teams: Vec<Team>,
    pub standings: StandingsState,
    pub admin: AdminState,
    pub schedule: ScheduleState,
    pub brackets: BracketsState,
    pub notice: Option<Notice>,
    pub last_error: Option<String>,
}

impl AppState {
    pub fn new(backend: &'static str) -> Self {
        Self {
            active_tab: MenuItem::default(),
            previous_tab: MenuItem::default(),
            show_logs: false,
            backend,
            teams: Vec::new(),
            standings: StandingsState::default(),
            admin: AdminState::default(),
            schedule: ScheduleState::default(),
            brackets: BracketsState::default(),
            notice: None,
            last_error: None,
        }
    }

    pub fn selected_schedule_team(&self) -> Option<&Team> {
        self.teams.get(self.schedule.selected_team)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked() -> Vec<Team> {
        vec![
            Team::new(2, "Arts", "#000000", 300.0),
            Team::new(1, "Nursing", "#FFFFFF", 200.0),
            Team::new(3, "Law", "#FF0000", 100.0),
        ]
    }

    #[tokio::test]
    async fn subscription_ranking_matches_repository_on_ties() {
        use gamesboard_api::memory::MemoryStore;
        use gamesboard_api::repository::{Repository, teams_from_snapshot};
        use serde_json::json;

        let store = MemoryStore::new();
        for id in ["10", "2"] {
            let serde_json::Value::Object(fields) = json!({ "name": format!("Team {id}"), "color": "#1255CC", "points": 5 })
            else {
                panic!("object")
            };
            store.put("teams", id, fields);
        }
        let repo = Repository::new(store);

        let mut sub = repo.subscribe_standings();
        let snapshot = sub.next().await.unwrap();
        let mut state = StandingsState::default();
        state.update(teams_from_snapshot(&snapshot));

        let from_repo: Vec<TeamId> = repo.standings().await.standings().into_iter().map(|t| t.id).collect();
        let from_view: Vec<TeamId> = state.ranked.iter().map(|t| t.id.clone()).collect();
        assert_eq!(from_view, vec![TeamId::from(2), TeamId::from(10)]);
        assert_eq!(from_view, from_repo);
    }

    #[test]
    fn quick_amounts_cycle_both_ways() {
        let mut admin = AdminState::default();
        assert_eq!(admin.amount(), 1.0);
        admin.prev_amount();
        assert_eq!(admin.amount(), 100.0);
        admin.next_amount();
        admin.next_amount();
        assert_eq!(admin.amount(), 5.0);
    }

    #[test]
    fn selection_follows_team_and_clamps() {
        let mut admin = AdminState::default();
        let teams = ranked();
        admin.move_selection(&teams, 1);
        assert_eq!(admin.selected, Some(TeamId::from(2)));
        admin.move_selection(&teams, 5);
        assert_eq!(admin.selected, Some(TeamId::from(3)));
        admin.move_selection(&teams, -10);
        assert_eq!(admin.selected, Some(TeamId::from(2)));

        let mut resorted = teams.clone();
        resorted.reverse();
        admin.move_selection(&resorted, 0);
        assert_eq!(admin.selected, Some(TeamId::from(2)));
    }

    #[test]
    fn exact_input_accepts_numbers_only() {
        let mut admin = AdminState::default();
        admin.push_input('5');
        assert_eq!(admin.input, None);

        admin.input = Some(String::new());
        for c in "1,2x50.5".chars() {
            admin.push_input(c);
        }
        assert_eq!(admin.input.as_deref(), Some("1,250.5"));
        assert_eq!(admin.take_input(), Some(1250.5));
        assert_eq!(admin.input, None);

        admin.input = Some("abc".into());
        assert_eq!(admin.take_input(), Some(0.0));
    }

    #[test]
    fn days_stay_in_range() {
        let mut schedule = ScheduleState::default();
        assert!(!schedule.prev_day());
        assert!(schedule.set_day(5));
        assert!(!schedule.next_day());
        assert!(!schedule.set_day(6));
        assert!(!schedule.set_day(5));
        assert_eq!(schedule.day, 5);
    }

    #[test]
    fn stale_events_are_not_shown() {
        let mut schedule = ScheduleState::default();
        schedule.events = vec![Event::new("9:00", "Quiz", "")];
        schedule.events_for = Some((TeamId::from(1), 1));
        assert!(schedule.current_events(Some(&TeamId::from(1))).is_some());
        assert!(schedule.current_events(Some(&TeamId::from(2))).is_none());
        schedule.next_day();
        assert!(schedule.current_events(Some(&TeamId::from(1))).is_none());
    }

    #[test]
    fn games_refresh_keeps_selection() {
        let game = |id: &str| Game { id: id.into(), name: id.into(), status: Default::default() };
        let mut brackets = BracketsState::default();
        brackets.set_games(vec![game("a"), game("b"), game("c")]);
        brackets.game_down();
        brackets.game_down();
        brackets.set_games(vec![game("c"), game("a")]);
        assert_eq!(brackets.selected().map(|g| g.id.as_str()), Some("c"));
        brackets.set_games(Vec::new());
        assert_eq!(brackets.selected_game, 0);
    }

    #[test]
    fn notices_expire() {
        let notice = Notice::new("Saved", NoticeKind::Success);
        assert!(!notice.is_expired(notice.shown_at + Duration::from_secs(2)));
        assert!(notice.is_expired(notice.shown_at + NOTICE_TTL));
    }
}
