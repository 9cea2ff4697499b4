use crate::state::app_settings::AppSettings;
use crate::state::app_state::{AppState, Notice, NoticeKind, OpenBracket};
use crate::state::messages::NetworkRequest;
use gamesboard_api::{Bracket, DailyInfo, Event, Game, Team, TeamId};
use std::time::Instant;

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum MenuItem {
    #[default]
    Standings,
    Schedule,
    Brackets,
    Help,
}

pub struct App {
    pub settings: AppSettings,
    pub state: AppState,
}

impl App {
    pub fn new(settings: AppSettings, backend: &'static str) -> Self {
        let app = Self { state: AppState::new(backend), settings };

        if let Some(level) = app.settings.log_level {
            log::set_max_level(level);
            tui_logger::set_default_level(level);
        }

        app
    }

    /// Requests that fill the first screen.
    pub fn startup_requests(&self) -> Vec<NetworkRequest> {
        vec![NetworkRequest::LoadTeams, NetworkRequest::LoadGames, NetworkRequest::WatchStandings]
    }

    // -----------------------------------------------------------------------
    // Network response handlers, called from main_ui_loop
    // -----------------------------------------------------------------------

    /// The registry may arrive after the schedule tab was opened; the
    /// returned requests load the selection once it is known.
    pub fn on_teams_loaded(&mut self, teams: Vec<Team>) -> Vec<NetworkRequest> {
        let had_teams = !self.state.teams.is_empty();
        self.state.teams = teams;
        self.state.schedule.selected_team =
            self.state.schedule.selected_team.min(self.state.teams.len().saturating_sub(1));
        if !had_teams && self.state.active_tab == MenuItem::Schedule {
            return self.schedule_requests();
        }
        Vec::new()
    }

    pub fn on_standings_updated(&mut self, teams: Vec<Team>) {
        self.state.last_error = None;
        self.state.standings.update(teams);
        if self.state.admin.enabled && self.state.admin.selected.is_none() {
            self.state.admin.move_selection(&self.state.standings.ranked, 0);
        }
    }

    pub fn on_schedule_loaded(&mut self, team: TeamId, day: u32, events: Vec<Event>) {
        self.state.schedule.events = events;
        self.state.schedule.events_for = Some((team, day));
    }

    pub fn on_daily_info_loaded(&mut self, day: u32, info: Option<DailyInfo>) {
        self.state.schedule.info = info;
        self.state.schedule.info_day = Some(day);
    }

    pub fn on_games_loaded(&mut self, games: Vec<Game>) {
        self.state.brackets.set_games(games);
    }

    /// Snapshots for a bracket that is no longer open are dropped.
    pub fn on_bracket_updated(&mut self, game_id: String, bracket: Option<Bracket>) {
        if let Some(open) = self.state.brackets.open.as_mut()
            && open.game_id == game_id
        {
            open.bracket = bracket;
            open.loaded = true;
        }
    }

    pub fn on_points_saved(&mut self, team: Team, message: String) {
        self.state.standings.upsert(team);
        self.state.notice = Some(Notice::new(message, NoticeKind::Success));
    }

    pub fn on_write_failed(&mut self, message: String) {
        self.state.notice = Some(Notice::new(message, NoticeKind::Error));
    }

    pub fn on_error(&mut self, message: String) {
        self.state.last_error = Some(message);
    }

    /// Returns true when a notice was cleared and the screen needs a redraw.
    pub fn expire_notice(&mut self, now: Instant) -> bool {
        if self.state.notice.as_ref().is_some_and(|n| n.is_expired(now)) {
            self.state.notice = None;
            return true;
        }
        false
    }

    // -----------------------------------------------------------------------
    // Tab management
    // -----------------------------------------------------------------------

    /// Switch tabs. Subscriptions belong to their tab: leaving stops them,
    /// entering starts them.
    pub fn update_tab(&mut self, next: MenuItem) -> Vec<NetworkRequest> {
        if self.state.active_tab == next {
            return Vec::new();
        }
        let mut requests = Vec::new();
        match self.state.active_tab {
            MenuItem::Standings => {
                requests.push(NetworkRequest::StopStandings);
                self.state.admin.input = None;
            }
            MenuItem::Brackets => {
                if self.state.brackets.open.take().is_some() {
                    requests.push(NetworkRequest::StopBracket);
                }
            }
            MenuItem::Schedule | MenuItem::Help => {}
        }

        self.state.previous_tab = self.state.active_tab;
        self.state.active_tab = next;

        match next {
            MenuItem::Standings => requests.push(NetworkRequest::WatchStandings),
            MenuItem::Schedule => requests.extend(self.schedule_requests()),
            MenuItem::Brackets => requests.push(NetworkRequest::LoadGames),
            MenuItem::Help => {}
        }
        requests
    }

    pub fn exit_help(&mut self) -> Vec<NetworkRequest> {
        if self.state.active_tab == MenuItem::Help {
            return self.update_tab(self.state.previous_tab);
        }
        Vec::new()
    }

    pub fn toggle_show_logs(&mut self) {
        self.state.show_logs = !self.state.show_logs;
    }

    pub fn toggle_full_screen(&mut self) {
        self.settings.full_screen = !self.settings.full_screen;
    }

    // -----------------------------------------------------------------------
    // Standings + points admin
    // -----------------------------------------------------------------------

    pub fn toggle_admin(&mut self) {
        let admin = &mut self.state.admin;
        admin.enabled = !admin.enabled;
        admin.input = None;
        if admin.enabled && admin.selected.is_none() {
            admin.move_selection(&self.state.standings.ranked, 0);
        }
    }

    pub fn standings_move(&mut self, step: isize) {
        if self.state.admin.enabled {
            self.state.admin.move_selection(&self.state.standings.ranked, step);
        } else if step > 0 {
            self.state.standings.scroll_offset = self.state.standings.scroll_offset.saturating_add(1);
        } else {
            self.state.standings.scroll_offset = self.state.standings.scroll_offset.saturating_sub(1);
        }
    }

    /// Add (`sign > 0`) or remove the current quick amount.
    pub fn admin_adjust(&mut self, sign: f64) -> Option<NetworkRequest> {
        let admin = &self.state.admin;
        if !admin.enabled || admin.input.is_some() {
            return None;
        }
        let team = admin.selected.clone()?;
        Some(NetworkRequest::AdjustPoints { team, delta: sign.signum() * admin.amount() })
    }

    pub fn admin_open_input(&mut self) {
        if self.state.admin.enabled && self.state.admin.selected.is_some() {
            self.state.admin.input = Some(String::new());
        }
    }

    pub fn admin_submit_input(&mut self) -> Option<NetworkRequest> {
        let value = self.state.admin.take_input()?;
        let team = self.state.admin.selected.clone()?;
        Some(NetworkRequest::SetPoints { team, value })
    }

    // -----------------------------------------------------------------------
    // Schedule
    // -----------------------------------------------------------------------

    fn schedule_requests(&self) -> Vec<NetworkRequest> {
        let day = self.state.schedule.day;
        let mut requests = Vec::with_capacity(2);
        if let Some(team) = self.state.selected_schedule_team() {
            requests.push(NetworkRequest::LoadSchedule { team: team.id.clone(), day });
        }
        if self.state.schedule.info_day != Some(day) {
            requests.push(NetworkRequest::LoadDailyInfo { day });
        }
        requests
    }

    pub fn schedule_team_down(&mut self) -> Vec<NetworkRequest> {
        if self.state.schedule.team_down(self.state.teams.len()) {
            return self.schedule_requests();
        }
        Vec::new()
    }

    pub fn schedule_team_up(&mut self) -> Vec<NetworkRequest> {
        if self.state.schedule.team_up() {
            return self.schedule_requests();
        }
        Vec::new()
    }

    pub fn schedule_next_day(&mut self) -> Vec<NetworkRequest> {
        if self.state.schedule.next_day() {
            return self.schedule_requests();
        }
        Vec::new()
    }

    pub fn schedule_prev_day(&mut self) -> Vec<NetworkRequest> {
        if self.state.schedule.prev_day() {
            return self.schedule_requests();
        }
        Vec::new()
    }

    pub fn schedule_set_day(&mut self, day: u32) -> Vec<NetworkRequest> {
        if self.state.schedule.set_day(day) {
            return self.schedule_requests();
        }
        Vec::new()
    }

    pub fn toggle_daily_info(&mut self) {
        self.state.schedule.show_info = !self.state.schedule.show_info;
    }

    // -----------------------------------------------------------------------
    // Brackets
    // -----------------------------------------------------------------------

    pub fn open_bracket(&mut self) -> Option<NetworkRequest> {
        let game_id = self.state.brackets.selected()?.id.clone();
        self.state.brackets.open = Some(OpenBracket::new(game_id.clone()));
        Some(NetworkRequest::WatchBracket { game_id })
    }

    pub fn close_bracket(&mut self) -> Option<NetworkRequest> {
        self.state.brackets.open.take().map(|_| NetworkRequest::StopBracket)
    }

    pub fn bracket_scroll(&mut self, rows: i16) {
        if let Some(open) = self.state.brackets.open.as_mut() {
            open.scroll_offset = open.scroll_offset.saturating_add_signed(rows);
        }
    }

    pub fn bracket_pan(&mut self, columns: isize) {
        if let Some(open) = self.state.brackets.open.as_mut() {
            open.first_column = open.first_column.saturating_add_signed(columns);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamesboard_api::seed;

    fn app() -> App {
        let mut app = App::new(AppSettings::default(), "local");
        app.on_teams_loaded(seed::teams());
        app.on_standings_updated(seed::teams());
        app.on_games_loaded(seed::games());
        app
    }

    #[test]
    fn standings_subscription_follows_the_tab() {
        let mut app = app();
        assert_eq!(
            app.update_tab(MenuItem::Schedule),
            vec![
                NetworkRequest::StopStandings,
                NetworkRequest::LoadSchedule { team: app.state.teams[0].id.clone(), day: 1 },
                NetworkRequest::LoadDailyInfo { day: 1 },
            ]
        );
        assert_eq!(app.update_tab(MenuItem::Standings), vec![NetworkRequest::WatchStandings]);
        assert!(app.update_tab(MenuItem::Standings).is_empty());
    }

    #[test]
    fn help_returns_to_previous_tab() {
        let mut app = app();
        app.update_tab(MenuItem::Brackets);
        app.update_tab(MenuItem::Help);
        assert_eq!(app.exit_help(), vec![NetworkRequest::LoadGames]);
        assert_eq!(app.state.active_tab, MenuItem::Brackets);
    }

    #[test]
    fn leaving_brackets_stops_the_open_bracket() {
        let mut app = app();
        app.update_tab(MenuItem::Brackets);
        let Some(NetworkRequest::WatchBracket { game_id }) = app.open_bracket() else {
            panic!("expected a watch request");
        };
        assert_eq!(game_id, "mario-kart");

        app.on_bracket_updated("other".into(), None);
        assert!(!app.state.brackets.open.as_ref().unwrap().loaded);
        app.on_bracket_updated(game_id, seed::brackets().pop().map(|(_, b)| b));
        assert!(app.state.brackets.open.as_ref().unwrap().bracket.is_some());

        let requests = app.update_tab(MenuItem::Standings);
        assert_eq!(requests, vec![NetworkRequest::StopBracket, NetworkRequest::WatchStandings]);
        assert!(app.state.brackets.open.is_none());
        assert_eq!(app.close_bracket(), None);
    }

    #[test]
    fn admin_adjusts_selected_team_by_quick_amount() {
        let mut app = app();
        assert_eq!(app.admin_adjust(1.0), None);

        app.toggle_admin();
        let leader = app.state.standings.ranked[0].id.clone();
        assert_eq!(app.state.admin.selected, Some(leader.clone()));
        app.state.admin.next_amount();
        app.state.admin.next_amount();
        assert_eq!(app.admin_adjust(-1.0), Some(NetworkRequest::AdjustPoints { team: leader.clone(), delta: -10.0 }));

        app.admin_open_input();
        assert_eq!(app.admin_adjust(1.0), None);
        app.state.admin.push_input('4');
        app.state.admin.push_input('2');
        assert_eq!(app.admin_submit_input(), Some(NetworkRequest::SetPoints { team: leader, value: 42.0 }));
        assert_eq!(app.state.admin.input, None);
    }

    #[test]
    fn saved_points_update_standings_and_show_notice() {
        let mut app = app();
        let mut team = app.state.standings.ranked.last().cloned().unwrap();
        team.points = 1_000_000.0;
        let id = team.id.clone();
        app.on_points_saved(team, "Set to 1,000,000".into());
        assert_eq!(app.state.standings.ranked[0].id, id);

        let shown = app.state.notice.as_ref().unwrap().shown_at;
        assert!(!app.expire_notice(shown));
        assert!(app.expire_notice(shown + crate::state::app_state::NOTICE_TTL));
        assert!(app.state.notice.is_none());
    }

    #[test]
    fn schedule_navigation_requests_only_on_change() {
        let mut app = app();
        app.update_tab(MenuItem::Schedule);
        app.on_daily_info_loaded(1, None);
        assert!(app.schedule_team_up().is_empty());
        assert!(app.schedule_prev_day().is_empty());

        let second = app.state.teams[1].id.clone();
        assert_eq!(app.schedule_team_down(), vec![NetworkRequest::LoadSchedule { team: second.clone(), day: 1 }]);
        assert_eq!(
            app.schedule_set_day(3),
            vec![NetworkRequest::LoadSchedule { team: second, day: 3 }, NetworkRequest::LoadDailyInfo { day: 3 }]
        );
    }
}
