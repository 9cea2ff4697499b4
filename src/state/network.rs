use crate::state::messages::{NetworkRequest, NetworkResponse};
use gamesboard_api::repository::{Repository, bracket_from_snapshot, teams_from_snapshot};
use gamesboard_api::standings::{Standings, format_points};
use gamesboard_api::store::{DocumentStore, Snapshot, StoreError, Subscription};
use gamesboard_api::{Bracket, Team};
use log::{debug, error};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

const SPINNER_CHARS: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
pub const ERROR_CHAR: char = '!';

#[derive(Debug, Copy, Clone)]
pub struct LoadingState {
    pub is_loading: bool,
    pub spinner_char: char,
}

impl Default for LoadingState {
    fn default() -> Self {
        Self { is_loading: false, spinner_char: ' ' }
    }
}

/// Owns the repository and the live subscriptions. Requests come in over one
/// channel; loaded data, subscription snapshots and spinner updates go out
/// over the other.
pub struct SyncWorker<S> {
    repository: Repository<S>,
    requests: mpsc::Receiver<NetworkRequest>,
    responses: mpsc::Sender<NetworkResponse>,
    is_loading: Arc<AtomicBool>,
    standings: Option<Subscription>,
    bracket: Option<(String, Subscription)>,
    /// Last data sent for each live view, to skip snapshots that repeat it.
    last_standings: Option<Standings>,
    last_bracket: Option<Option<Bracket>>,
}

impl<S: DocumentStore> SyncWorker<S> {
    pub fn new(
        repository: Repository<S>,
        requests: mpsc::Receiver<NetworkRequest>,
        responses: mpsc::Sender<NetworkResponse>,
    ) -> Self {
        Self {
            repository,
            requests,
            responses,
            is_loading: Arc::new(AtomicBool::new(false)),
            standings: None,
            bracket: None,
            last_standings: None,
            last_bracket: None,
        }
    }

    pub async fn run(mut self) {
        loop {
            let response = tokio::select! {
                request = self.requests.recv() => {
                    let Some(request) = request else { break };
                    self.handle_request(request).await
                }
                snapshot = next_snapshot(self.standings.as_mut()) => {
                    match snapshot {
                        Some(snapshot) => self.standings_changed(teams_from_snapshot(&snapshot)),
                        None => {
                            debug!("standings subscription closed");
                            self.standings = None;
                            None
                        }
                    }
                }
                snapshot = next_snapshot(self.bracket.as_mut().map(|(_, sub)| sub)) => {
                    match (snapshot, self.bracket.as_ref()) {
                        (Some(snapshot), Some((game_id, _))) => {
                            let game_id = game_id.clone();
                            self.bracket_changed(game_id, bracket_from_snapshot(&snapshot))
                        }
                        _ => {
                            debug!("bracket subscription closed");
                            self.bracket = None;
                            None
                        }
                    }
                }
            };

            if let Some(response) = response
                && let Err(e) = self.responses.send(response).await
            {
                error!("Failed to send network response: {e}");
                break;
            }
        }
    }

    async fn handle_request(&mut self, request: NetworkRequest) -> Option<NetworkResponse> {
        match request {
            // A read answers first, so an unreachable remote still shows the
            // last-known data; the subscription only pushes what differs.
            NetworkRequest::WatchStandings => {
                debug!("watching standings");
                let teams = self.repository.standings().await.teams().to_vec();
                self.last_standings = None;
                let response = self.standings_changed(teams);
                self.standings = Some(self.repository.subscribe_standings());
                response
            }
            NetworkRequest::StopStandings => {
                self.standings = None;
                self.last_standings = None;
                None
            }
            NetworkRequest::WatchBracket { game_id } => {
                debug!("watching bracket {game_id}");
                let bracket = self.repository.bracket(&game_id).await;
                self.last_bracket = None;
                let response = self.bracket_changed(game_id.clone(), bracket);
                let sub = self.repository.subscribe_bracket(&game_id);
                self.bracket = Some((game_id, sub));
                response
            }
            NetworkRequest::StopBracket => {
                self.bracket = None;
                self.last_bracket = None;
                None
            }
            request => {
                self.start_loading_animation().await;
                let result = self.load(request).await;
                debug!("network request complete");
                self.stop_loading_animation(result.is_ok()).await;
                Some(result.unwrap_or_else(|message| NetworkResponse::WriteFailed { message }))
            }
        }
    }

    fn standings_changed(&mut self, teams: Vec<Team>) -> Option<NetworkResponse> {
        let engine = Standings::from_unordered(teams);
        if self.last_standings.as_ref() == Some(&engine) {
            return None;
        }
        let teams = engine.teams().to_vec();
        self.last_standings = Some(engine);
        Some(NetworkResponse::StandingsUpdated { teams })
    }

    fn bracket_changed(&mut self, game_id: String, bracket: Option<Bracket>) -> Option<NetworkResponse> {
        if self.last_bracket.as_ref() == Some(&bracket) {
            return None;
        }
        self.last_bracket = Some(bracket.clone());
        Some(NetworkResponse::BracketUpdated { game_id, bracket })
    }

    /// Reads always answer (the repository falls back to cached data);
    /// only writes can fail.
    async fn load(&self, request: NetworkRequest) -> Result<NetworkResponse, String> {
        let response = match request {
            NetworkRequest::LoadTeams => NetworkResponse::TeamsLoaded { teams: self.repository.teams().await },
            NetworkRequest::LoadSchedule { team, day } => {
                let events = self.repository.schedule(&team, day).await;
                NetworkResponse::ScheduleLoaded { team, day, events }
            }
            NetworkRequest::LoadDailyInfo { day } => {
                NetworkResponse::DailyInfoLoaded { day, info: self.repository.daily_info(day).await }
            }
            NetworkRequest::LoadGames => NetworkResponse::GamesLoaded { games: self.repository.games().await },
            NetworkRequest::AdjustPoints { team, delta } => {
                let saved = self.repository.adjust_points(&team, delta).await.map_err(|e| write_error(&e))?;
                let verb = if delta >= 0.0 { "Added" } else { "Removed" };
                let prep = if delta >= 0.0 { "to" } else { "from" };
                let message = format!("{verb} {} points {prep} {}", format_points(delta.abs()), saved.name);
                NetworkResponse::PointsSaved { team: saved, message }
            }
            NetworkRequest::SetPoints { team, value } => {
                let saved = self.repository.set_points(&team, value).await.map_err(|e| write_error(&e))?;
                let message = format!("Set {} to {} points", saved.name, format_points(saved.points));
                NetworkResponse::PointsSaved { team: saved, message }
            }
            NetworkRequest::WatchStandings
            | NetworkRequest::StopStandings
            | NetworkRequest::WatchBracket { .. }
            | NetworkRequest::StopBracket => {
                return Err("subscription requests are not loads".into());
            }
        };
        Ok(response)
    }

    async fn start_loading_animation(&self) {
        self.is_loading.store(true, Ordering::Relaxed);

        let mut loading_state = LoadingState { is_loading: true, spinner_char: SPINNER_CHARS[0] };
        let _ = self.responses.send(NetworkResponse::LoadingStateChanged { loading_state }).await;

        let responses = self.responses.clone();
        let is_loading = self.is_loading.clone();

        tokio::spawn(async move {
            let mut spinner_index = 1;
            let mut interval = tokio::time::interval(Duration::from_millis(33));
            loop {
                interval.tick().await;
                if !is_loading.load(Ordering::Relaxed) {
                    break;
                }
                loading_state.spinner_char = SPINNER_CHARS[spinner_index];
                spinner_index = (spinner_index + 1) % SPINNER_CHARS.len();
                let _ = responses.send(NetworkResponse::LoadingStateChanged { loading_state }).await;
            }
        });
    }

    async fn stop_loading_animation(&self, is_ok: bool) {
        self.is_loading.store(false, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(15)).await;

        let spinner_char = if is_ok { ' ' } else { ERROR_CHAR };
        let _ = self
            .responses
            .send(NetworkResponse::LoadingStateChanged {
                loading_state: LoadingState { is_loading: false, spinner_char },
            })
            .await;
    }
}

/// Next snapshot of an optional subscription; never resolves when there is none.
async fn next_snapshot(subscription: Option<&mut Subscription>) -> Option<Snapshot> {
    match subscription {
        Some(sub) => sub.next().await,
        None => std::future::pending().await,
    }
}

fn write_error(err: &StoreError) -> String {
    error!("write failed: {err}");
    match err {
        StoreError::NotFound(_) => "Team not found".into(),
        e if e.is_transient() => "Error updating points. Please try again.".into(),
        e => format!("Error updating points: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamesboard_api::TeamId;
    use gamesboard_api::client::FirestoreClient;
    use gamesboard_api::config::FirebaseConfig;
    use gamesboard_api::seed;
    use gamesboard_api::store::Backend;

    struct Harness {
        requests: mpsc::Sender<NetworkRequest>,
        responses: mpsc::Receiver<NetworkResponse>,
        task: tokio::task::JoinHandle<()>,
    }

    impl Harness {
        fn start() -> Self {
            Self::with_store(Backend::Local(seed::memory_store()))
        }

        fn with_store(store: Backend) -> Self {
            let (req_tx, req_rx) = mpsc::channel(16);
            let (resp_tx, resp_rx) = mpsc::channel(256);
            let worker = SyncWorker::new(Repository::new(store), req_rx, resp_tx);
            Self { requests: req_tx, responses: resp_rx, task: tokio::spawn(worker.run()) }
        }

        /// Next response that is not a spinner update.
        async fn next(&mut self) -> NetworkResponse {
            loop {
                let resp = tokio::time::timeout(Duration::from_secs(2), self.responses.recv())
                    .await
                    .expect("timed out")
                    .expect("worker stopped");
                if !matches!(resp, NetworkResponse::LoadingStateChanged { .. }) {
                    return resp;
                }
            }
        }
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            self.task.abort();
        }
    }

    /// A configured project on a port nothing listens on.
    fn unreachable_remote() -> Backend {
        let config = FirebaseConfig {
            api_key: "test-key".into(),
            project_id: "demo".into(),
            endpoint: "http://127.0.0.1:9".into(),
            timeout_secs: 1,
            ..FirebaseConfig::default()
        };
        Backend::Remote(FirestoreClient::new(&config).with_retry(1, Duration::ZERO))
    }

    #[tokio::test]
    async fn unreachable_remote_still_shows_last_known_data() {
        let mut h = Harness::with_store(unreachable_remote());

        h.requests.send(NetworkRequest::WatchStandings).await.unwrap();
        let NetworkResponse::StandingsUpdated { teams } = h.next().await else { panic!("expected standings") };
        assert_eq!(teams.len(), 16);

        h.requests.send(NetworkRequest::WatchBracket { game_id: "mario-kart".into() }).await.unwrap();
        match h.next().await {
            NetworkResponse::BracketUpdated { game_id, bracket } => {
                assert_eq!(game_id, "mario-kart");
                assert_eq!(bracket.map(|b| b.rounds.len()), Some(4));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn watching_sends_the_first_snapshot_once() {
        let mut h = Harness::start();
        h.requests.send(NetworkRequest::WatchStandings).await.unwrap();
        assert!(matches!(h.next().await, NetworkResponse::StandingsUpdated { .. }));

        // The subscription's first snapshot repeats the read and is dropped.
        h.requests.send(NetworkRequest::LoadGames).await.unwrap();
        assert!(matches!(h.next().await, NetworkResponse::GamesLoaded { .. }));
    }

    #[tokio::test]
    async fn loads_schedule_for_team_and_day() {
        let mut h = Harness::start();
        h.requests.send(NetworkRequest::LoadSchedule { team: TeamId::from(1), day: 1 }).await.unwrap();
        match h.next().await {
            NetworkResponse::ScheduleLoaded { team, day, events } => {
                assert_eq!(team, TeamId::from(1));
                assert_eq!(day, 1);
                assert_eq!(events.len(), 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn standings_subscription_pushes_point_changes() {
        let mut h = Harness::start();
        h.requests.send(NetworkRequest::WatchStandings).await.unwrap();
        let NetworkResponse::StandingsUpdated { teams } = h.next().await else { panic!("expected standings") };
        assert_eq!(teams.len(), 16);

        h.requests.send(NetworkRequest::AdjustPoints { team: TeamId::from(3), delta: 25.0 }).await.unwrap();
        let mut saved = None;
        let mut pushed = false;
        while saved.is_none() || !pushed {
            match h.next().await {
                NetworkResponse::PointsSaved { team, message } => {
                    assert!(message.starts_with("Added 25 points to"));
                    saved = Some(team);
                }
                NetworkResponse::StandingsUpdated { .. } => pushed = true,
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(saved.unwrap().id, TeamId::from(3));
    }

    #[tokio::test]
    async fn unknown_team_write_fails_with_message() {
        let mut h = Harness::start();
        h.requests.send(NetworkRequest::SetPoints { team: TeamId::from("nope"), value: 5.0 }).await.unwrap();
        match h.next().await {
            NetworkResponse::WriteFailed { message } => assert_eq!(message, "Team not found"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn bracket_watch_reports_game_and_stops() {
        let mut h = Harness::start();
        h.requests.send(NetworkRequest::WatchBracket { game_id: "mario-kart".into() }).await.unwrap();
        match h.next().await {
            NetworkResponse::BracketUpdated { game_id, bracket } => {
                assert_eq!(game_id, "mario-kart");
                assert!(bracket.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }

        h.requests.send(NetworkRequest::WatchBracket { game_id: "trivia".into() }).await.unwrap();
        match h.next().await {
            NetworkResponse::BracketUpdated { game_id, bracket } => {
                assert_eq!(game_id, "trivia");
                assert!(bracket.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
        h.requests.send(NetworkRequest::StopBracket).await.unwrap();
        h.requests.send(NetworkRequest::LoadGames).await.unwrap();
        assert!(matches!(h.next().await, NetworkResponse::GamesLoaded { .. }));
    }
}
