use crate::state::messages::NetworkRequest;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

pub const GAMES_REFRESH: Duration = Duration::from_secs(30);

/// Re-requests the games list so status changes made elsewhere show up.
/// Standings and the open bracket are live through subscriptions instead.
pub struct PeriodicRefresher {
    network_requests: mpsc::Sender<NetworkRequest>,
    period: Duration,
}

impl PeriodicRefresher {
    pub fn new(network_requests: mpsc::Sender<NetworkRequest>) -> Self {
        Self { network_requests, period: GAMES_REFRESH }
    }

    pub async fn run(self) {
        let mut games_interval = interval(self.period);
        // Skip the immediate first tick so startup loading isn't double-triggered.
        games_interval.tick().await;

        loop {
            games_interval.tick().await;
            if self.network_requests.send(NetworkRequest::LoadGames).await.is_err() {
                break;
            }
        }
    }
}
