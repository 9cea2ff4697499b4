mod app;
mod components;
mod draw;
mod keys;
mod state;
mod ui;

use crate::app::App;
use crate::state::app_settings::AppSettings;
use crate::state::messages::{NetworkRequest, NetworkResponse, UiEvent};
use crate::state::network::{LoadingState, SyncWorker};
use crate::state::refresher::PeriodicRefresher;
use crossterm::event::{self as crossterm_event, Event};
use crossterm::{cursor, execute, terminal};
use gamesboard_api::repository::Repository;
use gamesboard_api::store::Backend;
use log::{error, info};
use std::io::Stdout;
use std::sync::Arc;
use std::time::Instant;
use std::{io, panic};
use tokio::sync::{Mutex, mpsc};
use tokio::time::Duration;
use tui::{Terminal, backend::CrosstermBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if handle_cli_args() {
        return Ok(());
    }

    better_panic::install();

    let backend = CrosstermBackend::new(io::stdout());
    let terminal = Terminal::new(backend)?;

    setup_panic_hook();
    setup_terminal()?;

    tui_logger::init_logger(log::LevelFilter::Error)?;
    tui_logger::set_default_level(log::LevelFilter::Error);

    let settings = AppSettings::load();
    let store = Backend::from_config(&settings.firebase);
    info!("data source: {}", store.label());
    let app = Arc::new(Mutex::new(App::new(settings, store.label())));

    let (ui_event_tx, ui_event_rx) = mpsc::channel::<UiEvent>(100);
    let (network_req_tx, network_req_rx) = mpsc::channel::<NetworkRequest>(100);
    let (network_resp_tx, network_resp_rx) = mpsc::channel::<NetworkResponse>(100);

    // Input handler thread
    let input_handler = tokio::spawn(input_handler_task(ui_event_tx.clone()));

    // Sync thread: repository reads/writes plus live subscriptions
    let sync_worker = SyncWorker::new(Repository::new(store), network_req_rx, network_resp_tx);
    let sync_task = tokio::spawn(sync_worker.run());

    // Periodic games refresh thread (every 30s)
    let periodic_updater = PeriodicRefresher::new(network_req_tx.clone());
    let periodic_task = tokio::spawn(periodic_updater.run());

    // Notice expiry tick
    let tick_tx = ui_event_tx.clone();
    let tick_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(250));
        loop {
            interval.tick().await;
            if tick_tx.send(UiEvent::Tick).await.is_err() {
                break;
            }
        }
    });

    let _ = ui_event_tx.send(UiEvent::AppStarted).await;

    main_ui_loop(terminal, app, ui_event_rx, network_req_tx, network_resp_rx).await;

    input_handler.abort();
    sync_task.abort();
    periodic_task.abort();
    tick_task.abort();

    Ok(())
}

fn handle_cli_args() -> bool {
    let mut args = std::env::args().skip(1);
    let Some(arg) = args.next() else {
        return false;
    };

    match arg.as_str() {
        "-h" | "--help" => {
            println!("{}", usage_text());
            true
        }
        "-V" | "--version" => {
            println!("gamesboard {}", env!("CARGO_PKG_VERSION"));
            true
        }
        _ => {
            eprintln!("Unknown argument: {arg}\n\n{}", usage_text());
            std::process::exit(2);
        }
    }
}

fn usage_text() -> &'static str {
    "gamesboard - terminal event board: standings, schedules, daily info and brackets

Usage:
  gamesboard
  gamesboard --help
  gamesboard --version

Environment:
  GAMESBOARD_FIREBASE_CONFIG     Path to the Firebase web config JSON
                                 (default $XDG_CONFIG_HOME/gamesboard/firebase.json)
  GAMESBOARD_API_KEY             Override apiKey
  GAMESBOARD_PROJECT_ID          Override projectId
  GAMESBOARD_FIRESTORE_ENDPOINT  Override the Firestore endpoint (emulators)
  GAMESBOARD_ID_TOKEN            Bearer token sent with every request
  GAMESBOARD_LOG                 Log level for the log pane (error, warn, info, debug, trace)

Without a configured project the board runs on bundled sample data."
}

async fn main_ui_loop(
    mut terminal: Terminal<CrosstermBackend<Stdout>>,
    app: Arc<Mutex<App>>,
    mut ui_events: mpsc::Receiver<UiEvent>,
    network_requests: mpsc::Sender<NetworkRequest>,
    mut network_responses: mpsc::Receiver<NetworkResponse>,
) {
    let mut loading = LoadingState::default();

    loop {
        tokio::select! {
            Some(ui_event) = ui_events.recv() => {
                let should_redraw = handle_ui_event(ui_event, &app, &network_requests).await;
                if should_redraw && !loading.is_loading {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }

            Some(response) = network_responses.recv() => {
                let should_redraw =
                    handle_network_response(response, &app, &network_requests, &mut loading).await;
                if should_redraw {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }

            else => break,
        }
    }
}

async fn handle_ui_event(
    ui_event: UiEvent,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
) -> bool {
    match ui_event {
        UiEvent::AppStarted => {
            let requests = app.lock().await.startup_requests();
            send_all(network_requests, requests).await;
            true
        }
        UiEvent::KeyPressed(key_event) => {
            keys::handle_key_bindings(key_event, app, network_requests).await;
            true
        }
        UiEvent::Resize => true,
        UiEvent::Tick => app.lock().await.expire_notice(Instant::now()),
    }
}

async fn handle_network_response(
    response: NetworkResponse,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
    loading: &mut LoadingState,
) -> bool {
    let mut guard = app.lock().await;
    match response {
        NetworkResponse::LoadingStateChanged { loading_state } => {
            *loading = loading_state;
            return true;
        }
        NetworkResponse::TeamsLoaded { teams } => {
            let follow_up = guard.on_teams_loaded(teams);
            drop(guard);
            send_all(network_requests, follow_up).await;
        }
        NetworkResponse::StandingsUpdated { teams } => guard.on_standings_updated(teams),
        NetworkResponse::ScheduleLoaded { team, day, events } => guard.on_schedule_loaded(team, day, events),
        NetworkResponse::DailyInfoLoaded { day, info } => guard.on_daily_info_loaded(day, info),
        NetworkResponse::GamesLoaded { games } => guard.on_games_loaded(games),
        NetworkResponse::BracketUpdated { game_id, bracket } => guard.on_bracket_updated(game_id, bracket),
        NetworkResponse::PointsSaved { team, message } => {
            info!("{message}");
            guard.on_points_saved(team, message);
        }
        NetworkResponse::WriteFailed { message } => guard.on_write_failed(message),
        NetworkResponse::Error { message } => {
            error!("Network error: {message}");
            guard.on_error(message);
        }
    }
    !loading.is_loading
}

async fn send_all(network_requests: &mpsc::Sender<NetworkRequest>, requests: Vec<NetworkRequest>) {
    for request in requests {
        if network_requests.send(request).await.is_err() {
            error!("sync worker is gone");
            break;
        }
    }
}

async fn input_handler_task(ui_events: mpsc::Sender<UiEvent>) {
    loop {
        if let Ok(event) = crossterm_event::read() {
            let ui_event = match event {
                Event::Key(key_event) => Some(UiEvent::KeyPressed(key_event)),
                Event::Resize(_, _) => Some(UiEvent::Resize),
                _ => None,
            };

            if let Some(ui_event) = ui_event
                && ui_events.send(ui_event).await.is_err()
            {
                break;
            }
        }
    }
}

fn setup_terminal() -> io::Result<()> {
    let mut stdout = io::stdout();
    execute!(stdout, cursor::Hide)?;
    execute!(stdout, terminal::EnterAlternateScreen)?;
    execute!(stdout, terminal::Clear(terminal::ClearType::All))?;
    terminal::enable_raw_mode()
}

pub fn cleanup_terminal() {
    let mut stdout = io::stdout();
    let _ = execute!(stdout, cursor::MoveTo(0, 0));
    let _ = execute!(stdout, terminal::Clear(terminal::ClearType::All));
    let _ = execute!(stdout, terminal::LeaveAlternateScreen);
    let _ = execute!(stdout, cursor::Show);
    let _ = terminal::disable_raw_mode();
}

fn setup_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        cleanup_terminal();
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));
}
