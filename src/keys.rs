use crate::app::{App, MenuItem};
use crate::state::messages::NetworkRequest;
use crossterm::event::KeyCode::Char;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

pub async fn handle_key_bindings(
    key_event: KeyEvent,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
) {
    let mut guard = app.lock().await;
    let requests = dispatch(&mut guard, key_event);
    drop(guard);

    for request in requests {
        let _ = network_requests.send(request).await;
    }
}

/// Apply one key press to the app and return the requests it triggers.
fn dispatch(app: &mut App, key_event: KeyEvent) -> Vec<NetworkRequest> {
    // The exact-points line takes every key until it is closed.
    if app.state.admin.input.is_some() {
        match key_event.code {
            KeyCode::Enter => return app.admin_submit_input().into_iter().collect(),
            KeyCode::Esc => app.state.admin.input = None,
            KeyCode::Backspace => {
                if let Some(input) = app.state.admin.input.as_mut() {
                    input.pop();
                }
            }
            Char(c) => app.state.admin.push_input(c),
            _ => {}
        }
        return Vec::new();
    }

    let bracket_open = app.state.brackets.open.is_some();

    match (app.state.active_tab, key_event.code, key_event.modifiers) {
        // Quit
        (_, Char('q'), _) | (_, Char('c'), KeyModifiers::CONTROL) => {
            crate::cleanup_terminal();
            std::process::exit(0);
        }

        // Tab switching
        (_, Char('1'), _) => app.update_tab(MenuItem::Standings),
        (_, Char('2'), _) => app.update_tab(MenuItem::Schedule),
        (_, Char('3'), _) => app.update_tab(MenuItem::Brackets),
        (_, Char('?'), _) => app.update_tab(MenuItem::Help),
        (MenuItem::Help, KeyCode::Esc, _) => app.exit_help(),

        // Standings + admin panel
        (MenuItem::Standings, Char('a'), _) => {
            app.toggle_admin();
            Vec::new()
        }
        (MenuItem::Standings, Char('j') | KeyCode::Down, _) => {
            app.standings_move(1);
            Vec::new()
        }
        (MenuItem::Standings, Char('k') | KeyCode::Up, _) => {
            app.standings_move(-1);
            Vec::new()
        }
        (MenuItem::Standings, Char(']'), _) => {
            app.state.admin.next_amount();
            Vec::new()
        }
        (MenuItem::Standings, Char('['), _) => {
            app.state.admin.prev_amount();
            Vec::new()
        }
        (MenuItem::Standings, Char('+'), _) => app.admin_adjust(1.0).into_iter().collect(),
        (MenuItem::Standings, Char('-'), _) => app.admin_adjust(-1.0).into_iter().collect(),
        (MenuItem::Standings, Char('='), _) => {
            app.admin_open_input();
            Vec::new()
        }

        // Schedule: team picker, days, info panel
        (MenuItem::Schedule, Char('j') | KeyCode::Down, _) => app.schedule_team_down(),
        (MenuItem::Schedule, Char('k') | KeyCode::Up, _) => app.schedule_team_up(),
        (MenuItem::Schedule, Char('l') | KeyCode::Right, _) => app.schedule_next_day(),
        (MenuItem::Schedule, Char('h') | KeyCode::Left, _) => app.schedule_prev_day(),
        (MenuItem::Schedule, Char('i'), _) => {
            app.toggle_daily_info();
            Vec::new()
        }
        (MenuItem::Schedule, KeyCode::F(n), _) => app.schedule_set_day(u32::from(n)),

        // Open bracket view
        (MenuItem::Brackets, KeyCode::Esc, _) if bracket_open => app.close_bracket().into_iter().collect(),
        (MenuItem::Brackets, Char('j') | KeyCode::Down, _) if bracket_open => {
            app.bracket_scroll(1);
            Vec::new()
        }
        (MenuItem::Brackets, Char('k') | KeyCode::Up, _) if bracket_open => {
            app.bracket_scroll(-1);
            Vec::new()
        }
        (MenuItem::Brackets, Char('l') | KeyCode::Right, _) if bracket_open => {
            app.bracket_pan(1);
            Vec::new()
        }
        (MenuItem::Brackets, Char('h') | KeyCode::Left, _) if bracket_open => {
            app.bracket_pan(-1);
            Vec::new()
        }

        // Games list
        (MenuItem::Brackets, Char('j') | KeyCode::Down, _) => {
            app.state.brackets.game_down();
            Vec::new()
        }
        (MenuItem::Brackets, Char('k') | KeyCode::Up, _) => {
            app.state.brackets.game_up();
            Vec::new()
        }
        (MenuItem::Brackets, KeyCode::Enter, _) => app.open_bracket().into_iter().collect(),
        (MenuItem::Brackets, Char('r'), _) => vec![NetworkRequest::LoadGames],

        // Global
        (_, Char('f'), _) => {
            app.toggle_full_screen();
            Vec::new()
        }
        (_, Char('"'), _) => {
            app.toggle_show_logs();
            Vec::new()
        }

        _ => Vec::new(),
    }
}
