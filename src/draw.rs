use tui::backend::Backend;
use tui::layout::{Alignment, Constraint, Layout, Rect};
use tui::style::{Color, Modifier, Style};
use tui::text::{Line, Span};
use tui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Tabs, Wrap};
use tui::{Frame, Terminal};
use tui_logger::TuiLoggerWidget;

use crate::app::{App, MenuItem};
use crate::components::bracket::BracketView;
use crate::components::standings::StandingsView;
use crate::components::theme::{Palette, chip_style, resolve};
use crate::state::app_state::{NoticeKind, QUICK_AMOUNTS};
use crate::state::network::{ERROR_CHAR, LoadingState};
use crate::ui::layout::LayoutAreas;
use gamesboard_api::schedule::DAYS;
use gamesboard_api::standings::format_points;
use gamesboard_api::{DailyInfo, GameStatus};

static TABS: &[&str; 3] = &["Standings", "Schedule", "Brackets"];

const PICKER_WIDTH: u16 = 28;

pub fn draw<B>(terminal: &mut Terminal<B>, app: &mut App, loading: LoadingState)
where
    B: Backend,
{
    let current_size = terminal.size().unwrap_or_default();
    if current_size.width <= 10 || current_size.height <= 10 {
        return;
    }

    let mut layout = LayoutAreas::new(current_size);

    let result = terminal.draw(|f| {
        layout.update(f.area(), app.settings.full_screen, app.state.show_logs);

        if !app.settings.full_screen {
            draw_tabs(f, layout.tab_bar, app);
        }

        match app.state.active_tab {
            MenuItem::Standings => draw_standings(f, layout.main, app),
            MenuItem::Schedule => draw_schedule(f, layout.main, app),
            MenuItem::Brackets => draw_brackets(f, layout.main, app),
            MenuItem::Help => draw_help(f, layout.main),
        }

        draw_notice(f, layout.main, app);
        if let Some(logs) = layout.logs {
            draw_logs(f, logs);
        }
        draw_loading_spinner(f, f.area(), app, loading);
    });

    if let Err(e) = result {
        log::error!("draw failed: {e}");
    }
}

pub fn default_border<'a>(color: Color) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
}

fn draw_tabs(f: &mut Frame, tab_bar: [Rect; 2], app: &App) {
    let style = Style::default().fg(Color::White);
    let border_type = BorderType::Rounded;

    let tab_index = match app.state.active_tab {
        MenuItem::Standings | MenuItem::Help => 0,
        MenuItem::Schedule => 1,
        MenuItem::Brackets => 2,
    };

    let titles: Vec<Line> = TABS.iter().map(|t| Line::from(*t)).collect();
    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::LEFT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .highlight_style(Style::default().add_modifier(Modifier::UNDERLINED))
        .select(tab_index)
        .style(style);
    f.render_widget(tabs, tab_bar[0]);

    let help = Paragraph::new(format!("{}  Help: ? ", app.state.backend))
        .alignment(Alignment::Right)
        .block(
            Block::default()
                .borders(Borders::RIGHT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .style(style);
    f.render_widget(help, tab_bar[1]);
}

fn draw_message(f: &mut Frame, area: Rect, msg: &str) {
    f.render_widget(
        Paragraph::new(msg)
            .style(resolve(Palette::Dim))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        area,
    );
}

// ---------------------------------------------------------------------------
// Standings
// ---------------------------------------------------------------------------

fn draw_standings(f: &mut Frame, area: Rect, app: &App) {
    let admin = &app.state.admin;
    let title = if admin.enabled { " Standings · points admin " } else { " Standings " };
    let block = default_border(if admin.enabled { Color::Yellow } else { Color::White }).title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let standings = &app.state.standings;
    if !standings.loaded {
        draw_message(f, inner, "Loading standings...");
        return;
    }

    let panel_height = if admin.enabled { 4 } else { 1 };
    let [table, panel] = Layout::vertical([Constraint::Fill(1), Constraint::Length(panel_height)]).areas(inner);

    f.render_widget(
        StandingsView {
            teams: &standings.ranked,
            max_points: standings.standings.max_points(),
            selected: if admin.enabled { admin.selected.as_ref() } else { None },
            scroll_offset: standings.scroll_offset,
        },
        table,
    );

    if admin.enabled {
        draw_admin_panel(f, panel, app);
    } else {
        f.render_widget(
            Paragraph::new("Keys: j/k=scroll  a=points admin  ?=help  q=quit").style(resolve(Palette::Dim)),
            panel,
        );
    }
}

fn draw_admin_panel(f: &mut Frame, area: Rect, app: &App) {
    let admin = &app.state.admin;
    let selected = admin.selected.as_ref().and_then(|id| app.state.standings.standings.find(id));

    let mut amounts = vec![Span::styled("Amount: ", resolve(Palette::Dim))];
    for (idx, amount) in QUICK_AMOUNTS.iter().enumerate() {
        let label = format!(" {} ", format_points(*amount));
        let style = if idx == admin.amount_idx {
            Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD)
        } else {
            Style::default()
        };
        amounts.push(Span::styled(label, style));
    }

    let team_line = match selected {
        Some(team) => Line::from(vec![
            Span::styled(format!(" {} ", team.name), chip_style(&team.color, team.dark_text)),
            Span::raw(format!("  {} points", format_points(team.points))),
        ]),
        None => Line::styled("No team selected", resolve(Palette::Dim)),
    };

    let input_line = match admin.input.as_deref() {
        Some(text) => Line::from(vec![
            Span::styled("Exact points: ", resolve(Palette::Accent)),
            Span::raw(format!("{text}_")),
            Span::styled("  Enter=save  Esc=cancel", resolve(Palette::Dim)),
        ]),
        None => Line::styled(
            "Keys: j/k=team  [/]=amount  +/-=add/remove  ==exact value  a=leave admin",
            resolve(Palette::Dim),
        ),
    };

    f.render_widget(
        Paragraph::new(vec![Line::default(), team_line, Line::from(amounts), input_line]),
        area,
    );
}

// ---------------------------------------------------------------------------
// Schedule + daily info
// ---------------------------------------------------------------------------

fn draw_schedule(f: &mut Frame, area: Rect, app: &App) {
    let block = default_border(Color::White).title(" Schedule ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    if app.state.teams.is_empty() {
        draw_message(f, inner, "Loading teams...");
        return;
    }

    let [picker, content] =
        Layout::horizontal([Constraint::Length(PICKER_WIDTH), Constraint::Fill(1)]).areas(inner);
    draw_team_picker(f, picker, app);

    let schedule = &app.state.schedule;
    let info_height = if schedule.show_info { content.height / 2 } else { 1 };
    let [days, events, info] =
        Layout::vertical([Constraint::Length(2), Constraint::Fill(1), Constraint::Length(info_height)])
            .areas(content);

    let titles: Vec<Line> = DAYS.map(|d| Line::from(format!("Day {d}"))).collect();
    let selected_day = schedule.day.saturating_sub(*DAYS.start()) as usize;
    f.render_widget(
        Tabs::new(titles)
            .select(selected_day)
            .highlight_style(resolve(Palette::Accent).add_modifier(Modifier::UNDERLINED))
            .style(Style::default().fg(Color::Gray)),
        days,
    );

    let team = app.state.selected_schedule_team();
    match schedule.current_events(team.map(|t| &t.id)) {
        None => draw_message(f, events, "Loading schedule..."),
        Some([]) => draw_message(f, events, "No events scheduled for this day"),
        Some(list) => {
            let lines: Vec<Line> = list
                .iter()
                .map(|e| {
                    let mut spans = vec![
                        Span::styled(format!(" {:<10} ", e.time), resolve(Palette::Primary)),
                        Span::styled(e.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
                    ];
                    if !e.location.is_empty() {
                        spans.push(Span::styled(format!("  @ {}", e.location), resolve(Palette::Dim)));
                    }
                    Line::from(spans)
                })
                .collect();
            f.render_widget(Paragraph::new(lines), events);
        }
    }

    if schedule.show_info {
        let info_block = Block::default()
            .borders(Borders::TOP)
            .border_style(resolve(Palette::Dim))
            .title(" Daily info (i to hide) ");
        let info_inner = info_block.inner(info);
        f.render_widget(info_block, info);
        if schedule.info_day != Some(schedule.day) {
            draw_message(f, info_inner, "Loading daily info...");
        } else if let Some(daily) = schedule.info.as_ref().filter(|d| !d.is_empty()) {
            f.render_widget(Paragraph::new(daily_info_lines(daily)).wrap(Wrap { trim: false }), info_inner);
        } else {
            draw_message(f, info_inner, "No information available for this day.");
        }
    } else {
        f.render_widget(
            Paragraph::new("Keys: j/k=team  h/l=day  i=daily info").style(resolve(Palette::Dim)),
            info,
        );
    }
}

fn draw_team_picker(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.schedule.selected_team;
    let visible = usize::from(area.height.max(1));
    let first = selected.saturating_sub(visible.saturating_sub(1));

    let lines: Vec<Line> = app
        .state
        .teams
        .iter()
        .enumerate()
        .skip(first)
        .take(visible)
        .map(|(idx, team)| {
            let marker = if idx == selected { "> " } else { "  " };
            let mut style = chip_style(&team.color, team.dark_text);
            if idx == selected {
                style = style.add_modifier(Modifier::BOLD);
            }
            let width = usize::from(PICKER_WIDTH.saturating_sub(4));
            let name: String = team.name.chars().take(width.saturating_sub(1)).collect();
            Line::from(vec![Span::raw(marker), Span::styled(format!(" {name:<w$}", w = width - 1), style)])
        })
        .collect();
    f.render_widget(Paragraph::new(lines), area);
}

fn daily_info_lines(info: &DailyInfo) -> Vec<Line<'_>> {
    let heading = resolve(Palette::Accent);
    let mut lines = Vec::new();
    if !info.title.is_empty() {
        lines.push(Line::styled(info.title.as_str(), Style::default().add_modifier(Modifier::BOLD)));
    }
    for (label, items) in [("Announcements", &info.announcements), ("Tips", &info.tips)] {
        if items.is_empty() {
            continue;
        }
        lines.push(Line::styled(label, heading));
        lines.extend(items.iter().map(|item| Line::from(format!("  • {item}"))));
    }
    for (label, value) in [("Locations", &info.locations), ("Contact", &info.contact)] {
        if !value.is_empty() {
            lines.push(Line::from(vec![Span::styled(format!("{label}: "), heading), Span::raw(value.as_str())]));
        }
    }
    lines
}

// ---------------------------------------------------------------------------
// Games + brackets
// ---------------------------------------------------------------------------

fn draw_brackets(f: &mut Frame, area: Rect, app: &App) {
    let brackets = &app.state.brackets;

    if let Some(open) = brackets.open.as_ref() {
        let name = brackets.open_game_name().unwrap_or_default();
        let block = default_border(Color::White).title(format!(" {name} Bracket "));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let [legend, content] = Layout::vertical([Constraint::Length(1), Constraint::Fill(1)]).areas(inner);
        f.render_widget(
            Paragraph::new("Keys: j/k=scroll  h/l=rounds  Esc=back to games").style(resolve(Palette::Dim)),
            legend,
        );
        if !open.loaded {
            draw_message(f, content, "Loading bracket...");
            return;
        }
        let layout = open.layout(&app.state.teams);
        f.render_widget(
            BracketView { layout: &layout, scroll_offset: open.scroll_offset, first_column: open.first_column },
            content,
        );
        return;
    }

    let block = default_border(Color::White).title(" Games ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    if brackets.games.is_empty() {
        draw_message(f, inner, "Loading games...");
        return;
    }

    let [legend, list] = Layout::vertical([Constraint::Length(2), Constraint::Fill(1)]).areas(inner);
    f.render_widget(
        Paragraph::new("Keys: j/k=move  Enter=view bracket  r=refresh").style(resolve(Palette::Dim)),
        legend,
    );

    let lines: Vec<Line> = brackets
        .games
        .iter()
        .enumerate()
        .map(|(idx, game)| {
            let selected = idx == brackets.selected_game;
            let marker = if selected { "> " } else { "  " };
            let name_style = if selected {
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            let status_style = match game.status {
                GameStatus::InProgress => resolve(Palette::Primary),
                GameStatus::Completed => resolve(Palette::Winner),
                GameStatus::NotStarted | GameStatus::Other(_) => resolve(Palette::Dim),
            };
            Line::from(vec![
                Span::raw(marker),
                Span::styled(format!("{:<24}", game.name), name_style),
                Span::styled(format!("[{}]", game.status), status_style),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(lines), list);
}

// ---------------------------------------------------------------------------
// Help, notices, logs, spinner
// ---------------------------------------------------------------------------

fn draw_help(f: &mut Frame, area: Rect) {
    let block = default_border(Color::DarkGray).title(" Help ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = [
        ("1 / 2 / 3", "Standings / Schedule / Brackets"),
        ("?", "this help, Esc to go back"),
        ("q, Ctrl-c", "quit"),
        ("f", "full screen"),
        ("\"", "toggle log pane"),
        ("", ""),
        ("Standings", "j/k scroll, a toggles points admin"),
        ("  admin", "j/k team, [ ] amount, + add, - remove, = exact value"),
        ("Schedule", "j/k team, h/l or F1-F5 day, i daily info"),
        ("Brackets", "j/k game, Enter open, Esc close, h/l rounds"),
    ];
    let lines: Vec<Line> = rows
        .iter()
        .map(|(keys, what)| {
            Line::from(vec![Span::styled(format!("{keys:<12}"), resolve(Palette::Accent)), Span::raw(*what)])
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

/// Write results float over the bottom border of the main area.
fn draw_notice(f: &mut Frame, area: Rect, app: &App) {
    let Some(notice) = app.state.notice.as_ref() else {
        return;
    };
    let style = match notice.kind {
        NoticeKind::Success => resolve(Palette::Success),
        NoticeKind::Error => resolve(Palette::Failure),
    };
    let text = format!(" {} ", notice.message);
    let width = (text.chars().count() as u16).min(area.width.saturating_sub(4));
    if width == 0 || area.height < 2 {
        return;
    }
    let rect = Rect::new(area.x + area.width.saturating_sub(width + 2), area.y + area.height - 1, width, 1);
    f.render_widget(Clear, rect);
    f.render_widget(Paragraph::new(text).style(style), rect);
}

fn draw_logs(f: &mut Frame, area: Rect) {
    f.render_widget(
        TuiLoggerWidget::default()
            .block(default_border(Color::DarkGray).title(" Logs "))
            .style_error(Style::default().fg(Color::Red))
            .style_warn(Style::default().fg(Color::Yellow))
            .style_info(Style::default().fg(Color::Gray))
            .output_file(false)
            .output_line(false),
        area,
    );
}

fn draw_loading_spinner(f: &mut Frame, area: Rect, app: &App, loading: LoadingState) {
    if !loading.is_loading && loading.spinner_char != ERROR_CHAR {
        return;
    }
    let style = match loading.spinner_char {
        ERROR_CHAR => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::White),
    };
    let spinner = Paragraph::new(loading.spinner_char.to_string())
        .alignment(Alignment::Right)
        .style(style);
    let area = if app.settings.full_screen {
        Rect::new(area.width.saturating_sub(3), area.height.saturating_sub(2), 1, 1)
    } else {
        Rect::new(area.width.saturating_sub(22), 1, 1, 1)
    };
    f.render_widget(spinner, area);
}
