use gamesboard_api::parse_hex_color;
use gamesboard_api::bracket::{Outcome, TeamBadge};
use tui::style::{Color, Modifier, Style};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Palette {
    Primary,
    Accent,
    Dim,
    Winner,
    Loser,
    Success,
    Failure,
}

pub fn resolve(color: Palette) -> Style {
    match color {
        Palette::Primary => Style::default().fg(Color::Rgb(0, 122, 195)),
        Palette::Accent => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        Palette::Dim => Style::default().fg(Color::Indexed(240)),
        Palette::Winner => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        Palette::Loser => Style::default().add_modifier(Modifier::DIM | Modifier::CROSSED_OUT),
        Palette::Success => Style::default().fg(Color::Black).bg(Color::Green),
        Palette::Failure => Style::default().fg(Color::White).bg(Color::Red),
    }
}

/// Terminal color for a `#rgb` / `#rrggbb` team color. Unparseable colors
/// fall back to gray.
pub fn team_color(hex: &str) -> Color {
    match parse_hex_color(hex) {
        Some((r, g, b)) => Color::Rgb(r, g, b),
        None => Color::Gray,
    }
}

/// Chip style: team color as background, black or white text.
pub fn chip_style(hex: &str, dark_text: bool) -> Style {
    let fg = if dark_text { Color::Black } else { Color::White };
    Style::default().bg(team_color(hex)).fg(fg)
}

pub fn badge_style(badge: &TeamBadge, outcome: Outcome) -> Style {
    let style = chip_style(&badge.color, badge.dark_text);
    match outcome {
        Outcome::Winner => style.add_modifier(Modifier::BOLD),
        Outcome::Loser => style.add_modifier(Modifier::DIM),
        Outcome::Neutral => style,
    }
}

pub fn outcome_style(outcome: Outcome) -> Style {
    match outcome {
        Outcome::Winner => resolve(Palette::Winner),
        Outcome::Loser => resolve(Palette::Loser),
        Outcome::Neutral => Style::default().fg(Color::Gray),
    }
}
