use gamesboard_api::standings::format_points;
use gamesboard_api::{Team, TeamId};
use tui::buffer::Buffer;
use tui::layout::Rect;
use tui::style::{Modifier, Style};
use tui::widgets::Widget;

use crate::components::theme::{Palette, chip_style, resolve, team_color};

const RANK_W: usize = 4;
const NAME_W: usize = 22;
const POINTS_W: usize = 10;

/// Ranked rows: `rank | team chip | bar | points`. The bar length is the
/// team's share of the leader's points.
pub struct StandingsView<'a> {
    /// Already sorted, highest first.
    pub teams: &'a [Team],
    pub max_points: f64,
    /// Highlighted row (admin mode).
    pub selected: Option<&'a TeamId>,
    pub scroll_offset: u16,
}

impl<'a> Widget for StandingsView<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < (RANK_W + NAME_W) as u16 || area.height == 0 {
            return;
        }
        if self.teams.is_empty() {
            buf.set_string(area.x, area.y, "No teams yet", resolve(Palette::Dim));
            return;
        }

        let bar_w = usize::from(area.width).saturating_sub(RANK_W + NAME_W + POINTS_W + 2);
        let rows = self.teams.iter().enumerate().skip(usize::from(self.scroll_offset));
        for (row, (rank, team)) in rows.enumerate() {
            let Ok(row) = u16::try_from(row) else { break };
            if row >= area.height {
                break;
            }
            let y = area.y + row;
            let selected = self.selected == Some(&team.id);
            let mut x = area.x;

            let marker = if selected { '>' } else { ' ' };
            let rank_style = if selected { resolve(Palette::Accent) } else { Style::default() };
            buf.set_string(x, y, format!("{marker}{:>2} ", rank + 1), rank_style);
            x += RANK_W as u16;

            let name: String = team.name.chars().take(NAME_W - 2).collect();
            let mut style = chip_style(&team.color, team.dark_text);
            if selected {
                style = style.add_modifier(Modifier::BOLD | Modifier::REVERSED);
            }
            buf.set_string(x, y, format!(" {name:<w$} ", w = NAME_W - 2), style);
            x += NAME_W as u16 + 1;

            if bar_w > 0 {
                let filled = bar_len(team.points, self.max_points, bar_w);
                buf.set_string(x, y, "█".repeat(filled), Style::default().fg(team_color(&team.color)));
                x += bar_w as u16 + 1;
            }

            let points = format!("{:>POINTS_W$}", format_points(team.points));
            buf.set_string(x, y, points, Style::default().add_modifier(Modifier::BOLD));
        }
    }
}

/// Cells of a `width`-wide bar for `points` out of `max`. Any positive score
/// shows at least one cell.
pub fn bar_len(points: f64, max: f64, width: usize) -> usize {
    if max <= 0.0 || points <= 0.0 || width == 0 {
        return 0;
    }
    let share = (points / max).clamp(0.0, 1.0);
    ((share * width as f64).round() as usize).clamp(1, width)
}
