use gamesboard_api::bracket::{BracketLayout, Connector, RenderedMatch, RenderedSide, RoundBlock, THIRD_PLACE_LABEL};
use tui::buffer::Buffer;
use tui::layout::Rect;
use tui::style::{Modifier, Style};
use tui::widgets::Widget;

use crate::components::theme::{Palette, badge_style, outcome_style, resolve};

// ---------------------------------------------------------------------------
// Layout constants
// ---------------------------------------------------------------------------

/// Rows per match card: team1 line, time line, team2 line.
pub const GAME_HEIGHT: u16 = 3;

/// Width of the connector zone drawn between adjacent round columns.
pub const CONNECTOR_WIDTH: u16 = 3;

/// Rows above the first card: column title plus a blank line.
pub const HEADER_HEIGHT: u16 = 2;

const CELL_W_FULL: u16 = 26;
const CELL_W_MIN: u16 = 14;

/// Rows between the final's card and the third-place card.
const THIRD_PLACE_GAP: u16 = 2;

/// Slot height at a bracket depth: `SH[0] = GAME_HEIGHT; SH[d] = 2 * SH[d-1] + 1`.
pub fn slot_height(depth: usize) -> u16 {
    let mut sh = GAME_HEIGHT;
    for _ in 0..depth.min(10) {
        sh = sh.saturating_mul(2).saturating_add(1);
    }
    sh
}

/// Grid row of a card's middle line, relative to the top of the cards.
pub fn center_row(depth: usize, index: usize) -> u16 {
    let sh = slot_height(depth);
    let index = u16::try_from(index).unwrap_or(u16::MAX);
    (sh / 2).saturating_add(index.saturating_mul(sh + 1))
}

// ---------------------------------------------------------------------------
// BracketGrid: card positions for one laid-out bracket
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardKind {
    Match,
    Final,
    ThirdPlace,
}

#[derive(Debug, Clone)]
pub struct GameCell {
    /// Middle row of the card, relative to the top of the cards.
    pub center_row: u16,
    pub column: usize,
    pub index: usize,
    pub kind: CardKind,
}

#[derive(Debug, Clone)]
pub struct BracketGrid {
    pub cells: Vec<GameCell>,
    pub columns: usize,
    pub cell_width: u16,
    /// Rows needed below the header to show every card.
    pub total_height: u16,
}

impl BracketGrid {
    pub fn compute(layout: &BracketLayout, width: u16) -> Self {
        let BracketLayout::Rounds(blocks) = layout else {
            return Self { cells: Vec::new(), columns: 0, cell_width: 0, total_height: 0 };
        };

        let columns = blocks.len();
        let connector_total = CONNECTOR_WIDTH * u16::try_from(columns.saturating_sub(1)).unwrap_or(0);
        let per_col = width.saturating_sub(connector_total) / u16::try_from(columns.max(1)).unwrap_or(1);
        let cell_width = per_col.clamp(CELL_W_MIN, CELL_W_FULL);

        let mut cells = Vec::new();
        for (column, block) in blocks.iter().enumerate() {
            match block {
                RoundBlock::Round { matches, .. } => {
                    for index in 0..matches.len() {
                        cells.push(GameCell { center_row: center_row(column, index), column, index, kind: CardKind::Match });
                    }
                }
                RoundBlock::Finals { final_match, third_place } => {
                    let final_center = center_row(column, 0);
                    if final_match.is_some() {
                        cells.push(GameCell { center_row: final_center, column, index: 0, kind: CardKind::Final });
                    }
                    if third_place.is_some() {
                        cells.push(GameCell {
                            center_row: third_place_center(final_center),
                            column,
                            index: 1,
                            kind: CardKind::ThirdPlace,
                        });
                    }
                }
            }
        }

        let total_height = cells.iter().map(|c| c.center_row + 2).max().unwrap_or(0);
        Self { cells, columns, cell_width, total_height }
    }

    fn column_x(&self, column: usize, first_column: usize) -> u16 {
        let stride = self.cell_width + CONNECTOR_WIDTH;
        u16::try_from(column.saturating_sub(first_column)).unwrap_or(u16::MAX).saturating_mul(stride)
    }
}

/// Label row sits one above the card; the card starts one below that.
fn third_place_center(final_center: u16) -> u16 {
    final_center + GAME_HEIGHT / 2 + THIRD_PLACE_GAP + 1 + GAME_HEIGHT / 2 + 1
}

// ---------------------------------------------------------------------------
// BracketView widget
// ---------------------------------------------------------------------------

/// Draws a laid-out bracket: one column per round, connector lines between
/// paired matches and a finals column holding the final and third-place cards.
pub struct BracketView<'a> {
    pub layout: &'a BracketLayout,
    /// Vertical scroll in rows.
    pub scroll_offset: u16,
    /// Leftmost round column shown.
    pub first_column: usize,
}

impl<'a> Widget for BracketView<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let BracketLayout::Rounds(blocks) = self.layout else {
            render_not_set_up(area, buf);
            return;
        };
        if area.width < CELL_W_MIN || area.height <= HEADER_HEIGHT {
            return;
        }

        let grid = BracketGrid::compute(self.layout, area.width);
        let first_column = self.first_column.min(grid.columns.saturating_sub(1));
        let cards = Rect::new(area.x, area.y + HEADER_HEIGHT, area.width, area.height - HEADER_HEIGHT);

        for (column, block) in blocks.iter().enumerate().skip(first_column) {
            let x = area.x + grid.column_x(column, first_column);
            if x >= area.x + area.width {
                break;
            }
            let title: String = block.title().chars().take(usize::from(grid.cell_width)).collect();
            buf.set_string(x, area.y, title, resolve(Palette::Accent));
        }

        // Pass 1: cards
        for cell in &grid.cells {
            if cell.column < first_column {
                continue;
            }
            let Some(m) = card_match(blocks, cell) else { continue };
            let x = area.x + grid.column_x(cell.column, first_column);
            if cell.kind == CardKind::ThirdPlace
                && let Some(sy) = screen_y(cell.center_row.saturating_sub(2), self.scroll_offset, cards)
                && x < area.x + area.width
            {
                let label: String = THIRD_PLACE_LABEL.chars().take(usize::from(grid.cell_width)).collect();
                buf.set_string(x, sy, label, resolve(Palette::Accent));
            }
            draw_card(m, cell, x, grid.cell_width, cards, self.scroll_offset, buf);
        }

        // Pass 2: connectors from each paired match toward its next-round slot.
        for cell in &grid.cells {
            if cell.column < first_column || cell.kind != CardKind::Match {
                continue;
            }
            let Some(m) = card_match(blocks, cell) else { continue };
            let conn_x = area.x + grid.column_x(cell.column, first_column) + grid.cell_width;
            let parent_row = center_row(cell.column + 1, cell.index / 2);
            draw_connector(m.connector, cell.center_row, parent_row, conn_x, cards, self.scroll_offset, buf);
        }
    }
}

fn card_match<'a>(blocks: &'a [RoundBlock], cell: &GameCell) -> Option<&'a RenderedMatch> {
    match (blocks.get(cell.column)?, cell.kind) {
        (RoundBlock::Round { matches, .. }, CardKind::Match) => matches.get(cell.index),
        (RoundBlock::Finals { final_match, .. }, CardKind::Final) => final_match.as_ref(),
        (RoundBlock::Finals { third_place, .. }, CardKind::ThirdPlace) => third_place.as_ref(),
        _ => None,
    }
}

fn render_not_set_up(area: Rect, buf: &mut Buffer) {
    let lines = ["Bracket Not Set Up Yet", "The bracket for this game has not been created."];
    let top = area.y + area.height.saturating_sub(lines.len() as u16) / 2;
    for (i, line) in lines.iter().enumerate() {
        let y = top + i as u16;
        if y >= area.y + area.height {
            break;
        }
        let text: String = line.chars().take(usize::from(area.width)).collect();
        let x = area.x + area.width.saturating_sub(text.chars().count() as u16) / 2;
        let style = if i == 0 { resolve(Palette::Accent) } else { resolve(Palette::Dim) };
        buf.set_string(x, y, text, style);
    }
}

// ---------------------------------------------------------------------------
// Shared drawing helpers
// ---------------------------------------------------------------------------

/// Convert a grid row to an absolute screen y, applying scroll and area bounds.
fn screen_y(grid_row: u16, scroll: u16, area: Rect) -> Option<u16> {
    if grid_row < scroll {
        return None;
    }
    let rel = grid_row - scroll;
    if rel >= area.height {
        return None;
    }
    Some(area.y + rel)
}

fn draw_card(m: &RenderedMatch, cell: &GameCell, x: u16, width: u16, area: Rect, scroll: u16, buf: &mut Buffer) {
    let limit_x = area.x + area.width;
    if x >= limit_x {
        return;
    }
    let avail = usize::from(limit_x - x).min(usize::from(width));

    let rows = [
        cell.center_row.saturating_sub(1),
        cell.center_row,
        cell.center_row.saturating_add(1),
    ];
    for (slot_idx, row) in rows.into_iter().enumerate() {
        let Some(sy) = screen_y(row, scroll, area) else { continue };
        match slot_idx {
            0 => draw_side(&m.team1, x, sy, avail, buf),
            2 => draw_side(&m.team2, x, sy, avail, buf),
            _ => {
                let time = m.time.as_deref().unwrap_or("");
                let text = format!(" {time:<avail$}");
                buf.set_string(x, sy, clip(&text, avail), resolve(Palette::Dim));
            }
        }
    }
}

/// `" name        " score` with the name on a chip in the team color.
fn draw_side(side: &RenderedSide, x: u16, y: u16, avail: usize, buf: &mut Buffer) {
    let score_w = 4;
    let name_w = avail.saturating_sub(score_w);
    let name = format!(" {}", side.badge.name);
    let chip = format!("{:<name_w$}", clip(&name, name_w.saturating_sub(1)));
    let chip_style = if side.badge.tbd {
        badge_style(&side.badge, side.outcome).add_modifier(Modifier::ITALIC)
    } else {
        badge_style(&side.badge, side.outcome)
    };
    buf.set_string(x, y, clip(&chip, name_w), chip_style);

    if avail > name_w {
        let score = format!("{:>score_w$}", side.score);
        buf.set_string(x + name_w as u16, y, clip(&score, avail - name_w), outcome_style(side.outcome));
    }
}

fn clip(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

/// Line out of one match toward its next-round slot.
///
/// ```text
///  upper  ──┐          (Down)
///           │
///           ├──        (next-round row)
///           │
///  lower  ──┘          (Up)
/// ```
fn draw_connector(
    connector: Connector,
    from_row: u16,
    to_row: u16,
    conn_base_x: u16,
    area: Rect,
    scroll: u16,
    buf: &mut Buffer,
) {
    let style = resolve(Palette::Dim);
    let col_a = conn_base_x;
    let col_b = conn_base_x + 1;
    let col_c = conn_base_x + 2;
    let limit_x = area.x + area.width;

    macro_rules! put {
        ($x:expr, $row:expr, $ch:expr) => {
            if $x < limit_x {
                if let Some(sy) = screen_y($row, scroll, area) {
                    put_char(buf, $x, sy, $ch, style);
                }
            }
        };
    }

    match connector {
        Connector::None => return,
        Connector::Down => {
            put!(col_a, from_row, '─');
            put!(col_b, from_row, '┐');
            for row in (from_row + 1)..to_row {
                put!(col_b, row, '│');
            }
        }
        Connector::Up => {
            put!(col_a, from_row, '─');
            put!(col_b, from_row, '┘');
            for row in (to_row + 1)..from_row {
                put!(col_b, row, '│');
            }
        }
    }
    put!(col_b, to_row, '├');
    put!(col_c, to_row, '─');
}

fn put_char(buf: &mut Buffer, x: u16, y: u16, ch: char, style: Style) {
    if let Some(cell) = buf.cell_mut((x, y)) {
        cell.set_char(ch);
        cell.set_style(style);
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use gamesboard_api::bracket::render;
    use gamesboard_api::seed;

    fn mario_kart() -> BracketLayout {
        let bracket = seed::brackets().into_iter().find(|(id, _)| id == "mario-kart").map(|(_, b)| b);
        render(bracket.as_ref(), &seed::teams())
    }

    fn row_text(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width).map(|x| buf[(x, y)].symbol().to_string()).collect()
    }

    #[test]
    fn test_slot_heights() {
        let heights: Vec<u16> = (0..4).map(slot_height).collect();
        assert_eq!(heights, vec![3, 7, 15, 31]);
    }

    #[test]
    fn test_first_round_centers() {
        let centers: Vec<u16> = (0..8).map(|i| center_row(0, i)).collect();
        assert_eq!(centers, vec![1, 5, 9, 13, 17, 21, 25, 29]);
    }

    #[test]
    fn test_parent_center_is_midpoint_of_children() {
        for depth in 0..3usize {
            for j in 0..(4 >> depth) {
                let top = center_row(depth, 2 * j);
                let bot = center_row(depth, 2 * j + 1);
                assert_eq!(center_row(depth + 1, j), (top + bot) / 2, "depth={depth} parent={j}");
            }
        }
    }

    #[test]
    fn test_grid_places_third_place_below_final() {
        let layout = mario_kart();
        let grid = BracketGrid::compute(&layout, 120);
        assert_eq!(grid.columns, 4);
        let final_cell = grid.cells.iter().find(|c| c.kind == CardKind::Final).unwrap();
        let third = grid.cells.iter().find(|c| c.kind == CardKind::ThirdPlace).unwrap();
        assert_eq!(final_cell.column, 3);
        assert_eq!(third.column, 3);
        assert!(third.center_row >= final_cell.center_row + GAME_HEIGHT + THIRD_PLACE_GAP);
        assert!(grid.total_height > third.center_row);
    }

    #[test]
    fn test_cell_width_clamped() {
        let layout = mario_kart();
        assert_eq!(BracketGrid::compute(&layout, 400).cell_width, CELL_W_FULL);
        assert_eq!(BracketGrid::compute(&layout, 30).cell_width, CELL_W_MIN);
    }

    #[test]
    fn test_not_set_up_message() {
        let area = Rect::new(0, 0, 40, 5);
        let mut buf = Buffer::empty(area);
        BracketView { layout: &BracketLayout::NotSetUp, scroll_offset: 0, first_column: 0 }.render(area, &mut buf);
        assert!((0..5).any(|y| row_text(&buf, y).contains("Bracket Not Set Up Yet")));
    }

    #[test]
    fn test_render_draws_titles_and_connectors() {
        let layout = mario_kart();
        let area = Rect::new(0, 0, 120, 40);
        let mut buf = Buffer::empty(area);
        BracketView { layout: &layout, scroll_offset: 0, first_column: 0 }.render(area, &mut buf);

        let header = row_text(&buf, 0);
        assert!(header.contains("Round of 16"));
        assert!(header.contains("Quarterfinals"));
        assert!(header.contains("Finals"));

        let grid = BracketGrid::compute(&layout, 120);
        let conn_x = grid.cell_width + 1;
        assert_eq!(buf[(conn_x, HEADER_HEIGHT + 1)].symbol(), "┐");
        assert_eq!(buf[(conn_x, HEADER_HEIGHT + 3)].symbol(), "├");
        assert_eq!(buf[(conn_x, HEADER_HEIGHT + 5)].symbol(), "┘");

        let all: String = (0..40).map(|y| row_text(&buf, y)).collect();
        assert!(all.contains(THIRD_PLACE_LABEL));
    }

    #[test]
    fn test_scroll_hides_top_rows() {
        let layout = mario_kart();
        let area = Rect::new(0, 0, 120, 12);
        let mut buf = Buffer::empty(area);
        BracketView { layout: &layout, scroll_offset: 4, first_column: 0 }.render(area, &mut buf);
        let grid = BracketGrid::compute(&layout, 120);
        // Grid row 5 (second match, joining upward) lands on the first card row.
        assert_eq!(buf[(grid.cell_width + 1, HEADER_HEIGHT + 1)].symbol(), "┘");
    }
}
