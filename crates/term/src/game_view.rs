//! GameView: maps an engine snapshot into a terminal framebuffer.
//!
//! This module is pure (no I/O). It can be unit-tested.

use crate::engine::GameSnapshot;
use crate::fb::{format_u64, CellStyle, FrameBuffer, Rgb};
use crate::types::{
    CyclePhase, EffectKind, Lifecycle, ACHIEVEMENT_COINS, COMBO_BONUS_PER_PASS, DEATH_ROW,
    GRID_HEIGHT, GRID_WIDTH, SLIDE_ROW,
};

/// Terminal viewport dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

impl Viewport {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterStatusView {
    pub enabled: bool,
    pub client_count: u16,
    pub controller_id: Option<usize>,
    pub streaming_count: u16,
}

/// UI state drawn next to the game that the engine does not own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hud {
    /// Column highlighted by the keyboard cursor
    pub cursor: Option<u8>,
    pub adapter: Option<AdapterStatusView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorY {
    Center,
    Top,
}

const FIELD_BG: Rgb = Rgb::new(45, 55, 72);
const LANE_BG: Rgb = Rgb::new(30, 34, 46);
const DEATH_BG: Rgb = Rgb::new(58, 30, 36);
const DANGER_FG: Rgb = Rgb::new(239, 68, 68);
const EMPTY_FG: Rgb = Rgb::new(90, 100, 115);

/// Tile palette by value; unknown values fall back to grey.
const TILE_COLORS: [(u64, Rgb); 14] = [
    (2, Rgb::new(0x3f, 0x83, 0xf8)),
    (4, Rgb::new(0x10, 0xb9, 0x81)),
    (8, Rgb::new(0xf5, 0x9e, 0x0b)),
    (16, Rgb::new(0xef, 0x44, 0x44)),
    (32, Rgb::new(0x8b, 0x5c, 0xf6)),
    (64, Rgb::new(0xec, 0x48, 0x99)),
    (128, Rgb::new(0x06, 0xb6, 0xd4)),
    (256, Rgb::new(0x84, 0xcc, 0x16)),
    (512, Rgb::new(0xf9, 0x73, 0x16)),
    (1024, Rgb::new(0x63, 0x66, 0xf1)),
    (2048, Rgb::new(0xe1, 0x1d, 0x48)),
    (4096, Rgb::new(0x05, 0x96, 0x69)),
    (8192, Rgb::new(0x7c, 0x3a, 0xed)),
    (16384, Rgb::new(0xdc, 0x26, 0x26)),
];

pub fn tile_color(value: u64) -> Rgb {
    TILE_COLORS
        .iter()
        .find(|(v, _)| *v == value)
        .map(|(_, c)| *c)
        .unwrap_or(Rgb::new(0x66, 0x66, 0x66))
}

/// Short label for a tile that fits in `width` columns (`16K` for 16384 when needed)
pub fn tile_label(value: u64, width: u16, buf: &mut [u8; 20]) -> &str {
    let mut digits = [0u8; 20];
    let len = format_u64(value, &mut digits).len();
    if len as u16 <= width {
        return format_u64(value, buf);
    }

    let (scaled, suffix) = if value >= 1 << 20 {
        (value >> 20, b'M')
    } else {
        (value >> 10, b'K')
    };
    let n = format_u64(scaled, &mut digits).len();
    let start = 20 - n - 1;
    buf[start..19].copy_from_slice(&digits[20 - n..]);
    buf[19] = suffix;
    std::str::from_utf8(&buf[start..]).unwrap_or("?")
}

/// A lightweight terminal renderer for the merge-drop game.
pub struct GameView {
    /// Grid cell width in terminal columns.
    cell_w: u16,
    /// Grid cell height in terminal rows.
    cell_h: u16,
    anchor_y: AnchorY,
}

impl Default for GameView {
    fn default() -> Self {
        Self {
            cell_w: 6,
            cell_h: 3,
            anchor_y: AnchorY::Center,
        }
    }
}

impl GameView {
    pub fn new(cell_w: u16, cell_h: u16) -> Self {
        Self {
            cell_w: cell_w.max(1),
            cell_h: cell_h.max(1),
            anchor_y: AnchorY::Center,
        }
    }

    pub fn with_anchor_y(mut self, anchor_y: AnchorY) -> Self {
        self.anchor_y = anchor_y;
        self
    }

    /// Frame size (grid plus border) in terminal cells
    pub fn frame_size(&self) -> (u16, u16) {
        (
            GRID_WIDTH as u16 * self.cell_w + 2,
            GRID_HEIGHT as u16 * self.cell_h + 2,
        )
    }

    /// Render into an existing framebuffer (reused across frames).
    pub fn render_into(&self, snap: &GameSnapshot, hud: &Hud, viewport: Viewport, fb: &mut FrameBuffer) {
        fb.resize(viewport.width, viewport.height);
        fb.clear(CellStyle::default().into_cell(' '));

        let (frame_w, frame_h) = self.frame_size();
        // One row above the frame for column markers.
        let start_x = viewport.width.saturating_sub(frame_w) / 2;
        let start_y = match self.anchor_y {
            AnchorY::Center => viewport.height.saturating_sub(frame_h + 2) / 2 + 1,
            AnchorY::Top => 1,
        };

        let border = CellStyle::new(Rgb::new(200, 200, 200), Rgb::new(0, 0, 0));
        self.draw_border(fb, start_x, start_y, frame_w, frame_h, border);
        self.draw_markers(fb, snap, hud, start_x, start_y);

        for row in 0..GRID_HEIGHT {
            for column in 0..GRID_WIDTH {
                let value = snap.grid[row as usize][column as usize];
                if value == 0 {
                    self.draw_empty_cell(fb, start_x, start_y, row, column);
                } else {
                    let pop = merge_pop(snap, row, column);
                    let (px, py) = self.cell_origin(start_x, start_y, column as f32, row as f32);
                    self.draw_tile(fb, px, py, value, pop);
                }
            }
        }

        if let Some(slide) = snap.sliding {
            let (px, py) = self.cell_origin(start_x, start_y, slide.column_pos, SLIDE_ROW as f32);
            self.draw_tile(fb, px, py, slide.value, false);
        }
        if let Some(fall) = snap.falling {
            let (px, py) = self.cell_origin(start_x, start_y, fall.column as f32, fall.row_pos);
            self.draw_tile(fb, px, py, fall.value, false);
        }

        self.draw_banner(fb, snap, start_x + 1, start_y + frame_h);
        let panel_x = start_x.saturating_add(frame_w).saturating_add(2);
        if panel_x < viewport.width && viewport.width - panel_x >= 10 {
            self.draw_side_panel(fb, snap, hud, panel_x, start_y);
        }

        let frame = (start_x, start_y, frame_w, frame_h);
        match snap.lifecycle {
            Lifecycle::AwaitingStart => draw_overlay(fb, frame, "MERGE DROP", "ENTER TO START"),
            Lifecycle::Paused => draw_overlay(fb, frame, "PAUSED", "P TO RESUME"),
            Lifecycle::GameOver => draw_overlay(fb, frame, "GAME OVER", "ENTER TO RESTART"),
            Lifecycle::Playing => {}
        }
    }

    /// Convenience helper that allocates a new framebuffer.
    pub fn render(&self, snap: &GameSnapshot, hud: &Hud, viewport: Viewport) -> FrameBuffer {
        let mut fb = FrameBuffer::new(viewport.width, viewport.height);
        self.render_into(snap, hud, viewport, &mut fb);
        fb
    }

    fn cell_origin(&self, start_x: u16, start_y: u16, column: f32, row: f32) -> (u16, u16) {
        let px = start_x as f32 + 1.0 + (column * self.cell_w as f32).round();
        let py = start_y as f32 + 1.0 + (row * self.cell_h as f32).round();
        (px.max(0.0) as u16, py.max(0.0) as u16)
    }

    fn draw_border(&self, fb: &mut FrameBuffer, x: u16, y: u16, w: u16, h: u16, style: CellStyle) {
        if w < 2 || h < 2 {
            return;
        }

        fb.put_char(x, y, '╭', style);
        fb.put_char(x + w - 1, y, '╮', style);
        fb.put_char(x, y + h - 1, '╰', style);
        fb.put_char(x + w - 1, y + h - 1, '╯', style);
        for dx in 1..w - 1 {
            fb.put_char(x + dx, y, '─', style);
            fb.put_char(x + dx, y + h - 1, '─', style);
        }
        for dy in 1..h - 1 {
            fb.put_char(x, y + dy, '│', style);
            fb.put_char(x + w - 1, y + dy, '│', style);
        }
    }

    /// Cursor and danger markers on the row above the frame
    fn draw_markers(&self, fb: &mut FrameBuffer, snap: &GameSnapshot, hud: &Hud, start_x: u16, start_y: u16) {
        let Some(y) = start_y.checked_sub(1) else {
            return;
        };
        let danger = CellStyle::new(DANGER_FG, Rgb::new(0, 0, 0)).bold();
        let cursor = CellStyle::new(Rgb::new(250, 250, 250), Rgb::new(0, 0, 0));
        for column in 0..GRID_WIDTH {
            let mid = start_x + 1 + column as u16 * self.cell_w + self.cell_w / 2;
            let dangerous = snap.dangerous_columns[column as usize];
            if dangerous {
                fb.put_char(mid, y, '!', danger);
            }
            if hud.cursor == Some(column) && snap.lifecycle == Lifecycle::Playing {
                // Shift left so the danger marker stays visible.
                let x = if dangerous { mid.saturating_sub(1) } else { mid };
                fb.put_char(x, y, '▼', cursor);
            }
        }
    }

    fn draw_empty_cell(&self, fb: &mut FrameBuffer, start_x: u16, start_y: u16, row: u8, column: u8) {
        let bg = match row {
            SLIDE_ROW => LANE_BG,
            DEATH_ROW => DEATH_BG,
            _ => FIELD_BG,
        };
        let (px, py) = self.cell_origin(start_x, start_y, column as f32, row as f32);
        let style = CellStyle::new(EMPTY_FG, bg).dim();
        fb.fill_rect(px, py, self.cell_w, self.cell_h, ' ', style);
        if row > DEATH_ROW {
            fb.put_char(px + self.cell_w / 2, py + self.cell_h / 2, '·', style);
        }
    }

    fn draw_tile(&self, fb: &mut FrameBuffer, px: u16, py: u16, value: u64, pop: bool) {
        let color = tile_color(value);
        let bg = if pop { color } else { color.darken(0.15) };
        let style = CellStyle::new(Rgb::new(255, 255, 255), bg).bold();
        fb.fill_rect(px, py, self.cell_w, self.cell_h, ' ', style);

        let mut buf = [0u8; 20];
        let label = tile_label(value, self.cell_w, &mut buf);
        fb.put_str_centered(px, self.cell_w, py + self.cell_h / 2, label, style);
    }

    /// Latest goal, achievement, or combo message under the frame
    fn draw_banner(&self, fb: &mut FrameBuffer, snap: &GameSnapshot, x: u16, y: u16) {
        let Some(effect) = snap
            .effects
            .iter()
            .rev()
            .find(|e| !matches!(e.kind, EffectKind::Merge { .. }))
        else {
            return;
        };

        let style = CellStyle::new(Rgb::new(250, 204, 21), Rgb::new(0, 0, 0)).bold();
        let mut x = x;
        let mut buf = [0u8; 20];
        match effect.kind {
            EffectKind::Goal { value, new_goal } => {
                x = fb.put_str(x, y, "GOAL ", style);
                x = fb.put_str(x, y, format_u64(value, &mut buf), style);
                x = fb.put_str(x, y, "! NEXT ", style);
                fb.put_str(x, y, format_u64(new_goal, &mut buf), style);
            }
            EffectKind::Achievement { value } => {
                x = fb.put_str(x, y, "WOW ", style);
                x = fb.put_str(x, y, format_u64(value, &mut buf), style);
                x = fb.put_str(x, y, "! +", style);
                x = fb.put_u64(x, y, ACHIEVEMENT_COINS, style);
                fb.put_str(x, y, " COINS", style);
            }
            EffectKind::Combo { passes } => {
                x = fb.put_str(x, y, "COMBO x", style);
                x = fb.put_str(x, y, format_u64(passes as u64, &mut buf), style);
                x = fb.put_str(x, y, " +", style);
                fb.put_str(x, y, format_u64(combo_bonus(passes), &mut buf), style);
            }
            EffectKind::Merge { .. } => {}
        }
    }

    fn draw_side_panel(&self, fb: &mut FrameBuffer, snap: &GameSnapshot, hud: &Hud, panel_x: u16, start_y: u16) {
        let label = CellStyle::new(Rgb::new(220, 220, 220), Rgb::new(0, 0, 0)).bold();
        let value = CellStyle::new(Rgb::new(200, 200, 200), Rgb::new(0, 0, 0));

        let mut y = start_y;
        for (name, v) in [
            ("SCORE", snap.score),
            ("BEST", snap.best_score),
            ("COINS", snap.coins),
            ("GOAL", snap.current_goal),
            ("LEVEL", snap.level as u64),
        ] {
            fb.put_str(panel_x, y, name, label);
            fb.put_u64(panel_x, y + 1, v, value);
            y = y.saturating_add(3);
        }

        fb.put_str(panel_x, y, "NEXT", label);
        y = y.saturating_add(1);
        let mut x = panel_x;
        for v in snap.next_queue {
            let mut buf = [0u8; 20];
            let style = CellStyle::new(Rgb::new(255, 255, 255), tile_color(v)).bold();
            x = fb.put_str(x, y, " ", style);
            x = fb.put_str(x, y, tile_label(v, 4, &mut buf), style);
            x = fb.put_str(x, y, " ", style);
            x = x.saturating_add(1);
        }
        y = y.saturating_add(2);

        fb.put_str(panel_x, y, "TILES", label);
        y = y.saturating_add(1);
        let mut x = panel_x;
        for v in &snap.available_values {
            let mut buf = [0u8; 20];
            let style = CellStyle::new(tile_color(*v), Rgb::new(0, 0, 0));
            x = fb.put_str(x, y, tile_label(*v, 4, &mut buf), style);
            x = x.saturating_add(1);
        }
        y = y.saturating_add(2);

        if snap.phase == CyclePhase::Resolving && snap.pass_count > 1 {
            fb.put_str(panel_x, y, "CASCADE x", label);
            fb.put_u64(panel_x + 9, y, snap.pass_count as u64, label);
        }
        y = y.saturating_add(2);

        fb.put_str(panel_x, y, "AI", label);
        y = y.saturating_add(1);
        match hud.adapter {
            Some(st) if st.enabled => {
                let x = fb.put_str(panel_x, y, "ON c", value);
                let x = fb.put_u64(x, y, st.client_count as u64, value);
                let x = fb.put_str(x, y, " s", value);
                fb.put_u64(x, y, st.streaming_count as u64, value);
                y = y.saturating_add(1);
                let x = fb.put_str(panel_x, y, "CTRL ", value);
                match st.controller_id {
                    Some(id) => fb.put_u64(x, y, id as u64, value),
                    None => fb.put_str(x, y, "-", value),
                };
            }
            _ => {
                fb.put_str(panel_x, y, "OFF", value);
            }
        }
    }
}

/// Two centred lines over the middle of the frame at `(x, y, w, h)`
fn draw_overlay(fb: &mut FrameBuffer, frame: (u16, u16, u16, u16), title: &str, hint: &str) {
    let (x, y, w, h) = frame;
    let mid_y = y.saturating_add(h / 2);
    let title_style = CellStyle::new(Rgb::new(255, 255, 255), Rgb::new(0, 0, 0)).bold();
    let hint_style = CellStyle::new(Rgb::new(180, 180, 180), Rgb::new(0, 0, 0));
    fb.put_str_centered(x, w, mid_y.saturating_sub(1), title, title_style);
    fb.put_str_centered(x, w, mid_y + 1, hint, hint_style);
}

fn combo_bonus(passes: u32) -> u64 {
    COMBO_BONUS_PER_PASS.saturating_mul(passes as u64)
}

fn merge_pop(snap: &GameSnapshot, row: u8, column: u8) -> bool {
    snap.effects.iter().any(|e| {
        matches!(e.kind, EffectKind::Merge { row: r, column: c, .. } if r == row && c == column)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_fit_cells() {
        let mut buf = [0u8; 20];
        assert_eq!(tile_label(2, 6, &mut buf), "2");
        assert_eq!(tile_label(16384, 6, &mut buf), "16384");
        assert_eq!(tile_label(16384, 4, &mut buf), "16K");
        assert_eq!(tile_label(1 << 21, 4, &mut buf), "2M");
    }

    #[test]
    fn palette_matches_known_values() {
        assert_eq!(tile_color(2), Rgb::new(0x3f, 0x83, 0xf8));
        assert_eq!(tile_color(3), Rgb::new(0x66, 0x66, 0x66));
    }
}
