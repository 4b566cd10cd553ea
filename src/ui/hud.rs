/// HUD: composes one frame of the board and side panel into a FrameBuffer.
///
/// World units are scaled to fit the terminal. A terminal cell is roughly
/// twice as tall as it is wide, so one row covers twice the world height
/// of one column. Pieces are drawn as filled discs of their tier letter.
///
/// Layout:
///   ┌ board ──────────────┐  ┌ panel ───────┐
///   │ height line  ------ │  │ SCORE / BEST │
///   │ pieces       AA BBB │  │ NEXT         │
///   │ base         ====== │  │ controls     │
///   └─────────────────────┘  └──────────────┘

use crossterm::style::Color;

use crate::config::GameConfig;
use crate::domain::physics::{PhysicsPort, Vec2};
use crate::domain::piece::PieceState;
use crate::domain::rules::GameOverReason;
use crate::domain::tier::TierId;
use crate::sim::world::PieceView;
use crate::sim::Game;
use crate::ui::renderer::{Cell, FrameBuffer};

const PANEL_W: usize = 24;
const BOARD_X: usize = 1;
const BOARD_Y: usize = 1;
/// World height of a row relative to the world width of a column.
const CELL_ASPECT: f32 = 2.0;

const TIER_COLORS: [Color; 8] = [
    Color::Rgb { r: 255, g: 170, b: 90 },
    Color::Rgb { r: 120, g: 200, b: 255 },
    Color::Rgb { r: 140, g: 230, b: 120 },
    Color::Rgb { r: 250, g: 120, b: 170 },
    Color::Rgb { r: 200, g: 150, b: 255 },
    Color::Rgb { r: 255, g: 230, b: 90 },
    Color::Rgb { r: 90, g: 230, b: 210 },
    Color::Rgb { r: 255, g: 255, b: 255 },
];
const LINE_COLOR: Color = Color::Rgb { r: 120, g: 60, b: 60 };
const DANGER_COLOR: Color = Color::Rgb { r: 255, g: 70, b: 70 };
const BASE_COLOR: Color = Color::Rgb { r: 150, g: 120, b: 90 };
const DIM: Color = Color::Rgb { r: 110, g: 110, b: 130 };

/// Everything one frame needs, detached from the game.
pub struct Scene<'a> {
    pub config: &'a GameConfig,
    pub pieces: Vec<PieceView>,
    pub score: u32,
    pub best: u32,
    pub next: TierId,
    pub game_over: Option<GameOverReason>,
    pub new_record: bool,
    pub linger: f32,
}

impl<'a> Scene<'a> {
    pub fn capture<P: PhysicsPort>(game: &'a Game<P>) -> Self {
        Scene {
            config: game.config(),
            pieces: game.pieces(),
            score: game.score(),
            best: game.best_score(),
            next: game.next_tier(),
            game_over: game.game_over_reason(),
            new_record: false,
            linger: game.linger(),
        }
    }
}

pub fn reason_text(reason: GameOverReason) -> &'static str {
    match reason {
        GameOverReason::HeightLimit => "stacked past the line",
        GameOverReason::BaseOut => "a brother left the base",
        GameOverReason::BottomOut => "sank below the base",
        GameOverReason::FallenOut => "fell off the stage",
    }
}

// ── Board scaling ──

/// World → terminal mapping for the board area.
#[derive(Clone, Copy, Debug)]
struct Viewport {
    /// World units per column.
    sx: f32,
    /// World units per row.
    sy: f32,
    cols: usize,
    rows: usize,
}

impl Viewport {
    fn fit(config: &GameConfig, buf_w: usize, buf_h: usize) -> Self {
        let avail_cols = buf_w.saturating_sub(PANEL_W + BOARD_X + 1).max(8) as f32;
        let avail_rows = buf_h.saturating_sub(BOARD_Y + 1).max(4) as f32;
        let stage = &config.stage;
        let sx = (stage.width / avail_cols).max(stage.height / (avail_rows * CELL_ASPECT));
        let sy = sx * CELL_ASPECT;
        Viewport {
            sx,
            sy,
            cols: (stage.width / sx).ceil() as usize,
            rows: (stage.height / sy).ceil() as usize,
        }
    }

    fn col(&self, x: f32) -> Option<usize> {
        let c = (x / self.sx).floor();
        (c >= 0.0 && (c as usize) < self.cols).then(|| c as usize)
    }

    fn row(&self, y: f32) -> Option<usize> {
        let r = (y / self.sy).floor();
        (r >= 0.0 && (r as usize) < self.rows).then(|| r as usize)
    }

    /// World position of a cell's centre.
    fn center(&self, col: usize, row: usize) -> Vec2 {
        Vec2::new((col as f32 + 0.5) * self.sx, (row as f32 + 0.5) * self.sy)
    }
}

fn tier_color(tier: TierId) -> Color {
    TIER_COLORS[tier.0 % TIER_COLORS.len()]
}

fn tier_glyph(config: &GameConfig, tier: TierId) -> char {
    config
        .tiers
        .name(tier)
        .chars()
        .next()
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or('?')
}

// ══════════════════════════════════════════════════════════════
// Compose
// ══════════════════════════════════════════════════════════════

pub fn compose(scene: &Scene, buf: &mut FrameBuffer) {
    let view = Viewport::fit(scene.config, buf.width(), buf.height());
    compose_stage(scene, &view, buf);
    compose_pieces(scene, &view, buf);
    compose_panel(scene, &view, buf);
}

fn put(buf: &mut FrameBuffer, view: &Viewport, col: usize, row: usize, cell: Cell) {
    if col < view.cols && row < view.rows {
        buf.set(BOARD_X + col, BOARD_Y + row, cell);
    }
}

fn compose_stage(scene: &Scene, view: &Viewport, buf: &mut FrameBuffer) {
    let stage = &scene.config.stage;

    // Height line, brighter while it is being violated.
    let (line_ch, line_fg) = if scene.linger > 0.0 { ('━', DANGER_COLOR) } else { ('╌', LINE_COLOR) };
    if let Some(row) = view.row(scene.config.game_over.line_y) {
        for col in 0..view.cols {
            put(buf, view, col, row, Cell::new(line_ch, line_fg));
        }
    }

    // Base
    if let (Some(row), Some(left), Some(right)) = (
        view.row(stage.base_top()),
        view.col(stage.base_left()),
        view.col(stage.base_right() - 0.01),
    ) {
        for col in left..=right {
            put(buf, view, col, row, Cell::new('▀', BASE_COLOR));
        }
    }

    if stage.side_walls {
        for wall in stage.wall_rects() {
            let Some(col) = view.col(wall.min.x + wall.size.x / 2.0) else { continue };
            for row in 0..view.rows {
                put(buf, view, col, row, Cell::new('│', DIM));
            }
        }
    }

    // Right edge of the board
    for row in 0..view.rows {
        buf.set(BOARD_X + view.cols, BOARD_Y + row, Cell::new('┊', DIM));
    }
}

fn compose_pieces(scene: &Scene, view: &Viewport, buf: &mut FrameBuffer) {
    for piece in scene.pieces.iter().filter(|p| p.state != PieceState::Holding) {
        draw_disc(scene, view, buf, piece);
    }
    // Held piece last, with a guide down to whatever it would hit.
    if let Some(held) = scene.pieces.iter().find(|p| p.state == PieceState::Holding) {
        draw_guide(scene, view, buf, held);
        draw_disc(scene, view, buf, held);
    }
}

fn draw_disc(scene: &Scene, view: &Viewport, buf: &mut FrameBuffer, piece: &PieceView) {
    let cell = Cell::new(tier_glyph(scene.config, piece.tier), tier_color(piece.tier));
    let r = piece.radius;
    let c = piece.position;
    let cols = (c.x - r).max(0.0)..=(c.x + r);
    let rows = (c.y - r).max(0.0)..=(c.y + r);
    let (Some(c0), Some(r0)) = (view.col(*cols.start()), view.row(*rows.start())) else {
        return;
    };
    let c1 = view.col(*cols.end()).unwrap_or(view.cols.saturating_sub(1));
    let r1 = view.row(*rows.end()).unwrap_or(view.rows.saturating_sub(1));

    let mut drew = false;
    for row in r0..=r1 {
        for col in c0..=c1 {
            if (view.center(col, row) - c).length() <= r {
                put(buf, view, col, row, cell);
                drew = true;
            }
        }
    }
    // Pieces smaller than a cell still show up.
    if !drew {
        if let (Some(col), Some(row)) = (view.col(c.x), view.row(c.y)) {
            put(buf, view, col, row, cell);
        }
    }
}

fn draw_guide(scene: &Scene, view: &Viewport, buf: &mut FrameBuffer, held: &PieceView) {
    let (Some(col), Some(start)) = (view.col(held.position.x), view.row(held.position.y + held.radius)) else {
        return;
    };
    let bottom = view.row(scene.config.stage.base_top()).unwrap_or(view.rows);
    for row in start + 1..bottom {
        let here = buf.get(BOARD_X + col, BOARD_Y + row);
        if here != Cell::BLANK && here.fg != LINE_COLOR && here.fg != DANGER_COLOR {
            break;
        }
        put(buf, view, col, row, Cell::new('·', DIM));
    }
}

fn compose_panel(scene: &Scene, view: &Viewport, buf: &mut FrameBuffer) {
    let x = BOARD_X + view.cols + 3;
    let label = Color::Rgb { r: 180, g: 180, b: 200 };
    let value = Color::White;

    buf.put_str(x, BOARD_Y, "BROTHER STACK", Color::Rgb { r: 255, g: 200, b: 80 });
    buf.put_str(x, BOARD_Y + 2, "SCORE", label);
    buf.put_str(x + 7, BOARD_Y + 2, &scene.score.to_string(), value);
    buf.put_str(x, BOARD_Y + 3, "BEST", label);
    buf.put_str(x + 7, BOARD_Y + 3, &scene.best.to_string(), value);
    buf.put_str(x, BOARD_Y + 5, "NEXT", label);
    buf.put_str(
        x + 7,
        BOARD_Y + 5,
        scene.config.tiers.name(scene.next),
        tier_color(scene.next),
    );

    if let Some(reason) = scene.game_over {
        buf.put_str(x, BOARD_Y + 7, "GAME OVER", DANGER_COLOR);
        buf.put_str(x, BOARD_Y + 8, reason_text(reason), value);
        if scene.new_record {
            buf.put_str(x, BOARD_Y + 9, "NEW RECORD!", Color::Rgb { r: 255, g: 220, b: 50 });
        }
        buf.put_str(x, BOARD_Y + 11, "R  play again", label);
        buf.put_str(x, BOARD_Y + 12, "Q  quit", label);
        return;
    }

    if scene.linger > 0.0 {
        let left = (scene.config.game_over.linger - scene.linger).max(0.0);
        buf.put_str(x, BOARD_Y + 7, &format!("DANGER {left:.1}s"), DANGER_COLOR);
    }
    let help = ["←/→ A/D  aim", "SPACE    drop", "R        restart", "Q/ESC    quit"];
    for (i, line) in help.iter().enumerate() {
        buf.put_str(x, BOARD_Y + 9 + i, line, DIM);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::piece::PieceId;
    use crate::sim::testkit::test_config;

    fn scene(config: &GameConfig) -> Scene<'_> {
        Scene {
            config,
            pieces: vec![],
            score: 0,
            best: 0,
            next: TierId(0),
            game_over: None,
            new_record: false,
            linger: 0.0,
        }
    }

    fn view(id: u32, tier: usize, state: PieceState, x: f32, y: f32) -> PieceView {
        PieceView { id: PieceId(id), tier: TierId(tier), state, position: Vec2::new(x, y), radius: 26.0 }
    }

    fn text(buf: &FrameBuffer) -> String {
        (0..buf.height()).map(|y| buf.row_text(y)).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn viewport_keeps_whole_stage_on_screen() {
        let cfg = test_config();
        for (w, h) in [(80, 24), (120, 40), (200, 60), (40, 12)] {
            let v = Viewport::fit(&cfg, w, h);
            assert!(v.cols as f32 * v.sx >= cfg.stage.width);
            assert!(v.rows as f32 * v.sy >= cfg.stage.height);
            if w >= 80 {
                assert!(BOARD_X + v.cols + PANEL_W <= w + 1);
                assert!(BOARD_Y + v.rows <= h);
            }
        }
    }

    #[test]
    fn panel_shows_score_best_and_next() {
        let cfg = test_config();
        let mut s = scene(&cfg);
        s.score = 200;
        s.best = 450;
        s.next = TierId(1);
        let mut buf = FrameBuffer::new(100, 32);
        compose(&s, &mut buf);
        let t = text(&buf);
        assert!(t.contains("SCORE  200"));
        assert!(t.contains("BEST   450"));
        assert!(t.contains("NEXT   B"));
        assert!(!t.contains("GAME OVER"));
    }

    #[test]
    fn pieces_drawn_with_tier_letter() {
        let cfg = test_config();
        let mut s = scene(&cfg);
        s.pieces = vec![
            view(1, 0, PieceState::Locked, 200.0, 700.0),
            view(2, 2, PieceState::Dropping, 350.0, 500.0),
        ];
        let mut buf = FrameBuffer::new(100, 32);
        compose(&s, &mut buf);
        let v = Viewport::fit(&cfg, 100, 32);
        let a = buf.get(BOARD_X + v.col(200.0).unwrap(), BOARD_Y + v.row(700.0).unwrap());
        let c = buf.get(BOARD_X + v.col(350.0).unwrap(), BOARD_Y + v.row(500.0).unwrap());
        assert_eq!(a.ch, 'A');
        assert_eq!(c.ch, 'C');
        assert_ne!(a.fg, c.fg);
    }

    #[test]
    fn base_and_height_line_are_drawn() {
        let cfg = test_config();
        let s = scene(&cfg);
        let mut buf = FrameBuffer::new(100, 32);
        compose(&s, &mut buf);
        let v = Viewport::fit(&cfg, 100, 32);
        let base_row = BOARD_Y + v.row(cfg.stage.base_top()).unwrap();
        let mid = BOARD_X + v.col(cfg.stage.center_x()).unwrap();
        assert_eq!(buf.get(mid, base_row).ch, '▀');
        let line_row = BOARD_Y + v.row(cfg.game_over.line_y).unwrap();
        assert_eq!(buf.get(mid, line_row).ch, '╌');
    }

    #[test]
    fn danger_countdown_while_lingering() {
        let cfg = test_config();
        let mut s = scene(&cfg);
        s.linger = 0.5;
        let mut buf = FrameBuffer::new(100, 32);
        compose(&s, &mut buf);
        let t = text(&buf);
        assert!(t.contains("DANGER 1.5s"));
        assert!(t.contains('━'));
    }

    #[test]
    fn game_over_panel() {
        let cfg = test_config();
        let mut s = scene(&cfg);
        s.game_over = Some(GameOverReason::BaseOut);
        s.new_record = true;
        let mut buf = FrameBuffer::new(100, 32);
        compose(&s, &mut buf);
        let t = text(&buf);
        assert!(t.contains("GAME OVER"));
        assert!(t.contains(reason_text(GameOverReason::BaseOut)));
        assert!(t.contains("NEW RECORD!"));
        assert!(!t.contains("DANGER"));
    }

    #[test]
    fn held_piece_has_drop_guide() {
        let cfg = test_config();
        let mut s = scene(&cfg);
        s.pieces = vec![view(1, 0, PieceState::Holding, 270.0, cfg.spawn.y)];
        let mut buf = FrameBuffer::new(100, 32);
        compose(&s, &mut buf);
        let v = Viewport::fit(&cfg, 100, 32);
        let col = BOARD_X + v.col(270.0).unwrap();
        let below = BOARD_Y + v.row(cfg.game_over.line_y).unwrap() + 2;
        assert_eq!(buf.get(col, below).ch, '·');
    }

    #[test]
    fn capture_reads_game_views() {
        use crate::sim::save::MemoryScoreStore;
        use crate::sim::testkit::FakePhysics;
        let mut game = Game::new(test_config(), FakePhysics::new(), Box::new(MemoryScoreStore::new(30)), 5);
        game.start();
        let s = Scene::capture(&game);
        assert_eq!(s.best, 30);
        assert_eq!(s.pieces.len(), 1);
        assert_eq!(s.pieces[0].state, PieceState::Holding);
        assert_eq!(s.next, game.next_tier());
    }
}
