use merge_drop::engine::GameSnapshot;
use merge_drop::term::{AdapterStatusView, AnchorY, FrameBuffer, GameView, Hud, Viewport};
use merge_drop::types::Lifecycle;

fn screen_text(fb: &FrameBuffer) -> String {
    (0..fb.height())
        .map(|y| fb.row_text(y))
        .collect::<Vec<_>>()
        .join("\n")
}

fn playing_snapshot() -> GameSnapshot {
    GameSnapshot {
        lifecycle: Lifecycle::Playing,
        ..GameSnapshot::default()
    }
}

#[test]
fn term_view_renders_rounded_border_below_marker_row() {
    let view = GameView::default();
    assert_eq!(view.frame_size(), (38, 26));

    // Frame plus one marker row above and one banner row below.
    let fb = view.render(&playing_snapshot(), &Hud::default(), Viewport::new(38, 28));
    assert_eq!(fb.get(0, 1).unwrap().ch, '╭');
    assert_eq!(fb.get(37, 1).unwrap().ch, '╮');
    assert_eq!(fb.get(0, 26).unwrap().ch, '╰');
    assert_eq!(fb.get(37, 26).unwrap().ch, '╯');
}

#[test]
fn term_view_draws_tile_labels() {
    let mut snap = playing_snapshot();
    snap.grid[7][2] = 16;
    snap.grid[6][2] = 2048;

    let fb = GameView::default().render(&snap, &Hud::default(), Viewport::new(38, 28));
    // Row 7 spans y 23..26 with the label on the middle line.
    assert!(fb.row_text(24).contains("16"));
    assert!(fb.row_text(21).contains("2048"));
    // Empty playable cells show a dot.
    assert!(fb.row_text(24).contains('·'));
}

#[test]
fn term_view_marks_cursor_and_danger_columns() {
    let mut snap = playing_snapshot();
    snap.dangerous_columns[4] = true;
    let hud = Hud {
        cursor: Some(2),
        adapter: None,
    };

    let fb = GameView::default().render(&snap, &hud, Viewport::new(38, 28));
    // Column centres sit at 1 + column * 6 + 3.
    assert_eq!(fb.get(16, 0).unwrap().ch, '▼');
    assert_eq!(fb.get(28, 0).unwrap().ch, '!');
}

#[test]
fn term_view_overlays_follow_lifecycle() {
    let view = GameView::default();
    let vp = Viewport::new(38, 28);
    let hud = Hud::default();

    let title = view.render(&GameSnapshot::default(), &hud, vp);
    assert!(screen_text(&title).contains("MERGE DROP"));

    let paused = GameSnapshot {
        lifecycle: Lifecycle::Paused,
        ..GameSnapshot::default()
    };
    assert!(screen_text(&view.render(&paused, &hud, vp)).contains("PAUSED"));

    let over = GameSnapshot {
        lifecycle: Lifecycle::GameOver,
        ..GameSnapshot::default()
    };
    assert!(screen_text(&view.render(&over, &hud, vp)).contains("GAME OVER"));

    let playing = screen_text(&view.render(&playing_snapshot(), &hud, vp));
    assert!(!playing.contains("GAME OVER"));
    assert!(!playing.contains("PAUSED"));
}

#[test]
fn term_view_draws_side_panel_when_wide_enough() {
    let mut snap = playing_snapshot();
    snap.score = 1234;
    snap.current_goal = 1024;
    let hud = Hud {
        cursor: None,
        adapter: Some(AdapterStatusView {
            enabled: true,
            client_count: 2,
            controller_id: Some(1),
            streaming_count: 1,
        }),
    };

    let view = GameView::default();
    let narrow = screen_text(&view.render(&snap, &hud, Viewport::new(38, 28)));
    assert!(!narrow.contains("SCORE"));

    let wide = screen_text(&view.render(&snap, &hud, Viewport::new(80, 28)));
    assert!(wide.contains("SCORE"));
    assert!(wide.contains("1234"));
    assert!(wide.contains("NEXT"));
    assert!(wide.contains("ON c2 s1"));
    assert!(wide.contains("CTRL 1"));
}

#[test]
fn term_view_top_anchor_ignores_extra_height() {
    let view = GameView::default().with_anchor_y(AnchorY::Top);
    let fb = view.render(&playing_snapshot(), &Hud::default(), Viewport::new(38, 60));
    assert_eq!(fb.get(0, 1).unwrap().ch, '╭');

    let centered = GameView::default().render(&playing_snapshot(), &Hud::default(), Viewport::new(38, 60));
    // (60 - 28) / 2 + 1
    assert_eq!(centered.get(0, 17).unwrap().ch, '╭');
}
