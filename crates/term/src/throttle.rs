//! Frame pacing for the terminal loop.

use crate::engine::GameSnapshot;
use crate::types::CyclePhase;

/// Skips redundant frames while nothing on screen moves.
#[derive(Debug, Clone)]
pub struct RenderThrottle {
    min_static_interval_ms: u64,
    last_render_ms: u64,
    last_fingerprint: u64,
    has_rendered: bool,
}

impl RenderThrottle {
    pub fn new(min_static_interval_ms: u64) -> Self {
        Self {
            min_static_interval_ms,
            last_render_ms: 0,
            last_fingerprint: 0,
            has_rendered: false,
        }
    }

    /// Decide whether to render a new frame.
    ///
    /// - When `is_static=false`: always render.
    /// - When `is_static=true`: render immediately on fingerprint change, otherwise at most
    ///   once per `min_static_interval_ms`.
    pub fn should_render(&mut self, now_ms: u64, fingerprint: u64, is_static: bool) -> bool {
        let due = !self.has_rendered
            || !is_static
            || fingerprint != self.last_fingerprint
            || now_ms.saturating_sub(self.last_render_ms) >= self.min_static_interval_ms;
        if due {
            self.has_rendered = true;
            self.last_render_ms = now_ms;
            self.last_fingerprint = fingerprint;
        }
        due
    }

    /// Render decision for an engine snapshot plus the UI cursor.
    pub fn should_render_snapshot(&mut self, now_ms: u64, snap: &GameSnapshot, cursor: u8) -> bool {
        let fingerprint = snap.state_hash() ^ ((cursor as u64) << 56);
        self.should_render(now_ms, fingerprint, is_static(snap))
    }
}

/// Nothing animates: no tile in flight and no effect fading out.
pub fn is_static(snap: &GameSnapshot) -> bool {
    snap.sliding.is_none()
        && snap.falling.is_none()
        && snap.effects.is_empty()
        && snap.phase != CyclePhase::Resolving
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_always_renders() {
        let mut t = RenderThrottle::new(250);
        assert!(t.should_render(0, 1, true));
    }

    #[test]
    fn static_frames_render_on_change_or_interval() {
        let mut t = RenderThrottle::new(250);
        assert!(t.should_render(0, 1, true));
        assert!(!t.should_render(10, 1, true));
        assert!(t.should_render(11, 2, true));
        assert!(!t.should_render(260, 2, true));
        assert!(t.should_render(261, 2, true));
    }

    #[test]
    fn moving_frames_always_render() {
        let mut t = RenderThrottle::new(250);
        for now in 0..3 {
            assert!(t.should_render(now, 1, false));
        }
    }

    #[test]
    fn cursor_moves_count_as_changes() {
        let snap = GameSnapshot::default();
        let mut t = RenderThrottle::new(250);
        assert!(is_static(&snap));
        assert!(t.should_render_snapshot(0, &snap, 3));
        assert!(!t.should_render_snapshot(16, &snap, 3));
        assert!(t.should_render_snapshot(32, &snap, 2));
    }
}
