use super::engine::Direction;

/// Minimum horizontal travel, in canvas percentage units, for a swipe.
pub const SWIPE_MIN_DX: f64 = 12.0;
/// Maximum vertical drift before the gesture reads as a scroll or drag.
pub const SWIPE_MAX_DY: f64 = 6.0;
/// Gestures slower than this are drags, not swipes.
pub const SWIPE_MAX_MS: u64 = 400;

/// Classifies a completed touch displacement as a rotation swipe.
///
/// Returns `None` for anything outside the envelope; only the resulting
/// direction ever reaches the layer engine.
pub fn classify_swipe(dx: f64, dy: f64, elapsed_ms: u64) -> Option<Direction> {
    if elapsed_ms > SWIPE_MAX_MS || dy.abs() > SWIPE_MAX_DY || dx.abs() < SWIPE_MIN_DX {
        return None;
    }
    if dx > 0.0 {
        Some(Direction::Right)
    } else {
        Some(Direction::Left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_swipe_right() {
        assert_eq!(classify_swipe(20.0, 1.0, 150), Some(Direction::Right));
    }

    #[test]
    fn test_horizontal_swipe_left() {
        assert_eq!(classify_swipe(-18.0, -2.0, 200), Some(Direction::Left));
    }

    #[test]
    fn test_too_short_is_ignored() {
        assert_eq!(classify_swipe(5.0, 0.0, 100), None);
    }

    #[test]
    fn test_vertical_drift_is_scroll() {
        assert_eq!(classify_swipe(30.0, 10.0, 100), None);
    }

    #[test]
    fn test_slow_drag_is_not_a_swipe() {
        assert_eq!(classify_swipe(30.0, 0.0, 900), None);
    }
}
