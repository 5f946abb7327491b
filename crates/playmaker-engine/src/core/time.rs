/// Frame counter driven by host timestamps.
/// The stage has no timer of its own; the host pumps `tick(now)` once per
/// display refresh and this turns those timestamps into frame numbers and deltas.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    frame: u64,
    last_ms: Option<f64>,
    now_ms: f64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new frame at `now_ms`. Returns the elapsed time since the
    /// previous frame; 0 on the first frame or if the host clock went backwards.
    pub fn advance(&mut self, now_ms: f64) -> f64 {
        let elapsed = match self.last_ms {
            Some(last) => (now_ms - last).max(0.0),
            None => 0.0,
        };
        self.frame += 1;
        self.last_ms = Some(now_ms);
        self.now_ms = now_ms;
        elapsed
    }

    /// Current frame number (1 after the first `advance`).
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Timestamp of the current frame.
    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    /// Restart counting, with `now_ms` as the reference for animations
    /// started before the first frame.
    pub fn reset(&mut self, now_ms: f64) {
        self.frame = 0;
        self.last_ms = None;
        self.now_ms = now_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_has_no_delta() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.advance(1000.0), 0.0);
        assert_eq!(clock.frame(), 1);
        assert_eq!(clock.advance(1016.5), 16.5);
        assert_eq!(clock.frame(), 2);
    }

    #[test]
    fn backwards_clock_clamps_to_zero() {
        let mut clock = FrameClock::new();
        clock.advance(500.0);
        assert_eq!(clock.advance(400.0), 0.0);
        assert_eq!(clock.now_ms(), 400.0);
    }

    #[test]
    fn reset_restarts_counting() {
        let mut clock = FrameClock::new();
        clock.advance(10.0);
        clock.advance(20.0);
        clock.reset(99.0);
        assert_eq!(clock.frame(), 0);
        assert_eq!(clock.now_ms(), 99.0);
        assert_eq!(clock.advance(120.0), 0.0);
    }
}
