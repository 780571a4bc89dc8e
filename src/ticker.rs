/// Rate limiter for periodic work, firing at most once per whole second of
/// uptime no matter how often the main loop spins.
///
/// The uptime counter is a `u32` and will eventually wrap. Once the last
/// fired second gets within [Ticker::OVERFLOW_MARGIN] of the maximum it is
/// reset to zero. Around the wrap this may fire twice for one second or skip
/// an interval, which is acceptable for 1 Hz screen refreshes.
#[derive(Copy, Clone, Debug, Default)]
pub struct Ticker {
    last_fired: u32,
}

impl Ticker {
    const OVERFLOW_MARGIN: u32 = 10;

    /// Return true if `now_secs` is later than the last second this fired
    /// on, and record it as the new last-fired second
    pub fn should_run(&mut self, now_secs: u32) -> bool {
        if u32::MAX - Self::OVERFLOW_MARGIN < self.last_fired {
            self.last_fired = 0;
        }
        if now_secs > self.last_fired {
            self.last_fired = now_secs;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_once_per_second() {
        let mut ticker = Ticker::default();
        // Second zero never fires, same as a freshly booted device
        assert!(!ticker.should_run(0));
        assert!(ticker.should_run(1));
        assert!(!ticker.should_run(1));
        assert!(!ticker.should_run(1));
        assert!(ticker.should_run(2));
        // Skipped seconds fire once on catch-up
        assert!(ticker.should_run(7));
        assert!(!ticker.should_run(7));
    }

    #[test]
    fn test_non_decreasing_input() {
        let mut ticker = Ticker::default();
        let fired = (0..1000u32)
            .map(|i| i / 37)
            .filter(|&second| ticker.should_run(second))
            .count();
        // Seconds 1..=27 each fire exactly once
        assert_eq!(fired, 999 / 37);
    }

    #[test]
    fn test_overflow_reset() {
        let mut ticker = Ticker::default();
        assert!(ticker.should_run(u32::MAX - 5));
        // Counter wrapped around to a small value; the reset lets it fire
        assert!(ticker.should_run(3));
        assert!(!ticker.should_run(3));
    }
}
