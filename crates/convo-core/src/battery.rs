//! Battery Context — a simple drain model driven by elapsed in-fiction
//! minutes, clamped to `[0, 100]`.
//!
//! Not lookahead-safe: `advance_day` consumes the day boundary it is given
//! and has no notion of what comes after it, the same constraint the
//! `advance_day` bridge function is bound by.

/// Full-to-empty drain time, in minutes. One day (1440 minutes) drains the
/// battery fully if nothing recharges it.
const DRAIN_MINUTES_FULL_TO_EMPTY: f64 = 1440.0;

#[derive(Debug, Clone)]
pub struct BatteryContext {
    level: f64,
}

impl Default for BatteryContext {
    fn default() -> Self {
        BatteryContext { level: 100.0 }
    }
}

impl BatteryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current level, rounded to the nearest whole percent for display.
    pub fn level(&self) -> i64 {
        self.level.round() as i64
    }

    /// Set the level directly from a `status:battery:` tag, clamped.
    pub fn set_level(&mut self, percent: i64) {
        self.level = (percent as f64).clamp(0.0, 100.0);
    }

    /// Drain the battery for `elapsed_minutes` of in-fiction time.
    pub fn drain(&mut self, elapsed_minutes: f64) {
        let drained = (elapsed_minutes / DRAIN_MINUTES_FULL_TO_EMPTY) * 100.0;
        self.level = (self.level - drained).clamp(0.0, 100.0);
    }

    /// Drain the remainder of the current day plus the one minute that
    /// rolls the date, as called from the `advance_day` bridge function —
    /// not a flat 1440 minutes regardless of the hour.
    pub fn advance_day(&mut self, minutes_since_midnight: u32) {
        let remaining = DRAIN_MINUTES_FULL_TO_EMPTY - minutes_since_midnight as f64 + 1.0;
        self.drain(remaining.max(0.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_full() {
        assert_eq!(BatteryContext::new().level(), 100);
    }

    #[test]
    fn drain_is_proportional_to_elapsed_minutes() {
        let mut ctx = BatteryContext::new();
        ctx.drain(720.0);
        assert_eq!(ctx.level(), 50);
    }

    #[test]
    fn drain_clamps_at_zero() {
        let mut ctx = BatteryContext::new();
        ctx.drain(10_000.0);
        assert_eq!(ctx.level(), 0);
    }

    #[test]
    fn set_level_clamps_input() {
        let mut ctx = BatteryContext::new();
        ctx.set_level(150);
        assert_eq!(ctx.level(), 100);
        ctx.set_level(-5);
        assert_eq!(ctx.level(), 0);
    }

    #[test]
    fn advance_day_at_midnight_drains_almost_a_full_day() {
        let mut ctx = BatteryContext::new();
        ctx.advance_day(0);
        assert_eq!(ctx.level(), 0);
    }

    #[test]
    fn advance_day_late_in_the_day_drains_only_the_remainder() {
        let mut ctx = BatteryContext::new();
        ctx.advance_day(1439);
        // Two minutes of drain out of a 1440-minute full cycle: negligible.
        assert_eq!(ctx.level(), 100);
    }
}
