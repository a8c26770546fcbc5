//! Time Context — tracks the in-fiction clock from `time:`/`day:` tags.
//!
//! Before the chunk tagged `story_start`, `time`/`day` tags are display-only:
//! they annotate messages but do not move the clock. After `story_start`,
//! the clock is monotonic; a `time:` tag that would move it backwards is
//! rejected rather than applied.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};

/// A parsed `h:mm AM/PM` time-of-day, comparable within a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeOfDay {
    minutes_since_midnight: u32,
}

impl TimeOfDay {
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let (clock, meridiem) = s.split_once(' ')?;
        let meridiem = meridiem.trim().to_ascii_uppercase();
        let (h, m) = clock.split_once(':')?;
        let mut hour: u32 = h.trim().parse().ok()?;
        let minute: u32 = m.trim().parse().ok()?;
        if !(1..=12).contains(&hour) || minute >= 60 {
            return None;
        }

        match meridiem.as_str() {
            "AM" => {
                if hour == 12 {
                    hour = 0;
                }
            }
            "PM" => {
                if hour != 12 {
                    hour += 12;
                }
            }
            _ => return None,
        }

        Some(TimeOfDay {
            minutes_since_midnight: hour * 60 + minute,
        })
    }

    pub fn minutes_since_midnight(&self) -> u32 {
        self.minutes_since_midnight
    }
}

/// The running in-fiction clock.
#[derive(Debug, Clone, Default)]
pub struct TimeContext {
    started: bool,
    current: Option<TimeOfDay>,
    day: u64,
}

impl TimeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn current(&self) -> Option<TimeOfDay> {
        self.current
    }

    pub fn day(&self) -> u64 {
        self.day
    }

    /// Mark `story_start`. Clock enforcement begins on the next `apply_time`.
    pub fn start(&mut self) {
        self.started = true;
    }

    /// Apply a `day:` tag. Always accepted; days only ever move forward in
    /// practice but nothing here depends on that.
    pub fn apply_day(&mut self, day: u64) {
        self.day = day;
    }

    /// Roll over to the next day, as triggered by the `advance_day` bridge
    /// function. Resets the clock to `morning_time` if given, otherwise to
    /// one minute past midnight — bypassing `apply_time`'s monotonic check
    /// since a day boundary was just crossed.
    pub fn roll_to_next_day(&mut self, morning_time: Option<TimeOfDay>) {
        self.day += 1;
        self.current = Some(morning_time.unwrap_or(TimeOfDay { minutes_since_midnight: 1 }));
    }

    /// Apply a `time:` tag. Before `story_start` this is display-only and
    /// always succeeds without moving the clock. After `story_start`, a time
    /// earlier than the current one is rejected.
    pub fn apply_time(&mut self, raw: &str) -> Result<(), CoreError> {
        let parsed = match TimeOfDay::parse(raw) {
            Some(t) => t,
            None => return Ok(()),
        };

        if !self.started {
            return Ok(());
        }

        if let Some(current) = self.current {
            if parsed < current {
                return Err(CoreError::TimeNotForward {
                    current: format!("{:02}:{:02}", current.minutes_since_midnight / 60, current.minutes_since_midnight % 60),
                    new: raw.to_string(),
                });
            }
        }

        self.current = Some(parsed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_morning_and_noon() {
        assert_eq!(TimeOfDay::parse("9:15 AM").unwrap().minutes_since_midnight(), 9 * 60 + 15);
        assert_eq!(TimeOfDay::parse("12:00 PM").unwrap().minutes_since_midnight(), 12 * 60);
        assert_eq!(TimeOfDay::parse("12:00 AM").unwrap().minutes_since_midnight(), 0);
    }

    #[test]
    fn pre_story_start_time_is_display_only() {
        let mut ctx = TimeContext::new();
        ctx.apply_time("9:00 AM").unwrap();
        assert!(ctx.current().is_none());
    }

    #[test]
    fn post_story_start_time_advances() {
        let mut ctx = TimeContext::new();
        ctx.start();
        ctx.apply_time("9:00 AM").unwrap();
        ctx.apply_time("9:30 AM").unwrap();
        assert_eq!(ctx.current().unwrap().minutes_since_midnight(), 9 * 60 + 30);
    }

    #[test]
    fn backwards_time_is_rejected() {
        let mut ctx = TimeContext::new();
        ctx.start();
        ctx.apply_time("9:30 AM").unwrap();
        assert!(ctx.apply_time("9:00 AM").is_err());
        assert_eq!(ctx.current().unwrap().minutes_since_midnight(), 9 * 60 + 30);
    }

    #[test]
    fn roll_to_next_day_bumps_day_and_resets_clock() {
        let mut ctx = TimeContext::new();
        ctx.start();
        ctx.apply_time("11:45 PM").unwrap();
        ctx.apply_day(1);

        ctx.roll_to_next_day(TimeOfDay::parse("7:00 AM"));

        assert_eq!(ctx.day(), 2);
        assert_eq!(ctx.current().unwrap().minutes_since_midnight(), 7 * 60);
    }

    #[test]
    fn roll_to_next_day_without_a_morning_time_lands_one_minute_past_midnight() {
        let mut ctx = TimeContext::new();
        ctx.roll_to_next_day(None);
        assert_eq!(ctx.current().unwrap().minutes_since_midnight(), 1);
    }
}
