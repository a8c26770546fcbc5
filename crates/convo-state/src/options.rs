//! Runtime-tunable knobs. No file-based config loader — the core is not
//! in the business of reading config files — but the thresholds and
//! defaults the machine needs are still expressed as a struct with a
//! sane `Default`, the way `AgentLoopConfig` carries tunables without
//! owning a config parser.

#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Visit count above which a non-advancing path is treated as stalled.
    pub stall_visit_threshold: u32,
    /// Turn index above which a non-ending path is treated as stalled.
    pub stall_turn_threshold: u32,
    /// Delay applied to a deferred background message with no explicit
    /// `delay:` tag.
    pub default_deferred_delay_ms: u64,
    /// When set, all armed delays collapse to zero ("reduce motion").
    pub reduce_motion: bool,
    /// Battery level at or below which `battery-changed` reports `isLow`.
    pub low_battery_threshold: i64,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        RuntimeOptions {
            stall_visit_threshold: 10,
            stall_turn_threshold: 100,
            default_deferred_delay_ms: 500,
            reduce_motion: false,
            low_battery_threshold: 20,
        }
    }
}
