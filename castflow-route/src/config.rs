use std::fmt;

/// Hard cap on how far flow may drop down a shaft of empty cells.
pub const MAX_DROP: u8 = u8::MAX;

#[derive(Debug, Clone, PartialEq)]
pub struct RouteConfig {
    /// Cells scanned below a channel when looking for the next node (1..=255).
    pub max_drop: u8,
    /// Mold tables draw one unit every `draw_interval` ticks.
    pub draw_interval: u64,
    /// Temperature a full mold must fall below before it solidifies.
    pub solidify_below: f32,
    /// Degrees a mold loses per tick while not being filled.
    pub cooling_per_tick: f32,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            max_drop: MAX_DROP,
            draw_interval: 2,
            solidify_below: 300.0,
            cooling_per_tick: 10.0,
        }
    }
}

impl RouteConfig {
    /// Defaults, overridden by CASTFLOW_MAX_DROP and CASTFLOW_DRAW_INTERVAL env vars.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(max_drop) = env_parse::<u8>("CASTFLOW_MAX_DROP") {
            config = config.with_max_drop(max_drop);
        }
        if let Some(interval) = env_parse::<u64>("CASTFLOW_DRAW_INTERVAL") {
            config.draw_interval = interval.max(1);
        }
        config
    }

    pub fn with_max_drop(mut self, max_drop: u8) -> Self {
        self.max_drop = max_drop.max(1);
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

impl fmt::Display for RouteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "max_drop={} draw_interval={} solidify_below={:.0} cooling_per_tick={:.1}",
            self.max_drop, self.draw_interval, self.solidify_below, self.cooling_per_tick
        )
    }
}
