//! Engine configuration
//!
//! Tunables for the simulation engine. The defaults are the stock
//! settings; `from_env` lets a user override a few of them without a rebuild.

use std::time::Duration;

use crate::error::{LifeError, Result};

/// Configuration for a [`LifeEngine`](crate::engine::LifeEngine)
///
/// Built with `Default` and the builder-style `with_*` methods, then checked
/// with [`LifeConfig::validate`] before an engine is created.
#[derive(Debug, Clone, PartialEq)]
pub struct LifeConfig {
    /// Number of grid buffers in the rotating pool
    pub ring_depth: usize,
    /// Maximum number of frames whose GPU work may be outstanding
    pub max_frames_in_flight: usize,
    /// Probability that a cell starts alive after (re)allocation
    pub initial_alive_probability: f64,
    /// Quiet period a resize burst must observe before the grid is rebuilt
    pub resize_debounce: Duration,
    /// Acquire waits longer than this are logged as stalls
    pub stall_warning: Duration,
    /// Present with vsync instead of the lowest-latency mode
    pub vsync: bool,
    /// Fixed RNG seed; `None` draws from OS entropy
    pub seed: Option<u64>,
}

impl Default for LifeConfig {
    fn default() -> Self {
        Self {
            ring_depth: 3,
            max_frames_in_flight: 3,
            initial_alive_probability: 0.10,
            resize_debounce: Duration::from_millis(200),
            stall_warning: Duration::from_millis(250),
            vsync: true,
            seed: None,
        }
    }
}

impl LifeConfig {
    pub const ENV_ALIVE_PROBABILITY: &'static str = "LIFEGRID_ALIVE_PROBABILITY";
    pub const ENV_RESIZE_DEBOUNCE_MS: &'static str = "LIFEGRID_RESIZE_DEBOUNCE_MS";
    pub const ENV_SEED: &'static str = "LIFEGRID_SEED";
    pub const ENV_VSYNC: &'static str = "LIFEGRID_VSYNC";

    pub fn with_ring_depth(mut self, depth: usize) -> Self {
        self.ring_depth = depth;
        self
    }

    pub fn with_max_frames_in_flight(mut self, frames: usize) -> Self {
        self.max_frames_in_flight = frames;
        self
    }

    pub fn with_initial_alive_probability(mut self, probability: f64) -> Self {
        self.initial_alive_probability = probability;
        self
    }

    pub fn with_resize_debounce(mut self, delay: Duration) -> Self {
        self.resize_debounce = delay;
        self
    }

    pub fn with_stall_warning(mut self, threshold: Duration) -> Self {
        self.stall_warning = threshold;
        self
    }

    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Checks the invariants the frame loop relies on
    ///
    /// The ring must be at least as deep as the in-flight capacity, otherwise
    /// a buffer can be picked as a write target while a render that reads it
    /// is still outstanding.
    pub fn validate(&self) -> Result<()> {
        if self.max_frames_in_flight == 0 {
            return Err(LifeError::config("max_frames_in_flight must be at least 1"));
        }
        if self.ring_depth < 2 {
            return Err(LifeError::config(format!(
                "ring_depth must be at least 2 (one read, one write), got {}",
                self.ring_depth
            )));
        }
        if self.ring_depth < self.max_frames_in_flight {
            return Err(LifeError::config(format!(
                "ring_depth ({}) must be >= max_frames_in_flight ({})",
                self.ring_depth, self.max_frames_in_flight
            )));
        }
        if !(0.0..=1.0).contains(&self.initial_alive_probability) {
            return Err(LifeError::config(format!(
                "initial_alive_probability must be within [0, 1], got {}",
                self.initial_alive_probability
            )));
        }
        Ok(())
    }

    /// Default configuration overlaid with `LIFEGRID_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Applies overrides from any key/value source
    pub fn overlay<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(Self::ENV_ALIVE_PROBABILITY) {
            self.initial_alive_probability = parse(Self::ENV_ALIVE_PROBABILITY, &raw)?;
        }
        if let Some(raw) = lookup(Self::ENV_RESIZE_DEBOUNCE_MS) {
            self.resize_debounce =
                Duration::from_millis(parse(Self::ENV_RESIZE_DEBOUNCE_MS, &raw)?);
        }
        if let Some(raw) = lookup(Self::ENV_SEED) {
            self.seed = Some(parse(Self::ENV_SEED, &raw)?);
        }
        if let Some(raw) = lookup(Self::ENV_VSYNC) {
            self.vsync = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => true,
                "0" | "false" | "off" | "no" => false,
                other => {
                    return Err(LifeError::config(format!(
                        "{}: expected a boolean, got '{}'",
                        Self::ENV_VSYNC,
                        other
                    )))
                }
            };
        }
        self.validate()?;
        Ok(self)
    }
}

fn parse<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| LifeError::config(format!("{}: cannot parse '{}': {}", key, raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn source(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = LifeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ring_depth, 3);
        assert_eq!(config.max_frames_in_flight, 3);
        assert_eq!(config.resize_debounce, Duration::from_millis(200));
        assert!((config.initial_alive_probability - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ring_shallower_than_in_flight_is_rejected() {
        let config = LifeConfig::default()
            .with_ring_depth(3)
            .with_max_frames_in_flight(4);
        assert!(matches!(config.validate(), Err(LifeError::Config(_))));
    }

    #[test]
    fn test_probability_out_of_range_is_rejected() {
        let config = LifeConfig::default().with_initial_alive_probability(1.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overlay_reads_all_keys() {
        let config = LifeConfig::default()
            .overlay(source(&[
                (LifeConfig::ENV_ALIVE_PROBABILITY, "0.25"),
                (LifeConfig::ENV_RESIZE_DEBOUNCE_MS, "50"),
                (LifeConfig::ENV_SEED, "42"),
                (LifeConfig::ENV_VSYNC, "off"),
            ]))
            .unwrap();

        assert!((config.initial_alive_probability - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.resize_debounce, Duration::from_millis(50));
        assert_eq!(config.seed, Some(42));
        assert!(!config.vsync);
    }

    #[test]
    fn test_overlay_rejects_garbage() {
        let result =
            LifeConfig::default().overlay(source(&[(LifeConfig::ENV_SEED, "not-a-number")]));
        assert!(matches!(result, Err(LifeError::Config(_))));

        let result = LifeConfig::default().overlay(source(&[(LifeConfig::ENV_VSYNC, "maybe")]));
        assert!(result.is_err());
    }
}
