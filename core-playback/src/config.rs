//! Playback configuration

use std::time::Duration;

/// Playback session configuration
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Bounded wait for the engine to report ready after a load
    pub ready_timeout: Duration,

    /// Interval of the periodic position writer while playing
    pub position_save_interval: Duration,

    /// Playback fraction at or above which a track counts as finished
    pub completion_threshold: f64,

    /// How close (seconds) position must be to duration, with the engine
    /// stopped, to detect natural completion
    pub completion_window_secs: f64,

    /// Maximum queue length; larger folders are windowed around the start index
    pub queue_capacity: usize,

    /// Seconds into a track after which "previous" restarts it instead of
    /// jumping back a queue item
    pub previous_restart_window_secs: f64,

    /// Default skip-backward amount in seconds
    pub skip_backward_secs: f64,

    /// Default skip-forward amount in seconds
    pub skip_forward_secs: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            ready_timeout: Duration::from_secs(30),
            position_save_interval: Duration::from_secs(5),
            completion_threshold: 0.98,
            completion_window_secs: 0.5,
            queue_capacity: 500,
            previous_restart_window_secs: 3.0,
            skip_backward_secs: 10.0,
            skip_forward_secs: 30.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlaybackConfig::default();
        assert_eq!(config.ready_timeout, Duration::from_secs(30));
        assert_eq!(config.position_save_interval, Duration::from_secs(5));
        assert_eq!(config.completion_threshold, 0.98);
        assert_eq!(config.queue_capacity, 500);
    }
}
