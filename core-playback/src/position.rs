//! Position persistence
//!
//! The periodic writer that keeps a playing track's resume point durable,
//! plus the completion threshold math shared with the session.
//!
//! This is a tolerant, best-effort writer: a missed or delayed write only
//! costs resume precision, never the correctness of other state. Write
//! failures are logged and swallowed.

use bridge_traits::engine::EngineStatus;
use core_library::TrackRepository;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

/// Fraction of a track played, 0.0 while the duration is unknown.
pub fn playback_progress(position_secs: f64, duration_secs: f64) -> f64 {
    if duration_secs > 0.0 {
        position_secs / duration_secs
    } else {
        0.0
    }
}

/// Whether the played fraction has reached the completion threshold.
pub fn is_past_threshold(position_secs: f64, duration_secs: f64, threshold: f64) -> bool {
    playback_progress(position_secs, duration_secs) >= threshold
}

/// Spawn the interval writer for one loaded track.
///
/// Every tick reads the latest engine status and, while the engine is
/// playing with a nonzero position, persists the position together with the
/// threshold-derived completion flag. The session aborts the task on
/// pause/stop/error and spawns a fresh one when playback (re)starts.
pub(crate) fn spawn_position_saver(
    tracks: Arc<dyn TrackRepository>,
    status_rx: watch::Receiver<EngineStatus>,
    track_url: String,
    interval: Duration,
    completion_threshold: f64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick fires immediately; skip it so the first write lands
        // one full interval into playback.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let status = *status_rx.borrow();
            if !status.playing || status.position_secs <= 0.0 {
                continue;
            }

            let completed = is_past_threshold(
                status.position_secs,
                status.duration_secs,
                completion_threshold,
            );

            match tracks
                .update_position(&track_url, status.position_secs, completed)
                .await
            {
                Ok(()) => trace!(
                    track_url = %track_url,
                    position = status.position_secs,
                    completed,
                    "Position saved"
                ),
                Err(e) => warn!(track_url = %track_url, error = %e, "Position save failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundary() {
        // 0.979 is below the 0.98 threshold
        assert!(!is_past_threshold(97.9, 100.0, 0.98));
        // 0.981 is above it
        assert!(is_past_threshold(98.1, 100.0, 0.98));
        // The boundary itself is inclusive
        assert!(is_past_threshold(98.0, 100.0, 0.98));
    }

    #[test]
    fn test_unknown_duration_never_completes() {
        assert_eq!(playback_progress(500.0, 0.0), 0.0);
        assert!(!is_past_threshold(500.0, 0.0, 0.98));
    }

    #[test]
    fn test_progress() {
        assert!((playback_progress(30.0, 120.0) - 0.25).abs() < 1e-12);
    }
}
