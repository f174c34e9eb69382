//! # Frame statistics
//!
//! Tracks recent frame times and how long each frame waited for an in-flight
//! slot, so backpressure from the device shows up next to the frame rate.
//!
//! ## Usage
//!
//! ```rust
//! use lifegrid::performance::FrameMonitor;
//!
//! let mut monitor = FrameMonitor::new();
//!
//! // In your frame loop
//! monitor.begin_frame();
//! // ... acquire slot, encode, submit ...
//! monitor.end_frame(std::time::Duration::ZERO);
//!
//! println!("{:.1} fps", monitor.metrics().fps);
//! ```

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Averaged frame statistics over the sample window
#[derive(Debug, Clone, PartialEq)]
pub struct FrameMetrics {
    /// Current frames per second
    pub fps: f32,
    /// Average frame time in milliseconds
    pub frame_time_ms: f32,
    /// Minimum frame time in the current window
    pub min_frame_time_ms: f32,
    /// Maximum frame time in the current window
    pub max_frame_time_ms: f32,
    /// Average time spent blocked on the in-flight limiter
    pub acquire_wait_ms: f32,
    /// Frames recorded since the monitor was created or reset
    pub frames: u64,
}

impl Default for FrameMetrics {
    fn default() -> Self {
        Self {
            fps: 0.0,
            frame_time_ms: 0.0,
            min_frame_time_ms: f32::MAX,
            max_frame_time_ms: 0.0,
            acquire_wait_ms: 0.0,
            frames: 0,
        }
    }
}

/// Frame time monitor
pub struct FrameMonitor {
    /// Ring buffer of recent (frame time, acquire wait) samples
    samples: VecDeque<(Duration, Duration)>,
    max_samples: usize,
    frame_start: Option<Instant>,
    current_metrics: FrameMetrics,
    last_update: Instant,
    last_report: Instant,
    update_interval: Duration,
    report_interval: Duration,
}

impl FrameMonitor {
    pub fn new() -> Self {
        Self::with_config(120, Duration::from_secs(5)) // ~2 seconds at 60fps
    }

    /// Monitor averaging over `max_samples` frames, logging every `report_interval`
    pub fn with_config(max_samples: usize, report_interval: Duration) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples,
            frame_start: None,
            current_metrics: FrameMetrics::default(),
            last_update: Instant::now(),
            last_report: Instant::now(),
            update_interval: Duration::from_millis(100),
            report_interval,
        }
    }

    /// Mark the beginning of a frame
    pub fn begin_frame(&mut self) {
        self.frame_start = Some(Instant::now());
    }

    /// Mark the end of a frame that spent `acquire_wait` blocked
    pub fn end_frame(&mut self, acquire_wait: Duration) {
        if let Some(start) = self.frame_start.take() {
            self.record_frame(start.elapsed(), acquire_wait);

            if self.last_update.elapsed() >= self.update_interval {
                self.update_metrics();
                self.last_update = Instant::now();
            }
            if self.last_report.elapsed() >= self.report_interval {
                let m = &self.current_metrics;
                log::debug!(
                    "{:.1} fps, {:.2} ms/frame (min {:.2}, max {:.2}), {:.2} ms waiting for a frame slot",
                    m.fps,
                    m.frame_time_ms,
                    m.min_frame_time_ms,
                    m.max_frame_time_ms,
                    m.acquire_wait_ms
                );
                self.last_report = Instant::now();
            }
        }
    }

    /// Add a sample directly
    pub fn record_frame(&mut self, frame_time: Duration, acquire_wait: Duration) {
        if self.samples.len() >= self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back((frame_time, acquire_wait));
        self.current_metrics.frames += 1;
    }

    fn update_metrics(&mut self) {
        if self.samples.is_empty() {
            return;
        }
        let count = self.samples.len() as u32;

        let total_time: Duration = self.samples.iter().map(|(t, _)| *t).sum();
        let total_wait: Duration = self.samples.iter().map(|(_, w)| *w).sum();
        let avg_frame_time_ms = (total_time / count).as_secs_f32() * 1000.0;

        let metrics = &mut self.current_metrics;
        metrics.frame_time_ms = avg_frame_time_ms;
        metrics.fps = if avg_frame_time_ms > 0.0 {
            1000.0 / avg_frame_time_ms
        } else {
            0.0
        };
        metrics.acquire_wait_ms = (total_wait / count).as_secs_f32() * 1000.0;

        if let (Some(min_time), Some(max_time)) = (
            self.samples.iter().map(|(t, _)| *t).min(),
            self.samples.iter().map(|(t, _)| *t).max(),
        ) {
            metrics.min_frame_time_ms = min_time.as_secs_f32() * 1000.0;
            metrics.max_frame_time_ms = max_time.as_secs_f32() * 1000.0;
        }
    }

    /// Recomputes and returns the averaged metrics
    pub fn metrics(&mut self) -> &FrameMetrics {
        self.update_metrics();
        &self.current_metrics
    }

}

impl Default for FrameMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_average_window() {
        let mut monitor = FrameMonitor::with_config(4, Duration::from_secs(60));
        for ms in [10, 20, 30, 40] {
            monitor.record_frame(Duration::from_millis(ms), Duration::from_millis(ms / 10));
        }

        let metrics = monitor.metrics().clone();
        assert!((metrics.frame_time_ms - 25.0).abs() < 0.01);
        assert!((metrics.fps - 40.0).abs() < 0.01);
        assert!((metrics.min_frame_time_ms - 10.0).abs() < 0.01);
        assert!((metrics.max_frame_time_ms - 40.0).abs() < 0.01);
        assert!((metrics.acquire_wait_ms - 2.5).abs() < 0.01);
        assert_eq!(metrics.frames, 4);
    }

    #[test]
    fn test_old_samples_fall_out_of_window() {
        let mut monitor = FrameMonitor::with_config(2, Duration::from_secs(60));
        monitor.record_frame(Duration::from_millis(100), Duration::ZERO);
        monitor.record_frame(Duration::from_millis(10), Duration::ZERO);
        monitor.record_frame(Duration::from_millis(10), Duration::ZERO);

        assert_eq!(monitor.samples.len(), 2);
        assert!((monitor.metrics().max_frame_time_ms - 10.0).abs() < 0.01);
        assert_eq!(monitor.metrics().frames, 3);
    }

    #[test]
    fn test_begin_end_records_a_frame() {
        let mut monitor = FrameMonitor::new();
        monitor.end_frame(Duration::ZERO); // no begin: ignored
        assert_eq!(monitor.metrics().frames, 0);

        monitor.begin_frame();
        monitor.end_frame(Duration::ZERO);
        assert_eq!(monitor.metrics().frames, 1);
    }
}
