use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::gesture::domain::gesture::Gesture;

/// Observer for recognition pipeline events.
pub trait PipelineLogger: Send {
    /// `total_frames` is 0 when the source does not report a length.
    fn progress(&mut self, frames_done: usize, total_frames: usize);

    /// Wall time one stage spent on one frame.
    fn stage_time(&mut self, stage: &str, elapsed: Duration);

    /// Point-in-time reading such as a queue depth.
    fn gauge(&mut self, name: &str, value: f64);

    /// Gesture recognized for a frame, `none` included.
    fn gesture(&mut self, _frame_index: usize, _gesture: Gesture) {}

    /// End of run.
    fn finish(&self) {}
}

/// Discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _frames_done: usize, _total_frames: usize) {}
    fn stage_time(&mut self, _stage: &str, _elapsed: Duration) {}
    fn gauge(&mut self, _name: &str, _value: f64) {}
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Stats {
    count: usize,
    sum: f64,
    max: f64,
}

impl Stats {
    fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.max = if self.count == 1 { value } else { self.max.max(value) };
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Reports through the `log` facade.
///
/// Progress goes to `info` every `every_frames` frames, gesture changes go
/// to `debug`, and [`finish`](PipelineLogger::finish) prints per-stage
/// averages in milliseconds.
pub struct LogPipelineLogger {
    every_frames: usize,
    started: Instant,
    frames_done: usize,
    stages: BTreeMap<String, Stats>,
    gauges: BTreeMap<String, Stats>,
    current: Option<Gesture>,
}

impl LogPipelineLogger {
    pub fn new(every_frames: usize) -> Self {
        Self {
            every_frames: every_frames.max(1),
            started: Instant::now(),
            frames_done: 0,
            stages: BTreeMap::new(),
            gauges: BTreeMap::new(),
            current: None,
        }
    }

    /// Multi-line report, or `None` before anything was recorded.
    pub fn report(&self) -> Option<String> {
        if self.stages.is_empty() && self.gauges.is_empty() {
            return None;
        }
        let secs = self.started.elapsed().as_secs_f64();
        let mut out = format!("Recognized {} frames in {secs:.1}s", self.frames_done);
        if self.frames_done > 0 && secs > 0.0 {
            out.push_str(&format!(" ({:.1} fps)", self.frames_done as f64 / secs));
        }
        for (stage, s) in &self.stages {
            out.push_str(&format!(
                "\n  {stage:<10} mean {:6.1}ms  max {:6.1}ms",
                s.mean(),
                s.max
            ));
        }
        for (name, s) in &self.gauges {
            out.push_str(&format!("\n  {name}: mean {:.1}, max {:.0}", s.mean(), s.max));
        }
        Some(out)
    }
}

impl Default for LogPipelineLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn progress(&mut self, frames_done: usize, total_frames: usize) {
        self.frames_done = frames_done;
        let last = total_frames > 0 && frames_done == total_frames;
        if frames_done % self.every_frames != 0 && !last {
            return;
        }
        match total_frames {
            0 => log::info!("Frame {frames_done}"),
            total => log::info!(
                "Frame {frames_done}/{total} ({:.0}%)",
                frames_done as f64 * 100.0 / total as f64
            ),
        }
    }

    fn stage_time(&mut self, stage: &str, elapsed: Duration) {
        self.stages
            .entry(stage.to_string())
            .or_default()
            .add(elapsed.as_secs_f64() * 1000.0);
    }

    fn gauge(&mut self, name: &str, value: f64) {
        self.gauges.entry(name.to_string()).or_default().add(value);
    }

    fn gesture(&mut self, frame_index: usize, gesture: Gesture) {
        if self.current != Some(gesture) {
            log::debug!("Frame {frame_index}: {gesture}");
            self.current = Some(gesture);
        }
    }

    fn finish(&self) {
        if let Some(report) = self.report() {
            log::info!("{report}");
        }
    }
}
