use std::collections::BTreeMap;
use std::time::Instant;

use crate::shared::constants::PROGRESS_INTERVAL;

/// Cross-cutting logger for pipeline orchestration events.
///
/// Keeps the frame loop free of output concerns; callers pick where
/// progress and timing end up.
pub trait PipelineLogger: Send {
    /// Report that `current` frames are done. `total` is 0 when the
    /// container does not know its frame count.
    fn progress(&mut self, current: usize, total: usize);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. faces per frame).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything. For tests and library callers with their own
/// reporting.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Running count and sum of one recorded series.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Stat {
    pub count: usize,
    pub total: f64,
}

impl Stat {
    fn record(&mut self, value: f64) {
        self.count += 1;
        self.total += value;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// CLI logger: throttled progress lines, per-stage timing and a summary
/// at the end of the run. Memory stays constant in the number of frames.
pub struct StdoutPipelineLogger {
    interval: usize,
    timings: BTreeMap<String, Stat>,
    metrics: BTreeMap<String, Stat>,
    start_time: Instant,
    frames_done: usize,
    reports: usize,
}

impl StdoutPipelineLogger {
    pub fn new(interval: usize) -> Self {
        Self {
            interval: interval.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            start_time: Instant::now(),
            frames_done: 0,
            reports: 0,
        }
    }

    /// The progress line for `current`, or `None` when it is throttled.
    pub fn progress_line(&self, current: usize, total: usize) -> Option<String> {
        if current == 0 || current % self.interval != 0 {
            return None;
        }
        Some(if total > 0 {
            format!("Processed frame {current}/{total}")
        } else {
            format!("Processed frame {current}")
        })
    }

    /// Multi-line end-of-run report, or `None` before anything was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let share = |total_ms: f64| {
            if elapsed_s > 0.0 {
                total_ms / (elapsed_s * 10.0)
            } else {
                0.0
            }
        };

        let header = format!(
            "Pipeline summary ({} frames, {elapsed_s:.1}s total):",
            self.frames_done
        );
        let stages = self.timings.iter().map(|(stage, stat)| {
            format!(
                "  {stage:12}: avg {:6.1}ms  total {:7.0}ms  ({:4.1}%)",
                stat.mean(),
                stat.total,
                share(stat.total)
            )
        });
        let metrics = self.metrics.iter().map(|(name, stat)| {
            format!("  {name}: avg {:.1}, total {:.0}", stat.mean(), stat.total)
        });

        let mut lines: Vec<String> = std::iter::once(header).chain(stages).chain(metrics).collect();
        if self.frames_done > 0 && elapsed_s > 0.0 {
            lines.push(format!(
                "  Throughput: {:.1} fps",
                self.frames_done as f64 / elapsed_s
            ));
        }
        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&Stat> {
        self.timings.get(stage)
    }

    pub fn metrics_for(&self, name: &str) -> Option<&Stat> {
        self.metrics.get(name)
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(PROGRESS_INTERVAL)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.frames_done = current;
        if let Some(line) = self.progress_line(current, total) {
            self.reports += 1;
            log::info!("{line}");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .record(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
