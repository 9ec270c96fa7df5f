//! Guided 9-point calibration sequencer.
//!
//! `Idle → Running → Completed`, with `Running → Idle` on cancel. Each point
//! gets a settle window (gaze drifts onto the target, nothing recorded) and
//! a record window in which the point's pixel position is submitted as
//! ground truth every `sample_interval_ms`. Point boundaries are computed
//! from the session start rather than accumulated, so the full run always
//! takes exactly `9 × (settle + record)`.

use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::clock::elapsed_ms;
use crate::config::CalibrationConfig;

// ── Points ─────────────────────────────────────────────────

/// A calibration target in viewport percentages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationPoint {
    pub x_pct: f64,
    pub y_pct: f64,
}

impl CalibrationPoint {
    const fn new(x_pct: f64, y_pct: f64) -> Self {
        Self { x_pct, y_pct }
    }

    /// Pixel position inside a `width × height` viewport.
    pub fn to_pixels(&self, width: f64, height: f64) -> (f64, f64) {
        (self.x_pct * width / 100.0, self.y_pct * height / 100.0)
    }
}

/// Fixed visiting order: corners, edge midpoints and center, row by row.
pub const CALIBRATION_POINTS: [CalibrationPoint; 9] = [
    CalibrationPoint::new(10.0, 10.0),
    CalibrationPoint::new(50.0, 10.0),
    CalibrationPoint::new(90.0, 10.0),
    CalibrationPoint::new(10.0, 50.0),
    CalibrationPoint::new(50.0, 50.0),
    CalibrationPoint::new(90.0, 50.0),
    CalibrationPoint::new(10.0, 90.0),
    CalibrationPoint::new(50.0, 90.0),
    CalibrationPoint::new(90.0, 90.0),
];

// ── Phase / events ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPhase {
    Idle,
    Running,
    Completed,
}

impl CalibrationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
        }
    }
}

/// Events emitted by `tick`.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationEvent {
    /// The sequencer moved on to point `index`.
    PointStarted { index: usize },
    /// Submit `(x, y)` as ground truth for point `index`.
    Record { index: usize, x: f64, y: f64 },
    /// All nine points done. Emitted once per run.
    Completed,
}

// ── Sequencer ──────────────────────────────────────────────

pub struct CalibrationSequencer {
    pub config: CalibrationConfig,
    phase: CalibrationPhase,
    started_at: Option<Instant>,
    active_point: usize,
    progress: f64,
    elapsed_ms: f64,
    next_sample_at: Option<Instant>,
    /// Ground-truth submissions per point in the current run.
    pub recordings: [u32; 9],
    /// Completed runs since creation.
    pub completions: u64,
}

impl CalibrationSequencer {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            phase: CalibrationPhase::Idle,
            started_at: None,
            active_point: 0,
            progress: 0.0,
            elapsed_ms: 0.0,
            next_sample_at: None,
            recordings: [0; 9],
            completions: 0,
        }
    }

    fn point_duration_ms(&self) -> u64 {
        self.config.settle_ms + self.config.record_ms
    }

    /// Total run length in milliseconds.
    pub fn total_duration_ms(&self) -> u64 {
        self.point_duration_ms() * CALIBRATION_POINTS.len() as u64
    }

    fn point_start(&self, started: Instant, index: usize) -> Instant {
        started + Duration::from_millis(self.point_duration_ms() * index as u64)
    }

    /// Begin a fresh run. Allowed from `Idle` or `Completed`; returns false
    /// if a run is already in progress.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.phase == CalibrationPhase::Running {
            debug!("Calibration start ignored: already running");
            return false;
        }
        self.phase = CalibrationPhase::Running;
        self.started_at = Some(now);
        self.active_point = 0;
        self.progress = 0.0;
        self.elapsed_ms = 0.0;
        self.recordings = [0; 9];
        self.next_sample_at = Some(now + Duration::from_millis(self.config.settle_ms));
        info!(
            "Calibration started ({} points, {} ms)",
            CALIBRATION_POINTS.len(),
            self.total_duration_ms()
        );
        true
    }

    /// Abort a running calibration. Drops every pending sample.
    pub fn cancel(&mut self) -> bool {
        if self.phase != CalibrationPhase::Running {
            return false;
        }
        info!(
            "Calibration cancelled at point {} ({:.0}%)",
            self.active_point, self.progress
        );
        self.clear_to_idle();
        true
    }

    /// Return a completed run to `Idle` (calibration data reset).
    pub fn reset(&mut self) -> bool {
        if self.phase != CalibrationPhase::Completed {
            return false;
        }
        self.clear_to_idle();
        self.recordings = [0; 9];
        true
    }

    fn clear_to_idle(&mut self) {
        self.phase = CalibrationPhase::Idle;
        self.started_at = None;
        self.next_sample_at = None;
        self.active_point = 0;
        self.progress = 0.0;
        self.elapsed_ms = 0.0;
    }

    /// Advance the run to `now` for a `width × height` viewport.
    /// At most one sample is recorded per call.
    pub fn tick(&mut self, now: Instant, width: f64, height: f64) -> Vec<CalibrationEvent> {
        let mut events = Vec::new();
        if self.phase != CalibrationPhase::Running {
            return events;
        }
        let started = match self.started_at {
            Some(s) => s,
            None => return events,
        };

        let per_point = self.point_duration_ms() as f64;
        let elapsed = elapsed_ms(started, now);
        self.elapsed_ms = elapsed;

        if elapsed >= self.total_duration_ms() as f64 {
            self.phase = CalibrationPhase::Completed;
            self.active_point = CALIBRATION_POINTS.len() - 1;
            self.progress = 100.0;
            self.next_sample_at = None;
            self.completions += 1;
            info!(
                "Calibration complete: {} samples recorded",
                self.recordings.iter().sum::<u32>()
            );
            events.push(CalibrationEvent::Completed);
            return events;
        }

        let index = ((elapsed / per_point) as usize).min(CALIBRATION_POINTS.len() - 1);
        if index != self.active_point {
            self.active_point = index;
            self.next_sample_at = Some(
                self.point_start(started, index) + Duration::from_millis(self.config.settle_ms),
            );
            debug!("Calibration: point {}", index);
            events.push(CalibrationEvent::PointStarted { index });
        }

        let in_point = elapsed - index as f64 * per_point;
        self.progress = (in_point / per_point * 100.0).clamp(0.0, 100.0);

        let point_end = self.point_start(started, index + 1);
        if let Some(next) = self.next_sample_at {
            if now >= next && now < point_end {
                let (x, y) = CALIBRATION_POINTS[index].to_pixels(width, height);
                self.recordings[index] += 1;
                self.next_sample_at = Some(next + Duration::from_millis(self.config.sample_interval_ms));
                events.push(CalibrationEvent::Record { index, x, y });
            }
        }

        events
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == CalibrationPhase::Running
    }

    pub fn active_point(&self) -> usize {
        self.active_point
    }

    /// Progress through the active point (0-100); pinned at 100 once complete.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    pub fn status_sexp(&self) -> String {
        format!(
            "(:phase :{} :point {} :progress {:.0} :elapsed-ms {:.0} :samples {})",
            self.phase.as_str(),
            self.active_point,
            self.progress,
            self.elapsed_ms,
            self.recordings.iter().sum::<u32>(),
        )
    }
}

// ── Tests ──────────────────────────────────────────────────
