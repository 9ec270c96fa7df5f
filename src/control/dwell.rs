//! Dwell activation - sustained hover/focus on a target becomes one click.
//!
//! Each target gets its own session on enter. Every tick recomputes
//! `progress = min(elapsed / dwell_ms * 100, 100)` from the session start,
//! reading `dwell_ms` fresh so mid-session changes apply immediately. At 100
//! the session fires once and disarms; it will not fire again until the
//! target is exited and re-entered.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use tracing::{debug, info};

use crate::clock::elapsed_ms;
use crate::engine::ElementId;

// ── Events ─────────────────────────────────────────────────

/// Events emitted by the dwell engine.
#[derive(Debug, Clone, PartialEq)]
pub enum DwellEvent {
    /// Dwell reached 100 % on the target.
    Activated { target: ElementId },
    /// Session ended before completion.
    Cancelled { target: ElementId, progress: f64 },
}

// ── Session ────────────────────────────────────────────────

/// Live dwell session for one target.
#[derive(Debug, Clone)]
pub struct DwellSession {
    pub target: ElementId,
    pub started_at: Instant,
    /// 0-100.
    pub progress: f64,
    /// Dwell duration in effect at the last tick (ms).
    pub threshold_ms: f64,
    /// False once the session has fired.
    pub armed: bool,
}

// ── Engine ─────────────────────────────────────────────────

/// Tracks independent dwell sessions keyed by target.
pub struct DwellActivationEngine {
    sessions: BTreeMap<ElementId, DwellSession>,
    disabled: BTreeSet<ElementId>,
    /// Total activations fired.
    pub activations: u64,
}

impl DwellActivationEngine {
    pub fn new() -> Self {
        Self {
            sessions: BTreeMap::new(),
            disabled: BTreeSet::new(),
            activations: 0,
        }
    }

    /// Hover or focus entered `target`. Returns true if a new session began.
    /// Entering a target that already has a session is a no-op.
    pub fn enter(&mut self, target: ElementId, now: Instant, dwell_ms: f64) -> bool {
        if self.disabled.contains(&target) || self.sessions.contains_key(&target) {
            return false;
        }
        self.sessions.insert(
            target,
            DwellSession {
                target,
                started_at: now,
                progress: 0.0,
                threshold_ms: dwell_ms,
                armed: true,
            },
        );
        debug!(target = target.0, "Dwell session started");
        true
    }

    /// Hover or focus left `target`. Cancels without firing.
    pub fn exit(&mut self, target: ElementId) -> Option<DwellEvent> {
        let session = self.sessions.remove(&target)?;
        if session.armed && session.progress > 0.0 {
            debug!(target = target.0, progress = session.progress, "Dwell cancelled");
        }
        Some(DwellEvent::Cancelled {
            target,
            progress: session.progress,
        })
    }

    /// Mark a target disabled (cancels any session) or re-enable it.
    pub fn set_disabled(&mut self, target: ElementId, disabled: bool) -> Option<DwellEvent> {
        if disabled {
            self.disabled.insert(target);
            self.exit(target)
        } else {
            self.disabled.remove(&target);
            None
        }
    }

    /// Recompute progress for every session and fire completed ones.
    pub fn tick(&mut self, now: Instant, dwell_ms: f64) -> Vec<DwellEvent> {
        let threshold = dwell_ms.max(1.0);
        let mut events = Vec::new();

        for session in self.sessions.values_mut() {
            session.threshold_ms = threshold;
            if !session.armed {
                continue;
            }
            let elapsed = elapsed_ms(session.started_at, now);
            session.progress = (elapsed / threshold * 100.0).min(100.0);

            if session.progress >= 100.0 {
                session.progress = 0.0;
                session.armed = false;
                self.activations += 1;
                info!(target = session.target.0, elapsed_ms = elapsed, "Dwell activation");
                events.push(DwellEvent::Activated {
                    target: session.target,
                });
            }
        }

        events
    }

    /// Progress (0-100) of the session on `target`, if any.
    pub fn progress(&self, target: ElementId) -> Option<f64> {
        self.sessions.get(&target).map(|s| s.progress)
    }

    pub fn session(&self, target: ElementId) -> Option<&DwellSession> {
        self.sessions.get(&target)
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    /// Cancel every session (tracking disabled, calibration started).
    pub fn clear(&mut self) -> Vec<DwellEvent> {
        let targets: Vec<ElementId> = self.sessions.keys().copied().collect();
        targets.into_iter().filter_map(|t| self.exit(t)).collect()
    }

    pub fn status_sexp(&self) -> String {
        let max_progress = self
            .sessions
            .values()
            .map(|s| s.progress)
            .fold(0.0f64, f64::max);
        format!(
            "(:sessions {} :max-progress {:.0} :activations {})",
            self.sessions.len(),
            max_progress,
            self.activations,
        )
    }
}

impl Default for DwellActivationEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ──────────────────────────────────────────────────
