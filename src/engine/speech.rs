//! Speech-recognition supervision - keep the provider listening while voice
//! is switched on.
//!
//! Providers end their session on their own (silence, network hiccups,
//! platform limits). When that happens and voice is still wanted, the
//! supervisor restarts the provider. The first restart after a healthy
//! session is immediate; repeated terminations without any transcript in
//! between back off exponentially and eventually give up.

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::VoiceConfig;
use crate::engine::SpeechEngine;
use crate::error::{Error, Result};

/// Outcome of a supervisor tick worth surfacing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    Restarted { attempt: u32 },
    GaveUp { attempts: u32 },
}

pub struct SpeechSupervisor {
    pub config: VoiceConfig,
    intended: bool,
    listening: bool,
    restart_at: Option<Instant>,
    /// Terminations since the last transcript.
    consecutive_failures: u32,
    gave_up: bool,
    /// Successful restarts since creation.
    pub restarts: u64,
}

impl SpeechSupervisor {
    pub fn new(config: VoiceConfig) -> Self {
        Self {
            config,
            intended: false,
            listening: false,
            restart_at: None,
            consecutive_failures: 0,
            gave_up: false,
            restarts: 0,
        }
    }

    /// Switch voice on. Fails with `UnsupportedCapability` if the provider
    /// is absent; an already-running provider is treated as started.
    pub fn enable(&mut self, engine: &mut dyn SpeechEngine) -> Result<()> {
        if !engine.is_supported() {
            return Err(Error::UnsupportedCapability {
                capability: "speech recognition",
            });
        }
        self.intended = true;
        self.gave_up = false;
        self.consecutive_failures = 0;
        self.restart_at = None;
        self.try_start(engine)
    }

    /// Switch voice off and cancel any pending restart.
    pub fn disable(&mut self, engine: &mut dyn SpeechEngine) {
        self.intended = false;
        self.restart_at = None;
        if self.listening {
            engine.stop();
        }
        self.listening = false;
        info!("Speech recognition stopped");
    }

    fn try_start(&mut self, engine: &mut dyn SpeechEngine) -> Result<()> {
        match engine.start() {
            Ok(()) => {
                self.listening = true;
                info!("Speech recognition listening");
                Ok(())
            }
            Err(Error::TransientRestartFailure) => {
                // Raced with a live instance: it is listening, resync.
                debug!("Speech start raced with running instance; treating as started");
                self.listening = true;
                Ok(())
            }
            Err(e) => {
                self.listening = false;
                Err(e)
            }
        }
    }

    /// Delay before the n-th consecutive restart attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let shift = (attempt - 2).min(16);
        let ms = self
            .config
            .restart_base_ms
            .saturating_mul(1u64 << shift)
            .min(self.config.restart_max_ms);
        Duration::from_millis(ms)
    }

    /// The provider ended its session.
    pub fn on_terminated(&mut self, now: Instant) {
        self.listening = false;
        if !self.intended || self.gave_up {
            return;
        }
        self.consecutive_failures += 1;
        let delay = self.backoff(self.consecutive_failures);
        self.restart_at = Some(now + delay);
        debug!(
            attempt = self.consecutive_failures,
            delay_ms = delay.as_millis() as u64,
            "Speech provider ended; restart scheduled"
        );
    }

    /// A transcript arrived, so the stream is healthy.
    pub fn on_transcript(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Run a due restart, if any.
    pub fn tick(&mut self, engine: &mut dyn SpeechEngine, now: Instant) -> Option<SupervisorEvent> {
        let due = self.restart_at?;
        if now < due || !self.intended {
            return None;
        }
        self.restart_at = None;

        let attempt = self.consecutive_failures;
        if attempt > self.config.max_restart_attempts {
            self.gave_up = true;
            warn!(attempts = attempt, "Speech recognition keeps ending; giving up");
            return Some(SupervisorEvent::GaveUp { attempts: attempt });
        }

        match self.try_start(engine) {
            Ok(()) => {
                self.restarts += 1;
                Some(SupervisorEvent::Restarted { attempt })
            }
            Err(e) => {
                warn!("Speech restart failed: {}", e);
                self.on_terminated(now);
                None
            }
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn is_intended(&self) -> bool {
        self.intended
    }

    pub fn has_given_up(&self) -> bool {
        self.gave_up
    }

    pub fn restart_pending(&self) -> bool {
        self.restart_at.is_some()
    }

    pub fn status_sexp(&self) -> String {
        format!(
            "(:intended {} :listening {} :restart-pending {} :failures {} :restarts {} :gave-up {})",
            if self.intended { "t" } else { "nil" },
            if self.listening { "t" } else { "nil" },
            if self.restart_at.is_some() { "t" } else { "nil" },
            self.consecutive_failures,
            self.restarts,
            if self.gave_up { "t" } else { "nil" },
        )
    }
}
