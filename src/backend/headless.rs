//! Headless runtime - drives the controller from a calloop event loop.
//!
//! Sources: the animation timer, the calibration interval, the speech and
//! synthesis channels, SIGTERM/SIGINT, an optional exit timer and the
//! periodic status log. Everything runs on the loop thread; only the
//! simulated engines' workers live elsewhere.

use calloop::{
    channel::{self, Event as ChannelEvent},
    signals::{Signal, Signals},
    timer::{TimeoutAction, Timer},
    EventLoop,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::simulated::{
    HeadlessSurface, LogSynth, SimulatedGazeEngine, SimulatedGazeMode, SpeechMessage, StdinSpeech,
};
use crate::clock::SystemClock;
use crate::config::{Config, Preferences};
use crate::controller::{Controller, Engines};
use crate::input_source::{InputProvider, ScriptedInputProvider};

/// Calibration sampling interval.
const CALIBRATION_INTERVAL: Duration = Duration::from_millis(50);

/// Runtime options that come from the command line rather than config.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub width: f64,
    pub height: f64,
    pub simulate: SimulatedGazeMode,
    /// Exit after N seconds.
    pub exit_after: Option<u64>,
    /// Switch tracking on even if the preferences leave it off.
    pub track: bool,
    /// Listen for transcripts on stdin.
    pub voice: bool,
    /// JSON input script to replay.
    pub script: Option<PathBuf>,
    /// Start calibration as soon as the loop is up.
    pub calibrate: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            width: 1920.0,
            height: 1080.0,
            simulate: SimulatedGazeMode::Pattern,
            exit_after: None,
            track: false,
            voice: true,
            script: None,
            calibrate: false,
        }
    }
}

impl RuntimeOptions {
    /// Parse a "WxH" resolution string.
    pub fn parse_viewport(s: &str) -> Option<(f64, f64)> {
        let (w, h) = s.split_once('x')?;
        let w = w.trim().parse::<u32>().ok()?;
        let h = h.trim().parse::<u32>().ok()?;
        if w > 0 && h > 0 {
            Some((w as f64, h as f64))
        } else {
            None
        }
    }

    /// Persisted startup toggles with the command-line overrides applied.
    pub fn startup_preferences(&self, prefs: &Preferences) -> Preferences {
        let mut startup = prefs.clone();
        startup.tracking_enabled |= self.track;
        startup.voice_enabled |= self.voice;
        startup
    }
}

/// Scripted input paced against the loop clock.
struct ScriptPlayer {
    provider: ScriptedInputProvider,
    resume_at: Option<Instant>,
}

impl ScriptPlayer {
    /// Feed events until the next wait or the end of the script.
    fn pump(&mut self, controller: &mut Controller, now: Instant) {
        if matches!(self.resume_at, Some(at) if now < at) {
            return;
        }
        self.resume_at = None;
        while let Some(event) = self.provider.next_event() {
            if let Some(wait) = controller.handle_input(&event) {
                self.resume_at = Some(now + wait);
                return;
            }
        }
    }

    fn finished(&self) -> bool {
        self.resume_at.is_none() && !self.provider.has_events()
    }
}

/// Loop state shared by every source callback.
pub struct Runtime {
    pub controller: Controller,
    pub running: bool,
    script: Option<ScriptPlayer>,
}

/// Run until a signal, the exit timer, or script end (when no other input
/// is live).
pub fn run(config: Config, options: RuntimeOptions) -> anyhow::Result<()> {
    let mut event_loop = EventLoop::<Runtime>::try_new()?;
    let handle = event_loop.handle();

    let (speech_tx, speech_rx) = channel::channel::<SpeechMessage>();
    let (synth_tx, synth_rx) = channel::channel::<u64>();

    let surface = HeadlessSurface::new(options.width, options.height);
    let stats = Arc::clone(&surface.stats);
    let speech = if options.voice {
        StdinSpeech::new(speech_tx)
    } else {
        StdinSpeech::unsupported(speech_tx)
    };
    let engines = Engines {
        gaze: Box::new(SimulatedGazeEngine::new(options.simulate, options.width, options.height)),
        speech: Box::new(speech),
        synth: Box::new(LogSynth::new(synth_tx)),
        surface: Box::new(surface),
    };

    let mut controller = Controller::new(&config, engines, Arc::new(SystemClock));
    controller.apply_startup_toggles(&options.startup_preferences(&config.preferences));
    if options.calibrate {
        if let Err(e) = controller.start_calibration() {
            debug!("Startup calibration skipped: {}", e);
        }
    }

    let script = match &options.script {
        Some(path) => {
            let provider = ScriptedInputProvider::from_file(path)
                .map_err(|e| anyhow::anyhow!("failed to load script '{}': {}", path.display(), e))?;
            info!("Replaying {} scripted event(s) from {}", provider.remaining(), path.display());
            Some(ScriptPlayer {
                provider,
                resume_at: None,
            })
        }
        None => None,
    };

    let mut runtime = Runtime {
        controller,
        running: true,
        script,
    };

    // Animation tick
    let tick = Duration::from_millis(config.runtime.tick_ms.max(1));
    handle
        .insert_source(Timer::from_duration(tick), move |_, _, rt: &mut Runtime| {
            if let Some(player) = rt.script.as_mut() {
                player.pump(&mut rt.controller, Instant::now());
            }
            rt.controller.animation_tick();
            for notice in rt.controller.drain_notices() {
                info!(severity = notice.severity.as_str(), "Notice: {}", notice.message);
            }
            TimeoutAction::ToDuration(tick)
        })
        .map_err(|e| anyhow::anyhow!("failed to register animation timer: {}", e.error))?;

    // Calibration interval
    handle
        .insert_source(
            Timer::from_duration(CALIBRATION_INTERVAL),
            |_, _, rt: &mut Runtime| {
                rt.controller.calibration_tick();
                TimeoutAction::ToDuration(CALIBRATION_INTERVAL)
            },
        )
        .map_err(|e| anyhow::anyhow!("failed to register calibration timer: {}", e.error))?;

    // Speech provider output
    handle
        .insert_source(speech_rx, |event, _, rt: &mut Runtime| match event {
            ChannelEvent::Msg(SpeechMessage::Transcript(text)) => {
                rt.controller.on_transcript(&text);
            }
            ChannelEvent::Msg(SpeechMessage::Ended) => {
                debug!("Speech provider ended");
                rt.controller.on_speech_ended();
            }
            ChannelEvent::Closed => debug!("Speech channel closed"),
        })
        .map_err(|e| anyhow::anyhow!("failed to register speech channel: {}", e.error))?;

    // Synthesis finished notifications
    handle
        .insert_source(synth_rx, |event, _, rt: &mut Runtime| {
            if let ChannelEvent::Msg(utterance) = event {
                rt.controller.on_synthesis_finished(utterance);
            }
        })
        .map_err(|e| anyhow::anyhow!("failed to register synthesis channel: {}", e.error))?;

    // Signal handling: SIGTERM and SIGINT for graceful shutdown
    let signals = Signals::new(&[Signal::SIGTERM, Signal::SIGINT])
        .map_err(|e| anyhow::anyhow!("failed to create signal source: {}", e))?;
    handle
        .insert_source(signals, |event, _, rt: &mut Runtime| {
            info!("Received signal {:?}, shutting down", event.signal());
            rt.running = false;
        })
        .map_err(|e| anyhow::anyhow!("failed to register signal handler: {}", e.error))?;

    // Exit timer for CI
    if let Some(seconds) = options.exit_after {
        info!("Will exit after {} seconds", seconds);
        handle
            .insert_source(
                Timer::from_duration(Duration::from_secs(seconds)),
                |_, _, rt: &mut Runtime| {
                    info!("Exit timer fired");
                    rt.running = false;
                    TimeoutAction::Drop
                },
            )
            .map_err(|e| anyhow::anyhow!("failed to register exit timer: {}", e.error))?;
    }

    // Periodic status logging
    let status_every = Duration::from_secs(config.runtime.status_interval_s.max(1));
    handle
        .insert_source(Timer::from_duration(status_every), move |_, _, rt: &mut Runtime| {
            info!("Status: {}", rt.controller.status_sexp());
            TimeoutAction::ToDuration(status_every)
        })
        .map_err(|e| anyhow::anyhow!("failed to register status timer: {}", e.error))?;

    info!(
        "Runtime initialized ({}x{}, gaze {}, tick {}ms), entering event loop",
        options.width,
        options.height,
        options.simulate.as_str(),
        tick.as_millis()
    );

    let script_only = !options.voice && options.simulate == SimulatedGazeMode::Off;
    while runtime.running {
        event_loop.dispatch(Some(tick), &mut runtime)?;
        if script_only && runtime.script.as_ref().map_or(false, |s| s.finished()) {
            info!("Script finished");
            runtime.running = false;
        }
    }

    let summary = stats
        .lock()
        .map(|s| s.clone())
        .unwrap_or_else(|e| e.into_inner().clone());
    if summary.activations == 0 && summary.clicks == 0 {
        warn!("No activations during this run");
    }
    info!(
        "Shutting down: {} activation(s), {} click(s), {:.0}px scrolled, {} navigation(s)",
        summary.activations, summary.clicks, summary.scrolled_px, summary.navigations
    );
    info!("Final status: {}", runtime.controller.status_sexp());
    Ok(())
}
