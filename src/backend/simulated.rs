//! Simulated engines for the headless runtime.
//!
//! Stand-ins for the camera gaze estimator, speech recognition, speech
//! synthesis and the UI surface, so the control layer can run end to end
//! without hardware or a display.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use calloop::channel::Sender;
use tracing::{debug, info, warn};

use crate::engine::{
    ElementId, GazeEngine, GazeSample, Permission, SpeechEngine, SpeechSynth, UiSurface,
};
use crate::error::{Error, Result};
use crate::mailbox::Mailbox;
use crate::state::View;

// ── Simulation modes ───────────────────────────────────────

/// How the simulated gaze moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedGazeMode {
    /// Visit each grid tile in turn, two seconds apiece.
    Pattern,
    /// Wander with saccade-like jumps.
    RandomWalk,
    /// Hold the viewport centre.
    Still,
    /// Post nothing; samples come from a script.
    Off,
}

impl SimulatedGazeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pattern => "pattern",
            Self::RandomWalk => "random-walk",
            Self::Still => "still",
            Self::Off => "off",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pattern" => Some(Self::Pattern),
            "random-walk" => Some(Self::RandomWalk),
            "still" => Some(Self::Still),
            "off" => Some(Self::Off),
            _ => None,
        }
    }
}

/// Pure gaze trajectory generator.
#[derive(Debug, Clone)]
pub struct SimulatedGaze {
    pub mode: SimulatedGazeMode,
    pub width: f64,
    pub height: f64,
    pub dwell_s: f64,
    pub saccade_interval_s: f64,
    current: (f64, f64),
    target: (f64, f64),
    last_saccade_s: f64,
}

impl SimulatedGaze {
    pub fn new(mode: SimulatedGazeMode, width: f64, height: f64) -> Self {
        let centre = (width / 2.0, height / 2.0);
        Self {
            mode,
            width,
            height,
            dwell_s: 2.0,
            saccade_interval_s: 2.5,
            current: centre,
            target: centre,
            last_saccade_s: 0.0,
        }
    }

    /// Gaze position at `t_s` seconds since start, with a little tremor.
    pub fn generate(&mut self, t_s: f64) -> Option<(f64, f64)> {
        let (x, y) = match self.mode {
            SimulatedGazeMode::Off => return None,
            SimulatedGazeMode::Still => (self.width / 2.0, self.height / 2.0),
            SimulatedGazeMode::Pattern => {
                let tile = (t_s / self.dwell_s) as usize % (GRID_COLS * GRID_ROWS);
                tile_centre(tile, self.width, self.height)
            }
            SimulatedGazeMode::RandomWalk => {
                if t_s - self.last_saccade_s > self.saccade_interval_s {
                    let fx = 0.5 + (t_s * 1.7).sin() * 0.45;
                    let fy = 0.5 + (t_s * 1.3).cos() * 0.45;
                    self.target = (fx * self.width, fy * self.height);
                    self.last_saccade_s = t_s;
                }
                self.current.0 += 0.1 * (self.target.0 - self.current.0);
                self.current.1 += 0.1 * (self.target.1 - self.current.1);
                self.current
            }
        };
        let jitter_x = (t_s * 37.0).sin() * 6.0;
        let jitter_y = (t_s * 29.0).cos() * 6.0;
        Some((
            (x + jitter_x).clamp(0.0, self.width),
            (y + jitter_y).clamp(0.0, self.height),
        ))
    }
}

// ── Gaze engine ────────────────────────────────────────────

const SAMPLE_INTERVAL: Duration = Duration::from_millis(33);

struct GazeShared {
    paused: AtomicBool,
    shutdown: AtomicBool,
    ground_truth: AtomicU64,
}

/// Gaze engine that posts a simulated trajectory from a worker thread.
pub struct SimulatedGazeEngine {
    generator: Option<SimulatedGaze>,
    shared: Arc<GazeShared>,
    worker: Option<thread::JoinHandle<()>>,
}

impl SimulatedGazeEngine {
    pub fn new(mode: SimulatedGazeMode, width: f64, height: f64) -> Self {
        Self {
            generator: Some(SimulatedGaze::new(mode, width, height)),
            shared: Arc::new(GazeShared {
                paused: AtomicBool::new(false),
                shutdown: AtomicBool::new(false),
                ground_truth: AtomicU64::new(0),
            }),
            worker: None,
        }
    }

    pub fn ground_truth_points(&self) -> u64 {
        self.shared.ground_truth.load(Ordering::Relaxed)
    }
}

impl GazeEngine for SimulatedGazeEngine {
    fn check_camera_permission(&self) -> Permission {
        Permission::Granted
    }

    fn init(&mut self, sink: Mailbox<GazeSample>) -> Result<()> {
        let Some(mut generator) = self.generator.take() else {
            // Worker already running.
            return Ok(());
        };
        let shared = Arc::clone(&self.shared);
        let mode = generator.mode;
        let handle = thread::Builder::new()
            .name("sim-gaze".into())
            .spawn(move || {
                let start = Instant::now();
                while !shared.shutdown.load(Ordering::Relaxed) {
                    if !shared.paused.load(Ordering::Relaxed) {
                        let now = Instant::now();
                        let t_s = now.duration_since(start).as_secs_f64();
                        if let Some((x, y)) = generator.generate(t_s) {
                            sink.post(GazeSample { x, y, at: now });
                        }
                    }
                    thread::sleep(SAMPLE_INTERVAL);
                }
            })
            .map_err(|e| Error::EngineInitFailure {
                message: format!("failed to spawn gaze worker: {}", e),
            })?;
        self.worker = Some(handle);
        info!("Simulated gaze engine started ({})", mode.as_str());
        Ok(())
    }

    fn pause(&mut self) {
        self.shared.paused.store(true, Ordering::Relaxed);
    }

    fn resume(&mut self) {
        self.shared.paused.store(false, Ordering::Relaxed);
    }

    fn record_ground_truth(&mut self, x: f64, y: f64) {
        let n = self.shared.ground_truth.fetch_add(1, Ordering::Relaxed) + 1;
        if n % 24 == 0 {
            debug!("Ground truth: {} points (last {:.0}, {:.0})", n, x, y);
        }
    }

    fn clear_training_data(&mut self) {
        self.shared.ground_truth.store(0, Ordering::Relaxed);
        debug!("Simulated gaze training data cleared");
    }
}

impl Drop for SimulatedGazeEngine {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

// ── Speech recognition ─────────────────────────────────────

/// Messages from the speech reader thread.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechMessage {
    Transcript(String),
    Ended,
}

/// Treats each stdin line as a finalized transcript.
///
/// The reader thread lives for the whole run; `start`/`stop` only gate
/// whether lines are forwarded. EOF is reported as the provider ending.
pub struct StdinSpeech {
    supported: bool,
    listening: Arc<AtomicBool>,
    eof: Arc<AtomicBool>,
    sender: Sender<SpeechMessage>,
    reader_spawned: bool,
}

impl StdinSpeech {
    pub fn new(sender: Sender<SpeechMessage>) -> Self {
        Self {
            supported: true,
            listening: Arc::new(AtomicBool::new(false)),
            eof: Arc::new(AtomicBool::new(false)),
            sender,
            reader_spawned: false,
        }
    }

    /// A provider that reports speech as unavailable.
    pub fn unsupported(sender: Sender<SpeechMessage>) -> Self {
        Self {
            supported: false,
            ..Self::new(sender)
        }
    }

    fn spawn_reader(&mut self) -> Result<()> {
        let listening = Arc::clone(&self.listening);
        let eof = Arc::clone(&self.eof);
        let sender = self.sender.clone();
        thread::Builder::new()
            .name("stdin-speech".into())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    let Ok(line) = line else { break };
                    let text = line.trim();
                    if text.is_empty() || !listening.load(Ordering::Relaxed) {
                        continue;
                    }
                    if sender.send(SpeechMessage::Transcript(text.to_string())).is_err() {
                        return;
                    }
                }
                eof.store(true, Ordering::Relaxed);
                if listening.swap(false, Ordering::Relaxed) {
                    let _ = sender.send(SpeechMessage::Ended);
                }
            })
            .map_err(|e| Error::EngineInitFailure {
                message: format!("failed to spawn speech reader: {}", e),
            })?;
        self.reader_spawned = true;
        Ok(())
    }
}

impl SpeechEngine for StdinSpeech {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn start(&mut self) -> Result<()> {
        if self.listening.load(Ordering::Relaxed) {
            return Err(Error::TransientRestartFailure);
        }
        if !self.reader_spawned {
            self.spawn_reader()?;
        }
        if self.eof.load(Ordering::Relaxed) {
            // Nothing left to hear; end right away.
            let _ = self.sender.send(SpeechMessage::Ended);
            return Ok(());
        }
        self.listening.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn stop(&mut self) {
        self.listening.store(false, Ordering::Relaxed);
    }
}

// ── Speech synthesis ───────────────────────────────────────

/// Logs feedback text and reports it finished after a speaking-time
/// estimate.
pub struct LogSynth {
    finished: Sender<u64>,
    ms_per_char: u64,
}

impl LogSynth {
    pub fn new(finished: Sender<u64>) -> Self {
        Self {
            finished,
            ms_per_char: 60,
        }
    }
}

impl SpeechSynth for LogSynth {
    fn is_supported(&self) -> bool {
        true
    }

    fn speak(&mut self, utterance: u64, text: &str) {
        info!("Speaking: {}", text);
        let delay = Duration::from_millis(self.ms_per_char * text.len() as u64);
        let sender = self.finished.clone();
        let spawned = thread::Builder::new()
            .name("log-synth".into())
            .spawn(move || {
                thread::sleep(delay);
                let _ = sender.send(utterance);
            });
        if let Err(e) = spawned {
            // The unmute timeout covers a missing notification.
            warn!("Failed to schedule synthesis notification: {}", e);
        }
    }

    fn cancel(&mut self) {
        debug!("Synthesis cancelled");
    }
}

// ── Surface ────────────────────────────────────────────────

const GRID_COLS: usize = 3;
const GRID_ROWS: usize = 3;

fn tile_centre(tile: usize, width: f64, height: f64) -> (f64, f64) {
    let col = tile % GRID_COLS;
    let row = tile / GRID_COLS;
    let w = width / GRID_COLS as f64;
    let h = height / GRID_ROWS as f64;
    (w * (col as f64 + 0.5), h * (row as f64 + 0.5))
}

/// Counters kept by `HeadlessSurface`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SurfaceStats {
    pub activations: u64,
    pub clicks: u64,
    pub scrolled_px: f64,
    pub navigations: u64,
}

/// Virtual surface: a 3×3 grid of buttons, each inset from its tile so
/// the gaps and the scroll bands stay empty.
pub struct HeadlessSurface {
    width: f64,
    height: f64,
    view: View,
    pub stats: Arc<Mutex<SurfaceStats>>,
}

impl HeadlessSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            view: View::Dashboard,
            stats: Arc::new(Mutex::new(SurfaceStats::default())),
        }
    }

    fn with_stats(&self, f: impl FnOnce(&mut SurfaceStats)) {
        let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut stats);
    }

    /// Element ids encode view and tile: `view * 100 + tile`.
    fn element_id(&self, tile: usize) -> ElementId {
        let view = match self.view {
            View::Dashboard => 1,
            View::Calibration => 2,
            View::Settings => 3,
            View::Analytics => 4,
        };
        ElementId(view * 100 + tile as u64)
    }

    pub fn view(&self) -> View {
        self.view
    }
}

impl UiSurface for HeadlessSurface {
    fn viewport(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn element_at(&self, x: f64, y: f64) -> Option<ElementId> {
        if x < 0.0 || y < 0.0 || x >= self.width || y >= self.height {
            return None;
        }
        let w = self.width / GRID_COLS as f64;
        let h = self.height / GRID_ROWS as f64;
        let col = ((x / w) as usize).min(GRID_COLS - 1);
        let row = ((y / h) as usize).min(GRID_ROWS - 1);
        let (cx, cy) = tile_centre(row * GRID_COLS + col, self.width, self.height);
        // Buttons cover the middle half of each tile.
        if (x - cx).abs() <= w / 4.0 && (y - cy).abs() <= h / 4.0 {
            Some(self.element_id(row * GRID_COLS + col))
        } else {
            None
        }
    }

    fn dispatch_pointer(&mut self, element: ElementId, x: f64, y: f64) -> bool {
        info!("Click on element {} at ({:.0}, {:.0})", element.0, x, y);
        self.with_stats(|s| s.clicks += 1);
        true
    }

    fn focus_and_click(&mut self, element: ElementId) {
        info!("Focus + click on element {}", element.0);
        self.with_stats(|s| s.clicks += 1);
    }

    fn activate(&mut self, element: ElementId) {
        info!("Dwell activated element {}", element.0);
        self.with_stats(|s| s.activations += 1);
    }

    fn scroll_by(&mut self, dy: f64) {
        self.with_stats(|s| s.scrolled_px += dy);
    }

    fn navigate(&mut self, view: View) {
        info!("View: {} -> {}", self.view.as_str(), view.as_str());
        self.view = view;
        self.with_stats(|s| s.navigations += 1);
    }
}
