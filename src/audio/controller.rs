// owns the engine handle and its lifecycle. nothing else in the crate talks to the engine.
//
//   Idle -> Initializing -> Playing <-> Stopped
//
// first play ever: init (once), then a silent warm-up evaluation so common samples get
// fetched, a settle delay, then the real program. every failure lands in Stopped with the
// error kept as the one current audio error.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::debounce::Debouncer;
use crate::audio_api::{AudioEngine, EngineConfig, EngineError};
use crate::pipeline::compile::cycles_per_minute;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(80);
pub const WARMUP_SETTLE: Duration = Duration::from_secs(2);

pub const WARMUP_SOUNDS: [&str; 16] = [
    "bd", "sd", "hh", "ho", "cp", "mt", "ht", "lt", "rim", "cb", // drums
    "arpy", "pluck", "bass", "moog", "juno", "gtr", // melodic samples
];

pub fn warmup_program() -> String {
    format!("s(\"{}\").gain(0)", WARMUP_SOUNDS.join(" "))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Initializing,
    Playing,
    Stopped,
}

impl PlaybackState {
    pub fn label(self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Initializing => "loading samples",
            PlaybackState::Playing => "playing",
            PlaybackState::Stopped => "stopped",
        }
    }
}

#[derive(Debug)]
struct WarmUp {
    settled_at: Instant,
    program: String, // what to play once settled; later plays overwrite it
}

pub struct PlaybackController<E> {
    engine: E,
    config: EngineConfig,
    initialized: bool,
    warmed_up: bool,
    state: PlaybackState,
    warm_up: Option<WarmUp>,
    debounce: Debouncer<String>,
    error: Option<String>,
}

impl<E: AudioEngine> PlaybackController<E> {
    pub fn new(engine: E, config: EngineConfig) -> Self {
        Self::with_debounce(engine, config, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(engine: E, config: EngineConfig, delay: Duration) -> Self {
        Self {
            engine,
            config,
            initialized: false,
            warmed_up: false,
            state: PlaybackState::Idle,
            warm_up: None,
            debounce: Debouncer::new(delay),
            error: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Playing, or about to be (warm-up settling). Mix changes should reach the engine.
    pub fn is_active(&self) -> bool {
        self.is_playing() || self.warm_up.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn has_pending(&self) -> bool {
        self.debounce.is_pending()
    }

    pub fn play(&mut self, program: String, now: Instant) {
        if let Some(warm_up) = self.warm_up.as_mut() {
            debug!("warm-up still settling, queued program replaced");
            warm_up.program = program;
            return;
        }
        if let Err(e) = self.ensure_initialized() {
            self.fail(e);
            return;
        }
        if !self.warmed_up {
            self.warmed_up = true;
            info!(settle_ms = WARMUP_SETTLE.as_millis() as u64, "warming up sample cache");
            if let Err(e) = self.engine.evaluate(&warmup_program()) {
                self.fail(e);
                return;
            }
            self.state = PlaybackState::Initializing;
            self.warm_up = Some(WarmUp {
                settled_at: now + WARMUP_SETTLE,
                program,
            });
            return;
        }
        self.evaluate(&program);
    }

    /// Coalesces bursts: only the last program scheduled inside the window gets evaluated.
    pub fn debounced_play(&mut self, program: String, now: Instant) {
        if self.debounce.schedule(program, now) {
            debug!("pending evaluation superseded");
        }
    }

    pub fn stop(&mut self) {
        self.debounce.cancel();
        self.warm_up = None;
        if self.initialized {
            self.engine.silence_all();
        }
        if self.state != PlaybackState::Stopped {
            info!("playback stopped");
        }
        self.state = PlaybackState::Stopped;
    }

    // no-op until the engine exists; the next play carries the tempo in its program anyway
    pub fn update_tempo(&mut self, bpm: f64) {
        if !self.initialized {
            return;
        }
        if let Err(e) = self.engine.set_tempo(cycles_per_minute(bpm)) {
            warn!("tempo change rejected: {e}");
        }
    }

    /// Fires whatever came due: the end of the warm-up settle, then the debounce slot.
    pub fn tick(&mut self, now: Instant) {
        if self.warm_up.as_ref().is_some_and(|w| now >= w.settled_at) {
            if let Some(warm_up) = self.warm_up.take() {
                self.engine.silence_all();
                self.evaluate(&warm_up.program);
            }
        }
        if let Some(program) = self.debounce.poll(now) {
            self.play(program, now);
        }
    }

    fn ensure_initialized(&mut self) -> Result<(), EngineError> {
        if self.initialized {
            return Ok(());
        }
        self.state = PlaybackState::Initializing;
        info!(samples = %self.config.sample_library, "initializing audio engine");
        self.engine.initialize(&self.config)?;
        self.initialized = true;
        Ok(())
    }

    fn evaluate(&mut self, program: &str) {
        match self.engine.evaluate(program) {
            Ok(()) => {
                if self.state != PlaybackState::Playing {
                    info!("playback started");
                }
                self.state = PlaybackState::Playing;
                self.error = None;
            }
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, error: EngineError) {
        warn!("audio error: {error}");
        self.error = Some(error.to_string());
        self.state = PlaybackState::Stopped;
        self.warm_up = None;
        self.debounce.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::{Call, RecordingEngine};

    const MS: Duration = Duration::from_millis(1);

    fn controller() -> PlaybackController<RecordingEngine> {
        PlaybackController::new(RecordingEngine::default(), EngineConfig::default())
    }

    // gets past init and warm-up so later assertions only see the interesting calls
    fn warmed(t0: Instant) -> PlaybackController<RecordingEngine> {
        let mut c = controller();
        c.play("first".into(), t0);
        c.tick(t0 + WARMUP_SETTLE);
        assert!(c.is_playing());
        c
    }

    #[test]
    fn first_play_warms_up_before_the_real_program() {
        let t0 = Instant::now();
        let mut c = controller();
        assert_eq!(c.state(), PlaybackState::Idle);

        c.play("s(\"bd\")".into(), t0);
        assert_eq!(c.state(), PlaybackState::Initializing);
        assert!(c.is_active());
        assert_eq!(c.engine().calls, vec![Call::Eval(warmup_program())]);

        c.tick(t0 + 1000 * MS);
        assert_eq!(c.engine().calls.len(), 1);

        c.tick(t0 + WARMUP_SETTLE);
        assert_eq!(
            c.engine().calls,
            vec![
                Call::Eval(warmup_program()),
                Call::Silence,
                Call::Eval("s(\"bd\")".into()),
            ]
        );
        assert!(c.is_playing());
        assert_eq!(c.engine().inits, 1);
    }

    #[test]
    fn warmup_program_is_silent() {
        let program = warmup_program();
        assert!(program.starts_with("s(\"bd sd hh"));
        assert!(program.ends_with(".gain(0)"));
    }

    #[test]
    fn setup_and_warm_up_happen_once() {
        let t0 = Instant::now();
        let mut c = warmed(t0);
        c.stop();
        c.play("again".into(), t0 + 3000 * MS);
        assert!(c.is_playing());
        assert_eq!(c.engine().inits, 1);
        assert_eq!(c.engine().evals_of(&warmup_program()), 1);
        assert_eq!(c.engine().calls.last(), Some(&Call::Eval("again".into())));
    }

    #[test]
    fn plays_during_warm_up_replace_the_queued_program() {
        let t0 = Instant::now();
        let mut c = controller();
        c.play("p1".into(), t0);
        c.play("p2".into(), t0 + 500 * MS);
        c.tick(t0 + WARMUP_SETTLE);
        assert_eq!(c.engine().inits, 1);
        assert_eq!(c.engine().evals_of(&warmup_program()), 1);
        assert_eq!(c.engine().evals_of("p1"), 0);
        assert_eq!(c.engine().evals_of("p2"), 1);
    }

    #[test]
    fn a_burst_of_debounced_plays_evaluates_the_last_once() {
        let t0 = Instant::now();
        let mut c = warmed(t0);
        let t = t0 + 5000 * MS;
        c.debounced_play("p1".into(), t);
        c.debounced_play("p2".into(), t + 10 * MS);
        c.debounced_play("p3".into(), t + 20 * MS);
        c.tick(t + 60 * MS);
        assert_eq!(c.engine().evals_of("p3"), 0);
        c.tick(t + 100 * MS);
        c.tick(t + 400 * MS);
        assert_eq!(c.engine().evals_of("p1"), 0);
        assert_eq!(c.engine().evals_of("p2"), 0);
        assert_eq!(c.engine().evals_of("p3"), 1);
    }

    #[test]
    fn engine_errors_stop_playback_and_keep_the_latest_message() {
        let t0 = Instant::now();
        let mut c = warmed(t0);
        c.engine_mut_for_tests().reject = Some("broken".into());
        c.play("broken(".into(), t0 + 3000 * MS);
        assert_eq!(c.state(), PlaybackState::Stopped);
        assert_eq!(c.error(), Some("cannot evaluate `broken(`"));

        c.play("also broken".into(), t0 + 3100 * MS);
        assert_eq!(c.error(), Some("cannot evaluate `also broken`"));

        c.engine_mut_for_tests().reject = None;
        c.play("fine".into(), t0 + 3200 * MS);
        assert!(c.is_playing());
        assert_eq!(c.error(), None);
    }

    #[test]
    fn failed_init_is_retried_on_the_next_play() {
        let t0 = Instant::now();
        let mut c = controller();
        c.engine_mut_for_tests().fail_init = true;
        c.play("p".into(), t0);
        assert_eq!(c.state(), PlaybackState::Stopped);
        assert_eq!(c.error(), Some("no audio device"));
        assert!(c.engine().calls.is_empty());

        c.engine_mut_for_tests().fail_init = false;
        c.play("p".into(), t0 + 10 * MS);
        assert_eq!(c.state(), PlaybackState::Initializing);
        c.tick(t0 + 10 * MS + WARMUP_SETTLE);
        assert!(c.is_playing());
    }

    #[test]
    fn stop_is_safe_anytime_and_cancels_pending_work() {
        let t0 = Instant::now();
        let mut c = controller();
        c.stop();
        c.stop();
        assert_eq!(c.state(), PlaybackState::Stopped);
        assert!(c.engine().calls.is_empty());

        c.play("p".into(), t0);
        c.stop();
        c.tick(t0 + WARMUP_SETTLE);
        assert_eq!(c.engine().evals_of("p"), 0);

        let mut c = warmed(t0);
        c.debounced_play("late".into(), t0 + 3000 * MS);
        c.stop();
        assert!(!c.has_pending());
        c.tick(t0 + 4000 * MS);
        assert_eq!(c.engine().evals_of("late"), 0);
        assert_eq!(c.engine().calls.last(), Some(&Call::Silence));
    }

    #[test]
    fn tempo_changes_go_straight_to_the_engine() {
        let t0 = Instant::now();
        let mut c = controller();
        c.update_tempo(140.0);
        assert!(c.engine().calls.is_empty());

        let mut c = warmed(t0);
        c.update_tempo(140.0);
        assert_eq!(c.engine().calls.last(), Some(&Call::Tempo(35.0)));
        assert!(c.is_playing());
    }

    impl<E: AudioEngine> PlaybackController<E> {
        fn engine_mut_for_tests(&mut self) -> &mut E {
            &mut self.engine
        }
    }
}
