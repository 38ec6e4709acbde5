// the contract with the pattern engine. the compiled program text is the only thing it
// gets to see of the session.

use thiserror::Error;

pub const DEFAULT_SAMPLE_LIBRARY: &str = "github:tidalcycles/Dirt-Samples/master/";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    // registered once at init, before anything is evaluated
    pub sample_library: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_library: DEFAULT_SAMPLE_LIBRARY.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("audio engine is not initialized")]
    NotReady,
    #[error("{0}")]
    Evaluation(String),
    #[error("engine i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

pub trait AudioEngine {
    fn initialize(&mut self, config: &EngineConfig) -> Result<(), EngineError>;

    /// Replaces whatever is playing with `program`.
    fn evaluate(&mut self, program: &str) -> Result<(), EngineError>;

    fn silence_all(&mut self);

    /// Live tempo change in the engine's native unit, without re-evaluating.
    fn set_tempo(&mut self, cycles_per_minute: f64) -> Result<(), EngineError>;
}

impl<E: AudioEngine + ?Sized> AudioEngine for Box<E> {
    fn initialize(&mut self, config: &EngineConfig) -> Result<(), EngineError> {
        (**self).initialize(config)
    }

    fn evaluate(&mut self, program: &str) -> Result<(), EngineError> {
        (**self).evaluate(program)
    }

    fn silence_all(&mut self) {
        (**self).silence_all()
    }

    fn set_tempo(&mut self, cycles_per_minute: f64) -> Result<(), EngineError> {
        (**self).set_tempo(cycles_per_minute)
    }
}
