// engine double for unit tests: records every call, can be told to fail

use crate::audio_api::{AudioEngine, EngineConfig, EngineError};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Eval(String),
    Silence,
    Tempo(f64),
}

#[derive(Debug, Default)]
pub struct RecordingEngine {
    pub inits: usize,
    pub calls: Vec<Call>,
    pub fail_init: bool,
    pub reject: Option<String>, // programs containing this are rejected
}

impl RecordingEngine {
    pub fn evals_of(&self, program: &str) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Eval(p) if p == program))
            .count()
    }

    pub fn last_eval(&self) -> Option<&str> {
        self.calls.iter().rev().find_map(|c| match c {
            Call::Eval(p) => Some(p.as_str()),
            _ => None,
        })
    }
}

impl AudioEngine for RecordingEngine {
    fn initialize(&mut self, _config: &EngineConfig) -> Result<(), EngineError> {
        if self.fail_init {
            return Err(EngineError::Evaluation("no audio device".into()));
        }
        self.inits += 1;
        Ok(())
    }

    fn evaluate(&mut self, program: &str) -> Result<(), EngineError> {
        if let Some(bad) = &self.reject {
            if program.contains(bad.as_str()) {
                return Err(EngineError::Evaluation(format!("cannot evaluate `{program}`")));
            }
        }
        self.calls.push(Call::Eval(program.to_string()));
        Ok(())
    }

    fn silence_all(&mut self) {
        self.calls.push(Call::Silence);
    }

    fn set_tempo(&mut self, cycles_per_minute: f64) -> Result<(), EngineError> {
        self.calls.push(Call::Tempo(cycles_per_minute));
        Ok(())
    }
}
