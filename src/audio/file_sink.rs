// engine adapter for a pattern engine that hot-reloads a file: every evaluation rewrites
// the watched file in one rename, so the watcher never reads a half-written program.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::audio_api::{AudioEngine, EngineConfig, EngineError};
use crate::pipeline::compile::SILENCE;

const HUSH: &str = "hush()";

pub struct LiveFileEngine {
    path: PathBuf,
    prelude: Option<String>, // set by initialize
    current: String,         // last program evaluated, empty when silent
}

impl LiveFileEngine {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            prelude: None,
            current: String::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, body: &str) -> io::Result<()> {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);
        fs::write(&staging, body)?;
        fs::rename(&staging, &self.path)?;
        debug!(path = %self.path.display(), bytes = body.len(), "program written");
        Ok(())
    }

    fn write_program(&self, prelude: &str, program: &str) -> io::Result<()> {
        self.write(&format!("{prelude}\n{program}\n"))
    }
}

impl AudioEngine for LiveFileEngine {
    fn initialize(&mut self, config: &EngineConfig) -> Result<(), EngineError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let prelude = format!("samples('{}')", config.sample_library);
        self.write_program(&prelude, HUSH)?;
        self.prelude = Some(prelude);
        Ok(())
    }

    fn evaluate(&mut self, program: &str) -> Result<(), EngineError> {
        let prelude = self.prelude.as_deref().ok_or(EngineError::NotReady)?;
        if program.trim().is_empty() {
            return Err(EngineError::Evaluation(format!(
                "empty program (use `{SILENCE}` to play nothing)"
            )));
        }
        self.write_program(prelude, program)?;
        self.current = program.to_string();
        Ok(())
    }

    fn silence_all(&mut self) {
        let Some(prelude) = self.prelude.as_deref() else {
            return;
        };
        if let Err(e) = self.write_program(prelude, HUSH) {
            warn!("could not silence {}: {e}", self.path.display());
        }
        self.current.clear();
    }

    // swaps the leading setcpm statement of whatever is playing
    fn set_tempo(&mut self, cycles_per_minute: f64) -> Result<(), EngineError> {
        let prelude = self.prelude.as_deref().ok_or(EngineError::NotReady)?;
        if self.current.is_empty() {
            return Ok(());
        }
        let tempo = format!("setcpm({cycles_per_minute:.4})");
        let body = match self.current.split_once('\n') {
            Some((first, rest)) if first.starts_with("setcpm(") => format!("{tempo}\n{rest}"),
            _ if self.current.starts_with("setcpm(") => tempo,
            _ => format!("{tempo}\n{}", self.current),
        };
        self.write_program(prelude, &body)?;
        self.current = body;
        Ok(())
    }
}
