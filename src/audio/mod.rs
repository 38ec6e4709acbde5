mod controller;
mod debounce;
mod file_sink;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{
    DEFAULT_DEBOUNCE, PlaybackController, PlaybackState, WARMUP_SETTLE, WARMUP_SOUNDS,
    warmup_program,
};
pub use debounce::Debouncer;
pub use file_sink::LiveFileEngine;

use std::path::Path;
use std::time::Duration;

use crate::audio_api::EngineConfig;

// the engine handle is created here and moved into the controller; nothing keeps a second copy
pub fn start_playback(
    program_file: &Path,
    config: EngineConfig,
    debounce: Duration,
) -> PlaybackController<LiveFileEngine> {
    PlaybackController::with_debounce(LiveFileEngine::new(program_file), config, debounce)
}
