// types passed between the tui and the middle layer.
//
// the tui resolves raw keys into semantic InputEvents (it knows which lane is selected),
// the middle layer applies them and hands back a DisplayState to draw each frame.
// all session state lives in the middle layer; the tui only keeps what is being typed.

use std::time::Duration;

use crate::audio::PlaybackState;
use crate::pipeline::session::{Icon, LaneId, LaneParams, ParamKey};

pub const TEMPO_RANGE: (f64, f64) = (60.0, 200.0);
pub const CUTOFF_RANGE: (f64, f64) = (200.0, 8000.0);
pub const TEMPO_STEP: f64 = 1.0;
pub const CUTOFF_STEP: f64 = 100.0;
pub const SCENE_KEYS: usize = 9; // scenes 1-9 have number keys
pub const CODE_EDIT_QUIET: Duration = Duration::from_millis(500);

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    TogglePlay,
    NewSession,
    AdjustTempo(f64),        // bpm delta
    AdjustGlobalCutoff(f64), // Hz delta

    // generation
    AddLane(String), // description
    Regenerate { lane: LaneId, description: String },

    // lane edits
    EditProgram { lane: LaneId, program: String }, // sent on every keystroke
    RenameLane { lane: LaneId, name: String },
    NudgeParam { lane: LaneId, key: ParamKey, steps: f64 },
    ToggleMute(LaneId),
    ToggleSolo(LaneId),
    RemoveLane(LaneId),

    // scenes, by position in the scene bar
    SaveScene,
    LoadScene(usize),
    DeleteScene(usize),

    Undo,
    Redo,
    Share,
    Quit,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LaneRow {
    pub id: LaneId,
    pub name: String,
    pub icon: Icon,
    pub program: String,
    pub prompt: String,
    pub params: LaneParams,
    pub muted: bool,
    pub solo: bool,
    pub orbit: u32,
    pub audible: bool, // part of the compiled mix right now
    pub generation: Option<GenerationStatus>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GenerationStatus {
    Working(&'static str), // phase label
    Failed(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct PendingLane {
    pub description: String,
    pub status: GenerationStatus,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DisplayState {
    pub playback: PlaybackState,
    pub tempo: f64,
    pub global_filter_cutoff: f64,
    pub lanes: Vec<LaneRow>,
    pub pending_lanes: Vec<PendingLane>, // new lanes still being generated (or failed)
    pub scenes: Vec<String>,
    pub audio_error: Option<String>,
    pub share_link: Option<String>,
    pub can_undo: bool,
    pub can_redo: bool,
}

impl DisplayState {
    pub fn lane_id(&self, index: usize) -> Option<LaneId> {
        self.lanes.get(index).map(|row| row.id.clone())
    }
}
