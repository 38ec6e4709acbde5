use crate::pipeline::session::{LaneId, ParamKey};

// state local to the tui: what is selected and what is being typed.
// everything else comes from DisplayState each frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Prompt {
    Describe,          // new lane
    Reprompt(LaneId),  // new description for an existing lane
    EditProgram(LaneId),
    Rename(LaneId),
}

impl Prompt {
    pub fn label(&self) -> &'static str {
        match self {
            Prompt::Describe => "describe a new lane",
            Prompt::Reprompt(_) => "new description",
            Prompt::EditProgram(_) => "program",
            Prompt::Rename(_) => "name",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TuiState {
    pub selected: usize,
    pub param: ParamKey,
    pub prompt: Option<(Prompt, String)>, // open input line and its buffer
    pub delete_scene_armed: bool,        // `D` pressed, waiting for a digit
}

impl Default for TuiState {
    fn default() -> Self {
        Self {
            selected: 0,
            param: ParamKey::Gain,
            prompt: None,
            delete_scene_armed: false,
        }
    }
}

impl TuiState {
    pub fn open(&mut self, prompt: Prompt, initial: impl Into<String>) {
        self.prompt = Some((prompt, initial.into()));
    }

    // keeps the selection on a lane after lanes come and go
    pub fn clamp_selection(&mut self, lane_count: usize) {
        self.selected = self.selected.min(lane_count.saturating_sub(1));
    }
}
