use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};

use super::mode::{Prompt, TuiState};
use crate::pipeline::session::LaneId;
use crate::shared::{CUTOFF_STEP, DisplayState, InputEvent, SCENE_KEYS, TEMPO_STEP};

// poll for a key, resolve it against what is selected into semantic input events
pub fn poll_input(
    timeout: Duration,
    ts: &mut TuiState,
    ds: &DisplayState,
) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }
    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        return Ok(handle_key(key.code, ts, ds));
    }
    Ok(vec![])
}

pub fn handle_key(code: KeyCode, ts: &mut TuiState, ds: &DisplayState) -> Vec<InputEvent> {
    ts.clamp_selection(ds.lanes.len());
    if ts.prompt.is_some() {
        return handle_prompt_key(code, ts);
    }
    if ts.delete_scene_armed {
        ts.delete_scene_armed = false;
        return match scene_digit(code) {
            Some(index) => vec![InputEvent::DeleteScene(index)],
            None => vec![],
        };
    }

    let selected = ds.lane_id(ts.selected);
    match code {
        KeyCode::Esc => vec![InputEvent::Quit],
        KeyCode::Char(' ') => vec![InputEvent::TogglePlay],

        KeyCode::Char('a') => {
            ts.open(Prompt::Describe, "");
            vec![]
        }
        KeyCode::Char('p') => {
            if let Some(row) = ds.lanes.get(ts.selected) {
                ts.open(Prompt::Reprompt(row.id.clone()), row.prompt.clone());
            }
            vec![]
        }
        KeyCode::Char('e') => {
            if let Some(row) = ds.lanes.get(ts.selected) {
                ts.open(Prompt::EditProgram(row.id.clone()), row.program.clone());
            }
            vec![]
        }
        KeyCode::Char('r') => {
            if let Some(row) = ds.lanes.get(ts.selected) {
                ts.open(Prompt::Rename(row.id.clone()), row.name.clone());
            }
            vec![]
        }

        // selection
        KeyCode::Char('j') | KeyCode::Down => {
            ts.selected = (ts.selected + 1).min(ds.lanes.len().saturating_sub(1));
            vec![]
        }
        KeyCode::Char('k') | KeyCode::Up => {
            ts.selected = ts.selected.saturating_sub(1);
            vec![]
        }
        KeyCode::Tab => {
            ts.param = ts.param.next();
            vec![]
        }

        // selected lane
        KeyCode::Char('h') | KeyCode::Left => nudge(selected, ts, -1.0),
        KeyCode::Char('l') | KeyCode::Right => nudge(selected, ts, 1.0),
        KeyCode::Char('m') => selected.map(InputEvent::ToggleMute).into_iter().collect(),
        KeyCode::Char('s') => selected.map(InputEvent::ToggleSolo).into_iter().collect(),
        KeyCode::Char('x') => selected.map(InputEvent::RemoveLane).into_iter().collect(),

        // globals
        KeyCode::Char('+') | KeyCode::Char('=') => vec![InputEvent::AdjustTempo(TEMPO_STEP)],
        KeyCode::Char('-') => vec![InputEvent::AdjustTempo(-TEMPO_STEP)],
        KeyCode::Char('[') => vec![InputEvent::AdjustGlobalCutoff(-CUTOFF_STEP)],
        KeyCode::Char(']') => vec![InputEvent::AdjustGlobalCutoff(CUTOFF_STEP)],

        // scenes
        KeyCode::Char('c') => vec![InputEvent::SaveScene],
        KeyCode::Char('D') => {
            ts.delete_scene_armed = true;
            vec![]
        }
        code @ KeyCode::Char('1'..='9') => {
            scene_digit(code).map(InputEvent::LoadScene).into_iter().collect()
        }

        KeyCode::Char('u') => vec![InputEvent::Undo],
        KeyCode::Char('y') => vec![InputEvent::Redo],
        KeyCode::Char('n') => {
            ts.selected = 0;
            vec![InputEvent::NewSession]
        }
        KeyCode::Char('w') => vec![InputEvent::Share],
        _ => vec![],
    }
}

// program edits go out on every keystroke; the other prompts submit on enter
fn handle_prompt_key(code: KeyCode, ts: &mut TuiState) -> Vec<InputEvent> {
    let Some((prompt, buffer)) = ts.prompt.as_mut() else {
        return vec![];
    };
    match code {
        KeyCode::Esc => {
            ts.prompt = None;
            vec![]
        }
        KeyCode::Enter => {
            let Some((prompt, text)) = ts.prompt.take() else {
                return vec![];
            };
            match prompt {
                Prompt::Describe => vec![InputEvent::AddLane(text)],
                Prompt::Reprompt(lane) => vec![InputEvent::Regenerate { lane, description: text }],
                Prompt::Rename(lane) if !text.trim().is_empty() => {
                    vec![InputEvent::RenameLane { lane, name: text }]
                }
                Prompt::Rename(_) | Prompt::EditProgram(_) => vec![],
            }
        }
        KeyCode::Backspace => {
            buffer.pop();
            edited(prompt, buffer)
        }
        KeyCode::Char(c) => {
            buffer.push(c);
            edited(prompt, buffer)
        }
        _ => vec![],
    }
}

fn edited(prompt: &Prompt, buffer: &str) -> Vec<InputEvent> {
    match prompt {
        Prompt::EditProgram(lane) => vec![InputEvent::EditProgram {
            lane: lane.clone(),
            program: buffer.to_string(),
        }],
        _ => vec![],
    }
}

fn nudge(lane: Option<LaneId>, ts: &TuiState, steps: f64) -> Vec<InputEvent> {
    lane.map(|lane| InputEvent::NudgeParam { lane, key: ts.param, steps })
        .into_iter()
        .collect()
}

// '1'..='9' -> scene position 0..=8
fn scene_digit(code: KeyCode) -> Option<usize> {
    let KeyCode::Char(c) = code else {
        return None;
    };
    let n = c.to_digit(10)? as usize;
    (1..=SCENE_KEYS).contains(&n).then(|| n - 1)
}
