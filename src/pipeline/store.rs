// the only writer of session data. every operation builds the next session from a copy of
// the current one and commits it in one step, so a scene load (tempo + cutoff + many lanes)
// is never observable half-applied, and undo is just "swap back to the previous copy".

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use super::naming::infer_icon;
use super::session::{Analysis, Lane, LaneId, LaneParams, ParamKey, Scene, SceneId, Session};

const HISTORY_LIMIT: usize = 64;

#[derive(Debug, Default)]
pub struct SessionStore {
    session: Session,
    undo: Vec<Session>,
    redo: Vec<Session>,
    revision: u64,
    last_scene_id: u64,
    open_edit: Option<LaneId>, // lane whose program edits still fold into the last commit
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut session: Session) -> Self {
        unique_orbits(&mut session.lanes);
        Self {
            session,
            ..Self::default()
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.session.lanes
    }

    /// Bumped on every committed change, including undo and redo.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    // ── Lanes ─────────────────────────────────────────────────────

    pub fn add_lane(
        &mut self,
        name: impl Into<String>,
        program: impl Into<String>,
        prompt: impl Into<String>,
        analysis: Option<Analysis>,
    ) -> LaneId {
        let name = name.into();
        let id = LaneId::random();
        let lane = Lane {
            id: id.clone(),
            icon: infer_icon(&name),
            name,
            prompt: prompt.into(),
            analysis,
            program: program.into(),
            params: LaneParams::default(),
            muted: false,
            solo: false,
            orbit: next_orbit(&self.session.lanes),
        };
        debug!(lane = %lane.id, orbit = lane.orbit, "lane added");
        self.apply(|s| {
            s.lanes.push(lane);
            true
        });
        id
    }

    pub fn remove_lane(&mut self, id: &LaneId) -> bool {
        self.apply(|s| {
            let before = s.lanes.len();
            s.lanes.retain(|l| &l.id != id);
            s.lanes.len() != before
        })
    }

    pub fn rename_lane(&mut self, id: &LaneId, name: impl Into<String>) -> bool {
        let name = name.into();
        self.with_lane(id, |lane| lane.name = name)
    }

    /// Non-finite values are refused and leave the parameter alone.
    pub fn update_param(&mut self, id: &LaneId, key: ParamKey, value: f64) -> bool {
        if !value.is_finite() {
            debug!(lane = %id, param = key.label(), "refused non-finite param value");
            return false;
        }
        self.with_lane(id, |lane| lane.params.set(key, value))
    }

    /// Consecutive edits of one lane's program share a single undo entry until
    /// `seal_edits` is called.
    // prompt and analysis are left as they were, even though they no longer describe the code
    pub fn update_program(&mut self, id: &LaneId, program: impl Into<String>) -> bool {
        let program = program.into();
        if self.open_edit.as_ref() == Some(id) {
            return self.amend(|s| match s.lane_mut(id) {
                Some(lane) => {
                    lane.program = program;
                    true
                }
                None => false,
            });
        }
        let changed = self.with_lane(id, |lane| lane.program = program);
        if changed {
            self.open_edit = Some(id.clone());
        }
        changed
    }

    /// Ends the current run of program edits; the next edit starts a new undo entry.
    pub fn seal_edits(&mut self) {
        self.open_edit = None;
    }

    pub fn update_prompt_and_program(
        &mut self,
        id: &LaneId,
        prompt: impl Into<String>,
        program: impl Into<String>,
        analysis: Option<Analysis>,
    ) -> bool {
        let (prompt, program) = (prompt.into(), program.into());
        self.with_lane(id, |lane| {
            lane.prompt = prompt;
            lane.program = program;
            lane.analysis = analysis;
        })
    }

    pub fn toggle_mute(&mut self, id: &LaneId) -> bool {
        self.with_lane(id, |lane| lane.muted = !lane.muted)
    }

    pub fn toggle_solo(&mut self, id: &LaneId) -> bool {
        self.with_lane(id, |lane| lane.solo = !lane.solo)
    }

    // ── Globals ───────────────────────────────────────────────────

    pub fn set_tempo(&mut self, bpm: f64) -> bool {
        if !bpm.is_finite() || bpm <= 0.0 {
            return false;
        }
        self.apply(|s| {
            s.tempo = bpm;
            true
        })
    }

    pub fn set_global_filter_cutoff(&mut self, hz: f64) -> bool {
        if !hz.is_finite() {
            return false;
        }
        self.apply(|s| {
            s.global_filter_cutoff = hz;
            true
        })
    }

    // ── Whole session ─────────────────────────────────────────────

    pub fn load_session(&mut self, mut session: Session) {
        unique_orbits(&mut session.lanes);
        self.apply(|s| {
            *s = session;
            true
        });
    }

    pub fn clear(&mut self) {
        self.load_session(Session::default());
    }

    // ── Scenes ────────────────────────────────────────────────────

    pub fn save_scene(&mut self) -> SceneId {
        let id = self.next_scene_id();
        let scene = Scene {
            id,
            name: format!("Scene {}", self.session.scenes.len() + 1),
            tempo: self.session.tempo,
            global_filter_cutoff: self.session.global_filter_cutoff,
            lane_states: self
                .session
                .lanes
                .iter()
                .map(|l| (l.id.clone(), l.mix()))
                .collect(),
        };
        self.apply(|s| {
            s.scenes.push(scene);
            true
        });
        id
    }

    /// Restores tempo, cutoff and the mix of every lane the scene knows about.
    /// Lanes the scene never saw keep their mix; lanes it saw that are gone are skipped.
    pub fn load_scene(&mut self, scene: &Scene) {
        self.apply(|s| {
            s.tempo = scene.tempo;
            s.global_filter_cutoff = scene.global_filter_cutoff;
            for lane in &mut s.lanes {
                if let Some(mix) = scene.lane_states.get(&lane.id) {
                    lane.muted = mix.muted;
                    lane.solo = mix.solo;
                    lane.params = mix.params;
                }
            }
            true
        });
    }

    pub fn load_scene_at(&mut self, index: usize) -> bool {
        match self.session.scenes.get(index).cloned() {
            Some(scene) => {
                self.load_scene(&scene);
                true
            }
            None => false,
        }
    }

    pub fn delete_scene(&mut self, id: SceneId) -> bool {
        self.apply(|s| {
            let before = s.scenes.len();
            s.scenes.retain(|scene| scene.id != id);
            s.scenes.len() != before
        })
    }

    // ── History ───────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        self.open_edit = None;
        match self.undo.pop() {
            Some(previous) => {
                let current = std::mem::replace(&mut self.session, previous);
                self.redo.push(current);
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        self.open_edit = None;
        match self.redo.pop() {
            Some(next) => {
                let current = std::mem::replace(&mut self.session, next);
                self.undo.push(current);
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    // ── Internals ─────────────────────────────────────────────────

    // runs `change` on a copy; commits only when it reports a change and the copy differs
    fn apply(&mut self, change: impl FnOnce(&mut Session) -> bool) -> bool {
        let mut next = self.session.clone();
        if !change(&mut next) || next == self.session {
            return false;
        }
        self.open_edit = None;
        let previous = std::mem::replace(&mut self.session, next);
        self.undo.push(previous);
        if self.undo.len() > HISTORY_LIMIT {
            self.undo.remove(0);
        }
        self.redo.clear();
        self.revision += 1;
        true
    }

    // like `apply`, but folds into the newest undo entry instead of pushing one
    fn amend(&mut self, change: impl FnOnce(&mut Session) -> bool) -> bool {
        let mut next = self.session.clone();
        if !change(&mut next) || next == self.session {
            return false;
        }
        self.session = next;
        self.redo.clear();
        self.revision += 1;
        true
    }

    fn with_lane(&mut self, id: &LaneId, change: impl FnOnce(&mut Lane)) -> bool {
        if self.session.lane(id).is_none() {
            return false;
        }
        self.apply(|s| match s.lane_mut(id) {
            Some(lane) => {
                change(lane);
                true
            }
            None => false,
        })
    }

    fn next_scene_id(&mut self) -> SceneId {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let newest = self.session.scenes.iter().map(|s| s.id.0).max().unwrap_or(0);
        let id = now.max(self.last_scene_id + 1).max(newest + 1);
        self.last_scene_id = id;
        SceneId(id)
    }
}

// creation order (the lane count), stepping past any index a surviving lane still holds
fn next_orbit(lanes: &[Lane]) -> u32 {
    let mut orbit = lanes.len() as u32;
    while lanes.iter().any(|l| l.orbit == orbit) {
        orbit += 1;
    }
    orbit
}

// links from older builds can carry the same orbit twice; later duplicates move to a free one
fn unique_orbits(lanes: &mut [Lane]) {
    for i in 0..lanes.len() {
        let (earlier, rest) = lanes.split_at_mut(i);
        let Some((lane, later)) = rest.split_first_mut() else {
            break;
        };
        if !earlier.iter().any(|l| l.orbit == lane.orbit) {
            continue;
        }
        let mut orbit = i as u32;
        while earlier.iter().chain(later.iter()).any(|l| l.orbit == orbit) {
            orbit += 1;
        }
        debug!(lane = %lane.id, from = lane.orbit, to = orbit, "duplicate orbit reassigned");
        lane.orbit = orbit;
    }
}
