// the middle layer: applies input events to the store, decides when the engine hears about
// it, and runs generations on worker threads whose results come back over a channel.
//
// engine policy: while playing (or warming up), any change to the compiled mix is pushed
// through the debounced play. while stopped, state changes never touch the engine.
// program edits additionally wait for a quiet period before they count as a change.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info, warn};

use crate::audio::{Debouncer, PlaybackController};
use crate::audio_api::AudioEngine;
use crate::generate::{self, GenerationError, Generated, Phase, TextGenerator};
use crate::pipeline::compile::{compile_session, playable};
use crate::pipeline::naming::infer_lane_name;
use crate::pipeline::persistence::{share_url, write_share_file};
use crate::pipeline::session::LaneId;
use crate::pipeline::store::SessionStore;
use crate::shared::{
    CODE_EDIT_QUIET, CUTOFF_RANGE, DisplayState, GenerationStatus, InputEvent, LaneRow,
    PendingLane, TEMPO_RANGE,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    NewLane,
    Lane(LaneId),
}

#[derive(Debug)]
struct Request {
    target: Target,
    description: String,
    phase: Option<Phase>,
    error: Option<String>, // set when it failed; the request then stays around for display
}

enum GenerationEvent {
    Phase { ticket: u64, phase: Phase },
    Finished { ticket: u64, result: Result<Generated, GenerationError> },
}

pub struct Middle<E: AudioEngine> {
    store: SessionStore,
    playback: PlaybackController<E>,
    generator: Arc<dyn TextGenerator>,
    events_tx: Sender<GenerationEvent>,
    events_rx: Receiver<GenerationEvent>,
    requests: BTreeMap<u64, Request>,
    next_ticket: u64,
    last_pushed: Option<String>, // last program handed to the controller
    code_quiet: Debouncer<()>,
    base_url: String,
    share_link: Option<String>, // shown once asked for, then kept fresh
    share_file: Option<PathBuf>,
    shared_revision: Option<u64>,
}

impl<E: AudioEngine> Middle<E> {
    pub fn new(
        store: SessionStore,
        playback: PlaybackController<E>,
        generator: Arc<dyn TextGenerator>,
        base_url: impl Into<String>,
    ) -> Self {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        Self {
            store,
            playback,
            generator,
            events_tx,
            events_rx,
            requests: BTreeMap::new(),
            next_ticket: 0,
            last_pushed: None,
            code_quiet: Debouncer::new(CODE_EDIT_QUIET),
            base_url: base_url.into(),
            share_link: None,
            share_file: None,
            shared_revision: None,
        }
    }

    pub fn with_share_file(mut self, path: PathBuf) -> Self {
        self.share_file = Some(path);
        self
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn playback(&self) -> &PlaybackController<E> {
        &self.playback
    }

    pub fn share_url(&self) -> String {
        share_url(&self.base_url, self.store.session())
    }

    /// Generations still running (failed ones don't count).
    pub fn generations_in_flight(&self) -> usize {
        self.requests.values().filter(|r| r.error.is_none()).count()
    }

    pub fn handle_input(&mut self, event: InputEvent, now: Instant) {
        match event {
            InputEvent::TogglePlay => {
                if self.playback.is_active() {
                    self.playback.stop();
                } else {
                    self.start(now);
                }
            }
            InputEvent::NewSession => {
                self.playback.stop();
                self.store.clear();
                self.requests.clear(); // whatever still finishes is dropped
                self.code_quiet.cancel();
                self.last_pushed = None;
                info!("new session");
            }
            InputEvent::AdjustTempo(delta) => {
                let bpm = (self.store.session().tempo + delta).clamp(TEMPO_RANGE.0, TEMPO_RANGE.1);
                if self.store.set_tempo(bpm) && self.playback.is_active() {
                    self.playback.update_tempo(bpm);
                }
            }
            InputEvent::AdjustGlobalCutoff(delta) => {
                let hz = (self.store.session().global_filter_cutoff + delta)
                    .clamp(CUTOFF_RANGE.0, CUTOFF_RANGE.1);
                self.store.set_global_filter_cutoff(hz);
            }
            InputEvent::AddLane(description) => {
                let description = description.trim();
                if !description.is_empty() {
                    self.spawn_generation(Target::NewLane, description.to_string());
                }
            }
            InputEvent::Regenerate { lane, description } => {
                let description = description.trim();
                if !description.is_empty() && self.store.session().lane(&lane).is_some() {
                    self.spawn_generation(Target::Lane(lane), description.to_string());
                }
            }
            InputEvent::EditProgram { lane, program } => {
                if self.store.update_program(&lane, program) {
                    self.code_quiet.schedule((), now);
                }
            }
            InputEvent::RenameLane { lane, name } => {
                self.store.rename_lane(&lane, name.trim());
            }
            InputEvent::NudgeParam { lane, key, steps } => {
                if let Some(current) = self.store.session().lane(&lane).map(|l| l.params.get(key)) {
                    let value = key.clamp(current + steps * key.step());
                    self.store.update_param(&lane, key, value);
                }
            }
            InputEvent::ToggleMute(lane) => {
                self.store.toggle_mute(&lane);
            }
            InputEvent::ToggleSolo(lane) => {
                self.store.toggle_solo(&lane);
            }
            InputEvent::RemoveLane(lane) => {
                self.store.remove_lane(&lane);
            }
            InputEvent::SaveScene => {
                if self.store.session().has_lanes() {
                    let id = self.store.save_scene();
                    info!(scene = id.0, "scene saved");
                }
            }
            InputEvent::LoadScene(index) => {
                if !self.store.load_scene_at(index) {
                    debug!(index, "no scene at that position");
                }
            }
            InputEvent::DeleteScene(index) => {
                if let Some(id) = self.store.session().scenes.get(index).map(|s| s.id) {
                    self.store.delete_scene(id);
                }
            }
            InputEvent::Undo => {
                self.store.undo();
            }
            InputEvent::Redo => {
                self.store.redo();
            }
            InputEvent::Share => {
                let link = self.share_url();
                info!(%link, "share link");
                self.share_link = Some(link);
            }
            InputEvent::Quit => {}
        }
        self.forget_orphaned_failures();
        self.sync_engine(now);
    }

    /// Called every frame: collects generation results, fires due timers, pushes changes.
    pub fn tick(&mut self, now: Instant) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.on_generation_event(event);
        }
        if self.code_quiet.poll(now).is_some() {
            self.store.seal_edits();
            debug!("program edits settled");
        }
        self.forget_orphaned_failures();
        self.playback.tick(now);
        self.sync_engine(now);
        self.sync_share();
    }

    pub fn shutdown(&mut self) {
        self.playback.stop();
    }

    pub fn display_state(&self) -> DisplayState {
        let session = self.store.session();
        let audible: Vec<&LaneId> = playable(&session.lanes).into_iter().map(|l| &l.id).collect();
        let status = |r: &Request| match (&r.error, r.phase) {
            (Some(e), _) => GenerationStatus::Failed(e.clone()),
            (None, Some(phase)) => GenerationStatus::Working(phase.label()),
            (None, None) => GenerationStatus::Working("Queued…"),
        };

        let lanes = session
            .lanes
            .iter()
            .map(|lane| LaneRow {
                id: lane.id.clone(),
                name: lane.name.clone(),
                icon: lane.icon,
                program: lane.program.clone(),
                prompt: lane.prompt.clone(),
                params: lane.params,
                muted: lane.muted,
                solo: lane.solo,
                orbit: lane.orbit,
                audible: audible.contains(&&lane.id),
                // newest request for this lane wins the status line
                generation: self
                    .requests
                    .values()
                    .rev()
                    .find(|r| r.target == Target::Lane(lane.id.clone()))
                    .map(status),
            })
            .collect();

        let pending_lanes = self
            .requests
            .values()
            .filter(|r| r.target == Target::NewLane)
            .map(|r| PendingLane {
                description: r.description.clone(),
                status: status(r),
            })
            .collect();

        DisplayState {
            playback: self.playback.state(),
            tempo: session.tempo,
            global_filter_cutoff: session.global_filter_cutoff,
            lanes,
            pending_lanes,
            scenes: session.scenes.iter().map(|s| s.name.clone()).collect(),
            audio_error: self.playback.error().map(str::to_string),
            share_link: self.share_link.clone(),
            can_undo: self.store.can_undo(),
            can_redo: self.store.can_redo(),
        }
    }

    // ── Internals ─────────────────────────────────────────────────

    fn start(&mut self, now: Instant) {
        let program = compile_session(self.store.session());
        self.playback.update_tempo(self.store.session().tempo);
        self.playback.play(program.clone(), now);
        self.last_pushed = Some(program);
    }

    fn sync_engine(&mut self, now: Instant) {
        if self.code_quiet.is_pending() || !self.playback.is_active() {
            return;
        }
        let program = compile_session(self.store.session());
        if self.last_pushed.as_deref() == Some(program.as_str()) {
            return;
        }
        self.playback.debounced_play(program.clone(), now);
        self.last_pushed = Some(program);
    }

    // a failure shown on a lane that no longer exists has nowhere to be shown
    fn forget_orphaned_failures(&mut self) {
        let session = self.store.session();
        self.requests.retain(|_, r| match &r.target {
            Target::Lane(id) if r.error.is_some() => session.lane(id).is_some(),
            _ => true,
        });
    }

    fn sync_share(&mut self) {
        let revision = self.store.revision();
        if self.shared_revision == Some(revision) {
            return;
        }
        self.shared_revision = Some(revision);
        if self.share_link.is_some() {
            self.share_link = Some(self.share_url());
        }
        if let Some(path) = &self.share_file {
            if let Err(e) = write_share_file(path, &self.base_url, self.store.session()) {
                warn!("could not update share file: {e:#}");
            }
        }
    }

    fn spawn_generation(&mut self, target: Target, description: String) {
        // a retry replaces the failure it retries
        self.requests
            .retain(|_, r| !(r.target == target && r.error.is_some()));

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        info!(ticket, ?target, "generation started");

        let generator = Arc::clone(&self.generator);
        let tx = self.events_tx.clone();
        let worker_description = description.clone();
        let spawned = thread::Builder::new()
            .name(format!("generate-{ticket}"))
            .spawn(move || {
                let phase_tx = tx.clone();
                let mut observe = |phase: Phase| {
                    let _ = phase_tx.send(GenerationEvent::Phase { ticket, phase });
                };
                let result = generate::generate(generator.as_ref(), &worker_description, Some(&mut observe));
                let _ = tx.send(GenerationEvent::Finished { ticket, result });
            });

        let error = spawned
            .err()
            .map(|e| format!("could not start generation: {e}"));
        self.requests.insert(
            ticket,
            Request {
                target,
                description,
                phase: None,
                error,
            },
        );
    }

    fn on_generation_event(&mut self, event: GenerationEvent) {
        match event {
            GenerationEvent::Phase { ticket, phase } => {
                if let Some(request) = self.requests.get_mut(&ticket) {
                    request.phase = Some(phase);
                }
            }
            GenerationEvent::Finished { ticket, result } => {
                let Some(request) = self.requests.remove(&ticket) else {
                    debug!(ticket, "dropping result of a discarded generation");
                    return;
                };
                match result {
                    Ok(generated) => self.apply_generated(request, generated),
                    Err(e) => {
                        warn!(ticket, "generation failed: {e}");
                        self.requests.insert(
                            ticket,
                            Request {
                                phase: None,
                                error: Some(e.to_string()),
                                ..request
                            },
                        );
                    }
                }
            }
        }
    }

    // whichever generation for a lane completes last is the one the lane keeps
    fn apply_generated(&mut self, request: Request, generated: Generated) {
        let Generated { program, analysis } = generated;
        match request.target {
            Target::NewLane => {
                let name = infer_lane_name(&request.description);
                let id = self
                    .store
                    .add_lane(name, program, request.description, Some(analysis));
                info!(lane = %id, "lane generated");
            }
            Target::Lane(id) => {
                if self
                    .store
                    .update_prompt_and_program(&id, request.description, program, Some(analysis))
                {
                    info!(lane = %id, "lane regenerated");
                } else {
                    debug!(lane = %id, "lane is gone, regenerated pattern dropped");
                }
            }
        }
    }
}
