// end to end: describe lanes, play them through the file engine, share, restore.

use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use seker::audio::{self, WARMUP_SETTLE};
use seker::audio_api::EngineConfig;
use seker::generate::{CompletionRequest, GenerationError, TextGenerator};
use seker::generate::prompts::ANALYSIS_INSTRUCTION;
use seker::middle::Middle;
use seker::pipeline::compile::compile_session;
use seker::pipeline::persistence::{self, session_from_link};
use seker::pipeline::session::{Icon, ParamKey};
use seker::pipeline::store::SessionStore;
use seker::shared::InputEvent;

// a stand-in model: knows a drum beat and a bass line
struct TinyModel;

impl TextGenerator for TinyModel {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, GenerationError> {
        if request.system == ANALYSIS_INSTRUCTION {
            return Ok("```json\n{\"key\":\"E minor\",\"rhythm\":\"four on the floor\"}\n```".into());
        }
        if request.user.contains("bass") {
            Ok("note(\"e2 ~ e2 g2\").s(\"sawtooth\")".into())
        } else {
            Ok("s(\"bd*4, ~ cp\")".into())
        }
    }
}

fn wait_for_generations(middle: &mut Middle<impl seker::audio_api::AudioEngine>) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while middle.generations_in_flight() > 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
        middle.tick(Instant::now());
    }
    assert_eq!(middle.generations_in_flight(), 0);
}

#[test]
fn described_lanes_play_share_and_come_back() {
    let dir = tempfile::tempdir().unwrap();
    let program_file = dir.path().join("live").join("seker.strudel");
    let share_file = dir.path().join("link.txt");

    let playback = audio::start_playback(&program_file, EngineConfig::default(), Duration::from_millis(80));
    let mut middle = Middle::new(SessionStore::new(), playback, Arc::new(TinyModel), "https://seker.local/")
        .with_share_file(share_file.clone());

    middle.handle_input(InputEvent::AddLane("driving techno drums".into()), Instant::now());
    wait_for_generations(&mut middle);
    middle.handle_input(InputEvent::AddLane("rolling bass".into()), Instant::now());
    wait_for_generations(&mut middle);

    let lanes = middle.store().lanes().to_vec();
    assert_eq!(lanes.len(), 2);
    assert_eq!((lanes[0].name.as_str(), lanes[0].icon), ("Drums", Icon::Percussion));
    assert_eq!((lanes[1].name.as_str(), lanes[1].icon), ("Bass", Icon::Bass));
    assert_ne!(lanes[0].orbit, lanes[1].orbit);

    // play: warm-up first, the real mix once it settles
    let t0 = Instant::now();
    middle.handle_input(InputEvent::TogglePlay, t0);
    let written = fs::read_to_string(&program_file).unwrap();
    assert!(written.starts_with("samples('github:tidalcycles/Dirt-Samples/master/')\n"));
    assert!(written.contains(".gain(0)"));

    middle.tick(t0 + WARMUP_SETTLE);
    let written = fs::read_to_string(&program_file).unwrap();
    assert!(written.contains(&compile_session(middle.store().session())));

    // a mix change while playing lands after the debounce window
    let lane = lanes[1].id.clone();
    let t1 = t0 + WARMUP_SETTLE + Duration::from_millis(10);
    middle.handle_input(InputEvent::NudgeParam { lane: lane.clone(), key: ParamKey::Room, steps: 10.0 }, t1);
    middle.tick(t1 + Duration::from_millis(100));
    let written = fs::read_to_string(&program_file).unwrap();
    assert!(written.contains(".room(0.30)"));

    // share file tracks the session; the link restores the same mix
    let link = fs::read_to_string(&share_file).unwrap();
    let restored = session_from_link(link.trim()).unwrap();
    assert_eq!(&restored, middle.store().session());
    assert_eq!(compile_session(&restored), compile_session(middle.store().session()));

    middle.handle_input(InputEvent::TogglePlay, t1 + Duration::from_millis(200));
    assert_eq!(fs::read_to_string(&program_file).unwrap().lines().last(), Some("hush()"));
}

#[test]
fn scenes_survive_a_share_link() {
    let mut store = SessionStore::new();
    let drums = store.add_lane("Drums", "s(\"bd sd\")", "", None);
    let keys = store.add_lane("Keys", "note(\"c3 e3\").s(\"arpy\")", "", None);
    store.toggle_mute(&keys);
    store.set_tempo(96.0);
    let scene = store.save_scene();
    store.toggle_mute(&keys);
    store.toggle_solo(&drums);
    store.set_tempo(140.0);

    let link = persistence::share_url("https://seker.local/", store.session());
    let mut restored = SessionStore::with_session(session_from_link(&link).unwrap());
    assert_eq!(restored.session().scenes[0].id, scene);
    assert!(restored.load_scene_at(0));
    assert_eq!(restored.session().tempo, 96.0);

    let program = compile_session(restored.session());
    assert!(program.starts_with("setcpm(24.0000)\n"));
    assert!(program.contains("s(\"bd sd\")"));
    assert!(!program.contains("arpy"));
}

#[test]
fn empty_sessions_share_the_bare_base() {
    let store = SessionStore::new();
    assert_eq!(persistence::share_url("https://seker.local/#s=old", store.session()), "https://seker.local/");
    assert_eq!(session_from_link("https://seker.local/"), None);
    assert_eq!(session_from_link("https://seker.local/#s=%%%"), None);
}
