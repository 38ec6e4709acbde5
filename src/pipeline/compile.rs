// renders the mix into the one program the engine evaluates.
//
//   setcpm(30.0000)
//   $: s("bd sd").gain(0.80).lpf(4000).room(0.20).delay(0.00).orbit(0)
//   $: note("c2 e2").s("sawtooth").gain(...)...
//
// the mix params are appended here, which is why generated code must never carry them.

use super::session::{Lane, Session};

pub const SILENCE: &str = "silence";

/// The engine counts cycles, one cycle being a bar of four beats.
pub fn cycles_per_minute(bpm: f64) -> f64 {
    bpm / 4.0
}

pub fn tempo_statement(bpm: f64) -> String {
    format!("setcpm({:.4})", cycles_per_minute(bpm))
}

/// Lanes that actually sound: unmuted ones, narrowed to the soloed ones if any are soloed.
/// A lane both muted and soloed stays silent.
pub fn playable(lanes: &[Lane]) -> Vec<&Lane> {
    let active: Vec<&Lane> = lanes.iter().filter(|l| !l.muted).collect();
    if active.iter().any(|l| l.solo) {
        active.into_iter().filter(|l| l.solo).collect()
    } else {
        active
    }
}

pub fn compile(lanes: &[Lane], tempo: f64, global_filter_cutoff: f64) -> String {
    let mut out = tempo_statement(tempo);
    let playing = playable(lanes);
    if playing.is_empty() {
        out.push('\n');
        out.push_str(SILENCE);
        return out;
    }
    for lane in playing {
        out.push('\n');
        out.push_str(&lane_statement(lane, global_filter_cutoff));
    }
    out
}

pub fn compile_session(session: &Session) -> String {
    compile(&session.lanes, session.tempo, session.global_filter_cutoff)
}

// the global cutoff is a ceiling: it can pull a lane's filter down, never open it up
fn lane_statement(lane: &Lane, global_filter_cutoff: f64) -> String {
    let p = &lane.params;
    let cutoff = p.lpf.min(global_filter_cutoff);
    format!(
        "$: {}.gain({:.2}).lpf({}).room({:.2}).delay({:.2}).orbit({})",
        lane.program.trim(),
        p.gain,
        cutoff.round() as i64,
        p.room,
        p.delay,
        lane.orbit,
    )
}
