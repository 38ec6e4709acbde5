// fixed instructions for the two generation steps. the sound vocabulary here is the same
// set the playback warm-up prefetches, so generated code only reaches for cached samples.

pub const DRUM_SOUNDS: [&str; 10] = ["bd", "sd", "hh", "ho", "cp", "mt", "ht", "lt", "rim", "cb"];
pub const SAMPLE_SOUNDS: [&str; 8] = ["arpy", "pluck", "bass", "moog", "juno", "gtr", "jazz", "sitar"];
pub const SYNTH_SOUNDS: [&str; 6] = ["sawtooth", "square", "triangle", "sine", "supersaw", "pulse"];

pub const ANALYSIS_MAX_TOKENS: u32 = 512;
pub const CODE_MAX_TOKENS: u32 = 256;

pub const ANALYSIS_INSTRUCTION: &str = r#"You are an expert in music theory. The user describes a sound, a style, or names a song. Work out the musical traits needed to write a similar pattern.

Reply with one JSON object and nothing else: no prose, no markdown. Use exactly these fields:
{
  "key": "the key or scale, e.g. D dorian",
  "notes": "space separated lowercase notes with octaves, e.g. d2 f2 a2 c3",
  "rhythm": "the rhythmic feel, e.g. syncopated 16ths, half-time",
  "character": "timbre and mood, e.g. gritty, hypnotic, sparse",
  "structure": "the shape of the phrase, e.g. 1-bar loop, call and response"
}"#;

/// System instruction for the code step, with the sound vocabulary spelled out.
pub fn code_instruction() -> String {
    format!(
        r#"You write patterns in the Strudel live-coding language.
Reply with exactly one line of Strudel code. No prose, no markdown.

SOUNDS (use nothing else):
  drums, via s(): {drums}
  samples, via s(): {samples}
  synths, via note().s(): {synths}

RULES:
- Never use .bank(), .voicings(), .distort(), .crush(), .coarse() or .play()
- Never add .gain(), .lpf(), .room(), .delay() or .orbit(); the mixer appends them
- Never add .fast() or .slow(); tempo is set from outside
- There is no "piano" sound; use arpy or pluck instead
- Write chords with brackets, e.g. note("[c3,e3,g3]"), never with voicings()
- Follow the notes and rhythm from the musical analysis

MINI-NOTATION:
  "a b c d"   four events per cycle, a sequence. Use this for beats, bass lines and melodies.
  "<a b c d>" one event per cycle, alternating. Use this only for slow chord changes.
  Never write <...>*N, it plays absurdly fast. Use a plain sequence instead.

EXAMPLES:
  s("bd ~ sd ~")
  s("bd*2 ~ sd [hh ho]")
  note("e2 ~ e2 ~ g2 a2 ~ e2").s("sawtooth")
  note("<[c3,e3,g3] [a2,c3,e3] [f2,a2,c3] [g2,b2,d3]>").s("arpy")
  s("arpy").n("0 2 4 7")"#,
        drums = DRUM_SOUNDS.join(" "),
        samples = SAMPLE_SOUNDS.join(" "),
        synths = SYNTH_SOUNDS.join(" "),
    )
}
