// the serializable session: lanes, tempo, global filter ceiling and saved scenes.
// everything here round-trips through serde so a session can ride inside a share link.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub const DEFAULT_TEMPO: f64 = 120.0;
pub const DEFAULT_GLOBAL_CUTOFF: f64 = 8000.0;

// ── Ids ───────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LaneId(pub String);

impl LaneId {
    pub fn random() -> Self {
        LaneId(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(pub u64); // milliseconds since epoch at save time, bumped to stay increasing

// ── Params ────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKey {
    Gain,
    Lpf,
    Room,
    Delay,
}

impl ParamKey {
    pub const ALL: [ParamKey; 4] = [ParamKey::Gain, ParamKey::Lpf, ParamKey::Room, ParamKey::Delay];

    pub fn label(self) -> &'static str {
        match self {
            ParamKey::Gain => "gain",
            ParamKey::Lpf => "lpf",
            ParamKey::Room => "room",
            ParamKey::Delay => "delay",
        }
    }

    /// Range the input layer clamps to. The store itself never clamps.
    pub fn range(self) -> (f64, f64) {
        match self {
            ParamKey::Gain => (0.0, 1.0),
            ParamKey::Lpf => (200.0, 8000.0),
            ParamKey::Room => (0.0, 1.0),
            ParamKey::Delay => (0.0, 0.8),
        }
    }

    /// Slider step size.
    pub fn step(self) -> f64 {
        match self {
            ParamKey::Lpf => 10.0,
            _ => 0.01,
        }
    }

    pub fn clamp(self, value: f64) -> f64 {
        let (lo, hi) = self.range();
        value.clamp(lo, hi)
    }

    pub fn next(self) -> Self {
        match self {
            ParamKey::Gain => ParamKey::Lpf,
            ParamKey::Lpf => ParamKey::Room,
            ParamKey::Room => ParamKey::Delay,
            ParamKey::Delay => ParamKey::Gain,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneParams {
    pub gain: f64,  // 0..1
    pub lpf: f64,   // Hz, 200..8000
    pub room: f64,  // reverb mix 0..1
    pub delay: f64, // delay mix 0..0.8
}

impl Default for LaneParams {
    fn default() -> Self {
        Self {
            gain: 0.8,
            lpf: 4000.0,
            room: 0.2,
            delay: 0.0,
        }
    }
}

impl LaneParams {
    pub fn get(&self, key: ParamKey) -> f64 {
        match key {
            ParamKey::Gain => self.gain,
            ParamKey::Lpf => self.lpf,
            ParamKey::Room => self.room,
            ParamKey::Delay => self.delay,
        }
    }

    pub fn set(&mut self, key: ParamKey, value: f64) {
        match key {
            ParamKey::Gain => self.gain = value,
            ParamKey::Lpf => self.lpf = value,
            ParamKey::Room => self.room = value,
            ParamKey::Delay => self.delay = value,
        }
    }
}

// ── Icon ──────────────────────────────────────────────────────────

/// Cosmetic category picked once from the lane name when the lane is created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Icon {
    Percussion,
    Bass,
    Chord,
    Melody,
    Lead,
    Ambient,
    #[default]
    Default,
}

impl Icon {
    pub fn glyph(self) -> &'static str {
        match self {
            Icon::Percussion => "🥁",
            Icon::Bass => "🎸",
            Icon::Chord => "🎹",
            Icon::Melody => "🎵",
            Icon::Lead => "🎺",
            Icon::Ambient => "🌊",
            Icon::Default => "🎵",
        }
    }

    // accepts our own tags plus the emoji glyphs older links stored
    pub fn from_tag(tag: &str) -> Option<Self> {
        let icon = match tag {
            "percussion" | "🥁" => Icon::Percussion,
            "bass" | "🎸" => Icon::Bass,
            "chord" | "🎹" => Icon::Chord,
            "melody" => Icon::Melody,
            "lead" | "🎺" => Icon::Lead,
            "ambient" | "🌊" | "🎷" => Icon::Ambient,
            "default" | "🎵" => Icon::Default,
            _ => return None,
        };
        Some(icon)
    }
}

fn lenient_icon<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Icon, D::Error> {
    let tag = Option::<String>::deserialize(deserializer)?;
    Ok(tag.as_deref().and_then(Icon::from_tag).unwrap_or_default())
}

// ── Analysis ──────────────────────────────────────────────────────

/// Musical summary returned by the analysis step. Advisory only, never executed.
///
/// Kept as an open JSON object: the model is asked for five string fields but is
/// free to return other shapes, and whatever it returned has to survive a share link.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Analysis(pub Map<String, Value>);

impl Analysis {
    pub const FIELDS: [&'static str; 5] = ["key", "notes", "rhythm", "character", "structure"];

    /// What a failed parse degrades to: the raw model text as the character.
    pub fn from_raw_text(raw: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("character".to_string(), Value::String(raw.to_string()));
        Analysis(fields)
    }

    /// Text for one field, or `None` when it is missing or blank-ish
    /// (null, empty string, `false`, `0`).
    pub fn field(&self, name: &str) -> Option<String> {
        match self.0.get(name)? {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) if n.as_f64() == Some(0.0) => None,
            other => Some(other.to_string()),
        }
    }
}

// ── Lane ──────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lane {
    pub id: LaneId,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "emoji", deserialize_with = "lenient_icon")]
    pub icon: Icon,
    #[serde(default)]
    pub prompt: String, // empty when the lane was not generated
    #[serde(default)]
    pub analysis: Option<Analysis>,
    #[serde(default, alias = "baseCode")]
    pub program: String, // base pattern, no mix params baked in
    #[serde(default)]
    pub params: LaneParams,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub solo: bool,
    #[serde(default)]
    pub orbit: u32, // output bus, fixed at creation
}

impl Lane {
    pub fn mix(&self) -> LaneMix {
        LaneMix {
            muted: self.muted,
            solo: self.solo,
            params: self.params,
        }
    }
}

/// The slice of a lane a scene captures.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaneMix {
    pub muted: bool,
    pub solo: bool,
    pub params: LaneParams,
}

// ── Scene ─────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub id: SceneId,
    #[serde(default)]
    pub name: String,
    #[serde(alias = "bpm")]
    pub tempo: f64,
    pub global_filter_cutoff: f64,
    #[serde(default)]
    pub lane_states: BTreeMap<LaneId, LaneMix>,
}

// ── Session ───────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Session {
    pub lanes: Vec<Lane>,
    #[serde(alias = "bpm")]
    pub tempo: f64,
    pub global_filter_cutoff: f64,
    pub scenes: Vec<Scene>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            lanes: Vec::new(),
            tempo: DEFAULT_TEMPO,
            global_filter_cutoff: DEFAULT_GLOBAL_CUTOFF,
            scenes: Vec::new(),
        }
    }
}

impl Session {
    pub fn lane(&self, id: &LaneId) -> Option<&Lane> {
        self.lanes.iter().find(|l| &l.id == id)
    }

    pub fn lane_mut(&mut self, id: &LaneId) -> Option<&mut Lane> {
        self.lanes.iter_mut().find(|l| &l.id == id)
    }

    pub fn has_lanes(&self) -> bool {
        !self.lanes.is_empty()
    }
}
