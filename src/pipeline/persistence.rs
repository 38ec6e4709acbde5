// share links. the session goes out as json -> percent escaping -> base64 with the url-safe
// alphabet and no padding, riding in the url fragment as `#s=<token>`.
// reading a link never fails loudly: anything broken just means "no saved state".

use std::path::Path;

use anyhow::Context;
use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pipeline::session::Session;

pub const FRAGMENT_KEY: &str = "s";
pub const FORMAT_VERSION: u32 = 1;

const TOKEN: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Serialize)]
struct Envelope<'a> {
    v: u32,
    #[serde(flatten)]
    session: &'a Session,
}

#[derive(Deserialize)]
struct OwnedEnvelope {
    #[serde(default)]
    v: u32, // links made before versioning have no `v`
    #[serde(flatten)]
    session: Session,
}

pub fn encode(session: &Session) -> serde_json::Result<String> {
    let json = serde_json::to_string(&Envelope {
        v: FORMAT_VERSION,
        session,
    })?;
    Ok(TOKEN.encode(percent_escape(&json)))
}

pub fn decode(token: &str) -> Option<Session> {
    // tolerate the standard alphabet too
    let token: String = token
        .trim()
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    let bytes = TOKEN
        .decode(token.as_bytes())
        .map_err(|e| debug!("share token is not base64: {e}"))
        .ok()?;
    let escaped = String::from_utf8(bytes)
        .map_err(|_| debug!("share token payload is not text"))
        .ok()?;
    let json = percent_unescape(&escaped)?;
    let envelope: OwnedEnvelope = serde_json::from_str(&json)
        .map_err(|e| debug!("share token payload is not a session: {e}"))
        .ok()?;
    if envelope.v > FORMAT_VERSION {
        debug!(version = envelope.v, "share token is from a newer format");
        return None;
    }
    Some(envelope.session)
}

/// `s=<token>`, or `None` for a session without lanes (its link carries no fragment).
pub fn share_fragment(session: &Session) -> Option<String> {
    if !session.has_lanes() {
        return None;
    }
    match encode(session) {
        Ok(token) => Some(format!("{FRAGMENT_KEY}={token}")),
        Err(e) => {
            debug!("could not encode session: {e}");
            None
        }
    }
}

pub fn share_url(base: &str, session: &Session) -> String {
    let base = base.split('#').next().unwrap_or(base);
    match share_fragment(session) {
        Some(fragment) => format!("{base}#{fragment}"),
        None => base.to_string(),
    }
}

/// Accepts a full link, a bare `#s=...` / `s=...` fragment, or a bare token.
pub fn session_from_link(link: &str) -> Option<Session> {
    let link = link.trim();
    let fragment = match link.split_once('#') {
        Some((_, fragment)) => fragment,
        None if link.contains('=') => link,
        None => return decode(link),
    };
    let token = fragment
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == FRAGMENT_KEY)
        .map(|(_, value)| value)?;
    if token.is_empty() {
        return None;
    }
    decode(token)
}

// keeps a file holding the current share link, the way a browser keeps it in the address bar
pub fn write_share_file(path: &Path, base: &str, session: &Session) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    let mut link = share_url(base, session);
    link.push('\n');
    std::fs::write(path, link).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

// ── Percent escaping ──────────────────────────────────────────────
// same set as javascript's encodeURIComponent, so links stay compatible both ways

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(b, b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')')
}

fn percent_escape(text: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(text.len());
    for &b in text.as_bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0f) as usize] as char);
        }
    }
    out
}

fn percent_unescape(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = hex_value(*bytes.get(i + 1)?)?;
            let lo = hex_value(*bytes.get(i + 2)?)?;
            out.push(hi << 4 | lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out)
        .map_err(|_| debug!("share token escapes are not utf-8"))
        .ok()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::session::{Analysis, LaneId, LaneMix, ParamKey, Scene, SceneId};
    use crate::pipeline::store::SessionStore;
    use serde_json::json;

    fn rich_session() -> Session {
        let mut store = SessionStore::new();
        let analysis: Analysis = serde_json::from_value(json!({
            "key": "F# minor",
            "notes": "f#2 a2 c#3",
            "character": { "mood": ["brooding", "warm"], "energy": 0.7 },
            "structure": "2-bar motif",
        }))
        .unwrap();
        let drums = store.add_lane("Drüms 🥁 ビート", "s(\"bd*2 ~ sd [hh ho]\")", "", None);
        let bass = store.add_lane(
            "Bass",
            "note(\"f#2 ~ a2 c#3\").s(\"sawtooth\")",
            "brooding bass, 100% \"analog\" & warm",
            Some(analysis),
        );
        store.update_param(&bass, ParamKey::Lpf, 1234.5);
        store.update_param(&drums, ParamKey::Gain, 0.1 + 0.2);
        store.toggle_solo(&drums);
        store.set_tempo(97.3);
        store.save_scene();
        store.toggle_mute(&bass);
        store.save_scene();
        store.session().clone()
    }

    #[test]
    fn sessions_survive_the_round_trip() {
        let session = rich_session();
        let token = encode(&session).unwrap();
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(decode(&token), Some(session));
    }

    #[test]
    fn empty_session_round_trips_too() {
        let session = Session::default();
        assert_eq!(decode(&encode(&session).unwrap()), Some(session));
    }

    #[test]
    fn garbage_decodes_to_nothing() {
        let token = encode(&rich_session()).unwrap();
        assert_eq!(decode(&token[..token.len() / 2]), None);
        assert_eq!(decode("!!!not base64!!!"), None);
        assert_eq!(decode(&TOKEN.encode("plainly not json")), None);
        assert_eq!(decode(&TOKEN.encode("%E0%A4%A")), None);
        assert_eq!(decode(&TOKEN.encode("%FF%FE")), None);
        assert_eq!(decode(""), None);
    }

    #[test]
    fn newer_formats_are_refused() {
        let json = r#"{"v":99,"lanes":[],"tempo":120}"#;
        assert_eq!(decode(&TOKEN.encode(percent_escape(json))), None);
    }

    #[test]
    fn padded_and_standard_alphabet_tokens_still_decode() {
        let session = rich_session();
        let json = serde_json::to_string(&session).unwrap();
        let standard = base64::engine::general_purpose::STANDARD.encode(percent_escape(&json));
        assert_eq!(decode(&standard), Some(session));
    }

    #[test]
    fn legacy_links_load() {
        let json = json!({
            "lanes": [{
                "id": "5f1c7d0e-3c55-4c1e-9a53-2b2a4f6c0a11",
                "name": "Drums",
                "emoji": "🥁",
                "prompt": "",
                "analysis": null,
                "baseCode": "s(\"bd sd\")",
                "params": { "gain": 0.8, "lpf": 4000, "room": 0.2, "delay": 0 },
                "muted": false,
                "solo": false,
                "orbit": 0
            }],
            "bpm": 132
        })
        .to_string();
        let session = decode(&TOKEN.encode(percent_escape(&json))).unwrap();
        assert_eq!(session.tempo, 132.0);
        assert_eq!(session.lanes[0].program, "s(\"bd sd\")");
        assert_eq!(session.lanes[0].id, LaneId("5f1c7d0e-3c55-4c1e-9a53-2b2a4f6c0a11".into()));
    }

    #[test]
    fn scenes_keep_their_lane_states() {
        let session = rich_session();
        let decoded = decode(&encode(&session).unwrap()).unwrap();
        let scene: &Scene = &decoded.scenes[1];
        let first: &LaneMix = scene.lane_states.get(&decoded.lanes[0].id).unwrap();
        assert!(first.solo);
        assert!(decoded.scenes[0].id < decoded.scenes[1].id);
        assert!(decoded.scenes[0].id > SceneId(0));
    }

    #[test]
    fn links_parse_in_every_shape() {
        let session = rich_session();
        let url = share_url("https://seker.local/?x=1#old", &session);
        assert!(url.starts_with("https://seker.local/?x=1#s="));
        let token = url.split("#s=").nth(1).unwrap();

        assert_eq!(session_from_link(&url), Some(session.clone()));
        assert_eq!(session_from_link(&format!("#foo=bar&s={token}")), Some(session.clone()));
        assert_eq!(session_from_link(&format!("s={token}")), Some(session.clone()));
        assert_eq!(session_from_link(token), Some(session));
        assert_eq!(session_from_link("https://seker.local/"), None);
        assert_eq!(session_from_link("https://seker.local/#s="), None);
    }

    #[test]
    fn empty_sessions_share_a_bare_link() {
        assert_eq!(share_url("https://seker.local/#s=abc", &Session::default()), "https://seker.local/");
        assert_eq!(share_fragment(&Session::default()), None);
    }

    #[test]
    fn escaping_matches_uri_component_rules() {
        assert_eq!(percent_escape("a b&c/é!*'()~"), "a%20b%26c%2F%C3%A9!*'()~");
        assert_eq!(percent_unescape("a%20b%26c%2F%C3%A9").as_deref(), Some("a b&c/é"));
        assert_eq!(percent_unescape("%zz"), None);
    }

    #[test]
    fn share_file_holds_the_current_link() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("link.txt");
        let session = rich_session();
        write_share_file(&path, "https://seker.local/", &session).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(session_from_link(written.trim()), Some(session));
    }
}
