// cosmetic guesses: which icon a lane gets, and what to call a lane made from a description.
// nothing downstream depends on these being right.

use super::session::Icon;

// first match wins, so order matters
const ICON_KEYWORDS: [(&str, Icon); 7] = [
    ("drum", Icon::Percussion),
    ("bass", Icon::Bass),
    ("chord", Icon::Chord),
    ("melody", Icon::Melody),
    ("lead", Icon::Lead),
    ("pad", Icon::Ambient),
    ("ambient", Icon::Ambient),
];

const NAME_KEYWORDS: [(&[&str], &str); 6] = [
    (&["drum", "beat", "kick", "percus"], "Drums"),
    (&["bass"], "Bass"),
    (&["chord", "pad"], "Chords"),
    (&["piano", "keys", "arpy", "pluck"], "Piano"),
    (&["melody", "lead", "synth", "moog", "supersaw"], "Melody"),
    (&["ambient", "atmosphere"], "Ambient"),
];

pub fn infer_icon(name: &str) -> Icon {
    let lower = name.to_lowercase();
    ICON_KEYWORDS
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, icon)| *icon)
        .unwrap_or_default()
}

/// Lane name for a free-text description: a category when a keyword hits,
/// otherwise the first two words title-cased.
pub fn infer_lane_name(description: &str) -> String {
    let lower = description.to_lowercase();
    for (keywords, name) in NAME_KEYWORDS {
        if keywords.iter().any(|k| lower.contains(k)) {
            return name.to_string();
        }
    }
    description
        .split_whitespace()
        .take(2)
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icons_follow_keyword_order() {
        assert_eq!(infer_icon("Drums"), Icon::Percussion);
        assert_eq!(infer_icon("drum and bass"), Icon::Percussion);
        assert_eq!(infer_icon("Acid BASS"), Icon::Bass);
        assert_eq!(infer_icon("Chords"), Icon::Chord);
        assert_eq!(infer_icon("warm pad"), Icon::Ambient);
        assert_eq!(infer_icon("Lead"), Icon::Lead);
        assert_eq!(infer_icon("Piano"), Icon::Default);
    }

    #[test]
    fn names_come_from_keywords() {
        assert_eq!(infer_lane_name("funky drum pattern"), "Drums");
        assert_eq!(infer_lane_name("four on the floor KICK"), "Drums");
        assert_eq!(infer_lane_name("jazzy bass line"), "Bass");
        assert_eq!(infer_lane_name("lush pad"), "Chords");
        assert_eq!(infer_lane_name("plucky keys"), "Piano");
        assert_eq!(infer_lane_name("screaming supersaw"), "Melody");
        assert_eq!(infer_lane_name("dark atmosphere"), "Ambient");
    }

    #[test]
    fn unmatched_descriptions_use_two_title_cased_words() {
        assert_eq!(infer_lane_name("tom waits   style clank"), "Tom Waits");
        assert_eq!(infer_lane_name("ézio"), "Ézio");
        assert_eq!(infer_lane_name(""), "");
    }
}
