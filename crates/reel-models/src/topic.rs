//! Topics and title derivation.

use rand::seq::IndexedRandom;

/// Topics drawn from when a run is started without one.
pub const TOPIC_POOL: &[&str] = &[
    "gold rush tale",
    "lost roman legion",
    "pirates of the caribbean",
    "the great fire of london",
    "ancient egyptian builders",
    "viking sea raids",
    "the silk road traders",
    "medieval castle siege",
    "the titanic's last night",
    "samurai code of honor",
    "the library of alexandria",
    "wild west outlaws",
];

/// Maximum title length accepted by the hosting service.
pub const MAX_TITLE_CHARS: usize = 60;

/// Resolve the topic for a run.
///
/// A supplied topic is used as-is (trimmed); a missing or blank one is
/// replaced by a uniformly random entry from [`TOPIC_POOL`].
pub fn resolve_topic(requested: Option<&str>) -> String {
    match requested.map(str::trim) {
        Some(topic) if !topic.is_empty() => topic.to_string(),
        _ => random_topic(),
    }
}

fn random_topic() -> String {
    let mut rng = rand::rng();
    TOPIC_POOL
        .choose(&mut rng)
        .copied()
        .unwrap_or(TOPIC_POOL[0])
        .to_string()
}

/// Derive the display title from a topic.
///
/// Whitespace is collapsed and every word gets an upper-case first letter.
/// Deterministic: the same topic always yields the same title.
pub fn title_from_topic(topic: &str) -> String {
    topic
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Truncate a title to at most `max_chars` characters, on a char boundary.
pub fn truncate_title(title: &str, max_chars: usize) -> String {
    if title.chars().count() <= max_chars {
        return title.to_string();
    }
    title
        .chars()
        .take(max_chars)
        .collect::<String>()
        .trim_end()
        .to_string()
}
