//! Identity-word source for bundle naming.
//!
//! Bundles created the same day need memorable, distinct names. Words come
//! from the system dictionary when one exists, with an embedded fallback so
//! naming never depends on the environment.

use rand::seq::IndexedRandom;
use std::fs;
use tracing::debug;

const SYSTEM_WORD_FILE: &str = "/usr/share/dict/words";

/// Fallback vocabulary when no system dictionary is available.
const FALLBACK_WORDS: &[&str] = &[
    "almond", "amber", "aspen", "basil", "birch", "breeze", "canyon", "cedar", "cliff", "clover",
    "cobalt", "coral", "cricket", "delta", "drift", "ember", "fern", "flint", "garnet", "glacier",
    "grove", "harbor", "hazel", "heron", "juniper", "lagoon", "linden", "maple", "meadow", "mesa",
    "onyx", "orchid", "osprey", "pebble", "pinecone", "plume", "prairie", "quartz", "reef",
    "saffron", "sierra", "sparrow", "summit", "thicket", "tundra", "walnut", "willow", "wren",
];

/// Whether a dictionary line makes a reasonable bundle word.
fn usable(word: &str) -> bool {
    (3..=8).contains(&word.len()) && word.chars().all(|c| c.is_ascii_lowercase())
}

/// Pick a random identity word.
pub fn identity_word() -> String {
    let mut rng = rand::rng();
    if let Ok(contents) = fs::read_to_string(SYSTEM_WORD_FILE) {
        let words: Vec<&str> = contents.lines().filter(|w| usable(w)).collect();
        if let Some(word) = words.choose(&mut rng) {
            return (*word).to_string();
        }
    }
    debug!("No system dictionary, using the embedded word list");
    FALLBACK_WORDS
        .choose(&mut rng)
        .copied()
        .unwrap_or("shoebox")
        .to_string()
}
