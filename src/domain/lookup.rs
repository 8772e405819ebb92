// Stateless queries over a sound profile.
//
// Each top-level section and each of its direct subsections is checked on
// its own; deeper levels do not exist.

use serde::{Deserialize, Serialize};

use crate::domain::sound_profile::{Section, SoundProfile};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "dimension", content = "value", rename_all = "lowercase")]
pub enum Key {
    Label(String),
    Measure(usize),
    Sound(String),
    Effect(String),
    Line(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Label,
    Measure,
    Sound,
    Effect,
    Line,
}

/// Values of `output` for every section matching `input`. Unknown input
/// yields an empty list.
pub fn lookup(profile: &SoundProfile, input: &Key, output: Dimension) -> Vec<Key> {
    let mut found = Vec::new();
    for section in profile.sections() {
        collect(section, input, output, &mut found);
        for sub in &section.subsections {
            collect(sub, input, output, &mut found);
        }
    }
    found
}

fn collect(section: &Section, input: &Key, output: Dimension, found: &mut Vec<Key>) {
    if !matches(section, input) {
        return;
    }
    for key in values(section, input, output) {
        if !found.contains(&key) {
            found.push(key);
        }
    }
}

fn matches(section: &Section, input: &Key) -> bool {
    match input {
        Key::Label(label) => &section.label == label,
        Key::Measure(m) => section.contains_measure(*m),
        Key::Sound(name) => section.sounds.contains_key(name),
        Key::Effect(name) => section.effects.contains_key(name),
        Key::Line(line) => section.lines().contains(line),
    }
}

fn values(section: &Section, input: &Key, output: Dimension) -> Vec<Key> {
    // A sound or effect narrows measures and lines to its own occurrences.
    let occurrence = match input {
        Key::Sound(name) => section.sounds.get(name),
        Key::Effect(name) => section.effects.get(name),
        _ => None,
    };
    match (output, occurrence) {
        (Dimension::Measure, Some(o)) => o.measures.iter().copied().map(Key::Measure).collect(),
        (Dimension::Line, Some(o)) => o.lines.iter().copied().map(Key::Line).collect(),
        (Dimension::Label, _) => vec![Key::Label(section.label.clone())],
        (Dimension::Measure, None) => section.measures().map(Key::Measure).collect(),
        (Dimension::Sound, _) => section.sounds.keys().cloned().map(Key::Sound).collect(),
        (Dimension::Effect, _) => section.effects.keys().cloned().map(Key::Effect).collect(),
        (Dimension::Line, None) => section.lines().into_iter().map(Key::Line).collect(),
    }
}
