// Pure analysis core: no I/O, no process spawning.

pub mod ast;
pub mod decision;
pub mod delta;
pub mod estimator;
pub mod extractor;
pub mod features;
pub mod language;
pub mod lookup;
pub mod measure_view;
pub mod normalizer;
pub mod recommendations;
pub mod registry;
pub mod report;
pub mod segmentation;
pub mod sound_profile;
pub mod structure;
pub mod timeline;
