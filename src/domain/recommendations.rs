// Recommendation catalog.
//
// Utterances are templates: `[LINK|...]`, `[sound_rec]` and
// `[COMPLEXITYGOAL]` tokens are resolved by the presentation layer.

use serde::Serialize;

/// Id reserved for the explicit "nothing to suggest" record.
pub const NO_SUGGESTION_ID: u32 = 0;

pub const NUCLEUS: u32 = 1;
pub const DELTA_LOOKUP: u32 = 6;
pub const PARAMETERS: u32 = 7;
pub const GOAL: u32 = 11;
pub const INSTRUMENT: u32 = 29;
pub const FUNCTION: u32 = 31;
pub const FUNCTION_CALL: u32 = 32;
pub const MODULAR: u32 = 65;
pub const EFFECT: u32 = 68;

/// Generic sound suggestions drawn from when nothing specific applies.
pub const GENERIC_POOL: [u32; 3] = [55, 56, 60];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub id: u32,
    pub utterance: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

impl Recommendation {
    fn new(id: u32, utterance: &str) -> Self {
        Self { id, utterance: utterance.to_string(), explain: None, example: None }
    }

    fn explained(id: u32, utterance: &str, explain: &str) -> Self {
        Self { explain: Some(explain.to_string()), ..Self::new(id, utterance) }
    }

    pub fn no_suggestion() -> Self {
        Self::new(NO_SUGGESTION_ID, "")
    }

    pub fn is_no_suggestion(&self) -> bool {
        self.id == NO_SUGGESTION_ID
    }
}

/// Catalog entry for `id`. Delta ids are served from the delta library.
pub fn lookup(id: u32) -> Option<Recommendation> {
    let rec = match id {
        NUCLEUS => Recommendation::new(id, "[NUCLEUS]"),
        DELTA_LOOKUP => Recommendation::new(id, "[DELTALOOKUP]"),
        PARAMETERS => Recommendation::explained(
            id,
            "what if the code that builds the new [LINK|section] took some [LINK|parameters]?",
            "then each repeat of the section can change a little",
        ),
        GOAL => Recommendation::explained(
            id,
            "we still need [COMPLEXITYGOAL] in this project, so let's work it in",
            "it was one of the goals you set for this project",
        ),
        INSTRUMENT => Recommendation::new(id, "[STARTTREE|selectinstr]"),
        FUNCTION => Recommendation::explained(
            id,
            "some sections repeat. A [LINK|custom function] could build them",
            "then the same code does not have to be written twice",
        ),
        FUNCTION_CALL => Recommendation::explained(
            id,
            "one [LINK|section] comes from a [LINK|custom function]. Call it again to make a similar section later on",
            "repeating [LINK|sections] can hold a whole song together",
        ),
        MODULAR => Recommendation::explained(
            id,
            "there is a [LINK|custom function] already; could it build one of the [LINK|sections] too?",
            "modular code can be reused later without typing it all again",
        ),
        EFFECT => Recommendation::explained(
            id,
            "let's add effects with [LINK|setEffect], maybe a [LINK|filter] or some [LINK|volume mixing]",
            "effects give finer control over how each sound comes across",
        ),
        55 => Recommendation::new(id, "we could try [sound_rec]"),
        56 => Recommendation::new(id, "how about [sound_rec] and then [sound_rec]?"),
        60 => Recommendation::new(id, "maybe [sound_rec] would fit here?"),
        _ => return None,
    };
    Some(rec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_covers_leaves_and_pool() {
        for id in [NUCLEUS, DELTA_LOOKUP, PARAMETERS, GOAL, INSTRUMENT, FUNCTION, FUNCTION_CALL, MODULAR, EFFECT] {
            assert_eq!(lookup(id).map(|r| r.id), Some(id));
        }
        assert!(GENERIC_POOL.iter().all(|id| lookup(*id).is_some()));
        assert!(lookup(999).is_none());
        assert!(Recommendation::no_suggestion().is_no_suggestion());
    }
}
