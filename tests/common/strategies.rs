use proptest::prelude::*;
use serde_json::{json, Map, Value};

/// Arbitrary non-empty Unicode text
pub fn analysis_text_strategy() -> impl Strategy<Value = String> {
    "\\PC{1,200}"
}

/// Engine options as the shell would forward them
pub fn options_strategy() -> impl Strategy<Value = Map<String, Value>> {
    (
        proptest::option::of(any::<bool>()),
        proptest::option::of(any::<bool>()),
        proptest::option::of(1u64..200_000),
    )
        .prop_map(|(morphology, entities, max_length)| {
            let mut options = Map::new();
            if let Some(flag) = morphology {
                options.insert("include_morphology".to_string(), json!(flag));
            }
            if let Some(flag) = entities {
                options.insert("include_entities".to_string(), json!(flag));
            }
            if let Some(max) = max_length {
                options.insert("max_length".to_string(), json!(max));
            }
            options
        })
}
