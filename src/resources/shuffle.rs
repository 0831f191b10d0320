//! `random_shuffle`: a random permutation of a list of strings.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{count, from_state, to_state, Keepers, ResourceHandler, ResourceKind};
use crate::error::ProviderError;
use crate::random;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema, Validator};

const ID: &str = "-";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ShuffleModel {
    #[serde(default)]
    keepers: Keepers,
    input: Vec<String>,
    #[serde(default)]
    seed: Option<String>,
    #[serde(default)]
    result_count: Option<i64>,
    #[serde(default)]
    result: Option<Vec<String>>,
    #[serde(default)]
    id: Option<String>,
}

fn string_list(flags: AttributeFlags) -> Attribute {
    Attribute::new(AttributeType::list(AttributeType::String), flags)
}

/// `random_shuffle`
pub struct ShuffleResource;

impl ResourceHandler for ShuffleResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Shuffle
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description(
                "The resource random_shuffle generates a random permutation of a list of strings \
                 given as an argument.",
            )
            .with_attribute("keepers", Attribute::keepers())
            .with_attribute(
                "input",
                string_list(AttributeFlags::required())
                    .requires_replace()
                    .with_description("The list of strings to shuffle."),
            )
            .with_attribute(
                "seed",
                Attribute::optional_string()
                    .requires_replace()
                    .with_description(
                        "Arbitrary string with which to seed the random number generator, in \
                         order to produce less-volatile permutations of the list.",
                    ),
            )
            .with_attribute(
                "result_count",
                Attribute::optional_int64()
                    .requires_replace()
                    .with_validator(Validator::AtLeast(0))
                    .with_description(
                        "The number of results to return. Defaults to the number of items in the \
                         input list. If fewer items are requested, some elements will be excluded \
                         from the result. If more items are requested, items will be repeated in \
                         the result but not more frequently than the number of items in the input list.",
                    ),
            )
            .with_attribute(
                "result",
                string_list(AttributeFlags::computed())
                    .use_state_for_unknown()
                    .with_description("Random permutation of the list of strings given in input."),
            )
            .with_attribute(
                "id",
                Attribute::computed_string()
                    .use_state_for_unknown()
                    .with_description("A static value used internally. It is always \"-\"."),
            )
    }

    fn create(&self, planned: Value) -> Result<Value, ProviderError> {
        let mut model: ShuffleModel = from_state(planned)?;
        let wanted = match model.result_count {
            Some(n) => count(self.kind(), "result_count", n)?,
            None => model.input.len(),
        };
        let mut rng = random::rng_for(self.kind().type_name(), model.seed.as_deref())?;
        let result = random::shuffle_take(&mut rng, &model.input, wanted);
        debug!(
            input = model.input.len(),
            result = result.len(),
            seeded = model.seed.is_some(),
            "Shuffled input list"
        );
        model.result = Some(result);
        model.id = Some(ID.to_string());
        to_state(&model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create(config: Value) -> Value {
        let planned = crate::plan::propose(&ShuffleResource.schema(), &config);
        ShuffleResource.create(Value::Object(planned)).unwrap()
    }

    fn result(state: &Value) -> Vec<String> {
        serde_json::from_value(state["result"].clone()).unwrap()
    }

    #[test]
    fn test_permutation_of_input() {
        let state = create(json!({"input": ["a", "b", "c", "d", "e"]}));
        let mut shuffled = result(&state);
        shuffled.sort();
        assert_eq!(shuffled, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(state["id"], "-");
    }

    #[test]
    fn test_seed_is_deterministic() {
        let config = json!({"input": ["a", "b", "c", "d", "e", "f"], "seed": "-"});
        assert_eq!(result(&create(config.clone())), result(&create(config)));
    }

    #[test]
    fn test_result_count_longer_than_input() {
        let state = create(json!({"input": ["x", "y"], "result_count": 5}));
        let shuffled = result(&state);
        assert_eq!(shuffled.len(), 5);
        let xs = shuffled.iter().filter(|s| *s == "x").count();
        assert!((2..=3).contains(&xs));
    }

    #[test]
    fn test_result_count_shorter_than_input() {
        let state = create(json!({"input": ["a", "b", "c", "d"], "result_count": 2}));
        let shuffled = result(&state);
        assert_eq!(shuffled.len(), 2);
        assert_ne!(shuffled[0], shuffled[1]);
    }

    #[test]
    fn test_empty_results() {
        assert!(result(&create(json!({"input": []}))).is_empty());
        assert!(result(&create(json!({"input": ["a"], "result_count": 0}))).is_empty());
        assert!(result(&create(json!({"input": [], "result_count": 3}))).is_empty());
    }

    #[test]
    fn test_empty_input_with_huge_result_count() {
        let state = create(json!({"input": [], "result_count": i64::MAX}));
        assert!(result(&state).is_empty());
    }
}
