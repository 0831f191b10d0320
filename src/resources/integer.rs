//! `random_integer`: a random integer in an inclusive range.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{from_state, to_state, Keepers, ResourceHandler, ResourceKind};
use crate::error::ProviderError;
use crate::random;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::validation::as_int64;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IntegerModel {
    #[serde(default)]
    keepers: Keepers,
    min: i64,
    max: i64,
    #[serde(default)]
    seed: Option<String>,
    #[serde(default)]
    result: Option<i64>,
    #[serde(default)]
    id: Option<String>,
}

/// `random_integer`
pub struct IntegerResource;

impl ResourceHandler for IntegerResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Integer
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description(
                "The resource random_integer generates random values from a given range, described \
                 by the min and max attributes of a given resource.",
            )
            .with_attribute("keepers", Attribute::keepers())
            .with_attribute(
                "min",
                Attribute::required_int64()
                    .requires_replace()
                    .with_description("The minimum inclusive value of the range."),
            )
            .with_attribute(
                "max",
                Attribute::required_int64()
                    .requires_replace()
                    .with_description("The maximum inclusive value of the range."),
            )
            .with_attribute(
                "seed",
                Attribute::optional_string()
                    .requires_replace()
                    .with_description("A custom seed to always produce the same value."),
            )
            .with_attribute(
                "result",
                Attribute::computed_int64()
                    .use_state_for_unknown()
                    .with_description("The random integer result."),
            )
            .with_attribute(
                "id",
                Attribute::computed_string()
                    .use_state_for_unknown()
                    .with_description("The string representation of the integer result."),
            )
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let bound = |name: &str| config.get(name).and_then(as_int64);
        match (bound("min"), bound("max")) {
            (Some(min), Some(max)) if max < min => vec![Diagnostic::error("Invalid min/max values")
                .with_detail(format!(
                    "The minimum (min) value needs to be smaller than or equal to maximum (max) value. \
                     min: {}, max: {}",
                    min, max
                ))
                .with_attribute("max")],
            _ => Vec::new(),
        }
    }

    fn create(&self, planned: Value) -> Result<Value, ProviderError> {
        let mut model: IntegerModel = from_state(planned)?;
        let mut rng = random::rng_for(self.kind().type_name(), model.seed.as_deref())?;
        let result = random::int_in_range(&mut rng, model.min, model.max)?;
        debug!(seeded = model.seed.is_some(), "Generated random integer");
        model.result = Some(result);
        model.id = Some(result.to_string());
        to_state(&model)
    }

    fn import(&self, id: &str) -> Result<Value, ProviderError> {
        let parts: Vec<&str> = id.split(',').collect();
        if !(3..=4).contains(&parts.len()) {
            return Err(ProviderError::Import(format!(
                "Invalid import ID {:?}: expected \"result,min,max\" or \"result,min,max,seed\"",
                id
            )));
        }
        let parse = |name: &str, value: &str| {
            value.trim().parse::<i64>().map_err(|e| {
                ProviderError::Import(format!("Invalid {} {:?} in import ID: {}", name, value, e))
            })
        };
        let result = parse("result", parts[0])?;
        to_state(&IntegerModel {
            keepers: None,
            min: parse("min", parts[1])?,
            max: parse("max", parts[2])?,
            seed: parts.get(3).map(|s| s.to_string()),
            result: Some(result),
            id: Some(result.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create(config: Value) -> Value {
        let planned = crate::plan::propose(&IntegerResource.schema(), &config);
        IntegerResource.create(Value::Object(planned)).unwrap()
    }

    #[test]
    fn test_result_in_range() {
        for _ in 0..20 {
            let state = create(json!({"min": 1, "max": 3}));
            let result = state["result"].as_i64().unwrap();
            assert!((1..=3).contains(&result));
            assert_eq!(state["id"], result.to_string());
        }
    }

    #[test]
    fn test_single_value_range() {
        let state = create(json!({"min": -4, "max": -4}));
        assert_eq!(state["result"], -4);
        assert_eq!(state["id"], "-4");
    }

    #[test]
    fn test_seed_is_deterministic() {
        let config = json!({"min": 1, "max": 1_000_000, "seed": "some-seed"});
        let a = create(config.clone());
        let b = create(config);
        assert_eq!(a["result"], b["result"]);
        assert_eq!(a["seed"], "some-seed");
    }

    #[test]
    fn test_max_below_min_is_diagnostic() {
        let diagnostics = IntegerResource.validate(&json!({"min": 10, "max": 1}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("max"));
        assert!(IntegerResource.validate(&json!({"min": 1, "max": 1})).is_empty());
    }

    #[test]
    fn test_import() {
        let state = IntegerResource.import("3,1,5").unwrap();
        assert_eq!(state["result"], 3);
        assert_eq!(state["min"], 1);
        assert_eq!(state["max"], 5);
        assert_eq!(state["seed"], Value::Null);
        assert_eq!(state["id"], "3");

        let state = IntegerResource.import("3,1,5,abc").unwrap();
        assert_eq!(state["seed"], "abc");
    }

    #[test]
    fn test_import_errors() {
        for id in ["3,1", "3,1,5,seed,extra", "x,1,5", "3,1,y"] {
            let err = IntegerResource.import(id).unwrap_err();
            assert!(matches!(err, ProviderError::Import(_)), "{}", id);
        }
    }
}
