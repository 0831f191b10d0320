//! Schema-driven planning.
//!
//! Planning happens in two steps so resources can adjust values in between:
//!
//! 1. [`propose`] builds the planned values from configuration and schema
//!    defaults, leaving computed values unknown (`null`).
//! 2. [`resolve`] compares the planned values with prior state, decides
//!    whether the plan modifiers force replacement, carries computed values
//!    forward when they survive, and records the attribute changes.

use serde_json::{Map, Value};

use crate::schema::{Attribute, AttributeType, PlanModifier, Schema};
use crate::types::{AttributeChange, PlanResult};
use crate::validation::as_int64;

/// Build the planned values for a configuration.
///
/// Configured values win, then schema defaults. Computed-only attributes
/// start out unknown.
pub fn propose(schema: &Schema, config: &Value) -> Map<String, Value> {
    schema
        .attributes
        .iter()
        .map(|(name, attr)| {
            let value = if attr.flags.is_computed_only() {
                Value::Null
            } else {
                match config.get(name) {
                    Some(v) if !v.is_null() => normalize(&attr.attr_type, v),
                    _ => attr.default.clone().unwrap_or(Value::Null),
                }
            };
            (name.clone(), value)
        })
        .collect()
}

/// Integral floats become integers so typed models can read them.
fn normalize(attr_type: &AttributeType, value: &Value) -> Value {
    match (attr_type, as_int64(value)) {
        (AttributeType::Int64, Some(n)) => Value::from(n),
        _ => value.clone(),
    }
}

/// Finish a plan against the prior state (`None` when creating).
pub fn resolve(schema: &Schema, prior: Option<&Value>, mut planned: Map<String, Value>) -> PlanResult {
    let Some(prior) = prior.filter(|p| !p.is_null()) else {
        let changes = schema
            .attributes
            .iter()
            .filter_map(|(name, attr)| match planned.get(name) {
                Some(after) if !after.is_null() => {
                    Some(AttributeChange::added(name.clone(), after.clone()))
                },
                _ if attr.flags.computed => Some(AttributeChange::unknown(name.clone(), None)),
                _ => None,
            })
            .collect();
        return PlanResult::with_changes(Value::Object(planned), changes, false);
    };

    let requires_replace = schema.attributes.iter().any(|(name, attr)| {
        if attr.flags.is_computed_only() {
            return false;
        }
        let before = prior.get(name).unwrap_or(&Value::Null);
        let after = planned.get(name).unwrap_or(&Value::Null);
        attr.plan_modifiers
            .iter()
            .any(|modifier| forces_replacement(*modifier, before, after))
    });

    for (name, attr) in &schema.attributes {
        let slot = planned.entry(name.clone()).or_insert(Value::Null);
        if slot.is_null() && attr.flags.computed && !requires_replace && attr.uses_state_for_unknown() {
            *slot = prior.get(name).cloned().unwrap_or(Value::Null);
        }
    }

    let changes = diff(schema, prior, &planned);
    PlanResult::with_changes(Value::Object(planned), changes, requires_replace)
}

/// Plan the destruction of a resource.
pub fn destroy(schema: &Schema, prior: &Value) -> PlanResult {
    let changes = schema
        .attributes
        .keys()
        .filter_map(|name| match prior.get(name) {
            Some(before) if !before.is_null() => {
                Some(AttributeChange::removed(name.clone(), before.clone()))
            },
            _ => None,
        })
        .collect();
    PlanResult::with_changes(Value::Null, changes, false)
}

/// Whether a single plan modifier forces replacement for this value change.
pub fn forces_replacement(modifier: PlanModifier, before: &Value, after: &Value) -> bool {
    match modifier {
        PlanModifier::RequiresReplace => before != after,
        PlanModifier::RequiresReplaceNullIsEmpty => empty_as_null(before) != empty_as_null(after),
        PlanModifier::RequiresReplaceIfValuesNotNull => keepers_replace(before, after),
        PlanModifier::UseStateForUnknown => false,
    }
}

fn keepers_replace(before: &Value, after: &Value) -> bool {
    let empty = Map::new();
    let prior = before.as_object().unwrap_or(&empty);
    let planned = after.as_object().unwrap_or(&empty);

    // A key gaining or changing a non-null value
    let changed = planned
        .iter()
        .filter(|(_, value)| !value.is_null())
        .any(|(key, value)| prior.get(key) != Some(value));

    // A key holding a non-null value disappearing
    let removed = prior
        .iter()
        .filter(|(_, value)| !value.is_null())
        .any(|(key, _)| !planned.contains_key(key));

    changed || removed
}

fn empty_as_null(value: &Value) -> &Value {
    match value {
        Value::String(s) if s.is_empty() => &Value::Null,
        other => other,
    }
}

fn same_value(attr: &Attribute, before: &Value, after: &Value) -> bool {
    if attr.plan_modifiers.contains(&PlanModifier::RequiresReplaceNullIsEmpty) {
        return empty_as_null(before) == empty_as_null(after);
    }
    if matches!(attr.attr_type, AttributeType::Map(_)) {
        let is_empty = |v: &Value| v.is_null() || v.as_object().is_some_and(Map::is_empty);
        if is_empty(before) && is_empty(after) {
            return true;
        }
    }
    before == after
}

fn diff(schema: &Schema, prior: &Value, planned: &Map<String, Value>) -> Vec<AttributeChange> {
    schema
        .attributes
        .iter()
        .filter_map(|(name, attr)| {
            let before = prior.get(name).cloned().unwrap_or(Value::Null);
            let after = planned.get(name).cloned().unwrap_or(Value::Null);
            if same_value(attr, &before, &after) {
                return None;
            }
            Some(match (before.is_null(), after.is_null()) {
                (_, true) if attr.flags.computed => AttributeChange::unknown(name.clone(), Some(before)),
                (_, true) => AttributeChange::removed(name.clone(), before),
                (true, false) => AttributeChange::added(name.clone(), after),
                (false, false) => AttributeChange::modified(name.clone(), before, after),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::v0()
            .with_attribute("keepers", Attribute::keepers())
            .with_attribute("length", Attribute::required_int64().requires_replace())
            .with_attribute(
                "upper",
                Attribute::optional_computed_bool()
                    .with_default(json!(true))
                    .requires_replace(),
            )
            .with_attribute(
                "override_special",
                Attribute::optional_string()
                    .with_plan_modifier(PlanModifier::RequiresReplaceNullIsEmpty),
            )
            .with_attribute("result", Attribute::computed_string().use_state_for_unknown())
    }

    fn prior() -> Value {
        json!({
            "keepers": {"a": "1"},
            "length": 8,
            "upper": true,
            "override_special": null,
            "result": "abcdefgh"
        })
    }

    fn plan(prior: Option<&Value>, config: Value) -> PlanResult {
        let schema = schema();
        let planned = propose(&schema, &config);
        resolve(&schema, prior, planned)
    }

    #[test]
    fn test_propose_applies_defaults() {
        let planned = propose(&schema(), &json!({"length": 8}));
        assert_eq!(planned["length"], json!(8));
        assert_eq!(planned["upper"], json!(true));
        assert_eq!(planned["result"], Value::Null);
        assert_eq!(planned["keepers"], Value::Null);
    }

    #[test]
    fn test_propose_normalizes_integral_floats() {
        let planned = propose(&schema(), &json!({"length": 8.0}));
        assert_eq!(planned["length"], json!(8));
        assert!(planned["length"].is_i64());
    }

    #[test]
    fn test_propose_ignores_configured_computed_values() {
        let planned = propose(&schema(), &json!({"length": 8, "result": "nope"}));
        assert_eq!(planned["result"], Value::Null);
    }

    #[test]
    fn test_create_plan_marks_computed_unknown() {
        let result = plan(None, json!({"length": 8}));
        assert!(!result.requires_replace);
        assert_eq!(result.change("length").unwrap().after, Some(json!(8)));
        assert!(result.change("result").unwrap().is_unknown());
        assert!(result.change("keepers").is_none());
    }

    #[test]
    fn test_unchanged_config_keeps_computed_values() {
        let prior = prior();
        let result = plan(Some(&prior), json!({"keepers": {"a": "1"}, "length": 8}));
        assert!(!result.requires_replace);
        assert!(result.changes.is_empty());
        assert_eq!(result.planned_state["result"], "abcdefgh");
    }

    #[test]
    fn test_requires_replace_attribute_change() {
        let prior = prior();
        let result = plan(Some(&prior), json!({"keepers": {"a": "1"}, "length": 12}));
        assert!(result.requires_replace);
        assert_eq!(result.planned_state["result"], Value::Null);
        assert!(result.change("result").unwrap().is_unknown());
        assert_eq!(
            result.change("length").unwrap().before,
            Some(json!(8))
        );
    }

    #[test]
    fn test_keeper_value_change_replaces() {
        let prior = prior();
        let result = plan(Some(&prior), json!({"keepers": {"a": "2"}, "length": 8}));
        assert!(result.requires_replace);
    }

    #[test]
    fn test_keeper_value_to_null_updates_in_place() {
        let prior = prior();
        let result = plan(Some(&prior), json!({"keepers": {"a": null}, "length": 8}));
        assert!(!result.requires_replace);
        assert_eq!(result.planned_state["result"], "abcdefgh");
        assert!(result.change("keepers").is_some());
    }

    #[test]
    fn test_keeper_null_key_added_updates_in_place() {
        let prior = prior();
        let result = plan(
            Some(&prior),
            json!({"keepers": {"a": "1", "b": null}, "length": 8}),
        );
        assert!(!result.requires_replace);
    }

    #[test]
    fn test_keeper_new_key_replaces() {
        let prior = prior();
        let result = plan(
            Some(&prior),
            json!({"keepers": {"a": "1", "b": "x"}, "length": 8}),
        );
        assert!(result.requires_replace);
    }

    #[test]
    fn test_keepers_removed_replaces() {
        let prior = prior();
        let result = plan(Some(&prior), json!({"length": 8}));
        assert!(result.requires_replace);
    }

    #[test]
    fn test_keepers_null_and_empty_equivalent() {
        assert!(!keepers_replace(&Value::Null, &json!({})));
        assert!(!keepers_replace(&json!({}), &Value::Null));

        let mut prior = prior();
        prior["keepers"] = Value::Null;
        let result = plan(Some(&prior), json!({"keepers": {}, "length": 8}));
        assert!(!result.requires_replace);
        assert!(result.changes.is_empty());
    }

    #[test]
    fn test_override_special_empty_equals_null() {
        let prior = prior();
        let result = plan(
            Some(&prior),
            json!({"keepers": {"a": "1"}, "length": 8, "override_special": ""}),
        );
        assert!(!result.requires_replace);
        assert!(result.changes.is_empty());

        let result = plan(
            Some(&prior),
            json!({"keepers": {"a": "1"}, "length": 8, "override_special": "!"}),
        );
        assert!(result.requires_replace);
    }

    #[test]
    fn test_destroy_plan() {
        let result = destroy(&schema(), &prior());
        assert_eq!(result.planned_state, Value::Null);
        assert!(result.change("result").unwrap().after.is_none());
        assert!(result.change("override_special").is_none());
    }
}
