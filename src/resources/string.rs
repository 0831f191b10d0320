//! `random_string`, plus the character-set model shared with `random_password`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::{count, empty_import, from_state, state_object, to_state, unsupported_version, Keepers};
use super::{ResourceHandler, ResourceKind};
use crate::error::ProviderError;
use crate::random::{self, StringSpec};
use crate::schema::{Attribute, Diagnostic, PlanModifier, Schema, Validator};
use crate::validation::as_int64;

const CLASS_FLAGS: [&str; 4] = ["upper", "lower", "numeric", "special"];
const MINIMUMS: [&str; 4] = ["min_upper", "min_lower", "min_numeric", "min_special"];

/// Configuration shared by `random_string` and `random_password`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Charset {
    #[serde(default)]
    pub keepers: Keepers,
    pub length: i64,
    #[serde(default)]
    pub upper: Option<bool>,
    #[serde(default)]
    pub lower: Option<bool>,
    #[serde(default)]
    pub numeric: Option<bool>,
    #[serde(default)]
    pub number: Option<bool>,
    #[serde(default)]
    pub special: Option<bool>,
    #[serde(default)]
    pub min_upper: Option<i64>,
    #[serde(default)]
    pub min_lower: Option<i64>,
    #[serde(default)]
    pub min_numeric: Option<i64>,
    #[serde(default)]
    pub min_special: Option<i64>,
    #[serde(default)]
    pub override_special: Option<String>,
}

impl Charset {
    /// Fill unset flags and minimums with their defaults.
    pub fn resolve(&mut self) {
        let numeric = self.numeric.or(self.number).unwrap_or(true);
        self.numeric = Some(numeric);
        self.number = Some(self.number.unwrap_or(numeric));
        for flag in [&mut self.upper, &mut self.lower, &mut self.special] {
            flag.get_or_insert(true);
        }
        for min in [
            &mut self.min_upper,
            &mut self.min_lower,
            &mut self.min_numeric,
            &mut self.min_special,
        ] {
            min.get_or_insert(0);
        }
    }

    /// Settings for an imported value of the given length.
    pub fn imported(length: usize) -> Self {
        let mut charset = Self {
            length: i64::try_from(length).unwrap_or(i64::MAX),
            ..Default::default()
        };
        charset.resolve();
        charset
    }

    pub fn to_spec(&self, kind: ResourceKind) -> Result<StringSpec, ProviderError> {
        let min = |name: &str, value: Option<i64>| count(kind, name, value.unwrap_or(0));
        Ok(StringSpec {
            length: count(kind, "length", self.length)?,
            upper: self.upper.unwrap_or(true),
            lower: self.lower.unwrap_or(true),
            numeric: self.numeric.or(self.number).unwrap_or(true),
            special: self.special.unwrap_or(true),
            min_upper: min("min_upper", self.min_upper)?,
            min_lower: min("min_lower", self.min_lower)?,
            min_numeric: min("min_numeric", self.min_numeric)?,
            min_special: min("min_special", self.min_special)?,
            override_special: self.override_special.clone(),
        })
    }

    /// Generate a value with a fresh secure generator.
    pub fn generate(&self, kind: ResourceKind) -> Result<String, ProviderError> {
        let spec = self.to_spec(kind)?;
        let mut rng = random::secure_rng(kind.type_name())?;
        random::generate_string(&mut rng, &spec)
    }
}

/// Schema attributes shared by `random_string` and `random_password`.
pub(crate) fn charset_schema(version: i64) -> Schema {
    let class_flag = |description: &str| {
        Attribute::optional_computed_bool()
            .with_default(Value::Bool(true))
            .requires_replace()
            .with_description(description)
    };
    let minimum = |description: &str| {
        Attribute::optional_computed_int64()
            .with_default(Value::from(0))
            .requires_replace()
            .with_validator(Validator::AtLeast(0))
            .with_description(description)
    };

    Schema::new(version)
        .with_attribute("keepers", Attribute::keepers())
        .with_attribute(
            "length",
            Attribute::required_int64()
                .requires_replace()
                .with_validator(Validator::AtLeast(1))
                .with_validator(Validator::AtLeastSumOf(
                    MINIMUMS.iter().map(|m| m.to_string()).collect(),
                ))
                .with_description(
                    "The length of the string desired. The minimum value for length is 1 and, \
                     length must also be >= (`min_upper` + `min_lower` + `min_numeric` + `min_special`).",
                ),
        )
        .with_attribute("upper", class_flag("Include uppercase alphabet characters in the result."))
        .with_attribute("lower", class_flag("Include lowercase alphabet characters in the result."))
        .with_attribute("numeric", class_flag("Include numeric characters in the result."))
        .with_attribute(
            "number",
            class_flag("Include numeric characters in the result.").deprecated(
                "Use `numeric` instead. Both attributes are kept in sync when only one is set.",
            ),
        )
        .with_attribute("special", class_flag("Include special characters in the result."))
        .with_attribute("min_upper", minimum("Minimum number of uppercase alphabet characters in the result."))
        .with_attribute("min_lower", minimum("Minimum number of lowercase alphabet characters in the result."))
        .with_attribute("min_numeric", minimum("Minimum number of numeric characters in the result."))
        .with_attribute("min_special", minimum("Minimum number of special characters in the result."))
        .with_attribute(
            "override_special",
            Attribute::optional_string()
                .with_plan_modifier(PlanModifier::RequiresReplaceNullIsEmpty)
                .with_description(
                    "Supply your own list of special characters to use for string generation. \
                     This overrides the default character list in the special argument.",
                ),
        )
}

fn configured<'a>(config: &'a Value, name: &str) -> Option<&'a Value> {
    config.get(name).filter(|v| !v.is_null())
}

/// Cross-attribute checks shared by both string resources.
pub(crate) fn validate_charset(config: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    if let (Some(number), Some(numeric)) = (configured(config, "number"), configured(config, "numeric")) {
        if number != numeric {
            diagnostics.push(conflicting_number_numeric());
        }
    }

    let enabled = |name: &str| configured(config, name).and_then(Value::as_bool).unwrap_or(true);
    let numeric_enabled = match configured(config, "numeric").or_else(|| configured(config, "number")) {
        Some(value) => value.as_bool().unwrap_or(true),
        None => true,
    };
    let any_enabled = CLASS_FLAGS
        .iter()
        .any(|flag| if *flag == "numeric" { numeric_enabled } else { enabled(*flag) });

    let length = configured(config, "length").and_then(as_int64);
    let minimums: i64 = MINIMUMS
        .iter()
        .filter_map(|name| configured(config, name).and_then(as_int64))
        .filter(|n| *n > 0)
        .fold(0, i64::saturating_add);
    if let Some(length) = length {
        if !any_enabled && length > minimums {
            diagnostics.push(
                Diagnostic::error("No character classes enabled")
                    .with_detail(format!(
                        "At least one of upper, lower, numeric or special must be true to generate \
                         the {} characters not covered by the minimums.",
                        length - minimums
                    ))
                    .with_attribute("length"),
            );
        }
    }

    diagnostics
}

fn conflicting_number_numeric() -> Diagnostic {
    Diagnostic::error("Conflicting attribute values")
        .with_detail("Number and numeric are both configured with different values. Use numeric only.")
        .with_attribute("numeric")
}

/// Keep `number` and `numeric` in sync when only one is configured.
pub(crate) fn sync_number_numeric(config: &Value, planned: &mut Map<String, Value>) -> Vec<Diagnostic> {
    match (configured(config, "number"), configured(config, "numeric")) {
        (Some(number), Some(numeric)) if number != numeric => vec![conflicting_number_numeric()],
        (Some(number), None) => {
            planned.insert("numeric".to_string(), number.clone());
            Vec::new()
        },
        (None, Some(numeric)) => {
            planned.insert("number".to_string(), numeric.clone());
            Vec::new()
        },
        _ => Vec::new(),
    }
}

/// Copy `number` into `numeric` for states written before `numeric` existed.
pub(crate) fn add_numeric(state: &mut Map<String, Value>) {
    let number = state.get("number").and_then(Value::as_bool).unwrap_or(true);
    state.insert("number".to_string(), Value::Bool(number));
    state.insert("numeric".to_string(), Value::Bool(number));
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StringModel {
    #[serde(flatten)]
    charset: Charset,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

/// `random_string`: a random string of configurable character classes.
pub struct StringResource;

impl ResourceHandler for StringResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::String
    }

    fn schema(&self) -> Schema {
        charset_schema(2)
            .with_description(
                "Generates a random permutation of alphanumeric characters and optionally special characters.",
            )
            .with_attribute(
                "result",
                Attribute::computed_string()
                    .use_state_for_unknown()
                    .with_description("The generated random string."),
            )
            .with_attribute(
                "id",
                Attribute::computed_string()
                    .use_state_for_unknown()
                    .with_description("The generated random string."),
            )
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        validate_charset(config)
    }

    fn modify_plan(&self, config: &Value, planned: &mut Map<String, Value>) -> Vec<Diagnostic> {
        sync_number_numeric(config, planned)
    }

    fn create(&self, planned: Value) -> Result<Value, ProviderError> {
        let mut model: StringModel = from_state(planned)?;
        model.charset.resolve();
        let result = model.charset.generate(self.kind())?;
        debug!(length = model.charset.length, "Generated random string");
        model.id = Some(result.clone());
        model.result = Some(result);
        to_state(&model)
    }

    fn import(&self, id: &str) -> Result<Value, ProviderError> {
        if id.is_empty() {
            return Err(empty_import(self.kind()));
        }
        to_state(&StringModel {
            charset: Charset::imported(id.chars().count()),
            result: Some(id.to_string()),
            id: Some(id.to_string()),
        })
    }

    fn upgrade_state(&self, version: i64, state: Value) -> Result<Value, ProviderError> {
        match version {
            2 => Ok(state),
            0 | 1 => {
                let mut state = state_object(self.kind(), state)?;
                add_numeric(&mut state);
                Ok(Value::Object(state))
            },
            _ => Err(unsupported_version(self.kind(), version, 2)),
        }
    }
}
