//! Resource kinds and their handlers.
//!
//! The provider serves a closed set of resource types. [`ResourceKind`] names
//! them and [`ResourceKind::handler`] is the single dispatch table mapping a
//! kind to its [`ResourceHandler`]. Handlers read and write typed models that
//! are (de)serialized from the JSON state exchanged with the host.

mod bytes;
mod id;
mod integer;
mod password;
mod pet;
mod shuffle;
mod string;
mod uuid;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ProviderError;
use crate::schema::{Diagnostic, Schema};

/// Every resource type served by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    /// `random_bytes`
    Bytes,
    /// `random_id`
    Id,
    /// `random_integer`
    Integer,
    /// `random_password`
    Password,
    /// `random_pet`
    Pet,
    /// `random_shuffle`
    Shuffle,
    /// `random_string`
    String,
    /// `random_uuid`
    Uuid,
    /// `random_uuid4`
    Uuid4,
    /// `random_uuid7`
    Uuid7,
}

impl ResourceKind {
    /// All kinds, in type-name order.
    pub const ALL: [ResourceKind; 10] = [
        Self::Bytes,
        Self::Id,
        Self::Integer,
        Self::Password,
        Self::Pet,
        Self::Shuffle,
        Self::String,
        Self::Uuid,
        Self::Uuid4,
        Self::Uuid7,
    ];

    /// The resource type name used in configuration.
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Bytes => "random_bytes",
            Self::Id => "random_id",
            Self::Integer => "random_integer",
            Self::Password => "random_password",
            Self::Pet => "random_pet",
            Self::Shuffle => "random_shuffle",
            Self::String => "random_string",
            Self::Uuid => "random_uuid",
            Self::Uuid4 => "random_uuid4",
            Self::Uuid7 => "random_uuid7",
        }
    }

    /// Look up a kind by its type name.
    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.type_name() == name)
    }

    /// The handler implementing this kind.
    pub fn handler(self) -> &'static dyn ResourceHandler {
        match self {
            Self::Bytes => &bytes::BytesResource,
            Self::Id => &id::IdResource,
            Self::Integer => &integer::IntegerResource,
            Self::Password => &password::PasswordResource,
            Self::Pet => &pet::PetResource,
            Self::Shuffle => &shuffle::ShuffleResource,
            Self::String => &string::StringResource,
            Self::Uuid => &uuid::RANDOM_UUID,
            Self::Uuid4 => &uuid::RANDOM_UUID4,
            Self::Uuid7 => &uuid::RANDOM_UUID7,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

impl FromStr for ResourceKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_type_name(s).ok_or_else(|| ProviderError::UnknownResource(s.to_string()))
    }
}

/// Behaviour of a single resource type.
///
/// Only `kind`, `schema` and `create` are required; the defaults cover
/// resources whose values never change in place and that cannot be imported.
pub trait ResourceHandler: Send + Sync {
    /// The kind this handler implements.
    fn kind(&self) -> ResourceKind;

    /// The resource schema, including its version.
    fn schema(&self) -> Schema;

    /// Checks that span several attributes, run after schema validation.
    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let _ = config;
        Vec::new()
    }

    /// Adjust the proposed values before the plan is resolved.
    fn modify_plan(&self, config: &Value, planned: &mut Map<String, Value>) -> Vec<Diagnostic> {
        let _ = (config, planned);
        Vec::new()
    }

    /// Generate the computed values for a new resource.
    fn create(&self, planned: Value) -> Result<Value, ProviderError>;

    /// Refresh a resource. Random values live only in state.
    fn read(&self, state: Value) -> Result<Value, ProviderError> {
        Ok(state)
    }

    /// Apply an in-place update, keeping every computed value.
    fn update(&self, prior: Value, planned: Value) -> Result<Value, ProviderError> {
        Ok(carry_computed(&self.schema(), &prior, planned))
    }

    /// Build state from an import ID.
    fn import(&self, id: &str) -> Result<Value, ProviderError> {
        let _ = id;
        Err(ProviderError::ImportUnsupported(self.kind().to_string()))
    }

    /// Upgrade state written by an older schema version.
    fn upgrade_state(&self, version: i64, state: Value) -> Result<Value, ProviderError> {
        let current = self.schema().version;
        if version == current {
            Ok(state)
        } else {
            Err(unsupported_version(self.kind(), version, current))
        }
    }
}

/// The `keepers` attribute as stored in state.
pub(crate) type Keepers = Option<BTreeMap<String, Option<String>>>;

pub(crate) fn from_state<T: DeserializeOwned>(value: Value) -> Result<T, ProviderError> {
    Ok(serde_json::from_value(value)?)
}

pub(crate) fn to_state<T: Serialize>(model: &T) -> Result<Value, ProviderError> {
    Ok(serde_json::to_value(model)?)
}

/// Copy computed values that the plan left unknown from the prior state.
pub(crate) fn carry_computed(schema: &Schema, prior: &Value, planned: Value) -> Value {
    let Value::Object(mut planned) = planned else {
        return planned;
    };
    for (name, attr) in &schema.attributes {
        if !attr.flags.computed {
            continue;
        }
        let slot = planned.entry(name.clone()).or_insert(Value::Null);
        if slot.is_null() {
            if let Some(value) = prior.get(name) {
                *slot = value.clone();
            }
        }
    }
    Value::Object(planned)
}

/// Convert a validated positive count into a `usize`.
pub(crate) fn count(kind: ResourceKind, name: &str, value: i64) -> Result<usize, ProviderError> {
    usize::try_from(value).map_err(|_| {
        ProviderError::Validation(format!("{}: {} must not be negative, got: {}", kind, name, value))
    })
}

pub(crate) fn state_object(
    kind: ResourceKind,
    state: Value,
) -> Result<Map<String, Value>, ProviderError> {
    match state {
        Value::Object(map) => Ok(map),
        other => Err(ProviderError::StateUpgrade(format!(
            "{}: expected an object, got: {}",
            kind, other
        ))),
    }
}

/// Import IDs that would produce a zero length.
pub(crate) fn empty_import(kind: ResourceKind) -> ProviderError {
    ProviderError::Import(format!("{}: the import ID must not be empty", kind))
}

pub(crate) fn unsupported_version(kind: ResourceKind, version: i64, current: i64) -> ProviderError {
    ProviderError::StateUpgrade(format!(
        "{}: unsupported state version {} (current version is {})",
        kind, version, current
    ))
}
