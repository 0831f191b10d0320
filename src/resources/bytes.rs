//! `random_bytes`: random bytes exposed as base64 and hex.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{count, empty_import, from_state, to_state, Keepers, ResourceHandler, ResourceKind};
use crate::error::ProviderError;
use crate::random;
use crate::schema::{Attribute, Schema, Validator};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BytesModel {
    #[serde(default)]
    keepers: Keepers,
    length: i64,
    #[serde(default)]
    result_base64: Option<String>,
    #[serde(default)]
    result_hex: Option<String>,
}

impl BytesModel {
    fn encode(keepers: Keepers, bytes: &[u8]) -> Self {
        Self {
            keepers,
            length: i64::try_from(bytes.len()).unwrap_or(i64::MAX),
            result_base64: Some(STANDARD.encode(bytes)),
            result_hex: Some(hex::encode(bytes)),
        }
    }
}

/// `random_bytes`
pub struct BytesResource;

impl ResourceHandler for BytesResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Bytes
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description(
                "The resource random_bytes generates random bytes that are intended to be used \
                 as a secret, or key.",
            )
            .with_attribute("keepers", Attribute::keepers())
            .with_attribute(
                "length",
                Attribute::required_int64()
                    .requires_replace()
                    .with_validator(Validator::AtLeast(1))
                    .with_description("The number of bytes requested. The minimum value for length is 1."),
            )
            .with_attribute(
                "result_base64",
                Attribute::computed_string()
                    .sensitive()
                    .use_state_for_unknown()
                    .with_description("The generated bytes presented in base64 string format."),
            )
            .with_attribute(
                "result_hex",
                Attribute::computed_string()
                    .sensitive()
                    .use_state_for_unknown()
                    .with_description("The generated bytes presented in lowercase hexadecimal string format."),
            )
    }

    fn create(&self, planned: Value) -> Result<Value, ProviderError> {
        let model: BytesModel = from_state(planned)?;
        let length = count(self.kind(), "length", model.length)?;
        let mut rng = random::secure_rng(self.kind().type_name())?;
        let bytes = random::random_bytes(&mut rng, length);
        debug!(length, "Generated random bytes");
        to_state(&BytesModel::encode(model.keepers, &bytes))
    }

    fn import(&self, id: &str) -> Result<Value, ProviderError> {
        let bytes = STANDARD
            .decode(id)
            .map_err(|e| ProviderError::Import(format!("Error decoding base64 import ID: {}", e)))?;
        if bytes.is_empty() {
            return Err(empty_import(self.kind()));
        }
        to_state(&BytesModel::encode(None, &bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_encodings_agree() {
        let state = BytesResource
            .create(json!({"length": 32, "result_base64": null, "result_hex": null}))
            .unwrap();
        let b64 = STANDARD.decode(state["result_base64"].as_str().unwrap()).unwrap();
        let hex = hex::decode(state["result_hex"].as_str().unwrap()).unwrap();
        assert_eq!(b64.len(), 32);
        assert_eq!(b64, hex);
        assert_eq!(state["length"], 32);
    }

    #[test]
    fn test_outputs_are_sensitive() {
        let schema = BytesResource.schema();
        assert!(schema.attribute("result_base64").unwrap().flags.sensitive);
        assert!(schema.attribute("result_hex").unwrap().flags.sensitive);
    }

    #[test]
    fn test_import() {
        let state = BytesResource.import("aGVsbG8=").unwrap();
        assert_eq!(state["length"], 5);
        assert_eq!(state["result_hex"], "68656c6c6f");
        assert_eq!(state["result_base64"], "aGVsbG8=");
    }

    #[test]
    fn test_import_invalid_base64() {
        assert!(matches!(BytesResource.import("not base64!"), Err(ProviderError::Import(_))));
    }

    #[test]
    fn test_import_empty() {
        assert!(matches!(BytesResource.import(""), Err(ProviderError::Import(_))));
    }
}
