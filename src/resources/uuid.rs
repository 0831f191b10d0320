//! `random_uuid`, `random_uuid4` and `random_uuid7`.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use ::uuid::{Builder, Uuid};

use super::{from_state, to_state, Keepers, ResourceHandler, ResourceKind};
use crate::error::ProviderError;
use crate::random;
use crate::schema::{Attribute, Schema};

/// Handler for one of the UUID resource kinds.
pub struct UuidResource {
    kind: ResourceKind,
    version: usize,
    /// Import only accepts this version when set.
    strict: bool,
}

/// `random_uuid`: version 4, import accepts any version.
pub const RANDOM_UUID: UuidResource = UuidResource {
    kind: ResourceKind::Uuid,
    version: 4,
    strict: false,
};

/// `random_uuid4`
pub const RANDOM_UUID4: UuidResource = UuidResource {
    kind: ResourceKind::Uuid4,
    version: 4,
    strict: true,
};

/// `random_uuid7`
pub const RANDOM_UUID7: UuidResource = UuidResource {
    kind: ResourceKind::Uuid7,
    version: 7,
    strict: true,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UuidModel {
    #[serde(default)]
    keepers: Keepers,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

impl UuidModel {
    fn new(keepers: Keepers, uuid: Uuid) -> Self {
        let value = uuid.hyphenated().to_string();
        Self {
            keepers,
            result: Some(value.clone()),
            id: Some(value),
        }
    }
}

impl UuidResource {
    fn generate(&self) -> Result<Uuid, ProviderError> {
        let mut rng = random::secure_rng(self.kind.type_name())?;
        if self.version == 7 {
            let millis = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_err(|e| ProviderError::generation(self.kind.type_name(), e))?
                .as_millis();
            let mut bytes = [0u8; 10];
            rng.fill_bytes(&mut bytes);
            let millis = u64::try_from(millis).unwrap_or(u64::MAX);
            Ok(Builder::from_unix_timestamp_millis(millis, &bytes).into_uuid())
        } else {
            let mut bytes = [0u8; 16];
            rng.fill_bytes(&mut bytes);
            Ok(Builder::from_random_bytes(bytes).into_uuid())
        }
    }
}

impl ResourceHandler for UuidResource {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn schema(&self) -> Schema {
        let description = match self.kind {
            ResourceKind::Uuid7 => "Generates a random version 7 UUID (time-ordered).",
            ResourceKind::Uuid4 => "Generates a random version 4 UUID.",
            _ => "Generates a random UUID string. Version 4 UUIDs are generated.",
        };
        Schema::v0()
            .with_description(description)
            .with_attribute("keepers", Attribute::keepers())
            .with_attribute(
                "result",
                Attribute::computed_string()
                    .use_state_for_unknown()
                    .with_description("The generated uuid presented in string format."),
            )
            .with_attribute(
                "id",
                Attribute::computed_string()
                    .use_state_for_unknown()
                    .with_description("The generated uuid presented in string format."),
            )
    }

    fn create(&self, planned: Value) -> Result<Value, ProviderError> {
        let model: UuidModel = from_state(planned)?;
        let uuid = self.generate()?;
        debug!(version = self.version, "Generated random uuid");
        to_state(&UuidModel::new(model.keepers, uuid))
    }

    fn import(&self, id: &str) -> Result<Value, ProviderError> {
        let uuid = Uuid::parse_str(id)
            .map_err(|e| ProviderError::Import(format!("Invalid UUID {:?}: {}", id, e)))?;
        if self.strict && uuid.get_version_num() != self.version {
            return Err(ProviderError::Import(format!(
                "{:?} is a version {} UUID, expected version {}",
                id,
                uuid.get_version_num(),
                self.version
            )));
        }
        to_state(&UuidModel::new(None, uuid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create(handler: &UuidResource) -> Uuid {
        let state = handler.create(json!({"keepers": null, "result": null, "id": null})).unwrap();
        assert_eq!(state["id"], state["result"]);
        let result = state["result"].as_str().unwrap();
        assert_eq!(result.len(), 36);
        assert_eq!(result, result.to_lowercase());
        Uuid::parse_str(result).unwrap()
    }

    #[test]
    fn test_versions() {
        assert_eq!(create(&RANDOM_UUID).get_version_num(), 4);
        assert_eq!(create(&RANDOM_UUID4).get_version_num(), 4);
        assert_eq!(create(&RANDOM_UUID7).get_version_num(), 7);
    }

    #[test]
    fn test_uuid7_is_time_ordered() {
        let first = create(&RANDOM_UUID7);
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = create(&RANDOM_UUID7);
        assert!(first < second);
    }

    #[test]
    fn test_keepers_preserved() {
        let state = RANDOM_UUID
            .create(json!({"keepers": {"a": "1"}, "result": null, "id": null}))
            .unwrap();
        assert_eq!(state["keepers"], json!({"a": "1"}));
    }

    #[test]
    fn test_import_normalises_case() {
        let state = RANDOM_UUID.import("6B0F8E7D-2C1A-4F3B-9D4E-5A6B7C8D9E0F").unwrap();
        assert_eq!(state["result"], "6b0f8e7d-2c1a-4f3b-9d4e-5a6b7c8d9e0f");
        assert_eq!(state["id"], state["result"]);
    }

    #[test]
    fn test_import_checks_version() {
        let v4 = "6b0f8e7d-2c1a-4f3b-9d4e-5a6b7c8d9e0f";
        let v7 = "01890a5d-ac96-774b-bcce-b302099a8057";
        assert!(RANDOM_UUID4.import(v4).is_ok());
        assert!(RANDOM_UUID7.import(v7).is_ok());
        assert!(matches!(RANDOM_UUID4.import(v7), Err(ProviderError::Import(_))));
        assert!(matches!(RANDOM_UUID7.import(v4), Err(ProviderError::Import(_))));
        // random_uuid accepts any version
        assert!(RANDOM_UUID.import(v7).is_ok());
    }

    #[test]
    fn test_import_rejects_garbage() {
        assert!(matches!(RANDOM_UUID.import("not-a-uuid"), Err(ProviderError::Import(_))));
    }
}
