//! `random_password`: a sensitive random string with a bcrypt hash.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::string::{add_numeric, charset_schema, sync_number_numeric, validate_charset, Charset};
use super::{empty_import, from_state, state_object, to_state, unsupported_version};
use super::{ResourceHandler, ResourceKind};
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};

/// bcrypt work factor for `bcrypt_hash`.
pub const BCRYPT_COST: u32 = 10;

const VERSION: i64 = 3;
const ID: &str = "none";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PasswordModel {
    #[serde(flatten)]
    charset: Charset,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    bcrypt_hash: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

impl PasswordModel {
    fn with_password(charset: Charset, password: String) -> Result<Self, ProviderError> {
        Ok(Self {
            charset,
            bcrypt_hash: Some(bcrypt::hash(&password, BCRYPT_COST)?),
            result: Some(password),
            id: Some(ID.to_string()),
        })
    }
}

fn hash_matches(password: &str, hash: Option<&str>) -> bool {
    hash.is_some_and(|hash| bcrypt::verify(password, hash).unwrap_or(false))
}

/// `random_password`: like `random_string`, but the result is sensitive.
pub struct PasswordResource;

impl ResourceHandler for PasswordResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Password
    }

    fn schema(&self) -> Schema {
        charset_schema(VERSION)
            .with_description(
                "Identical to random_string with the exception that the result is treated as \
                 sensitive and a bcrypt hash of the result is exposed.",
            )
            .with_attribute(
                "result",
                Attribute::computed_string()
                    .sensitive()
                    .use_state_for_unknown()
                    .with_description("The generated random string."),
            )
            .with_attribute(
                "bcrypt_hash",
                Attribute::computed_string()
                    .sensitive()
                    .use_state_for_unknown()
                    .with_description("A bcrypt hash of the generated random string."),
            )
            .with_attribute(
                "id",
                Attribute::computed_string()
                    .use_state_for_unknown()
                    .with_description("A static value used internally. It is always \"none\"."),
            )
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        validate_charset(config)
    }

    fn modify_plan(&self, config: &Value, planned: &mut Map<String, Value>) -> Vec<Diagnostic> {
        sync_number_numeric(config, planned)
    }

    fn create(&self, planned: Value) -> Result<Value, ProviderError> {
        let mut model: PasswordModel = from_state(planned)?;
        model.charset.resolve();
        let password = model.charset.generate(self.kind())?;
        debug!(length = model.charset.length, "Generated random password");
        to_state(&PasswordModel::with_password(model.charset, password)?)
    }

    fn import(&self, id: &str) -> Result<Value, ProviderError> {
        if id.is_empty() {
            return Err(empty_import(self.kind()));
        }
        let charset = Charset::imported(id.chars().count());
        to_state(&PasswordModel::with_password(charset, id.to_string())?)
    }

    fn upgrade_state(&self, version: i64, state: Value) -> Result<Value, ProviderError> {
        if !(0..=VERSION).contains(&version) {
            return Err(unsupported_version(self.kind(), version, VERSION));
        }
        if version == VERSION {
            return Ok(state);
        }

        let mut state = state_object(self.kind(), state)?;
        let password = state
            .get("result")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                ProviderError::StateUpgrade(format!("{}: prior state has no result", self.kind()))
            })?;

        if version < 1 {
            let hash = bcrypt::hash(&password, BCRYPT_COST)?;
            state.insert("bcrypt_hash".to_string(), Value::String(hash));
        }
        if version < 2 {
            add_numeric(&mut state);
        }
        // Hashes from earlier versions could be computed from a different value
        let hash = state.get("bcrypt_hash").and_then(Value::as_str);
        if !hash_matches(&password, hash) {
            info!(from_version = version, "Recomputing bcrypt hash during state upgrade");
            let hash = bcrypt::hash(&password, BCRYPT_COST)?;
            state.insert("bcrypt_hash".to_string(), Value::String(hash));
        }
        Ok(Value::Object(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan;
    use serde_json::json;

    #[test]
    fn test_create_hashes_result() {
        let config = json!({"length": 20, "override_special": "_%@"});
        let planned = Value::Object(plan::propose(&PasswordResource.schema(), &config));
        let state = PasswordResource.create(planned).unwrap();

        let password = state["result"].as_str().unwrap();
        assert_eq!(password.chars().count(), 20);
        assert_eq!(state["id"], "none");
        let hash = state["bcrypt_hash"].as_str().unwrap();
        assert!(bcrypt::verify(password, hash).unwrap());
    }

    #[test]
    fn test_result_and_hash_are_sensitive() {
        let schema = PasswordResource.schema();
        assert!(schema.attribute("result").unwrap().flags.sensitive);
        assert!(schema.attribute("bcrypt_hash").unwrap().flags.sensitive);
        assert!(!schema.attribute("id").unwrap().flags.sensitive);
    }

    #[test]
    fn test_import() {
        let state = PasswordResource.import("s3cr3t!").unwrap();
        assert_eq!(state["result"], "s3cr3t!");
        assert_eq!(state["length"], 7);
        assert_eq!(state["id"], "none");
        assert!(bcrypt::verify("s3cr3t!", state["bcrypt_hash"].as_str().unwrap()).unwrap());
    }

    #[test]
    fn test_import_empty() {
        assert!(matches!(PasswordResource.import(""), Err(ProviderError::Import(_))));
    }

    #[test]
    fn test_upgrade_from_v0() {
        let v0 = json!({"length": 6, "number": false, "result": "abcdef", "id": "none"});
        let upgraded = PasswordResource.upgrade_state(0, v0).unwrap();
        assert_eq!(upgraded["numeric"], false);
        let hash = upgraded["bcrypt_hash"].as_str().unwrap();
        assert!(bcrypt::verify("abcdef", hash).unwrap());

        // Already-current state is returned untouched
        let again = PasswordResource.upgrade_state(VERSION, upgraded.clone()).unwrap();
        assert_eq!(again, upgraded);
    }

    #[test]
    fn test_upgrade_from_v2_keeps_valid_hash() {
        let hash = bcrypt::hash("abcdef", 4).unwrap();
        let v2 = json!({"length": 6, "numeric": true, "result": "abcdef", "bcrypt_hash": hash});
        let upgraded = PasswordResource.upgrade_state(2, v2).unwrap();
        assert_eq!(upgraded["bcrypt_hash"], hash);
    }

    #[test]
    fn test_upgrade_from_v2_repairs_mismatched_hash() {
        let stale = bcrypt::hash("something-else", 4).unwrap();
        let v2 = json!({"length": 6, "numeric": true, "result": "abcdef", "bcrypt_hash": stale});
        let upgraded = PasswordResource.upgrade_state(2, v2).unwrap();
        let hash = upgraded["bcrypt_hash"].as_str().unwrap();
        assert_ne!(hash, stale);
        assert!(bcrypt::verify("abcdef", hash).unwrap());
    }

    #[test]
    fn test_upgrade_without_result_fails() {
        let result = PasswordResource.upgrade_state(1, json!({"length": 6}));
        assert!(matches!(result, Err(ProviderError::StateUpgrade(_))));
    }
}
